//! Custom error types for label-image.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the label-image library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read an input file (model blob, label list).
    #[error("failed to read {path}: {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to load an image file.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to decode a TIFF raster.
    #[error("failed to decode TIFF raster {path}: {source}")]
    TiffDecode {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    /// The raster decoded but its layout is not supported.
    #[error("unsupported raster {path}: {reason}")]
    UnsupportedRaster { path: PathBuf, reason: String },

    /// Failed to load an ONNX model.
    #[error("failed to load ONNX model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: ort::Error,
    },

    /// Model inference failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// A node name was used twice in the same graph.
    #[error("graph already contains a node named {name:?}")]
    DuplicateNode { name: String },

    /// The graph could not be evaluated.
    #[error("graph execution failed: {reason}")]
    GraphExecution { reason: String },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Shape mismatch in tensor operations.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// The model and the label file disagree on the number of classes.
    #[error("model produced {probabilities} probabilities but the label table has {labels} labels")]
    LabelCountMismatch { probabilities: usize, labels: usize },
}

impl Error {
    pub(crate) fn execution(reason: impl Into<String>) -> Self {
        Self::GraphExecution {
            reason: reason.into(),
        }
    }
}

/// Result type alias for label-image operations.
pub type Result<T> = std::result::Result<T, Error>;
