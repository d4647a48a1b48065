//! Model loading and inference through ONNX Runtime.

use std::fs;
use std::path::Path;

use ort::session::Session;
use ort::value::Tensor as OrtTensor;

use crate::error::{Error, Result};
use crate::graph::Tensor;

/// Name of the model input the normalized image is fed to.
pub const DEFAULT_INPUT_NAME: &str = "input";

/// Name of the model output holding the label probabilities.
pub const DEFAULT_OUTPUT_NAME: &str = "output";

/// Read a model blob from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn read_model<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    let path = path.as_ref();
    fs::read(path).map_err(|source| Error::InputRead {
        path: path.to_path_buf(),
        source,
    })
}

/// A classification model loaded into an ONNX Runtime session.
///
/// The session and every value it produces are released when dropped.
pub struct InferenceModel {
    session: Session,
    input_name: String,
    output_name: String,
}

impl InferenceModel {
    /// Load a model from an in-memory blob.
    ///
    /// `name` is only used in error messages.
    ///
    /// # Errors
    ///
    /// Returns an error if ONNX Runtime rejects the blob.
    pub fn from_bytes(
        name: &str,
        bytes: &[u8],
        input_name: impl Into<String>,
        output_name: impl Into<String>,
    ) -> Result<Self> {
        let session = Session::builder()
            .map_err(|source| Error::ModelLoad {
                name: name.to_string(),
                source,
            })?
            .commit_from_memory(bytes)
            .map_err(|source| Error::ModelLoad {
                name: name.to_string(),
                source,
            })?;

        tracing::debug!(
            "Model {name} inputs: {:?}, outputs: {:?}",
            session.inputs.iter().map(|i| i.name.as_str()).collect::<Vec<_>>(),
            session.outputs.iter().map(|o| o.name.as_str()).collect::<Vec<_>>()
        );

        Ok(Self {
            session,
            input_name: input_name.into(),
            output_name: output_name.into(),
        })
    }

    /// Load a model file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or ONNX Runtime rejects it.
    pub fn load<P: AsRef<Path>>(
        path: P,
        input_name: impl Into<String>,
        output_name: impl Into<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let bytes = read_model(path)?;
        Self::from_bytes(&path.display().to_string(), &bytes, input_name, output_name)
    }

    /// Feed `image` to the model and return the `[1, N]` output as `N`
    /// probabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if `image` is not a float tensor, inference fails, the
    /// output is missing, or it is not shaped `[1, N]`.
    pub fn classify(&mut self, image: &Tensor) -> Result<Vec<f32>> {
        let input_value = OrtTensor::from_array(image.as_f32()?.clone())
            .map_err(|source| Error::Inference { source })?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_value])
            .map_err(|source| Error::Inference { source })?;

        let output = outputs
            .iter()
            .find(|(name, _)| *name == self.output_name)
            .map(|(_, value)| value)
            .ok_or_else(|| Error::ShapeMismatch {
                expected: format!("model output {:?}", self.output_name),
                actual: "no such output".to_string(),
            })?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|source| Error::Inference { source })?;

        let dims: Vec<i64> = shape.iter().copied().collect();
        probabilities(&dims, data)
    }
}

/// Check that a model output is shaped `[1, N]` and return its `N` values.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the output is not rank 2 with a
/// leading dimension of 1, or if `data` does not hold `N` values.
pub fn probabilities(shape: &[i64], data: &[f32]) -> Result<Vec<f32>> {
    let mismatch = || Error::ShapeMismatch {
        expected: "a [1 N] shaped tensor where N is the number of labels".to_string(),
        actual: format!("{shape:?} with {} values", data.len()),
    };

    match shape {
        [1, n] if usize::try_from(*n).is_ok_and(|n| n == data.len()) => Ok(data.to_vec()),
        _ => Err(mismatch()),
    }
}
