//! End-to-end image classification.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::graph::Tensor;
use crate::image::{decode, interleave, PixelLayout};
use crate::model::{InferenceModel, LabelTable, DEFAULT_INPUT_NAME, DEFAULT_OUTPUT_NAME};

use super::normalize::{normalize_image, NormalizeParams};
use super::select::{arg_max, Classification};

/// File name of the model graph inside the model directory.
pub const DEFAULT_MODEL_FILE: &str = "tensorflow_inception_graph.onnx";

/// File name of the label list inside the model directory.
pub const DEFAULT_LABELS_FILE: &str = "imagenet_comp_graph_label_strings.txt";

/// Configuration for the classification pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the model graph and the label list.
    pub model_dir: PathBuf,

    /// Model graph file name, relative to `model_dir`.
    pub model_file: String,

    /// Label list file name, relative to `model_dir`.
    pub labels_file: String,

    /// Target size and value range of the model input.
    pub normalize: NormalizeParams,

    /// Channel order the model was trained with.
    pub layout: PixelLayout,

    /// Model input fed with the normalized image.
    pub input_name: String,

    /// Model output holding the `[1, N]` probabilities.
    pub output_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("."),
            model_file: DEFAULT_MODEL_FILE.to_string(),
            labels_file: DEFAULT_LABELS_FILE.to_string(),
            normalize: NormalizeParams::default(),
            layout: PixelLayout::default(),
            input_name: DEFAULT_INPUT_NAME.to_string(),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        self.normalize.validate()?;

        if self.layout != PixelLayout::Interleaved {
            return Err(Error::InvalidParameter {
                name: "layout".to_string(),
                reason: format!(
                    "the normalization graph needs interleaved pixels, got {}",
                    self.layout
                ),
            });
        }

        for (name, value) in [
            ("model_file", &self.model_file),
            ("labels_file", &self.labels_file),
            ("input_name", &self.input_name),
            ("output_name", &self.output_name),
        ] {
            if value.is_empty() {
                return Err(Error::InvalidParameter {
                    name: name.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }

        Ok(())
    }

    /// Full path of the model graph.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.model_dir.join(&self.model_file)
    }

    /// Full path of the label list.
    #[must_use]
    pub fn labels_path(&self) -> PathBuf {
        self.model_dir.join(&self.labels_file)
    }
}

/// Decode, interleave and normalize the image at `path`.
///
/// # Errors
///
/// Returns an error if the image cannot be decoded or normalized.
pub fn prepare_image<P: AsRef<Path>>(path: P, config: &Config) -> Result<Tensor> {
    let raster = decode(path)?;
    let pixels = interleave(&raster, config.layout);
    normalize_image(pixels, &config.normalize)
}

/// A loaded model together with its labels.
pub struct Classifier {
    config: Config,
    model: InferenceModel,
    labels: LabelTable,
}

impl Classifier {
    /// Read the label list and load the model described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, either file cannot
    /// be read, or the model cannot be loaded.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        tracing::info!("Initializing classifier with config: {config:?}");

        let labels = LabelTable::load(config.labels_path())?;

        tracing::info!("Loading model {}...", config.model_path().display());
        let model = InferenceModel::load(
            config.model_path(),
            config.input_name.as_str(),
            config.output_name.as_str(),
        )?;

        tracing::info!("Classifier ready with {} labels", labels.len());

        Ok(Self {
            config,
            model,
            labels,
        })
    }

    /// Configuration the classifier was built with.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Labels, indexed like the model output.
    #[must_use]
    pub const fn labels(&self) -> &LabelTable {
        &self.labels
    }

    /// Label the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if any stage fails. Nothing is retried.
    pub fn classify<P: AsRef<Path>>(&mut self, path: P) -> Result<Classification> {
        let path = path.as_ref();

        tracing::info!("Classifying image: {}", path.display());
        let image = prepare_image(path, &self.config)?;

        tracing::info!("Running inference...");
        let probabilities = self.model.classify(&image)?;

        let best = arg_max(&probabilities, &self.labels)?;
        tracing::info!(
            "Best label #{} {:?} with probability {}",
            best.index,
            best.label,
            best.probability
        );
        Ok(best)
    }
}
