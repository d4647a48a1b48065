//! Inference model and label table loading.

mod labels;
mod loader;

pub use labels::LabelTable;
pub use loader::{probabilities, read_model, InferenceModel, DEFAULT_INPUT_NAME, DEFAULT_OUTPUT_NAME};
