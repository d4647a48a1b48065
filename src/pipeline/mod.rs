//! Image normalization, inference and label selection.

mod classify;
mod normalize;
mod select;

pub use classify::{prepare_image, Classifier, Config, DEFAULT_LABELS_FILE, DEFAULT_MODEL_FILE};
pub use normalize::{build_normalize_graph, normalize_image, NormalizeParams};
pub use select::{arg_max, format_best_match, Classification};
