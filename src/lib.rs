//! # `label-image`
//!
//! Label a raster image with a pre-trained classification model.
//!
//! The image is decoded into an interleaved byte buffer, normalized by a small
//! computation graph (cast, batch, bilinear resize, subtract mean, divide by
//! scale) and fed to an ONNX model. The most likely label wins.
//!
//! ## Example
//!
//! ```no_run
//! use label_image::{Classifier, Config};
//!
//! # fn main() -> label_image::Result<()> {
//! let config = Config {
//!     model_dir: "inception5h".into(),
//!     ..Config::default()
//! };
//! let mut classifier = Classifier::new(config)?;
//!
//! let best = classifier.classify("lakeside.tif")?;
//! println!("{} ({:.2}%)", best.label, best.probability * 100.0);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod graph;
pub mod image;
pub mod model;
pub mod pipeline;

pub use error::{Error, Result};
pub use pipeline::{Classification, Classifier, Config};
