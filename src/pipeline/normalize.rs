//! Graph that turns raw pixels into model input.

use crate::error::{Error, Result};
use crate::graph::{DataType, Graph, GraphBuilder, Output, Session, Tensor};
use crate::image::{PixelBuffer, PixelLayout};

/// Resize and rescale parameters of the model input.
///
/// The defaults match the Inception5h model: images scaled to 224x224 and
/// every 1-byte R, G, B value converted with `(value - 117) / 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeParams {
    /// Target height in pixels.
    pub height: usize,

    /// Target width in pixels.
    pub width: usize,

    /// One mean for every channel, or one per channel.
    pub mean: Vec<f32>,

    /// One scale for every channel, or one per channel.
    pub scale: Vec<f32>,
}

impl Default for NormalizeParams {
    fn default() -> Self {
        Self {
            height: 224,
            width: 224,
            mean: vec![117.0],
            scale: vec![1.0],
        }
    }
}

impl NormalizeParams {
    /// Validate the parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if a size is zero or too large, or if the mean or
    /// scale is empty, or a scale is zero.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("height", self.height), ("width", self.width)] {
            if value == 0 || i32::try_from(value).is_err() {
                return Err(Error::InvalidParameter {
                    name: name.to_string(),
                    reason: format!("must be between 1 and {}, got {value}", i32::MAX),
                });
            }
        }

        if self.mean.is_empty() {
            return Err(Error::InvalidParameter {
                name: "mean".to_string(),
                reason: "needs at least one value".to_string(),
            });
        }

        if self.scale.is_empty() || self.scale.iter().any(|&s| s == 0.0) {
            return Err(Error::InvalidParameter {
                name: "scale".to_string(),
                reason: "needs at least one value and no zeros".to_string(),
            });
        }

        Ok(())
    }

    fn size(&self) -> Result<[i32; 2]> {
        self.validate()?;
        let to_i32 = |v: usize| i32::try_from(v).unwrap_or(i32::MAX);
        Ok([to_i32(self.height), to_i32(self.width)])
    }
}

fn per_channel(values: &[f32]) -> Tensor {
    match values {
        [single] => Tensor::scalar(*single),
        many => Tensor::vector(many),
    }
}

/// Append the normalization of `image` to `graph` and return its output.
///
/// `image` is a uint8 `[height, width, channels]` tensor. The result is
/// `(resize_bilinear(cast(image, float)[None], [H, W]) - mean) / scale`.
///
/// # Errors
///
/// Returns an error if the parameters are invalid or a node name is taken.
pub fn build_normalize_graph(
    graph: &mut Graph,
    image: Tensor,
    params: &NormalizeParams,
) -> Result<Output> {
    let size = params.size()?;
    let mut b = GraphBuilder::new(graph);

    let input = b.constant_tensor("input", image)?;
    let cast = b.cast(input, DataType::Float)?;
    let make_batch = b.constant("make_batch", 0i32)?;
    let batch = b.expand_dims(cast, make_batch)?;
    let size = b.constant("size", size)?;
    let resized = b.resize_bilinear(batch, size)?;
    let mean = b.constant_tensor("mean", per_channel(&params.mean))?;
    let centered = b.sub(resized, mean)?;
    let scale = b.constant_tensor("scale", per_channel(&params.scale))?;
    b.div(centered, scale)
}

/// Normalize interleaved pixels into a `[1, H, W, channels]` float tensor.
///
/// A fresh graph is built and dropped on every call.
///
/// # Errors
///
/// Returns an error if the pixels are not interleaved, the parameters are
/// invalid or do not broadcast over the channels, or the result does not
/// have the expected shape.
pub fn normalize_image(pixels: PixelBuffer, params: &NormalizeParams) -> Result<Tensor> {
    if pixels.layout() != PixelLayout::Interleaved {
        return Err(Error::InvalidParameter {
            name: "layout".to_string(),
            reason: format!(
                "normalization resizes [height, width, channels] pixels, got {} layout",
                pixels.layout()
            ),
        });
    }
    let channels = pixels.shape()[2];

    let mut graph = Graph::new();
    let output = build_normalize_graph(&mut graph, pixels.into_tensor()?, params)?;
    let name = output.name(&graph).to_string();

    let normalized = Session::new(&graph)
        .runner()
        .fetch(&name)
        .run()?
        .pop()
        .ok_or_else(|| Error::execution(format!("fetch {name:?} returned nothing")))?;

    let expected = [1, params.height, params.width, channels];
    if normalized.shape() != expected {
        return Err(Error::ShapeMismatch {
            expected: format!("{expected:?}"),
            actual: format!("{:?}", normalized.shape()),
        });
    }

    tracing::debug!("Normalized image to {:?}", normalized.shape());
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::OpType;
    use crate::image::{interleave, RasterImage};

    fn constant_pixels(width: usize, height: usize, bands: usize, value: u8) -> PixelBuffer {
        let raster =
            RasterImage::from_bands(width, height, vec![vec![value; width * height]; bands])
                .unwrap();
        interleave(&raster, PixelLayout::Interleaved)
    }

    #[test]
    fn test_mean_valued_image_normalizes_to_zero() {
        for (height, width) in [(224, 224), (3, 5), (1, 1)] {
            let params = NormalizeParams {
                height,
                width,
                ..NormalizeParams::default()
            };
            let out = normalize_image(constant_pixels(7, 4, 3, 117), &params).unwrap();

            assert_eq!(out.shape(), &[1, height, width, 3]);
            assert!(out.as_f32().unwrap().iter().all(|&v| v == 0.0));
        }
    }

    #[test]
    fn test_scale_divides() {
        let params = NormalizeParams {
            height: 2,
            width: 2,
            mean: vec![100.0],
            scale: vec![4.0],
        };
        let out = normalize_image(constant_pixels(2, 2, 3, 120), &params).unwrap();
        assert!(out.as_f32().unwrap().iter().all(|&v| (v - 5.0).abs() < 1e-6));
    }

    #[test]
    fn test_per_channel_mean_and_scale() {
        let raster = RasterImage::from_bands(
            1,
            1,
            vec![vec![10], vec![60], vec![110]],
        )
        .unwrap();
        let params = NormalizeParams {
            height: 2,
            width: 2,
            mean: vec![10.0, 20.0, 30.0],
            scale: vec![1.0, 2.0, 4.0],
        };
        let out = normalize_image(interleave(&raster, PixelLayout::Interleaved), &params).unwrap();

        let values: Vec<f32> = out.as_f32().unwrap().iter().copied().collect();
        assert_eq!(values, [0.0f32, 20.0, 20.0].repeat(4));
    }

    #[test]
    fn test_per_channel_mean_must_match_channels() {
        let params = NormalizeParams {
            mean: vec![1.0, 2.0, 3.0],
            ..NormalizeParams::default()
        };
        let err = normalize_image(constant_pixels(2, 2, 4, 0), &params).unwrap_err();
        assert!(matches!(err, Error::GraphExecution { .. }));
    }

    #[test]
    fn test_planar_pixels_rejected() {
        let raster = RasterImage::from_bands(1, 1, vec![vec![1], vec![2], vec![3]]).unwrap();
        let err = normalize_image(
            interleave(&raster, PixelLayout::Planar),
            &NormalizeParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_invalid_params() {
        let zero_height = NormalizeParams {
            height: 0,
            ..NormalizeParams::default()
        };
        assert!(zero_height.validate().is_err());

        let zero_scale = NormalizeParams {
            scale: vec![1.0, 0.0, 1.0],
            ..NormalizeParams::default()
        };
        assert!(zero_scale.validate().is_err());

        let no_mean = NormalizeParams {
            mean: Vec::new(),
            ..NormalizeParams::default()
        };
        assert!(no_mean.validate().is_err());
    }

    #[test]
    fn test_graph_structure() {
        let mut graph = Graph::new();
        let image = constant_pixels(2, 2, 3, 0).into_tensor().unwrap();
        let output = build_normalize_graph(&mut graph, image, &NormalizeParams::default()).unwrap();

        let ops: Vec<OpType> = graph.nodes().map(|n| n.op()).collect();
        assert_eq!(
            ops,
            vec![
                OpType::Const,
                OpType::Cast,
                OpType::Const,
                OpType::ExpandDims,
                OpType::Const,
                OpType::ResizeBilinear,
                OpType::Const,
                OpType::Sub,
                OpType::Const,
                OpType::Div,
            ]
        );
        assert_eq!(output.name(&graph), "Div");
        assert!(graph.node_by_name("make_batch").is_some());
    }

    #[test]
    fn test_graph_cannot_be_built_twice_into_one_graph() {
        let mut graph = Graph::new();
        let params = NormalizeParams::default();
        let image = || constant_pixels(1, 1, 3, 0).into_tensor().unwrap();
        build_normalize_graph(&mut graph, image(), &params).unwrap();

        let err = build_normalize_graph(&mut graph, image(), &params).unwrap_err();
        assert!(matches!(err, Error::DuplicateNode { name } if name == "input"));
    }
}
