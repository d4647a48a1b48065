//! Conversion of band-separate rasters into flat pixel buffers.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::graph::Tensor;

use super::RasterImage;

/// Element order of a [`PixelBuffer`].
///
/// This has to match the order the model was trained with. A wrong order
/// still yields a well-formed tensor, only the predictions degrade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PixelLayout {
    /// `[height, width, channels]`: every pixel stores its bands side by side,
    /// pixels left to right, rows top to bottom.
    #[default]
    Interleaved,
    /// `[channels, height, width]`: one full plane per band.
    Planar,
}

impl fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interleaved => "interleaved",
            Self::Planar => "planar",
        })
    }
}

impl FromStr for PixelLayout {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "interleaved" | "hwc" => Ok(Self::Interleaved),
            "planar" | "chw" => Ok(Self::Planar),
            other => Err(Error::InvalidParameter {
                name: "layout".to_string(),
                reason: format!("unknown pixel layout {other:?}, expected interleaved or planar"),
            }),
        }
    }
}

/// Flat 8-bit samples of a raster together with their shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    shape: [usize; 3],
    layout: PixelLayout,
}

impl PixelBuffer {
    /// Samples in buffer order.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// `[height, width, channels]` or `[channels, height, width]`, depending
    /// on the layout.
    #[must_use]
    pub const fn shape(&self) -> [usize; 3] {
        self.shape
    }

    /// Order of the samples.
    #[must_use]
    pub const fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Wrap the buffer as a uint8 tensor of [`PixelBuffer::shape`].
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer length does not match its shape, which
    /// [`interleave`] never produces.
    pub fn into_tensor(self) -> Result<Tensor> {
        Tensor::from_shape_vec(&self.shape, self.data)
    }
}

/// Flatten `raster` into a single buffer ordered by `layout`.
///
/// For [`PixelLayout::Interleaved`] the sample of band `c` at column `w`,
/// row `h` lands at `h * (width * bands) + w * bands + c`.
#[must_use]
pub fn interleave(raster: &RasterImage, layout: PixelLayout) -> PixelBuffer {
    let (width, height, channels) = (raster.width(), raster.height(), raster.band_count());
    let bands: Vec<&[u8]> = (0..channels).filter_map(|c| raster.band(c)).collect();

    let (data, shape) = match layout {
        PixelLayout::Interleaved => {
            let mut data = vec![0u8; height * width * channels];
            for h in 0..height {
                for w in 0..width {
                    for (c, band) in bands.iter().enumerate() {
                        data[h * (width * channels) + w * channels + c] = band[h * width + w];
                    }
                }
            }
            (data, [height, width, channels])
        }
        PixelLayout::Planar => (bands.concat(), [channels, height, width]),
    };

    PixelBuffer {
        data,
        shape,
        layout,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DataType;

    /// 2x2 raster, three bands.
    fn fixture() -> RasterImage {
        RasterImage::from_bands(
            2,
            2,
            vec![
                vec![10, 20, 30, 40],
                vec![1, 2, 3, 4],
                vec![100, 200, 210, 220],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_interleaved_order() {
        let pixels = interleave(&fixture(), PixelLayout::Interleaved);

        assert_eq!(
            pixels.data(),
            &[10, 1, 100, 20, 2, 200, 30, 3, 210, 40, 4, 220]
        );
        assert_eq!(pixels.shape(), [2, 2, 3]);
    }

    #[test]
    fn test_interleaved_matches_samples() {
        let raster = RasterImage::from_bands(
            3,
            2,
            (0..3u8)
                .map(|c| (0..6u8).map(|i| c * 50 + i).collect())
                .collect(),
        )
        .unwrap();
        let pixels = interleave(&raster, PixelLayout::Interleaved);

        assert_eq!(pixels.len(), 3 * 2 * 3);
        for h in 0..2 {
            for w in 0..3 {
                for c in 0..3 {
                    assert_eq!(pixels.data()[h * 9 + w * 3 + c], raster.sample(c, w, h));
                }
            }
        }
    }

    #[test]
    fn test_planar_order() {
        let pixels = interleave(&fixture(), PixelLayout::Planar);

        assert_eq!(
            pixels.data(),
            &[10, 20, 30, 40, 1, 2, 3, 4, 100, 200, 210, 220]
        );
        assert_eq!(pixels.shape(), [3, 2, 2]);
    }

    #[test]
    fn test_into_tensor() {
        let tensor = interleave(&fixture(), PixelLayout::Interleaved)
            .into_tensor()
            .unwrap();

        assert_eq!(tensor.data_type(), DataType::UInt8);
        assert_eq!(tensor.shape(), &[2, 2, 3]);
        assert_eq!(tensor.as_u8().unwrap()[[1, 0, 2]], 210);
    }

    #[test]
    fn test_layout_from_str() {
        assert_eq!("HWC".parse::<PixelLayout>().unwrap(), PixelLayout::Interleaved);
        assert_eq!("planar".parse::<PixelLayout>().unwrap(), PixelLayout::Planar);
        assert!("bgr".parse::<PixelLayout>().is_err());
    }
}
