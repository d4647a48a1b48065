//! Raster loading utilities.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::ColorType;

use crate::error::{Error, Result};

use super::RGB_CHANNELS;

/// A decoded multi-band raster of 8-bit samples.
///
/// Each band is stored as its own row-major plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: usize,
    height: usize,
    bands: Vec<Vec<u8>>,
}

impl RasterImage {
    /// Build a raster from one row-major plane per band.
    ///
    /// # Errors
    ///
    /// Returns an error if a dimension is zero, there are no bands, or a band
    /// does not hold exactly `width * height` samples.
    pub fn from_bands(width: usize, height: usize, bands: Vec<Vec<u8>>) -> Result<Self> {
        if width == 0 || height == 0 || bands.is_empty() {
            return Err(Error::InvalidParameter {
                name: "raster".to_string(),
                reason: format!(
                    "{width}x{height} with {} bands has no samples",
                    bands.len()
                ),
            });
        }
        if let Some((i, band)) = bands
            .iter()
            .enumerate()
            .find(|(_, band)| band.len() != width * height)
        {
            return Err(Error::ShapeMismatch {
                expected: format!("{} samples in band {i}", width * height),
                actual: format!("{}", band.len()),
            });
        }

        Ok(Self {
            width,
            height,
            bands,
        })
    }

    /// Split pixel-interleaved samples (`band_count` per pixel) into bands.
    ///
    /// # Errors
    ///
    /// Returns an error under the same conditions as [`RasterImage::from_bands`],
    /// or if `samples` is not `width * height * band_count` long.
    pub fn from_interleaved(
        width: usize,
        height: usize,
        band_count: usize,
        samples: &[u8],
    ) -> Result<Self> {
        if band_count == 0 || samples.len() != width * height * band_count {
            return Err(Error::ShapeMismatch {
                expected: format!("{width}x{height}x{band_count} samples"),
                actual: format!("{}", samples.len()),
            });
        }

        let bands = (0..band_count)
            .map(|c| samples.iter().skip(c).step_by(band_count).copied().collect())
            .collect();
        Self::from_bands(width, height, bands)
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Number of samples per pixel.
    #[must_use]
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Sample of `band` at column `col`, row `row`.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of bounds.
    #[must_use]
    pub fn sample(&self, band: usize, col: usize, row: usize) -> u8 {
        assert!(col < self.width && row < self.height, "pixel ({col}, {row}) out of bounds");
        self.bands[band][row * self.width + col]
    }

    /// Row-major plane of `band`.
    #[must_use]
    pub fn band(&self, band: usize) -> Option<&[u8]> {
        self.bands.get(band).map(Vec::as_slice)
    }
}

/// Decode a raster from disk.
///
/// `.tif` and `.tiff` files are read with the TIFF decoder, which keeps every
/// 8-bit sample of a pixel as its own band (GeoTIFF multiband rasters
/// included). Any other format goes through `image` and comes back as RGB.
///
/// # Errors
///
/// Returns an error if the file cannot be read, cannot be decoded, or holds
/// samples that are not 8 bits wide.
pub fn decode<P: AsRef<Path>>(path: P) -> Result<RasterImage> {
    let path = path.as_ref();

    let is_tiff = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"));

    let raster = if is_tiff {
        decode_tiff(path)?
    } else {
        decode_rgb(path)?
    };

    tracing::debug!(
        "Decoded {}: {}x{} with {} bands",
        path.display(),
        raster.width(),
        raster.height(),
        raster.band_count()
    );
    Ok(raster)
}

fn decode_tiff(path: &Path) -> Result<RasterImage> {
    let tiff_error = |source: tiff::TiffError| Error::TiffDecode {
        path: path.to_path_buf(),
        source,
    };
    let unsupported = |reason: String| Error::UnsupportedRaster {
        path: path.to_path_buf(),
        reason,
    };

    let file = File::open(path).map_err(|source| Error::InputRead {
        path: path.to_path_buf(),
        source,
    })?;
    let mut decoder = Decoder::new(BufReader::new(file)).map_err(tiff_error)?;

    let (width, height) = decoder.dimensions().map_err(tiff_error)?;
    let band_count = match decoder.colortype().map_err(tiff_error)? {
        ColorType::Gray(8) => 1,
        ColorType::GrayA(8) => 2,
        ColorType::RGB(8) => 3,
        ColorType::RGBA(8) | ColorType::CMYK(8) => 4,
        ColorType::Multiband {
            bit_depth: 8,
            num_samples,
        } => usize::from(num_samples),
        other => {
            return Err(unsupported(format!(
                "{other:?} samples, only 8-bit samples are supported"
            )))
        }
    };

    match decoder.read_image().map_err(tiff_error)? {
        DecodingResult::U8(samples) => {
            RasterImage::from_interleaved(width as usize, height as usize, band_count, &samples)
        }
        _ => Err(unsupported("decoded samples are not 8-bit".to_string())),
    }
}

fn decode_rgb(path: &Path) -> Result<RasterImage> {
    let img = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    RasterImage::from_interleaved(width as usize, height as usize, RGB_CHANNELS, rgb.as_raw())
}
