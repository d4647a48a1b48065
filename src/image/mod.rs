//! Raster decoding and pixel interleaving.

mod interleave;
mod load;

pub use interleave::{interleave, PixelBuffer, PixelLayout};
pub use load::{decode, RasterImage};

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;
