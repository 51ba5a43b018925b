// this_file: src/encode.rs
//! Serializing rendered surfaces

use crate::compose::RasterSurface;
use crate::error::{Error, Result};
use image::codecs::jpeg;
use image::{Rgb, RgbImage};
use std::io::Write;

/// Turns a finished surface into an encoded byte stream.
pub trait Encoder: Send + Sync {
    fn encode(&self, surface: &RasterSurface, out: &mut dyn Write) -> Result<()>;

    /// MIME type of the output
    fn content_type(&self) -> &'static str;

    fn encode_to_vec(&self, surface: &RasterSurface) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.encode(surface, &mut buffer)?;
        Ok(buffer)
    }
}

/// Baseline JPEG at a fixed quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JpegEncoder {
    quality: u8,
}

impl JpegEncoder {
    /// `quality` is clamped to `1..=100`.
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for JpegEncoder {
    fn default() -> Self {
        Self::new(75)
    }
}

impl Encoder for JpegEncoder {
    fn encode(&self, surface: &RasterSurface, out: &mut dyn Write) -> Result<()> {
        // JPEG has no alpha; the surface is opaque so dropping it is lossless.
        let rgb = RgbImage::from_fn(surface.width(), surface.height(), |x, y| {
            let p = surface.get_pixel(x, y);
            Rgb([p[0], p[1], p[2]])
        });
        let mut encoder = jpeg::JpegEncoder::new_with_quality(out, self.quality);
        encoder
            .encode_image(&rgb)
            .map_err(|e| Error::Encode(e.to_string()))
    }

    fn content_type(&self) -> &'static str {
        "image/jpeg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, ImageFormat, Rgba};

    #[test]
    fn quality_is_clamped() {
        assert_eq!(JpegEncoder::new(0).quality(), 1);
        assert_eq!(JpegEncoder::new(255).quality(), 100);
        assert_eq!(JpegEncoder::default().quality(), 75);
    }

    #[test]
    fn encodes_decodable_jpeg() {
        let surface = RasterSurface::from_pixel(40, 30, Rgba([20, 40, 60, 255]));
        let bytes = JpegEncoder::new(90).encode_to_vec(&surface).unwrap();

        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Jpeg);

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (40, 30));
        let pixel = decoded.to_rgb8().get_pixel(20, 15).0;
        for (got, want) in pixel.iter().zip([20u8, 40, 60]) {
            assert!(got.abs_diff(want) <= 4, "{:?}", pixel);
        }
    }

    #[test]
    fn content_type_is_jpeg() {
        assert_eq!(JpegEncoder::default().content_type(), "image/jpeg");
    }
}
