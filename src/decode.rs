//! Image decoding
//!
//! Turns an encoded file into the RGBA8 [`PixelBuffer`] the analyzers read.
//! Anything with a side longer than `max_dimension` is downsampled with a
//! triangle filter, keeping the aspect ratio, so analysis cost stays bounded.

use crate::error::{PixelotError, PixelotResult};
use crate::pixels::PixelBuffer;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::Serialize;
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// Where a buffer came from, before any resizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    pub original_width: u32,
    pub original_height: u32,
    pub downsampled: bool,
}

#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub pixels: PixelBuffer,
    pub source: SourceInfo,
}

/// Decode a file, sniffing the format from its contents.
pub fn load<P: AsRef<Path>>(path: P, max_dimension: u32) -> PixelotResult<DecodedImage> {
    let reader = ImageReader::open(path.as_ref())?.with_guessed_format()?;
    let format = reader.format();
    let image = reader.decode()?;
    from_dynamic(image, format, max_dimension)
}

/// Decode an in-memory encoded image.
pub fn decode_bytes(bytes: &[u8], max_dimension: u32) -> PixelotResult<DecodedImage> {
    let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
    let format = reader.format();
    let image = reader.decode()?;
    from_dynamic(image, format, max_dimension)
}

pub fn from_dynamic(image: DynamicImage, format: Option<ImageFormat>, max_dimension: u32) -> PixelotResult<DecodedImage> {
    let (original_width, original_height) = (image.width(), image.height());
    if original_width == 0 || original_height == 0 {
        return Err(PixelotError::Decode(format!(
            "image has no pixels ({}x{})",
            original_width, original_height
        )));
    }

    let downsampled = original_width.max(original_height) > max_dimension;
    let image = if downsampled {
        image.resize(max_dimension, max_dimension, FilterType::Triangle)
    } else {
        image
    };
    debug!(
        original_width,
        original_height,
        width = image.width(),
        height = image.height(),
        "decoded image"
    );

    let rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        pixels: PixelBuffer::new(width, height, rgba.into_raw())?,
        source: SourceInfo {
            format: format.and_then(format_name),
            original_width,
            original_height,
            downsampled,
        },
    })
}

fn format_name(format: ImageFormat) -> Option<String> {
    format.extensions_str().first().map(|ext| ext.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn encode_png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| Rgba([(x * 4) as u8, (y * 4) as u8, 77, 255]));
        let mut bytes = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    #[test]
    fn test_decode_png_keeps_pixels() {
        let decoded = decode_bytes(&encode_png(20, 10), 1024).unwrap();
        assert_eq!(decoded.pixels.width(), 20);
        assert_eq!(decoded.pixels.height(), 10);
        assert_eq!(decoded.pixels.rgba(3, 2), [12, 8, 77, 255]);
        assert_eq!(decoded.source.format.as_deref(), Some("png"));
        assert!(!decoded.source.downsampled);
    }

    #[test]
    fn test_large_images_are_downsampled() {
        let decoded = decode_bytes(&encode_png(64, 32), 16).unwrap();
        assert_eq!((decoded.pixels.width(), decoded.pixels.height()), (16, 8));
        assert_eq!(decoded.source.original_width, 64);
        assert!(decoded.source.downsampled);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = decode_bytes(b"definitely not an image", 1024);
        assert!(matches!(result, Err(PixelotError::Decode(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        assert!(matches!(load("/no/such/image.png", 1024), Err(PixelotError::Io(_))));
    }
}
