//! Decoded RGBA8 raster handed to every analyzer
//!
//! A [`PixelBuffer`] is validated exactly once, at construction. Analyzers
//! receive `&PixelBuffer` and never check the length relation again.

use crate::error::{PixelotError, PixelotResult};

/// Bytes per pixel (R, G, B, A).
pub const CHANNELS: usize = 4;

/// Immutable, row-major RGBA8 pixel data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

/// `width * height * CHANNELS`, or `InvalidInput` when it does not fit.
fn byte_len(width: u32, height: u32) -> PixelotResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(CHANNELS))
        .ok_or_else(|| PixelotError::InvalidInput(format!("{}x{} overflows the address space", width, height)))
}

impl PixelBuffer {
    /// Wrap decoded bytes, failing fast when the length does not match the
    /// dimensions or when either dimension is zero.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> PixelotResult<Self> {
        if width == 0 || height == 0 {
            return Err(PixelotError::InvalidInput(format!(
                "dimensions must be non-zero, got {}x{}",
                width, height
            )));
        }
        let expected = byte_len(width, height)?;
        if data.len() != expected {
            return Err(PixelotError::InvalidInput(format!(
                "buffer length {} does not match {}x{}x{} = {}",
                data.len(),
                width,
                height,
                CHANNELS,
                expected
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Build a buffer where every pixel has the same RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> PixelotResult<Self> {
        let len = byte_len(width, height)?;
        let data = rgba.iter().copied().cycle().take(len).collect();
        Self::new(width, height, data)
    }

    /// Build a buffer by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: u32, height: u32, mut f: F) -> PixelotResult<Self>
    where
        F: FnMut(u32, u32) -> [u8; 4],
    {
        let mut data = Vec::with_capacity(byte_len(width, height)?);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&f(x, y));
            }
        }
        Self::new(width, height, data)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// RGBA of the pixel at `(x, y)`. Callers stay inside the image.
    #[inline]
    pub fn rgba(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// True when both sides reach `min_side`.
    pub fn fits(&self, min_side: u32) -> bool {
        self.width >= min_side && self.height >= min_side
    }

    /// True when any pixel is not fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.data.chunks_exact(CHANNELS).any(|p| p[3] < 255)
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // CONSTRUCTION / VALIDATION TESTS
    // ==========================================================================
    //
    // The length check is the single place where malformed input is caught.
    // Everything downstream assumes len == width * height * 4.
    // ==========================================================================

    #[test]
    fn test_valid_buffer_accepted() {
        let buf = PixelBuffer::new(2, 3, vec![0; 24]).unwrap();
        assert_eq!(buf.width(), 2);
        assert_eq!(buf.height(), 3);
        assert_eq!(buf.pixel_count(), 6);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let err = PixelBuffer::new(2, 2, vec![0; 15]).unwrap_err();
        assert!(matches!(err, PixelotError::InvalidInput(_)));
    }

    #[test]
    fn test_long_buffer_rejected() {
        assert!(PixelBuffer::new(2, 2, vec![0; 17]).is_err());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(PixelBuffer::new(0, 4, vec![]).is_err());
        assert!(PixelBuffer::new(4, 0, vec![]).is_err());
    }

    #[test]
    fn test_oversized_dimensions_rejected() {
        let err = PixelBuffer::filled(u32::MAX, u32::MAX, [0, 0, 0, 255]).unwrap_err();
        assert!(matches!(err, PixelotError::InvalidInput(_)));

        let mut calls = 0;
        let err = PixelBuffer::from_fn(u32::MAX, u32::MAX, |_, _| {
            calls += 1;
            [0; 4]
        })
        .unwrap_err();
        assert!(matches!(err, PixelotError::InvalidInput(_)));
        assert_eq!(calls, 0);

        assert!(PixelBuffer::new(u32::MAX, u32::MAX, vec![]).is_err());
    }

    #[test]
    fn test_filled_and_rgba() {
        let buf = PixelBuffer::filled(4, 4, [10, 20, 30, 255]).unwrap();
        assert_eq!(buf.rgba(3, 3), [10, 20, 30, 255]);
        assert!(!buf.has_transparency());
    }

    #[test]
    fn test_from_fn_row_major() {
        let buf = PixelBuffer::from_fn(3, 2, |x, y| [x as u8, y as u8, 0, 128]).unwrap();
        assert_eq!(buf.rgba(2, 1), [2, 1, 0, 128]);
        assert_eq!(&buf.as_bytes()[4..8], &[1, 0, 0, 128]);
        assert!(buf.has_transparency());
    }

    #[test]
    fn test_fits() {
        let buf = PixelBuffer::filled(16, 20, [0, 0, 0, 255]).unwrap();
        assert!(buf.fits(16));
        assert!(!buf.fits(17));
    }
}
