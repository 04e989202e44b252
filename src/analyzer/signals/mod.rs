//! Compiled-in signal catalog
//!
//! Each category module exposes a `SIGNALS` slice of [`SignalDef`] records.
//! [`catalog`] chains them in the fixed category order; that order is the
//! order signals appear in every result.

pub mod color;
pub mod compression;
pub mod frequency;
pub mod geometric;
pub mod metadata;
pub mod perceptual;
pub mod sensor;
pub mod spatial;
pub mod statistical;
pub mod structure;
pub mod texture;

use crate::analyzer::primitives::{Channel, Gradients, Plane, MAX_CROP};
use std::f64::consts::PI;
use crate::analyzer::signal::SignalDef;
use crate::pixels::PixelBuffer;

/// Statistic value for "nothing to measure" (no edges, silent spectrum, ...).
/// Every table that can see it maps it to neutral through a leading band.
pub const UNMEASURABLE: f64 = -1.0;

/// Every catalog signal, in registration order.
pub fn catalog() -> impl Iterator<Item = &'static SignalDef> {
    frequency::SIGNALS
        .iter()
        .chain(statistical::SIGNALS)
        .chain(sensor::SIGNALS)
        .chain(spatial::SIGNALS)
        .chain(color::SIGNALS)
        .chain(compression::SIGNALS)
        .chain(geometric::SIGNALS)
        .chain(perceptual::SIGNALS)
        .chain(structure::SIGNALS)
        .chain(texture::SIGNALS)
        .chain(metadata::SIGNALS)
}

/// High-pass residual of a channel's centre crop.
pub(crate) fn residual_plane(pixels: &PixelBuffer, channel: Channel) -> Plane {
    Plane::center_crop(pixels, channel, MAX_CROP).residual()
}

/// Luma crop with its Sobel gradients and thresholded edge pixels.
pub(crate) struct EdgeMap {
    pub plane: Plane,
    pub gradients: Gradients,
    pub points: Vec<(usize, usize)>,
}

impl EdgeMap {
    pub fn of(pixels: &PixelBuffer) -> Self {
        let plane = Plane::luma(pixels);
        let gradients = plane.sobel();
        let points = gradients.edge_points();
        Self {
            plane,
            gradients,
            points,
        }
    }

    /// Pixels that can carry a Sobel response.
    pub fn interior(&self) -> usize {
        self.plane.width.saturating_sub(2) * self.plane.height.saturating_sub(2)
    }

    /// Edge orientations binned over `[0, π)`.
    pub fn orientation_histogram(&self, bins: usize) -> Vec<u64> {
        let bins = bins.max(1);
        let mut hist = vec![0u64; bins];
        for &(x, y) in &self.points {
            let theta = self.gradients.orientation(x, y);
            hist[((theta * bins as f64 / PI) as usize).min(bins - 1)] += 1;
        }
        hist
    }
}

#[cfg(test)]
pub(crate) mod test_images {
    use crate::pixels::PixelBuffer;

    pub fn flat(w: u32, h: u32, v: u8) -> PixelBuffer {
        PixelBuffer::filled(w, h, [v, v, v, 255]).unwrap()
    }

    /// Horizontal gray ramp from 0 to 255.
    pub fn gradient(w: u32, h: u32) -> PixelBuffer {
        PixelBuffer::from_fn(w, h, |x, _| {
            let v = (x * 255 / (w - 1).max(1)) as u8;
            [v, v, v, 255]
        })
        .unwrap()
    }

    /// LCG noise with slightly offset channels.
    pub fn noise(w: u32, h: u32, seed: u64) -> PixelBuffer {
        let mut state = seed;
        PixelBuffer::from_fn(w, h, |_, _| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let v = (state >> 56) as u8;
            [v, v.wrapping_add(7), v.wrapping_sub(5), 255]
        })
        .unwrap()
    }

    /// Black and white vertical stripes.
    pub fn stripes(w: u32, h: u32, period: u32) -> PixelBuffer {
        PixelBuffer::from_fn(w, h, |x, _| {
            let v = if x % period < period / 2 { 0 } else { 255 };
            [v, v, v, 255]
        })
        .unwrap()
    }

    /// Black and white squares of side `cell`.
    pub fn checkerboard(w: u32, h: u32, cell: u32) -> PixelBuffer {
        PixelBuffer::from_fn(w, h, |x, y| {
            let v = if (x / cell + y / cell) % 2 == 0 { 0 } else { 255 };
            [v, v, v, 255]
        })
        .unwrap()
    }
}
