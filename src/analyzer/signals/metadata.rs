//! Signals derived from the raster's shape and alpha channel

use crate::analyzer::primitives::{sample_points, SAMPLE_TARGET};
use crate::analyzer::signal::{Category, Measurement, SignalDef};
use crate::pixels::PixelBuffer;

/// log2 of the largest power of two dividing both sides, capped at 2^7.
fn dimension_alignment(pixels: &PixelBuffer) -> Measurement {
    let bits = (pixels.width() | pixels.height()).trailing_zeros().min(7);
    Measurement::new(bits as f64)
        .with("width", pixels.width() as f64)
        .with("height", pixels.height() as f64)
}

fn aspect_ratio(pixels: &PixelBuffer) -> Measurement {
    let ratio = pixels.width() as f64 / pixels.height() as f64;
    Measurement::new(ratio.ln().abs()).with("ratio", ratio)
}

fn alpha_channel(pixels: &PixelBuffer) -> Measurement {
    let mut translucent = 0usize;
    let mut samples = 0usize;
    for (x, y) in sample_points(pixels, SAMPLE_TARGET) {
        if pixels.rgba(x, y)[3] < 255 {
            translucent += 1;
        }
        samples += 1;
    }
    Measurement::new(translucent as f64 / samples.max(1) as f64)
}

pub static SIGNALS: &[SignalDef] = &[
    SignalDef {
        id: "dimension_alignment",
        name: "Dimension Alignment",
        category: Category::Metadata,
        weight: 0.6,
        min_size: 16,
        icon: "maximize",
        statistic: dimension_alignment,
        bands: &[(3.0, 40.0), (6.0, 50.0)],
        otherwise: 70.0,
        ai_text: "Both sides are multiples of 64, a common generator size",
        real_text: "Dimensions are typical of camera output",
    },
    SignalDef {
        id: "aspect_ratio",
        name: "Aspect Ratio",
        category: Category::Metadata,
        weight: 0.5,
        min_size: 16,
        icon: "maximize",
        statistic: aspect_ratio,
        bands: &[(0.01, 68.0), (0.3, 50.0)],
        otherwise: 45.0,
        ai_text: "Square frame, the default for many generators",
        real_text: "Aspect ratio typical of camera sensors",
    },
    SignalDef {
        id: "alpha_channel",
        name: "Alpha Channel",
        category: Category::Metadata,
        weight: 0.5,
        min_size: 16,
        icon: "file",
        statistic: alpha_channel,
        bands: &[(1e-6, 45.0), (0.5, 65.0)],
        otherwise: 70.0,
        ai_text: "Image carries transparency, which cameras never produce",
        real_text: "Fully opaque, as camera output is",
    },
];
