//! Perceptual signals: contrast, tone and how detail is distributed

use super::EdgeMap;
use crate::analyzer::primitives::{
    block_stats, coefficient_of_variation, mean, sample_points, sample_values, std_dev, Channel, Histogram, Plane,
    SAMPLE_TARGET,
};
use crate::analyzer::signal::{Category, Measurement, SignalDef};
use crate::pixels::PixelBuffer;

fn contrast_rms(pixels: &PixelBuffer) -> Measurement {
    Measurement::new(std_dev(&sample_values(pixels, Channel::Luma, SAMPLE_TARGET)) / 255.0)
}

/// Width of the 1st-99th percentile luma band.
fn dynamic_range(pixels: &PixelBuffer) -> Measurement {
    let hist = Histogram::of(pixels, Channel::Luma, SAMPLE_TARGET);
    let low = hist.percentile(0.01);
    let high = hist.percentile(0.99);
    Measurement::new(high.saturating_sub(low) as f64)
        .with("p01", low as f64)
        .with("p99", high as f64)
}

/// Spread of mean gradient magnitude across 16×16 tiles.
fn sharpness_uniformity(pixels: &PixelBuffer) -> Measurement {
    let edges = EdgeMap::of(pixels);
    let magnitude = Plane {
        width: edges.gradients.width(),
        height: edges.gradients.height(),
        data: edges.gradients.magnitudes(),
    };
    let tiles: Vec<f64> = block_stats(&magnitude, 16, 16).iter().map(|b| b.mean).collect();
    Measurement::new(coefficient_of_variation(&tiles))
}

/// Hasler and Süsstrunk colourfulness.
fn colorfulness(pixels: &PixelBuffer) -> Measurement {
    let (rg, yb): (Vec<f64>, Vec<f64>) = sample_points(pixels, SAMPLE_TARGET)
        .map(|(x, y)| {
            let [r, g, b, _] = pixels.rgba(x, y);
            let (r, g, b) = (r as f64, g as f64, b as f64);
            (r - g, 0.5 * (r + g) - b)
        })
        .unzip();
    let spread = std_dev(&rg).hypot(std_dev(&yb));
    let offset = mean(&rg).hypot(mean(&yb));
    Measurement::new(spread + 0.3 * offset)
}

fn midtone_concentration(pixels: &PixelBuffer) -> Measurement {
    let hist = Histogram::of(pixels, Channel::Luma, SAMPLE_TARGET);
    let midtones: u64 = hist.bins[64..=192].iter().sum();
    Measurement::new(midtones as f64 / hist.total.max(1) as f64)
}

fn exposure_balance(pixels: &PixelBuffer) -> Measurement {
    let brightness = mean(&sample_values(pixels, Channel::Luma, SAMPLE_TARGET));
    Measurement::new((brightness - 128.0).abs() / 128.0).with("mean_luma", brightness)
}

/// Share of 16×16 tiles with visible texture.
fn detail_distribution(pixels: &PixelBuffer) -> Measurement {
    let tiles = block_stats(&Plane::luma(pixels), 16, 16);
    let detailed = tiles.iter().filter(|b| b.variance > 25.0).count();
    Measurement::new(detailed as f64 / tiles.len().max(1) as f64)
}

pub static SIGNALS: &[SignalDef] = &[
    SignalDef {
        id: "contrast_rms",
        name: "RMS Contrast",
        category: Category::Perceptual,
        weight: 0.7,
        min_size: 16,
        icon: "contrast",
        statistic: contrast_rms,
        bands: &[(0.05, 60.0), (0.15, 45.0), (0.25, 35.0)],
        otherwise: 55.0,
        ai_text: "Contrast is either washed out or strongly boosted",
        real_text: "Contrast typical of a straight capture",
    },
    SignalDef {
        id: "dynamic_range",
        name: "Dynamic Range",
        category: Category::Perceptual,
        weight: 0.7,
        min_size: 16,
        icon: "sun",
        statistic: dynamic_range,
        bands: &[(40.0, 60.0), (120.0, 45.0), (220.0, 35.0)],
        otherwise: 55.0,
        ai_text: "Tonal range is compressed or stretched to the limits",
        real_text: "Tonal range typical of a real exposure",
    },
    SignalDef {
        id: "sharpness_uniformity",
        name: "Sharpness Uniformity",
        category: Category::Perceptual,
        weight: 1.0,
        min_size: 32,
        icon: "aperture",
        statistic: sharpness_uniformity,
        bands: &[(0.3, 70.0), (0.7, 52.0), (1.2, 35.0)],
        otherwise: 40.0,
        ai_text: "Sharpness is the same everywhere in the frame",
        real_text: "Sharpness varies with distance from the focal plane",
    },
    SignalDef {
        id: "colorfulness",
        name: "Colourfulness",
        category: Category::Perceptual,
        weight: 0.8,
        min_size: 16,
        icon: "droplet",
        statistic: colorfulness,
        bands: &[(15.0, 42.0), (45.0, 35.0), (80.0, 55.0)],
        otherwise: 72.0,
        ai_text: "Colour is more vivid than typical photographs",
        real_text: "Colourfulness within photographic range",
    },
    SignalDef {
        id: "midtone_concentration",
        name: "Midtone Concentration",
        category: Category::Perceptual,
        weight: 0.6,
        min_size: 16,
        icon: "bar-chart",
        statistic: midtone_concentration,
        bands: &[(0.5, 40.0), (0.75, 45.0), (0.92, 55.0)],
        otherwise: 65.0,
        ai_text: "Nearly all tones sit in the midrange",
        real_text: "Tones reach into shadows and highlights",
    },
    SignalDef {
        id: "exposure_balance",
        name: "Exposure Balance",
        category: Category::Perceptual,
        weight: 0.6,
        min_size: 16,
        icon: "sun",
        statistic: exposure_balance,
        bands: &[(0.05, 60.0), (0.2, 48.0), (0.45, 38.0)],
        otherwise: 45.0,
        ai_text: "Exposure is centred with textbook precision",
        real_text: "Exposure drifts as real scenes do",
    },
    SignalDef {
        id: "detail_distribution",
        name: "Detail Distribution",
        category: Category::Perceptual,
        weight: 0.9,
        min_size: 16,
        icon: "grid",
        statistic: detail_distribution,
        bands: &[(0.1, 68.0), (0.4, 50.0), (0.85, 35.0)],
        otherwise: 55.0,
        ai_text: "Most of the frame carries no texture",
        real_text: "Texture is present across most of the frame",
    },
];
