//! Statistical signals over tone histograms and value distributions

use super::{EdgeMap, UNMEASURABLE};
use crate::analyzer::primitives::{
    benford_divergence, excess_kurtosis, pearson, safe_div, sample_values, skewness, Channel,
    Histogram, Plane, SAMPLE_TARGET,
};
use crate::analyzer::signal::{Category, Measurement, SignalDef};
use crate::pixels::PixelBuffer;

fn luma_histogram(pixels: &PixelBuffer) -> Histogram {
    Histogram::of(pixels, Channel::Luma, SAMPLE_TARGET)
}

/// Empty bins inside the occupied tonal range, as a share of that range.
fn histogram_gaps(pixels: &PixelBuffer) -> Measurement {
    let hist = luma_histogram(pixels);
    match hist.range() {
        Some((lo, hi)) => {
            let gaps = hist.gap_count();
            Measurement::new(gaps as f64 / (hi - lo + 1) as f64).with("gaps", gaps as f64)
        }
        None => Measurement::new(UNMEASURABLE),
    }
}

fn histogram_entropy(pixels: &PixelBuffer) -> Measurement {
    let hist = luma_histogram(pixels);
    Measurement::new(hist.entropy()).with("occupied_bins", hist.occupied() as f64)
}

/// One minus the mean pairwise RGB correlation.
fn channel_correlation(pixels: &PixelBuffer) -> Measurement {
    let r = sample_values(pixels, Channel::Red, SAMPLE_TARGET);
    let g = sample_values(pixels, Channel::Green, SAMPLE_TARGET);
    let b = sample_values(pixels, Channel::Blue, SAMPLE_TARGET);
    let pairs: Vec<f64> = [pearson(&r, &g), pearson(&g, &b), pearson(&r, &b)]
        .into_iter()
        .flatten()
        .collect();
    if pairs.is_empty() {
        return Measurement::new(UNMEASURABLE);
    }
    let correlation = pairs.iter().sum::<f64>() / pairs.len() as f64;
    Measurement::new(1.0 - correlation).with("correlation", correlation)
}

fn luminance_skewness(pixels: &PixelBuffer) -> Measurement {
    let skew = skewness(&sample_values(pixels, Channel::Luma, SAMPLE_TARGET));
    Measurement::new(skew.abs()).with("skewness", skew)
}

fn luminance_kurtosis(pixels: &PixelBuffer) -> Measurement {
    Measurement::new(excess_kurtosis(&sample_values(pixels, Channel::Luma, SAMPLE_TARGET)))
}

/// Gradient magnitudes of camera images follow Benford's law closely.
fn benford_deviation(pixels: &PixelBuffer) -> Measurement {
    let edges = EdgeMap::of(pixels);
    match benford_divergence(edges.gradients.magnitudes()) {
        Some(divergence) => Measurement::new(divergence),
        None => Measurement::new(UNMEASURABLE),
    }
}

fn tonal_extremes(pixels: &PixelBuffer) -> Measurement {
    let hist = luma_histogram(pixels);
    let clipped: u64 = hist.bins[..=2].iter().chain(&hist.bins[253..]).sum();
    Measurement::new(safe_div(clipped as f64, hist.total as f64))
}

/// How far neighbouring least significant bits are from coin flips.
fn bit_plane_randomness(pixels: &PixelBuffer) -> Measurement {
    let plane = Plane::sampled(pixels, Channel::Green, SAMPLE_TARGET);
    let mut equal = 0usize;
    let mut pairs = 0usize;
    for y in 0..plane.height {
        for x in 1..plane.width {
            let a = plane.get(x - 1, y) as u8 & 1;
            let b = plane.get(x, y) as u8 & 1;
            if a == b {
                equal += 1;
            }
            pairs += 1;
        }
    }
    if pairs == 0 {
        return Measurement::new(UNMEASURABLE);
    }
    let agreement = equal as f64 / pairs as f64;
    Measurement::new((agreement - 0.5).abs() * 2.0).with("agreement", agreement)
}

/// Mean absolute second difference of the histogram over its occupied range.
fn histogram_smoothness(pixels: &PixelBuffer) -> Measurement {
    let hist = luma_histogram(pixels);
    let Some((lo, hi)) = hist.range() else {
        return Measurement::new(UNMEASURABLE);
    };
    if hi - lo < 2 {
        return Measurement::new(UNMEASURABLE);
    }
    let bins: Vec<f64> = hist.bins[lo..=hi].iter().map(|&c| c as f64).collect();
    let roughness: f64 = bins.windows(3).map(|w| (w[0] - 2.0 * w[1] + w[2]).abs()).sum();
    Measurement::new(safe_div(roughness, bins.iter().sum()))
}

pub static SIGNALS: &[SignalDef] = &[
    SignalDef {
        id: "histogram_gaps",
        name: "Histogram Gaps",
        category: Category::Statistical,
        weight: 1.0,
        min_size: 16,
        icon: "bar-chart",
        statistic: histogram_gaps,
        bands: &[(0.0, 50.0), (0.001, 60.0), (0.05, 45.0), (0.2, 35.0)],
        otherwise: 30.0,
        ai_text: "Tone histogram is gap-free, as generated output usually is",
        real_text: "Tone histogram shows the combing left by camera processing",
    },
    SignalDef {
        id: "histogram_entropy",
        name: "Histogram Entropy",
        category: Category::Statistical,
        weight: 0.9,
        min_size: 16,
        icon: "bar-chart",
        statistic: histogram_entropy,
        bands: &[(4.0, 75.0), (6.0, 60.0), (7.2, 35.0), (7.7, 45.0)],
        otherwise: 55.0,
        ai_text: "Tonal distribution is narrow or suspiciously even",
        real_text: "Tonal distribution has natural richness",
    },
    SignalDef {
        id: "channel_correlation",
        name: "Channel Correlation",
        category: Category::Statistical,
        weight: 1.1,
        min_size: 16,
        icon: "layers",
        statistic: channel_correlation,
        bands: &[(0.0, 50.0), (0.02, 70.0), (0.08, 50.0), (0.3, 30.0)],
        otherwise: 45.0,
        ai_text: "Colour channels move together almost perfectly",
        real_text: "Colour channels decorrelate like sensor data",
    },
    SignalDef {
        id: "luminance_skewness",
        name: "Luminance Skewness",
        category: Category::Statistical,
        weight: 0.7,
        min_size: 16,
        icon: "bar-chart",
        statistic: luminance_skewness,
        bands: &[(0.1, 62.0), (0.5, 48.0), (1.5, 35.0)],
        otherwise: 45.0,
        ai_text: "Brightness distribution is unusually symmetric",
        real_text: "Brightness distribution is skewed like real lighting",
    },
    SignalDef {
        id: "luminance_kurtosis",
        name: "Luminance Kurtosis",
        category: Category::Statistical,
        weight: 0.7,
        min_size: 16,
        icon: "bar-chart",
        statistic: luminance_kurtosis,
        bands: &[(-1.2, 40.0), (-0.3, 50.0), (0.5, 58.0), (3.0, 40.0)],
        otherwise: 35.0,
        ai_text: "Brightness distribution is close to an idealised bell",
        real_text: "Brightness distribution has natural tails",
    },
    SignalDef {
        id: "benford_deviation",
        name: "Benford Deviation",
        category: Category::Statistical,
        weight: 1.2,
        min_size: 16,
        icon: "hash",
        statistic: benford_deviation,
        bands: &[(0.0, 50.0), (0.05, 25.0), (0.12, 40.0), (0.25, 60.0)],
        otherwise: 75.0,
        ai_text: "Gradient magnitudes deviate from Benford's law",
        real_text: "Gradient magnitudes follow Benford's law",
    },
    SignalDef {
        id: "tonal_extremes",
        name: "Tonal Extremes",
        category: Category::Statistical,
        weight: 0.6,
        min_size: 16,
        icon: "sun",
        statistic: tonal_extremes,
        bands: &[(0.001, 58.0), (0.02, 45.0), (0.1, 35.0)],
        otherwise: 40.0,
        ai_text: "No clipped shadows or highlights anywhere",
        real_text: "Clipped shadows or highlights, typical of real exposures",
    },
    SignalDef {
        id: "bit_plane_randomness",
        name: "Bit-Plane Randomness",
        category: Category::Statistical,
        weight: 1.0,
        min_size: 16,
        icon: "cpu",
        statistic: bit_plane_randomness,
        bands: &[(0.0, 50.0), (0.05, 30.0), (0.2, 45.0), (0.5, 62.0)],
        otherwise: 75.0,
        ai_text: "Least significant bits are structured rather than noisy",
        real_text: "Least significant bits look like sensor noise",
    },
    SignalDef {
        id: "histogram_smoothness",
        name: "Histogram Smoothness",
        category: Category::Statistical,
        weight: 0.8,
        min_size: 16,
        icon: "bar-chart",
        statistic: histogram_smoothness,
        bands: &[(0.0, 50.0), (0.2, 70.0), (0.6, 50.0), (1.2, 35.0)],
        otherwise: 45.0,
        ai_text: "Histogram is smoother than sensor quantisation allows",
        real_text: "Histogram has the jaggedness of captured data",
    },
];
