//! Spatial-domain signals: edges, local variance and sharpness

use super::{EdgeMap, UNMEASURABLE};
use crate::analyzer::primitives::{
    balanced_ratio, block_stats, coefficient_of_variation, entropy_of, percentile, plane_autocorrelation, Axis,
    Plane, MAX_LAG,
};
use crate::analyzer::signal::{Category, Measurement, SignalDef};
use crate::pixels::PixelBuffer;

fn edge_density(pixels: &PixelBuffer) -> Measurement {
    let edges = EdgeMap::of(pixels);
    let interior = edges.interior();
    if interior == 0 {
        return Measurement::new(UNMEASURABLE);
    }
    Measurement::new(edges.points.len() as f64 / interior as f64).with("edge_pixels", edges.points.len() as f64)
}

fn edge_sharpness_consistency(pixels: &PixelBuffer) -> Measurement {
    let edges = EdgeMap::of(pixels);
    if edges.points.len() < 2 {
        return Measurement::new(UNMEASURABLE);
    }
    let magnitudes: Vec<f64> = edges
        .points
        .iter()
        .map(|&(x, y)| edges.gradients.magnitude(x, y))
        .collect();
    Measurement::new(coefficient_of_variation(&magnitudes))
}

fn local_variance_cv(pixels: &PixelBuffer) -> Measurement {
    let variances: Vec<f64> = block_stats(&Plane::luma(pixels), 8, 8)
        .iter()
        .map(|b| b.variance)
        .collect();
    Measurement::new(coefficient_of_variation(&variances))
}

/// Normalised entropy of edge orientations in 18 bins of 10°.
fn gradient_direction_entropy(pixels: &PixelBuffer) -> Measurement {
    const BINS: usize = 18;
    let edges = EdgeMap::of(pixels);
    if edges.points.len() < 16 {
        return Measurement::new(UNMEASURABLE);
    }
    let hist = edges.orientation_histogram(BINS);
    Measurement::new(entropy_of(&hist) / (BINS as f64).log2())
}

/// Spread between the sharpest and softest tiles, in log units.
fn depth_of_field(pixels: &PixelBuffer) -> Measurement {
    let laplacian = Plane::luma(pixels).laplacian();
    let variances: Vec<f64> = block_stats(&laplacian, 16, 16).iter().map(|b| b.variance).collect();
    if variances.is_empty() {
        return Measurement::new(UNMEASURABLE);
    }
    let sharp = percentile(&variances, 0.9);
    let soft = percentile(&variances, 0.1);
    Measurement::new(balanced_ratio(sharp, soft).ln())
        .with("sharp_tile", sharp)
        .with("soft_tile", soft)
}

fn laplacian_variance(pixels: &PixelBuffer) -> Measurement {
    Measurement::new(Plane::luma(pixels).laplacian().variance())
}

/// Strongest autocorrelation at lag ≥ 4 on either axis.
fn texture_repetition(pixels: &PixelBuffer) -> Measurement {
    let plane = Plane::luma(pixels);
    let max_lag = (plane.width.min(plane.height) / 2).min(MAX_LAG);
    let peak = [Axis::Horizontal, Axis::Vertical]
        .into_iter()
        .filter_map(|axis| plane_autocorrelation(&plane, axis, max_lag))
        .flat_map(|acf| acf.into_iter().skip(4))
        .fold(None, |best: Option<f64>, v| Some(best.map_or(v, |b| b.max(v))));
    match peak {
        Some(peak) => Measurement::new(peak.max(0.0)).with("peak", peak),
        None => Measurement::new(UNMEASURABLE),
    }
}

pub static SIGNALS: &[SignalDef] = &[
    SignalDef {
        id: "edge_density",
        name: "Edge Density",
        category: Category::Spatial,
        weight: 1.2,
        min_size: 16,
        icon: "scissors",
        statistic: edge_density,
        bands: &[(0.0, 50.0), (0.01, 72.0), (0.05, 58.0), (0.2, 35.0)],
        otherwise: 45.0,
        ai_text: "Very few edges; surfaces are unusually smooth",
        real_text: "Edge density typical of a photographed scene",
    },
    SignalDef {
        id: "edge_sharpness_consistency",
        name: "Edge Sharpness Consistency",
        category: Category::Spatial,
        weight: 1.0,
        min_size: 16,
        icon: "scissors",
        statistic: edge_sharpness_consistency,
        bands: &[(0.0, 50.0), (0.2, 70.0), (0.4, 55.0), (0.8, 35.0)],
        otherwise: 40.0,
        ai_text: "Every edge has nearly the same sharpness",
        real_text: "Edge sharpness varies with depth and focus",
    },
    SignalDef {
        id: "local_variance_cv",
        name: "Local Variance Spread",
        category: Category::Spatial,
        weight: 1.1,
        min_size: 16,
        icon: "grid",
        statistic: local_variance_cv,
        bands: &[(0.3, 70.0), (0.8, 55.0), (2.0, 35.0)],
        otherwise: 45.0,
        ai_text: "Local detail is unnaturally homogeneous",
        real_text: "Local detail varies like a real scene",
    },
    SignalDef {
        id: "gradient_direction_entropy",
        name: "Gradient Direction Entropy",
        category: Category::Spatial,
        weight: 0.8,
        min_size: 16,
        icon: "compass",
        statistic: gradient_direction_entropy,
        bands: &[(0.0, 50.0), (0.6, 40.0), (0.9, 30.0), (0.97, 50.0)],
        otherwise: 65.0,
        ai_text: "Edge directions are spread with no dominant structure",
        real_text: "Edge directions follow the scene's structure",
    },
    SignalDef {
        id: "depth_of_field",
        name: "Depth of Field",
        category: Category::Spatial,
        weight: 1.0,
        min_size: 32,
        icon: "aperture",
        statistic: depth_of_field,
        bands: &[(0.0, 50.0), (0.5, 65.0), (2.0, 50.0), (5.0, 35.0)],
        otherwise: 40.0,
        ai_text: "Focus is uniform across the frame",
        real_text: "Focus falls off like a real lens",
    },
    SignalDef {
        id: "laplacian_variance",
        name: "Laplacian Variance",
        category: Category::Spatial,
        weight: 1.0,
        min_size: 16,
        icon: "aperture",
        statistic: laplacian_variance,
        bands: &[(5.0, 75.0), (50.0, 58.0), (500.0, 35.0)],
        otherwise: 45.0,
        ai_text: "Image is soft with little fine structure",
        real_text: "Fine structure consistent with optical capture",
    },
    SignalDef {
        id: "texture_repetition",
        name: "Texture Repetition",
        category: Category::Spatial,
        weight: 1.1,
        min_size: 32,
        icon: "copy",
        statistic: texture_repetition,
        bands: &[(0.0, 50.0), (0.3, 35.0), (0.6, 50.0), (0.8, 65.0)],
        otherwise: 80.0,
        ai_text: "Texture repeats at regular offsets",
        real_text: "No repeated texture tiles",
    },
];
