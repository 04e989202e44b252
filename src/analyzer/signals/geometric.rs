//! Geometric signals: symmetry, composition and lens geometry

use super::{EdgeMap, UNMEASURABLE};
use crate::analyzer::primitives::{balanced_ratio, mean, Channel, Plane, SAMPLE_TARGET};
use crate::analyzer::signal::{Category, Measurement, SignalDef};
use crate::pixels::PixelBuffer;
use std::f64::consts::{FRAC_PI_2, PI};

const ORTHOGONAL_TOLERANCE: f64 = 10.0 * PI / 180.0;

/// Mirror similarity in `[0, 1]`: 1 is a perfect mirror image.
fn mirror_similarity(plane: &Plane, horizontal: bool) -> Measurement {
    let spread = plane.variance().sqrt();
    if spread < 1e-6 {
        return Measurement::new(UNMEASURABLE);
    }
    let (w, h) = (plane.width, plane.height);
    let mut diffs = Vec::with_capacity(w * h / 2);
    if horizontal {
        for y in 0..h {
            for x in 0..w / 2 {
                diffs.push((plane.get(x, y) - plane.get(w - 1 - x, y)).abs());
            }
        }
    } else {
        for y in 0..h / 2 {
            for x in 0..w {
                diffs.push((plane.get(x, y) - plane.get(x, h - 1 - y)).abs());
            }
        }
    }
    let mad = mean(&diffs);
    Measurement::new((1.0 - mad / (2.0 * spread)).clamp(0.0, 1.0)).with("mean_abs_diff", mad)
}

fn symmetry(pixels: &PixelBuffer) -> Measurement {
    mirror_similarity(&Plane::luma(pixels), true)
}

fn vertical_symmetry(pixels: &PixelBuffer) -> Measurement {
    mirror_similarity(&Plane::luma(pixels), false)
}

fn is_orthogonal(theta: f64) -> bool {
    theta < ORTHOGONAL_TOLERANCE || theta > PI - ORTHOGONAL_TOLERANCE || (theta - FRAC_PI_2).abs() < ORTHOGONAL_TOLERANCE
}

fn orthogonal_edge_ratio(pixels: &PixelBuffer) -> Measurement {
    let edges = EdgeMap::of(pixels);
    if edges.points.len() < 16 {
        return Measurement::new(UNMEASURABLE);
    }
    let orthogonal = edges
        .points
        .iter()
        .filter(|&&(x, y)| is_orthogonal(edges.gradients.orientation(x, y)))
        .count();
    Measurement::new(orthogonal as f64 / edges.points.len() as f64)
}

/// Mean L1 distance between each quadrant's orientation histogram and the global one.
fn perspective_consistency(pixels: &PixelBuffer) -> Measurement {
    const BINS: usize = 9;
    let edges = EdgeMap::of(pixels);
    let (w, h) = (edges.gradients.width(), edges.gradients.height());
    let mut quadrants = [[0u64; BINS]; 4];
    let mut global = [0u64; BINS];
    for &(x, y) in &edges.points {
        let bin = ((edges.gradients.orientation(x, y) / PI * BINS as f64) as usize).min(BINS - 1);
        let quadrant = (x * 2 / w).min(1) + 2 * (y * 2 / h).min(1);
        quadrants[quadrant][bin] += 1;
        global[bin] += 1;
    }
    let normalize = |hist: &[u64; BINS]| {
        let total = hist.iter().sum::<u64>().max(1) as f64;
        hist.map(|c| c as f64 / total)
    };
    let reference = normalize(&global);
    let distances: Vec<f64> = quadrants
        .iter()
        .filter(|q| q.iter().sum::<u64>() >= 8)
        .map(|q| {
            normalize(q)
                .iter()
                .zip(&reference)
                .map(|(a, b)| (a - b).abs())
                .sum::<f64>()
        })
        .collect();
    if distances.len() < 2 {
        return Measurement::new(UNMEASURABLE);
    }
    Measurement::new(mean(&distances)).with("quadrants", distances.len() as f64)
}

/// Gradient energy in the central third relative to the whole crop.
fn center_bias(pixels: &PixelBuffer) -> Measurement {
    let edges = EdgeMap::of(pixels);
    let (w, h) = (edges.gradients.width(), edges.gradients.height());
    let magnitudes = edges.gradients.magnitudes();
    let mut center = Vec::new();
    for y in h / 3..2 * h / 3 {
        for x in w / 3..2 * w / 3 {
            center.push(magnitudes[y * w + x]);
        }
    }
    Measurement::new(balanced_ratio(mean(&center), mean(&magnitudes)))
}

/// Relative brightness drop from the centre to the corners of the whole frame.
fn vignetting(pixels: &PixelBuffer) -> Measurement {
    let plane = Plane::sampled(pixels, Channel::Luma, SAMPLE_TARGET);
    let (w, h) = (plane.width, plane.height);
    let center = plane.region(w / 4, h / 4, w / 2, h / 2).mean();
    let (cw, ch) = ((w / 4).max(1), (h / 4).max(1));
    let corners = [
        plane.region(0, 0, cw, ch).mean(),
        plane.region(w - cw, 0, cw, ch).mean(),
        plane.region(0, h - ch, cw, ch).mean(),
        plane.region(w - cw, h - ch, cw, ch).mean(),
    ];
    let corner = mean(&corners);
    Measurement::new((center - corner) / (center + 1.0))
        .with("center", center)
        .with("corners", corner)
}

/// Share of edge pixels with at least two edge neighbours.
fn edge_continuity(pixels: &PixelBuffer) -> Measurement {
    let edges = EdgeMap::of(pixels);
    if edges.points.len() < 16 {
        return Measurement::new(UNMEASURABLE);
    }
    let w = edges.gradients.width();
    let mut mask = vec![false; w * edges.gradients.height()];
    for &(x, y) in &edges.points {
        mask[y * w + x] = true;
    }
    let connected = edges
        .points
        .iter()
        .filter(|&&(x, y)| {
            let mut neighbours = 0;
            for ny in y - 1..=y + 1 {
                for nx in x - 1..=x + 1 {
                    if (nx, ny) != (x, y) && mask[ny * w + nx] {
                        neighbours += 1;
                    }
                }
            }
            neighbours >= 2
        })
        .count();
    Measurement::new(connected as f64 / edges.points.len() as f64)
}

pub static SIGNALS: &[SignalDef] = &[
    SignalDef {
        id: "symmetry",
        name: "Left-Right Symmetry",
        category: Category::Geometric,
        weight: 0.8,
        min_size: 16,
        icon: "columns",
        statistic: symmetry,
        bands: &[(0.0, 50.0), (0.3, 40.0), (0.6, 45.0), (0.85, 60.0)],
        otherwise: 75.0,
        ai_text: "Composition is close to mirror-symmetric",
        real_text: "No unnatural mirror symmetry",
    },
    SignalDef {
        id: "vertical_symmetry",
        name: "Top-Bottom Symmetry",
        category: Category::Geometric,
        weight: 0.6,
        min_size: 16,
        icon: "columns",
        statistic: vertical_symmetry,
        bands: &[(0.0, 50.0), (0.3, 40.0), (0.6, 45.0), (0.85, 60.0)],
        otherwise: 75.0,
        ai_text: "Top and bottom halves mirror each other",
        real_text: "No top-bottom mirroring",
    },
    SignalDef {
        id: "orthogonal_edge_ratio",
        name: "Orthogonal Edges",
        category: Category::Geometric,
        weight: 0.7,
        min_size: 16,
        icon: "square",
        statistic: orthogonal_edge_ratio,
        bands: &[(0.0, 50.0), (0.2, 55.0), (0.4, 45.0), (0.6, 38.0)],
        otherwise: 45.0,
        ai_text: "Few straight horizontal or vertical structures",
        real_text: "Straight structures aligned with the frame",
    },
    SignalDef {
        id: "perspective_consistency",
        name: "Perspective Consistency",
        category: Category::Geometric,
        weight: 0.9,
        min_size: 32,
        icon: "box",
        statistic: perspective_consistency,
        bands: &[(0.0, 50.0), (0.3, 35.0), (0.6, 48.0), (1.0, 62.0)],
        otherwise: 72.0,
        ai_text: "Edge directions disagree between parts of the frame",
        real_text: "Edge directions agree across the frame",
    },
    SignalDef {
        id: "center_bias",
        name: "Centre Bias",
        category: Category::Geometric,
        weight: 0.7,
        min_size: 16,
        icon: "target",
        statistic: center_bias,
        bands: &[(0.8, 40.0), (1.3, 48.0), (2.0, 60.0)],
        otherwise: 72.0,
        ai_text: "Detail is concentrated in the centre of the frame",
        real_text: "Detail is spread across the frame",
    },
    SignalDef {
        id: "vignetting",
        name: "Vignetting",
        category: Category::Geometric,
        weight: 0.9,
        min_size: 32,
        icon: "aperture",
        statistic: vignetting,
        bands: &[(-0.05, 55.0), (0.02, 58.0), (0.08, 45.0)],
        otherwise: 35.0,
        ai_text: "Corners are as bright as the centre",
        real_text: "Corners fall off like a real lens",
    },
    SignalDef {
        id: "edge_continuity",
        name: "Edge Continuity",
        category: Category::Geometric,
        weight: 0.8,
        min_size: 16,
        icon: "git-commit",
        statistic: edge_continuity,
        bands: &[(0.0, 50.0), (0.4, 65.0), (0.7, 50.0), (0.9, 35.0)],
        otherwise: 45.0,
        ai_text: "Edges break into fragments",
        real_text: "Edges form continuous contours",
    },
];
