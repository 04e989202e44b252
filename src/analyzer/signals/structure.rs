//! Structural signals
//!
//! These look at how the image is organised at region level: duplicated
//! patches, fractal edge structure, large homogeneous areas and how edges
//! behave across scales.

use super::{EdgeMap, UNMEASURABLE};
use crate::analyzer::primitives::{balanced_ratio, linear_fit, mean, std_dev, Plane};
use crate::analyzer::signal::{Category, Measurement, SignalDef};
use crate::pixels::PixelBuffer;
use std::f64::consts::PI;

const PATCH: usize = 8;
const MAX_PATCHES: usize = 128;

/// Share of textured 8×8 patches that have a near-duplicate elsewhere.
fn self_similarity(pixels: &PixelBuffer) -> Measurement {
    let plane = Plane::luma(pixels);
    let mut patches: Vec<Vec<f64>> = Vec::new();
    for by in (0..plane.height / PATCH).map(|i| i * PATCH) {
        for bx in (0..plane.width / PATCH).map(|i| i * PATCH) {
            let patch = plane.region(bx, by, PATCH, PATCH).data;
            let m = mean(&patch);
            let var = patch.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / patch.len() as f64;
            if var > 4.0 {
                patches.push(patch);
            }
        }
    }
    if patches.len() < 2 {
        return Measurement::new(UNMEASURABLE);
    }
    let step = patches.len().div_ceil(MAX_PATCHES);
    let patches: Vec<Vec<f64>> = patches.into_iter().step_by(step).collect();
    let mut duplicated = vec![false; patches.len()];
    for i in 0..patches.len() {
        for j in i + 1..patches.len() {
            let mad = patches[i]
                .iter()
                .zip(&patches[j])
                .map(|(a, b)| (a - b).abs())
                .sum::<f64>()
                / (PATCH * PATCH) as f64;
            if mad < 2.0 {
                duplicated[i] = true;
                duplicated[j] = true;
            }
        }
    }
    let count = duplicated.iter().filter(|&&d| d).count();
    Measurement::new(count as f64 / patches.len() as f64).with("textured_patches", patches.len() as f64)
}

/// Box-counting dimension of the edge map.
fn fractal_dimension(pixels: &PixelBuffer) -> Measurement {
    let edges = EdgeMap::of(pixels);
    let (w, h) = (edges.gradients.width(), edges.gradients.height());
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for size in [2usize, 4, 8, 16] {
        let cols = w.div_ceil(size);
        let mut boxes = vec![false; cols * h.div_ceil(size)];
        for &(x, y) in &edges.points {
            boxes[(y / size) * cols + x / size] = true;
        }
        let occupied = boxes.iter().filter(|&&b| b).count();
        if occupied > 0 {
            xs.push((1.0 / size as f64).ln());
            ys.push((occupied as f64).ln());
        }
    }
    if xs.len() < 3 {
        return Measurement::new(UNMEASURABLE);
    }
    match linear_fit(&xs, &ys) {
        Some((slope, _, _)) => Measurement::new(slope),
        None => Measurement::new(UNMEASURABLE),
    }
}

/// Share of horizontal neighbour pairs that differ by less than one level.
fn region_homogeneity(pixels: &PixelBuffer) -> Measurement {
    let plane = Plane::luma(pixels);
    let mut similar = 0usize;
    let mut pairs = 0usize;
    for y in 0..plane.height {
        for x in 1..plane.width {
            if (plane.get(x, y) - plane.get(x - 1, y)).abs() < 1.0 {
                similar += 1;
            }
            pairs += 1;
        }
    }
    Measurement::new(similar as f64 / pairs.max(1) as f64)
}

fn split_depth(plane: &Plane, x0: usize, y0: usize, size: usize, level: usize) -> f64 {
    let region = plane.region(x0, y0, size, size);
    if size / 2 < 4 || region.variance() <= 25.0 {
        return (size * size * level) as f64;
    }
    let half = size / 2;
    split_depth(plane, x0, y0, half, level + 1)
        + split_depth(plane, x0 + half, y0, half, level + 1)
        + split_depth(plane, x0, y0 + half, half, level + 1)
        + split_depth(plane, x0 + half, y0 + half, half, level + 1)
}

/// Area-weighted mean leaf depth of a variance-driven quadtree.
fn quadtree_depth(pixels: &PixelBuffer) -> Measurement {
    let plane = Plane::luma(pixels);
    let side = plane.width.min(plane.height);
    let size = 1usize << (usize::BITS - 1 - side.leading_zeros());
    let depth = split_depth(&plane, 0, 0, size, 0) / (size * size) as f64;
    Measurement::new(depth).with("root_size", size as f64)
}

fn angular_difference(a: f64, b: f64) -> f64 {
    let d = (a - b).abs();
    d.min(PI - d)
}

/// Mean orientation change between neighbouring edge pixels.
fn boundary_smoothness(pixels: &PixelBuffer) -> Measurement {
    let edges = EdgeMap::of(pixels);
    let (w, h) = (edges.gradients.width(), edges.gradients.height());
    let mut mask = vec![false; w * h];
    for &(x, y) in &edges.points {
        mask[y * w + x] = true;
    }
    let mut turns = Vec::new();
    for &(x, y) in &edges.points {
        let here = edges.gradients.orientation(x, y);
        for (nx, ny) in [(x + 1, y), (x, y + 1)] {
            if nx < w && ny < h && mask[ny * w + nx] {
                turns.push(angular_difference(here, edges.gradients.orientation(nx, ny)));
            }
        }
    }
    if turns.is_empty() {
        return Measurement::new(UNMEASURABLE);
    }
    Measurement::new(mean(&turns)).with("pairs", turns.len() as f64)
}

/// Residual energy after halving resolution, relative to full resolution.
fn multi_scale_consistency(pixels: &PixelBuffer) -> Measurement {
    let plane = Plane::luma(pixels);
    let fine = std_dev(&plane.residual().data);
    let coarse = std_dev(&plane.downsample2().residual().data);
    Measurement::new(balanced_ratio(coarse, fine))
        .with("fine", fine)
        .with("coarse", coarse)
}

/// Share of edges with an overshoot two pixels out on either side.
fn object_edge_halo(pixels: &PixelBuffer) -> Measurement {
    let edges = EdgeMap::of(pixels);
    if edges.points.is_empty() {
        return Measurement::new(UNMEASURABLE);
    }
    let plane = &edges.plane;
    let sample = |x: usize, y: usize, dx: f64, dy: f64, t: f64| {
        plane.get_clamped(
            (x as f64 + dx * t).round() as isize,
            (y as f64 + dy * t).round() as isize,
        )
    };
    let mut halos = 0usize;
    for &(x, y) in &edges.points {
        let magnitude = edges.gradients.magnitude(x, y);
        let dx = edges.gradients.gx.get(x, y) / magnitude;
        let dy = edges.gradients.gy.get(x, y) / magnitude;
        let bright_overshoot = sample(x, y, dx, dy, 2.0) > sample(x, y, dx, dy, 4.0) + 3.0;
        let dark_undershoot = sample(x, y, dx, dy, -2.0) < sample(x, y, dx, dy, -4.0) - 3.0;
        if bright_overshoot || dark_undershoot {
            halos += 1;
        }
    }
    Measurement::new(halos as f64 / edges.points.len() as f64)
}

pub static SIGNALS: &[SignalDef] = &[
    SignalDef {
        id: "self_similarity",
        name: "Self-Similarity",
        category: Category::Structure,
        weight: 1.2,
        min_size: 32,
        icon: "copy",
        statistic: self_similarity,
        bands: &[(0.0, 50.0), (0.01, 35.0), (0.05, 50.0), (0.15, 65.0)],
        otherwise: 80.0,
        ai_text: "Textured patches repeat almost exactly",
        real_text: "No duplicated textured patches",
    },
    SignalDef {
        id: "fractal_dimension",
        name: "Fractal Dimension",
        category: Category::Structure,
        weight: 0.9,
        min_size: 32,
        icon: "share-2",
        statistic: fractal_dimension,
        bands: &[(0.0, 50.0), (1.2, 68.0), (1.45, 55.0), (1.8, 32.0)],
        otherwise: 45.0,
        ai_text: "Edge structure is simpler than natural scenes",
        real_text: "Edge structure has natural fractal complexity",
    },
    SignalDef {
        id: "region_homogeneity",
        name: "Region Homogeneity",
        category: Category::Structure,
        weight: 1.0,
        min_size: 16,
        icon: "square",
        statistic: region_homogeneity,
        bands: &[(0.1, 35.0), (0.3, 45.0), (0.6, 60.0)],
        otherwise: 75.0,
        ai_text: "Large regions are perfectly uniform",
        real_text: "Regions carry small natural variations",
    },
    SignalDef {
        id: "quadtree_depth",
        name: "Quadtree Depth",
        category: Category::Structure,
        weight: 0.9,
        min_size: 16,
        icon: "grid",
        statistic: quadtree_depth,
        bands: &[(0.5, 72.0), (1.5, 60.0), (3.0, 42.0)],
        otherwise: 35.0,
        ai_text: "Image decomposes into few large uniform blocks",
        real_text: "Detail forces a deep decomposition",
    },
    SignalDef {
        id: "boundary_smoothness",
        name: "Boundary Smoothness",
        category: Category::Structure,
        weight: 0.8,
        min_size: 16,
        icon: "pen-tool",
        statistic: boundary_smoothness,
        bands: &[(0.0, 50.0), (0.1, 68.0), (0.3, 52.0), (0.6, 38.0)],
        otherwise: 45.0,
        ai_text: "Object boundaries are unnaturally smooth",
        real_text: "Object boundaries have natural irregularity",
    },
    SignalDef {
        id: "multi_scale_consistency",
        name: "Multi-Scale Consistency",
        category: Category::Structure,
        weight: 0.9,
        min_size: 32,
        icon: "layers",
        statistic: multi_scale_consistency,
        bands: &[(0.7, 38.0), (1.2, 50.0), (2.0, 58.0)],
        otherwise: 68.0,
        ai_text: "Fine scale is cleaner than coarse scale",
        real_text: "Noise and detail are consistent across scales",
    },
    SignalDef {
        id: "object_edge_halo",
        name: "Edge Halo",
        category: Category::Structure,
        weight: 0.7,
        min_size: 16,
        icon: "sun",
        statistic: object_edge_halo,
        bands: &[(0.0, 50.0), (0.1, 55.0), (0.3, 45.0), (0.5, 38.0)],
        otherwise: 60.0,
        ai_text: "Edges carry halos from synthetic sharpening",
        real_text: "Edges are free of strong halos",
    },
];
