//! Compression-history signals
//!
//! Camera output almost always went through a JPEG encoder: 8×8 block
//! boundaries, quantised DCT coefficients and subsampled chroma. Generator
//! output is usually saved losslessly and shows none of that.

use super::{residual_plane, EdgeMap, UNMEASURABLE};
use crate::analyzer::primitives::{
    balanced_ratio, benford_divergence, block_stats, dct_blocks, luminance, mean, safe_div, std_dev, Channel,
    Plane, MAX_CROP,
};
use crate::analyzer::signal::{Category, Measurement, SignalDef};
use crate::pixels::PixelBuffer;

const MAX_DCT_BLOCKS: usize = 256;

/// Luma crop whose origin sits on the encoder's 8×8 grid.
fn grid_aligned_luma(pixels: &PixelBuffer) -> Plane {
    let w = pixels.width().min(MAX_CROP);
    let h = pixels.height().min(MAX_CROP);
    let x0 = ((pixels.width() - w) / 2) & !7;
    let y0 = ((pixels.height() - h) / 2) & !7;
    let mut plane = Plane::new(w as usize, h as usize);
    for y in 0..h {
        for x in 0..w {
            let [r, g, b, _] = pixels.rgba(x0 + x, y0 + y);
            plane.data[(y * w + x) as usize] = luminance(r, g, b);
        }
    }
    plane
}

/// Mean step across block boundaries over mean step inside blocks.
fn jpeg_blockiness(pixels: &PixelBuffer) -> Measurement {
    let plane = grid_aligned_luma(pixels);
    let mut boundary = (0.0, 0usize);
    let mut inner = (0.0, 0usize);
    let mut step = |at_boundary: bool, d: f64| {
        let slot = if at_boundary { &mut boundary } else { &mut inner };
        slot.0 += d;
        slot.1 += 1;
    };
    for y in 0..plane.height {
        for x in 1..plane.width {
            step(x % 8 == 0, (plane.get(x, y) - plane.get(x - 1, y)).abs());
        }
    }
    for y in 1..plane.height {
        for x in 0..plane.width {
            step(y % 8 == 0, (plane.get(x, y) - plane.get(x, y - 1)).abs());
        }
    }
    let boundary = safe_div(boundary.0, boundary.1 as f64);
    let inner = safe_div(inner.0, inner.1 as f64);
    Measurement::new(balanced_ratio(boundary, inner))
        .with("boundary_step", boundary)
        .with("inner_step", inner)
}

/// Peak-to-mean of the column-step energy folded onto the 8-pixel phase.
fn blocking_periodicity(pixels: &PixelBuffer) -> Measurement {
    let plane = grid_aligned_luma(pixels);
    let mut phases = [0.0; 8];
    for y in 0..plane.height {
        for x in 1..plane.width {
            phases[x % 8] += (plane.get(x, y) - plane.get(x - 1, y)).abs();
        }
    }
    let peak = phases.iter().cloned().fold(0.0, f64::max);
    Measurement::new(balanced_ratio(peak, mean(&phases)))
}

fn ac_coefficients(pixels: &PixelBuffer) -> Vec<f64> {
    dct_blocks(&grid_aligned_luma(pixels), MAX_DCT_BLOCKS)
        .iter()
        .flat_map(|block| {
            block
                .iter()
                .flatten()
                .skip(1)
                .copied()
                .collect::<Vec<f64>>()
        })
        .collect()
}

fn dct_zero_ratio(pixels: &PixelBuffer) -> Measurement {
    let ac = ac_coefficients(pixels);
    if ac.is_empty() {
        return Measurement::new(UNMEASURABLE);
    }
    let zeros = ac.iter().filter(|c| c.abs() < 0.5).count();
    Measurement::new(zeros as f64 / ac.len() as f64)
}

fn dct_coefficient_benford(pixels: &PixelBuffer) -> Measurement {
    match benford_divergence(ac_coefficients(pixels)) {
        Some(divergence) => Measurement::new(divergence),
        None => Measurement::new(UNMEASURABLE),
    }
}

/// Chroma residual relative to luma residual; 4:2:0 subsampling flattens chroma.
fn chroma_subsampling_trace(pixels: &PixelBuffer) -> Measurement {
    let chroma = std_dev(&residual_plane(pixels, Channel::Cr).data);
    let luma = std_dev(&residual_plane(pixels, Channel::Luma).data);
    Measurement::new(balanced_ratio(chroma, luma))
}

/// Laplacian energy two pixels beside edges over the plane average.
fn quality_ringing(pixels: &PixelBuffer) -> Measurement {
    let edges = EdgeMap::of(pixels);
    if edges.points.is_empty() {
        return Measurement::new(UNMEASURABLE);
    }
    let laplacian = edges.plane.laplacian();
    let overall = mean(&laplacian.data.iter().map(|v| v.abs()).collect::<Vec<_>>());
    let mut near = Vec::with_capacity(edges.points.len() * 2);
    for &(x, y) in &edges.points {
        for nx in [x.checked_sub(2), Some(x + 2)].into_iter().flatten() {
            if nx < laplacian.width {
                near.push(laplacian.get(nx, y).abs());
            }
        }
    }
    Measurement::new(balanced_ratio(mean(&near), overall))
}

/// Share of 8×8 blocks that are numerically flat.
fn compression_noise_floor(pixels: &PixelBuffer) -> Measurement {
    let blocks = block_stats(&grid_aligned_luma(pixels), 8, 8);
    if blocks.is_empty() {
        return Measurement::new(UNMEASURABLE);
    }
    let flat = blocks.iter().filter(|b| b.variance < 0.25).count();
    Measurement::new(flat as f64 / blocks.len() as f64).with("flat_blocks", flat as f64)
}

pub static SIGNALS: &[SignalDef] = &[
    SignalDef {
        id: "jpeg_blockiness",
        name: "JPEG Blockiness",
        category: Category::Compression,
        weight: 1.0,
        min_size: 16,
        icon: "package",
        statistic: jpeg_blockiness,
        bands: &[(1.05, 60.0), (1.2, 45.0), (1.6, 35.0)],
        otherwise: 30.0,
        ai_text: "No JPEG block boundaries; likely never camera-encoded",
        real_text: "JPEG block boundaries from a camera encoder",
    },
    SignalDef {
        id: "blocking_periodicity",
        name: "Blocking Periodicity",
        category: Category::Compression,
        weight: 0.8,
        min_size: 16,
        icon: "package",
        statistic: blocking_periodicity,
        bands: &[(1.1, 58.0), (1.5, 45.0)],
        otherwise: 32.0,
        ai_text: "No 8-pixel periodicity in column steps",
        real_text: "Column steps repeat every 8 pixels",
    },
    SignalDef {
        id: "dct_zero_ratio",
        name: "DCT Zero Ratio",
        category: Category::Compression,
        weight: 0.8,
        min_size: 16,
        icon: "hash",
        statistic: dct_zero_ratio,
        bands: &[(0.0, 50.0), (0.3, 40.0), (0.6, 45.0), (0.9, 40.0)],
        otherwise: 60.0,
        ai_text: "Almost every AC coefficient is zero",
        real_text: "AC coefficient sparsity matches quantised capture",
    },
    SignalDef {
        id: "dct_coefficient_benford",
        name: "DCT Benford",
        category: Category::Compression,
        weight: 1.0,
        min_size: 16,
        icon: "hash",
        statistic: dct_coefficient_benford,
        bands: &[(0.0, 50.0), (0.06, 30.0), (0.12, 45.0), (0.25, 60.0)],
        otherwise: 72.0,
        ai_text: "DCT coefficients break Benford's law",
        real_text: "DCT coefficients follow Benford's law",
    },
    SignalDef {
        id: "chroma_subsampling_trace",
        name: "Chroma Subsampling",
        category: Category::Compression,
        weight: 0.9,
        min_size: 16,
        icon: "layers",
        statistic: chroma_subsampling_trace,
        bands: &[(0.15, 35.0), (0.4, 45.0)],
        otherwise: 58.0,
        ai_text: "Chroma has full resolution detail",
        real_text: "Chroma detail was subsampled by an encoder",
    },
    SignalDef {
        id: "quality_ringing",
        name: "Ringing",
        category: Category::Compression,
        weight: 0.7,
        min_size: 16,
        icon: "radio",
        statistic: quality_ringing,
        bands: &[(0.0, 50.0), (0.8, 55.0), (1.5, 45.0), (3.0, 35.0)],
        otherwise: 30.0,
        ai_text: "No ringing beside edges",
        real_text: "Ringing beside edges from lossy compression",
    },
    SignalDef {
        id: "compression_noise_floor",
        name: "Noise Floor",
        category: Category::Compression,
        weight: 1.0,
        min_size: 16,
        icon: "square",
        statistic: compression_noise_floor,
        bands: &[(0.0, 50.0), (0.05, 35.0), (0.2, 48.0), (0.5, 62.0)],
        otherwise: 75.0,
        ai_text: "Large areas are numerically perfectly flat",
        real_text: "Every region carries some noise",
    },
];
