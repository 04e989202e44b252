//! Texture signals from co-occurrence, local binary patterns and residual structure

use super::UNMEASURABLE;
use crate::analyzer::primitives::{
    balanced_ratio, block_stats, entropy_of, lbp_histogram, mean, plane_autocorrelation, Axis, Glcm, Plane,
};
use crate::analyzer::signal::{Category, Measurement, SignalDef};
use crate::pixels::PixelBuffer;

const GLCM_LEVELS: usize = 16;

fn horizontal_glcm(pixels: &PixelBuffer) -> Glcm {
    Glcm::new(&Plane::luma(pixels), GLCM_LEVELS, 1, 0)
}

fn glcm_contrast(pixels: &PixelBuffer) -> Measurement {
    Measurement::new(horizontal_glcm(pixels).contrast())
}

fn glcm_homogeneity(pixels: &PixelBuffer) -> Measurement {
    Measurement::new(horizontal_glcm(pixels).homogeneity())
}

fn glcm_energy(pixels: &PixelBuffer) -> Measurement {
    let glcm = horizontal_glcm(pixels);
    Measurement::new(glcm.energy()).with("entropy", glcm.entropy())
}

/// LBP code entropy normalised to 8 bits.
fn lbp_entropy(pixels: &PixelBuffer) -> Measurement {
    Measurement::new(entropy_of(&lbp_histogram(&Plane::luma(pixels))) / 8.0)
}

/// log10(1 + mean 4×4 tile variance).
fn texture_variance(pixels: &PixelBuffer) -> Measurement {
    let variances: Vec<f64> = block_stats(&Plane::luma(pixels), 4, 4).iter().map(|b| b.variance).collect();
    let m = mean(&variances);
    Measurement::new((1.0 + m).log10()).with("mean_variance", m)
}

/// Lag-1 autocorrelation of the noise residual, shifted into `[0, 2]`.
fn micro_texture_autocorrelation(pixels: &PixelBuffer) -> Measurement {
    let residual = Plane::luma(pixels).residual();
    match plane_autocorrelation(&residual, Axis::Horizontal, 1) {
        Some(acf) if acf.len() > 1 => Measurement::new(acf[1] + 1.0).with("lag1", acf[1]),
        _ => Measurement::new(UNMEASURABLE),
    }
}

/// |ln| of horizontal over vertical co-occurrence contrast.
fn texture_directionality(pixels: &PixelBuffer) -> Measurement {
    let plane = Plane::luma(pixels);
    let horizontal = Glcm::new(&plane, GLCM_LEVELS, 1, 0).contrast();
    let vertical = Glcm::new(&plane, GLCM_LEVELS, 0, 1).contrast();
    Measurement::new(balanced_ratio(horizontal, vertical).ln().abs())
}

pub static SIGNALS: &[SignalDef] = &[
    SignalDef {
        id: "glcm_contrast",
        name: "GLCM Contrast",
        category: Category::Texture,
        weight: 1.0,
        min_size: 16,
        icon: "layers",
        statistic: glcm_contrast,
        bands: &[(0.05, 72.0), (0.3, 58.0), (2.0, 35.0)],
        otherwise: 45.0,
        ai_text: "Neighbouring pixels barely differ",
        real_text: "Neighbour contrast typical of real texture",
    },
    SignalDef {
        id: "glcm_homogeneity",
        name: "GLCM Homogeneity",
        category: Category::Texture,
        weight: 1.0,
        min_size: 16,
        icon: "layers",
        statistic: glcm_homogeneity,
        bands: &[(0.5, 35.0), (0.75, 45.0), (0.9, 60.0)],
        otherwise: 72.0,
        ai_text: "Texture is highly homogeneous",
        real_text: "Texture has natural heterogeneity",
    },
    SignalDef {
        id: "glcm_energy",
        name: "GLCM Energy",
        category: Category::Texture,
        weight: 0.9,
        min_size: 16,
        icon: "layers",
        statistic: glcm_energy,
        bands: &[(0.02, 35.0), (0.08, 45.0), (0.3, 60.0)],
        otherwise: 75.0,
        ai_text: "Few grey-level transitions dominate",
        real_text: "Grey-level transitions are varied",
    },
    SignalDef {
        id: "lbp_entropy",
        name: "LBP Entropy",
        category: Category::Texture,
        weight: 1.1,
        min_size: 16,
        icon: "hexagon",
        statistic: lbp_entropy,
        bands: &[(0.3, 72.0), (0.6, 58.0), (0.85, 38.0)],
        otherwise: 45.0,
        ai_text: "Micro-patterns are repetitive",
        real_text: "Micro-patterns are diverse",
    },
    SignalDef {
        id: "texture_variance",
        name: "Texture Variance",
        category: Category::Texture,
        weight: 1.0,
        min_size: 16,
        icon: "grid",
        statistic: texture_variance,
        bands: &[(0.3, 75.0), (1.0, 60.0), (2.0, 38.0)],
        otherwise: 45.0,
        ai_text: "Very little local texture",
        real_text: "Local texture typical of real surfaces",
    },
    SignalDef {
        id: "micro_texture_autocorrelation",
        name: "Micro-Texture Correlation",
        category: Category::Texture,
        weight: 0.9,
        min_size: 16,
        icon: "activity",
        statistic: micro_texture_autocorrelation,
        bands: &[(0.0, 50.0), (0.6, 55.0), (1.0, 48.0), (1.3, 38.0)],
        otherwise: 60.0,
        ai_text: "Fine texture is smeared across neighbours",
        real_text: "Fine texture correlates like demosaiced sensor data",
    },
    SignalDef {
        id: "texture_directionality",
        name: "Texture Directionality",
        category: Category::Texture,
        weight: 0.7,
        min_size: 16,
        icon: "compass",
        statistic: texture_directionality,
        bands: &[(0.05, 58.0), (0.3, 45.0), (0.8, 38.0)],
        otherwise: 50.0,
        ai_text: "Texture is equally strong in every direction",
        real_text: "Texture has a preferred direction",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::signals::test_images::{flat, noise, stripes};

    #[test]
    fn test_flat_texture() {
        let img = flat(32, 32, 128);
        assert_eq!(glcm_contrast(&img).value, 0.0);
        assert_eq!(glcm_homogeneity(&img).value, 1.0);
        assert_eq!(glcm_energy(&img).value, 1.0);
        assert_eq!(lbp_entropy(&img).value, 0.0);
        assert!(texture_variance(&img).value < 1e-9);
        assert_eq!(micro_texture_autocorrelation(&img).value, UNMEASURABLE);
    }

    #[test]
    fn test_noise_texture_is_rich() {
        let img = noise(64, 64, 3);
        assert!(glcm_contrast(&img).value > 10.0);
        assert!(lbp_entropy(&img).value > 0.85);
    }

    #[test]
    fn test_vertical_stripes_are_directional() {
        assert!(texture_directionality(&stripes(64, 64, 4)).value > 5.0);
    }
}
