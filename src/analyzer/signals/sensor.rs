//! Sensor-noise signals
//!
//! A photosite array leaves a noise floor that is roughly white, grows with
//! brightness (shot noise), carries a demosaicing period and shows up in the
//! chroma channels. Generated images usually have a much cleaner residual.

use super::{residual_plane, UNMEASURABLE};
use crate::analyzer::primitives::{
    balanced_ratio, block_stats, coefficient_of_variation, mean, pearson, safe_div, std_dev, variance, Channel,
    Plane, Spectrum, EPSILON,
};
use crate::analyzer::signal::{Category, Measurement, SignalDef};
use crate::pixels::PixelBuffer;

fn noise_level(pixels: &PixelBuffer) -> Measurement {
    let residual = residual_plane(pixels, Channel::Luma);
    Measurement::new(std_dev(&residual.data))
}

fn noise_uniformity(pixels: &PixelBuffer) -> Measurement {
    let residual = residual_plane(pixels, Channel::Luma);
    let variances: Vec<f64> = block_stats(&residual, 8, 8).iter().map(|b| b.variance).collect();
    if variances.len() < 2 || mean(&variances) < 1e-6 {
        return Measurement::new(UNMEASURABLE);
    }
    Measurement::new(coefficient_of_variation(&variances)).with("blocks", variances.len() as f64)
}

/// Correlation between block brightness and block noise, shifted into `[0, 2]`.
fn noise_luminance_dependence(pixels: &PixelBuffer) -> Measurement {
    let luma = Plane::luma(pixels);
    let residual = luma.residual();
    let brightness: Vec<f64> = block_stats(&luma, 8, 8).iter().map(|b| b.mean).collect();
    let noise: Vec<f64> = block_stats(&residual, 8, 8)
        .iter()
        .map(|b| b.variance.sqrt())
        .collect();
    match pearson(&brightness, &noise) {
        Some(r) => Measurement::new(r + 1.0).with("correlation", r),
        None => Measurement::new(UNMEASURABLE),
    }
}

/// Variance of residual column means against what independent noise would give.
fn prnu_pattern(pixels: &PixelBuffer) -> Measurement {
    let residual = residual_plane(pixels, Channel::Luma);
    let total = residual.variance();
    if total < EPSILON {
        return Measurement::new(UNMEASURABLE);
    }
    let columns: Vec<f64> = (0..residual.width)
        .map(|x| (0..residual.height).map(|y| residual.get(x, y)).sum::<f64>() / residual.height as f64)
        .collect();
    Measurement::new(variance(&columns) * residual.height as f64 / total)
}

/// Green residual energy on the two Bayer diagonals; interpolated sites are quieter.
fn cfa_periodicity(pixels: &PixelBuffer) -> Measurement {
    let residual = residual_plane(pixels, Channel::Green);
    let mut even = (0.0, 0usize);
    let mut odd = (0.0, 0usize);
    for y in 0..residual.height {
        for x in 0..residual.width {
            let e = residual.get(x, y).powi(2);
            if (x + y) % 2 == 0 {
                even = (even.0 + e, even.1 + 1);
            } else {
                odd = (odd.0 + e, odd.1 + 1);
            }
        }
    }
    let ratio = balanced_ratio(safe_div(even.0, even.1 as f64), safe_div(odd.0, odd.1 as f64));
    Measurement::new(ratio.ln().abs()).with("ratio", ratio)
}

fn chroma_noise(pixels: &PixelBuffer) -> Measurement {
    let cb = std_dev(&residual_plane(pixels, Channel::Cb).data);
    let cr = std_dev(&residual_plane(pixels, Channel::Cr).data);
    Measurement::new((cb + cr) / 2.0).with("cb", cb).with("cr", cr)
}

/// Isolated residual spikes per 10k pixels.
fn hot_pixel_count(pixels: &PixelBuffer) -> Measurement {
    let residual = residual_plane(pixels, Channel::Luma);
    let mut hot = 0usize;
    for y in 1..residual.height.saturating_sub(1) {
        for x in 1..residual.width.saturating_sub(1) {
            let spike = residual.get(x, y).abs();
            if spike <= 40.0 {
                continue;
            }
            let quiet = [(x - 1, y), (x + 1, y), (x, y - 1), (x, y + 1)]
                .iter()
                .all(|&(nx, ny)| residual.get(nx, ny).abs() < spike / 4.0);
            if quiet {
                hot += 1;
            }
        }
    }
    Measurement::new(hot as f64 * 10_000.0 / residual.len() as f64).with("hot_pixels", hot as f64)
}

fn noise_spectrum_whiteness(pixels: &PixelBuffer) -> Measurement {
    let residual = residual_plane(pixels, Channel::Luma);
    match Spectrum::of(&residual).flatness() {
        Some(flatness) => Measurement::new(flatness),
        None => Measurement::new(UNMEASURABLE),
    }
}

/// Residual standard deviation inside dark tiles.
fn dark_noise(pixels: &PixelBuffer) -> Measurement {
    let luma = Plane::luma(pixels);
    let residual = luma.residual();
    let noise: Vec<f64> = block_stats(&luma, 16, 16)
        .iter()
        .zip(block_stats(&residual, 16, 16))
        .filter(|(tile, _)| tile.mean < 64.0)
        .map(|(_, r)| r.variance.sqrt())
        .collect();
    if noise.is_empty() {
        return Measurement::new(UNMEASURABLE);
    }
    Measurement::new(mean(&noise)).with("dark_tiles", noise.len() as f64)
}

pub static SIGNALS: &[SignalDef] = &[
    SignalDef {
        id: "noise_level",
        name: "Noise Level",
        category: Category::Sensor,
        weight: 1.5,
        min_size: 16,
        icon: "camera",
        statistic: noise_level,
        bands: &[(0.5, 80.0), (1.2, 65.0), (4.0, 30.0), (10.0, 40.0)],
        otherwise: 55.0,
        ai_text: "Almost no sensor noise in the image",
        real_text: "Noise floor consistent with a camera sensor",
    },
    SignalDef {
        id: "noise_uniformity",
        name: "Noise Uniformity",
        category: Category::Sensor,
        weight: 1.1,
        min_size: 16,
        icon: "camera",
        statistic: noise_uniformity,
        bands: &[(0.0, 50.0), (0.5, 30.0), (1.0, 45.0), (2.0, 60.0)],
        otherwise: 72.0,
        ai_text: "Noise varies patchily across the frame",
        real_text: "Noise is spread evenly, as from one sensor",
    },
    SignalDef {
        id: "noise_luminance_dependence",
        name: "Noise vs Brightness",
        category: Category::Sensor,
        weight: 1.2,
        min_size: 16,
        icon: "sun",
        statistic: noise_luminance_dependence,
        bands: &[(0.0, 50.0), (0.9, 65.0), (1.2, 55.0), (1.5, 40.0)],
        otherwise: 30.0,
        ai_text: "Noise does not grow with brightness",
        real_text: "Noise grows with brightness like photon shot noise",
    },
    SignalDef {
        id: "prnu_pattern",
        name: "Fixed-Pattern Noise",
        category: Category::Sensor,
        weight: 0.9,
        min_size: 16,
        icon: "cpu",
        statistic: prnu_pattern,
        bands: &[(0.0, 50.0), (0.6, 55.0), (1.5, 40.0), (4.0, 30.0)],
        otherwise: 45.0,
        ai_text: "No column structure in the noise residual",
        real_text: "Column structure in the residual hints at a sensor readout",
    },
    SignalDef {
        id: "cfa_periodicity",
        name: "CFA Periodicity",
        category: Category::Sensor,
        weight: 1.3,
        min_size: 16,
        icon: "grid",
        statistic: cfa_periodicity,
        bands: &[(0.05, 65.0), (0.2, 50.0), (0.6, 35.0)],
        otherwise: 30.0,
        ai_text: "No trace of colour-filter-array demosaicing",
        real_text: "Residual carries a demosaicing period",
    },
    SignalDef {
        id: "chroma_noise",
        name: "Chroma Noise",
        category: Category::Sensor,
        weight: 1.0,
        min_size: 16,
        icon: "palette",
        statistic: chroma_noise,
        bands: &[(0.3, 72.0), (0.8, 58.0), (3.0, 35.0)],
        otherwise: 45.0,
        ai_text: "Colour channels are free of sensor noise",
        real_text: "Colour noise typical of a real sensor",
    },
    SignalDef {
        id: "hot_pixel_count",
        name: "Hot Pixels",
        category: Category::Sensor,
        weight: 0.5,
        min_size: 16,
        icon: "zap",
        statistic: hot_pixel_count,
        bands: &[(0.01, 55.0), (1.0, 40.0), (10.0, 45.0)],
        otherwise: 55.0,
        ai_text: "No isolated hot pixels",
        real_text: "Isolated hot pixels, a sensor defect signature",
    },
    SignalDef {
        id: "noise_spectrum_whiteness",
        name: "Noise Whiteness",
        category: Category::Sensor,
        weight: 1.1,
        min_size: 32,
        icon: "waveform",
        statistic: noise_spectrum_whiteness,
        bands: &[(0.0, 50.0), (0.15, 72.0), (0.3, 55.0), (0.45, 40.0)],
        otherwise: 30.0,
        ai_text: "Noise residual is coloured rather than white",
        real_text: "Noise residual is close to white",
    },
    SignalDef {
        id: "dark_noise",
        name: "Shadow Noise",
        category: Category::Sensor,
        weight: 0.9,
        min_size: 16,
        icon: "moon",
        statistic: dark_noise,
        bands: &[(0.0, 50.0), (0.4, 75.0), (1.0, 60.0), (3.0, 35.0)],
        otherwise: 45.0,
        ai_text: "Shadows are unnaturally clean",
        real_text: "Shadows carry the noise of a real exposure",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::signals::test_images::{flat, noise};

    #[test]
    fn test_flat_has_no_noise() {
        let img = flat(32, 32, 128);
        assert!(noise_level(&img).value < 1e-9);
        assert!(chroma_noise(&img).value < 1e-9);
        assert_eq!(noise_uniformity(&img).value, UNMEASURABLE);
        assert_eq!(prnu_pattern(&img).value, UNMEASURABLE);
        assert!(cfa_periodicity(&img).value < 1e-9);
    }

    #[test]
    fn test_noise_level_rises_with_noise() {
        assert!(noise_level(&noise(64, 64, 1)).value > 20.0);
    }

    #[test]
    fn test_single_hot_pixel_found() {
        let img = PixelBuffer::from_fn(32, 32, |x, y| {
            if x == 10 && y == 12 {
                [255, 255, 255, 255]
            } else {
                [60, 60, 60, 255]
            }
        })
        .unwrap();
        let m = hot_pixel_count(&img);
        assert_eq!(m.details, vec![("hot_pixels", 1.0)]);
    }

    #[test]
    fn test_dark_noise_only_in_dark_tiles() {
        assert_eq!(dark_noise(&flat(32, 32, 200)).value, UNMEASURABLE);
        assert!(dark_noise(&flat(32, 32, 10)).value < 1e-6);
    }

    #[test]
    fn test_white_noise_residual_is_flat_spectrum() {
        let m = noise_spectrum_whiteness(&noise(64, 64, 8));
        assert!(m.value > 0.1, "got {}", m.value);
    }
}
