//! Colour signals
//!
//! Generators love saturated, evenly balanced colour with smooth gradients;
//! lenses and sensors add casts, channel-dependent noise and fringing.

use super::{residual_plane, EdgeMap, UNMEASURABLE};
use crate::analyzer::primitives::{
    balanced_ratio, block_stats, coefficient_of_variation, entropy_of, mean, rgb_to_hsv, sample_points, std_dev,
    Channel, Plane, MAX_CROP, SAMPLE_TARGET,
};
use crate::analyzer::signal::{Category, Measurement, SignalDef};
use crate::pixels::PixelBuffer;

fn hsv_samples(pixels: &PixelBuffer) -> Vec<(f64, f64, f64)> {
    sample_points(pixels, SAMPLE_TARGET)
        .map(|(x, y)| {
            let [r, g, b, _] = pixels.rgba(x, y);
            rgb_to_hsv(r, g, b)
        })
        .collect()
}

fn saturation_mean(pixels: &PixelBuffer) -> Measurement {
    let saturation: Vec<f64> = hsv_samples(pixels).iter().map(|&(_, s, _)| s).collect();
    Measurement::new(mean(&saturation))
}

fn saturation_clipping(pixels: &PixelBuffer) -> Measurement {
    let samples = hsv_samples(pixels);
    let clipped = samples.iter().filter(|&&(_, s, v)| s > 0.95 && v > 0.2).count();
    Measurement::new(clipped as f64 / samples.len().max(1) as f64)
}

/// Normalised entropy of 36 hue bins over chromatic pixels.
fn hue_entropy(pixels: &PixelBuffer) -> Measurement {
    const BINS: usize = 36;
    let mut hist = [0u64; BINS];
    for (h, s, v) in hsv_samples(pixels) {
        if s > 0.1 && v > 0.1 {
            hist[((h / 360.0 * BINS as f64) as usize).min(BINS - 1)] += 1;
        }
    }
    let chromatic: u64 = hist.iter().sum();
    if chromatic < 16 {
        return Measurement::new(UNMEASURABLE);
    }
    Measurement::new(entropy_of(&hist) / (BINS as f64).log2()).with("chromatic_samples", chromatic as f64)
}

/// Distinct 15-bit colours per sample.
fn color_diversity(pixels: &PixelBuffer) -> Measurement {
    let mut seen = vec![false; 1 << 15];
    let mut distinct = 0usize;
    let mut samples = 0usize;
    for (x, y) in sample_points(pixels, SAMPLE_TARGET) {
        let [r, g, b, _] = pixels.rgba(x, y);
        let key = ((r as usize >> 3) << 10) | ((g as usize >> 3) << 5) | (b as usize >> 3);
        if !seen[key] {
            seen[key] = true;
            distinct += 1;
        }
        samples += 1;
    }
    Measurement::new(distinct as f64 / samples.max(1) as f64).with("distinct", distinct as f64)
}

/// Largest gray-world deviation of a channel mean.
fn white_balance_deviation(pixels: &PixelBuffer) -> Measurement {
    let mut sums = [0.0; 3];
    let mut n = 0usize;
    for (x, y) in sample_points(pixels, SAMPLE_TARGET) {
        let p = pixels.rgba(x, y);
        for (sum, v) in sums.iter_mut().zip(p) {
            *sum += v as f64;
        }
        n += 1;
    }
    let means = sums.map(|s| s / n.max(1) as f64);
    let gray = means.iter().sum::<f64>() / 3.0;
    if gray < 1.0 {
        return Measurement::new(UNMEASURABLE);
    }
    let deviation = means.iter().map(|m| (m - gray).abs()).fold(0.0, f64::max) / gray;
    Measurement::new(deviation)
        .with("red", means[0])
        .with("green", means[1])
        .with("blue", means[2])
}

/// Blue over green residual noise; sensors are noisier in blue.
fn channel_noise_ratio(pixels: &PixelBuffer) -> Measurement {
    let blue = std_dev(&residual_plane(pixels, Channel::Blue).data);
    let green = std_dev(&residual_plane(pixels, Channel::Green).data);
    Measurement::new(balanced_ratio(blue, green))
}

/// Mean run length of identical luma values along rows.
fn gradient_banding(pixels: &PixelBuffer) -> Measurement {
    let plane = Plane::center_crop(pixels, Channel::Luma, MAX_CROP);
    let mut runs = 0usize;
    for y in 0..plane.height {
        let mut previous = None;
        for x in 0..plane.width {
            let v = plane.get(x, y).round() as i32;
            if previous != Some(v) {
                runs += 1;
                previous = Some(v);
            }
        }
    }
    Measurement::new(plane.len() as f64 / runs.max(1) as f64)
}

/// R/B gradient disagreement at luma edges, relative to edge strength.
fn chromatic_aberration(pixels: &PixelBuffer) -> Measurement {
    let edges = EdgeMap::of(pixels);
    if edges.points.is_empty() {
        return Measurement::new(UNMEASURABLE);
    }
    let red = Plane::center_crop(pixels, Channel::Red, MAX_CROP).sobel();
    let blue = Plane::center_crop(pixels, Channel::Blue, MAX_CROP).sobel();
    let mut disagreement = 0.0;
    let mut strength = 0.0;
    for &(x, y) in &edges.points {
        disagreement += (red.magnitude(x, y) - blue.magnitude(x, y)).abs();
        strength += edges.gradients.magnitude(x, y);
    }
    Measurement::new(disagreement / strength)
}

fn saturation_uniformity(pixels: &PixelBuffer) -> Measurement {
    let plane = Plane::center_crop(pixels, Channel::Saturation, MAX_CROP);
    let means: Vec<f64> = block_stats(&plane, 8, 8).iter().map(|b| b.mean).collect();
    if means.is_empty() || mean(&means) < 5.0 {
        return Measurement::new(UNMEASURABLE);
    }
    Measurement::new(coefficient_of_variation(&means))
}

pub static SIGNALS: &[SignalDef] = &[
    SignalDef {
        id: "saturation_mean",
        name: "Mean Saturation",
        category: Category::Color,
        weight: 0.9,
        min_size: 16,
        icon: "droplet",
        statistic: saturation_mean,
        bands: &[(0.05, 45.0), (0.35, 35.0), (0.5, 55.0)],
        otherwise: 72.0,
        ai_text: "Colours are more saturated than most photographs",
        real_text: "Saturation within the range of real photographs",
    },
    SignalDef {
        id: "saturation_clipping",
        name: "Saturation Clipping",
        category: Category::Color,
        weight: 0.8,
        min_size: 16,
        icon: "droplet",
        statistic: saturation_clipping,
        bands: &[(0.005, 40.0), (0.03, 55.0)],
        otherwise: 72.0,
        ai_text: "Many pixels sit at maximum saturation",
        real_text: "Few fully saturated pixels",
    },
    SignalDef {
        id: "hue_entropy",
        name: "Hue Entropy",
        category: Category::Color,
        weight: 0.8,
        min_size: 16,
        icon: "palette",
        statistic: hue_entropy,
        bands: &[(0.0, 50.0), (0.3, 60.0), (0.6, 40.0), (0.85, 35.0)],
        otherwise: 55.0,
        ai_text: "Hue distribution is either very narrow or spread over everything",
        real_text: "Hue distribution looks like a natural palette",
    },
    SignalDef {
        id: "color_diversity",
        name: "Colour Diversity",
        category: Category::Color,
        weight: 0.8,
        min_size: 16,
        icon: "palette",
        statistic: color_diversity,
        bands: &[(0.02, 68.0), (0.1, 52.0), (0.4, 35.0)],
        otherwise: 45.0,
        ai_text: "Only a small set of distinct colours",
        real_text: "Rich set of distinct colours",
    },
    SignalDef {
        id: "white_balance_deviation",
        name: "White Balance",
        category: Category::Color,
        weight: 0.7,
        min_size: 16,
        icon: "thermometer",
        statistic: white_balance_deviation,
        bands: &[(0.0, 50.0), (0.02, 62.0), (0.1, 45.0), (0.3, 35.0)],
        otherwise: 45.0,
        ai_text: "Channel means are perfectly balanced",
        real_text: "Colour cast typical of real lighting",
    },
    SignalDef {
        id: "channel_noise_ratio",
        name: "Channel Noise Ratio",
        category: Category::Color,
        weight: 0.9,
        min_size: 16,
        icon: "layers",
        statistic: channel_noise_ratio,
        bands: &[(0.9, 50.0), (1.1, 60.0), (1.5, 40.0)],
        otherwise: 35.0,
        ai_text: "Blue and green channels are equally clean",
        real_text: "Blue channel is noisier, as on a Bayer sensor",
    },
    SignalDef {
        id: "gradient_banding",
        name: "Gradient Banding",
        category: Category::Color,
        weight: 1.0,
        min_size: 16,
        icon: "sliders",
        statistic: gradient_banding,
        bands: &[(1.5, 35.0), (3.0, 48.0), (8.0, 62.0)],
        otherwise: 72.0,
        ai_text: "Smooth areas break into flat bands",
        real_text: "Smooth areas are dithered by noise",
    },
    SignalDef {
        id: "chromatic_aberration",
        name: "Chromatic Aberration",
        category: Category::Color,
        weight: 1.0,
        min_size: 16,
        icon: "aperture",
        statistic: chromatic_aberration,
        bands: &[(0.0, 50.0), (0.05, 65.0), (0.15, 48.0), (0.4, 35.0)],
        otherwise: 45.0,
        ai_text: "Edges show no lens colour fringing",
        real_text: "Colour fringing at edges, typical of real lenses",
    },
    SignalDef {
        id: "saturation_uniformity",
        name: "Saturation Uniformity",
        category: Category::Color,
        weight: 0.7,
        min_size: 16,
        icon: "droplet",
        statistic: saturation_uniformity,
        bands: &[(0.0, 50.0), (0.2, 65.0), (0.5, 48.0), (1.0, 35.0)],
        otherwise: 40.0,
        ai_text: "Saturation is uniform across the frame",
        real_text: "Saturation varies across the frame",
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::signals::test_images::{flat, gradient, noise};

    #[test]
    fn test_gray_has_no_saturation() {
        let img = flat(32, 32, 128);
        assert_eq!(saturation_mean(&img).value, 0.0);
        assert_eq!(saturation_clipping(&img).value, 0.0);
        assert_eq!(hue_entropy(&img).value, UNMEASURABLE);
        assert_eq!(saturation_uniformity(&img).value, UNMEASURABLE);
        assert_eq!(white_balance_deviation(&img).value, 0.0);
    }

    #[test]
    fn test_flat_single_colour() {
        let m = color_diversity(&flat(32, 32, 128));
        assert!((m.value - 1.0 / 1024.0).abs() < 1e-12);
    }

    #[test]
    fn test_pure_red_is_clipped_and_cast() {
        let img = PixelBuffer::filled(32, 32, [255, 0, 0, 255]).unwrap();
        assert_eq!(saturation_clipping(&img).value, 1.0);
        assert!(white_balance_deviation(&img).value > 1.0);
    }

    #[test]
    fn test_flat_rows_are_one_band() {
        assert_eq!(gradient_banding(&flat(32, 32, 90)).value, 32.0);
    }

    #[test]
    fn test_noise_breaks_bands() {
        assert!(gradient_banding(&noise(64, 64, 6)).value < 1.5);
    }

    #[test]
    fn test_gray_edges_have_no_fringing() {
        let m = chromatic_aberration(&gradient(64, 64));
        assert!(m.value == UNMEASURABLE || m.value < 1e-9);
    }
}
