//! Frequency-domain signals
//!
//! All of these work on the luma centre crop spectrum. Camera images tend to
//! follow a smooth power law (power ∝ f^-2); generators leave periodic
//! up-sampling peaks, overly steep roll-off, or oddly isotropic energy.

use super::UNMEASURABLE;
use crate::analyzer::primitives::{coefficient_of_variation, linear_fit, mean, safe_div, Spectrum, EPSILON};
use crate::analyzer::signal::{Category, Measurement, SignalDef};
use crate::pixels::PixelBuffer;
use std::f64::consts::PI;

fn spectral_slope(pixels: &PixelBuffer) -> Measurement {
    const RINGS: usize = 16;
    let profile = Spectrum::of_luma(pixels).radial_profile(RINGS);
    let (xs, ys): (Vec<f64>, Vec<f64>) = profile
        .iter()
        .enumerate()
        .filter(|(_, p)| **p > 1e-12)
        .map(|(i, p)| (((i as f64 + 0.5) / RINGS as f64).log10(), p.log10()))
        .unzip();
    if xs.len() < 4 {
        return Measurement::new(UNMEASURABLE);
    }
    match linear_fit(&xs, &ys) {
        Some((slope, _, residual)) => Measurement::new((-slope).max(0.0))
            .with("slope", slope)
            .with("fit_residual", residual),
        None => Measurement::new(UNMEASURABLE),
    }
}

fn high_freq_energy(pixels: &PixelBuffer) -> Measurement {
    let spectrum = Spectrum::of_luma(pixels);
    let total = spectrum.total_energy();
    if total < EPSILON {
        return Measurement::new(UNMEASURABLE);
    }
    let high: f64 = spectrum
        .bins()
        .filter(|b| b.radius() > 0.5)
        .map(|b| b.power)
        .sum();
    Measurement::new(high / total).with("total_energy", total)
}

fn spectral_peaks(pixels: &PixelBuffer) -> Measurement {
    const RINGS: usize = 32;
    let spectrum = Spectrum::of_luma(pixels);
    if spectrum.total_energy() < EPSILON {
        return Measurement::new(UNMEASURABLE);
    }
    let profile = spectrum.radial_profile(RINGS);
    let mut candidates = 0usize;
    let mut peaks = 0usize;
    for bin in spectrum.bins() {
        let r = bin.radius();
        if r <= 0.05 || r > 1.0 {
            continue;
        }
        candidates += 1;
        let ring = profile[((r * RINGS as f64) as usize).min(RINGS - 1)];
        if ring > EPSILON && bin.power > 25.0 * ring {
            peaks += 1;
        }
    }
    if candidates == 0 {
        return Measurement::new(UNMEASURABLE);
    }
    Measurement::new(peaks as f64 * 1000.0 / candidates as f64).with("peaks", peaks as f64)
}

/// Power at the half- and quarter-Nyquist lattice points relative to the
/// average bin: transposed convolutions leave energy exactly there.
fn checkerboard_artifact(pixels: &PixelBuffer) -> Measurement {
    let spectrum = Spectrum::of_luma(pixels);
    let total = spectrum.total_energy();
    if total < EPSILON {
        return Measurement::new(UNMEASURABLE);
    }
    let (w, h) = (spectrum.width as isize, spectrum.height as isize);
    let probes = [
        spectrum.at(w / 2, 0),
        spectrum.at(0, h / 2),
        spectrum.at(w / 2, h / 2),
        spectrum.at(w / 4, 0),
        spectrum.at(0, h / 4),
        spectrum.at(w / 4, h / 4),
    ];
    let average = total / (spectrum.power.len() - 1) as f64;
    Measurement::new(safe_div(mean(&probes), average))
}

fn spectral_flatness(pixels: &PixelBuffer) -> Measurement {
    match Spectrum::of_luma(pixels).flatness() {
        Some(flatness) => Measurement::new(flatness),
        None => Measurement::new(UNMEASURABLE),
    }
}

fn azimuthal_anisotropy(pixels: &PixelBuffer) -> Measurement {
    let spectrum = Spectrum::of_luma(pixels);
    let mut sectors = [0.0; 8];
    for bin in spectrum.bins() {
        let r = bin.radius();
        if r <= 0.1 || r > 1.0 {
            continue;
        }
        let idx = ((bin.angle() / PI * 8.0) as usize).min(7);
        sectors[idx] += bin.power;
    }
    if sectors.iter().sum::<f64>() < EPSILON {
        return Measurement::new(UNMEASURABLE);
    }
    Measurement::new(coefficient_of_variation(&sectors))
}

fn spectral_rolloff(pixels: &PixelBuffer) -> Measurement {
    const RINGS: usize = 64;
    let spectrum = Spectrum::of_luma(pixels);
    let mut energy = [0.0; RINGS];
    for bin in spectrum.bins() {
        let r = bin.radius();
        if r <= 1.0 {
            energy[((r * RINGS as f64) as usize).min(RINGS - 1)] += bin.power;
        }
    }
    let total: f64 = energy.iter().sum();
    if total < EPSILON {
        return Measurement::new(UNMEASURABLE);
    }
    let mut cumulative = 0.0;
    for (i, e) in energy.iter().enumerate() {
        cumulative += e;
        if cumulative >= 0.85 * total {
            return Measurement::new((i + 1) as f64 / RINGS as f64);
        }
    }
    Measurement::new(1.0)
}

/// Mean absolute curvature of the log radial profile.
fn radial_spectrum_smoothness(pixels: &PixelBuffer) -> Measurement {
    let profile = Spectrum::of_luma(pixels).radial_profile(24);
    let logs: Vec<f64> = profile
        .iter()
        .filter(|p| **p > 1e-12)
        .map(|p| p.log10())
        .collect();
    if logs.len() < 5 {
        return Measurement::new(UNMEASURABLE);
    }
    let curvature: Vec<f64> = logs
        .windows(3)
        .map(|w| (w[0] - 2.0 * w[1] + w[2]).abs())
        .collect();
    Measurement::new(mean(&curvature)).with("rings", logs.len() as f64)
}

pub static SIGNALS: &[SignalDef] = &[
    SignalDef {
        id: "spectral_slope",
        name: "Spectral Slope",
        category: Category::Frequency,
        weight: 1.5,
        min_size: 32,
        icon: "waveform",
        statistic: spectral_slope,
        bands: &[(0.0, 50.0), (1.0, 60.0), (1.6, 45.0), (2.6, 25.0), (3.2, 55.0)],
        otherwise: 75.0,
        ai_text: "Power spectrum falls off unlike a camera image",
        real_text: "Power spectrum follows the natural 1/f falloff",
    },
    SignalDef {
        id: "high_freq_energy",
        name: "High-Frequency Energy",
        category: Category::Frequency,
        weight: 1.2,
        min_size: 32,
        icon: "waveform",
        statistic: high_freq_energy,
        bands: &[(0.0, 50.0), (0.01, 80.0), (0.03, 65.0), (0.15, 30.0), (0.35, 45.0)],
        otherwise: 60.0,
        ai_text: "Fine detail energy is unusually low or unusually uniform",
        real_text: "Fine detail energy is typical of a photograph",
    },
    SignalDef {
        id: "spectral_peaks",
        name: "Spectral Peaks",
        category: Category::Frequency,
        weight: 1.3,
        min_size: 32,
        icon: "activity",
        statistic: spectral_peaks,
        bands: &[(0.0, 50.0), (0.5, 30.0), (2.0, 45.0), (5.0, 65.0)],
        otherwise: 80.0,
        ai_text: "Isolated periodic peaks suggest up-sampling artifacts",
        real_text: "No periodic spectral peaks found",
    },
    SignalDef {
        id: "checkerboard_artifact",
        name: "Checkerboard Artifact",
        category: Category::Frequency,
        weight: 1.4,
        min_size: 32,
        icon: "grid",
        statistic: checkerboard_artifact,
        bands: &[(0.0, 50.0), (0.5, 25.0), (2.0, 40.0), (8.0, 65.0)],
        otherwise: 85.0,
        ai_text: "Energy at half-Nyquist points looks like a deconvolution checkerboard",
        real_text: "No checkerboard pattern in the spectrum",
    },
    SignalDef {
        id: "spectral_flatness",
        name: "Spectral Flatness",
        category: Category::Frequency,
        weight: 1.0,
        min_size: 32,
        icon: "waveform",
        statistic: spectral_flatness,
        bands: &[(0.0, 50.0), (0.02, 65.0), (0.08, 45.0), (0.3, 30.0)],
        otherwise: 45.0,
        ai_text: "Spectrum is strongly tonal, as in rendered content",
        real_text: "Spectrum has the spread of a natural scene",
    },
    SignalDef {
        id: "azimuthal_anisotropy",
        name: "Azimuthal Anisotropy",
        category: Category::Frequency,
        weight: 0.9,
        min_size: 32,
        icon: "compass",
        statistic: azimuthal_anisotropy,
        bands: &[(0.0, 50.0), (0.1, 65.0), (0.4, 35.0), (0.9, 45.0)],
        otherwise: 60.0,
        ai_text: "Directional energy is unnaturally even or concentrated",
        real_text: "Directional energy looks like a real scene",
    },
    SignalDef {
        id: "spectral_rolloff",
        name: "Spectral Rolloff",
        category: Category::Frequency,
        weight: 1.0,
        min_size: 32,
        icon: "trending-down",
        statistic: spectral_rolloff,
        bands: &[(0.0, 50.0), (0.08, 75.0), (0.15, 60.0), (0.45, 30.0)],
        otherwise: 50.0,
        ai_text: "Most energy sits at very low frequencies",
        real_text: "Energy extends into mid and high frequencies",
    },
    SignalDef {
        id: "radial_spectrum_smoothness",
        name: "Radial Spectrum Smoothness",
        category: Category::Frequency,
        weight: 1.1,
        min_size: 32,
        icon: "activity",
        statistic: radial_spectrum_smoothness,
        bands: &[(0.0, 50.0), (0.05, 45.0), (0.15, 30.0), (0.35, 55.0)],
        otherwise: 75.0,
        ai_text: "Radial spectrum has bumps typical of generator up-sampling",
        real_text: "Radial spectrum decays smoothly",
    },
];
