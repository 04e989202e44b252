//! Numeric primitives shared by every signal
//!
//! Everything here is stateless and bounded in cost:
//!
//! - whole-image passes go through [`sample_stride`], which keeps the number of
//!   visited pixels near [`SAMPLE_TARGET`] regardless of resolution
//! - neighbourhood and transform work happens on a centre crop of at most
//!   [`MAX_CROP`]×[`MAX_CROP`] pixels
//! - autocorrelation never looks further than [`MAX_LAG`] samples
//!
//! # Conventions
//!
//! Planes store values on the 0-255 scale of the source channel. Degenerate
//! inputs (zero variance, empty selections) never produce NaN: ratio helpers
//! fall back through [`safe_div`], and functions that cannot say anything
//! meaningful return `Option`.

use crate::pixels::PixelBuffer;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f64::consts::PI;
use std::sync::OnceLock;

/// Target sample count for stride-sampled passes.
pub const SAMPLE_TARGET: usize = 65_536;

/// Largest side of the centre crop used by transform and neighbourhood work.
pub const MAX_CROP: u32 = 256;

/// Upper bound on autocorrelation lag.
pub const MAX_LAG: usize = 32;

/// Sobel magnitude above which a pixel counts as an edge.
pub const EDGE_THRESHOLD: f64 = 48.0;

/// Denominators smaller than this are treated as zero.
pub const EPSILON: f64 = 1e-9;

// ============================================================================
// Scalar helpers
// ============================================================================

/// ITU-R BT.601 luma.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// Divide, returning 0.0 when the denominator is (nearly) zero.
#[inline]
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator.abs() < EPSILON {
        0.0
    } else {
        numerator / denominator
    }
}

/// Ratio that stays finite and equals 1.0 when both sides vanish.
#[inline]
pub fn balanced_ratio(numerator: f64, denominator: f64) -> f64 {
    (numerator + 1e-6) / (denominator + 1e-6)
}

/// Pixel step (applied to both axes) so that roughly `target` pixels are visited.
pub fn sample_stride(pixel_count: usize, target: usize) -> usize {
    if pixel_count <= target || target == 0 {
        return 1;
    }
    ((pixel_count as f64 / target as f64).sqrt().ceil() as usize).max(1)
}

/// HSV with hue in degrees `[0, 360)`, saturation and value in `[0, 1]`.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let r = r as f64 / 255.0;
    let g = g as f64 / 255.0;
    let b = b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let hue = if delta < EPSILON {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    let saturation = if max < EPSILON { 0.0 } else { delta / max };
    (hue.rem_euclid(360.0), saturation, max)
}

/// Full-range YCbCr (JPEG convention), all components on the 0-255 scale.
pub fn rgb_to_ycbcr(r: u8, g: u8, b: u8) -> (f64, f64, f64) {
    let (r, g, b) = (r as f64, g as f64, b as f64);
    let y = 0.299 * r + 0.587 * g + 0.114 * b;
    let cb = 128.0 - 0.168_736 * r - 0.331_264 * g + 0.5 * b;
    let cr = 128.0 + 0.5 * r - 0.418_688 * g - 0.081_312 * b;
    (y, cb, cr)
}

/// Hanning window function
pub fn hanning_window(size: usize) -> Vec<f64> {
    if size < 2 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / (size - 1) as f64).cos()))
        .collect()
}

// ============================================================================
// Descriptive statistics
// ============================================================================

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Standard deviation over |mean|; 0.0 for empty or zero-mean input.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    safe_div(std_dev(values), mean(values).abs())
}

/// Sample skewness; 0.0 when the spread vanishes.
pub fn skewness(values: &[f64]) -> f64 {
    let sd = std_dev(values);
    if sd < 1e-6 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| ((v - m) / sd).powi(3)).sum::<f64>() / values.len() as f64
}

/// Excess kurtosis; 0.0 when the spread vanishes.
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    let sd = std_dev(values);
    if sd < 1e-6 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| ((v - m) / sd).powi(4)).sum::<f64>() / values.len() as f64 - 3.0
}

/// Pearson correlation coefficient, `None` when either side is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|a| a * a).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();
    if !denominator.is_finite() || denominator < EPSILON {
        return None;
    }
    Some((numerator / denominator).clamp(-1.0, 1.0))
}

/// Value at fraction `p` (0..=1) of the sorted input, nearest rank.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let idx = ((sorted.len() - 1) as f64 * p.clamp(0.0, 1.0)).round() as usize;
    sorted[idx]
}

/// Least-squares line through `(x, y)`: returns `(slope, intercept, residual_std)`.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<(f64, f64, f64)> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let sxx: f64 = xs.iter().map(|x| (x - mx) * (x - mx)).sum();
    if sxx < EPSILON {
        return None;
    }
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let residual = xs
        .iter()
        .zip(ys)
        .map(|(x, y)| {
            let e = y - (slope * x + intercept);
            e * e
        })
        .sum::<f64>()
        / xs.len() as f64;
    Some((slope, intercept, residual.sqrt()))
}

/// Shannon entropy in bits of a count vector.
pub fn entropy_of(counts: &[u64]) -> f64 {
    let total: u64 = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

/// Total-variation distance between the leading-digit distribution of the
/// positive inputs and Benford's law. `None` when fewer than 32 usable values.
pub fn benford_divergence<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut counts = [0u64; 9];
    for v in values {
        let v = v.abs();
        if v < 1e-3 || !v.is_finite() {
            continue;
        }
        let scaled = v / 10f64.powf(v.log10().floor());
        let digit = (scaled.floor() as usize).clamp(1, 9);
        counts[digit - 1] += 1;
    }
    let total: u64 = counts.iter().sum();
    if total < 32 {
        return None;
    }
    let divergence = counts
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let expected = (1.0 + 1.0 / (i as f64 + 1.0)).log10();
            (c as f64 / total as f64 - expected).abs()
        })
        .sum::<f64>();
    Some(divergence)
}

// ============================================================================
// Channels and planes
// ============================================================================

/// Scalar view of an RGBA pixel, always on the 0-255 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Luma,
    Red,
    Green,
    Blue,
    Cb,
    Cr,
    Saturation,
}

impl Channel {
    #[inline]
    pub fn value(self, p: [u8; 4]) -> f64 {
        match self {
            Channel::Luma => luminance(p[0], p[1], p[2]),
            Channel::Red => p[0] as f64,
            Channel::Green => p[1] as f64,
            Channel::Blue => p[2] as f64,
            Channel::Cb => rgb_to_ycbcr(p[0], p[1], p[2]).1,
            Channel::Cr => rgb_to_ycbcr(p[0], p[1], p[2]).2,
            Channel::Saturation => rgb_to_hsv(p[0], p[1], p[2]).1 * 255.0,
        }
    }
}

/// Pixel coordinates visited by a stride-sampled pass.
pub fn sample_points(pixels: &PixelBuffer, target: usize) -> impl Iterator<Item = (u32, u32)> {
    let stride = sample_stride(pixels.pixel_count(), target) as u32;
    let (w, h) = (pixels.width(), pixels.height());
    (0..h)
        .step_by(stride as usize)
        .flat_map(move |y| (0..w).step_by(stride as usize).map(move |x| (x, y)))
}

/// Values of `channel` at the stride-sampled points.
pub fn sample_values(pixels: &PixelBuffer, channel: Channel, target: usize) -> Vec<f64> {
    sample_points(pixels, target)
        .map(|(x, y)| channel.value(pixels.rgba(x, y)))
        .collect()
}

/// Dense 2-D array of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl Plane {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Centre crop of at most `max_side`×`max_side`, one channel.
    pub fn center_crop(pixels: &PixelBuffer, channel: Channel, max_side: u32) -> Self {
        let w = pixels.width().min(max_side);
        let h = pixels.height().min(max_side);
        let x0 = (pixels.width() - w) / 2;
        let y0 = (pixels.height() - h) / 2;
        let mut plane = Plane::new(w as usize, h as usize);
        for y in 0..h {
            for x in 0..w {
                plane.data[(y * w + x) as usize] = channel.value(pixels.rgba(x0 + x, y0 + y));
            }
        }
        plane
    }

    /// Luma centre crop at the default size. Most signals start here.
    pub fn luma(pixels: &PixelBuffer) -> Self {
        Self::center_crop(pixels, Channel::Luma, MAX_CROP)
    }

    /// Point-sampled copy of the whole image (every `stride`-th pixel).
    pub fn sampled(pixels: &PixelBuffer, channel: Channel, target: usize) -> Self {
        let stride = sample_stride(pixels.pixel_count(), target);
        let w = (pixels.width() as usize).div_ceil(stride);
        let h = (pixels.height() as usize).div_ceil(stride);
        let mut plane = Plane::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let p = pixels.rgba((x * stride) as u32, (y * stride) as u32);
                plane.data[y * w + x] = channel.value(p);
            }
        }
        plane
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    /// Read with coordinates clamped into the plane.
    #[inline]
    pub fn get_clamped(&self, x: isize, y: isize) -> f64 {
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let y = y.clamp(0, self.height as isize - 1) as usize;
        self.get(x, y)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn mean(&self) -> f64 {
        mean(&self.data)
    }

    pub fn variance(&self) -> f64 {
        variance(&self.data)
    }

    /// Sub-plane copy; the rectangle is clipped to the plane.
    pub fn region(&self, x0: usize, y0: usize, w: usize, h: usize) -> Plane {
        let x1 = (x0 + w).min(self.width);
        let y1 = (y0 + h).min(self.height);
        let (w, h) = (x1.saturating_sub(x0), y1.saturating_sub(y0));
        let mut out = Plane::new(w, h);
        for y in 0..h {
            for x in 0..w {
                out.data[y * w + x] = self.get(x0 + x, y0 + y);
            }
        }
        out
    }

    /// 3×3 box blur with clamped borders.
    pub fn box_blur3(&self) -> Plane {
        let mut out = Plane::new(self.width, self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                let mut sum = 0.0;
                for dy in -1..=1isize {
                    for dx in -1..=1isize {
                        sum += self.get_clamped(x as isize + dx, y as isize + dy);
                    }
                }
                out.data[y * self.width + x] = sum / 9.0;
            }
        }
        out
    }

    /// High-pass noise residual: the plane minus its 3×3 local mean.
    pub fn residual(&self) -> Plane {
        let blurred = self.box_blur3();
        Plane {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(&blurred.data)
                .map(|(v, b)| v - b)
                .collect(),
        }
    }

    /// Half-resolution copy by 2×2 averaging. Odd trailing rows/columns drop.
    pub fn downsample2(&self) -> Plane {
        let w = self.width / 2;
        let h = self.height / 2;
        let mut out = Plane::new(w, h);
        for y in 0..h {
            for x in 0..w {
                let s = self.get(2 * x, 2 * y)
                    + self.get(2 * x + 1, 2 * y)
                    + self.get(2 * x, 2 * y + 1)
                    + self.get(2 * x + 1, 2 * y + 1);
                out.data[y * w + x] = s / 4.0;
            }
        }
        out
    }

    /// 4-neighbour Laplacian on the interior; border cells are zero.
    pub fn laplacian(&self) -> Plane {
        let mut out = Plane::new(self.width, self.height);
        if self.width < 3 || self.height < 3 {
            return out;
        }
        for y in 1..self.height - 1 {
            for x in 1..self.width - 1 {
                let v = self.get(x - 1, y) + self.get(x + 1, y) + self.get(x, y - 1)
                    + self.get(x, y + 1)
                    - 4.0 * self.get(x, y);
                out.data[y * self.width + x] = v;
            }
        }
        out
    }

    /// Sobel gradients on the interior; border cells are zero.
    pub fn sobel(&self) -> Gradients {
        let mut gx = Plane::new(self.width, self.height);
        let mut gy = Plane::new(self.width, self.height);
        if self.width >= 3 && self.height >= 3 {
            for y in 1..self.height - 1 {
                for x in 1..self.width - 1 {
                    let p = |dx: isize, dy: isize| {
                        self.get((x as isize + dx) as usize, (y as isize + dy) as usize)
                    };
                    let sx = (p(1, -1) + 2.0 * p(1, 0) + p(1, 1)) - (p(-1, -1) + 2.0 * p(-1, 0) + p(-1, 1));
                    let sy = (p(-1, 1) + 2.0 * p(0, 1) + p(1, 1)) - (p(-1, -1) + 2.0 * p(0, -1) + p(1, -1));
                    gx.data[y * self.width + x] = sx;
                    gy.data[y * self.width + x] = sy;
                }
            }
        }
        Gradients { gx, gy }
    }
}

/// Horizontal and vertical Sobel responses.
#[derive(Debug, Clone)]
pub struct Gradients {
    pub gx: Plane,
    pub gy: Plane,
}

impl Gradients {
    pub fn width(&self) -> usize {
        self.gx.width
    }

    pub fn height(&self) -> usize {
        self.gx.height
    }

    #[inline]
    pub fn magnitude(&self, x: usize, y: usize) -> f64 {
        self.gx.get(x, y).hypot(self.gy.get(x, y))
    }

    /// Gradient direction folded into `[0, π)`.
    #[inline]
    pub fn orientation(&self, x: usize, y: usize) -> f64 {
        self.gy.get(x, y).atan2(self.gx.get(x, y)).rem_euclid(PI)
    }

    pub fn magnitudes(&self) -> Vec<f64> {
        self.gx
            .data
            .iter()
            .zip(&self.gy.data)
            .map(|(a, b)| a.hypot(*b))
            .collect()
    }

    /// Interior coordinates whose magnitude exceeds [`EDGE_THRESHOLD`].
    pub fn edge_points(&self) -> Vec<(usize, usize)> {
        let mut points = Vec::new();
        if self.width() < 3 || self.height() < 3 {
            return points;
        }
        for y in 1..self.height() - 1 {
            for x in 1..self.width() - 1 {
                if self.magnitude(x, y) > EDGE_THRESHOLD {
                    points.push((x, y));
                }
            }
        }
        points
    }
}

// ============================================================================
// Block statistics
// ============================================================================

/// Mean and variance of one square tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockStats {
    pub x: usize,
    pub y: usize,
    pub mean: f64,
    pub variance: f64,
}

/// Statistics of `block`-sized tiles placed every `stride` pixels. Only tiles
/// that fit completely inside the plane are reported.
pub fn block_stats(plane: &Plane, block: usize, stride: usize) -> Vec<BlockStats> {
    let mut out = Vec::new();
    if block == 0 || stride == 0 || plane.width < block || plane.height < block {
        return out;
    }
    let n = (block * block) as f64;
    let mut y = 0;
    while y + block <= plane.height {
        let mut x = 0;
        while x + block <= plane.width {
            let mut sum = 0.0;
            let mut sum_sq = 0.0;
            for by in y..y + block {
                for bx in x..x + block {
                    let v = plane.get(bx, by);
                    sum += v;
                    sum_sq += v * v;
                }
            }
            let m = sum / n;
            out.push(BlockStats {
                x,
                y,
                mean: m,
                variance: (sum_sq / n - m * m).max(0.0),
            });
            x += stride;
        }
        y += stride;
    }
    out
}

// ============================================================================
// Histograms
// ============================================================================

/// 256-bin histogram.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    pub bins: [u64; 256],
    pub total: u64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self {
            bins: [0; 256],
            total: 0,
        }
    }
}

impl Histogram {
    /// Stride-sampled histogram of one channel.
    pub fn of(pixels: &PixelBuffer, channel: Channel, target: usize) -> Self {
        Self::from_values(
            sample_points(pixels, target).map(|(x, y)| channel.value(pixels.rgba(x, y))),
        )
    }

    /// Accumulate 0-255 values (rounded and clamped).
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Self {
        let mut hist = Self::default();
        for v in values {
            hist.bins[v.round().clamp(0.0, 255.0) as usize] += 1;
            hist.total += 1;
        }
        hist
    }

    pub fn normalized(&self) -> Vec<f64> {
        self.bins
            .iter()
            .map(|&c| safe_div(c as f64, self.total as f64))
            .collect()
    }

    pub fn entropy(&self) -> f64 {
        entropy_of(&self.bins)
    }

    pub fn occupied(&self) -> usize {
        self.bins.iter().filter(|&&c| c > 0).count()
    }

    /// First and last occupied bins.
    pub fn range(&self) -> Option<(usize, usize)> {
        let lo = self.bins.iter().position(|&c| c > 0)?;
        let hi = self.bins.iter().rposition(|&c| c > 0)?;
        Some((lo, hi))
    }

    /// Empty bins strictly between the first and last occupied bins.
    pub fn gap_count(&self) -> usize {
        match self.range() {
            Some((lo, hi)) => self.bins[lo..=hi].iter().filter(|&&c| c == 0).count(),
            None => 0,
        }
    }

    /// Smallest bin index whose cumulative share reaches `p`.
    pub fn percentile(&self, p: f64) -> usize {
        if self.total == 0 {
            return 0;
        }
        let target = (self.total as f64 * p.clamp(0.0, 1.0)).ceil() as u64;
        let mut cumulative = 0;
        for (i, &c) in self.bins.iter().enumerate() {
            cumulative += c;
            if cumulative >= target.max(1) {
                return i;
            }
        }
        255
    }
}

// ============================================================================
// Autocorrelation and co-occurrence
// ============================================================================

/// Direction for plane-wide autocorrelation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Normalised autocorrelation of a 1-D series for lags `0..=max_lag`
/// (capped at [`MAX_LAG`]). `None` when the series is constant or too short.
pub fn autocorrelation(values: &[f64], max_lag: usize) -> Option<Vec<f64>> {
    let max_lag = max_lag.min(MAX_LAG);
    if values.len() <= max_lag + 1 {
        return None;
    }
    let m = mean(values);
    let var: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    if var < EPSILON {
        return None;
    }
    Some(
        (0..=max_lag)
            .map(|lag| {
                values
                    .iter()
                    .zip(&values[lag..])
                    .map(|(a, b)| (a - m) * (b - m))
                    .sum::<f64>()
                    / var
                    * values.len() as f64
                    / (values.len() - lag) as f64
            })
            .collect(),
    )
}

/// Plane autocorrelation along one axis for lags `0..=max_lag`, pooled over
/// every row (or column) around the plane mean.
pub fn plane_autocorrelation(plane: &Plane, axis: Axis, max_lag: usize) -> Option<Vec<f64>> {
    let max_lag = max_lag.min(MAX_LAG);
    let extent = match axis {
        Axis::Horizontal => plane.width,
        Axis::Vertical => plane.height,
    };
    if extent <= max_lag + 1 || plane.is_empty() {
        return None;
    }
    let m = plane.mean();
    let var = plane.variance();
    if var < EPSILON {
        return None;
    }
    let mut acf = Vec::with_capacity(max_lag + 1);
    for lag in 0..=max_lag {
        let mut sum = 0.0;
        let mut count = 0usize;
        match axis {
            Axis::Horizontal => {
                for y in 0..plane.height {
                    for x in 0..plane.width - lag {
                        sum += (plane.get(x, y) - m) * (plane.get(x + lag, y) - m);
                        count += 1;
                    }
                }
            }
            Axis::Vertical => {
                for y in 0..plane.height - lag {
                    for x in 0..plane.width {
                        sum += (plane.get(x, y) - m) * (plane.get(x, y + lag) - m);
                        count += 1;
                    }
                }
            }
        }
        acf.push(safe_div(sum / count.max(1) as f64, var));
    }
    Some(acf)
}

/// Normalised grey-level co-occurrence matrix.
#[derive(Debug, Clone)]
pub struct Glcm {
    pub levels: usize,
    pub p: Vec<f64>,
}

impl Glcm {
    /// Co-occurrence of quantised values at offset `(dx, dy)`.
    pub fn new(plane: &Plane, levels: usize, dx: usize, dy: usize) -> Self {
        let levels = levels.clamp(2, 256);
        let mut counts = vec![0u64; levels * levels];
        let quant = |v: f64| ((v.clamp(0.0, 255.0) / 256.0) * levels as f64) as usize;
        if plane.width > dx && plane.height > dy {
            for y in 0..plane.height - dy {
                for x in 0..plane.width - dx {
                    let i = quant(plane.get(x, y)).min(levels - 1);
                    let j = quant(plane.get(x + dx, y + dy)).min(levels - 1);
                    counts[i * levels + j] += 1;
                }
            }
        }
        let total: u64 = counts.iter().sum();
        let p = counts
            .iter()
            .map(|&c| safe_div(c as f64, total as f64))
            .collect();
        Self { levels, p }
    }

    fn fold<F: Fn(usize, usize, f64) -> f64>(&self, f: F) -> f64 {
        let mut acc = 0.0;
        for i in 0..self.levels {
            for j in 0..self.levels {
                let p = self.p[i * self.levels + j];
                if p > 0.0 {
                    acc += f(i, j, p);
                }
            }
        }
        acc
    }

    pub fn contrast(&self) -> f64 {
        self.fold(|i, j, p| {
            let d = i as f64 - j as f64;
            d * d * p
        })
    }

    pub fn homogeneity(&self) -> f64 {
        self.fold(|i, j, p| p / (1.0 + (i as f64 - j as f64).abs()))
    }

    pub fn energy(&self) -> f64 {
        self.fold(|_, _, p| p * p)
    }

    pub fn entropy(&self) -> f64 {
        self.fold(|_, _, p| -p * p.log2())
    }
}

/// 8-neighbour local binary pattern histogram over the plane interior.
pub fn lbp_histogram(plane: &Plane) -> [u64; 256] {
    let mut hist = [0u64; 256];
    if plane.width < 3 || plane.height < 3 {
        return hist;
    }
    const OFFSETS: [(isize, isize); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
    ];
    for y in 1..plane.height - 1 {
        for x in 1..plane.width - 1 {
            let c = plane.get(x, y);
            let mut code = 0usize;
            for (bit, (dx, dy)) in OFFSETS.iter().enumerate() {
                let n = plane.get((x as isize + dx) as usize, (y as isize + dy) as usize);
                if n >= c {
                    code |= 1 << bit;
                }
            }
            hist[code] += 1;
        }
    }
    hist
}

// ============================================================================
// Transforms
// ============================================================================

fn dct_basis() -> &'static [[f64; 8]; 8] {
    static BASIS: OnceLock<[[f64; 8]; 8]> = OnceLock::new();
    BASIS.get_or_init(|| {
        let mut basis = [[0.0; 8]; 8];
        for (k, row) in basis.iter_mut().enumerate() {
            let scale = if k == 0 { (1.0f64 / 8.0).sqrt() } else { (2.0f64 / 8.0).sqrt() };
            for (n, cell) in row.iter_mut().enumerate() {
                *cell = scale * (PI * (2.0 * n as f64 + 1.0) * k as f64 / 16.0).cos();
            }
        }
        basis
    })
}

/// Orthonormal 8-point DCT-II.
pub fn dct8(input: &[f64; 8]) -> [f64; 8] {
    let basis = dct_basis();
    let mut out = [0.0; 8];
    for (k, o) in out.iter_mut().enumerate() {
        *o = basis[k].iter().zip(input).map(|(b, v)| b * v).sum();
    }
    out
}

/// Separable 8×8 DCT-II of the block whose top-left corner is `(x0, y0)`.
pub fn dct8x8(plane: &Plane, x0: usize, y0: usize) -> [[f64; 8]; 8] {
    let mut rows = [[0.0; 8]; 8];
    for (y, row) in rows.iter_mut().enumerate() {
        let mut line = [0.0; 8];
        for (x, v) in line.iter_mut().enumerate() {
            *v = plane.get(x0 + x, y0 + y) - 128.0;
        }
        *row = dct8(&line);
    }
    let mut out = [[0.0; 8]; 8];
    for u in 0..8 {
        let mut column = [0.0; 8];
        for (y, v) in column.iter_mut().enumerate() {
            *v = rows[y][u];
        }
        let transformed = dct8(&column);
        for (v, value) in transformed.iter().enumerate() {
            out[v][u] = *value;
        }
    }
    out
}

/// DCT coefficients of every aligned 8×8 block (at most `max_blocks`, spread
/// evenly across the plane).
pub fn dct_blocks(plane: &Plane, max_blocks: usize) -> Vec<[[f64; 8]; 8]> {
    let bw = plane.width / 8;
    let bh = plane.height / 8;
    let total = bw * bh;
    if total == 0 || max_blocks == 0 {
        return Vec::new();
    }
    let step = total.div_ceil(max_blocks).max(1);
    (0..total)
        .step_by(step)
        .map(|i| dct8x8(plane, (i % bw) * 8, (i / bw) * 8))
        .collect()
}

/// Power spectrum of a plane, DC-removed and Hann-windowed.
#[derive(Debug, Clone)]
pub struct Spectrum {
    pub width: usize,
    pub height: usize,
    pub power: Vec<f64>,
}

/// One spectral bin with frequencies normalised to `[-1, 1]` (1 = Nyquist).
#[derive(Debug, Clone, Copy)]
pub struct SpectralBin {
    pub fx: f64,
    pub fy: f64,
    pub power: f64,
}

impl SpectralBin {
    /// Normalised radius; 1.0 is the Nyquist circle.
    #[inline]
    pub fn radius(&self) -> f64 {
        self.fx.hypot(self.fy)
    }

    /// Direction of the frequency vector folded into `[0, π)`.
    #[inline]
    pub fn angle(&self) -> f64 {
        self.fy.atan2(self.fx).rem_euclid(PI)
    }
}

impl Spectrum {
    /// 2-D FFT of the plane (rows then columns). Planes larger than
    /// [`MAX_CROP`] should be cropped by the caller.
    pub fn of(plane: &Plane) -> Self {
        let (w, h) = (plane.width, plane.height);
        if w == 0 || h == 0 {
            return Self {
                width: w,
                height: h,
                power: Vec::new(),
            };
        }
        let m = plane.mean();
        let wx = hanning_window(w);
        let wy = hanning_window(h);
        let mut buffer: Vec<Complex<f64>> = (0..w * h)
            .map(|i| {
                let (x, y) = (i % w, i / w);
                Complex::new((plane.data[i] - m) * wx[x] * wy[y], 0.0)
            })
            .collect();

        let mut planner = FftPlanner::new();
        let row_fft = planner.plan_fft_forward(w);
        for row in buffer.chunks_exact_mut(w) {
            row_fft.process(row);
        }
        let col_fft = planner.plan_fft_forward(h);
        let mut column = vec![Complex::new(0.0, 0.0); h];
        for x in 0..w {
            for y in 0..h {
                column[y] = buffer[y * w + x];
            }
            col_fft.process(&mut column);
            for y in 0..h {
                buffer[y * w + x] = column[y];
            }
        }

        let norm = (w * h) as f64;
        Self {
            width: w,
            height: h,
            power: buffer.iter().map(|c| c.norm_sqr() / norm).collect(),
        }
    }

    /// Luma centre-crop spectrum.
    pub fn of_luma(pixels: &PixelBuffer) -> Self {
        Self::of(&Plane::luma(pixels))
    }

    #[inline]
    fn signed(index: usize, size: usize) -> f64 {
        let half = (size / 2).max(1) as f64;
        let f = if index <= size / 2 {
            index as f64
        } else {
            index as f64 - size as f64
        };
        f / half
    }

    /// Every bin except DC.
    pub fn bins(&self) -> impl Iterator<Item = SpectralBin> + '_ {
        (0..self.power.len()).filter(|&i| i != 0).map(move |i| SpectralBin {
            fx: Self::signed(i % self.width, self.width),
            fy: Self::signed(i / self.width, self.height),
            power: self.power[i],
        })
    }

    /// Power at signed integer frequency `(u, v)`.
    pub fn at(&self, u: isize, v: isize) -> f64 {
        if self.power.is_empty() {
            return 0.0;
        }
        let x = u.rem_euclid(self.width as isize) as usize;
        let y = v.rem_euclid(self.height as isize) as usize;
        self.power[y * self.width + x]
    }

    /// Total power excluding DC.
    pub fn total_energy(&self) -> f64 {
        self.power.iter().skip(1).sum()
    }

    /// Geometric over arithmetic mean of the in-band power (Wiener entropy).
    /// `None` for an empty or silent spectrum.
    pub fn flatness(&self) -> Option<f64> {
        let powers: Vec<f64> = self
            .bins()
            .filter(|b| b.radius() <= 1.0)
            .map(|b| b.power)
            .collect();
        let arithmetic = mean(&powers);
        if powers.is_empty() || arithmetic < EPSILON {
            return None;
        }
        let log_mean = powers.iter().map(|p| (p + 1e-12).ln()).sum::<f64>() / powers.len() as f64;
        Some((log_mean.exp() / arithmetic).clamp(0.0, 1.0))
    }

    /// Mean power in `rings` equal-width radius bands over `(0, 1]`.
    pub fn radial_profile(&self, rings: usize) -> Vec<f64> {
        let rings = rings.max(1);
        let mut sum = vec![0.0; rings];
        let mut count = vec![0usize; rings];
        for bin in self.bins() {
            let r = bin.radius();
            if r > 1.0 {
                continue;
            }
            let idx = ((r * rings as f64) as usize).min(rings - 1);
            sum[idx] += bin.power;
            count[idx] += 1;
        }
        sum.iter()
            .zip(&count)
            .map(|(s, &c)| safe_div(*s, c as f64))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(w: u32, h: u32, v: u8) -> PixelBuffer {
        PixelBuffer::filled(w, h, [v, v, v, 255]).unwrap()
    }

    fn noise(w: u32, h: u32, seed: u64) -> PixelBuffer {
        let mut state = seed;
        PixelBuffer::from_fn(w, h, |_, _| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let v = (state >> 56) as u8;
            [v, v.wrapping_add(7), v.wrapping_sub(5), 255]
        })
        .unwrap()
    }

    // ==========================================================================
    // SCALAR HELPER TESTS
    // ==========================================================================

    #[test]
    fn test_luminance_weights() {
        assert!((luminance(255, 255, 255) - 255.0).abs() < 1e-9);
        assert!((luminance(255, 0, 0) - 76.245).abs() < 1e-9);
        assert_eq!(luminance(0, 0, 0), 0.0);
    }

    #[test]
    fn test_safe_div_zero_denominator() {
        assert_eq!(safe_div(5.0, 0.0), 0.0);
        assert_eq!(safe_div(6.0, 3.0), 2.0);
    }

    #[test]
    fn test_balanced_ratio_both_zero_is_one() {
        assert!((balanced_ratio(0.0, 0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sample_stride_bounds_samples() {
        assert_eq!(sample_stride(1000, SAMPLE_TARGET), 1);
        let pixels = 4000 * 3000;
        let stride = sample_stride(pixels, SAMPLE_TARGET);
        let visited = (4000usize.div_ceil(stride)) * (3000usize.div_ceil(stride));
        assert!(visited <= SAMPLE_TARGET + 4000, "visited {}", visited);
        assert!(visited >= SAMPLE_TARGET / 4, "visited {}", visited);
    }

    #[test]
    fn test_hsv_primaries() {
        let (h, s, v) = rgb_to_hsv(255, 0, 0);
        assert!(h.abs() < 1e-9 && (s - 1.0).abs() < 1e-9 && (v - 1.0).abs() < 1e-9);
        let (h, _, _) = rgb_to_hsv(0, 0, 255);
        assert!((h - 240.0).abs() < 1e-9);
        let (_, s, _) = rgb_to_hsv(90, 90, 90);
        assert_eq!(s, 0.0);
    }

    #[test]
    fn test_ycbcr_gray_is_centered() {
        let (y, cb, cr) = rgb_to_ycbcr(100, 100, 100);
        assert!((y - 100.0).abs() < 1e-6);
        assert!((cb - 128.0).abs() < 1e-6);
        assert!((cr - 128.0).abs() < 1e-6);
    }

    #[test]
    fn test_hanning_window_edges_and_center() {
        let window = hanning_window(101);
        assert!(window[0] < 1e-9 && window[100] < 1e-9);
        assert!((window[50] - 1.0).abs() < 1e-9);
        assert_eq!(hanning_window(1), vec![1.0]);
    }

    // ==========================================================================
    // STATISTICS TESTS
    // ==========================================================================

    #[test]
    fn test_mean_variance() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), 5.0);
        assert_eq!(variance(&v), 4.0);
        assert_eq!(std_dev(&v), 2.0);
        assert!((coefficient_of_variation(&v) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_moments_are_zero() {
        let v = [3.0; 10];
        assert_eq!(skewness(&v), 0.0);
        assert_eq!(excess_kurtosis(&v), 0.0);
        assert_eq!(coefficient_of_variation(&[]), 0.0);
    }

    #[test]
    fn test_pearson_identical_and_constant() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert!((pearson(&x, &x).unwrap() - 1.0).abs() < 1e-12);
        let y = [-1.0, -2.0, -3.0, -4.0];
        assert!((pearson(&x, &y).unwrap() + 1.0).abs() < 1e-12);
        assert!(pearson(&x, &[5.0; 4]).is_none());
    }

    #[test]
    fn test_linear_fit_recovers_line() {
        let xs: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| -2.0 * x + 3.0).collect();
        let (slope, intercept, residual) = linear_fit(&xs, &ys).unwrap();
        assert!((slope + 2.0).abs() < 1e-9);
        assert!((intercept - 3.0).abs() < 1e-9);
        assert!(residual < 1e-9);
    }

    #[test]
    fn test_entropy_uniform() {
        assert!((entropy_of(&[5, 5, 5, 5]) - 2.0).abs() < 1e-12);
        assert_eq!(entropy_of(&[0, 9, 0]), 0.0);
        assert_eq!(entropy_of(&[]), 0.0);
    }

    #[test]
    fn test_benford_follows_law_for_log_uniform_values() {
        // exactly eight decades, evenly spaced in log10
        let values = (0..2000).map(|i| 10f64.powf(i as f64 / 250.0));
        let divergence = benford_divergence(values).unwrap();
        assert!(divergence < 0.05, "divergence {}", divergence);
    }

    #[test]
    fn test_benford_needs_enough_values() {
        assert!(benford_divergence(vec![1.0, 2.0, 3.0]).is_none());
        let constant = benford_divergence(vec![5.0; 100]).unwrap();
        assert!(constant > 1.0);
    }

    // ==========================================================================
    // PLANE / BLOCK / HISTOGRAM TESTS
    // ==========================================================================

    #[test]
    fn test_center_crop_caps_size() {
        let buf = flat(300, 40, 10);
        let plane = Plane::center_crop(&buf, Channel::Luma, MAX_CROP);
        assert_eq!((plane.width, plane.height), (256, 40));
        assert!((plane.mean() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_sampled_plane_is_bounded() {
        let buf = flat(1024, 1024, 0);
        let plane = Plane::sampled(&buf, Channel::Red, SAMPLE_TARGET);
        assert!(plane.len() <= SAMPLE_TARGET);
    }

    #[test]
    fn test_residual_of_flat_is_zero() {
        let plane = Plane::luma(&flat(32, 32, 128));
        assert!(plane.residual().data.iter().all(|v| v.abs() < 1e-9));
    }

    #[test]
    fn test_sobel_vertical_edge() {
        let buf = PixelBuffer::from_fn(16, 16, |x, _| if x < 8 { [0, 0, 0, 255] } else { [255, 255, 255, 255] }).unwrap();
        let grads = Plane::luma(&buf).sobel();
        assert!(grads.magnitude(8, 8) > EDGE_THRESHOLD);
        assert!(grads.gy.get(8, 8).abs() < 1e-9);
        assert!(!grads.edge_points().is_empty());
    }

    #[test]
    fn test_block_stats_only_full_tiles() {
        let plane = Plane::luma(&flat(20, 20, 50));
        let blocks = block_stats(&plane, 8, 8);
        assert_eq!(blocks.len(), 4);
        assert!(blocks.iter().all(|b| b.variance < 1e-9 && (b.mean - 50.0).abs() < 1e-9));
    }

    #[test]
    fn test_histogram_gaps_and_range() {
        let hist = Histogram::from_values(vec![10.0, 12.0, 14.0, 14.0]);
        assert_eq!(hist.range(), Some((10, 14)));
        assert_eq!(hist.gap_count(), 2);
        assert_eq!(hist.occupied(), 3);
        assert_eq!(hist.percentile(0.5), 12);
    }

    #[test]
    fn test_histogram_of_buffer_counts_samples() {
        let hist = Histogram::of(&flat(16, 16, 200), Channel::Luma, SAMPLE_TARGET);
        assert_eq!(hist.total, 256);
        assert_eq!(hist.bins[200], 256);
        assert_eq!(hist.entropy(), 0.0);
    }

    // ==========================================================================
    // AUTOCORRELATION / CO-OCCURRENCE TESTS
    // ==========================================================================

    #[test]
    fn test_autocorrelation_periodic_signal() {
        let values: Vec<f64> = (0..128).map(|i| if i % 8 < 4 { 1.0 } else { -1.0 }).collect();
        let acf = autocorrelation(&values, 16).unwrap();
        assert!((acf[0] - 1.0).abs() < 1e-9);
        assert!(acf[8] > 0.9);
        assert!(acf[4] < -0.9);
    }

    #[test]
    fn test_autocorrelation_lag_is_capped() {
        let values: Vec<f64> = (0..200).map(|i| (i as f64 * 0.3).sin()).collect();
        assert_eq!(autocorrelation(&values, 500).unwrap().len(), MAX_LAG + 1);
        assert!(autocorrelation(&[1.0; 50], 4).is_none());
    }

    #[test]
    fn test_plane_autocorrelation_flat_is_none() {
        let plane = Plane::luma(&flat(32, 32, 128));
        assert!(plane_autocorrelation(&plane, Axis::Horizontal, 4).is_none());
    }

    #[test]
    fn test_glcm_flat_is_perfectly_homogeneous() {
        let glcm = Glcm::new(&Plane::luma(&flat(32, 32, 128)), 16, 1, 0);
        assert_eq!(glcm.contrast(), 0.0);
        assert!((glcm.homogeneity() - 1.0).abs() < 1e-12);
        assert!((glcm.energy() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_lbp_flat_single_code() {
        let hist = lbp_histogram(&Plane::luma(&flat(16, 16, 7)));
        assert_eq!(hist[255], 14 * 14);
    }

    // ==========================================================================
    // TRANSFORM TESTS
    // ==========================================================================

    #[test]
    fn test_dct8_constant_is_dc_only() {
        let out = dct8(&[1.0; 8]);
        assert!((out[0] - 8f64.sqrt()).abs() < 1e-9);
        assert!(out[1..].iter().all(|c| c.abs() < 1e-9));
    }

    #[test]
    fn test_dct_blocks_capped() {
        let plane = Plane::luma(&noise(64, 64, 3));
        assert_eq!(dct_blocks(&plane, 100).len(), 64);
        assert!(dct_blocks(&plane, 10).len() <= 10);
    }

    #[test]
    fn test_spectrum_of_flat_is_empty() {
        let spectrum = Spectrum::of_luma(&flat(32, 32, 128));
        assert!(spectrum.total_energy() < 1e-12);
    }

    #[test]
    fn test_spectrum_finds_vertical_stripes() {
        let buf = PixelBuffer::from_fn(64, 64, |x, _| if x % 4 < 2 { [0, 0, 0, 255] } else { [255, 255, 255, 255] }).unwrap();
        let spectrum = Spectrum::of_luma(&buf);
        // period 4 on a 64-wide plane -> bin 16
        let peak = spectrum.at(16, 0);
        assert!(peak > spectrum.at(5, 5) * 100.0);
    }

    #[test]
    fn test_radial_profile_noise_is_finite() {
        let spectrum = Spectrum::of_luma(&noise(64, 64, 11));
        let profile = spectrum.radial_profile(16);
        assert_eq!(profile.len(), 16);
        assert!(profile.iter().all(|p| p.is_finite() && *p >= 0.0));
    }

    #[test]
    fn test_flatness_noise_beats_stripes() {
        let stripes = PixelBuffer::from_fn(64, 64, |x, _| if x % 4 < 2 { [0, 0, 0, 255] } else { [255, 255, 255, 255] }).unwrap();
        let tonal = Spectrum::of_luma(&stripes).flatness().unwrap();
        let white = Spectrum::of_luma(&noise(64, 64, 5)).flatness().unwrap();
        assert!(white > tonal, "noise {} vs stripes {}", white, tonal);
        assert!(Spectrum::of_luma(&flat(32, 32, 9)).flatness().is_none());
    }
}
