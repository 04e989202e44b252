//! Signal contract and the thresholded-statistic engine
//!
//! Every heuristic in the catalog has the same shape:
//!
//! ```text
//! guard      image smaller than min_size?  -> neutral 50, "insufficient data"
//! statistic  fn(&PixelBuffer) -> Measurement (pure, bounded cost)
//! table      ScoreTable maps the statistic into [0, 100], higher = more AI-like
//! result     SignalResult with description chosen by score > 55
//! ```
//!
//! Signals are therefore data: a [`SignalDef`] record names the statistic
//! function, the score table and the two phrasings, and [`ThresholdedSignal`]
//! is the single engine that runs any of them. Weights and tables can be
//! swapped from configuration without touching the statistic code.

use crate::error::ComputationFault;
use crate::pixels::PixelBuffer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Score returned when a signal has nothing to say.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// Scores above this use the AI-leaning phrasing.
pub const DESCRIPTION_THRESHOLD: f64 = 55.0;

/// Smallest side any signal will look at.
pub const MIN_SIDE: u32 = 16;

pub const INSUFFICIENT_DATA_TEXT: &str = "Image is too small for this check";
pub const INSUFFICIENT_DATA_KEY: &str = "signals.insufficient_data";

/// Taxonomy of signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Frequency,
    Statistical,
    Sensor,
    Spatial,
    Color,
    Compression,
    Geometric,
    Perceptual,
    Structure,
    Texture,
    Metadata,
}

impl Category {
    pub const ALL: [Category; 11] = [
        Category::Frequency,
        Category::Statistical,
        Category::Sensor,
        Category::Spatial,
        Category::Color,
        Category::Compression,
        Category::Geometric,
        Category::Perceptual,
        Category::Structure,
        Category::Texture,
        Category::Metadata,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Frequency => "frequency",
            Category::Statistical => "statistical",
            Category::Sensor => "sensor",
            Category::Spatial => "spatial",
            Category::Color => "color",
            Category::Compression => "compression",
            Category::Geometric => "geometric",
            Category::Perceptual => "perceptual",
            Category::Structure => "structure",
            Category::Texture => "texture",
            Category::Metadata => "metadata",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Whether a signal actually measured the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalStatus {
    Measured,
    InsufficientData,
}

/// Output of one signal on one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalResult {
    pub id: String,
    pub name: String,
    pub category: Category,
    /// 0 = camera-like, 100 = generator-like.
    pub score: f64,
    pub weight: f64,
    pub description: String,
    pub name_key: String,
    pub description_key: String,
    pub icon: String,
    pub status: SignalStatus,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, f64>,
}

impl SignalResult {
    /// Neutral result for an image below the signal's minimum size.
    pub fn insufficient(id: &str, name: &str, category: Category, weight: f64, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            category,
            score: NEUTRAL_SCORE,
            weight,
            description: INSUFFICIENT_DATA_TEXT.to_string(),
            name_key: name_key(id),
            description_key: INSUFFICIENT_DATA_KEY.to_string(),
            icon: icon.to_string(),
            status: SignalStatus::InsufficientData,
            details: BTreeMap::new(),
        }
    }

    pub fn is_measured(&self) -> bool {
        self.status == SignalStatus::Measured
    }

    /// True when the description uses the AI-leaning phrasing.
    pub fn leans_ai(&self) -> bool {
        self.score > DESCRIPTION_THRESHOLD
    }
}

pub fn name_key(id: &str) -> String {
    format!("signals.{}.name", id)
}

/// Pick the phrasing and its lookup key for a score.
pub fn describe<'a>(id: &str, score: f64, ai_text: &'a str, real_text: &'a str) -> (&'a str, String) {
    if score > DESCRIPTION_THRESHOLD {
        (ai_text, format!("signals.{}.ai", id))
    } else {
        (real_text, format!("signals.{}.real", id))
    }
}

/// Summary statistic produced by a signal's computation step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Measurement {
    pub value: f64,
    pub details: Vec<(&'static str, f64)>,
}

impl Measurement {
    pub fn new(value: f64) -> Self {
        Self {
            value,
            details: Vec::new(),
        }
    }

    /// Attach a named intermediate value for reporting.
    pub fn with(mut self, key: &'static str, value: f64) -> Self {
        self.details.push((key, value));
        self
    }
}

/// Pure computation step of a signal.
pub type Statistic = fn(&PixelBuffer) -> Measurement;

/// Ordered piecewise mapping from a statistic to a score.
///
/// The first band whose upper bound is strictly greater than the statistic
/// wins; values past the last band get `otherwise`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    pub bands: Vec<(f64, f64)>,
    pub otherwise: f64,
}

impl ScoreTable {
    pub fn new(bands: Vec<(f64, f64)>, otherwise: f64) -> Self {
        Self { bands, otherwise }
    }

    pub fn from_static(bands: &[(f64, f64)], otherwise: f64) -> Self {
        Self::new(bands.to_vec(), otherwise)
    }

    pub fn score(&self, value: f64) -> f64 {
        let raw = self
            .bands
            .iter()
            .find(|(upper, _)| value < *upper)
            .map(|(_, score)| *score)
            .unwrap_or(self.otherwise);
        raw.clamp(0.0, 100.0)
    }

    /// Bounds strictly ascending and finite, scores inside `[0, 100]`.
    pub fn validate(&self) -> Result<(), String> {
        let in_range = |s: f64| s.is_finite() && (0.0..=100.0).contains(&s);
        for (i, (upper, score)) in self.bands.iter().enumerate() {
            if !upper.is_finite() {
                return Err(format!("band {} has a non-finite bound", i));
            }
            if !in_range(*score) {
                return Err(format!("band {} score {} outside [0, 100]", i, score));
            }
            if i > 0 && *upper <= self.bands[i - 1].0 {
                return Err(format!(
                    "band bounds must be strictly ascending ({} after {})",
                    upper,
                    self.bands[i - 1].0
                ));
            }
        }
        if !in_range(self.otherwise) {
            return Err(format!("otherwise score {} outside [0, 100]", self.otherwise));
        }
        Ok(())
    }
}

/// Declarative description of one catalog signal.
#[derive(Debug, Clone, Copy)]
pub struct SignalDef {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Category,
    pub weight: f64,
    pub min_size: u32,
    pub icon: &'static str,
    pub statistic: Statistic,
    pub bands: &'static [(f64, f64)],
    pub otherwise: f64,
    pub ai_text: &'static str,
    pub real_text: &'static str,
}

impl SignalDef {
    pub fn table(&self) -> ScoreTable {
        ScoreTable::from_static(self.bands, self.otherwise)
    }
}

/// Anything the registry can run.
pub trait SignalAnalyzer: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn category(&self) -> Category;
    fn weight(&self) -> f64;

    fn icon(&self) -> &str {
        "activity"
    }

    fn min_size(&self) -> u32 {
        MIN_SIDE
    }

    /// Score table, for analyzers driven by one.
    fn score_table(&self) -> Option<&ScoreTable> {
        None
    }

    /// Run against one image. Must be deterministic and must not keep the buffer.
    fn analyze(&self, pixels: &PixelBuffer) -> Result<SignalResult, ComputationFault>;
}

/// The generic engine: a [`SignalDef`] plus its effective weight and table.
#[derive(Debug, Clone)]
pub struct ThresholdedSignal {
    def: &'static SignalDef,
    weight: f64,
    table: ScoreTable,
}

impl ThresholdedSignal {
    pub fn new(def: &'static SignalDef) -> Self {
        Self {
            def,
            weight: def.weight,
            table: def.table(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_table(mut self, table: ScoreTable) -> Self {
        self.table = table;
        self
    }

    pub fn def(&self) -> &'static SignalDef {
        self.def
    }

    pub fn table(&self) -> &ScoreTable {
        &self.table
    }

    /// Computation step with the finiteness invariant enforced.
    pub fn measure(&self, pixels: &PixelBuffer) -> Result<Measurement, ComputationFault> {
        let measurement = (self.def.statistic)(pixels);
        if !measurement.value.is_finite() {
            return Err(ComputationFault::NonFinite {
                statistic: self.def.id.to_string(),
            });
        }
        if let Some((key, _)) = measurement.details.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ComputationFault::NonFinite {
                statistic: format!("{}.{}", self.def.id, key),
            });
        }
        Ok(measurement)
    }

    fn build(&self, score: f64, measurement: Measurement) -> SignalResult {
        let (description, description_key) =
            describe(self.def.id, score, self.def.ai_text, self.def.real_text);
        let mut details: BTreeMap<String, f64> = measurement
            .details
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        details.insert("value".to_string(), measurement.value);

        SignalResult {
            id: self.def.id.to_string(),
            name: self.def.name.to_string(),
            category: self.def.category,
            score,
            weight: self.weight,
            description: description.to_string(),
            name_key: name_key(self.def.id),
            description_key,
            icon: self.def.icon.to_string(),
            status: SignalStatus::Measured,
            details,
        }
    }
}

impl SignalAnalyzer for ThresholdedSignal {
    fn id(&self) -> &str {
        self.def.id
    }

    fn name(&self) -> &str {
        self.def.name
    }

    fn category(&self) -> Category {
        self.def.category
    }

    fn weight(&self) -> f64 {
        self.weight
    }

    fn icon(&self) -> &str {
        self.def.icon
    }

    fn min_size(&self) -> u32 {
        self.def.min_size.max(MIN_SIDE)
    }

    fn score_table(&self) -> Option<&ScoreTable> {
        Some(&self.table)
    }

    fn analyze(&self, pixels: &PixelBuffer) -> Result<SignalResult, ComputationFault> {
        if !pixels.fits(self.min_size()) {
            return Ok(SignalResult::insufficient(
                self.def.id,
                self.def.name,
                self.def.category,
                self.weight,
                self.def.icon,
            ));
        }
        let measurement = self.measure(pixels)?;
        let score = self.table.score(measurement.value);
        Ok(self.build(score, measurement))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mean_red(pixels: &PixelBuffer) -> Measurement {
        let sum: f64 = pixels.as_bytes().chunks_exact(4).map(|p| p[0] as f64).sum();
        Measurement::new(sum / pixels.pixel_count() as f64).with("pixels", pixels.pixel_count() as f64)
    }

    fn always_nan(_: &PixelBuffer) -> Measurement {
        Measurement::new(f64::NAN)
    }

    static MEAN_RED: SignalDef = SignalDef {
        id: "mean_red",
        name: "Mean red",
        category: Category::Color,
        weight: 1.5,
        min_size: 16,
        icon: "palette",
        statistic: mean_red,
        bands: &[(50.0, 80.0), (150.0, 40.0)],
        otherwise: 10.0,
        ai_text: "Red channel looks synthetic",
        real_text: "Red channel looks natural",
    };

    static BROKEN: SignalDef = SignalDef {
        id: "broken",
        name: "Broken",
        category: Category::Statistical,
        weight: 1.0,
        min_size: 16,
        icon: "bug",
        statistic: always_nan,
        bands: &[],
        otherwise: 50.0,
        ai_text: "",
        real_text: "",
    };

    fn gray(w: u32, h: u32, v: u8) -> PixelBuffer {
        PixelBuffer::filled(w, h, [v, v, v, 255]).unwrap()
    }

    // ==========================================================================
    // SCORE TABLE TESTS
    // ==========================================================================
    //
    // Tables are ordered (upper_bound, score) bands. The first bound strictly
    // greater than the statistic decides the score.
    // ==========================================================================

    #[test]
    fn test_table_band_selection() {
        let table = ScoreTable::new(vec![(0.0, 50.0), (1.0, 70.0), (2.0, 40.0)], 20.0);
        assert_eq!(table.score(-1.0), 50.0);
        assert_eq!(table.score(0.0), 70.0);
        assert_eq!(table.score(1.5), 40.0);
        assert_eq!(table.score(2.0), 20.0);
        assert_eq!(table.score(99.0), 20.0);
    }

    #[test]
    fn test_table_clamps_scores() {
        let table = ScoreTable::new(vec![], 150.0);
        assert_eq!(table.score(0.0), 100.0);
    }

    #[test]
    fn test_table_validation() {
        assert!(ScoreTable::new(vec![(1.0, 10.0), (2.0, 20.0)], 30.0).validate().is_ok());
        assert!(ScoreTable::new(vec![(2.0, 10.0), (1.0, 20.0)], 30.0).validate().is_err());
        assert!(ScoreTable::new(vec![(1.0, 10.0), (1.0, 20.0)], 30.0).validate().is_err());
        assert!(ScoreTable::new(vec![(1.0, 101.0)], 30.0).validate().is_err());
        assert!(ScoreTable::new(vec![(f64::NAN, 10.0)], 30.0).validate().is_err());
        assert!(ScoreTable::new(vec![], -1.0).validate().is_err());
    }

    #[test]
    fn test_table_roundtrips_through_json() {
        let table = ScoreTable::new(vec![(0.5, 60.0)], 30.0);
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"bands":[[0.5,60.0]],"otherwise":30.0}"#);
    }

    // ==========================================================================
    // DESCRIPTION TESTS
    // ==========================================================================

    #[test]
    fn test_describe_threshold_is_strict() {
        let (text, key) = describe("x", 55.0, "ai", "real");
        assert_eq!((text, key.as_str()), ("real", "signals.x.real"));
        let (text, key) = describe("x", 55.01, "ai", "real");
        assert_eq!((text, key.as_str()), ("ai", "signals.x.ai"));
    }

    // ==========================================================================
    // ENGINE TESTS
    // ==========================================================================

    #[test]
    fn test_engine_guard_returns_neutral() {
        let signal = ThresholdedSignal::new(&MEAN_RED);
        let result = signal.analyze(&gray(8, 8, 10)).unwrap();
        assert_eq!(result.score, NEUTRAL_SCORE);
        assert_eq!(result.weight, 1.5);
        assert_eq!(result.status, SignalStatus::InsufficientData);
        assert_eq!(result.description, INSUFFICIENT_DATA_TEXT);
        assert_eq!(result.description_key, INSUFFICIENT_DATA_KEY);
        assert!(result.details.is_empty());
    }

    #[test]
    fn test_engine_guard_checks_both_sides() {
        let signal = ThresholdedSignal::new(&MEAN_RED);
        assert!(!signal.analyze(&gray(64, 15, 10)).unwrap().is_measured());
        assert!(signal.analyze(&gray(16, 16, 10)).unwrap().is_measured());
    }

    #[test]
    fn test_engine_scores_through_table() {
        let signal = ThresholdedSignal::new(&MEAN_RED);
        let dark = signal.analyze(&gray(16, 16, 10)).unwrap();
        assert_eq!(dark.score, 80.0);
        assert_eq!(dark.description, "Red channel looks synthetic");
        assert_eq!(dark.description_key, "signals.mean_red.ai");
        assert_eq!(dark.details.get("value"), Some(&10.0));
        assert_eq!(dark.details.get("pixels"), Some(&256.0));

        let bright = signal.analyze(&gray(16, 16, 200)).unwrap();
        assert_eq!(bright.score, 10.0);
        assert_eq!(bright.description_key, "signals.mean_red.real");
    }

    #[test]
    fn test_engine_table_and_weight_override() {
        let signal = ThresholdedSignal::new(&MEAN_RED)
            .with_weight(3.0)
            .with_table(ScoreTable::new(vec![], 99.0));
        let result = signal.analyze(&gray(16, 16, 200)).unwrap();
        assert_eq!(result.score, 99.0);
        assert_eq!(result.weight, 3.0);
        // the static definition is untouched
        assert_eq!(MEAN_RED.weight, 1.5);
    }

    #[test]
    fn test_engine_non_finite_is_fault() {
        let signal = ThresholdedSignal::new(&BROKEN);
        let fault = signal.analyze(&gray(16, 16, 0)).unwrap_err();
        assert_eq!(
            fault,
            ComputationFault::NonFinite {
                statistic: "broken".to_string()
            }
        );
    }

    #[test]
    fn test_engine_is_deterministic() {
        let signal = ThresholdedSignal::new(&MEAN_RED);
        let img = gray(20, 20, 99);
        assert_eq!(signal.analyze(&img).unwrap(), signal.analyze(&img).unwrap());
    }

    #[test]
    fn test_signal_result_wire_names() {
        let result = SignalResult::insufficient("edge_density", "Edge density", Category::Spatial, 1.0, "grid");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["name"], "Edge density");
        assert_eq!(json["score"], 50.0);
        assert_eq!(json["category"], "spatial");
        assert_eq!(json["descriptionKey"], INSUFFICIENT_DATA_KEY);
        assert_eq!(json["status"], "insufficientData");
        assert!(json.get("details").is_none());
    }
}
