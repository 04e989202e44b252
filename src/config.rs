//! Runtime configuration
//!
//! Every signal's weight and score table are compiled into the catalog. A
//! [`PixelotConfig`] overlays them so thresholds can be recalibrated from a
//! JSON file without rebuilding:
//!
//! ```json
//! {
//!   "signals": {
//!     "noise_level": { "weight": 2.0 },
//!     "aspect_ratio": { "enabled": false },
//!     "hue_entropy": { "table": { "bands": [[0.4, 70.0], [0.8, 45.0]], "otherwise": 35.0 } }
//!   },
//!   "lowConfidence": 20.0,
//!   "deadlineMs": 2000
//! }
//! ```

use crate::analyzer::signal::{ScoreTable, MIN_SIDE};
use crate::analyzer::signals;
use crate::error::{PixelotError, PixelotResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_LOW_CONFIDENCE: f64 = 20.0;
pub const DEFAULT_MIN_VALID_SIGNALS: usize = 2;
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// Per-signal overlay. Unset fields keep the compiled-in value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SignalOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<ScoreTable>,
}

impl SignalOverride {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PixelotConfig {
    pub signals: BTreeMap<String, SignalOverride>,
    /// Confidence reported when too few signals measured the image.
    pub low_confidence: f64,
    pub min_valid_signals: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    /// Longest side after decoding; larger images are downsampled.
    pub max_dimension: u32,
}

impl Default for PixelotConfig {
    fn default() -> Self {
        Self {
            signals: BTreeMap::new(),
            low_confidence: DEFAULT_LOW_CONFIDENCE,
            min_valid_signals: DEFAULT_MIN_VALID_SIGNALS,
            deadline_ms: None,
            jobs: None,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

impl PixelotConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> PixelotResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> PixelotResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> PixelotResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn signal(&self, id: &str) -> Option<&SignalOverride> {
        self.signals.get(id)
    }

    pub fn validate(&self) -> PixelotResult<()> {
        if !self.low_confidence.is_finite() || !(0.0..=100.0).contains(&self.low_confidence) {
            return Err(PixelotError::Config(format!(
                "lowConfidence {} outside [0, 100]",
                self.low_confidence
            )));
        }
        if self.min_valid_signals == 0 {
            return Err(PixelotError::Config("minValidSignals must be at least 1".to_string()));
        }
        if self.max_dimension < MIN_SIDE {
            return Err(PixelotError::Config(format!(
                "maxDimension {} below the {}px minimum",
                self.max_dimension, MIN_SIDE
            )));
        }
        if self.jobs == Some(0) {
            return Err(PixelotError::Config("jobs must be at least 1".to_string()));
        }

        for (id, signal) in &self.signals {
            if !signals::catalog().any(|def| def.id == id) {
                return Err(PixelotError::Config(format!("unknown signal id `{}`", id)));
            }
            if let Some(weight) = signal.weight {
                if !weight.is_finite() || weight <= 0.0 {
                    return Err(PixelotError::Config(format!(
                        "signal `{}`: weight {} must be finite and positive",
                        id, weight
                    )));
                }
            }
            if let Some(table) = &signal.table {
                table
                    .validate()
                    .map_err(|e| PixelotError::Config(format!("signal `{}`: {}", id, e)))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // DEFAULTS AND PARSING
    // ==========================================================================

    #[test]
    fn test_defaults() {
        let config = PixelotConfig::default();
        assert_eq!(config.low_confidence, 20.0);
        assert_eq!(config.min_valid_signals, 2);
        assert_eq!(config.max_dimension, 1024);
        assert!(config.signals.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = PixelotConfig::from_json("{}").unwrap();
        assert_eq!(config, PixelotConfig::default());
    }

    #[test]
    fn test_parse_overrides() {
        let config = PixelotConfig::from_json(
            r#"{
                "signals": {
                    "noise_level": { "weight": 2.5 },
                    "aspect_ratio": { "enabled": false },
                    "hue_entropy": { "table": { "bands": [[0.4, 70.0], [0.8, 45.0]], "otherwise": 35.0 } }
                },
                "lowConfidence": 10.0,
                "deadlineMs": 500,
                "jobs": 4
            }"#,
        )
        .unwrap();

        assert_eq!(config.signal("noise_level").unwrap().weight, Some(2.5));
        assert!(!config.signal("aspect_ratio").unwrap().is_enabled());
        let table = config.signal("hue_entropy").unwrap().table.as_ref().unwrap();
        assert_eq!(table.score(0.5), 45.0);
        assert_eq!(config.low_confidence, 10.0);
        assert_eq!(config.deadline_ms, Some(500));
        assert_eq!(config.jobs, Some(4));
    }

    #[test]
    fn test_round_trips_through_json() {
        let mut config = PixelotConfig::default();
        config.signals.insert(
            "glcm_energy".to_string(),
            SignalOverride {
                weight: Some(0.4),
                ..Default::default()
            },
        );
        let text = config.to_json().unwrap();
        assert!(text.contains("\"lowConfidence\""));
        assert_eq!(PixelotConfig::from_json(&text).unwrap(), config);
    }

    // ==========================================================================
    // VALIDATION
    // ==========================================================================

    #[test]
    fn test_rejects_unknown_signal() {
        let err = PixelotConfig::from_json(r#"{"signals": {"not_a_signal": {"weight": 1.0}}}"#).unwrap_err();
        assert!(err.to_string().contains("not_a_signal"));
    }

    #[test]
    fn test_rejects_bad_weight() {
        for weight in ["0.0", "-1.0"] {
            let text = format!(r#"{{"signals": {{"noise_level": {{"weight": {}}}}}}}"#, weight);
            assert!(matches!(PixelotConfig::from_json(&text), Err(PixelotError::Config(_))));
        }
    }

    #[test]
    fn test_rejects_unordered_table() {
        let text = r#"{"signals": {"noise_level": {"table": {"bands": [[5.0, 10.0], [1.0, 20.0]], "otherwise": 50.0}}}}"#;
        let err = PixelotConfig::from_json(text).unwrap_err();
        assert!(err.to_string().contains("ascending"));
    }

    #[test]
    fn test_rejects_out_of_range_scalars() {
        assert!(PixelotConfig::from_json(r#"{"lowConfidence": 150.0}"#).is_err());
        assert!(PixelotConfig::from_json(r#"{"minValidSignals": 0}"#).is_err());
        assert!(PixelotConfig::from_json(r#"{"maxDimension": 8}"#).is_err());
        assert!(PixelotConfig::from_json(r#"{"jobs": 0}"#).is_err());
    }

    #[test]
    fn test_malformed_json_is_json_error() {
        assert!(matches!(PixelotConfig::from_json("{ nope"), Err(PixelotError::Json(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = PixelotConfig::from_path("/definitely/not/here/pixelot.json");
        assert!(matches!(result, Err(PixelotError::Io(_))));
    }
}
