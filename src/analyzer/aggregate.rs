//! Score aggregation and verdict classification
//!
//! ```text
//! aiScore    = Σ score·weight / Σ weight              (50 when Σ weight = 0)
//! σ          = weighted std of measured scores around aiScore
//! agreement  = max(0, 1 − σ/50)
//! coverage   = measured weight / scheduled weight
//! confidence = 100 · agreement · coverage             (low_confidence if too few measured)
//! ```
//!
//! Guarded signals count toward `aiScore` at their neutral 50, which pulls
//! small images toward the middle. They do not count toward σ, but they do
//! lower coverage. Faulted analyzers only lower coverage.

use super::execution::Execution;
use super::signal::{SignalResult, NEUTRAL_SCORE};
use crate::config::{DEFAULT_LOW_CONFIDENCE, DEFAULT_MIN_VALID_SIGNALS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores at or above this are classified as generated.
pub const AI_THRESHOLD: f64 = 55.0;

/// Scores at or below this are classified as camera output.
pub const REAL_THRESHOLD: f64 = 40.0;

/// Standard deviation at which agreement reaches zero.
const MAX_SPREAD: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Ai,
    Real,
    Uncertain,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Ai => write!(f, "AI"),
            Verdict::Real => write!(f, "REAL"),
            Verdict::Uncertain => write!(f, "UNCERTAIN"),
        }
    }
}

/// Map an aggregate score to a verdict. Depends on nothing else.
pub fn classify(ai_score: f64) -> Verdict {
    if ai_score >= AI_THRESHOLD {
        Verdict::Ai
    } else if ai_score <= REAL_THRESHOLD {
        Verdict::Real
    } else {
        Verdict::Uncertain
    }
}

/// Weighted mean score over every returned signal.
pub fn ai_score(signals: &[SignalResult]) -> f64 {
    let total_weight: f64 = signals.iter().map(|s| s.weight).sum();
    if total_weight <= 0.0 {
        return NEUTRAL_SCORE;
    }
    let weighted: f64 = signals.iter().map(|s| s.score * s.weight).sum();
    (weighted / total_weight).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidencePolicy {
    pub low_confidence: f64,
    pub min_valid_signals: usize,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            low_confidence: DEFAULT_LOW_CONFIDENCE,
            min_valid_signals: DEFAULT_MIN_VALID_SIGNALS,
        }
    }
}

/// Agreement of measured signals around `ai_score`, scaled by coverage.
pub fn confidence(signals: &[SignalResult], ai_score: f64, scheduled_weight: f64, policy: &ConfidencePolicy) -> f64 {
    let measured: Vec<&SignalResult> = signals.iter().filter(|s| s.is_measured()).collect();
    let measured_weight: f64 = measured.iter().map(|s| s.weight).sum();
    if measured.len() < policy.min_valid_signals || measured_weight <= 0.0 {
        return policy.low_confidence.clamp(0.0, 100.0);
    }

    let variance = measured
        .iter()
        .map(|s| s.weight * (s.score - ai_score).powi(2))
        .sum::<f64>()
        / measured_weight;
    let agreement = (1.0 - variance.sqrt() / MAX_SPREAD).max(0.0);
    let coverage = if scheduled_weight > 0.0 {
        (measured_weight / scheduled_weight).min(1.0)
    } else {
        1.0
    };
    (100.0 * agreement * coverage).clamp(0.0, 100.0)
}

/// Reduced view of one execution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub ai_score: f64,
    pub confidence: f64,
    pub verdict: Verdict,
}

pub fn aggregate(execution: &Execution, policy: &ConfidencePolicy) -> Aggregate {
    let score = ai_score(&execution.signals);
    Aggregate {
        ai_score: score,
        confidence: confidence(&execution.signals, score, execution.scheduled_weight, policy),
        verdict: classify(score),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::signal::{Category, SignalStatus};

    fn signal(score: f64, weight: f64) -> SignalResult {
        let mut s = SignalResult::insufficient("s", "S", Category::Texture, weight, "x");
        s.score = score;
        s.status = SignalStatus::Measured;
        s
    }

    fn guarded(weight: f64) -> SignalResult {
        SignalResult::insufficient("g", "G", Category::Texture, weight, "x")
    }

    // ==========================================================================
    // VERDICT BOUNDARIES
    // ==========================================================================
    //
    // Bands are inclusive on both ends: 55 is ai, 40 is real.
    // ==========================================================================

    #[test]
    fn test_verdict_boundaries() {
        assert_eq!(classify(55.0), Verdict::Ai);
        assert_eq!(classify(54.999), Verdict::Uncertain);
        assert_eq!(classify(40.0), Verdict::Real);
        assert_eq!(classify(40.001), Verdict::Uncertain);
        assert_eq!(classify(100.0), Verdict::Ai);
        assert_eq!(classify(0.0), Verdict::Real);
        assert_eq!(classify(50.0), Verdict::Uncertain);
    }

    #[test]
    fn test_verdict_wire_and_display() {
        assert_eq!(serde_json::to_string(&Verdict::Ai).unwrap(), "\"ai\"");
        assert_eq!(serde_json::to_string(&Verdict::Uncertain).unwrap(), "\"uncertain\"");
        assert_eq!(Verdict::Real.to_string(), "REAL");
    }

    // ==========================================================================
    // AI SCORE
    // ==========================================================================

    #[test]
    fn test_weighted_mean() {
        let signals = vec![signal(80.0, 3.0), signal(20.0, 1.0)];
        assert!((ai_score(&signals) - 65.0).abs() < 1e-12);
    }

    #[test]
    fn test_guarded_signals_pull_to_neutral() {
        let signals = vec![signal(90.0, 1.0), guarded(1.0)];
        assert!((ai_score(&signals) - 70.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_is_neutral() {
        assert_eq!(ai_score(&[]), 50.0);
    }

    // ==========================================================================
    // CONFIDENCE
    // ==========================================================================

    #[test]
    fn test_unanimous_is_full_confidence() {
        let signals = vec![signal(70.0, 1.0), signal(70.0, 2.0)];
        let c = confidence(&signals, ai_score(&signals), 3.0, &ConfidencePolicy::default());
        assert!((c - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_confidence_falls_with_dispersion() {
        let policy = ConfidencePolicy::default();
        let mut last = f64::INFINITY;
        for spread in [0.0, 5.0, 15.0, 30.0, 50.0] {
            let signals = vec![signal(50.0 - spread, 1.0), signal(50.0 + spread, 1.0)];
            let c = confidence(&signals, ai_score(&signals), 2.0, &policy);
            assert!(c <= last, "spread {} gave {} after {}", spread, c, last);
            last = c;
        }
        assert_eq!(last, 0.0);
    }

    #[test]
    fn test_coverage_scales_confidence() {
        let signals = vec![signal(60.0, 1.0), signal(60.0, 1.0)];
        let policy = ConfidencePolicy::default();
        let full = confidence(&signals, 60.0, 2.0, &policy);
        let half = confidence(&signals, 60.0, 4.0, &policy);
        assert!((full - 100.0).abs() < 1e-9);
        assert!((half - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_measured_is_low() {
        let policy = ConfidencePolicy {
            low_confidence: 20.0,
            min_valid_signals: 2,
        };
        let signals = vec![signal(90.0, 1.0), guarded(1.0), guarded(1.0)];
        assert_eq!(confidence(&signals, ai_score(&signals), 3.0, &policy), 20.0);
    }

    #[test]
    fn test_aggregate_from_execution() {
        let execution = Execution {
            signals: vec![signal(80.0, 1.0), signal(60.0, 1.0)],
            faults: Vec::new(),
            scheduled_weight: 2.0,
        };
        let agg = aggregate(&execution, &ConfidencePolicy::default());
        assert_eq!(agg.ai_score, 70.0);
        assert_eq!(agg.verdict, Verdict::Ai);
        // σ = 10 -> agreement 0.8
        assert!((agg.confidence - 80.0).abs() < 1e-9);
    }
}
