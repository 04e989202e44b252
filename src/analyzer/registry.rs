//! Signal registry
//!
//! An ordered list of analyzers. The default registry is the compiled-in
//! catalog, one [`ThresholdedSignal`] per [`SignalDef`](super::signal::SignalDef),
//! with any [`PixelotConfig`] overrides applied on top. Registration order is
//! the order signals appear in results.

use super::execution::{self, Execution, ExecutionOptions};
use super::signal::{Category, SignalAnalyzer, ThresholdedSignal};
use super::signals;
use crate::config::{PixelotConfig, SignalOverride};
use crate::error::{PixelotError, PixelotResult};
use crate::pixels::PixelBuffer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Listing entry for one registered analyzer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalInfo {
    pub id: String,
    pub name: String,
    pub category: Category,
    pub weight: f64,
    pub min_size: u32,
}

pub struct SignalRegistry {
    analyzers: Vec<Box<dyn SignalAnalyzer>>,
}

impl Default for SignalRegistry {
    fn default() -> Self {
        Self {
            analyzers: signals::catalog()
                .map(|def| Box::new(ThresholdedSignal::new(def)) as Box<dyn SignalAnalyzer>)
                .collect(),
        }
    }
}

impl fmt::Debug for SignalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalRegistry")
            .field("analyzers", &self.ids())
            .finish()
    }
}

impl SignalRegistry {
    pub fn empty() -> Self {
        Self { analyzers: Vec::new() }
    }

    /// The catalog with `config` overrides applied. Disabled signals are left out.
    pub fn from_config(config: &PixelotConfig) -> PixelotResult<Self> {
        config.validate()?;
        let mut analyzers: Vec<Box<dyn SignalAnalyzer>> = Vec::new();
        for def in signals::catalog() {
            let mut signal = ThresholdedSignal::new(def);
            if let Some(signal_override) = config.signal(def.id) {
                if !signal_override.is_enabled() {
                    continue;
                }
                if let Some(weight) = signal_override.weight {
                    signal = signal.with_weight(weight);
                }
                if let Some(table) = &signal_override.table {
                    signal = signal.with_table(table.clone());
                }
            }
            analyzers.push(Box::new(signal));
        }
        Ok(Self { analyzers })
    }

    /// Append an analyzer. Ids must be unique and weights finite and positive.
    pub fn register(&mut self, analyzer: Box<dyn SignalAnalyzer>) -> PixelotResult<()> {
        let id = analyzer.id().to_string();
        if self.get(&id).is_some() {
            return Err(PixelotError::Config(format!("signal `{}` is already registered", id)));
        }
        let weight = analyzer.weight();
        if !weight.is_finite() || weight <= 0.0 {
            return Err(PixelotError::Config(format!(
                "signal `{}`: weight {} must be finite and positive",
                id, weight
            )));
        }
        self.analyzers.push(analyzer);
        Ok(())
    }

    pub fn with<A: SignalAnalyzer + 'static>(mut self, analyzer: A) -> PixelotResult<Self> {
        self.register(Box::new(analyzer))?;
        Ok(self)
    }

    pub fn get(&self, id: &str) -> Option<&dyn SignalAnalyzer> {
        self.analyzers.iter().find(|a| a.id() == id).map(|a| a.as_ref())
    }

    pub fn analyzers(&self) -> &[Box<dyn SignalAnalyzer>] {
        &self.analyzers
    }

    pub fn list(&self) -> Vec<SignalInfo> {
        self.analyzers
            .iter()
            .map(|a| SignalInfo {
                id: a.id().to_string(),
                name: a.name().to_string(),
                category: a.category(),
                weight: a.weight(),
                min_size: a.min_size(),
            })
            .collect()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    pub fn total_weight(&self) -> f64 {
        self.analyzers.iter().map(|a| a.weight()).sum()
    }

    /// Run every analyzer with default options.
    pub fn run_all(&self, pixels: &PixelBuffer) -> Execution {
        execution::execute(&self.analyzers, pixels, &ExecutionOptions::default())
    }

    /// Effective weights and tables of this registry, as a config document.
    pub fn effective_config(&self) -> PixelotConfig {
        let signals: BTreeMap<String, SignalOverride> = self
            .analyzers
            .iter()
            .filter(|a| signals::catalog().any(|def| def.id == a.id()))
            .map(|a| {
                (
                    a.id().to_string(),
                    SignalOverride {
                        weight: Some(a.weight()),
                        enabled: None,
                        table: a.score_table().cloned(),
                    },
                )
            })
            .collect();
        PixelotConfig {
            signals,
            ..PixelotConfig::default()
        }
    }

    /// The compiled-in calibration, ready to be written out and edited.
    pub fn default_config() -> PixelotConfig {
        Self::default().effective_config()
    }
}
