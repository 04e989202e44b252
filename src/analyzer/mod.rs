//! Core analysis engine
//!
//! The [`Analyzer`] runs every registered signal over a [`PixelBuffer`],
//! reduces the signal scores into an `aiScore` and a `confidence`, and
//! classifies the result:
//!
//! ```text
//! PixelBuffer ─► execution (parallel, fault-isolated) ─► aggregate ─► classify ─► AnalysisResult
//! ```
//!
//! Input validation happens once, when the buffer is built. After that a run
//! always produces a verdict: small images degrade to neutral signals, and
//! faulting analyzers are recorded and left out.

pub mod aggregate;
pub mod execution;
pub mod primitives;
pub mod registry;
pub mod signal;
pub mod signals;

pub use aggregate::{classify, ConfidencePolicy, Verdict, AI_THRESHOLD, REAL_THRESHOLD};
pub use execution::{ExecutionOptions, SignalFault};
pub use registry::{SignalInfo, SignalRegistry};
pub use signal::{Category, SignalAnalyzer, SignalResult, SignalStatus};

use crate::config::{PixelotConfig, DEFAULT_MAX_DIMENSION};
use crate::decode::{self, SourceInfo};
use crate::error::PixelotResult;
use crate::pixels::PixelBuffer;
use serde::Serialize;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::info;

/// Facts about the analysed buffer and how much of the registry measured it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub pixel_count: usize,
    pub has_transparency: bool,
    pub measured_signals: usize,
    pub insufficient_signals: usize,
    pub faulted_signals: usize,
}

/// Output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub verdict: Verdict,
    pub confidence: f64,
    pub ai_score: f64,
    pub signals: Vec<SignalResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub faults: Vec<SignalFault>,
    pub metadata: ImageMetadata,
    pub processing_time_ms: u64,
}

impl AnalysisResult {
    /// Measured signals sorted by how strongly they lean AI.
    pub fn top_ai_signals(&self, n: usize) -> Vec<&SignalResult> {
        let mut leaning: Vec<&SignalResult> = self
            .signals
            .iter()
            .filter(|s| s.is_measured() && s.leans_ai())
            .collect();
        leaning.sort_by(|a, b| {
            (b.score * b.weight)
                .total_cmp(&(a.score * a.weight))
                .then_with(|| a.id.cmp(&b.id))
        });
        leaning.truncate(n);
        leaning
    }
}

/// Result of analysing one file. Never carries both a result and an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub file_path: String,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    pub fn verdict(&self) -> Option<Verdict> {
        self.result.as_ref().map(|r| r.verdict)
    }

    fn failed(path: &Path, error: String) -> Self {
        Self {
            file_path: path.display().to_string(),
            file_name: file_name(path),
            source: None,
            result: None,
            error: Some(error),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Main analyzer
#[derive(Debug)]
pub struct Analyzer {
    registry: SignalRegistry,
    options: ExecutionOptions,
    policy: ConfidencePolicy,
    max_dimension: u32,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl Analyzer {
    pub fn new() -> Self {
        Self {
            registry: SignalRegistry::default(),
            options: ExecutionOptions::default(),
            policy: ConfidencePolicy::default(),
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    /// Rebuild the registry with `config` overrides and take its run settings.
    pub fn with_config(mut self, config: &PixelotConfig) -> PixelotResult<Self> {
        self.registry = SignalRegistry::from_config(config)?;
        self.policy = ConfidencePolicy {
            low_confidence: config.low_confidence,
            min_valid_signals: config.min_valid_signals,
        };
        if let Some(ms) = config.deadline_ms {
            self.options.deadline = Some(Duration::from_millis(ms));
        }
        if let Some(jobs) = config.jobs {
            self.options.pool = execution::worker_pool(jobs);
        }
        self.max_dimension = config.max_dimension;
        Ok(self)
    }

    pub fn with_registry(mut self, registry: SignalRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.options.deadline = Some(deadline);
        self
    }

    /// Run signals on a private pool of `jobs` workers, capped at the cores
    /// available. The pool lives as long as the analyzer.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.options.pool = execution::worker_pool(jobs);
        self
    }

    pub fn registry(&self) -> &SignalRegistry {
        &self.registry
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Run the full pipeline on a validated buffer.
    pub fn analyze(&self, pixels: &PixelBuffer) -> AnalysisResult {
        let started = Instant::now();
        let execution = execution::execute(self.registry.analyzers(), pixels, &self.options);
        let aggregate = aggregate::aggregate(&execution, &self.policy);

        let metadata = ImageMetadata {
            width: pixels.width(),
            height: pixels.height(),
            pixel_count: pixels.pixel_count(),
            has_transparency: pixels.has_transparency(),
            measured_signals: execution.measured_count(),
            insufficient_signals: execution.signals.len() - execution.measured_count(),
            faulted_signals: execution.faults.len(),
        };

        info!(
            width = metadata.width,
            height = metadata.height,
            ai_score = aggregate.ai_score,
            confidence = aggregate.confidence,
            verdict = %aggregate.verdict,
            faults = metadata.faulted_signals,
            "analysis complete"
        );

        AnalysisResult {
            verdict: aggregate.verdict,
            confidence: aggregate.confidence,
            ai_score: aggregate.ai_score,
            signals: execution.signals,
            faults: execution.faults,
            metadata,
            processing_time_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Validate a raw RGBA8 buffer and analyse it.
    pub fn analyze_rgba(&self, width: u32, height: u32, bytes: Vec<u8>) -> PixelotResult<AnalysisResult> {
        let pixels = PixelBuffer::new(width, height, bytes)?;
        Ok(self.analyze(&pixels))
    }

    /// Decode and analyse a file. Failures land in [`FileReport::error`].
    pub fn analyze_file<P: AsRef<Path>>(&self, path: P) -> FileReport {
        let path = path.as_ref();
        match decode::load(path, self.max_dimension) {
            Ok(decoded) => FileReport {
                file_path: path.display().to_string(),
                file_name: file_name(path),
                source: Some(decoded.source),
                result: Some(self.analyze(&decoded.pixels)),
                error: None,
            },
            Err(e) => FileReport::failed(path, e.to_string()),
        }
    }
}
