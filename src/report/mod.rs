//! Report generation for batches of analysed files
//!
//! - **JSON**: the full per-file results plus a summary, camelCase wire names
//! - **CSV**: one row per file for spreadsheets
//!
//! # Usage
//!
//! ```ignore
//! use pixelot::report;
//!
//! // Automatically picks format based on extension
//! report::generate("report.json", &reports)?;  // JSON
//! report::generate("report.csv", &reports)?;   // CSV
//! ```

pub mod csv;
pub mod json;

use crate::analyzer::{FileReport, Verdict};
use serde::Serialize;
use std::io;
use std::path::Path;

/// Generate a report in the appropriate format based on file extension
pub fn generate<P: AsRef<Path>>(path: P, reports: &[FileReport]) -> io::Result<()> {
    let path = path.as_ref();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let mut file = std::fs::File::create(path)?;

    match ext.as_str() {
        "json" => json::write(&mut file, reports),
        _ => csv::write(&mut file, reports),
    }
}

/// Verdict counts for a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub ai: usize,
    pub real: usize,
    pub uncertain: usize,
    pub error: usize,
}

impl Summary {
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut summary = Self {
            total: reports.len(),
            ..Self::default()
        };

        for r in reports {
            match r.verdict() {
                Some(Verdict::Ai) => summary.ai += 1,
                Some(Verdict::Real) => summary.real += 1,
                Some(Verdict::Uncertain) => summary.uncertain += 1,
                None => summary.error += 1,
            }
        }

        summary
    }

    /// Process exit code: 2 if anything looks generated, 1 if anything is unsure.
    pub fn exit_code(&self) -> i32 {
        if self.ai > 0 {
            2
        } else if self.uncertain > 0 {
            1
        } else {
            0
        }
    }
}
