//! Pixelot - Estimate whether an image came from a camera or a generator
//!
//! Pixelot runs about eighty independent pixel heuristics ("signals") over a
//! decoded RGBA8 image and combines their weighted scores into one
//! `aiScore`, a `confidence`, and a verdict.
//!
//! # Overview
//!
//! Camera images carry traces of the physical capture chain: sensor noise
//! that rises with brightness, demosaicing correlations, lens vignetting and
//! chromatic aberration, JPEG block grids. Generated images tend to be too
//! clean, too uniform, too saturated, or carry upsampling periodicities. No
//! single signal is decisive; the aggregate is.
//!
//! # Quick Start
//!
//! ```no_run
//! use pixelot::{Analyzer, Verdict};
//!
//! let analyzer = Analyzer::new();
//! let report = analyzer.analyze_file("photo.jpg");
//!
//! match report.result {
//!     Some(result) => {
//!         match result.verdict {
//!             Verdict::Real => println!("Looks like a photograph"),
//!             Verdict::Uncertain => println!("Mixed evidence"),
//!             Verdict::Ai => println!("Looks generated"),
//!         }
//!         println!("Score: {:.0}/100, confidence {:.0}%", result.ai_score, result.confidence);
//!     }
//!     None => println!("Couldn't analyze: {:?}", report.error),
//! }
//! ```
//!
//! # Scoring System
//!
//! | aiScore | Verdict | Meaning |
//! |---------|---------|---------|
//! | 0-40 | REAL | Signals point to a camera capture |
//! | 40-55 | UNCERTAIN | Evidence is mixed or weak |
//! | 55-100 | AI | Signals point to a generator |
//!
//! # Modules
//!
//! - [`analyzer`]: signal catalog, registry, execution and aggregation
//! - [`config`]: JSON overlay for weights and score tables
//! - [`decode`]: image file decoding and bounded downsampling
//! - [`report`]: output formatters (JSON, CSV)

pub mod analyzer;
pub mod config;
pub mod decode;
pub mod error;
pub mod pixels;
pub mod report;

pub use analyzer::{AnalysisResult, Analyzer, FileReport, SignalRegistry, Verdict};
pub use config::PixelotConfig;
pub use error::{ComputationFault, PixelotError, PixelotResult};
pub use pixels::PixelBuffer;

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // PUBLIC API TESTS
    // ==========================================================================
    //
    // These tests verify the public API surface is reachable from the root.
    // ==========================================================================

    #[test]
    fn test_public_exports() {
        let _: Verdict = Verdict::Uncertain;
        let _analyzer = Analyzer::new();
        let _config = PixelotConfig::default();
    }

    #[test]
    fn test_thresholds_exported() {
        assert_eq!(analyzer::AI_THRESHOLD, 55.0);
        assert_eq!(analyzer::REAL_THRESHOLD, 40.0);
    }

    #[test]
    fn test_pixel_buffer_from_root() {
        let pixels = PixelBuffer::filled(2, 2, [1, 2, 3, 4]).unwrap();
        assert_eq!(pixels.pixel_count(), 4);
    }
}
