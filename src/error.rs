//! Error types
//!
//! Two families live here:
//!
//! - [`PixelotError`]: request-level failures. An invalid pixel buffer, a bad
//!   configuration file, or an undecodable image aborts the whole request.
//! - [`ComputationFault`]: a single analyzer misbehaving. These never abort a
//!   run; the execution layer records them next to the signals that did work.

use serde::Serialize;
use thiserror::Error;

/// Root error type for request-level failures.
#[derive(Error, Debug)]
pub enum PixelotError {
    /// Buffer length does not match `width * height * 4`, or a dimension is zero.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Configuration failed to parse or validate.
    #[error("config error: {0}")]
    Config(String),

    /// The image could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<image::ImageError> for PixelotError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(io) => PixelotError::Io(io),
            other => PixelotError::Decode(other.to_string()),
        }
    }
}

pub type PixelotResult<T> = Result<T, PixelotError>;

/// Failure inside one analyzer after its size guard passed.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ComputationFault {
    /// The analyzer panicked; the panic payload is kept when it is a string.
    #[error("analyzer panicked: {message}")]
    Panicked { message: String },

    /// The statistic came back NaN or infinite.
    #[error("statistic `{statistic}` is not finite")]
    NonFinite { statistic: String },

    /// The run deadline passed before this analyzer was started.
    #[error("skipped: run deadline of {deadline_ms}ms exceeded")]
    DeadlineExceeded { deadline_ms: u64 },

    /// An internal invariant of the analyzer did not hold.
    #[error("invariant violated: {detail}")]
    Invariant { detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_message() {
        let err = PixelotError::InvalidInput("length 12 != 16".to_string());
        assert_eq!(err.to_string(), "invalid input: length 12 != 16");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.png");
        let err: PixelotError = io.into();
        assert!(matches!(err, PixelotError::Io(_)));
    }

    #[test]
    fn test_fault_serializes_with_kind_tag() {
        let fault = ComputationFault::NonFinite {
            statistic: "spectral_slope".to_string(),
        };
        let json = serde_json::to_string(&fault).unwrap();
        assert!(json.contains("\"kind\":\"nonFinite\""), "got {}", json);
        assert!(json.contains("spectral_slope"));
    }

    #[test]
    fn test_deadline_fault_message() {
        let fault = ComputationFault::DeadlineExceeded { deadline_ms: 250 };
        assert_eq!(fault.to_string(), "skipped: run deadline of 250ms exceeded");
    }
}
