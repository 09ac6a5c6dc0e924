// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for capsolve.

use thiserror::Error;

/// Top-level error type for all capsolve operations.
#[derive(Debug, Error)]
pub enum CapsolveError {
    // -- Request errors --
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // -- Image errors --
    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("preprocessing failed: {0}")]
    Pipeline(String),

    #[error("OCR failed: {0}")]
    Ocr(String),

    // -- Service errors --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("server error: {0}")]
    Server(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CapsolveError {
    /// True when the input bytes never became a pixel grid (bad base64,
    /// unknown format, truncated or empty image).
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, CapsolveError::Decode(_))
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CapsolveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_are_classified() {
        assert!(CapsolveError::Decode("bad png".into()).is_decode_failure());
        assert!(!CapsolveError::Ocr("model".into()).is_decode_failure());
        assert!(!CapsolveError::Pipeline("empty".into()).is_decode_failure());
    }

    #[test]
    fn display_includes_detail() {
        let err = CapsolveError::Ocr("engine not loaded".into());
        assert_eq!(err.to_string(), "OCR failed: engine not loaded");
    }
}
