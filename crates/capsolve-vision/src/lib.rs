// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// capsolve-vision: Image side of the captcha solver.
//
// Provides decoding and alpha flattening, the binary cleanup pipeline
// (threshold, rule-line removal, speckle filtering, stroke repair, inversion),
// a best-effort debug artifact writer, and the recognition adapter that feeds
// the cleaned image to an OCR engine and sanitizes what comes back.

pub mod debug;
pub mod image;
pub mod pipeline;
pub mod recognize;

#[cfg(feature = "ocr")]
pub mod ocr;

// Re-export the primary items so callers can use `capsolve_vision::preprocess` etc.
pub use debug::DebugArtifact;
pub use pipeline::{CaptchaCleaner, preprocess};
pub use recognize::{TextRecognizer, sanitize, solve};

#[cfg(feature = "ocr")]
pub use ocr::OcrEngine;
