// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition adapter: the seam between the cleanup pipeline and whatever OCR
// engine reads the cleaned image, plus the post-processing of its output.

use capsolve_core::ALLOWLIST;
use capsolve_core::error::Result;
use image::GrayImage;
use tracing::{info, instrument};

/// An OCR engine able to read text from a cleaned binary image.
///
/// Implementations are shared across request handlers, so they must be
/// `Send + Sync`. An engine that is not safe to call concurrently has to
/// serialize calls internally.
pub trait TextRecognizer: Send + Sync {
    /// Read `image` and return the recognized fragments in reading order.
    ///
    /// `allowlist` lists the characters the caller accepts. When
    /// `group_into_paragraphs` is false every detected line is returned as its
    /// own fragment. Nothing recognized is `Ok(vec![])`, not an error.
    fn recognize_text(
        &self,
        image: &GrayImage,
        allowlist: &str,
        group_into_paragraphs: bool,
    ) -> Result<Vec<String>>;
}

/// Concatenate fragments, drop whitespace, uppercase, and keep only
/// characters from `allowlist`.
pub fn sanitize(fragments: &[String], allowlist: &str) -> String {
    fragments
        .iter()
        .flat_map(|fragment| fragment.chars())
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .filter(|c| allowlist.contains(*c))
        .collect()
}

/// Read a finalized captcha with `recognizer` and return the sanitized text.
#[instrument(skip_all, fields(width = image.width(), height = image.height()))]
pub fn solve(recognizer: &dyn TextRecognizer, image: &GrayImage) -> Result<String> {
    let fragments = recognizer.recognize_text(image, ALLOWLIST, false)?;
    info!(raw = ?fragments, "Raw recognition result");

    let text = sanitize(&fragments, ALLOWLIST);
    info!(text = %text, "Solved captcha text");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use capsolve_core::error::CapsolveError;
    use std::sync::Mutex;

    /// Returns canned fragments and records how it was called.
    struct CannedRecognizer {
        fragments: Vec<String>,
        calls: Mutex<Vec<(String, bool)>>,
    }

    impl CannedRecognizer {
        fn new(fragments: &[&str]) -> Self {
            Self {
                fragments: fragments.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextRecognizer for CannedRecognizer {
        fn recognize_text(
            &self,
            _image: &GrayImage,
            allowlist: &str,
            group_into_paragraphs: bool,
        ) -> Result<Vec<String>> {
            self.calls
                .lock()
                .unwrap()
                .push((allowlist.to_string(), group_into_paragraphs));
            Ok(self.fragments.clone())
        }
    }

    struct FailingRecognizer;

    impl TextRecognizer for FailingRecognizer {
        fn recognize_text(&self, _: &GrayImage, _: &str, _: bool) -> Result<Vec<String>> {
            Err(CapsolveError::Ocr("model exploded".into()))
        }
    }

    fn owned(fragments: &[&str]) -> Vec<String> {
        fragments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sanitize_concatenates_uppercases_and_filters() {
        assert_eq!(sanitize(&owned(&["ab", "12!", "c3"]), ALLOWLIST), "AB12C3");
    }

    #[test]
    fn sanitize_strips_whitespace_and_symbols() {
        assert_eq!(sanitize(&owned(&[" X 7\t", "-Q\n"]), ALLOWLIST), "X7Q");
    }

    #[test]
    fn sanitize_empty_is_empty() {
        assert_eq!(sanitize(&[], ALLOWLIST), "");
        assert_eq!(sanitize(&owned(&["", "  ", "?!"]), ALLOWLIST), "");
    }

    #[test]
    fn sanitize_respects_custom_allowlist() {
        assert_eq!(sanitize(&owned(&["a1b2"]), "0123456789"), "12");
    }

    #[test]
    fn solve_uses_allowlist_without_paragraphs() {
        let recognizer = CannedRecognizer::new(&["k9", "z"]);
        let text = solve(&recognizer, &GrayImage::new(4, 4)).unwrap();
        assert_eq!(text, "K9Z");

        let calls = recognizer.calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(ALLOWLIST.to_string(), false)]);
    }

    #[test]
    fn solve_with_nothing_recognized_is_empty_success() {
        let recognizer = CannedRecognizer::new(&[]);
        assert_eq!(solve(&recognizer, &GrayImage::new(4, 4)).unwrap(), "");
    }

    #[test]
    fn solve_propagates_engine_failure() {
        let err = solve(&FailingRecognizer, &GrayImage::new(4, 4)).unwrap_err();
        assert!(matches!(err, CapsolveError::Ocr(_)));
    }
}
