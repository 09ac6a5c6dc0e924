// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// OCR engine backed by the `ocrs` crate, a pure-Rust OCR engine running
// neural network models through `rten`.
//
// # Feature Gate
//
// This module is only available when the `ocr` feature is enabled:
//
// ```toml
// capsolve-vision = { path = "crates/capsolve-vision", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine requires two model files:
//
// - **Detection model** (`text-detection.rten`): locates text regions in the image.
// - **Recognition model** (`text-recognition.rten`): decodes characters from detected regions.
//
// Running the `ocrs-cli` tool once downloads both into `~/.cache/ocrs/`:
//   ```sh
//   cargo install ocrs-cli
//   ocrs some-image.png
//   ```
//
// # Concurrency
//
// Loading the models is the expensive part, so the server builds one engine at
// startup and shares it. Calls into the engine are serialized through a
// mutex; `ocrs` already parallelizes a single recognition internally, and
// preprocessing of other requests continues while one holds the lock.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use capsolve_core::ALLOWLIST;
use capsolve_core::error::{CapsolveError, Result};
use image::{DynamicImage, GrayImage};
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams};
use rten::Model;
use tracing::{debug, info, instrument};

use crate::recognize::TextRecognizer;

/// Well-known filenames for the detection and recognition models.
const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Default directory for cached OCR model files: `$XDG_CACHE_HOME/ocrs`,
/// falling back to `~/.cache/ocrs`.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to load the OCR models from.
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Path to the text-detection model file (`.rten`).
    pub detection_model_path: PathBuf,
    /// Path to the text-recognition model file (`.rten`).
    pub recognition_model_path: PathBuf,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrConfig {
    /// Expects `dir` to contain `text-detection.rten` and
    /// `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Use the given directory, or the ocrs cache directory when `None`.
    pub fn from_optional_dir(dir: Option<&Path>) -> Self {
        dir.map(Self::from_dir).unwrap_or_default()
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for (kind, path) in [
            ("detection", &self.detection_model_path),
            ("recognition", &self.recognition_model_path),
        ] {
            if !path.exists() {
                return Err(CapsolveError::Ocr(format!(
                    "{kind} model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Engine parameters with recognition restricted to [`ALLOWLIST`]. The
/// decoder then picks the best allowed character instead of dropping a
/// disallowed one afterwards.
fn restricted_params() -> OcrEngineParams {
    OcrEngineParams {
        allowed_chars: Some(ALLOWLIST.to_string()),
        ..Default::default()
    }
}

/// Process-wide OCR engine. Recognition is restricted to [`ALLOWLIST`].
pub struct OcrEngine {
    engine: Mutex<OcrsEngine>,
}

impl OcrEngine {
    /// Load both models and build the engine.
    ///
    /// # Errors
    ///
    /// Returns [`CapsolveError::Ocr`] if model files are missing or corrupt.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR detection model");
        let detection_model = Model::load_file(&config.detection_model_path).map_err(|err| {
            CapsolveError::Ocr(format!(
                "failed to load detection model from {}: {}",
                config.detection_model_path.display(),
                err
            ))
        })?;

        info!("Loading OCR recognition model");
        let recognition_model =
            Model::load_file(&config.recognition_model_path).map_err(|err| {
                CapsolveError::Ocr(format!(
                    "failed to load recognition model from {}: {}",
                    config.recognition_model_path.display(),
                    err
                ))
            })?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..restricted_params()
        })
        .map_err(|err| CapsolveError::Ocr(format!("failed to initialise OCR engine: {}", err)))?;

        info!("OCR engine initialised");
        Ok(Self {
            engine: Mutex::new(engine),
        })
    }

    /// Detect words, group them into lines, and read each line.
    fn read_lines(&self, image: &GrayImage) -> Result<Vec<String>> {
        let rgb = DynamicImage::ImageLuma8(image.clone()).to_rgb8();
        let (width, height) = rgb.dimensions();

        let engine = self
            .engine
            .lock()
            .map_err(|_| CapsolveError::Ocr("OCR engine lock poisoned".into()))?;

        let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
            CapsolveError::Ocr(format!(
                "failed to create image source ({}x{}): {}",
                width, height, err
            ))
        })?;

        let input = engine
            .prepare_input(source)
            .map_err(|err| CapsolveError::Ocr(format!("OCR preprocessing failed: {}", err)))?;

        let word_rects = engine
            .detect_words(&input)
            .map_err(|err| CapsolveError::Ocr(format!("word detection failed: {}", err)))?;
        debug!(word_count = word_rects.len(), "Words detected");

        let line_rects = engine.find_text_lines(&input, &word_rects);
        debug!(line_count = line_rects.len(), "Text lines found");

        let line_texts = engine
            .recognize_text(&input, &line_rects)
            .map_err(|err| CapsolveError::Ocr(format!("line recognition failed: {}", err)))?;

        Ok(line_texts
            .iter()
            .flatten()
            .map(|line| line.to_string())
            .filter(|text| !text.trim().is_empty())
            .collect())
    }
}

impl TextRecognizer for OcrEngine {
    /// The engine already decodes over [`ALLOWLIST`]. Lines are still
    /// uppercased and filtered against `allowlist` so a caller passing a
    /// narrower set only sees characters from it.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    fn recognize_text(
        &self,
        image: &GrayImage,
        allowlist: &str,
        group_into_paragraphs: bool,
    ) -> Result<Vec<String>> {
        let lines: Vec<String> = self
            .read_lines(image)?
            .into_iter()
            .map(|line| {
                line.chars()
                    .flat_map(char::to_uppercase)
                    .filter(|c| c.is_whitespace() || allowlist.contains(*c))
                    .collect::<String>()
            })
            .filter(|line| !line.trim().is_empty())
            .collect();

        if group_into_paragraphs && !lines.is_empty() {
            return Ok(vec![lines.join(" ")]);
        }
        Ok(lines)
    }
}
