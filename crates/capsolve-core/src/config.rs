// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.
//
// The pipeline numbers below were tuned by hand against the target captcha
// resolution. They live here so they can be retuned from a config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CapsolveError, Result};

/// Environment variable naming the JSON config file.
pub const CONFIG_ENV: &str = "CAPSOLVE_CONFIG";

/// Largest side accepted for a structuring element.
pub const MAX_KERNEL_SIDE: u32 = 511;

/// Tunable parameters of the cleanup pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Global binarization threshold. Intensities strictly below become ink.
    pub threshold: u8,
    /// Width of the 1-pixel-tall element used to detect rule lines.
    pub line_kernel_width: u32,
    /// How many openings are applied in succession to isolate lines.
    pub line_iterations: u32,
    /// Regions whose border encloses an area at or below this are dropped as
    /// noise.
    pub min_region_area: u32,
    /// Side length of the square element used to close stroke gaps.
    pub repair_kernel: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: 128,
            line_kernel_width: 40,
            line_iterations: 2,
            min_region_area: 3,
            repair_kernel: 3,
        }
    }
}

impl PipelineConfig {
    /// Reject parameter combinations the morphology code cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.line_kernel_width == 0 {
            return Err(CapsolveError::Config(
                "line_kernel_width must be at least 1".into(),
            ));
        }
        if self.line_iterations == 0 {
            return Err(CapsolveError::Config(
                "line_iterations must be at least 1".into(),
            ));
        }
        if self.repair_kernel == 0 {
            return Err(CapsolveError::Config(
                "repair_kernel must be at least 1".into(),
            ));
        }
        for (name, side) in [
            ("line_kernel_width", self.line_kernel_width),
            ("repair_kernel", self.repair_kernel),
        ] {
            if side > MAX_KERNEL_SIDE {
                return Err(CapsolveError::Config(format!(
                    "{name} must be at most {MAX_KERNEL_SIDE}"
                )));
            }
        }
        Ok(())
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// TCP port (0 picks an ephemeral port).
    pub port: u16,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 5000,
            allowed_origins: vec![
                "http://localhost:5000".into(),
                "https://tkglobal.melon.com".into(),
            ],
            max_body_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Full service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
    /// Where the last finalized image is written for inspection. `None`
    /// disables the write.
    pub debug_image_path: Option<PathBuf>,
    /// Directory holding the OCR models. `None` uses the ocrs cache dir.
    pub ocr_model_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            pipeline: PipelineConfig::default(),
            debug_image_path: Some(PathBuf::from("debug_final_for_ocr.png")),
            ocr_model_dir: None,
        }
    }
}

impl AppConfig {
    /// Read a JSON config file. Missing keys fall back to their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: AppConfig = serde_json::from_str(&data)?;
        config.pipeline.validate()?;
        Ok(config)
    }

    /// Load from the file named by `CAPSOLVE_CONFIG`, or use defaults when the
    /// variable is unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(PathBuf::from(path)),
            None => Ok(Self::default()),
        }
    }

    /// Write the config as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuned_values() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.threshold, 128);
        assert_eq!(cfg.line_kernel_width, 40);
        assert_eq!(cfg.line_iterations, 2);
        assert_eq!(cfg.min_region_area, 3);
        assert_eq!(cfg.repair_kernel, 3);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_kernel_is_rejected() {
        let cfg = PipelineConfig {
            line_kernel_width: 0,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(CapsolveError::Config(_))));

        let cfg = PipelineConfig {
            repair_kernel: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn oversized_kernel_is_rejected() {
        let cfg = PipelineConfig {
            line_kernel_width: MAX_KERNEL_SIDE,
            ..Default::default()
        };
        assert!(cfg.validate().is_ok());

        let cfg = PipelineConfig {
            line_kernel_width: MAX_KERNEL_SIDE + 1,
            ..Default::default()
        };
        assert!(matches!(cfg.validate(), Err(CapsolveError::Config(_))));

        let cfg = PipelineConfig {
            repair_kernel: 600,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{"pipeline": {"threshold": 100}, "server": {"port": 8080}}"#)
                .unwrap();
        assert_eq!(cfg.pipeline.threshold, 100);
        assert_eq!(cfg.pipeline.line_kernel_width, 40);
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(
            cfg.debug_image_path,
            Some(PathBuf::from("debug_final_for_ocr.png"))
        );
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capsolve.json");

        let mut cfg = AppConfig::default();
        cfg.server.port = 6123;
        cfg.debug_image_path = None;
        cfg.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn load_rejects_invalid_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"pipeline": {"line_iterations": 0}}"#).unwrap();
        assert!(matches!(AppConfig::load(&path), Err(CapsolveError::Config(_))));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let result = AppConfig::load("/nonexistent/capsolve.json");
        assert!(matches!(result, Err(CapsolveError::Io(_))));
    }
}
