// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Debug artifact: the last image handed to the recognizer, saved as PNG for
// offline inspection. Best effort only.

use std::path::{Path, PathBuf};

use image::{GrayImage, ImageFormat};
use tracing::{debug, warn};

/// Writes the finalized image to a fixed path.
///
/// Failures are logged and swallowed; a request never fails because of this.
#[derive(Debug, Clone, Default)]
pub struct DebugArtifact {
    path: Option<PathBuf>,
}

impl DebugArtifact {
    /// `None` disables writing.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.path.is_some()
    }

    /// Save `image` as PNG, overwriting the previous artifact.
    pub fn write(&self, image: &GrayImage) {
        let Some(path) = &self.path else {
            return;
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Err(err) = std::fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %err, "cannot create debug image directory");
                return;
            }
        }

        match image.save_with_format(path, ImageFormat::Png) {
            Ok(()) => debug!(path = %path.display(), "Debug image written"),
            Err(err) => warn!(path = %path.display(), error = %err, "failed to write debug image"),
        }
    }
}
