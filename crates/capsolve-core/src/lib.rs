// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// capsolve: Core types, configuration and error definitions shared across
// all crates.

pub mod config;
pub mod error;

pub use config::{AppConfig, PipelineConfig, ServerConfig};
pub use error::{CapsolveError, Result};

/// Characters the recognizer may emit. Everything else is stripped from the
/// engine output.
pub const ALLOWLIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
