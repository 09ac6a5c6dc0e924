// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// capsolve-server: the HTTP endpoint in front of the cleanup pipeline and OCR
// engine.

pub mod payload;
pub mod server;

pub use payload::{ErrorResponse, HealthResponse, SolveRequest, SolveResponse, decode_payload};
pub use server::{AppState, CaptchaServer, ServerStatus, build_router};
