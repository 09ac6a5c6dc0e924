// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Wire types for the solve endpoint and the base64 payload decoding in front
// of the pipeline.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use capsolve_core::error::{CapsolveError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Body of `POST /solve_captcha`.
#[derive(Debug, Clone, Deserialize)]
pub struct SolveRequest {
    /// Raw base64 image, or a data URL (`data:image/png;base64,<payload>`).
    #[serde(default)]
    pub image_data: Option<String>,
}

impl SolveRequest {
    /// Parse a JSON body. `None` when the body is not JSON, not an object, or
    /// has no string `image_data`.
    pub fn parse(body: &[u8]) -> Option<String> {
        serde_json::from_slice::<SolveRequest>(body)
            .ok()
            .and_then(|req| req.image_data)
    }
}

/// Successful solve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveResponse {
    pub text: String,
}

/// Error body. `message` carries the underlying failure for internal errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health probe body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub requests_served: u64,
}

/// The base64 part of a payload: everything after the first comma, or the
/// whole string if there is none.
pub fn extract_base64(payload: &str) -> &str {
    match payload.split_once(',') {
        Some((_, encoded)) => encoded,
        None => payload,
    }
}

/// Strip any data-URL prefix and base64-decode the rest. ASCII whitespace
/// anywhere in the payload is ignored, so line-wrapped base64 decodes.
///
/// # Errors
///
/// Returns [`CapsolveError::Decode`] for invalid base64.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>> {
    let encoded: Vec<u8> = extract_base64(payload)
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    STANDARD
        .decode(&encoded)
        .map_err(|err| CapsolveError::Decode(format!("invalid base64 payload: {}", err)))
}

/// SHA-256 of the decoded image, lowercase hex. Used to correlate log lines
/// with the debug artifact.
pub fn fingerprint(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
