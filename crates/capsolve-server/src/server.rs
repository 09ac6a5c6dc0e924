// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP front end for the captcha solver.
//
// # Routes
//
//   - POST /solve_captcha   {"image_data": "<base64 or data URL>"} -> {"text": "..."}
//   - GET  /health          liveness probe with uptime and request count
//
// # Threading
//
// Decoding, cleanup and recognition are CPU bound, so each runs on the
// blocking pool. The debug artifact is written from its own blocking task
// that the handler never awaits.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use capsolve_core::config::{AppConfig, PipelineConfig, ServerConfig};
use capsolve_core::error::{CapsolveError, Result};
use capsolve_vision::{DebugArtifact, TextRecognizer, preprocess, solve};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{Instrument, Span, debug, error, field, info, info_span, warn};
use uuid::Uuid;

use crate::payload::{
    ErrorResponse, HealthResponse, SolveRequest, SolveResponse, decode_payload, fingerprint,
};

const INVALID_PAYLOAD: &str = "Missing or invalid image_data in JSON payload";
const PROCESS_FAILED: &str = "Failed to process image";
const INTERNAL_ERROR: &str = "An internal server error occurred";

/// Lifecycle state of the HTTP listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerStatus {
    Stopped,
    Starting,
    Running,
    Error,
}

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: PipelineConfig,
    pub recognizer: Arc<dyn TextRecognizer>,
    pub debug: DebugArtifact,
    pub started_at: DateTime<Utc>,
    pub requests_served: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: &AppConfig, recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self {
            pipeline: config.pipeline.clone(),
            recognizer,
            debug: DebugArtifact::new(config.debug_image_path.clone()),
            started_at: Utc::now(),
            requests_served: Arc::new(AtomicU64::new(0)),
        }
    }
}

/// Failure modes of a solve request, each with a fixed client-facing body.
#[derive(Debug)]
enum ApiError {
    InvalidPayload,
    ProcessImage(String),
    Internal(String),
}

impl From<CapsolveError> for ApiError {
    fn from(err: CapsolveError) -> Self {
        if err.is_decode_failure() {
            ApiError::ProcessImage(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::InvalidPayload => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: INVALID_PAYLOAD.into(),
                    message: None,
                },
            ),
            ApiError::ProcessImage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: PROCESS_FAILED.into(),
                    message: None,
                },
            ),
            ApiError::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse {
                    error: INTERNAL_ERROR.into(),
                    message: Some(detail),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the router with CORS, request tracing and the body limit applied.
///
/// # Errors
///
/// Returns [`CapsolveError::Config`] if an allowed origin is not a valid
/// header value.
pub fn build_router(state: AppState, server: &ServerConfig) -> Result<Router> {
    let origins = server
        .allowed_origins
        .iter()
        .map(|origin| {
            HeaderValue::from_str(origin)
                .map_err(|_| CapsolveError::Config(format!("invalid CORS origin: {origin}")))
        })
        .collect::<Result<Vec<_>>>()?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::POST, Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .route("/solve_captcha", post(solve_captcha))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

async fn solve_captcha(State(state): State<AppState>, body: Bytes) -> Response {
    state.requests_served.fetch_add(1, Ordering::Relaxed);
    let request_id = Uuid::new_v4();
    let span = info_span!(
        "solve_captcha",
        request_id = %request_id,
        image_sha256 = field::Empty,
    );

    async move {
        match run_solve(&state, &body).await {
            Ok(text) => Json(SolveResponse { text }).into_response(),
            Err(err) => {
                match &err {
                    ApiError::InvalidPayload => warn!("Rejected request without image_data"),
                    ApiError::ProcessImage(detail) => {
                        error!(error = %detail, "Failed to decode image")
                    }
                    ApiError::Internal(detail) => error!(error = %detail, "Solve failed"),
                }
                err.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn run_solve(state: &AppState, body: &[u8]) -> std::result::Result<String, ApiError> {
    let payload = SolveRequest::parse(body).ok_or(ApiError::InvalidPayload)?;
    let bytes = decode_payload(&payload)?;
    Span::current().record("image_sha256", fingerprint(&bytes).as_str());
    debug!(bytes = bytes.len(), "Payload decoded");

    let pipeline = state.pipeline.clone();
    let span = Span::current();
    let cleaned = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        preprocess(&bytes, &pipeline)
    })
    .await
    .map_err(|err| ApiError::Internal(format!("preprocessing task failed: {err}")))??;

    if state.debug.is_enabled() {
        let debug = state.debug.clone();
        let snapshot = cleaned.clone();
        let span = Span::current();
        tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            debug.write(&snapshot);
        });
    }

    let recognizer = Arc::clone(&state.recognizer);
    let span = Span::current();
    let text = tokio::task::spawn_blocking(move || {
        let _guard = span.enter();
        solve(recognizer.as_ref(), &cleaned)
    })
    .await
    .map_err(|err| ApiError::Internal(format!("recognition task failed: {err}")))??;

    Ok(text)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        started_at: state.started_at,
        requests_served: state.requests_served.load(Ordering::Relaxed),
    })
}

// ---------------------------------------------------------------------------
// CaptchaServer
// ---------------------------------------------------------------------------

/// The solve endpoint bound to a TCP listener.
///
/// Created `Stopped`; [`start`](Self::start) binds and spawns the serve task,
/// [`stop`](Self::stop) drains in-flight requests and joins it.
pub struct CaptchaServer {
    config: AppConfig,
    state: AppState,
    status: ServerStatus,
    local_addr: Option<SocketAddr>,
    shutdown_signal: Arc<Notify>,
    task_handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl CaptchaServer {
    pub fn new(config: AppConfig, recognizer: Arc<dyn TextRecognizer>) -> Self {
        let state = AppState::new(&config, recognizer);
        Self {
            config,
            state,
            status: ServerStatus::Stopped,
            local_addr: None,
            shutdown_signal: Arc::new(Notify::new()),
            task_handle: None,
        }
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// The bound address while running. Useful when the configured port is 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the listener and start serving.
    ///
    /// # Errors
    ///
    /// Returns [`CapsolveError::Server`] if the address cannot be bound, or
    /// [`CapsolveError::Config`] for an invalid CORS origin.
    pub async fn start(&mut self) -> Result<()> {
        if self.status == ServerStatus::Running {
            debug!(addr = ?self.local_addr, "Captcha server already running");
            return Ok(());
        }

        self.status = ServerStatus::Starting;

        let router = match build_router(self.state.clone(), &self.config.server) {
            Ok(router) => router,
            Err(err) => {
                self.status = ServerStatus::Error;
                return Err(err);
            }
        };

        let bind_addr = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = match TcpListener::bind(&bind_addr).await {
            Ok(listener) => listener,
            Err(err) => {
                self.status = ServerStatus::Error;
                return Err(CapsolveError::Server(format!("bind {bind_addr}: {err}")));
            }
        };
        let local_addr = listener
            .local_addr()
            .map_err(|err| CapsolveError::Server(format!("local address: {err}")))?;

        info!(addr = %local_addr, "Captcha server listening");

        let shutdown = Arc::clone(&self.shutdown_signal);
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    shutdown.notified().await;
                    debug!("Serve loop received shutdown signal");
                })
                .await
        });

        self.local_addr = Some(local_addr);
        self.task_handle = Some(handle);
        self.status = ServerStatus::Running;
        Ok(())
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn stop(&mut self) -> Result<()> {
        if self.status != ServerStatus::Running {
            return Ok(());
        }

        info!(addr = ?self.local_addr, "Stopping captcha server");
        self.shutdown_signal.notify_one();

        if let Some(handle) = self.task_handle.take() {
            handle
                .await
                .map_err(|err| CapsolveError::Server(format!("task join: {err}")))??;
        }

        self.local_addr = None;
        self.status = ServerStatus::Stopped;
        info!("Captcha server stopped");
        Ok(())
    }
}
