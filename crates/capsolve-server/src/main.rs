// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// capsolve: load the OCR models, then serve /solve_captcha until Ctrl-C.

use std::process::ExitCode;
use std::sync::Arc;

use capsolve_core::AppConfig;
use capsolve_server::CaptchaServer;
use capsolve_vision::OcrEngine;
use capsolve_vision::ocr::OcrConfig;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("capsolve starting");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "capsolve exiting");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> capsolve_core::Result<()> {
    let config = AppConfig::from_env()?;

    // Model loading takes seconds; do it before accepting any request.
    tracing::info!("Initializing OCR engine");
    let ocr_config = OcrConfig::from_optional_dir(config.ocr_model_dir.as_deref());
    let engine = tokio::task::spawn_blocking(move || OcrEngine::new(ocr_config))
        .await
        .map_err(|err| capsolve_core::CapsolveError::Ocr(format!("engine load task: {err}")))??;
    tracing::info!("OCR engine initialized");

    let mut server = CaptchaServer::new(config, Arc::new(engine));
    server.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    server.stop().await
}
