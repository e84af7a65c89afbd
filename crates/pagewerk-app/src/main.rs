// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagewerk: scanned images to one PDF.
//
// Entry point. Initialises logging, loads the pipeline configuration, collects
// the source images, and runs one conversion.

mod sources;

use std::process::ExitCode;
use std::sync::Arc;

use pagewerk_core::PipelineConfig;
use pagewerk_core::error::Result;
use pagewerk_core::types::ConversionId;
use pagewerk_document::{DocumentAssembler, ProcessRunner};

/// Environment variable naming a JSON configuration file.
const CONFIG_ENV: &str = "PAGEWERK_CONFIG";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Pagewerk starting");

    match run().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "Pagewerk could not start the conversion");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<bool> {
    let config = load_config()?;
    let sources = sources::collect(&config.image_dir)?;
    tracing::info!(
        dir = %config.image_dir.display(),
        count = sources.len(),
        "Collected source images"
    );

    let id = ConversionId::new();
    let target = config.final_path(&id);
    let assembler = DocumentAssembler::from_config(Arc::new(ProcessRunner::new()), &config);

    let result = assembler.assemble(&sources, &target, config.variant).await;
    if result.success {
        tracing::info!(%id, path = %target.display(), "Conversion finished");
    } else {
        tracing::error!(%id, reason = %result.message, "Conversion failed");
    }
    Ok(result.success)
}

/// Settings from the file named by `PAGEWERK_CONFIG`, or the defaults.
fn load_config() -> Result<PipelineConfig> {
    match std::env::var_os(CONFIG_ENV) {
        Some(path) => PipelineConfig::load(path),
        None => {
            tracing::info!("{CONFIG_ENV} not set, using default configuration");
            PipelineConfig::default().validated()
        }
    }
}
