//! Lumen worker entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Parse configuration**: command-line flags plus an optional TOML file.
//! 2. **Wire observability**: `tracing-subscriber` on stderr (text or JSON)
//!    and, when an endpoint is configured, an OpenTelemetry OTLP exporter.
//! 3. **Construct infrastructure**: the compiled-in plugin registry and the
//!    outbound proxy agent, injected into the [`worker::Worker`].
//! 4. **Serve**: newline-delimited JSON over stdin/stdout until stdin closes.

mod config;
mod telemetry;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use config::{Cli, WorkerConfig};
use net::ProxyAgent;
use plugins::RegistryFactory;
use worker::Worker;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match WorkerConfig::load(cli.config.as_deref())
        .and_then(|config| config.with_overrides(&cli))
    {
        Ok(config) => config,
        Err(err) => {
            eprintln!("lumen-worker: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let telemetry = match telemetry::init(&config.logging) {
        Ok(telemetry) => telemetry,
        Err(err) => {
            eprintln!("lumen-worker: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(config).await;
    let code = match &outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("Worker stopped with an error: {err:#}");
            ExitCode::FAILURE
        }
    };
    telemetry.shutdown();
    code
}

async fn run(config: WorkerConfig) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        timeouts = ?config.timeouts,
        "Starting lumen-worker"
    );

    let factory = RegistryFactory::with_builtins(config.timeouts.clone())
        .context("registering built-in plugins")?;
    info!(plugins = ?factory.plugin_ids(), "Plugin registry assembled");

    let network = ProxyAgent::new().context("building HTTP client")?;

    let (worker, outbound) = Worker::new(Arc::new(factory), Arc::new(network), config.timeouts)
        .context("building command router")?;
    info!(session = %worker.session_id(), "Serving on stdio");

    transport::serve(tokio::io::stdin(), tokio::io::stdout(), worker, outbound)
        .await
        .context("serving stdio")?;

    info!("Input closed; exiting");
    Ok(())
}
