//! Shelf Compliance service
//!
//! HTTP service that takes a shelf photograph, asks the detection provider
//! for product boxes and returns planogram compliance findings.
//!
//! # Usage
//!
//! ```bash
//! # Run against the hosted detection workflow
//! SHELF_PROVIDER_API_KEY=... ./shelf-compliance
//!
//! # Serve fixed detections instead of calling the provider
//! ./shelf-compliance --detections fixtures/shelf.json --reference locations.csv
//! ```
//!
//! # Environment Variables
//!
//! - `SHELF_CONFIG`: Path to the TOML config (default: `./shelf_config.toml`)
//! - `SHELF_SERVER_ADDR`: Listen address (default: `0.0.0.0:5000`)
//! - `SHELF_PROVIDER_API_KEY`: Detection workflow API key
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use shelf_compliance::api::{create_app, AuditState};
use shelf_compliance::config::ShelfConfig;
use shelf_compliance::provider::{DetectionProvider, FixtureProvider, WorkflowProvider};

// ============================================================================
// CLI
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "shelf-compliance", version, about = "Planogram shelf-compliance service")]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:5000")
    #[arg(short, long)]
    addr: Option<String>,

    /// Load configuration from this TOML file instead of the search order
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the planogram CSV path
    #[arg(long, value_name = "CSV")]
    reference: Option<PathBuf>,

    /// Serve detections from a JSON file instead of calling the provider
    #[arg(long, value_name = "JSON")]
    detections: Option<PathBuf>,
}

fn load_config(args: &CliArgs) -> Result<ShelfConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = ShelfConfig::load_from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => ShelfConfig::load(),
    };

    if let Some(addr) = &args.addr {
        config.server.addr.clone_from(addr);
    }
    if let Some(path) = &args.reference {
        config.reference.path.clone_from(path);
    }
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn build_provider(args: &CliArgs, config: &ShelfConfig) -> Result<Arc<dyn DetectionProvider>> {
    if let Some(path) = &args.detections {
        let fixture = FixtureProvider::from_json_file(path)
            .with_context(|| format!("Failed to read detections {}", path.display()))?;
        info!(path = %path.display(), count = fixture.len(), "Provider: fixture detections");
        if fixture.is_empty() {
            warn!(path = %path.display(), "Fixture has no detections, every audit will fail shelf resolution");
        }
        return Ok(Arc::new(fixture));
    }

    if !config.provider.is_configured() {
        warn!(
            "Provider: workflow not configured (workspace, workflow_id and api_key are required), uploads will fail"
        );
    }
    let workflow = WorkflowProvider::new(&config.provider).context("Failed to build provider")?;
    info!(endpoint = workflow.endpoint(), "Provider: detection workflow");
    Ok(Arc::new(workflow))
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = load_config(&args)?;

    if !config.reference.path.exists() {
        warn!(
            path = %config.reference.path.display(),
            "Reference table not found, requests will fail until it exists"
        );
    }

    let state = AuditState {
        provider: build_provider(&args, &config)?,
        reference_path: config.reference.path.clone(),
        params: config.engine_params(),
        confidence: config.provider.confidence,
    };
    let app = create_app(state, &config.server);

    let listener = tokio::net::TcpListener::bind(&config.server.addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.server.addr))?;

    info!(
        addr = %config.server.addr,
        reference = %config.reference.path.display(),
        policy = ?config.findings.policy,
        "HTTP server listening"
    );

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel_token.cancelled().await;
        })
        .await;

    match result {
        Ok(()) => {
            info!("Graceful shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Server error");
            Err(anyhow::anyhow!("HTTP server error: {e}"))
        }
    }
}
