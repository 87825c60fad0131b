//! Offline shelf classification
//!
//! Runs the classification engine on a detections JSON file and a planogram
//! CSV, and prints the findings as JSON.
//!
//! # Usage
//! ```bash
//! ./shelf-classify --reference locations.csv --detections shelf.json
//! ./shelf-classify --reference locations.csv --detections shelf.json --alerts
//! ./shelf-classify --reference locations.csv --detections shelf.json --clusters
//! ```
//!
//! The detections file is either a JSON array of
//! `{"label", "bbox": [x1, y1, x2, y2], "confidence"}` objects or an object
//! with a `detections` field holding that array.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use shelf_compliance::config::defaults;
use shelf_compliance::engine::{self, EngineParams, FindingPolicy};
use shelf_compliance::reference::load_reference;
use shelf_compliance::types::{to_alerts, Detection, FindingCategory};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    Exclusive,
    Compatible,
}

impl From<Policy> for FindingPolicy {
    fn from(p: Policy) -> Self {
        match p {
            Policy::Exclusive => Self::Exclusive,
            Policy::Compatible => Self::Compatible,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "shelf-classify", version, about = "Classify shelf detections against a planogram")]
struct CliArgs {
    /// Planogram CSV
    #[arg(short, long, value_name = "CSV")]
    reference: PathBuf,

    /// Detections JSON
    #[arg(short, long, value_name = "JSON")]
    detections: PathBuf,

    /// Print the display alerts (`id`, `nombre`, `bbox`, `alerta`) instead of findings
    #[arg(long, conflicts_with = "clusters")]
    alerts: bool,

    /// Print the tray clustering table instead of findings
    #[arg(long)]
    clusters: bool,

    /// Which detections the tray and position checks consider
    #[arg(long, value_enum, default_value = "exclusive")]
    policy: Policy,

    /// k-means seed
    #[arg(long, default_value_t = defaults::DEFAULT_KMEANS_SEED)]
    seed: u64,

    /// Multiplier on the vertical center before clustering
    #[arg(long, default_value_t = defaults::DEFAULT_VERTICAL_SCALE, value_parser = parse_vertical_scale)]
    vertical_scale: f64,
}

/// Accept only finite, positive multipliers.
fn parse_vertical_scale(s: &str) -> Result<f64, String> {
    let value: f64 = s.trim().parse().map_err(|_| format!("'{s}' is not a number"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{value} must be a finite number greater than 0"))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DetectionsFile {
    List(Vec<Detection>),
    Wrapped { detections: Vec<Detection> },
}

fn read_detections(path: &Path) -> Result<Vec<Detection>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file: DetectionsFile = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse detections in {}", path.display()))?;
    Ok(match file {
        DetectionsFile::List(d) | DetectionsFile::Wrapped { detections: d } => d,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let reference = load_reference(&args.reference)
        .with_context(|| format!("Failed to load reference {}", args.reference.display()))?;
    let detections = read_detections(&args.detections)?;

    let params = EngineParams {
        seed: args.seed,
        vertical_scale: args.vertical_scale,
        policy: args.policy.into(),
        ..EngineParams::default()
    };

    let json = if args.clusters {
        let report = engine::cluster_report(&detections, &reference, &params)?;
        serde_json::to_string_pretty(&report)?
    } else {
        let audit = engine::audit(&detections, &reference, &params)?;
        info!(
            shelf = %audit.shelf,
            findings = audit.findings.len(),
            correct = audit.count(FindingCategory::Correct),
            "Classification complete"
        );
        if args.alerts {
            serde_json::to_string_pretty(&to_alerts(&audit.findings))?
        } else {
            serde_json::to_string_pretty(&audit)?
        }
    };

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{json}")?;
    Ok(())
}
