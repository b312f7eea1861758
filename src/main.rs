//! CDR Rater
//!
//! Reads raw call detail records as JSON lines, rates each one against the
//! configured rate tables, and writes the assembled rows to stdout.
//!
//! Usage: `cdr-rater [INPUT]` (stdin when no input file is given)

use anyhow::{Context, Result};
use cdr_core::{config::LoggingConfig, AppConfig};
use cdr_rating::{ChargeEngine, NumberPlan, RateTables, RatingPipeline};
use std::env;
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
///
/// Logs go to stderr; stdout carries the rated rows.
fn init_tracing(logging: &LoggingConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "cdr_rater={},cdr_rating={},cdr_core={}",
            logging.level, logging.level, logging.level
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    if logging.json {
        registry
            .with(fmt::layer().json().with_writer(io::stderr).with_target(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Starting CDR Rater v{}", env!("CARGO_PKG_VERSION"));

    let tables = RateTables::load(&config.rating.tables_path)
        .with_context(|| format!("failed to load rate tables from {}", config.rating.tables_path))?;
    let plan = NumberPlan::load(&config.rating.number_plan_path).with_context(|| {
        format!(
            "failed to load number plan from {}",
            config.rating.number_plan_path
        )
    })?;

    let engine = ChargeEngine::new(Arc::new(tables));
    let pipeline = RatingPipeline::new(engine, Arc::new(plan), config.rating.default_carrier);

    let stdout = io::stdout();
    let writer = BufWriter::new(stdout.lock());

    let summary = match env::args().nth(1) {
        Some(path) => {
            info!("Reading call records from {}", path);
            let file = File::open(&path).with_context(|| format!("cannot open {}", path))?;
            pipeline.run(BufReader::new(file), writer)
        }
        None => {
            info!("Reading call records from stdin");
            pipeline.run(io::stdin().lock(), writer)
        }
    }
    .context("rating run failed")?;

    info!(
        total = summary.total(),
        rated = summary.rated,
        rejected = summary.rejected,
        duplicates = summary.duplicates,
        "Done"
    );

    Ok(())
}
