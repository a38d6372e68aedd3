#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `georef`: resolves a CSV of specimen locality labels to coordinates.
//!
//! Reads the batch config, loads every reference dataset once, resolves
//! the input rows concurrently and writes one output row per input row in
//! input order.
//!
//! Logging goes through [`georef_cli_utils::init_logger`] so log lines and
//! the progress bar never fight for the terminal.

mod config;
mod table;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use georef_cli_utils::IndicatifProgress;
use georef_geocoder::service_registry::{service_by_id, service_ids};
use georef_geocoder::{GeocodeError, Geocoder, create_geocoder};
use georef_matcher::ReferenceMatcher;
use georef_reference::{ReferenceTables, load_datasets};
use georef_resolver::LocationResolver;
use georef_resolver::batch::{BatchOptions, resolve_batch};

use crate::config::{BatchConfig, GeocoderSettings};

#[derive(Parser)]
#[command(name = "georef", about = "Georeference specimen locality labels")]
struct Cli {
    /// Batch configuration file
    #[arg(long, default_value = "georef.toml")]
    config: PathBuf,
    /// CSV with `Locality` and `Locus` columns
    #[arg(long)]
    input: PathBuf,
    /// Where to write the resolved CSV
    #[arg(long)]
    output: PathBuf,
    /// Abort on the first row with a malformed QDS instead of skipping it
    #[arg(long)]
    strict: bool,
    /// Resolve from reference datasets only
    #[arg(long)]
    no_geocoder: bool,
}

fn build_geocoder(settings: &GeocoderSettings) -> Result<Option<Arc<dyn Geocoder>>, GeocodeError> {
    if settings.is_disabled() {
        log::info!("Geocoder fallback disabled");
        return Ok(None);
    }

    let service = service_by_id(&settings.provider)?.ok_or_else(|| GeocodeError::Config {
        message: format!(
            "Unknown geocoder provider '{}', expected one of: {}, none",
            settings.provider,
            service_ids().collect::<Vec<_>>().join(", ")
        ),
    })?;

    create_geocoder(&service, settings.timeout()).map(|geocoder| Some(Arc::from(geocoder)))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = georef_cli_utils::init_logger(georef_cli_utils::DEFAULT_LOG_FILTER);
    let cli = Cli::parse();
    let start = Instant::now();

    let config = BatchConfig::load(&cli.config)?;

    let tables = ReferenceTables::load(
        config.source_priorities.as_deref(),
        config.province_aliases.as_deref(),
    )?;
    let datasets = load_datasets(&config.datasets, &tables)?;
    for dataset in &datasets {
        log::info!("Loaded {} records from '{}'", dataset.len(), dataset.name);
    }

    let matcher = ReferenceMatcher::new(&config.matching)?;
    let mut resolver = LocationResolver::new(config.resolver_config(), datasets, matcher);
    if cli.no_geocoder {
        log::info!("Geocoder fallback disabled by --no-geocoder");
    } else if let Some(geocoder) = build_geocoder(&config.geocoder)? {
        resolver = resolver.with_geocoder(geocoder);
    }

    let rows = table::read_input(&cli.input)?;

    let progress = IndicatifProgress::rows_bar(&multi, "Resolving localities");
    let options = BatchOptions {
        concurrency: config.concurrency,
        strict: cli.strict,
    };
    let (results, _summary) = resolve_batch(&resolver, &rows, options, &progress).await?;

    table::write_output(&cli.output, &results, &config.precision_by)?;

    log::info!(
        "Finished {} rows in {:.1}s",
        results.len(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
