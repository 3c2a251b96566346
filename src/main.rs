use anyhow::{Context, Result};
use config::EtlConfig;
use fetcher::{Geocoder, NominatimGeocoder};
use processor::{
    ClientCleaner, EmployeeCleaner, GeoEnricher, QualityReport, SalesCleaner,
};
use std::env;
use std::time::Instant;
use storage::{PostgresStore, SpreadsheetReader};
use tokio::time::sleep;
use tracing::{Instrument, error, info, info_span, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod config;
mod error;
mod fetcher;
mod models;
mod processor;
mod storage;
#[cfg(test)]
mod test_support;

const DEFAULT_CONFIG_PATH: &str = "src/configs/etl.toml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let update_geo = env::args().any(|arg| arg == "--update-geo" || arg == "-g");
    let skip_wait = env::args().any(|arg| arg == "--skip-wait");

    let config_path = env::var("ETL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = EtlConfig::from_file(&config_path)
        .with_context(|| format!("Failed to load ETL configuration from {}", config_path))?;

    if update_geo {
        config.geocoding.update_all = true;
    }
    if skip_wait {
        config.run.startup_delay_secs = 0;
    }

    let run_id = Uuid::new_v4();
    let started = Instant::now();

    let result = run_pipeline(&config)
        .instrument(info_span!("etl_run", run_id = %run_id))
        .await;

    match &result {
        Ok(()) => info!(
            "🎉 ETL run {} completed in {:.1}s",
            run_id,
            started.elapsed().as_secs_f64()
        ),
        Err(e) => error!("❌ ETL run {} failed: {:#}", run_id, e),
    }

    result
}

async fn run_pipeline(config: &EtlConfig) -> Result<()> {
    let mode = if config.geocoding.update_all { "live geocoding" } else { "precomputed geo data" };
    info!("🚀 Starting client/sales/employee ETL ({})", mode);

    // The database container may still be starting up
    if config.run.startup_delay_secs > 0 {
        info!("Waiting {}s before connecting", config.run.startup_delay_secs);
        sleep(config.run.startup_delay()).await;
    }

    let store = PostgresStore::connect(&config.database)
        .await
        .with_context(|| format!("Failed to connect to {}", config.database.display_target()))?;

    let result = transform_and_load(config, &store).await;
    store.close().await;
    result
}

async fn transform_and_load(config: &EtlConfig, store: &PostgresStore) -> Result<()> {
    // Extract
    let reader = SpreadsheetReader;
    let inputs = &config.inputs;
    let sales = reader.read_table(&inputs.sales_path(), inputs.sales_header_row)?;
    let employees = reader.read_table(&inputs.employee_path(), 0)?;
    let clients = reader.read_table(&inputs.client_path(), 0)?;

    // Transform
    let client_cleaner = ClientCleaner;
    let clients = client_cleaner.clean(clients)?;
    let employees = EmployeeCleaner.clean(employees)?;
    let sales = SalesCleaner.clean(sales)?;

    let enricher = GeoEnricher::new(inputs.geo_path(), config.geocoding.delay());
    let geocoder = if config.geocoding.update_all {
        Some(NominatimGeocoder::new(&config.geocoding)?)
    } else {
        None
    };
    let geo = enricher
        .enrich(&clients.frame, geocoder.as_ref().map(|g| g as &dyn Geocoder))
        .await?;

    if !geo.exceptions.is_empty() {
        warn!(
            "{} addresses could not be fully geocoded",
            geo.exceptions.len()
        );
    }

    let mut client_frame = clients.frame;
    client_cleaner.attach_geo(&mut client_frame, &geo.frame)?;

    let reports = [clients.quality, employees.quality, sales.quality];
    enforce_quality(&reports, config.run.strict_quality)?;

    // Load
    store
        .replace_tables(&[
            ("clients", &client_frame),
            ("employees", &employees.frame),
            ("sales", &sales.frame),
            ("geo", &geo.frame),
        ])
        .await?;

    info!(
        "📊 Loaded {} clients, {} employee mappings, {} sales rows, {} geo rows",
        client_frame.height(),
        employees.frame.height(),
        sales.frame.height(),
        geo.frame.height()
    );

    Ok(())
}

/// Residual gaps are only logged unless the run is configured to be strict.
fn enforce_quality(reports: &[QualityReport], strict: bool) -> Result<()> {
    let unclean: Vec<&QualityReport> = reports.iter().filter(|r| !r.is_clean()).collect();
    if unclean.is_empty() {
        return Ok(());
    }

    for report in unclean {
        if strict {
            report.clone().into_result()?;
        }
        warn!(
            "Continuing with {} missing values in {}",
            report.total_missing(),
            report.table
        );
    }
    Ok(())
}
