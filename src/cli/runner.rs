use std::fs::File;
use std::sync::Mutex;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use hls_super::api;
use hls_super::core::config::RunConfig;
use hls_super::core::filter::{DateRange, QueryFilter, Roi, parse_bands, parse_cloud_cover};
use hls_super::core::params::ProcessingParams;
use hls_super::io::gdal::configure_gdal_http;
use hls_super::types::Product;

use super::args::CliArgs;
use super::errors::AppError;

fn init_logging(args: &CliArgs) -> Result<(), AppError> {
    let filter = if args.verbose {
        EnvFilter::try_new("debug")
    } else {
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))
    }
    .map_err(|e| AppError::LogFilter(e.to_string()))?;

    let file_layer = match &args.log_file {
        Some(path) => {
            let file = File::create(path).map_err(|source| AppError::LogFile {
                path: path.clone(),
                source,
            })?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .try_init()
        .map_err(|e| AppError::LogFilter(e.to_string()))
}

fn build_filter(args: &CliArgs) -> hls_super::Result<QueryFilter> {
    let roi = Roi::parse(&args.roi)?;
    let end = args.end.clone().unwrap_or_else(DateRange::default_end);
    let dates = DateRange::parse(&args.start, &end)?;
    let cloud_cover = parse_cloud_cover(&args.cc)?;
    let bands = parse_bands(&args.bands)?;
    QueryFilter::new(roi, dates, args.prod.products(), cloud_cover, bands)
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(&args)?;

    // argument errors stop the run before any network access
    let filter = build_filter(&args).map_err(AppError::from)?;
    let params = ProcessingParams {
        format: args.format,
        quality_filter: args.qf,
        scale: args.scale,
    };
    let config = match &args.config {
        Some(path) => RunConfig::from_file(path).map_err(AppError::from)?,
        None => RunConfig::default(),
    };
    configure_gdal_http(&config.gdal)?;

    info!(
        "Searching {} from {} to {} over {:?} (cloud cover <= {}%)",
        filter
            .products()
            .iter()
            .map(|p| p.short_name())
            .collect::<Vec<_>>()
            .join(" and "),
        filter.dates().start,
        filter.dates().end,
        filter.roi().bbox.as_array(),
        filter.cloud_cover()
    );
    info!("Output directory: {:?}", args.dir);

    let records = api::search_or_load(&filter, &config.catalog, &args.dir, args.fresh_search)
        .map_err(AppError::from)?;
    if records.is_empty() {
        info!("No granules match the query; nothing to do");
        return Ok(());
    }
    for record in &records {
        debug!(
            "{} tile={} date={} cloud={:?}",
            record.id,
            record.tile,
            record.julian_date(),
            record.cloud_cover
        );
    }
    let resolution = api::resolve(&records, &filter, &params);
    let links = api::export_links(&resolution, &args.dir).map_err(AppError::from)?;
    for product in Product::ALL {
        let count = records.iter().filter(|r| r.product == product).count();
        if count > 0 {
            info!("{}: {} granule(s)", product, count);
        }
    }
    info!(
        "Found {} granule(s); {} band asset(s) will be processed into {} output",
        records.len(),
        resolution.task_count(),
        params.format
    );
    debug!("Asset links: {:?}", links);

    if !args.yes {
        info!("Stopping before processing; re-run with --yes to subset the results");
        return Ok(());
    }

    let report = api::process(&resolution, &filter, &params, &args.dir).map_err(AppError::from)?;
    for skip in &report.skips {
        warn!("Skipped {}: {}", skip.item, skip.cause);
    }

    info!("Batch processing complete!");
    info!("Processed: {}", report.processed);
    info!("Skipped: {}", report.skipped);
    info!("Errors: {}", report.errors);
    info!("Outputs written: {}", report.outputs.len());

    Ok(())
}
