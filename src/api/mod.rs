//! High-level library API: search the catalog (with the on-disk results cache),
//! resolve band assets and process a batch into COG or NC4 outputs. Prefer these
//! entrypoints over the low-level `core`/`io` modules when embedding HLS SuPER.
use std::path::{Path, PathBuf};

use ndarray::parallel::prelude::*;
use tracing::{debug, info, warn};

use crate::core::config::{LINKS_FILE, RESULTS_FILE};
use crate::core::filter::QueryFilter;
use crate::core::granule::GranuleRecord;
use crate::core::params::ProcessingParams;
use crate::core::processing::pipeline::{ClippedBand, process_granule};
use crate::core::processing::save::{save_single, save_tile_series};
use crate::core::resolve::{Resolution, resolve_all};
use crate::error::{Error, Result};
use crate::io::catalog::{CatalogClient, CatalogConfig};
use crate::io::results::{load_results, save_results, write_links};
use crate::types::OutputFormat;

/// One item left out of the batch and why.
#[derive(Debug, Clone, PartialEq)]
pub struct Skip {
    pub item: String,
    pub cause: String,
}

/// Batch processing report
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// (granule, band) items written
    pub processed: usize,
    /// Recoverable per-record or per-asset failures
    pub skipped: usize,
    /// Any other failure (e.g. a write error)
    pub errors: usize,
    pub outputs: Vec<PathBuf>,
    pub skips: Vec<Skip>,
}

impl BatchReport {
    fn record_failure(&mut self, error: &Error) {
        let item = match error {
            Error::UnknownBand { granule, band } => format!("{} {}", granule, band),
            Error::AssetUnavailable { href, .. } => href.clone(),
            _ => String::from("batch"),
        };
        if error.is_recoverable() {
            self.skipped += 1;
        } else {
            self.errors += 1;
        }
        self.skips.push(Skip {
            item,
            cause: error.to_string(),
        });
    }
}

/// Query the catalog for every granule matching `filter`.
pub fn search(filter: &QueryFilter, config: &CatalogConfig) -> Result<Vec<GranuleRecord>> {
    CatalogClient::http(config.clone())?.search(filter)
}

/// Reuse `out_dir/hls_super_results.json` when it answers the same query, otherwise
/// search and refresh it. `fresh` always searches.
pub fn search_or_load(
    filter: &QueryFilter,
    config: &CatalogConfig,
    out_dir: &Path,
    fresh: bool,
) -> Result<Vec<GranuleRecord>> {
    std::fs::create_dir_all(out_dir)?;
    let cache = out_dir.join(RESULTS_FILE);
    if !fresh {
        if let Some(records) = load_results(&cache, filter)? {
            info!(
                "Using {} cached search result(s) from {:?} (pass --fresh-search to query again)",
                records.len(),
                cache
            );
            return Ok(records);
        }
    }
    let records = search(filter, config)?;
    save_results(&cache, filter, &records)?;
    Ok(records)
}

/// Write the hrefs of every resolved asset (plus browse and metadata) to
/// `out_dir/hls_super_links.txt`.
pub fn export_links(resolution: &Resolution, out_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(out_dir)?;
    let path = out_dir.join(LINKS_FILE);
    write_links(&path, resolution)?;
    Ok(path)
}

/// Map the requested bands of every record to assets.
pub fn resolve(
    records: &[GranuleRecord],
    filter: &QueryFilter,
    params: &ProcessingParams,
) -> Resolution {
    let resolution = resolve_all(records, filter.bands(), params.quality_filter);
    info!(
        "Resolved {} granule(s), {} band asset(s), {} skipped",
        resolution.granules.len(),
        resolution.task_count(),
        resolution.skipped.len()
    );
    resolution
}

/// Clip, filter, scale and write every resolved granule into `out_dir`.
///
/// Granules are processed in parallel. COG outputs are written as each band is
/// ready; NC4 outputs are assembled per tile once every granule is clipped.
/// Failures of single records or assets are counted as skips and never abort the
/// batch.
pub fn process(
    resolution: &Resolution,
    filter: &QueryFilter,
    params: &ProcessingParams,
    out_dir: &Path,
) -> Result<BatchReport> {
    std::fs::create_dir_all(out_dir)?;

    let mut report = BatchReport::default();
    for error in &resolution.skipped {
        report.record_failure(error);
    }

    let roi = filter.roi();
    let results: Vec<(Vec<PathBuf>, Vec<ClippedBand>, Vec<Error>)> = resolution
        .granules
        .par_iter()
        .map(|granule| {
            let outcome = process_granule(granule, roi, params);
            let mut failures = outcome.failures;
            match params.format {
                OutputFormat::Cog => {
                    let mut written = Vec::with_capacity(outcome.bands.len());
                    for clip in &outcome.bands {
                        match save_single(clip, out_dir) {
                            Ok(path) => written.push(path),
                            Err(e) => {
                                warn!("Failed to write {} {}: {}", clip.granule_id, clip.band, e);
                                failures.push(e);
                            }
                        }
                    }
                    (written, Vec::new(), failures)
                }
                OutputFormat::Nc4 => (Vec::new(), outcome.bands, failures),
            }
        })
        .collect();

    let mut clips = Vec::new();
    for (written, clipped, failures) in results {
        report.processed += written.len();
        report.outputs.extend(written);
        clips.extend(clipped);
        for error in &failures {
            report.record_failure(error);
        }
    }

    if params.format == OutputFormat::Nc4 {
        debug!("Assembling {} clipped band(s) into tile series", clips.len());
        let series = save_tile_series(&clips, out_dir);
        report.processed += series.layers;
        report.outputs.extend(series.written);
        for error in &series.failures {
            report.record_failure(error);
        }
    }

    Ok(report)
}
