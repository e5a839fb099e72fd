//! Asset resolver: maps the requested symbolic bands of each granule to concrete
//! asset hrefs, and attaches the Fmask asset when quality filtering is on.
//!
//! Failures are per record: a band the record's product lacks (or an asset the
//! record does not carry) becomes an `UnknownBand` entry, and a missing quality
//! mask with quality filtering on drops every band of that record as
//! `AssetUnavailable`. Other records are unaffected.
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::bands::{self, BandSelection, FMASK_KEY};
use crate::core::granule::{AssetRef, GranuleRecord};
use crate::error::Error;
use crate::types::Band;

/// One band of one granule, ready to read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandAsset {
    pub band: Band,
    pub asset: AssetRef,
}

/// A granule with every requested band resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedGranule {
    pub record: GranuleRecord,
    pub bands: Vec<BandAsset>,
    /// Fmask asset used for quality filtering (`None` when filtering is off)
    pub quality: Option<AssetRef>,
}

impl ResolvedGranule {
    /// Number of output bands this granule will produce.
    pub fn task_count(&self) -> usize {
        self.bands.len()
    }
}

/// Result of resolving a batch of records.
#[derive(Debug, Default)]
pub struct Resolution {
    pub granules: Vec<ResolvedGranule>,
    /// Recoverable per-record failures, in record order
    pub skipped: Vec<Error>,
}

impl Resolution {
    pub fn task_count(&self) -> usize {
        self.granules.iter().map(|g| g.task_count()).sum()
    }
}

/// Resolve one record. Returns `None` when nothing of the record is usable.
pub fn resolve_granule(
    record: &GranuleRecord,
    selection: &BandSelection,
    quality_filter: bool,
    skipped: &mut Vec<Error>,
) -> Option<ResolvedGranule> {
    let mut resolved = Vec::new();
    for band in selection.bands_for(record.product) {
        let asset = bands::asset_key(record.product, band).and_then(|key| record.asset(key));
        match asset {
            Some(asset) => resolved.push(BandAsset {
                band,
                asset: asset.clone(),
            }),
            None => {
                debug!("{} has no asset for band {}", record.id, band);
                skipped.push(Error::UnknownBand {
                    granule: record.id.clone(),
                    band: band.symbol().to_string(),
                });
            }
        }
    }
    if resolved.is_empty() {
        return None;
    }

    let quality = if quality_filter {
        match record.asset(FMASK_KEY) {
            Some(fmask) => Some(fmask.clone()),
            None => {
                warn!(
                    "{} carries no {} asset; skipping its {} band(s)",
                    record.id,
                    FMASK_KEY,
                    resolved.len()
                );
                for task in resolved {
                    skipped.push(Error::asset_unavailable(
                        task.asset.href,
                        "quality mask missing for granule",
                    ));
                }
                return None;
            }
        }
    } else {
        None
    };

    Some(ResolvedGranule {
        record: record.clone(),
        bands: resolved,
        quality,
    })
}

/// Resolve a batch of records, collecting per-record failures.
pub fn resolve_all(
    records: &[GranuleRecord],
    selection: &BandSelection,
    quality_filter: bool,
) -> Resolution {
    let mut resolution = Resolution::default();
    for record in records {
        if let Some(granule) =
            resolve_granule(record, selection, quality_filter, &mut resolution.skipped)
        {
            resolution.granules.push(granule);
        }
    }
    resolution
}
