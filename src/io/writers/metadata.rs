use chrono::{DateTime, SecondsFormat, Utc};
use gdal::Dataset;
use gdal::Metadata;
use std::collections::BTreeMap;

use crate::core::processing::pipeline::ClippedBand;

/// Extract provenance fields for one clipped band
pub fn extract_metadata_fields(clip: &ClippedBand) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();

    // Granule identity
    metadata.insert("GRANULE_ID".to_string(), clip.granule_id.clone());
    metadata.insert("PRODUCT".to_string(), clip.product.short_name().to_string());
    metadata.insert("TILE_ID".to_string(), clip.tile.clone());
    metadata.insert(
        "ACQUISITION_TIME".to_string(),
        clip.acquired.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    metadata.insert("BAND".to_string(), clip.band.symbol().to_string());
    metadata.insert("ASSET_KEY".to_string(), clip.asset_key.clone());
    metadata.insert("SOURCE_HREF".to_string(), clip.source_href.clone());

    // Radiometry: the declared factors are kept even when already applied
    metadata.insert("scale_factor".to_string(), clip.scale.scale.to_string());
    metadata.insert("add_offset".to_string(), clip.scale.offset.to_string());
    metadata.insert(
        "SCALING_APPLIED".to_string(),
        clip.scaling_applied.to_string(),
    );
    metadata.insert("_FillValue".to_string(), clip.fill.to_string());

    metadata.insert(
        "QUALITY_FILTERED".to_string(),
        clip.quality_filtered.to_string(),
    );
    if clip.quality_filtered {
        metadata.insert("MASKED_PIXELS".to_string(), clip.masked_pixels.to_string());
    }

    add_provenance(&mut metadata, Utc::now());
    metadata
}

/// Global attributes of a per-tile NetCDF time series
pub fn time_series_attributes(
    tile: &str,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
    granules: usize,
) -> BTreeMap<String, String> {
    let mut metadata = BTreeMap::new();
    metadata.insert("Conventions".to_string(), "CF-1.6".to_string());
    metadata.insert("title".to_string(), "HLS".to_string());
    metadata.insert("source".to_string(), "LP DAAC".to_string());
    metadata.insert("TILE_ID".to_string(), tile.to_string());
    metadata.insert("GRANULE_COUNT".to_string(), granules.to_string());
    metadata.insert(
        "time_coverage_start".to_string(),
        first.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    metadata.insert(
        "time_coverage_end".to_string(),
        last.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    add_provenance(&mut metadata, Utc::now());
    metadata
}

fn add_provenance(metadata: &mut BTreeMap<String, String>, now: DateTime<Utc>) {
    metadata.insert("CONVERSION_TOOL".to_string(), env!("CARGO_PKG_NAME").to_string());
    metadata.insert(
        "CONVERSION_VERSION".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    );
    metadata.insert(
        "CONVERSION_TIMESTAMP".to_string(),
        now.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
}

/// Embed metadata items into a dataset, optionally under a key prefix
/// (`NC_GLOBAL#` for NetCDF global attributes).
pub fn embed_dataset_metadata(
    ds: &mut Dataset,
    metadata: &BTreeMap<String, String>,
    prefix: &str,
) -> Result<(), gdal::errors::GdalError> {
    for (key, value) in metadata {
        ds.set_metadata_item(&format!("{}{}", prefix, key), value, "")?;
    }
    Ok(())
}
