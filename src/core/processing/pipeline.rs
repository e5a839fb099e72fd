use chrono::{DateTime, Utc};
use ndarray::{Array2, Zip};
use tracing::{debug, warn};

use crate::core::filter::Roi;
use crate::core::granule::AssetRef;
use crate::core::params::ProcessingParams;
use crate::core::processing::clip::{PixelWindow, window_geotransform};
use crate::core::processing::quality::{apply_mask, usable_mask};
use crate::core::processing::scale::{ScaleParams, apply_scale};
use crate::core::resolve::{BandAsset, ResolvedGranule};
use crate::error::{Error, Result};
use crate::io::gdal::{HlsRasterReader, SampleType};
use crate::types::{Band, Product};

/// Fill written when a source band declares no nodata value.
pub const DEFAULT_FILL: f64 = -9999.0;

/// One band of one granule, clipped to the ROI and ready to be written.
#[derive(Debug, Clone)]
pub struct ClippedBand {
    pub granule_id: String,
    pub product: Product,
    pub tile: String,
    pub acquired: DateTime<Utc>,
    pub band: Band,
    pub asset_key: String,
    pub source_href: String,
    pub data: Array2<f64>,
    /// Sample type to write (the source type, or `F32` once scaled)
    pub sample_type: SampleType,
    pub fill: f64,
    pub geotransform: [f64; 6],
    pub projection: String,
    /// Scale/offset declared by the source asset
    pub scale: ScaleParams,
    pub scaling_applied: bool,
    pub quality_filtered: bool,
    /// Pixels replaced with fill by the quality and polygon masks
    pub masked_pixels: usize,
}

impl ClippedBand {
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// Output of one granule: clipped bands plus per-asset failures.
#[derive(Debug, Default)]
pub struct GranuleOutcome {
    pub bands: Vec<ClippedBand>,
    pub failures: Vec<Error>,
}

/// Masks shared by every band of a granule.
struct GranuleMask {
    window: PixelWindow,
    geotransform: [f64; 6],
    /// Cells inside the ROI polygon (vector ROIs only)
    polygon: Option<Array2<bool>>,
    /// Polygon and quality masks combined
    combined: Option<Array2<bool>>,
    quality_filtered: bool,
}

fn and_masks(a: Option<Array2<bool>>, b: Option<Array2<bool>>) -> Option<Array2<bool>> {
    match (a, b) {
        (Some(mut a), Some(b)) => {
            Zip::from(&mut a).and(&b).for_each(|x, &y| *x = *x && y);
            Some(a)
        }
        (a, None) => a,
        (None, b) => b,
    }
}

fn unavailable(asset: &AssetRef, reason: impl std::fmt::Display) -> Error {
    Error::asset_unavailable(asset.href.clone(), reason)
}

/// Reads the Fmask window (when filtering) and rasterizes the ROI polygon.
fn build_mask(
    granule: &ResolvedGranule,
    roi: &Roi,
    reference: &HlsRasterReader,
    window: PixelWindow,
) -> Result<GranuleMask> {
    let polygon = match &roi.polygon_wkt {
        Some(wkt) => Some(reference.polygon_mask(&window, wkt)?),
        None => None,
    };

    let quality = match &granule.quality {
        Some(fmask_asset) => {
            let fmask = HlsRasterReader::open(&fmask_asset.href)
                .map_err(|e| unavailable(fmask_asset, e))?;
            if fmask.metadata.geotransform != reference.metadata.geotransform {
                return Err(unavailable(fmask_asset, "quality mask grid differs from band grid"));
            }
            let values = fmask
                .read_window(&window)
                .map_err(|e| unavailable(fmask_asset, e))?;
            Some(usable_mask(&values, fmask.metadata.no_data))
        }
        None => None,
    };
    let quality_filtered = quality.is_some();

    Ok(GranuleMask {
        window,
        geotransform: reference.metadata.geotransform,
        combined: and_masks(polygon.clone(), quality),
        polygon,
        quality_filtered,
    })
}

fn clip_band(
    granule: &ResolvedGranule,
    task: &BandAsset,
    reader: &HlsRasterReader,
    mask: &GranuleMask,
    params: &ProcessingParams,
) -> Result<ClippedBand> {
    let record = &granule.record;
    let meta = &reader.metadata;
    if meta.geotransform != mask.geotransform {
        return Err(unavailable(&task.asset, "band grid differs from granule grid"));
    }
    let mut data = reader
        .read_window(&mask.window)
        .map_err(|e| unavailable(&task.asset, e))?;
    let fill = meta.no_data.unwrap_or(DEFAULT_FILL);

    // the quality layer is only clipped to the polygon, never quality-masked
    let is_fmask = task.band == Band::Fmask;
    let keep = if is_fmask {
        mask.polygon.as_ref()
    } else {
        mask.combined.as_ref()
    };
    let masked_pixels = match keep {
        Some(keep) if keep.dim() == data.dim() => apply_mask(&mut data, keep, fill),
        Some(_) => return Err(unavailable(&task.asset, "band shape differs from mask shape")),
        None => 0,
    };

    let scale = ScaleParams {
        scale: meta.scale.unwrap_or(1.0),
        offset: meta.offset.unwrap_or(0.0),
    };
    let scaling_applied = params.scale && !is_fmask && !scale.is_identity();
    let sample_type = if scaling_applied {
        apply_scale(&mut data, scale, Some(fill));
        SampleType::F32
    } else {
        meta.sample_type
    };

    Ok(ClippedBand {
        granule_id: record.id.clone(),
        product: record.product,
        tile: record.tile.clone(),
        acquired: record.acquired,
        band: task.band,
        asset_key: task.asset.key.clone(),
        source_href: task.asset.href.clone(),
        data,
        sample_type,
        fill,
        geotransform: window_geotransform(meta.geotransform, &mask.window),
        projection: meta.projection.clone(),
        scale,
        scaling_applied,
        quality_filtered: mask.quality_filtered && !is_fmask,
        masked_pixels,
    })
}

/// Clip, mask and scale every band of one granule. A failing asset is reported
/// in `failures` and the remaining bands are still processed.
pub fn process_granule(
    granule: &ResolvedGranule,
    roi: &Roi,
    params: &ProcessingParams,
) -> GranuleOutcome {
    let mut outcome = GranuleOutcome::default();
    let mut mask: Option<GranuleMask> = None;

    for task in &granule.bands {
        let reader = match HlsRasterReader::open(&task.asset.href) {
            Ok(reader) => reader,
            Err(e) => {
                warn!("Skipping {} {}: {}", granule.record.id, task.band, e);
                outcome.failures.push(unavailable(&task.asset, e));
                continue;
            }
        };

        if mask.is_none() {
            let window = match reader.clip_window(&roi.bbox) {
                Ok(window) => window,
                Err(e) => {
                    outcome.failures.push(unavailable(&task.asset, e));
                    continue;
                }
            };
            match build_mask(granule, roi, &reader, window) {
                Ok(m) => mask = Some(m),
                Err(e) => {
                    // no band of this granule may be written without its mask
                    warn!("Skipping {}: {}", granule.record.id, e);
                    let failures = granule
                        .bands
                        .iter()
                        .map(|b| unavailable(&b.asset, format!("granule mask unavailable: {}", e)))
                        .collect();
                    return GranuleOutcome {
                        bands: Vec::new(),
                        failures,
                    };
                }
            }
        }
        let Some(mask) = mask.as_ref() else {
            continue;
        };

        match clip_band(granule, task, &reader, mask, params) {
            Ok(clipped) => {
                debug!(
                    "{} {} clipped to {:?} ({} pixel(s) masked)",
                    clipped.granule_id,
                    clipped.band,
                    clipped.shape(),
                    clipped.masked_pixels
                );
                outcome.bands.push(clipped);
            }
            Err(e) => {
                warn!("Skipping {} {}: {}", granule.record.id, task.band, e);
                outcome.failures.push(e);
            }
        }
    }

    outcome
}
