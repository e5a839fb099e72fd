//! Output naming and format dispatch for clipped bands.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::core::processing::pipeline::ClippedBand;
use crate::error::{Error, Result};
use crate::io::writers::cog::write_cog;
use crate::io::writers::metadata::time_series_attributes;
use crate::io::writers::netcdf::{TimeSeries, VariableStack, write_time_series};
use crate::types::{Band, OutputFormat};

/// `<granule id>.<asset key>.subset.tif`
pub fn single_output_name(granule_id: &str, asset_key: &str) -> String {
    format!(
        "{}.{}.subset.{}",
        granule_id,
        asset_key,
        OutputFormat::Cog.extension()
    )
}

/// `HLS.<tile>.<first %m%d%Y>.<last %m%d%Y>.subset.nc4`, dates in chronological
/// order whatever the order of `times`.
pub fn aggregate_output_name(tile: &str, times: &[DateTime<Utc>]) -> Option<String> {
    let first = times.iter().min()?;
    let last = times.iter().max()?;
    Some(format!(
        "HLS.{}.{}.{}.subset.{}",
        tile,
        first.format("%m%d%Y"),
        last.format("%m%d%Y"),
        OutputFormat::Nc4.extension()
    ))
}

/// Write one band as a COG in `out_dir`.
pub fn save_single(clip: &ClippedBand, out_dir: &Path) -> Result<PathBuf> {
    let path = out_dir.join(single_output_name(&clip.granule_id, &clip.asset_key));
    write_cog(clip, &path)?;
    Ok(path)
}

/// Files written by [`save_tile_series`].
#[derive(Debug, Default)]
pub struct SeriesOutcome {
    pub written: Vec<PathBuf>,
    /// Clipped bands stored in the written files
    pub layers: usize,
    pub failures: Vec<Error>,
}

/// Build and write one NetCDF time series per tile. Layers whose shape differs
/// from the tile's grid are skipped and reported.
pub fn save_tile_series(clips: &[ClippedBand], out_dir: &Path) -> SeriesOutcome {
    let mut outcome = SeriesOutcome::default();

    let mut by_tile: BTreeMap<&str, Vec<&ClippedBand>> = BTreeMap::new();
    for clip in clips {
        by_tile.entry(clip.tile.as_str()).or_default().push(clip);
    }

    for (tile, mut members) in by_tile {
        members.sort_by_key(|c| c.acquired);
        // the earliest observation defines the tile grid
        let Some(shape) = members.first().map(|c| c.shape()) else {
            continue;
        };

        let mut kept: Vec<&ClippedBand> = Vec::with_capacity(members.len());
        for clip in members {
            if clip.shape() == shape {
                kept.push(clip);
            } else {
                warn!(
                    "Leaving {} {} out of tile {} series: shape {:?} differs from {:?}",
                    clip.granule_id,
                    clip.band,
                    tile,
                    clip.shape(),
                    shape
                );
                outcome.failures.push(Error::Processing(format!(
                    "{} {}: shape {:?} does not match tile {} grid {:?}",
                    clip.granule_id,
                    clip.band,
                    clip.shape(),
                    tile,
                    shape
                )));
            }
        }

        let mut times: Vec<DateTime<Utc>> = kept.iter().map(|c| c.acquired).collect();
        times.dedup();
        let granules = {
            let mut ids: Vec<&str> = kept.iter().map(|c| c.granule_id.as_str()).collect();
            ids.sort_unstable();
            ids.dedup();
            ids.len()
        };

        let mut by_band: BTreeMap<Band, Vec<&ClippedBand>> = BTreeMap::new();
        for clip in kept.iter().copied() {
            by_band.entry(clip.band).or_default().push(clip);
        }
        let variables: Vec<VariableStack> = by_band
            .into_values()
            .map(|layers| {
                let first = layers[0];
                VariableStack {
                    band: first.band,
                    layers: times
                        .iter()
                        .map(|t| layers.iter().copied().find(|c| c.acquired == *t).map(|c| &c.data))
                        .collect(),
                    sample_type: first.sample_type,
                    fill: first.fill,
                    scale: first.scale,
                    scaling_applied: first.scaling_applied,
                }
            })
            .collect();

        let (Some(name), Some(first)) = (aggregate_output_name(tile, &times), kept.first())
        else {
            continue;
        };
        let series = TimeSeries {
            tile: tile.to_string(),
            attributes: time_series_attributes(tile, times[0], times[times.len() - 1], granules),
            times,
            shape,
            geotransform: first.geotransform,
            projection: first.projection.clone(),
            variables,
        };

        let path = out_dir.join(name);
        match write_time_series(&series, &path) {
            Ok(()) => {
                outcome.written.push(path);
                outcome.layers += kept.len();
            }
            Err(e) => {
                warn!("Failed to write tile {} series: {}", tile, e);
                outcome.failures.push(e.into());
            }
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn single_name_keeps_granule_id() {
        assert_eq!(
            single_output_name("HLS.S30.T10TEK.2021166T184921.v2.0", "B04"),
            "HLS.S30.T10TEK.2021166T184921.v2.0.B04.subset.tif"
        );
    }

    #[test]
    fn aggregate_name_is_chronological() {
        let june = Utc.with_ymd_and_hms(2020, 6, 2, 18, 0, 0).unwrap();
        let july = Utc.with_ymd_and_hms(2020, 7, 10, 18, 0, 0).unwrap();
        let expected = "HLS.T10TEK.06022020.07102020.subset.nc4";
        assert_eq!(aggregate_output_name("T10TEK", &[july, june]).unwrap(), expected);
        assert_eq!(aggregate_output_name("T10TEK", &[june, july]).unwrap(), expected);
        assert!(aggregate_output_name("T10TEK", &[]).is_none());
    }
}
