//! Per-tile NetCDF-4 time series. Each band symbol becomes one variable with
//! dimensions `(time, y, x)`; variables are appended one after another into the
//! same file through GDAL's netCDF driver.
use chrono::{DateTime, Utc};
use gdal::raster::RasterCreationOptions;
use gdal::{DriverManager, Metadata};
use ndarray::Array2;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::cog::{build_mem_dataset, georeference};
use super::metadata::embed_dataset_metadata;
use super::{publish, staging_path};
use crate::core::processing::scale::ScaleParams;
use crate::io::gdal::{GdalError, SampleType};
use crate::types::Band;

const TIME_UNITS: &str = "days since 1970-01-01 00:00:00";
/// netCDF external type of the time coordinate (NC_DOUBLE)
const NC_DOUBLE: u8 = 6;

/// One variable of a time series. `layers[i]` belongs to `times[i]` of the
/// enclosing series; `None` is written as all-fill.
pub struct VariableStack<'a> {
    pub band: Band,
    pub layers: Vec<Option<&'a Array2<f64>>>,
    pub sample_type: SampleType,
    pub fill: f64,
    pub scale: ScaleParams,
    pub scaling_applied: bool,
}

/// All variables of one tile on a shared grid and time axis.
pub struct TimeSeries<'a> {
    pub tile: String,
    /// Strictly increasing acquisition times
    pub times: Vec<DateTime<Utc>>,
    pub shape: (usize, usize),
    pub geotransform: [f64; 6],
    pub projection: String,
    pub variables: Vec<VariableStack<'a>>,
    /// Global attributes (written with the `NC_GLOBAL#` prefix)
    pub attributes: BTreeMap<String, String>,
}

pub fn days_since_epoch(t: DateTime<Utc>) -> f64 {
    t.timestamp() as f64 / 86_400.0
}

fn variable_attributes(var: &VariableStack) -> Vec<(&'static str, String)> {
    let mut attrs = vec![
        ("long_name", format!("HLS {}", var.band.symbol())),
        ("hls_band", var.band.symbol().to_string()),
        ("scaling_applied", var.scaling_applied.to_string()),
    ];
    if var.scaling_applied {
        attrs.push(("source_scale_factor", var.scale.scale.to_string()));
        attrs.push(("source_add_offset", var.scale.offset.to_string()));
    } else {
        attrs.push(("scale_factor", var.scale.scale.to_string()));
        attrs.push(("add_offset", var.scale.offset.to_string()));
    }
    attrs
}

/// Write the series to `output` (replacing any existing file once complete).
pub fn write_time_series(series: &TimeSeries, output: &Path) -> Result<(), GdalError> {
    if series.times.is_empty() || series.variables.is_empty() {
        return Err(GdalError::UnsupportedFormat(format!(
            "empty time series for tile {}",
            series.tile
        )));
    }
    let driver = DriverManager::get_driver_by_name("netCDF")?;
    let staged = staging_path(output)?;

    let time_values: Vec<String> = series
        .times
        .iter()
        .map(|t| days_since_epoch(*t).to_string())
        .collect();
    let n_times = time_values.len();

    for (i, var) in series.variables.iter().enumerate() {
        if var.layers.len() != n_times {
            return Err(GdalError::DimensionMismatch(n_times, 1, var.layers.len(), 1));
        }
        let name = var.band.variable_name();
        let fill_layer = Array2::from_elem(series.shape, var.fill);
        let layers: Vec<&Array2<f64>> = var
            .layers
            .iter()
            .map(|l| l.unwrap_or(&fill_layer))
            .collect();

        let mut mem = build_mem_dataset(&layers, var.sample_type)?;
        georeference(&mut mem, series.geotransform, &series.projection, var.fill)?;

        mem.set_metadata_item("NETCDF_DIM_EXTRA", "{time}", "")?;
        mem.set_metadata_item(
            "NETCDF_DIM_time_DEF",
            &format!("{{{},{}}}", n_times, NC_DOUBLE),
            "",
        )?;
        mem.set_metadata_item(
            "NETCDF_DIM_time_VALUES",
            &format!("{{{}}}", time_values.join(",")),
            "",
        )?;
        mem.set_metadata_item("time#units", TIME_UNITS, "")?;
        mem.set_metadata_item("time#standard_name", "time", "")?;
        mem.set_metadata_item("time#calendar", "standard", "")?;
        mem.set_metadata_item("time#axis", "T", "")?;
        embed_dataset_metadata(&mut mem, &series.attributes, "NC_GLOBAL#")?;

        let attrs = variable_attributes(var);
        for (b, value) in time_values.iter().enumerate() {
            let mut band = mem.rasterband(b + 1)?;
            band.set_metadata_item("NETCDF_VARNAME", &name, "")?;
            band.set_metadata_item("NETCDF_DIM_time", value, "")?;
            for (key, attr) in &attrs {
                band.set_metadata_item(key, attr, "")?;
            }
        }

        let mut co = RasterCreationOptions::new();
        co.add_string("FORMAT=NC4")?;
        co.add_string("COMPRESS=DEFLATE")?;
        if i > 0 {
            co.add_string("APPEND_SUBDATASET=YES")?;
        }
        drop(mem.create_copy(&driver, &*staged, &co)?);
        debug!("Wrote variable {} ({} time step(s))", name, n_times);
    }

    publish(staged, output)?;
    info!(
        "Wrote {:?} ({} variable(s), {} time step(s))",
        output,
        series.variables.len(),
        n_times
    );
    Ok(())
}
