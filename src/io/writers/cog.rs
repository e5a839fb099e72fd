use gdal::raster::{Buffer, GdalType, RasterCreationOptions};
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::path::Path;
use tracing::{debug, info};

use super::metadata::{embed_dataset_metadata, extract_metadata_fields};
use super::{publish, staging_path};
use crate::core::processing::pipeline::ClippedBand;
use crate::io::gdal::{GdalError, SampleType};

/// Conversion from the f64 working buffer to an output sample type.
pub(crate) trait Sample: GdalType + Copy {
    fn from_f64(v: f64) -> Self;
}

macro_rules! int_sample {
    ($($t:ty),*) => {
        $(impl Sample for $t {
            fn from_f64(v: f64) -> Self {
                // `as` saturates; NaN becomes 0
                v.round() as $t
            }
        })*
    };
}
int_sample!(u8, i16, u16, i32, u32);

impl Sample for f32 {
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl Sample for f64 {
    fn from_f64(v: f64) -> Self {
        v
    }
}

fn build_typed<T: Sample>(layers: &[&Array2<f64>]) -> Result<Dataset, GdalError> {
    let (rows, cols) = layers[0].dim();
    let driver = DriverManager::get_driver_by_name("MEM")?;
    let ds = driver.create_with_band_type::<T, _>("", cols, rows, layers.len())?;
    for (i, layer) in layers.iter().enumerate() {
        if layer.dim() != (rows, cols) {
            let (r, c) = layer.dim();
            return Err(GdalError::DimensionMismatch(cols, rows, c, r));
        }
        let data: Vec<T> = layer.iter().map(|v| T::from_f64(*v)).collect();
        let mut buf = Buffer::new((cols, rows), data);
        let mut band = ds.rasterband(i + 1)?;
        band.write((0, 0), (cols, rows), &mut buf)?;
    }
    Ok(ds)
}

/// In-memory dataset with one band per layer, all of the same shape.
pub(crate) fn build_mem_dataset(
    layers: &[&Array2<f64>],
    sample_type: SampleType,
) -> Result<Dataset, GdalError> {
    if layers.is_empty() {
        return Err(GdalError::UnsupportedFormat("no layers to write".into()));
    }
    match sample_type {
        SampleType::U8 => build_typed::<u8>(layers),
        SampleType::I16 => build_typed::<i16>(layers),
        SampleType::U16 => build_typed::<u16>(layers),
        SampleType::I32 => build_typed::<i32>(layers),
        SampleType::U32 => build_typed::<u32>(layers),
        SampleType::F32 => build_typed::<f32>(layers),
        SampleType::F64 => build_typed::<f64>(layers),
    }
}

/// Set geotransform, projection and per-band nodata.
pub(crate) fn georeference(
    ds: &mut Dataset,
    geotransform: [f64; 6],
    projection: &str,
    no_data: f64,
) -> Result<(), GdalError> {
    ds.set_geo_transform(&geotransform)?;
    if !projection.is_empty() {
        ds.set_projection(projection)?;
    }
    for i in 1..=ds.raster_count() as usize {
        let mut band = ds.rasterband(i)?;
        band.set_no_data_value(Some(no_data))?;
    }
    Ok(())
}

fn cog_options() -> Result<(gdal::Driver, RasterCreationOptions), GdalError> {
    let mut co = RasterCreationOptions::new();
    match DriverManager::get_driver_by_name("COG") {
        Ok(driver) => {
            co.add_string("COMPRESS=DEFLATE")?;
            co.add_string("BLOCKSIZE=512")?;
            co.add_string("OVERVIEWS=AUTO")?;
            Ok((driver, co))
        }
        Err(_) => {
            // GDAL < 3.1: tiled GeoTIFF is the closest layout
            debug!("COG driver unavailable, writing tiled GeoTIFF");
            co.add_string("TILED=YES")?;
            co.add_string("COMPRESS=DEFLATE")?;
            co.add_string("BLOCKXSIZE=512")?;
            co.add_string("BLOCKYSIZE=512")?;
            Ok((DriverManager::get_driver_by_name("GTiff")?, co))
        }
    }
}

/// Write one clipped band as a Cloud-Optimized GeoTIFF at `output`.
pub fn write_cog(clip: &ClippedBand, output: &Path) -> Result<(), GdalError> {
    let mut mem = build_mem_dataset(&[&clip.data], clip.sample_type)?;
    georeference(&mut mem, clip.geotransform, &clip.projection, clip.fill)?;
    embed_dataset_metadata(&mut mem, &extract_metadata_fields(clip), "")?;

    let (driver, options) = cog_options()?;
    let staged = staging_path(output)?;
    let copy = mem.create_copy(&driver, &*staged, &options)?;
    // flush and close before the rename
    drop(copy);
    publish(staged, output)?;
    info!("Wrote {:?}", output);
    Ok(())
}
