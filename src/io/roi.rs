//! Vector ROI input (GeoJSON, Shapefile, GeoPackage, KML) read through OGR.
use std::path::Path;

use gdal::Dataset;
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::vector::{Geometry, LayerAccess};
use tracing::debug;

use super::gdal::GdalError;
use crate::core::filter::BoundingBox;

/// Union all features of the first layer, reproject to lon/lat when needed, and
/// return the envelope together with the polygon as WKT.
pub fn read_vector_roi(path: &Path) -> Result<(BoundingBox, String), GdalError> {
    let dataset = Dataset::open(path)?;
    if dataset.layer_count() == 0 {
        return Err(GdalError::UnsupportedFormat(format!(
            "{} has no vector layers",
            path.display()
        )));
    }
    let mut layer = dataset.layer(0)?;
    let layer_srs = layer.spatial_ref();

    let mut merged: Option<Geometry> = None;
    for feature in layer.features() {
        let Some(geometry) = feature.geometry() else {
            continue;
        };
        merged = match merged {
            None => Some(geometry.clone()),
            Some(acc) => Some(acc.union(geometry).ok_or_else(|| {
                GdalError::UnsupportedFormat("feature union failed".to_string())
            })?),
        };
    }
    let mut geometry = merged.ok_or_else(|| {
        GdalError::UnsupportedFormat(format!("{} contains no geometries", path.display()))
    })?;

    match layer_srs {
        Some(mut source) if !source.is_geographic() => {
            debug!("Reprojecting ROI from {:?} to EPSG:4326", source.name());
            source.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
            let mut target = SpatialRef::from_epsg(4326)?;
            target.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
            let transform = CoordTransform::new(&source, &target)?;
            geometry = geometry.transform(&transform)?;
        }
        _ => {}
    }

    let envelope = geometry.envelope();
    let bbox = BoundingBox {
        min_lon: envelope.MinX,
        min_lat: envelope.MinY,
        max_lon: envelope.MaxX,
        max_lat: envelope.MaxY,
    };
    Ok((bbox, geometry.wkt()?))
}
