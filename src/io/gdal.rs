use gdal::raster::GdalDataType;
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use gdal::vector::Geometry;
use gdal::{Dataset, Metadata, errors::GdalError as GdalCrateError};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::filter::BoundingBox;
use crate::core::processing::clip::{self, PixelWindow};

/// Errors encountered when reading or writing rasters through GDAL
#[derive(Debug, Error)]
pub enum GdalError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] GdalCrateError),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Dimension mismatch: expected {0}x{1}, got {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),
    #[error("Region of interest does not overlap {0}")]
    NoOverlap(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Sample type of a source band, kept so unscaled outputs retain it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleType {
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl SampleType {
    fn from_gdal(dt: GdalDataType) -> Result<Self, GdalError> {
        match dt {
            GdalDataType::UInt8 => Ok(SampleType::U8),
            GdalDataType::Int16 => Ok(SampleType::I16),
            GdalDataType::UInt16 => Ok(SampleType::U16),
            GdalDataType::Int32 => Ok(SampleType::I32),
            GdalDataType::UInt32 => Ok(SampleType::U32),
            GdalDataType::Float32 => Ok(SampleType::F32),
            GdalDataType::Float64 => Ok(SampleType::F64),
            other => Err(GdalError::UnsupportedFormat(format!(
                "band type {:?}",
                other
            ))),
        }
    }
}

/// Metadata of the first band of an HLS asset
#[derive(Debug, Clone)]
pub struct RasterMetadata {
    /// Width (pixels) of the raster
    pub size_x: usize,
    /// Height (lines) of the raster
    pub size_y: usize,
    /// Affine geotransform coefficients ([origin_x, pixel_width, rot_x, origin_y, rot_y, pixel_height])
    pub geotransform: [f64; 6],
    /// Projection in WKT format
    pub projection: String,
    pub sample_type: SampleType,
    pub no_data: Option<f64>,
    /// Scale factor declared by the asset (band scale or `scale_factor` item)
    pub scale: Option<f64>,
    /// Offset declared by the asset (band offset or `add_offset` item)
    pub offset: Option<f64>,
}

/// HTTP/auth settings applied to GDAL before any remote read.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GdalHttpConfig {
    /// Cookie jar shared by all `/vsicurl/` reads (Earthdata Login redirects)
    pub cookie_file: PathBuf,
    /// Optional `.netrc` with Earthdata credentials
    pub netrc_file: Option<PathBuf>,
    pub max_retry: u32,
    pub retry_delay_secs: f64,
    /// Skip TLS certificate verification (`GDAL_HTTP_UNSAFESSL`)
    pub unsafe_ssl: bool,
}

impl Default for GdalHttpConfig {
    fn default() -> Self {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self {
            cookie_file: home.join("cookies.txt"),
            netrc_file: None,
            max_retry: 10,
            retry_delay_secs: 0.5,
            unsafe_ssl: false,
        }
    }
}

/// GDAL configuration options derived from `config`, in the order they are set.
pub fn gdal_http_options(config: &GdalHttpConfig) -> Vec<(&'static str, String)> {
    let cookie = config.cookie_file.to_string_lossy().into_owned();
    let mut options = vec![
        ("GDAL_HTTP_COOKIEFILE", cookie.clone()),
        ("GDAL_HTTP_COOKIEJAR", cookie),
        ("GDAL_DISABLE_READDIR_ON_OPEN", "EMPTY_DIR".to_string()),
        ("CPL_VSIL_CURL_ALLOWED_EXTENSIONS", "TIF".to_string()),
        ("GDAL_HTTP_MAX_RETRY", config.max_retry.to_string()),
        ("GDAL_HTTP_RETRY_DELAY", config.retry_delay_secs.to_string()),
    ];
    if config.unsafe_ssl {
        options.push(("GDAL_HTTP_UNSAFESSL", "YES".to_string()));
    }
    if let Some(netrc) = &config.netrc_file {
        options.push(("GDAL_HTTP_NETRC", "YES".to_string()));
        options.push(("GDAL_HTTP_NETRC_FILE", netrc.to_string_lossy().into_owned()));
    }
    options
}

/// Process-wide GDAL configuration for cloud reads.
pub fn configure_gdal_http(config: &GdalHttpConfig) -> Result<(), GdalError> {
    for (key, value) in gdal_http_options(config) {
        gdal::config::set_config_option(key, &value)?;
    }
    if config.unsafe_ssl {
        warn!("TLS certificate verification is disabled for remote reads");
    }
    debug!(
        "GDAL HTTP options configured (cookies: {})",
        config.cookie_file.display()
    );
    Ok(())
}

/// Map an asset href to a path GDAL can open: HTTP(S) through `/vsicurl/`,
/// S3 through `/vsis3/`, anything else is treated as a local path.
pub fn to_gdal_path(href: &str) -> String {
    if let Some(rest) = href.strip_prefix("s3://") {
        format!("/vsis3/{}", rest)
    } else if href.starts_with("http://") || href.starts_with("https://") {
        format!("/vsicurl/{}", href)
    } else {
        href.strip_prefix("file://").unwrap_or(href).to_string()
    }
}

fn wgs84() -> Result<SpatialRef, GdalError> {
    let mut srs = SpatialRef::from_epsg(4326)?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

/// Collect polygon rings (as 2D points) from any polygonal geometry.
pub(crate) fn collect_rings(geometry: &Geometry, out: &mut Vec<Vec<(f64, f64)>>) {
    let count = geometry.geometry_count();
    if count == 0 {
        let mut points = Vec::new();
        geometry.get_points(&mut points);
        let ring: Vec<(f64, f64)> = points
            .into_iter()
            .map(|(x, y, _)| (x, y))
            .collect();
        if ring.len() >= 3 {
            out.push(ring);
        }
        return;
    }
    for i in 0..count {
        collect_rings(&geometry.get_geometry(i), out);
    }
}

/// Reader for a single-band HLS asset (local or remote COG)
pub struct HlsRasterReader {
    pub dataset: Dataset,
    pub metadata: RasterMetadata,
    source: String,
}

impl HlsRasterReader {
    /// Open an asset by href (URL, `s3://` or local path)
    pub fn open(href: &str) -> Result<Self, GdalError> {
        let path = to_gdal_path(href);
        let dataset = Dataset::open(&path)?;
        let (size_x, size_y) = dataset.raster_size();
        if dataset.raster_count() == 0 {
            return Err(GdalError::UnsupportedFormat(format!(
                "No raster bands found in {}",
                href
            )));
        }
        let geotransform = dataset.geo_transform()?;
        let projection = dataset.projection();

        let band = dataset.rasterband(1)?;
        let sample_type = SampleType::from_gdal(band.band_type())?;
        let no_data = band.no_data_value();
        let scale = band.scale().or_else(|| {
            band.metadata_item("scale_factor", "")
                .and_then(|v| v.trim().parse::<f64>().ok())
        });
        let offset = band.offset().or_else(|| {
            band.metadata_item("add_offset", "")
                .and_then(|v| v.trim().parse::<f64>().ok())
        });

        Ok(HlsRasterReader {
            metadata: RasterMetadata {
                size_x,
                size_y,
                geotransform,
                projection,
                sample_type,
                no_data,
                scale,
                offset,
            },
            dataset,
            source: href.to_string(),
        })
    }

    fn transform_from_wgs84(&self) -> Result<CoordTransform, GdalError> {
        let mut target = self.dataset.spatial_ref()?;
        target.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
        Ok(CoordTransform::new(&wgs84()?, &target)?)
    }

    /// Pixel window covering a lon/lat bounding box, snapped outward to the grid.
    pub fn clip_window(&self, bbox: &BoundingBox) -> Result<PixelWindow, GdalError> {
        let transform = self.transform_from_wgs84()?;
        let mut bounds = bbox.as_array();
        let projected = transform.transform_bounds(&mut bounds, 21)?;
        clip::window_for_bounds(
            self.metadata.geotransform,
            (self.metadata.size_x, self.metadata.size_y),
            projected,
        )
        .ok_or_else(|| GdalError::NoOverlap(self.source.clone()))
    }

    /// Read a window of band 1 as an f64 ndarray of shape (height, width)
    pub fn read_window(&self, window: &PixelWindow) -> Result<Array2<f64>, GdalError> {
        let band = self.dataset.rasterband(1)?;
        let size = (window.width, window.height);
        let buf = band.read_as::<f64>(
            (window.x_off as isize, window.y_off as isize),
            size,
            size,
            None,
        )?;
        let data_vec = buf.data().to_vec();
        let got = data_vec.len();
        Array2::from_shape_vec(window.shape(), data_vec).map_err(|_| {
            GdalError::DimensionMismatch(window.width, window.height, got, 1)
        })
    }

    /// Cells of `window` whose centers fall inside a lon/lat polygon given as WKT.
    pub fn polygon_mask(
        &self,
        window: &PixelWindow,
        polygon_wkt: &str,
    ) -> Result<Array2<bool>, GdalError> {
        let transform = self.transform_from_wgs84()?;
        let polygon = Geometry::from_wkt(polygon_wkt)?.transform(&transform)?;
        let mut rings = Vec::new();
        collect_rings(&polygon, &mut rings);
        let gt = clip::window_geotransform(self.metadata.geotransform, window);
        Ok(clip::polygon_mask(&rings, gt, window.width, window.height))
    }
}
