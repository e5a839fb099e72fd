//! Filter builder: validates user input (ROI, dates, products, bands, cloud cover)
//! and produces the immutable `QueryFilter` handed to the catalog client.
use std::path::Path;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::bands::{BandSelection, is_known_band};
use crate::error::{Error, Result};
use crate::types::{Band, Product};

pub const DEFAULT_START_DATE: &str = "2014-04-03";
const DATE_FORMAT: &str = "%Y-%m-%d";
const VECTOR_EXTENSIONS: &[&str] = &["geojson", "json", "shp", "gpkg", "kml"];

fn strip_quotes(s: &str) -> &str {
    s.trim().trim_matches('\'').trim_matches('"').trim()
}

/// Geographic bounding box in EPSG:4326, `(min_lon, min_lat, max_lon, max_lat)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    pub fn as_array(&self) -> [f64; 4] {
        [self.min_lon, self.min_lat, self.max_lon, self.max_lat]
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

/// Region of interest: bounding box plus, for vector inputs, the exact polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    pub bbox: BoundingBox,
    /// Union of all input features in EPSG:4326 as WKT (vector inputs only)
    pub polygon_wkt: Option<String>,
}

impl Roi {
    pub fn from_bbox(bbox: BoundingBox) -> Self {
        Self {
            bbox,
            polygon_wkt: None,
        }
    }

    /// Parse a bbox string (`minLon,minLat,maxLon,maxLat`) or open a vector file.
    pub fn parse(input: &str) -> Result<Self> {
        let cleaned = strip_quotes(input);
        let path = Path::new(cleaned);
        if path.is_file() {
            info!("Reading ROI from vector file: {:?}", path);
            let (bbox, wkt) = crate::io::roi::read_vector_roi(path)
                .map_err(|e| Error::invalid_roi(cleaned, e))?;
            return Ok(Self {
                bbox,
                polygon_wkt: Some(wkt),
            });
        }

        let looks_like_file = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| VECTOR_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if looks_like_file {
            return Err(Error::invalid_roi(cleaned, "file does not exist"));
        }

        Ok(Self::from_bbox(parse_bbox(cleaned)?))
    }
}

/// Parse exactly four comma-separated finite floats.
pub fn parse_bbox(input: &str) -> Result<BoundingBox> {
    let cleaned = strip_quotes(input);
    let values = cleaned
        .split(',')
        .map(|v| {
            strip_quotes(v.trim_matches(|c| c == '[' || c == ']'))
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
        })
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| Error::invalid_roi(cleaned, "bounding box values must be numeric"))?;

    if values.len() != 4 {
        return Err(Error::invalid_roi(
            cleaned,
            format!("expected 4 values, got {}", values.len()),
        ));
    }

    let bbox = BoundingBox {
        min_lon: values[0],
        min_lat: values[1],
        max_lon: values[2],
        max_lat: values[3],
    };
    if [bbox.min_lon, bbox.max_lon].iter().any(|v| v.abs() > 180.0) {
        return Err(Error::invalid_roi(cleaned, "longitude must be within [-180, 180]"));
    }
    if [bbox.min_lat, bbox.max_lat].iter().any(|v| v.abs() > 90.0) {
        return Err(Error::invalid_roi(cleaned, "latitude must be within [-90, 90]"));
    }
    if bbox.min_lon > bbox.max_lon || bbox.min_lat > bbox.max_lat {
        return Err(Error::invalid_roi(
            cleaned,
            "expected min_lon,min_lat,max_lon,max_lat with min <= max",
        ));
    }
    Ok(bbox)
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let cleaned = strip_quotes(input);
    NaiveDate::parse_from_str(cleaned, DATE_FORMAT).map_err(|_| {
        Error::InvalidDateRange(format!(
            "`{}` is not a valid date; expected YYYY-MM-DD (e.g. 2020-10-20)",
            cleaned
        ))
    })
}

/// Inclusive acquisition date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateRange(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn default_end() -> String {
        Utc::now().date_naive().format(DATE_FORMAT).to_string()
    }

    /// STAC `datetime` interval covering both days completely.
    pub fn stac_interval(&self) -> String {
        format!(
            "{}T00:00:00Z/{}T23:59:59Z",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

pub fn parse_cloud_cover(input: &str) -> Result<u8> {
    let cleaned = strip_quotes(input);
    let invalid = |reason: &str| Error::InvalidParameter {
        arg: "cc",
        value: cleaned.to_string(),
        reason: reason.to_string(),
    };
    let value: i64 = cleaned
        .parse()
        .map_err(|_| invalid("expected an integer between 0 and 100"))?;
    if !(0..=100).contains(&value) {
        return Err(invalid("cloud cover must be between 0 and 100"));
    }
    Ok(value as u8)
}

pub fn parse_bands(input: &str) -> Result<BandSelection> {
    let cleaned = strip_quotes(input);
    let mut bands = Vec::new();
    let mut all = false;
    // every token is checked before `ALL` takes over
    for token in cleaned.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        if token.eq_ignore_ascii_case("ALL") {
            all = true;
            continue;
        }
        let band: Band = token.parse().map_err(|reason| Error::InvalidParameter {
            arg: "bands",
            value: token.to_string(),
            reason,
        })?;
        if !is_known_band(band) {
            return Err(Error::InvalidParameter {
                arg: "bands",
                value: token.to_string(),
                reason: "no product provides this band".to_string(),
            });
        }
        if !bands.contains(&band) {
            bands.push(band);
        }
    }
    if all {
        return Ok(BandSelection::All);
    }
    if bands.is_empty() {
        return Err(Error::InvalidParameter {
            arg: "bands",
            value: cleaned.to_string(),
            reason: "no bands requested".to_string(),
        });
    }
    Ok(BandSelection::List(bands))
}

/// Validated search and subset filter, immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    roi: Roi,
    dates: DateRange,
    products: Vec<Product>,
    cloud_cover: u8,
    bands: BandSelection,
}

impl QueryFilter {
    pub fn new(
        roi: Roi,
        dates: DateRange,
        products: Vec<Product>,
        cloud_cover: u8,
        bands: BandSelection,
    ) -> Result<Self> {
        if products.is_empty() {
            return Err(Error::InvalidParameter {
                arg: "prod",
                value: String::new(),
                reason: "at least one product is required".to_string(),
            });
        }
        if cloud_cover > 100 {
            return Err(Error::InvalidParameter {
                arg: "cc",
                value: cloud_cover.to_string(),
                reason: "cloud cover must be between 0 and 100".to_string(),
            });
        }
        let filter = Self {
            roi,
            dates,
            products,
            cloud_cover,
            bands,
        };
        debug!("Query filter: {:?}", filter);
        Ok(filter)
    }

    pub fn roi(&self) -> &Roi {
        &self.roi
    }

    pub fn dates(&self) -> &DateRange {
        &self.dates
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn cloud_cover(&self) -> u8 {
        self.cloud_cover
    }

    pub fn bands(&self) -> &BandSelection {
        &self.bands
    }
}
