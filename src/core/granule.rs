//! Granule records returned by the catalog, and parsing of HLS granule ids
//! (`HLS.S30.T10TEK.2021166T184921.v2.0`).
use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{AssetRole, Product};

/// Acquisition time format inside granule ids: year, day of year, time of day.
const ID_TIME_FORMAT: &str = "%Y%jT%H%M%S";

/// One downloadable file attached to a granule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRef {
    pub key: String,
    pub href: String,
    pub role: AssetRole,
}

/// One HLS granule as returned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GranuleRecord {
    pub id: String,
    pub product: Product,
    /// MGRS tile id, e.g. `T10TEK`
    pub tile: String,
    pub acquired: DateTime<Utc>,
    /// Product version, e.g. `v2.0`
    pub version: String,
    /// Scene cloud cover in percent when the catalog reports it
    pub cloud_cover: Option<f64>,
    /// Assets keyed by asset key (`B04`, `Fmask`, `browse`, ...)
    pub assets: BTreeMap<String, AssetRef>,
}

/// Fields encoded in a granule id.
#[derive(Debug, Clone, PartialEq)]
pub struct GranuleId {
    pub product: Product,
    pub tile: String,
    pub acquired: DateTime<Utc>,
    pub version: String,
}

pub fn parse_granule_id(id: &str) -> Result<GranuleId> {
    let invalid = |reason: &str| Error::Processing(format!("malformed granule id `{}`: {}", id, reason));
    let parts: Vec<&str> = id.split('.').collect();
    if parts.len() < 5 || parts[0] != "HLS" {
        return Err(invalid("expected HLS.<product>.<tile>.<time>.<version>"));
    }
    let product = Product::from_code(parts[1]).ok_or_else(|| invalid("unknown product"))?;
    let tile = parts[2].to_string();
    let acquired = NaiveDateTime::parse_from_str(parts[3], ID_TIME_FORMAT)
        .map_err(|e| invalid(&e.to_string()))?
        .and_utc();
    let version = parts[4..].join(".");
    Ok(GranuleId {
        product,
        tile,
        acquired,
        version,
    })
}

impl GranuleRecord {
    /// Build a record from a catalog item id and its `(key, href)` assets.
    pub fn new(
        id: &str,
        cloud_cover: Option<f64>,
        assets: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let parsed = parse_granule_id(id)?;
        let assets = assets
            .into_iter()
            .map(|(key, href)| {
                let role = AssetRole::from_asset_key(&key);
                (key.clone(), AssetRef { key, href, role })
            })
            .collect();
        Ok(Self {
            id: id.to_string(),
            product: parsed.product,
            tile: parsed.tile,
            acquired: parsed.acquired,
            version: parsed.version,
            cloud_cover,
            assets,
        })
    }

    pub fn asset(&self, key: &str) -> Option<&AssetRef> {
        self.assets.get(key)
    }

    /// Date in `%Y%j` form, as used in logs and links.
    pub fn julian_date(&self) -> String {
        self.acquired.format("%Y%j").to_string()
    }
}
