//! Crate-level error type and `Result` alias.
//! Argument validation failures (`InvalidRoi`, `InvalidDateRange`, `InvalidParameter`)
//! are fatal and raised before any network call; `CatalogUnavailable` is fatal for the
//! run; `UnknownBand` and `AssetUnavailable` are per-record/per-asset and recoverable.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] crate::io::GdalError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid region of interest `{input}`: {reason}")]
    InvalidRoi { input: String, reason: String },

    #[error("Invalid date range: {0}")]
    InvalidDateRange(String),

    #[error("Invalid parameter: {arg}={value} ({reason})")]
    InvalidParameter {
        arg: &'static str,
        value: String,
        reason: String,
    },

    #[error("Catalog unavailable after {attempts} attempt(s): {reason}")]
    CatalogUnavailable { attempts: u32, reason: String },

    #[error("Band {band} is not available for {granule}")]
    UnknownBand { granule: String, band: String },

    #[error("Asset unavailable: {href}: {reason}")]
    AssetUnavailable { href: String, reason: String },

    #[error("Processing error: {0}")]
    Processing(String),
}

impl Error {
    pub fn invalid_roi(input: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::InvalidRoi {
            input: input.into(),
            reason: reason.to_string(),
        }
    }

    pub fn asset_unavailable(href: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Error::AssetUnavailable {
            href: href.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors that only affect a single record or asset.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnknownBand { .. } | Error::AssetUnavailable { .. }
        )
    }
}
