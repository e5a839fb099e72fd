//! STAC catalog client for the CMR-STAC `LPCLOUD` provider.
//!
//! Key features:
//! - POST search per page (`bbox`, `datetime`, `collections`, `limit`, `page`)
//! - Exponential backoff retry on transient failures (connection errors, 429, 5xx)
//! - De-duplication by granule id across pages
//! - Client-side cloud-cover filter (the server does not filter on `eo:cloud_cover`)
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::filter::QueryFilter;
use crate::core::granule::GranuleRecord;
use crate::error::{Error, Result};
use crate::types::Product;

/// Catalog endpoint and paging/retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub endpoint: String,
    pub s30_collection: String,
    pub l30_collection: String,
    /// Items requested per page
    pub page_size: u32,
    /// Hard stop on pagination
    pub max_pages: u32,
    /// Attempts per page before giving up (first try included)
    pub max_attempts: u32,
    /// Initial retry delay (doubles each retry)
    pub initial_retry_delay_ms: u64,
    /// Maximum retry delay
    pub max_retry_delay_ms: u64,
    /// HTTP request timeout
    pub request_timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://cmr.earthdata.nasa.gov/stac/LPCLOUD/search".to_string(),
            s30_collection: "HLSS30_2.0".to_string(),
            l30_collection: "HLSL30_2.0".to_string(),
            page_size: 100,
            max_pages: 100,
            max_attempts: 3,
            initial_retry_delay_ms: 1000,
            max_retry_delay_ms: 30_000,
            request_timeout_secs: 60,
        }
    }
}

impl CatalogConfig {
    pub fn collection(&self, product: Product) -> &str {
        match product {
            Product::S30 => &self.s30_collection,
            Product::L30 => &self.l30_collection,
        }
    }
}

/// Body of a STAC item-search POST.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub bbox: [f64; 4],
    pub datetime: String,
    pub collections: Vec<String>,
    pub limit: u32,
    pub page: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub features: Vec<StacItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StacItem {
    pub id: String,
    #[serde(default)]
    pub properties: StacProperties,
    #[serde(default)]
    pub assets: BTreeMap<String, StacAsset>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StacProperties {
    #[serde(rename = "eo:cloud_cover")]
    pub cloud_cover: Option<f64>,
    pub datetime: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StacAsset {
    pub href: String,
}

/// Transport-level failure of one search request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("catalog returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed catalog response: {0}")]
    Decode(String),
}

impl TransportError {
    /// Connection problems, throttling and server errors are worth retrying;
    /// other client errors mean the request itself is wrong.
    pub fn is_transient(&self) -> bool {
        match self {
            TransportError::Http(e) => !e.is_decode(),
            TransportError::Status { status, .. } => *status == 429 || *status >= 500,
            TransportError::Decode(_) => false,
        }
    }
}

/// One round trip to the catalog. Implemented over HTTP in production and by
/// canned responses in tests.
pub trait CatalogTransport {
    fn search_page(&self, request: &SearchRequest) -> std::result::Result<SearchPage, TransportError>;
}

/// Blocking HTTP transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::CatalogUnavailable {
                attempts: 0,
                reason: format!("failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
        })
    }
}

impl CatalogTransport for HttpTransport {
    fn search_page(&self, request: &SearchRequest) -> std::result::Result<SearchPage, TransportError> {
        let response = self.client.post(&self.endpoint).json(request).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }
        let text = response.text()?;
        serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

/// Searches the catalog for granules matching a `QueryFilter`.
pub struct CatalogClient<T: CatalogTransport> {
    transport: T,
    config: CatalogConfig,
}

impl CatalogClient<HttpTransport> {
    pub fn http(config: CatalogConfig) -> Result<Self> {
        Ok(Self::new(HttpTransport::new(&config)?, config))
    }
}

impl<T: CatalogTransport> CatalogClient<T> {
    pub fn new(transport: T, config: CatalogConfig) -> Self {
        Self { transport, config }
    }

    /// All granules matching the filter, de-duplicated by id and filtered on
    /// cloud cover. An empty result is not an error.
    pub fn search(&self, filter: &QueryFilter) -> Result<Vec<GranuleRecord>> {
        let collections: Vec<String> = filter
            .products()
            .iter()
            .map(|p| self.config.collection(*p).to_string())
            .collect();
        let limit = self.config.page_size.max(1);

        let mut seen: HashSet<String> = HashSet::new();
        let mut records = Vec::new();
        let mut cloudy = 0usize;

        for page in 1..=self.config.max_pages {
            let request = SearchRequest {
                bbox: filter.roi().bbox.as_array(),
                datetime: filter.dates().stac_interval(),
                collections: collections.clone(),
                limit,
                page,
            };
            let response = self.fetch_with_retry(&request)?;
            let returned = response.features.len();
            debug!("Catalog page {} returned {} item(s)", page, returned);

            for item in response.features {
                if !seen.insert(item.id.clone()) {
                    debug!("Skipping duplicate granule {}", item.id);
                    continue;
                }
                if let Some(cc) = item.properties.cloud_cover {
                    if cc > f64::from(filter.cloud_cover()) {
                        cloudy += 1;
                        continue;
                    }
                }
                let assets = item
                    .assets
                    .into_iter()
                    .map(|(key, asset)| (key, asset.href));
                match GranuleRecord::new(&item.id, item.properties.cloud_cover, assets) {
                    Ok(record) if filter.products().contains(&record.product) => {
                        records.push(record)
                    }
                    Ok(record) => debug!("Ignoring {} (product not requested)", record.id),
                    Err(e) => warn!("Ignoring catalog item: {}", e),
                }
            }

            if returned < limit as usize {
                break;
            }
            if page == self.config.max_pages {
                warn!(
                    "Stopped after {} catalog pages; results may be incomplete",
                    self.config.max_pages
                );
            }
        }

        info!(
            "Catalog search found {} granule(s) ({} above {}% cloud cover)",
            records.len(),
            cloudy,
            filter.cloud_cover()
        );
        Ok(records)
    }

    fn fetch_with_retry(&self, request: &SearchRequest) -> Result<SearchPage> {
        let max_attempts = self.config.max_attempts.max(1);
        let max_delay = Duration::from_millis(self.config.max_retry_delay_ms);
        let mut delay = Duration::from_millis(self.config.initial_retry_delay_ms);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.transport.search_page(request) {
                Ok(page) => return Ok(page),
                Err(e) if !e.is_transient() => {
                    return Err(Error::CatalogUnavailable {
                        attempts: attempt,
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    if attempt >= max_attempts {
                        return Err(Error::CatalogUnavailable {
                            attempts: attempt,
                            reason: e.to_string(),
                        });
                    }
                    warn!(
                        "Catalog request failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt, max_attempts, delay, e
                    );
                    std::thread::sleep(delay);
                    delay = std::cmp::min(delay * 2, max_delay);
                }
            }
        }
    }
}
