//! Run configuration loaded from an optional JSON file. Every section and field
//! has a default, so `{}` is a valid file.
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::io::catalog::CatalogConfig;
use crate::io::gdal::GdalHttpConfig;

/// Name of the cached catalog search results inside the output directory
pub const RESULTS_FILE: &str = "hls_super_results.json";
/// Name of the asset link list inside the output directory
pub const LINKS_FILE: &str = "hls_super_links.txt";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub catalog: CatalogConfig,
    pub gdal: GdalHttpConfig,
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: RunConfig = serde_json::from_str(&text)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::gdal::gdal_http_options;

    #[test]
    fn empty_object_uses_defaults() {
        let config: RunConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.catalog.page_size, 100);
        assert_eq!(config.catalog.s30_collection, "HLSS30_2.0");
        assert_eq!(config.gdal.max_retry, 10);
    }

    #[test]
    fn partial_sections_override_fields() {
        let config: RunConfig = serde_json::from_str(
            r#"{"catalog": {"max_attempts": 5}, "gdal": {"retry_delay_secs": 2.0}}"#,
        )
        .unwrap();
        assert_eq!(config.catalog.max_attempts, 5);
        assert_eq!(config.catalog.page_size, 100);
        assert_eq!(config.gdal.retry_delay_secs, 2.0);
    }

    #[test]
    fn tls_verification_stays_on_by_default() {
        let config: RunConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.gdal.unsafe_ssl);
        let options = gdal_http_options(&config.gdal);
        assert!(options.iter().all(|(key, _)| *key != "GDAL_HTTP_UNSAFESSL"));
    }

    #[test]
    fn tls_verification_can_be_disabled() {
        let config: RunConfig =
            serde_json::from_str(r#"{"gdal": {"unsafe_ssl": true}}"#).unwrap();
        assert!(config.gdal.unsafe_ssl);
        let options = gdal_http_options(&config.gdal);
        assert!(
            options
                .iter()
                .any(|(key, value)| *key == "GDAL_HTTP_UNSAFESSL" && value == "YES")
        );
    }

    #[test]
    fn reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"catalog": {"page_size": 50}}"#).unwrap();
        let config = RunConfig::from_file(&path).unwrap();
        assert_eq!(config.catalog.page_size, 50);
    }
}
