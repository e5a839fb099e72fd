//! Search results cache (`hls_super_results.json`) and the plain-text list of
//! resolved asset links (`hls_super_links.txt`) written next to the outputs.
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::filter::QueryFilter;
use crate::core::granule::GranuleRecord;
use crate::core::resolve::{Resolution, ResolvedGranule};
use crate::error::Result;
use crate::io::writers::{publish, staging_path};
use crate::types::AssetRole;

/// Cached search: the query it answers and the records found.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchCache {
    pub query: String,
    pub granules: Vec<GranuleRecord>,
}

/// Identity of a catalog query. Bands are not part of it: they do not change
/// which granules the catalog returns.
pub fn query_key(filter: &QueryFilter) -> String {
    let products: Vec<&str> = filter.products().iter().map(|p| p.short_name()).collect();
    format!(
        "bbox={:?};datetime={};products={};cc<={}",
        filter.roi().bbox.as_array(),
        filter.dates().stac_interval(),
        products.join(","),
        filter.cloud_cover()
    )
}

pub fn save_results(path: &Path, filter: &QueryFilter, granules: &[GranuleRecord]) -> Result<()> {
    let cache = SearchCache {
        query: query_key(filter),
        granules: granules.to_vec(),
    };
    let staged = staging_path(path)?;
    {
        let mut out = BufWriter::new(fs::File::create(&staged)?);
        serde_json::to_writer_pretty(&mut out, &cache)?;
        out.flush()?;
    }
    publish(staged, path)?;
    info!("Saved {} search result(s) to {:?}", granules.len(), path);
    Ok(())
}

/// Cached records for `filter`, or `None` when there is no cache or it was
/// written for a different query.
pub fn load_results(path: &Path, filter: &QueryFilter) -> Result<Option<Vec<GranuleRecord>>> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    let cache: SearchCache = match serde_json::from_str(&text) {
        Ok(cache) => cache,
        Err(e) => {
            warn!("Ignoring unreadable results cache {:?}: {}", path, e);
            return Ok(None);
        }
    };
    if cache.query != query_key(filter) {
        warn!(
            "Ignoring {:?}: it was written for a different query ({})",
            path, cache.query
        );
        return Ok(None);
    }
    debug!("Reusing {} cached result(s) from {:?}", cache.granules.len(), path);
    Ok(Some(cache.granules))
}

/// Hrefs of one resolved granule: the selected bands, the quality mask and the
/// record's browse and metadata assets, without repeats.
pub fn granule_links(granule: &ResolvedGranule) -> Vec<&str> {
    let mut links: Vec<&str> = Vec::new();
    let extras = granule
        .record
        .assets
        .values()
        .filter(|a| matches!(a.role, AssetRole::Browse | AssetRole::Metadata));
    let assets = granule
        .bands
        .iter()
        .map(|b| &b.asset)
        .chain(granule.quality.iter())
        .chain(extras);
    for asset in assets {
        if !links.contains(&asset.href.as_str()) {
            links.push(&asset.href);
        }
    }
    links
}

/// One href per line for every resolved granule.
pub fn write_links(path: &Path, resolution: &Resolution) -> Result<usize> {
    let staged = staging_path(path)?;
    let mut count = 0;
    {
        let mut out = BufWriter::new(fs::File::create(&staged)?);
        for granule in &resolution.granules {
            for href in granule_links(granule) {
                writeln!(out, "{}", href)?;
                count += 1;
            }
        }
        out.flush()?;
    }
    publish(staged, path)?;
    info!("Wrote {} link(s) to {:?}", count, path);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bands::BandSelection;
    use crate::core::filter::{DateRange, Roi, parse_bbox};
    use crate::core::resolve::resolve_all;
    use crate::types::{Band, Product};

    fn filter(cc: u8) -> QueryFilter {
        QueryFilter::new(
            Roi::from_bbox(parse_bbox("-122.5,44.0,-122.0,44.5").unwrap()),
            DateRange::parse("2021-06-01", "2021-06-30").unwrap(),
            vec![Product::S30],
            cc,
            BandSelection::All,
        )
        .unwrap()
    }

    fn record() -> GranuleRecord {
        GranuleRecord::new(
            "HLS.S30.T10TEK.2021166T184921.v2.0",
            Some(12.0),
            vec![
                ("B02".to_string(), "https://data.test/B02.tif".to_string()),
                ("B03".to_string(), "https://data.test/B03.tif".to_string()),
                ("B04".to_string(), "https://data.test/B04.tif".to_string()),
                ("Fmask".to_string(), "https://data.test/Fmask.tif".to_string()),
                ("browse".to_string(), "https://data.test/browse.jpg".to_string()),
                ("metadata".to_string(), "https://data.test/cmr.xml".to_string()),
            ],
        )
        .unwrap()
    }

    #[test]
    fn cache_is_reused_for_the_same_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        save_results(&path, &filter(30), &[record()]).unwrap();

        let loaded = load_results(&path, &filter(30)).unwrap().unwrap();
        assert_eq!(loaded, vec![record()]);
    }

    #[test]
    fn cache_for_another_query_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        save_results(&path, &filter(30), &[record()]).unwrap();
        assert!(load_results(&path, &filter(50)).unwrap().is_none());
    }

    #[test]
    fn corrupt_cache_means_a_fresh_search() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        fs::write(&path, "{\"query\": \"bbox=").unwrap();
        assert!(load_results(&path, &filter(30)).unwrap().is_none());
    }

    #[test]
    fn missing_cache_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_results(&dir.path().join("none.json"), &filter(30)).unwrap().is_none());
    }

    #[test]
    fn links_follow_the_band_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.txt");
        let resolution = resolve_all(&[record()], &BandSelection::List(vec![Band::Red]), true);
        assert_eq!(write_links(&path, &resolution).unwrap(), 4);

        let text = fs::read_to_string(&path).unwrap();
        let mut links: Vec<&str> = text.lines().collect();
        links.sort_unstable();
        assert_eq!(
            links,
            vec![
                "https://data.test/B04.tif",
                "https://data.test/Fmask.tif",
                "https://data.test/browse.jpg",
                "https://data.test/cmr.xml",
            ]
        );
    }

    #[test]
    fn requested_fmask_is_listed_once() {
        let resolution = resolve_all(
            &[record()],
            &BandSelection::List(vec![Band::Red, Band::Fmask]),
            true,
        );
        let links = granule_links(&resolution.granules[0]);
        assert_eq!(links.len(), 4);
        assert_eq!(
            links.iter().filter(|l| l.ends_with("Fmask.tif")).count(),
            1
        );
    }
}
