#![doc = r#"
HLS SuPER: search, subset, process and reformat Harmonized Landsat Sentinel-2 imagery.

This crate turns an area of interest and a date range into analysis-ready subsets of
HLS v2.0 (HLSS30 / HLSL30) granules. It queries the CMR-STAC catalog, maps symbolic
band names (`RED`, `NIR1`, `FMASK`, ...) to the per-product assets, reads only the ROI
window of each cloud-optimized GeoTIFF through GDAL, optionally masks poor-quality
pixels with the Fmask layer and applies the scale factor, and writes either one COG
per granule and band or one NetCDF-4 time series per tile. It powers the `hls-super`
CLI and can be embedded in your own Rust applications.

Requirements
------------
- GDAL development headers and runtime (with the netCDF driver for NC4 output).
- Earthdata Login credentials (`~/.netrc`) for the LP DAAC cloud assets.
- Rust 2024 edition toolchain.

Search, resolve and process
---------------------------
```rust,no_run
use std::path::Path;
use hls_super::api;
use hls_super::core::config::RunConfig;
use hls_super::core::filter::{parse_bands, DateRange, QueryFilter, Roi};
use hls_super::{OutputFormat, ProcessingParams, Product};

fn main() -> hls_super::Result<()> {
    let filter = QueryFilter::new(
        Roi::parse("-122.8,44.0,-122.3,44.4")?,
        DateRange::parse("2021-06-01", "2021-08-31")?,
        vec![Product::S30, Product::L30],
        30,
        parse_bands("RED,NIR1,FMASK")?,
    )?;
    let params = ProcessingParams {
        format: OutputFormat::Cog,
        quality_filter: true,
        scale: false,
    };
    let config = RunConfig::default();
    hls_super::io::gdal::configure_gdal_http(&config.gdal)?;

    let out = Path::new("/out/hls");
    let records = api::search_or_load(&filter, &config.catalog, out, false)?;
    let resolution = api::resolve(&records, &filter, &params);
    let report = api::process(&resolution, &filter, &params, out)?;

    println!("processed={} skipped={} errors={}", report.processed, report.skipped, report.errors);
    Ok(())
}
```

Error handling
--------------
All public functions return `hls_super::Result<T>`. Argument errors (`InvalidRoi`,
`InvalidDateRange`, `InvalidParameter`) are raised before any network access and
`CatalogUnavailable` ends the run; `UnknownBand` and `AssetUnavailable` only affect a
single record or asset and are reported as skips in the `BatchReport`.

```rust,no_run
use hls_super::core::filter::Roi;
use hls_super::Error;

match Roi::parse("-120,48,-118") {
    Ok(roi) => println!("{:?}", roi.bbox),
    Err(Error::InvalidRoi { input, reason }) => eprintln!("bad ROI {input}: {reason}"),
    Err(other) => eprintln!("{other}"),
}
```

Useful modules
--------------
- [`api`]: high-level entry points (search with cache, resolve, process).
- [`core`]: query filter, band tables, granule records, the asset resolver and the
  clip / quality / scale pipeline.
- [`io`]: catalog client, GDAL readers, results cache and COG/NetCDF writers.
- [`types`]: shared enums (`Product`, `Band`, `OutputFormat`, ...).
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod api;
pub mod core;
pub mod error;
pub mod io;
pub mod types;

// Curated public API surface
// Types
pub use core::filter::{BoundingBox, DateRange, QueryFilter, Roi};
pub use core::granule::{AssetRef, GranuleRecord};
pub use core::params::ProcessingParams;
pub use error::{Error, Result};
pub use types::{AssetRole, Band, OutputFormat, Product, ProductSelection};

// Catalog and readers
pub use io::catalog::{CatalogClient, CatalogConfig};
pub use io::gdal::{GdalError, HlsRasterReader};

// High-level API re-exports
pub use api::{BatchReport, Skip, export_links, process, resolve, search, search_or_load};
