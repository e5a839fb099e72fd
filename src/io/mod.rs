//! I/O layer: the CMR-STAC `catalog` client, GDAL-backed raster and vector
//! readers (`gdal`, `roi`), the search `results` cache and the output `writers`.
pub mod catalog;
pub use catalog::{CatalogClient, CatalogConfig, CatalogTransport, HttpTransport, TransportError};

pub mod gdal;
pub use gdal::{GdalError, GdalHttpConfig, HlsRasterReader, RasterMetadata, SampleType};

pub mod results;
pub mod roi;
pub mod writers;
