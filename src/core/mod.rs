//! Core building blocks: the filter builder, band tables, granule records,
//! asset resolution and the raster processing primitives. These are consumed
//! by the high-level `api` module.
pub mod bands;
pub mod config;
pub mod filter;
pub mod granule;
pub mod params;
pub mod processing;
pub mod resolve;
