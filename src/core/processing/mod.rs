//! Raster processing: clipping windows, quality masking, scaling, the
//! per-granule pipeline and output naming/saving.
pub mod clip;
pub mod pipeline;
pub mod quality;
pub mod save;
pub mod scale;
