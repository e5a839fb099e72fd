use serde::{Deserialize, Serialize};

use crate::types::OutputFormat;

/// Processing parameters suitable for config files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingParams {
    pub format: OutputFormat,
    /// Replace pixels flagged by Fmask with the band fill value
    pub quality_filter: bool,
    /// Convert stored integers to physical units (`value * scale + offset`)
    pub scale: bool,
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self {
            format: OutputFormat::Cog,
            quality_filter: true,
            scale: false,
        }
    }
}
