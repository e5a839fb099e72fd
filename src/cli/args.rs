use clap::Parser;
use std::path::PathBuf;

use hls_super::core::filter::DEFAULT_START_DATE;
use hls_super::types::{OutputFormat, ProductSelection};

/// `true`/`false` (also `yes`/`no`, `1`/`0`), case-insensitive.
fn parse_switch(s: &str) -> Result<bool, String> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(format!("expected true or false, got `{}`", other)),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "hls-super",
    version,
    about = "Search, subset, quality-filter and reformat HLS v2.0 imagery"
)]
pub struct CliArgs {
    /// Region of interest: `min_lon,min_lat,max_lon,max_lat` in WGS84, or a
    /// vector file (GeoJSON, Shapefile, GeoPackage)
    #[arg(long)]
    pub roi: String,

    /// Output directory (created if missing)
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// First acquisition date, `YYYY-MM-DD`
    #[arg(long, default_value = DEFAULT_START_DATE)]
    pub start: String,

    /// Last acquisition date, inclusive (defaults to today)
    #[arg(long)]
    pub end: Option<String>,

    /// Products to search
    #[arg(long, value_enum, default_value_t = ProductSelection::Both)]
    pub prod: ProductSelection,

    /// Comma-separated band symbols (e.g. `RED,NIR1,FMASK`) or `ALL`
    #[arg(long, default_value = "ALL")]
    pub bands: String,

    /// Maximum scene cloud cover in percent (0-100)
    #[arg(long, default_value = "100")]
    pub cc: String,

    /// Mask pixels flagged by the Fmask quality layer
    #[arg(long, value_parser = parse_switch, default_value = "true")]
    pub qf: bool,

    /// Apply each band's scale factor and offset
    #[arg(long, value_parser = parse_switch, default_value = "false")]
    pub scale: bool,

    /// Output format
    #[arg(long = "of", value_enum, default_value_t = OutputFormat::Cog)]
    pub format: OutputFormat,

    /// Process without stopping after the search report
    #[arg(short = 'y', long, default_value_t = false)]
    pub yes: bool,

    /// Ignore cached search results in the output directory
    #[arg(long, default_value_t = false)]
    pub fresh_search: bool,

    /// JSON run configuration (catalog endpoint, retries, GDAL HTTP options)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Also write the log to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}
