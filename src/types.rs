//! Shared types and enums used across HLS SuPER.
//! Includes `Product`, `ProductSelection`, `Band`, `AssetRole` and `OutputFormat`.
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// HLS v2.0 products.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Product {
    /// Sentinel-2 MSI surface reflectance (HLSS30)
    S30,
    /// Landsat 8/9 OLI/TIRS surface reflectance (HLSL30)
    L30,
}

impl Product {
    pub const ALL: [Product; 2] = [Product::S30, Product::L30];

    pub fn short_name(&self) -> &'static str {
        match self {
            Product::S30 => "HLSS30",
            Product::L30 => "HLSL30",
        }
    }

    /// Sensor code used inside granule ids (`HLS.S30.…`).
    pub fn code(&self) -> &'static str {
        match self {
            Product::S30 => "S30",
            Product::L30 => "L30",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_uppercase().as_str() {
            "S30" | "HLSS30" => Some(Product::S30),
            "L30" | "HLSL30" => Some(Product::L30),
            _ => None,
        }
    }
}

impl std::fmt::Display for Product {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

/// Product selection as given on the command line.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug, Serialize, Deserialize)]
pub enum ProductSelection {
    #[value(name = "HLSS30")]
    Hlss30,
    #[value(name = "HLSL30")]
    Hlsl30,
    #[value(name = "both")]
    Both,
}

impl ProductSelection {
    pub fn products(&self) -> Vec<Product> {
        match self {
            ProductSelection::Hlss30 => vec![Product::S30],
            ProductSelection::Hlsl30 => vec![Product::L30],
            ProductSelection::Both => Product::ALL.to_vec(),
        }
    }
}

/// Symbolic band names shared by both products.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Band {
    CoastalAerosol,
    Blue,
    Green,
    Red,
    RedEdge1,
    RedEdge2,
    RedEdge3,
    NirBroad,
    Nir1,
    WaterVapor,
    Cirrus,
    Swir1,
    Swir2,
    Tir1,
    Tir2,
    Fmask,
    Vza,
    Vaa,
    Sza,
    Saa,
}

impl Band {
    pub const ALL: [Band; 20] = [
        Band::CoastalAerosol,
        Band::Blue,
        Band::Green,
        Band::Red,
        Band::RedEdge1,
        Band::RedEdge2,
        Band::RedEdge3,
        Band::NirBroad,
        Band::Nir1,
        Band::WaterVapor,
        Band::Cirrus,
        Band::Swir1,
        Band::Swir2,
        Band::Tir1,
        Band::Tir2,
        Band::Fmask,
        Band::Vza,
        Band::Vaa,
        Band::Sza,
        Band::Saa,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Band::CoastalAerosol => "COASTAL-AEROSOL",
            Band::Blue => "BLUE",
            Band::Green => "GREEN",
            Band::Red => "RED",
            Band::RedEdge1 => "RED-EDGE1",
            Band::RedEdge2 => "RED-EDGE2",
            Band::RedEdge3 => "RED-EDGE3",
            Band::NirBroad => "NIR-BROAD",
            Band::Nir1 => "NIR1",
            Band::WaterVapor => "WATER-VAPOR",
            Band::Cirrus => "CIRRUS",
            Band::Swir1 => "SWIR1",
            Band::Swir2 => "SWIR2",
            Band::Tir1 => "TIR1",
            Band::Tir2 => "TIR2",
            Band::Fmask => "FMASK",
            Band::Vza => "VZA",
            Band::Vaa => "VAA",
            Band::Sza => "SZA",
            Band::Saa => "SAA",
        }
    }

    /// Variable name used inside aggregate (NetCDF) outputs.
    pub fn variable_name(&self) -> String {
        self.symbol().replace('-', "_")
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl FromStr for Band {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Band::ALL
            .iter()
            .copied()
            .find(|b| b.symbol() == wanted)
            .ok_or_else(|| format!("unknown band `{}`", s.trim()))
    }
}

/// Role of an asset attached to a granule record.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum AssetRole {
    Band,
    QualityMask,
    Metadata,
    Browse,
}

impl AssetRole {
    /// Classify a STAC asset key.
    pub fn from_asset_key(key: &str) -> Self {
        match key {
            "Fmask" => AssetRole::QualityMask,
            "metadata" => AssetRole::Metadata,
            "browse" => AssetRole::Browse,
            _ => AssetRole::Band,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    /// One Cloud-Optimized GeoTIFF per granule and band
    #[value(name = "COG")]
    Cog,
    /// One NetCDF-4 time series per tile
    #[value(name = "NC4")]
    Nc4,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Cog => "tif",
            OutputFormat::Nc4 => "nc4",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Cog => write!(f, "COG"),
            OutputFormat::Nc4 => write!(f, "NC4"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_symbols_parse_case_insensitively() {
        assert_eq!("nir1".parse::<Band>().unwrap(), Band::Nir1);
        assert_eq!(" Red-Edge2 ".parse::<Band>().unwrap(), Band::RedEdge2);
        assert!("NIR2".parse::<Band>().is_err());
    }

    #[test]
    fn every_band_symbol_round_trips() {
        for band in Band::ALL {
            assert_eq!(band.symbol().parse::<Band>().unwrap(), band);
        }
    }

    #[test]
    fn asset_keys_map_to_roles() {
        assert_eq!(AssetRole::from_asset_key("Fmask"), AssetRole::QualityMask);
        assert_eq!(AssetRole::from_asset_key("browse"), AssetRole::Browse);
        assert_eq!(AssetRole::from_asset_key("metadata"), AssetRole::Metadata);
        assert_eq!(AssetRole::from_asset_key("B8A"), AssetRole::Band);
    }

    #[test]
    fn product_codes() {
        assert_eq!(Product::from_code("s30"), Some(Product::S30));
        assert_eq!(Product::from_code("HLSL30"), Some(Product::L30));
        assert_eq!(Product::from_code("X30"), None);
        assert_eq!(ProductSelection::Both.products().len(), 2);
    }
}
