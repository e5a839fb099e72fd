//! Per-product band tables: symbolic band name -> STAC asset key (HLS v2.0).
use crate::types::{Band, Product};

const S30_BANDS: &[(Band, &str)] = &[
    (Band::CoastalAerosol, "B01"),
    (Band::Blue, "B02"),
    (Band::Green, "B03"),
    (Band::Red, "B04"),
    (Band::RedEdge1, "B05"),
    (Band::RedEdge2, "B06"),
    (Band::RedEdge3, "B07"),
    (Band::NirBroad, "B08"),
    (Band::Nir1, "B8A"),
    (Band::WaterVapor, "B09"),
    (Band::Cirrus, "B10"),
    (Band::Swir1, "B11"),
    (Band::Swir2, "B12"),
    (Band::Fmask, "Fmask"),
    (Band::Vza, "VZA"),
    (Band::Vaa, "VAA"),
    (Band::Sza, "SZA"),
    (Band::Saa, "SAA"),
];

const L30_BANDS: &[(Band, &str)] = &[
    (Band::CoastalAerosol, "B01"),
    (Band::Blue, "B02"),
    (Band::Green, "B03"),
    (Band::Red, "B04"),
    (Band::Nir1, "B05"),
    (Band::Swir1, "B06"),
    (Band::Swir2, "B07"),
    (Band::Cirrus, "B09"),
    (Band::Tir1, "B10"),
    (Band::Tir2, "B11"),
    (Band::Fmask, "Fmask"),
    (Band::Vza, "VZA"),
    (Band::Vaa, "VAA"),
    (Band::Sza, "SZA"),
    (Band::Saa, "SAA"),
];

pub const FMASK_KEY: &str = "Fmask";

pub fn band_table(product: Product) -> &'static [(Band, &'static str)] {
    match product {
        Product::S30 => S30_BANDS,
        Product::L30 => L30_BANDS,
    }
}

/// Asset key for a band within a product, `None` when the product lacks the band.
pub fn asset_key(product: Product, band: Band) -> Option<&'static str> {
    band_table(product)
        .iter()
        .find(|(b, _)| *b == band)
        .map(|(_, key)| *key)
}

/// True when at least one product carries the band.
pub fn is_known_band(band: Band) -> bool {
    Product::ALL
        .iter()
        .any(|p| asset_key(*p, band).is_some())
}

/// Band selection: explicit list or every band of the record's product.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BandSelection {
    All,
    List(Vec<Band>),
}

impl BandSelection {
    /// Bands to request for a given product, in request order.
    pub fn bands_for(&self, product: Product) -> Vec<Band> {
        match self {
            BandSelection::All => band_table(product).iter().map(|(b, _)| *b).collect(),
            BandSelection::List(bands) => bands.clone(),
        }
    }

    pub fn contains(&self, band: Band) -> bool {
        match self {
            BandSelection::All => true,
            BandSelection::List(bands) => bands.contains(&band),
        }
    }
}

impl std::fmt::Display for BandSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BandSelection::All => write!(f, "ALL"),
            BandSelection::List(bands) => {
                let names: Vec<&str> = bands.iter().map(|b| b.symbol()).collect();
                write!(f, "{}", names.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nir_differs_between_products() {
        assert_eq!(asset_key(Product::S30, Band::Nir1), Some("B8A"));
        assert_eq!(asset_key(Product::L30, Band::Nir1), Some("B05"));
    }

    #[test]
    fn product_specific_bands() {
        assert_eq!(asset_key(Product::L30, Band::RedEdge1), None);
        assert_eq!(asset_key(Product::S30, Band::Tir1), None);
        assert!(is_known_band(Band::Tir1));
        assert!(is_known_band(Band::RedEdge3));
    }

    #[test]
    fn all_expands_per_product() {
        assert_eq!(BandSelection::All.bands_for(Product::S30).len(), 18);
        assert_eq!(BandSelection::All.bands_for(Product::L30).len(), 15);
    }
}
