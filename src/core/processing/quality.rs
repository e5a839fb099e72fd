//! Fmask decoding and quality masking.
//!
//! Fmask is an 8-bit bitfield per pixel:
//!
//! | bit | meaning |
//! |-----|---------|
//! | 0   | cirrus (reserved, not used for masking) |
//! | 1   | cloud |
//! | 2   | adjacent to cloud/shadow |
//! | 3   | cloud shadow |
//! | 4   | snow/ice |
//! | 5   | water |
//! | 6-7 | aerosol level: 00 climatology, 01 low, 10 moderate, 11 high |
//!
//! A pixel is usable only when bits 1-5 are clear and the aerosol level is
//! climatology. The decision is precomputed into a 256-entry table.
use ndarray::{Array2, Zip};

use super::scale::is_fill;

/// Fill value of the Fmask layer itself.
pub const FMASK_FILL: u8 = 255;

pub const CLOUD_BIT: u8 = 1;
pub const ADJACENT_BIT: u8 = 2;
pub const SHADOW_BIT: u8 = 3;
pub const SNOW_ICE_BIT: u8 = 4;
pub const WATER_BIT: u8 = 5;

const REJECT_FLAGS: u8 = (1 << CLOUD_BIT)
    | (1 << ADJACENT_BIT)
    | (1 << SHADOW_BIT)
    | (1 << SNOW_ICE_BIT)
    | (1 << WATER_BIT);

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AerosolLevel {
    Climatology,
    Low,
    Moderate,
    High,
}

impl AerosolLevel {
    pub fn from_fmask(value: u8) -> Self {
        match (value >> 6) & 0b11 {
            0 => AerosolLevel::Climatology,
            1 => AerosolLevel::Low,
            2 => AerosolLevel::Moderate,
            _ => AerosolLevel::High,
        }
    }
}

const fn build_usable_table() -> [bool; 256] {
    let mut table = [false; 256];
    let mut v = 0;
    while v < 256 {
        let value = v as u8;
        table[v] = value & REJECT_FLAGS == 0 && (value >> 6) == 0;
        v += 1;
    }
    table
}

static USABLE: [bool; 256] = build_usable_table();

/// Whether a pixel with this Fmask value is kept.
#[inline]
pub fn is_usable(value: u8) -> bool {
    USABLE[value as usize]
}

/// Per-pixel keep mask from an Fmask window read as `f64`. Values outside 0..=255
/// and the Fmask fill are rejected.
pub fn usable_mask(fmask: &Array2<f64>, fmask_fill: Option<f64>) -> Array2<bool> {
    fmask.mapv(|v| {
        if !v.is_finite() || !(0.0..=255.0).contains(&v) {
            return false;
        }
        if fmask_fill.is_some_and(|fill| is_fill(v, fill)) {
            return false;
        }
        is_usable(v as u8)
    })
}

/// Replace pixels that fail `keep` with `fill`. Returns the number of pixels replaced.
/// `data` and `keep` must share a shape.
pub fn apply_mask(data: &mut Array2<f64>, keep: &Array2<bool>, fill: f64) -> usize {
    let mut replaced = 0usize;
    Zip::from(data).and(keep).for_each(|v, &ok| {
        if !ok && !is_fill(*v, fill) {
            *v = fill;
            replaced += 1;
        }
    });
    replaced
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn clear_pixels_are_usable() {
        assert!(is_usable(0));
        // cirrus bit alone does not reject
        assert!(is_usable(0b0000_0001));
    }

    #[test]
    fn each_flag_rejects() {
        for bit in [CLOUD_BIT, ADJACENT_BIT, SHADOW_BIT, SNOW_ICE_BIT, WATER_BIT] {
            assert!(!is_usable(1 << bit), "bit {bit} should reject");
        }
    }

    #[test]
    fn aerosol_above_climatology_rejects() {
        assert_eq!(AerosolLevel::from_fmask(0b0100_0000), AerosolLevel::Low);
        assert_eq!(AerosolLevel::from_fmask(0b1100_0000), AerosolLevel::High);
        assert!(!is_usable(0b0100_0000));
        assert!(!is_usable(0b1000_0000));
        assert!(!is_usable(0b1100_0000));
        assert!(!is_usable(FMASK_FILL));
    }

    #[test]
    fn cloudy_pixel_becomes_fill_regardless_of_value() {
        let fmask = array![[0.0, 2.0], [64.0, 1.0]];
        let keep = usable_mask(&fmask, Some(255.0));
        let mut data = array![[1200.0, 1800.0], [900.0, 400.0]];
        let replaced = apply_mask(&mut data, &keep, -9999.0);
        assert_eq!(replaced, 2);
        assert_eq!(data, array![[1200.0, -9999.0], [-9999.0, 400.0]]);
    }

    #[test]
    fn fmask_fill_is_rejected() {
        let keep = usable_mask(&array![[255.0, 0.0]], Some(255.0));
        assert_eq!(keep, array![[false, true]]);
    }
}
