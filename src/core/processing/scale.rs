//! Physical-unit scaling: `value * scale + offset`, leaving fill pixels untouched.
use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    pub scale: f64,
    pub offset: f64,
}

impl Default for ScaleParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }
}

impl ScaleParams {
    pub fn is_identity(&self) -> bool {
        self.scale == 1.0 && self.offset == 0.0
    }
}

/// Fill comparison that treats a NaN fill as matching NaN pixels.
#[inline]
pub fn is_fill(value: f64, fill: f64) -> bool {
    if fill.is_nan() {
        value.is_nan()
    } else {
        value == fill
    }
}

pub fn apply_scale(data: &mut Array2<f64>, params: ScaleParams, fill: Option<f64>) {
    if params.is_identity() {
        return;
    }
    data.mapv_inplace(|v| match fill {
        Some(f) if is_fill(v, f) => v,
        _ => v * params.scale + params.offset,
    });
}
