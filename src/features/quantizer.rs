//! Affine int8 quantization: `q = round(x / scale + zero_point)`.
//!
//! Rounding is half-away-from-zero (`f32::round`), the same convention the
//! model's converter used for its representative dataset.  Values outside
//! the int8 range saturate at -128 / 127 rather than wrapping; NaN maps to
//! the zero-point (real 0.0).

use serde::{Deserialize, Serialize};

use super::{FEATURE_COUNT, FeatureVector};
use crate::error::ConfigFault;

pub const QMIN: i32 = i8::MIN as i32;
pub const QMAX: i32 = i8::MAX as i32;

pub type QuantizedVector = [i8; FEATURE_COUNT];

/// Input tensor quantization parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantParams {
    pub scale: f32,
    pub zero_point: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quantizer {
    params: QuantParams,
}

impl Quantizer {
    pub fn new(params: QuantParams) -> Result<Self, ConfigFault> {
        if !(params.scale.is_finite() && params.scale > 0.0) {
            return Err(ConfigFault::Quantization);
        }
        if !(QMIN..=QMAX).contains(&params.zero_point) {
            return Err(ConfigFault::Quantization);
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> QuantParams {
        self.params
    }

    pub fn quantize_value(&self, x: f32) -> i8 {
        if x.is_nan() {
            return self.params.zero_point as i8;
        }
        let q = (x / self.params.scale + self.params.zero_point as f32).round();
        q.clamp(QMIN as f32, QMAX as f32) as i8
    }

    pub fn dequantize_value(&self, q: i8) -> f32 {
        (i32::from(q) - self.params.zero_point) as f32 * self.params.scale
    }

    pub fn quantize(&self, normalized: &FeatureVector) -> QuantizedVector {
        core::array::from_fn(|i| self.quantize_value(normalized[i]))
    }

    pub fn dequantize(&self, q: &QuantizedVector) -> FeatureVector {
        core::array::from_fn(|i| self.dequantize_value(q[i]))
    }
}
