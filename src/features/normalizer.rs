//! Per-feature standardization: `(x - mean) / scale`.

use super::{FEATURE_COUNT, FeatureVector};
use crate::error::ConfigFault;
use crate::tables::NormalizationEntry;

/// Validated (mean, scale) pairs, one per feature position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalizer {
    mean: [f32; FEATURE_COUNT],
    scale: [f32; FEATURE_COUNT],
}

impl Normalizer {
    /// Build from the deployment table.  A zero or non-finite scale is a
    /// fatal configuration error, so `normalize` never divides by zero.
    pub fn new(entries: &[NormalizationEntry]) -> Result<Self, ConfigFault> {
        if entries.len() != FEATURE_COUNT {
            return Err(ConfigFault::TableLength {
                table: "normalization",
                expected: FEATURE_COUNT,
                found: entries.len(),
            });
        }

        let mut mean = [0.0; FEATURE_COUNT];
        let mut scale = [1.0; FEATURE_COUNT];
        for (i, e) in entries.iter().enumerate() {
            if !e.mean.is_finite() {
                return Err(ConfigFault::Field("normalization mean must be finite"));
            }
            if e.scale == 0.0 || !e.scale.is_finite() {
                return Err(ConfigFault::ZeroScale(i));
            }
            mean[i] = e.mean;
            scale[i] = e.scale;
        }
        Ok(Self { mean, scale })
    }

    pub fn normalize(&self, raw: &FeatureVector) -> FeatureVector {
        core::array::from_fn(|i| (raw[i] - self.mean[i]) / self.scale[i])
    }

    /// Inverse mapping `x * scale + mean`.
    pub fn denormalize(&self, normalized: &FeatureVector) -> FeatureVector {
        core::array::from_fn(|i| normalized[i] * self.scale[i] + self.mean[i])
    }
}
