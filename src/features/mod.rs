//! Feature preparation: pure, stateless, no hardware dependency.
//!
//! ```text
//!  PowerInputs ──▶ encode ──▶ assemble ──▶ normalize ──▶ quantize ──▶ [i8; 9]
//! ```
//!
//! Canonical feature order (must match the normalization table and the
//! model's input tensor):
//!
//! | idx | feature          | kind        |
//! |-----|------------------|-------------|
//! | 0   | BatteryLevel (%) | continuous  |
//! | 1   | Temperature (°C) | continuous  |
//! | 2   | Voltage (V)      | continuous  |
//! | 3   | Current (A)      | continuous  |
//! | 4   | DailyPatients    | categorical |
//! | 5   | Criticality      | categorical |
//! | 6   | WeatherCondition | categorical |
//! | 7   | GridStatus       | categorical |
//! | 8   | TimeOfDay        | categorical |

pub mod encoder;
pub mod normalizer;
pub mod quantizer;

use crate::error::ConfigFault;
use crate::tables::DeploymentTables;

use encoder::{CategoricalEncoder, CategoricalFeature, CategoryCode};
use normalizer::Normalizer;
use quantizer::{QuantizedVector, Quantizer};

/// Length of the model input vector.
pub const FEATURE_COUNT: usize = 9;

/// Positional real-valued feature vector.
pub type FeatureVector = [f32; FEATURE_COUNT];

/// One iteration's raw inputs: four sensor readings plus five categories.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerInputs<'a> {
    pub battery_level: f32,
    pub temperature_c: f32,
    pub voltage_v: f32,
    pub current_a: f32,
    pub daily_patients: &'a str,
    pub criticality: &'a str,
    pub weather: &'a str,
    pub grid_status: &'a str,
    pub time_of_day: &'a str,
}

impl PowerInputs<'_> {
    fn category(&self, feature: CategoricalFeature) -> &str {
        match feature {
            CategoricalFeature::DailyPatients => self.daily_patients,
            CategoricalFeature::Criticality => self.criticality,
            CategoricalFeature::WeatherCondition => self.weather,
            CategoricalFeature::GridStatus => self.grid_status,
            CategoricalFeature::TimeOfDay => self.time_of_day,
        }
    }
}

/// Every intermediate stage of one preparation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreparedFeatures {
    pub codes: [CategoryCode; 5],
    pub raw: FeatureVector,
    pub normalized: FeatureVector,
    pub quantized: QuantizedVector,
}

/// Encoder, normalizer and quantizer built once from the deployment tables.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    encoder: CategoricalEncoder,
    normalizer: Normalizer,
    quantizer: Quantizer,
}

impl FeaturePipeline {
    pub fn from_tables(tables: &DeploymentTables) -> Result<Self, ConfigFault> {
        Ok(Self {
            encoder: CategoricalEncoder::from_tables(&tables.vocabularies)?,
            normalizer: Normalizer::new(&tables.normalization)?,
            quantizer: Quantizer::new(tables.quantization)?,
        })
    }

    pub fn encoder(&self) -> &CategoricalEncoder {
        &self.encoder
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    /// Encode the categories and lay everything out in canonical order.
    pub fn assemble(&self, inputs: &PowerInputs<'_>) -> ([CategoryCode; 5], FeatureVector) {
        let codes = CategoricalFeature::ALL.map(|f| self.encoder.encode(f, inputs.category(f)));
        let raw = [
            inputs.battery_level,
            inputs.temperature_c,
            inputs.voltage_v,
            inputs.current_a,
            codes[0].as_feature(),
            codes[1].as_feature(),
            codes[2].as_feature(),
            codes[3].as_feature(),
            codes[4].as_feature(),
        ];
        (codes, raw)
    }

    pub fn prepare(&self, inputs: &PowerInputs<'_>) -> PreparedFeatures {
        let (codes, raw) = self.assemble(inputs);
        let normalized = self.normalizer.normalize(&raw);
        let quantized = self.quantizer.quantize(&normalized);
        PreparedFeatures {
            codes,
            raw,
            normalized,
            quantized,
        }
    }
}
