//! Deployment tables: vocabularies, normalization, quantization, labels.
//!
//! Produced offline by the training toolchain and loaded once at startup.
//! Swapping the JSON document re-targets the firmware to a retrained model
//! without touching pipeline code.  The document is only parsed here; each
//! consumer ([`FeaturePipeline`](crate::features::FeaturePipeline),
//! [`LabelTable`](crate::inference::decoder::LabelTable)) validates the
//! part it owns and reports a [`ConfigFault`].

use serde::{Deserialize, Serialize};

use crate::error::ConfigFault;
use crate::features::quantizer::QuantParams;

/// Tables compiled into the firmware image.
const BUILTIN_TABLES_JSON: &str = include_str!("../assets/clinic_tables.json");

/// One categorical feature's closed vocabulary, in code order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyTable {
    pub feature: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizationEntry {
    pub mean: f32,
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentTables {
    /// Model schema version these tables were exported alongside.
    pub schema_version: u32,
    pub vocabularies: Vec<VocabularyTable>,
    pub normalization: Vec<NormalizationEntry>,
    pub quantization: QuantParams,
    /// Class labels indexed by model output position.
    pub labels: Vec<String>,
}

impl DeploymentTables {
    pub fn from_json(json: &str) -> Result<Self, ConfigFault> {
        serde_json::from_str(json).map_err(|e| {
            log::error!("deployment tables: {}", e);
            ConfigFault::Field("deployment tables are not valid JSON")
        })
    }

    pub fn builtin() -> Result<Self, ConfigFault> {
        Self::from_json(BUILTIN_TABLES_JSON)
    }
}
