//! Categorical encoder.
//!
//! Each categorical input has its own closed vocabulary, fixed per
//! deployment.  The code of a value is its position in that table; the
//! table order is whatever the model was trained with and carries no
//! meaning beyond being stable.  A value outside the table encodes to
//! [`CategoryCode::Unknown`], which flows through the rest of the pipeline
//! as the reproducible feature value [`UNKNOWN_FEATURE_VALUE`].

use crate::error::ConfigFault;
use crate::tables::VocabularyTable;

/// Feature value an unknown category contributes before normalization.
pub const UNKNOWN_FEATURE_VALUE: f32 = -1.0;

/// Categorical inputs, in canonical feature order (positions 4–8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoricalFeature {
    DailyPatients,
    Criticality,
    WeatherCondition,
    GridStatus,
    TimeOfDay,
}

impl CategoricalFeature {
    pub const ALL: [Self; 5] = [
        Self::DailyPatients,
        Self::Criticality,
        Self::WeatherCondition,
        Self::GridStatus,
        Self::TimeOfDay,
    ];

    /// Name used to key the vocabulary in the deployment tables.
    pub const fn name(self) -> &'static str {
        match self {
            Self::DailyPatients => "DailyPatients",
            Self::Criticality => "Criticality",
            Self::WeatherCondition => "WeatherCondition",
            Self::GridStatus => "GridStatus",
            Self::TimeOfDay => "TimeOfDay",
        }
    }

    const fn slot(self) -> usize {
        self as usize
    }
}

/// Encoded category: a table index, or the unknown sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryCode {
    Known(u8),
    Unknown,
}

impl CategoryCode {
    /// Numeric value as it enters the raw feature vector.
    pub fn as_feature(self) -> f32 {
        match self {
            Self::Known(code) => f32::from(code),
            Self::Unknown => UNKNOWN_FEATURE_VALUE,
        }
    }

    pub fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// Validated vocabularies for every categorical feature.
#[derive(Debug, Clone)]
pub struct CategoricalEncoder {
    vocabularies: [Vec<String>; 5],
}

impl CategoricalEncoder {
    /// Build the encoder from deployment tables.
    ///
    /// Every [`CategoricalFeature`] must have exactly one non-empty,
    /// duplicate-free vocabulary; extra tables for unknown features are
    /// rejected so a typo in a feature name cannot go unnoticed.
    pub fn from_tables(tables: &[VocabularyTable]) -> Result<Self, ConfigFault> {
        let mut vocabularies: [Option<Vec<String>>; 5] = Default::default();

        for table in tables {
            let feature = CategoricalFeature::ALL
                .into_iter()
                .find(|f| f.name() == table.feature)
                .ok_or(ConfigFault::Vocabulary("unknown feature name"))?;
            let slot = &mut vocabularies[feature.slot()];
            if slot.is_some() {
                return Err(ConfigFault::Vocabulary(feature.name()));
            }
            validate_values(feature, &table.values)?;
            *slot = Some(table.values.clone());
        }

        let mut out: [Vec<String>; 5] = Default::default();
        for feature in CategoricalFeature::ALL {
            out[feature.slot()] = vocabularies[feature.slot()]
                .take()
                .ok_or(ConfigFault::Vocabulary(feature.name()))?;
        }
        Ok(Self { vocabularies: out })
    }

    /// Encode `value` for `feature`.  Never fails.
    pub fn encode(&self, feature: CategoricalFeature, value: &str) -> CategoryCode {
        self.vocabularies[feature.slot()]
            .iter()
            .position(|known| known == value)
            .map_or(CategoryCode::Unknown, |i| CategoryCode::Known(i as u8))
    }

    /// Known values of `feature`, in code order.
    pub fn vocabulary(&self, feature: CategoricalFeature) -> &[String] {
        &self.vocabularies[feature.slot()]
    }
}

fn validate_values(feature: CategoricalFeature, values: &[String]) -> Result<(), ConfigFault> {
    if values.is_empty() || values.len() > usize::from(u8::MAX) {
        return Err(ConfigFault::Vocabulary(feature.name()));
    }
    for (i, v) in values.iter().enumerate() {
        if values[..i].contains(v) {
            return Err(ConfigFault::Vocabulary(feature.name()));
        }
    }
    Ok(())
}
