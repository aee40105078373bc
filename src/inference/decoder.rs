//! Arg-max decoding of the model output into a class label.
//!
//! Ties go to the lowest index: `[3, 5, 5, 2]` decodes to class 1.

use crate::error::ConfigFault;

use super::MAX_CLASSES;

/// Index of the first maximum, or `None` for an empty slice.
pub fn argmax(scores: &[i8]) -> Option<usize> {
    let mut best: Option<(usize, i8)> = None;
    for (i, &s) in scores.iter().enumerate() {
        match best {
            Some((_, top)) if s <= top => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

/// A decoded decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision<'a> {
    pub class: usize,
    pub label: &'a str,
    /// Winning raw score (int8 domain).
    pub score: i8,
}

/// Fixed mapping from class index to label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: &[String]) -> Result<Self, ConfigFault> {
        if labels.is_empty() || labels.len() > MAX_CLASSES {
            return Err(ConfigFault::TableLength {
                table: "labels",
                expected: MAX_CLASSES,
                found: labels.len(),
            });
        }
        Ok(Self {
            labels: labels.to_vec(),
        })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, class: usize) -> Option<&str> {
        self.labels.get(class).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Arg-max `scores` and look up the label.  `None` if `scores` is
    /// empty or longer than the table.
    pub fn decode(&self, scores: &[i8]) -> Option<Decision<'_>> {
        if scores.len() > self.labels.len() {
            return None;
        }
        let class = argmax(scores)?;
        Some(Decision {
            class,
            label: self.label(class)?,
            score: scores[class],
        })
    }
}
