use std::collections::BTreeMap;

use thiserror::Error;
use tracing::warn;

use crate::fields::SectionField;

/// 既定の重み（経験とスキルを重視）
///
/// Projects are scored and reported but carry no weight.
pub const DEFAULT_WEIGHTS: [(SectionField, f64); 10] = [
    (SectionField::Experience, 0.35),
    (SectionField::Skills, 0.25),
    (SectionField::TechnicalSkills, 0.15),
    (SectionField::Education, 0.10),
    (SectionField::Summary, 0.05),
    (SectionField::ForeignLanguages, 0.03),
    (SectionField::Courses, 0.03),
    (SectionField::Certifications, 0.02),
    (SectionField::PersonalSkills, 0.01),
    (SectionField::References, 0.01),
];

#[derive(Debug, Error, PartialEq)]
pub enum WeightError {
    #[error("weight for {field} must be finite and non-negative, got {value}")]
    Invalid { field: SectionField, value: f64 },
    #[error("weight table must have a positive sum")]
    ZeroSum,
}

/// Immutable field → weight table, normalized to sum 1.0.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    weights: BTreeMap<SectionField, f64>,
}

impl WeightTable {
    pub fn new<I>(entries: I) -> Result<Self, WeightError>
    where
        I: IntoIterator<Item = (SectionField, f64)>,
    {
        let mut weights = BTreeMap::new();
        for (field, value) in entries {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightError::Invalid { field, value });
            }
            weights.insert(field, value);
        }

        let sum: f64 = weights.values().sum();
        if sum <= 0.0 {
            return Err(WeightError::ZeroSum);
        }
        if (sum - 1.0).abs() > 1e-6 {
            warn!(sum, "weight table does not sum to 1.0; normalizing");
            weights.values_mut().for_each(|w| *w /= sum);
        }

        Ok(Self { weights })
    }

    /// 0.0 for fields outside the table.
    pub fn weight(&self, field: SectionField) -> f64 {
        self.weights.get(&field).copied().unwrap_or(0.0)
    }

    pub fn contains(&self, field: SectionField) -> bool {
        self.weights.contains_key(&field)
    }

    pub fn sum(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SectionField, f64)> + '_ {
        self.weights.iter().map(|(f, w)| (*f, *w))
    }

    /// Weighted sum over fields present in both the table and `per_field`,
    /// rounded to 3 decimals.
    pub fn weighted_total(&self, per_field: &BTreeMap<SectionField, f64>) -> f64 {
        let total: f64 = self
            .weights
            .iter()
            .filter_map(|(field, weight)| per_field.get(field).map(|score| score * weight))
            .sum();
        round3(total)
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS.into_iter().collect(),
        }
    }
}

pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
