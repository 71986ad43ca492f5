use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ScoutError, ScoutResult};

/// The eight weighted criteria that make up a product score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Demand,
    Competition,
    ProfitMargin,
    SupplierReliability,
    ShippingHandling,
    ReturnRate,
    Seasonality,
    ProductRestrictions,
}

impl Criterion {
    pub const ALL: [Criterion; 8] = [
        Criterion::Demand,
        Criterion::Competition,
        Criterion::ProfitMargin,
        Criterion::SupplierReliability,
        Criterion::ShippingHandling,
        Criterion::ReturnRate,
        Criterion::Seasonality,
        Criterion::ProductRestrictions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Demand => "demand",
            Criterion::Competition => "competition",
            Criterion::ProfitMargin => "profit_margin",
            Criterion::SupplierReliability => "supplier_reliability",
            Criterion::ShippingHandling => "shipping_handling",
            Criterion::ReturnRate => "return_rate",
            Criterion::Seasonality => "seasonality",
            Criterion::ProductRestrictions => "product_restrictions",
        }
    }

    pub fn parse(name: &str) -> ScoutResult<Self> {
        Criterion::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == name)
            .ok_or_else(|| ScoutError::validation_error(format!("unknown criterion: {name}")))
    }
}

/// Normalized per-criterion scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct CriterionScores {
    pub demand: f64,
    pub competition: f64,
    pub profit_margin: f64,
    pub supplier_reliability: f64,
    pub shipping_handling: f64,
    pub return_rate: f64,
    pub seasonality: f64,
    pub product_restrictions: f64,
}

impl CriterionScores {
    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Demand => self.demand,
            Criterion::Competition => self.competition,
            Criterion::ProfitMargin => self.profit_margin,
            Criterion::SupplierReliability => self.supplier_reliability,
            Criterion::ShippingHandling => self.shipping_handling,
            Criterion::ReturnRate => self.return_rate,
            Criterion::Seasonality => self.seasonality,
            Criterion::ProductRestrictions => self.product_restrictions,
        }
    }

    pub fn entries(&self) -> Vec<(Criterion, f64)> {
        Criterion::ALL.iter().map(|&c| (c, self.get(c))).collect()
    }
}

/// Weight vector for the final score. Criteria without an explicit weight
/// default to `1.0`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScoringWeights {
    weights: HashMap<Criterion, f64>,
}

impl ScoringWeights {
    pub fn new(weights: HashMap<Criterion, f64>) -> Self {
        Self { weights }
    }

    pub fn set(&mut self, criterion: Criterion, weight: f64) {
        self.weights.insert(criterion, weight);
    }

    pub fn weight(&self, criterion: Criterion) -> f64 {
        self.weights.get(&criterion).copied().unwrap_or(1.0)
    }
}

/// Outcome of running the scoring algorithm over one product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub scores: CriterionScores,
    pub final_score: f64,
}

/// Persisted score row. Immutable once written; re-scoring inserts a new
/// record and the latest one wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreRecord {
    pub id: i64,
    pub product_id: i64,
    pub scores: CriterionScores,
    pub final_score: f64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_weight_defaults_to_one() {
        let weights = ScoringWeights::default();
        assert_eq!(weights.weight(Criterion::Demand), 1.0);

        let mut weights = ScoringWeights::default();
        weights.set(Criterion::Demand, 2.5);
        assert_eq!(weights.weight(Criterion::Demand), 2.5);
        assert_eq!(weights.weight(Criterion::Seasonality), 1.0);
    }

    #[test]
    fn test_criterion_round_trip() {
        for criterion in Criterion::ALL {
            assert_eq!(Criterion::parse(criterion.as_str()).unwrap(), criterion);
        }
        assert!(Criterion::parse("popularity").is_err());
    }
}
