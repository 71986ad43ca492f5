use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ScoutError, ScoutResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    /// Natural key; upserts deduplicate on it.
    pub name: String,
    pub search_volume: i64,
    pub sales_rank: i64,
    pub competitor_count: i64,
    pub shipping_cost: f64,
    pub return_rate: f64,
    pub seasonality_variation: f64,
    pub has_restrictions: bool,
    pub selling_price: f64,
    pub product_cost: f64,
    pub fees: f64,
    pub supplier_rating: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Extracted product fields, as written by the scrape stage before they get
/// an id. Numeric fields already coerced; absent values default to zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProductData {
    pub name: String,
    pub search_volume: i64,
    pub sales_rank: i64,
    pub competitor_count: i64,
    pub shipping_cost: f64,
    pub return_rate: f64,
    pub seasonality_variation: f64,
    pub has_restrictions: bool,
    pub selling_price: f64,
    pub product_cost: f64,
    pub fees: f64,
    pub supplier_rating: f64,
}

impl ProductData {
    /// Data-quality gate for scraped records: a stable name is required,
    /// ratio fields must stay in `[0, 1]`, money fields must not be negative.
    pub fn validate(&self) -> ScoutResult<()> {
        if self.name.trim().is_empty() {
            return Err(ScoutError::validation_error("product name is required"));
        }
        if !(0.0..=1.0).contains(&self.return_rate) {
            return Err(ScoutError::validation_error(format!(
                "return_rate {} outside [0, 1]",
                self.return_rate
            )));
        }
        if !(0.0..=1.0).contains(&self.seasonality_variation) {
            return Err(ScoutError::validation_error(format!(
                "seasonality_variation {} outside [0, 1]",
                self.seasonality_variation
            )));
        }
        for (field, value) in [
            ("shipping_cost", self.shipping_cost),
            ("selling_price", self.selling_price),
            ("product_cost", self.product_cost),
            ("fees", self.fees),
        ] {
            if value < 0.0 {
                return Err(ScoutError::validation_error(format!(
                    "{field} must not be negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Dataset-wide maxima used to normalize criterion scores. Derived on demand
/// from the product store, never persisted.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DatasetStats {
    pub max_search_volume: f64,
    pub max_sales_rank: f64,
    pub max_competitor_count: f64,
    pub max_shipping_cost: f64,
    pub max_return_rate: f64,
    pub max_seasonality_variation: f64,
}
