use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use scout_domain::{ProductData, ScoutError, ScoutResult};

/// CSS selectors for the product-page fields. One fixed set across sources,
/// overridable from config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExtractionRules {
    pub name: String,
    pub search_volume: String,
    pub sales_rank: String,
    pub competitor_count: String,
    pub shipping_cost: String,
    pub return_rate: String,
    pub seasonality_variation: String,
    pub restrictions: String,
    pub selling_price: String,
    pub product_cost: String,
    pub fees: String,
    pub supplier_rating: String,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            name: "h1.product-title".to_string(),
            search_volume: "#searchVolume".to_string(),
            sales_rank: "#salesRank".to_string(),
            competitor_count: "#competitorCount".to_string(),
            shipping_cost: "#shippingCost".to_string(),
            return_rate: "#returnRate".to_string(),
            seasonality_variation: "#seasonalityVariation".to_string(),
            restrictions: "#restrictions".to_string(),
            selling_price: "#sellingPrice".to_string(),
            product_cost: "#productCost".to_string(),
            fees: "#fees".to_string(),
            supplier_rating: "#supplierRating".to_string(),
        }
    }
}

fn select_text(document: &Html, selector: &str) -> ScoutResult<String> {
    let selector = Selector::parse(selector)
        .map_err(|e| ScoutError::config_error(format!("invalid selector {selector}: {e}")))?;
    Ok(document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default())
}

/// Keep digits only; unparsable text coerces to 0.
fn coerce_int(text: &str) -> i64 {
    let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

/// Keep digits and the decimal point; unparsable text coerces to 0.
fn coerce_float(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().unwrap_or(0.0)
}

/// Extract and validate a product record from a listing page.
///
/// Extraction failure is a data-quality event: the caller logs the
/// `Validation` error and completes without a product.
pub fn extract_product(html: &str, rules: &ExtractionRules) -> ScoutResult<ProductData> {
    let document = Html::parse_document(html);

    let restrictions_marker = select_text(&document, &rules.restrictions)?;
    let data = ProductData {
        name: select_text(&document, &rules.name)?,
        search_volume: coerce_int(&select_text(&document, &rules.search_volume)?),
        sales_rank: coerce_int(&select_text(&document, &rules.sales_rank)?),
        competitor_count: coerce_int(&select_text(&document, &rules.competitor_count)?),
        shipping_cost: coerce_float(&select_text(&document, &rules.shipping_cost)?),
        return_rate: coerce_float(&select_text(&document, &rules.return_rate)?),
        seasonality_variation: coerce_float(&select_text(&document, &rules.seasonality_variation)?),
        // Only an explicit "none" marker clears the flag.
        has_restrictions: !restrictions_marker.eq_ignore_ascii_case("none"),
        selling_price: coerce_float(&select_text(&document, &rules.selling_price)?),
        product_cost: coerce_float(&select_text(&document, &rules.product_cost)?),
        fees: coerce_float(&select_text(&document, &rules.fees)?),
        supplier_rating: coerce_float(&select_text(&document, &rules.supplier_rating)?),
    };
    data.validate()?;
    Ok(data)
}
