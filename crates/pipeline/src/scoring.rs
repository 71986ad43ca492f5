//! Product scoring: eight normalized criteria combined into a weighted mean.
//!
//! Every function here is a pure function of its arguments; the score stage
//! supplies the product, the dataset maxima and the weight vector.

use scout_domain::{Criterion, CriterionScores, DatasetStats, Product, ScoreBreakdown, ScoringWeights};

const MAX_SUPPLIER_RATING: f64 = 5.0;

fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

/// Demand: average of normalized search volume and inverted sales rank.
/// A zero dataset maximum contributes 0 for that term.
pub fn demand_score(
    search_volume: f64,
    sales_rank: f64,
    max_search_volume: f64,
    max_sales_rank: f64,
) -> f64 {
    let normalized_volume = ratio(search_volume, max_search_volume);
    let normalized_rank = if max_sales_rank > 0.0 {
        1.0 - sales_rank / max_sales_rank
    } else {
        0.0
    };
    (normalized_volume + normalized_rank) / 2.0
}

pub fn competition_score(competitor_count: f64, max_competitor_count: f64) -> f64 {
    if max_competitor_count > 0.0 {
        1.0 - competitor_count / max_competitor_count
    } else {
        0.0
    }
}

pub fn profit_margin_score(selling_price: f64, product_cost: f64, fees: f64) -> f64 {
    if selling_price > 0.0 {
        (selling_price - product_cost - fees) / selling_price
    } else {
        0.0
    }
}

pub fn supplier_reliability_score(supplier_rating: f64) -> f64 {
    supplier_rating / MAX_SUPPLIER_RATING
}

pub fn shipping_handling_score(shipping_cost: f64, max_shipping_cost: f64) -> f64 {
    if max_shipping_cost > 0.0 {
        1.0 - shipping_cost / max_shipping_cost
    } else {
        0.0
    }
}

pub fn return_rate_score(return_rate: f64, max_return_rate: f64) -> f64 {
    if max_return_rate > 0.0 {
        1.0 - return_rate / max_return_rate
    } else {
        0.0
    }
}

pub fn seasonality_score(seasonality_variation: f64, max_seasonality_variation: f64) -> f64 {
    if max_seasonality_variation > 0.0 {
        1.0 - seasonality_variation / max_seasonality_variation
    } else {
        0.0
    }
}

pub fn product_restrictions_score(has_restrictions: bool) -> f64 {
    if has_restrictions {
        0.0
    } else {
        1.0
    }
}

/// Weighted mean over the given score entries. Criteria missing from the
/// weight vector count with weight 1; a zero total weight yields 0.
pub fn weighted_final_score(entries: &[(Criterion, f64)], weights: &ScoringWeights) -> f64 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for &(criterion, score) in entries {
        let weight = weights.weight(criterion);
        weighted_sum += score * weight;
        total_weight += weight;
    }
    if total_weight > 0.0 {
        weighted_sum / total_weight
    } else {
        0.0
    }
}

/// Full scoring pass for one product. Criterion scores are clamped to the
/// unit interval so a loss-making margin or an out-of-range supplier rating
/// cannot push the final score outside `[0, 1]`.
pub fn score_product(
    product: &Product,
    stats: &DatasetStats,
    weights: &ScoringWeights,
) -> ScoreBreakdown {
    let unit = |v: f64| v.clamp(0.0, 1.0);
    let scores = CriterionScores {
        demand: unit(demand_score(
            product.search_volume as f64,
            product.sales_rank as f64,
            stats.max_search_volume,
            stats.max_sales_rank,
        )),
        competition: unit(competition_score(
            product.competitor_count as f64,
            stats.max_competitor_count,
        )),
        profit_margin: unit(profit_margin_score(
            product.selling_price,
            product.product_cost,
            product.fees,
        )),
        supplier_reliability: unit(supplier_reliability_score(product.supplier_rating)),
        shipping_handling: unit(shipping_handling_score(
            product.shipping_cost,
            stats.max_shipping_cost,
        )),
        return_rate: unit(return_rate_score(product.return_rate, stats.max_return_rate)),
        seasonality: unit(seasonality_score(
            product.seasonality_variation,
            stats.max_seasonality_variation,
        )),
        product_restrictions: product_restrictions_score(product.has_restrictions),
    };
    let final_score = weighted_final_score(&scores.entries(), weights);
    ScoreBreakdown {
        scores,
        final_score,
    }
}
