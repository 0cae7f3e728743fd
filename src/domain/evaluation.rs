use std::cmp::Ordering;

use super::entities::{FlipResult, QuoteSnapshot, RecipeDefinition};

/// Lowest unit price the calculator will ever use on either side of a flip.
pub const MIN_UNIT_PRICE: f64 = 0.1;

/// Prices one recipe against a snapshot.
///
/// Returns `None` when the snapshot has no quote for the raw input; every
/// other missing figure (output quote, NPC price) counts as zero.
pub fn compute_flip(
    recipe: &RecipeDefinition,
    quotes: &QuoteSnapshot,
    quantity: f64,
    use_two_stage: bool,
) -> Option<FlipResult> {
    let raw = quotes.get(&recipe.raw_id)?;
    let unit_cost = raw.instant_buy_price.max(MIN_UNIT_PRICE);

    let (target_id, effective_ratio, floor_price) = match recipe.stage2() {
        Some((stage2_id, stage2_ratio)) if use_two_stage => (
            stage2_id,
            u64::from(recipe.stage1_ratio) * u64::from(stage2_ratio),
            recipe.npc_floor_price2.unwrap_or(0.0),
        ),
        _ => (
            recipe.stage1_output_id.as_str(),
            u64::from(recipe.stage1_ratio),
            recipe.npc_floor_price1.unwrap_or(0.0),
        ),
    };

    let target = quotes.get(target_id);
    let market_price = target.map(|q| q.instant_sell_price).unwrap_or(0.0);
    let unit_revenue = market_price.max(floor_price).max(MIN_UNIT_PRICE);
    let is_npc_floor_used = unit_revenue == floor_price && floor_price > 0.0;

    let ratio = effective_ratio as f64;
    let total_cost = unit_cost * quantity;
    let output_units_produced = quantity / ratio;
    let total_revenue = unit_revenue * output_units_produced;

    let supply_units_available = (raw.available_supply_units / ratio).floor();
    let demand_units_available = target.map(|q| q.available_demand_units).unwrap_or(0.0);

    Some(FlipResult {
        recipe_id: recipe.id.clone(),
        chosen_output_id: target_id.to_string(),
        effective_ratio,
        unit_cost,
        unit_revenue,
        is_npc_floor_used,
        total_cost,
        total_revenue,
        output_units_produced,
        total_profit: total_revenue - total_cost,
        supply_units_available,
        demand_units_available,
        supply_shortfall: output_units_produced > supply_units_available,
        demand_shortfall: output_units_produced > demand_units_available,
    })
}

/// A computable catalog entry paired with its result.
#[derive(Clone, Debug, PartialEq)]
pub struct RankedFlip<'a> {
    pub recipe: &'a RecipeDefinition,
    /// Position in the source catalog.
    pub catalog_index: usize,
    pub result: FlipResult,
}

/// Runs [`compute_flip`] over the catalog against one snapshot and orders the
/// computable entries by total profit, highest first. Equal profits keep
/// catalog order.
pub fn rank_flips<'a>(
    catalog: &'a [RecipeDefinition],
    quotes: &QuoteSnapshot,
    quantity: f64,
    use_two_stage: bool,
) -> Vec<RankedFlip<'a>> {
    let mut ranked: Vec<RankedFlip<'a>> = catalog
        .iter()
        .enumerate()
        .filter_map(|(catalog_index, recipe)| {
            compute_flip(recipe, quotes, quantity, use_two_stage).map(|result| RankedFlip {
                recipe,
                catalog_index,
                result,
            })
        })
        .collect();

    ranked.sort_by(compare_ranked);
    ranked
}

fn compare_ranked(a: &RankedFlip<'_>, b: &RankedFlip<'_>) -> Ordering {
    b.result
        .total_profit
        .total_cmp(&a.result.total_profit)
        .then(a.catalog_index.cmp(&b.catalog_index))
}
