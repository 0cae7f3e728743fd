use std::{
    collections::HashMap,
    time::{Duration, SystemTime},
};

use serde::{Deserialize, Serialize};

/// Bazaar product identifier (e.g. `ENCHANTED_CARROT`).
pub type ItemId = String;

/// Collection key → unlocked collection tier.
pub type CollectionLevels = HashMap<String, u32>;

/// One crafting flip: buy `raw_id`, craft, sell the stage-1 or stage-2 output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecipeDefinition {
    pub id: String,
    pub name: String,
    pub raw_id: ItemId,
    pub stage1_output_id: ItemId,
    #[serde(default)]
    pub stage2_output_id: Option<ItemId>,
    /// Raw units consumed per stage-1 unit.
    pub stage1_ratio: u32,
    /// Stage-1 units consumed per stage-2 unit.
    #[serde(default)]
    pub stage2_ratio: Option<u32>,
    #[serde(default)]
    pub npc_floor_price1: Option<f64>,
    #[serde(default)]
    pub npc_floor_price2: Option<f64>,
    pub unlock_collection_key: String,
    pub unlock_collection_level: u32,
}

impl RecipeDefinition {
    /// Stage-2 output and its ratio, when the recipe has a double-processing path.
    pub fn stage2(&self) -> Option<(&str, u32)> {
        match (&self.stage2_output_id, self.stage2_ratio) {
            (Some(id), Some(ratio)) => Some((id.as_str(), ratio)),
            _ => None,
        }
    }

    pub fn has_stage2(&self) -> bool {
        self.stage2().is_some()
    }
}

/// Normalized quick-status figures for one bazaar product.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    /// Price paid to acquire one unit immediately.
    pub instant_buy_price: f64,
    /// Price received to liquidate one unit immediately.
    pub instant_sell_price: f64,
    pub available_supply_units: f64,
    pub available_demand_units: f64,
}

/// All quotes from a single bazaar fetch. Replaced wholesale on refresh.
#[derive(Clone, Debug, PartialEq)]
pub struct QuoteSnapshot {
    quotes: HashMap<ItemId, MarketQuote>,
    pub fetched_at: SystemTime,
}

impl QuoteSnapshot {
    pub fn new(quotes: HashMap<ItemId, MarketQuote>, fetched_at: SystemTime) -> Self {
        Self { quotes, fetched_at }
    }

    pub fn get(&self, item_id: &str) -> Option<&MarketQuote> {
        self.quotes.get(item_id)
    }

    pub fn len(&self) -> usize {
        self.quotes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn age(&self) -> Duration {
        self.fetched_at.elapsed().unwrap_or_default()
    }
}

impl FromIterator<(ItemId, MarketQuote)> for QuoteSnapshot {
    fn from_iter<I: IntoIterator<Item = (ItemId, MarketQuote)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect(), SystemTime::now())
    }
}

/// Outcome of running one recipe against one snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct FlipResult {
    pub recipe_id: String,
    pub chosen_output_id: ItemId,
    pub effective_ratio: u64,
    pub unit_cost: f64,
    pub unit_revenue: f64,
    pub is_npc_floor_used: bool,
    pub total_cost: f64,
    pub total_revenue: f64,
    /// Fractional output units; a projection, not an inventory count.
    pub output_units_produced: f64,
    pub total_profit: f64,
    pub supply_units_available: f64,
    pub demand_units_available: f64,
    pub supply_shortfall: bool,
    pub demand_shortfall: bool,
}

impl FlipResult {
    /// NPC buyers take unlimited volume, so a demand shortfall only matters
    /// when the market price won.
    pub fn demand_shortfall_visible(&self) -> bool {
        self.demand_shortfall && !self.is_npc_floor_used
    }
}

/// Raw units bought per flip until the user picks another amount.
pub const DEFAULT_PURCHASE_QUANTITY: f64 = 71_680.0;

/// Presenter-side knobs that feed a ranking pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserParameters {
    pub purchase_quantity: f64,
    pub use_two_stage_path: bool,
    #[serde(default)]
    pub collection_levels: CollectionLevels,
}

impl Default for UserParameters {
    fn default() -> Self {
        Self {
            purchase_quantity: DEFAULT_PURCHASE_QUANTITY,
            use_two_stage_path: false,
            collection_levels: CollectionLevels::new(),
        }
    }
}

/// One normalized point of an item's price history.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistoryPoint {
    pub time: SystemTime,
    pub buy_price: f64,
    pub sell_price: f64,
}
