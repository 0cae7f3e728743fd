//! Plain-text ranking table.

use std::fmt::Write;
use std::time::SystemTime;

use crate::domain::{is_unlocked, CollectionLevels, RankedFlip};
use crate::util::roman::roman_numeral;

const CAPACITY_WARNING: &str = "!cap";

#[derive(Clone, Debug, PartialEq)]
pub struct FlipRow {
    pub rank: usize,
    pub name: String,
    pub path: String,
    pub unit_cost: f64,
    pub unit_revenue: f64,
    pub npc_price: bool,
    pub total_profit: f64,
    pub supply: f64,
    pub supply_short: bool,
    pub demand: f64,
    /// Demand shortfall that matters, i.e. not covered by an NPC buyer.
    pub demand_short: bool,
    pub locked: Option<String>,
}

impl FlipRow {
    pub fn from_ranked(rank: usize, flip: &RankedFlip<'_>, levels: &CollectionLevels) -> Self {
        let recipe = flip.recipe;
        let result = &flip.result;
        let locked = (!is_unlocked(recipe, levels)).then(|| {
            format!(
                "{} {}",
                recipe.unlock_collection_key,
                roman_numeral(recipe.unlock_collection_level)
            )
        });

        Self {
            rank,
            name: recipe.name.clone(),
            path: format!("{} -> {}", recipe.raw_id, result.chosen_output_id),
            unit_cost: result.unit_cost,
            unit_revenue: result.unit_revenue,
            npc_price: result.is_npc_floor_used,
            total_profit: result.total_profit,
            supply: result.supply_units_available,
            supply_short: result.supply_shortfall,
            demand: result.demand_units_available,
            demand_short: result.demand_shortfall_visible(),
            locked,
        }
    }
}

pub fn build_rows(ranked: &[RankedFlip<'_>], levels: &CollectionLevels, limit: Option<usize>) -> Vec<FlipRow> {
    ranked
        .iter()
        .take(limit.unwrap_or(usize::MAX))
        .enumerate()
        .map(|(index, flip)| FlipRow::from_ranked(index + 1, flip, levels))
        .collect()
}

pub fn render_table(rows: &[FlipRow]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>3}  {:<24} {:<44} {:>10} {:>14} {:>12} {:>14} {:>14}  {}",
        "#", "Flip", "Path", "Buy", "Sell", "Profit", "Supply", "Demand", "Unlock"
    );
    let _ = writeln!(out, "{:-<160}", "");

    for row in rows {
        let sell = format!(
            "{} {}",
            format_coins(row.unit_revenue),
            if row.npc_price { "NPC" } else { "BZ" }
        );
        let supply = with_warning(format_units(row.supply), row.supply_short);
        let demand = if row.npc_price {
            "inf NPC".to_string()
        } else {
            with_warning(format_units(row.demand), row.demand_short)
        };
        let unlock = row
            .locked
            .as_deref()
            .map(|need| format!("LOCKED ({need})"))
            .unwrap_or_default();

        let _ = writeln!(
            out,
            "{:>3}  {:<24} {:<44} {:>10} {:>14} {:>12} {:>14} {:>14}  {}",
            row.rank,
            row.name,
            row.path,
            format_coins(row.unit_cost),
            sell,
            format_coins(row.total_profit),
            supply,
            demand,
            unlock
        );
    }

    if rows.is_empty() {
        let _ = writeln!(out, "No flips can be priced with the current snapshot.");
    }
    out
}

fn with_warning(value: String, short: bool) -> String {
    if short {
        format!("{value} {CAPACITY_WARNING}")
    } else {
        value
    }
}

/// Compact coin amount: `12.3M`, `45k`, `7.5`.
pub fn format_coins(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if magnitude >= 1_000.0 {
        format!("{:.0}k", value / 1_000.0)
    } else {
        format!("{value:.1}")
    }
}

/// Whole units with thousands separators.
pub fn format_units(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let grouped: String = grouped.chars().rev().collect();
    if rounded < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

pub fn humanize_age(updated_at: SystemTime) -> String {
    let age = SystemTime::now()
        .duration_since(updated_at)
        .unwrap_or_default()
        .as_secs();
    if age < 60 {
        format!("{age}s ago")
    } else if age < 3_600 {
        format!("{}m ago", age / 60)
    } else if age < 86_400 {
        format!("{}h ago", age / 3_600)
    } else {
        format!("{}d ago", age / 86_400)
    }
}
