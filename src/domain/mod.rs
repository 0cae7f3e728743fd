//! Flip pricing, ranking and unlock checks. Everything here is pure.

pub mod catalog;
pub mod entities;
pub mod evaluation;
pub mod unlock;

pub use catalog::{Catalog, CatalogError};
pub use entities::{
    CollectionLevels, FlipResult, HistoryPoint, ItemId, MarketQuote, QuoteSnapshot,
    RecipeDefinition, UserParameters, DEFAULT_PURCHASE_QUANTITY,
};
pub use evaluation::{compute_flip, rank_flips, RankedFlip, MIN_UNIT_PRICE};
pub use unlock::is_unlocked;
