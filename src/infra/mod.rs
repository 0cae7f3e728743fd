pub mod history;
pub mod hypixel;

pub use history::{filter_range, normalize_history, HistoryClient, HistoryRange, HistorySource};
pub use hypixel::{
    collection_levels, CacheStatus, CachedPayload, CollectionTiers, HypixelClient,
    HypixelClientError,
};
