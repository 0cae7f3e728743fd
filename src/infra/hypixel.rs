//! Thin asynchronous client for the Hypixel SkyBlock and Mojang APIs.
//!
//! - Normalizes bazaar `quick_status` payloads into a [`QuoteSnapshot`].
//! - Caches collection tier tables for a day.
//! - Resolves a username to collection levels for the unlock check.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, SystemTime},
};

use reqwest::{Client, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{CollectionLevels, MarketQuote, QuoteSnapshot};

pub const DEFAULT_HYPIXEL_URL: &str = "https://api.hypixel.net/v2/";
pub const DEFAULT_MOJANG_URL: &str = "https://api.mojang.com/";
const TIERS_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const USER_AGENT: &str = concat!("bazaar-flip-tracker/", env!("CARGO_PKG_VERSION"));
const API_KEY_HEADER: &str = "API-Key";

#[derive(Debug, Error)]
pub enum HypixelClientError {
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error: {0}")]
    Api(String),
    #[error("player {0} not found")]
    UnknownPlayer(String),
    #[error("malformed player id {0}")]
    InvalidPlayerId(String),
    #[error("username and API key are both required")]
    MissingCredential,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheStatus {
    Fresh,
    Cached,
    Stale,
}

#[derive(Clone, Debug)]
pub struct CachedPayload<T> {
    pub data: T,
    pub fetched_at: SystemTime,
    pub status: CacheStatus,
}

impl<T> CachedPayload<T> {
    pub fn new(data: T, fetched_at: SystemTime, status: CacheStatus) -> Self {
        Self {
            data,
            fetched_at,
            status,
        }
    }
}

/// Collection key → ascending item counts required for tiers 1, 2, ...
pub type CollectionTiers = HashMap<String, Vec<u64>>;

#[derive(Default)]
struct HypixelCache {
    tiers: Option<Cached<CollectionTiers>>,
}

#[derive(Clone)]
pub struct HypixelClient {
    http: Client,
    hypixel_url: Url,
    mojang_url: Url,
    cache: Arc<Mutex<HypixelCache>>,
}

impl HypixelClient {
    pub fn new() -> Result<Self, HypixelClientError> {
        Self::with_endpoints(DEFAULT_HYPIXEL_URL, DEFAULT_MOJANG_URL)
    }

    pub fn with_endpoints(hypixel: &str, mojang: &str) -> Result<Self, HypixelClientError> {
        let http = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            hypixel_url: Url::parse(hypixel)?,
            mojang_url: Url::parse(mojang)?,
            cache: Arc::new(Mutex::new(HypixelCache::default())),
        })
    }

    /// Fetches a new snapshot. Always hits the network.
    pub async fn fetch_bazaar(&self) -> Result<QuoteSnapshot, HypixelClientError> {
        let url = self.hypixel_url.join("skyblock/bazaar")?;
        let dto: BazaarDto = self.fetch_hypixel(self.http.get(url)).await?;
        let snapshot = normalize_bazaar(dto, SystemTime::now());
        info!(products = snapshot.len(), "bazaar snapshot refreshed");
        Ok(snapshot)
    }

    /// Looks up the Mojang account id for a username.
    pub async fn resolve_player(&self, username: &str) -> Result<Uuid, HypixelClientError> {
        let url = self
            .mojang_url
            .join(&format!("users/profiles/minecraft/{username}"))?;
        let response = self.http.get(url).send().await?;
        if matches!(response.status(), StatusCode::NOT_FOUND | StatusCode::NO_CONTENT) {
            return Err(HypixelClientError::UnknownPlayer(username.to_string()));
        }
        let profile: MojangProfileDto = response.error_for_status()?.json().await?;
        Uuid::parse_str(&profile.id).map_err(|_| HypixelClientError::InvalidPlayerId(profile.id))
    }

    /// Raw collection counts of the player's selected profile.
    pub async fn get_collection_counts(
        &self,
        player: Uuid,
        api_key: &str,
    ) -> Result<HashMap<String, u64>, HypixelClientError> {
        let member_id = player.simple().to_string();
        let mut url = self.hypixel_url.join("skyblock/profiles")?;
        url.query_pairs_mut().append_pair("uuid", &member_id);

        let request = self.http.get(url).header(API_KEY_HEADER, api_key);
        let dto: ProfilesDto = self.fetch_hypixel(request).await?;
        Ok(select_collection_counts(dto, &member_id))
    }

    /// Tier thresholds per collection, cached for a day.
    pub async fn get_collection_tiers(&self) -> Result<CollectionTiers, HypixelClientError> {
        {
            let cache = self.cache.lock().await;
            if let Some(payload) = cache.tiers.as_ref().and_then(|c| c.if_fresh(TIERS_TTL)) {
                return Ok(payload.data);
            }
        }

        let url = self.hypixel_url.join("resources/skyblock/collections")?;
        let dto: CollectionsResourceDto = self.fetch_hypixel(self.http.get(url)).await?;
        let tiers = normalize_tiers(dto);
        debug!(collections = tiers.len(), "loaded collection tiers");

        let mut cache = self.cache.lock().await;
        cache.tiers = Some(Cached::new(tiers.clone(), SystemTime::now()));
        Ok(tiers)
    }

    /// Username + API key → collection levels of the selected profile.
    pub async fn verify_player(
        &self,
        username: &str,
        api_key: &str,
    ) -> Result<CollectionLevels, HypixelClientError> {
        let username = username.trim();
        let api_key = api_key.trim();
        if username.is_empty() || api_key.is_empty() {
            return Err(HypixelClientError::MissingCredential);
        }

        let player = self.resolve_player(username).await?;
        let counts = self.get_collection_counts(player, api_key).await?;
        let tiers = self.get_collection_tiers().await?;
        let levels = collection_levels(&counts, &tiers);
        info!(%username, collections = levels.len(), "player verified");
        Ok(levels)
    }

    async fn fetch_hypixel<T>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, HypixelClientError>
    where
        T: DeserializeOwned,
    {
        let response = builder.send().await?;
        let status = response.status();
        let envelope: HypixelEnvelope<T> = response.json().await?;
        if !envelope.success {
            return Err(HypixelClientError::Api(
                envelope.cause.unwrap_or_else(|| status.to_string()),
            ));
        }
        Ok(envelope.data)
    }
}

struct Cached<T> {
    value: T,
    fetched_at: SystemTime,
}

impl<T: Clone> Cached<T> {
    fn new(value: T, fetched_at: SystemTime) -> Self {
        Self { value, fetched_at }
    }

    fn if_fresh(&self, ttl: Duration) -> Option<CachedPayload<T>> {
        if self
            .fetched_at
            .elapsed()
            .map(|elapsed| elapsed <= ttl)
            .unwrap_or(false)
        {
            Some(CachedPayload::new(
                self.value.clone(),
                self.fetched_at,
                CacheStatus::Cached,
            ))
        } else {
            None
        }
    }
}

#[derive(Debug, Deserialize)]
struct HypixelEnvelope<T> {
    success: bool,
    #[serde(default)]
    cause: Option<String>,
    #[serde(flatten)]
    data: T,
}

#[derive(Debug, Default, Deserialize)]
struct BazaarDto {
    #[serde(default)]
    products: HashMap<String, BazaarProductDto>,
}

#[derive(Debug, Deserialize)]
struct BazaarProductDto {
    #[serde(default)]
    quick_status: Option<QuickStatusDto>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuickStatusDto {
    /// Lowest sell offer: what an instant buyer pays.
    #[serde(default)]
    sell_price: f64,
    /// Highest buy order: what an instant seller receives.
    #[serde(default)]
    buy_price: f64,
    #[serde(default)]
    sell_volume: f64,
    #[serde(default)]
    buy_volume: f64,
}

impl From<QuickStatusDto> for MarketQuote {
    fn from(dto: QuickStatusDto) -> Self {
        Self {
            instant_buy_price: finite_or_zero(dto.sell_price),
            instant_sell_price: finite_or_zero(dto.buy_price),
            available_supply_units: finite_or_zero(dto.sell_volume),
            available_demand_units: finite_or_zero(dto.buy_volume),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MojangProfileDto {
    id: String,
}

#[derive(Debug, Default, Deserialize)]
struct ProfilesDto {
    #[serde(default)]
    profiles: Option<Vec<ProfileDto>>,
}

#[derive(Debug, Deserialize)]
struct ProfileDto {
    #[serde(default)]
    selected: bool,
    #[serde(default)]
    members: HashMap<String, MemberDto>,
}

#[derive(Debug, Deserialize)]
struct MemberDto {
    #[serde(default)]
    collection: HashMap<String, u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CollectionsResourceDto {
    #[serde(default)]
    collections: HashMap<String, CollectionCategoryDto>,
}

#[derive(Debug, Deserialize)]
struct CollectionCategoryDto {
    #[serde(default)]
    items: HashMap<String, CollectionItemDto>,
}

#[derive(Debug, Deserialize)]
struct CollectionItemDto {
    #[serde(default)]
    tiers: Vec<CollectionTierDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectionTierDto {
    tier: u32,
    amount_required: u64,
}

fn normalize_bazaar(dto: BazaarDto, fetched_at: SystemTime) -> QuoteSnapshot {
    let quotes = dto
        .products
        .into_iter()
        .filter_map(|(id, product)| product.quick_status.map(|qs| (id, MarketQuote::from(qs))))
        .collect();
    QuoteSnapshot::new(quotes, fetched_at)
}

fn select_collection_counts(dto: ProfilesDto, member_id: &str) -> HashMap<String, u64> {
    let profiles = dto.profiles.unwrap_or_default();
    let Some(index) = profiles
        .iter()
        .position(|profile| profile.selected)
        .or_else(|| (!profiles.is_empty()).then_some(0))
    else {
        return HashMap::new();
    };

    profiles
        .into_iter()
        .nth(index)
        .and_then(|mut profile| profile.members.remove(member_id))
        .map(|member| member.collection)
        .unwrap_or_default()
}

fn normalize_tiers(dto: CollectionsResourceDto) -> CollectionTiers {
    dto.collections
        .into_values()
        .flat_map(|category| category.items)
        .map(|(key, item)| {
            let mut tiers = item.tiers;
            tiers.sort_by_key(|tier| tier.tier);
            (key, tiers.into_iter().map(|t| t.amount_required).collect())
        })
        .collect()
}

/// Converts raw collected amounts into unlocked tiers.
///
/// Collections missing from `tiers` are left out, so they read as level 0.
pub fn collection_levels(counts: &HashMap<String, u64>, tiers: &CollectionTiers) -> CollectionLevels {
    counts
        .iter()
        .filter_map(|(key, &count)| {
            let thresholds = tiers.get(key)?;
            let level = thresholds.iter().take_while(|&&need| count >= need).count();
            Some((key.clone(), level as u32))
        })
        .collect()
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bazaar_quick_status_maps_onto_quote_sides() {
        let raw = json!({
            "success": true,
            "lastUpdated": 1_700_000_000_000_u64,
            "products": {
                "ENCHANTED_CARROT": {
                    "product_id": "ENCHANTED_CARROT",
                    "sell_summary": [],
                    "buy_summary": [],
                    "quick_status": {
                        "productId": "ENCHANTED_CARROT",
                        "sellPrice": 310.5,
                        "buyPrice": 290.0,
                        "sellVolume": 120000.0,
                        "buyVolume": 45000.0
                    }
                },
                "BROKEN": { "product_id": "BROKEN" }
            }
        });
        let envelope: HypixelEnvelope<BazaarDto> = serde_json::from_value(raw).unwrap();
        assert!(envelope.success);

        let snapshot = normalize_bazaar(envelope.data, SystemTime::UNIX_EPOCH);
        assert_eq!(snapshot.len(), 1);
        let quote = snapshot.get("ENCHANTED_CARROT").unwrap();
        assert_eq!(quote.instant_buy_price, 310.5);
        assert_eq!(quote.instant_sell_price, 290.0);
        assert_eq!(quote.available_supply_units, 120000.0);
        assert_eq!(quote.available_demand_units, 45000.0);
        assert!(snapshot.get("BROKEN").is_none());
    }

    #[test]
    fn failed_envelope_keeps_cause() {
        let raw = json!({ "success": false, "cause": "Invalid API key" });
        let envelope: HypixelEnvelope<ProfilesDto> = serde_json::from_value(raw).unwrap();
        assert!(!envelope.success);
        assert_eq!(envelope.cause.as_deref(), Some("Invalid API key"));
    }

    #[test]
    fn picks_selected_profile_then_first() {
        let member = "0123456789abcdef0123456789abcdef";
        let raw = json!({
            "profiles": [
                { "selected": false, "members": { member: { "collection": { "WHEAT": 10 } } } },
                { "selected": true, "members": { member: { "collection": { "WHEAT": 900 } } } }
            ]
        });
        let dto: ProfilesDto = serde_json::from_value(raw).unwrap();
        assert_eq!(select_collection_counts(dto, member)["WHEAT"], 900);

        let raw = json!({
            "profiles": [
                { "members": { member: { "collection": { "WHEAT": 10 } } } },
                { "members": { member: { "collection": { "WHEAT": 900 } } } }
            ]
        });
        let dto: ProfilesDto = serde_json::from_value(raw).unwrap();
        assert_eq!(select_collection_counts(dto, member)["WHEAT"], 10);
    }

    #[test]
    fn missing_profiles_yield_no_counts() {
        let dto: ProfilesDto = serde_json::from_value(json!({ "profiles": null })).unwrap();
        assert!(select_collection_counts(dto, "abc").is_empty());
    }

    #[test]
    fn tiers_are_counted_against_thresholds() {
        let raw = json!({
            "collections": {
                "FARMING": {
                    "name": "Farming",
                    "items": {
                        "WHEAT": {
                            "name": "Wheat",
                            "maxTiers": 3,
                            "tiers": [
                                { "tier": 2, "amountRequired": 100, "unlocks": [] },
                                { "tier": 1, "amountRequired": 50, "unlocks": [] },
                                { "tier": 3, "amountRequired": 250, "unlocks": [] }
                            ]
                        }
                    }
                }
            }
        });
        let tiers = normalize_tiers(serde_json::from_value(raw).unwrap());
        assert_eq!(tiers["WHEAT"], vec![50, 100, 250]);

        let counts: HashMap<String, u64> = [
            ("WHEAT".to_string(), 120),
            ("UNKNOWN".to_string(), 5_000),
        ]
        .into_iter()
        .collect();
        let levels = collection_levels(&counts, &tiers);
        assert_eq!(levels.get("WHEAT"), Some(&2));
        assert!(!levels.contains_key("UNKNOWN"));
    }

    #[test]
    fn non_finite_prices_become_zero() {
        let quote = MarketQuote::from(QuickStatusDto {
            sell_price: f64::NAN,
            buy_price: f64::INFINITY,
            sell_volume: 3.0,
            buy_volume: 4.0,
        });
        assert_eq!(quote.instant_buy_price, 0.0);
        assert_eq!(quote.instant_sell_price, 0.0);
    }
}
