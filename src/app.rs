//! Session state: the latest bazaar snapshot and the player's unlock data.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::SystemTime,
};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::{
    domain::{rank_flips, Catalog, CollectionLevels, QuoteSnapshot, RankedFlip, UserParameters},
    infra::{CacheStatus, CachedPayload, HypixelClient, HypixelClientError},
};

/// Issued before a snapshot fetch starts; orders fetches by start time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

#[derive(Clone, Debug)]
pub struct AppliedSnapshot {
    pub snapshot: Arc<QuoteSnapshot>,
    pub status: CacheStatus,
}

/// Holds exactly one snapshot at a time. A fetch that started before the
/// currently held one is discarded on arrival.
#[derive(Default)]
pub struct SnapshotSlot {
    next_ticket: AtomicU64,
    current: RwLock<Option<(RefreshTicket, AppliedSnapshot)>>,
}

impl SnapshotSlot {
    pub fn ticket(&self) -> RefreshTicket {
        RefreshTicket(self.next_ticket.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Stores the payload unless a newer ticket already landed. Returns
    /// whether it was applied.
    pub async fn apply(&self, ticket: RefreshTicket, payload: CachedPayload<QuoteSnapshot>) -> bool {
        let mut current = self.current.write().await;
        if let Some((held, _)) = current.as_ref() {
            if *held > ticket {
                debug!(?ticket, ?held, "dropping superseded snapshot");
                return false;
            }
        }
        *current = Some((
            ticket,
            AppliedSnapshot {
                snapshot: Arc::new(payload.data),
                status: payload.status,
            },
        ));
        true
    }

    /// Marks the held snapshot stale after the fetch behind `ticket` failed.
    /// A snapshot from a later fetch is left alone. Returns whether anything
    /// is held.
    pub async fn mark_stale(&self, ticket: RefreshTicket) -> bool {
        let mut current = self.current.write().await;
        match current.as_mut() {
            Some((held, applied)) => {
                if *held < ticket {
                    applied.status = CacheStatus::Stale;
                }
                true
            }
            None => false,
        }
    }

    pub async fn current(&self) -> Option<AppliedSnapshot> {
        self.current.read().await.as_ref().map(|(_, applied)| applied.clone())
    }
}

/// Ties the catalog, the bazaar client and the held snapshot together.
pub struct Tracker {
    catalog: Catalog,
    client: HypixelClient,
    slot: SnapshotSlot,
    collection_levels: RwLock<CollectionLevels>,
}

impl Tracker {
    pub fn new(catalog: Catalog, client: HypixelClient) -> Self {
        Self {
            catalog,
            client,
            slot: SnapshotSlot::default(),
            collection_levels: RwLock::new(CollectionLevels::new()),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Fetches a snapshot and swaps it in. Returns the status of the held
    /// snapshot, or `None` when a newer refresh overtook this one.
    ///
    /// A failed fetch keeps the held snapshot and marks it
    /// [`CacheStatus::Stale`]; the error is returned only when nothing is held.
    pub async fn refresh(&self) -> Result<Option<CacheStatus>, HypixelClientError> {
        let ticket = self.slot.ticket();
        match self.client.fetch_bazaar().await {
            Ok(snapshot) => {
                let fetched_at = snapshot.fetched_at;
                let payload = CachedPayload::new(snapshot, fetched_at, CacheStatus::Fresh);
                Ok(self.slot.apply(ticket, payload).await.then_some(CacheStatus::Fresh))
            }
            Err(error) => {
                if !self.slot.mark_stale(ticket).await {
                    return Err(error);
                }
                warn!(%error, "bazaar refresh failed; keeping previous snapshot");
                Ok(self.slot.current().await.map(|applied| applied.status))
            }
        }
    }

    pub async fn snapshot(&self) -> Option<AppliedSnapshot> {
        self.slot.current().await
    }

    /// Replaces the unlock data with the result of a verification.
    pub async fn verify(&self, username: &str, api_key: &str) -> Result<usize, HypixelClientError> {
        let levels = self.client.verify_player(username, api_key).await?;
        let count = levels.len();
        *self.collection_levels.write().await = levels;
        Ok(count)
    }

    pub async fn collection_levels(&self) -> CollectionLevels {
        self.collection_levels.read().await.clone()
    }

    /// Ranks the catalog against `snapshot`.
    pub fn rank<'a>(&'a self, snapshot: &QuoteSnapshot, params: &UserParameters) -> Vec<RankedFlip<'a>> {
        rank_flips(
            self.catalog.recipes(),
            snapshot,
            params.purchase_quantity,
            params.use_two_stage_path,
        )
    }
}
