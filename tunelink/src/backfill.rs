use std::{
    collections::{BTreeMap, HashSet},
    sync::{Arc, Mutex},
    time::Duration,
};

use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::{
    async_trait, bounded::BoundedMap, persistence::DurablePersistence, EntityId, EntityKind,
    Platform, Result,
};

pub const DEFAULT_ARTWORK_CAPACITY: usize = 300;
pub const DEFAULT_BACKFILL_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_MAX_BACKFILL: usize = 8;

/// Persistence key of the artwork cache contents.
pub const ARTWORK_STORAGE_KEY: &str = "artwork-cache";
const PREFETCH_MARKER_KEY_PREFIX: &str = "artwork-prefetched";

/// One entity as returned by an owner listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySummary {
    pub id: EntityId,
    pub kind: EntityKind,
    pub artwork_url: Option<String>,
}

/// Per-platform block of an entity detail response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PlatformDetail {
    pub artwork_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntityDetail {
    pub artwork_url: Option<String>,
    /// Keyed by [`Platform::as_str`] for known platforms, free-form otherwise.
    pub platforms: BTreeMap<String, PlatformDetail>,
}

impl EntityDetail {
    /// The first non-blank artwork url: the detail's own field, then each platform block in
    /// [`Platform::PRECEDENCE`] order, then any remaining platform alphabetically.
    pub fn artwork_url(&self) -> Option<&str> {
        fn pick(value: &Option<String>) -> Option<&str> {
            value.as_deref().filter(|url| !url.trim().is_empty())
        }
        fn pick_platform(detail: &PlatformDetail) -> Option<&str> {
            pick(&detail.artwork_url).or_else(|| pick(&detail.thumbnail_url))
        }

        if let Some(url) = pick(&self.artwork_url) {
            return Some(url);
        }
        let known = Platform::PRECEDENCE.map(|p| p.as_str());
        known
            .iter()
            .filter_map(|name| self.platforms.get(*name))
            .chain(
                self.platforms
                    .iter()
                    .filter(|(name, _)| !known.contains(&name.as_str()))
                    .map(|(_, detail)| detail),
            )
            .find_map(pick_platform)
    }
}

#[async_trait]
pub trait EntityLister: Send + Sync + 'static {
    async fn list_for_owner(
        &self,
        owner_id: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<EntitySummary>>;
}

#[async_trait]
pub trait EntityDetailFetcher: Send + Sync + 'static {
    async fn fetch_by_id(&self, id: &EntityId, timeout: Duration) -> Result<EntityDetail>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrefetchOptions {
    pub page_size: usize,
    pub max_backfill: usize,
}

impl Default for PrefetchOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_backfill: DEFAULT_MAX_BACKFILL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkCacheEntry {
    pub entity_id: String,
    pub artwork_url: String,
}

#[derive(Debug, Clone)]
pub(crate) struct BackfillConfig {
    pub capacity: usize,
    pub detail_timeout: Duration,
    pub session_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PrefetchKey {
    owner_id: String,
    options: PrefetchOptions,
}

#[derive(Debug)]
struct State {
    artwork: BoundedMap<String, String>,
    inflight: HashSet<PrefetchKey>,
    prefetched: HashSet<String>,
}

/// Artwork map and prefetch markers backed by one persistence handle.
///
/// Shared by every cache built from the same context, so all of them read and write one map.
pub(crate) struct ArtworkStore {
    persistence: Arc<dyn DurablePersistence>,
    config: BackfillConfig,
    hydrated: OnceCell<()>,
    state: Mutex<State>,
    // serializes snapshot+save so an older snapshot never lands after a newer one
    persist: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for ArtworkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtworkStore")
            .field("persistence", &self.persistence)
            .field("config", &self.config)
            .finish()
    }
}

struct Inner {
    store: Arc<ArtworkStore>,
    lister: Arc<dyn EntityLister>,
    fetcher: Arc<dyn EntityDetailFetcher>,
}

/// Durable, bounded entity id to artwork url cache with best-effort backfill.
#[derive(Clone)]
pub struct MetadataBackfillCache(Arc<Inner>);

impl std::fmt::Debug for MetadataBackfillCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataBackfillCache")
            .field("store", &self.0.store)
            .finish()
    }
}

/// Clears the in-flight marker even if the sweep future is dropped.
struct InflightGuard<'a> {
    store: &'a ArtworkStore,
    key: PrefetchKey,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.store.lock().inflight.remove(&self.key);
    }
}

impl MetadataBackfillCache {
    pub(crate) fn new(
        store: Arc<ArtworkStore>,
        lister: Arc<dyn EntityLister>,
        fetcher: Arc<dyn EntityDetailFetcher>,
    ) -> Self {
        Self(Arc::new(Inner {
            store,
            lister,
            fetcher,
        }))
    }

    pub fn capacity(&self) -> usize {
        self.0.store.config.capacity.max(1)
    }

    pub async fn len(&self) -> usize {
        self.0.store.hydrate().await;
        self.0.store.lock().artwork.len()
    }

    pub async fn get(&self, entity_id: &str) -> Option<String> {
        self.0.store.hydrate().await;
        self.0.store.lock().artwork.get(entity_id).cloned()
    }

    /// Upserts an artwork url the caller already knows. Blank urls are ignored.
    #[tracing::instrument(skip(self))]
    pub async fn seed(&self, entity_id: &str, artwork_url: &str) {
        let store = &self.0.store;
        store.hydrate().await;
        if store.insert(entity_id, artwork_url) {
            store.persist_artwork().await;
        }
    }

    /// Backfills missing artwork for the first page of an owner's entities.
    ///
    /// Returns immediately if the same sweep is already running or the owner was already swept
    /// this session. Never fails: per-entity errors are logged and dropped.
    #[tracing::instrument(skip(self))]
    pub async fn prefetch_for_owner(&self, owner_id: &str, options: PrefetchOptions) {
        let store = &self.0.store;
        store.hydrate().await;
        let key = PrefetchKey {
            owner_id: owner_id.to_owned(),
            options,
        };
        {
            let mut state = store.lock();
            if state.prefetched.contains(owner_id) || state.inflight.contains(&key) {
                tracing::trace!("prefetch for {owner_id} skipped");
                return;
            }
            state.inflight.insert(key.clone());
        }
        let _guard = InflightGuard { store, key };

        match self.0.sweep(owner_id, options).await {
            Ok(()) => {
                store.lock().prefetched.insert(owner_id.to_owned());
                store.persist_marker().await;
            }
            Err(err) => tracing::warn!("artwork prefetch for {owner_id} abandoned: {err}"),
        }
    }

    /// Runs [`Self::prefetch_for_owner`] in the background.
    pub fn spawn_prefetch_for_owner(&self, owner_id: impl Into<String>, options: PrefetchOptions) {
        let cache = self.clone();
        let owner_id = owner_id.into();
        tokio::spawn(async move {
            cache.prefetch_for_owner(&owner_id, options).await;
        });
    }

    pub async fn is_prefetched(&self, owner_id: &str) -> bool {
        self.0.store.hydrate().await;
        self.0.store.lock().prefetched.contains(owner_id)
    }

    /// Entries from oldest to newest write.
    pub async fn entries(&self) -> Vec<ArtworkCacheEntry> {
        self.0.store.hydrate().await;
        self.0.store.lock().snapshot()
    }
}

impl State {
    fn snapshot(&self) -> Vec<ArtworkCacheEntry> {
        self.artwork
            .iter()
            .map(|(entity_id, artwork_url)| ArtworkCacheEntry {
                entity_id: entity_id.clone(),
                artwork_url: artwork_url.clone(),
            })
            .collect()
    }
}

fn decode<T: DeserializeOwned + Default>(key: &str, bytes: Option<Bytes>) -> T {
    let Some(bytes) = bytes else {
        return T::default();
    };
    bincode::deserialize(&bytes).unwrap_or_else(|err| {
        tracing::error!("discarding corrupt value at {key}: {err}");
        T::default()
    })
}

impl ArtworkStore {
    pub(crate) fn new(persistence: Arc<dyn DurablePersistence>, config: BackfillConfig) -> Self {
        let artwork = BoundedMap::new(config.capacity);
        Self {
            persistence,
            config,
            hydrated: OnceCell::new(),
            state: Mutex::new(State {
                artwork,
                inflight: Default::default(),
                prefetched: Default::default(),
            }),
            persist: Default::default(),
        }
    }

    pub(crate) fn session_id(&self) -> &str {
        &self.config.session_id
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn marker_key(&self) -> String {
        format!("{}/{}", PREFETCH_MARKER_KEY_PREFIX, self.config.session_id)
    }

    /// Loads the stored contents once. A failed load is retried on the next access and
    /// nothing is saved until one succeeds, so the stored contents are never clobbered.
    async fn hydrate(&self) {
        let result = self
            .hydrated
            .get_or_try_init(|| async {
                let marker_key = self.marker_key();
                let artwork = self.persistence.load(ARTWORK_STORAGE_KEY).await?;
                let marker = self.persistence.load(&marker_key).await?;
                let entries: Vec<ArtworkCacheEntry> = decode(ARTWORK_STORAGE_KEY, artwork);
                let prefetched: Vec<String> = decode(&marker_key, marker);

                {
                    let mut state = self.lock();
                    for entry in entries {
                        if entry.artwork_url.trim().is_empty() {
                            continue;
                        }
                        // entries written before hydration finished are newer than the stored ones
                        if !state.artwork.contains_key(entry.entity_id.as_str()) {
                            state.artwork.insert(entry.entity_id, entry.artwork_url);
                        }
                    }
                    state.prefetched.extend(prefetched);
                    tracing::debug!("hydrated {} artwork entries", state.artwork.len());
                }
                Ok::<_, std::io::Error>(())
            })
            .await;
        if let Err(err) = result {
            tracing::error!("failed to load artwork cache: {err}");
        }
    }

    /// Returns whether the map changed.
    fn insert(&self, entity_id: &str, artwork_url: &str) -> bool {
        let artwork_url = artwork_url.trim();
        if entity_id.is_empty() || artwork_url.is_empty() {
            return false;
        }
        let mut state = self.lock();
        if let Some((evicted, _)) = state
            .artwork
            .insert(entity_id.to_owned(), artwork_url.to_owned())
        {
            tracing::trace!("evicted artwork for {evicted}");
        }
        true
    }

    async fn persist_artwork(&self) {
        if !self.hydrated.initialized() {
            tracing::warn!("artwork cache not loaded yet, keeping changes in memory");
            return;
        }
        let _persist = self.persist.lock().await;
        let snapshot = self.lock().snapshot();
        if let Err(err) = self.save(ARTWORK_STORAGE_KEY, &snapshot).await {
            tracing::error!("failed to persist artwork cache: {err}");
        }
    }

    async fn persist_marker(&self) {
        if !self.hydrated.initialized() {
            tracing::warn!("prefetch marker not loaded yet, keeping changes in memory");
            return;
        }
        let _persist = self.persist.lock().await;
        let mut prefetched = self.lock().prefetched.iter().cloned().collect::<Vec<_>>();
        prefetched.sort();
        if let Err(err) = self.save(&self.marker_key(), &prefetched).await {
            tracing::error!("failed to persist prefetch marker: {err}");
        }
    }

    async fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = bincode::serialize(value)?;
        self.persistence.save(key, Bytes::from(bytes)).await?;
        Ok(())
    }
}

impl Inner {
    async fn sweep(&self, owner_id: &str, options: PrefetchOptions) -> Result<()> {
        let summaries = self
            .lister
            .list_for_owner(owner_id, 0, options.page_size)
            .await?;

        let selected = {
            let state = self.store.lock();
            summaries
                .into_iter()
                .filter(|summary| summary.kind != EntityKind::Playlist)
                .filter(|summary| {
                    summary
                        .artwork_url
                        .as_deref()
                        .map_or(true, |url| url.trim().is_empty())
                })
                .filter(|summary| !state.artwork.contains_key(summary.id.as_str()))
                .take(options.max_backfill)
                .map(|summary| summary.id)
                .collect::<Vec<_>>()
        };
        tracing::debug!(
            "backfilling artwork for {} entities of {owner_id}",
            selected.len()
        );

        let timeout = self.store.config.detail_timeout;
        let attempts = selected.iter().map(|id| async move {
            let detail =
                match tokio::time::timeout(timeout, self.fetcher.fetch_by_id(id, timeout)).await {
                    Ok(Ok(detail)) => detail,
                    Ok(Err(err)) => {
                        tracing::warn!("failed to fetch detail for {id}: {err}");
                        return false;
                    }
                    Err(_) => {
                        tracing::warn!("timed out fetching detail for {id}");
                        return false;
                    }
                };
            match detail.artwork_url() {
                Some(url) => {
                    tracing::debug!("backfilled artwork for {id}");
                    self.store.insert(id.as_str(), url)
                }
                None => false,
            }
        });
        let changed = futures::future::join_all(attempts).await;
        if changed.into_iter().any(|changed| changed) {
            self.store.persist_artwork().await;
        }
        Ok(())
    }
}
