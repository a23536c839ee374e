use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use bytes::Bytes;

use crate::{
    async_trait,
    persistence::{DurablePersistence, MemoryPersistence},
    Album, Artist, CatalogEntity, Clock, Config, ContentLink, Context, EntityDetail,
    EntityDetailFetcher, EntityId, EntityKind, EntityLister, EntitySummary, Error, ErrorKind,
    Playlist, PlatformDetail, ProviderClient, Result, ResultSet, SearchQuery, StorageBackend,
    Timestamp, Track,
};

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock(Arc<Mutex<Timestamp>>);

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Timestamp::from_seconds(1_700_000_000))
    }
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self(Arc::new(Mutex::new(start)))
    }

    pub fn advance(&self, duration: Duration) {
        let mut now = self.0.lock().unwrap();
        *now = now.checked_add(duration).unwrap();
    }

    pub fn set(&self, timestamp: Timestamp) {
        *self.0.lock().unwrap() = timestamp;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.0.lock().unwrap()
    }
}

#[derive(Debug, Default)]
struct ScriptedProviderInner {
    search_results: Mutex<ResultSet>,
    chart_results: Mutex<ResultSet>,
    entities: Mutex<HashMap<String, CatalogEntity>>,
    fail_search: AtomicBool,
    fail_charts: AtomicBool,
    delay: Mutex<Option<Duration>>,
    search_calls: AtomicUsize,
    chart_calls: AtomicUsize,
    queries: Mutex<Vec<SearchQuery>>,
}

/// Provider whose answers are set by the test.
#[derive(Debug, Default, Clone)]
pub struct ScriptedProvider(Arc<ScriptedProviderInner>);

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_results(self, results: ResultSet) -> Self {
        self.set_search_results(results);
        self
    }

    pub fn with_chart_results(self, results: ResultSet) -> Self {
        self.set_chart_results(results);
        self
    }

    pub fn with_entity(self, link: &ContentLink, entity: CatalogEntity) -> Self {
        self.0
            .entities
            .lock()
            .unwrap()
            .insert(link.to_string(), entity);
        self
    }

    pub fn failing() -> Self {
        let provider = Self::default();
        provider.set_failing(true);
        provider
    }

    pub fn set_search_results(&self, results: ResultSet) {
        *self.0.search_results.lock().unwrap() = results;
    }

    pub fn set_chart_results(&self, results: ResultSet) {
        *self.0.chart_results.lock().unwrap() = results;
    }

    pub fn set_failing(&self, failing: bool) {
        self.0.fail_search.store(failing, Ordering::SeqCst);
        self.0.fail_charts.store(failing, Ordering::SeqCst);
    }

    pub fn set_charts_failing(&self, failing: bool) {
        self.0.fail_charts.store(failing, Ordering::SeqCst);
    }

    /// Every call sleeps for `delay` before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.0.delay.lock().unwrap() = delay;
    }

    pub fn search_calls(&self) -> usize {
        self.0.search_calls.load(Ordering::SeqCst)
    }

    pub fn chart_calls(&self) -> usize {
        self.0.chart_calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<SearchQuery> {
        self.0.queries.lock().unwrap().clone()
    }

    async fn wait(&self) {
        let delay = *self.0.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ProviderClient for ScriptedProvider {
    async fn search(&self, query: &SearchQuery) -> Result<ResultSet> {
        self.0.search_calls.fetch_add(1, Ordering::SeqCst);
        self.0.queries.lock().unwrap().push(query.clone());
        self.wait().await;
        if self.0.fail_search.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::Internal, "scripted search failure"));
        }
        Ok(self.0.search_results.lock().unwrap().clone())
    }

    async fn top_charts(&self) -> Result<ResultSet> {
        self.0.chart_calls.fetch_add(1, Ordering::SeqCst);
        self.wait().await;
        if self.0.fail_charts.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::Internal, "scripted charts failure"));
        }
        Ok(self.0.chart_results.lock().unwrap().clone())
    }

    async fn fetch_entity(&self, link: &ContentLink) -> Result<Option<CatalogEntity>> {
        if self.0.fail_search.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::Internal, "scripted lookup failure"));
        }
        Ok(self
            .0
            .entities
            .lock()
            .unwrap()
            .get(&link.to_string())
            .cloned())
    }
}

#[derive(Debug, Default)]
struct ScriptedListerInner {
    owners: Mutex<HashMap<String, Vec<EntitySummary>>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    calls: AtomicUsize,
}

#[derive(Debug, Default, Clone)]
pub struct ScriptedLister(Arc<ScriptedListerInner>);

impl ScriptedLister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_owner(self, owner_id: &str, summaries: Vec<EntitySummary>) -> Self {
        self.0
            .owners
            .lock()
            .unwrap()
            .insert(owner_id.to_owned(), summaries);
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.0.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.0.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.0.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntityLister for ScriptedLister {
    async fn list_for_owner(
        &self,
        owner_id: &str,
        page: usize,
        page_size: usize,
    ) -> Result<Vec<EntitySummary>> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.0.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.0.failing.load(Ordering::SeqCst) {
            return Err(Error::new(ErrorKind::Internal, "scripted listing failure"));
        }
        let owners = self.0.owners.lock().unwrap();
        let summaries = owners.get(owner_id).cloned().unwrap_or_default();
        Ok(summaries
            .into_iter()
            .skip(page * page_size)
            .take(page_size)
            .collect())
    }
}

#[derive(Debug, Clone)]
enum ScriptedDetail {
    Detail(EntityDetail),
    Fail,
    Hang,
}

#[derive(Debug, Default)]
struct ScriptedFetcherInner {
    details: Mutex<HashMap<EntityId, ScriptedDetail>>,
    calls: Mutex<Vec<EntityId>>,
}

/// Detail fetcher answering per entity id. Unknown ids fail with `NotFound`.
#[derive(Debug, Default, Clone)]
pub struct ScriptedFetcher(Arc<ScriptedFetcherInner>);

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_detail(self, id: &str, detail: EntityDetail) -> Self {
        self.insert(id, ScriptedDetail::Detail(detail))
    }

    pub fn with_artwork(self, id: &str, artwork_url: &str) -> Self {
        self.with_detail(id, detail_with_artwork(artwork_url))
    }

    pub fn with_failure(self, id: &str) -> Self {
        self.insert(id, ScriptedDetail::Fail)
    }

    /// The fetch for `id` never completes on its own.
    pub fn with_hang(self, id: &str) -> Self {
        self.insert(id, ScriptedDetail::Hang)
    }

    pub fn calls(&self) -> Vec<EntityId> {
        self.0.calls.lock().unwrap().clone()
    }

    fn insert(self, id: &str, detail: ScriptedDetail) -> Self {
        self.0
            .details
            .lock()
            .unwrap()
            .insert(EntityId::new(id), detail);
        self
    }
}

#[async_trait]
impl EntityDetailFetcher for ScriptedFetcher {
    async fn fetch_by_id(&self, id: &EntityId, _timeout: Duration) -> Result<EntityDetail> {
        self.0.calls.lock().unwrap().push(id.clone());
        let detail = self.0.details.lock().unwrap().get(id).cloned();
        match detail {
            Some(ScriptedDetail::Detail(detail)) => Ok(detail),
            Some(ScriptedDetail::Fail) => {
                Err(Error::new(ErrorKind::Internal, "scripted detail failure"))
            }
            Some(ScriptedDetail::Hang) => std::future::pending().await,
            None => Err(Error::new(ErrorKind::NotFound, format!("no detail for {id}"))),
        }
    }
}

#[derive(Debug, Default)]
struct RecordingPersistenceInner {
    values: MemoryPersistence,
    loads: AtomicUsize,
    saves: AtomicUsize,
    fail_loads: AtomicBool,
}

/// In-memory persistence that counts calls and can fail loads on demand.
#[derive(Debug, Default, Clone)]
pub struct RecordingPersistence(Arc<RecordingPersistenceInner>);

impl RecordingPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing_loads(&self, failing: bool) {
        self.0.fail_loads.store(failing, Ordering::SeqCst);
    }

    pub fn loads(&self) -> usize {
        self.0.loads.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.0.saves.load(Ordering::SeqCst)
    }

    pub fn backend(&self) -> StorageBackend {
        StorageBackend::Custom(Arc::new(self.clone()))
    }
}

#[async_trait]
impl DurablePersistence for RecordingPersistence {
    async fn load(&self, key: &str) -> std::io::Result<Option<Bytes>> {
        self.0.loads.fetch_add(1, Ordering::SeqCst);
        if self.0.fail_loads.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "scripted load failure",
            ));
        }
        self.0.values.load(key).await
    }

    async fn save(&self, key: &str, bytes: Bytes) -> std::io::Result<()> {
        self.0.saves.fetch_add(1, Ordering::SeqCst);
        self.0.values.save(key, bytes).await
    }

    async fn delete(&self, key: &str) -> std::io::Result<()> {
        self.0.values.delete(key).await
    }
}

pub fn detail_with_artwork(artwork_url: &str) -> EntityDetail {
    EntityDetail {
        artwork_url: Some(artwork_url.to_owned()),
        ..Default::default()
    }
}

pub fn detail_with_platform(platform: &str, artwork_url: &str) -> EntityDetail {
    let mut detail = EntityDetail::default();
    detail.platforms.insert(
        platform.to_owned(),
        PlatformDetail {
            artwork_url: Some(artwork_url.to_owned()),
            thumbnail_url: None,
        },
    );
    detail
}

pub fn summary(id: &str, kind: EntityKind, artwork_url: Option<&str>) -> EntitySummary {
    EntitySummary {
        id: EntityId::new(id),
        kind,
        artwork_url: artwork_url.map(str::to_owned),
    }
}

pub fn track(id: &str, title: &str, artist: &str) -> Track {
    Track {
        id: EntityId::new(id),
        title: title.to_owned(),
        artist: artist.to_owned(),
        artwork_url: None,
        explicit: false,
        external_urls: Default::default(),
    }
}

pub fn explicit_track(id: &str, title: &str, artist: &str) -> Track {
    Track {
        explicit: true,
        ..track(id, title, artist)
    }
}

pub fn album(id: &str, title: &str, artist: &str) -> Album {
    Album {
        id: EntityId::new(id),
        title: title.to_owned(),
        artist: artist.to_owned(),
        artwork_url: None,
        external_urls: Default::default(),
    }
}

pub fn artist(id: &str, name: &str) -> Artist {
    Artist {
        id: EntityId::new(id),
        name: name.to_owned(),
        artwork_url: None,
        external_urls: Default::default(),
    }
}

pub fn playlist(id: &str, title: &str, owner: &str) -> Playlist {
    Playlist {
        id: EntityId::new(id),
        title: title.to_owned(),
        owner: Some(owner.to_owned()),
        artwork_url: None,
        external_urls: Default::default(),
    }
}

pub fn create_config_memory() -> Config {
    Config::new(StorageBackend::Memory)
}

pub fn create_context(config: Config) -> Context {
    crate::new(config).unwrap()
}

/// Context with `primary` at priority 0 and `secondary` at priority 1.
pub fn create_context_with_providers(
    primary: &ScriptedProvider,
    secondary: &ScriptedProvider,
    clock: &ManualClock,
) -> Context {
    let mut config = create_config_memory().with_clock(clock.clone());
    config
        .register_provider(0, "primary", primary.clone())
        .unwrap();
    config
        .register_provider(1, "secondary", secondary.clone())
        .unwrap();
    create_context(config)
}
