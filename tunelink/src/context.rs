use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::{
    aggregator::SearchAggregator,
    backfill::{
        ArtworkStore, BackfillConfig, EntityDetailFetcher, EntityLister, MetadataBackfillCache,
        DEFAULT_ARTWORK_CAPACITY, DEFAULT_BACKFILL_TIMEOUT,
    },
    charts::{ChartsCache, DEFAULT_CHARTS_TTL},
    persistence::{DurablePersistence, FilesystemPersistence, MemoryPersistence},
    provider::{ProviderClient, RegisteredProvider},
    Clock, Error, ErrorKind, Result, SystemClock,
};

#[derive(Debug, Default, Clone)]
pub enum StorageBackend {
    #[default]
    Memory,
    Filesystem {
        path: PathBuf,
    },
    /// Any other store, such as an embedded kv store or a remote cache.
    Custom(Arc<dyn DurablePersistence>),
}

#[derive(Debug)]
pub struct Config {
    storage_backend: StorageBackend,
    providers: Vec<RegisteredProvider>,
    clock: Arc<dyn Clock>,
    charts_ttl: Duration,
    charts_provider: Option<String>,
    artwork_capacity: usize,
    backfill_timeout: Duration,
    session_id: Option<String>,
}

impl Config {
    pub fn new(storage_backend: StorageBackend) -> Self {
        Self {
            storage_backend,
            providers: Vec::new(),
            clock: Arc::new(SystemClock),
            charts_ttl: DEFAULT_CHARTS_TTL,
            charts_provider: None,
            artwork_capacity: DEFAULT_ARTWORK_CAPACITY,
            backfill_timeout: DEFAULT_BACKFILL_TIMEOUT,
            session_id: None,
        }
    }

    /// Lower priority values are attempted first.
    pub fn register_provider(
        &mut self,
        priority: u32,
        name: impl Into<String>,
        client: impl ProviderClient,
    ) -> Result<()> {
        self.register_provider_arc(priority, name, Arc::new(client))
    }

    pub fn register_provider_arc(
        &mut self,
        priority: u32,
        name: impl Into<String>,
        client: Arc<dyn ProviderClient>,
    ) -> Result<()> {
        let name = name.into();
        if self.providers.iter().any(|p| p.identifier() == name) {
            return Err(Error::new(
                ErrorKind::Invalid,
                format!("provider {name} already registered"),
            ));
        }
        self.providers
            .push(RegisteredProvider::from_arc(priority, name, client));
        Ok(())
    }

    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_charts_ttl(mut self, ttl: Duration) -> Self {
        self.charts_ttl = ttl;
        self
    }

    /// Defaults to the provider with the lowest priority value.
    pub fn with_charts_provider(mut self, name: impl Into<String>) -> Self {
        self.charts_provider = Some(name.into());
        self
    }

    pub fn with_artwork_capacity(mut self, capacity: usize) -> Self {
        self.artwork_capacity = capacity;
        self
    }

    pub fn with_backfill_timeout(mut self, timeout: Duration) -> Self {
        self.backfill_timeout = timeout;
        self
    }

    /// Scopes the "owner already prefetched" markers. Defaults to a fresh id per context.
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct Context {
    search: Arc<SearchAggregator>,
    charts: ChartsCache,
    clock: Arc<dyn Clock>,
    artwork: Arc<ArtworkStore>,
}

pub fn new(config: Config) -> Result<Context> {
    let persistence = match config.storage_backend {
        StorageBackend::Memory => {
            Arc::new(MemoryPersistence::default()) as Arc<dyn DurablePersistence>
        }
        StorageBackend::Filesystem { ref path } => {
            Arc::new(FilesystemPersistence::new(path.clone())) as Arc<dyn DurablePersistence>
        }
        StorageBackend::Custom(ref persistence) => persistence.clone(),
    };

    let search = SearchAggregator::new(config.providers)?;
    let charts_provider = match config.charts_provider {
        Some(ref name) => search.provider(name).ok_or_else(|| {
            Error::new(
                ErrorKind::Invalid,
                format!("charts provider {name} is not registered"),
            )
        })?,
        None => search.primary(),
    };
    tracing::info!(
        "charts served by {} with ttl {:?}",
        charts_provider.identifier(),
        config.charts_ttl
    );
    let charts = ChartsCache::new(charts_provider, config.clock.clone(), config.charts_ttl);

    let session_id = config
        .session_id
        .unwrap_or_else(|| ulid::Ulid::new().to_string());

    Ok(Context {
        search: Arc::new(search),
        charts,
        clock: config.clock,
        artwork: Arc::new(ArtworkStore::new(
            persistence,
            BackfillConfig {
                capacity: config.artwork_capacity,
                detail_timeout: config.backfill_timeout,
                session_id,
            },
        )),
    })
}

impl Context {
    pub fn search(&self) -> &SearchAggregator {
        &self.search
    }

    pub fn charts(&self) -> &ChartsCache {
        &self.charts
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn session_id(&self) -> &str {
        self.artwork.session_id()
    }

    /// Builds an artwork cache over this context's artwork store.
    ///
    /// Every cache built from one context shares the same entries and prefetch markers.
    pub fn artwork_cache(
        &self,
        lister: impl EntityLister,
        fetcher: impl EntityDetailFetcher,
    ) -> MetadataBackfillCache {
        MetadataBackfillCache::new(self.artwork.clone(), Arc::new(lister), Arc::new(fetcher))
    }
}
