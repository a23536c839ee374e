use std::{
    sync::{Arc, Mutex, Weak},
    time::Duration,
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};

use crate::{
    provider::RegisteredProvider, ChartsUnavailableError, Clock, Error, ResultSet, Timestamp,
};

pub const DEFAULT_CHARTS_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry<T> {
    pub value: T,
    pub fetched_at: Timestamp,
}

impl<T> CacheEntry<T> {
    pub fn age(&self, now: Timestamp) -> Duration {
        now.duration_since(self.fetched_at)
    }

    pub fn is_fresh(&self, now: Timestamp, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

type ChartsFetch = Shared<BoxFuture<'static, Result<ResultSet, Arc<Error>>>>;

#[derive(Default)]
struct State {
    entry: Option<CacheEntry<ResultSet>>,
    inflight: Option<ChartsFetch>,
}

struct Inner {
    provider: RegisteredProvider,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    state: Mutex<State>,
}

/// Time-boxed cache around one provider's top charts.
///
/// Fresh entries are served without touching the provider. Once expired, the next caller
/// refreshes synchronously; concurrent callers share that single upstream fetch. A failed
/// refresh serves the previous value, however old, and only fails when nothing was ever cached.
#[derive(Clone)]
pub struct ChartsCache(Arc<Inner>);

impl std::fmt::Debug for ChartsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartsCache")
            .field("provider", &self.0.provider.identifier())
            .field("ttl", &self.0.ttl)
            .finish()
    }
}

impl ChartsCache {
    pub(crate) fn new(provider: RegisteredProvider, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self(Arc::new(Inner {
            provider,
            clock,
            ttl,
            state: Default::default(),
        }))
    }

    pub fn ttl(&self) -> Duration {
        self.0.ttl
    }

    /// The cached entry, fresh or not, without fetching.
    pub fn cached(&self) -> Option<CacheEntry<ResultSet>> {
        self.0.lock().entry.clone()
    }

    #[tracing::instrument(skip(self))]
    pub async fn top_charts(&self) -> Result<ResultSet, ChartsUnavailableError> {
        let fetch = {
            let mut state = self.0.lock();
            let now = self.0.clock.now();
            if let Some(entry) = state.entry.as_ref() {
                if entry.is_fresh(now, self.0.ttl) {
                    return Ok(entry.value.clone());
                }
            }
            match state.inflight.as_ref() {
                Some(fetch) => fetch.clone(),
                None => {
                    let fetch = Inner::fetch(Arc::downgrade(&self.0), self.0.provider.clone())
                        .boxed()
                        .shared();
                    state.inflight = Some(fetch.clone());
                    fetch
                }
            }
        };

        match fetch.await {
            Ok(value) => Ok(value),
            Err(err) => match self.cached() {
                Some(stale) => {
                    tracing::warn!(
                        "serving stale charts fetched at {}s: {}",
                        stale.fetched_at.seconds(),
                        err
                    );
                    Ok(stale.value)
                }
                None => Err(ChartsUnavailableError::new(err)),
            },
        }
    }
}

impl Inner {
    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // the pending fetch lives in `State::inflight`, so it only holds a weak handle back
    async fn fetch(
        inner: Weak<Self>,
        provider: RegisteredProvider,
    ) -> Result<ResultSet, Arc<Error>> {
        tracing::debug!("fetching top charts from {}", provider.identifier());
        let result = provider.top_charts().await;
        if let Err(err) = &result {
            tracing::warn!(
                "failed to fetch top charts from {}: {}",
                provider.identifier(),
                err
            );
        }
        let Some(inner) = inner.upgrade() else {
            return result.map_err(Arc::new);
        };
        let mut state = inner.lock();
        state.inflight = None;
        let value = result.map_err(Arc::new)?;
        state.entry = Some(CacheEntry {
            value: value.clone(),
            fetched_at: inner.clock.now(),
        });
        Ok(value)
    }
}
