use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use crate::{
    provider::RegisteredProvider, AllProvidersFailedError, CatalogEntity, ContentLink, Error,
    ErrorKind, Result, ResultSet, SearchError, SearchQuery,
};

#[derive(Debug)]
struct Active {
    generation: u64,
    token: CancellationToken,
}

/// Searches the registered providers in priority order, falling back on failure.
///
/// At most one search is active per aggregator. Starting a search supersedes the previous one:
/// the superseded search stops waiting on its provider and resolves to [`SearchError::Cancelled`].
#[derive(Debug)]
pub struct SearchAggregator {
    providers: Vec<RegisteredProvider>,
    active: Mutex<Active>,
}

impl SearchAggregator {
    pub(crate) fn new(mut providers: Vec<RegisteredProvider>) -> Result<Self> {
        if providers.is_empty() {
            return Err(Error::new(
                ErrorKind::Invalid,
                "search aggregator requires at least one provider",
            ));
        }
        providers.sort_by_key(|p| p.priority());
        Ok(Self {
            providers,
            active: Mutex::new(Active {
                generation: 0,
                token: CancellationToken::new(),
            }),
        })
    }

    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.identifier())
    }

    pub(crate) fn provider(&self, identifier: &str) -> Option<RegisteredProvider> {
        self.providers
            .iter()
            .find(|p| p.identifier() == identifier)
            .cloned()
    }

    pub(crate) fn primary(&self) -> RegisteredProvider {
        // non-empty, checked in new
        self.providers[0].clone()
    }

    #[tracing::instrument(skip(self))]
    pub async fn search(&self, query: &SearchQuery) -> Result<ResultSet, SearchError> {
        let (generation, token) = self.begin();
        let mut failures = Vec::with_capacity(self.providers.len());

        for provider in self.providers.iter() {
            if !self.is_current(generation) {
                tracing::debug!("search superseded before trying {}", provider.identifier());
                return Err(SearchError::Cancelled);
            }

            let result = tokio::select! {
                _ = token.cancelled() => return Err(SearchError::Cancelled),
                result = provider.search(query) => result,
            };

            match result {
                Ok(results) => {
                    tracing::debug!(
                        "provider {} returned {} results",
                        provider.identifier(),
                        results.len()
                    );
                    return Ok(results);
                }
                Err(err) => {
                    tracing::warn!("provider {} failed to search: {}", provider.identifier(), err);
                    failures.push((provider.identifier().to_owned(), err));
                }
            }
        }

        if !self.is_current(generation) {
            return Err(SearchError::Cancelled);
        }
        Err(AllProvidersFailedError::new(failures).into())
    }

    /// Resolves a share URL or URI against the first provider that serves its platform.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, url: &str) -> Result<CatalogEntity> {
        let link = ContentLink::parse(url)?;
        for provider in self.providers.iter() {
            match provider.fetch_entity(&link).await {
                Ok(Some(entity)) => return Ok(entity),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        "provider {} failed to resolve {}: {}",
                        provider.identifier(),
                        link,
                        err
                    );
                }
            }
        }
        Err(Error::new(
            ErrorKind::NotFound,
            format!("no provider could resolve {link}"),
        ))
    }

    /// Supersedes any active search without starting a new one.
    pub fn close(&self) {
        self.begin();
    }

    fn begin(&self) -> (u64, CancellationToken) {
        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.token.cancel();
        active.generation += 1;
        active.token = CancellationToken::new();
        (active.generation, active.token.clone())
    }

    fn is_current(&self, generation: u64) -> bool {
        let active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        active.generation == generation
    }
}
