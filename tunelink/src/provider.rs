use std::sync::Arc;

use crate::{async_trait, CatalogEntity, ContentLink, Result, ResultSet, SearchQuery};

// a provider is one upstream music catalog:
// - it owns its own authentication and token refresh.
// - it translates upstream responses into the canonical ResultSet.
// - zero results is a valid empty ResultSet, never an error.
// - link resolution is optional, providers return None for platforms they don't serve.

#[async_trait]
pub trait ProviderClient: Send + Sync + 'static {
    async fn search(&self, query: &SearchQuery) -> Result<ResultSet>;
    async fn top_charts(&self) -> Result<ResultSet>;
    async fn fetch_entity(&self, _link: &ContentLink) -> Result<Option<CatalogEntity>> {
        Ok(None)
    }
}

#[derive(Clone)]
pub(crate) struct RegisteredProvider {
    priority: u32,
    identifier: String,
    client: Arc<dyn ProviderClient>,
}

impl std::fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("priority", &self.priority)
            .field("identifier", &self.identifier)
            .finish()
    }
}

impl RegisteredProvider {
    pub fn from_arc(
        priority: u32,
        identifier: impl Into<String>,
        client: Arc<dyn ProviderClient>,
    ) -> Self {
        Self {
            priority,
            identifier: identifier.into(),
            client,
        }
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<ResultSet> {
        self.client.search(query).await
    }

    pub async fn top_charts(&self) -> Result<ResultSet> {
        self.client.top_charts().await
    }

    pub async fn fetch_entity(&self, link: &ContentLink) -> Result<Option<CatalogEntity>> {
        self.client.fetch_entity(link).await
    }
}
