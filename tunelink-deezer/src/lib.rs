use serde::de::DeserializeOwned;
use tunelink::{
    Album, Artist, CatalogEntity, ContentLink, EntityKind, Error, ErrorKind, Platform, Playlist,
    Result, ResultSet, SearchQuery, Track,
};

mod model;
use model::*;

mod rate_limiter;
pub use rate_limiter::RateLimiter;

const API_BASE: &str = "https://api.deezer.com";
const SEARCH_LIMIT: u32 = 20;
/// Deezer allows 50 requests per 5 seconds per client.
pub const DEFAULT_REQUESTS_PER_SECOND: f32 = 8.0;

#[derive(Debug, Clone)]
pub struct DeezerClient {
    client: reqwest::Client,
    limiter: RateLimiter,
}

impl Default for DeezerClient {
    fn default() -> Self {
        Self::new(RateLimiter::new(DEFAULT_REQUESTS_PER_SECOND))
    }
}

impl DeezerClient {
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            client: reqwest::Client::new(),
            limiter,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        tracing::trace!("waiting for rate limiter");
        self.limiter.request().await;

        let response = self
            .client
            .get(format!("{API_BASE}{path}"))
            .query(query)
            .send()
            .await
            .map_err(Error::wrap)?;
        let status = response.status();
        if !status.is_success() {
            let kind = match status {
                reqwest::StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
                reqwest::StatusCode::NOT_FOUND => ErrorKind::NotFound,
                _ => ErrorKind::Internal,
            };
            return Err(Error::new(
                kind,
                format!("deezer request to {path} failed with {status}"),
            ));
        }

        let content = response.text().await.map_err(Error::wrap)?;
        tracing::trace!("deezer response: {content}");
        let envelope: Envelope<T> = serde_json::from_str(&content).map_err(|e| {
            Error::with_source(
                ErrorKind::Internal,
                format!("unexpected deezer response from {path}"),
                e,
            )
        })?;
        envelope.into_result()
    }

    async fn search_kind(&self, text: &str, kind: EntityKind) -> Result<ResultSet> {
        let path = format!("/search/{}", kind.as_str());
        let query = [("q", text.to_owned()), ("limit", SEARCH_LIMIT.to_string())];
        let mut results = ResultSet::default();
        match kind {
            EntityKind::Track => {
                let page: Page<DeezerTrack> = self.get(&path, &query).await?;
                results.tracks = page.data.into_iter().map(Track::from).collect();
            }
            EntityKind::Album => {
                let page: Page<DeezerAlbum> = self.get(&path, &query).await?;
                results.albums = page.data.into_iter().map(Album::from).collect();
            }
            EntityKind::Artist => {
                let page: Page<DeezerArtist> = self.get(&path, &query).await?;
                results.artists = page.data.into_iter().map(Artist::from).collect();
            }
            EntityKind::Playlist => {
                let page: Page<DeezerPlaylist> = self.get(&path, &query).await?;
                results.playlists = page.data.into_iter().map(Playlist::from).collect();
            }
        }
        Ok(results)
    }
}

fn merge(partials: Vec<ResultSet>) -> ResultSet {
    partials
        .into_iter()
        .fold(ResultSet::default(), |mut merged, partial| {
            merged.tracks.extend(partial.tracks);
            merged.albums.extend(partial.albums);
            merged.artists.extend(partial.artists);
            merged.playlists.extend(partial.playlists);
            merged
        })
}

#[tunelink::async_trait]
impl tunelink::ProviderClient for DeezerClient {
    #[tracing::instrument(skip(self))]
    async fn search(&self, query: &SearchQuery) -> Result<ResultSet> {
        if query.text.trim().is_empty() {
            return Ok(ResultSet::default());
        }
        let kinds = query.kinds();
        let searches = kinds
            .iter()
            .map(|kind| self.search_kind(&query.text, *kind));
        let partials = futures::future::try_join_all(searches).await?;
        Ok(merge(partials))
    }

    #[tracing::instrument(skip(self))]
    async fn top_charts(&self) -> Result<ResultSet> {
        let chart: ChartResponse = self.get("/chart/0", &[]).await?;
        Ok(ResultSet::from(chart))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_entity(&self, link: &ContentLink) -> Result<Option<CatalogEntity>> {
        if link.platform != Platform::Deezer {
            return Ok(None);
        }
        let path = format!("/{}/{}", link.kind.as_str(), link.id);
        let entity = match link.kind {
            EntityKind::Track => {
                CatalogEntity::Track(Track::from(self.get::<DeezerTrack>(&path, &[]).await?))
            }
            EntityKind::Album => {
                CatalogEntity::Album(Album::from(self.get::<DeezerAlbum>(&path, &[]).await?))
            }
            EntityKind::Artist => {
                CatalogEntity::Artist(Artist::from(self.get::<DeezerArtist>(&path, &[]).await?))
            }
            EntityKind::Playlist => CatalogEntity::Playlist(Playlist::from(
                self.get::<DeezerPlaylist>(&path, &[]).await?,
            )),
        };
        Ok(Some(entity))
    }
}
