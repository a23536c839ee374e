use serde::de::DeserializeOwned;
use tunelink::{
    Album, Artist, CatalogEntity, ContentLink, EntityKind, Error, ErrorKind, Platform, Playlist,
    Result, ResultSet, SearchQuery,
};

mod model;
use model::*;

mod token;
use token::TokenCache;

const API_BASE: &str = "https://api.spotify.com/v1";
const SEARCH_LIMIT: u32 = 20;
/// Spotify's editorial "Top 50 - Global" playlist.
pub const GLOBAL_TOP_50_PLAYLIST: &str = "37i9dQZEVXbMDoHdvVmB8g";

#[derive(Debug)]
pub struct SpotifyClient {
    client: reqwest::Client,
    token: TokenCache,
    market: Option<String>,
    charts_playlist: String,
}

impl SpotifyClient {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: TokenCache::new(client_id.into(), client_secret.into()),
            market: None,
            charts_playlist: GLOBAL_TOP_50_PLAYLIST.to_owned(),
        }
    }

    /// ISO 3166-1 alpha-2 country code restricting results to what is playable there.
    pub fn with_market(mut self, market: impl Into<String>) -> Self {
        self.market = Some(market.into());
        self
    }

    pub fn with_charts_playlist(mut self, playlist_id: impl Into<String>) -> Self {
        self.charts_playlist = playlist_id.into();
        self
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let token = self.token.get(&self.client).await?;
        let mut request = self
            .client
            .get(format!("{API_BASE}{path}"))
            .bearer_auth(token)
            .query(query);
        if let Some(market) = &self.market {
            request = request.query(&[("market", market)]);
        }

        let response = request.send().await.map_err(Error::wrap)?;
        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(Error::wrap);
        }

        let kind = match status {
            reqwest::StatusCode::UNAUTHORIZED => {
                tracing::debug!("spotify rejected the access token");
                self.token.invalidate().await;
                ErrorKind::Unauthorized
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
            reqwest::StatusCode::NOT_FOUND => ErrorKind::NotFound,
            reqwest::StatusCode::BAD_REQUEST => ErrorKind::Invalid,
            _ => ErrorKind::Internal,
        };
        Err(Error::new(
            kind,
            format!("spotify request to {path} failed with {status}"),
        ))
    }
}

fn search_type(kinds: &[EntityKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

#[tunelink::async_trait]
impl tunelink::ProviderClient for SpotifyClient {
    #[tracing::instrument(skip(self))]
    async fn search(&self, query: &SearchQuery) -> Result<ResultSet> {
        if query.text.trim().is_empty() {
            return Ok(ResultSet::default());
        }
        let response: SearchResponse = self
            .get(
                "/search",
                &[
                    ("q", query.text.clone()),
                    ("type", search_type(&query.kinds())),
                    ("limit", SEARCH_LIMIT.to_string()),
                ],
            )
            .await?;
        Ok(ResultSet::from(response))
    }

    #[tracing::instrument(skip(self))]
    async fn top_charts(&self) -> Result<ResultSet> {
        let page: Page<PlaylistItem> = self
            .get(
                &format!("/playlists/{}/tracks", self.charts_playlist),
                &[("limit", "50".to_owned())],
            )
            .await?;
        Ok(chart_tracks(page))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_entity(&self, link: &ContentLink) -> Result<Option<CatalogEntity>> {
        if link.platform != Platform::Spotify {
            return Ok(None);
        }
        let id = link.id.as_str();
        let entity = match link.kind {
            EntityKind::Track => {
                let track: SpotifyTrack = self.get(&format!("/tracks/{id}"), &[]).await?;
                let track = track.into_track().ok_or_else(|| {
                    Error::new(ErrorKind::NotFound, format!("spotify track {id} has no id"))
                })?;
                CatalogEntity::Track(track)
            }
            EntityKind::Album => {
                let album: SpotifyAlbum = self.get(&format!("/albums/{id}"), &[]).await?;
                CatalogEntity::Album(Album::from(album))
            }
            EntityKind::Artist => {
                let artist: SpotifyArtist = self.get(&format!("/artists/{id}"), &[]).await?;
                CatalogEntity::Artist(Artist::from(artist))
            }
            EntityKind::Playlist => {
                let playlist: SpotifyPlaylist =
                    self.get(&format!("/playlists/{id}"), &[]).await?;
                CatalogEntity::Playlist(Playlist::from(playlist))
            }
        };
        Ok(Some(entity))
    }
}
