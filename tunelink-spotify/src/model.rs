use serde::Deserialize;
use tunelink::{Album, Artist, ExternalUrls, Platform, Playlist, ResultSet, Track};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Image {
    pub url: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Urls {
    pub spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlbumRef {
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyTrack {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    pub album: Option<AlbumRef>,
    #[serde(default)]
    pub explicit: bool,
    #[serde(default)]
    pub external_urls: Urls,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyAlbum {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistRef>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub external_urls: Urls,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyArtist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub external_urls: Urls,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Owner {
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    pub owner: Option<Owner>,
    // the playlist endpoints return null instead of an empty list
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<Image>,
    #[serde(default)]
    pub external_urls: Urls,
}

/// Spotify pages may contain `null` items, which are dropped on conversion.
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<Option<T>>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Page<T> {
    pub fn into_items(self) -> impl Iterator<Item = T> {
        self.items.into_iter().flatten()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub tracks: Page<SpotifyTrack>,
    #[serde(default)]
    pub albums: Page<SpotifyAlbum>,
    #[serde(default)]
    pub artists: Page<SpotifyArtist>,
    #[serde(default)]
    pub playlists: Page<SpotifyPlaylist>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistItem {
    pub track: Option<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn first_image(images: &[Image]) -> Option<String> {
    images.first().map(|i| i.url.clone())
}

fn first_artist(artists: &[ArtistRef]) -> String {
    artists.first().map(|a| a.name.clone()).unwrap_or_default()
}

fn external_urls(urls: Urls) -> ExternalUrls {
    let mut external = ExternalUrls::new();
    if let Some(url) = urls.spotify {
        external.insert(Platform::Spotify.as_str().to_owned(), url);
    }
    external
}

impl SpotifyTrack {
    /// Local files in playlists have no id and are skipped.
    pub fn into_track(self) -> Option<Track> {
        let id = self.id?;
        Some(Track {
            id: id.into(),
            artist: first_artist(&self.artists),
            artwork_url: self.album.as_ref().and_then(|a| first_image(&a.images)),
            title: self.name,
            explicit: self.explicit,
            external_urls: external_urls(self.external_urls),
        })
    }
}

impl From<SpotifyAlbum> for Album {
    fn from(album: SpotifyAlbum) -> Self {
        Album {
            id: album.id.into(),
            artist: first_artist(&album.artists),
            artwork_url: first_image(&album.images),
            title: album.name,
            external_urls: external_urls(album.external_urls),
        }
    }
}

impl From<SpotifyArtist> for Artist {
    fn from(artist: SpotifyArtist) -> Self {
        Artist {
            id: artist.id.into(),
            artwork_url: first_image(&artist.images),
            name: artist.name,
            external_urls: external_urls(artist.external_urls),
        }
    }
}

impl From<SpotifyPlaylist> for Playlist {
    fn from(playlist: SpotifyPlaylist) -> Self {
        Playlist {
            id: playlist.id.into(),
            owner: playlist.owner.and_then(|o| o.display_name),
            artwork_url: first_image(&playlist.images),
            title: playlist.name,
            external_urls: external_urls(playlist.external_urls),
        }
    }
}

impl From<SearchResponse> for ResultSet {
    fn from(response: SearchResponse) -> Self {
        ResultSet {
            tracks: response
                .tracks
                .into_items()
                .filter_map(SpotifyTrack::into_track)
                .collect(),
            albums: response.albums.into_items().map(Album::from).collect(),
            artists: response.artists.into_items().map(Artist::from).collect(),
            playlists: response.playlists.into_items().map(Playlist::from).collect(),
        }
    }
}

pub(crate) fn chart_tracks(page: Page<PlaylistItem>) -> ResultSet {
    ResultSet {
        tracks: page
            .into_items()
            .filter_map(|item| item.track)
            .filter_map(SpotifyTrack::into_track)
            .collect(),
        ..Default::default()
    }
}
