use serde::Deserialize;
use tunelink::{Album, Artist, Error, ErrorKind, ExternalUrls, Platform, Playlist, ResultSet, Track};

/// Deezer answers errors with status 200 and an `error` object in the body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum Envelope<T> {
    Error { error: DeezerError },
    Ok(T),
}

impl<T> Envelope<T> {
    pub fn into_result(self) -> tunelink::Result<T> {
        match self {
            Envelope::Ok(value) => Ok(value),
            Envelope::Error { error } => Err(error.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeezerError {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: u32,
}

const QUOTA_EXCEEDED: u32 = 4;
const INVALID_PARAMETER: u32 = 501;
const DATA_NOT_FOUND: u32 = 800;

impl From<DeezerError> for Error {
    fn from(error: DeezerError) -> Self {
        let kind = match error.code {
            QUOTA_EXCEEDED => ErrorKind::RateLimited,
            DATA_NOT_FOUND => ErrorKind::NotFound,
            INVALID_PARAMETER => ErrorKind::Invalid,
            _ => ErrorKind::Internal,
        };
        Error::new(
            kind,
            format!("deezer {} ({}): {}", error.kind, error.code, error.message),
        )
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArtistRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlbumRef {
    pub cover_xl: Option<String>,
    pub cover_big: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeezerTrack {
    pub id: u64,
    pub title: String,
    pub link: Option<String>,
    #[serde(default)]
    pub explicit_lyrics: bool,
    pub artist: Option<ArtistRef>,
    pub album: Option<AlbumRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeezerAlbum {
    pub id: u64,
    pub title: String,
    pub link: Option<String>,
    pub cover_xl: Option<String>,
    pub cover_big: Option<String>,
    pub artist: Option<ArtistRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeezerArtist {
    pub id: u64,
    pub name: String,
    pub link: Option<String>,
    pub picture_xl: Option<String>,
    pub picture_big: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DeezerPlaylist {
    pub id: u64,
    pub title: String,
    pub link: Option<String>,
    pub picture_xl: Option<String>,
    pub picture_big: Option<String>,
    pub user: Option<UserRef>,
    pub creator: Option<UserRef>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ChartResponse {
    #[serde(default)]
    pub tracks: Page<DeezerTrack>,
    #[serde(default)]
    pub albums: Page<DeezerAlbum>,
    #[serde(default)]
    pub artists: Page<DeezerArtist>,
    #[serde(default)]
    pub playlists: Page<DeezerPlaylist>,
}

fn external_urls(link: Option<String>) -> ExternalUrls {
    let mut external = ExternalUrls::new();
    if let Some(link) = link {
        external.insert(Platform::Deezer.as_str().to_owned(), link);
    }
    external
}

fn artist_name(artist: Option<ArtistRef>) -> String {
    artist.map(|a| a.name).unwrap_or_default()
}

fn non_empty(urls: [Option<String>; 2]) -> Option<String> {
    urls.into_iter().flatten().find(|url| !url.is_empty())
}

impl From<DeezerTrack> for Track {
    fn from(track: DeezerTrack) -> Self {
        Track {
            id: track.id.to_string().into(),
            title: track.title,
            artist: artist_name(track.artist),
            artwork_url: track
                .album
                .and_then(|album| non_empty([album.cover_xl, album.cover_big])),
            explicit: track.explicit_lyrics,
            external_urls: external_urls(track.link),
        }
    }
}

impl From<DeezerAlbum> for Album {
    fn from(album: DeezerAlbum) -> Self {
        Album {
            id: album.id.to_string().into(),
            title: album.title,
            artist: artist_name(album.artist),
            artwork_url: non_empty([album.cover_xl, album.cover_big]),
            external_urls: external_urls(album.link),
        }
    }
}

impl From<DeezerArtist> for Artist {
    fn from(artist: DeezerArtist) -> Self {
        Artist {
            id: artist.id.to_string().into(),
            name: artist.name,
            artwork_url: non_empty([artist.picture_xl, artist.picture_big]),
            external_urls: external_urls(artist.link),
        }
    }
}

impl From<DeezerPlaylist> for Playlist {
    fn from(playlist: DeezerPlaylist) -> Self {
        Playlist {
            id: playlist.id.to_string().into(),
            title: playlist.title,
            owner: playlist.user.or(playlist.creator).map(|u| u.name),
            artwork_url: non_empty([playlist.picture_xl, playlist.picture_big]),
            external_urls: external_urls(playlist.link),
        }
    }
}

impl From<ChartResponse> for ResultSet {
    fn from(chart: ChartResponse) -> Self {
        ResultSet {
            tracks: chart.tracks.data.into_iter().map(Track::from).collect(),
            albums: chart.albums.data.into_iter().map(Album::from).collect(),
            artists: chart.artists.data.into_iter().map(Artist::from).collect(),
            playlists: chart.playlists.data.into_iter().map(Playlist::from).collect(),
        }
    }
}
