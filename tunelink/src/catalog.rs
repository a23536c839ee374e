use std::{collections::BTreeMap, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, ErrorKind};

/// Platform name to canonical URL on that platform.
pub type ExternalUrls = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Track,
    Album,
    Artist,
    Playlist,
}

impl EntityKind {
    pub const ALL: [EntityKind; 4] = [Self::Track, Self::Album, Self::Artist, Self::Playlist];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Playlist => "playlist",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "track" | "song" => Ok(Self::Track),
            "album" => Ok(Self::Album),
            "artist" => Ok(Self::Artist),
            "playlist" => Ok(Self::Playlist),
            _ => Err(Error::new(
                ErrorKind::Invalid,
                format!("invalid entity kind: {s}"),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Spotify,
    AppleMusic,
    Deezer,
    Tidal,
    YoutubeMusic,
}

impl Platform {
    /// Fixed precedence used wherever several platforms may answer the same question.
    pub const PRECEDENCE: [Platform; 5] = [
        Self::Spotify,
        Self::AppleMusic,
        Self::Deezer,
        Self::Tidal,
        Self::YoutubeMusic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spotify => "spotify",
            Self::AppleMusic => "apple_music",
            Self::Deezer => "deezer",
            Self::Tidal => "tidal",
            Self::YoutubeMusic => "youtube_music",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::PRECEDENCE
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| Error::new(ErrorKind::Invalid, format!("unknown platform: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: EntityId,
    pub title: String,
    pub artist: String,
    pub artwork_url: Option<String>,
    pub explicit: bool,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: EntityId,
    pub title: String,
    pub artist: String,
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: EntityId,
    pub name: String,
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: EntityId,
    pub title: String,
    pub owner: Option<String>,
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CatalogEntity {
    Track(Track),
    Album(Album),
    Artist(Artist),
    Playlist(Playlist),
}

impl CatalogEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Track(_) => EntityKind::Track,
            Self::Album(_) => EntityKind::Album,
            Self::Artist(_) => EntityKind::Artist,
            Self::Playlist(_) => EntityKind::Playlist,
        }
    }

    pub fn id(&self) -> &EntityId {
        match self {
            Self::Track(track) => &track.id,
            Self::Album(album) => &album.id,
            Self::Artist(artist) => &artist.id,
            Self::Playlist(playlist) => &playlist.id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Track(track) => &track.title,
            Self::Album(album) => &album.title,
            Self::Artist(artist) => &artist.name,
            Self::Playlist(playlist) => &playlist.title,
        }
    }
}

impl From<Track> for CatalogEntity {
    fn from(track: Track) -> Self {
        Self::Track(track)
    }
}

impl From<Album> for CatalogEntity {
    fn from(album: Album) -> Self {
        Self::Album(album)
    }
}

impl From<Artist> for CatalogEntity {
    fn from(artist: Artist) -> Self {
        Self::Artist(artist)
    }
}

impl From<Playlist> for CatalogEntity {
    fn from(playlist: Playlist) -> Self {
        Self::Playlist(playlist)
    }
}

/// The outcome of exactly one provider call. Never mutated once returned.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub tracks: Vec<Track>,
    pub albums: Vec<Album>,
    pub artists: Vec<Artist>,
    pub playlists: Vec<Playlist>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.tracks.len() + self.albums.len() + self.artists.len() + self.playlists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub kind: Option<EntityKind>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: EntityKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Entity kinds a provider should ask its upstream for.
    pub fn kinds(&self) -> Vec<EntityKind> {
        match self.kind {
            Some(kind) => vec![kind],
            None => EntityKind::ALL.to_vec(),
        }
    }
}

impl FromStr for SearchQuery {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}
