use std::str::FromStr;

use url::Url;

use crate::{EntityId, EntityKind, Error, ErrorKind, Platform, Result};

/// A reference to one entity on one platform, parsed from a share URL or URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentLink {
    pub platform: Platform,
    pub kind: EntityKind,
    pub id: EntityId,
}

impl ContentLink {
    pub fn new(platform: Platform, kind: EntityKind, id: impl Into<EntityId>) -> Self {
        Self {
            platform,
            kind,
            id: id.into(),
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if let Some(rest) = input.strip_prefix("spotify:") {
            return parse_spotify_uri(rest).ok_or_else(|| invalid(input));
        }

        let url = Url::parse(input)
            .map_err(|e| Error::with_source(ErrorKind::Invalid, "invalid content url", e))?;
        let host = url.host_str().unwrap_or_default();
        let host = host.strip_prefix("www.").unwrap_or(host);
        let segments = url
            .path_segments()
            .map(|s| s.filter(|s| !s.is_empty()).collect::<Vec<_>>())
            .unwrap_or_default();

        let link = match host {
            "open.spotify.com" => parse_spotify_path(&segments),
            "deezer.com" => parse_deezer_path(&segments),
            "music.apple.com" => parse_apple_music(&url, &segments),
            "tidal.com" | "listen.tidal.com" => parse_tidal_path(&segments),
            "music.youtube.com" => parse_youtube_music(&url, &segments),
            _ => None,
        };
        link.ok_or_else(|| invalid(input))
    }

    pub fn canonical_url(&self) -> String {
        let id = self.id.as_str();
        match self.platform {
            Platform::Spotify => format!("https://open.spotify.com/{}/{}", self.kind, id),
            Platform::Deezer => format!("https://www.deezer.com/{}/{}", self.kind, id),
            Platform::AppleMusic => match self.kind {
                EntityKind::Track => format!("https://music.apple.com/song/{id}"),
                kind => format!("https://music.apple.com/{kind}/{id}"),
            },
            Platform::Tidal => format!("https://tidal.com/browse/{}/{}", self.kind, id),
            Platform::YoutubeMusic => match self.kind {
                EntityKind::Track => format!("https://music.youtube.com/watch?v={id}"),
                EntityKind::Artist => format!("https://music.youtube.com/channel/{id}"),
                EntityKind::Album | EntityKind::Playlist => {
                    format!("https://music.youtube.com/playlist?list={id}")
                }
            },
        }
    }
}

impl FromStr for ContentLink {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for ContentLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical_url())
    }
}

fn invalid(input: &str) -> Error {
    Error::new(
        ErrorKind::Invalid,
        format!("unrecognized content link: {input}"),
    )
}

fn strict_kind(segment: &str) -> Option<EntityKind> {
    match segment {
        "track" => Some(EntityKind::Track),
        "album" => Some(EntityKind::Album),
        "artist" => Some(EntityKind::Artist),
        "playlist" => Some(EntityKind::Playlist),
        _ => None,
    }
}

fn non_empty_id(id: &str) -> Option<EntityId> {
    let id = id.trim();
    if id.is_empty() {
        return None;
    }
    Some(EntityId::new(id))
}

fn parse_spotify_uri(rest: &str) -> Option<ContentLink> {
    let (kind, id) = rest.split_once(':')?;
    Some(ContentLink {
        platform: Platform::Spotify,
        kind: strict_kind(kind)?,
        id: non_empty_id(id)?,
    })
}

fn parse_spotify_path(segments: &[&str]) -> Option<ContentLink> {
    // localized links look like /intl-de/track/{id}
    let segments = match segments.first() {
        Some(first) if first.starts_with("intl-") => &segments[1..],
        _ => segments,
    };
    match segments {
        [kind, id, ..] => Some(ContentLink {
            platform: Platform::Spotify,
            kind: strict_kind(kind)?,
            id: non_empty_id(id)?,
        }),
        _ => None,
    }
}

fn parse_deezer_path(segments: &[&str]) -> Option<ContentLink> {
    // optional language prefix: /en/album/{id}
    let segments = match segments.first() {
        Some(first) if strict_kind(first).is_none() => &segments[1..],
        _ => segments,
    };
    match segments {
        [kind, id, ..] if id.bytes().all(|b| b.is_ascii_digit()) => Some(ContentLink {
            platform: Platform::Deezer,
            kind: strict_kind(kind)?,
            id: non_empty_id(id)?,
        }),
        _ => None,
    }
}

fn parse_apple_music(url: &Url, segments: &[&str]) -> Option<ContentLink> {
    // /{storefront}/{kind}/{slug}/{id}, the slug is sometimes missing
    let (kind, id) = match segments {
        [_, kind, _, id, ..] | [_, kind, id] => (*kind, *id),
        _ => return None,
    };
    let kind = match kind {
        "song" => EntityKind::Track,
        other => strict_kind(other)?,
    };
    if kind == EntityKind::Album {
        if let Some((_, track_id)) = url.query_pairs().find(|(k, _)| k == "i") {
            return Some(ContentLink {
                platform: Platform::AppleMusic,
                kind: EntityKind::Track,
                id: non_empty_id(&track_id)?,
            });
        }
    }
    Some(ContentLink {
        platform: Platform::AppleMusic,
        kind,
        id: non_empty_id(id)?,
    })
}

fn parse_tidal_path(segments: &[&str]) -> Option<ContentLink> {
    let segments = match segments.first() {
        Some(&"browse") => &segments[1..],
        _ => segments,
    };
    match segments {
        [kind, id, ..] => Some(ContentLink {
            platform: Platform::Tidal,
            kind: strict_kind(kind)?,
            id: non_empty_id(id)?,
        }),
        _ => None,
    }
}

fn parse_youtube_music(url: &Url, segments: &[&str]) -> Option<ContentLink> {
    let query = |key: &str| {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    };
    match segments {
        ["watch"] => Some(ContentLink {
            platform: Platform::YoutubeMusic,
            kind: EntityKind::Track,
            id: non_empty_id(&query("v")?)?,
        }),
        ["playlist"] => {
            let list = query("list")?;
            // album playlists carry the OLAK5uy_ prefix
            let kind = if list.starts_with("OLAK5uy_") {
                EntityKind::Album
            } else {
                EntityKind::Playlist
            };
            Some(ContentLink {
                platform: Platform::YoutubeMusic,
                kind,
                id: non_empty_id(&list)?,
            })
        }
        ["channel", id] => Some(ContentLink {
            platform: Platform::YoutubeMusic,
            kind: EntityKind::Artist,
            id: non_empty_id(id)?,
        }),
        _ => None,
    }
}
