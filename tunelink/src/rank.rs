use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Album, Artist, EntityId, EntityKind, ExternalUrls, Playlist, ResultSet, Track};

pub const MAX_RANKED_ITEMS: usize = 50;
pub const MAX_PRIORITY_ALBUMS: usize = 3;
/// Shortest side allowed in a substring artist match.
pub const MIN_PARTIAL_MATCH_CHARS: usize = 3;

/// Display projection of one catalog entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedItem {
    pub kind: EntityKind,
    pub id: EntityId,
    pub title: String,
    pub subtitle: Option<String>,
    pub artwork_url: Option<String>,
    pub explicit: bool,
    pub external_urls: ExternalUrls,
}

impl From<&Track> for RankedItem {
    fn from(track: &Track) -> Self {
        Self {
            kind: EntityKind::Track,
            id: track.id.clone(),
            title: track.title.clone(),
            subtitle: Some(track.artist.clone()),
            artwork_url: track.artwork_url.clone(),
            explicit: track.explicit,
            external_urls: track.external_urls.clone(),
        }
    }
}

impl From<&Album> for RankedItem {
    fn from(album: &Album) -> Self {
        Self {
            kind: EntityKind::Album,
            id: album.id.clone(),
            title: album.title.clone(),
            subtitle: Some(album.artist.clone()),
            artwork_url: album.artwork_url.clone(),
            explicit: false,
            external_urls: album.external_urls.clone(),
        }
    }
}

impl From<&Artist> for RankedItem {
    fn from(artist: &Artist) -> Self {
        Self {
            kind: EntityKind::Artist,
            id: artist.id.clone(),
            title: artist.name.clone(),
            subtitle: None,
            artwork_url: artist.artwork_url.clone(),
            explicit: false,
            external_urls: artist.external_urls.clone(),
        }
    }
}

impl From<&Playlist> for RankedItem {
    fn from(playlist: &Playlist) -> Self {
        Self {
            kind: EntityKind::Playlist,
            id: playlist.id.clone(),
            title: playlist.title.clone(),
            subtitle: playlist.owner.clone(),
            artwork_url: playlist.artwork_url.clone(),
            explicit: false,
            external_urls: playlist.external_urls.clone(),
        }
    }
}

/// Lowercases, drops punctuation and collapses whitespace.
pub fn normalize(value: &str) -> String {
    let mut normalized = String::with_capacity(value.len());
    for word in value
        .split_whitespace()
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
    {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        normalized.push_str(&word);
    }
    normalized
}

/// Whether a normalized artist name matches a normalized query.
///
/// Exact equality always matches. Containment in either direction matches only when the
/// contained side has at least [`MIN_PARTIAL_MATCH_CHARS`] characters.
pub fn artist_matches(artist: &str, query: &str) -> bool {
    if artist.is_empty() || query.is_empty() {
        return false;
    }
    if artist == query {
        return true;
    }
    let long_enough = |s: &str| s.chars().count() >= MIN_PARTIAL_MATCH_CHARS;
    (long_enough(query) && artist.contains(query))
        || (long_enough(artist) && query.contains(artist))
}

/// Collapses explicit/clean editions of the same track, keeping first-seen group order.
pub fn dedup_tracks(tracks: &[Track]) -> Vec<&Track> {
    let mut kept: Vec<&Track> = Vec::with_capacity(tracks.len());
    let mut groups: HashMap<(String, String), usize> = HashMap::new();
    for track in tracks {
        let key = (normalize(&track.title), normalize(&track.artist));
        match groups.get(&key) {
            Some(&index) => {
                if track.explicit && !kept[index].explicit {
                    kept[index] = track;
                }
            }
            None => {
                groups.insert(key, kept.len());
                kept.push(track);
            }
        }
    }
    kept
}

/// Merges a result set into one ordered, deduplicated list of at most [`MAX_RANKED_ITEMS`].
///
/// With a query: matching artists, up to [`MAX_PRIORITY_ALBUMS`] of their albums, tracks,
/// the remaining albums, the remaining artists, then playlists. Without one: tracks,
/// albums, artists, playlists.
pub fn rank(results: &ResultSet, query: &str) -> Vec<RankedItem> {
    let tracks = dedup_tracks(&results.tracks);
    let query = normalize(query);
    let mut ranked: Vec<RankedItem> = Vec::with_capacity(results.len().min(MAX_RANKED_ITEMS));

    if query.is_empty() {
        ranked.extend(tracks.into_iter().map(RankedItem::from));
        ranked.extend(results.albums.iter().map(RankedItem::from));
        ranked.extend(results.artists.iter().map(RankedItem::from));
        ranked.extend(results.playlists.iter().map(RankedItem::from));
        ranked.truncate(MAX_RANKED_ITEMS);
        return ranked;
    }

    let (matching, other): (Vec<&Artist>, Vec<&Artist>) = results
        .artists
        .iter()
        .partition(|artist| artist_matches(&normalize(&artist.name), &query));
    let matching_names = matching
        .iter()
        .map(|artist| normalize(&artist.name))
        .collect::<Vec<_>>();

    let mut priority = vec![false; results.albums.len()];
    let mut priority_count = 0;
    for (index, album) in results.albums.iter().enumerate() {
        if priority_count == MAX_PRIORITY_ALBUMS {
            break;
        }
        let artist = normalize(&album.artist);
        if matching_names.iter().any(|name| *name == artist) {
            priority[index] = true;
            priority_count += 1;
        }
    }

    ranked.extend(matching.into_iter().map(RankedItem::from));
    ranked.extend(
        results
            .albums
            .iter()
            .zip(priority.iter())
            .filter(|(_, p)| **p)
            .map(|(album, _)| RankedItem::from(album)),
    );
    ranked.extend(tracks.into_iter().map(RankedItem::from));
    ranked.extend(
        results
            .albums
            .iter()
            .zip(priority.iter())
            .filter(|(_, p)| !**p)
            .map(|(album, _)| RankedItem::from(album)),
    );
    ranked.extend(other.into_iter().map(RankedItem::from));
    ranked.extend(results.playlists.iter().map(RankedItem::from));
    ranked.truncate(MAX_RANKED_ITEMS);
    ranked
}
