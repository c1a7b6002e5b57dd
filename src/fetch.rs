use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::FetchError;
use crate::spotify::id::TrackId;
use crate::spotify::model::{Image, PlayedItem, Track};
use crate::spotify::{Session, SpotifyApi, TimeRange, MAX_LIMIT};

/// Smallest cover height considered sharp enough for the card.
pub const MIN_COVER_HEIGHT: u32 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackSource {
    #[default]
    RecentlyPlayed,
    TopTracks(TimeRange),
}

impl TrackSource {
    pub fn label(&self) -> &'static str {
        match self {
            TrackSource::RecentlyPlayed => "recently played",
            TrackSource::TopTracks(_) => "top",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEntry {
    pub id: String,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub popularity: u32,
    pub external_url: Option<String>,
    pub preview_url: Option<String>,
    pub played_at: Option<DateTime<Utc>>,
    pub cover_url: Option<String>,
}

impl TrackEntry {
    fn from_item(item: PlayedItem) -> TrackEntry {
        let PlayedItem { track, played_at } = item;
        let parsed = track
            .id
            .as_deref()
            .and_then(TrackId::new)
            .or_else(|| TrackId::new(&track.uri));

        TrackEntry {
            id: dedup_key(&track, parsed.as_ref()),
            artist: track
                .artists
                .iter()
                .map(|a| a.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            album: track.album.name.clone(),
            popularity: track.popularity.unwrap_or_default(),
            external_url: track
                .external_urls
                .spotify
                .clone()
                .or_else(|| parsed.as_ref().map(|id| id.url())),
            preview_url: track.preview_url.clone(),
            played_at,
            cover_url: select_cover(&track.album.images).map(|i| i.url.clone()),
            name: track.name,
        }
    }
}

/// Track identity: the Spotify id, then the id inside the uri, then the raw
/// uri (local files have no id).
fn dedup_key(track: &Track, parsed: Option<&TrackId>) -> String {
    match (&track.id, parsed) {
        (Some(id), _) if !id.is_empty() => id.clone(),
        (_, Some(parsed)) => parsed.id().to_string(),
        _ if !track.uri.is_empty() => track.uri.clone(),
        _ => format!("{}|{}", track.name, track.album.name),
    }
}

/// Smallest image at least [`MIN_COVER_HEIGHT`] tall, else the first image.
pub fn select_cover(images: &[Image]) -> Option<&Image> {
    images
        .iter()
        .filter(|i| i.height.is_some_and(|h| h >= MIN_COVER_HEIGHT))
        .min_by_key(|i| i.height)
        .or_else(|| images.first())
}

/// Retrieves up to `requested` unique tracks, in upstream order.
///
/// `requested` is clamped to `0..=50` before the request is made; repeated
/// plays of a track keep only the first occurrence.
pub async fn fetch_tracks<A: SpotifyApi + ?Sized>(
    api: &A,
    session: &Session,
    username: &str,
    source: TrackSource,
    requested: i64,
) -> Result<Vec<TrackEntry>, FetchError> {
    let limit = requested.clamp(0, MAX_LIMIT as i64) as u32;
    if limit == 0 {
        return Ok(Vec::new());
    }

    let items = match source {
        TrackSource::RecentlyPlayed => api.recently_played(session, limit).await,
        TrackSource::TopTracks(range) => api.top_tracks(session, limit, range).await,
    }
    .map_err(|source| FetchError {
        username: username.to_string(),
        source,
    })?;

    let upstream = items.len();
    let tracks = dedup_tracks(items, limit as usize);
    debug!(user = %username, upstream, unique = tracks.len(), "fetched tracks");
    Ok(tracks)
}

fn dedup_tracks(items: Vec<PlayedItem>, limit: usize) -> Vec<TrackEntry> {
    let mut seen = HashSet::new();
    let mut tracks = Vec::with_capacity(limit.min(items.len()));
    for item in items {
        if tracks.len() >= limit {
            break;
        }
        let entry = TrackEntry::from_item(item);
        if seen.insert(entry.id.clone()) {
            tracks.push(entry);
        }
    }
    tracks
}
