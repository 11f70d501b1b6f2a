//! Resource collections rendered by the gallery
//!
//! Thin consumers of the paging crate: each function takes the session
//! explicitly, fetches one resource and shapes it for display. Errors are
//! returned per resource so the caller can render partial results.

use std::collections::HashMap;

use paging::{PaginatedFetcher, assemble_items};
use pkce_auth::Session;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Followers {
    #[serde(default)]
    pub total: u64,
}

/// Current user's profile (`GET /me`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    pub uri: String,
    pub href: String,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub external_urls: HashMap<String, String>,
    #[serde(default)]
    pub followers: Option<Followers>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TracksRef {
    pub href: String,
    #[serde(default)]
    pub total: u32,
}

/// Simplified playlist object as listed by `GET /me/playlists`
#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    /// Spotify sends `null` rather than `[]` for some playlists
    #[serde(default)]
    pub images: Option<Vec<Image>>,
    #[serde(default)]
    pub tracks: Option<TracksRef>,
}

impl PlaylistSummary {
    /// Name with double quotes removed, as shown in the list.
    pub fn display_name(&self) -> String {
        self.name.replace('"', "")
    }

    pub fn cover(&self) -> Option<&Image> {
        self.images.as_ref().and_then(|images| images.first())
    }
}

/// One rendered playlist entry.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlaylistCard {
    pub id: String,
    pub name: String,
    pub cover_url: Option<String>,
    pub tracks_href: Option<String>,
    pub track_count: u32,
}

/// Cards for every playlist with a non-empty display name, in API order.
pub fn playlist_cards(playlists: &[PlaylistSummary]) -> Vec<PlaylistCard> {
    playlists
        .iter()
        .filter_map(|playlist| {
            let name = playlist.display_name();
            if name.is_empty() {
                return None;
            }
            Some(PlaylistCard {
                id: playlist.id.clone(),
                name,
                cover_url: playlist.cover().map(|image| image.url.clone()),
                tracks_href: playlist.tracks.as_ref().map(|t| t.href.clone()),
                track_count: playlist.tracks.as_ref().map_or(0, |t| t.total),
            })
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(default)]
    track: Option<PlayableItem>,
}

/// A playlist entry's payload: a track or a podcast episode.
#[derive(Debug, Deserialize)]
struct PlayableItem {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    album: Option<Album>,
}

#[derive(Debug, Deserialize)]
struct Album {
    #[serde(default)]
    images: Vec<Image>,
}

/// Album covers of a playlist's tracks, laid out as a square grid.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlbumArt {
    pub images: Vec<Image>,
    /// Side length of the largest square grid the images fill completely
    pub grid_dimension: usize,
}

impl AlbumArt {
    pub fn new(images: Vec<Image>) -> Self {
        let grid_dimension = (images.len() as f64).sqrt().floor() as usize;
        Self {
            images,
            grid_dimension,
        }
    }
}

pub async fn fetch_profile(
    fetcher: &PaginatedFetcher,
    api_base: &str,
    session: &Session,
) -> paging::Result<UserProfile> {
    let body = fetcher
        .fetch_one(session.access_token().bearer(), &format!("{api_base}/me"))
        .await?;
    serde_json::from_value(body).map_err(|e| paging::Error::MalformedPage {
        index: 0,
        reason: format!("profile: {e}"),
    })
}

pub async fn fetch_playlists(
    fetcher: &PaginatedFetcher,
    api_base: &str,
    session: &Session,
) -> paging::Result<Vec<PlaylistSummary>> {
    let pages = fetcher
        .fetch_all(
            session.access_token().bearer(),
            &format!("{api_base}/me/playlists"),
        )
        .await?;
    assemble_items(&pages)
}

/// First cover image of every track (episodes and removed tracks skipped).
pub async fn fetch_album_art(
    fetcher: &PaginatedFetcher,
    session: &Session,
    tracks_href: &str,
) -> paging::Result<AlbumArt> {
    let pages = fetcher
        .fetch_all(session.access_token().bearer(), tracks_href)
        .await?;
    let items: Vec<PlaylistItem> = assemble_items(&pages)?;
    let images = items
        .into_iter()
        .filter_map(|item| item.track)
        .filter(|track| track.kind == "track")
        .filter_map(|track| track.album?.images.into_iter().next())
        .collect();
    Ok(AlbumArt::new(images))
}
