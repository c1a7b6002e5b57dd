use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct ExternalUrls {
    #[serde(default)]
    pub spotify: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SimplifiedArtist {
    pub name: String,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SimplifiedAlbum {
    pub name: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Track {
    /// `None` for local files.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<SimplifiedArtist>,
    #[serde(default)]
    pub album: SimplifiedAlbum,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub external_urls: ExternalUrls,
    #[serde(default)]
    pub preview_url: Option<String>,
}

/// One upstream entry, recently played or top, in the order Spotify returned it.
#[derive(Debug, Clone)]
pub struct PlayedItem {
    pub track: Track,
    pub played_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct PlayHistory {
    pub track: Track,
    pub played_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Followers {
    #[serde(default)]
    pub total: Option<u64>,
}

#[derive(Deserialize, Debug)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub followers: Followers,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct OAuthErrorBody {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ApiErrorDetail {
    #[serde(default)]
    pub message: String,
}
