use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::error::ApiError;
use auth::{AccessToken, RefreshRequest};
use model::{OAuthErrorBody, Page, PlayHistory, PlayedItem, Track, UserProfile};

pub mod auth;
pub mod id;
pub mod model;

const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";
const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Hard cap Spotify applies to `limit` on the player and top-items endpoints.
pub const MAX_LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum TimeRange {
    #[default]
    ShortTerm,
    MediumTerm,
    LongTerm,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::ShortTerm => "short_term",
            TimeRange::MediumTerm => "medium_term",
            TimeRange::LongTerm => "long_term",
        }
    }
}

/// Authenticated handle for one user, valid for a single pipeline run.
#[derive(Clone)]
pub struct Session {
    access_token: String,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Session {
        Session {
            access_token: access_token.into(),
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl From<AccessToken> for Session {
    fn from(token: AccessToken) -> Session {
        Session::new(token.access_token)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// The operations the batch needs from the Spotify Web API.
#[async_trait]
pub trait SpotifyApi: Send + Sync {
    /// Exchanges a refresh token for a fresh access token. One attempt, no retry.
    async fn refresh(&self, request: &RefreshRequest<'_>) -> Result<AccessToken, ApiError>;

    /// Most recent plays first.
    async fn recently_played(
        &self,
        session: &Session,
        limit: u32,
    ) -> Result<Vec<PlayedItem>, ApiError>;

    async fn top_tracks(
        &self,
        session: &Session,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<Vec<PlayedItem>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct SpotifyClient {
    http: reqwest::Client,
    accounts_url: String,
    api_url: String,
}

impl Default for SpotifyClient {
    fn default() -> Self {
        SpotifyClient::with_base_urls(ACCOUNTS_BASE_URL, API_BASE_URL)
    }
}

impl SpotifyClient {
    pub fn new() -> SpotifyClient {
        SpotifyClient::default()
    }

    pub fn with_base_urls(accounts_url: &str, api_url: &str) -> SpotifyClient {
        SpotifyClient {
            http: reqwest::Client::new(),
            accounts_url: accounts_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_url)
    }

    pub(crate) fn authorize_url(&self) -> String {
        format!("{}/authorize", self.accounts_url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .bearer_auth(session.access_token())
            .query(query)
            .send()
            .await?;

        decode(response).await
    }

    /// Profile of the session's owner, used by the `validate` command.
    pub async fn current_user(&self, session: &Session) -> Result<UserProfile, ApiError> {
        self.get(session, "/me", &[]).await
    }
}

#[async_trait]
impl SpotifyApi for SpotifyClient {
    async fn refresh(&self, request: &RefreshRequest<'_>) -> Result<AccessToken, ApiError> {
        self.exchange_refresh_token(request).await
    }

    async fn recently_played(
        &self,
        session: &Session,
        limit: u32,
    ) -> Result<Vec<PlayedItem>, ApiError> {
        let page: Page<PlayHistory> = self
            .get(
                session,
                "/me/player/recently-played",
                &[("limit", limit.min(MAX_LIMIT).to_string())],
            )
            .await?;

        Ok(page
            .items
            .into_iter()
            .map(|h| PlayedItem {
                track: h.track,
                played_at: Some(h.played_at),
            })
            .collect())
    }

    async fn top_tracks(
        &self,
        session: &Session,
        limit: u32,
        time_range: TimeRange,
    ) -> Result<Vec<PlayedItem>, ApiError> {
        let page: Page<Track> = self
            .get(
                session,
                "/me/top/tracks",
                &[
                    ("limit", limit.min(MAX_LIMIT).to_string()),
                    ("time_range", time_range.as_str().to_string()),
                ],
            )
            .await?;

        Ok(page
            .items
            .into_iter()
            .map(|track| PlayedItem {
                track,
                played_at: None,
            })
            .collect())
    }
}

/// Maps a non-2xx response onto [`ApiError`].
pub(crate) async fn check(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(ApiError::RateLimited { retry_after });
    }

    let body = response.text().await.unwrap_or_default();
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Err(ApiError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            })
        }
        _ => Err(ApiError::Status {
            status: status.as_u16(),
            body,
        }),
    }
}

pub(crate) async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = check(response).await?;
    Ok(serde_json::from_str(&response.text().await?)?)
}

/// Pulls a readable message out of either error shape Spotify returns.
fn error_message(body: &str) -> String {
    if let Ok(oauth) = serde_json::from_str::<OAuthErrorBody>(body) {
        return oauth.error_description.unwrap_or(oauth.error);
    }
    if let Ok(api) = serde_json::from_str::<model::ApiErrorBody>(body) {
        return api.error.message;
    }
    body.to_string()
}
