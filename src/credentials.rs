use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::CredentialsError;

/// Prefix of refresh tokens left over from the sample users file.
pub const PLACEHOLDER_REFRESH_TOKEN: &str = "SPOTIFY_REFRESH_TOKEN";
pub const PLACEHOLDER_CLIENT_ID: &str = "SPOTIFY_CLIENT_ID";
pub const PLACEHOLDER_CLIENT_SECRET: &str = "SPOTIFY_CLIENT_SECRET";

/// One user's Spotify application identity and stored refresh token.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub username: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub refresh_token: String,
}

impl CredentialRecord {
    pub fn has_placeholder_token(&self) -> bool {
        self.refresh_token.starts_with(PLACEHOLDER_REFRESH_TOKEN)
    }

    pub fn has_placeholder_client(&self) -> bool {
        self.client_id.starts_with(PLACEHOLDER_CLIENT_ID)
            || self.client_secret.starts_with(PLACEHOLDER_CLIENT_SECRET)
    }
}

impl std::fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct RawRecord {
    username: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    redirect_uri: Option<String>,
    refresh_token: Option<String>,
}

impl RawRecord {
    fn validate(self, index: usize) -> Result<CredentialRecord, CredentialsError> {
        let username = self.username.clone().unwrap_or_default();
        let require = |value: Option<String>, field: &'static str| match value {
            Some(v) if !v.trim().is_empty() => Ok(v),
            _ => Err(CredentialsError::MissingField {
                index,
                username: if username.is_empty() {
                    "<unknown>".to_string()
                } else {
                    username.clone()
                },
                field,
            }),
        };

        Ok(CredentialRecord {
            username: require(self.username, "username")?,
            client_id: require(self.client_id, "client_id")?,
            client_secret: require(self.client_secret, "client_secret")?,
            redirect_uri: require(self.redirect_uri, "redirect_uri")?,
            refresh_token: require(self.refresh_token, "refresh_token")?,
        })
    }
}

/// Parses a JSON array of user credential objects, rejecting any record
/// with a missing or empty field.
pub fn parse_users(json: &str, path: &Path) -> Result<Vec<CredentialRecord>, CredentialsError> {
    let raw: Vec<RawRecord> =
        serde_json::from_str(json).map_err(|source| CredentialsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    raw.into_iter()
        .enumerate()
        .map(|(index, record)| record.validate(index))
        .collect()
}

pub fn load_users(path: &Path) -> Result<Vec<CredentialRecord>, CredentialsError> {
    let json = fs::read_to_string(path).map_err(|source| CredentialsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_users(&json, path)
}

/// Restricts the batch to the single record named `name`.
pub fn select_user(
    records: Vec<CredentialRecord>,
    name: &str,
) -> Result<Vec<CredentialRecord>, CredentialsError> {
    let available: Vec<String> = records.iter().map(|r| r.username.clone()).collect();
    match records.into_iter().find(|r| r.username == name) {
        Some(record) => Ok(vec![record]),
        None => Err(CredentialsError::UnknownUser {
            name: name.to_string(),
            available,
        }),
    }
}
