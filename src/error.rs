use std::path::PathBuf;

/// Failures reported by the Spotify Web API client.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("request rejected by Spotify ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("rate limited by Spotify (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },
    #[error("unexpected response from Spotify ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Why a user could not be authenticated.
#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error(
        "refresh token for user {username} is a placeholder; \
         run `spoteamfy authorize {username}` to obtain a real one"
    )]
    PlaceholderCredential { username: String },
    #[error("missing or empty refresh_token for user {username}")]
    MissingCredential { username: String },
    #[error("missing required credential field `{field}` for user {username}")]
    MissingField {
        username: String,
        field: &'static str,
    },
    #[error("authentication failed for user {username}: {source}")]
    UpstreamRejected {
        username: String,
        #[source]
        source: ApiError,
    },
    #[error("unexpected authentication error for user {username}: {source}")]
    Unexpected {
        username: String,
        #[source]
        source: ApiError,
    },
}

impl AuthError {
    pub fn username(&self) -> &str {
        match self {
            AuthError::PlaceholderCredential { username }
            | AuthError::MissingCredential { username }
            | AuthError::MissingField { username, .. }
            | AuthError::UpstreamRejected { username, .. }
            | AuthError::Unexpected { username, .. } => username,
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error("failed to fetch tracks for user {username}: {source}")]
pub struct FetchError {
    pub username: String,
    #[source]
    pub source: ApiError,
}

/// Whole-run failures while loading the credential source.
#[derive(thiserror::Error, Debug)]
pub enum CredentialsError {
    #[error("unable to read credentials file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to parse credentials file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(
        "user entry #{} ({username}) is missing required field `{field}`",
        .index + 1
    )]
    MissingField {
        index: usize,
        username: String,
        field: &'static str,
    },
    #[error("user '{name}' not found; available users: {}", .available.join(", "))]
    UnknownUser {
        name: String,
        available: Vec<String>,
    },
}

/// Failures of the interactive authorization-code setup flow.
#[derive(thiserror::Error, Debug)]
pub enum AuthorizeError {
    #[error("{0}")]
    Error(&'static str),
    #[error("{context}: {detail}")]
    Detail {
        context: &'static str,
        detail: String,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
}

impl AuthorizeError {
    pub(crate) fn detail(context: &'static str, detail: impl ToString) -> AuthorizeError {
        AuthorizeError::Detail {
            context,
            detail: detail.to_string(),
        }
    }
}
