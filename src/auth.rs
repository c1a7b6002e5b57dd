use tracing::{debug, warn};

use crate::credentials::CredentialRecord;
use crate::error::{ApiError, AuthError};
use crate::spotify::auth::{scope, RefreshRequest, SCOPES};
use crate::spotify::{Session, SpotifyApi};

/// Scopes the batch cannot work without.
const REQUIRED_SCOPES: [&str; 2] = [SCOPES[0], SCOPES[1]];

/// Exchanges the record's refresh token for a session.
///
/// Preconditions (missing fields, empty or placeholder refresh token) are
/// checked before any request is made. A single exchange is attempted.
pub async fn authenticate<A: SpotifyApi + ?Sized>(
    api: &A,
    record: &CredentialRecord,
) -> Result<Session, AuthError> {
    let username = record.username.clone();

    for (field, value) in [
        ("client_id", &record.client_id),
        ("client_secret", &record.client_secret),
        ("redirect_uri", &record.redirect_uri),
    ] {
        if value.trim().is_empty() {
            return Err(AuthError::MissingField { username, field });
        }
    }
    if record.refresh_token.trim().is_empty() {
        return Err(AuthError::MissingCredential { username });
    }
    if record.has_placeholder_token() {
        return Err(AuthError::PlaceholderCredential { username });
    }

    let scope = scope();
    let request = RefreshRequest {
        client_id: &record.client_id,
        client_secret: &record.client_secret,
        redirect_uri: &record.redirect_uri,
        refresh_token: &record.refresh_token,
        scope: &scope,
    };

    let token = api.refresh(&request).await.map_err(|source| match source {
        ApiError::Rejected { .. } => AuthError::UpstreamRejected {
            username: username.clone(),
            source,
        },
        _ => AuthError::Unexpected {
            username: username.clone(),
            source,
        },
    })?;

    let missing = token.missing_scopes(&REQUIRED_SCOPES);
    if !token.scope.is_empty() && !missing.is_empty() {
        warn!(
            user = %username,
            missing = ?missing,
            "refresh token was granted without required scopes"
        );
    }
    if token.refresh_token.is_some() {
        debug!(user = %username, "Spotify rotated the refresh token; update the users file");
    }

    debug!(user = %username, expires_in = token.expires_in, "authenticated");
    Ok(Session::from(token))
}
