use rand::{distr::Alphanumeric, Rng};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{decode, SpotifyClient};
use crate::credentials::CredentialRecord;
use crate::error::{ApiError, AuthorizeError};

type Result<T> = std::result::Result<T, AuthorizeError>;

/// Permissions requested for every user; the refresh grant inherits them
/// from the original authorization.
pub const SCOPES: [&str; 4] = [
    "user-read-recently-played",
    "user-top-read",
    "playlist-modify-public",
    "playlist-modify-private",
];

pub fn scope() -> String {
    SCOPES.join(" ")
}

#[derive(Deserialize, Debug)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub expires_in: i64,
    /// Only present when Spotify rotates the refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl AccessToken {
    /// Required scopes that the grant did not include.
    pub fn missing_scopes<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        let granted: Vec<&str> = self.scope.split_whitespace().collect();
        required
            .iter()
            .copied()
            .filter(|s| !granted.contains(s))
            .collect()
    }
}

pub struct RefreshRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub redirect_uri: &'a str,
    pub refresh_token: &'a str,
    pub scope: &'a str,
}

impl SpotifyClient {
    pub(crate) async fn exchange_refresh_token(
        &self,
        request: &RefreshRequest<'_>,
    ) -> std::result::Result<AccessToken, ApiError> {
        let response = self
            .http()
            .post(self.token_url())
            .basic_auth(request.client_id, Some(request.client_secret))
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", request.refresh_token),
            ])
            .send()
            .await?;

        decode(response).await
    }

    async fn exchange_auth_code(
        &self,
        creds: &Credentials<AuthCodePresent>,
    ) -> std::result::Result<AccessToken, ApiError> {
        let response = self
            .http()
            .post(self.token_url())
            .basic_auth(&creds.client_id, Some(&creds.client_secret))
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .form(&[
                ("code", creds.authorization_code.0.as_str()),
                ("redirect_uri", creds.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await?;

        decode(response).await
    }
}

/// Runs the interactive Authorization Code flow for one user and returns the
/// token set, including the refresh token to store in the users file.
pub async fn authorize(
    client: &SpotifyClient,
    record: &CredentialRecord,
    open_browser: bool,
) -> Result<AccessToken> {
    let creds = Credentials::new(record)?.get_auth_code(client, open_browser)?;
    creds.get_access_token(client).await
}

pub struct AuthCodeNotPresent;
pub struct AuthCodePresent(String);

pub trait AuthCodeStates: private::Sealed {}
impl AuthCodeStates for AuthCodeNotPresent {}
impl AuthCodeStates for AuthCodePresent {}

pub struct Credentials<AuthCodeState>
where
    AuthCodeState: AuthCodeStates,
{
    pub client_id: String,
    client_secret: String,
    redirect_uri: String,
    authorization_code: AuthCodeState,
    state: String,
}

impl Credentials<AuthCodeNotPresent> {
    pub fn new(record: &CredentialRecord) -> Result<Credentials<AuthCodeNotPresent>> {
        if record.has_placeholder_client() {
            return Err(AuthorizeError::Error(
                "Client id/secret are still placeholders; update the users file first",
            ));
        }
        Ok(Credentials {
            client_id: record.client_id.clone(),
            client_secret: record.client_secret.clone(),
            redirect_uri: record.redirect_uri.clone(),
            authorization_code: AuthCodeNotPresent,
            state: rand::rng()
                .sample_iter(&Alphanumeric)
                .take(64)
                .map(char::from)
                .collect(),
        })
    }

    pub fn prompt_url(&self, client: &SpotifyClient) -> Result<Url> {
        let params = serde_urlencoded::to_string(AuthCodeRequest::new(self))
            .map_err(|e| AuthorizeError::detail("Error url-encoding authorization query", e))?;
        Url::parse(&format!("{}?{}", client.authorize_url(), params))
            .map_err(|e| AuthorizeError::detail("Unable to parse authorization prompt url", e))
    }

    pub fn get_auth_code(
        self,
        client: &SpotifyClient,
        open_browser: bool,
    ) -> Result<Credentials<AuthCodePresent>> {
        let auth_code = CallbackCaptureServer::new(&self, client)?.capture(open_browser)?;
        Ok(self.add_auth_code(auth_code))
    }

    fn add_auth_code(self, auth_code: String) -> Credentials<AuthCodePresent> {
        Credentials {
            client_id: self.client_id,
            client_secret: self.client_secret,
            redirect_uri: self.redirect_uri,
            authorization_code: AuthCodePresent(auth_code),
            state: self.state,
        }
    }
}

impl Credentials<AuthCodePresent> {
    pub async fn get_access_token(self, client: &SpotifyClient) -> Result<AccessToken> {
        Ok(client.exchange_auth_code(&self).await?)
    }
}

#[derive(Serialize)]
struct AuthCodeRequest {
    client_id: String,
    response_type: String,
    redirect_uri: String,
    state: String,
    scope: String,
    show_dialog: bool,
}

impl AuthCodeRequest {
    fn new(creds: &Credentials<AuthCodeNotPresent>) -> AuthCodeRequest {
        AuthCodeRequest {
            client_id: creds.client_id.clone(),
            response_type: "code".to_string(),
            redirect_uri: creds.redirect_uri.clone(),
            state: creds.state.clone(),
            scope: scope(),
            show_dialog: true,
        }
    }
}

#[derive(Deserialize)]
struct AuthCodeCallback {
    code: Option<String>,
    error: Option<String>,
    state: String,
}

impl AuthCodeCallback {
    fn parse_for_code(self, state: &str) -> Result<String> {
        if let Some(error) = self.error {
            return Err(AuthorizeError::detail(
                "Authorization callback returned an error",
                error,
            ));
        }
        if state != self.state {
            return Err(AuthorizeError::Error(
                "State sent to Spotify does not match the one returned",
            ));
        }
        self.code
            .ok_or(AuthorizeError::Error("Auth code not present in callback"))
    }
}

/// Extracts the auth code from the request line captured on the redirect uri.
fn parse_callback_url(url: &str, expected_path: &str, state: &str) -> Result<String> {
    let query = match url.split_once('?') {
        Some((path, query)) if path == expected_path => query,
        _ => return Err(AuthorizeError::Error("Auth code callback url was malformed")),
    };

    serde_urlencoded::from_str::<AuthCodeCallback>(query)
        .map_err(|e| AuthorizeError::detail("Error while parsing auth code callback", e))?
        .parse_for_code(state)
}

struct CallbackCaptureServer {
    server: tiny_http::Server,
    prompt_url: String,
    callback_path: String,
    state: String,
}

impl CallbackCaptureServer {
    fn new(
        creds: &Credentials<AuthCodeNotPresent>,
        client: &SpotifyClient,
    ) -> Result<CallbackCaptureServer> {
        let redirect_uri = Url::parse(&creds.redirect_uri)
            .map_err(|e| AuthorizeError::detail("Invalid redirect_uri", e))?;
        let host = redirect_uri
            .host_str()
            .ok_or(AuthorizeError::Error("redirect_uri has no host"))?;
        let port = redirect_uri
            .port_or_known_default()
            .ok_or(AuthorizeError::Error("redirect_uri has no port"))?;

        let server = tiny_http::Server::http(format!("{host}:{port}"))
            .map_err(|e| AuthorizeError::detail("Unable to start http server", e))?;

        Ok(CallbackCaptureServer {
            server,
            prompt_url: creds.prompt_url(client)?.to_string(),
            callback_path: redirect_uri.path().to_string(),
            state: creds.state.clone(),
        })
    }

    fn capture(self, open_browser: bool) -> Result<String> {
        println!("Authorize the application by visiting:\n{}", self.prompt_url);
        if open_browser {
            webbrowser::open(&self.prompt_url)
                .map_err(|e| AuthorizeError::detail("Error opening authorization prompt url", e))?;
        }

        let request = self
            .server
            .recv()
            .map_err(|e| AuthorizeError::detail("Error receiving auth code callback request", e))?;

        let code = parse_callback_url(request.url(), &self.callback_path, &self.state)?;

        let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"text/html"[..])
            .map_err(|_| AuthorizeError::Error("Invalid callback response header"))?;
        request
            .respond(
                tiny_http::Response::from_string(
                    "<html><body><script>window.close();</script></body></html>",
                )
                .with_header(header),
            )
            .map_err(|e| AuthorizeError::detail("Error responding to auth code callback", e))?;

        Ok(code)
    }
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::AuthCodeNotPresent {}
    impl Sealed for super::AuthCodePresent {}
}
