use std::fmt;

use tracing::{error, info, warn};

use crate::auth::authenticate;
use crate::card::format_card;
use crate::credentials::CredentialRecord;
use crate::error::{AuthError, FetchError};
use crate::fetch::{fetch_tracks, TrackSource};
use crate::spotify::SpotifyApi;
use crate::webhook::CardSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    pub num_tracks: i64,
    pub source: TrackSource,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            num_tracks: 5,
            source: TrackSource::RecentlyPlayed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub successful: usize,
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for RunCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Successful posts: {}", self.successful)?;
        writeln!(f, "Failed posts: {}", self.failed)?;
        write!(f, "Total users processed: {}", self.total)
    }
}

/// Terminal state of one user's pipeline.
#[derive(Debug)]
pub enum UserOutcome {
    Posted { tracks: usize },
    DeliveryFailed,
    AuthFailed(AuthError),
    FetchFailed(FetchError),
}

impl UserOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, UserOutcome::Posted { .. })
    }
}

/// authenticate -> fetch -> format -> post for a single user.
pub async fn process_user<A, S>(
    api: &A,
    sink: &S,
    record: &CredentialRecord,
    options: &BatchOptions,
) -> UserOutcome
where
    A: SpotifyApi + ?Sized,
    S: CardSink + ?Sized,
{
    let session = match authenticate(api, record).await {
        Ok(session) => session,
        Err(e) => return UserOutcome::AuthFailed(e),
    };

    let tracks = match fetch_tracks(
        api,
        &session,
        &record.username,
        options.source,
        options.num_tracks,
    )
    .await
    {
        Ok(tracks) => tracks,
        Err(e) => return UserOutcome::FetchFailed(e),
    };

    let card = format_card(&record.username, options.source, &tracks);
    if sink.post(&card).await {
        UserOutcome::Posted {
            tracks: tracks.len(),
        }
    } else {
        UserOutcome::DeliveryFailed
    }
}

/// Processes every record in order, one at a time. A failure for one user
/// is logged and counted; it never stops the others.
pub async fn run<A, S>(
    api: &A,
    sink: &S,
    records: &[CredentialRecord],
    options: &BatchOptions,
) -> RunCounters
where
    A: SpotifyApi + ?Sized,
    S: CardSink + ?Sized,
{
    let mut counters = RunCounters {
        total: records.len(),
        ..Default::default()
    };

    for record in records {
        let user = record.username.as_str();
        info!(user, "processing user");

        let outcome = process_user(api, sink, record, options).await;
        match &outcome {
            UserOutcome::Posted { tracks } => {
                info!(user, tracks, "posted tracks to Teams");
            }
            UserOutcome::DeliveryFailed => {
                warn!(user, "failed to post tracks to Teams");
            }
            UserOutcome::AuthFailed(e) => {
                error!(user, error = %e, "authentication failed");
            }
            UserOutcome::FetchFailed(e) => {
                error!(user, error = %e, "failed to fetch tracks");
            }
        }

        if outcome.is_success() {
            counters.successful += 1;
        } else {
            counters.failed += 1;
        }
    }

    counters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::tests::record;
    use crate::card::{Element, MessageCard};
    use crate::error::ApiError;
    use crate::fetch::tests::item;
    use crate::spotify::auth::{AccessToken, RefreshRequest};
    use crate::spotify::model::PlayedItem;
    use crate::spotify::{Session, TimeRange};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Refresh tokens starting with `bad` are rejected, `nofetch` fails the
    /// fetch; everything else succeeds with one track.
    struct FakeSpotify;

    #[async_trait]
    impl SpotifyApi for FakeSpotify {
        async fn refresh(&self, request: &RefreshRequest<'_>) -> Result<AccessToken, ApiError> {
            if request.refresh_token.starts_with("bad") {
                return Err(ApiError::Rejected {
                    status: 400,
                    message: "Invalid refresh token".to_string(),
                });
            }
            Ok(AccessToken {
                access_token: request.refresh_token.to_string(),
                token_type: "Bearer".to_string(),
                scope: String::new(),
                expires_in: 3600,
                refresh_token: None,
            })
        }

        async fn recently_played(
            &self,
            session: &Session,
            _: u32,
        ) -> Result<Vec<PlayedItem>, ApiError> {
            if session.access_token().starts_with("nofetch") {
                return Err(ApiError::Status {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(vec![item(session.access_token())])
        }

        async fn top_tracks(
            &self,
            session: &Session,
            limit: u32,
            _: TimeRange,
        ) -> Result<Vec<PlayedItem>, ApiError> {
            self.recently_played(session, limit).await
        }
    }

    /// Collects posted cards; fails delivery for header text containing `reject`.
    #[derive(Default)]
    struct CollectingSink {
        posted: Mutex<Vec<MessageCard>>,
    }

    #[async_trait]
    impl CardSink for CollectingSink {
        async fn post(&self, card: &MessageCard) -> bool {
            let rejected = matches!(
                card.body().first(),
                Some(Element::TextBlock(b)) if b.text.contains("reject")
            );
            self.posted.lock().unwrap().push(card.clone());
            !rejected
        }
    }

    #[tokio::test]
    async fn failed_auth_does_not_stop_other_users() {
        let records = vec![
            record("alice", "token-a"),
            record("bob", "bad-token"),
            record("carol", "token-c"),
        ];
        let sink = CollectingSink::default();

        let counters = run(&FakeSpotify, &sink, &records, &BatchOptions::default()).await;

        assert_eq!(
            counters,
            RunCounters {
                successful: 2,
                failed: 1,
                total: 3
            }
        );
        let posted = sink.posted.lock().unwrap();
        assert_eq!(posted.len(), 2);
        let headers: Vec<&str> = posted
            .iter()
            .filter_map(|c| match c.body().first() {
                Some(Element::TextBlock(b)) => Some(b.text.as_str()),
                _ => None,
            })
            .collect();
        assert!(headers[0].contains("alice"));
        assert!(headers[1].contains("carol"));
    }

    #[tokio::test]
    async fn placeholder_fetch_and_delivery_failures_are_counted() {
        let records = vec![
            record("placeholder", "SPOTIFY_REFRESH_TOKEN_2"),
            record("broken", "nofetch"),
            record("reject", "token-r"),
            record("dave", "token-d"),
        ];
        let sink = CollectingSink::default();

        let counters = run(&FakeSpotify, &sink, &records, &BatchOptions::default()).await;

        assert_eq!(counters.successful, 1);
        assert_eq!(counters.failed, 3);
        assert_eq!(counters.total, 4);
    }

    #[tokio::test]
    async fn process_user_reports_outcome_kind() {
        let sink = CollectingSink::default();
        let options = BatchOptions::default();

        let outcome = process_user(&FakeSpotify, &sink, &record("x", "bad"), &options).await;
        assert!(matches!(
            outcome,
            UserOutcome::AuthFailed(AuthError::UpstreamRejected { .. })
        ));

        let outcome = process_user(&FakeSpotify, &sink, &record("x", "nofetch"), &options).await;
        assert!(matches!(outcome, UserOutcome::FetchFailed(_)));

        let outcome = process_user(&FakeSpotify, &sink, &record("x", "ok"), &options).await;
        assert!(matches!(outcome, UserOutcome::Posted { tracks: 1 }));
    }

    #[tokio::test]
    async fn empty_batch_reports_zero() {
        let counters = run(
            &FakeSpotify,
            &CollectingSink::default(),
            &[],
            &BatchOptions::default(),
        )
        .await;
        assert_eq!(counters, RunCounters::default());
    }

    #[tokio::test]
    async fn end_to_end_summary_against_webhook() {
        use crate::webhook::WebhookPoster;
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let records = vec![record("alice", "token-a"), record("bob", "token-b")];
        let sink = WebhookPoster::new(server.uri());
        let summary = run(&FakeSpotify, &sink, &records, &BatchOptions::default())
            .await
            .to_string();

        assert!(summary.contains("Successful posts: 2"));
        assert!(summary.contains("Failed posts: 0"));
        assert!(summary.contains("Total users processed: 2"));
    }
}
