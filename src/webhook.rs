//! Delivery of message cards to the Teams incoming webhook.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::card::MessageCard;

/// Where finished cards go. `true` means delivered.
#[async_trait]
pub trait CardSink: Send + Sync {
    async fn post(&self, card: &MessageCard) -> bool;
}

#[derive(Debug, Clone)]
pub struct WebhookPoster {
    client: reqwest::Client,
    url: String,
}

impl WebhookPoster {
    pub fn new(url: impl Into<String>) -> WebhookPoster {
        WebhookPoster {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl CardSink for WebhookPoster {
    async fn post(&self, card: &MessageCard) -> bool {
        post_card(&self.client, &self.url, card).await
    }
}

/// Single delivery attempt. Serialization and transport failures and
/// non-2xx statuses are logged and reported as `false`.
pub async fn post_card(client: &reqwest::Client, url: &str, card: &MessageCard) -> bool {
    let result = client.post(url).json(card).send().await;

    match result {
        Ok(response) if response.status().is_success() => {
            debug!(url = %url, status = %response.status(), "card posted");
            true
        }
        Ok(response) => {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(url = %url, %status, body = %body, "webhook rejected card");
            false
        }
        Err(e) => {
            warn!(url = %url, error = %e, "failed to send card");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::format_card;
    use crate::fetch::TrackSource;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn card() -> MessageCard {
        format_card("sune", TrackSource::RecentlyPlayed, &[])
    }

    #[tokio::test]
    async fn delivers_json_card() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .and(body_partial_json(serde_json::json!({"type": "message"})))
            .respond_with(ResponseTemplate::new(200).set_body_string("1"))
            .expect(1)
            .mount(&server)
            .await;

        let poster = WebhookPoster::new(format!("{}/hook", server.uri()));
        assert!(poster.post(&card()).await);
    }

    #[tokio::test]
    async fn accepted_status_counts_as_delivered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        assert!(WebhookPoster::new(server.uri()).post(&card()).await);
    }

    #[tokio::test]
    async fn error_status_is_false() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Bad payload"))
            .expect(1)
            .mount(&server)
            .await;

        assert!(!WebhookPoster::new(server.uri()).post(&card()).await);
    }

    #[tokio::test]
    async fn transport_error_is_false() {
        // Nothing listens on port 9 locally.
        let poster = WebhookPoster::new("http://127.0.0.1:9/hook");
        assert!(!poster.post(&card()).await);
    }

    #[tokio::test]
    async fn invalid_url_is_false() {
        assert!(!WebhookPoster::new("not a url").post(&card()).await);
    }
}
