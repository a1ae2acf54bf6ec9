//! Expo-compatible push delivery.

use std::time::Duration;

use reqwest::{Client, Url};
use serde::Serialize;
use thiserror::Error;

/// Expo rejects batches larger than this.
const MAX_BATCH: usize = 100;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("push API returned status {0}")]
    Status(u16),

    #[error("invalid push URL '{0}'")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PushMessage {
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

pub struct PushClient {
    client: Client,
    url: Url,
}

impl PushClient {
    /// # Errors
    ///
    /// Returns [`PushError::Http`] if the client cannot be built, or
    /// [`PushError::InvalidUrl`] if `url` does not parse.
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self, PushError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("artisan/0.1 (notifications)")
            .build()?;
        let url = Url::parse(url).map_err(|_| PushError::InvalidUrl(url.to_owned()))?;
        Ok(Self { client, url })
    }

    /// Send the same notification to every token, batching requests.
    ///
    /// Returns the number of messages accepted by the push API.
    ///
    /// # Errors
    ///
    /// Returns the first [`PushError`] encountered; earlier batches stay sent.
    pub async fn send(
        &self,
        tokens: &[String],
        title: &str,
        body: &str,
        data: &serde_json::Value,
    ) -> Result<usize, PushError> {
        let messages: Vec<PushMessage> = tokens
            .iter()
            .map(|to| PushMessage {
                to: to.clone(),
                title: title.to_owned(),
                body: body.to_owned(),
                data: data.clone(),
            })
            .collect();

        let mut sent = 0;
        for batch in messages.chunks(MAX_BATCH) {
            let response = self.client.post(self.url.clone()).json(batch).send().await?;
            if !response.status().is_success() {
                return Err(PushError::Status(response.status().as_u16()));
            }
            sent += batch.len();
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn send_posts_one_message_per_token() {
        let server = MockServer::start().await;
        let expected = json!([
            { "to": "ExponentPushToken[a]", "title": "Order paid", "body": "Thanks!", "data": { "sale_id": "s1" } },
            { "to": "ExponentPushToken[b]", "title": "Order paid", "body": "Thanks!", "data": { "sale_id": "s1" } }
        ]);

        Mock::given(method("POST"))
            .and(path("/push/send"))
            .and(body_json(&expected))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let client = PushClient::new(&format!("{}/push/send", server.uri()), 5).expect("client");
        let tokens = vec![
            "ExponentPushToken[a]".to_string(),
            "ExponentPushToken[b]".to_string(),
        ];
        let sent = client
            .send(&tokens, "Order paid", "Thanks!", &json!({ "sale_id": "s1" }))
            .await
            .expect("send");
        assert_eq!(sent, 2);
    }

    #[tokio::test]
    async fn send_splits_large_batches() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/push/send"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let client = PushClient::new(&format!("{}/push/send", server.uri()), 5).expect("client");
        let tokens: Vec<String> = (0..MAX_BATCH + 1)
            .map(|i| format!("ExponentPushToken[{i}]"))
            .collect();
        let sent = client
            .send(&tokens, "Sale", "New arrivals", &json!({}))
            .await
            .expect("send");
        assert_eq!(sent, MAX_BATCH + 1);
    }

    #[tokio::test]
    async fn send_reports_rejected_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = PushClient::new(&server.uri(), 5).expect("client");
        let err = client
            .send(&["t".to_string()], "x", "y", &json!({}))
            .await
            .expect_err("should fail");
        assert!(matches!(err, PushError::Status(429)));
    }

    #[test]
    fn new_rejects_invalid_url() {
        assert!(matches!(
            PushClient::new("not a url", 5),
            Err(PushError::InvalidUrl(_))
        ));
    }
}
