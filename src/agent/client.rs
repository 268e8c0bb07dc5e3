//! `chat-messages` API client
//!
//! Shared by the primary chat app and the memory app; they differ only in
//! endpoint, key and user id.

use crate::agent::types::{ChatMessagesRequest, ChatMessagesResponse};
use crate::error::{Error, Result};
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use tracing::{debug, warn};

/// Blocking `chat-messages` client
#[derive(Clone)]
pub struct ChatMessagesClient {
    /// HTTP client with the bearer token preset
    client: Client,
    /// Full endpoint URL
    url: String,
    /// End-user identifier sent with each request
    user: String,
}

impl ChatMessagesClient {
    /// Create a new client
    pub fn new(
        url: impl Into<String>,
        api_key: &SecretString,
        user: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
                .map_err(|e| Error::Config(format!("Invalid API key format: {}", e)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(ChatMessagesClient {
            client,
            url: url.into(),
            user: user.into(),
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one blocking query, continuing `conversation_id` if given
    pub async fn send(
        &self,
        query: &str,
        conversation_id: Option<String>,
    ) -> Result<ChatMessagesResponse> {
        let request = ChatMessagesRequest::blocking(query, conversation_id, self.user.clone());

        debug!(
            "POST {} (user={}, conversation_id={:?})",
            self.url, request.user, request.conversation_id
        );

        let response = self.client.post(&self.url).json(&request).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        debug!("Received response: {} - {}", status, truncate(&body, 300));

        if status == reqwest::StatusCode::OK {
            Ok(serde_json::from_str(&body)?)
        } else {
            warn!("Request to {} failed with status {}", self.url, status);
            Err(Error::api(status, body))
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ChatMessagesClient {
        ChatMessagesClient::new(
            format!("{}/v1/chat-messages", server.uri()),
            &SecretString::from("app-test".to_string()),
            "admin",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_send_posts_blocking_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat-messages"))
            .and(header("authorization", "Bearer app-test"))
            .and(body_partial_json(json!({
                "query": "hello",
                "response_mode": "blocking",
                "conversation_id": "conv-1",
                "user": "admin"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "answer": "hi there",
                "conversation_id": "conv-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client_for(&server)
            .send("hello", Some("conv-1".to_string()))
            .await
            .unwrap();
        assert_eq!(response.answer.as_deref(), Some("hi there"));
    }

    #[tokio::test]
    async fn test_non_200_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .mount(&server)
            .await;

        match client_for(&server).send("hello", None).await {
            Err(Error::Api { status, body }) => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad request");
            }
            other => panic!("expected API error, got {:?}", other.map(|r| r.answer)),
        }
    }

    #[test]
    fn test_truncate_respects_chars() {
        assert_eq!(truncate("你好世界", 2), "你好");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
