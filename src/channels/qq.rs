//! QQ official bot OpenAPI channel
//!
//! Covers the group endpoints the bot replies with: app access token,
//! rich-media upload and group message send.

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::channels::media_cache::{MediaCache, MediaKey};
use crate::config::QqConfig;
use crate::core::{GroupChannel, MediaKind, OutboundMessage, UploadedMedia};
use crate::error::{Error, Result};

/// Refresh the token this long before it expires
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Message type for plain text
pub const MSG_TYPE_TEXT: u8 = 0;

/// Message type for rich media
pub const MSG_TYPE_MEDIA: u8 = 7;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    app_id: &'a str,
    client_secret: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    /// Seconds; sent as a string
    #[serde(default)]
    expires_in: Option<Value>,
}

struct AccessToken {
    value: SecretString,
    refresh_at: Instant,
}

#[derive(Serialize)]
struct UploadRequest<'a> {
    file_type: u8,
    file_data: &'a str,
    srv_send_msg: bool,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    #[serde(default)]
    file_uuid: Option<String>,
    #[serde(default)]
    file_info: Option<String>,
    #[serde(default)]
    ttl: Option<u64>,
}

#[derive(Serialize)]
struct SendRequest<'a> {
    msg_type: u8,
    msg_id: &'a str,
    msg_seq: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<&'a UploadedMedia>,
}

/// Group channel backed by the QQ bot OpenAPI
pub struct QqGroupChannel {
    client: Client,
    app_id: String,
    secret: SecretString,
    api_base: String,
    token_url: String,
    token: RwLock<Option<AccessToken>>,
    media_cache: MediaCache,
}

impl QqGroupChannel {
    /// Create a channel from config
    pub fn new(config: &QqConfig) -> Result<Self> {
        if config.app_id.is_empty() || config.secret.expose_secret().is_empty() {
            return Err(Error::Config("QQ app_id and secret are required".to_string()));
        }

        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(QqGroupChannel {
            client,
            app_id: config.app_id.clone(),
            secret: config.secret.clone(),
            api_base: config.api_base(),
            token_url: config.token_url.clone(),
            token: RwLock::new(None),
            media_cache: MediaCache::default(),
        })
    }

    async fn fetch_token(&self) -> Result<AccessToken> {
        let request = TokenRequest {
            app_id: &self.app_id,
            client_secret: self.secret.expose_secret(),
        };
        let response = self.client.post(&self.token_url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(status, body));
        }

        let token: TokenResponse = response.json().await?;
        let value = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Channel("token response without access_token".to_string()))?;
        let expires_in = token
            .expires_in
            .as_ref()
            .and_then(|v| match v {
                Value::String(s) => s.parse::<u64>().ok(),
                Value::Number(n) => n.as_u64(),
                _ => None,
            })
            .unwrap_or(7200);

        info!("Obtained QQ access token (expires in {}s)", expires_in);
        Ok(AccessToken {
            value: SecretString::from(value),
            refresh_at: Instant::now()
                + Duration::from_secs(expires_in).saturating_sub(TOKEN_REFRESH_MARGIN),
        })
    }

    /// Current access token, fetching a new one when close to expiry
    async fn access_token(&self) -> Result<String> {
        {
            let token = self.token.read().await;
            if let Some(token) = token.as_ref().filter(|t| Instant::now() < t.refresh_at) {
                return Ok(token.value.expose_secret().to_string());
            }
        }

        let mut slot = self.token.write().await;
        if let Some(token) = slot.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.value.expose_secret().to_string());
        }

        let policy = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..ExponentialBackoff::default()
        };
        let fresh = backoff::future::retry(policy, || async {
            self.fetch_token().await.map_err(|e| {
                if e.is_retryable() {
                    warn!("Access token request failed, retrying: {}", e);
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await?;

        let value = fresh.value.expose_secret().to_string();
        *slot = Some(fresh);
        Ok(value)
    }

    async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self.access_token().await?;
        Ok(builder
            .header("Authorization", format!("QQBot {}", token))
            .header("X-Union-Appid", &self.app_id))
    }

    fn group_url(&self, group_openid: &str, endpoint: &str) -> String {
        format!("{}/v2/groups/{}/{}", self.api_base, group_openid, endpoint)
    }

    async fn upload(&self, group_openid: &str, kind: MediaKind, base64_data: &str) -> Result<UploadedMedia> {
        debug!(
            "Uploading {:?} to group {}: {}...",
            kind,
            group_openid,
            preview(base64_data)
        );

        let request = UploadRequest {
            file_type: kind.file_type(),
            file_data: base64_data,
            srv_send_msg: false,
        };
        let builder = self
            .client
            .post(self.group_url(group_openid, "files"))
            .json(&request);
        let response = self.authorized(builder).await?.send().await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status != StatusCode::OK {
            return Err(Error::api(status, body));
        }

        let upload: UploadResponse = serde_json::from_str(&body)?;
        match (upload.file_uuid, upload.file_info, upload.ttl) {
            (Some(file_uuid), Some(file_info), Some(ttl))
                if !file_uuid.is_empty() && !file_info.is_empty() && ttl > 0 =>
            {
                Ok(UploadedMedia {
                    file_uuid,
                    file_info,
                    ttl,
                })
            }
            _ => {
                error!("Upload response missing file_uuid, file_info or ttl: {}", body);
                Err(Error::Channel(
                    "upload response missing file_uuid, file_info or ttl".to_string(),
                ))
            }
        }
    }
}

/// First 20 characters of a base64 payload, for logs
pub fn preview(data: &str) -> &str {
    match data.char_indices().nth(20) {
        Some((idx, _)) => &data[..idx],
        None => data,
    }
}

#[async_trait]
impl GroupChannel for QqGroupChannel {
    async fn upload_media(
        &self,
        group_openid: &str,
        kind: MediaKind,
        base64_data: &str,
    ) -> Result<UploadedMedia> {
        let key = MediaKey::new(group_openid, kind, base64_data);
        if let Some(media) = self.media_cache.get(&key).await {
            debug!("Reusing uploaded media {}", media.file_uuid);
            return Ok(media);
        }

        let media = self.upload(group_openid, kind, base64_data).await?;
        info!(
            "Uploaded media {} (ttl {}s) to group {}",
            media.file_uuid, media.ttl, group_openid
        );
        if kind == MediaKind::Image {
            self.media_cache.insert(key, media.clone()).await;
        }
        Ok(media)
    }

    async fn send(
        &self,
        group_openid: &str,
        reply_to: &str,
        message: &OutboundMessage,
        msg_seq: u32,
    ) -> Result<()> {
        let request = match message {
            OutboundMessage::Text(text) => SendRequest {
                msg_type: MSG_TYPE_TEXT,
                msg_id: reply_to,
                msg_seq,
                content: Some(text.as_str()),
                media: None,
            },
            OutboundMessage::Media(media) => SendRequest {
                msg_type: MSG_TYPE_MEDIA,
                msg_id: reply_to,
                msg_seq,
                content: None,
                media: Some(media),
            },
        };

        let builder = self
            .client
            .post(self.group_url(group_openid, "messages"))
            .json(&request);
        let response = self.authorized(builder).await?.send().await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(Error::api(status, body));
        }

        debug!(
            "Sent {} message (msg_seq {}) to group {}: {}",
            message.kind(),
            msg_seq,
            group_openid,
            body
        );
        Ok(())
    }
}
