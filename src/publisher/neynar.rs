//! Neynar casting API publisher.
//!
//! ## Configuration
//!
//! - `NEYNAR_API_KEY`: API key sent in the `api_key` header (required)
//! - `SIGNER_UUID`: managed signer that authors the casts (required)
//! - `NEYNAR_BASE_URL`: API root (default: https://api.neynar.com)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::types::ThreadLink;
use super::{PublishError, Publisher};

/// Default API root.
pub const DEFAULT_NEYNAR_BASE_URL: &str = "https://api.neynar.com";

/// Configuration for [`NeynarPublisher`].
#[derive(Debug, Clone)]
pub struct NeynarConfig {
    /// API root, without trailing slash.
    pub base_url: String,
    /// API key.
    pub api_key: String,
    /// Signer that authors the casts.
    pub signer_uuid: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl NeynarConfig {
    /// Create a config against the public API.
    pub fn new(api_key: impl Into<String>, signer_uuid: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_NEYNAR_BASE_URL.to_string(),
            api_key: api_key.into(),
            signer_uuid: signer_uuid.into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Serialize)]
struct CastRequest<'a> {
    signer_uuid: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CastResponse {
    cast: PostedCast,
}

#[derive(Debug, Deserialize)]
struct PostedCast {
    hash: String,
}

/// Publishes casts through Neynar.
pub struct NeynarPublisher {
    client: Client,
    config: NeynarConfig,
}

impl NeynarPublisher {
    /// Create a publisher.
    pub fn new(config: NeynarConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PublishError::Unknown(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn cast_url(&self) -> String {
        format!("{}/v2/farcaster/cast", self.config.base_url.trim_end_matches('/'))
    }
}

/// Map a non-success HTTP status to the publishing taxonomy.
pub fn classify_status(status: StatusCode, body: &str) -> PublishError {
    let detail = format!("HTTP {}: {}", status.as_u16(), body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PublishError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => PublishError::RateLimited(detail),
        _ => PublishError::Unknown(detail),
    }
}

#[async_trait]
impl Publisher for NeynarPublisher {
    async fn publish(
        &self,
        text: &str,
        reply_to: Option<&ThreadLink>,
    ) -> Result<ThreadLink, PublishError> {
        let body = CastRequest {
            signer_uuid: &self.config.signer_uuid,
            text,
            parent: reply_to.map(ThreadLink::as_str),
        };

        let response = self
            .client
            .post(self.cast_url())
            .header("api_key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PublishError::Unknown(format!("Cast request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &body));
        }

        let parsed: CastResponse = response
            .json()
            .await
            .map_err(|e| PublishError::Unknown(format!("Malformed cast response: {e}")))?;

        tracing::info!(hash = %parsed.cast.hash, reply = reply_to.is_some(), "Published cast");
        Ok(ThreadLink::new(parsed.cast.hash))
    }
}
