use crate::config::LineConfig;
use crate::models::reply::ReplyMessage;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Messaging platform collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingPlatform: Send + Sync {
    async fn reply(&self, reply_token: &str, messages: Vec<ReplyMessage>) -> Result<()>;

    async fn user_profile(&self, user_id: &str) -> Result<UserProfile>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<ReplyMessage>,
}

/// LINE Messaging API client.
#[derive(Clone)]
pub struct LineClient {
    client: Client,
    base_url: String,
    access_token: String,
}

impl LineClient {
    pub fn new(config: &LineConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            access_token: config.channel_access_token.clone(),
        })
    }
}

#[async_trait]
impl MessagingPlatform for LineClient {
    async fn reply(&self, reply_token: &str, messages: Vec<ReplyMessage>) -> Result<()> {
        let count = messages.len();
        let response = self
            .client
            .post(format!("{}/v2/bot/message/reply", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&ReplyRequest {
                reply_token,
                messages,
            })
            .send()
            .await
            .context("Failed to call LINE reply API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LINE reply API error: {} - {}", status, body);
        }

        debug!("Sent {} reply message(s)", count);
        Ok(())
    }

    async fn user_profile(&self, user_id: &str) -> Result<UserProfile> {
        let response = self
            .client
            .get(format!("{}/v2/bot/profile/{}", self.base_url, user_id))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("Failed to call LINE profile API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LINE profile API error: {} - {}", status, body);
        }

        response
            .json::<UserProfile>()
            .await
            .context("Failed to parse LINE profile")
    }
}
