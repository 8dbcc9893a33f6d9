//! Slack Incoming Webhook 客户端
//!
//! 将 `ChatMessage` 作为一个 attachment 发送到 Slack 兼容的 incoming webhook。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{error, info};

use super::channel::{ChatMessage, ChatTransport};
use super::error::{NotifyError, Result};
use crate::config::{keys, ConfigSource, Settings};

const CHANNEL_NAME: &str = "slack";

/// Webhook 客户端配置
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Incoming webhook URL
    pub webhook_url: String,
    /// 机器人显示名
    pub username: String,
    /// 机器人头像 emoji
    pub icon_emoji: String,
    /// 覆盖 webhook 默认频道（可选）
    pub channel: String,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            username: "PhishBot".to_string(),
            icon_emoji: ":blowfish:".to_string(),
            channel: String::new(),
            timeout_secs: 30,
        }
    }
}

impl WebhookConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        let or_default = |key: &str, fallback: String| {
            let value = settings.get_string(key);
            if value.is_empty() { fallback } else { value }
        };
        Self {
            webhook_url: settings.get_string(keys::SLACK_WEBHOOK),
            username: or_default(keys::SLACK_USERNAME, defaults.username),
            icon_emoji: or_default(keys::SLACK_EMOJI, defaults.icon_emoji),
            channel: settings.get_string(keys::SLACK_CHANNEL),
            timeout_secs: defaults.timeout_secs,
        }
    }
}

/// Webhook 请求载荷
#[derive(Debug, Serialize)]
pub struct WebhookPayload<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    pub username: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub icon_emoji: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub channel: &'a str,
    pub attachments: Vec<&'a ChatMessage>,
}

/// Slack Webhook 客户端
#[derive(Debug)]
pub struct WebhookClient {
    client: Client,
    config: WebhookConfig,
}

impl WebhookClient {
    /// 创建新的 Webhook 客户端
    pub fn new(config: WebhookConfig) -> Result<Self> {
        if config.webhook_url.is_empty() {
            return Err(NotifyError::Config("slack.webhook is required".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifyError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// 构建请求载荷
    pub fn payload<'a>(&'a self, message: &'a ChatMessage) -> WebhookPayload<'a> {
        WebhookPayload {
            username: &self.config.username,
            icon_emoji: &self.config.icon_emoji,
            channel: &self.config.channel,
            attachments: vec![message],
        }
    }
}

#[async_trait]
impl ChatTransport for WebhookClient {
    fn name(&self) -> &str {
        CHANNEL_NAME
    }

    async fn send(&self, message: &ChatMessage) -> Result<()> {
        let response = self
            .client
            .post(&self.config.webhook_url)
            .json(&self.payload(message))
            .send()
            .await
            .map_err(|e| NotifyError::transport(CHANNEL_NAME, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            info!(channel = CHANNEL_NAME, title = %message.title, "Message sent successfully");
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            error!(channel = CHANNEL_NAME, status = %status, body = %body, "Failed to send message");
            Err(NotifyError::transport(CHANNEL_NAME, format!("HTTP {}: {}", status, body)))
        }
    }
}
