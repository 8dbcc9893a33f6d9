//! 通知系统构建器 - 根据配置注册渠道
//!
//! `profiles` 列出要启用的渠道（`slack`、`email`）。未配置 `profiles` 时，
//! 自动启用已填写必要参数的渠道（`slack.webhook`、`email.host`）。

use std::sync::Arc;

use tracing::{info, warn};

use super::channels::email::{EmailChannel, EmailConfig};
use super::dispatcher::NotificationDispatcher;
use super::error::Result;
use super::webhook::{WebhookClient, WebhookConfig};
use crate::config::{keys, Settings};

pub const PROFILE_SLACK: &str = "slack";
pub const PROFILE_EMAIL: &str = "email";

/// 通知系统构建器
pub struct NotificationBuilder {
    settings: Settings,
    dry_run: bool,
}

impl NotificationBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 要启用的渠道
    pub fn enabled_profiles(&self) -> Vec<String> {
        let configured = self.settings.get_string_list(keys::PROFILES);
        if !configured.is_empty() {
            return configured;
        }

        let mut detected = Vec::new();
        if self.settings.is_set(keys::SLACK_WEBHOOK) {
            detected.push(PROFILE_SLACK.to_string());
        }
        if self.settings.is_set(keys::EMAIL_HOST) {
            detected.push(PROFILE_EMAIL.to_string());
        }
        detected
    }

    /// 构建 NotificationDispatcher
    ///
    /// 启用的渠道缺少必要配置时返回 `NotifyError::Config`。
    pub fn build(self) -> Result<NotificationDispatcher> {
        let mut dispatcher =
            NotificationDispatcher::from_config(&self.settings).with_dry_run(self.dry_run);

        for profile in self.enabled_profiles() {
            match profile.as_str() {
                PROFILE_SLACK => {
                    let client = WebhookClient::new(WebhookConfig::from_settings(&self.settings))?;
                    dispatcher = dispatcher.with_chat(Arc::new(client));
                }
                PROFILE_EMAIL => {
                    let channel = EmailChannel::new(&EmailConfig::from_settings(&self.settings))?;
                    dispatcher = dispatcher.with_email(Arc::new(channel));
                }
                other => warn!(profile = %other, "Unknown notification profile, ignoring"),
            }
        }

        info!(channels = ?dispatcher.channel_names(), "Notification dispatcher ready");
        Ok(dispatcher)
    }
}
