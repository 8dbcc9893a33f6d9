//! 邮件模板渲染
//!
//! 模板字符串来自配置（`email_send_click_template`、`email_submitted_credentials_template`），
//! 使用 Handlebars 严格模式渲染，可引用事件上的字段：
//! `CampaignID`、`ID`、`Email`、`Address`、`UserAgent`，提交事件额外有 `Username`、`Password`。
//!
//! 为兼容旧配置，Go 风格的 `{{.ID}}` 会被改写为 `{{ID}}`。

use std::borrow::Cow;
use std::sync::OnceLock;

use handlebars::Handlebars;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

use super::channel::EmailMessage;
use super::error::{NotifyError, Result};
use super::event::Event;
use crate::config::{keys, ConfigSource};

pub const SUBJECT_CLICKED: &str = "PhishBot - Email Clicked";
pub const SUBJECT_OPENED: &str = "PhishBot - Email Opened";
pub const SUBJECT_SUBMITTED: &str = "PhishBot - Credentials Submitted";

fn go_field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{\{\s*\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("valid regex")
    })
}

/// `{{.Field}}` -> `{{Field}}`
pub fn normalize_field_refs(template: &str) -> Cow<'_, str> {
    go_field_pattern().replace_all(template, "{{${1}}}")
}

/// 用 context 渲染模板。模板无法解析或引用了不存在的字段时返回 `NotifyError::Template`。
pub fn render_template<T: Serialize>(template: &str, context: &T) -> Result<String> {
    let mut registry = Handlebars::new();
    registry.set_strict_mode(true);
    registry
        .render_template(&normalize_field_refs(template), context)
        .map_err(|e| NotifyError::Template(e.to_string()))
}

/// 邮件渲染器
#[derive(Debug, Clone, Default)]
pub struct EmailRenderer {
    click_template: String,
    submitted_template: String,
}

impl EmailRenderer {
    pub fn new(click_template: impl Into<String>, submitted_template: impl Into<String>) -> Self {
        Self {
            click_template: click_template.into(),
            submitted_template: submitted_template.into(),
        }
    }

    pub fn from_config(config: &dyn ConfigSource) -> Self {
        Self::new(
            config.get_string(keys::CLICK_TEMPLATE),
            config.get_string(keys::SUBMITTED_TEMPLATE),
        )
    }

    /// 渲染邮件。只有 Click / Opened / Submitted 有邮件通知，其余返回 `Ok(None)`。
    ///
    /// Opened 复用点击模板。
    pub fn render(&self, event: &Event) -> Result<Option<EmailMessage>> {
        let (subject, body) = match event {
            Event::Click(target) => (SUBJECT_CLICKED, render_template(&self.click_template, target)?),
            Event::Opened(target) => (SUBJECT_OPENED, render_template(&self.click_template, target)?),
            Event::Submitted(details) => (
                SUBJECT_SUBMITTED,
                render_template(&self.submitted_template, details)?,
            ),
            Event::Session(_) | Event::Ignored | Event::Unknown(_) => return Ok(None),
        };
        debug!(subject, body_len = body.len(), "Rendered email");
        Ok(Some(EmailMessage {
            subject: subject.to_string(),
            body,
        }))
    }
}
