//! 聊天消息格式化 - 将事件转换为 Slack attachment
//!
//! 每种事件有固定的标题和颜色：
//! - Clicked Link：橙色
//! - Email Opened：黄色
//! - Submitted Data / Captured Session：红色
//!
//! 凭据相关字段（Email、Username、Password）受 `slack.disable_credentials` 控制，
//! 关闭时完全不出现在消息里。

use std::net::IpAddr;

use super::channel::ChatMessage;
use super::event::{Event, SubmittedDetails, TargetDetails};
use super::redact::redact;
use crate::config::{keys, ConfigSource};

/// 消息标题和字段名
pub mod msg {
    pub const CLICKED_LINK_TITLE: &str = ":fish: Clicked Link";
    pub const EMAIL_OPENED_TITLE: &str = ":ocean: Email Opened";
    pub const SUBMITTED_DATA_TITLE: &str = ":fishing_pole_and_fish: Submitted Data";
    pub const CAPTURED_SESSION_TITLE: &str = ":shark: Captured Session";

    pub const FIELD_ID: &str = "ID";
    pub const FIELD_ADDRESS: &str = "Address";
    pub const FIELD_USER_AGENT: &str = "User Agent";
    pub const FIELD_EMAIL: &str = "Email";
    pub const FIELD_USERNAME: &str = "Username";
    pub const FIELD_PASSWORD: &str = "Password";
}

pub mod color {
    pub const ORANGE: &str = "#ffa500";
    pub const YELLOW: &str = "#ffff00";
    pub const RED: &str = "#f05b4f";
}

/// 聊天消息格式化器
#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    /// 不在聊天消息中展示任何凭据/邮箱
    disable_credentials: bool,
    /// IP 查询链接前缀，例如 `https://ipinfo.io/`
    ip_query_base: String,
}

impl MessageFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从配置读取脱敏策略
    pub fn from_config(config: &dyn ConfigSource) -> Self {
        Self {
            disable_credentials: config.get_bool(keys::SLACK_DISABLE_CREDENTIALS),
            ip_query_base: config.get_string(keys::IP_QUERY_BASE),
        }
    }

    pub fn with_disable_credentials(mut self, disable: bool) -> Self {
        self.disable_credentials = disable;
        self
    }

    pub fn with_ip_query_base(mut self, base: impl Into<String>) -> Self {
        self.ip_query_base = base.into();
        self
    }

    /// 格式化事件；Ignored / Unknown 没有聊天消息
    pub fn format_event(&self, event: &Event) -> Option<ChatMessage> {
        let message = match event {
            Event::Click(target) => {
                self.format_visit(msg::CLICKED_LINK_TITLE, color::ORANGE, target)
            }
            Event::Opened(target) => {
                self.format_visit(msg::EMAIL_OPENED_TITLE, color::YELLOW, target)
            }
            Event::Submitted(details) => self.format_submitted(details),
            Event::Session(target) => {
                // 会话捕获不展示任何凭据
                self.base_message(msg::CAPTURED_SESSION_TITLE, color::RED, target)
            }
            Event::Ignored | Event::Unknown(_) => return None,
        };
        Some(message)
    }

    fn base_message(&self, title: &str, color: &str, target: &TargetDetails) -> ChatMessage {
        let mut message = ChatMessage::new(title, color);
        message.add_field(msg::FIELD_ID, &target.id);
        message.add_field(msg::FIELD_ADDRESS, self.format_ip(&target.address));
        message.add_field(msg::FIELD_USER_AGENT, &target.user_agent);
        message
    }

    // Click / Opened：邮箱原样展示
    fn format_visit(&self, title: &str, color: &str, target: &TargetDetails) -> ChatMessage {
        let mut message = self.base_message(title, color, target);
        if !self.disable_credentials {
            message.add_field(msg::FIELD_EMAIL, &target.email);
        }
        message
    }

    fn format_submitted(&self, details: &SubmittedDetails) -> ChatMessage {
        let mut message = self.base_message(msg::SUBMITTED_DATA_TITLE, color::RED, &details.target);
        if self.disable_credentials {
            return message;
        }

        let sensitive = [
            (msg::FIELD_EMAIL, &details.target.email),
            (msg::FIELD_USERNAME, &details.username),
            (msg::FIELD_PASSWORD, &details.password),
        ];
        for (title, value) in sensitive {
            if !value.is_empty() {
                message.add_field(title, redact(value));
            }
        }
        message
    }

    /// IP 地址包装为链接（配置了 `ip_query_base` 时）或代码块，其他字符串原样返回
    pub fn format_ip(&self, address: &str) -> String {
        format_ip(address, &self.ip_query_base)
    }
}

/// 见 [`MessageFormatter::format_ip`]
pub fn format_ip(address: &str, query_base: &str) -> String {
    let trimmed = address.trim();
    if trimmed.parse::<IpAddr>().is_err() {
        return address.to_string();
    }
    if query_base.is_empty() {
        format!("`{}`", trimmed)
    } else {
        format!("<{}{}|{}>", query_base, trimmed, trimmed)
    }
}
