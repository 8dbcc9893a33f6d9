//! 通知渠道 trait 与消息定义

use async_trait::async_trait;
use serde::Serialize;

use super::error::Result;

/// 聊天消息中的一个字段
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatField {
    pub title: String,
    pub value: String,
}

/// 聊天消息（对应 Slack attachment）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub title: String,
    /// 侧边颜色，例如 `#ffa500`
    pub color: String,
    pub fields: Vec<ChatField>,
}

impl ChatMessage {
    pub fn new(title: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color: color.into(),
            fields: Vec::new(),
        }
    }

    /// 追加字段（保持顺序）
    pub fn add_field(&mut self, title: impl Into<String>, value: impl Into<String>) {
        self.fields.push(ChatField {
            title: title.into(),
            value: value.into(),
        });
    }

    /// 按标题查找字段
    pub fn field(&self, title: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.title == title)
            .map(|f| f.value.as_str())
    }

    pub fn field_titles(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.title.as_str()).collect()
    }
}

/// 邮件消息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailMessage {
    pub subject: String,
    pub body: String,
}

/// 单个渠道的发送结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 发送成功
    Sent,
    /// 跳过（渠道未启用、事件无需该渠道、dry-run 等）
    Skipped(String),
}

/// 聊天渠道
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    async fn send(&self, message: &ChatMessage) -> Result<()>;
}

/// 邮件渠道
#[async_trait]
pub trait EmailTransport: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, subject: &str, body: &str) -> Result<()>;
}
