//! 通知错误类型

/// 通知处理过程中可能出现的错误
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Envelope 或 details 不是合法的 JSON
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// 邮件模板解析失败，或引用了事件上不存在的字段
    #[error("template error: {0}")]
    Template(String),

    /// 渠道发送失败（由传输层报告，不重试）
    #[error("{channel} transport error: {message}")]
    Transport { channel: String, message: String },

    /// 配置缺失或非法
    #[error("config error: {0}")]
    Config(String),
}

impl NotifyError {
    pub fn transport(channel: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Transport {
            channel: channel.into(),
            message: message.to_string(),
        }
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }

    pub fn is_template(&self) -> bool {
        matches!(self, Self::Template(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;
