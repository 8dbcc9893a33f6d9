//! PhishBot - 将钓鱼演练活动的 webhook 事件转发到 Slack 和邮件

pub mod config;
pub mod notification;

pub use config::{ConfigSource, Settings};
pub use notification::{
    classify, parse_details, parse_envelope, redact, ChatMessage, ChatTransport, DispatchReport,
    EmailMessage, EmailTransport, Envelope, Event, NotificationBuilder, NotificationDispatcher,
    NotifyError, SendResult,
};
