//! 活动事件结构与状态分类
//!
//! 每次 webhook 调用产生一个 `Event`，由 envelope 的状态字符串决定类型。

use serde::Serialize;
use tracing::warn;

use super::details::parse_details;
use super::envelope::Envelope;
use super::error::Result;

pub const CLICKED_LINK: &str = "Clicked Link";
pub const EMAIL_OPENED: &str = "Email Opened";
pub const EMAIL_OPENED_SMS: &str = "Email/SMS Opened";
pub const SUBMITTED_DATA: &str = "Submitted Data";
pub const CAPTURED_SESSION: &str = "Captured Session";
pub const EMAIL_SENT: &str = "Email Sent";
pub const EMAIL_SENT_SMS: &str = "Email/SMS Sent";

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Click,
    Opened,
    Submitted,
    Session,
    Ignored,
}

/// 状态字符串 -> 事件类型。带 `/SMS` 的是支持短信活动的上游命名。
const STATUS_TABLE: &[(&str, EventKind)] = &[
    (CLICKED_LINK, EventKind::Click),
    (EMAIL_OPENED, EventKind::Opened),
    (EMAIL_OPENED_SMS, EventKind::Opened),
    (SUBMITTED_DATA, EventKind::Submitted),
    (CAPTURED_SESSION, EventKind::Session),
    (EMAIL_SENT, EventKind::Ignored),
    (EMAIL_SENT_SMS, EventKind::Ignored),
];

/// 精确、区分大小写地查表
pub fn kind_for_status(status: &str) -> Option<EventKind> {
    STATUS_TABLE
        .iter()
        .find(|(name, _)| *name == status)
        .map(|(_, kind)| *kind)
}

/// 所有事件共有的目标信息
///
/// 字段名按邮件模板中的变量名序列化（`{{ID}}`、`{{UserAgent}}` 等）。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TargetDetails {
    #[serde(rename = "CampaignID")]
    pub campaign_id: u64,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Email")]
    pub email: String,
    #[serde(rename = "Address")]
    pub address: String,
    #[serde(rename = "UserAgent")]
    pub user_agent: String,
}

/// 表单提交事件，额外携带凭据
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubmittedDetails {
    #[serde(flatten)]
    pub target: TargetDetails,
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Password")]
    pub password: String,
}

/// 分类后的事件
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "details", rename_all = "snake_case")]
pub enum Event {
    Click(TargetDetails),
    Opened(TargetDetails),
    Submitted(SubmittedDetails),
    Session(TargetDetails),
    /// 邮件/短信已发送，无需通知
    Ignored,
    /// 无法识别的状态
    Unknown(String),
}

impl Event {
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Event::Click(_) => Some(EventKind::Click),
            Event::Opened(_) => Some(EventKind::Opened),
            Event::Submitted(_) => Some(EventKind::Submitted),
            Event::Session(_) => Some(EventKind::Session),
            Event::Ignored => Some(EventKind::Ignored),
            Event::Unknown(_) => None,
        }
    }

    /// 共有的目标信息，Ignored/Unknown 没有
    pub fn target(&self) -> Option<&TargetDetails> {
        match self {
            Event::Click(t) | Event::Opened(t) | Event::Session(t) => Some(t),
            Event::Submitted(s) => Some(&s.target),
            Event::Ignored | Event::Unknown(_) => None,
        }
    }

    /// 是否需要发送通知
    pub fn is_actionable(&self) -> bool {
        self.target().is_some()
    }
}

/// 根据状态字符串构造事件
///
/// 只有需要通知的事件才会解析 `details_raw`，解析失败时直接返回错误。
/// 未知状态记录一条 warning，不算错误。
pub fn classify(status: &str, envelope: &Envelope, details_raw: &[u8]) -> Result<Event> {
    let kind = match kind_for_status(status) {
        Some(EventKind::Ignored) => return Ok(Event::Ignored),
        Some(kind) => kind,
        None => {
            warn!(status = %status, campaign_id = envelope.campaign_id, "unknown status");
            return Ok(Event::Unknown(status.to_string()));
        }
    };

    let details = parse_details(details_raw)?;
    let target = TargetDetails {
        campaign_id: envelope.campaign_id,
        id: details.id().to_string(),
        email: envelope.email.clone(),
        address: details.address().to_string(),
        user_agent: details.user_agent().to_string(),
    };

    Ok(match kind {
        EventKind::Click => Event::Click(target),
        EventKind::Opened => Event::Opened(target),
        EventKind::Session => Event::Session(target),
        EventKind::Submitted => Event::Submitted(SubmittedDetails {
            target,
            username: details.payload_value("unme").to_string(),
            password: details.payload_value("password").to_string(),
        }),
        EventKind::Ignored => Event::Ignored,
    })
}

/// 使用 envelope 自带的状态和 details 分类
pub fn classify_envelope(envelope: &Envelope) -> Result<Event> {
    classify(envelope.status(), envelope, envelope.details_raw())
}
