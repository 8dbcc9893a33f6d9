//! 通知层 - 将钓鱼演练活动的 webhook 事件转发到聊天和邮件
//!
//! # 处理流程
//! 1. `envelope`：解析 webhook body，得到状态、活动 ID 和 details
//! 2. `details`：解析 details 中的表单参数和浏览器信息
//! 3. `event`：按状态字符串分类，构造事件
//! 4. `formatter` / `template`：渲染聊天消息和邮件
//! 5. `dispatcher`：并发发送到两个渠道
//!
//! # 使用示例
//! ```ignore
//! use phishbot::config::Settings;
//! use phishbot::notification::NotificationBuilder;
//!
//! let dispatcher = NotificationBuilder::new(Settings::load_default()?).build()?;
//! let report = dispatcher.dispatch(&body).await?;
//! ```

pub mod builder;
pub mod channel;
pub mod channels;
pub mod details;
pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod event;
pub mod formatter;
pub mod redact;
pub mod template;
pub mod webhook;

pub use builder::NotificationBuilder;
pub use channel::{ChatField, ChatMessage, ChatTransport, EmailMessage, EmailTransport, SendResult};
pub use details::{parse_details, DetailsBlob, FormValues};
pub use dispatcher::{DispatchReport, NotificationDispatcher, Rendered};
pub use envelope::{parse_envelope, Envelope};
pub use error::NotifyError;
pub use event::{classify, classify_envelope, Event, EventKind, SubmittedDetails, TargetDetails};
pub use formatter::{format_ip, MessageFormatter};
pub use redact::redact;
pub use template::{render_template, EmailRenderer};
pub use webhook::{WebhookClient, WebhookConfig};
