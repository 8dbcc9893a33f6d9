//! 具体渠道实现
//!
//! Slack 渠道见 [`crate::notification::webhook`]。

pub mod email;

pub use email::{EmailChannel, EmailConfig};
