//! Webhook envelope 解析
//!
//! 上游（gophish 兼容）的 webhook body 形如：
//! ```json
//! {
//!   "success": true,
//!   "campaign_id": 3,
//!   "message": "Clicked Link",
//!   "details": "{\"payload\":{...},\"browser\":{...}}",
//!   "email": "victim@example.com"
//! }
//! ```
//! `message` 即事件状态字符串；`details` 通常是再编码过一次的 JSON 字符串。

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::error::Result;

/// 顶层 webhook 载荷
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Envelope {
    pub success: bool,
    pub campaign_id: u64,
    /// 事件状态（"Clicked Link"、"Submitted Data" 等）
    pub message: String,
    /// 原始 details 文本，交给 details 解析器处理
    #[serde(deserialize_with = "details_as_text")]
    pub details: String,
    pub email: String,
}

impl Envelope {
    /// 状态字符串
    pub fn status(&self) -> &str {
        &self.message
    }

    pub fn details_raw(&self) -> &[u8] {
        self.details.as_bytes()
    }
}

/// 解析 webhook body。缺失字段取零值，未知字段忽略，只有 JSON 本身非法时报错。
pub fn parse_envelope(body: &[u8]) -> Result<Envelope> {
    Ok(serde_json::from_slice(body)?)
}

// details 既可能是字符串，也可能是内联对象
fn details_as_text<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}
