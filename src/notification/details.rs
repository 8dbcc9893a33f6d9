//! 事件 details 解析
//!
//! details 由两部分组成：
//! - `payload`：落地页提交的表单参数（query string，或上游的 `{"key": ["v1", ...]}` 形式）
//! - `browser`：浏览器元数据（`user-agent`、`address`）

use std::collections::HashMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::error::Result;

const ID_KEY: &str = "access_token_v";
const USER_AGENT_KEY: &str = "user-agent";
const ADDRESS_KEY: &str = "address";

/// 有序的多值表单参数，同一个 key 可以出现多次
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormValues(Vec<(String, String)>);

impl FormValues {
    /// 解析 `a=1&b=2` 形式的 query string（百分号解码，`+` 视为空格）
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self(
            url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        )
    }

    /// 返回 key 的第一个值，不存在时返回空字符串
    pub fn get(&self, key: &str) -> &str {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }

    /// 返回 key 的全部值
    pub fn get_all<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FormValues {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(Self::default()),
            Value::String(query) => Ok(Self::from_query(&query)),
            Value::Object(map) => {
                let mut pairs = Vec::new();
                for (key, value) in map {
                    match value {
                        Value::Array(items) => {
                            for item in items {
                                if let Some(s) = scalar_to_string(item) {
                                    pairs.push((key.clone(), s));
                                }
                            }
                        }
                        other => {
                            if let Some(s) = scalar_to_string(other) {
                                pairs.push((key, s));
                            }
                        }
                    }
                }
                Ok(Self(pairs))
            }
            other => Err(D::Error::custom(format!(
                "payload must be a query string or an object, got {}",
                other
            ))),
        }
    }
}

fn scalar_to_string(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// 解析后的 details
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DetailsBlob {
    pub payload: FormValues,
    #[serde(deserialize_with = "nullable_map")]
    pub browser: HashMap<String, String>,
}

impl DetailsBlob {
    /// 受害者追踪 ID
    pub fn id(&self) -> &str {
        self.payload.get(ID_KEY)
    }

    pub fn user_agent(&self) -> &str {
        self.browser_value(USER_AGENT_KEY)
    }

    pub fn address(&self) -> &str {
        self.browser_value(ADDRESS_KEY)
    }

    pub fn payload_value(&self, key: &str) -> &str {
        self.payload.get(key)
    }

    fn browser_value(&self, key: &str) -> &str {
        self.browser.get(key).map(String::as_str).unwrap_or("")
    }
}

/// 解析 details。空输入（或 `null`）视为没有 details，返回空表；非法 JSON 报错。
pub fn parse_details(raw: &[u8]) -> Result<DetailsBlob> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Ok(DetailsBlob::default());
    }
    let details: Option<DetailsBlob> = serde_json::from_slice(raw)?;
    Ok(details.unwrap_or_default())
}

fn nullable_map<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}
