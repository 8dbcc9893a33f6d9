//! 配置加载
//!
//! 配置文件：`~/.config/phishbot/config.json`（可通过 `--config` 覆盖）
//!
//! ```json
//! {
//!   "profiles": ["slack", "email"],
//!   "slack": {
//!     "webhook": "https://hooks.slack.com/services/...",
//!     "bot_username": "PhishBot",
//!     "bot_emoji": ":blowfish:",
//!     "channel": "#phishing",
//!     "disable_credentials": false
//!   },
//!   "email": {
//!     "host": "smtp.example.com",
//!     "port": 587,
//!     "username": "phishbot",
//!     "password": "...",
//!     "sender": "phishbot@example.com",
//!     "recipient": "redteam@example.com"
//!   },
//!   "email_send_click_template": "<p>{{.ID}} clicked</p>",
//!   "email_submitted_credentials_template": "<p>{{.Username}} submitted</p>",
//!   "ip_query_base": "https://ipinfo.io/"
//! }
//! ```
//!
//! 嵌套的键用点号访问，例如 `slack.disable_credentials`。

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::notification::error::{NotifyError, Result};

/// 已知的配置键
pub mod keys {
    pub const PROFILES: &str = "profiles";
    pub const SLACK_WEBHOOK: &str = "slack.webhook";
    pub const SLACK_USERNAME: &str = "slack.bot_username";
    pub const SLACK_EMOJI: &str = "slack.bot_emoji";
    pub const SLACK_CHANNEL: &str = "slack.channel";
    pub const SLACK_DISABLE_CREDENTIALS: &str = "slack.disable_credentials";
    pub const EMAIL_HOST: &str = "email.host";
    pub const EMAIL_PORT: &str = "email.port";
    pub const EMAIL_USERNAME: &str = "email.username";
    pub const EMAIL_PASSWORD: &str = "email.password";
    pub const EMAIL_SENDER: &str = "email.sender";
    pub const EMAIL_RECIPIENT: &str = "email.recipient";
    pub const CLICK_TEMPLATE: &str = "email_send_click_template";
    pub const SUBMITTED_TEMPLATE: &str = "email_submitted_credentials_template";
    pub const IP_QUERY_BASE: &str = "ip_query_base";
}

/// 只读配置源。缺失的键读作 `false` / `""`。
pub trait ConfigSource: Send + Sync {
    fn get_bool(&self, key: &str) -> bool;
    fn get_string(&self, key: &str) -> String;
}

/// 基于 JSON 的配置
#[derive(Debug, Clone, Default)]
pub struct Settings {
    root: Value,
}

impl Settings {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// 默认配置文件路径
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config/phishbot/config.json"))
    }

    /// 从指定文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| NotifyError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let root: Value = serde_json::from_str(&content)
            .map_err(|e| NotifyError::Config(format!("invalid JSON in {}: {}", path.display(), e)))?;
        if !root.is_object() {
            return Err(NotifyError::Config(format!(
                "{} must contain a JSON object",
                path.display()
            )));
        }
        debug!(path = %path.display(), "Loaded config");
        Ok(Self { root })
    }

    /// 加载默认配置文件；文件不存在时返回空配置
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No config file found, using empty settings");
                Ok(Self::default())
            }
        }
    }

    /// 按点号路径查找
    pub fn get(&self, key: &str) -> Option<&Value> {
        // 顶层允许直接用带点的键
        if let Some(value) = self.root.get(key) {
            return Some(value);
        }
        key.split('.')
            .try_fold(&self.root, |node, part| node.get(part))
    }

    pub fn get_u16(&self, key: &str) -> Option<u16> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 字符串数组；单个字符串视为只有一个元素
    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
            _ => Vec::new(),
        }
    }

    pub fn is_set(&self, key: &str) -> bool {
        !self.get_string(key).is_empty()
    }
}

impl ConfigSource for Settings {
    fn get_bool(&self, key: &str) -> bool {
        match self.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
            Some(Value::Number(n)) => n.as_i64().map(|n| n != 0).unwrap_or(false),
            _ => false,
        }
    }

    fn get_string(&self, key: &str) -> String {
        match self.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_dotted_lookup() {
        let settings = Settings::from_value(json!({
            "slack": {"disable_credentials": true, "channel": "#phish"},
            "email": {"port": 587}
        }));

        assert!(settings.get_bool(keys::SLACK_DISABLE_CREDENTIALS));
        assert_eq!(settings.get_string(keys::SLACK_CHANNEL), "#phish");
        assert_eq!(settings.get_u16(keys::EMAIL_PORT), Some(587));
        assert_eq!(settings.get_string(keys::EMAIL_PORT), "587");
    }

    #[test]
    fn test_missing_keys_read_as_zero_values() {
        let settings = Settings::default();
        assert!(!settings.get_bool(keys::SLACK_DISABLE_CREDENTIALS));
        assert_eq!(settings.get_string(keys::CLICK_TEMPLATE), "");
        assert!(settings.get_string_list(keys::PROFILES).is_empty());
        assert_eq!(settings.get_u16(keys::EMAIL_PORT), None);
    }

    #[test]
    fn test_flat_dotted_key_takes_precedence() {
        let settings = Settings::from_value(json!({"slack.disable_credentials": "true"}));
        assert!(settings.get_bool(keys::SLACK_DISABLE_CREDENTIALS));
    }

    #[test]
    fn test_profiles_list() {
        let settings = Settings::from_value(json!({"profiles": ["slack", "email"]}));
        assert_eq!(settings.get_string_list(keys::PROFILES), vec!["slack", "email"]);

        let single = Settings::from_value(json!({"profiles": "slack"}));
        assert_eq!(single.get_string_list(keys::PROFILES), vec!["slack"]);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"email_send_click_template": "Clicked: {{{{.ID}}}}"}}"#).unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.get_string(keys::CLICK_TEMPLATE), "Clicked: {{.ID}}");
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(Settings::load(file.path()), Err(NotifyError::Config(_))));

        let missing = Settings::load(Path::new("/nonexistent/phishbot.json"));
        assert!(matches!(missing, Err(NotifyError::Config(_))));
    }

    #[test]
    fn test_load_rejects_non_object() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, 2]").unwrap();
        assert!(matches!(Settings::load(file.path()), Err(NotifyError::Config(_))));
    }
}
