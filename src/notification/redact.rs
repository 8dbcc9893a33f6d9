//! 聊天渠道的敏感字段脱敏
//!
//! 这只是为了在聊天频道里"一眼可辨"而做的遮挡，不是加密意义上的脱敏：
//! 长度大于 2 的值会暴露首尾各 2 个字符，且能推断出原长度。

const KEEP: usize = 2;
const MASK: &str = "***";

/// 保留首尾各 2 个字符，中间替换为 `***`；长度不超过 2 时返回空字符串。
///
/// 按 Unicode 字符计数，多字节字符不会被截断。
pub fn redact(value: &str) -> String {
    let len = value.chars().count();
    if len <= KEEP {
        return String::new();
    }
    let head: String = value.chars().take(KEEP).collect();
    let tail: String = value.chars().skip(len - KEEP).collect();
    format!("{head}{MASK}{tail}")
}
