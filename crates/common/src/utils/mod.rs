/// 工具函数集合

use chrono::{DateTime, TimeZone};
use uuid::Uuid;

/// 生成授权令牌
pub fn generate_token() -> String {
    Uuid::new_v4().to_string()
}

/// 遮蔽密钥或令牌用于日志
///
/// 最多显示前 4 个字符且不超过总长的四分之一，不足 8 个字符时全部遮蔽
pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len < 8 {
        return "****".to_string();
    }
    let visible: String = secret.chars().take((len / 4).min(4)).collect();
    format!("{}****", visible)
}

/// 生成快照归档文件名：`prefix-YYYY-MM-DD-HHMM.ext`
pub fn snapshot_file_name<Tz>(prefix: &str, at: &DateTime<Tz>, ext: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{}-{}.{}",
        prefix,
        at.format("%Y-%m-%d-%H%M"),
        ext.trim_start_matches('.')
    )
}

/// 按当前本地时间生成快照文件名
pub fn snapshot_file_name_now(prefix: &str, ext: &str) -> String {
    snapshot_file_name(prefix, &chrono::Local::now(), ext)
}
