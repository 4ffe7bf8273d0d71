//! 领域类型定义
//!
//! session-reader 对外暴露的类型，JSON 形式统一使用 camelCase。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Claude Code 会话文件后缀
pub const SESSION_SUFFIX: &str = ".jsonl";

/// 隐藏文件前缀，带此前缀的文件不参与枚举
pub const HIDDEN_PREFIX: char = '.';

/// 会话文件快照
///
/// 单次枚举时采集的文件元数据，每次枚举重新获取，本 crate 不做持久化。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionFile {
    /// 绝对路径（唯一键）
    pub path: PathBuf,
    /// 修改时间（序列化为毫秒时间戳）
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub modified_at: DateTime<Utc>,
    /// 文件大小（字节）
    pub size_bytes: u64,
}

/// 会话内容
///
/// 整个文件的原始文本，不做解析。解析/导入由扩展端负责。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPayload {
    pub path: PathBuf,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_session_file_json_shape() {
        let file = SessionFile {
            path: PathBuf::from("/tmp/projects/demo/abc.jsonl"),
            modified_at: Utc.timestamp_millis_opt(1_700_000_000_123).unwrap(),
            size_bytes: 42,
        };

        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["path"], "/tmp/projects/demo/abc.jsonl");
        assert_eq!(json["modifiedAt"], 1_700_000_000_123_i64);
        assert_eq!(json["sizeBytes"], 42);
    }
}
