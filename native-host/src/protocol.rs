//! 消息定义
//!
//! 扩展与 native host 之间的请求/响应，均以 `type` 字段区分

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use session_reader::SessionPayload;
use sync_engine::{HostStatus, SyncResult};

use crate::error::HostError;

// ==================== 请求 (Extension → Host) ====================

/// 扩展发来的请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostRequest {
    /// 查询目录与同步状态
    Status,
    /// 执行同步
    Sync { force: bool },
    /// 存活检测
    Ping,
    /// 无法识别的类型（包括缺少 type 字段）
    Unknown(String),
}

impl HostRequest {
    /// 从已解码的 JSON 解析请求
    ///
    /// 任何 JSON 值都能得到一个请求，无法识别的落入 `Unknown`。
    pub fn from_value(value: &Value) -> Self {
        let kind = match value.get("type") {
            Some(Value::String(s)) => s.as_str(),
            Some(other) => return HostRequest::Unknown(other.to_string()),
            None => return HostRequest::Unknown("undefined".to_string()),
        };

        match kind {
            "status" => HostRequest::Status,
            "sync" => HostRequest::Sync {
                force: value.get("force").and_then(Value::as_bool).unwrap_or(false),
            },
            "ping" => HostRequest::Ping,
            other => HostRequest::Unknown(other.to_string()),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            HostRequest::Status => "status",
            HostRequest::Sync { .. } => "sync",
            HostRequest::Ping => "ping",
            HostRequest::Unknown(kind) => kind.as_str(),
        }
    }
}

// ==================== 响应 (Host → Extension) ====================

/// 发回扩展的响应
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostResponse {
    Status(HostStatus),
    SyncResult(SyncResultData),
    Pong {
        #[serde(with = "chrono::serde::ts_milliseconds")]
        timestamp: DateTime<Utc>,
    },
    Error(ErrorData),
}

impl HostResponse {
    pub fn pong() -> Self {
        HostResponse::Pong {
            timestamp: Utc::now(),
        }
    }

    pub fn error(err: &HostError) -> Self {
        HostResponse::Error(ErrorData {
            error: err.to_string(),
            code: err.code().to_string(),
        })
    }
}

// ==================== 数据结构 ====================

/// 同步结果
///
/// 没有变化时只带 `sessions: []` 和 `unchanged`。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncResultData {
    pub sessions: Vec<SessionPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced: Option<usize>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unchanged: Option<usize>,
}

impl From<SyncResult> for SyncResultData {
    fn from(result: SyncResult) -> Self {
        match result.unchanged {
            Some(unchanged) => SyncResultData {
                sessions: Vec::new(),
                total: None,
                synced: None,
                timestamp: None,
                unchanged: Some(unchanged),
            },
            None => SyncResultData {
                sessions: result.sessions,
                total: Some(result.total_files_seen),
                synced: Some(result.synced_count),
                timestamp: Some(result.timestamp),
                unchanged: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorData {
    pub error: String,
    pub code: String,
}
