//! Native host 错误定义

use thiserror::Error;

/// 帧读写错误
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Frame too large: {0} bytes")]
    TooLarge(usize),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 命令处理错误，最终都会转换成一条 error 响应
#[derive(Error, Debug)]
pub enum HostError {
    #[error("No message received")]
    NoMessage,

    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl HostError {
    /// 响应中的机器可读错误码
    pub fn code(&self) -> &'static str {
        match self {
            HostError::NoMessage => "no_message_received",
            HostError::UnknownType(_) => "unknown_message_type",
            HostError::Internal(_) => "internal_error",
        }
    }

    /// 是否需要以非零退出码结束进程
    pub fn is_fatal(&self) -> bool {
        !matches!(self, HostError::UnknownType(_))
    }
}

impl From<std::io::Error> for HostError {
    fn from(e: std::io::Error) -> Self {
        HostError::Internal(e.into())
    }
}
