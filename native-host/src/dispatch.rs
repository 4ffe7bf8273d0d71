//! 命令分发
//!
//! 每个进程只处理一次请求/响应：
//! `Idle -> AwaitingMessage -> Dispatching -> Responded -> Terminated`。
//! 所有退出路径都恰好写出一帧响应。同步状态在响应写出之后才提交。

use anyhow::anyhow;
use std::process::ExitCode;
use sync_engine::SyncEngine;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::error::{FrameError, HostError};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{HostRequest, HostResponse};

/// 进程所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPhase {
    Idle,
    AwaitingMessage,
    Dispatching,
    Responded,
    Terminated,
}

/// 进程退出结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostExit {
    Success,
    Failure,
}

impl HostExit {
    pub fn code(self) -> u8 {
        match self {
            HostExit::Success => 0,
            HostExit::Failure => 1,
        }
    }
}

impl From<HostExit> for ExitCode {
    fn from(exit: HostExit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Native messaging host
pub struct NativeHost {
    engine: SyncEngine,
    phase: HostPhase,
}

impl NativeHost {
    pub fn new(engine: SyncEngine) -> Self {
        Self {
            engine,
            phase: HostPhase::Idle,
        }
    }

    pub fn phase(&self) -> HostPhase {
        self.phase
    }

    /// 处理单个请求
    pub async fn handle(&mut self, request: HostRequest) -> Result<HostResponse, HostError> {
        match request {
            HostRequest::Status => Ok(HostResponse::Status(self.engine.status().await?)),
            HostRequest::Sync { force } => {
                let result = self.engine.sync(force).await?;
                Ok(HostResponse::SyncResult(result.into()))
            }
            HostRequest::Ping => Ok(HostResponse::pong()),
            HostRequest::Unknown(kind) => Err(HostError::UnknownType(kind)),
        }
    }

    /// 读取一帧请求，处理后写回一帧响应
    pub async fn run<R, W>(&mut self, input: &mut R, output: &mut W) -> HostExit
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.transition(HostPhase::AwaitingMessage);

        let outcome = match read_frame(input).await {
            Some(message) => {
                self.transition(HostPhase::Dispatching);
                let request = HostRequest::from_value(&message);
                info!("Handling {} request", request.kind());
                self.handle(request).await
            }
            None => Err(HostError::NoMessage),
        };

        let (response, mut exit) = match outcome {
            Ok(response) => (response, HostExit::Success),
            Err(e) if e.is_fatal() => {
                error!("Request failed: {}", e);
                (HostResponse::error(&e), HostExit::Failure)
            }
            Err(e) => {
                warn!("{}", e);
                (HostResponse::error(&e), HostExit::Success)
            }
        };

        match deliver(output, &response).await {
            Ok(()) => self.engine.commit().await,
            Err(e) => {
                error!("Failed to write response: {}", e);
                exit = HostExit::Failure;
            }
        }
        self.transition(HostPhase::Responded);

        self.transition(HostPhase::Terminated);
        exit
    }

    fn transition(&mut self, next: HostPhase) {
        debug!("Host phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }
}

/// 写出响应帧
///
/// 响应无法序列化时改写一条 `internal_error` 响应，并仍返回原错误。
async fn deliver<W>(output: &mut W, response: &HostResponse) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    match write_frame(output, response).await {
        Err(FrameError::Serialization(e)) => {
            let fallback = HostError::Internal(anyhow!("Failed to serialize response: {}", e));
            write_frame(output, &HostResponse::error(&fallback)).await?;
            Err(FrameError::Serialization(e))
        }
        other => other,
    }
}
