//! Native messaging host 模块
//!
//! 通过 stdin/stdout 与浏览器扩展交换长度前缀 JSON 帧，
//! 把请求分发给 sync-engine

mod dispatch;
mod error;
mod frame;
mod protocol;

pub use dispatch::{HostExit, HostPhase, NativeHost};
pub use error::{FrameError, HostError};
pub use frame::{decode_frame, encode_frame, read_frame, write_frame};
pub use protocol::{ErrorData, HostRequest, HostResponse, SyncResultData};
