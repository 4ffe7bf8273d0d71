//! 会话内容读取

use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::types::SessionPayload;

/// 读取整个会话文件
///
/// 文件在枚举后被删除、权限变化、非 UTF-8 内容都返回 `None`。
/// 会话文件由 Claude Code 实时写入，读取失败是正常情况。
pub async fn read_session(path: &Path) -> Option<SessionPayload> {
    match fs::read_to_string(path).await {
        Ok(content) => Some(SessionPayload {
            path: path.to_path_buf(),
            content,
        }),
        Err(e) => {
            debug!("Failed to read session {:?}: {}", path, e);
            None
        }
    }
}
