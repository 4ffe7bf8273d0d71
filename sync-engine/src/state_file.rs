//! 同步状态持久化
//!
//! 可选功能：native host 每次请求都是新进程，配置状态文件后跨进程保留已同步记录。
//! 写入采用 write-then-rename，避免中途崩溃留下半个文件。

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::tracker::SyncState;

const STATE_FILE_VERSION: u32 = 1;

/// 磁盘格式
///
/// 时间使用 RFC 3339 全精度，避免毫秒截断导致文件被反复判定为已变更。
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StateFileData {
    version: u32,
    #[serde(default)]
    last_sync_time: Option<DateTime<Utc>>,
    #[serde(default)]
    files: BTreeMap<PathBuf, DateTime<Utc>>,
}

/// 从磁盘恢复的状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistedState {
    pub state: SyncState,
    pub last_sync_time: Option<DateTime<Utc>>,
}

/// 读取状态文件，文件不存在时返回空状态
pub async fn load_state(path: &Path) -> Result<PersistedState> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(PersistedState::default()),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", path)),
    };

    let data: StateFileData =
        serde_json::from_str(&raw).with_context(|| format!("Invalid state file {:?}", path))?;
    if data.version != STATE_FILE_VERSION {
        anyhow::bail!("Unsupported state file version {} in {:?}", data.version, path);
    }

    Ok(PersistedState {
        state: data.files.into_iter().collect(),
        last_sync_time: data.last_sync_time,
    })
}

/// 写入状态文件
pub async fn save_state(
    path: &Path,
    state: &SyncState,
    last_sync_time: Option<DateTime<Utc>>,
) -> Result<()> {
    let data = StateFileData {
        version: STATE_FILE_VERSION,
        last_sync_time,
        files: state.iter().map(|(p, t)| (p.clone(), *t)).collect(),
    };
    let json = serde_json::to_string_pretty(&data)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {:?}", parent))?;
    }

    // 多个 host 进程可能同时提交，临时文件按进程区分
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(format!(".{}.tmp", std::process::id()));
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, json)
        .await
        .with_context(|| format!("Failed to write {:?}", temp_path))?;
    fs::rename(&temp_path, path)
        .await
        .with_context(|| format!("Failed to replace {:?}", path))?;

    Ok(())
}
