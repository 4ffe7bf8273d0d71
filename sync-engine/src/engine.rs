//! 同步引擎
//!
//! 组合枚举、变更跟踪和读取，完成一次同步。

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use session_reader::{
    list_project_dirs, read_session, scan_projects, scan_sessions, SessionFile, SessionPayload,
};
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::state_file::{load_state, save_state};
use crate::tracker::{filter_changed, SyncState};

/// 一次同步的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncResult {
    /// 成功读取的会话
    pub sessions: Vec<SessionPayload>,
    /// 本次枚举到的文件总数
    pub total_files_seen: usize,
    /// 成功同步的文件数
    pub synced_count: usize,
    /// 没有任何候选文件时为 `Some(total_files_seen)`
    pub unchanged: Option<usize>,
    pub timestamp: DateTime<Utc>,
}

/// 状态查询结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostStatus {
    pub claude_dir_exists: bool,
    pub projects_dir_exists: bool,
    pub total_files: usize,
    pub total_projects: usize,
    #[serde(with = "chrono::serde::ts_milliseconds_option")]
    pub last_sync_time: Option<DateTime<Utc>>,
    pub synced_files_count: usize,
}

/// 同步引擎
///
/// 独占持有 [`SyncState`]。一个进程只处理一条命令，不存在并发修改。
/// 状态文件只在 [`SyncEngine::commit`] 时写入，调用方须在结果送达之后再提交。
pub struct SyncEngine {
    config: SyncConfig,
    state: SyncState,
    last_sync_time: Option<DateTime<Utc>>,
    /// 上次提交后状态是否有变化
    dirty: bool,
}

impl SyncEngine {
    /// 使用空状态创建
    pub fn new(config: SyncConfig) -> Self {
        Self::with_state(config, SyncState::new())
    }

    /// 注入已有状态
    pub fn with_state(config: SyncConfig, state: SyncState) -> Self {
        Self {
            config,
            state,
            last_sync_time: None,
            dirty: false,
        }
    }

    /// 创建引擎，配置了状态文件时从磁盘恢复
    ///
    /// 状态文件损坏时记录警告并从空状态开始。
    pub async fn open(config: SyncConfig) -> Self {
        let Some(path) = config.state_file.clone() else {
            return Self::new(config);
        };

        match load_state(&path).await {
            Ok(persisted) => {
                debug!(
                    "Loaded {} synced entries from {:?}",
                    persisted.state.len(),
                    path
                );
                Self {
                    config,
                    state: persisted.state,
                    last_sync_time: persisted.last_sync_time,
                    dirty: false,
                }
            }
            Err(e) => {
                warn!("Ignoring unreadable state file: {:#}", e);
                Self::new(config)
            }
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn last_sync_time(&self) -> Option<DateTime<Utc>> {
        self.last_sync_time
    }

    /// 列出所有会话文件
    pub async fn list(&self) -> io::Result<Vec<SessionFile>> {
        scan_sessions(&self.config.projects_dir, &self.config.session_suffix).await
    }

    /// 查询状态（不修改任何状态）
    pub async fn status(&self) -> io::Result<HostStatus> {
        let projects = list_project_dirs(&self.config.projects_dir).await?;
        let files = scan_projects(&projects, &self.config.session_suffix).await;

        Ok(HostStatus {
            claude_dir_exists: path_exists(&self.config.claude_dir).await,
            projects_dir_exists: path_exists(&self.config.projects_dir).await,
            total_files: files.len(),
            total_projects: projects.len(),
            last_sync_time: self.last_sync_time,
            synced_files_count: self.state.len(),
        })
    }

    /// 执行一次同步
    ///
    /// `force` 为 true 时返回全部文件，否则只返回有变化的文件。
    /// 只有读取成功的文件才会写入状态，读取失败的文件下次仍是候选。
    pub async fn sync(&mut self, force: bool) -> Result<SyncResult> {
        let files = self.list().await?;
        let total = files.len();

        let candidates = if force {
            files
        } else {
            filter_changed(&files, &self.state)
        };

        if candidates.is_empty() {
            debug!("Nothing to sync ({} files unchanged)", total);
            return Ok(SyncResult {
                sessions: Vec::new(),
                total_files_seen: total,
                synced_count: 0,
                unchanged: Some(total),
                timestamp: Utc::now(),
            });
        }

        let mut sessions = Vec::with_capacity(candidates.len());
        for file in &candidates {
            let Some(payload) = read_session(&file.path).await else {
                continue;
            };
            // 读取成功后才提交
            self.state.record(&file.path, file.modified_at);
            sessions.push(payload);
        }

        let now = Utc::now();
        self.last_sync_time = Some(now);
        self.dirty = true;

        let skipped = candidates.len() - sessions.len();
        info!(
            "Synced {} of {} candidate sessions ({} files total, force={})",
            sessions.len(),
            candidates.len(),
            total,
            force
        );
        if skipped > 0 {
            debug!("{} sessions could not be read and stay pending", skipped);
        }

        Ok(SyncResult {
            synced_count: sessions.len(),
            sessions,
            total_files_seen: total,
            unchanged: None,
            timestamp: now,
        })
    }

    /// 结果送达后写回状态文件
    ///
    /// 写入前合并磁盘上其他进程提交的记录。失败只记录警告，文件下次会被重新投递。
    pub async fn commit(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;

        let Some(path) = self.config.state_file.clone() else {
            return;
        };

        match load_state(&path).await {
            Ok(on_disk) => {
                for (file, modified_at) in on_disk.state.iter() {
                    self.state.record(file, *modified_at);
                }
                self.last_sync_time = self.last_sync_time.max(on_disk.last_sync_time);
            }
            Err(e) => debug!("Overwriting unreadable state file: {:#}", e),
        }

        if let Err(e) = save_state(&path, &self.state, self.last_sync_time).await {
            warn!("Failed to save sync state: {:#}", e);
        }
    }
}

async fn path_exists(path: &Path) -> bool {
    fs::metadata(path).await.is_ok()
}
