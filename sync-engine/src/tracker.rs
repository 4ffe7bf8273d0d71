//! 变更跟踪
//!
//! 记录每个会话文件上次成功同步时的修改时间，只基于 mtime 判断变化，不做内容哈希。

use chrono::{DateTime, Utc};
use session_reader::SessionFile;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 同步状态：path → 上次同步时观察到的修改时间
///
/// 只增不减：路径只会新增，时间只会前进。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    synced: HashMap<PathBuf, DateTime<Utc>>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次成功同步，时间不会回退
    pub fn record(&mut self, path: &Path, modified_at: DateTime<Utc>) {
        self.synced
            .entry(path.to_path_buf())
            .and_modify(|t| {
                if modified_at > *t {
                    *t = modified_at;
                }
            })
            .or_insert(modified_at);
    }

    pub fn get(&self, path: &Path) -> Option<DateTime<Utc>> {
        self.synced.get(path).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.synced.contains_key(path)
    }

    /// 文件是否需要同步
    pub fn is_changed(&self, file: &SessionFile) -> bool {
        match self.synced.get(&file.path) {
            Some(last) => file.modified_at > *last,
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.synced.len()
    }

    pub fn is_empty(&self) -> bool {
        self.synced.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &DateTime<Utc>)> {
        self.synced.iter()
    }
}

impl FromIterator<(PathBuf, DateTime<Utc>)> for SyncState {
    fn from_iter<I: IntoIterator<Item = (PathBuf, DateTime<Utc>)>>(iter: I) -> Self {
        let mut state = Self::new();
        for (path, modified_at) in iter {
            state.record(&path, modified_at);
        }
        state
    }
}

/// 过滤出需要同步的文件（不修改状态）
pub fn filter_changed(files: &[SessionFile], state: &SyncState) -> Vec<SessionFile> {
    files
        .iter()
        .filter(|f| state.is_changed(f))
        .cloned()
        .collect()
}
