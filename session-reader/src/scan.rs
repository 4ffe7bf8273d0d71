//! 会话文件枚举
//!
//! 目录结构：`<projects>/<project>/<session>.jsonl`，只向下一层。
//! 单个项目目录读取失败只影响该目录，不中断整体枚举。

use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::types::{SessionFile, HIDDEN_PREFIX};

/// 判断文件名是否为会话文件
pub fn is_session_file_name(name: &str, suffix: &str) -> bool {
    name.ends_with(suffix) && !name.starts_with(HIDDEN_PREFIX)
}

/// 列出所有项目目录
///
/// 根目录不存在时返回空列表；根目录存在但无法读取时返回错误。
pub async fn list_project_dirs(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        // 路径要以 JSON 字符串发回扩展
        if path.to_str().is_none() {
            debug!("Skipping non UTF-8 project {:?}", path);
            continue;
        }
        // metadata 跟随符号链接
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => dirs.push(path),
            Ok(_) => {}
            Err(e) => debug!("Skipping project entry {:?}: {}", path, e),
        }
    }

    Ok(dirs)
}

/// 枚举单个项目目录下的会话文件
pub async fn scan_project(dir: &Path, suffix: &str) -> io::Result<Vec<SessionFile>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_session_file_name(name, suffix) {
            continue;
        }
        if path.to_str().is_none() {
            debug!("Skipping non UTF-8 session {:?}", path);
            continue;
        }

        match stat_session(&path).await {
            Ok(Some(file)) => files.push(file),
            Ok(None) => {}
            // 文件可能在枚举和 stat 之间被删除
            Err(e) => debug!("Failed to stat {:?}: {}", path, e),
        }
    }

    Ok(files)
}

/// 枚举给定项目目录下的会话文件，单个目录失败时跳过
pub async fn scan_projects(dirs: &[PathBuf], suffix: &str) -> Vec<SessionFile> {
    let mut files = Vec::new();

    for dir in dirs {
        match scan_project(dir, suffix).await {
            Ok(found) => files.extend(found),
            Err(e) => debug!("Skipping unreadable project {:?}: {}", dir, e),
        }
    }

    files
}

/// 枚举所有项目下的会话文件
///
/// 返回顺序不做保证。
pub async fn scan_sessions(root: &Path, suffix: &str) -> io::Result<Vec<SessionFile>> {
    let dirs = list_project_dirs(root).await?;
    let files = scan_projects(&dirs, suffix).await;

    debug!("Scanned {} session files under {:?}", files.len(), root);
    Ok(files)
}

async fn stat_session(path: &Path) -> io::Result<Option<SessionFile>> {
    let meta = fs::metadata(path).await?;
    if !meta.is_file() {
        return Ok(None);
    }

    Ok(Some(SessionFile {
        path: path.to_path_buf(),
        modified_at: DateTime::<Utc>::from(meta.modified()?),
        size_bytes: meta.len(),
    }))
}
