//! 路径配置

use anyhow::{anyhow, Result};
use session_reader::SESSION_SUFFIX;
use std::path::PathBuf;

/// Claude Code 配置目录的环境变量
pub const CLAUDE_CONFIG_DIR_ENV: &str = "CLAUDE_CONFIG_DIR";

/// 同步配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Claude 配置目录（如 ~/.claude）
    pub claude_dir: PathBuf,
    /// 项目目录（claude_dir/projects）
    pub projects_dir: PathBuf,
    /// 会话文件后缀
    pub session_suffix: String,
    /// 同步状态文件，为空时状态只在进程内有效
    pub state_file: Option<PathBuf>,
}

impl SyncConfig {
    pub fn new(claude_dir: PathBuf) -> Self {
        let projects_dir = claude_dir.join("projects");
        Self {
            claude_dir,
            projects_dir,
            session_suffix: SESSION_SUFFIX.to_string(),
            state_file: None,
        }
    }

    /// 从环境变量解析
    ///
    /// 优先使用 `CLAUDE_CONFIG_DIR`，否则为 `$HOME/.claude`。
    pub fn from_env() -> Result<Self> {
        if let Some(dir) = non_empty_env(CLAUDE_CONFIG_DIR_ENV) {
            return Ok(Self::new(PathBuf::from(dir)));
        }

        let home = non_empty_env("HOME")
            .or_else(|| non_empty_env("USERPROFILE"))
            .ok_or_else(|| anyhow!("Unable to resolve home directory"))?;
        Ok(Self::new(PathBuf::from(home).join(".claude")))
    }

    pub fn with_state_file(mut self, path: Option<PathBuf>) -> Self {
        self.state_file = path;
        self
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
