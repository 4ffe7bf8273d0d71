//! Session Reader - Claude Code JSONL 文件读取层
//!
//! 提供对 ~/.claude/projects/ 目录的只读访问：
//! - 项目目录列表
//! - 会话文件枚举
//! - 会话内容读取

pub mod types;
pub mod scan;
pub mod reader;

pub use types::*;
pub use scan::{is_session_file_name, list_project_dirs, scan_project, scan_projects, scan_sessions};
pub use reader::read_session;
