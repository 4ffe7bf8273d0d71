//! 同步引擎层
//!
//! 整合 session-reader 的枚举与读取，基于修改时间做增量同步

mod config;
mod engine;
mod state_file;
mod tracker;

pub use config::{SyncConfig, CLAUDE_CONFIG_DIR_ENV};
pub use engine::{HostStatus, SyncEngine, SyncResult};
pub use state_file::{load_state, save_state, PersistedState};
pub use tracker::{filter_changed, SyncState};
