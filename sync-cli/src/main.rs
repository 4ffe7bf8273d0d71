//! Claude session sync host - 命令行入口
//!
//! 默认以 native messaging 模式运行：从 stdin 读一帧请求，向 stdout 写一帧响应。
//! `--status` / `--once` / `--list` 绕过帧协议，直接输出 JSON。

use anyhow::Result;
use clap::{ArgGroup, Parser};
use native_host::{write_frame, HostError, HostExit, HostResponse, NativeHost};
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use sync_engine::{SyncConfig, SyncEngine};
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Claude session sync native host
#[derive(Parser, Debug)]
#[command(name = "claude-sync-host")]
#[command(version, about = "Native messaging host that syncs Claude Code sessions to the browser extension")]
#[command(group(ArgGroup::new("mode").args(["status", "once", "list"])))]
struct Args {
    /// Print directory and sync status as JSON, then exit
    #[arg(long)]
    status: bool,

    /// Run one forced sync pass and print the result, then exit
    #[arg(long)]
    once: bool,

    /// Print the enumerated session files, then exit
    #[arg(long)]
    list: bool,

    /// Claude config directory (defaults to $CLAUDE_CONFIG_DIR or ~/.claude)
    #[arg(long)]
    claude_dir: Option<PathBuf>,

    /// Persist sync state to this file across invocations
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Arguments appended by the browser (extension origin, manifest path, --parent-window)
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    caller_args: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// native messaging 帧协议
    Protocol,
    Command(Command),
}

/// 绕过帧协议、直接输出 JSON 的单次命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Status,
    Once,
    List,
}

impl Args {
    fn mode(&self) -> Mode {
        if self.status {
            Mode::Command(Command::Status)
        } else if self.once {
            Mode::Command(Command::Once)
        } else if self.list {
            Mode::Command(Command::List)
        } else {
            Mode::Protocol
        }
    }

    fn config(&self) -> Result<SyncConfig> {
        let config = match &self.claude_dir {
            Some(dir) => SyncConfig::new(dir.clone()),
            None => SyncConfig::from_env()?,
        };
        Ok(config.with_state_file(self.state_file.clone()))
    }
}

/// 日志只写 stderr，stdout 留给协议帧
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let mode = args.mode();
    if !args.caller_args.is_empty() {
        debug!("Ignoring caller arguments: {:?}", args.caller_args);
    }

    let config = match args.config() {
        Ok(config) => config,
        Err(e) => return report_startup_error(mode, HostError::Internal(e)).await.into(),
    };
    debug!("Projects directory: {:?}", config.projects_dir);

    let mut engine = SyncEngine::open(config).await;

    let exit = match mode {
        Mode::Protocol => {
            let mut host = NativeHost::new(engine);
            host.run(&mut tokio::io::stdin(), &mut tokio::io::stdout())
                .await
        }
        Mode::Command(command) => run_command(command, &mut engine, &mut io::stdout()).await,
    };
    exit.into()
}

/// 引擎创建之前的错误，按当前模式输出
async fn report_startup_error(mode: Mode, err: HostError) -> HostExit {
    match mode {
        Mode::Protocol => {
            error!("{}", err);
            if let Err(e) = write_frame(&mut tokio::io::stdout(), &HostResponse::error(&err)).await {
                error!("Failed to write response: {}", e);
            }
            HostExit::Failure
        }
        Mode::Command(_) => emit_outcome(&mut io::stdout(), Err(err)),
    }
}

/// 执行单次命令并把结果写到 `out`
///
/// `--once` 的同步状态只在输出成功之后提交。
async fn run_command<W: Write>(command: Command, engine: &mut SyncEngine, out: &mut W) -> HostExit {
    match command {
        Command::Status => {
            let outcome = engine
                .status()
                .await
                .map(HostResponse::Status)
                .map_err(HostError::from);
            emit_outcome(out, outcome)
        }
        Command::Once => {
            let outcome = engine
                .sync(true)
                .await
                .map(|r| HostResponse::SyncResult(r.into()))
                .map_err(HostError::from);
            let exit = emit_outcome(out, outcome);
            if exit == HostExit::Success {
                engine.commit().await;
            }
            exit
        }
        Command::List => match engine.list().await {
            Ok(files) => emit_json(out, &files),
            Err(e) => emit_outcome(out, Err(HostError::from(e))),
        },
    }
}

/// 输出成功结果或 error 响应，错误时返回失败
fn emit_outcome<W: Write>(out: &mut W, outcome: Result<HostResponse, HostError>) -> HostExit {
    match outcome {
        Ok(response) => emit_json(out, &response),
        Err(e) => {
            error!("{}", e);
            emit_json(out, &HostResponse::error(&e));
            HostExit::Failure
        }
    }
}

fn emit_json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> HostExit {
    // 先完整序列化，失败时不留下半截输出
    let written = serde_json::to_vec_pretty(value)
        .map_err(io::Error::from)
        .and_then(|json| {
            out.write_all(&json)?;
            out.write_all(b"\n")?;
            out.flush()
        });

    match written {
        Ok(()) => HostExit::Success,
        Err(e) => {
            error!("Failed to write output: {}", e);
            HostExit::Failure
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    /// 读端已关闭的 stdout
    struct ClosedStdout;

    impl Write for ClosedStdout {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
    }

    fn with_sessions() -> TempDir {
        let dir = tempdir().unwrap();
        let project = dir.path().join(".claude/projects/-Users-me-demo");
        std::fs::create_dir_all(&project).unwrap();
        std::fs::write(project.join("a.jsonl"), "{\"type\":\"user\"}\n").unwrap();
        std::fs::write(project.join("b.jsonl"), "{\"type\":\"assistant\"}\n").unwrap();
        dir
    }

    async fn engine_in(dir: &Path) -> SyncEngine {
        let config = SyncConfig::new(dir.join(".claude"))
            .with_state_file(Some(dir.join("state.json")));
        SyncEngine::open(config).await
    }

    async fn run_in(dir: &Path, command: Command) -> (Value, HostExit) {
        let mut engine = engine_in(dir).await;
        let mut out = Vec::new();
        let exit = run_command(command, &mut engine, &mut out).await;
        assert!(out.ends_with(b"\n"));
        (serde_json::from_slice(&out).unwrap(), exit)
    }

    #[test]
    fn test_default_is_protocol_mode() {
        let args = Args::parse_from(["claude-sync-host"]);
        assert_eq!(args.mode(), Mode::Protocol);
        assert_eq!(args.log_level, "warn");
    }

    #[test]
    fn test_cli_modes() {
        let mode = |flag| Args::parse_from(["claude-sync-host", flag]).mode();
        assert_eq!(mode("--status"), Mode::Command(Command::Status));
        assert_eq!(mode("--once"), Mode::Command(Command::Once));
        assert_eq!(mode("--list"), Mode::Command(Command::List));
    }

    #[test]
    fn test_modes_are_exclusive() {
        assert!(Args::try_parse_from(["claude-sync-host", "--status", "--list"]).is_err());
    }

    #[test]
    fn test_browser_arguments_are_accepted() {
        let args = Args::parse_from([
            "claude-sync-host",
            "chrome-extension://abcdefghijklmnop/",
            "--parent-window=0",
        ]);
        assert_eq!(args.mode(), Mode::Protocol);
        assert_eq!(
            args.caller_args,
            vec!["chrome-extension://abcdefghijklmnop/", "--parent-window=0"]
        );
    }

    #[test]
    fn test_config_overrides() {
        let args = Args::parse_from([
            "claude-sync-host",
            "--claude-dir",
            "/tmp/claude",
            "--state-file",
            "/tmp/state.json",
        ]);
        let config = args.config().unwrap();
        assert_eq!(config.projects_dir, PathBuf::from("/tmp/claude/projects"));
        assert_eq!(config.state_file, Some(PathBuf::from("/tmp/state.json")));
    }

    #[tokio::test]
    async fn test_status_command() {
        let dir = with_sessions();
        let (json, exit) = run_in(dir.path(), Command::Status).await;

        assert_eq!(exit, HostExit::Success);
        assert_eq!(json["type"], "status");
        assert_eq!(json["claudeDirExists"], true);
        assert_eq!(json["projectsDirExists"], true);
        assert_eq!(json["totalFiles"], 2);
        assert_eq!(json["totalProjects"], 1);
        assert_eq!(json["syncedFilesCount"], 0);
        assert!(json["lastSyncTime"].is_null());
    }

    #[tokio::test]
    async fn test_once_command_forces_and_commits() {
        let dir = with_sessions();
        let (json, exit) = run_in(dir.path(), Command::Once).await;

        assert_eq!(exit, HostExit::Success);
        assert_eq!(json["type"], "sync_result");
        assert_eq!(json["total"], 2);
        assert_eq!(json["synced"], 2);
        assert_eq!(json["sessions"].as_array().unwrap().len(), 2);
        assert!(dir.path().join("state.json").exists());

        // 强制同步不受已提交状态影响
        let (json, _) = run_in(dir.path(), Command::Once).await;
        assert_eq!(json["synced"], 2);

        let (json, _) = run_in(dir.path(), Command::Status).await;
        assert_eq!(json["syncedFilesCount"], 2);
        assert!(json["lastSyncTime"].is_i64());
    }

    #[tokio::test]
    async fn test_once_command_without_output_is_not_committed() {
        let dir = with_sessions();
        let mut engine = engine_in(dir.path()).await;

        let exit = run_command(Command::Once, &mut engine, &mut ClosedStdout).await;

        assert_eq!(exit, HostExit::Failure);
        assert!(!dir.path().join("state.json").exists());
    }

    #[tokio::test]
    async fn test_list_command() {
        let dir = with_sessions();
        let (json, exit) = run_in(dir.path(), Command::List).await;

        assert_eq!(exit, HostExit::Success);
        let mut files = json.as_array().unwrap().clone();
        files.sort_by_key(|f| f["path"].as_str().unwrap().to_string());
        assert_eq!(files.len(), 2);
        assert!(files[0]["path"].as_str().unwrap().ends_with("a.jsonl"));
        assert_eq!(files[0]["sizeBytes"], 16);
        assert!(files[0]["modifiedAt"].is_i64());
    }

    #[tokio::test]
    async fn test_commands_report_filesystem_errors() {
        let dir = tempdir().unwrap();
        let claude = dir.path().join(".claude");
        std::fs::create_dir_all(&claude).unwrap();
        // projects 是文件而不是目录
        std::fs::write(claude.join("projects"), "oops").unwrap();

        for command in [Command::Status, Command::Once, Command::List] {
            let (json, exit) = run_in(dir.path(), command).await;
            assert_eq!(exit, HostExit::Failure, "{:?}", command);
            assert_eq!(json["type"], "error", "{:?}", command);
            assert_eq!(json["code"], "internal_error", "{:?}", command);
        }
        assert!(!dir.path().join("state.json").exists());
    }

    #[test]
    fn test_closed_stdout_is_failure() {
        assert_eq!(emit_json(&mut ClosedStdout, &["x"]), HostExit::Failure);
    }
}
