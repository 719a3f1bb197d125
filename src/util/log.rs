//! Logging setup: always to a file, optionally to stderr.
//!
//! Stdout carries the protocol, so nothing is ever logged there outside of tests.
//!
//! ## Environment Variables
//!
//! 1. **`LINEMAP_LOG`** (highest priority) - filter for this server
//! 2. **`RUST_LOG`** - standard tracing filter
//! 3. **Default** - `warn` globally, `info` for `linemap_proxy`
//!
//! Setting either variable also enables the stderr layer.
//!
//! ## Log File Location
//!
//! Default: `<cache_dir>/linemap-proxy/linemap-proxy-<pid>.log`
//!
//! Override with `--log-file <path>` or `LINEMAP_LOG_FILE`.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

const DEFAULT_FILTER: &str = "warn,linemap_proxy=info";

/// Returned from [`init`]; must be held alive so the log file gets flushed.
pub struct LogGuard {
    _file_guard: WorkerGuard,
    pub log_file: PathBuf,
}

#[derive(Debug, Default)]
pub struct LogConfig {
    pub log_file_path: Option<PathBuf>,
}

/// Install the global subscriber.
pub fn init(config: LogConfig) -> Result<LogGuard> {
    let (log_dir, filename) = resolve_log_path(config.log_file_path);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("Creating log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, &filename);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_filter(create_filter());

    let stderr_layer = stderr_enabled().then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_filter(create_filter())
    });

    Registry::default()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Installing tracing subscriber")?;

    Ok(LogGuard {
        _file_guard: file_guard,
        log_file: log_dir.join(filename),
    })
}

/// Stdout-only logging for tests. Safe to call from every test.
pub fn test() {
    let _ = fmt()
        .with_env_filter(create_filter())
        .with_test_writer()
        .try_init();
}

fn stderr_enabled() -> bool {
    env::var("LINEMAP_LOG").is_ok() || env::var("RUST_LOG").is_ok()
}

fn resolve_log_path(override_path: Option<PathBuf>) -> (PathBuf, String) {
    let filename = format!("linemap-proxy-{}.log", std::process::id());

    if let Some(path) = override_path {
        if path.extension().is_some() {
            let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(filename);
            return (dir, name);
        }
        return (path, filename);
    }

    let dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("linemap-proxy");
    (dir, filename)
}

fn create_filter() -> EnvFilter {
    if let Ok(filter) = env::var("LINEMAP_LOG") {
        return EnvFilter::new(filter);
    }
    if let Ok(filter) = env::var("RUST_LOG") {
        return EnvFilter::new(filter);
    }
    EnvFilter::new(DEFAULT_FILTER)
}
