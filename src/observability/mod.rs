//! 可观测性：tracing 订阅器初始化
//!
//! 默认级别 info，可通过 RUST_LOG 覆盖；TUI 占用终端时日志写入文件。

use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}

/// 日志输出到 stderr
pub fn init() {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// 日志追加写入文件（TUI 模式）
pub fn init_to_file(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .init();
    Ok(())
}
