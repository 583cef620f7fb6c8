pub mod audio;
pub mod config;
pub mod decode;
pub mod dirs;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod session;
pub mod source;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Application-specific environment variable for log filtering (overrides config).
const LOG_ENV_VAR: &str = "AUDIOSCRIBE_LOG";

/// Configure file-based logging for the process.
///
/// Diagnostics go to a log file in the XDG state directory, keeping the
/// terminal reserved for user-facing output. The returned guard must stay
/// alive for the lifetime of the process.
pub fn init_logging(config: &config::Config) -> anyhow::Result<WorkerGuard> {
    let log_path = dirs::log_path().context("Failed to determine log path")?;
    let log_dir = log_path.parent().expect("log path has parent");
    let log_filename = log_path.file_name().expect("log path has filename");

    let file_appender = tracing_appender::rolling::never(log_dir, log_filename);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // AUDIOSCRIBE_LOG env var overrides config file level
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV_VAR)
        .with_default_directive(config.logging.level.as_directive().parse()?)
        .from_env()?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter)
        .init();

    // Route whisper.cpp and GGML logs through tracing
    whisper_rs::install_logging_hooks();

    Ok(guard)
}
