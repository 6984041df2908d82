//! Console + rolling file logging for the indicator engine
//!
//! Console output is human-readable; file output is JSON (or plain text) written through a
//! non-blocking rolling appender so batch runs can be inspected afterwards.

use serde::Deserialize;
use tracing_appender::non_blocking;
use tracing_subscriber::{
    fmt::{self, time::ChronoUtc},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Prefix of every log file written by the engine
const LOG_FILE_PREFIX: &str = "indicator_engine";

/// Logging configuration options, read from the `[logging]` section of `config.toml`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory to store log files
    pub log_dir: String,
    /// Log level filter (e.g., "info", "indicator_engine=debug")
    pub level_filter: String,
    /// "daily", "hourly" or "size:<MB>"
    pub rotation: LogRotation,
    pub console_timestamps: bool,
    /// Structured JSON file output instead of plain text
    pub file_json_format: bool,
    /// Days of log files kept by `cleanup_old_logs`
    pub cleanup_days: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum LogRotation {
    Daily,
    Hourly,
    /// Size limit in MB; the rolling appender has no size trigger so files still roll daily
    SizeBased(u64),
}

impl From<String> for LogRotation {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "hourly" => LogRotation::Hourly,
            s if s.starts_with("size:") => {
                let size_mb = s.strip_prefix("size:").and_then(|mb| mb.parse().ok()).unwrap_or(100);
                LogRotation::SizeBased(size_mb)
            }
            _ => LogRotation::Daily,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            level_filter: "info,indicator_engine=info".to_string(),
            rotation: LogRotation::Daily,
            console_timestamps: true,
            file_json_format: true,
            cleanup_days: 30,
        }
    }
}

/// Initialize console + rotating file logging.
///
/// Files land in `<log_dir>/indicator_engine.log.YYYY-MM-DD` (or `-HH` for hourly rotation).
/// `RUST_LOG` overrides `level_filter` when set.
///
/// The returned guard must stay alive for the life of the process so the background
/// writer keeps flushing.
pub fn init_dual_logging(
    config: LoggingConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, Box<dyn std::error::Error + Send + Sync>> {
    std::fs::create_dir_all(&config.log_dir)?;

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level_filter));
    let file_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level_filter));

    let file_appender = match config.rotation {
        LogRotation::Hourly => tracing_appender::rolling::hourly(&config.log_dir, format!("{}.log", LOG_FILE_PREFIX)),
        LogRotation::Daily | LogRotation::SizeBased(_) => {
            tracing_appender::rolling::daily(&config.log_dir, format!("{}.log", LOG_FILE_PREFIX))
        }
    };
    let (file_writer, guard) = non_blocking(file_appender);

    // Results go to stdout, so the console layer writes to stderr
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_level(true)
        .with_target(true)
        .with_timer(if config.console_timestamps {
            ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string())
        } else {
            ChronoUtc::new(String::new())
        })
        .with_filter(console_filter);

    let file_layer = if config.file_json_format {
        fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_level(true)
            .with_target(true)
            .with_thread_names(true)
            .with_timer(ChronoUtc::new("%Y-%m-%dT%H:%M:%S%.3fZ".to_string()))
            .with_filter(file_filter)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_level(true)
            .with_target(true)
            .with_thread_names(true)
            .with_timer(ChronoUtc::new("%Y-%m-%d %H:%M:%S%.3f UTC".to_string()))
            .with_filter(file_filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        log_dir = %config.log_dir,
        rotation = ?config.rotation,
        json_format = config.file_json_format,
        "📁 Dual logging initialized - console + rotating files"
    );

    Ok(guard)
}

/// Console-only logging for tests and minimal setups
pub fn init_simple_logging() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,indicator_engine=info"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()?;

    tracing::info!("🖥️ Simple console logging initialized");
    Ok(())
}

/// Engine log files in `log_dir`, sorted by name
pub fn get_current_log_files(log_dir: &str) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(log_dir)
        .into_iter()
        .flatten()
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_engine_log(path))
        .collect();

    files.sort();
    files
}

/// `indicator_engine.log`, `indicator_engine.log.2024-03-12` and friends
fn is_engine_log(path: &std::path::Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with(LOG_FILE_PREFIX) && name.contains(".log"))
        .unwrap_or(false)
}

/// Remove engine log files last modified more than `keep_days` ago
pub fn cleanup_old_logs(log_dir: &str, keep_days: u32) -> Result<usize, std::io::Error> {
    let cutoff_time =
        std::time::SystemTime::now() - std::time::Duration::from_secs(keep_days as u64 * 24 * 3600);

    let mut removed_count = 0;
    for path in get_current_log_files(log_dir) {
        let modified = path.metadata().and_then(|m| m.modified());
        if let Ok(modified) = modified {
            if modified < cutoff_time && std::fs::remove_file(&path).is_ok() {
                removed_count += 1;
                tracing::debug!("🗑️ Removed old log file: {:?}", path);
            }
        }
    }

    if removed_count > 0 {
        tracing::info!("🧹 Cleaned up {} old log files (older than {} days)", removed_count, keep_days);
    }

    Ok(removed_count)
}

pub fn log_system_info() {
    let cpu_count = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    tracing::info!(
        package_version = env!("CARGO_PKG_VERSION"),
        target_arch = std::env::consts::ARCH,
        target_os = std::env::consts::OS,
        cpu_count,
        rayon_threads = rayon::current_num_threads(),
        "📊 Environment information logged"
    );
}
