use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const LOG_LEVEL_ENV: &str = "INFOBUTTON_LOG_LEVEL";
pub const LOG_PATH_ENV: &str = "INFOBUTTON_LOG_PATH";

/// Log verbosity levels.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    #[default]
    Info = 2,
    Debug = 3,
    Trace = 4,
}

impl LogLevel {
    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!(
                "unknown log level '{other}' (expected error, warn, info, debug or trace)"
            )),
        }
    }
}

/// The env var wins over whatever the CLI and config file settled on.
pub fn effective_level(env_value: Option<&str>, fallback: LogLevel) -> LogLevel {
    env_value
        .and_then(|raw| LogLevel::from_str(raw).ok())
        .unwrap_or(fallback)
}

/// `--log-file`, then the env var, then the config file.
pub fn resolve_log_path(cli: Option<PathBuf>, config: Option<PathBuf>) -> Option<PathBuf> {
    cli.or_else(|| std::env::var_os(LOG_PATH_ENV).map(PathBuf::from))
        .or(config)
}

/// Stderr logger with an optional append-only file sink.
pub struct Logger {
    level: LogLevel,
    file: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(level: LogLevel, file_path: Option<PathBuf>) -> Result<Self> {
        let env_level = std::env::var(LOG_LEVEL_ENV).ok();
        let level = effective_level(env_level.as_deref(), level);
        let file = match file_path {
            Some(path) => Some(Mutex::new(
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .map_err(|e| {
                        Error::Config(format!("cannot open log file {}: {e}", path.display()))
                    })?,
            )),
            None => None,
        };
        Ok(Self { level, file })
    }

    /// Register as the global `log` backend. Only the first call in a
    /// process succeeds.
    pub fn install(self) -> Result<()> {
        let filter = self.level.to_filter();
        log::set_boxed_logger(Box::new(self))
            .map_err(|e| Error::InvalidArgs(format!("logger already installed: {e}")))?;
        log::set_max_level(filter);
        Ok(())
    }

    fn format(record: &log::Record<'_>) -> String {
        let ts = humantime::format_rfc3339_millis(SystemTime::now());
        format!("[{ts}] [{}] {}", record.level(), record.args())
    }
}

impl log::Log for Logger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= self.level.to_filter()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = Self::format(record);
        eprintln!("{line}");
        if let Some(file) = &self.file {
            let mut file = file.lock().unwrap_or_else(|e| e.into_inner());
            let _ = writeln!(file, "{line}");
        }
    }

    fn flush(&self) {
        if let Some(file) = &self.file {
            let _ = file.lock().unwrap_or_else(|e| e.into_inner()).flush();
        }
    }
}
