use anyhow::Context as _;
use std::io;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

/// Levels accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            _ => Err(format!("invalid log level {s:?}; expected one of DEBUG, INFO, WARN, ERROR")),
        }
    }
}

/// Install a stderr subscriber.
///
/// An explicit `level` wins; otherwise `RUST_LOG` is honored, falling back to INFO.
/// Standard output is left alone since it may carry the rendered document.
pub fn init(level: Option<LogLevel>) -> anyhow::Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level.directive()).context("invalid log level directive")?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(LogLevel::Info.directive()))
            .context("invalid log filter")?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to install the logger")
}
