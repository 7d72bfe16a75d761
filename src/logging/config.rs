use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub production: bool,
    pub level: LogLevel,
    pub dir: PathBuf,
}

impl LogConfig {
    /// `ENVIRONMENT`, `LOG_LEVEL` and `LOG_DIR`. Production defaults to info,
    /// everything else to debug.
    pub fn from_env() -> Self {
        let production = std::env::var("ENVIRONMENT")
            .map(|e| e == "production")
            .unwrap_or(false);
        Self::resolve(
            production,
            std::env::var("LOG_LEVEL").ok().as_deref(),
            std::env::var("LOG_DIR").ok().as_deref(),
        )
    }

    fn resolve(production: bool, level: Option<&str>, dir: Option<&str>) -> Self {
        let fallback = if production {
            LogLevel::Info
        } else {
            LogLevel::Debug
        };
        let level = match level {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                eprintln!("{}; using {}", e, fallback);
                fallback
            }),
            None => fallback,
        };
        Self {
            production,
            level,
            dir: PathBuf::from(dir.filter(|d| !d.is_empty()).unwrap_or("logs")),
        }
    }

    /// Default directive used when `RUST_LOG` is not set.
    pub fn filter_directive(&self) -> String {
        format!(
            "portfolio_builder={},tower_http=debug,axum=debug,sqlx=warn",
            self.level
        )
    }
}
