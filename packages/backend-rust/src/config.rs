use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use prepmate_algo::ModelConfig;

const DEFAULT_DB_FILE: &str = "learner.db";
const APP_DIR: &str = "prepmate";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub log: LogConfig,
    pub database: DatabaseConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub file_logs: bool,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseTarget {
    /// Process-local store, nothing survives a restart
    Memory,
    Sqlite(String),
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub target: DatabaseTarget,
    pub busy_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Self {
            host,
            port,
            log_level,
            log: LogConfig {
                file_logs: env_bool("ENABLE_FILE_LOGS").unwrap_or(false),
                log_dir: std::env::var("LOG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| PathBuf::from("./logs")),
            },
            database: DatabaseConfig {
                target: database_target(std::env::var("DATABASE_URL").ok()),
                busy_timeout: Duration::from_millis(env_u64("SQLITE_BUSY_TIMEOUT_MS", 5000)),
            },
            model: model_from_env(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn database_target(raw: Option<String>) -> DatabaseTarget {
    match raw.as_deref().map(str::trim) {
        Some("memory") => DatabaseTarget::Memory,
        Some(url) if !url.is_empty() => DatabaseTarget::Sqlite(url.to_string()),
        _ => DatabaseTarget::Sqlite(format!("sqlite:{}?mode=rwc", default_sqlite_path().display())),
    }
}

pub fn default_sqlite_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(DEFAULT_DB_FILE)
}

/// Model parameters with environment overrides applied.
pub fn model_from_env() -> ModelConfig {
    let mut model = ModelConfig::default();

    if let Some(threshold) = env_f64("MODEL_TREND_THRESHOLD") {
        let threshold = threshold.abs();
        model.trend.improving_threshold = threshold;
        model.trend.declining_threshold = -threshold;
    }
    if let Some(threshold) = env_f64("MODEL_FACTOR_THRESHOLD") {
        model.weakness.factor_threshold = threshold;
    }
    if let Some(threshold) = env_f64("MODEL_RISK_THRESHOLD") {
        model.weakness.risk_threshold = threshold;
    }
    if let Some(min) = std::env::var("MODEL_MIN_ATTEMPTS")
        .ok()
        .and_then(|v| v.trim().parse::<u32>().ok())
    {
        model.weakness.min_attempts = min;
    }

    model
}

fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
