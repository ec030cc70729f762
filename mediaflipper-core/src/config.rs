//! Configuration management for mediaflipper-server.
//!
//! Loads configuration from environment variables with sensible defaults,
//! following the same `from_env()` + typed-sub-struct shape as the
//! reference stack's `media-service::config::Config`.
use redis_utils::SentinelConfig;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppConfig,
    pub redis: RedisConfig,
    pub dispatcher: DispatcherConfig,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct RedisConfig {
    pub url: String,
    pub sentinel: Option<SentinelConfig>,
}

#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Maximum concurrent jobs the Dispatcher will admit (spec §4.4).
    pub max_concurrent_jobs: usize,
    /// How often the background tick loop runs.
    pub tick_interval_ms: u64,
    /// Directory `FsTemplateSource` resolves `templateFile` names against.
    pub templates_dir: String,
}

impl Config {
    /// Load configuration from environment variables, matching the
    /// `MEDIAFLIPPER_*` prefix convention.
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        Ok(Config {
            app: AppConfig {
                host: std::env::var("MEDIAFLIPPER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: std::env::var("MEDIAFLIPPER_PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(8090),
            },
            redis: RedisConfig {
                url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost".to_string()),
                sentinel: parse_sentinel_config(),
            },
            dispatcher: DispatcherConfig {
                max_concurrent_jobs: std::env::var("MEDIAFLIPPER_MAX_CONCURRENT_JOBS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(crate::queue::DEFAULT_MAX_CONCURRENT_JOBS),
                tick_interval_ms: std::env::var("MEDIAFLIPPER_TICK_INTERVAL_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1_000),
                templates_dir: std::env::var("MEDIAFLIPPER_TEMPLATES_DIR")
                    .unwrap_or_else(|_| "templates".to_string()),
            },
        })
    }
}

fn parse_sentinel_config() -> Option<SentinelConfig> {
    let raw = std::env::var("REDIS_SENTINEL_ENDPOINTS").ok()?;
    let endpoints = redis_utils::parse_sentinel_endpoints(&raw);
    if endpoints.is_empty() {
        return None;
    }
    let master_name = std::env::var("REDIS_SENTINEL_MASTER_NAME").unwrap_or_else(|_| "mymaster".to_string());
    let poll_interval_ms = std::env::var("REDIS_SENTINEL_POLL_INTERVAL_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5_000);
    Some(SentinelConfig::new(endpoints, master_name, Duration::from_millis(poll_interval_ms)))
}
