//! Server configuration parsed from environment variables.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use crate::canvas::log::LogPolicy;
use crate::canvas::protocol::SyncStrategy;

pub const DEFAULT_BIND_ADDR: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_CURSOR_RATE_LIMIT: usize = 60;
pub const DEFAULT_CURSOR_RATE_WINDOW_MS: u64 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Cursor update throttle, per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorRateLimit {
    pub limit: usize,
    pub window: Duration,
}

impl Default for CursorRateLimit {
    fn default() -> Self {
        Self {
            limit: DEFAULT_CURSOR_RATE_LIMIT,
            window: Duration::from_millis(DEFAULT_CURSOR_RATE_WINDOW_MS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Outbound frames buffered per connection before fan-out starts dropping.
    pub client_channel_capacity: usize,
    pub log_policy: LogPolicy,
    pub sync_strategy: SyncStrategy,
    pub cursor_rate: CursorRateLimit,
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR,
            port: DEFAULT_PORT,
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
            log_policy: LogPolicy::default(),
            sync_strategy: SyncStrategy::default(),
            cursor_rate: CursorRateLimit::default(),
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Build typed server config from environment variables.
    ///
    /// All optional:
    /// - `BIND_ADDR`: default `0.0.0.0`
    /// - `PORT`: default 3001
    /// - `CLIENT_CHANNEL_CAPACITY`: default 256
    /// - `DISCARD_UNDONE_ON_DRAW`: `true` (default) or `false`
    /// - `SYNC_STRATEGY`: `full` (default) or `diff`
    /// - `CURSOR_RATE_LIMIT`: default 60
    /// - `CURSOR_RATE_WINDOW_MS`: default 1000
    /// - `STATIC_DIR`: frontend directory to serve, none by default
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for any value that does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for any value that does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_var("BIND_ADDR", get("BIND_ADDR"), Some(DEFAULT_BIND_ADDR))?;
        let port = parse_var("PORT", get("PORT"), Some(DEFAULT_PORT))?;
        let client_channel_capacity =
            parse_positive("CLIENT_CHANNEL_CAPACITY", get("CLIENT_CHANNEL_CAPACITY"), DEFAULT_CLIENT_CHANNEL_CAPACITY)?;
        let discard_undone_on_draw = parse_bool("DISCARD_UNDONE_ON_DRAW", get("DISCARD_UNDONE_ON_DRAW"), true)?;
        let sync_strategy = match get("SYNC_STRATEGY") {
            Some(raw) => raw
                .parse()
                .map_err(|reason| ConfigError::Invalid { var: "SYNC_STRATEGY", reason })?,
            None => SyncStrategy::default(),
        };
        let cursor_limit = parse_positive("CURSOR_RATE_LIMIT", get("CURSOR_RATE_LIMIT"), DEFAULT_CURSOR_RATE_LIMIT)?;
        let cursor_window_ms =
            parse_positive("CURSOR_RATE_WINDOW_MS", get("CURSOR_RATE_WINDOW_MS"), DEFAULT_CURSOR_RATE_WINDOW_MS)?;

        Ok(Self {
            bind_addr,
            port,
            client_channel_capacity,
            log_policy: LogPolicy { discard_undone_on_draw },
            sync_strategy,
            cursor_rate: CursorRateLimit { limit: cursor_limit, window: Duration::from_millis(cursor_window_ms) },
            static_dir: get("STATIC_DIR").map(PathBuf::from),
        })
    }
}

fn parse_var<T>(var: &'static str, raw: Option<String>, default: Option<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match (raw, default) {
        (Some(raw), _) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::Invalid { var, reason: e.to_string() }),
        (None, Some(default)) => Ok(default),
        (None, None) => Err(ConfigError::Invalid { var, reason: "missing".into() }),
    }
}

fn parse_positive<T>(var: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
{
    let value = parse_var(var, raw, Some(default))?;
    if value <= T::default() {
        return Err(ConfigError::Invalid { var, reason: "must be greater than zero".into() });
    }
    Ok(value)
}

fn parse_bool(var: &'static str, raw: Option<String>, default: bool) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid { var, reason: format!("expected a boolean, got `{other}`") }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
