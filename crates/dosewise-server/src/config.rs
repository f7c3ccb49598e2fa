//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use dosewise_shared::constants::{APP_NAME, DEFAULT_HTTP_PORT, DEFAULT_SESSION_TTL_HOURS};

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: platform data directory (see `Database::default_path`).
    pub database_path: Option<PathBuf>,

    /// Human-readable name for this server instance.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Dosewise"`
    pub instance_name: String,

    /// Whether new accounts can be created.
    /// Env: `REGISTRATION_OPEN` (true/false)
    /// Default: `true`
    pub registration_open: bool,

    /// Session lifetime in hours.
    /// Env: `SESSION_TTL_HOURS`
    /// Default: `720` (30 days)
    pub session_ttl_hours: i64,

    /// PBKDF2-HMAC-SHA256 iteration count for new password hashes.
    /// Env: `PASSWORD_ITERATIONS`
    /// Default: `600000`
    pub password_iterations: u32,

    /// Period of the dose-log generation task, in seconds.
    /// Env: `SCHEDULE_INTERVAL_SECS`
    /// Default: `3600`
    pub schedule_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            instance_name: APP_NAME.to_string(),
            registration_open: true,
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            password_iterations: 600_000,
            schedule_interval_secs: 3600,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so tests need not touch the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            parse_into(&mut config.http_addr, "HTTP_ADDR", &addr);
        }

        if let Some(path) = lookup("DATABASE_PATH") {
            if !path.trim().is_empty() {
                config.database_path = Some(PathBuf::from(path));
            }
        }

        if let Some(name) = lookup("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(val) = lookup("REGISTRATION_OPEN") {
            config.registration_open = val != "false" && val != "0";
        }

        if let Some(val) = lookup("SESSION_TTL_HOURS") {
            parse_positive(&mut config.session_ttl_hours, "SESSION_TTL_HOURS", &val);
        }

        if let Some(val) = lookup("PASSWORD_ITERATIONS") {
            parse_positive(&mut config.password_iterations, "PASSWORD_ITERATIONS", &val);
        }

        if let Some(val) = lookup("SCHEDULE_INTERVAL_SECS") {
            parse_positive(&mut config.schedule_interval_secs, "SCHEDULE_INTERVAL_SECS", &val);
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

fn parse_into<T: FromStr>(slot: &mut T, key: &str, value: &str) -> bool {
    match value.trim().parse::<T>() {
        Ok(parsed) => {
            *slot = parsed;
            true
        }
        Err(_) => {
            tracing::warn!(key, value, "Invalid configuration value, using default");
            false
        }
    }
}

fn parse_positive<T>(slot: &mut T, key: &str, value: &str)
where
    T: FromStr + PartialOrd + Default + Copy,
{
    let previous = *slot;
    if parse_into(slot, key, value) && *slot <= T::default() {
        tracing::warn!(key, value, "Configuration value must be positive, using default");
        *slot = previous;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.session_ttl_hours, 720);
        assert_eq!(config.password_iterations, 600_000);
        assert!(config.registration_open);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("DATABASE_PATH", "/tmp/dw.db"),
            ("REGISTRATION_OPEN", "false"),
            ("SESSION_TTL_HOURS", "24"),
            ("SCHEDULE_INTERVAL_SECS", "60"),
        ]));
        assert_eq!(config.http_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/dw.db")));
        assert!(!config.registration_open);
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.schedule_interval_secs, 60);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("HTTP_ADDR", "not-an-address"),
            ("PASSWORD_ITERATIONS", "0"),
            ("SESSION_TTL_HOURS", "-5"),
        ]));
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.password_iterations, 600_000);
        assert_eq!(config.session_ttl_hours, 720);
    }
}
