//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// An environment value that failed to parse and was replaced by its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSetting {
    pub key: &'static str,
    pub value: String,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3003`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` for structured logs, anything else for human output
/// - `DATABASE_URL`: PostgreSQL connection string; orders are kept in memory when unset
/// - `CART_SERVICE_URL`: cart service base URL (default: `http://localhost:3002`)
/// - `PRODUCTS_SERVICE_URL`: products service base URL (default: `http://localhost:3001`)
/// - `SERVICE_AUTH_TOKEN`: bearer token sent to sibling services
/// - `HTTP_TIMEOUT_MS`: timeout for calls to sibling services (default: `5000`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub cart_service_url: String,
    pub products_service_url: String,
    pub service_auth_token: Option<String>,
    pub http_timeout: Duration,
    /// Values ignored while loading; see [`Config::warn_invalid_settings`].
    pub invalid_settings: Vec<InvalidSetting>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut invalid_settings = Vec::new();
        let port: Option<u16> = non_empty("PORT")
            .and_then(|value| parse_setting("PORT", value, &mut invalid_settings));
        let http_timeout_ms: Option<u64> = non_empty("HTTP_TIMEOUT_MS")
            .and_then(|value| parse_setting("HTTP_TIMEOUT_MS", value, &mut invalid_settings));

        Self {
            host: non_empty("HOST").unwrap_or(defaults.host),
            port: port.unwrap_or(defaults.port),
            log_level: non_empty("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match non_empty("LOG_FORMAT") {
                Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            database_url: non_empty("DATABASE_URL"),
            cart_service_url: non_empty("CART_SERVICE_URL").unwrap_or(defaults.cart_service_url),
            products_service_url: non_empty("PRODUCTS_SERVICE_URL")
                .unwrap_or(defaults.products_service_url),
            service_auth_token: non_empty("SERVICE_AUTH_TOKEN"),
            http_timeout: http_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.http_timeout),
            invalid_settings,
        }
    }

    /// Logs each value that was ignored while loading.
    ///
    /// Call once the tracing subscriber is installed.
    pub fn warn_invalid_settings(&self) {
        for setting in &self.invalid_settings {
            tracing::warn!(
                key = setting.key,
                value = %setting.value,
                "ignoring invalid configuration value, using default"
            );
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3003,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            cart_service_url: "http://localhost:3002".to_string(),
            products_service_url: "http://localhost:3001".to_string(),
            service_auth_token: None,
            http_timeout: Duration::from_millis(5000),
            invalid_settings: Vec::new(),
        }
    }
}

fn parse_setting<T: FromStr>(
    key: &'static str,
    value: String,
    invalid: &mut Vec<InvalidSetting>,
) -> Option<T> {
    match value.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            invalid.push(InvalidSetting { key, value });
            None
        }
    }
}
