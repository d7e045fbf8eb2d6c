//! Process and backend configuration from the environment.
//!
//! Both config types read through a lookup function so they can be built from
//! `std::env` in the binary and from a plain map in tests.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `HOST` / `PORT` | `0.0.0.0` / `8021` |
//! | `APP_NAME` / `EXEC_ENV` | `sample-app` / `dev` |
//! | `REDIS_HOST` / `REDIS_PORT` / `REDIS_DB` | `localhost` / `6379` / `0` |
//! | `REDIS_READER_HOST` | `REDIS_HOST` |
//! | `REDIS_USERNAME` / `REDIS_PASSWORD` | unset |
//! | `REDIS_DEBUG_MODE` | `false` |
//! | `REDIS_CONNECTION_MODE` | `shared` |
//! | `REDIS_MAX_RECONNECT_ATTEMPTS` | `10` (0 = unlimited) |
//! | `REDIS_MAX_RETRY_TIME_MS` | `15000` (0 = unlimited) |
//! | `REDIS_CONNECT_TIMEOUT_MS` | `5000` |

use crate::backend::Endpoint;
use crate::error::{Error, Result};
use crate::reconnect::{ReconnectPolicy, ATTEMPT_MILESTONE, RETRY_TIME_MILESTONE};
use crate::registry::{ConnectionMode, RegistryConfig};
use std::str::FromStr;
use std::time::Duration;

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8021;

/// Default Redis port.
pub const DEFAULT_REDIS_PORT: u16 = 6379;

/// HTTP shell settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub app_name: String,
    pub exec_env: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            app_name: "sample-app".to_string(),
            exec_env: "dev".to_string(),
        }
    }
}

impl AppConfig {
    /// Read from the process environment.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if a variable is set but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = AppConfig::default();
        Ok(AppConfig {
            host: non_empty(&lookup, "HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            app_name: non_empty(&lookup, "APP_NAME").unwrap_or(defaults.app_name),
            exec_env: non_empty(&lookup, "EXEC_ENV").unwrap_or(defaults.exec_env),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Backend connection settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub host: String,
    /// Reader host; the primary host when unset.
    pub reader_host: Option<String>,
    pub port: u16,
    pub database: u32,
    pub username: Option<String>,
    pub password: Option<String>,
    pub debug_mode: bool,
    pub mode: ConnectionMode,
    pub max_attempts: Option<u32>,
    pub max_retry_time: Option<Duration>,
    pub connection_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            host: "localhost".to_string(),
            reader_host: None,
            port: DEFAULT_REDIS_PORT,
            database: 0,
            username: None,
            password: None,
            debug_mode: false,
            mode: ConnectionMode::default(),
            max_attempts: Some(ATTEMPT_MILESTONE),
            max_retry_time: Some(RETRY_TIME_MILESTONE),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

impl StoreConfig {
    /// Read from the process environment.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if a variable is set but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = StoreConfig::default();

        let max_attempts = match non_empty(&lookup, "REDIS_MAX_RECONNECT_ATTEMPTS") {
            Some(raw) => limit(parse_value::<u32>("REDIS_MAX_RECONNECT_ATTEMPTS", &raw)?),
            None => defaults.max_attempts,
        };
        let max_retry_time = match non_empty(&lookup, "REDIS_MAX_RETRY_TIME_MS") {
            Some(raw) => limit(parse_value::<u64>("REDIS_MAX_RETRY_TIME_MS", &raw)?)
                .map(Duration::from_millis),
            None => defaults.max_retry_time,
        };

        Ok(StoreConfig {
            host: non_empty(&lookup, "REDIS_HOST").unwrap_or(defaults.host),
            reader_host: non_empty(&lookup, "REDIS_READER_HOST"),
            port: parse_or(&lookup, "REDIS_PORT", defaults.port)?,
            database: parse_or(&lookup, "REDIS_DB", defaults.database)?,
            username: non_empty(&lookup, "REDIS_USERNAME"),
            password: non_empty(&lookup, "REDIS_PASSWORD"),
            debug_mode: match non_empty(&lookup, "REDIS_DEBUG_MODE") {
                Some(raw) => parse_flag("REDIS_DEBUG_MODE", &raw)?,
                None => defaults.debug_mode,
            },
            mode: parse_or(&lookup, "REDIS_CONNECTION_MODE", defaults.mode)?,
            max_attempts,
            max_retry_time,
            connection_timeout: Duration::from_millis(parse_or(
                &lookup,
                "REDIS_CONNECT_TIMEOUT_MS",
                defaults.connection_timeout.as_millis() as u64,
            )?),
        })
    }

    /// Endpoints, mode and reconnection policy for the registry.
    pub fn registry_config(&self) -> RegistryConfig {
        let reader_host = self.reader_host.as_deref().unwrap_or(&self.host);

        RegistryConfig {
            primary: Endpoint::new(self.host.clone(), self.port),
            reader: Endpoint::new(reader_host, self.port),
            mode: self.mode,
            policy: ReconnectPolicy::default()
                .with_max_attempts(self.max_attempts)
                .with_max_retry_time(self.max_retry_time),
        }
    }

    /// Redis connector carrying the credentials and timeout.
    #[cfg(feature = "redis")]
    pub fn redis_connector(&self) -> crate::backend::RedisConnector {
        crate::backend::RedisConnector {
            username: self.username.clone(),
            password: self.password.clone(),
            database: self.database,
            connection_timeout: self.connection_timeout,
        }
    }
}

fn non_empty(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| Error::ConfigError(format!("Invalid {}='{}': {}", name, raw, e)))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, name) {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::ConfigError(format!(
            "Invalid {}='{}': expected true or false",
            name, raw
        ))),
    }
}

/// Zero disables a limit.
fn limit<T: Default + PartialEq>(value: T) -> Option<T> {
    if value == T::default() {
        None
    } else {
        Some(value)
    }
}
