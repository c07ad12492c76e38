//! Runtime configuration from the environment.
//!
//! Values come from `ONBOARD_*` variables, optionally loaded from a `.env`
//! file in the working directory.

use std::collections::HashMap;
use std::env::VarError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Default server port.
pub const DEFAULT_PORT: u16 = 13234;

/// Default record id for the single tracked driver.
pub const DEFAULT_RECORD_ID: &str = "driver";

/// Every variable the config reads.
const ENV_KEYS: [&str; 6] = [
    "ONBOARD_BIND",
    "ONBOARD_DB_PATH",
    "ONBOARD_RECORD_ID",
    "ONBOARD_DRIVER_TOKEN",
    "ONBOARD_SERVER_URL",
    "ONBOARD_POLL_INTERVAL_MS",
];

/// Returns the default database path under the user data directory.
pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("onboard")
        .join("status.db")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: `{value}` ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Settings shared by the server and the client commands.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,

    /// SQLite database file.
    pub db_path: PathBuf,

    /// Well-known id of the tracked record.
    pub record_id: String,

    /// Token required on status writes. `None` leaves writes open.
    pub driver_token: Option<String>,

    /// Base URL clients use to reach the server.
    pub server_url: String,

    /// How often pollers fetch the status.
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            db_path: default_db_path(),
            record_id: DEFAULT_RECORD_ID.to_string(),
            driver_token: None,
            server_url: format!("http://127.0.0.1:{DEFAULT_PORT}"),
            poll_interval: Duration::from_millis(1000),
        }
    }
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = ?path, "Loaded .env file");
        }
        Self::from_vars(read_env()?)
    }

    /// Builds a config from an explicit variable map.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |key: &str| vars.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(value) = get("ONBOARD_BIND") {
            config.bind_addr = value.parse().map_err(|e: std::net::AddrParseError| {
                invalid("ONBOARD_BIND", value, e.to_string())
            })?;
        }
        if let Some(value) = get("ONBOARD_DB_PATH") {
            config.db_path = PathBuf::from(value);
        }
        if let Some(value) = get("ONBOARD_RECORD_ID") {
            config.record_id = value.to_string();
        }
        if let Some(value) = get("ONBOARD_DRIVER_TOKEN") {
            config.driver_token = Some(value.to_string());
        }
        if let Some(value) = get("ONBOARD_SERVER_URL") {
            if !value.starts_with("http://") && !value.starts_with("https://") {
                return Err(invalid(
                    "ONBOARD_SERVER_URL",
                    value,
                    "expected an http(s) URL".to_string(),
                ));
            }
            config.server_url = value.trim_end_matches('/').to_string();
        }
        if let Some(value) = get("ONBOARD_POLL_INTERVAL_MS") {
            let ms: u64 = value.parse().map_err(|e: std::num::ParseIntError| {
                invalid("ONBOARD_POLL_INTERVAL_MS", value, e.to_string())
            })?;
            if ms == 0 {
                return Err(invalid(
                    "ONBOARD_POLL_INTERVAL_MS",
                    value,
                    "must be positive".to_string(),
                ));
            }
            config.poll_interval = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

/// Reads only the `ONBOARD_*` keys; unrelated variables are never decoded.
fn read_env() -> Result<HashMap<String, String>, ConfigError> {
    let mut vars = HashMap::new();
    for key in ENV_KEYS {
        match std::env::var(key) {
            Ok(value) => {
                vars.insert(key.to_string(), value);
            }
            Err(VarError::NotPresent) => {}
            Err(VarError::NotUnicode(raw)) => {
                return Err(invalid(
                    key,
                    &raw.to_string_lossy(),
                    "not valid unicode".to_string(),
                ));
            }
        }
    }
    Ok(vars)
}

fn invalid(key: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_config_default() {
        let config = Config::from_vars(HashMap::new()).unwrap();
        assert_eq!(config.bind_addr.port(), DEFAULT_PORT);
        assert_eq!(config.record_id, DEFAULT_RECORD_ID);
        assert_eq!(config.poll_interval, Duration::from_millis(1000));
        assert!(config.driver_token.is_none());
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_vars(vars(&[
            ("ONBOARD_BIND", "0.0.0.0:8080"),
            ("ONBOARD_RECORD_ID", "bus-7"),
            ("ONBOARD_DRIVER_TOKEN", "1234"),
            ("ONBOARD_SERVER_URL", "https://status.example.com/"),
            ("ONBOARD_POLL_INTERVAL_MS", "250"),
            ("ONBOARD_DB_PATH", "/tmp/onboard.db"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.record_id, "bus-7");
        assert_eq!(config.driver_token.as_deref(), Some("1234"));
        assert_eq!(config.server_url, "https://status.example.com");
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.db_path, PathBuf::from("/tmp/onboard.db"));
    }

    #[test]
    fn test_blank_token_is_unset() {
        let config = Config::from_vars(vars(&[("ONBOARD_DRIVER_TOKEN", "  ")])).unwrap();
        assert!(config.driver_token.is_none());
    }

    #[test]
    fn test_default_db_path_is_under_onboard_dir() {
        let path = default_db_path();
        assert!(path.ends_with("onboard/status.db"));
    }

    #[cfg(unix)]
    #[test]
    fn test_from_env_ignores_unrelated_non_unicode_vars() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let garbage = OsStr::from_bytes(&[0x66, 0x6f, 0xff, 0x6f]);
        std::env::set_var("ONBOARD_UNRELATED_BYTES", garbage);
        let config = Config::from_env();
        std::env::remove_var("ONBOARD_UNRELATED_BYTES");
        assert!(config.is_ok());

        std::env::set_var("ONBOARD_RECORD_ID", garbage);
        let err = Config::from_env().unwrap_err();
        std::env::remove_var("ONBOARD_RECORD_ID");
        assert!(err.to_string().contains("ONBOARD_RECORD_ID"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        for (key, value) in [
            ("ONBOARD_BIND", "not-an-addr"),
            ("ONBOARD_POLL_INTERVAL_MS", "fast"),
            ("ONBOARD_POLL_INTERVAL_MS", "0"),
            ("ONBOARD_SERVER_URL", "ftp://host"),
        ] {
            let err = Config::from_vars(vars(&[(key, value)])).unwrap_err();
            assert!(err.to_string().contains(key));
        }
    }
}
