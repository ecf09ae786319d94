//! Configuration
//!
//! Loaded from TOML (`$OCPP_CONFIG` or `<config_dir>/ocpp-cpms/config.toml`).
//! Every section and field is optional; a few common knobs can be
//! overridden from the environment.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::{AcceptAll, AllowList, RegistrationPolicy};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ocpp-cpms")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseSettings,
    pub ocpp: OcppConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub ws_host: String,
    pub ws_port: u16,
    /// Charge points connect at `{ocpp_path}/{charge_point_id}`.
    pub ocpp_path: String,
    pub api_host: String,
    pub api_port: u16,
    /// Seconds allowed for draining on shutdown.
    pub shutdown_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ws_host: "0.0.0.0".to_string(),
            ws_port: 8887,
            ocpp_path: "/ocpp".to_string(),
            api_host: "0.0.0.0".to_string(),
            api_port: 8888,
            shutdown_timeout: 30,
        }
    }
}

impl ServerConfig {
    pub fn ws_address(&self) -> String {
        format!("{}:{}", self.ws_host, self.ws_port)
    }

    pub fn api_address(&self) -> String {
        format!("{}:{}", self.api_host, self.api_port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub driver: DatabaseDriver,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub ssl_mode: String,
    /// SQLite file.
    pub path: String,
    /// Full connection URL; takes precedence over every other field.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::Sqlite,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: String::new(),
            name: "cpms".to_string(),
            ssl_mode: "disable".to_string(),
            path: "./cpms.db".to_string(),
            url: None,
            max_connections: 10,
        }
    }
}

impl DatabaseSettings {
    pub fn connection_url(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        match self.driver {
            DatabaseDriver::Sqlite => format!("sqlite://{}?mode=rwc", self.path),
            DatabaseDriver::Postgres => format!(
                "postgres://{}:{}@{}:{}/{}?sslmode={}",
                self.user, self.password, self.host, self.port, self.name, self.ssl_mode
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationMode {
    #[default]
    AcceptAll,
    AllowList,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub mode: RegistrationMode,
    /// Charge point ids accepted in `allow_list` mode.
    pub allowed: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcppConfig {
    /// Seconds, returned in BootNotification confirmations.
    pub heartbeat_interval: i32,
    /// Transaction ids start after this value on an empty database.
    pub transaction_id_start: i32,
    pub command_timeout_secs: u64,
    pub store_timeout_secs: u64,
    pub audit_queue_capacity: usize,
    pub registration: RegistrationConfig,
}

impl Default for OcppConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: 600,
            transaction_id_start: 1000,
            command_timeout_secs: 30,
            store_timeout_secs: 5,
            audit_queue_capacity: 1024,
            registration: RegistrationConfig::default(),
        }
    }
}

impl OcppConfig {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn registration_policy(&self) -> Arc<dyn RegistrationPolicy> {
        match self.registration.mode {
            RegistrationMode::AcceptAll => Arc::new(AcceptAll),
            RegistrationMode::AllowList => {
                Arc::new(AllowList::new(self.registration.allowed.iter().cloned()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Read `path` and apply environment overrides. A missing file is not an
    /// error: defaults are used.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with(path, env_lookup)
    }

    /// Like [`load`](Self::load), but an unreadable or malformed file falls
    /// back to defaults. Environment overrides apply either way; the error is
    /// handed back so it can be logged once tracing is up.
    pub fn load_or_default(path: &Path) -> (Self, Option<ConfigError>) {
        Self::load_or_default_with(path, env_lookup)
    }

    fn load_with<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            Self::from_toml(&raw)?
        } else {
            Self::default()
        };
        config.apply_overrides(lookup);
        Ok(config)
    }

    fn load_or_default_with<F>(path: &Path, lookup: F) -> (Self, Option<ConfigError>)
    where
        F: Fn(&str) -> Option<String>,
    {
        match Self::load_with(path, &lookup) {
            Ok(config) => (config, None),
            Err(e) => {
                let mut config = Self::default();
                config.apply_overrides(&lookup);
                (config, Some(e))
            }
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply `SERVER_PORT`, `API_PORT`, `OCPP_PATH`, `HEARTBEAT_INTERVAL`,
    /// `LOG_LEVEL` and `DATABASE_URL`. Unparsable numbers are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("SERVER_PORT").and_then(|v| v.parse().ok()) {
            self.server.ws_port = port;
        }
        if let Some(port) = lookup("API_PORT").and_then(|v| v.parse().ok()) {
            self.server.api_port = port;
        }
        if let Some(path) = lookup("OCPP_PATH") {
            self.server.ocpp_path = path;
        }
        if let Some(interval) = lookup("HEARTBEAT_INTERVAL").and_then(|v| v.parse().ok()) {
            self.ocpp.heartbeat_interval = interval;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.server.ws_port, 8887);
        assert_eq!(config.server.api_port, 8888);
        assert_eq!(config.server.ocpp_path, "/ocpp");
        assert_eq!(config.ocpp.heartbeat_interval, 600);
        assert_eq!(config.ocpp.transaction_id_start, 1000);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.database.connection_url(), "sqlite://./cpms.db?mode=rwc");
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [database]
            driver = "postgres"
            user = "cpms"
            password = "secret"
            host = "db"

            [ocpp]
            heartbeat_interval = 120

            [ocpp.registration]
            mode = "allow_list"
            allowed = ["CP-1"]

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(
            config.database.connection_url(),
            "postgres://cpms:secret@db:5432/cpms?sslmode=disable"
        );
        assert_eq!(config.ocpp.heartbeat_interval, 120);
        assert_eq!(config.ocpp.command_timeout_secs, 30);
        assert_eq!(config.ocpp.registration.mode, RegistrationMode::AllowList);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        assert!(matches!(
            AppConfig::from_toml("[server\nws_port = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn environment_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("SERVER_PORT", "9000"),
            ("API_PORT", "not-a-port"),
            ("OCPP_PATH", "/steve/websocket"),
            ("HEARTBEAT_INTERVAL", "60"),
            ("DATABASE_URL", "postgres://u:p@h/db"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.ws_port, 9000);
        assert_eq!(config.server.api_port, 8888);
        assert_eq!(config.server.ocpp_path, "/steve/websocket");
        assert_eq!(config.ocpp.heartbeat_interval, 60);
        assert_eq!(config.database.connection_url(), "postgres://u:p@h/db");
    }

    #[test]
    fn missing_file_loads_defaults() {
        let path = std::env::temp_dir().join("ocpp-cpms-does-not-exist.toml");
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.ocpp.audit_queue_capacity, 1024);
    }

    #[test]
    fn malformed_file_falls_back_with_overrides() {
        let path = std::env::temp_dir().join(format!("ocpp-cpms-malformed-{}.toml", std::process::id()));
        std::fs::write(&path, "[server\nws_port = 1").unwrap();

        let (config, err) = AppConfig::load_or_default_with(&path, |key| {
            (key == "SERVER_PORT").then(|| "9100".to_string())
        });
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, Some(ConfigError::Parse(_))));
        assert_eq!(config.server.ws_port, 9100);
        assert_eq!(config.server.api_port, 8888);
    }
}
