use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::models::ServerIdentity;
use crate::protocol::DEFAULT_MAX_FRAME_BYTES;

/// Environment prefix for master settings (`SVCREG_SERVER__PORT`, ...)
pub const MASTER_ENV_PREFIX: &str = "SVCREG";
/// Environment prefix for client settings (`SVCREG_CLIENT_MASTER_SERVER__HOST`, ...)
pub const CLIENT_ENV_PREFIX: &str = "SVCREG_CLIENT";

/// Smallest frame bound accepted from configuration
const MIN_FRAME_BYTES: usize = 64;
/// Largest frame bound accepted from configuration (16 MiB)
const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Master process configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a request frame payload
    pub max_frame_bytes: usize,
    /// Per read/write socket deadline. Unset means no deadline.
    pub io_timeout_seconds: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            io_timeout_seconds: None,
        }
    }
}

impl ServerConfig {
    #[must_use]
    pub fn io_timeout(&self) -> Option<Duration> {
        self.io_timeout_seconds.map(Duration::from_secs)
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_seconds: u64,
    pub query_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            dbname: "server_manager".to_string(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            host: "localhost".to_string(),
            port: 5432,
            max_connections: 10,
            min_connections: 1,
            connect_timeout_seconds: 10,
            query_timeout_seconds: 5,
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_seconds", &self.connect_timeout_seconds)
            .field("query_timeout_seconds", &self.query_timeout_seconds)
            .finish()
    }
}

impl DatabaseConfig {
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    #[must_use]
    pub const fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_seconds)
    }

    /// `host:port/dbname`, for logs. Never includes credentials.
    #[must_use]
    pub fn display_target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.dbname)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl LoggingConfig {
    fn validate_into(&self, errors: &mut Vec<String>) {
        if crate::logging::parse_log_level(&self.level).is_err() {
            errors.push(format!("logging.level '{}' is not a valid level", self.level));
        }
        if !matches!(self.format.as_str(), "json" | "pretty") {
            errors.push(format!("logging.format must be 'json' or 'pretty', got '{}'", self.format));
        }
    }
}

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub master_server: MasterServerConfig,
    /// Identity resolved by `discover` when none is given
    pub target_server: Option<TargetServerConfig>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a response frame payload
    pub max_frame_bytes: usize,
    pub io_timeout_seconds: Option<u64>,
}

impl Default for MasterServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
            io_timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetServerConfig {
    pub server_type: String,
    pub server_name: String,
}

fn load_layered<T: DeserializeOwned>(config_file: Option<&str>, env_prefix: &str) -> Result<T, ConfigError> {
    let mut builder = ConfigBuilder::builder();

    if let Some(path) = config_file {
        builder = builder.add_source(File::with_name(path));
    }

    // Environment overrides the file: SVCREG_SERVER__PORT=4000
    builder = builder.add_source(
        Environment::with_prefix(env_prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

fn validate_frame_bound(field: &str, value: usize, errors: &mut Vec<String>) {
    if !(MIN_FRAME_BYTES..=MAX_FRAME_BYTES).contains(&value) {
        errors.push(format!(
            "{field} must be between {MIN_FRAME_BYTES} and {MAX_FRAME_BYTES}, got {value}"
        ));
    }
}

impl MasterConfig {
    /// Load configuration with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided; must exist)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        load_layered(config_file, MASTER_ENV_PREFIX)
    }

    /// Address the listener binds to
    #[must_use]
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Report every problem at once so an operator can fix them in one pass
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.server.host.trim().is_empty() {
            errors.push("server.host must not be empty".to_string());
        }
        if self.server.port == 0 {
            errors.push("server.port must be between 1 and 65535".to_string());
        }
        validate_frame_bound("server.max_frame_bytes", self.server.max_frame_bytes, &mut errors);
        if self.server.io_timeout_seconds == Some(0) {
            errors.push("server.io_timeout_seconds must be positive when set".to_string());
        }

        let db = &self.database;
        for (field, value) in [("dbname", &db.dbname), ("user", &db.user), ("host", &db.host)] {
            if value.trim().is_empty() {
                errors.push(format!("database.{field} must not be empty"));
            }
        }
        if db.port == 0 {
            errors.push("database.port must be between 1 and 65535".to_string());
        }
        if db.max_connections == 0 {
            errors.push("database.max_connections must be at least 1".to_string());
        }
        if db.min_connections > db.max_connections {
            errors.push(format!(
                "database.min_connections ({}) exceeds database.max_connections ({})",
                db.min_connections, db.max_connections
            ));
        }
        if db.query_timeout_seconds == 0 {
            errors.push("database.query_timeout_seconds must be positive".to_string());
        }

        self.logging.validate_into(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl ClientConfig {
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        load_layered(config_file, CLIENT_ENV_PREFIX)
    }

    #[must_use]
    pub fn master_address(&self) -> String {
        format!("{}:{}", self.master_server.host, self.master_server.port)
    }

    #[must_use]
    pub fn default_target(&self) -> Option<ServerIdentity> {
        self.target_server
            .as_ref()
            .map(|t| ServerIdentity::new(&t.server_type, &t.server_name))
    }

    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.master_server.host.trim().is_empty() {
            errors.push("master_server.host must not be empty".to_string());
        }
        if self.master_server.port == 0 {
            errors.push("master_server.port must be between 1 and 65535".to_string());
        }
        validate_frame_bound(
            "master_server.max_frame_bytes",
            self.master_server.max_frame_bytes,
            &mut errors,
        );
        if self.master_server.io_timeout_seconds == Some(0) {
            errors.push("master_server.io_timeout_seconds must be positive when set".to_string());
        }
        if let Some(target) = self.default_target() {
            if let Err(e) = target.validate() {
                errors.push(format!("target_server: {e}"));
            }
        }

        self.logging.validate_into(&mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
