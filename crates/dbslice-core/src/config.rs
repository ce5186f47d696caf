//! Configuration surface (config.toml)

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::schema::Direction;

/// Database engines the dumper can talk to.
const ALLOWED_DB_TYPES: &[&str] = &["postgres"];

/// Connection settings for the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Engine type; only "postgres" is accepted.
    #[serde(default = "default_db_type")]
    pub db_type: String,

    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Database name to connect to.
    pub dbname: String,

    /// "disable" or "require".
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
}

impl DatabaseConfig {
    /// Connection string in the libpq keyword format.
    pub fn connection_string(&self) -> String {
        format!(
            "host={} port={} user={} password={} dbname={}",
            self.host, self.port, self.user, self.password, self.dbname
        )
    }
}

/// One `column IN (...)` filter on a root table. `value` is a literal SQL
/// value list such as `"1, 2, 3"`, passed through verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFilter {
    pub name: String,
    pub value: String,
}

/// A root table resolution starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,

    #[serde(default)]
    pub filters: Vec<TableFilter>,
}

/// Dump settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Output path; empty selects a timestamped default filename.
    #[serde(default)]
    pub output: String,

    /// Reserved output-format selector. Only the restore text format is
    /// emitted today.
    #[serde(default)]
    pub format: String,

    #[serde(default)]
    pub schema_name: String,

    /// Root tables in the order their blocks should seed the dump.
    pub tables: Vec<TableSpec>,

    /// Global edge-direction policy.
    #[serde(default)]
    pub direction: Direction,

    /// Tables for which incoming foreign keys are followed even when the
    /// global direction is outgoing.
    #[serde(default)]
    pub include_incoming_tables: Vec<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub settings: Settings,
}

impl Config {
    /// Load and validate config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config = Self::from_toml(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a TOML string without validating it.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !ALLOWED_DB_TYPES.contains(&self.database.db_type.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unsupported db type {}",
                self.database.db_type
            )));
        }
        if self.settings.tables.is_empty() {
            return Err(ConfigError::Invalid("no tables configured".to_string()));
        }
        Ok(())
    }
}

fn default_db_type() -> String {
    "postgres".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

/// Config error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
