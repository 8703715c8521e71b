//! Service configuration: `~/.library-api/config.toml` plus environment overrides

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::db::pool::DEFAULT_MAX_CONNECTIONS;
use crate::db::repo::{RepoSettings, DEFAULT_STATEMENT_TIMEOUT};

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const BASE_URL_ENV: &str = "LIBRARY_API_BASE_URL";
pub const TIME_ZONE_ENV: &str = "LIBRARY_TIME_ZONE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown time zone '{0}'")]
    TimeZone(String),

    #[error("database_url is not set (config file or DATABASE_URL)")]
    MissingDatabaseUrl,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    /// Prefix for every link in response documents
    pub api_base_url: String,
    /// IANA zone for "today" defaults
    pub time_zone: String,
    pub statement_timeout_secs: u64,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            api_base_url: "http://127.0.0.1:3030".to_owned(),
            time_zone: "America/Los_Angeles".to_owned(),
            statement_timeout_secs: DEFAULT_STATEMENT_TIMEOUT.as_secs(),
        }
    }
}

impl LibraryConfig {
    /// Default config file path: ~/.library-api/config.toml
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".library-api")
            .join("config.toml")
    }

    /// Load from `path` (or the default path), then apply environment overrides.
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// `load` with overrides taken from `lookup` instead of the process environment.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        let mut config = if path.exists() || required {
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(path = %path.display(), "loaded config file");
            Self::from_toml_str(&content)?
        } else {
            Self::default()
        };

        config.apply_overrides(lookup);
        config.time_zone()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from a variable lookup (the process environment in `load`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(DATABASE_URL_ENV) {
            self.database_url = Some(url);
        }
        if let Some(base) = lookup(BASE_URL_ENV) {
            self.api_base_url = base;
        }
        if let Some(zone) = lookup(TIME_ZONE_ENV) {
            self.time_zone = zone;
        }
    }

    pub fn time_zone(&self) -> Result<Tz, ConfigError> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|_| ConfigError::TimeZone(self.time_zone.clone()))
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)
    }

    pub fn repo_settings(&self) -> Result<RepoSettings, ConfigError> {
        Ok(RepoSettings {
            time_zone: self.time_zone()?,
            statement_timeout: Duration::from_secs(self.statement_timeout_secs.max(1)),
        })
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
