//! Configuration validation.
//!
//! Reads and checks the server-side settings once at startup so adapters can
//! be built from already-validated values.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::error::DashboardError;
use crate::ports::config_port::ConfigPort;

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:3001";
pub const DEFAULT_CACHE_TTL_SECS: i64 = 86_400;
pub const DEFAULT_HTTP_TIMEOUT_SECS: i64 = 30;
pub const DEFAULT_POOL_SIZE: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Postgres,
    Csv,
    None,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "csv" => Ok(Self::Csv),
            "none" | "" => Ok(Self::None),
            other => Err(format!(
                "unknown backend '{other}', expected sqlite, postgres, csv or none"
            )),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgres",
            Self::Csv => "csv",
            Self::None => "none",
        })
    }
}

/// Validated server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSettings {
    pub backend: StoreBackend,
    pub listen: SocketAddr,
    pub cors_origins: Vec<String>,
    pub cache_ttl: Duration,
    pub http_timeout: Duration,
}

pub fn validate_server_config(config: &dyn ConfigPort) -> Result<ServerSettings, DashboardError> {
    let backend = store_backend(config)?;
    validate_backend_section(config, backend)?;
    Ok(ServerSettings {
        backend,
        listen: listen_addr(config)?,
        cors_origins: cors_origins(config),
        cache_ttl: positive_secs(config, "cache", "ttl_secs", DEFAULT_CACHE_TTL_SECS)?,
        http_timeout: positive_secs(config, "http", "timeout_secs", DEFAULT_HTTP_TIMEOUT_SECS)?,
    })
}

pub fn store_backend(config: &dyn ConfigPort) -> Result<StoreBackend, DashboardError> {
    match config.get_string("store", "backend") {
        None => Ok(StoreBackend::default()),
        Some(raw) => raw.parse().map_err(|reason| DashboardError::ConfigInvalid {
            section: "store".to_string(),
            key: "backend".to_string(),
            reason,
        }),
    }
}

fn validate_backend_section(
    config: &dyn ConfigPort,
    backend: StoreBackend,
) -> Result<(), DashboardError> {
    match backend {
        StoreBackend::Sqlite => validate_pool_size(config, "sqlite"),
        StoreBackend::Postgres => {
            require(config, "postgres", "conninfo")?;
            validate_pool_size(config, "postgres")
        }
        StoreBackend::Csv => require(config, "csv", "dir").map(|_| ()),
        StoreBackend::None => Ok(()),
    }
}

fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, DashboardError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(DashboardError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

fn validate_pool_size(config: &dyn ConfigPort, section: &str) -> Result<(), DashboardError> {
    let size = config.get_int(section, "pool_size", DEFAULT_POOL_SIZE);
    if !(1..=64).contains(&size) {
        return Err(DashboardError::ConfigInvalid {
            section: section.to_string(),
            key: "pool_size".to_string(),
            reason: "pool_size must be between 1 and 64".to_string(),
        });
    }
    Ok(())
}

pub fn listen_addr(config: &dyn ConfigPort) -> Result<SocketAddr, DashboardError> {
    let raw = config
        .get_string("web", "listen")
        .unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    raw.trim()
        .parse()
        .map_err(|_| DashboardError::ConfigInvalid {
            section: "web".to_string(),
            key: "listen".to_string(),
            reason: format!("'{raw}' is not a socket address"),
        })
}

pub fn cors_origins(config: &dyn ConfigPort) -> Vec<String> {
    config
        .get_string("web", "cors_origins")
        .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn positive_secs(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<Duration, DashboardError> {
    let secs = config.get_int(section, key, default);
    if secs <= 0 {
        return Err(DashboardError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: format!("{key} must be positive"),
        });
    }
    Ok(Duration::from_secs(secs as u64))
}
