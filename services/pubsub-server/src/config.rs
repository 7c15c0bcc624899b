//! Server configuration loading.
//!
//! TOML is the sole config source; no environment variable overrides
//! except `LOG_LEVEL`. Default config path: `/etc/pubsub/server.toml`.
//!
//! # Required fields
//! - `service.uri`
//! - `service.bind`

use std::path::Path;

use pubsub_uri::Uri;
use serde::Deserialize;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// This service's own canonical URI -- used as the loop-check identity
    /// and as the combined set's nominal owner.
    pub service_uri: Uri,
    /// This service's own `/subscribers` endpoint, advertised to upstream
    /// peers as the recipient of our self-subscription.
    pub subscribers_uri: Uri,
    pub bind: String,
    pub default_cookie: Option<String>,
    pub dispatch: DispatchConfig,
    /// Upstream peers this service self-subscribes to at startup.
    pub upstream_peers: Vec<Uri>,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub send_timeout_secs: u64,
    pub retry_budget_secs: u64,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    service: Option<RawServiceConfig>,
    dispatch: Option<RawDispatchConfig>,
    upstream_peers: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawServiceConfig {
    uri: Option<String>,
    subscribers_uri: Option<String>,
    bind: Option<String>,
    default_cookie: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDispatchConfig {
    send_timeout_secs: Option<u64>,
    retry_budget_secs: Option<u64>,
}

pub fn load_config_from_path(path: &Path) -> Result<ServerConfig, ConfigError> {
    let toml_str = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(format!("reading config file '{}': {e}", path.display())))?;
    load_config_from_str(&toml_str)
}

pub fn load_config() -> Result<ServerConfig, ConfigError> {
    load_config_from_path(Path::new("/etc/pubsub/server.toml"))
}

pub fn load_config_from_str(toml_str: &str) -> Result<ServerConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let raw_service = raw.service.ok_or_else(|| ConfigError::MissingField("service".to_owned()))?;
    let uri = raw_service.uri.ok_or_else(|| ConfigError::MissingField("service.uri".to_owned()))?;
    let service_uri: Uri = uri.parse().map_err(|e| ConfigError::InvalidValue(format!("service.uri: {e}")))?;

    let subscribers_uri = match raw_service.subscribers_uri {
        Some(s) => s.parse().map_err(|e| ConfigError::InvalidValue(format!("service.subscribers_uri: {e}")))?,
        None => {
            let mut uri = service_uri.clone();
            uri.path.push("subscribers".to_owned());
            uri
        }
    };

    let bind = raw_service.bind.unwrap_or_else(|| "0.0.0.0:8080".to_owned());

    let dispatch = match raw.dispatch {
        Some(d) => DispatchConfig {
            send_timeout_secs: d.send_timeout_secs.unwrap_or(5),
            retry_budget_secs: d.retry_budget_secs.unwrap_or(10),
        },
        None => DispatchConfig {
            send_timeout_secs: 5,
            retry_budget_secs: 10,
        },
    };

    let upstream_peers = raw
        .upstream_peers
        .unwrap_or_default()
        .into_iter()
        .map(|s| s.parse().map_err(|e| ConfigError::InvalidValue(format!("upstream_peers: {e}"))))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ServerConfig {
        service_uri,
        subscribers_uri,
        bind,
        default_cookie: raw_service.default_cookie,
        dispatch,
        upstream_peers,
    })
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    MissingField(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(s) => write!(f, "IO error: {s}"),
            ConfigError::Parse(s) => write!(f, "parse error: {s}"),
            ConfigError::MissingField(s) => write!(f, "missing required field: {s}"),
            ConfigError::InvalidValue(s) => write!(f, "invalid config value: {s}"),
        }
    }
}

impl std::error::Error for ConfigError {}
