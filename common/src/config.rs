//! # Runtime Configuration
//!
//! Resolved once at startup, lowest precedence first:
//! 1. Built-in defaults.
//! 2. A TOML file (`--config`, `SCLI_CONFIG`, or `scli.toml` / `config/scli.toml`).
//! 3. The process environment, after loading a `.env` file if one exists.
//! 4. Command line overrides.
//!
//! The scheduler endpoint and the API key have no defaults.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_LOG_FILE: &str = "scli.log";

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["scli.toml", "config/scli.toml"];

const ENV_CONFIG: &str = "SCLI_CONFIG";
const ENV_ENDPOINT: &str = "SCLI_ENDPOINT";
const ENV_API_KEY: &str = "SCLI_API_KEY";
const ENV_TIMEOUT: &str = "SCLI_TIMEOUT";
const ENV_ACCEPT_INVALID_CERTS: &str = "SCLI_ACCEPT_INVALID_CERTS";
const ENV_LOG_FILE: &str = "SCLI_LOG_FILE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no API key configured; set SCLI_API_KEY or `api_key` in the config file")]
    MissingApiKey,
    #[error("no scheduler endpoint configured; set SCLI_ENDPOINT, `endpoint` or --endpoint")]
    MissingEndpoint,
    #[error("invalid scheduler endpoint '{value}': {reason}")]
    InvalidEndpoint { value: String, reason: String },
    #[error("invalid timeout '{value}': {source}")]
    InvalidTimeout {
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("invalid value '{value}' for {name}; expected true or false")]
    InvalidFlag { name: &'static str, value: String },
    #[error("config file {} does not exist", path.display())]
    MissingConfig { path: PathBuf },
    #[error("failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to load .env file: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

/// Pre-shared key for the scheduler API.
///
/// Never printed; the backing memory is wiped on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Raw key, for the transport header only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([redacted])")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[redacted]")
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Url,
    pub api_key: ApiKey,
    /// Per-request timeout applied by the HTTP client.
    pub timeout: Duration,
    /// Skips TLS certificate verification (self-signed intranet endpoints).
    pub accept_invalid_certs: bool,
    pub log_file: PathBuf,
}

/// Raw values as written in the TOML file.
#[derive(Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<String>,
    pub accept_invalid_certs: Option<bool>,
    pub log_file: Option<PathBuf>,
}

/// Raw values read from the environment.
#[derive(Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<String>,
    pub accept_invalid_certs: Option<String>,
    pub log_file: Option<PathBuf>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .collect();

        Self {
            config_path: vars.remove(ENV_CONFIG).map(PathBuf::from),
            endpoint: vars.remove(ENV_ENDPOINT),
            api_key: vars.remove(ENV_API_KEY),
            timeout: vars.remove(ENV_TIMEOUT),
            accept_invalid_certs: vars.remove(ENV_ACCEPT_INVALID_CERTS),
            log_file: vars.remove(ENV_LOG_FILE).map(PathBuf::from),
        }
    }
}

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub endpoint: Option<String>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
    overrides: ConfigOverrides,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        self.load_env_file()?;
        let env = EnvConfig::gather();
        let file = self.load_file_config(&env)?;
        compose(file.unwrap_or_default(), env, self.overrides.clone())
    }

    fn load_env_file(&self) -> Result<(), ConfigError> {
        let loaded = match &self.env_file {
            Some(path) => dotenvy::from_path(path),
            None => dotenvy::dotenv().map(|_| ()),
        };
        match loaded {
            Ok(()) | Err(dotenvy::Error::Io(_)) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn load_file_config(&self, env: &EnvConfig) -> Result<Option<FileConfig>, ConfigError> {
        let explicit = self.config_path.clone().or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) if !path.exists() => return Err(ConfigError::MissingConfig { path }),
            Some(path) => path,
            None => match DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists())
            {
                Some(path) => path,
                None => return Ok(None),
            },
        };

        read_file_config(&path).map(Some)
    }
}

pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merges the three sources into a validated [`Config`].
pub fn compose(
    file: FileConfig,
    env: EnvConfig,
    overrides: ConfigOverrides,
) -> Result<Config, ConfigError> {
    let endpoint = overrides
        .endpoint
        .or(env.endpoint)
        .or(file.endpoint)
        .ok_or(ConfigError::MissingEndpoint)?;
    let endpoint = parse_endpoint(&endpoint)?;

    let api_key = env
        .api_key
        .or(file.api_key)
        .filter(|key| !key.trim().is_empty())
        .map(ApiKey::new)
        .ok_or(ConfigError::MissingApiKey)?;

    let timeout = match env.timeout.or(file.timeout) {
        Some(value) => humantime::parse_duration(&value)
            .map_err(|source| ConfigError::InvalidTimeout { value, source })?,
        None => DEFAULT_TIMEOUT,
    };

    let accept_invalid_certs = match env.accept_invalid_certs {
        Some(value) => parse_flag(ENV_ACCEPT_INVALID_CERTS, &value)?,
        None => file.accept_invalid_certs.unwrap_or(false),
    };

    let log_file = env
        .log_file
        .or(file.log_file)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

    Ok(Config {
        endpoint,
        api_key,
        timeout,
        accept_invalid_certs,
        log_file,
    })
}

fn parse_endpoint(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidEndpoint {
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}'"))),
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_string(),
        }),
    }
}
