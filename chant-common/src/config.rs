//! Configuration loading and resolution
//!
//! Each client setting is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or malformed TOML file never prevents startup: it is logged and
//! the remaining tiers apply.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{Error, Result};

/// Default backend base URL (development backend)
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const ENV_API_URL: &str = "CHANT_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "CHANT_TIMEOUT_SECS";
pub const ENV_NETWORK_POLICY: &str = "CHANT_NETWORK_POLICY";

/// What a transport failure of an add-chant call means on paths that may
/// provision users automatically
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkFailurePolicy {
    /// Report the failure; never create a user because of it
    #[default]
    Fail,
    /// Treat the failure like "user not found" and provision the user
    Provision,
}

impl FromStr for NetworkFailurePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(NetworkFailurePolicy::Fail),
            "provision" => Ok(NetworkFailurePolicy::Provision),
            other => Err(Error::Config(format!(
                "Unknown network failure policy '{}' (expected 'fail' or 'provision')",
                other
            ))),
        }
    }
}

impl fmt::Display for NetworkFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkFailurePolicy::Fail => f.write_str("fail"),
            NetworkFailurePolicy::Provision => f.write_str("provision"),
        }
    }
}

/// `[logging]` table of the TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_file: None,
        }
    }
}

impl LoggingConfig {
    /// Open the configured log file for appending, creating parent directories
    ///
    /// Returns `Ok(None)` when logging goes to stderr.
    pub fn open_log_file(&self) -> Result<Option<File>> {
        let Some(path) = &self.log_file else {
            return Ok(None);
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                Error::Config(format!("Open log file {} failed: {}", path.display(), e))
            })?;
        Ok(Some(file))
    }
}

/// On-disk configuration file
///
/// Every field is optional so older or partial files keep parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_failure_policy: Option<NetworkFailurePolicy>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ClientOverrides {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub network_failure_policy: Option<NetworkFailurePolicy>,
}

/// Fully resolved client settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub network_failure_policy: NetworkFailurePolicy,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            network_failure_policy: NetworkFailurePolicy::default(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl ClientSettings {
    /// Snapshot of these settings as a TOML file body
    pub fn to_toml_config(&self) -> TomlConfig {
        TomlConfig {
            api_base_url: Some(self.api_base_url.clone()),
            request_timeout_secs: Some(self.request_timeout.as_secs()),
            network_failure_policy: Some(self.network_failure_policy),
            logging: LoggingConfig {
                level: self.log_level.clone(),
                log_file: self.log_file.clone(),
            },
        }
    }
}

/// Platform config file location: `<config dir>/chant/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("chant").join("config.toml"))
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Write a TOML config file atomically (temp file + rename)
///
/// On Unix the file is restricted to mode 0600.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    std::fs::write(&temp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&temp_path, path)?;
    Ok(())
}

/// Resolves [`ClientSettings`] from the four configuration tiers
pub struct ConfigResolver {
    config_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// `config_path` overrides the platform default file location
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    /// File consulted for tier 3, if any
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config_path.clone().or_else(default_config_path)
    }

    /// Load the TOML tier, falling back to an empty config
    pub fn load_toml(&self) -> TomlConfig {
        let Some(path) = self.config_path() else {
            return TomlConfig::default();
        };

        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return TomlConfig::default();
        }

        match load_toml_config(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("{} (continuing with defaults)", e);
                TomlConfig::default()
            }
        }
    }

    /// Resolve every setting, reading the TOML tier from disk
    pub fn resolve(&self, cli: &ClientOverrides) -> ClientSettings {
        self.resolve_loaded(cli, &self.load_toml())
    }

    /// Resolve every setting against an already loaded TOML tier
    pub fn resolve_loaded(
        &self,
        cli: &ClientOverrides,
        toml_config: &TomlConfig,
    ) -> ClientSettings {
        resolve_with(cli, toml_config, |name| std::env::var(name).ok())
    }
}

/// Tier resolution with an injectable environment lookup
pub fn resolve_with<F>(cli: &ClientOverrides, toml_config: &TomlConfig, env: F) -> ClientSettings
where
    F: Fn(&str) -> Option<String>,
{
    let api_base_url = cli
        .api_base_url
        .clone()
        .or_else(|| env(ENV_API_URL).filter(|v| !v.trim().is_empty()))
        .or_else(|| toml_config.api_base_url.clone())
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

    let timeout_secs = cli
        .request_timeout_secs
        .or_else(|| env_parsed(&env, ENV_TIMEOUT_SECS))
        .or(toml_config.request_timeout_secs)
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let network_failure_policy = cli
        .network_failure_policy
        .or_else(|| env_parsed(&env, ENV_NETWORK_POLICY))
        .or(toml_config.network_failure_policy)
        .unwrap_or_default();

    ClientSettings {
        api_base_url: api_base_url.trim_end_matches('/').to_string(),
        request_timeout: Duration::from_secs(timeout_secs),
        network_failure_policy,
        log_level: toml_config.logging.level.clone(),
        log_file: toml_config.logging.log_file.clone(),
    }
}

fn env_parsed<F, T>(env: &F, name: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let raw = env(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring invalid {}={:?}", name, raw);
            None
        }
    }
}
