//! Persistent settings: remote endpoint, number formatting, storage location.

use std::{
    env,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    codec::DEFAULT_GROUPING_SEPARATOR,
    errors::{LedgerError, Result},
    reconcile::ReconcilePolicy,
    utils::fs::write_atomic,
};

pub const HOME_ENV: &str = "ALLOTMENT_HOME";
pub const ENDPOINT_ENV: &str = "ALLOTMENT_ENDPOINT";
const DEFAULT_DIR_NAME: &str = ".allotment";
const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";
const LOCAL_DATA_DIR: &str = "local";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_endpoint: Option<String>,
    #[serde(default = "Config::default_grouping_separator")]
    pub grouping_separator: char,
    #[serde(default = "Config::default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub reconcile_policy: ReconcilePolicy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Directory for the local records. Defaults to `<home>/local`.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            remote_endpoint: None,
            grouping_separator: Self::default_grouping_separator(),
            request_timeout_secs: Self::default_request_timeout_secs(),
            reconcile_policy: ReconcilePolicy::default(),
            data_dir: None,
        }
    }
}

impl Config {
    pub fn default_grouping_separator() -> char {
        DEFAULT_GROUPING_SEPARATOR
    }

    pub fn default_request_timeout_secs() -> u64 {
        DEFAULT_TIMEOUT_SECS
    }

    /// The configured endpoint, ignoring blank values.
    pub fn remote_endpoint(&self) -> Option<&str> {
        self.remote_endpoint
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn resolve_data_dir(&self, home: &Path) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| home.join(LOCAL_DATA_DIR))
    }

    /// Rejects settings the codec cannot round-trip (a digit separator).
    pub fn validate(&self) -> Result<()> {
        if self.grouping_separator.is_ascii_digit() {
            return Err(LedgerError::Config(format!(
                "grouping separator `{}` must not be a digit",
                self.grouping_separator
            )));
        }
        Ok(())
    }

    /// Applies `ALLOTMENT_ENDPOINT` when it is set.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(url) = env::var_os(ENDPOINT_ENV) {
            let url = url.to_string_lossy().trim().to_string();
            self.remote_endpoint = if url.is_empty() { None } else { Some(url) };
        }
        self
    }
}

/// Application home: `ALLOTMENT_HOME`, else `~/.allotment`.
pub fn app_home() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Loads and saves [`Config`] as JSON under the application home.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    home: PathBuf,
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(app_home())
    }

    pub fn with_base_dir(home: PathBuf) -> Result<Self> {
        let config_dir = home.join(CONFIG_DIR);
        fs::create_dir_all(&config_dir)?;
        Ok(Self {
            path: config_dir.join(CONFIG_FILE),
            home,
        })
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: Config = serde_json::from_str(&data).map_err(|err| {
            LedgerError::Config(format!("{} is invalid: {err}", self.path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)?;
        write_atomic(&self.path, &json)
    }

    /// Stores a new endpoint (or clears it). Takes effect on the next session.
    pub fn set_endpoint(&self, endpoint: Option<&str>) -> Result<Config> {
        let mut config = self.load()?;
        config.remote_endpoint = endpoint
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);
        self.save(&config)?;
        Ok(config)
    }
}
