//! Service configuration.
//!
//! Loaded from a TOML file (every section optional), then overridden by
//! environment variables (a `.env` file is honoured by the binary), then by
//! command-line flags. Defaults reproduce the dashboard's historical output.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::alert::scoring::ScoreWeights;
use crate::regions::is_valid_region_code;

pub const DEFAULT_CONFIG_PATH: &str = "config/wxalert.toml";

/// Environment variables that override file settings.
pub const ENV_ORGS_PATH: &str = "WXALERT_ORGS_PATH";
pub const ENV_OUTPUT_PATH: &str = "WXALERT_OUTPUT_PATH";
pub const ENV_REPORT_PATH: &str = "WXALERT_REPORT_PATH";
pub const ENV_ALERTS_URL: &str = "NWS_ALERTS_URL";
pub const ENV_USER_AGENT: &str = "NWS_USER_AGENT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOML in {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct NwsSettings {
    pub alerts_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for NwsSettings {
    fn default() -> Self {
        Self {
            alerts_url: "https://api.weather.gov/alerts/active".to_string(),
            user_agent: "wxalert_service/0.1".to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub organizations: PathBuf,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            organizations: PathBuf::from("active_org_addresses_geocoded.csv"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub path: PathBuf,
    /// Optional JSON run report.
    pub report: Option<PathBuf>,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("dashboard_with_weather_alerts.csv"),
            report: None,
        }
    }
}

/// How multi-alert text columns are rendered.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    /// Joins multiple values within one cell.
    pub separator: String,
    pub description_max_chars: usize,
    /// Replace CR/LF inside derived text cells with spaces.
    pub flatten_newlines: bool,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            separator: " | ".to_string(),
            description_max_chars: 300,
            flatten_newlines: true,
        }
    }
}

/// Static zone → region code reference data.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct ZoneSettings {
    /// Extra TOML file of `ZONE = "CODE"` pairs.
    pub table: Option<PathBuf>,
    /// Inline entries; these win over the file.
    pub entries: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub nws: NwsSettings,
    pub input: InputSettings,
    pub output: OutputSettings,
    pub scoring: ScoreWeights,
    pub text: TextSettings,
    pub zones: ZoneSettings,
    /// Region code → office name overrides for text fallback.
    pub offices: BTreeMap<String, String>,
    /// Abort when the alert source returns an empty (but valid) feed.
    pub require_alerts: bool,
}

impl Config {
    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str, origin: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a config file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content, &path.display().to_string())
    }

    /// Loads `path` if given, else the default path if it exists, else
    /// built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(Path::new(DEFAULT_CONFIG_PATH)),
            None => Ok(Config::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scoring.validate().map_err(ConfigError::Invalid)?;
        if self.text.description_max_chars == 0 {
            return Err(ConfigError::Invalid("text.description_max_chars must be positive".to_string()));
        }
        if self.text.separator.is_empty() {
            return Err(ConfigError::Invalid("text.separator must not be empty".to_string()));
        }
        if self.nws.timeout_secs == 0 {
            return Err(ConfigError::Invalid("nws.timeout_secs must be positive".to_string()));
        }
        if let Some(code) = self.offices.keys().find(|c| !is_valid_region_code(c)) {
            return Err(ConfigError::Invalid(format!("offices: '{}' is not a region code", code)));
        }
        Ok(())
    }

    /// Applies overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_ORGS_PATH) {
            self.input.organizations = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_OUTPUT_PATH) {
            self.output.path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_REPORT_PATH) {
            self.output.report = Some(PathBuf::from(v));
        }
        if let Some(v) = get(ENV_ALERTS_URL) {
            self.nws.alerts_url = v;
        }
        if let Some(v) = get(ENV_USER_AGENT) {
            self.nws.user_agent = v;
        }
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// The full static zone table: the optional file, then inline entries
    /// on top.
    pub fn zone_table(&self) -> Result<BTreeMap<String, String>, ConfigError> {
        let mut table = match &self.zones.table {
            Some(path) => load_zone_table(path)?,
            None => BTreeMap::new(),
        };
        table.extend(self.zones.entries.clone());
        Ok(table)
    }
}

/// Reads a TOML file of `ZONE = "CODE"` pairs.
pub fn load_zone_table(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}
