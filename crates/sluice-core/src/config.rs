//! # Configuration
//!
//! ```toml
//! mode = "dev"          # dev: console lines, prod: JSON lines
//!
//! [logger]
//! level = "debug"       # trace|debug|info|warn|error|panic|fatal|disabled
//! ```
//!
//! [`Config::load`] reads the base file and then, if it exists, merges
//! `config.<mode>.toml` from the same directory on top of it. Environment
//! overrides are applied separately with [`Config::apply_env`].
//!
//! The level is kept as text until the logger is initialized, so a bad value
//! fails logger construction with [`ConfigError::InvalidLevel`] rather than
//! failing the whole configuration load.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::level::Level;

/// Environment variable overriding `logger.level`.
pub const LEVEL_ENV: &str = "SLUICE_LOG_LEVEL";
/// Environment variable overriding `mode`.
pub const MODE_ENV: &str = "SLUICE_MODE";

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode
{
    /// Development: human-readable output
    Dev,
    /// Production: machine-readable output
    #[default]
    Prod,
}

impl Mode
{
    /// Lowercase name as written in config files.
    #[must_use]
    pub const fn as_str(self) -> &'static str
    {
        match self {
            Mode::Dev => "dev",
            Mode::Prod => "prod",
        }
    }
}

impl fmt::Display for Mode
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode
{
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_lowercase().as_str() {
            "dev" => Ok(Mode::Dev),
            "prod" => Ok(Mode::Prod),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

/// `[logger]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig
{
    /// Threshold name; empty means `info`
    pub level: String,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config
{
    /// Deployment mode
    pub mode: Mode,
    /// Logger settings
    pub logger: LoggerConfig,
}

impl Config
{
    /// Configuration with the given threshold and default mode.
    #[must_use]
    pub fn with_level(level: Level) -> Self
    {
        Self {
            logger: LoggerConfig {
                level: level.as_str().to_string(),
            },
            ..Self::default()
        }
    }

    /// Parse configuration from TOML text.
    ///
    /// ## Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML or an unknown mode.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError>
    {
        Ok(toml::from_str(text)?)
    }

    /// Load `path`, then merge the `config.<mode>.toml` override next to it
    /// when present.
    ///
    /// ## Errors
    ///
    /// - [`ConfigError::Read`] if a file exists but cannot be read
    /// - [`ConfigError::Parse`] if a file is not valid TOML
    /// - [`ConfigError::InvalidMode`] if the base file names an unknown mode
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError>
    {
        let path = path.as_ref();
        let mut table = read_table(path)?;

        let mode = match table.get("mode") {
            Some(toml::Value::String(mode)) => mode.parse::<Mode>()?,
            Some(other) => return Err(ConfigError::InvalidMode(other.to_string())),
            None => Mode::default(),
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let override_path = dir.join(format!("config.{mode}.toml"));
        if override_path.is_file() {
            tracing::debug!(path = %override_path.display(), "merging mode override config");
            merge(&mut table, read_table(&override_path)?);
        }

        Ok(toml::Value::Table(table).try_into()?)
    }

    /// Apply [`LEVEL_ENV`] and [`MODE_ENV`] from the process environment.
    ///
    /// ## Errors
    ///
    /// See [`Config::apply_overrides`].
    pub fn apply_env(&mut self) -> Result<(), ConfigError>
    {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// ## Errors
    ///
    /// [`ConfigError::InvalidLevel`] or [`ConfigError::InvalidMode`] when an
    /// override holds an unrecognized value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = lookup(LEVEL_ENV) {
            level.parse::<Level>()?;
            self.logger.level = level;
        }
        if let Some(mode) = lookup(MODE_ENV) {
            self.mode = mode.parse()?;
        }
        Ok(())
    }

    /// Resolve the configured threshold.
    ///
    /// ## Errors
    ///
    /// [`ConfigError::InvalidLevel`] for an unrecognized level name.
    pub fn level(&self) -> Result<Level, ConfigError>
    {
        self.logger.level.parse()
    }

    /// Whether the configuration selects development mode.
    #[must_use]
    pub fn is_dev(&self) -> bool
    {
        self.mode == Mode::Dev
    }

    /// Whether the configuration selects production mode.
    #[must_use]
    pub fn is_prod(&self) -> bool
    {
        self.mode == Mode::Prod
    }
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError>
{
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&text)?)
}

/// Deep-merge `overlay` into `base`; tables merge key by key, anything else
/// in `overlay` replaces the base value.
fn merge(base: &mut toml::Table, overlay: toml::Table)
{
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge(existing, incoming),
                _ => {
                    base.insert(key, toml::Value::Table(incoming));
                }
            },
            other => {
                base.insert(key, other);
            }
        }
    }
}
