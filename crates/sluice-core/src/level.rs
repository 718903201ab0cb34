//! Severity levels and the threshold check that gates every log call.

use std::fmt;
use std::str::FromStr;

use tracing::level_filters::LevelFilter;

use crate::error::ConfigError;

/// Log severity
///
/// Variants are declared in ascending order, so the derived `Ord` is the
/// filter order: `Trace < Debug < Info < Warn < Error < Panic < Fatal`.
/// `Disabled` is only meaningful as a threshold and sits above every
/// severity, so nothing passes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Level
{
    /// Most verbose
    Trace,
    /// Debug information
    Debug,
    /// Info level (default)
    #[default]
    Info,
    /// Warning level
    Warn,
    /// Error level
    Error,
    /// Reported, then the current flow unwinds
    Panic,
    /// Reported, then the process terminates
    Fatal,
    /// Threshold that filters out everything
    Disabled,
}

impl Level
{
    /// Every level in ascending order.
    pub const ALL: [Level; 8] = [
        Level::Trace,
        Level::Debug,
        Level::Info,
        Level::Warn,
        Level::Error,
        Level::Panic,
        Level::Fatal,
        Level::Disabled,
    ];

    /// Whether an event of `severity` passes this threshold.
    #[inline]
    #[must_use]
    pub fn allows(self, severity: Level) -> bool
    {
        severity != Level::Disabled && severity >= self
    }

    /// Lowercase name, as accepted by [`FromStr`] and written in JSON events.
    #[must_use]
    pub const fn as_str(self) -> &'static str
    {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Panic => "panic",
            Level::Fatal => "fatal",
            Level::Disabled => "disabled",
        }
    }

    /// Three-letter tag used by the console encoding.
    #[must_use]
    pub const fn abbreviation(self) -> &'static str
    {
        match self {
            Level::Trace => "TRC",
            Level::Debug => "DBG",
            Level::Info => "INF",
            Level::Warn => "WRN",
            Level::Error => "ERR",
            Level::Panic => "PNC",
            Level::Fatal => "FTL",
            Level::Disabled => "---",
        }
    }
}

impl fmt::Display for Level
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level
{
    type Err = ConfigError;

    /// Parse a configured level. Matching is case-insensitive and an empty
    /// string means the default (`info`).
    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.trim().to_lowercase().as_str() {
            "" | "info" => Ok(Level::Info),
            "trace" => Ok(Level::Trace),
            "debug" => Ok(Level::Debug),
            "warn" => Ok(Level::Warn),
            "error" => Ok(Level::Error),
            "panic" => Ok(Level::Panic),
            "fatal" => Ok(Level::Fatal),
            "disabled" => Ok(Level::Disabled),
            _ => Err(ConfigError::InvalidLevel(s.to_string())),
        }
    }
}

/// Map a threshold onto the closest `tracing` filter, for collaborators that
/// bridge other logging facades into the same verbosity.
impl From<Level> for LevelFilter
{
    fn from(level: Level) -> Self
    {
        match level {
            Level::Trace => LevelFilter::TRACE,
            Level::Debug => LevelFilter::DEBUG,
            Level::Info => LevelFilter::INFO,
            Level::Warn => LevelFilter::WARN,
            Level::Error | Level::Panic | Level::Fatal => LevelFilter::ERROR,
            Level::Disabled => LevelFilter::OFF,
        }
    }
}
