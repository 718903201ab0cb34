//! # Diagnostics
//!
//! Out-of-band reporting for the logging pipeline itself, built on `tracing`.
//!
//! The pipeline never reports its own failures through the sink that failed.
//! Sink errors, dropped events and lifecycle notes are emitted with the
//! `tracing` macros, and this module installs the subscriber that receives
//! them:
//! - stderr by default, so diagnostics never mix with the log stream on stdout
//! - optionally a file, written through a `tracing-appender` worker
//! - pretty (development) or JSON (production) formatting
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sluice_core::Level;
//! use sluice_utils::init_diagnostics;
//!
//! // Keep the guard alive for as long as diagnostics should be flushed.
//! let _guard = init_diagnostics(Level::Warn).expect("Failed to initialize diagnostics");
//! tracing::warn!("sink is falling behind");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives; when set, they replace the level passed in
//! - `SLUICE_DIAG_FORMAT`: `pretty` or `json` (default: `pretty`)
//! - `SLUICE_DIAG_FILE`: write diagnostics to this file instead of stderr

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::{env, io};

use sluice_core::Level;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the diagnostics format.
pub const FORMAT_ENV: &str = "SLUICE_DIAG_FORMAT";
/// Environment variable naming a diagnostics file.
pub const FILE_ENV: &str = "SLUICE_DIAG_FILE";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Diagnostics output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticsFormat
{
    /// Human-readable lines (default)
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for DiagnosticsFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "dev" | "development" => Ok(DiagnosticsFormat::Pretty),
            "json" | "prod" | "production" => Ok(DiagnosticsFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Where and how diagnostics are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticsSettings
{
    /// Output format
    pub format: DiagnosticsFormat,
    /// File to write to instead of stderr
    pub file: Option<PathBuf>,
}

impl DiagnosticsSettings
{
    /// Read [`FORMAT_ENV`] and [`FILE_ENV`] from the process environment.
    ///
    /// ## Errors
    ///
    /// See [`DiagnosticsSettings::from_lookup`].
    pub fn from_env() -> Result<Self, LoggingError>
    {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings from an arbitrary variable lookup.
    ///
    /// Empty values count as unset.
    ///
    /// ## Errors
    ///
    /// [`LoggingError::InvalidFormat`] for an unknown format name.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LoggingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = match lookup(FORMAT_ENV).filter(|s| !s.is_empty()) {
            Some(name) => name.parse()?,
            None => DiagnosticsFormat::default(),
        };
        let file = lookup(FILE_ENV).filter(|s| !s.is_empty()).map(PathBuf::from);
        Ok(Self { format, file })
    }
}

/// Keeps the file writer alive; pending diagnostics are flushed on drop.
#[derive(Debug)]
#[must_use = "dropping the guard stops file diagnostics"]
pub struct DiagnosticsGuard
{
    file: Option<PathBuf>,
    _worker: Option<WorkerGuard>,
}

impl DiagnosticsGuard
{
    /// File receiving diagnostics, if not stderr.
    #[must_use]
    pub fn file(&self) -> Option<&Path>
    {
        self.file.as_deref()
    }
}

/// Initialize diagnostics at `level`, taking format and destination from the
/// environment.
///
/// ## Errors
///
/// Returns an error if:
/// - A subscriber is already installed
/// - `SLUICE_DIAG_FORMAT` names an unknown format
/// - The file named by `SLUICE_DIAG_FILE` cannot be opened
pub fn init_diagnostics(level: Level) -> Result<DiagnosticsGuard, LoggingError>
{
    init_diagnostics_with(level, DiagnosticsSettings::from_env()?)
}

/// Initialize diagnostics with explicit settings.
///
/// `RUST_LOG` still takes precedence over `level` when it is set and valid.
///
/// ## Errors
///
/// Returns an error if a subscriber is already installed or the file cannot
/// be opened.
pub fn init_diagnostics_with(level: Level, settings: DiagnosticsSettings) -> Result<DiagnosticsGuard, LoggingError>
{
    let filter = env_filter(level);

    let (layer, worker) = match &settings.file {
        Some(path) => {
            let (writer, worker) = tracing_appender::non_blocking(file_appender(path)?);
            (build_layer(settings.format, writer, false, filter), Some(worker))
        }
        None => (build_layer(settings.format, io::stderr, true, filter), None),
    };

    Registry::default()
        .with(layer)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    tracing::debug!(format = ?settings.format, file = ?settings.file, "diagnostics initialized");

    Ok(DiagnosticsGuard {
        file: settings.file,
        _worker: worker,
    })
}

/// `RUST_LOG` when set, otherwise the logger threshold mapped onto `tracing`.
fn env_filter(level: Level) -> EnvFilter
{
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(LevelFilter::from(level).to_string()))
}

fn file_appender(path: &Path) -> Result<RollingFileAppender, LoggingError>
{
    let name = path
        .file_name()
        .ok_or_else(|| LoggingError::InvalidFile(path.to_path_buf()))?;
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));

    Ok(RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(name.to_string_lossy().into_owned())
        .build(dir)?)
}

fn build_layer<W>(format: DiagnosticsFormat, writer: W, ansi: bool, filter: EnvFilter) -> BoxedLayer
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::rfc_3339());

    match format {
        DiagnosticsFormat::Pretty => layer.with_ansi(ansi).with_filter(filter).boxed(),
        DiagnosticsFormat::Json => layer
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_filter(filter)
            .boxed(),
    }
}

/// Diagnostics initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    /// Invalid diagnostics format
    #[error("Invalid diagnostics format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    /// Path has no file name component
    #[error("Invalid diagnostics file: {}", .0.display())]
    InvalidFile(PathBuf),

    /// A global subscriber could not be installed
    #[error("Failed to initialize diagnostics: {0}")]
    InitializationFailed(String),

    /// The diagnostics file could not be opened
    #[error("File diagnostics error: {0}")]
    FileError(#[from] InitError),
}
