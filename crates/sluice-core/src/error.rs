//! # Error Types
//!
//! Error handling for the logging pipeline.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages. Formatting and normalization are total functions,
//! so the only fallible boundaries are the sink and configuration.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised at the sink boundary
///
/// ## Error Categories
///
/// 1. **Shutdown errors**: Closed
/// 2. **Downstream errors**: DownstreamWrite, Io
/// 3. **Construction errors**: InvalidCapacity, Spawn
/// 4. **Worker errors**: WorkerPanicked
#[derive(Error, Debug)]
pub enum SinkError
{
    /// The sink has been shut down and no longer accepts writes
    ///
    /// Returned by every `write` that observes the shutdown flag, including
    /// writes that were blocked on a full queue when `close` was called.
    #[error("sink closed")]
    Closed,

    /// One or more writes to the downstream stream failed
    ///
    /// Each failure is reported out-of-band when it happens; `close` returns
    /// this summary so the composition root can decide what to do about it.
    #[error("{failures} downstream write(s) failed, last error: {last}")]
    DownstreamWrite
    {
        /// Number of entries that could not be written
        failures: u64,
        /// Message of the most recent failure
        last: String,
    },

    /// A sink cannot be built without room for at least one entry
    #[error("invalid sink capacity: {0}")]
    InvalidCapacity(usize),

    /// The background writer thread could not be started
    #[error("failed to spawn writer thread: {0}")]
    Spawn(#[source] io::Error),

    /// The background writer thread panicked while draining
    #[error("writer thread panicked")]
    WorkerPanicked,

    /// I/O error from a synchronous downstream
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<SinkError> for io::Error
{
    fn from(err: SinkError) -> Self
    {
        match err {
            SinkError::Closed => io::Error::new(io::ErrorKind::BrokenPipe, err),
            SinkError::Io(inner) => inner,
            other => io::Error::other(other),
        }
    }
}

/// Errors raised while reading or resolving configuration
#[derive(Error, Debug)]
pub enum ConfigError
{
    /// The configured severity is not one of the recognized names
    #[error("invalid log level: {0:?} (expected trace, debug, info, warn, error, panic, fatal or disabled)")]
    InvalidLevel(String),

    /// The configured mode is not `dev` or `prod`
    #[error("invalid mode: {0:?} (expected dev or prod)")]
    InvalidMode(String),

    /// A configuration file could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    Read
    {
        /// File that failed to load
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A configuration file is not valid TOML or has the wrong shape
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Umbrella error for callers that wire the whole pipeline
#[derive(Error, Debug)]
pub enum SluiceError
{
    /// Configuration could not be resolved
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The sink could not be built or failed
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Convenience type alias for `Result<T, SluiceError>`
///
/// ```rust
/// use sluice_core::error::SluiceResult;
/// fn foo() -> SluiceResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type SluiceResult<T> = std::result::Result<T, SluiceError>;
