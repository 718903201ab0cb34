//! # Logger
//!
//! [`Logger`] is an immutable, cheaply cloned value. Deriving a logger with
//! [`Logger::with`] or [`Logger::with_scope`] links one new node onto the
//! scope chain; the parent and its other children never see it. All loggers
//! derived from one [`LoggerBuilder::init`] call share a single sink.
//!
//! Every leveled call checks the threshold before doing any work. Only when
//! the event passes are the fields normalized, the template rendered and the
//! event encoded and handed to the sink.
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use sluice_core::config::Config;
//! use sluice_core::sink::SyncSink;
//! use sluice_core::{Level, LoggerBuilder};
//!
//! # fn main() -> Result<(), sluice_core::error::SluiceError> {
//! let logger = LoggerBuilder::new(Config::with_level(Level::Debug))
//!     .sink(Arc::new(SyncSink::new(std::io::sink())))
//!     .init()?;
//!
//! let db = logger.with_scope("db").with("shard", &3);
//! db.info("connected to {} in {}ms", &[&"primary", &12]);
//! sluice_core::debug!(db, "pool size {}", 8);
//!
//! logger.close()?;
//! # Ok(())
//! # }
//! ```

use std::error::Error;
use std::io;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::config::Config;
use crate::error::{SinkError, SluiceError};
use crate::event::{Encoding, Event};
use crate::format::Template;
use crate::level::Level;
use crate::normalize::{normalize, normalize_all, Field, Value};
use crate::sink::{AsyncSink, Sink, WriteFailurePolicy, DEFAULT_CAPACITY};
use crate::termination::{Terminate, Termination};

/// Field key used by [`Logger::with_scope`].
pub const SCOPE_KEY: &str = "module";

/// One immutable link of a scope chain.
#[derive(Debug)]
struct Attachment
{
    key: String,
    value: Value,
    parent: Option<Arc<Attachment>>,
}

/// Leveled, scope-chained logger.
#[derive(Clone)]
pub struct Logger
{
    level: Level,
    encoding: Encoding,
    chain: Option<Arc<Attachment>>,
    sink: Arc<dyn Sink>,
    termination: Arc<dyn Termination>,
    /// Set once a leveled call has reported a write to the closed sink.
    closed_reported: Arc<AtomicBool>,
}

impl std::fmt::Debug for Logger
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("encoding", &self.encoding)
            .field("scope_chain", &self.scope_chain())
            .finish_non_exhaustive()
    }
}

impl Logger
{
    /// Active threshold.
    #[must_use]
    pub fn level(&self) -> Level
    {
        self.level
    }

    /// Whether an event of `severity` would be emitted.
    #[inline]
    #[must_use]
    pub fn enabled(&self, severity: Level) -> bool
    {
        self.level.allows(severity)
    }

    /// Encoding used for emitted events.
    #[must_use]
    pub fn encoding(&self) -> Encoding
    {
        self.encoding
    }

    /// Derive a logger that attaches `key = value` to every event.
    ///
    /// The value is normalized once, here.
    #[must_use]
    pub fn with<T>(&self, key: impl Into<String>, value: &T) -> Logger
    where
        T: ?Sized + Serialize,
    {
        self.attach(key.into(), normalize(value))
    }

    /// Derive a logger labelled with a component name (`module = name`).
    #[must_use]
    pub fn with_scope(&self, name: impl Into<String>) -> Logger
    {
        self.attach(SCOPE_KEY.to_string(), Value::Str(name.into()))
    }

    fn attach(&self, key: String, value: Value) -> Logger
    {
        Logger {
            chain: Some(Arc::new(Attachment {
                key,
                value,
                parent: self.chain.clone(),
            })),
            sink: Arc::clone(&self.sink),
            termination: Arc::clone(&self.termination),
            closed_reported: Arc::clone(&self.closed_reported),
            ..*self
        }
    }

    /// Attachments on this logger, oldest first.
    #[must_use]
    pub fn scope_chain(&self) -> Vec<(&str, &Value)>
    {
        let mut fields = Vec::new();
        let mut node = self.chain.as_deref();
        while let Some(attachment) = node {
            fields.push((attachment.key.as_str(), &attachment.value));
            node = attachment.parent.as_deref();
        }
        fields.reverse();
        fields
    }

    /// Emit an event if `severity` passes the threshold.
    ///
    /// Returns `None` when filtered, otherwise the rendered message and the
    /// outcome of handing the event to the sink.
    #[track_caller]
    fn emit(
        &self,
        severity: Level,
        template: &str,
        err: Option<&dyn Error>,
        fields: &[&dyn Field],
    ) -> Option<(String, Result<(), SinkError>)>
    {
        if !self.enabled(severity) {
            return None;
        }

        let values = normalize_all(fields);
        let message = Template::parse(template).render(&values);
        let event = Event {
            level: severity,
            time: Utc::now(),
            fields: self.scope_chain(),
            error: err.map(ToString::to_string),
            caller: Location::caller(),
            message,
        };

        let outcome = event
            .encode(self.encoding)
            .map_err(SinkError::from)
            .and_then(|bytes| self.sink.write(&bytes).map(|_| ()));
        Some((event.message, outcome))
    }

    /// Like [`Logger::emit`], but sink failures are reported on the
    /// diagnostics channel instead of returned.
    ///
    /// Writes to a closed sink are warned about once per sink; later ones
    /// only show up at debug level.
    #[track_caller]
    fn report(&self, severity: Level, template: &str, err: Option<&dyn Error>, fields: &[&dyn Field]) -> Option<String>
    {
        let (message, outcome) = self.emit(severity, template, err, fields)?;
        match outcome {
            Ok(()) => {}
            Err(SinkError::Closed) if self.closed_reported.swap(true, Ordering::Relaxed) => {
                tracing::debug!(level = %severity, "dropped log event: sink closed");
            }
            Err(SinkError::Closed) => {
                tracing::warn!(level = %severity, "dropped log event: sink closed, further drops are reported at debug");
            }
            Err(sink_err) => {
                tracing::warn!(error = %sink_err, level = %severity, "dropped log event");
            }
        }
        Some(message)
    }

    /// Log at an arbitrary severity, returning sink failures to the caller.
    ///
    /// Does not run the termination step for `panic`/`fatal`; use
    /// [`Logger::panic`] and [`Logger::fatal`] for that.
    ///
    /// ## Errors
    ///
    /// [`SinkError::Closed`] if the sink has been closed, or
    /// [`SinkError::Io`] if a synchronous sink failed.
    #[track_caller]
    pub fn log(
        &self,
        severity: Level,
        template: &str,
        err: Option<&dyn Error>,
        fields: &[&dyn Field],
    ) -> Result<(), SinkError>
    {
        self.emit(severity, template, err, fields)
            .map_or(Ok(()), |(_, outcome)| outcome)
    }

    /// Log at trace level.
    #[track_caller]
    pub fn trace(&self, template: &str, fields: &[&dyn Field])
    {
        self.report(Level::Trace, template, None, fields);
    }

    /// Log at debug level.
    #[track_caller]
    pub fn debug(&self, template: &str, fields: &[&dyn Field])
    {
        self.report(Level::Debug, template, None, fields);
    }

    /// Log at info level.
    #[track_caller]
    pub fn info(&self, template: &str, fields: &[&dyn Field])
    {
        self.report(Level::Info, template, None, fields);
    }

    /// Log at warn level.
    #[track_caller]
    pub fn warn(&self, template: &str, fields: &[&dyn Field])
    {
        self.report(Level::Warn, template, None, fields);
    }

    /// Log at error level with an optional error attached.
    #[track_caller]
    pub fn error(&self, template: &str, err: Option<&dyn Error>, fields: &[&dyn Field])
    {
        self.report(Level::Error, template, err, fields);
    }

    /// Log at panic level, then run the termination policy's panic step.
    ///
    /// ## Panics
    ///
    /// With the default [`Terminate`] policy, whenever the event passes the
    /// threshold.
    #[track_caller]
    pub fn panic(&self, template: &str, err: Option<&dyn Error>, fields: &[&dyn Field])
    {
        if let Some(message) = self.report(Level::Panic, template, err, fields) {
            self.termination.panic(&message);
        }
    }

    /// Log at fatal level, drain the sink, then run the termination policy's
    /// fatal step (process exit by default).
    ///
    /// The sink is closed afterwards even if the policy returns.
    #[track_caller]
    pub fn fatal(&self, template: &str, err: Option<&dyn Error>, fields: &[&dyn Field])
    {
        if let Some(message) = self.report(Level::Fatal, template, err, fields) {
            if let Err(close_err) = self.sink.close() {
                tracing::error!(error = %close_err, "failed to drain sink before fatal exit");
            }
            self.termination.fatal(&message);
        }
    }

    /// Close the shared sink, draining pending events.
    ///
    /// Affects every logger derived from the same [`LoggerBuilder::init`].
    ///
    /// ## Errors
    ///
    /// Whatever the sink's `close` reports.
    pub fn close(&self) -> Result<(), SinkError>
    {
        tracing::debug!("closing logger sink");
        self.sink.close()
    }
}

/// Builds a [`Logger`] from configuration.
///
/// Construction is split from initialization: [`LoggerBuilder::new`] only
/// records the configuration, and [`LoggerBuilder::init`] resolves the level
/// and wires the sink. Anything not overridden gets the production default:
/// an [`AsyncSink`] over stdout with [`DEFAULT_CAPACITY`] and
/// [`WriteFailurePolicy::Report`], the encoding implied by the mode, and the
/// [`Terminate`] policy.
pub struct LoggerBuilder
{
    config: Config,
    sink: Option<Arc<dyn Sink>>,
    encoding: Option<Encoding>,
    termination: Arc<dyn Termination>,
    capacity: usize,
    write_failure_policy: WriteFailurePolicy,
}

impl std::fmt::Debug for LoggerBuilder
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("LoggerBuilder")
            .field("config", &self.config)
            .field("sink", &self.sink.is_some())
            .field("encoding", &self.encoding)
            .field("capacity", &self.capacity)
            .field("write_failure_policy", &self.write_failure_policy)
            .finish_non_exhaustive()
    }
}

impl LoggerBuilder
{
    /// Start from a configuration.
    #[must_use]
    pub fn new(config: Config) -> Self
    {
        Self {
            config,
            sink: None,
            encoding: None,
            termination: Arc::new(Terminate),
            capacity: DEFAULT_CAPACITY,
            write_failure_policy: WriteFailurePolicy::default(),
        }
    }

    /// Use `sink` instead of the default stdout sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self
    {
        self.sink = Some(sink);
        self
    }

    /// Override the encoding implied by the configured mode.
    #[must_use]
    pub fn encoding(mut self, encoding: Encoding) -> Self
    {
        self.encoding = Some(encoding);
        self
    }

    /// Replace the termination policy used by `panic` and `fatal`.
    #[must_use]
    pub fn termination(mut self, termination: Arc<dyn Termination>) -> Self
    {
        self.termination = termination;
        self
    }

    /// Queue capacity of the default sink. Ignored when a sink is supplied.
    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self
    {
        self.capacity = capacity;
        self
    }

    /// What the default sink does when stdout rejects a write. Ignored when
    /// a sink is supplied.
    #[must_use]
    pub fn write_failure_policy(mut self, policy: WriteFailurePolicy) -> Self
    {
        self.write_failure_policy = policy;
        self
    }

    /// Resolve the level and wire the sink.
    ///
    /// ## Errors
    ///
    /// - [`SluiceError::Config`] if the configured level is not recognized
    /// - [`SluiceError::Sink`] if the default sink cannot be started
    pub fn init(self) -> Result<Logger, SluiceError>
    {
        let level = self.config.level()?;
        let encoding = self.encoding.unwrap_or_else(|| self.config.mode.into());
        let sink = match self.sink {
            Some(sink) => sink,
            None => Arc::new(AsyncSink::with_policy(
                io::stdout(),
                self.capacity,
                self.write_failure_policy,
            )?),
        };

        tracing::debug!(%level, ?encoding, mode = %self.config.mode, "logger initialized");

        Ok(Logger {
            level,
            encoding,
            chain: None,
            sink,
            termination: self.termination,
            closed_reported: Arc::new(AtomicBool::new(false)),
        })
    }
}
