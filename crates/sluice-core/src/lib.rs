//! # sluice-core
//!
//! Leveled, scope-chained logging over a bounded asynchronous sink.
//!
//! This crate provides:
//! - [`sink::AsyncSink`]: a fixed-capacity queue drained by one writer thread
//!   that owns the output stream (backpressure, ordered drain on close)
//! - [`Logger`]: an immutable logger value with cheap threshold checks and
//!   `with` / `with_scope` derivation
//! - [`format`]: `{}` placeholder templates
//! - [`normalize`]: turning arbitrary `Serialize` values into printable trees
//!
//! ## Pipeline
//!
//! ```text
//! caller ─▶ Logger::info(template, fields)
//!              │ threshold check (returns early when disabled)
//!              ▼
//!           normalize fields ─▶ render template ─▶ encode event
//!              │
//!              ▼
//!           AsyncSink::write ── bounded queue ──▶ writer thread ─▶ stdout
//! ```
//!
//! Internal diagnostics (sink failures, dropped events) go through `tracing`,
//! never through the sink itself.

pub mod config;
pub mod error;
pub mod event;
pub mod format;
pub mod level;
pub mod logger;
mod macros;
pub mod normalize;
pub mod sink;
pub mod termination;

pub use config::{Config, Mode};
// Re-export commonly used types
pub use error::{ConfigError, SinkError, SluiceError, SluiceResult};
pub use event::Encoding;
pub use level::Level;
pub use logger::{Logger, LoggerBuilder};
pub use normalize::{Field, Value};
pub use sink::{AsyncSink, Sink, SyncSink};
pub use termination::{ReportOnly, Terminate, Termination};
