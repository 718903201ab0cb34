//! # Sluice Utilities
//!
//! Shared helpers for the sluice workspace.
//!
//! The logging pipeline reports its own trouble (failed downstream writes,
//! dropped events) through `tracing` rather than through itself. This crate
//! installs the subscriber that receives those diagnostics.

pub mod diagnostics;

// Re-export commonly used diagnostics items for convenience
pub use diagnostics::{
    DiagnosticsFormat, DiagnosticsGuard, DiagnosticsSettings, LoggingError, init_diagnostics, init_diagnostics_with,
};
pub use tracing::{debug, error, info, trace, warn};
