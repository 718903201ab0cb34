//! Logging macros.
//!
//! Each macro checks the logger's threshold before evaluating any field
//! expression, so arguments cost nothing when the level is disabled:
//!
//! ```rust
//! # use std::sync::Arc;
//! # use sluice_core::{config::Config, sink::SyncSink, Level, LoggerBuilder};
//! # let logger = LoggerBuilder::new(Config::with_level(Level::Warn))
//! #     .sink(Arc::new(SyncSink::new(std::io::sink())))
//! #     .init()
//! #     .unwrap();
//! fn expensive() -> u64
//! {
//!     unreachable!("not evaluated below the threshold")
//! }
//!
//! sluice_core::info!(logger, "value is {}", expensive());
//!
//! let err = std::io::Error::other("disk full");
//! sluice_core::error!(logger, err = err, "flush failed after {} retries", 3);
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! __sluice_fields {
    ($($field:expr),*) => {
        &[$(&$field as &dyn $crate::normalize::Field),*]
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __sluice_plain {
    ($method:ident, $level:expr, $logger:expr, $template:expr $(, $field:expr)*) => {{
        let logger = &$logger;
        if logger.enabled($level) {
            logger.$method($template, $crate::__sluice_fields!($($field),*));
        }
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __sluice_with_error {
    ($method:ident, $level:expr, $logger:expr, $err:expr, $template:expr $(, $field:expr)*) => {{
        let logger = &$logger;
        if logger.enabled($level) {
            logger.$method($template, $err, $crate::__sluice_fields!($($field),*));
        }
    }};
}

/// Log at trace level: `trace!(logger, "template {}", field, ...)`.
#[macro_export]
macro_rules! trace {
    ($logger:expr, $template:expr $(, $field:expr)* $(,)?) => {
        $crate::__sluice_plain!(trace, $crate::Level::Trace, $logger, $template $(, $field)*)
    };
}

/// Log at debug level: `debug!(logger, "template {}", field, ...)`.
#[macro_export]
macro_rules! debug {
    ($logger:expr, $template:expr $(, $field:expr)* $(,)?) => {
        $crate::__sluice_plain!(debug, $crate::Level::Debug, $logger, $template $(, $field)*)
    };
}

/// Log at info level: `info!(logger, "template {}", field, ...)`.
#[macro_export]
macro_rules! info {
    ($logger:expr, $template:expr $(, $field:expr)* $(,)?) => {
        $crate::__sluice_plain!(info, $crate::Level::Info, $logger, $template $(, $field)*)
    };
}

/// Log at warn level: `warn!(logger, "template {}", field, ...)`.
#[macro_export]
macro_rules! warn {
    ($logger:expr, $template:expr $(, $field:expr)* $(,)?) => {
        $crate::__sluice_plain!(warn, $crate::Level::Warn, $logger, $template $(, $field)*)
    };
}

/// Log at error level, optionally with `err = <error>` before the template.
#[macro_export]
macro_rules! error {
    ($logger:expr, err = $err:expr, $template:expr $(, $field:expr)* $(,)?) => {
        $crate::__sluice_with_error!(
            error,
            $crate::Level::Error,
            $logger,
            ::std::option::Option::Some(&$err as &dyn ::std::error::Error),
            $template
            $(, $field)*
        )
    };
    ($logger:expr, $template:expr $(, $field:expr)* $(,)?) => {
        $crate::__sluice_with_error!(error, $crate::Level::Error, $logger, ::std::option::Option::None, $template $(, $field)*)
    };
}

/// Log at panic level and run the logger's panic step.
///
/// Named `log_panic!` so it never shadows `std::panic!`.
#[macro_export]
macro_rules! log_panic {
    ($logger:expr, err = $err:expr, $template:expr $(, $field:expr)* $(,)?) => {
        $crate::__sluice_with_error!(
            panic,
            $crate::Level::Panic,
            $logger,
            ::std::option::Option::Some(&$err as &dyn ::std::error::Error),
            $template
            $(, $field)*
        )
    };
    ($logger:expr, $template:expr $(, $field:expr)* $(,)?) => {
        $crate::__sluice_with_error!(panic, $crate::Level::Panic, $logger, ::std::option::Option::None, $template $(, $field)*)
    };
}

/// Log at fatal level, drain the sink and run the logger's fatal step.
#[macro_export]
macro_rules! fatal {
    ($logger:expr, err = $err:expr, $template:expr $(, $field:expr)* $(,)?) => {
        $crate::__sluice_with_error!(
            fatal,
            $crate::Level::Fatal,
            $logger,
            ::std::option::Option::Some(&$err as &dyn ::std::error::Error),
            $template
            $(, $field)*
        )
    };
    ($logger:expr, $template:expr $(, $field:expr)* $(,)?) => {
        $crate::__sluice_with_error!(fatal, $crate::Level::Fatal, $logger, ::std::option::Option::None, $template $(, $field)*)
    };
}
