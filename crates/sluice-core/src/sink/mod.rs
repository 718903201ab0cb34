//! # Sinks
//!
//! A sink accepts serialized log events as byte buffers and delivers them to
//! one downstream stream.
//!
//! - [`AsyncSink`]: bounded queue drained by a dedicated writer thread. This
//!   is what production loggers use.
//! - [`SyncSink`]: writes on the calling thread under a lock. Used in tests
//!   and wherever buffering is unwanted; `SyncSink::new(std::io::sink())` is
//!   a no-op sink.

mod async_sink;

use std::io::Write;

use parking_lot::Mutex;

pub use async_sink::{AsyncSink, WriteFailurePolicy, DEFAULT_CAPACITY};

use crate::error::SinkError;

/// Destination for serialized events.
pub trait Sink: Send + Sync
{
    /// Accept one serialized event. Returns the number of bytes accepted.
    ///
    /// ## Errors
    ///
    /// Returns [`SinkError::Closed`] once the sink has been closed.
    fn write(&self, buf: &[u8]) -> Result<usize, SinkError>;

    /// Stop accepting writes and deliver everything already accepted.
    ///
    /// Calling `close` more than once is allowed.
    ///
    /// ## Errors
    ///
    /// Implementation specific; see [`AsyncSink::close`].
    fn close(&self) -> Result<(), SinkError>;
}

/// Sink that writes straight through on the caller's thread.
#[derive(Debug)]
pub struct SyncSink<W>
{
    writer: Mutex<Option<W>>,
}

impl<W: Write + Send> SyncSink<W>
{
    /// Wrap a writer.
    #[must_use]
    pub fn new(writer: W) -> Self
    {
        Self {
            writer: Mutex::new(Some(writer)),
        }
    }
}

impl<W: Write + Send> Sink for SyncSink<W>
{
    fn write(&self, buf: &[u8]) -> Result<usize, SinkError>
    {
        let mut guard = self.writer.lock();
        let writer = guard.as_mut().ok_or(SinkError::Closed)?;
        writer.write_all(buf)?;
        Ok(buf.len())
    }

    fn close(&self) -> Result<(), SinkError>
    {
        if let Some(mut writer) = self.writer.lock().take() {
            writer.flush()?;
        }
        Ok(())
    }
}
