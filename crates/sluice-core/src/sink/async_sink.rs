//! # Bounded Asynchronous Sink
//!
//! A fixed-capacity FIFO queue of byte buffers drained by one background
//! writer thread. The writer thread owns the downstream stream outright, so
//! entries can never be torn or interleaved no matter how many threads log.
//!
//! ## Backpressure
//!
//! When the queue holds `capacity` entries, [`AsyncSink::write`] blocks until
//! the writer frees a slot or the sink is closed.
//!
//! ## Shutdown
//!
//! [`AsyncSink::close`] sets the closed flag under the queue lock, wakes
//! everyone, and waits for the writer to drain the queue and exit. Every
//! write checks the flag under the same lock before enqueueing, so a write
//! racing with `close` is either enqueued first (and then guaranteed to be
//! written) or rejected with [`SinkError::Closed`]. Nothing is dropped.
//!
//! ## Downstream failures
//!
//! A failed downstream write is never logged through the sink that just
//! failed. It is reported on the `tracing` diagnostics channel and then
//! handled according to [`WriteFailurePolicy`].

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::{Condvar, Mutex};

use super::Sink;
use crate::error::SinkError;

/// Queue capacity used by [`crate::LoggerBuilder::init`].
pub const DEFAULT_CAPACITY: usize = 1000;

const WRITER_THREAD_NAME: &str = "sluice-writer";

/// What the writer thread does when the downstream stream rejects a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteFailurePolicy
{
    /// Report out-of-band, drop the entry, keep draining. `close` returns a
    /// [`SinkError::DownstreamWrite`] summary afterwards.
    #[default]
    Report,
    /// Report out-of-band, then exit the process with status 1.
    Exit,
}

#[derive(Debug, Default)]
struct State
{
    queue: VecDeque<Vec<u8>>,
    closed: bool,
    finished: bool,
    worker_panicked: bool,
    failures: u64,
    last_failure: Option<String>,
}

#[derive(Debug)]
struct Shared
{
    state: Mutex<State>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
    finished: Condvar,
}

impl Shared
{
    /// Block until an entry is available. `None` once closed and drained.
    fn next_entry(&self) -> Option<Vec<u8>>
    {
        let mut state = self.state.lock();
        loop {
            if let Some(entry) = state.queue.pop_front() {
                drop(state);
                self.not_full.notify_one();
                return Some(entry);
            }
            if state.closed {
                return None;
            }
            self.not_empty.wait(&mut state);
        }
    }

    fn record_failure(&self, err: &io::Error, bytes: usize, policy: WriteFailurePolicy)
    {
        tracing::error!(error = %err, bytes, "failed to write log entry downstream");
        if policy == WriteFailurePolicy::Exit {
            std::process::exit(1);
        }
        let mut state = self.state.lock();
        state.failures += 1;
        state.last_failure = Some(err.to_string());
    }
}

/// Marks the writer as finished even if the downstream stream panics, so
/// `close` and blocked producers never wait on a dead thread.
struct FinishGuard<'a>(&'a Shared);

impl Drop for FinishGuard<'_>
{
    fn drop(&mut self)
    {
        {
            let mut state = self.0.state.lock();
            state.finished = true;
            if thread::panicking() {
                state.worker_panicked = true;
                state.closed = true;
            }
        }
        self.0.finished.notify_all();
        self.0.not_full.notify_all();
    }
}

fn run_writer<W: Write>(shared: &Shared, mut downstream: W, policy: WriteFailurePolicy)
{
    let _guard = FinishGuard(shared);
    while let Some(entry) = shared.next_entry() {
        if let Err(err) = downstream.write_all(&entry) {
            shared.record_failure(&err, entry.len(), policy);
        }
    }
    if let Err(err) = downstream.flush() {
        shared.record_failure(&err, 0, policy);
    }
}

/// Bounded queue plus a dedicated writer thread.
///
/// ## Example
///
/// ```rust
/// use sluice_core::sink::AsyncSink;
///
/// let sink = AsyncSink::new(std::io::sink(), 16)?;
/// sink.write(b"hello\n")?;
/// sink.close()?;
/// assert!(sink.write(b"late\n").is_err());
/// # Ok::<(), sluice_core::error::SinkError>(())
/// ```
pub struct AsyncSink
{
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for AsyncSink
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        let state = self.shared.state.lock();
        f.debug_struct("AsyncSink")
            .field("capacity", &self.shared.capacity)
            .field("queued", &state.queue.len())
            .field("closed", &state.closed)
            .field("failures", &state.failures)
            .finish()
    }
}

impl AsyncSink
{
    /// Start a sink over `downstream` with room for `capacity` entries,
    /// reporting downstream failures with [`WriteFailurePolicy::Report`].
    ///
    /// ## Errors
    ///
    /// - [`SinkError::InvalidCapacity`] if `capacity` is zero
    /// - [`SinkError::Spawn`] if the writer thread cannot be started
    pub fn new<W>(downstream: W, capacity: usize) -> Result<Self, SinkError>
    where
        W: Write + Send + 'static,
    {
        Self::with_policy(downstream, capacity, WriteFailurePolicy::default())
    }

    /// Start a sink with an explicit downstream failure policy.
    ///
    /// ## Errors
    ///
    /// Same as [`AsyncSink::new`].
    pub fn with_policy<W>(downstream: W, capacity: usize, policy: WriteFailurePolicy) -> Result<Self, SinkError>
    where
        W: Write + Send + 'static,
    {
        if capacity == 0 {
            return Err(SinkError::InvalidCapacity(capacity));
        }

        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                queue: VecDeque::with_capacity(capacity),
                ..State::default()
            }),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            finished: Condvar::new(),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || run_writer(&worker_shared, downstream, policy))
            .map_err(SinkError::Spawn)?;

        tracing::debug!(capacity, ?policy, "async sink started");

        Ok(Self {
            shared,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Enqueue a copy of `buf`.
    ///
    /// Returns immediately if there is room, otherwise blocks until the
    /// writer frees a slot or the sink is closed.
    ///
    /// ## Errors
    ///
    /// [`SinkError::Closed`] if the sink was closed before `buf` could be
    /// enqueued.
    pub fn write(&self, buf: &[u8]) -> Result<usize, SinkError>
    {
        let entry = buf.to_vec();
        let mut state = self.shared.state.lock();
        loop {
            if state.closed {
                return Err(SinkError::Closed);
            }
            if state.queue.len() < self.shared.capacity {
                state.queue.push_back(entry);
                drop(state);
                self.shared.not_empty.notify_one();
                return Ok(buf.len());
            }
            self.shared.not_full.wait(&mut state);
        }
    }

    /// Stop accepting writes, then wait until every enqueued entry has been
    /// written and the writer thread has exited.
    ///
    /// Safe to call repeatedly or concurrently: every call waits for the same
    /// drain and returns the same outcome. May block indefinitely if the
    /// downstream stream blocks.
    ///
    /// ## Errors
    ///
    /// - [`SinkError::DownstreamWrite`] if any downstream write failed
    /// - [`SinkError::WorkerPanicked`] if the downstream stream panicked
    pub fn close(&self) -> Result<(), SinkError>
    {
        {
            let mut state = self.shared.state.lock();
            if !state.closed {
                state.closed = true;
                tracing::debug!(pending = state.queue.len(), "closing async sink");
            }
        }
        self.shared.not_empty.notify_all();
        self.shared.not_full.notify_all();

        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            // A panic is recorded by the writer's finish guard.
            let _ = handle.join();
        }

        let mut state = self.shared.state.lock();
        while !state.finished {
            self.shared.finished.wait(&mut state);
        }

        if state.worker_panicked {
            return Err(SinkError::WorkerPanicked);
        }
        match (state.failures, &state.last_failure) {
            (0, _) => Ok(()),
            (failures, last) => Err(SinkError::DownstreamWrite {
                failures,
                last: last.clone().unwrap_or_default(),
            }),
        }
    }

    /// Maximum number of queued entries.
    #[must_use]
    pub fn capacity(&self) -> usize
    {
        self.shared.capacity
    }

    /// Entries accepted but not yet handed to the writer.
    #[must_use]
    pub fn queued(&self) -> usize
    {
        self.shared.state.lock().queue.len()
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool
    {
        self.shared.state.lock().closed
    }
}

impl Sink for AsyncSink
{
    fn write(&self, buf: &[u8]) -> Result<usize, SinkError>
    {
        AsyncSink::write(self, buf)
    }

    fn close(&self) -> Result<(), SinkError>
    {
        AsyncSink::close(self)
    }
}

impl Drop for AsyncSink
{
    fn drop(&mut self)
    {
        if self.is_closed() {
            return;
        }
        if let Err(err) = self.close() {
            tracing::warn!(error = %err, "async sink dropped with errors");
        }
    }
}
