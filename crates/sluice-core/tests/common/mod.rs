//! Downstream writers shared by the integration tests.

#![allow(dead_code)]

use std::io::{self, Write};
use std::process::{Command, Output};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::span;

/// Set in a re-executed test binary to select the behavior under test.
pub const CHILD_ENV: &str = "SLUICE_TEST_CHILD";

/// Whether this process was started by [`run_child`] with `role`.
pub fn is_child(role: &str) -> bool
{
    std::env::var(CHILD_ENV).is_ok_and(|value| value == role)
}

/// Re-run exactly `test` from the current test binary with [`CHILD_ENV`] set
/// to `role`, capturing its output.
pub fn run_child(test: &str, role: &str) -> Output
{
    Command::new(std::env::current_exe().unwrap())
        .args([test, "--exact", "--nocapture", "--test-threads=1"])
        .env(CHILD_ENV, role)
        .output()
        .unwrap()
}

/// JSON events in a child's stdout. The test harness may prefix the first
/// event with its own progress text, so each line is cut at the first `{`.
pub fn child_events(output: &Output) -> Vec<serde_json::Value>
{
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| line.find("{\"level\"").map(|start| &line[start..]))
        .map(|json| serde_json::from_str(json).unwrap())
        .collect()
}

/// Diagnostics subscriber that only remembers the level of each event.
#[derive(Debug, Clone, Default)]
pub struct EventCounter
{
    levels: Arc<Mutex<Vec<tracing::Level>>>,
}

impl EventCounter
{
    pub fn count(&self, level: tracing::Level) -> usize
    {
        self.levels.lock().iter().filter(|l| **l == level).count()
    }
}

impl tracing::Subscriber for EventCounter
{
    fn enabled(&self, _metadata: &tracing::Metadata<'_>) -> bool
    {
        true
    }

    fn new_span(&self, _span: &span::Attributes<'_>) -> span::Id
    {
        span::Id::from_u64(1)
    }

    fn record(&self, _span: &span::Id, _values: &span::Record<'_>) {}

    fn record_follows_from(&self, _span: &span::Id, _follows: &span::Id) {}

    fn event(&self, event: &tracing::Event<'_>)
    {
        self.levels.lock().push(*event.metadata().level());
    }

    fn enter(&self, _span: &span::Id) {}

    fn exit(&self, _span: &span::Id) {}
}

/// Cloneable in-memory writer; every clone appends to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer
{
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer
{
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn contents(&self) -> String
    {
        String::from_utf8_lossy(&self.bytes.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String>
    {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>
    {
        self.bytes.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()>
    {
        Ok(())
    }
}

/// Records every downstream write call as a separate entry.
#[derive(Debug, Clone, Default)]
pub struct RecordingWriter
{
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    delay: Option<Duration>,
}

impl RecordingWriter
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Sleep for `delay` inside every write.
    pub fn slow(delay: Duration) -> Self
    {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn writes(&self) -> Vec<Vec<u8>>
    {
        self.writes.lock().clone()
    }
}

impl Write for RecordingWriter
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>
    {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        self.writes.lock().push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()>
    {
        Ok(())
    }
}

/// Writer that announces each write on `entered` and then waits for a
/// release on the gate. Dropping the gate sender releases every write.
#[derive(Debug)]
pub struct GatedWriter
{
    entered: mpsc::Sender<()>,
    gate: mpsc::Receiver<()>,
    inner: RecordingWriter,
}

/// Handles for driving a [`GatedWriter`] from the test thread.
pub struct Gate
{
    pub entered: mpsc::Receiver<()>,
    pub release: mpsc::Sender<()>,
    pub records: RecordingWriter,
}

impl GatedWriter
{
    pub fn new() -> (Self, Gate)
    {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let records = RecordingWriter::new();
        let writer = Self {
            entered: entered_tx,
            gate: release_rx,
            inner: records.clone(),
        };
        let gate = Gate {
            entered: entered_rx,
            release: release_tx,
            records,
        };
        (writer, gate)
    }
}

impl Write for GatedWriter
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>
    {
        let _ = self.entered.send(());
        let _ = self.gate.recv();
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()>
    {
        Ok(())
    }
}

/// Writer whose every write fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingWriter;

impl Write for FailingWriter
{
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize>
    {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "downstream gone"))
    }

    fn flush(&mut self) -> io::Result<()>
    {
        Ok(())
    }
}
