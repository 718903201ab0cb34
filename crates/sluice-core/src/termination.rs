//! What happens after a `panic` or `fatal` event has been reported.
//!
//! Reporting and terminating are separate steps: the logger first enqueues
//! the event, then hands control to its [`Termination`] policy. Tests swap
//! in [`ReportOnly`] to assert on the event without unwinding or exiting.

/// Termination step for `panic` and `fatal` events.
pub trait Termination: Send + Sync
{
    /// Called after a `panic` event has been enqueued.
    fn panic(&self, message: &str);

    /// Called after a `fatal` event has been enqueued and the sink drained.
    fn fatal(&self, message: &str);
}

/// Default policy: unwind on `panic`, exit with status 1 on `fatal`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Terminate;

impl Termination for Terminate
{
    /// ## Panics
    ///
    /// Always, with `message` as the payload.
    fn panic(&self, message: &str)
    {
        panic!("{message}");
    }

    fn fatal(&self, _message: &str)
    {
        std::process::exit(1);
    }
}

/// Policy that only reports; control returns to the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOnly;

impl Termination for ReportOnly
{
    fn panic(&self, _message: &str) {}

    fn fatal(&self, _message: &str) {}
}
