//! Progress reporting and cooperative cancellation.
//!
//! Events go to a [`Monitor`]; cancellation comes from an [`enough::Stop`]
//! token polled once per processed row. Tokens belong to the caller and are
//! never reset here, so a token that is already stopped aborts every later
//! call after its first row.

use enough::Stop;
use tracing::{debug, trace};

use crate::error::Error;

/// Receives lifecycle events of one read or write call.
///
/// Every method has a no-op default, and `()` ignores everything.
pub trait Monitor {
    fn started(&mut self) {}

    /// Percentage of rows done, non-decreasing within one call.
    fn progress(&mut self, _percent: f32) {}

    fn completed(&mut self) {}

    fn aborted(&mut self) {}

    fn failed(&mut self, _error: &Error) {}
}

impl Monitor for () {}

impl<M: Monitor + ?Sized> Monitor for &mut M {
    fn started(&mut self) {
        (**self).started()
    }

    fn progress(&mut self, percent: f32) {
        (**self).progress(percent)
    }

    fn completed(&mut self) {
        (**self).completed()
    }

    fn aborted(&mut self) {
        (**self).aborted()
    }

    fn failed(&mut self, error: &Error) {
        (**self).failed(error)
    }
}

/// How a call that returned `Ok` ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    /// All rows were processed.
    Completed,
    /// Cancellation was requested; the result holds whatever was done.
    Aborted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Started,
    Progressing,
    Completed,
    Aborted,
    Failed,
}

/// One call's walk through `Started → Progressing* → Completed | Aborted |
/// Failed`, forwarding each step to the monitor.
pub(crate) struct Session<'m, M: Monitor + ?Sized> {
    monitor: &'m mut M,
    stop: &'m dyn Stop,
    state: State,
    operation: &'static str,
}

impl<'m, M: Monitor + ?Sized> Session<'m, M> {
    pub(crate) fn start(monitor: &'m mut M, stop: &'m dyn Stop, operation: &'static str) -> Self {
        debug!(operation, "started");
        monitor.started();
        Self {
            monitor,
            stop,
            state: State::Started,
            operation,
        }
    }

    pub(crate) fn progress(&mut self, percent: f32) {
        debug_assert!(matches!(self.state, State::Started | State::Progressing));
        trace!(operation = self.operation, percent, "progress");
        self.state = State::Progressing;
        self.monitor.progress(percent);
    }

    pub(crate) fn abort_requested(&self) -> bool {
        match self.stop.check() {
            Ok(()) => false,
            Err(reason) => {
                debug!(operation = self.operation, ?reason, "stop requested");
                true
            }
        }
    }

    pub(crate) fn complete(mut self) -> Completion {
        debug_assert!(matches!(self.state, State::Started | State::Progressing));
        debug!(operation = self.operation, "completed");
        self.state = State::Completed;
        self.monitor.completed();
        Completion::Completed
    }

    pub(crate) fn abort(mut self) -> Completion {
        debug_assert_eq!(self.state, State::Progressing);
        debug!(operation = self.operation, "aborted");
        self.state = State::Aborted;
        self.monitor.aborted();
        Completion::Aborted
    }

    pub(crate) fn fail(mut self, error: Error) -> Error {
        debug!(operation = self.operation, %error, "failed");
        self.state = State::Failed;
        self.monitor.failed(&error);
        error
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use enough::{StopReason, Unstoppable};

    use super::*;

    /// Records every event as a short string.
    #[derive(Default)]
    pub(crate) struct Recorder {
        pub(crate) events: Vec<String>,
    }

    impl Monitor for Recorder {
        fn started(&mut self) {
            self.events.push("started".into());
        }

        fn progress(&mut self, percent: f32) {
            self.events.push(format!("progress {percent}"));
        }

        fn completed(&mut self) {
            self.events.push("completed".into());
        }

        fn aborted(&mut self) {
            self.events.push("aborted".into());
        }

        fn failed(&mut self, _error: &Error) {
            self.events.push("failed".into());
        }
    }

    /// Stops on the `rows`-th poll, i.e. after `rows` processed rows.
    pub(crate) struct StopAfter {
        rows: usize,
        polls: AtomicUsize,
    }

    impl StopAfter {
        pub(crate) fn new(rows: usize) -> Self {
            Self {
                rows,
                polls: AtomicUsize::new(0),
            }
        }
    }

    impl Stop for StopAfter {
        fn check(&self) -> Result<(), StopReason> {
            if self.polls.fetch_add(1, Ordering::Relaxed) + 1 >= self.rows {
                Err(StopReason::Cancelled)
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn completed_session() {
        let mut rec = Recorder::default();
        let mut s = Session::start(&mut rec, &Unstoppable, "test");
        s.progress(0.0);
        s.progress(50.0);
        assert!(!s.abort_requested());
        assert_eq!(s.complete(), Completion::Completed);
        assert_eq!(rec.events, ["started", "progress 0", "progress 50", "completed"]);
    }

    #[test]
    fn aborted_session() {
        let mut rec = Recorder::default();
        let stop = StopAfter::new(2);
        let mut s = Session::start(&mut rec, &stop, "test");
        s.progress(0.0);
        assert!(!s.abort_requested());
        s.progress(50.0);
        assert!(s.abort_requested());
        assert_eq!(s.abort(), Completion::Aborted);
        assert_eq!(rec.events, ["started", "progress 0", "progress 50", "aborted"]);
    }

    #[test]
    fn failed_session_returns_error() {
        let mut rec = Recorder::default();
        let s = Session::start(&mut rec, &Unstoppable, "test");
        let e = s.fail(Error::invalid("nope"));
        assert!(matches!(e, Error::InvalidArgument(_)));
        assert_eq!(rec.events, ["started", "failed"]);
    }

    #[test]
    fn stopped_token_is_not_reset() {
        let stop = StopAfter::new(0);
        let mut rec = Recorder::default();
        let first = Session::start(&mut rec, &stop, "test");
        assert!(first.abort_requested());
        first.complete();
        let second = Session::start(&mut rec, &stop, "test");
        assert!(second.abort_requested());
        second.complete();
    }
}
