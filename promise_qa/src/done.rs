//! The completion callback a runner hands to a test body.
//!
//! [`Done`] is consumed by every signalling method, so a single owner cannot
//! complete a test twice. Continuations that need to share one `Done` go
//! through [`promise_qa_common::SettleOnce`].

use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

/// What a completion callback receives: success, or one error.
pub type Outcome = Result<(), anyhow::Error>;

/// A reusable completion source, used to override the runner-supplied
/// callback (see [`crate::adapter::AdapterBuilder::done_override`]).
pub type DoneSource = Arc<dyn Fn(Outcome) + Send + Sync>;

type Signal = Box<dyn FnOnce(Outcome) + Send>;

/// Completion callback: call [`Done::pass`] or [`Done::fail`] exactly once.
pub struct Done {
    signal: Option<Signal>,
}

impl Done {
    pub fn new(signal: impl FnOnce(Outcome) + Send + 'static) -> Self {
        Self {
            signal: Some(Box::new(signal)),
        }
    }

    /// A `Done` that reports into a oneshot channel.
    ///
    /// If the `Done` is dropped unsignalled the receiver sees a `RecvError`.
    pub fn channel() -> (Self, oneshot::Receiver<Outcome>) {
        let (tx, rx) = oneshot::channel();
        let done = Self::new(move |outcome| {
            // Receiver gone means nobody is waiting for the result anymore.
            let _ = tx.send(outcome);
        });
        (done, rx)
    }

    /// A `Done` that forwards into a shared completion source.
    pub fn from_source(source: &DoneSource) -> Self {
        let source = Arc::clone(source);
        Self::new(move |outcome| source(outcome))
    }

    /// Signal success.
    pub fn pass(self) {
        self.complete(Ok(()));
    }

    /// Signal failure with `err`.
    pub fn fail(self, err: impl Into<anyhow::Error>) {
        self.complete(Err(err.into()));
    }

    pub fn complete(mut self, outcome: Outcome) {
        if let Some(signal) = self.signal.take() {
            signal(outcome);
        }
    }
}

impl Drop for Done {
    fn drop(&mut self) {
        if self.signal.is_some() {
            tracing::debug!("Completion callback dropped without being signalled");
        }
    }
}

impl fmt::Debug for Done {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Done")
            .field("signalled", &self.signal.is_none())
            .finish()
    }
}
