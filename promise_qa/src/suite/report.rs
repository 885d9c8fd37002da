//! Run events emitted by [`crate::suite::Suite::run`] and the reporters that
//! consume them.
//!
//! ## Key Components
//!
//! - [`RunEvent`]: what happened to a test or hook
//! - [`Reporter`]: async sink for events, also polled for cancellation
//! - [`ChannelReporter`], [`LoggingReporter`], [`NoOpReporter`]
//!
//! ```rust,no_run
//! use promise_qa::suite::report::{Reporter, RunEvent, logging_reporter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let reporter = logging_reporter("smoke".to_string());
//!     reporter
//!         .on_event(RunEvent::SuiteStarted { tests: 3 })
//!         .await
//!         .unwrap();
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One step of a suite run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum RunEvent {
    SuiteStarted {
        tests: usize,
    },
    Passed {
        title: String,
        duration_ms: u64,
    },
    Failed {
        title: String,
        error: String,
        duration_ms: u64,
    },
    /// The body never signalled its completion callback in time
    TimedOut {
        title: String,
        timeout_ms: u64,
    },
    /// Not run because a `before` hook failed or the run stopped early
    Skipped {
        title: String,
    },
    SuiteFinished {
        passed: usize,
        failed: usize,
        skipped: usize,
        duration_ms: u64,
    },
}

impl fmt::Display for RunEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunEvent::SuiteStarted { tests } => write!(f, "Running {tests} test(s)"),
            RunEvent::Passed { title, duration_ms } => {
                write!(f, "ok   {title} ({duration_ms}ms)")
            }
            RunEvent::Failed {
                title,
                error,
                duration_ms,
            } => write!(f, "FAIL {title} ({duration_ms}ms): {error}"),
            RunEvent::TimedOut { title, timeout_ms } => {
                write!(f, "FAIL {title}: timeout of {timeout_ms}ms exceeded")
            }
            RunEvent::Skipped { title } => write!(f, "skip {title}"),
            RunEvent::SuiteFinished {
                passed,
                failed,
                skipped,
                duration_ms,
            } => write!(
                f,
                "{passed} passing, {failed} failing, {skipped} skipped ({duration_ms}ms)"
            ),
        }
    }
}

/// Receives run events. Implementations may also ask the runner to stop.
#[async_trait]
pub trait Reporter: Send + Sync {
    async fn on_event(&self, event: RunEvent) -> Result<(), ReporterError>;

    /// Checked between tests; `true` stops the run.
    async fn should_abort(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    #[error("Reporter receiver disconnected")]
    Disconnected,
}

/// Forwards events into an unbounded channel.
pub struct ChannelReporter {
    sender: mpsc::UnboundedSender<RunEvent>,
    cancellation_token: CancellationToken,
}

impl ChannelReporter {
    pub fn new(sender: mpsc::UnboundedSender<RunEvent>, cancellation_token: CancellationToken) -> Self {
        Self {
            sender,
            cancellation_token,
        }
    }
}

#[async_trait]
impl Reporter for ChannelReporter {
    async fn on_event(&self, event: RunEvent) -> Result<(), ReporterError> {
        self.sender
            .send(event)
            .map_err(|_| ReporterError::Disconnected)
    }

    async fn should_abort(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }
}

pub struct NoOpReporter;

#[async_trait]
impl Reporter for NoOpReporter {
    async fn on_event(&self, _event: RunEvent) -> Result<(), ReporterError> {
        Ok(())
    }

    async fn should_abort(&self) -> bool {
        false
    }
}

/// Writes every event to the log, prefixed with the suite name.
pub struct LoggingReporter {
    suite_name: String,
}

impl LoggingReporter {
    pub fn new(suite_name: String) -> Self {
        Self { suite_name }
    }
}

#[async_trait]
impl Reporter for LoggingReporter {
    async fn on_event(&self, event: RunEvent) -> Result<(), ReporterError> {
        match &event {
            RunEvent::Failed { .. } | RunEvent::TimedOut { .. } => {
                tracing::warn!("{}: {event}", self.suite_name)
            }
            _ => tracing::info!("{}: {event}", self.suite_name),
        }
        Ok(())
    }

    async fn should_abort(&self) -> bool {
        false
    }
}

pub fn no_reporter() -> Box<dyn Reporter> {
    Box::new(NoOpReporter)
}

pub fn logging_reporter(suite_name: String) -> Box<dyn Reporter> {
    Box::new(LoggingReporter::new(suite_name))
}

/// A channel reporter plus the receiving end of its events.
pub fn channel_reporter(
    cancellation_token: CancellationToken,
) -> (Box<dyn Reporter>, mpsc::UnboundedReceiver<RunEvent>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let reporter = Box::new(ChannelReporter::new(sender, cancellation_token));
    (reporter, receiver)
}
