//! Test helper utilities for `promise_qa`.
//!
//! Runners, completion sources and a then-only deferred for exercising the
//! adapter without a real test runner. These APIs are intended for test-only
//! code paths.

use crate::done::{Done, DoneSource, Outcome};
use crate::error::Reason;
use crate::promise::{OnFulfilled, OnRejected, Thenable};
use crate::runner::{Registration, Runner, RunnerFn};
use promise_qa_common::SettleOnce;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use crate::utils::logging::init_test_logging;

/// A completion source that passes `sink` when it receives success and fails
/// it with the received error otherwise.
pub fn resolve_on_done(sink: Done) -> DoneSource {
    let sink = SettleOnce::new(sink);
    Arc::new(move |outcome: Outcome| {
        sink.settle_with(|sink| sink.complete(outcome));
    })
}

/// A completion source that passes `sink` only when it receives an error.
pub fn resolve_on_error(sink: Done) -> DoneSource {
    let sink = SettleOnce::new(sink);
    Arc::new(move |outcome: Outcome| {
        sink.settle_with(|sink| match outcome {
            Err(_) => sink.pass(),
            Ok(()) => sink.fail(anyhow::anyhow!(
                "Expected the completion callback to receive an error"
            )),
        });
    })
}

/// A completion source that records every outcome it receives.
pub fn outcome_channel() -> (DoneSource, mpsc::UnboundedReceiver<Outcome>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let source: DoneSource = Arc::new(move |outcome: Outcome| {
        let _ = tx.send(outcome);
    });
    (source, rx)
}

/// A runner that invokes each registered body right away.
///
/// The body's `Pending` is driven on a spawned tokio task; the handle yields
/// what the runner-supplied `Done` received, or `None` if it was dropped
/// unsignalled (as happens when the adapter uses an overriding source).
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateRunner;

pub fn immediate_runner() -> ImmediateRunner {
    ImmediateRunner
}

impl Runner for ImmediateRunner {
    type Handle = JoinHandle<Option<Outcome>>;

    fn register(
        &self,
        _registration: Registration,
        _description: Option<String>,
        body: RunnerFn,
    ) -> Self::Handle {
        let (done, rx) = Done::channel();
        let pending = body.invoke(done);
        tokio::spawn(async move {
            pending.drive().await;
            rx.await.ok()
        })
    }
}

/// One registration captured by a [`RecordingRunner`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub registration: Registration,
    pub description: Option<String>,
    pub body: RunnerFn,
}

/// A runner that keeps every registration for later inspection.
#[derive(Debug, Default, Clone)]
pub struct RecordingRunner {
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.recorded()
            .into_iter()
            .map(|recorded| recorded.registration)
            .collect()
    }
}

impl Runner for RecordingRunner {
    type Handle = usize;

    fn register(
        &self,
        registration: Registration,
        description: Option<String>,
        body: RunnerFn,
    ) -> usize {
        let mut recorded = self
            .recorded
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        recorded.push(Recorded {
            registration,
            description,
            body,
        });
        recorded.len() - 1
    }
}

#[derive(Default)]
struct DeferredState {
    continuations: Option<(OnFulfilled, OnRejected)>,
    settlement: Option<Result<(), Reason>>,
}

/// A then-only promise in the style of deferred libraries.
///
/// The matching [`Resolver`] settles it, before or after `then` is called.
pub struct Deferred {
    state: Arc<Mutex<DeferredState>>,
}

/// Settles a [`Deferred`]. Dropping it unsettled leaves the deferred pending.
pub struct Resolver {
    state: Arc<Mutex<DeferredState>>,
}

pub fn deferred() -> (Deferred, Resolver) {
    let state = Arc::new(Mutex::new(DeferredState::default()));
    (
        Deferred {
            state: Arc::clone(&state),
        },
        Resolver { state },
    )
}

impl Resolver {
    pub fn resolve(self) {
        self.settle(Ok(()));
    }

    pub fn reject(self, reason: impl Into<Reason>) {
        self.settle(Err(reason.into()));
    }

    fn settle(self, settlement: Result<(), Reason>) {
        let continuations = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match state.continuations.take() {
                Some(continuations) => continuations,
                None => {
                    state.settlement = Some(settlement);
                    return;
                }
            }
        };
        run(continuations, settlement);
    }
}

impl Thenable for Deferred {
    fn then(self: Box<Self>, on_fulfilled: OnFulfilled, on_rejected: OnRejected) {
        let settlement = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match state.settlement.take() {
                Some(settlement) => settlement,
                None => {
                    state.continuations = Some((on_fulfilled, on_rejected));
                    return;
                }
            }
        };
        run((on_fulfilled, on_rejected), settlement);
    }
}

fn run((on_fulfilled, on_rejected): (OnFulfilled, OnRejected), settlement: Result<(), Reason>) {
    match settlement {
        Ok(()) => on_fulfilled(),
        Err(reason) => on_rejected(reason),
    }
}
