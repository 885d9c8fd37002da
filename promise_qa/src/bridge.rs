//! # Completion Bridges
//!
//! The decision logic between a test function and a callback-style runner.
//!
//! [`bridge`] invokes a promise-shaped function and maps its result onto a
//! [`Done`]:
//!
//! | Result                          | [`Mode::ExpectSuccess`] | [`Mode::ExpectFailure`]        |
//! |---------------------------------|-------------------------|--------------------------------|
//! | synchronous throw / panic       | `fail(normalized)`      | `pass()`                       |
//! | promise fulfils                 | `pass()`                | `fail(ExpectedRejection)`      |
//! | promise rejects                 | `fail(normalized)`      | `pass()`                       |
//! | nothing promise-like returned   | `pass()`                | `fail(ExpectedRejection)`      |
//!
//! [`bridge_callback`] does the same for a callback-shaped function that was
//! not registered raw, by handing it a `Done` that reports through the mode.
//!
//! Exactly one completion per invocation holds for every branch: the
//! then-only path shares the `Done` through a [`SettleOnce`] and ignores any
//! settlement after the first.

use crate::done::Done;
use crate::error::{BridgeError, Reason, normalize};
use crate::promise::{IntoReturned, Pending, Returned};
use crate::shape::Shape;
use futures::FutureExt;
use promise_qa_common::SettleOnce;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// How settlement maps onto completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Resolution passes, rejection fails.
    ExpectSuccess,
    /// Rejection passes, resolution fails.
    ExpectFailure,
}

impl Mode {
    fn fulfilled(self, done: Done) {
        match self {
            Mode::ExpectSuccess => done.pass(),
            Mode::ExpectFailure => done.fail(BridgeError::ExpectedRejection),
        }
    }

    fn rejected(self, done: Done, reason: Reason) {
        match self {
            Mode::ExpectSuccess => done.fail(normalize(reason)),
            Mode::ExpectFailure => {
                trace!("Discarding rejection reason: {reason:?}");
                done.pass();
            }
        }
    }
}

type PromiseBody = Arc<dyn Fn() -> Result<Returned, Reason> + Send + Sync>;
type CallbackBody = Arc<dyn Fn(Done) + Send + Sync>;

/// A user-supplied test or hook body.
#[derive(Clone)]
pub enum TestFn {
    /// Takes the completion callback and signals it itself.
    Callback(CallbackBody),
    /// Returns a promise-like value, nothing, or a synchronous error.
    Promise(PromiseBody),
}

impl TestFn {
    pub fn promise<F, T>(body: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: IntoReturned,
    {
        TestFn::Promise(Arc::new(move || body().into_returned()))
    }

    pub fn callback<F>(body: F) -> Self
    where
        F: Fn(Done) + Send + Sync + 'static,
    {
        TestFn::Callback(Arc::new(body))
    }

    /// Builds a body from a function described by its textual signature.
    ///
    /// If the signature declares one of `names`, the body receives
    /// `Some(done)` and owns completion; anything it returns is ignored apart
    /// from being logged when it is an error. Otherwise it receives `None` and
    /// its return value is bridged.
    pub fn from_signature<F, T, S>(signature: &str, names: &[S], body: F) -> Self
    where
        F: Fn(Option<Done>) -> T + Send + Sync + 'static,
        T: IntoReturned,
        S: AsRef<str>,
    {
        match Shape::from_signature(signature, names) {
            Shape::Callback => TestFn::callback(move |done| {
                if let Err(reason) = body(Some(done)).into_returned() {
                    warn!("Callback-shaped function returned an error it should have passed to done: {reason:?}");
                }
            }),
            Shape::Promise => TestFn::promise(move || body(None)),
        }
    }

    pub fn shape(&self) -> Shape {
        match self {
            TestFn::Callback(_) => Shape::Callback,
            TestFn::Promise(_) => Shape::Promise,
        }
    }
}

impl fmt::Debug for TestFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TestFn").field(&self.shape()).finish()
    }
}

/// Invokes a promise-shaped body and routes its settlement to `done`.
///
/// The returned [`Pending`] carries the continuation of a
/// [`Returned::Promise`] and must be driven by the runner.
pub fn bridge(
    mode: Mode,
    body: &(dyn Fn() -> Result<Returned, Reason> + Send + Sync),
    done: Done,
) -> Pending {
    let invoked = catch_unwind(AssertUnwindSafe(body))
        .unwrap_or_else(|payload| Err(Reason::from_panic(payload)));

    match invoked {
        Err(reason) => {
            debug!(?mode, "Test function threw synchronously");
            mode.rejected(done, reason);
            Pending::none()
        }
        Ok(Returned::Settled) => {
            trace!(?mode, "Test function returned nothing promise-like");
            mode.fulfilled(done);
            Pending::none()
        }
        Ok(Returned::Promise(future)) => Pending::new(async move {
            let settled = AssertUnwindSafe(future)
                .catch_unwind()
                .await
                .unwrap_or_else(|payload| Err(Reason::from_panic(payload)));
            match settled {
                Ok(()) => mode.fulfilled(done),
                Err(reason) => mode.rejected(done, reason),
            }
        }),
        Ok(Returned::Thenable(thenable)) => {
            let slot = Arc::new(SettleOnce::new(done));
            let on_fulfilled = {
                let slot = Arc::clone(&slot);
                Box::new(move || {
                    if !slot.settle_with(|done| mode.fulfilled(done)) {
                        warn!("Thenable fulfilled after it had already settled; ignoring");
                    }
                })
            };
            let on_rejected = {
                let slot = Arc::clone(&slot);
                Box::new(move |reason: Reason| {
                    if !slot.settle_with(|done| mode.rejected(done, reason)) {
                        warn!("Thenable rejected after it had already settled; ignoring");
                    }
                })
            };

            if let Err(payload) =
                catch_unwind(AssertUnwindSafe(|| thenable.then(on_fulfilled, on_rejected)))
            {
                slot.settle_with(|done| mode.rejected(done, Reason::from_panic(payload)));
            }
            Pending::none()
        }
    }
}

/// Invokes a callback-shaped body that was not registered raw.
///
/// The body gets its own `Done`; what it signals is routed through `mode`. A
/// panic before it signals counts as a synchronous throw.
pub fn bridge_callback(mode: Mode, body: &(dyn Fn(Done) + Send + Sync), done: Done) -> Pending {
    let slot = Arc::new(SettleOnce::new(done));
    let forwarded = {
        let slot = Arc::clone(&slot);
        Done::new(move |outcome| {
            slot.settle_with(|done| match outcome {
                Ok(()) => mode.fulfilled(done),
                Err(err) => mode.rejected(done, Reason::Error(err)),
            });
        })
    };

    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| body(forwarded))) {
        slot.settle_with(|done| mode.rejected(done, Reason::from_panic(payload)));
    }
    Pending::none()
}
