//! # Promise-Like Values
//!
//! A test function may hand back one of three things, resolved here by tagged
//! dispatch instead of runtime probing:
//!
//! - [`Returned::Promise`]: a value with both a *then* and a *catch*
//!   capability. In Rust this is a future resolving to `Result<(), Reason>`;
//!   the `Ok` arm is the then-continuation, the `Err` arm the catch.
//! - [`Returned::Thenable`]: a deferred-style value exposing a single
//!   [`Thenable::then`] that takes both continuations at once.
//! - [`Returned::Settled`]: nothing promise-like; the call already completed.
//!
//! Anything a test function returns goes through [`IntoReturned`], which also
//! turns a synchronous `Err` into a thrown [`Reason`].

use crate::error::Reason;
use futures::future::{self, BoxFuture, FutureExt, TryFutureExt};
use std::fmt;
use std::future::Future;

/// Continuation run when a thenable fulfils.
pub type OnFulfilled = Box<dyn FnOnce() + Send>;

/// Continuation run when a thenable rejects.
pub type OnRejected = Box<dyn FnOnce(Reason) + Send>;

/// The *then* capability of deferred-style promise libraries.
///
/// Implementors must call at most one of the two continuations, at most once,
/// either synchronously from `then` or later from whatever drives them. The
/// adapter tolerates misbehaving implementations but only honours the first
/// settlement.
pub trait Thenable: Send {
    fn then(self: Box<Self>, on_fulfilled: OnFulfilled, on_rejected: OnRejected);
}

/// Which capabilities a returned value exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ThenAndCatch,
    ThenOnly,
    None,
}

/// The result of invoking a promise-shaped test function.
pub enum Returned {
    Promise(BoxFuture<'static, Result<(), Reason>>),
    Thenable(Box<dyn Thenable>),
    Settled,
}

impl Returned {
    /// Wraps any future resolving to `Result<(), E>`.
    pub fn promise<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<Reason> + 'static,
    {
        Returned::Promise(future.map_err(Into::<Reason>::into).boxed())
    }

    pub fn thenable(thenable: impl Thenable + 'static) -> Self {
        Returned::Thenable(Box::new(thenable))
    }

    /// An already fulfilled promise.
    pub fn resolved() -> Self {
        Returned::Promise(future::ready(Ok(())).boxed())
    }

    /// An already rejected promise.
    pub fn rejected(reason: impl Into<Reason>) -> Self {
        Returned::Promise(future::ready(Err(reason.into())).boxed())
    }

    pub fn capability(&self) -> Capability {
        match self {
            Returned::Promise(_) => Capability::ThenAndCatch,
            Returned::Thenable(_) => Capability::ThenOnly,
            Returned::Settled => Capability::None,
        }
    }
}

impl fmt::Debug for Returned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Returned").field(&self.capability()).finish()
    }
}

/// Conversion from whatever a test function returns.
///
/// `Err` stands for a synchronous throw.
pub trait IntoReturned {
    fn into_returned(self) -> Result<Returned, Reason>;
}

impl IntoReturned for () {
    fn into_returned(self) -> Result<Returned, Reason> {
        Ok(Returned::Settled)
    }
}

impl IntoReturned for Returned {
    fn into_returned(self) -> Result<Returned, Reason> {
        Ok(self)
    }
}

impl<E: Into<Reason>> IntoReturned for Result<(), E> {
    fn into_returned(self) -> Result<Returned, Reason> {
        self.map(|()| Returned::Settled).map_err(Into::into)
    }
}

impl<E: Into<Reason>> IntoReturned for Result<Returned, E> {
    fn into_returned(self) -> Result<Returned, Reason> {
        self.map_err(Into::into)
    }
}

impl<E: Into<Reason> + 'static> IntoReturned for BoxFuture<'static, Result<(), E>> {
    fn into_returned(self) -> Result<Returned, Reason> {
        Ok(Returned::promise(self))
    }
}

impl IntoReturned for Box<dyn Thenable> {
    fn into_returned(self) -> Result<Returned, Reason> {
        Ok(Returned::Thenable(self))
    }
}

/// Work a bridged body hands back to the runner.
///
/// The adapter never spawns; when a test returns a future the runner must
/// drive this so the then/catch continuations get a chance to run.
#[must_use = "a Pending must be driven for promise continuations to run"]
pub struct Pending(Option<BoxFuture<'static, ()>>);

impl Pending {
    pub fn none() -> Self {
        Pending(None)
    }

    pub fn new(future: impl Future<Output = ()> + Send + 'static) -> Self {
        Pending(Some(future.boxed()))
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Runs the pending continuation, if any, to completion.
    pub async fn drive(self) {
        if let Some(future) = self.0 {
            future.await;
        }
    }
}

impl fmt::Debug for Pending {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pending")
            .field(&if self.0.is_some() { "future" } else { "none" })
            .finish()
    }
}
