//! # Collaborator Runner Interface
//!
//! The adapter does not run tests. It hands runner-compatible bodies to
//! whatever implements [`Runner`]: five registration slots (one test slot and
//! four lifecycle hooks), each taking an optional description and a
//! [`RunnerFn`]. Any `Fn(Registration, Option<String>, RunnerFn) -> H` closure
//! is a runner, which is how tests inject a single replacement function for
//! all five slots.

use crate::done::Done;
use crate::error::panic_error;
use crate::promise::Pending;
use promise_qa_common::SettleOnce;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// The four lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Before,
    After,
    BeforeEach,
    AfterEach,
}

impl HookKind {
    pub fn title(self) -> &'static str {
        match self {
            HookKind::Before => "\"before all\" hook",
            HookKind::After => "\"after all\" hook",
            HookKind::BeforeEach => "\"before each\" hook",
            HookKind::AfterEach => "\"after each\" hook",
        }
    }
}

/// The runner's five registration slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Registration {
    Test,
    Hook(HookKind),
}

/// The adapter's entry points; `CatchIt` registers into the test slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryPoint {
    It,
    CatchIt,
    Hook(HookKind),
}

impl EntryPoint {
    pub fn registration(self) -> Registration {
        match self {
            EntryPoint::It | EntryPoint::CatchIt => Registration::Test,
            EntryPoint::Hook(kind) => Registration::Hook(kind),
        }
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPoint::It => write!(f, "it"),
            EntryPoint::CatchIt => write!(f, "catch_it"),
            EntryPoint::Hook(HookKind::Before) => write!(f, "before"),
            EntryPoint::Hook(HookKind::After) => write!(f, "after"),
            EntryPoint::Hook(HookKind::BeforeEach) => write!(f, "before_each"),
            EntryPoint::Hook(HookKind::AfterEach) => write!(f, "after_each"),
        }
    }
}

type WithDoneBody = Arc<dyn Fn(Done) -> Pending + Send + Sync>;
type SyncBody = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// A body as the runner sees it.
///
/// Bodies may be invoked more than once (each-hooks run per test).
#[derive(Clone)]
pub enum RunnerFn {
    /// Declares the completion callback. The returned [`Pending`] must be
    /// driven for promise continuations to run.
    WithDone(WithDoneBody),
    /// Synchronous; completes when it returns.
    Sync(SyncBody),
}

impl RunnerFn {
    pub fn with_done(body: impl Fn(Done) -> Pending + Send + Sync + 'static) -> Self {
        RunnerFn::WithDone(Arc::new(body))
    }

    pub fn sync(body: impl Fn() -> anyhow::Result<()> + Send + Sync + 'static) -> Self {
        RunnerFn::Sync(Arc::new(body))
    }

    /// Whether the runner should supply a completion callback.
    pub fn wants_done(&self) -> bool {
        matches!(self, RunnerFn::WithDone(_))
    }

    /// Invokes the body the way a runner does.
    ///
    /// `WithDone` bodies receive `done`; synchronous bodies complete `done`
    /// with their return value. A panic while invoking either counts as a
    /// failure unless the body already signalled.
    pub fn invoke(&self, done: Done) -> Pending {
        match self {
            RunnerFn::WithDone(body) => {
                let slot = Arc::new(SettleOnce::new(done));
                let forwarded = {
                    let slot = Arc::clone(&slot);
                    Done::new(move |outcome| {
                        slot.settle_with(|done| done.complete(outcome));
                    })
                };
                match catch_unwind(AssertUnwindSafe(|| body(forwarded))) {
                    Ok(pending) => pending,
                    Err(payload) => {
                        slot.settle_with(|done| done.fail(panic_error(payload)));
                        Pending::none()
                    }
                }
            }
            RunnerFn::Sync(body) => {
                let outcome = catch_unwind(AssertUnwindSafe(|| body()))
                    .unwrap_or_else(|payload| Err(panic_error(payload)));
                done.complete(outcome);
                Pending::none()
            }
        }
    }
}

impl fmt::Debug for RunnerFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunnerFn::WithDone(_) => f.write_str("RunnerFn::WithDone"),
            RunnerFn::Sync(_) => f.write_str("RunnerFn::Sync"),
        }
    }
}

/// The registration surface of a callback-style test runner.
pub trait Runner {
    /// Whatever the runner hands back for a registration.
    type Handle;

    fn register(
        &self,
        registration: Registration,
        description: Option<String>,
        body: RunnerFn,
    ) -> Self::Handle;
}

impl<F, H> Runner for F
where
    F: Fn(Registration, Option<String>, RunnerFn) -> H,
{
    type Handle = H;

    fn register(
        &self,
        registration: Registration,
        description: Option<String>,
        body: RunnerFn,
    ) -> H {
        self(registration, description, body)
    }
}
