//! # Process-Wide Entry Points
//!
//! Opt-in convenience for code that cannot thread an [`Adapter`] through:
//! [`install`] puts one adapter in a process-wide slot and the free functions
//! here ([`it`], [`catch_it`], [`before`], [`after`], [`before_each`],
//! [`after_each`]) register through it. Nothing happens implicitly; without an
//! installed adapter every entry point returns [`BridgeError::NotInstalled`].
//!
//! The slot is shared by the whole process and meant for one user at a time:
//! install, register, uninstall. Concurrent test files installing different
//! adapters will see each other's adapter.
//!
//! Runner handles are discarded, so install an adapter over a runner whose
//! registrations are self-contained (such as [`crate::suite::Suite`]).

use crate::adapter::Adapter;
use crate::bridge::TestFn;
use crate::error::BridgeError;
use crate::promise::IntoReturned;
use crate::runner::{EntryPoint, HookKind, Runner};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

trait Installed: Send + Sync {
    fn register(&self, entry: EntryPoint, description: Option<String>, body: TestFn);
}

impl<R> Installed for Adapter<R>
where
    R: Runner + Send + Sync,
{
    fn register(&self, entry: EntryPoint, description: Option<String>, body: TestFn) {
        let _handle = Adapter::register(self, entry, description, body);
    }
}

static GLOBAL: RwLock<Option<Arc<dyn Installed>>> = RwLock::new(None);

/// Installs `adapter` as the process-wide adapter, replacing any previous one.
pub fn install<R>(adapter: Adapter<R>)
where
    R: Runner + Send + Sync + 'static,
{
    let mut slot = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        warn!("Replacing an already installed global adapter");
    }
    *slot = Some(Arc::new(adapter));
    debug!("Global adapter installed");
}

/// Removes the installed adapter; returns whether there was one.
pub fn uninstall() -> bool {
    let removed = GLOBAL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .is_some();
    if removed {
        debug!("Global adapter uninstalled");
    }
    removed
}

pub fn is_installed() -> bool {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

fn register(
    entry: EntryPoint,
    description: Option<String>,
    body: TestFn,
) -> Result<(), BridgeError> {
    // Clone out of the lock so runner code never runs under it.
    let installed = GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
        .ok_or(BridgeError::NotInstalled)?;
    installed.register(entry, description, body);
    Ok(())
}

pub fn it<F, T>(description: impl Into<String>, body: F) -> Result<(), BridgeError>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: IntoReturned,
{
    register(
        EntryPoint::It,
        Some(description.into()),
        TestFn::promise(body),
    )
}

pub fn catch_it<F, T>(description: impl Into<String>, body: F) -> Result<(), BridgeError>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: IntoReturned,
{
    register(
        EntryPoint::CatchIt,
        Some(description.into()),
        TestFn::promise(body),
    )
}

pub fn before<F, T>(body: F) -> Result<(), BridgeError>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: IntoReturned,
{
    register(EntryPoint::Hook(HookKind::Before), None, TestFn::promise(body))
}

pub fn after<F, T>(body: F) -> Result<(), BridgeError>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: IntoReturned,
{
    register(EntryPoint::Hook(HookKind::After), None, TestFn::promise(body))
}

pub fn before_each<F, T>(body: F) -> Result<(), BridgeError>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: IntoReturned,
{
    register(
        EntryPoint::Hook(HookKind::BeforeEach),
        None,
        TestFn::promise(body),
    )
}

pub fn after_each<F, T>(body: F) -> Result<(), BridgeError>
where
    F: Fn() -> T + Send + Sync + 'static,
    T: IntoReturned,
{
    register(
        EntryPoint::Hook(HookKind::AfterEach),
        None,
        TestFn::promise(body),
    )
}
