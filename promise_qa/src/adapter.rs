//! # Adapter Entry Points
//!
//! [`Adapter`] wraps a [`Runner`] and exposes the promise-aware registration
//! surface:
//!
//! - `it` / `catch_it` register a test bridged in success or failure mode;
//! - `before`, `after`, `before_each`, `after_each` register success-mode
//!   hooks;
//! - every entry point has a `_with_done` twin for callback-shaped functions,
//!   which are registered raw unless the [`BypassPolicy`] for that entry point
//!   says otherwise;
//! - `forward*` pass a [`RunnerFn`] straight through without any wrapping.
//!
//! The runner and the completion source are injected at construction, so
//! tests substitute both through [`Adapter::for_testing`] instead of mutating
//! shared state.
//!
//! [`BypassPolicy`]: crate::config::BypassPolicy

use crate::bridge::{self, Mode, TestFn};
use crate::config::AdapterConfig;
use crate::done::{Done, DoneSource, Outcome};
use crate::promise::{IntoReturned, Pending};
use crate::runner::{EntryPoint, HookKind, Runner, RunnerFn};
use std::sync::Arc;
use tracing::debug;

impl EntryPoint {
    pub fn mode(self) -> Mode {
        match self {
            EntryPoint::CatchIt => Mode::ExpectFailure,
            EntryPoint::It | EntryPoint::Hook(_) => Mode::ExpectSuccess,
        }
    }
}

pub struct Adapter<R> {
    runner: R,
    config: AdapterConfig,
    done_override: Option<DoneSource>,
}

/// Builder for [`Adapter`].
pub struct AdapterBuilder<R> {
    runner: R,
    config: AdapterConfig,
    done_override: Option<DoneSource>,
}

impl<R: Runner> AdapterBuilder<R> {
    pub fn config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `source` instead of the runner-supplied completion callback in
    /// every bridged body. Raw registrations are unaffected.
    pub fn done_override(self, source: impl Fn(Outcome) + Send + Sync + 'static) -> Self {
        self.done_source(Arc::new(source))
    }

    pub fn done_source(mut self, source: DoneSource) -> Self {
        self.done_override = Some(source);
        self
    }

    pub fn build(self) -> Adapter<R> {
        Adapter {
            runner: self.runner,
            config: self.config,
            done_override: self.done_override,
        }
    }
}

impl<R: Runner> Adapter<R> {
    pub fn new(runner: R) -> Self {
        Self::builder(runner).build()
    }

    pub fn builder(runner: R) -> AdapterBuilder<R> {
        AdapterBuilder {
            runner,
            config: AdapterConfig::default(),
            done_override: None,
        }
    }

    /// An adapter whose five registration slots all route to `fnc` and whose
    /// bridges report to `done` instead of the runner's callback.
    pub fn for_testing(fnc: R, done: DoneSource) -> Self {
        Self::builder(fnc).done_source(done).build()
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Registers `body` through `entry`, bridging it unless it is a
    /// callback-shaped function the bypass policy lets through raw.
    pub fn register(
        &self,
        entry: EntryPoint,
        description: Option<String>,
        body: TestFn,
    ) -> R::Handle {
        let mode = entry.mode();
        let source = self.done_override.clone();

        let runner_fn = match body {
            TestFn::Callback(body) if self.config.bypass.applies_to(entry) => {
                debug!("Registering callback-shaped {entry} body raw");
                RunnerFn::with_done(move |done| {
                    body(done);
                    Pending::none()
                })
            }
            TestFn::Callback(body) => {
                debug!("Registering callback-shaped {entry} body in {mode:?} mode");
                RunnerFn::with_done(move |done| {
                    bridge::bridge_callback(mode, body.as_ref(), completion(&source, done))
                })
            }
            TestFn::Promise(body) => {
                debug!("Registering promise-shaped {entry} body in {mode:?} mode");
                RunnerFn::with_done(move |done| {
                    bridge::bridge(mode, body.as_ref(), completion(&source, done))
                })
            }
        };

        self.runner
            .register(entry.registration(), description, runner_fn)
    }

    /// Registers a function described by its textual signature; its shape
    /// comes from the configured completion-parameter names.
    pub fn register_declared<F, T>(
        &self,
        entry: EntryPoint,
        description: Option<String>,
        signature: &str,
        body: F,
    ) -> R::Handle
    where
        F: Fn(Option<Done>) -> T + Send + Sync + 'static,
        T: IntoReturned,
    {
        let body = TestFn::from_signature(signature, &self.config.completion_param_names, body);
        self.register(entry, description, body)
    }

    /// Success-mode test: passes when the returned promise fulfils.
    pub fn it<F, T>(&self, description: impl Into<String>, body: F) -> R::Handle
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: IntoReturned,
    {
        self.register(
            EntryPoint::It,
            Some(description.into()),
            TestFn::promise(body),
        )
    }

    pub fn it_with_done<F>(&self, description: impl Into<String>, body: F) -> R::Handle
    where
        F: Fn(Done) + Send + Sync + 'static,
    {
        self.register(
            EntryPoint::It,
            Some(description.into()),
            TestFn::callback(body),
        )
    }

    /// Failure-mode test: passes only when the returned promise rejects.
    pub fn catch_it<F, T>(&self, description: impl Into<String>, body: F) -> R::Handle
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: IntoReturned,
    {
        self.register(
            EntryPoint::CatchIt,
            Some(description.into()),
            TestFn::promise(body),
        )
    }

    pub fn catch_it_with_done<F>(&self, description: impl Into<String>, body: F) -> R::Handle
    where
        F: Fn(Done) + Send + Sync + 'static,
    {
        self.register(
            EntryPoint::CatchIt,
            Some(description.into()),
            TestFn::callback(body),
        )
    }

    pub fn hook(&self, kind: HookKind, description: Option<String>, body: TestFn) -> R::Handle {
        self.register(EntryPoint::Hook(kind), description, body)
    }

    pub fn before<F, T>(&self, body: F) -> R::Handle
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: IntoReturned,
    {
        self.hook(HookKind::Before, None, TestFn::promise(body))
    }

    pub fn after<F, T>(&self, body: F) -> R::Handle
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: IntoReturned,
    {
        self.hook(HookKind::After, None, TestFn::promise(body))
    }

    pub fn before_each<F, T>(&self, body: F) -> R::Handle
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: IntoReturned,
    {
        self.hook(HookKind::BeforeEach, None, TestFn::promise(body))
    }

    pub fn after_each<F, T>(&self, body: F) -> R::Handle
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: IntoReturned,
    {
        self.hook(HookKind::AfterEach, None, TestFn::promise(body))
    }

    pub fn before_with_done<F>(&self, body: F) -> R::Handle
    where
        F: Fn(Done) + Send + Sync + 'static,
    {
        self.hook(HookKind::Before, None, TestFn::callback(body))
    }

    pub fn after_with_done<F>(&self, body: F) -> R::Handle
    where
        F: Fn(Done) + Send + Sync + 'static,
    {
        self.hook(HookKind::After, None, TestFn::callback(body))
    }

    pub fn before_each_with_done<F>(&self, body: F) -> R::Handle
    where
        F: Fn(Done) + Send + Sync + 'static,
    {
        self.hook(HookKind::BeforeEach, None, TestFn::callback(body))
    }

    pub fn after_each_with_done<F>(&self, body: F) -> R::Handle
    where
        F: Fn(Done) + Send + Sync + 'static,
    {
        self.hook(HookKind::AfterEach, None, TestFn::callback(body))
    }

    /// Hands `body` to the runner untouched.
    pub fn forward(
        &self,
        entry: EntryPoint,
        description: Option<String>,
        body: RunnerFn,
    ) -> R::Handle {
        self.runner
            .register(entry.registration(), description, body)
    }

    pub fn forward_it(&self, description: impl Into<String>, body: RunnerFn) -> R::Handle {
        self.forward(EntryPoint::It, Some(description.into()), body)
    }

    pub fn forward_before(&self, description: Option<String>, body: RunnerFn) -> R::Handle {
        self.forward(EntryPoint::Hook(HookKind::Before), description, body)
    }

    pub fn forward_after(&self, description: Option<String>, body: RunnerFn) -> R::Handle {
        self.forward(EntryPoint::Hook(HookKind::After), description, body)
    }

    pub fn forward_before_each(&self, description: Option<String>, body: RunnerFn) -> R::Handle {
        self.forward(EntryPoint::Hook(HookKind::BeforeEach), description, body)
    }

    pub fn forward_after_each(&self, description: Option<String>, body: RunnerFn) -> R::Handle {
        self.forward(EntryPoint::Hook(HookKind::AfterEach), description, body)
    }
}

// The override wins; the runner's own callback is then never signalled.
fn completion(source: &Option<DoneSource>, supplied: Done) -> Done {
    match source {
        Some(source) => {
            drop(supplied);
            Done::from_source(source)
        }
        None => supplied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::Registration;
    use std::sync::Mutex;

    type Recorded = Arc<Mutex<Vec<(Registration, Option<String>)>>>;

    fn recording() -> (
        impl Fn(Registration, Option<String>, RunnerFn) + Send + Sync,
        Recorded,
    ) {
        let seen: Recorded = Arc::default();
        let sink = seen.clone();
        let runner = move |registration: Registration, description: Option<String>, _body: RunnerFn| {
            sink.lock().unwrap().push((registration, description));
        };
        (runner, seen)
    }

    #[test]
    fn test_entry_modes() {
        assert_eq!(EntryPoint::It.mode(), Mode::ExpectSuccess);
        assert_eq!(EntryPoint::CatchIt.mode(), Mode::ExpectFailure);
        assert_eq!(
            EntryPoint::Hook(HookKind::BeforeEach).mode(),
            Mode::ExpectSuccess
        );
    }

    #[test]
    fn test_all_entry_points_reach_the_runner_slot() {
        let (runner, seen) = recording();
        let adapter = Adapter::new(runner);

        adapter.it("resolves", || ());
        adapter.catch_it("rejects", || ());
        adapter.before(|| ());
        adapter.after(|| ());
        adapter.before_each(|| ());
        adapter.after_each(|| ());

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (Registration::Test, Some("resolves".to_string())),
                (Registration::Test, Some("rejects".to_string())),
                (Registration::Hook(HookKind::Before), None),
                (Registration::Hook(HookKind::After), None),
                (Registration::Hook(HookKind::BeforeEach), None),
                (Registration::Hook(HookKind::AfterEach), None),
            ]
        );
    }

    #[tokio::test]
    async fn test_override_replaces_runner_done() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let invoke = |_: Registration, _: Option<String>, body: RunnerFn| {
            let (done, runner_rx) = Done::channel();
            (body.invoke(done), runner_rx)
        };
        let adapter = Adapter::for_testing(
            invoke,
            Arc::new(move |outcome: Outcome| {
                let _ = tx.send(outcome.is_ok());
            }),
        );

        let (pending, runner_rx) = adapter.it("resolves", || ());
        pending.drive().await;

        assert_eq!(rx.recv().await, Some(true));
        assert!(runner_rx.await.is_err(), "runner done must stay untouched");
    }
}
