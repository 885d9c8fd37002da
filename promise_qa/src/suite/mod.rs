//! # Reference Runner
//!
//! [`Suite`] is a small in-process callback-style runner. It implements
//! [`Runner`], so an [`crate::Adapter`] can register into it, and runs what
//! was registered with mocha-like ordering:
//!
//! 1. `before` hooks, once;
//! 2. for every test: `before_each` hooks, the test, `after_each` hooks;
//! 3. `after` hooks, once.
//!
//! Each body gets a fresh [`Done`]. The runner drives the body's [`Pending`]
//! and waits for the completion callback under the configured timeout.
//!
//! A failing `before` hook skips every test. A failing `before_each` hook
//! fails the test with the hook's error, without running it. With `bail`, the
//! first failure skips what is left. A reporter asking to abort skips the
//! remaining tests too; `after` hooks still run in every case. A body that
//! panics fails like one that threw.
//!
//! [`Pending`]: crate::promise::Pending

pub mod report;

use crate::config::RunnerConfig;
use crate::done::Done;
use crate::error::{BridgeError, panic_error};
use crate::runner::{HookKind, Registration, Runner, RunnerFn};
use futures::FutureExt;
use report::{Reporter, RunEvent};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// Identifies one registration made into a [`Suite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(usize);

struct Entry {
    id: RegistrationId,
    title: String,
    body: RunnerFn,
}

#[derive(Default)]
struct Registry {
    tests: Vec<Entry>,
    hooks: Vec<(HookKind, Entry)>,
    next_id: usize,
}

/// Cheap to clone; clones share registrations.
#[derive(Clone)]
pub struct Suite {
    registry: Arc<Mutex<Registry>>,
    config: RunnerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestStatus {
    Passed,
    Failed(String),
    TimedOut,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct TestReport {
    pub title: String,
    pub status: TestStatus,
    pub duration: Duration,
}

/// A hook that failed or timed out.
#[derive(Debug, Clone)]
pub struct HookFailure {
    pub title: String,
    pub error: String,
}

#[derive(Debug, Clone, Default)]
pub struct SuiteReport {
    pub tests: Vec<TestReport>,
    pub hook_failures: Vec<HookFailure>,
    pub duration: Duration,
}

impl SuiteReport {
    pub fn passed(&self) -> usize {
        self.count(|status| matches!(status, TestStatus::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|status| matches!(status, TestStatus::Failed(_) | TestStatus::TimedOut))
    }

    pub fn skipped(&self) -> usize {
        self.count(|status| matches!(status, TestStatus::Skipped))
    }

    pub fn is_success(&self) -> bool {
        self.failed() == 0 && self.hook_failures.is_empty()
    }

    pub fn status_of(&self, title: &str) -> Option<&TestStatus> {
        self.tests
            .iter()
            .find(|test| test.title == title)
            .map(|test| &test.status)
    }

    fn count(&self, predicate: impl Fn(&TestStatus) -> bool) -> usize {
        self.tests
            .iter()
            .filter(|test| predicate(&test.status))
            .count()
    }
}

enum Failure {
    Error(String),
    TimedOut,
}

impl Failure {
    fn message(&self, timeout: Duration) -> String {
        match self {
            Failure::Error(message) => message.clone(),
            Failure::TimedOut => format!("timeout of {}ms exceeded", timeout.as_millis()),
        }
    }
}

/// Registrations snapshotted at the start of a run.
struct Plan {
    tests: Vec<(String, RunnerFn)>,
    hooks: Vec<(HookKind, String, RunnerFn)>,
}

impl Plan {
    fn hooks(&self, kind: HookKind) -> impl Iterator<Item = (&str, &RunnerFn)> {
        self.hooks
            .iter()
            .filter(move |(hook_kind, _, _)| *hook_kind == kind)
            .map(|(_, title, body)| (title.as_str(), body))
    }
}

impl Suite {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            registry: Arc::default(),
            config,
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn test_count(&self) -> usize {
        self.registry().tests.len()
    }

    pub fn hook_count(&self) -> usize {
        self.registry().hooks.len()
    }

    /// Registration order of tests, by title.
    pub fn test_titles(&self) -> Vec<String> {
        self.registry()
            .tests
            .iter()
            .map(|entry| entry.title.clone())
            .collect()
    }

    pub fn contains(&self, id: RegistrationId) -> bool {
        let registry = self.registry();
        registry.tests.iter().any(|entry| entry.id == id)
            || registry.hooks.iter().any(|(_, entry)| entry.id == id)
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn plan(&self) -> Plan {
        let registry = self.registry();
        Plan {
            tests: registry
                .tests
                .iter()
                .map(|entry| (entry.title.clone(), entry.body.clone()))
                .collect(),
            hooks: registry
                .hooks
                .iter()
                .map(|(kind, entry)| (*kind, entry.title.clone(), entry.body.clone()))
                .collect(),
        }
    }

    /// Runs every registered test and hook, reporting as it goes.
    pub async fn run(&self, reporter: &dyn Reporter) -> SuiteReport {
        let started = Instant::now();
        let plan = self.plan();
        let mut report = SuiteReport::default();
        debug!(
            tests = plan.tests.len(),
            hooks = plan.hooks.len(),
            timeout_ms = self.config.timeout_ms,
            bail = self.config.bail,
            "Starting suite run"
        );

        emit(
            reporter,
            RunEvent::SuiteStarted {
                tests: plan.tests.len(),
            },
        )
        .await;

        let before_ok = self
            .run_hooks(&plan, HookKind::Before, reporter, &mut report)
            .await
            .is_ok();
        if !before_ok {
            warn!("A \"before all\" hook failed; skipping every test");
        }

        let mut stop = !before_ok;
        for (title, body) in &plan.tests {
            if !stop && reporter.should_abort().await {
                debug!("Reporter requested abort");
                stop = true;
            }
            if stop {
                emit(
                    reporter,
                    RunEvent::Skipped {
                        title: title.clone(),
                    },
                )
                .await;
                report.tests.push(TestReport {
                    title: title.clone(),
                    status: TestStatus::Skipped,
                    duration: Duration::ZERO,
                });
                continue;
            }

            let test = self.run_test(&plan, title, body, reporter, &mut report).await;
            let failed = !matches!(test.status, TestStatus::Passed);
            report.tests.push(test);

            if self.config.bail && (failed || !report.hook_failures.is_empty()) {
                debug!("Bailing after first failure");
                stop = true;
            }
        }

        let _ = self
            .run_hooks(&plan, HookKind::After, reporter, &mut report)
            .await;

        report.duration = started.elapsed();
        emit(
            reporter,
            RunEvent::SuiteFinished {
                passed: report.passed(),
                failed: report.failed(),
                skipped: report.skipped(),
                duration_ms: millis(report.duration),
            },
        )
        .await;
        report
    }

    async fn run_test(
        &self,
        plan: &Plan,
        title: &str,
        body: &RunnerFn,
        reporter: &dyn Reporter,
        report: &mut SuiteReport,
    ) -> TestReport {
        let started = Instant::now();

        let status = match self
            .run_hooks(plan, HookKind::BeforeEach, reporter, report)
            .await
        {
            Ok(()) => match self.execute(body).await {
                Ok(()) => TestStatus::Passed,
                Err(Failure::TimedOut) => TestStatus::TimedOut,
                Err(Failure::Error(message)) => TestStatus::Failed(message),
            },
            Err(hook) => TestStatus::Failed(format!("{} failed: {}", hook.title, hook.error)),
        };

        let _ = self
            .run_hooks(plan, HookKind::AfterEach, reporter, report)
            .await;

        let duration = started.elapsed();
        let event = match &status {
            TestStatus::Passed => RunEvent::Passed {
                title: title.to_string(),
                duration_ms: millis(duration),
            },
            TestStatus::Failed(error) => RunEvent::Failed {
                title: title.to_string(),
                error: error.clone(),
                duration_ms: millis(duration),
            },
            TestStatus::TimedOut => RunEvent::TimedOut {
                title: title.to_string(),
                timeout_ms: self.config.timeout_ms,
            },
            TestStatus::Skipped => RunEvent::Skipped {
                title: title.to_string(),
            },
        };
        emit(reporter, event).await;

        TestReport {
            title: title.to_string(),
            status,
            duration,
        }
    }

    /// Runs every hook of `kind` in order, stopping at the first failure.
    async fn run_hooks(
        &self,
        plan: &Plan,
        kind: HookKind,
        reporter: &dyn Reporter,
        report: &mut SuiteReport,
    ) -> Result<(), HookFailure> {
        for (title, body) in plan.hooks(kind) {
            let started = Instant::now();
            match self.execute(body).await {
                Ok(()) => trace!("{title} passed"),
                Err(failure) => {
                    let error = failure.message(self.config.timeout());
                    let event = match failure {
                        Failure::TimedOut => RunEvent::TimedOut {
                            title: title.to_string(),
                            timeout_ms: self.config.timeout_ms,
                        },
                        Failure::Error(_) => RunEvent::Failed {
                            title: title.to_string(),
                            error: error.clone(),
                            duration_ms: millis(started.elapsed()),
                        },
                    };
                    emit(reporter, event).await;
                    let failure = HookFailure {
                        title: title.to_string(),
                        error,
                    };
                    report.hook_failures.push(failure.clone());
                    return Err(failure);
                }
            }
        }
        Ok(())
    }

    /// Invokes one body and waits for its completion callback.
    async fn execute(&self, body: &RunnerFn) -> Result<(), Failure> {
        let (done, rx) = Done::channel();
        let pending = body.invoke(done);
        let completion = async move {
            let driven = AssertUnwindSafe(pending.drive()).catch_unwind().await;
            (driven, rx.await)
        };

        // A signalled outcome wins over a later panic in the continuation.
        match timeout(self.config.timeout(), completion).await {
            Err(_elapsed) => Err(Failure::TimedOut),
            Ok((_, Ok(Ok(())))) => Ok(()),
            Ok((_, Ok(Err(err)))) => Err(Failure::Error(format!("{err:#}"))),
            Ok((Err(payload), Err(_dropped))) => {
                Err(Failure::Error(panic_error(payload).to_string()))
            }
            Ok((Ok(()), Err(_dropped))) => {
                Err(Failure::Error(BridgeError::CompletionDropped.to_string()))
            }
        }
    }
}

impl Runner for Suite {
    type Handle = RegistrationId;

    fn register(
        &self,
        registration: Registration,
        description: Option<String>,
        body: RunnerFn,
    ) -> RegistrationId {
        let mut registry = self.registry();
        let id = RegistrationId(registry.next_id);
        registry.next_id += 1;

        match registration {
            Registration::Test => {
                let title = description.unwrap_or_else(|| format!("test #{}", id.0));
                trace!("Registered test {title:?}");
                registry.tests.push(Entry { id, title, body });
            }
            Registration::Hook(kind) => {
                let title = match description {
                    Some(description) => format!("{}: {description}", kind.title()),
                    None => kind.title().to_string(),
                };
                trace!("Registered {title}");
                registry.hooks.push((kind, Entry { id, title, body }));
            }
        }
        id
    }
}

async fn emit(reporter: &dyn Reporter, event: RunEvent) {
    if let Err(err) = reporter.on_event(event).await {
        warn!("Dropping run event: {err}");
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promise::Pending;
    use crate::suite::report::no_reporter;
    use crate::utils::logging::init_test_logging;

    fn quick() -> RunnerConfig {
        RunnerConfig {
            timeout_ms: 100,
            bail: false,
        }
    }

    #[tokio::test]
    async fn test_runs_sync_and_done_bodies() {
        init_test_logging();
        let suite = Suite::new(quick());
        suite.register(
            Registration::Test,
            Some("sync".to_string()),
            RunnerFn::sync(|| Ok(())),
        );
        suite.register(
            Registration::Test,
            Some("done".to_string()),
            RunnerFn::with_done(|done| {
                done.fail(anyhow::anyhow!("nope"));
                Pending::none()
            }),
        );

        let report = suite.run(no_reporter().as_ref()).await;
        assert_eq!(report.status_of("sync"), Some(&TestStatus::Passed));
        assert_eq!(
            report.status_of("done"),
            Some(&TestStatus::Failed("nope".to_string()))
        );
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_unsignalled_done_is_reported() {
        let suite = Suite::new(quick());
        suite.register(
            Registration::Test,
            Some("dropped".to_string()),
            RunnerFn::with_done(|_done| Pending::none()),
        );

        let report = suite.run(no_reporter().as_ref()).await;
        assert_eq!(
            report.status_of("dropped"),
            Some(&TestStatus::Failed(
                "Completion callback was dropped without being called".to_string()
            ))
        );
    }

    #[tokio::test]
    async fn test_never_settling_body_times_out() {
        let suite = Suite::new(quick());
        suite.register(
            Registration::Test,
            Some("hangs".to_string()),
            RunnerFn::with_done(|done| {
                Pending::new(async move {
                    futures::future::pending::<()>().await;
                    done.pass();
                })
            }),
        );

        let report = suite.run(no_reporter().as_ref()).await;
        assert_eq!(report.status_of("hangs"), Some(&TestStatus::TimedOut));
        assert_eq!(report.failed(), 1);
    }

    #[test]
    fn test_registration_ids_are_unique() {
        let suite = Suite::new(RunnerConfig::default());
        let a = suite.register(Registration::Test, None, RunnerFn::sync(|| Ok(())));
        let b = suite.register(
            Registration::Hook(HookKind::Before),
            None,
            RunnerFn::sync(|| Ok(())),
        );
        assert_ne!(a, b);
        assert!(suite.contains(a) && suite.contains(b));
        assert_eq!(suite.test_titles(), vec!["test #0".to_string()]);
        assert_eq!(suite.hook_count(), 1);
    }
}
