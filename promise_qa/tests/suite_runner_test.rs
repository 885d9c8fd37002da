use promise_qa::config::RunnerConfig;
use promise_qa::suite::report::{RunEvent, channel_reporter, logging_reporter, no_reporter};
use promise_qa::suite::{Suite, TestStatus};
use promise_qa::test_utils::{deferred, init_test_logging};
use promise_qa::{Adapter, Pending, Returned, RunnerFn};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

type Trace = Arc<Mutex<Vec<String>>>;

fn suite(timeout_ms: u64, bail: bool) -> (Suite, Adapter<Suite>) {
    let suite = Suite::new(RunnerConfig { timeout_ms, bail });
    let adapter = Adapter::new(suite.clone());
    (suite, adapter)
}

fn step(trace: &Trace, label: &'static str) -> impl Fn() -> Returned + Send + Sync + 'static {
    let trace = Arc::clone(trace);
    move || {
        trace.lock().unwrap().push(label.to_string());
        Returned::resolved()
    }
}

#[tokio::test]
async fn test_hooks_and_tests_run_in_order() {
    init_test_logging();
    let (suite, qa) = suite(500, false);
    let trace: Trace = Arc::default();

    qa.before(step(&trace, "before"));
    qa.before_each(step(&trace, "before_each"));
    qa.after_each(step(&trace, "after_each"));
    qa.after(step(&trace, "after"));
    qa.it("first", step(&trace, "first"));
    qa.it("second", step(&trace, "second"));

    let report = suite.run(logging_reporter("order".to_string()).as_ref()).await;

    assert!(report.is_success());
    assert_eq!(report.passed(), 2);
    assert_eq!(
        *trace.lock().unwrap(),
        vec![
            "before",
            "before_each",
            "first",
            "after_each",
            "before_each",
            "second",
            "after_each",
            "after",
        ]
    );
}

#[tokio::test]
async fn test_success_and_failure_modes_end_to_end() {
    let (suite, qa) = suite(500, false);

    qa.it("resolves", || {
        Returned::promise(async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            anyhow::Ok(())
        })
    });
    qa.it("rejects", || Returned::rejected(anyhow::anyhow!("x")));
    qa.catch_it("expects rejection", || Returned::rejected("raw reason"));
    qa.catch_it("unexpectedly resolves", Returned::resolved);
    qa.it("deferred", || {
        let (deferred, resolver) = deferred();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            resolver.resolve();
        });
        Returned::thenable(deferred)
    });
    qa.it_with_done("raw", |done| done.pass());

    let report = suite.run(no_reporter().as_ref()).await;

    assert_eq!(report.status_of("resolves"), Some(&TestStatus::Passed));
    assert_eq!(
        report.status_of("rejects"),
        Some(&TestStatus::Failed("x".to_string()))
    );
    assert_eq!(report.status_of("expects rejection"), Some(&TestStatus::Passed));
    assert_eq!(
        report.status_of("unexpectedly resolves"),
        Some(&TestStatus::Failed(
            "Test failed. Expected promise to be rejected.".to_string()
        ))
    );
    assert_eq!(report.status_of("deferred"), Some(&TestStatus::Passed));
    assert_eq!(report.status_of("raw"), Some(&TestStatus::Passed));
    assert_eq!(report.failed(), 2);
}

#[tokio::test]
async fn test_never_settling_promise_hits_runner_timeout() {
    let (suite, qa) = suite(50, false);
    qa.it("hangs", || Returned::promise(futures::future::pending::<anyhow::Result<()>>()));

    let report = suite.run(no_reporter().as_ref()).await;
    assert_eq!(report.status_of("hangs"), Some(&TestStatus::TimedOut));
}

#[tokio::test]
async fn test_failing_before_hook_skips_tests() {
    let (suite, qa) = suite(500, false);
    let trace: Trace = Arc::default();

    qa.before(|| Returned::rejected(anyhow::anyhow!("setup failed")));
    qa.after(step(&trace, "after"));
    qa.it("never runs", step(&trace, "test"));

    let report = suite.run(no_reporter().as_ref()).await;

    assert_eq!(report.status_of("never runs"), Some(&TestStatus::Skipped));
    assert_eq!(report.hook_failures.len(), 1);
    assert_eq!(report.hook_failures[0].error, "setup failed");
    assert!(!report.is_success());
    assert_eq!(*trace.lock().unwrap(), vec!["after"]);
}

#[tokio::test]
async fn test_failing_before_each_fails_the_test() {
    let (suite, qa) = suite(500, false);
    let trace: Trace = Arc::default();

    qa.before_each(|| Returned::rejected(anyhow::anyhow!("per-test setup failed")));
    qa.it("guarded", step(&trace, "test"));

    let report = suite.run(no_reporter().as_ref()).await;

    assert_eq!(
        report.status_of("guarded"),
        Some(&TestStatus::Failed(
            "\"before each\" hook failed: per-test setup failed".to_string()
        ))
    );
    assert!(trace.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_bail_stops_after_first_failure() {
    let (suite, qa) = suite(500, true);

    qa.it("fails", || Returned::rejected(anyhow::anyhow!("first")));
    qa.it("skipped", Returned::resolved);

    let report = suite.run(no_reporter().as_ref()).await;
    assert_eq!(report.failed(), 1);
    assert_eq!(report.status_of("skipped"), Some(&TestStatus::Skipped));
}

#[tokio::test]
async fn test_channel_reporter_streams_events_and_aborts() {
    let (suite, qa) = suite(500, false);
    let token = CancellationToken::new();
    let (reporter, mut events) = channel_reporter(token.clone());

    let cancel = token.clone();
    qa.it("cancels the run", move || {
        cancel.cancel();
        Returned::resolved()
    });
    qa.it("after cancellation", Returned::resolved);

    let report = suite.run(reporter.as_ref()).await;
    assert_eq!(report.passed(), 1);
    assert_eq!(report.skipped(), 1);

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert_eq!(received.first(), Some(&RunEvent::SuiteStarted { tests: 2 }));
    assert!(received.contains(&RunEvent::Skipped {
        title: "after cancellation".to_string()
    }));
    assert!(matches!(
        received.last(),
        Some(RunEvent::SuiteFinished {
            passed: 1,
            failed: 0,
            skipped: 1,
            ..
        })
    ));
}

#[tokio::test]
async fn test_panicking_done_bodies_fail_without_aborting_the_run() {
    init_test_logging();
    let (suite, qa) = suite(500, false);
    let trace: Trace = Arc::default();

    qa.it_with_done("raw panics", |_done| panic!("raw boom"));
    qa.forward_it(
        "continuation panics",
        RunnerFn::with_done(|_done| {
            Pending::new(async {
                if true {
                    panic!("async boom");
                }
            })
        }),
    );
    qa.it("still runs", step(&trace, "test"));
    qa.after(step(&trace, "after"));

    let report = suite.run(no_reporter().as_ref()).await;

    assert_eq!(
        report.status_of("raw panics"),
        Some(&TestStatus::Failed(
            "Test function panicked: raw boom".to_string()
        ))
    );
    assert_eq!(
        report.status_of("continuation panics"),
        Some(&TestStatus::Failed(
            "Test function panicked: async boom".to_string()
        ))
    );
    assert_eq!(report.status_of("still runs"), Some(&TestStatus::Passed));
    assert_eq!(report.failed(), 2);
    assert_eq!(*trace.lock().unwrap(), vec!["test", "after"]);
}
