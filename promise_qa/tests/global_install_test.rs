use promise_qa::config::RunnerConfig;
use promise_qa::global;
use promise_qa::suite::{Suite, TestStatus, report::no_reporter};
use promise_qa::test_utils::init_test_logging;
use promise_qa::{Adapter, BridgeError, Returned};
use serial_test::serial;

fn fresh_suite() -> Suite {
    init_test_logging();
    global::uninstall();
    let suite = Suite::new(RunnerConfig::default());
    global::install(Adapter::new(suite.clone()));
    suite
}

#[test]
#[serial]
fn test_entry_points_require_explicit_install() {
    global::uninstall();
    assert!(!global::is_installed());

    assert!(matches!(
        global::it("too early", || ()),
        Err(BridgeError::NotInstalled)
    ));
    assert!(matches!(
        global::catch_it("too early", || ()),
        Err(BridgeError::NotInstalled)
    ));
    assert!(matches!(
        global::before_each(|| ()),
        Err(BridgeError::NotInstalled)
    ));
}

#[tokio::test]
#[serial]
async fn test_installed_adapter_receives_every_entry_point() {
    let suite = fresh_suite();
    assert!(global::is_installed());

    global::before(|| ()).unwrap();
    global::before_each(Returned::resolved).unwrap();
    global::after_each(Returned::resolved).unwrap();
    global::after(|| ()).unwrap();
    global::it("resolves", Returned::resolved).unwrap();
    global::catch_it("rejects", || Returned::rejected(anyhow::anyhow!("expected"))).unwrap();

    assert_eq!(suite.test_count(), 2);
    assert_eq!(suite.hook_count(), 4);

    let report = suite.run(no_reporter().as_ref()).await;
    assert!(report.is_success());
    assert_eq!(report.status_of("rejects"), Some(&TestStatus::Passed));

    assert!(global::uninstall());
}

#[test]
#[serial]
fn test_install_replaces_and_uninstall_clears() {
    let first = fresh_suite();
    let second = fresh_suite();

    global::it("lands in the second suite", || ()).unwrap();
    assert_eq!(first.test_count(), 0);
    assert_eq!(second.test_count(), 1);

    assert!(global::uninstall());
    assert!(!global::uninstall());
    assert!(matches!(
        global::after(|| ()),
        Err(BridgeError::NotInstalled)
    ));
}
