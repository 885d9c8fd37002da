#![allow(dead_code)]

use promise_qa::done::DoneSource;
use promise_qa::test_utils::{ImmediateRunner, immediate_runner, init_test_logging};
use promise_qa::{Adapter, Done, Outcome, Returned};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;

pub type Qa = Adapter<ImmediateRunner>;

/// Builds an adapter whose bridges report to `source(done)`, lets `register`
/// use it, and returns what `done` received.
pub async fn outcome_of<F>(source: fn(Done) -> DoneSource, register: F) -> Outcome
where
    F: FnOnce(&Qa) -> JoinHandle<Option<Outcome>>,
{
    init_test_logging();
    let (done, rx) = Done::channel();
    let qa = Adapter::for_testing(immediate_runner(), source(done));

    let runner_done = register(&qa).await.expect("runner task panicked");
    assert!(
        runner_done.is_none(),
        "the overriding source must replace the runner's completion callback"
    );

    timeout(Duration::from_secs(1), rx)
        .await
        .expect("completion callback was never signalled")
        .expect("completion callback was dropped")
}

/// A future-backed promise that settles from another task.
pub fn later(settlement: anyhow::Result<()>) -> Returned {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        let _ = tx.send(settlement);
    });
    Returned::promise(async move {
        rx.await
            .unwrap_or_else(|_| Err(anyhow::anyhow!("deferred was dropped")))
    })
}

/// A then-only deferred that settles from another task.
pub fn later_thenable(settlement: anyhow::Result<()>) -> Returned {
    let (deferred, resolver) = promise_qa::test_utils::deferred();
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        match settlement {
            Ok(()) => resolver.resolve(),
            Err(err) => resolver.reject(err),
        }
    });
    Returned::thenable(deferred)
}

/// A then-only deferred settled before it is returned.
pub fn settled_thenable(settlement: anyhow::Result<()>) -> Returned {
    let (deferred, resolver) = promise_qa::test_utils::deferred();
    match settlement {
        Ok(()) => resolver.resolve(),
        Err(err) => resolver.reject(err),
    }
    Returned::thenable(deferred)
}

pub fn fail() -> anyhow::Error {
    anyhow::anyhow!("Fail")
}
