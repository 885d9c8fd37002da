//! # Promise QA
//!
//! A completion adapter that lets promise-returning test functions run under
//! a callback-style test runner, one where every test or hook receives a
//! `done` callback and signals completion by calling it.
//!
//! ## Core Behaviour
//!
//! - **Success mode** (`it`, `before`, `after`, `before_each`, `after_each`):
//!   a fulfilled promise passes, a rejected one fails with its reason.
//! - **Failure mode** (`catch_it`): a rejected promise passes, a fulfilled one
//!   fails with "Test failed. Expected promise to be rejected."
//! - **Raw registration**: functions that take the completion callback
//!   themselves (`*_with_done`) go to the runner untouched, unless the
//!   configured bypass policy says otherwise.
//! - **Error normalisation**: rejections carrying plain data instead of an
//!   error are wrapped in a descriptive error before reaching the runner.
//! - **Exactly once**: every invocation completes its callback at most once,
//!   and exactly once whenever the promise settles.
//!
//! ## Example
//!
//! ```rust,no_run
//! use promise_qa::{Adapter, Returned};
//! use promise_qa::config::RunnerConfig;
//! use promise_qa::suite::{Suite, report::no_reporter};
//!
//! #[tokio::main]
//! async fn main() {
//!     let suite = Suite::new(RunnerConfig::default());
//!     let adapter = Adapter::new(suite.clone());
//!
//!     adapter.it("resolves", || Returned::promise(async { anyhow::Ok(()) }));
//!     adapter.catch_it("rejects", || Returned::rejected(anyhow::anyhow!("boom")));
//!
//!     let report = suite.run(no_reporter().as_ref()).await;
//!     assert!(report.is_success());
//! }
//! ```
//!
//! ## Modules
//!
//! - **`adapter`**: the entry points and their builder.
//! - **`bridge`**: success and failure mode decision logic.
//! - **`promise`**: the promise-like capability model (`Returned`, `Thenable`).
//! - **`shape`**: completion-parameter detection from textual signatures.
//! - **`runner`**: the collaborator runner interface.
//! - **`suite`**: a reference in-process runner with reporters.
//! - **`global`**: opt-in process-wide entry points.

pub mod adapter;
pub mod bridge;
pub mod config;
pub mod done;
pub mod error;
pub mod global;
pub mod promise;
pub mod runner;
pub mod shape;
pub mod suite;
pub mod utils;

// Test utilities
pub mod test_utils;

pub use adapter::{Adapter, AdapterBuilder};
pub use bridge::{Mode, TestFn};
pub use config::AdapterConfig;
pub use done::{Done, Outcome};
pub use error::{BridgeError, Reason};
pub use promise::{IntoReturned, Pending, Returned, Thenable};
pub use runner::{EntryPoint, HookKind, Registration, Runner, RunnerFn};
