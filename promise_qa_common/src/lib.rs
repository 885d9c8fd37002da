//! Shared primitives for the `promise_qa` workspace.

pub mod settle_once;

pub use settle_once::SettleOnce;
