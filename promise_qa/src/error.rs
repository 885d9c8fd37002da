//! # Errors and Rejection Reasons
//!
//! Every failure the adapter reports ends up as an `anyhow::Error` handed to a
//! [`crate::done::Done`]. User errors travel untouched; everything the adapter
//! itself produces is a [`BridgeError`].
//!
//! A promise-like value may reject with something that is not an error at all
//! (a string, plain data, nothing). [`Reason`] carries either shape and
//! [`normalize`] turns the raw ones into a descriptive [`BridgeError`] before
//! they reach the completion callback.

use serde_json::Value;
use std::any::Any;
use std::path::PathBuf;

/// Errors produced by the adapter itself.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Test failed. Expected promise to be resolved. Rejected with non-error reason: {reason}")]
    NonErrorRejection { reason: String },

    #[error("Test failed. Expected promise to be rejected.")]
    ExpectedRejection,

    #[error("Test function panicked: {message}")]
    Panicked { message: String },

    #[error("Completion callback was dropped without being called")]
    CompletionDropped,

    #[error("No adapter installed (call promise_qa::global::install first)")]
    NotInstalled,

    #[error("Failed to read adapter configuration '{path:?}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse adapter configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Why a promise-like value rejected, or what a test function threw.
#[derive(Debug)]
pub enum Reason {
    /// A well-formed error value.
    Error(anyhow::Error),
    /// A raw, non-error rejection value. `Value::Null` stands for "nothing".
    Value(Value),
}

impl Reason {
    pub fn error(err: impl Into<anyhow::Error>) -> Self {
        Reason::Error(err.into())
    }

    pub fn value(value: impl Into<Value>) -> Self {
        Reason::Value(value.into())
    }

    /// A rejection that carried no reason at all.
    pub fn undefined() -> Self {
        Reason::Value(Value::Null)
    }

    /// Converts a panic payload caught with `catch_unwind` into a reason.
    ///
    /// Panics count as thrown errors, so the result is always well-formed.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Reason::Error(panic_error(payload))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reason::Error(_))
    }
}

impl From<anyhow::Error> for Reason {
    fn from(err: anyhow::Error) -> Self {
        Reason::Error(err)
    }
}

impl From<BridgeError> for Reason {
    fn from(err: BridgeError) -> Self {
        Reason::Error(err.into())
    }
}

impl From<Value> for Reason {
    fn from(value: Value) -> Self {
        Reason::Value(value)
    }
}

impl From<String> for Reason {
    fn from(value: String) -> Self {
        Reason::Value(Value::String(value))
    }
}

impl From<&str> for Reason {
    fn from(value: &str) -> Self {
        Reason::Value(Value::String(value.to_string()))
    }
}

/// Converts a panic payload caught with `catch_unwind` into an error.
pub fn panic_error(payload: Box<dyn Any + Send>) -> anyhow::Error {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    };
    BridgeError::Panicked { message }.into()
}

/// Guarantees the failure handed to a completion callback is a proper error.
///
/// Well-formed errors pass through unchanged. Raw reasons are serialised to
/// JSON and wrapped in [`BridgeError::NonErrorRejection`].
pub fn normalize(reason: Reason) -> anyhow::Error {
    match reason {
        Reason::Error(err) => err,
        Reason::Value(value) => {
            tracing::debug!("Wrapping non-error rejection reason: {value}");
            BridgeError::NonErrorRejection {
                reason: value.to_string(),
            }
            .into()
        }
    }
}
