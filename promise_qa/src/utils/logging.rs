//! # Logging Initialization
//!
//! One entry point, [`init_logging`], sets up the `tracing` subscriber for a
//! process that embeds the adapter. It is guarded by a `std::sync::Once`, so
//! repeated calls (from several test files, say) are harmless.
//!
//! - The filter comes from `RUST_LOG` when set, otherwise from the requested
//!   level with `promise_qa=debug` added.
//! - With `log_to_file`, logs go to a daily rolling file in the user cache
//!   directory (resolved with `directories`), without ANSI colors.
//! - Otherwise, or when the cache directory is unavailable, logs go to stderr
//!   with colors.

use crate::config::AdapterConfig;
use anyhow::Result;
use directories::ProjectDirs;
use std::{io::stderr, sync::Once};
use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

static INIT: Once = Once::new();

const LOG_FILE_NAME: &str = "promise_qa.log";

pub fn init_test_logging() {
    init_logging("trace", false).expect("Failed to initialize test logging");
}

/// Initializes logging from an [`AdapterConfig`].
pub fn init_logging_from_config(config: &AdapterConfig) -> Result<()> {
    init_logging(&config.log_level, config.log_to_file)
}

/// Installs the global tracing subscriber.
///
/// Only the first call has any effect.
pub fn init_logging(log_level: &str, log_to_file: bool) -> Result<()> {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},promise_qa=debug")));

        let log_dir = log_to_file
            .then(|| ProjectDirs::from("com", "PromiseQa", "promise_qa"))
            .flatten()
            .map(|dirs| dirs.cache_dir().to_path_buf())
            .filter(|dir| std::fs::create_dir_all(dir).is_ok());

        // tracing_appender panics when the file cannot be opened
        let appender = log_dir.and_then(|dir| {
            std::panic::catch_unwind(|| tracing_appender::rolling::daily(&dir, LOG_FILE_NAME))
                .ok()
        });

        // try_init: a host process may already own the global subscriber.
        match appender {
            Some(appender) => {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer().with_writer(non_blocking).with_ansi(false))
                    .try_init();
                // Leaked so buffered lines are flushed at exit.
                Box::leak(Box::new(guard));
            }
            None => {
                let _ = tracing_subscriber::registry()
                    .with(env_filter)
                    .with(layer().with_writer(stderr).with_ansi(true))
                    .try_init();
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_test_logging();
        assert!(init_logging("debug", true).is_ok());
        tracing::info!("logging initialised twice without panicking");
    }
}
