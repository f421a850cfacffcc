//! Tracing subscriber setup.
//!
//! The interactive client owns the terminal, so diagnostics only go somewhere
//! when a log file is named. Headless runs write warnings to stderr.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "RECIPECAST_LOG";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget<'a> {
    /// No subscriber; events are discarded.
    Disabled,
    /// Append to a file, filtered by `RECIPECAST_LOG` (default `info`).
    File(&'a Path),
    /// Write to stderr, filtered by `RECIPECAST_LOG` (default `warn`).
    Stderr,
}

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install the global subscriber for the chosen target. Calling this more
/// than once keeps the first subscriber.
pub fn init_tracing(target: LogTarget<'_>) -> Result<(), Box<dyn std::error::Error>> {
    match target {
        LogTarget::Disabled => Ok(()),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| format!("Failed to open log file {}: {e}", path.display()))?;
            let _ = tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_ansi(false)
                        .with_target(false)
                        .with_writer(Mutex::new(file)),
                )
                .with(env_filter("info"))
                .try_init();
            Ok(())
        }
        LogTarget::Stderr => {
            let _ = tracing_subscriber::registry()
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .with(env_filter("warn"))
                .try_init();
            Ok(())
        }
    }
}
