//! Tracing setup for coordcraft.
//!
//! Every event carries a subsystem target (`app`, `controller`, `api`,
//! `scene`, `stash`, `parser`). `RUST_LOG` overrides the defaults below:
//! warnings only, plus `info` for the controller, api and stash targets
//! while file logging is on.
//!
//! `COORDCRAFT_LOG=1` adds the file log, `coordcraft.log` in the log
//! directory. Keep the returned `LogGuard` alive until exit so buffered
//! lines are flushed.

use std::path::PathBuf;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "COORDCRAFT_LOG";
pub const LOG_FILE: &str = "coordcraft.log";

/// Subsystems whose state transitions are worth keeping in the file log.
const VERBOSE_TARGETS: &[&str] = &["controller", "api", "stash"];

pub struct LogGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(file_logging: bool) -> String {
    if !file_logging {
        return "warn".to_string();
    }
    let mut directives = vec!["warn".to_string()];
    directives.extend(VERBOSE_TARGETS.iter().map(|t| format!("{t}=info")));
    directives.join(",")
}

fn filter(file_logging: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(file_logging)))
}

/// Install the global subscriber. Call once from `main`.
pub fn init(log_dir: Option<PathBuf>) -> LogGuard {
    let file_logging = std::env::var(LOG_ENV).as_deref() == Ok("1");
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    if !file_logging {
        tracing_subscriber::registry()
            .with(filter(false))
            .with(stderr_layer)
            .init();
        return LogGuard { _file_guard: None };
    }

    let dir = log_dir.unwrap_or_else(|| std::env::temp_dir().join("coordcraft"));
    let dir_error = std::fs::create_dir_all(&dir).err();
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, LOG_FILE));

    tracing_subscriber::registry()
        .with(filter(true))
        .with(stderr_layer)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();

    if let Some(e) = dir_error {
        tracing::warn!(target: "app", dir = %dir.display(), "Log directory unavailable: {}", e);
    }
    tracing::info!(target: "app", file = %dir.join(LOG_FILE).display(), "File logging enabled");

    LogGuard {
        _file_guard: Some(guard),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stderr_only_defaults_to_warnings() {
        assert_eq!(default_directives(false), "warn");
    }

    #[test]
    fn file_logging_raises_subsystem_targets() {
        let directives = default_directives(true);
        assert_eq!(directives, "warn,controller=info,api=info,stash=info");
        for target in VERBOSE_TARGETS {
            assert!(EnvFilter::try_new(format!("{target}=info")).is_ok());
        }
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
