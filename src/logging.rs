//! Tracing setup for the admin CLI.
//!
//! Output goes to stderr, where it interleaves with command output written to
//! stdout, or to a per-run file under `Config::logs_path` when
//! `logging.to_file` is set. `RUST_LOG` replaces the computed filter entirely.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// HTTP internals that drown out request-level events at debug level
const QUIET_CRATES: &[&str] = &["hyper=warn", "hyper_util=warn", "reqwest=warn", "rustls=warn"];

/// Keeps the file writer alive; drop it only after the last log line
pub struct LoggingHandle {
    _guard: Option<WorkerGuard>,
    /// Set when logging to a file
    pub log_file_path: Option<PathBuf>,
}

#[derive(Debug, PartialEq)]
enum LogTarget {
    Stderr,
    File { dir: PathBuf, name: String },
}

impl LogTarget {
    fn from_config(config: &Config) -> Self {
        if config.logging.to_file {
            LogTarget::File {
                dir: config.logs_path(),
                name: log_file_name(),
            }
        } else {
            LogTarget::Stderr
        }
    }
}

fn effective_level(config: &Config, debug_override: bool) -> String {
    if debug_override {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    }
}

fn filter_directives(level: &str) -> String {
    std::iter::once(level)
        .chain(QUIET_CRATES.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

fn log_file_name() -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    format!("enmedd-admin-{timestamp}.log")
}

/// Install the global subscriber. Call once, before the session starts.
pub fn init_logging(config: &Config, debug_override: bool) -> Result<LoggingHandle> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(filter_directives(&effective_level(config, debug_override)))
    });

    let (writer, guard, log_file_path) = match LogTarget::from_config(config) {
        LogTarget::Stderr => (BoxMakeWriter::new(std::io::stderr), None, None),
        LogTarget::File { dir, name } => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let path = dir.join(&name);
            let (non_blocking, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(&dir, &name));
            (BoxMakeWriter::new(non_blocking), Some(guard), Some(path))
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(log_file_path.is_none())
                .with_writer(writer),
        )
        .init();

    Ok(LoggingHandle {
        _guard: guard,
        log_file_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_target_uses_configured_dir() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = Config::default();
        config.logging.to_file = true;
        config.logging.dir = Some(temp_dir.path().to_string_lossy().to_string());

        let LogTarget::File { dir, name } = LogTarget::from_config(&config) else {
            panic!("expected a file target");
        };
        assert_eq!(dir, temp_dir.path());
        assert!(name.starts_with("enmedd-admin-"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_stderr_by_default() {
        assert_eq!(LogTarget::from_config(&Config::default()), LogTarget::Stderr);
    }

    #[test]
    fn test_debug_flag_beats_config_level() {
        let mut config = Config::default();
        config.logging.level = "warn".to_string();

        assert_eq!(effective_level(&config, false), "warn");
        assert_eq!(effective_level(&config, true), "debug");
    }

    #[test]
    fn test_filter_quiets_http_internals() {
        let directives = filter_directives("debug");
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("hyper=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
