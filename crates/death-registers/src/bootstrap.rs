use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI log-level name to a `tracing` filter directive.
///
/// Unrecognised names fall back to `"info"`.
pub fn filter_directive(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "WARNING" | "WARN" => "warn",
        "ERROR" => "error",
        _ => "info",
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr, or are appended to `log_file` when one is given.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }

    Ok(())
}

/// Open `path` for appending, creating it and any missing parent directories.
pub fn open_log_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_filter_directive_mapping() {
        assert_eq!(filter_directive("DEBUG"), "debug");
        assert_eq!(filter_directive("INFO"), "info");
        assert_eq!(filter_directive("WARNING"), "warn");
        assert_eq!(filter_directive("error"), "error");
        assert_eq!(filter_directive("VERBOSE"), "info");
    }

    #[test]
    fn test_open_log_file_creates_parents() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("logs").join("run.log");

        let mut file = open_log_file(&path).expect("open log file");
        writeln!(file, "first").unwrap();
        drop(file);

        assert!(path.is_file(), "log file must exist");
    }

    #[test]
    fn test_open_log_file_appends() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("run.log");

        for line in ["one", "two"] {
            let mut file = open_log_file(&path).expect("open log file");
            writeln!(file, "{line}").unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "one\ntwo\n");
    }
}
