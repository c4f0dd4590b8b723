use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directory under `$HOME` holding logs, the snapshot cache and saved flags.
const APP_DIR: &str = ".pellet-monitor";

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Ensure the standard `~/.pellet-monitor/` directory hierarchy exists.
///
/// Creates the following directories if absent (including any missing parents):
/// - `~/.pellet-monitor/`
/// - `~/.pellet-monitor/logs/`
/// - `~/.pellet-monitor/cache/`
pub fn ensure_directories() -> anyhow::Result<()> {
    ensure_directories_in(&home_dir())
}

/// [`ensure_directories`] rooted at `home`.
pub fn ensure_directories_in(home: &Path) -> anyhow::Result<()> {
    let app_dir = home.join(APP_DIR);
    std::fs::create_dir_all(app_dir.join("logs"))?;
    std::fs::create_dir_all(app_dir.join("cache"))?;
    Ok(())
}

fn home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `--log-level` name to an [`EnvFilter`] directive.
fn level_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_lowercase(),
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Console output goes to stderr so stdout carries only chart payloads. When
/// `log_file` is set, the same events are appended to it without ANSI colours.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(level_directive(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));

    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(open_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    Ok(())
}

fn open_log_file(path: &Path) -> anyhow::Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

// ── Snapshot discovery ─────────────────────────────────────────────────────────

/// Locate a cached snapshot when `--snapshot` was not given.
///
/// Returns `~/.pellet-monitor/cache/snapshot.json` if it exists.
pub fn discover_snapshot_path() -> Option<PathBuf> {
    dirs::home_dir().and_then(|home| discover_snapshot_path_in(&home))
}

/// [`discover_snapshot_path`] rooted at `home`.
pub fn discover_snapshot_path_in(home: &Path) -> Option<PathBuf> {
    let candidate = home.join(APP_DIR).join("cache").join("snapshot.json");
    candidate.is_file().then_some(candidate)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_directories() {
        let tmp = TempDir::new().expect("tempdir");

        ensure_directories_in(tmp.path()).expect("ensure_directories should succeed");

        let app_dir = tmp.path().join(".pellet-monitor");
        assert!(app_dir.is_dir(), ".pellet-monitor dir must exist");
        assert!(app_dir.join("logs").is_dir(), "logs subdir must exist");
        assert!(app_dir.join("cache").is_dir(), "cache subdir must exist");
    }

    #[test]
    fn test_level_directive_mapping() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("info"), "info");
        assert_eq!(level_directive("Warning"), "warn");
        assert_eq!(level_directive("ERROR"), "error");
        assert_eq!(level_directive("trace"), "trace");
    }

    #[test]
    fn test_critical_is_quietest_level() {
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive("critical"), "error");
    }

    #[test]
    fn test_open_log_file_creates_parents() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("logs").join("nested").join("monitor.log");
        open_log_file(&path).expect("open log file");
        assert!(path.is_file());
    }

    #[test]
    fn test_discover_snapshot_path_returns_none_when_absent() {
        let tmp = TempDir::new().expect("tempdir");
        assert!(
            discover_snapshot_path_in(tmp.path()).is_none(),
            "should return None when no cached snapshot exists"
        );
    }

    #[test]
    fn test_discover_snapshot_path_finds_cached_snapshot() {
        let tmp = TempDir::new().expect("tempdir");
        ensure_directories_in(tmp.path()).expect("ensure_directories");
        let snapshot = tmp.path().join(".pellet-monitor").join("cache").join("snapshot.json");
        std::fs::write(&snapshot, "{}").expect("write snapshot");

        assert_eq!(discover_snapshot_path_in(tmp.path()), Some(snapshot));
    }
}
