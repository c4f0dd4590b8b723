use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Result;
use crate::models::DayWindow;
use crate::time_utils::TimezoneHandler;

/// Chart names accepted by `--chart`.
pub const CHART_CHOICES: [&str; 6] = [
    "all",
    "daily_sessions",
    "size_trend",
    "size_distribution",
    "user_activity",
    "location_overview",
];

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Chart data preparation for the pellet measurement dashboard
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pellet-monitor",
    about = "Chart data preparation for the pellet measurement dashboard",
    version
)]
pub struct Settings {
    /// JSON snapshot of records, sessions, users and daily stats
    #[arg(long, env = "PELLET_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// Chart to build
    #[arg(long, default_value = "all", value_parser = CHART_CHOICES)]
    pub chart: String,

    /// Trailing day window for daily charts (7 or 30)
    #[arg(long, default_value = "7", value_parser = parse_days)]
    pub days: u32,

    /// Timezone used to decide which day is "today" (auto-detected if not specified)
    #[arg(long, default_value = "auto")]
    pub timezone: String,

    /// Keep polling the snapshot and re-emit charts on every refresh
    #[arg(long)]
    pub watch: bool,

    /// Refresh rate in seconds (1-60)
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=60))]
    pub refresh_rate: u32,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,
}

fn parse_days(raw: &str) -> std::result::Result<u32, String> {
    let days: u32 = raw.parse().map_err(|_| format!("not a number: {raw}"))?;
    DayWindow::try_from(days)
        .map(DayWindow::days)
        .map_err(|e| e.to_string())
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.pellet-monitor/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_rate: Option<u32>,
}

impl LastUsedParams {
    /// Default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &std::path::Path) -> PathBuf {
        base_dir.join(".pellet-monitor").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &std::path::Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &std::path::Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit
    /// value was provided, resolve `"auto"` values, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation; accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &std::path::Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                tracing::warn!(error = %e, "failed to clear saved configuration");
            }
            return Self::resolve_auto_values(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // CLI (or env) always wins over persisted values.
        if !is_arg_explicitly_set(&matches, "snapshot") && settings.snapshot.is_none() {
            settings.snapshot = last.snapshot;
        }
        if !is_arg_explicitly_set(&matches, "chart") {
            if let Some(v) = last.chart.filter(|c| CHART_CHOICES.contains(&c.as_str())) {
                settings.chart = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "days") {
            if let Some(v) = last.days.filter(|d| DayWindow::try_from(*d).is_ok()) {
                settings.days = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "timezone") {
            if let Some(v) = last
                .timezone
                .filter(|tz| tz == "auto" || TimezoneHandler::validate_timezone(tz))
            {
                settings.timezone = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "refresh_rate") {
            if let Some(v) = last.refresh_rate.filter(|r| (1..=60).contains(r)) {
                settings.refresh_rate = v;
            }
        }

        settings = Self::resolve_auto_values(settings);

        if let Err(e) = LastUsedParams::from(&settings).save_to(config_path) {
            tracing::debug!(error = %e, "could not persist last-used parameters");
        }

        settings
    }

    /// The configured day window. `days` is validated at parse time, so this
    /// only fails for hand-built settings.
    pub fn window(&self) -> Result<DayWindow> {
        DayWindow::try_from(self.days)
    }

    /// Resolve `"auto"` sentinel values and apply the `--debug` flag.
    fn resolve_auto_values(mut settings: Settings) -> Settings {
        if settings.timezone == "auto" {
            settings.timezone = crate::time_utils::get_system_timezone();
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            snapshot: s.snapshot.clone(),
            chart: Some(s.chart.clone()),
            days: Some(s.days),
            timezone: Some(s.timezone.clone()),
            refresh_rate: Some(s.refresh_rate),
        }
    }
}

/// `true` when `name` was supplied on the command line or through its
/// environment variable (not via a default value).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(clap::parser::ValueSource::CommandLine) | Some(clap::parser::ValueSource::EnvVariable)
    )
}

// ── Tests ──────────────────────────────────────────────────────────────────────
