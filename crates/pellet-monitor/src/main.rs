mod bootstrap;
mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use pellet_core::error::PelletError;
use pellet_core::models::DayWindow;
use pellet_core::settings::Settings;
use pellet_core::time_utils::TimezoneHandler;
use pellet_data::builder::{build_chart, ChartContext, ChartKind};
use pellet_data::reader::load_snapshot;
use pellet_runtime::refresher::ChartRefresher;
use pellet_runtime::registry::ChartRegistry;
use pellet_runtime::snapshot_cache::SnapshotCache;
use pellet_runtime::source::{FileSource, SnapshotSource};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("Pellet Monitor v{} starting", env!("CARGO_PKG_VERSION"));

    let snapshot_path = settings
        .snapshot
        .clone()
        .or_else(bootstrap::discover_snapshot_path)
        .ok_or_else(|| {
            PelletError::Config(
                "no snapshot file; pass --snapshot <file> or set PELLET_SNAPSHOT".to_string(),
            )
        })?;
    let kinds = ChartKind::parse_selection(&settings.chart)?;
    let window = settings.window()?;

    tracing::info!(
        "Charts: {}, Days: {}, Timezone: {}",
        settings.chart,
        window.days(),
        settings.timezone
    );

    if settings.watch {
        watch(snapshot_path, &kinds, window, &settings).await
    } else {
        render_once(&snapshot_path, &kinds, window, &settings.timezone)
    }
}

/// Build every selected chart once and print one JSON line per chart.
fn render_once(path: &Path, kinds: &[ChartKind], window: DayWindow, timezone: &str) -> Result<()> {
    let snapshot = load_snapshot(path)?;
    let ctx = ChartContext::new(window, TimezoneHandler::new(timezone).today());

    for &kind in kinds {
        let outcome = build_chart(kind, &snapshot, &ctx);
        println!("{}", output::chart_payload(kind.name(), &outcome)?);
    }
    Ok(())
}

/// Keep the selected charts live, printing every accepted update until
/// Ctrl+C or until all refreshers have stopped.
async fn watch(
    path: PathBuf,
    kinds: &[ChartKind],
    window: DayWindow,
    settings: &Settings,
) -> Result<()> {
    tracing::info!("Starting live refresh every {}s...", settings.refresh_rate);

    let source: Arc<dyn SnapshotSource> = Arc::new(FileSource::new(path));
    let interval = Duration::from_secs(u64::from(settings.refresh_rate));
    // Charts refreshing on the same tick share one fetch.
    let cache = Arc::new(SnapshotCache::new(source, interval / 2));
    let (tx, mut rx) = mpsc::channel(16 * kinds.len().max(1));
    let mut registry = ChartRegistry::new();

    for &kind in kinds {
        let generation = registry.create(kind.name(), kind);
        let handle = ChartRefresher::new(kind.name(), kind, generation, Arc::clone(&cache))
            .with_window(window)
            .with_interval(interval)
            .with_timezone(TimezoneHandler::new(&settings.timezone))
            .start(tx.clone());
        registry.attach(kind.name(), handle);
    }
    drop(tx);

    loop {
        tokio::select! {
            update = rx.recv() => {
                let Some(update) = update else {
                    tracing::debug!("all refreshers stopped");
                    break;
                };
                let chart = update.chart().to_string();
                if !registry.apply(update) {
                    continue;
                }
                if let Some(entry) = registry.get(&chart) {
                    println!("{}", output::entry_payload(&chart, entry)?);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received; stopping refresh tasks");
                break;
            }
        }
    }

    registry.clear();
    Ok(())
}
