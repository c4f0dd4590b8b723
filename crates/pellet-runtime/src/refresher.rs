//! Per-chart refresh loop.
//!
//! Each chart gets its own tokio task that rebuilds the chart from the shared
//! [`SnapshotCache`] on a fixed interval and forwards the result through an
//! `mpsc` channel. The task exits when the receiver is dropped or its
//! [`RefreshHandle`] is aborted or dropped, so a destroyed chart never keeps
//! polling.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use pellet_core::models::DayWindow;
use pellet_core::time_utils::TimezoneHandler;
use pellet_data::builder::{build_chart, ChartContext, ChartKind};
use pellet_data::chart::ChartOutcome;
use pellet_data::reader::Snapshot;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use crate::snapshot_cache::SnapshotCache;

/// Default seconds between refreshes.
pub const DEFAULT_REFRESH_SECS: u64 = 10;

// ── ChartUpdate ───────────────────────────────────────────────────────────────

/// Result of one refresh cycle, tagged with the chart name and the registry
/// generation the refresher was started for.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartUpdate {
    Ready {
        chart: String,
        generation: u64,
        outcome: ChartOutcome,
    },
    Failed {
        chart: String,
        generation: u64,
        message: String,
        /// Chart built from the last good snapshot, when one is cached.
        stale: Option<ChartOutcome>,
    },
}

impl ChartUpdate {
    pub fn chart(&self) -> &str {
        match self {
            ChartUpdate::Ready { chart, .. } | ChartUpdate::Failed { chart, .. } => chart,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            ChartUpdate::Ready { generation, .. } | ChartUpdate::Failed { generation, .. } => {
                *generation
            }
        }
    }
}

// ── ChartRefresher ────────────────────────────────────────────────────────────

/// Rebuilds one chart periodically.
pub struct ChartRefresher {
    chart: String,
    kind: ChartKind,
    generation: u64,
    cache: Arc<SnapshotCache>,
    update_interval: Duration,
    window: DayWindow,
    timezone: TimezoneHandler,
}

impl ChartRefresher {
    /// Create a refresher with a one-week window, UTC days and the default
    /// interval.
    pub fn new(
        chart: impl Into<String>,
        kind: ChartKind,
        generation: u64,
        cache: Arc<SnapshotCache>,
    ) -> Self {
        Self {
            chart: chart.into(),
            kind,
            generation,
            cache,
            update_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            window: DayWindow::Week,
            timezone: TimezoneHandler::new("UTC"),
        }
    }

    pub fn with_interval(mut self, update_interval: Duration) -> Self {
        self.update_interval = update_interval;
        self
    }

    pub fn with_window(mut self, window: DayWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_timezone(mut self, timezone: TimezoneHandler) -> Self {
        self.timezone = timezone;
        self
    }

    /// Spawn the refresh loop, sending updates to `tx`.
    pub fn start(self, tx: mpsc::Sender<ChartUpdate>) -> RefreshHandle {
        let handle = tokio::spawn(async move {
            self.refresh_loop(tx).await;
        });
        RefreshHandle { handle }
    }

    /// Spawn the refresh loop on a channel of its own.
    pub fn start_with_channel(self) -> (mpsc::Receiver<ChartUpdate>, RefreshHandle) {
        let (tx, rx) = mpsc::channel(16);
        (rx, self.start(tx))
    }

    // ── Private implementation ────────────────────────────────────────────

    /// Refresh immediately, then on every interval tick until the receiver
    /// is gone.
    async fn refresh_loop(self, tx: mpsc::Sender<ChartUpdate>) {
        if !self.refresh_and_send(&tx).await {
            return;
        }

        let mut interval = time::interval(self.update_interval);
        // The first tick fires immediately; we already refreshed above.
        interval.tick().await;

        loop {
            interval.tick().await;

            if tx.is_closed() {
                tracing::debug!(chart = %self.chart, "update channel closed; exiting loop");
                break;
            }

            if !self.refresh_and_send(&tx).await {
                break;
            }
        }
    }

    /// Run one cycle. Returns `false` once the receiver has been dropped.
    async fn refresh_and_send(&self, tx: &mpsc::Sender<ChartUpdate>) -> bool {
        let update = self.refresh().await;
        if let ChartUpdate::Failed { message, stale, .. } = &update {
            tracing::warn!(
                chart = %self.chart,
                error = %message,
                stale = stale.is_some(),
                "chart refresh failed"
            );
        }

        if tx.send(update).await.is_err() {
            tracing::debug!(chart = %self.chart, "receiver dropped; stopping refresher");
            return false;
        }
        true
    }

    async fn refresh(&self) -> ChartUpdate {
        let read = self.cache.get_data(false).await;
        let built = read.snapshot.as_deref().map(|snapshot| self.build(snapshot));

        match (built, read.error) {
            (Some(Ok(outcome)), None) => ChartUpdate::Ready {
                chart: self.chart.clone(),
                generation: self.generation,
                outcome,
            },
            (Some(Ok(outcome)), Some(message)) => self.failed(message, Some(outcome)),
            (Some(Err(message)), _) => self.failed(message, None),
            (None, Some(message)) => self.failed(message, None),
            (None, None) => self.failed("no snapshot available".to_string(), None),
        }
    }

    fn build(&self, snapshot: &Snapshot) -> Result<ChartOutcome, String> {
        let ctx = ChartContext::new(self.window, self.timezone.today());
        panic::catch_unwind(AssertUnwindSafe(|| build_chart(self.kind, snapshot, &ctx)))
            .map_err(|_| format!("building {} panicked", self.kind))
    }

    fn failed(&self, message: String, stale: Option<ChartOutcome>) -> ChartUpdate {
        ChartUpdate::Failed {
            chart: self.chart.clone(),
            generation: self.generation,
            message,
            stale,
        }
    }
}

// ── RefreshHandle ─────────────────────────────────────────────────────────────

/// Handle to a running refresh task.
///
/// Dropping the handle aborts the task.
#[derive(Debug)]
pub struct RefreshHandle {
    handle: JoinHandle<()>,
}

impl RefreshHandle {
    /// Immediately abort the refresh loop.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
