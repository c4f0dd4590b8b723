//! Owned registry of live charts.
//!
//! Every chart is created with a fresh generation number. Refresh results
//! carry the generation their refresher was started with, and a result whose
//! generation no longer matches (the chart was destroyed or recreated in the
//! meantime) is dropped. The last render started wins.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pellet_data::builder::ChartKind;
use pellet_data::chart::ChartOutcome;

use crate::refresher::{ChartUpdate, RefreshHandle};

// ── ChartEntry ────────────────────────────────────────────────────────────────

/// State of one registered chart.
#[derive(Debug)]
pub struct ChartEntry {
    pub kind: ChartKind,
    pub generation: u64,
    /// Last successfully built outcome; kept across failed refreshes.
    pub data: Option<ChartOutcome>,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    task: Option<RefreshHandle>,
}

impl ChartEntry {
    fn new(kind: ChartKind, generation: u64) -> Self {
        Self {
            kind,
            generation,
            data: None,
            last_error: None,
            updated_at: None,
            task: None,
        }
    }

    pub fn has_task(&self) -> bool {
        self.task.is_some()
    }
}

// ── ChartRegistry ─────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct ChartRegistry {
    charts: BTreeMap<String, ChartEntry>,
    last_generation: u64,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, replacing (and stopping) any chart already under it.
    ///
    /// Returns the generation refreshers for this chart must report.
    pub fn create(&mut self, name: &str, kind: ChartKind) -> u64 {
        if self.destroy(name) {
            tracing::debug!(chart = name, "recreating chart");
        }
        self.last_generation += 1;
        let generation = self.last_generation;
        self.charts
            .insert(name.to_string(), ChartEntry::new(kind, generation));
        generation
    }

    /// Tie a refresh task to a chart so destroying the chart stops it.
    ///
    /// Returns `false` (and aborts the task) if the chart does not exist.
    pub fn attach(&mut self, name: &str, task: RefreshHandle) -> bool {
        match self.charts.get_mut(name) {
            Some(entry) => {
                if let Some(previous) = entry.task.replace(task) {
                    previous.abort();
                }
                true
            }
            None => {
                task.abort();
                false
            }
        }
    }

    /// Store a freshly built outcome if `generation` is still current.
    pub fn replace(&mut self, name: &str, generation: u64, outcome: ChartOutcome) -> bool {
        let Some(entry) = self.current_entry(name, generation) else {
            return false;
        };
        entry.data = Some(outcome);
        entry.last_error = None;
        entry.updated_at = Some(Utc::now());
        true
    }

    /// Record a failed refresh. Previously built data is kept; a chart that
    /// has none yet takes the `stale` rendering from the last good snapshot.
    pub fn record_failure(
        &mut self,
        name: &str,
        generation: u64,
        message: String,
        stale: Option<ChartOutcome>,
    ) -> bool {
        let Some(entry) = self.current_entry(name, generation) else {
            return false;
        };
        if entry.data.is_none() {
            entry.data = stale;
        }
        entry.last_error = Some(message);
        true
    }

    /// Apply a refresher update. Returns whether it was accepted.
    pub fn apply(&mut self, update: ChartUpdate) -> bool {
        match update {
            ChartUpdate::Ready {
                chart,
                generation,
                outcome,
            } => self.replace(&chart, generation, outcome),
            ChartUpdate::Failed {
                chart,
                generation,
                message,
                stale,
            } => self.record_failure(&chart, generation, message, stale),
        }
    }

    /// Remove a chart and abort its refresh task.
    pub fn destroy(&mut self, name: &str) -> bool {
        match self.charts.remove(name) {
            Some(entry) => {
                if let Some(task) = entry.task {
                    task.abort();
                }
                true
            }
            None => false,
        }
    }

    /// Destroy every chart.
    pub fn clear(&mut self) {
        let names: Vec<String> = self.charts.keys().cloned().collect();
        for name in names {
            self.destroy(&name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&ChartEntry> {
        self.charts.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.charts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    fn current_entry(&mut self, name: &str, generation: u64) -> Option<&mut ChartEntry> {
        match self.charts.get_mut(name) {
            Some(entry) if entry.generation == generation => Some(entry),
            Some(entry) => {
                tracing::debug!(
                    chart = name,
                    stale = generation,
                    current = entry.generation,
                    "discarding stale chart update"
                );
                None
            }
            None => {
                tracing::debug!(chart = name, "discarding update for unknown chart");
                None
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresher::ChartRefresher;
    use crate::snapshot_cache::tests::StubSource;
    use crate::snapshot_cache::SnapshotCache;
    use pellet_data::chart::{ChartData, Series};
    use std::sync::Arc;
    use std::time::Duration;

    fn stub_cache() -> Arc<SnapshotCache> {
        Arc::new(SnapshotCache::new(Arc::new(StubSource::default()), Duration::ZERO))
    }

    fn ready(value: f64) -> ChartOutcome {
        ChartOutcome::Ready(ChartData {
            categories: vec!["Jan 1".to_string()],
            series: vec![Series::from_values("Sessions", [value])],
            colors: Vec::new(),
        })
    }

    #[test]
    fn test_create_assigns_increasing_generations() {
        let mut registry = ChartRegistry::new();
        let a = registry.create("trend", ChartKind::SizeTrend);
        let b = registry.create("sizes", ChartKind::SizeDistribution);
        assert!(b > a);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["sizes", "trend"]);
        assert!(registry.get("trend").unwrap().data.is_none());
    }

    #[test]
    fn test_replace_with_current_generation() {
        let mut registry = ChartRegistry::new();
        let generation = registry.create("trend", ChartKind::SizeTrend);
        assert!(registry.replace("trend", generation, ready(3.0)));

        let entry = registry.get("trend").unwrap();
        assert_eq!(entry.data, Some(ready(3.0)));
        assert!(entry.updated_at.is_some());
    }

    #[test]
    fn test_stale_generation_never_overwrites_recreated_chart() {
        let mut registry = ChartRegistry::new();
        let old = registry.create("trend", ChartKind::SizeTrend);
        let new = registry.create("trend", ChartKind::SizeTrend);

        assert!(registry.replace("trend", new, ready(2.0)));
        // A slow refresh started before the recreate finishes last.
        assert!(!registry.replace("trend", old, ready(1.0)));
        assert_eq!(registry.get("trend").unwrap().data, Some(ready(2.0)));
    }

    #[test]
    fn test_update_for_destroyed_chart_is_discarded() {
        let mut registry = ChartRegistry::new();
        let generation = registry.create("trend", ChartKind::SizeTrend);
        assert!(registry.destroy("trend"));
        assert!(!registry.destroy("trend"));
        assert!(!registry.replace("trend", generation, ready(1.0)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failure_keeps_previous_data() {
        let mut registry = ChartRegistry::new();
        let generation = registry.create("trend", ChartKind::SizeTrend);
        registry.replace("trend", generation, ready(4.0));

        assert!(registry.apply(ChartUpdate::Failed {
            chart: "trend".to_string(),
            generation,
            message: "offline".to_string(),
            stale: Some(ready(1.0)),
        }));
        let entry = registry.get("trend").unwrap();
        assert_eq!(entry.data, Some(ready(4.0)));
        assert_eq!(entry.last_error.as_deref(), Some("offline"));

        registry.apply(ChartUpdate::Ready {
            chart: "trend".to_string(),
            generation,
            outcome: ChartOutcome::NoData,
        });
        let entry = registry.get("trend").unwrap();
        assert_eq!(entry.data, Some(ChartOutcome::NoData));
        assert!(entry.last_error.is_none());
    }

    #[test]
    fn test_failure_on_empty_chart_adopts_stale_rendering() {
        let mut registry = ChartRegistry::new();
        let generation = registry.create("trend", ChartKind::SizeTrend);
        let accepted =
            registry.record_failure("trend", generation, "offline".to_string(), Some(ready(2.0)));
        assert!(accepted);

        let entry = registry.get("trend").unwrap();
        assert_eq!(entry.data, Some(ready(2.0)));
        assert_eq!(entry.last_error.as_deref(), Some("offline"));
    }

    #[tokio::test]
    async fn test_destroy_aborts_attached_task() {
        let mut registry = ChartRegistry::new();
        let generation = registry.create("sizes", ChartKind::SizeDistribution);
        let refresher = ChartRefresher::new(
            "sizes",
            ChartKind::SizeDistribution,
            generation,
            stub_cache(),
        )
        .with_interval(Duration::from_millis(10));
        let (mut rx, handle) = refresher.start_with_channel();
        assert!(registry.attach("sizes", handle));
        assert!(registry.get("sizes").unwrap().has_task());

        registry.destroy("sizes");
        let closed = tokio::time::timeout(Duration::from_secs(5), async {
            while rx.recv().await.is_some() {}
        })
        .await;
        assert!(closed.is_ok(), "refresh task still running after destroy");
    }

    #[tokio::test]
    async fn test_attach_to_unknown_chart_aborts_task() {
        let mut registry = ChartRegistry::new();
        let refresher = ChartRefresher::new(
            "ghost",
            ChartKind::SizeDistribution,
            1,
            stub_cache(),
        );
        let (_rx, handle) = refresher.start_with_channel();
        assert!(!registry.attach("ghost", handle));
    }

    #[test]
    fn test_clear_destroys_everything() {
        let mut registry = ChartRegistry::new();
        for kind in ChartKind::ALL {
            registry.create(kind.name(), kind);
        }
        assert_eq!(registry.len(), 5);
        registry.clear();
        assert!(registry.is_empty());
    }
}
