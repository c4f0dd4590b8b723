//! Snapshot cache shared by every chart refresher.
//!
//! All refreshers read through one `Arc<SnapshotCache>`, so charts ticking
//! together cost a single fetch per TTL. Fetches run on tokio's blocking
//! pool and retries back off with `tokio::time::sleep`; no refresh ever
//! parks a runtime worker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pellet_data::reader::Snapshot;
use tokio::sync::Mutex;

use crate::source::SnapshotSource;

/// Attempts per fetch before the failure is reported.
const FETCH_ATTEMPTS: u32 = 3;

/// Back-off step; attempt `n` waits `n * RETRY_STEP` before running.
const RETRY_STEP: Duration = Duration::from_millis(100);

// ── CacheRead ─────────────────────────────────────────────────────────────────

/// What a reader gets back: the newest snapshot available and, if the
/// latest fetch failed, why. Both can be set at once when the snapshot is
/// a stale copy kept from an earlier fetch.
#[derive(Debug, Clone, Default)]
pub struct CacheRead {
    pub snapshot: Option<Arc<Snapshot>>,
    pub error: Option<String>,
}

impl CacheRead {
    pub fn is_stale(&self) -> bool {
        self.snapshot.is_some() && self.error.is_some()
    }
}

// ── SnapshotCache ─────────────────────────────────────────────────────────────

#[derive(Default)]
struct CacheSlot {
    snapshot: Option<Arc<Snapshot>>,
    fetched_at: Option<Instant>,
    last_error: Option<String>,
}

impl CacheSlot {
    fn fresh(&self, ttl: Duration) -> bool {
        self.snapshot.is_some() && self.fetched_at.is_some_and(|at| at.elapsed() < ttl)
    }

    fn read(&self) -> CacheRead {
        CacheRead {
            snapshot: self.snapshot.clone(),
            error: self.last_error.clone(),
        }
    }
}

pub struct SnapshotCache {
    source: Arc<dyn SnapshotSource>,
    ttl: Duration,
    slot: Mutex<CacheSlot>,
}

impl SnapshotCache {
    pub fn new(source: Arc<dyn SnapshotSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            slot: Mutex::new(CacheSlot::default()),
        }
    }

    /// Read the snapshot, fetching when the cached copy is older than the
    /// TTL or `force_refresh` is set.
    ///
    /// Concurrent callers queue on the cache lock, so a burst of readers
    /// triggers one fetch and the rest are served from its result. A failed
    /// fetch keeps the previous snapshot alongside the error.
    pub async fn get_data(&self, force_refresh: bool) -> CacheRead {
        let mut slot = self.slot.lock().await;
        if !force_refresh && slot.fresh(self.ttl) {
            return slot.read();
        }

        match self.fetch_with_retry().await {
            Ok(snapshot) => {
                tracing::debug!(
                    source = %self.source.describe(),
                    records = snapshot.records.len(),
                    users = snapshot.users.len(),
                    "snapshot refreshed"
                );
                slot.snapshot = Some(Arc::new(snapshot));
                slot.fetched_at = Some(Instant::now());
                slot.last_error = None;
            }
            Err(message) => {
                tracing::warn!(
                    source = %self.source.describe(),
                    error = %message,
                    stale = slot.snapshot.is_some(),
                    "snapshot fetch failed"
                );
                slot.last_error = Some(message);
            }
        }
        slot.read()
    }

    async fn fetch_with_retry(&self) -> Result<Snapshot, String> {
        let mut last_err = String::new();

        for attempt in 0..FETCH_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(RETRY_STEP * attempt).await;
            }

            let source = Arc::clone(&self.source);
            match tokio::task::spawn_blocking(move || source.fetch()).await {
                Ok(Ok(snapshot)) => return Ok(snapshot),
                Ok(Err(e)) => last_err = e.to_string(),
                Err(e) => last_err = format!("fetch task failed: {e}"),
            }
            tracing::debug!(attempt, error = %last_err, "fetch attempt failed");
        }

        Err(last_err)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pellet_core::error::{PelletError, Result};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Source returning a snapshot with one record per call so far, or an
    /// error while `failing` is set.
    #[derive(Default)]
    pub(crate) struct StubSource {
        pub calls: AtomicUsize,
        pub failing: AtomicBool,
    }

    impl SnapshotSource for StubSource {
        fn fetch(&self) -> Result<Snapshot> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.failing.load(Ordering::SeqCst) {
                return Err(PelletError::SourceUnavailable("stub offline".to_string()));
            }
            Ok(Snapshot {
                records: (0..n).map(|i| serde_json::json!({ "avg_size": i + 1 })).collect(),
                ..Default::default()
            })
        }

        fn describe(&self) -> String {
            "stub".to_string()
        }
    }

    fn make_cache(ttl: Duration) -> (Arc<SnapshotCache>, Arc<StubSource>) {
        let source = Arc::new(StubSource::default());
        (Arc::new(SnapshotCache::new(source.clone(), ttl)), source)
    }

    fn record_count(read: &CacheRead) -> usize {
        read.snapshot.as_ref().map_or(0, |s| s.records.len())
    }

    #[tokio::test]
    async fn test_reads_within_ttl_share_one_fetch() {
        let (cache, source) = make_cache(Duration::from_secs(60));
        assert_eq!(record_count(&cache.get_data(false).await), 1);
        assert_eq!(record_count(&cache.get_data(false).await), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_readers_trigger_single_fetch() {
        let (cache, source) = make_cache(Duration::from_secs(60));
        let readers: Vec<_> = (0..5)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.get_data(false).await })
            })
            .collect();
        for reader in readers {
            assert_eq!(record_count(&reader.await.unwrap()), 1);
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_or_forced_reads_fetch_again() {
        let (cache, source) = make_cache(Duration::ZERO);
        cache.get_data(false).await;
        assert_eq!(record_count(&cache.get_data(false).await), 2);

        let (cache, source_forced) = make_cache(Duration::from_secs(60));
        cache.get_data(false).await;
        cache.get_data(true).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(source_forced.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_keeps_previous_snapshot() {
        let (cache, source) = make_cache(Duration::ZERO);
        cache.get_data(false).await;

        source.failing.store(true, Ordering::SeqCst);
        let read = cache.get_data(true).await;
        assert!(read.is_stale());
        assert_eq!(record_count(&read), 1);
        assert!(read.error.unwrap().contains("stub offline"));
        // One successful call plus every retry attempt.
        assert_eq!(source.calls.load(Ordering::SeqCst), 1 + FETCH_ATTEMPTS as usize);

        source.failing.store(false, Ordering::SeqCst);
        let read = cache.get_data(true).await;
        assert!(read.error.is_none());
        assert!(!read.is_stale());
    }

    #[tokio::test]
    async fn test_failure_without_snapshot() {
        let (cache, source) = make_cache(Duration::from_secs(60));
        source.failing.store(true, Ordering::SeqCst);
        let read = cache.get_data(false).await;
        assert!(read.snapshot.is_none());
        assert!(read.error.is_some());
        assert!(!read.is_stale());
    }

    #[tokio::test]
    async fn test_retry_back_off_leaves_runtime_responsive() {
        // The default test runtime is single-threaded: any blocking sleep in
        // the retry path would hold this timer back by the whole back-off.
        let (cache, source) = make_cache(Duration::ZERO);
        source.failing.store(true, Ordering::SeqCst);
        let fetch = tokio::spawn(async move { cache.get_data(true).await });

        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(
            started.elapsed() < Duration::from_millis(150),
            "timer fired after {:?}",
            started.elapsed()
        );

        assert!(fetch.await.unwrap().error.is_some());
    }
}
