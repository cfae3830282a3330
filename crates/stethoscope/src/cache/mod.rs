//! Liveness cache.
//!
//! A map from [`EndpointId`] to [`CheckinEntry`] where every entry expires a
//! fixed duration after its most recent write. Reads do not extend an entry's
//! life.
//!
//! Built on [`moka::future::Cache`] with `time_to_live`. moka's own removal
//! causes are narrowed to [`RemovalCause`]: replacing a live entry is not a
//! removal and is never reported.
//!
//! # Expiration
//!
//! An expired entry is invisible to `get` and `size` as soon as its window
//! elapses. It is evicted and reported:
//! - When `get` or `remove` misses on it.
//! - When `put` overwrites it.
//! - When `force_maintenance` runs, or moka housekeeps on its own.
//!
//! Every removed entry is reported to the [`RemovalListener`] exactly once.

use crate::models::{CheckinEntry, EndpointId};
use moka::future::Cache;
use moka::notification::RemovalCause as MokaRemovalCause;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Why an entry left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalCause {
    /// Not written within the expiration window.
    Expired,
    /// Removed by an explicit `remove` call.
    Explicit,
}

impl RemovalCause {
    /// Label value for metrics and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RemovalCause::Expired => "expired",
            RemovalCause::Explicit => "explicit",
        }
    }
}

/// An entry that has left the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalNotification {
    pub endpoint: EndpointId,
    pub entry: CheckinEntry,
    pub cause: RemovalCause,
}

/// Observer invoked once for every entry that leaves the cache.
///
/// Called synchronously from the cache operation that removed the entry.
/// Implementations must not block; anything slow belongs on a spawned task.
pub trait RemovalListener: Send + Sync {
    fn on_removal(&self, notification: RemovalNotification);
}

/// Expire-after-write map of endpoint checkins.
pub struct LivenessCache {
    inner: Cache<EndpointId, CheckinEntry>,
    expire_after_write: Duration,
    expired_total: Arc<AtomicUsize>,
}

impl LivenessCache {
    /// Create an empty cache.
    pub fn new(expire_after_write: Duration, listener: Arc<dyn RemovalListener>) -> Self {
        let expired_total = Arc::new(AtomicUsize::new(0));
        let expired_counter = Arc::clone(&expired_total);

        let inner = Cache::builder()
            .time_to_live(expire_after_write)
            .eviction_listener(
                move |endpoint: Arc<EndpointId>, entry: CheckinEntry, cause: MokaRemovalCause| {
                    let cause = match cause {
                        MokaRemovalCause::Expired => {
                            expired_counter.fetch_add(1, Ordering::SeqCst);
                            RemovalCause::Expired
                        }
                        MokaRemovalCause::Explicit => RemovalCause::Explicit,
                        // Replaced is an overwrite; Size cannot happen without a capacity
                        _ => return,
                    };

                    listener.on_removal(RemovalNotification {
                        endpoint: EndpointId::clone(&endpoint),
                        entry,
                        cause,
                    });
                },
            )
            .build();

        Self {
            inner,
            expire_after_write,
            expired_total,
        }
    }

    /// The configured expiration window.
    pub fn expire_after_write(&self) -> Duration {
        self.expire_after_write
    }

    /// Insert or overwrite the entry for `endpoint`, restarting its clock.
    ///
    /// Overwriting an entry whose window had already elapsed reports that
    /// entry as expired.
    pub async fn put(&self, endpoint: EndpointId, entry: CheckinEntry) {
        self.inner.insert(endpoint, entry).await;
    }

    /// Current entry for `endpoint`, or `None` if absent or expired.
    pub async fn get(&self, endpoint: &EndpointId) -> Option<CheckinEntry> {
        let entry = self.inner.get(endpoint).await;
        if entry.is_none() {
            // evict the key now if it was only hidden by expiry
            self.inner.run_pending_tasks().await;
        }
        entry
    }

    /// Remove the entry for `endpoint`, notifying the listener.
    ///
    /// An entry that had already expired is reported as expired, not
    /// explicit, and is not returned.
    pub async fn remove(&self, endpoint: &EndpointId) -> Option<CheckinEntry> {
        if !self.inner.contains_key(endpoint) {
            self.inner.run_pending_tasks().await;
            return None;
        }
        self.inner.remove(endpoint).await
    }

    /// Number of live entries.
    ///
    /// Expired entries still waiting for eviction are not counted, and
    /// nothing is evicted.
    pub async fn size(&self) -> usize {
        self.inner.iter().count()
    }

    /// Evict every expired entry now. Returns the number of entries that
    /// expired while it ran.
    pub async fn force_maintenance(&self) -> usize {
        let before = self.expired_total.load(Ordering::SeqCst);
        self.inner.run_pending_tasks().await;
        let count = self
            .expired_total
            .load(Ordering::SeqCst)
            .saturating_sub(before);

        if count > 0 {
            debug!(
                target: "stethoscope.cache",
                evicted = count,
                "Forced maintenance evicted expired entries"
            );
        }

        count
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    /// Listener that records every notification.
    #[derive(Default)]
    struct RecordingListener {
        removals: StdMutex<Vec<RemovalNotification>>,
    }

    impl RecordingListener {
        fn removals(&self) -> Vec<RemovalNotification> {
            self.removals.lock().unwrap().clone()
        }
    }

    impl RemovalListener for RecordingListener {
        fn on_removal(&self, notification: RemovalNotification) {
            self.removals.lock().unwrap().push(notification);
        }
    }

    fn endpoint(port: i32) -> EndpointId {
        EndpointId::from_parts("host", port).unwrap()
    }

    fn cache(window: Duration) -> (LivenessCache, Arc<RecordingListener>) {
        let listener = Arc::new(RecordingListener::default());
        let cache = LivenessCache::new(window, listener.clone());
        (cache, listener)
    }

    fn millis(ms: u64) -> Duration {
        Duration::from_millis(ms)
    }

    #[tokio::test]
    async fn test_put_then_get_returns_entry() {
        let (cache, listener) = cache(Duration::from_secs(60));
        let entry = CheckinEntry::now("a", "s");

        cache.put(endpoint(1000), entry.clone()).await;

        assert_eq!(cache.get(&endpoint(1000)).await, Some(entry));
        assert_eq!(cache.size().await, 1);
        assert!(listener.removals().is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (cache, listener) = cache(Duration::from_secs(60));
        assert_eq!(cache.get(&endpoint(1)).await, None);
        assert!(listener.removals().is_empty());
    }

    #[tokio::test]
    async fn test_get_after_window_evicts_passively() {
        let (cache, listener) = cache(millis(300));
        cache.put(endpoint(1000), CheckinEntry::now("a", "s")).await;

        tokio::time::sleep(millis(400)).await;

        assert_eq!(cache.get(&endpoint(1000)).await, None);
        let removals = listener.removals();
        assert_eq!(removals.len(), 1);
        assert_eq!(removals[0].endpoint, endpoint(1000));
        assert_eq!(removals[0].cause, RemovalCause::Expired);
        assert_eq!(removals[0].entry.application, "a");

        // Second read finds nothing and does not notify again
        assert_eq!(cache.get(&endpoint(1000)).await, None);
        assert_eq!(listener.removals().len(), 1);
    }

    #[tokio::test]
    async fn test_reads_do_not_extend_life() {
        let (cache, _listener) = cache(millis(600));
        cache.put(endpoint(1), CheckinEntry::now("a", "s")).await;

        tokio::time::sleep(millis(300)).await;
        assert!(cache.get(&endpoint(1)).await.is_some());

        tokio::time::sleep(millis(400)).await;
        assert!(cache.get(&endpoint(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_overwrite_resets_clock_without_notifying() {
        let (cache, listener) = cache(Duration::from_secs(1));

        cache.put(endpoint(1), CheckinEntry::now("a", "s")).await;
        tokio::time::sleep(millis(700)).await;
        cache.put(endpoint(1), CheckinEntry::now("a2", "s2")).await;
        tokio::time::sleep(millis(500)).await;

        let entry = cache.get(&endpoint(1)).await.expect("entry should be alive");
        assert_eq!(entry.application, "a2");
        assert_eq!(entry.service, "s2");
        assert!(listener.removals().is_empty());
    }

    #[tokio::test]
    async fn test_put_over_expired_entry_reports_expiry() {
        let (cache, listener) = cache(millis(300));
        cache.put(endpoint(1), CheckinEntry::now("old", "s")).await;

        tokio::time::sleep(millis(400)).await;
        cache.put(endpoint(1), CheckinEntry::now("new", "s")).await;

        let removals = listener.removals();
        assert_eq!(removals.len(), 1);
        assert_eq!(removals[0].entry.application, "old");
        assert_eq!(removals[0].cause, RemovalCause::Expired);
        assert_eq!(cache.get(&endpoint(1)).await.unwrap().application, "new");
    }

    #[tokio::test]
    async fn test_force_maintenance_evicts_only_expired() {
        let (cache, listener) = cache(millis(600));
        cache.put(endpoint(1), CheckinEntry::now("a", "s")).await;
        tokio::time::sleep(millis(400)).await;
        cache.put(endpoint(2), CheckinEntry::now("a", "s")).await;
        tokio::time::sleep(millis(300)).await;

        assert_eq!(cache.force_maintenance().await, 1);

        let removals = listener.removals();
        assert_eq!(removals.len(), 1);
        assert_eq!(removals[0].endpoint, endpoint(1));
        assert_eq!(cache.size().await, 1);
        assert!(cache.get(&endpoint(2)).await.is_some());

        // Nothing left to evict
        assert_eq!(cache.force_maintenance().await, 0);
        assert_eq!(listener.removals().len(), 1);
    }

    #[tokio::test]
    async fn test_size_excludes_expired_but_unevicted() {
        let (cache, listener) = cache(millis(300));
        cache.put(endpoint(1), CheckinEntry::now("a", "s")).await;
        cache.put(endpoint(2), CheckinEntry::now("a", "s")).await;
        assert_eq!(cache.size().await, 2);

        tokio::time::sleep(millis(400)).await;

        assert_eq!(cache.size().await, 0);
        // size() does not evict
        assert!(listener.removals().is_empty());
    }

    #[tokio::test]
    async fn test_explicit_remove_notifies_once() {
        let (cache, listener) = cache(Duration::from_secs(60));
        cache.put(endpoint(1), CheckinEntry::now("a", "s")).await;

        let removed = cache.remove(&endpoint(1)).await;
        assert_eq!(removed.map(|e| e.application), Some("a".to_string()));
        assert!(cache.remove(&endpoint(1)).await.is_none());

        let removals = listener.removals();
        assert_eq!(removals.len(), 1);
        assert_eq!(removals[0].cause, RemovalCause::Explicit);
        assert!(cache.get(&endpoint(1)).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_of_expired_entry_reports_expired() {
        let (cache, listener) = cache(millis(300));
        cache.put(endpoint(1), CheckinEntry::now("a", "s")).await;
        tokio::time::sleep(millis(400)).await;

        assert!(cache.remove(&endpoint(1)).await.is_none());

        let removals = listener.removals();
        assert_eq!(removals.len(), 1);
        assert_eq!(removals[0].cause, RemovalCause::Expired);
    }

    #[tokio::test]
    async fn test_concurrent_puts_are_all_visible() {
        let (cache, _listener) = cache(Duration::from_secs(60));
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..50)
            .map(|port| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    cache.put(endpoint(port), CheckinEntry::now("a", "s")).await;
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cache.size().await, 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_get_and_maintenance_report_expiry_once() {
        let (cache, listener) = cache(millis(200));
        let cache = Arc::new(cache);
        cache.put(endpoint(1), CheckinEntry::now("a", "s")).await;

        tokio::time::sleep(millis(300)).await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        assert!(cache.get(&endpoint(1)).await.is_none());
                    } else {
                        cache.force_maintenance().await;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        let removals = listener.removals();
        assert_eq!(removals.len(), 1);
        assert_eq!(removals[0].endpoint, endpoint(1));
        assert_eq!(removals[0].cause, RemovalCause::Expired);
    }

    #[test]
    fn test_removal_cause_labels() {
        assert_eq!(RemovalCause::Expired.as_str(), "expired");
        assert_eq!(RemovalCause::Explicit.as_str(), "explicit");
    }
}
