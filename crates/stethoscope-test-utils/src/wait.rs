//! Polling helper for real-time assertions.
//!
//! The liveness cache expires entries on the wall clock, so tests that wait
//! for evictions poll instead of sleeping a fixed amount.

use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Poll `condition` until it holds or `timeout` elapses.
///
/// Returns whether the condition held.
pub async fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_returns_true_once_condition_holds() {
        let polls = AtomicUsize::new(0);
        let held = wait_until(Duration::from_secs(1), || {
            polls.fetch_add(1, Ordering::SeqCst) >= 3
        })
        .await;
        assert!(held);
    }

    #[tokio::test]
    async fn test_returns_false_after_timeout() {
        assert!(!wait_until(Duration::from_millis(50), || false).await);
    }
}
