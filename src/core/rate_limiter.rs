//! Fixed window rate limiting per client identity

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::core::models::{RateDecision, RateWindow};

/// Per-client fixed window counter
///
/// The check and the increment happen under the map shard lock for the client,
/// so two concurrent requests from one client can never both take the last slot.
#[derive(Debug)]
pub struct RateLimiter {
    windows: DashMap<String, RateWindow>,
    window: Duration,
    max_requests: u32,
}

impl RateLimiter {
    /// Create a limiter admitting `max_requests` per `window`
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            windows: DashMap::new(),
            window,
            max_requests,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Count one request for `client_id` and decide whether it is admitted
    pub fn allow(&self, client_id: &str) -> RateDecision {
        let now = Instant::now();

        let mut window = self
            .windows
            .entry(client_id.to_string())
            .or_insert_with(|| RateWindow::new(client_id, now));

        if window.has_elapsed(now, self.window) {
            *window = RateWindow::new(client_id, now);
        }

        window.count = window.count.saturating_add(1);

        let permitted = window.count <= self.max_requests;
        let reset_after = window.reset_at(self.window).saturating_duration_since(now);
        let remaining = self.max_requests.saturating_sub(window.count);

        if !permitted {
            debug!(
                "Client {} over limit ({} requests in window)",
                client_id, window.count
            );
        }

        RateDecision {
            permitted,
            limit: self.max_requests,
            remaining,
            reset_at: wall_clock_after(reset_after),
            reset_after,
        }
    }

    /// Drop windows that have already ended, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows
            .retain(|_, window| !window.has_elapsed(now, self.window));
        before.saturating_sub(self.windows.len())
    }

    /// Number of tracked clients
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

fn wall_clock_after(delay: Duration) -> chrono::DateTime<chrono::Utc> {
    let delay = chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
    chrono::Utc::now() + delay
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const WINDOW: Duration = Duration::from_secs(15 * 60);

    #[tokio::test(start_paused = true)]
    async fn test_admits_max_then_denies() {
        let limiter = RateLimiter::new(WINDOW, 100);

        for i in 1..=100u32 {
            let decision = limiter.allow("10.0.0.1");
            assert!(decision.permitted, "request {} should be admitted", i);
            assert_eq!(decision.remaining, 100 - i);
        }

        let decision = limiter.allow("10.0.0.1");
        assert!(!decision.permitted);
        assert_eq!(decision.remaining, 0);
        assert_eq!(decision.reset_after, WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_duration() {
        let limiter = RateLimiter::new(WINDOW, 2);

        assert!(limiter.allow("client").permitted);
        assert!(limiter.allow("client").permitted);
        assert!(!limiter.allow("client").permitted);

        tokio::time::advance(WINDOW - Duration::from_secs(1)).await;
        let decision = limiter.allow("client");
        assert!(!decision.permitted);
        assert_eq!(decision.reset_after, Duration::from_secs(1));

        // A request exactly at the boundary opens the next window
        tokio::time::advance(Duration::from_secs(1)).await;
        let decision = limiter.allow("client");
        assert!(decision.permitted);
        assert_eq!(decision.remaining, 1);
        assert_eq!(decision.reset_after, WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clients_are_independent() {
        let limiter = RateLimiter::new(WINDOW, 1);

        assert!(limiter.allow("a").permitted);
        assert!(!limiter.allow("a").permitted);
        assert!(limiter.allow("b").permitted);
        assert_eq!(limiter.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let limiter = RateLimiter::new(WINDOW, 10);
        limiter.allow("a");
        tokio::time::advance(WINDOW / 2).await;
        limiter.allow("b");
        tokio::time::advance(WINDOW / 2).await;

        assert_eq!(limiter.purge_expired(), 1);
        assert_eq!(limiter.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_never_exceed_max() {
        let limiter = Arc::new(RateLimiter::new(WINDOW, 50));

        let handles: Vec<_> = (0..200)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.allow("shared").permitted })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 50);
    }
}
