// ── Per-provider sliding-window rate limiter ──
//
// Each provider key owns a window of recent request timestamps. A call is
// admitted when fewer than `max_requests` timestamps fall inside `window`;
// otherwise the caller sleeps until the oldest one ages out and tries
// again. Nothing is ever rejected.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use crate::config::RateLimit;

/// Usage at or above this share of capacity counts as "near the limit".
const NEAR_LIMIT_PERCENT: usize = 80;

pub struct RateLimiter {
    limits: HashMap<String, RateLimit>,
    windows: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    /// Limits are read once here. A zero quota is raised to one request per
    /// window so callers cannot wait forever.
    pub fn new(limits: HashMap<String, RateLimit>) -> Self {
        let limits = limits
            .into_iter()
            .map(|(provider, limit)| {
                let max_requests = limit.max_requests.max(1);
                (provider, RateLimit::new(max_requests, limit.window))
            })
            .collect();
        Self {
            limits,
            windows: DashMap::new(),
        }
    }

    /// Quota for `provider`, or [`RateLimit::CONSERVATIVE`] if unknown.
    pub fn limit_for(&self, provider: &str) -> RateLimit {
        self.limits
            .get(provider)
            .copied()
            .unwrap_or(RateLimit::CONSERVATIVE)
    }

    /// Run `f` once the provider's window has room.
    ///
    /// The slot is consumed when `f` starts, so a failing call still counts.
    pub async fn throttle<F, Fut, T>(&self, provider: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire(provider).await;
        f().await
    }

    /// Wait for and record one slot.
    pub async fn acquire(&self, provider: &str) {
        let limit = self.limit_for(provider);
        loop {
            let Some(wait) = self.try_admit(provider, limit) else {
                return;
            };
            debug!(provider, wait_ms = wait.as_millis(), "rate limit reached, delaying request");
            tokio::time::sleep(wait).await;
        }
    }

    /// Record `now` and return `None` if there is room, otherwise how long
    /// until the oldest timestamp leaves the window.
    fn try_admit(&self, provider: &str, limit: RateLimit) -> Option<Duration> {
        let now = Instant::now();
        let mut window = self.windows.entry(provider.to_owned()).or_default();
        prune(&mut window, now, limit.window);
        if window.len() < limit.max_requests {
            window.push_back(now);
            return None;
        }
        let oldest = window.front().copied().unwrap_or(now);
        Some((oldest + limit.window).saturating_duration_since(now))
    }

    /// Requests recorded within the provider's window.
    pub fn recent_requests(&self, provider: &str) -> usize {
        let limit = self.limit_for(provider);
        let now = Instant::now();
        self.windows.get(provider).map_or(0, |window| {
            window
                .iter()
                .filter(|t| now.duration_since(**t) < limit.window)
                .count()
        })
    }

    /// `true` once recent usage reaches 80% of the provider's capacity.
    pub fn is_near_limit(&self, provider: &str) -> bool {
        let limit = self.limit_for(provider);
        self.recent_requests(provider) * 100 >= limit.max_requests * NEAR_LIMIT_PERCENT
    }

    /// Requests that could start right now without waiting.
    pub fn available_capacity(&self, provider: &str) -> usize {
        self.limit_for(provider)
            .max_requests
            .saturating_sub(self.recent_requests(provider))
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

fn prune(window: &mut VecDeque<Instant>, now: Instant, span: Duration) {
    while window
        .front()
        .is_some_and(|oldest| now.duration_since(*oldest) >= span)
    {
        window.pop_front();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn limiter(max: usize, window_ms: u64) -> RateLimiter {
        RateLimiter::new(HashMap::from([(
            "p".to_owned(),
            RateLimit::new(max, Duration::from_millis(window_ms)),
        )]))
    }

    #[tokio::test(start_paused = true)]
    async fn fourth_call_waits_for_window() {
        let limiter = limiter(3, 1000);
        let start = Instant::now();
        let mut started = Vec::new();
        for _ in 0..4 {
            let at = limiter.throttle("p", || async { Instant::now() }).await;
            started.push(at.duration_since(start));
        }
        assert!(started[..3].iter().all(|d| *d < Duration::from_millis(1)));
        assert!(started[3] >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_spread_over_windows() {
        let limiter = Arc::new(limiter(2, 500));
        let start = Instant::now();
        let handles: Vec<_> = (0..5)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move { limiter.throttle("p", || async { Instant::now() }).await })
            })
            .collect();
        let mut offsets = Vec::new();
        for handle in handles {
            offsets.push(handle.await.unwrap().duration_since(start).as_millis());
        }
        offsets.sort_unstable();
        assert_eq!(offsets[..2], [0, 0]);
        assert!(offsets[2..4].iter().all(|ms| (500..1000).contains(ms)));
        assert!(offsets[4] >= 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_calls_keep_their_slot() {
        let limiter = limiter(1, 1000);
        let result: Result<(), &str> = limiter.throttle("p", || async { Err("nope") }).await;
        assert!(result.is_err());
        assert_eq!(limiter.available_capacity("p"), 0);

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert_eq!(limiter.available_capacity("p"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn near_limit_at_eighty_percent() {
        let limiter = limiter(10, 60_000);
        for _ in 0..7 {
            limiter.acquire("p").await;
        }
        assert!(!limiter.is_near_limit("p"));
        limiter.acquire("p").await;
        assert!(limiter.is_near_limit("p"));
        assert_eq!(limiter.available_capacity("p"), 2);
    }

    #[test]
    fn unknown_providers_use_conservative_default() {
        let limiter = RateLimiter::default();
        assert_eq!(limiter.limit_for("other"), RateLimit::CONSERVATIVE);
        assert_eq!(limiter.available_capacity("other"), 10);
        assert!(!limiter.is_near_limit("other"));
    }

    #[test]
    fn zero_quota_is_raised_to_one() {
        let limiter = limiter(0, 1000);
        assert_eq!(limiter.limit_for("p").max_requests, 1);
    }
}
