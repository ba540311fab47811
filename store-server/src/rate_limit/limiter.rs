//! Fixed-window rate limiter
//!
//! One counter per (identity, tier) pair. The window is aligned to the
//! first request in it; when it lapses the counter restarts. Lock-free
//! reads via DashMap shards; the sweep task evicts lapsed buckets so the
//! map does not grow with one-off callers.

use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Tier configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Tier label, part of the bucket key
    pub name: &'static str,
    pub max_requests: u32,
    pub window: Duration,
}

impl RateLimitPolicy {
    /// Public mutating routes: order creation, payment intents, contact
    pub fn strict(max_requests: u32, window_secs: u64) -> Self {
        Self {
            name: "strict",
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Everything else public
    pub fn standard(max_requests: u32, window_secs: u64) -> Self {
        Self {
            name: "standard",
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }
}

/// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Requests left in the current window (0 when rejected)
    pub remaining: u32,
    /// Seconds until the window resets; the Retry-After value on rejection
    pub retry_after_secs: u64,
}

#[derive(Debug)]
struct Bucket {
    window_start: Instant,
    count: u32,
}

/// Process-local fixed-window counters
#[derive(Default)]
pub struct RateLimiter {
    buckets: DashMap<String, Bucket>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit or reject one request for `identity` under `policy`
    pub fn check(&self, identity: &str, policy: &RateLimitPolicy) -> Decision {
        let key = format!("{}:{}", policy.name, identity);
        let now = Instant::now();

        let mut bucket = self.buckets.entry(key).or_insert_with(|| Bucket {
            window_start: now,
            count: 0,
        });

        if now.duration_since(bucket.window_start) >= policy.window {
            bucket.window_start = now;
            bucket.count = 0;
        }

        let elapsed = now.duration_since(bucket.window_start);
        let retry_after_secs = policy.window.saturating_sub(elapsed).as_secs().max(1);

        if bucket.count >= policy.max_requests {
            return Decision {
                allowed: false,
                remaining: 0,
                retry_after_secs,
            };
        }

        bucket.count += 1;
        Decision {
            allowed: true,
            remaining: policy.max_requests - bucket.count,
            retry_after_secs,
        }
    }

    /// Evict buckets whose window lapsed more than `max_age` ago
    pub fn sweep_expired(&self, max_age: Duration) {
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.window_start) < max_age);
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_over_the_limit_are_rejected_with_retry_after() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::strict(10, 60);

        for i in 0..10 {
            let decision = limiter.check("1.2.3.4", &policy);
            assert!(decision.allowed, "request {} should pass", i);
        }

        let eleventh = limiter.check("1.2.3.4", &policy);
        assert!(!eleventh.allowed);
        assert_eq!(eleventh.remaining, 0);
        assert!(eleventh.retry_after_secs >= 1);
        assert!(eleventh.retry_after_secs <= 60);
    }

    #[test]
    fn identities_do_not_share_buckets() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::strict(1, 60);

        assert!(limiter.check("1.2.3.4", &policy).allowed);
        assert!(!limiter.check("1.2.3.4", &policy).allowed);
        assert!(limiter.check("5.6.7.8", &policy).allowed);
    }

    #[test]
    fn tiers_do_not_share_buckets() {
        let limiter = RateLimiter::new();
        let strict = RateLimitPolicy::strict(1, 60);
        let standard = RateLimitPolicy::standard(100, 60);

        assert!(limiter.check("1.2.3.4", &strict).allowed);
        assert!(!limiter.check("1.2.3.4", &strict).allowed);
        assert!(limiter.check("1.2.3.4", &standard).allowed);
    }

    #[test]
    fn window_lapse_resets_the_counter() {
        let limiter = RateLimiter::new();
        // Zero-length window: every check starts a fresh window
        let policy = RateLimitPolicy::strict(1, 0);

        assert!(limiter.check("1.2.3.4", &policy).allowed);
        assert!(limiter.check("1.2.3.4", &policy).allowed);
    }

    #[test]
    fn sweep_evicts_lapsed_buckets() {
        let limiter = RateLimiter::new();
        let policy = RateLimitPolicy::standard(10, 0);
        limiter.check("1.2.3.4", &policy);
        limiter.check("5.6.7.8", &policy);
        assert_eq!(limiter.bucket_count(), 2);

        limiter.sweep_expired(Duration::from_secs(0));
        assert_eq!(limiter.bucket_count(), 0);
    }
}
