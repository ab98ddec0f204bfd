//! Per-client token bucket rate limiting.
//!
//! Buckets refill lazily on access, so there is no background task and an
//! idle client costs nothing. A batch of N commands costs N tokens up
//! front; a client cannot sidestep the limit by packing commands into one
//! request.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use tracing::debug;

/// Outcome of an acquisition attempt.
#[derive(Debug, PartialEq)]
pub enum RateDecision {
    /// Tokens were deducted; proceed.
    Allowed,

    /// Not enough tokens; retry after the given number of seconds.
    Limited { retry_after_secs: u64 },
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket limiter keyed by client identity.
pub struct RateLimiter {
    capacity: f64,
    refill_per_sec: f64,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    /// Create a limiter where each client starts with `capacity` tokens and
    /// regains `refill_per_sec` tokens per second up to the cap.
    pub fn new(capacity: f64, refill_per_sec: f64) -> Self {
        Self {
            capacity,
            refill_per_sec,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Try to take `cost` tokens from `key`'s bucket.
    pub fn try_acquire(&self, key: &str, cost: u32) -> RateDecision {
        let cost = f64::from(cost);
        let now = Instant::now();

        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            // A poisoned lock means a panic mid-update; the map holds only
            // counters, so keep serving with whatever state is there.
            Err(poisoned) => poisoned.into_inner(),
        };

        let bucket = buckets.entry(key.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= cost {
            bucket.tokens -= cost;
            RateDecision::Allowed
        } else {
            let deficit = cost - bucket.tokens;
            let retry_after_secs = (deficit / self.refill_per_sec).ceil() as u64;
            debug!("rate limited key={key} deficit={deficit:.1}");
            RateDecision::Limited { retry_after_secs }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn capacity_is_honored() {
        let limiter = RateLimiter::new(3.0, 0.001);

        for _ in 0..3 {
            assert_eq!(limiter.try_acquire("a", 1), RateDecision::Allowed);
        }
        assert!(matches!(
            limiter.try_acquire("a", 1),
            RateDecision::Limited { .. }
        ));
    }

    #[test]
    fn batch_cost_is_charged_up_front() {
        let limiter = RateLimiter::new(5.0, 0.001);

        assert!(matches!(
            limiter.try_acquire("a", 6),
            RateDecision::Limited { .. }
        ));
        // The failed attempt did not deduct anything.
        assert_eq!(limiter.try_acquire("a", 5), RateDecision::Allowed);
    }

    #[test]
    fn keys_are_isolated() {
        let limiter = RateLimiter::new(1.0, 0.001);

        assert_eq!(limiter.try_acquire("a", 1), RateDecision::Allowed);
        assert_eq!(limiter.try_acquire("b", 1), RateDecision::Allowed);
    }

    #[test]
    fn retry_hint_reflects_refill_rate() {
        let limiter = RateLimiter::new(1.0, 0.5);
        assert_eq!(limiter.try_acquire("a", 1), RateDecision::Allowed);

        match limiter.try_acquire("a", 1) {
            RateDecision::Limited { retry_after_secs } => {
                // One token at 0.5/s takes about two seconds.
                assert!((1..=2).contains(&retry_after_secs));
            }
            RateDecision::Allowed => panic!("expected a limit"),
        }
    }
}
