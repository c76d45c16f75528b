//! Login attempt throttling over a concurrent map of fixed-window buckets.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use domains::LoginThrottle;

struct Bucket {
    hits: u32,
    window_start: Instant,
}

/// Allows `max_attempts` failures per key within `window`, then locks the
/// key out until the window that started with the first failure has passed.
/// Expired buckets are dropped when looked up and swept once per window.
pub struct MemoryLoginThrottle {
    buckets: DashMap<String, Bucket>,
    max_attempts: u32,
    window: Duration,
    last_sweep: Mutex<Instant>,
}

impl MemoryLoginThrottle {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            buckets: DashMap::new(),
            max_attempts,
            window,
            last_sweep: Mutex::new(Instant::now()),
        }
    }

    fn remaining(&self, bucket: &Bucket, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(bucket.window_start);
        (elapsed < self.window).then(|| self.window - elapsed)
    }

    fn sweep_stale(&self, now: Instant) {
        {
            let mut last = self.last_sweep.lock().unwrap_or_else(PoisonError::into_inner);
            if now.saturating_duration_since(*last) < self.window {
                return;
            }
            *last = now;
        }
        let before = self.buckets.len();
        self.buckets
            .retain(|_, bucket| self.remaining(bucket, now).is_some());
        let removed = before.saturating_sub(self.buckets.len());
        if removed > 0 {
            tracing::debug!(removed, "swept stale login throttle buckets");
        }
    }
}

#[async_trait]
impl LoginThrottle for MemoryLoginThrottle {
    async fn too_many_attempts(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        {
            let bucket = self.buckets.get(key)?;
            if let Some(wait) = self.remaining(&bucket, now) {
                return (bucket.hits >= self.max_attempts).then_some(wait);
            }
        }
        self.buckets
            .remove_if(key, |_, bucket| self.remaining(bucket, now).is_none());
        None
    }

    async fn hit(&self, key: &str) {
        let now = Instant::now();
        self.sweep_stale(now);
        let mut bucket = self.buckets.entry(key.to_string()).or_insert(Bucket {
            hits: 0,
            window_start: now,
        });
        if self.remaining(&bucket, now).is_none() {
            bucket.hits = 0;
            bucket.window_start = now;
        }
        bucket.hits += 1;
    }

    async fn clear(&self, key: &str) {
        self.buckets.remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_out_after_max_attempts() {
        let throttle = MemoryLoginThrottle::new(3, Duration::from_secs(60));
        tokio_test::block_on(async {
            for _ in 0..2 {
                throttle.hit("steve|127.0.0.1").await;
            }
            assert_eq!(throttle.too_many_attempts("steve|127.0.0.1").await, None);

            throttle.hit("steve|127.0.0.1").await;
            let wait = throttle.too_many_attempts("steve|127.0.0.1").await.unwrap();
            assert!(wait <= Duration::from_secs(60) && wait > Duration::from_secs(50));

            assert_eq!(throttle.too_many_attempts("steve|10.0.0.1").await, None);
        });
    }

    #[test]
    fn clearing_resets_the_key() {
        let throttle = MemoryLoginThrottle::new(1, Duration::from_secs(60));
        tokio_test::block_on(async {
            throttle.hit("tony|::1").await;
            assert!(throttle.too_many_attempts("tony|::1").await.is_some());
            throttle.clear("tony|::1").await;
            assert!(throttle.too_many_attempts("tony|::1").await.is_none());
        });
    }

    #[tokio::test]
    async fn windows_expire() {
        let throttle = MemoryLoginThrottle::new(1, Duration::from_millis(20));
        throttle.hit("bruce|::1").await;
        assert!(throttle.too_many_attempts("bruce|::1").await.is_some());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(throttle.too_many_attempts("bruce|::1").await.is_none());
    }

    #[tokio::test]
    async fn expired_buckets_are_dropped() {
        let throttle = MemoryLoginThrottle::new(1, Duration::from_millis(20));
        throttle.hit("ghost-1|198.51.100.1").await;
        throttle.hit("ghost-2|198.51.100.2").await;
        assert_eq!(throttle.buckets.len(), 2);
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(throttle.too_many_attempts("ghost-1|198.51.100.1").await.is_none());
        assert!(!throttle.buckets.contains_key("ghost-1|198.51.100.1"));

        // The next failure sweeps every other stale key.
        throttle.hit("natasha|::1").await;
        assert!(!throttle.buckets.contains_key("ghost-2|198.51.100.2"));
        assert_eq!(throttle.buckets.len(), 1);
    }
}
