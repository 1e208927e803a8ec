// Politeness throttling for outbound requests.
//
// `Throttled` wraps any `PageFetcher` and waits after every call: a fixed
// delay after a rendered page, a uniformly random delay after a table fetch.
// The wait happens whether or not the call succeeded. There is no backoff.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;

use crate::fetch::{FetchError, PageFetcher};
use crate::table::Table;

// ---------------------------------------------------------------------------
// RateLimiter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiter {
    rendered_delay: Duration,
    table_delay_min: Duration,
    table_delay_max: Duration,
}

impl RateLimiter {
    /// `table_delay_min` and `table_delay_max` are swapped if given out of
    /// order.
    pub fn new(rendered_delay: Duration, table_delay_min: Duration, table_delay_max: Duration) -> Self {
        let (table_delay_min, table_delay_max) = if table_delay_min <= table_delay_max {
            (table_delay_min, table_delay_max)
        } else {
            (table_delay_max, table_delay_min)
        };
        Self {
            rendered_delay,
            table_delay_min,
            table_delay_max,
        }
    }

    pub fn from_secs(rendered: f64, table_min: f64, table_max: f64) -> Self {
        Self::new(
            Duration::from_secs_f64(rendered.max(0.0)),
            Duration::from_secs_f64(table_min.max(0.0)),
            Duration::from_secs_f64(table_max.max(0.0)),
        )
    }

    /// No waiting at all.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    pub fn rendered_delay(&self) -> Duration {
        self.rendered_delay
    }

    /// A random delay in `[table_delay_min, table_delay_max]`.
    pub fn table_delay(&self) -> Duration {
        if self.table_delay_min == self.table_delay_max {
            return self.table_delay_min;
        }
        let secs = rand::thread_rng().gen_range(
            self.table_delay_min.as_secs_f64()..=self.table_delay_max.as_secs_f64(),
        );
        Duration::from_secs_f64(secs)
    }

    async fn pause(delay: Duration) {
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis() as u64, "throttling");
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(2),
            Duration::from_secs(1),
            Duration::from_secs(3),
        )
    }
}

// ---------------------------------------------------------------------------
// Throttled fetcher
// ---------------------------------------------------------------------------

/// A `PageFetcher` decorator applying a `RateLimiter` after every request.
pub struct Throttled<F> {
    inner: F,
    limiter: RateLimiter,
}

impl<F: PageFetcher> Throttled<F> {
    pub fn new(inner: F, limiter: RateLimiter) -> Self {
        Self { inner, limiter }
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

#[async_trait]
impl<F: PageFetcher> PageFetcher for Throttled<F> {
    async fn fetch_tables(&self, url: &str) -> Result<Vec<Table>, FetchError> {
        let result = self.inner.fetch_tables(url).await;
        let delay = self.limiter.table_delay();
        RateLimiter::pause(delay).await;
        result
    }

    async fn fetch_rendered_page(&self, url: &str) -> Result<String, FetchError> {
        let result = self.inner.fetch_rendered_page(url).await;
        RateLimiter::pause(self.limiter.rendered_delay).await;
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    struct StaticFetcher;

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch_tables(&self, _url: &str) -> Result<Vec<Table>, FetchError> {
            Ok(Vec::new())
        }

        async fn fetch_rendered_page(&self, url: &str) -> Result<String, FetchError> {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 503,
            })
        }
    }

    #[test]
    fn table_delay_within_bounds() {
        let limiter = RateLimiter::default();
        for _ in 0..100 {
            let d = limiter.table_delay();
            assert!(d >= Duration::from_secs(1) && d <= Duration::from_secs(3), "{d:?}");
        }
    }

    #[test]
    fn reversed_bounds_are_swapped() {
        let limiter = RateLimiter::from_secs(0.0, 5.0, 1.0);
        let d = limiter.table_delay();
        assert!(d >= Duration::from_secs(1) && d <= Duration::from_secs(5));
    }

    #[test]
    fn equal_bounds_give_fixed_delay() {
        let limiter = RateLimiter::from_secs(0.0, 1.5, 1.5);
        assert_eq!(limiter.table_delay(), Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn rendered_page_waits_fixed_delay_even_on_failure() {
        let fetcher = Throttled::new(StaticFetcher, RateLimiter::default());
        let start = Instant::now();
        assert!(fetcher.fetch_rendered_page("u").await.is_err());
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(2) && waited < Duration::from_millis(2010));
    }

    #[tokio::test(start_paused = true)]
    async fn table_fetch_waits_jittered_delay() {
        let fetcher = Throttled::new(StaticFetcher, RateLimiter::default());
        let start = Instant::now();
        fetcher.fetch_tables("u").await.unwrap();
        let waited = start.elapsed();
        assert!(waited >= Duration::from_secs(1) && waited < Duration::from_millis(3010));
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_limiter_never_sleeps() {
        let fetcher = Throttled::new(StaticFetcher, RateLimiter::disabled());
        let start = Instant::now();
        fetcher.fetch_tables("u").await.unwrap();
        let _ = fetcher.fetch_rendered_page("u").await;
        assert!(start.elapsed() < Duration::from_millis(1));
    }
}
