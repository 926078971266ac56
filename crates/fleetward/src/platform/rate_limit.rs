use std::num::NonZeroU32;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Utc;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use tokio::time::Instant;

use super::types::RateLimitInfo;

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Default pacing for the hosting API.
pub mod rate_limits {
    /// GitHub allows 5000 requests/hour per token; 10/sec keeps bursts short.
    pub const GITHUB_DEFAULT_RPS: u32 = 10;

    /// Below this share of the hourly budget, remaining requests are spread
    /// evenly until the window resets.
    pub const LOW_BUDGET_FRACTION: f64 = 0.1;
}

#[derive(Debug, Default)]
struct Pacing {
    /// No request may start before this instant.
    hold_until: Option<Instant>,
    /// Minimum gap between consecutive requests while the budget is low.
    spacing: Option<Duration>,
    last_request: Option<Instant>,
}

/// Token bucket that also follows the server's `x-ratelimit-*` headers.
///
/// The bucket (governor) caps the steady request rate. On top of that,
/// [`update`](Self::update) feeds in what the server reported: an exhausted
/// budget holds every request until the reset time, a low budget spreads the
/// remaining requests over the rest of the window, and `Retry-After` holds
/// requests for the requested duration.
#[derive(Clone)]
pub struct AdaptiveRateLimiter {
    bucket: Arc<GovernorRateLimiter>,
    pacing: Arc<Mutex<Pacing>>,
    rps: u32,
}

impl AdaptiveRateLimiter {
    /// Create a limiter allowing `requests_per_second` (0 is treated as 1).
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            bucket: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
            pacing: Arc::new(Mutex::new(Pacing::default())),
            rps: rps.get(),
        }
    }

    pub fn requests_per_second(&self) -> u32 {
        self.rps
    }

    /// Wait until the next request is allowed.
    pub async fn wait(&self) {
        if let Some(delay) = self.pending_delay(Instant::now()) {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Pacing API request");
            tokio::time::sleep(delay).await;
        }
        self.bucket.until_ready().await;
        self.pacing().last_request = Some(Instant::now());
    }

    /// Feed rate limit headers from a response into the pacing state.
    pub fn update(&self, info: &RateLimitInfo) {
        let now = Instant::now();
        let until_reset = (info.reset_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        let mut pacing = self.pacing();
        if let Some(retry_after) = info.retry_after {
            extend_hold(&mut pacing, now + retry_after);
        }

        if info.remaining == 0 {
            extend_hold(&mut pacing, now + until_reset);
            pacing.spacing = None;
        } else if info.limit > 0
            && (info.remaining as f64) < info.limit as f64 * rate_limits::LOW_BUDGET_FRACTION
        {
            let remaining = u32::try_from(info.remaining).unwrap_or(u32::MAX);
            pacing.spacing = Some(until_reset / remaining);
        } else {
            pacing.spacing = None;
        }
    }

    /// Hold all requests for `duration` from now.
    pub fn hold_for(&self, duration: Duration) {
        let mut pacing = self.pacing();
        extend_hold(&mut pacing, Instant::now() + duration);
    }

    fn pending_delay(&self, now: Instant) -> Option<Duration> {
        let pacing = self.pacing();
        let held = pacing
            .hold_until
            .and_then(|until| until.checked_duration_since(now));
        let spaced = match (pacing.spacing, pacing.last_request) {
            (Some(gap), Some(last)) => (last + gap).checked_duration_since(now),
            _ => None,
        };
        held.into_iter()
            .chain(spaced)
            .filter(|d| !d.is_zero())
            .max()
    }

    fn pacing(&self) -> MutexGuard<'_, Pacing> {
        self.pacing.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn extend_hold(pacing: &mut Pacing, until: Instant) {
    pacing.hold_until = Some(match pacing.hold_until {
        Some(existing) if existing > until => existing,
        _ => until,
    });
}
