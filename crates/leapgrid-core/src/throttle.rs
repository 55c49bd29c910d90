//! Rate-limit adherence for the upstream API.
//!
//! Two layers: a local per-minute pacing quota (so a long symbol loop never
//! bursts past the upstream budget), and adherence to the upstream's own
//! `X-Ratelimit-Available` / `X-Ratelimit-Expiry` response headers. When the
//! previous response says the window is nearly spent, the next call waits for
//! the window to roll over instead of eating a guaranteed 429.

use std::num::NonZeroU32;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::http_client::HttpResponse;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Upstream sleep ceiling; we never block longer than this on header adherence.
const MAX_HEADER_PAUSE: Duration = Duration::from_secs(5);

/// Pacing delay applied when the local quota is momentarily exhausted.
const LOCAL_PACING_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy)]
struct RateWindow {
    available: i64,
    /// Window expiry as epoch milliseconds, as reported by the upstream.
    expiry_epoch_ms: i64,
}

/// Tracks local pacing quota and the upstream's reported rate-limit window.
#[derive(Clone)]
pub struct RateGate {
    limiter: Arc<DirectRateLimiter>,
    window: Arc<Mutex<Option<RateWindow>>>,
}

impl RateGate {
    pub fn new(requests_per_minute: u32) -> Self {
        let burst = NonZeroU32::new(requests_per_minute.max(1))
            .expect("requests_per_minute is clamped to at least 1");
        Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_minute(burst))),
            window: Arc::new(Mutex::new(None)),
        }
    }

    /// Records the rate-limit headers of a completed response, if present.
    pub fn record(&self, response: &HttpResponse) {
        let available = response
            .header("x-ratelimit-available")
            .and_then(|v| v.trim().parse::<i64>().ok());
        let expiry = response
            .header("x-ratelimit-expiry")
            .and_then(|v| v.trim().parse::<i64>().ok());

        if let (Some(available), Some(expiry_epoch_ms)) = (available, expiry) {
            let mut window = self
                .window
                .lock()
                .expect("rate window lock should not be poisoned");
            *window = Some(RateWindow {
                available,
                expiry_epoch_ms,
            });
        }
    }

    /// Recommended pause before the next call, or `None` when clear to go.
    pub fn pause_before_call(&self) -> Option<Duration> {
        if let Some(pause) = self.header_pause(epoch_ms_now()) {
            return Some(pause);
        }
        if self.limiter.check().is_err() {
            return Some(LOCAL_PACING_DELAY);
        }
        None
    }

    fn header_pause(&self, now_epoch_ms: i64) -> Option<Duration> {
        let window = self
            .window
            .lock()
            .expect("rate window lock should not be poisoned");
        let window = (*window)?;

        if window.available > 1 || window.expiry_epoch_ms <= now_epoch_ms {
            return None;
        }

        let remaining_ms = (window.expiry_epoch_ms - now_epoch_ms) as u64;
        Some(Duration::from_millis(remaining_ms).min(MAX_HEADER_PAUSE))
    }
}

fn epoch_ms_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
