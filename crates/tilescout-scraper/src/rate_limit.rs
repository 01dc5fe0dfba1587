//! Request pacing for the listings site.
//!
//! The site is crawled one request at a time with a fixed minimum gap
//! between consecutive requests. There is no retry or backoff: the spacing
//! is the only mechanism used to stay under the site's rate limits.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Enforces a minimum quiet period between consecutive outbound requests.
///
/// The gap is measured from the moment the previous request finished (its
/// body read or its error returned) to the start of the next one, so a slow
/// response never eats into the spacing. Callers pair every
/// [`Throttle::wait_turn`] with a [`Throttle::finish`]. The first request
/// never waits.
#[derive(Debug)]
pub(crate) struct Throttle {
    min_spacing: Duration,
    last_finished: Mutex<Option<Instant>>,
}

impl Throttle {
    pub(crate) fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_finished: Mutex::new(None),
        }
    }

    pub(crate) fn min_spacing(&self) -> Duration {
        self.min_spacing
    }

    /// Sleeps until at least `min_spacing` has passed since the previous
    /// request finished.
    pub(crate) async fn wait_turn(&self) {
        let wait = {
            let last = self
                .last_finished
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            last.map_or(Duration::ZERO, |prev| {
                self.min_spacing
                    .saturating_sub(Instant::now().saturating_duration_since(prev))
            })
        };

        if !wait.is_zero() {
            tracing::trace!(wait_ms = wait.as_millis(), "pacing next request");
            tokio::time::sleep(wait).await;
        }
    }

    /// Marks the current request as finished; the next gap starts now.
    pub(crate) fn finish(&self) {
        *self
            .last_finished
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
    }
}
