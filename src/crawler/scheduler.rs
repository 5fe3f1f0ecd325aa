//! Request pacing for a crawl run
//!
//! This module handles:
//! - Spacing request starts by the effective crawl delay, across all workers
//! - Tracking consecutive page failures and pausing when the host looks unstable

use crate::robots::MAX_CRAWL_DELAY;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound on a single backoff pause
pub const MAX_BACKOFF: Duration = Duration::from_millis(5_000);

/// Base unit of the exponential backoff
const BACKOFF_BASE_MS: u64 = 1_000;

/// Shared pacing state for all workers of one crawl
///
/// Each worker calls [`Scheduler::wait_for_slot`] before a request. Slots are
/// reserved under a lock, so request starts are at least `crawl_delay` apart
/// no matter how many workers are racing.
pub struct Scheduler {
    crawl_delay: Duration,
    max_consecutive_errors: u32,
    last_slot: Mutex<Option<Instant>>,
    consecutive_errors: Mutex<u32>,
}

impl Scheduler {
    /// Creates a scheduler
    ///
    /// # Arguments
    ///
    /// * `crawl_delay` - Minimum spacing between consecutive request starts,
    ///   clamped to [`MAX_CRAWL_DELAY`]
    /// * `max_consecutive_errors` - Failures in a row that trigger a pause
    pub fn new(crawl_delay: Duration, max_consecutive_errors: u32) -> Self {
        Self {
            crawl_delay: crawl_delay.min(MAX_CRAWL_DELAY),
            max_consecutive_errors: max_consecutive_errors.max(1),
            last_slot: Mutex::new(None),
            consecutive_errors: Mutex::new(0),
        }
    }

    /// Reserves the next request slot and sleeps until it opens
    ///
    /// The first request starts immediately. Every following slot is
    /// `max(now, previous_slot + crawl_delay)`.
    pub async fn wait_for_slot(&self) {
        let now = Instant::now();
        let slot = self.reserve_slot(now);
        if slot > now {
            tracing::trace!("Throttling for {:?}", slot - now);
        }
        tokio::time::sleep_until(slot).await;
    }

    fn reserve_slot(&self, now: Instant) -> Instant {
        let mut last = match self.last_slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let slot = match *last {
            Some(previous) => previous
                .checked_add(self.crawl_delay)
                .map_or(now, |next| next.max(now)),
            None => now,
        };
        *last = Some(slot);
        slot
    }

    /// Records a successful page and resets the failure streak
    pub fn record_success(&self) {
        *self.errors() = 0;
    }

    /// Records a failed page
    ///
    /// # Returns
    ///
    /// The pause the caller must take before continuing, once the streak has
    /// reached the threshold. The streak is reset when a pause is returned.
    pub fn record_failure(&self) -> Option<Duration> {
        let mut errors = self.errors();
        *errors += 1;

        if *errors < self.max_consecutive_errors {
            return None;
        }

        let pause = backoff_delay(*errors, self.max_consecutive_errors);
        *errors = 0;
        Some(pause)
    }

    /// Records a failed page and sleeps through any backoff it triggers
    pub async fn record_failure_and_wait(&self) {
        if let Some(pause) = self.record_failure() {
            tracing::warn!(
                "{} consecutive failures, backing off for {:?}",
                self.max_consecutive_errors,
                pause
            );
            tokio::time::sleep(pause).await;
        }
    }

    pub fn consecutive_errors(&self) -> u32 {
        *self.errors()
    }

    fn errors(&self) -> std::sync::MutexGuard<'_, u32> {
        match self.consecutive_errors.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Computes `min(5s, 1s * 2^(errors - threshold))`
pub fn backoff_delay(errors: u32, threshold: u32) -> Duration {
    let exponent = errors.saturating_sub(threshold).min(16);
    let millis = BACKOFF_BASE_MS.saturating_mul(1u64 << exponent);
    Duration::from_millis(millis).min(MAX_BACKOFF)
}
