//! URL frontier: the deduplicating, capped FIFO work queue of a crawl run
//!
//! Every URL moves through `queued -> in flight -> visited` (or `skipped` when
//! robots.txt forbids it). Admission checks and state moves happen under one
//! lock, so two workers discovering the same link cannot both admit it.

use crate::{Result, SweepError};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;
use url::Url;

#[derive(Debug, Default)]
struct FrontierState {
    queue: VecDeque<Url>,
    queued: HashSet<String>,
    in_flight: HashSet<String>,
    visited: HashSet<String>,
    skipped: HashSet<String>,
    aborted: bool,
}

impl FrontierState {
    /// URLs counted against the page cap
    fn admitted(&self) -> usize {
        self.queued.len() + self.in_flight.len() + self.visited.len()
    }

    fn is_known(&self, key: &str) -> bool {
        self.queued.contains(key)
            || self.in_flight.contains(key)
            || self.visited.contains(key)
            || self.skipped.contains(key)
    }
}

/// Point-in-time counts, for logging and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierStats {
    pub queued: usize,
    pub in_flight: usize,
    pub visited: usize,
    pub skipped: usize,
}

impl FrontierStats {
    pub fn admitted(&self) -> usize {
        self.queued + self.in_flight + self.visited
    }
}

/// The run-scoped URL frontier
///
/// At any moment, queued + in-flight + visited URLs never exceed `max_pages`.
/// Skipped URLs leave that count but are remembered, so they are never
/// re-admitted.
pub struct Frontier {
    state: Mutex<FrontierState>,
    changed: Notify,
    max_pages: usize,
}

impl Frontier {
    /// Creates an empty frontier that admits at most `max_pages` URLs
    pub fn new(max_pages: usize) -> Self {
        Self {
            state: Mutex::new(FrontierState::default()),
            changed: Notify::new(),
            max_pages,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, FrontierState>> {
        self.state
            .lock()
            .map_err(|_| SweepError::Frontier("frontier lock poisoned".to_string()))
    }

    /// Seeds the frontier: the start URL first, then sitemap URLs in order
    ///
    /// The start URL is always admitted, so it is crawled even with
    /// `max_pages = 1`. Sitemap URLs fill the remaining `max_pages - 1` slots.
    ///
    /// # Returns
    ///
    /// The number of URLs admitted
    pub fn seed(&self, start_url: &Url, sitemap_urls: &[Url]) -> Result<usize> {
        let mut admitted = usize::from(self.enqueue(start_url)?);

        for url in sitemap_urls {
            if self.is_full()? {
                tracing::debug!(
                    "Page cap of {} reached while seeding, {} sitemap URLs left out",
                    self.max_pages,
                    sitemap_urls.len() - admitted.saturating_sub(1)
                );
                break;
            }
            if self.enqueue(url)? {
                admitted += 1;
            }
        }

        Ok(admitted)
    }

    /// Admits a URL if it is unknown and the page cap has room
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The URL was appended to the queue
    /// * `Ok(false)` - Already known, or the cap is reached
    pub fn enqueue(&self, url: &Url) -> Result<bool> {
        let key = url.as_str();
        let mut state = self.lock()?;

        if state.is_known(key) || state.admitted() >= self.max_pages {
            return Ok(false);
        }

        state.queued.insert(key.to_string());
        state.queue.push_back(url.clone());
        drop(state);

        self.changed.notify_waiters();
        Ok(true)
    }

    /// Takes the next URL in FIFO order, marking it in flight
    ///
    /// Waits while the queue is empty but other URLs are still in flight, since
    /// they may yet discover new links.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(url))` - A URL to process
    /// * `Ok(None)` - Nothing is queued or in flight, or the frontier was aborted
    pub async fn next(&self) -> Result<Option<Url>> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock()?;
                if state.aborted {
                    return Ok(None);
                }
                if let Some(url) = state.queue.pop_front() {
                    let key = url.as_str().to_string();
                    state.queued.remove(&key);
                    state.in_flight.insert(key);
                    return Ok(Some(url));
                }
                if state.in_flight.is_empty() {
                    return Ok(None);
                }
            }

            notified.await;
        }
    }

    /// Records that an in-flight URL has been processed
    pub fn mark_visited(&self, url: &Url) -> Result<()> {
        let key = url.as_str();
        let mut state = self.lock()?;
        state.in_flight.remove(key);
        state.visited.insert(key.to_string());
        drop(state);

        self.changed.notify_waiters();
        Ok(())
    }

    /// Releases an in-flight URL without visiting it
    ///
    /// Used for robots.txt disallowed URLs: they free their slot under the cap
    /// and are never admitted again.
    pub fn skip(&self, url: &Url) -> Result<()> {
        let key = url.as_str();
        let mut state = self.lock()?;
        state.in_flight.remove(key);
        state.skipped.insert(key.to_string());
        drop(state);

        self.changed.notify_waiters();
        Ok(())
    }

    /// Stops the frontier: every current and future `next()` returns `None`
    ///
    /// Called when a worker exits abnormally and may have left its URL in
    /// flight forever.
    pub fn abort(&self) {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.aborted = true;
        drop(state);

        self.changed.notify_waiters();
    }

    /// True once `max_pages` URLs have been admitted
    pub fn is_full(&self) -> Result<bool> {
        Ok(self.lock()?.admitted() >= self.max_pages)
    }

    /// Returns true if the URL has been visited
    pub fn is_visited(&self, url: &Url) -> Result<bool> {
        Ok(self.lock()?.visited.contains(url.as_str()))
    }

    pub fn stats(&self) -> Result<FrontierStats> {
        let state = self.lock()?;
        Ok(FrontierStats {
            queued: state.queued.len(),
            in_flight: state.in_flight.len(),
            visited: state.visited.len(),
            skipped: state.skipped.len(),
        })
    }
}
