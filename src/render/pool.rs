//! Bounded pool of headless browser instances
//!
//! Lifecycle of a pooled instance: `created -> idle <-> leased -> destroyed`.
//! A semaphore permit is held for every lease, so no more than `max_size`
//! instances are ever live. Idle instances are validated (connected, younger
//! than `max_age`) on every lease attempt and destroyed rather than handed out
//! when they fail.

use super::{BrowserInstance, RenderError, RenderingEngine};
use crate::config::RenderingConfig;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Pool tuning
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub max_size: usize,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_age: Duration,

    /// Hard lifetime after which an instance closes itself regardless of pool
    /// bookkeeping
    pub self_destruct_after: Duration,

    pub launch_args: Vec<String>,
}

impl PoolSettings {
    pub fn from_config(config: &RenderingConfig) -> Self {
        Self {
            max_size: config.max_pool_size.max(1),
            acquire_timeout: Duration::from_millis(config.acquire_timeout_ms),
            idle_timeout: Duration::from_millis(config.idle_timeout_ms),
            max_age: Duration::from_millis(config.max_instance_age_ms),
            self_destruct_after: Duration::from_millis(config.self_destruct_ms),
            launch_args: super::hardening_args(),
        }
    }
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self::from_config(&RenderingConfig::default())
    }
}

struct PooledBrowser {
    id: u64,
    instance: Arc<dyn BrowserInstance>,
    created_at: Instant,
    idle_since: Instant,
    destruct_timer: JoinHandle<()>,
}

struct PoolInner {
    engine: Arc<dyn RenderingEngine>,
    settings: PoolSettings,
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<PooledBrowser>>,
    live: AtomicUsize,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl PoolInner {
    fn idle(&self) -> MutexGuard<'_, VecDeque<PooledBrowser>> {
        match self.idle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    async fn destroy(&self, entry: PooledBrowser) {
        entry.destruct_timer.abort();
        if let Err(e) = entry.instance.close().await {
            tracing::warn!("Failed to close browser {}: {}", entry.id, e);
        }
        self.live.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!("Destroyed browser {}", entry.id);
    }
}

/// Shared handle to a browser pool
#[derive(Clone)]
pub struct BrowserPool {
    inner: Arc<PoolInner>,
}

impl BrowserPool {
    pub fn new(engine: Arc<dyn RenderingEngine>, settings: PoolSettings) -> Self {
        let max_size = settings.max_size.max(1);
        Self {
            inner: Arc::new(PoolInner {
                engine,
                permits: Arc::new(Semaphore::new(max_size)),
                settings: PoolSettings { max_size, ..settings },
                idle: Mutex::new(VecDeque::new()),
                live: AtomicUsize::new(0),
                next_id: AtomicU64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Leases a validated instance, creating one if none is idle
    ///
    /// # Errors
    ///
    /// * `AcquireTimeout` - Every slot stayed leased for `acquire_timeout`
    /// * `PoolClosed` - The pool was shut down
    /// * Launch errors from the engine when a fresh instance is needed
    pub async fn acquire(&self) -> Result<BrowserLease, RenderError> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(RenderError::PoolClosed);
        }

        let timeout = self.inner.settings.acquire_timeout;
        let permit = match tokio::time::timeout(timeout, Arc::clone(&self.inner.permits).acquire_owned()).await {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(RenderError::PoolClosed),
            Err(_) => return Err(RenderError::AcquireTimeout(timeout)),
        };

        self.evict_idle().await;

        loop {
            let candidate = self.inner.idle().pop_back();

            let entry = match candidate {
                Some(entry) if self.is_valid(&entry) => entry,
                Some(stale) => {
                    tracing::debug!("Browser {} failed validation, replacing it", stale.id);
                    self.inner.destroy(stale).await;
                    continue;
                }
                None => self.create().await?,
            };

            return Ok(BrowserLease {
                entry: Some(entry),
                inner: Arc::clone(&self.inner),
                _permit: permit,
            });
        }
    }

    /// Runs `f` with a leased instance and releases the lease afterwards,
    /// whatever `f` returns
    pub async fn with_instance<F, Fut, T>(&self, f: F) -> Result<T, RenderError>
    where
        F: FnOnce(Arc<dyn BrowserInstance>) -> Fut,
        Fut: Future<Output = Result<T, RenderError>>,
    {
        let lease = self.acquire().await?;
        let result = f(Arc::clone(lease.instance())).await;
        drop(lease);
        result
    }

    /// Destroys idle instances that have sat unused for `idle_timeout`
    pub async fn evict_idle(&self) {
        let idle_timeout = self.inner.settings.idle_timeout;
        let expired: Vec<PooledBrowser> = {
            let mut idle = self.inner.idle();
            let (expired, kept): (Vec<_>, Vec<_>) = idle
                .drain(..)
                .partition(|entry| entry.idle_since.elapsed() >= idle_timeout);
            idle.extend(kept);
            expired
        };

        for entry in expired {
            tracing::debug!("Evicting idle browser {}", entry.id);
            self.inner.destroy(entry).await;
        }
    }

    /// Closes every idle instance and refuses further leases
    ///
    /// Instances currently leased are destroyed when their lease ends.
    pub async fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.permits.close();

        let idle: Vec<PooledBrowser> = self.inner.idle().drain(..).collect();
        for entry in idle {
            self.inner.destroy(entry).await;
        }
        tracing::debug!("Browser pool shut down");
    }

    /// Instances created and not yet destroyed
    pub fn live_count(&self) -> usize {
        self.inner.live.load(Ordering::SeqCst)
    }

    pub fn idle_count(&self) -> usize {
        self.inner.idle().len()
    }

    fn is_valid(&self, entry: &PooledBrowser) -> bool {
        entry.instance.is_connected() && entry.created_at.elapsed() < self.inner.settings.max_age
    }

    async fn create(&self) -> Result<PooledBrowser, RenderError> {
        let settings = &self.inner.settings;
        let instance = self.inner.engine.launch(&settings.launch_args).await?;
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.inner.live.fetch_add(1, Ordering::SeqCst);

        let destruct_timer = {
            let instance = Arc::clone(&instance);
            let after = settings.self_destruct_after;
            tokio::spawn(async move {
                tokio::time::sleep(after).await;
                tracing::warn!("Browser {} reached its self-destruct deadline, closing", id);
                if let Err(e) = instance.close().await {
                    tracing::warn!("Self-destruct close of browser {} failed: {}", id, e);
                }
            })
        };

        tracing::debug!("Launched browser {}", id);

        let now = Instant::now();
        Ok(PooledBrowser {
            id,
            instance,
            created_at: now,
            idle_since: now,
            destruct_timer,
        })
    }
}

/// Exclusive use of one pooled instance
///
/// Dropping the lease returns the instance to the idle list, then frees its
/// slot.
pub struct BrowserLease {
    entry: Option<PooledBrowser>,
    inner: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl BrowserLease {
    pub fn instance(&self) -> &Arc<dyn BrowserInstance> {
        match &self.entry {
            Some(entry) => &entry.instance,
            None => unreachable!("lease entry is only taken on drop"),
        }
    }

    pub fn id(&self) -> u64 {
        self.entry.as_ref().map_or(0, |entry| entry.id)
    }
}

impl Drop for BrowserLease {
    fn drop(&mut self) {
        let Some(mut entry) = self.entry.take() else {
            return;
        };

        if self.inner.closed.load(Ordering::SeqCst) {
            let inner = Arc::clone(&self.inner);
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move { inner.destroy(entry).await });
                }
                Err(_) => {
                    entry.destruct_timer.abort();
                    self.inner.live.fetch_sub(1, Ordering::SeqCst);
                }
            }
            return;
        }

        entry.idle_since = Instant::now();
        self.inner.idle().push_back(entry);
    }
}
