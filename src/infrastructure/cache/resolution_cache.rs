//! In-process resolution cache with idle-time eviction.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::redirect::ResolvedLink;
use crate::utils::clock::Clock;

/// Default idle lifetime of an entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// A cached resolution plus its last access instant.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub link: ResolvedLink,
    pub last_access: DateTime<Utc>,
}

struct Sweeper {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Short code → [`ResolvedLink`] map bounded by idle time.
///
/// An entry lives for `ttl` after its last access; every hit refreshes it.
/// There is no capacity bound. Entries idle longer than `ttl` are treated as
/// misses on lookup and removed by [`ResolutionCache::sweep`], which the
/// background task started with [`ResolutionCache::start`] runs every `ttl`.
///
/// The map is a sharded concurrent map; each lookup-and-refresh or insert is
/// a single map operation, so handlers and the sweep can run in parallel.
pub struct ResolutionCache {
    entries: DashMap<String, CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    sweeper: Mutex<Option<Sweeper>>,
}

impl ResolutionCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
            sweeper: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn ttl_delta(&self) -> TimeDelta {
        TimeDelta::milliseconds(i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX))
    }

    /// Returns the cached resolution for `code` and refreshes its last access.
    pub fn lookup(&self, code: &str) -> Option<ResolvedLink> {
        let now = self.clock.now();
        let ttl = self.ttl_delta();

        let hit = match self.entries.get_mut(code) {
            Some(mut entry) if now - entry.last_access <= ttl => {
                entry.last_access = now;
                Some(entry.link.clone())
            }
            Some(_) => None,
            None => {
                metrics::counter!("cache_misses_total").increment(1);
                debug!("Cache MISS: {}", code);
                return None;
            }
        };

        match hit {
            Some(link) => {
                metrics::counter!("cache_hits_total").increment(1);
                debug!("Cache HIT: {}", code);
                Some(link)
            }
            None => {
                // Idle past its TTL but not swept yet.
                self.entries
                    .remove_if(code, |_, entry| now - entry.last_access > ttl);
                metrics::counter!("cache_misses_total").increment(1);
                debug!("Cache STALE: {}", code);
                None
            }
        }
    }

    /// Caches a resolution for `code`, stamped with the current time.
    pub fn insert(&self, code: impl Into<String>, link: ResolvedLink) {
        let entry = CacheEntry {
            link,
            last_access: self.clock.now(),
        };
        self.entries.insert(code.into(), entry);
    }

    /// Drops the entry for `code`, if any.
    pub fn invalidate(&self, code: &str) {
        if self.entries.remove(code).is_some() {
            debug!("Cache INVALIDATE: {}", code);
        }
    }

    /// Removes every entry idle longer than the TTL. Returns how many were
    /// removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.ttl_delta();
        let mut evicted = 0;

        self.entries.retain(|_, entry| {
            let keep = now - entry.last_access <= ttl;
            if !keep {
                evicted += 1;
            }
            keep
        });

        if evicted > 0 {
            metrics::counter!("cache_evictions_total").increment(evicted as u64);
            debug!("Cache sweep evicted {} entries", evicted);
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Spawns the background sweep, running every TTL.
    ///
    /// Calling `start` while a sweep task is already running does nothing.
    pub fn start(self: &Arc<Self>) {
        let mut slot = self.sweeper.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            warn!("Cache sweep already running");
            return;
        }

        let (shutdown, mut shutdown_rx) = oneshot::channel();
        let period = self.ttl;
        let cache = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = interval.tick() => {
                        let Some(cache) = cache.upgrade() else { break };
                        cache.sweep();
                    }
                }
            }
        });

        *slot = Some(Sweeper { shutdown, handle });
        info!("Cache sweep started (interval: {}s)", period.as_secs());
    }

    /// Stops the background sweep and waits for it to finish.
    pub async fn stop(&self) {
        let sweeper = self
            .sweeper
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(Sweeper { shutdown, handle }) = sweeper {
            let _ = shutdown.send(());
            if let Err(e) = handle.await {
                warn!("Cache sweep task ended abnormally: {}", e);
            }
            info!("Cache sweep stopped");
        }
    }
}
