//! Typed TTL cache for membership data.
//!
//! Peer records, peer lists, host lists, and leader connections are all read
//! far more often than they change, so lookups are fronted by a
//! time-bounded cache: entries expire a fixed interval after insertion and
//! there is no write-through invalidation. Membership changes take up to one
//! TTL to become visible.
//!
//! One cache instance holds one value shape. This keeps lookups fully typed
//! where a single heterogeneous map would force downcasting at every call
//! site.
//!
//! Handles are cheap to clone and share one underlying store, so a
//! background sweeper can run off a clone while owners keep using theirs.

use parking_lot::RwLock;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::trace;

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Default interval between expired-entry sweeps.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Number of independently locked shards. Reads and writes on distinct keys
/// rarely contend; same-key writes are last-writer-wins.
const SHARDS: usize = 16;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A string-keyed cache whose entries expire `ttl` after insertion.
pub struct TtlCache<V> {
    shards: Arc<[RwLock<HashMap<String, Entry<V>>>; SHARDS]>,
    ttl: Duration,
}

impl<V> Clone for TtlCache<V> {
    fn clone(&self) -> Self {
        Self {
            shards: self.shards.clone(),
            ttl: self.ttl,
        }
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    /// Create a cache with the default 60-second TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a cache with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            shards: Arc::new(std::array::from_fn(|_| RwLock::new(HashMap::new()))),
            ttl,
        }
    }

    fn shard(&self, key: &str) -> &RwLock<HashMap<String, Entry<V>>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % SHARDS]
    }

    /// Look up a live entry. Expired entries read as absent; they are
    /// removed by [`purge_expired`](Self::purge_expired), not here, so reads
    /// stay on the read lock.
    pub fn get(&self, key: &str) -> Option<V> {
        let shard = self.shard(key).read();
        let entry = shard.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some(entry.value.clone())
    }

    /// Insert with the cache's default TTL, replacing any existing entry.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.ttl)
    }

    /// Insert with an explicit TTL.
    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.shard(&key).write().insert(key, entry);
    }

    /// Remove an entry before its TTL elapses.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.shard(key).write().remove(key).map(|e| e.value)
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        for shard in self.shards.iter() {
            let mut shard = shard.write();
            let before = shard.len();
            shard.retain(|_, entry| entry.expires_at > now);
            removed += before - shard.len();
        }
        if removed > 0 {
            trace!(removed, "purged expired cache entries");
        }
        removed
    }

    /// Number of entries currently stored, counting not-yet-swept expired
    /// ones.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    /// Whether the cache holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn a background task sweeping expired entries every
    /// [`SWEEP_INTERVAL`]. The task runs until the handle is aborted or the
    /// runtime shuts down.
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                cache.purge_expired();
            }
        })
    }
}

impl<V: Clone + Send + Sync + 'static> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
