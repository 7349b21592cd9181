//! Keyed and single-slot caches with per-entry time-to-live.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// A cached value and the instant it stops being served.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<T> {
  value: T,
  expires_at: Instant,
}

impl<T> CacheEntry<T> {
  fn new(value: T, ttl: Duration) -> Self {
    Self {
      value,
      expires_at: Instant::now() + ttl,
    }
  }

  fn is_fresh(&self, now: Instant) -> bool {
    now < self.expires_at
  }
}

/// Map of entries with independent expiry per key.
///
/// There is no eviction beyond expiry: an expired entry is ignored by `get`
/// and overwritten by the next `put` for its key. Two callers that miss
/// concurrently will both fetch and both `put`; the last write wins.
#[derive(Debug)]
pub struct TtlCache<K, V> {
  entries: Mutex<HashMap<K, CacheEntry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
  K: Eq + Hash,
  V: Clone,
{
  pub fn new() -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
    }
  }

  /// Returns a clone of the value for `key` if present and not yet expired.
  pub fn get(&self, key: &K) -> Option<V> {
    let now = Instant::now();
    self
      .lock()
      .get(key)
      .filter(|entry| entry.is_fresh(now))
      .map(|entry| entry.value.clone())
  }

  /// Replaces any entry for `key`, expiring `ttl` from now.
  pub fn put(&self, key: K, value: V, ttl: Duration) {
    self.lock().insert(key, CacheEntry::new(value, ttl));
  }

  /// Drops every entry, fresh or not.
  pub fn clear(&self) {
    self.lock().clear();
  }

  /// Number of stored entries, including expired ones not yet overwritten.
  #[cfg(test)]
  fn len(&self) -> usize {
    self.lock().len()
  }

  // The map is only ever touched through single insert/get calls, so a
  // panic while holding the lock cannot leave it half-updated.
  fn lock(&self) -> MutexGuard<'_, HashMap<K, CacheEntry<V>>> {
    self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl<K, V> Default for TtlCache<K, V>
where
  K: Eq + Hash,
  V: Clone,
{
  fn default() -> Self {
    Self::new()
  }
}

/// Single-value cache (viewer, team list).
#[derive(Debug)]
pub struct TtlCell<V> {
  inner: TtlCache<(), V>,
}

impl<V: Clone> TtlCell<V> {
  pub fn new() -> Self {
    Self {
      inner: TtlCache::new(),
    }
  }

  pub fn get(&self) -> Option<V> {
    self.inner.get(&())
  }

  pub fn put(&self, value: V, ttl: Duration) {
    self.inner.put((), value, ttl);
  }

  pub fn clear(&self) {
    self.inner.clear();
  }
}

impl<V: Clone> Default for TtlCell<V> {
  fn default() -> Self {
    Self::new()
  }
}
