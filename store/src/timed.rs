//! TTL store: every entry expires a fixed duration after its last write.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;

/// Associative container whose entries each carry an independent expiration
/// timer.
///
/// One TTL, set at construction, applies to every entry. Inserting or
/// updating a key cancels its pending timer and schedules a fresh one, so
/// the deadline always measures from the last write. A TTL of zero expires
/// the entry on the next tick of the runtime.
///
/// Entries and timers stay 1:1: removing a key cancels its timer, and an
/// expired timer removes both the entry and itself. Must be used from within
/// a tokio runtime.
#[derive(Debug)]
pub struct TimedStore<K, V> {
    ttl: Duration,
    inner: Arc<Mutex<Inner<K, V>>>,
}

#[derive(Debug)]
struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    timers: HashMap<K, JoinHandle<()>>,
    // Bumped on every write; a stale timer that already woke must not delete
    // an entry re-inserted after it was armed.
    next_generation: u64,
}

#[derive(Debug)]
struct Entry<V> {
    value: V,
    generation: u64,
}

fn lock<K, V>(inner: &Mutex<Inner<K, V>>) -> MutexGuard<'_, Inner<K, V>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<K, V> TimedStore<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Send + 'static,
{
    /// Create a store whose entries live for `ttl` after each write.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                timers: HashMap::new(),
                next_generation: 0,
            })),
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Store a value and arm its expiration timer, cancelling any timer
    /// still pending for the key. Returns `&self` for chaining.
    pub fn insert(&self, key: K, value: V) -> &Self {
        let mut inner = lock(&self.inner);
        if let Some(timer) = inner.timers.remove(&key) {
            timer.abort();
        }
        let generation = inner.next_generation;
        inner.next_generation += 1;
        inner.entries.insert(key.clone(), Entry { value, generation });
        let timer = tokio::spawn(expire(
            Arc::clone(&self.inner),
            key.clone(),
            generation,
            self.ttl,
        ));
        inner.timers.insert(key, timer);
        self
    }

    #[must_use]
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        lock(&self.inner)
            .entries
            .get(key)
            .map(|entry| entry.value.clone())
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        lock(&self.inner).entries.contains_key(key)
    }

    /// Remove an entry and cancel its timer. Returns the stored value, or
    /// `None` when the key was absent (repeated removes are no-ops).
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut inner = lock(&self.inner);
        let removed = inner.entries.remove(key).map(|entry| entry.value);
        if removed.is_some()
            && let Some(timer) = inner.timers.remove(key)
        {
            timer.abort();
        }
        removed
    }

    /// Drop every entry and cancel every pending timer.
    pub fn clear(&self) {
        let mut inner = lock(&self.inner);
        for timer in inner.timers.values() {
            timer.abort();
        }
        inner.timers.clear();
        inner.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        lock(&self.inner).entries.is_empty()
    }
}

impl<K, V> Drop for TimedStore<K, V> {
    fn drop(&mut self) {
        let inner = lock(&self.inner);
        for timer in inner.timers.values() {
            timer.abort();
        }
    }
}

async fn expire<K, V>(inner: Arc<Mutex<Inner<K, V>>>, key: K, generation: u64, ttl: Duration)
where
    K: Eq + Hash + Send + 'static,
    V: Send + 'static,
{
    // Take the store lock once up front: the insert that armed this timer
    // still holds it, so the timer handle is registered before the sleep can
    // possibly complete.
    drop(lock(&inner));
    sleep(ttl).await;
    let mut inner = lock(&inner);
    let current = inner
        .entries
        .get(&key)
        .is_some_and(|entry| entry.generation == generation);
    if current {
        inner.entries.remove(&key);
        inner.timers.remove(&key);
        tracing::trace!(ttl_ms = ttl.as_millis() as u64, "timed store entry expired");
    }
}
