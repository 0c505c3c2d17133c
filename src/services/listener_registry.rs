//! Keyed set of callbacks shared by the auth listeners and realtime channels.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Thread-safe registry of `(key, filter, callback)` entries.
///
/// Callbacks are cloned out before being invoked, so a callback may register
/// or remove entries without deadlocking.
pub struct ListenerRegistry<K, F, C: ?Sized> {
    entries: Mutex<HashMap<K, (F, Arc<C>)>>,
}

impl<K, F, C> ListenerRegistry<K, F, C>
where
    K: Eq + Hash + Copy,
    F: Clone,
    C: ?Sized,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, key: K, filter: F, callback: Arc<C>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, (filter, callback));
        }
    }

    /// Removes `key`. Returns false if it was not registered.
    pub fn remove(&self, key: K) -> bool {
        self.entries
            .lock()
            .map(|mut entries| entries.remove(&key).is_some())
            .unwrap_or(false)
    }

    pub fn contains(&self, key: K) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(&key))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the callbacks whose filter passes `accept`.
    pub fn matching(&self, accept: impl Fn(&F) -> bool) -> Vec<Arc<C>> {
        self.entries
            .lock()
            .map(|entries| {
                entries
                    .values()
                    .filter(|(filter, _)| accept(filter))
                    .map(|(_, callback)| Arc::clone(callback))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<K, F, C> Default for ListenerRegistry<K, F, C>
where
    K: Eq + Hash + Copy,
    F: Clone,
    C: ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}
