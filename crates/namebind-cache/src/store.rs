//! The cache's internal map of keyed entries.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

/// A single cached factory and its pin state.
pub(crate) struct CacheEntry<F> {
    pub(crate) factory: Arc<F>,
    pub(crate) refcount: usize,
    pub(crate) last_use_time: Instant,
}

/// The mutable state a [`crate::ServiceFactoryCache`] guards behind one
/// mutex: structural changes to the map only, never a factory call.
pub(crate) struct Store<K, F> {
    pub(crate) entries: HashMap<K, CacheEntry<F>>,
    pub(crate) closed: bool,
}

impl<K, F> Store<K, F>
where
    K: Eq + Hash + Clone,
{
    pub(crate) fn new() -> Self {
        Store {
            entries: HashMap::new(),
            closed: false,
        }
    }

    /// The unpinned (`refcount == 0`) entry with the oldest
    /// `last_use_time`, if any -- the eviction candidate.
    pub(crate) fn lru_unpinned_key(&self) -> Option<K> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.refcount == 0)
            .min_by_key(|(_, entry)| entry.last_use_time)
            .map(|(key, _)| key.clone())
    }
}
