//! Events emitted by [`crate::ServiceFactoryCache`].

use std::time::Instant;

use namebind_core::NamebindEvent;

/// An event emitted by a [`crate::ServiceFactoryCache`] as entries are
/// evicted or the one-shot path is taken.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// An unpinned entry (`refcount == 0`) was evicted to make room for a
    /// new one.
    Eviction {
        /// Name of the cache instance, for multi-cache deployments.
        pattern_name: String,
        /// Wall-clock time of the eviction.
        timestamp: Instant,
    },
    /// Every cached entry was pinned (`refcount > 0`) when capacity was
    /// reached, so a factory was built and used once without being
    /// admitted to the cache.
    OneShot {
        /// Name of the cache instance.
        pattern_name: String,
        /// Wall-clock time this path was taken.
        timestamp: Instant,
    },
}

impl NamebindEvent for CacheEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CacheEvent::Eviction { .. } => "eviction",
            CacheEvent::OneShot { .. } => "one_shot",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CacheEvent::Eviction { timestamp, .. } => *timestamp,
            CacheEvent::OneShot { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            CacheEvent::Eviction { pattern_name, .. } => pattern_name,
            CacheEvent::OneShot { pattern_name, .. } => pattern_name,
        }
    }
}
