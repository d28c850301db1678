//! Builder for [`crate::ServiceFactoryCache`] configuration.

use namebind_core::{EventListener, EventListeners};

use crate::events::CacheEvent;

/// Configuration for a [`crate::ServiceFactoryCache`].
///
/// Construct via [`ServiceFactoryCacheConfig::builder`].
pub struct ServiceFactoryCacheConfig {
    pub(crate) pattern_name: String,
    pub(crate) max_size: usize,
    pub(crate) listeners: EventListeners<CacheEvent>,
}

impl ServiceFactoryCacheConfig {
    /// Starts building a configuration for the cache named `pattern_name`.
    ///
    /// `max_size` bounds the number of distinct keys held at once; it must
    /// be non-zero.
    pub fn builder(pattern_name: impl Into<String>, max_size: usize) -> ServiceFactoryCacheConfigBuilder {
        ServiceFactoryCacheConfigBuilder {
            pattern_name: pattern_name.into(),
            max_size,
            listeners: EventListeners::new(),
        }
    }
}

/// Builder for [`ServiceFactoryCacheConfig`].
pub struct ServiceFactoryCacheConfigBuilder {
    pattern_name: String,
    max_size: usize,
    listeners: EventListeners<CacheEvent>,
}

impl ServiceFactoryCacheConfigBuilder {
    /// Registers a listener invoked when an unpinned entry is evicted.
    pub fn on_eviction<L>(mut self, listener: L) -> Self
    where
        L: EventListener<CacheEvent> + 'static,
    {
        self.listeners.add(listener);
        self
    }

    /// Registers a listener invoked when the one-shot (no-admit) path is
    /// taken because every cached entry was pinned.
    ///
    /// Shares the same listener collection as [`Self::on_eviction`]; both
    /// event variants are delivered to every registered listener.
    pub fn on_one_shot<L>(mut self, listener: L) -> Self
    where
        L: EventListener<CacheEvent> + 'static,
    {
        self.listeners.add(listener);
        self
    }

    /// Appends every listener already collected in `listeners`, for
    /// callers (e.g. `namebind-binding`) that accumulate `CacheEvent`
    /// listeners on their own config before building the
    /// `ServiceFactoryCache` that will actually emit them.
    pub fn with_listeners(mut self, listeners: EventListeners<CacheEvent>) -> Self {
        self.listeners.extend(listeners);
        self
    }

    /// Builds the final configuration.
    ///
    /// Panics if `max_size` is zero: a cache that can hold nothing is
    /// always on the one-shot path and is almost certainly a configuration
    /// mistake.
    pub fn build(self) -> ServiceFactoryCacheConfig {
        assert!(self.max_size > 0, "max_size must be non-zero");
        ServiceFactoryCacheConfig {
            pattern_name: self.pattern_name,
            max_size: self.max_size,
            listeners: self.listeners,
        }
    }
}
