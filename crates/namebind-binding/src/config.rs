//! Builder for [`crate::BindingFactory`] configuration.

use std::sync::Arc;

use namebind_cache::CacheEvent;
use namebind_core::{Dtab, EventListener, EventListeners, NoopTracer, Tracer};

/// A callable producing the process-wide base dtab, snapshotted fresh on
/// every `acquire` (spec.md §6, `base_dtab_provider`).
pub type BaseDtabProvider = Arc<dyn Fn() -> Dtab + Send + Sync>;

/// Configuration for a [`crate::BindingFactory`].
///
/// Construct via [`BindingConfig::builder`].
pub struct BindingConfig {
    pub(crate) base_dtab_provider: BaseDtabProvider,
    pub(crate) max_name_cache_size: usize,
    pub(crate) max_namer_cache_size: usize,
    pub(crate) tracer: Arc<dyn Tracer>,
    pub(crate) namer_cache_listeners: EventListeners<CacheEvent>,
    pub(crate) name_cache_listeners: EventListeners<CacheEvent>,
}

impl BindingConfig {
    /// Starts building a configuration with spec defaults: an empty base
    /// dtab, `max_name_cache_size` 8, `max_namer_cache_size` 4, no tracer.
    pub fn builder() -> BindingConfigBuilder {
        BindingConfigBuilder {
            base_dtab_provider: Arc::new(Dtab::empty),
            max_name_cache_size: 8,
            max_namer_cache_size: 4,
            tracer: Arc::new(NoopTracer),
            namer_cache_listeners: EventListeners::new(),
            name_cache_listeners: EventListeners::new(),
        }
    }
}

/// Builder for [`BindingConfig`].
pub struct BindingConfigBuilder {
    base_dtab_provider: BaseDtabProvider,
    max_name_cache_size: usize,
    max_namer_cache_size: usize,
    tracer: Arc<dyn Tracer>,
    namer_cache_listeners: EventListeners<CacheEvent>,
    name_cache_listeners: EventListeners<CacheEvent>,
}

impl BindingConfigBuilder {
    /// Overrides the process-wide base dtab snapshot taken on every
    /// `acquire`. Defaults to always returning [`Dtab::empty`].
    pub fn base_dtab_provider(mut self, provider: BaseDtabProvider) -> Self {
        self.base_dtab_provider = provider;
        self
    }

    /// Bounds the `NameCache` (keyed by resolved `BoundName` identity).
    /// Must be non-zero.
    pub fn max_name_cache_size(mut self, size: usize) -> Self {
        self.max_name_cache_size = size;
        self
    }

    /// Bounds the `DtabCache` (keyed by effective dtab). Must be non-zero.
    pub fn max_namer_cache_size(mut self, size: usize) -> Self {
        self.max_namer_cache_size = size;
        self
    }

    /// Overrides the default no-op tracer.
    pub fn tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Registers a listener invoked on `DtabCache` eviction or one-shot.
    pub fn on_namer_cache_event<L>(mut self, listener: L) -> Self
    where
        L: EventListener<CacheEvent> + 'static,
    {
        self.namer_cache_listeners.add(listener);
        self
    }

    /// Registers a listener invoked on `NameCache` eviction or one-shot.
    pub fn on_name_cache_event<L>(mut self, listener: L) -> Self
    where
        L: EventListener<CacheEvent> + 'static,
    {
        self.name_cache_listeners.add(listener);
        self
    }

    /// Builds the final configuration.
    ///
    /// Panics if either cache size is zero.
    pub fn build(self) -> BindingConfig {
        assert!(self.max_name_cache_size > 0, "max_name_cache_size must be non-zero");
        assert!(self.max_namer_cache_size > 0, "max_namer_cache_size must be non-zero");
        BindingConfig {
            base_dtab_provider: self.base_dtab_provider,
            max_name_cache_size: self.max_name_cache_size,
            max_namer_cache_size: self.max_namer_cache_size,
            tracer: self.tracer,
            namer_cache_listeners: self.namer_cache_listeners,
            name_cache_listeners: self.name_cache_listeners,
        }
    }
}
