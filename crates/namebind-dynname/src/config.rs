//! Builder for [`crate::DynNameFactory`] configuration.

use std::sync::Arc;

use namebind_core::{EventListener, EventListeners, NoopTracer, Tracer};

use crate::events::DynNameEvent;

/// Configuration for a [`crate::DynNameFactory`].
///
/// Construct via [`DynNameConfig::builder`].
pub struct DynNameConfig {
    pub(crate) pattern_name: String,
    pub(crate) tracer: Arc<dyn Tracer>,
    pub(crate) listeners: EventListeners<DynNameEvent>,
}

impl DynNameConfig {
    /// Starts building a configuration for the factory named `pattern_name`.
    pub fn builder(pattern_name: impl Into<String>) -> DynNameConfigBuilder {
        DynNameConfigBuilder {
            pattern_name: pattern_name.into(),
            tracer: Arc::new(NoopTracer),
            listeners: EventListeners::new(),
        }
    }
}

/// Builder for [`DynNameConfig`].
pub struct DynNameConfigBuilder {
    pattern_name: String,
    tracer: Arc<dyn Tracer>,
    listeners: EventListeners<DynNameEvent>,
}

impl DynNameConfigBuilder {
    /// Overrides the default no-op tracer.
    pub fn tracer(mut self, tracer: Arc<dyn Tracer>) -> Self {
        self.tracer = tracer;
        self
    }

    /// Registers a listener invoked when the name resolves (or re-resolves).
    pub fn on_resolved<L>(mut self, listener: L) -> Self
    where
        L: EventListener<DynNameEvent> + 'static,
    {
        self.listeners.add(listener);
        self
    }

    /// Registers a listener invoked when resolution fails.
    ///
    /// Shares the same listener collection as [`Self::on_resolved`]; every
    /// registered listener receives every event variant.
    pub fn on_failed<L>(mut self, listener: L) -> Self
    where
        L: EventListener<DynNameEvent> + 'static,
    {
        self.listeners.add(listener);
        self
    }

    /// Builds the final configuration.
    pub fn build(self) -> DynNameConfig {
        DynNameConfig {
            pattern_name: self.pattern_name,
            tracer: self.tracer,
            listeners: self.listeners,
        }
    }
}
