//! Builder for [`crate::FailFastFactory`] configuration.

use namebind_core::{EventListener, EventListeners};

use crate::events::FailFastEvent;
use crate::state::default_backoff_schedule;

use std::time::Duration;

/// Configuration for a [`crate::FailFastFactory`].
///
/// Construct via [`FailFastConfig::builder`].
pub struct FailFastConfig {
    pub(crate) pattern_name: String,
    pub(crate) backoffs: Vec<Duration>,
    pub(crate) backoffs_exhaust: bool,
    pub(crate) listeners: EventListeners<FailFastEvent>,
}

impl FailFastConfig {
    /// Starts building a configuration for the factory named `pattern_name`.
    ///
    /// The name is used only in emitted events and tracing/metrics labels.
    pub fn builder(pattern_name: impl Into<String>) -> FailFastConfigBuilder {
        FailFastConfigBuilder {
            pattern_name: pattern_name.into(),
            backoffs: default_backoff_schedule(),
            backoffs_exhaust: false,
            listeners: EventListeners::new(),
        }
    }
}

/// Builder for [`FailFastConfig`].
pub struct FailFastConfigBuilder {
    pattern_name: String,
    backoffs: Vec<Duration>,
    backoffs_exhaust: bool,
    listeners: EventListeners<FailFastEvent>,
}

impl FailFastConfigBuilder {
    /// Overrides the default `1s,2s,4s,8s,16s,32s...` backoff schedule.
    /// The last entry repeats forever once exhausted; the endpoint never
    /// optimistically recovers from schedule exhaustion under this mode
    /// (see [`Self::exhausting_backoffs`] for the alternative).
    ///
    /// Must be non-empty.
    pub fn backoffs(mut self, backoffs: Vec<Duration>) -> Self {
        assert!(!backoffs.is_empty(), "backoff schedule must not be empty");
        self.backoffs = backoffs;
        self.backoffs_exhaust = false;
        self
    }

    /// Like [`Self::backoffs`], but the schedule is genuinely finite: once
    /// every entry has been consumed by a failed probe, the endpoint
    /// optimistically recovers to `Ok` (spec §4.1, "Backoff exhaustion")
    /// instead of probing at the final interval forever.
    ///
    /// Must be non-empty.
    pub fn exhausting_backoffs(mut self, backoffs: Vec<Duration>) -> Self {
        assert!(!backoffs.is_empty(), "backoff schedule must not be empty");
        self.backoffs = backoffs;
        self.backoffs_exhaust = true;
        self
    }

    /// Registers a listener invoked when the endpoint is marked down.
    pub fn on_marked_dead<L>(mut self, listener: L) -> Self
    where
        L: EventListener<FailFastEvent> + 'static,
    {
        self.listeners.add(listener);
        self
    }

    /// Registers a listener invoked when the endpoint recovers.
    ///
    /// Shares the same listener collection as [`Self::on_marked_dead`];
    /// both event variants are delivered to every registered listener, and
    /// callers match on the event type they care about.
    pub fn on_marked_available<L>(mut self, listener: L) -> Self
    where
        L: EventListener<FailFastEvent> + 'static,
    {
        self.listeners.add(listener);
        self
    }

    /// Builds the final configuration.
    pub fn build(self) -> FailFastConfig {
        FailFastConfig {
            pattern_name: self.pattern_name,
            backoffs: self.backoffs,
            backoffs_exhaust: self.backoffs_exhaust,
            listeners: self.listeners,
        }
    }
}
