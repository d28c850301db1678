//! Events emitted by [`crate::DynNameFactory`].

use std::time::Instant;

use namebind_core::NamebindEvent;

/// An event emitted on a `DynNameFactory` state transition.
#[derive(Debug, Clone)]
pub enum DynNameEvent {
    /// The underlying reactive name resolved (or re-resolved) successfully.
    Resolved {
        /// Name of the factory instance.
        pattern_name: String,
        /// Wall-clock time of the transition.
        timestamp: Instant,
    },
    /// The underlying reactive name failed to resolve.
    Failed {
        /// Name of the factory instance.
        pattern_name: String,
        /// Wall-clock time of the transition.
        timestamp: Instant,
    },
    /// The factory was closed.
    Closed {
        /// Name of the factory instance.
        pattern_name: String,
        /// Wall-clock time of the transition.
        timestamp: Instant,
    },
}

impl NamebindEvent for DynNameEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DynNameEvent::Resolved { .. } => "resolved",
            DynNameEvent::Failed { .. } => "failed",
            DynNameEvent::Closed { .. } => "closed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            DynNameEvent::Resolved { timestamp, .. } => *timestamp,
            DynNameEvent::Failed { timestamp, .. } => *timestamp,
            DynNameEvent::Closed { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            DynNameEvent::Resolved { pattern_name, .. } => pattern_name,
            DynNameEvent::Failed { pattern_name, .. } => pattern_name,
            DynNameEvent::Closed { pattern_name, .. } => pattern_name,
        }
    }
}
