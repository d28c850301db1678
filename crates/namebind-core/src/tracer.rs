//! The tracer contract: a key/value annotation sink, and the
//! `namer.*`-prefixed annotations namebind emits onto it.

use std::fmt;

use crate::name::BoundName;
use crate::path::{Dtab, Path};

/// A binary key/value annotation sink, analogous to a distributed tracer's
/// `recordBinary`.
///
/// Implementations must not panic and should treat failures (a full
/// buffer, a disconnected collector) as non-fatal: a tracer going down
/// must never affect the acquisition path it's observing.
pub trait Tracer: Send + Sync {
    /// Records a single key/value annotation on the current trace.
    fn record_binary(&self, key: &str, value: &str);
}

/// A [`Tracer`] that discards every annotation; the default when no tracer
/// is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn record_binary(&self, _key: &str, _value: &str) {}
}

/// Emits the standard `namer.*` annotations for a single resolution
/// attempt, swallowing any panic from a misbehaving tracer implementation
/// so the acquisition path is never affected by tracing.
///
/// Emits `namer.path`, `namer.dtab.base`, and exactly one of `namer.name`
/// (on success) or `namer.failure` (on failure).
pub struct NamerTracing<'a> {
    tracer: &'a dyn Tracer,
}

impl<'a> NamerTracing<'a> {
    /// Wraps a tracer for a single resolution attempt.
    pub fn new(tracer: &'a dyn Tracer) -> Self {
        NamerTracing { tracer }
    }

    /// Records the path being resolved and the base dtab in effect.
    pub fn record_attempt(&self, path: &Path, base_dtab: &Dtab) {
        self.emit("namer.path", &path.to_string());
        self.emit("namer.dtab.base", &base_dtab.to_string());
    }

    /// Records a successful resolution.
    pub fn record_success(&self, name: &BoundName) {
        self.emit("namer.name", name.label());
    }

    /// Records a failed resolution.
    pub fn record_failure(&self, failure: impl fmt::Display) {
        self.emit("namer.failure", &failure.to_string());
    }

    fn emit(&self, key: &str, value: &str) {
        let tracer = self.tracer;
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            tracer.record_binary(key, value);
        }));
        if result.is_err() {
            #[cfg(feature = "tracing")]
            tracing::warn!(key, "tracer panicked while recording annotation");
        }
    }
}
