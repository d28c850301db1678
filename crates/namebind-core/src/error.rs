//! Error kinds that cross the namebind/caller boundary.
//!
//! These are a taxonomy, not a single type: each crate (`namebind-failfast`,
//! `namebind-dynname`, `namebind-binding`) wraps its inner service's error
//! type `E` in one of these variants depending on which layer produced the
//! failure. Matching on `kind()` rather than the `Display` message is how a
//! load balancer recognises `EndpointMarkedDown` and skips the endpoint
//! without counting it as a request failure (spec §4.1, "Failure
//! semantics").

use std::fmt;
use std::sync::Arc;

use crate::path::{Dtab, Path};

/// Stable identity of a [`BindError`] variant, independent of its message.
///
/// Upstream layers are expected to match on this instead of downcasting or
/// parsing `Display` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`BindError::EndpointMarkedDown`].
    EndpointMarkedDown,
    /// See [`BindError::NoBrokersAvailable`].
    NoBrokersAvailable,
    /// See [`BindError::ServiceClosed`].
    ServiceClosed,
    /// See [`BindError::CancelledConnection`].
    CancelledConnection,
}

/// A help URL that ships with [`BindError::EndpointMarkedDown`] so an
/// operator looking at a log line can jump straight to the runbook.
pub const ENDPOINT_MARKED_DOWN_HELP_URL: &str =
    "https://namebind.dev/errors/endpoint-marked-down";

/// Errors that can cross the boundary out of the namebind core.
///
/// Generic over the wrapped endpoint factory's own error type `E`, which is
/// carried (not swallowed) wherever the core re-raises a downstream
/// failure unchanged (spec §7, "Transport/connect failure").
#[derive(Debug, Clone)]
pub enum BindError<E> {
    /// Raised immediately by `FailFastFactory::acquire` while the endpoint
    /// is `Retrying`. The wrapped factory is never touched to produce this.
    EndpointMarkedDown {
        /// Stable, clickable help URL for operator diagnosis.
        help_url: &'static str,
    },

    /// Raised by `BindingFactory` when a path resolves to no broker, or
    /// (singleton only) the `local_dtab` was non-empty and annotated onto
    /// the original failure (spec §4.4, "Acquire algorithm", step 3).
    NoBrokersAvailable {
        /// The logical path that failed to resolve.
        path: Path,
        /// The request-scoped delegation table in effect, if any.
        local_dtab: Dtab,
    },

    /// The factory (or cache, or binding) that would have served this
    /// request has been closed.
    ServiceClosed,

    /// The caller cancelled a pending acquisition before it was served.
    CancelledConnection {
        /// The caller-supplied cancellation cause.
        cause: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// The underlying endpoint factory failed on its own terms; this is
    /// passed through unchanged so callers still see the original error.
    Inner(E),
}

impl<E> BindError<E> {
    /// Returns the stable kind of this error, for matching without
    /// depending on the message text.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            BindError::EndpointMarkedDown { .. } => Some(ErrorKind::EndpointMarkedDown),
            BindError::NoBrokersAvailable { .. } => Some(ErrorKind::NoBrokersAvailable),
            BindError::ServiceClosed => Some(ErrorKind::ServiceClosed),
            BindError::CancelledConnection { .. } => Some(ErrorKind::CancelledConnection),
            BindError::Inner(_) => None,
        }
    }

    /// Constructs the default, fully-annotated `EndpointMarkedDown`.
    pub fn endpoint_marked_down() -> Self {
        BindError::EndpointMarkedDown {
            help_url: ENDPOINT_MARKED_DOWN_HELP_URL,
        }
    }

    /// Extracts the inner error, if this is an `Inner` variant.
    pub fn into_inner(self) -> Option<E> {
        match self {
            BindError::Inner(e) => Some(e),
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for BindError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::EndpointMarkedDown { help_url } => {
                write!(f, "endpoint marked down, see {help_url}")
            }
            BindError::NoBrokersAvailable { path, local_dtab } => {
                if local_dtab.is_empty() {
                    write!(f, "no brokers available for {path}")
                } else {
                    write!(f, "no brokers available for {path} (local dtab: {local_dtab})")
                }
            }
            BindError::ServiceClosed => write!(f, "service closed"),
            BindError::CancelledConnection { cause } => {
                write!(f, "connection cancelled: {cause}")
            }
            BindError::Inner(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for BindError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BindError::Inner(e) => Some(e),
            BindError::CancelledConnection { cause } => Some(cause.as_ref()),
            _ => None,
        }
    }
}
