//! Errors produced while resolving and acquiring through a
//! [`crate::BindingFactory`].

use std::fmt;
use std::sync::Arc;

use namebind_cache::CacheError;
use namebind_core::{Dtab, Path};
use namebind_dynname::DynNameError;

/// The outcome of binding a [`Path`] under an effective dtab, before it is
/// wrapped in a [`namebind_dynname::DynNameFactory`] and traced.
///
/// This is `DtabCache`'s resolution failure type (spec §4.4's table maps
/// `None`/`Some(empty)` to this); it never reaches a caller directly --
/// [`BindingError::NoBrokersAvailable`] is what crosses the boundary, with
/// the request-scoped local dtab annotated on where applicable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveFailure {
    /// Binding the path under the effective dtab evaluated to no names.
    NoBrokersAvailable(Path),
}

impl fmt::Display for ResolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveFailure::NoBrokersAvailable(path) => {
                write!(f, "no brokers available for {path}")
            }
        }
    }
}

impl std::error::Error for ResolveFailure {}

/// Errors that can cross the boundary out of a [`crate::BindingFactory`].
///
/// Generic over `E`, the error type of the child factory supplied to
/// [`crate::BindingFactory::new`] (typically a `namebind_failfast::BindError<_>`
/// or similar).
#[derive(Debug, Clone)]
pub enum BindingError<E> {
    /// The path resolved to no broker under the effective dtab. Carries
    /// the request-scoped local dtab verbatim (spec §4.4, "Acquire
    /// algorithm", step 3) whenever one was in effect; empty otherwise.
    NoBrokersAvailable {
        /// The path that failed to resolve.
        path: Path,
        /// The request-scoped local dtab in effect when this failed.
        local_dtab: namebind_core::Dtab,
    },
    /// The binding factory (or one of its caches) has been closed.
    ServiceClosed,
    /// The caller cancelled a pending acquisition before it completed.
    CancelledConnection {
        /// The caller-supplied cancellation cause.
        cause: Arc<dyn std::error::Error + Send + Sync>,
    },
    /// The resolved child factory failed to produce a service.
    Inner(E),
}

impl<E: fmt::Display> fmt::Display for BindingError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::NoBrokersAvailable { path, local_dtab } => {
                if local_dtab.is_empty() {
                    write!(f, "no brokers available for {path}")
                } else {
                    write!(f, "no brokers available for {path} (local dtab: {local_dtab})")
                }
            }
            BindingError::ServiceClosed => write!(f, "binding factory closed"),
            BindingError::CancelledConnection { cause } => {
                write!(f, "connection cancelled: {cause}")
            }
            BindingError::Inner(e) => write!(f, "{e}"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for BindingError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BindingError::Inner(e) => Some(e),
            BindingError::CancelledConnection { cause } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

/// The error type that actually crosses `DtabCache.acquire`: a cache error
/// wrapping a dyn-name error wrapping a cache error wrapping the child
/// factory's own error (spec.md §4.4's two levels of caching, each
/// contributing one layer of wrapping). Collapses it to the flat
/// [`BindingError`] taxonomy callers are meant to match on.
pub(crate) fn flatten_error<E>(
    err: CacheError<DynNameError<ResolveFailure, CacheError<E>>>,
    local_dtab: &Dtab,
) -> BindingError<E> {
    match err {
        CacheError::Closed => BindingError::ServiceClosed,
        CacheError::Inner(DynNameError::NameFailed(ResolveFailure::NoBrokersAvailable(path))) => {
            BindingError::NoBrokersAvailable {
                path,
                local_dtab: local_dtab.clone(),
            }
        }
        CacheError::Inner(DynNameError::ServiceClosed) => BindingError::ServiceClosed,
        CacheError::Inner(DynNameError::CancelledConnection { cause }) => {
            BindingError::CancelledConnection { cause }
        }
        CacheError::Inner(DynNameError::Inner(CacheError::Closed)) => BindingError::ServiceClosed,
        CacheError::Inner(DynNameError::Inner(CacheError::Inner(e))) => BindingError::Inner(e),
    }
}
