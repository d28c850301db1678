//! Errors produced by [`crate::DynNameFactory`].

use std::fmt;
use std::sync::Arc;

/// Errors that can cross the boundary out of a [`crate::DynNameFactory`].
///
/// Generic over `E`, the underlying namer's own failure type, and `FE`, the
/// error produced by the child factory built from a resolved name.
#[derive(Debug, Clone)]
pub enum DynNameError<E, FE> {
    /// The reactive name resolved to `Failed` before or while this
    /// acquisition was outstanding.
    NameFailed(E),
    /// The factory has been closed.
    ServiceClosed,
    /// The caller cancelled a pending acquisition before the name
    /// resolved (dropped the future without polling it to completion).
    CancelledConnection {
        /// The caller-supplied cancellation cause, if any was attached.
        cause: Arc<dyn std::error::Error + Send + Sync>,
    },
    /// The resolved child factory failed to produce a service.
    Inner(FE),
}

impl<E: fmt::Display, FE: fmt::Display> fmt::Display for DynNameError<E, FE> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynNameError::NameFailed(e) => write!(f, "name resolution failed: {e}"),
            DynNameError::ServiceClosed => write!(f, "service closed"),
            DynNameError::CancelledConnection { cause } => {
                write!(f, "connection cancelled: {cause}")
            }
            DynNameError::Inner(e) => write!(f, "{e}"),
        }
    }
}

impl<E, FE> std::error::Error for DynNameError<E, FE>
where
    E: std::error::Error + 'static,
    FE: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DynNameError::NameFailed(e) => Some(e),
            DynNameError::Inner(e) => Some(e),
            DynNameError::CancelledConnection { cause } => Some(cause.as_ref()),
            DynNameError::ServiceClosed => None,
        }
    }
}
