//! Errors produced by [`crate::ServiceFactoryCache`].

use std::fmt;

/// Errors that can occur while acquiring from a [`crate::ServiceFactoryCache`].
#[derive(Debug)]
pub enum CacheError<E> {
    /// The wrapped factory (cached or one-shot) failed to produce a service.
    Inner(E),
    /// The cache has begun shutting down; no further acquisitions are
    /// admitted.
    Closed,
}

impl<E: fmt::Display> fmt::Display for CacheError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Inner(e) => write!(f, "cached factory error: {e}"),
            CacheError::Closed => write!(f, "service factory cache is closed"),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for CacheError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CacheError::Inner(e) => Some(e),
            CacheError::Closed => None,
        }
    }
}

impl<E> CacheError<E> {
    /// Converts this error into the inner error, if it wraps one.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CacheError::Inner(e) => Some(e),
            CacheError::Closed => None,
        }
    }
}
