//! [`NameCacheProxy`]: a thin per-name handle onto the shared `NameCache`.
//!
//! `DynNameFactory` expects to own the factory it builds once a name
//! resolves (spec.md §4.3); `BindingFactory` instead wants every dtab that
//! resolves to the same name to share one `NameCache` entry (spec.md
//! §4.4's "Rationale" for `NameCache`). This proxy reconciles the two: it
//! is the per-dtab factory `DynNameFactory` holds, but `acquire` forwards
//! to the cache keyed by the resolved name's identity, and `close` is a
//! no-op since the cache the proxy forwards to outlives any single dtab's
//! `DynNameFactory`.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use namebind_cache::ServiceFactoryCache;
use namebind_core::{BoundName, ServiceFactory};

/// Forwards `acquire` to a shared [`ServiceFactoryCache`] keyed by a fixed
/// [`BoundName`], without owning (or closing) the cache itself.
pub struct NameCacheProxy<Conn, F>
where
    F: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
{
    name: BoundName,
    name_cache: Arc<ServiceFactoryCache<BoundName, F, Conn>>,
}

impl<Conn, F> NameCacheProxy<Conn, F>
where
    F: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
{
    /// Builds a proxy that always acquires under `name`.
    pub fn new(name_cache: Arc<ServiceFactoryCache<BoundName, F, Conn>>, name: BoundName) -> Self {
        NameCacheProxy { name, name_cache }
    }
}

impl<Conn, F> ServiceFactory<Conn> for NameCacheProxy<Conn, F>
where
    F: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
{
    type Service = namebind_cache::CachedService<F::Service>;
    type Error = namebind_cache::CacheError<F::Error>;

    fn acquire(&self, conn: Conn) -> BoxFuture<'static, Result<Self::Service, Self::Error>> {
        let name_cache = Arc::clone(&self.name_cache);
        let name = self.name.clone();
        Box::pin(async move { name_cache.acquire(name, conn).await })
    }

    fn is_available(&self) -> bool {
        self.name_cache.is_available()
    }

    /// A no-op: the `NameCache` is shared across every dtab that resolves
    /// to this proxy's name and outlives any one of them, so closing it
    /// here would be closing a resource this proxy does not own.
    fn close(&self, _deadline: Duration) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}
