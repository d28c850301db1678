//! The downstream factory/service interfaces every namebind layer wraps.

use std::sync::Arc;

use futures::future::BoxFuture;

/// A thing that produces connections/services on demand, and can report its
/// own health and be closed.
///
/// `FailFastFactory`, `ServiceFactoryCache`, `DynNameFactory`, and
/// `BindingFactory` each both consume and implement this trait, so they
/// compose into a single pipeline without the caller needing to know how
/// many layers are stacked.
pub trait ServiceFactory<Conn>: Send + Sync {
    /// The service this factory produces.
    type Service: BoundService;
    /// The error produced by a failed acquisition.
    type Error;

    /// Acquires a service for `conn`. May be answered immediately (from
    /// the wrapped factory) or may enqueue, depending on the layer.
    fn acquire(&self, conn: Conn) -> BoxFuture<'static, Result<Self::Service, Self::Error>>;

    /// Best-effort health signal: `false` means a caller could reasonably
    /// skip this factory right now. Never blocks.
    fn is_available(&self) -> bool;

    /// Begins an orderly shutdown: no more new `acquire` calls will
    /// succeed, and outstanding resources are released by `deadline`.
    /// Closing is idempotent.
    fn close(&self, deadline: std::time::Duration) -> BoxFuture<'static, ()>;
}

/// A service produced by a [`ServiceFactory`]: the `tower::Service::call`
/// contract, plus an explicit, idempotent `close` a caller invokes when
/// done using the connection (e.g. to release a cache refcount).
pub trait BoundService: Send {
    /// The request type this service accepts.
    type Request;
    /// The response type this service produces.
    type Response;
    /// The error type this service can fail with.
    type Error;

    /// Applies this service to `req`. Mirrors `tower::Service::call`
    /// without requiring `poll_ready`, since acquisition already gated
    /// admission.
    fn apply(
        &mut self,
        req: Self::Request,
    ) -> BoxFuture<'static, Result<Self::Response, Self::Error>>;

    /// Releases any resources (e.g. cache refcount) held on behalf of this
    /// service. Calling it more than once is a no-op.
    fn close(&mut self);
}

/// Something that can be closed with a deadline, independent of the
/// `ServiceFactory` trait -- used where only closability, not acquisition,
/// is relevant (e.g. a cache's internal entries).
pub trait Closable: Send + Sync {
    /// Begins an orderly shutdown, completing by `deadline` on a
    /// best-effort basis.
    fn close(&self, deadline: std::time::Duration) -> BoxFuture<'static, ()>;
}

/// An `Arc`-wrapped factory is itself a factory: this lets layers that
/// construct their child once and hand out shared handles to it (e.g.
/// `namebind-binding`'s `DtabCache`, whose entries are `Arc<DynNameFactory<..>>`)
/// plug directly into code generic over `ServiceFactory` without an extra
/// forwarding newtype.
impl<Conn, T> ServiceFactory<Conn> for Arc<T>
where
    T: ServiceFactory<Conn> + ?Sized,
{
    type Service = T::Service;
    type Error = T::Error;

    fn acquire(&self, conn: Conn) -> BoxFuture<'static, Result<Self::Service, Self::Error>> {
        (**self).acquire(conn)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn close(&self, deadline: std::time::Duration) -> BoxFuture<'static, ()> {
        (**self).close(deadline)
    }
}
