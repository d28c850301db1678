//! [`BindingFactory`]: resolves a logical path under the effective
//! delegation table and routes to a cached downstream factory.

use std::sync::Arc;

use futures::future::BoxFuture;

use namebind_cache::{CachedService, ServiceFactoryCache, ServiceFactoryCacheConfig};
use namebind_core::name::{ActivityState, Var};
use namebind_core::{BoundName, Dtab, NamerTracing, Path, ServiceFactory, Tracer};
use namebind_dynname::{DynNameConfig, DynNameFactory};

use crate::config::{BaseDtabProvider, BindingConfig};
use crate::error::{flatten_error, BindingError, ResolveFailure};
use crate::interner::NameInterner;
use crate::proxy::NameCacheProxy;
use crate::scope::current_local_dtab;

type PerDtabFactory<Conn, NF> = Arc<DynNameFactory<NameCacheProxy<Conn, NF>, Conn, ResolveFailure>>;
type DtabCache<Conn, NF> = ServiceFactoryCache<Dtab, PerDtabFactory<Conn, NF>, Conn>;
type NameCache<Conn, NF> = ServiceFactoryCache<BoundName, NF, Conn>;

/// Resolves `path` under `effective`, the way both the `DtabCache`'s
/// factory constructor and the top-level tracer annotation need to
/// (spec.md §4.4's resolution table). Pure in its inputs; the interner is
/// only consulted for the identity it returns, never mutated based on
/// anything but the resolved path set.
fn resolve(path: &Path, effective: &Dtab, interner: &NameInterner) -> Result<BoundName, ResolveFailure> {
    let bound_paths = effective.bind(path).eval();
    match bound_paths.len() {
        0 => Err(ResolveFailure::NoBrokersAvailable(path.clone())),
        1 => Ok(interner.intern(&bound_paths[0])),
        _ => Ok(interner.intern_union(&bound_paths)),
    }
}

/// Top-level coordinator: resolves a fixed logical [`Path`] under the
/// effective dtab (`base() ++ local`) on every `acquire`, caching at two
/// levels (spec.md §4.4).
///
/// `Conn` is the connection type threaded through to the child factory;
/// `NF` is that child factory's type, built once per distinct resolved
/// name by the `new_factory` callable passed to [`BindingFactory::new`].
pub struct BindingFactory<Conn, NF>
where
    NF: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
{
    path: Path,
    base_dtab_provider: BaseDtabProvider,
    tracer: Arc<dyn Tracer>,
    interner: Arc<NameInterner>,
    name_cache: Arc<NameCache<Conn, NF>>,
    dtab_cache: Arc<DtabCache<Conn, NF>>,
}

impl<Conn, NF> BindingFactory<Conn, NF>
where
    NF: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
{
    /// Builds a binding factory resolving `path`. `new_factory` is called
    /// at most once per distinct resolved `BoundName` identity, to build
    /// the child factory shared by every dtab that resolves to it.
    pub fn new(
        path: Path,
        config: BindingConfig,
        new_factory: impl Fn(&BoundName) -> NF + Send + Sync + 'static,
    ) -> Self {
        let interner = Arc::new(NameInterner::new());
        let name_cache = Arc::new(ServiceFactoryCache::new(
            ServiceFactoryCacheConfig::builder(format!("namecache[{path}]"), config.max_name_cache_size)
                .with_listeners(config.name_cache_listeners)
                .build(),
            Arc::new(move |name: &BoundName| new_factory(name)),
        ));

        let dtab_factory_path = path.clone();
        let dtab_factory_interner = Arc::clone(&interner);
        let dtab_factory_name_cache = Arc::clone(&name_cache);
        let dtab_pattern = format!("dtab[{path}]");

        let dtab_cache = Arc::new(ServiceFactoryCache::new(
            ServiceFactoryCacheConfig::builder(dtab_pattern.clone(), config.max_namer_cache_size)
                .with_listeners(config.namer_cache_listeners)
                .build(),
            Arc::new(move |dtab: &Dtab| {
                let state = match resolve(&dtab_factory_path, dtab, &dtab_factory_interner) {
                    Ok(name) => ActivityState::Ok(name),
                    Err(failure) => ActivityState::Failed(failure),
                };
                // A constant activity: this factory is built once per
                // distinct effective dtab, and the resolution above is a
                // pure function of `(path, dtab)`, so there is nothing
                // further to react to (see DESIGN.md on why this binding
                // layer resolves synchronously rather than subscribing to
                // a live namer).
                let activity: Var<BoundName, ResolveFailure> = Var::new(state);

                let name_cache = Arc::clone(&dtab_factory_name_cache);
                DynNameFactory::new(
                    DynNameConfig::builder(dtab_pattern.clone()).build(),
                    &activity,
                    move |name: &BoundName| NameCacheProxy::new(Arc::clone(&name_cache), name.clone()),
                )
            }),
        ));

        BindingFactory {
            path,
            base_dtab_provider: config.base_dtab_provider,
            tracer: config.tracer,
            interner,
            name_cache,
            dtab_cache,
        }
    }
}

impl<Conn, NF> ServiceFactory<Conn> for BindingFactory<Conn, NF>
where
    NF: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
{
    type Service = CachedService<<PerDtabFactory<Conn, NF> as ServiceFactory<Conn>>::Service>;
    type Error = BindingError<NF::Error>;

    /// Implements spec.md §4.4's acquire algorithm: computes the effective
    /// dtab, resolves it (purely for the tracer annotation -- the actual
    /// dispatch goes through `DtabCache`, which recomputes the same pure
    /// function once per distinct key rather than once per request), then
    /// annotates a `NoBrokersAvailable` failure with the offending local
    /// dtab whenever one was in scope.
    fn acquire(&self, conn: Conn) -> BoxFuture<'static, Result<Self::Service, Self::Error>> {
        let local = current_local_dtab();
        let effective = (self.base_dtab_provider)().concat(&local);

        let path = self.path.clone();
        let interner = Arc::clone(&self.interner);
        let tracer = Arc::clone(&self.tracer);

        let trace = NamerTracing::new(tracer.as_ref());
        trace.record_attempt(&path, &effective);
        match resolve(&path, &effective, &interner) {
            Ok(name) => trace.record_success(&name),
            Err(failure) => trace.record_failure(&failure),
        }

        let dtab_cache = Arc::clone(&self.dtab_cache);
        Box::pin(async move {
            dtab_cache
                .acquire(effective, conn)
                .await
                .map_err(|err| flatten_error(err, &local))
        })
    }

    /// Delegates to the `DtabCache` only. Documented quirk (spec.md §9,
    /// §4.4): the `NameCache`'s own availability is not consulted, so this
    /// is a coarse approximation, not a precise health signal.
    fn is_available(&self) -> bool {
        self.dtab_cache.is_available()
    }

    /// Closes both caches in sequence (spec.md §4.4).
    fn close(&self, deadline: std::time::Duration) -> BoxFuture<'static, ()> {
        let dtab_cache = Arc::clone(&self.dtab_cache);
        let name_cache = Arc::clone(&self.name_cache);
        Box::pin(async move {
            dtab_cache.close(deadline).await;
            name_cache.close(deadline).await;
        })
    }
}
