//! A bounded, refcount-gated cache of [`ServiceFactory`] instances keyed by
//! `K`.
//!
//! Unlike a plain LRU cache, an entry here is never evicted while it is in
//! use: each [`CachedService`] produced by [`ServiceFactoryCache::acquire`]
//! holds a pin on its entry until the caller closes it. Eviction picks the
//! least-recently-used entry *among those with a zero refcount*; if every
//! cached entry is pinned when capacity is reached, the cache takes a
//! one-shot path instead of blocking or rejecting the caller: it builds a
//! fresh, uncached factory, serves exactly one acquisition from it, and
//! closes it as soon as that one service is closed.
//!
//! Structural mutation (insert, evict, refcount change) is serialised
//! behind a single mutex; no factory call or close ever happens while that
//! mutex is held.

mod config;
mod error;
mod events;
mod store;

pub use config::{ServiceFactoryCacheConfig, ServiceFactoryCacheConfigBuilder};
pub use error::CacheError;
pub use events::CacheEvent;

use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use parking_lot::Mutex;

use namebind_core::{BoundService, ServiceFactory};

use store::{CacheEntry, Store};

/// How long an evicted or one-shot factory's `close` is given before being
/// abandoned. Every cache instance currently uses this conservative
/// default; it is not yet exposed on the builder.
const DEFAULT_EVICTION_DEADLINE: Duration = Duration::from_secs(30);

/// Constructs a new factory for a key not currently cached.
pub type NewFactory<K, F> = Arc<dyn Fn(&K) -> F + Send + Sync>;

/// A bounded cache of child [`ServiceFactory`] instances.
///
/// `K` is the cache key (e.g. an effective Dtab or a `BoundName` identity);
/// `F` is the factory type cached per key; `Conn` is the connection type
/// passed through to each factory's `acquire`.
pub struct ServiceFactoryCache<K, F, Conn>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
{
    state: Arc<Mutex<Store<K, F>>>,
    new_factory: NewFactory<K, F>,
    config: Arc<ServiceFactoryCacheConfig>,
    _conn: std::marker::PhantomData<fn() -> Conn>,
}

impl<K, F, Conn> ServiceFactoryCache<K, F, Conn>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    F: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
{
    /// Builds an empty cache. `new_factory` is called (at most once per
    /// currently-uncached key) to construct the factory for that key, on
    /// both the normal insert path and the one-shot path.
    pub fn new(config: ServiceFactoryCacheConfig, new_factory: NewFactory<K, F>) -> Self {
        ServiceFactoryCache {
            state: Arc::new(Mutex::new(Store::new())),
            new_factory,
            config: Arc::new(config),
            _conn: std::marker::PhantomData,
        }
    }

    /// The number of distinct keys currently cached (admitted, not
    /// one-shot).
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// True if no keys are currently cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Acquires a service for `key`, creating and admitting a factory for
    /// it if one is not already cached (evicting an unpinned entry first if
    /// at capacity, or falling back to the one-shot path if every entry is
    /// pinned).
    pub async fn acquire(
        &self,
        key: K,
        conn: Conn,
    ) -> Result<CachedService<F::Service>, CacheError<F::Error>> {
        enum Plan<F> {
            Existing(Arc<F>),
            Insert(Arc<F>),
            OneShot(Arc<F>),
        }

        let plan = {
            let mut store = self.state.lock();
            if store.closed {
                return Err(CacheError::Closed);
            }

            if let Some(entry) = store.entries.get_mut(&key) {
                entry.refcount += 1;
                entry.last_use_time = Instant::now();
                Plan::Existing(Arc::clone(&entry.factory))
            } else if store.entries.len() < self.config.max_size {
                let factory = Arc::new((self.new_factory)(&key));
                store.entries.insert(
                    key.clone(),
                    CacheEntry {
                        factory: Arc::clone(&factory),
                        refcount: 1,
                        last_use_time: Instant::now(),
                    },
                );
                Plan::Insert(factory)
            } else if let Some(evict_key) = store.lru_unpinned_key() {
                let evicted = store.entries.remove(&evict_key).expect("key just found");
                close_in_background(evicted.factory, DEFAULT_EVICTION_DEADLINE);
                self.emit_eviction();

                let factory = Arc::new((self.new_factory)(&key));
                store.entries.insert(
                    key.clone(),
                    CacheEntry {
                        factory: Arc::clone(&factory),
                        refcount: 1,
                        last_use_time: Instant::now(),
                    },
                );
                Plan::Insert(factory)
            } else {
                self.emit_one_shot();
                Plan::OneShot(Arc::new((self.new_factory)(&key)))
            }
        };

        self.record_size();

        match plan {
            Plan::Existing(factory) | Plan::Insert(factory) => match factory.acquire(conn).await {
                Ok(service) => Ok(CachedService::new(
                    service,
                    release_decrement(key, Arc::downgrade(&self.state)),
                )),
                Err(err) => {
                    self.release_without_service(&key);
                    Err(CacheError::Inner(err))
                }
            },
            Plan::OneShot(factory) => match factory.acquire(conn).await {
                Ok(service) => Ok(CachedService::new(
                    service,
                    release_close_one_shot(factory, DEFAULT_EVICTION_DEADLINE),
                )),
                Err(err) => Err(CacheError::Inner(err)),
            },
        }
    }

    /// `true` if every cached factory reports itself available, or the
    /// cache currently holds no entries.
    pub fn is_available(&self) -> bool {
        self.state
            .lock()
            .entries
            .values()
            .all(|entry| entry.factory.is_available())
    }

    /// Closes every cached factory (concurrently, each bounded by
    /// `deadline`) and marks the cache closed so further `acquire` calls
    /// fail with [`CacheError::Closed`].
    pub async fn close(&self, deadline: Duration) {
        let factories: Vec<Arc<F>> = {
            let mut store = self.state.lock();
            store.closed = true;
            store.entries.drain().map(|(_, entry)| entry.factory).collect()
        };
        futures::future::join_all(factories.iter().map(|f| f.close(deadline))).await;
    }

    fn release_without_service(&self, key: &K) {
        let mut store = self.state.lock();
        if let Some(entry) = store.entries.get_mut(key) {
            entry.refcount = entry.refcount.saturating_sub(1);
        }
    }

    fn record_size(&self) {
        #[cfg(feature = "metrics")]
        {
            let size = self.len();
            metrics::gauge!("namebind_cache_size", "pattern" => self.config.pattern_name.clone())
                .set(size as f64);
        }
    }

    fn emit_eviction(&self) {
        #[cfg(feature = "metrics")]
        metrics::counter!("namebind_cache_evictions_total", "pattern" => self.config.pattern_name.clone())
            .increment(1);
        #[cfg(feature = "tracing")]
        tracing::debug!(pattern = %self.config.pattern_name, "evicting unpinned cache entry");
        self.config.listeners.emit(&CacheEvent::Eviction {
            pattern_name: self.config.pattern_name.clone(),
            timestamp: Instant::now(),
        });
    }

    fn emit_one_shot(&self) {
        #[cfg(feature = "metrics")]
        metrics::counter!("namebind_cache_one_shot_total", "pattern" => self.config.pattern_name.clone())
            .increment(1);
        #[cfg(feature = "tracing")]
        tracing::debug!(pattern = %self.config.pattern_name, "every entry pinned, taking one-shot path");
        self.config.listeners.emit(&CacheEvent::OneShot {
            pattern_name: self.config.pattern_name.clone(),
            timestamp: Instant::now(),
        });
    }
}

fn close_in_background<F, Conn>(factory: Arc<F>, deadline: Duration)
where
    F: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
{
    tokio::spawn(async move {
        factory.close(deadline).await;
    });
}

fn release_decrement<K, F>(key: K, state: Weak<Mutex<Store<K, F>>>) -> Box<dyn FnOnce() + Send>
where
    K: Eq + Hash + Send + 'static,
    F: Send + Sync + 'static,
{
    Box::new(move || {
        if let Some(state) = state.upgrade() {
            let mut store = state.lock();
            if let Some(entry) = store.entries.get_mut(&key) {
                entry.refcount = entry.refcount.saturating_sub(1);
            }
        }
    })
}

fn release_close_one_shot<F, Conn>(factory: Arc<F>, deadline: Duration) -> Box<dyn FnOnce() + Send>
where
    F: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
{
    Box::new(move || {
        tokio::spawn(async move {
            factory.close(deadline).await;
        });
    })
}

/// A service produced through a [`ServiceFactoryCache`]. Closing it
/// releases the cache's pin on the entry that produced it (or, on the
/// one-shot path, closes the uncached factory outright).
pub struct CachedService<S> {
    inner: S,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl<S> CachedService<S> {
    fn new(inner: S, release: Box<dyn FnOnce() + Send>) -> Self {
        CachedService {
            inner,
            release: Some(release),
        }
    }
}

impl<S> BoundService for CachedService<S>
where
    S: BoundService,
{
    type Request = S::Request;
    type Response = S::Response;
    type Error = S::Error;

    fn apply(&mut self, req: Self::Request) -> BoxFuture<'static, Result<Self::Response, Self::Error>> {
        self.inner.apply(req)
    }

    fn close(&mut self) {
        self.inner.close();
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubService;
    impl BoundService for StubService {
        type Request = ();
        type Response = ();
        type Error = std::io::Error;

        fn apply(&mut self, _req: ()) -> BoxFuture<'static, Result<(), std::io::Error>> {
            Box::pin(async { Ok(()) })
        }
        fn close(&mut self) {}
    }

    struct CountingFactory {
        acquire_count: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    impl ServiceFactory<()> for CountingFactory {
        type Service = StubService;
        type Error = std::io::Error;

        fn acquire(&self, _conn: ()) -> BoxFuture<'static, Result<StubService, std::io::Error>> {
            self.acquire_count.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(StubService) })
        }

        fn is_available(&self) -> bool {
            true
        }

        fn close(&self, _deadline: Duration) -> BoxFuture<'static, ()> {
            let closed = Arc::clone(&self.closed);
            Box::pin(async move {
                closed.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    fn counting_factory_builder(
        acquire_count: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    ) -> NewFactory<String, CountingFactory> {
        Arc::new(move |_key: &String| CountingFactory {
            acquire_count: Arc::clone(&acquire_count),
            closed: Arc::clone(&closed),
        })
    }

    /// Property 4 / S2: a fresh key builds and admits a factory exactly
    /// once; repeat acquires for the same key reuse it.
    #[tokio::test]
    async fn repeat_acquires_for_the_same_key_reuse_the_cached_factory() {
        let acquire_count = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let cache: ServiceFactoryCache<String, CountingFactory, ()> = ServiceFactoryCache::new(
            ServiceFactoryCacheConfig::builder("names", 4).build(),
            counting_factory_builder(Arc::clone(&acquire_count), closed),
        );

        let s1 = cache.acquire("a".into(), ()).await.unwrap();
        let s2 = cache.acquire("a".into(), ()).await.unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(acquire_count.load(Ordering::SeqCst), 2);
        drop(s1);
        drop(s2);
    }

    /// Property 5 / S3: at capacity with every entry pinned, a new key
    /// takes the one-shot path rather than evicting a pinned entry.
    #[tokio::test]
    async fn every_entry_pinned_takes_the_one_shot_path() {
        let acquire_count = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let cache: ServiceFactoryCache<String, CountingFactory, ()> = ServiceFactoryCache::new(
            ServiceFactoryCacheConfig::builder("names", 1).build(),
            counting_factory_builder(Arc::clone(&acquire_count), Arc::clone(&closed)),
        );

        let pinned = cache.acquire("a".into(), ()).await.unwrap();
        assert_eq!(cache.len(), 1);

        let one_shot = cache.acquire("b".into(), ()).await.unwrap();
        // The one-shot factory was never admitted.
        assert_eq!(cache.len(), 1);

        drop(one_shot);
        tokio::task::yield_now().await;
        assert_eq!(closed.load(Ordering::SeqCst), 1, "one-shot factory should be closed on release");

        drop(pinned);
    }

    /// S4: at capacity with an unpinned entry present, acquiring a new key
    /// evicts the unpinned (LRU) entry and admits the new one.
    #[tokio::test]
    async fn eviction_makes_room_for_a_new_key_when_unpinned_entries_exist() {
        let acquire_count = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let cache: ServiceFactoryCache<String, CountingFactory, ()> = ServiceFactoryCache::new(
            ServiceFactoryCacheConfig::builder("names", 1).build(),
            counting_factory_builder(Arc::clone(&acquire_count), Arc::clone(&closed)),
        );

        let first = cache.acquire("a".into(), ()).await.unwrap();
        drop(first); // refcount back to 0, now evictable

        let _second = cache.acquire("b".into(), ()).await.unwrap();
        tokio::task::yield_now().await;

        assert_eq!(cache.len(), 1);
        assert_eq!(closed.load(Ordering::SeqCst), 1, "evicted factory should be closed");
    }

    #[tokio::test]
    async fn is_available_is_true_when_empty_and_reflects_cached_factories() {
        let acquire_count = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let cache: ServiceFactoryCache<String, CountingFactory, ()> = ServiceFactoryCache::new(
            ServiceFactoryCacheConfig::builder("names", 4).build(),
            counting_factory_builder(acquire_count, closed),
        );

        assert!(cache.is_available());
        let _service = cache.acquire("a".into(), ()).await.unwrap();
        assert!(cache.is_available());
    }

    #[tokio::test]
    async fn close_closes_every_entry_and_rejects_further_acquires() {
        let acquire_count = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let cache: ServiceFactoryCache<String, CountingFactory, ()> = ServiceFactoryCache::new(
            ServiceFactoryCacheConfig::builder("names", 4).build(),
            counting_factory_builder(acquire_count, Arc::clone(&closed)),
        );

        let _service = cache.acquire("a".into(), ()).await.unwrap();
        cache.close(Duration::from_secs(1)).await;

        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(matches!(
            cache.acquire("b".into(), ()).await,
            Err(CacheError::Closed)
        ));
    }
}
