//! Demonstrates refcount-gated eviction: a pinned entry survives capacity
//! pressure that would otherwise evict it, and releasing it unblocks
//! eviction for the next caller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use namebind_cache::{ServiceFactoryCache, ServiceFactoryCacheConfig};
use namebind_core::{BoundService, ServiceFactory};

struct EchoService(String);
impl BoundService for EchoService {
    type Request = ();
    type Response = String;
    type Error = std::io::Error;

    fn apply(&mut self, _req: ()) -> BoxFuture<'static, Result<String, std::io::Error>> {
        let label = self.0.clone();
        Box::pin(async move { Ok(format!("response from {label}")) })
    }
    fn close(&mut self) {}
}

struct EchoFactory {
    label: String,
}

impl ServiceFactory<()> for EchoFactory {
    type Service = EchoService;
    type Error = std::io::Error;

    fn acquire(&self, _conn: ()) -> BoxFuture<'static, Result<EchoService, std::io::Error>> {
        let label = self.label.clone();
        Box::pin(async move { Ok(EchoService(label)) })
    }
    fn is_available(&self) -> bool {
        true
    }
    fn close(&self, _deadline: Duration) -> BoxFuture<'static, ()> {
        Box::pin(async {})
    }
}

#[tokio::main]
async fn main() {
    println!("namebind-cache example\n=======================\n");

    let builds = Arc::new(AtomicUsize::new(0));
    let builds_for_factory = Arc::clone(&builds);

    let cache: ServiceFactoryCache<String, EchoFactory, ()> = ServiceFactoryCache::new(
        ServiceFactoryCacheConfig::builder("demo", 1)
            .on_eviction(|_event: &_| println!("  [event] entry evicted"))
            .on_one_shot(|_event: &_| println!("  [event] one-shot path taken"))
            .build(),
        Arc::new(move |key: &String| {
            builds_for_factory.fetch_add(1, Ordering::SeqCst);
            EchoFactory { label: key.clone() }
        }),
    );

    println!("acquiring \"alice\" and holding the service open...");
    let alice = cache.acquire("alice".to_string(), ()).await.unwrap();

    println!("acquiring \"bob\" while capacity is 1 and \"alice\" is pinned");
    let bob = cache.acquire("bob".to_string(), ()).await.unwrap();
    println!("cache size is still {} (bob took the one-shot path)", cache.len());

    drop(bob);
    drop(alice);
    tokio::task::yield_now().await;

    println!("after releasing both, acquiring \"carol\" evicts \"alice\"'s now-unpinned slot");
    let _carol = cache.acquire("carol".to_string(), ()).await.unwrap();
    println!("cache size: {}", cache.len());

    println!("\ntotal factories built: {}", builds.load(Ordering::SeqCst));
}
