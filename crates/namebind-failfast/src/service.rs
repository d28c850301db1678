//! [`FailFastFactory`]: the wrapping `ServiceFactory` and its single-consumer
//! event processor.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::{mpsc, Notify};

use namebind_core::{BindError, BoundService, ServiceFactory};

use crate::backoff::Backoffs;
use crate::config::FailFastConfig;
use crate::events::FailFastEvent;
use crate::state::{transition, FailFastState, Observation};

/// Wraps a single downstream [`ServiceFactory`] with the fast-fail health
/// state machine described in spec §4.1.
///
/// `Conn` must be [`Default`] so the background probe loop can construct a
/// "null connection" to exercise the endpoint with (spec §4.1, "probe:
/// call wrapped factory with a null connection") without needing a real
/// caller-supplied connection.
pub struct FailFastFactory<Conn, F>
where
    F: ServiceFactory<Conn>,
{
    inner: Arc<F>,
    state: Arc<Mutex<FailFastState>>,
    tx: mpsc::UnboundedSender<Observation>,
    shutdown: Arc<Notify>,
    processor_done: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
    _conn: PhantomData<fn() -> Conn>,
}

impl<Conn, F> FailFastFactory<Conn, F>
where
    Conn: Default + Send + 'static,
    F: ServiceFactory<Conn> + Send + Sync + 'static,
{
    /// Wraps `inner` with a fast-fail state machine configured by `config`,
    /// spawning the single-consumer event processor.
    pub fn new(inner: F, config: FailFastConfig) -> Self {
        let inner = Arc::new(inner);
        let state = Arc::new(Mutex::new(FailFastState::Ok));
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(Notify::new());
        let processor_done = Arc::new(AtomicBool::new(false));
        let closed = Arc::new(AtomicBool::new(false));
        let epoch = Arc::new(AtomicU64::new(0));

        let backoffs = if config.backoffs_exhaust {
            Backoffs::finite(config.backoffs.clone())
        } else {
            Backoffs::new(config.backoffs.clone())
        };

        tokio::spawn(run_processor(
            rx,
            Arc::clone(&state),
            backoffs,
            Arc::clone(&inner),
            tx.clone(),
            epoch,
            Arc::new(config.listeners),
            Arc::from(config.pattern_name.as_str()),
            Arc::clone(&shutdown),
            Arc::clone(&processor_done),
        ));

        FailFastFactory {
            inner,
            state,
            tx,
            shutdown,
            processor_done,
            closed,
            _conn: PhantomData,
        }
    }

    /// The current health state, for tests and diagnostics.
    pub fn health(&self) -> FailFastState {
        self.state.lock().clone()
    }

    /// `unhealthy_for_ms` gauge value (spec §4.1 instrumentation).
    pub fn unhealthy_for_ms(&self) -> u64 {
        self.state.lock().unhealthy_for_ms(Instant::now())
    }

    /// `unhealthy_num_tries` gauge value (spec §4.1 instrumentation).
    pub fn unhealthy_num_tries(&self) -> u32 {
        self.state.lock().unhealthy_num_tries()
    }
}

impl<Conn, F> ServiceFactory<Conn> for FailFastFactory<Conn, F>
where
    Conn: Default + Send + 'static,
    F: ServiceFactory<Conn> + Send + Sync + 'static,
{
    type Service = F::Service;
    type Error = BindError<F::Error>;

    fn acquire(&self, conn: Conn) -> BoxFuture<'static, Result<Self::Service, Self::Error>> {
        if matches!(&*self.state.lock(), FailFastState::Retrying { .. }) {
            return Box::pin(async { Err(BindError::endpoint_marked_down()) });
        }

        let inner = Arc::clone(&self.inner);
        let tx = self.tx.clone();
        Box::pin(async move {
            match inner.acquire(conn).await {
                Ok(service) => {
                    let _ = tx.send(Observation::Success);
                    Ok(service)
                }
                Err(err) => {
                    let _ = tx.send(Observation::Fail);
                    Err(BindError::Inner(err))
                }
            }
        })
    }

    fn is_available(&self) -> bool {
        matches!(&*self.state.lock(), FailFastState::Ok) && self.inner.is_available()
    }

    fn close(&self, deadline: Duration) -> BoxFuture<'static, ()> {
        let already_closed = self.closed.swap(true, Ordering::SeqCst);
        if !already_closed {
            let _ = self.tx.send(Observation::Close);
        }
        let shutdown = Arc::clone(&self.shutdown);
        let processor_done = Arc::clone(&self.processor_done);
        let inner = Arc::clone(&self.inner);
        Box::pin(async move {
            loop {
                if processor_done.load(Ordering::SeqCst) {
                    break;
                }
                let notified = shutdown.notified();
                if processor_done.load(Ordering::SeqCst) {
                    break;
                }
                notified.await;
            }
            inner.close(deadline).await;
        })
    }
}

/// The single-consumer loop that is the only mutator of `state` (spec §5).
///
/// Runs until it processes an `Observation::Close`, at which point it
/// publishes the terminal state, bumps `epoch` so any in-flight timer is
/// ignored when it fires, and notifies `shutdown` waiters.
#[allow(clippy::too_many_arguments)]
async fn run_processor<Conn, F>(
    mut rx: mpsc::UnboundedReceiver<Observation>,
    state: Arc<Mutex<FailFastState>>,
    mut backoffs: Backoffs,
    inner: Arc<F>,
    tx: mpsc::UnboundedSender<Observation>,
    epoch: Arc<AtomicU64>,
    listeners: Arc<namebind_core::EventListeners<FailFastEvent>>,
    pattern_name: Arc<str>,
    shutdown: Arc<Notify>,
    processor_done: Arc<AtomicBool>,
) where
    Conn: Default + Send + 'static,
    F: ServiceFactory<Conn> + Send + Sync + 'static,
{
    while let Some(observation) = rx.recv().await {
        let now = Instant::now();
        let before = state.lock().clone();
        let after = transition(before.clone(), observation, now, &mut backoffs);

        if before != after {
            *state.lock() = after.clone();
            emit_transition(&listeners, &pattern_name, &before, &after, now);

            // A fresh down-episode should always start the schedule over
            // from its head, whether recovery came from real traffic
            // (`Success`) or the schedule's own optimistic exhaustion.
            if matches!(before, FailFastState::Retrying { .. }) && matches!(after, FailFastState::Ok) {
                backoffs.reset();
            }
        }

        match observation {
            Observation::Fail | Observation::TimeoutFail => {
                if let FailFastState::Retrying { next_deadline, .. } = after {
                    schedule_timer(next_deadline, Arc::clone(&epoch), tx.clone());
                }
            }
            Observation::Timeout => {
                let snapshot = state.lock().clone();
                if matches!(snapshot, FailFastState::Retrying { .. }) && snapshot.probe_due(now) {
                    spawn_probe(Arc::clone(&inner), tx.clone());
                }
            }
            Observation::Close => {
                epoch.fetch_add(1, Ordering::SeqCst);
                processor_done.store(true, Ordering::SeqCst);
                shutdown.notify_waiters();
                break;
            }
            Observation::Success => {}
        }
    }
    processor_done.store(true, Ordering::SeqCst);
    shutdown.notify_waiters();
}

fn emit_transition(
    listeners: &namebind_core::EventListeners<FailFastEvent>,
    pattern_name: &Arc<str>,
    before: &FailFastState,
    after: &FailFastState,
    now: Instant,
) {
    match (before, after) {
        (FailFastState::Ok, FailFastState::Retrying { ntries, .. }) => {
            #[cfg(feature = "metrics")]
            metrics::counter!("failfast_marked_dead_total", "pattern" => pattern_name.to_string())
                .increment(1);
            #[cfg(feature = "tracing")]
            tracing::warn!(pattern = %pattern_name, ntries, "endpoint marked down");
            listeners.emit(&FailFastEvent::MarkedDead {
                pattern_name: pattern_name.to_string(),
                ntries: *ntries,
                timestamp: now,
            });
        }
        (FailFastState::Retrying { ntries, .. }, FailFastState::Ok) => {
            #[cfg(feature = "metrics")]
            metrics::counter!("failfast_marked_available_total", "pattern" => pattern_name.to_string())
                .increment(1);
            #[cfg(feature = "tracing")]
            tracing::info!(pattern = %pattern_name, ntries_cleared = ntries, "endpoint recovered");
            listeners.emit(&FailFastEvent::MarkedAvailable {
                pattern_name: pattern_name.to_string(),
                ntries_cleared: *ntries,
                timestamp: now,
            });
        }
        _ => {}
    }
}

fn schedule_timer(
    deadline: Instant,
    epoch: Arc<AtomicU64>,
    tx: mpsc::UnboundedSender<Observation>,
) {
    let observed_epoch = epoch.load(Ordering::SeqCst);
    tokio::spawn(async move {
        tokio::time::sleep_until(deadline.into()).await;
        if epoch.load(Ordering::SeqCst) == observed_epoch {
            let _ = tx.send(Observation::Timeout);
        }
    });
}

fn spawn_probe<Conn, F>(inner: Arc<F>, tx: mpsc::UnboundedSender<Observation>)
where
    Conn: Default + Send + 'static,
    F: ServiceFactory<Conn> + Send + Sync + 'static,
{
    tokio::spawn(async move {
        match inner.acquire(Conn::default()).await {
            Ok(mut service) => {
                service.close();
                let _ = tx.send(Observation::Success);
            }
            Err(_) => {
                let _ = tx.send(Observation::TimeoutFail);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use namebind_core::Closable;
    use std::sync::atomic::AtomicUsize;
    use tokio::time::{advance, pause};

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

    struct FlakyFactory {
        acquire_count: AtomicUsize,
        fail_first_n: usize,
    }

    impl ServiceFactory<()> for FlakyFactory {
        type Service = StubService;
        type Error = std::io::Error;

        fn acquire(&self, _conn: ()) -> BoxFuture<'static, Result<StubService, std::io::Error>> {
            let n = self.acquire_count.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if n < self.fail_first_n {
                    Err(std::io::Error::other("boom"))
                } else {
                    Ok(StubService)
                }
            })
        }

        fn is_available(&self) -> bool {
            true
        }

        fn close(&self, _deadline: Duration) -> BoxFuture<'static, ()> {
            Box::pin(async {})
        }
    }

    /// S1: first call fails, subsequent calls within the window fast-fail
    /// without touching the wrapped factory; after the timer tick the
    /// probe succeeds and the next caller reaches the wrapped factory.
    #[tokio::test(start_paused = true)]
    async fn s1_fastfail_opens_then_closes_after_probe_recovers() {
        let inner = FlakyFactory {
            acquire_count: AtomicUsize::new(0),
            fail_first_n: 1,
        };
        let config = FailFastConfig::builder("s1")
            .backoffs(vec![Duration::from_millis(50)])
            .build();
        let factory: FailFastFactory<(), FlakyFactory> = FailFastFactory::new(inner, config);

        assert!(factory.acquire(()).await.is_err());
        tokio::task::yield_now().await;

        let err = factory.acquire(()).await.unwrap_err();
        assert_eq!(err.kind(), Some(namebind_core::ErrorKind::EndpointMarkedDown));
        assert_eq!(factory.inner.acquire_count.load(Ordering::SeqCst), 1);

        advance(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert!(matches!(factory.health(), FailFastState::Ok));

        let result = factory.acquire(()).await;
        assert!(result.is_ok());
        assert_eq!(factory.inner.acquire_count.load(Ordering::SeqCst), 2);
    }

    /// S7: with a 1-element backoff list, the probe itself fails, which
    /// triggers optimistic recovery rather than scheduling another probe.
    #[tokio::test(start_paused = true)]
    async fn s7_optimistic_recovery_after_single_element_schedule_exhausts() {
        let inner = FlakyFactory {
            acquire_count: AtomicUsize::new(0),
            fail_first_n: 2,
        };
        let config = FailFastConfig::builder("s7")
            .exhausting_backoffs(vec![Duration::from_millis(10)])
            .build();
        let factory: FailFastFactory<(), FlakyFactory> = FailFastFactory::new(inner, config);

        assert!(factory.acquire(()).await.is_err());
        tokio::task::yield_now().await;
        assert!(matches!(factory.health(), FailFastState::Retrying { .. }));

        advance(Duration::from_millis(20)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        assert!(matches!(factory.health(), FailFastState::Ok));
        assert_eq!(factory.unhealthy_num_tries(), 0);
    }

    struct SequenceFactory {
        acquire_count: AtomicUsize,
        fail_calls: Vec<usize>,
    }

    impl ServiceFactory<()> for SequenceFactory {
        type Service = StubService;
        type Error = std::io::Error;

        fn acquire(&self, _conn: ()) -> BoxFuture<'static, Result<StubService, std::io::Error>> {
            let n = self.acquire_count.fetch_add(1, Ordering::SeqCst);
            let should_fail = self.fail_calls.contains(&n);
            Box::pin(async move {
                if should_fail {
                    Err(std::io::Error::other("boom"))
                } else {
                    Ok(StubService)
                }
            })
        }

        fn is_available(&self) -> bool {
            true
        }

        fn close(&self, _deadline: Duration) -> BoxFuture<'static, ()> {
            Box::pin(async {})
        }
    }

    /// A fresh down-episode must consume the backoff schedule from its
    /// head, not continue from wherever the previous episode left off --
    /// otherwise a recovered-then-failing-again endpoint inherits a stale,
    /// much longer backoff than a first-time failure would get.
    #[tokio::test(start_paused = true)]
    async fn recovering_resets_the_backoff_schedule_for_the_next_episode() {
        let inner = SequenceFactory {
            acquire_count: AtomicUsize::new(0),
            // call 0 (caller): fails, opening the first episode.
            // call 1 (probe): succeeds, recovering to Ok.
            // call 2 (caller): fails again, opening a second episode.
            fail_calls: vec![0, 2],
        };
        let config = FailFastConfig::builder("reset")
            .backoffs(vec![Duration::from_millis(50), Duration::from_secs(100)])
            .build();
        let factory: FailFastFactory<(), SequenceFactory> = FailFastFactory::new(inner, config);

        assert!(factory.acquire(()).await.is_err());
        tokio::task::yield_now().await;
        assert!(matches!(factory.health(), FailFastState::Retrying { .. }));

        // Let the timer fire; the probe (call 1) succeeds, recovering to
        // Ok and resetting the schedule.
        advance(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert!(matches!(factory.health(), FailFastState::Ok));

        // A fresh failure (call 2) should schedule at the *first* backoff
        // entry again, not the second (100s) one the prior episode had
        // already advanced to.
        assert!(factory.acquire(()).await.is_err());
        tokio::task::yield_now().await;
        match factory.health() {
            FailFastState::Retrying { next_deadline, .. } => {
                let remaining = next_deadline.saturating_duration_since(Instant::now());
                assert!(
                    remaining < Duration::from_secs(1),
                    "expected the schedule to reset to its short first entry, got {remaining:?}"
                );
            }
            other => panic!("expected Retrying, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn acquire_never_touches_the_wrapped_factory_while_retrying() {
        let inner = FlakyFactory {
            acquire_count: AtomicUsize::new(0),
            fail_first_n: usize::MAX,
        };
        let config = FailFastConfig::builder("gate")
            .backoffs(vec![Duration::from_secs(60)])
            .build();
        let factory: FailFastFactory<(), FlakyFactory> = FailFastFactory::new(inner, config);

        assert!(factory.acquire(()).await.is_err());
        for _ in 0..10 {
            assert!(factory.acquire(()).await.is_err());
        }
        assert_eq!(factory.inner.acquire_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn is_available_is_false_while_retrying_even_if_inner_is_available() {
        let inner = FlakyFactory {
            acquire_count: AtomicUsize::new(0),
            fail_first_n: 1,
        };
        let config = FailFastConfig::builder("avail")
            .backoffs(vec![Duration::from_secs(60)])
            .build();
        let factory: FailFastFactory<(), FlakyFactory> = FailFastFactory::new(inner, config);

        assert!(factory.is_available());
        let _ = factory.acquire(()).await;
        tokio::task::yield_now().await;
        assert!(!factory.is_available());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_closes_the_wrapped_factory() {
        let inner = FlakyFactory {
            acquire_count: AtomicUsize::new(0),
            fail_first_n: 0,
        };
        let config = FailFastConfig::builder("close").build();
        let factory: FailFastFactory<(), FlakyFactory> = FailFastFactory::new(inner, config);

        factory.close(Duration::from_secs(1)).await;
        factory.close(Duration::from_secs(1)).await;
        assert!(matches!(factory.health(), FailFastState::Ok));
    }
}
