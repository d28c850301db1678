//! [`DynNameFactory`]: bridges a reactive [`Activity<BoundName, E>`] to the
//! synchronous [`ServiceFactory`] interface.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use namebind_core::name::{Activity, ActivityState, BoundName, Observer, Subscription};
use namebind_core::{EventListeners, NamerTracing, ServiceFactory, Tracer};

use crate::config::DynNameConfig;
use crate::error::DynNameError;
use crate::events::DynNameEvent;

type AcquireResult<F, Conn, E> =
    Result<<F as ServiceFactory<Conn>>::Service, DynNameError<E, <F as ServiceFactory<Conn>>::Error>>;

struct QueuedAcquire<F, Conn, E>
where
    F: ServiceFactory<Conn>,
{
    ticket: u64,
    conn: Conn,
    responder: oneshot::Sender<AcquireResult<F, Conn, E>>,
}

enum DynNameState<F, Conn, E>
where
    F: ServiceFactory<Conn>,
{
    Pending { queue: Vec<QueuedAcquire<F, Conn, E>> },
    Named { name: BoundName, factory: Arc<F> },
    Failed { error: E },
    Closed,
}

/// Bridges a reactive `Activity<BoundName, E>` to synchronous `acquire`
/// semantics, queueing requests that arrive while the name is still
/// resolving.
pub struct DynNameFactory<F, Conn, E>
where
    F: ServiceFactory<Conn>,
{
    state: Arc<Mutex<DynNameState<F, Conn, E>>>,
    subscription: Mutex<Option<Subscription>>,
    next_ticket: AtomicU64,
    pattern_name: Arc<str>,
    tracer: Arc<dyn Tracer>,
    listeners: Arc<EventListeners<DynNameEvent>>,
}

impl<F, Conn, E> DynNameFactory<F, Conn, E>
where
    F: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
    E: Clone + std::fmt::Display + Send + Sync + 'static,
{
    /// Subscribes to `activity` and begins bridging it. `new_factory` is
    /// called once, when the name first resolves (or re-resolves to a
    /// different identity), to build the child factory.
    pub fn new(
        config: DynNameConfig,
        activity: &dyn Activity<BoundName, E>,
        new_factory: impl Fn(&BoundName) -> F + Send + Sync + 'static,
    ) -> Arc<Self> {
        let factory = Arc::new(DynNameFactory {
            state: Arc::new(Mutex::new(DynNameState::Pending { queue: Vec::new() })),
            subscription: Mutex::new(None),
            next_ticket: AtomicU64::new(0),
            pattern_name: Arc::from(config.pattern_name.as_str()),
            tracer: config.tracer,
            listeners: Arc::new(config.listeners),
        });

        let observer = NameObserver {
            state: Arc::clone(&factory.state),
            new_factory: Arc::new(new_factory),
            pattern_name: Arc::clone(&factory.pattern_name),
            tracer: Arc::clone(&factory.tracer),
            listeners: Arc::clone(&factory.listeners),
        };
        let subscription = activity.subscribe(Arc::new(observer));
        *factory.subscription.lock() = Some(subscription);

        factory
    }
}

impl<F, Conn, E> DynNameFactory<F, Conn, E>
where
    F: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
    E: Clone + std::fmt::Display + Send + Sync + 'static,
{
    /// Like [`ServiceFactory::acquire`], but also returns an [`Interrupt`]
    /// handle for this specific request. Calling
    /// [`Interrupt::interrupt`] while the request is still queued (the
    /// name has not yet resolved) completes it with
    /// [`DynNameError::CancelledConnection`] wrapping the supplied cause,
    /// per spec.md §4.3/§5's caller-cancellation contract, without
    /// recording a tracer failure. The handle is harmless to call once
    /// the request has already resolved (dropped silently as a no-op).
    pub fn acquire_with_interrupt(
        &self,
        conn: Conn,
    ) -> (
        BoxFuture<'static, Result<F::Service, DynNameError<E, F::Error>>>,
        Interrupt<F, Conn, E>,
    ) {
        let mut state = self.state.lock();
        match &mut *state {
            DynNameState::Named { factory, .. } => {
                let factory = Arc::clone(factory);
                let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
                let weak_state = Arc::downgrade(&self.state);
                drop(state);
                let fut =
                    Box::pin(async move { factory.acquire(conn).await.map_err(DynNameError::Inner) });
                (fut, Interrupt { ticket, state: weak_state })
            }
            DynNameState::Failed { error } => {
                let error = error.clone();
                let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
                let weak_state = Arc::downgrade(&self.state);
                drop(state);
                NamerTracing::new(self.tracer.as_ref()).record_failure(&error);
                let fut = Box::pin(async move { Err(DynNameError::NameFailed(error)) });
                (fut, Interrupt { ticket, state: weak_state })
            }
            DynNameState::Closed => {
                let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
                let weak_state = Arc::downgrade(&self.state);
                drop(state);
                let fut = Box::pin(async { Err(DynNameError::ServiceClosed) });
                (fut, Interrupt { ticket, state: weak_state })
            }
            DynNameState::Pending { queue } => {
                let ticket = self.next_ticket.fetch_add(1, Ordering::SeqCst);
                let (tx, rx) = oneshot::channel();
                queue.push(QueuedAcquire { ticket, conn, responder: tx });
                let weak_state = Arc::downgrade(&self.state);
                drop(state);
                let fut = Box::pin(PendingAcquire {
                    ticket,
                    state: Weak::clone(&weak_state),
                    receiver: rx,
                });
                (fut, Interrupt { ticket, state: weak_state })
            }
        }
    }
}

impl<F, Conn, E> ServiceFactory<Conn> for DynNameFactory<F, Conn, E>
where
    F: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
    E: Clone + std::fmt::Display + Send + Sync + 'static,
{
    type Service = F::Service;
    type Error = DynNameError<E, F::Error>;

    fn acquire(&self, conn: Conn) -> BoxFuture<'static, Result<Self::Service, Self::Error>> {
        self.acquire_with_interrupt(conn).0
    }

    fn is_available(&self) -> bool {
        match &*self.state.lock() {
            DynNameState::Named { factory, .. } => factory.is_available(),
            _ => false,
        }
    }

    fn close(&self, deadline: Duration) -> BoxFuture<'static, ()> {
        let (queue, maybe_factory, already_closed) = {
            let mut state = self.state.lock();
            let already_closed = matches!(&*state, DynNameState::Closed);
            let previous = std::mem::replace(&mut *state, DynNameState::Closed);
            match previous {
                DynNameState::Pending { queue } => (queue, None, already_closed),
                DynNameState::Named { factory, .. } => (Vec::new(), Some(factory), already_closed),
                DynNameState::Failed { .. } | DynNameState::Closed => (Vec::new(), None, already_closed),
            }
        };

        for queued in queue {
            let _ = queued.responder.send(Err(DynNameError::ServiceClosed));
        }

        if !already_closed {
            self.subscription.lock().take();
            #[cfg(feature = "metrics")]
            metrics::counter!("namebind_dynname_closed_total", "pattern" => self.pattern_name.to_string())
                .increment(1);
            #[cfg(feature = "tracing")]
            tracing::debug!(pattern = %self.pattern_name, "dyn name factory closed");
            self.listeners.emit(&DynNameEvent::Closed {
                pattern_name: self.pattern_name.to_string(),
                timestamp: Instant::now(),
            });
        }

        match maybe_factory {
            Some(factory) => factory.close(deadline),
            None => Box::pin(async {}),
        }
    }
}

/// A pending acquisition queued while the name is still resolving.
///
/// Dropping this future before it completes, without ever calling
/// [`Interrupt::interrupt`], removes its ticket from the pending queue
/// silently: nobody is left polling it, so nothing needs to be delivered.
/// A caller that wants the request to resolve to an observable
/// [`DynNameError::CancelledConnection`] -- e.g. to record why it gave
/// up -- uses the [`Interrupt`] handle returned alongside this future by
/// [`DynNameFactory::acquire_with_interrupt`] instead of just dropping it.
struct PendingAcquire<F, Conn, E>
where
    F: ServiceFactory<Conn>,
{
    ticket: u64,
    state: Weak<Mutex<DynNameState<F, Conn, E>>>,
    receiver: oneshot::Receiver<AcquireResult<F, Conn, E>>,
}

impl<F, Conn, E> Future for PendingAcquire<F, Conn, E>
where
    F: ServiceFactory<Conn>,
{
    type Output = AcquireResult<F, Conn, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(DynNameError::ServiceClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<F, Conn, E> Drop for PendingAcquire<F, Conn, E>
where
    F: ServiceFactory<Conn>,
{
    fn drop(&mut self) {
        if let Some(state) = self.state.upgrade() {
            let mut state = state.lock();
            if let DynNameState::Pending { queue } = &mut *state {
                queue.retain(|queued| queued.ticket != self.ticket);
            }
        }
    }
}

/// A handle to interrupt one specific request issued through
/// [`DynNameFactory::acquire_with_interrupt`] with an explicit cause,
/// while it is still queued behind a pending name resolution.
///
/// Cloned tickets are never reused, so a handle only ever matches at most
/// one still-queued entry; calling [`Interrupt::interrupt`] after that
/// entry has already been drained (resolved, failed, closed, or dropped)
/// is a no-op.
pub struct Interrupt<F, Conn, E>
where
    F: ServiceFactory<Conn>,
{
    ticket: u64,
    state: Weak<Mutex<DynNameState<F, Conn, E>>>,
}

impl<F, Conn, E> Interrupt<F, Conn, E>
where
    F: ServiceFactory<Conn>,
{
    /// Completes the still-queued request this handle was issued for with
    /// [`DynNameError::CancelledConnection`] wrapping `cause`, and removes
    /// its ticket from the queue. Per spec.md §7's cancellation-propagation
    /// policy, this never records a tracer failure -- caller-initiated
    /// cancellation is not a naming failure.
    pub fn interrupt(&self, cause: Arc<dyn std::error::Error + Send + Sync>) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = state.lock();
        if let DynNameState::Pending { queue } = &mut *state {
            if let Some(pos) = queue.iter().position(|queued| queued.ticket == self.ticket) {
                let queued = queue.remove(pos);
                let _ = queued
                    .responder
                    .send(Err(DynNameError::CancelledConnection { cause }));
            }
        }
    }
}

/// The [`Observer`] registered with the subscribed-to activity. Kept
/// separate from [`DynNameFactory`] so construction doesn't need a cyclic
/// `Arc`.
struct NameObserver<F, Conn, E>
where
    F: ServiceFactory<Conn>,
{
    state: Arc<Mutex<DynNameState<F, Conn, E>>>,
    new_factory: Arc<dyn Fn(&BoundName) -> F + Send + Sync>,
    pattern_name: Arc<str>,
    tracer: Arc<dyn Tracer>,
    listeners: Arc<EventListeners<DynNameEvent>>,
}

enum PostTransitionWork<F, Conn, E>
where
    F: ServiceFactory<Conn>,
{
    None,
    StartQueued { factory: Arc<F>, queue: Vec<QueuedAcquire<F, Conn, E>> },
    FailQueued { error: E, queue: Vec<QueuedAcquire<F, Conn, E>> },
    CloseStale { factory: Arc<F> },
}

impl<F, Conn, E> Observer<BoundName, E> for NameObserver<F, Conn, E>
where
    F: ServiceFactory<Conn> + Send + Sync + 'static,
    Conn: Send + 'static,
    E: Clone + std::fmt::Display + Send + Sync + 'static,
{
    /// Applies spec.md §4.3's transition table. Must not block: the
    /// activity implementation calls this inline on whatever task is
    /// publishing the update.
    fn notify(&self, activity_state: &ActivityState<BoundName, E>) {
        let work = {
            let mut state = self.state.lock();
            match (&mut *state, activity_state) {
                (DynNameState::Closed, _) => PostTransitionWork::None,
                (_, ActivityState::Pending) => PostTransitionWork::None,

                (DynNameState::Pending { .. }, ActivityState::Ok(name)) => {
                    let factory = Arc::new((self.new_factory)(name));
                    let previous = std::mem::replace(
                        &mut *state,
                        DynNameState::Named { name: name.clone(), factory: Arc::clone(&factory) },
                    );
                    let queue = match previous {
                        DynNameState::Pending { queue } => queue,
                        _ => unreachable!("matched Pending above"),
                    };
                    PostTransitionWork::StartQueued { factory, queue }
                }
                (DynNameState::Pending { .. }, ActivityState::Failed(err)) => {
                    let previous = std::mem::replace(&mut *state, DynNameState::Failed { error: err.clone() });
                    let queue = match previous {
                        DynNameState::Pending { queue } => queue,
                        _ => unreachable!("matched Pending above"),
                    };
                    PostTransitionWork::FailQueued { error: err.clone(), queue }
                }

                (DynNameState::Named { name: current, .. }, ActivityState::Ok(new_name))
                    if current.id() == new_name.id() =>
                {
                    *current = new_name.clone();
                    PostTransitionWork::None
                }
                (DynNameState::Named { .. }, ActivityState::Ok(new_name)) => {
                    let factory = Arc::new((self.new_factory)(new_name));
                    let previous = std::mem::replace(
                        &mut *state,
                        DynNameState::Named { name: new_name.clone(), factory: Arc::clone(&factory) },
                    );
                    match previous {
                        DynNameState::Named { factory: stale, .. } => PostTransitionWork::CloseStale { factory: stale },
                        _ => unreachable!("matched Named above"),
                    }
                }
                (DynNameState::Named { .. }, ActivityState::Failed(err)) => {
                    let previous = std::mem::replace(&mut *state, DynNameState::Failed { error: err.clone() });
                    match previous {
                        DynNameState::Named { factory: stale, .. } => PostTransitionWork::CloseStale { factory: stale },
                        _ => unreachable!("matched Named above"),
                    }
                }

                (DynNameState::Failed { .. }, ActivityState::Ok(name)) => {
                    let factory = Arc::new((self.new_factory)(name));
                    *state = DynNameState::Named { name: name.clone(), factory };
                    PostTransitionWork::None
                }
                (DynNameState::Failed { error }, ActivityState::Failed(err)) => {
                    *error = err.clone();
                    PostTransitionWork::None
                }
            }
        };

        match work {
            PostTransitionWork::None => {}
            PostTransitionWork::StartQueued { factory, queue } => {
                self.emit_resolved();
                for queued in queue {
                    let factory = Arc::clone(&factory);
                    tokio::spawn(async move {
                        let result = factory.acquire(queued.conn).await.map_err(DynNameError::Inner);
                        let _ = queued.responder.send(result);
                    });
                }
            }
            PostTransitionWork::FailQueued { error, queue } => {
                self.emit_failed(&error);
                for queued in queue {
                    let _ = queued.responder.send(Err(DynNameError::NameFailed(error.clone())));
                }
            }
            PostTransitionWork::CloseStale { factory } => {
                tokio::spawn(async move {
                    factory.close(Duration::from_secs(30)).await;
                });
            }
        }
    }
}

impl<F, Conn, E> NameObserver<F, Conn, E>
where
    F: ServiceFactory<Conn>,
{
    fn emit_resolved(&self) {
        #[cfg(feature = "metrics")]
        metrics::counter!("namebind_dynname_resolved_total", "pattern" => self.pattern_name.to_string())
            .increment(1);
        #[cfg(feature = "tracing")]
        tracing::debug!(pattern = %self.pattern_name, "name resolved");
        self.listeners.emit(&DynNameEvent::Resolved {
            pattern_name: self.pattern_name.to_string(),
            timestamp: Instant::now(),
        });
    }

    fn emit_failed(&self, error: &E)
    where
        E: std::fmt::Display,
    {
        NamerTracing::new(self.tracer.as_ref()).record_failure(error);
        #[cfg(feature = "metrics")]
        metrics::counter!("namebind_dynname_failed_total", "pattern" => self.pattern_name.to_string())
            .increment(1);
        #[cfg(feature = "tracing")]
        tracing::warn!(pattern = %self.pattern_name, %error, "name resolution failed");
        self.listeners.emit(&DynNameEvent::Failed {
            pattern_name: self.pattern_name.to_string(),
            timestamp: Instant::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use namebind_core::name::Var;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration as StdDuration;

    #[derive(Debug, Clone, PartialEq)]
    struct Boom(String);
    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }
    impl std::error::Error for Boom {}

    struct StubService;
    impl namebind_core::BoundService for StubService {
        type Request = ();
        type Response = ();
        type Error = std::io::Error;

        fn apply(&mut self, _req: ()) -> BoxFuture<'static, Result<(), std::io::Error>> {
            Box::pin(async { Ok(()) })
        }
        fn close(&mut self) {}
    }

    struct StubFactory {
        acquire_count: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    }

    impl ServiceFactory<()> for StubFactory {
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

    fn stub_factory_builder(
        acquire_count: Arc<AtomicUsize>,
        closed: Arc<AtomicUsize>,
    ) -> impl Fn(&BoundName) -> StubFactory + Send + Sync + 'static {
        move |_name: &BoundName| StubFactory {
            acquire_count: Arc::clone(&acquire_count),
            closed: Arc::clone(&closed),
        }
    }

    /// S5: acquisitions issued while the name is still pending queue up and
    /// complete once resolution lands.
    #[tokio::test]
    async fn acquires_issued_while_pending_complete_once_the_name_resolves() {
        let activity: Var<BoundName, Boom> = Var::new(ActivityState::Pending);
        let acquire_count = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let factory = DynNameFactory::new(
            DynNameConfig::builder("users").build(),
            &activity,
            stub_factory_builder(Arc::clone(&acquire_count), closed),
        );

        let f1 = factory.acquire(());
        let f2 = factory.acquire(());

        activity.set(ActivityState::Ok(BoundName::new("users", vec!["10.0.0.1:80".into()])));

        let (r1, r2) = tokio::join!(f1, f2);
        assert!(r1.is_ok());
        assert!(r2.is_ok());
        assert_eq!(acquire_count.load(Ordering::SeqCst), 2);
    }

    /// S5: once named, acquire answers synchronously without re-queueing.
    #[tokio::test]
    async fn acquire_after_resolution_delegates_directly_to_the_child_factory() {
        let activity: Var<BoundName, Boom> =
            Var::new(ActivityState::Ok(BoundName::new("users", vec![])));
        let acquire_count = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let factory = DynNameFactory::new(
            DynNameConfig::builder("users").build(),
            &activity,
            stub_factory_builder(Arc::clone(&acquire_count), closed),
        );

        assert!(factory.is_available());
        factory.acquire(()).await.unwrap();
        assert_eq!(acquire_count.load(Ordering::SeqCst), 1);
    }

    /// S6: a failed resolution fails every queued acquisition with
    /// `NameFailed`, and subsequent acquires fail immediately.
    #[tokio::test]
    async fn a_failed_resolution_fails_queued_and_future_acquisitions() {
        let activity: Var<BoundName, Boom> = Var::new(ActivityState::Pending);
        let acquire_count = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let factory = DynNameFactory::new(
            DynNameConfig::builder("users").build(),
            &activity,
            stub_factory_builder(acquire_count, closed),
        );

        let queued = factory.acquire(());
        activity.set(ActivityState::Failed(Boom("no brokers available".into())));
        let result = queued.await;
        assert!(matches!(result, Err(DynNameError::NameFailed(Boom(_)))));

        let result = factory.acquire(()).await;
        assert!(matches!(result, Err(DynNameError::NameFailed(_))));
        assert!(!factory.is_available());
    }

    /// S6: dropping a pending acquisition before it resolves removes its
    /// ticket from the queue without disturbing the others.
    #[tokio::test]
    async fn dropping_a_pending_acquisition_removes_only_its_own_ticket() {
        let activity: Var<BoundName, Boom> = Var::new(ActivityState::Pending);
        let acquire_count = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let factory = DynNameFactory::new(
            DynNameConfig::builder("users").build(),
            &activity,
            stub_factory_builder(Arc::clone(&acquire_count), closed),
        );

        let cancelled = factory.acquire(());
        let kept = factory.acquire(());
        drop(cancelled);

        activity.set(ActivityState::Ok(BoundName::new("users", vec![])));
        kept.await.unwrap();
        assert_eq!(acquire_count.load(Ordering::SeqCst), 1);
    }

    /// Property 8: interrupting a still-queued acquisition with an
    /// explicit cause removes exactly that ticket and completes it with
    /// `CancelledConnection` wrapping the cause, while the surviving
    /// ticket resolves normally once the name binds.
    #[tokio::test]
    async fn interrupting_a_queued_acquisition_yields_cancelled_connection() {
        let activity: Var<BoundName, Boom> = Var::new(ActivityState::Pending);
        let acquire_count = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let factory = DynNameFactory::new(
            DynNameConfig::builder("users").build(),
            &activity,
            stub_factory_builder(Arc::clone(&acquire_count), closed),
        );

        let (cancelled, interrupt) = factory.acquire_with_interrupt(());
        let (kept, _kept_interrupt) = factory.acquire_with_interrupt(());

        let cause: Arc<dyn std::error::Error + Send + Sync> = Arc::new(Boom("caller gave up".into()));
        interrupt.interrupt(Arc::clone(&cause));

        match cancelled.await {
            Err(DynNameError::CancelledConnection { cause: got }) => {
                assert_eq!(got.to_string(), cause.to_string());
            }
            other => panic!("expected CancelledConnection, got {other:?}"),
        }

        activity.set(ActivityState::Ok(BoundName::new("users", vec![])));
        kept.await.unwrap();
        assert_eq!(
            acquire_count.load(Ordering::SeqCst),
            1,
            "the cancelled ticket must never reach the child factory"
        );
    }

    /// Interrupting after the name has already resolved (or the ticket
    /// has already been served/removed) is a harmless no-op.
    #[tokio::test]
    async fn interrupting_after_resolution_is_a_no_op() {
        let activity: Var<BoundName, Boom> =
            Var::new(ActivityState::Ok(BoundName::new("users", vec![])));
        let acquire_count = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let factory = DynNameFactory::new(
            DynNameConfig::builder("users").build(),
            &activity,
            stub_factory_builder(Arc::clone(&acquire_count), closed),
        );

        let (fut, interrupt) = factory.acquire_with_interrupt(());
        interrupt.interrupt(Arc::new(Boom("too late".into())));
        assert!(fut.await.is_ok(), "interrupt after resolution must not affect the result");
    }

    /// S6: closing drains the pending queue with `ServiceClosed` and
    /// rejects further acquires.
    #[tokio::test]
    async fn close_drains_the_pending_queue_and_rejects_further_acquires() {
        let activity: Var<BoundName, Boom> = Var::new(ActivityState::Pending);
        let acquire_count = Arc::new(AtomicUsize::new(0));
        let closed = Arc::new(AtomicUsize::new(0));
        let factory = DynNameFactory::new(
            DynNameConfig::builder("users").build(),
            &activity,
            stub_factory_builder(acquire_count, closed),
        );

        let queued = factory.acquire(());
        factory.close(StdDuration::from_secs(1)).await;

        let result = queued.await;
        assert!(matches!(result, Err(DynNameError::ServiceClosed)));

        let result = factory.acquire(()).await;
        assert!(matches!(result, Err(DynNameError::ServiceClosed)));
    }
}
