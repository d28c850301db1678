//! Bound names and the reactive [`Activity`] they're observed through.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A resolved target: an opaque identity plus whatever address/metadata
/// information the layer below (load balancer) needs.
///
/// Two `BoundName`s are equal, and hash equally, iff they share the same
/// identity -- the address set and metadata are not part of the key, so a
/// name can update its observed addresses without changing cache identity.
#[derive(Debug, Clone)]
pub struct BoundName {
    id: u64,
    label: Arc<str>,
    addresses: Arc<[String]>,
}

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl BoundName {
    /// Creates a new bound name with a fresh identity.
    pub fn new(label: impl Into<Arc<str>>, addresses: Vec<String>) -> Self {
        BoundName {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            label: label.into(),
            addresses: addresses.into(),
        }
    }

    /// The human-readable label used in tracing annotations
    /// (`namer.name`).
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The currently observed address set.
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// Opaque identity, stable across address-set updates.
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for BoundName {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for BoundName {}

impl Hash for BoundName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for BoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// A value observed reactively over time: the current state of a
/// subscription, as it would be delivered to a subscriber.
#[derive(Debug, Clone)]
pub enum ActivityState<T, E> {
    /// No value has been produced yet.
    Pending,
    /// The activity currently holds a value.
    Ok(T),
    /// The activity has failed; no value is available.
    Failed(E),
}

impl<T, E> ActivityState<T, E> {
    /// True for `Pending`.
    pub fn is_pending(&self) -> bool {
        matches!(self, ActivityState::Pending)
    }
}

/// Something that observes transitions of an [`Activity`].
///
/// Transitions are delivered in order, on whatever task drives the
/// underlying subscription; implementations must not block.
pub trait Observer<T, E>: Send + Sync {
    /// Called once per state transition, in order.
    fn notify(&self, state: &ActivityState<T, E>);
}

impl<T, E, F> Observer<T, E> for F
where
    F: Fn(&ActivityState<T, E>) + Send + Sync,
{
    fn notify(&self, state: &ActivityState<T, E>) {
        self(state)
    }
}

/// A token representing an active subscription to an [`Activity`].
///
/// Dropping it cancels delivery; no further [`Observer::notify`] calls
/// will be made to the subscriber it was returned for. Cancellation is
/// best-effort: a notification already in flight on another task may
/// still land concurrently with the drop.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Wraps a cancellation closure into a subscription token.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Subscription {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A subscription whose drop does nothing, for activities that never
    /// need to be unwound (e.g. a constant activity).
    pub fn noop() -> Self {
        Subscription { cancel: None }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// A value that varies reactively over time, observed by subscription
/// rather than polling.
///
/// `namebind-binding` subscribes to an `Activity<NameTree<BoundName>>` per
/// effective dtab; `namebind-dynname` adapts exactly one such subscription
/// into synchronous `acquire` semantics.
pub trait Activity<T, E>: Send + Sync {
    /// Registers `observer` and immediately delivers the current state
    /// (even if it is `Pending`), then every subsequent transition until
    /// the returned [`Subscription`] is dropped.
    fn subscribe(&self, observer: Arc<dyn Observer<T, E>>) -> Subscription;
}

/// An in-memory, manually-driven [`Activity`], used by tests and as the
/// reference implementation for adapting a simple polling namer.
pub struct Var<T, E> {
    inner: Arc<parking_lot::Mutex<VarInner<T, E>>>,
}

struct VarInner<T, E> {
    state: ActivityState<T, E>,
    observers: Vec<(u64, Arc<dyn Observer<T, E>>)>,
    next_id: u64,
}

impl<T: Clone + Send + Sync + 'static, E: Clone + Send + Sync + 'static> Var<T, E> {
    /// Creates a new variable activity starting at `initial`.
    pub fn new(initial: ActivityState<T, E>) -> Self {
        Var {
            inner: Arc::new(parking_lot::Mutex::new(VarInner {
                state: initial,
                observers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Publishes a new state, notifying every live subscriber in
    /// registration order.
    pub fn set(&self, state: ActivityState<T, E>) {
        let observers: Vec<Arc<dyn Observer<T, E>>> = {
            let mut inner = self.inner.lock();
            inner.state = state.clone();
            inner.observers.iter().map(|(_, o)| Arc::clone(o)).collect()
        };
        for observer in observers {
            observer.notify(&state);
        }
    }
}

impl<T: Clone + Send + Sync + 'static, E: Clone + Send + Sync + 'static> Activity<T, E>
    for Var<T, E>
{
    fn subscribe(&self, observer: Arc<dyn Observer<T, E>>) -> Subscription {
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            let current = inner.state.clone();
            inner.observers.push((id, Arc::clone(&observer)));
            observer.notify(&current);
            id
        };
        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().observers.retain(|(oid, _)| *oid != id);
            }
        })
    }
}
