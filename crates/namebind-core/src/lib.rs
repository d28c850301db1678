//! Shared data model, error taxonomy, and event infrastructure for
//! namebind's resilience and name-resolution crates.
//!
//! This crate provides functionality used across all namebind modules:
//! - [`path`]: `Path`, `Dtab`, and the `NameTree` evaluator.
//! - [`name`]: `BoundName` and the reactive `Activity` contract.
//! - [`factory`]: the `ServiceFactory`/`BoundService` interfaces every
//!   layer implements and wraps.
//! - [`tracer`]: the `Tracer` contract and standard `namer.*` annotations.
//! - [`error`]: the `BindError<E>` taxonomy shared across crates.
//! - [`events`]: the event-listener plumbing each crate's own event enum
//!   (`FailFastEvent`, `CacheEvent`, ...) is built on.

pub mod error;
pub mod events;
pub mod factory;
pub mod name;
pub mod path;
pub mod tracer;

pub use error::{BindError, ErrorKind};
pub use events::{EventListener, EventListeners, FnListener, NamebindEvent};
pub use factory::{BoundService, Closable, ServiceFactory};
pub use name::{Activity, ActivityState, BoundName, Observer, Subscription, Var};
pub use path::{Dentry, Dtab, NameTree, Path, PathParseError};
pub use tracer::{NamerTracing, NoopTracer, Tracer};
