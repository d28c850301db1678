//! Bridges a reactive, asynchronously-resolved name to the synchronous
//! [`namebind_core::ServiceFactory`] interface.
//!
//! A name resolves over time: it may start `Pending`, eventually settle on
//! a [`BoundName`](namebind_core::BoundName), fail, or re-resolve to a
//! different identity entirely (a rebind). [`DynNameFactory`] subscribes to
//! exactly one such [`Activity`](namebind_core::Activity) and adapts it so
//! that callers can `acquire` against it the same way they would against
//! any other `ServiceFactory`: acquisitions issued before the name resolves
//! queue up and complete once it does, rather than failing outright.
//!
//! # Example
//!
//! ```rust,no_run
//! use namebind_core::name::{ActivityState, BoundName, Var};
//! use namebind_dynname::{DynNameConfig, DynNameFactory};
//!
//! # #[derive(Debug, Clone)]
//! # struct ResolveError;
//! # impl std::fmt::Display for ResolveError {
//! #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { write!(f, "resolve error") }
//! # }
//! # struct ChildFactory;
//! # impl namebind_core::ServiceFactory<()> for ChildFactory {
//! #     type Service = ChildService;
//! #     type Error = std::io::Error;
//! #     fn acquire(&self, _c: ()) -> futures::future::BoxFuture<'static, Result<ChildService, std::io::Error>> {
//! #         Box::pin(async { Ok(ChildService) })
//! #     }
//! #     fn is_available(&self) -> bool { true }
//! #     fn close(&self, _d: std::time::Duration) -> futures::future::BoxFuture<'static, ()> { Box::pin(async {}) }
//! # }
//! # struct ChildService;
//! # impl namebind_core::BoundService for ChildService {
//! #     type Request = ();
//! #     type Response = ();
//! #     type Error = std::io::Error;
//! #     fn apply(&mut self, _r: ()) -> futures::future::BoxFuture<'static, Result<(), std::io::Error>> { Box::pin(async { Ok(()) }) }
//! #     fn close(&mut self) {}
//! # }
//! let activity: Var<BoundName, ResolveError> = Var::new(ActivityState::Pending);
//! let factory = DynNameFactory::new(
//!     DynNameConfig::builder("users").build(),
//!     &activity,
//!     |_name: &BoundName| ChildFactory,
//! );
//! ```

mod config;
mod error;
mod events;
mod service;

pub use config::{DynNameConfig, DynNameConfigBuilder};
pub use error::DynNameError;
pub use events::DynNameEvent;
pub use service::{DynNameFactory, Interrupt};
