//! Top-level coordinator: resolves a logical [`Path`](namebind_core::Path)
//! under the effective delegation table and routes to a cached downstream
//! factory, aggressively caching at two levels.
//!
//! ```text
//! caller -> BindingFactory -> DynNameFactory (per bound name) -> (your factory)
//! ```
//!
//! A [`BindingFactory`] is built once per logical name. On every `acquire`
//! it computes `effective = base() ++ local` (the process-wide base dtab
//! concatenated with whatever request-scoped override is in
//! [`scope`]-managed task-local storage), resolves `path` under it, and
//! dispatches through two caches:
//!
//! - `DtabCache`, keyed by the effective dtab, so repeated requests under
//!   the same table (the overwhelming majority, in practice) skip
//!   re-resolution entirely.
//! - `NameCache`, keyed by the resolved [`BoundName`](namebind_core::BoundName)'s
//!   identity, shared across every dtab that happens to resolve to the
//!   same name, so the downstream stack for that name (including its own
//!   failure-handling and balancing layers) is built exactly once.
//!
//! # Example
//!
//! ```rust,no_run
//! use namebind_binding::{BindingConfig, BindingFactory};
//! use namebind_core::{BoundName, Path, ServiceFactory};
//!
//! # struct EndpointFactory;
//! # impl ServiceFactory<()> for EndpointFactory {
//! #     type Service = EndpointService;
//! #     type Error = std::io::Error;
//! #     fn acquire(&self, _c: ()) -> futures::future::BoxFuture<'static, Result<EndpointService, std::io::Error>> {
//! #         Box::pin(async { Ok(EndpointService) })
//! #     }
//! #     fn is_available(&self) -> bool { true }
//! #     fn close(&self, _d: std::time::Duration) -> futures::future::BoxFuture<'static, ()> { Box::pin(async {}) }
//! # }
//! # struct EndpointService;
//! # impl namebind_core::BoundService for EndpointService {
//! #     type Request = ();
//! #     type Response = ();
//! #     type Error = std::io::Error;
//! #     fn apply(&mut self, _r: ()) -> futures::future::BoxFuture<'static, Result<(), std::io::Error>> { Box::pin(async { Ok(()) }) }
//! #     fn close(&mut self) {}
//! # }
//! let factory: BindingFactory<(), EndpointFactory> = BindingFactory::new(
//!     Path::read("/s/users").unwrap(),
//!     BindingConfig::builder().build(),
//!     |_name: &BoundName| EndpointFactory,
//! );
//! ```

mod config;
mod error;
mod interner;
mod proxy;
pub mod scope;
mod service;

pub use config::{BaseDtabProvider, BindingConfig, BindingConfigBuilder};
pub use error::{BindingError, ResolveFailure};
pub use interner::NameInterner;
pub use proxy::NameCacheProxy;
pub use service::BindingFactory;
