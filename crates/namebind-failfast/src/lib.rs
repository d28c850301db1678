//! Per-endpoint health state machine with jittered exponential backoff
//! probing.
//!
//! A [`FailFastFactory`] wraps exactly one downstream
//! [`ServiceFactory`](namebind_core::ServiceFactory) and mediates every
//! acquisition attempt against it. While the endpoint is healthy (`Ok`),
//! attempts are forwarded unchanged. After a forwarded attempt fails, the
//! endpoint is marked `Retrying`: further caller-driven attempts are
//! short-circuited with [`BindError::EndpointMarkedDown`] without touching
//! the wrapped factory, while a background probe loop exercises the
//! endpoint on a jittered exponential schedule until it recovers.
//!
//! All state transitions are serialised through a single-consumer event
//! processor (spec §5): `acquire` and timer/probe completions all enqueue
//! an [`Observation`] rather than mutating state directly, so `state.rs`'s
//! `transition` function is the only place the state machine's logic
//! lives.
//!
//! ```text
//! caller.acquire() ──Retrying?── fails fast, EndpointMarkedDown
//!        │
//!        └─Ok──► inner.acquire() ──► Observation::{Success,Fail} ──► processor
//!
//! timer fires ──► Observation::Timeout ──► processor ──► spawns probe
//! probe completes ──► Observation::{Success,TimeoutFail} ──► processor
//! ```

mod backoff;
mod config;
mod events;
mod service;
mod state;

pub use backoff::Backoffs;
pub use config::{FailFastConfig, FailFastConfigBuilder};
pub use events::FailFastEvent;
pub use service::FailFastFactory;
pub use state::{default_backoff_schedule, FailFastState, Observation};

pub use namebind_core::BindError;
