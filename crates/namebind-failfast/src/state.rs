//! The per-endpoint health state machine and its pure transition function.
//!
//! ```text
//! state      \ event   Success   Fail/TimeoutFail     Timeout   Close
//! Ok                   Ok        Retrying(ntries=0)    Ok        Ok (closes wrapped)
//! Retrying             Ok        Retrying(n+1)*        Retrying  Retrying (closes wrapped)
//! ```
//! `*` only if the failing attempt was itself a probe (see
//! [`FailFastState::probe_due`]); an attempt rejected by `acquire` before
//! ever reaching the wrapped factory never produces an observation. The
//! initial mark-down carries `ntries=0`: it counts completed *probes*,
//! not the original failure that opened the episode, so the
//! `unhealthy_num_tries` gauge reads `0` the instant an endpoint goes
//! down and only increments as probes against it keep failing.

use std::time::{Duration, Instant};

use crate::backoff::Backoffs;

/// An observation fed back into the state machine after an acquisition
/// attempt against the wrapped factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The wrapped factory produced a service without error.
    Success,
    /// The wrapped factory failed to produce a service.
    Fail,
    /// The attempt did not complete before some caller-side deadline.
    /// Distinct from `Fail`: a slow-but-working endpoint is not the same
    /// failure mode as a broken one, so a bare `Timeout` never marks an
    /// endpoint down.
    Timeout,
    /// The attempt timed out *and* is independently known to have failed
    /// (e.g. the connection reset before the deadline elapsed). Treated
    /// identically to `Fail`.
    TimeoutFail,
    /// The factory is shutting down.
    Close,
}

/// The health state of a single downstream endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum FailFastState {
    /// Healthy: acquisition is forwarded to the wrapped factory.
    Ok,
    /// Unhealthy: new acquisitions are short-circuited with
    /// `EndpointMarkedDown` until `next_deadline`, at which point the
    /// *next* attempt is let through optimistically as a live probe even
    /// though the state has not yet transitioned back to `Ok` (see module
    /// docs and `DESIGN.md` for why this is deliberate).
    Retrying {
        /// When this endpoint was first marked down.
        since: Instant,
        /// How many consecutive failures have been observed.
        ntries: u32,
        /// When the next acquisition attempt is allowed through.
        next_deadline: Instant,
    },
}

impl FailFastState {
    /// True if a real (non-short-circuited) attempt is currently allowed
    /// through to the wrapped factory.
    pub fn probe_due(&self, now: Instant) -> bool {
        match self {
            FailFastState::Ok => true,
            FailFastState::Retrying { next_deadline, .. } => now >= *next_deadline,
        }
    }

    /// Milliseconds this endpoint has been unhealthy, for the
    /// `unhealthy_for_ms` gauge. `0` while `Ok`.
    pub fn unhealthy_for_ms(&self, now: Instant) -> u64 {
        match self {
            FailFastState::Ok => 0,
            FailFastState::Retrying { since, .. } => now.saturating_duration_since(*since).as_millis() as u64,
        }
    }

    /// Consecutive failure count, for the `unhealthy_num_tries` gauge.
    pub fn unhealthy_num_tries(&self) -> u32 {
        match self {
            FailFastState::Ok => 0,
            FailFastState::Retrying { ntries, .. } => *ntries,
        }
    }
}

/// Applies `observation`, seen at time `now`, to `state`, consuming a
/// backoff from `backoffs` if this transition marks the endpoint down for
/// the first time or extends an existing down period.
///
/// If `backoffs` is exhausted (a finite schedule with no further entries),
/// the transition is the "optimistic recovery" of spec §4.1: the endpoint
/// returns to `Ok` rather than staying pinned down forever, since live
/// traffic is now the only remaining liveness signal.
///
/// Pure apart from `backoffs`, which is an explicit, lazily-consumed
/// sequence rather than hidden mutable state.
pub fn transition(
    state: FailFastState,
    observation: Observation,
    now: Instant,
    backoffs: &mut Backoffs,
) -> FailFastState {
    match (state, observation) {
        (_, Observation::Success) => FailFastState::Ok,

        (FailFastState::Ok, Observation::Fail | Observation::TimeoutFail) => {
            match backoffs.next() {
                Some(delay) => FailFastState::Retrying {
                    since: now,
                    ntries: 0,
                    next_deadline: now + delay,
                },
                None => FailFastState::Ok,
            }
        }
        (FailFastState::Ok, Observation::Timeout | Observation::Close) => FailFastState::Ok,

        (
            FailFastState::Retrying { since, ntries, next_deadline },
            Observation::Fail | Observation::TimeoutFail,
        ) => {
            if now >= next_deadline {
                match backoffs.next() {
                    Some(delay) => FailFastState::Retrying {
                        since,
                        ntries: ntries + 1,
                        next_deadline: now + delay,
                    },
                    None => FailFastState::Ok,
                }
            } else {
                // A failure that could not have come from a probe (the
                // caller must have bypassed acquire); keep the schedule.
                FailFastState::Retrying { since, ntries, next_deadline }
            }
        }
        (retrying @ FailFastState::Retrying { .. }, Observation::Timeout | Observation::Close) => retrying,
    }
}

/// Default backoff schedule: `1s, 2s, 4s, 8s, 16s`, then `32s` forever.
pub fn default_backoff_schedule() -> Vec<Duration> {
    vec![
        Duration::from_secs(1),
        Duration::from_secs(2),
        Duration::from_secs(4),
        Duration::from_secs(8),
        Duration::from_secs(16),
        Duration::from_secs(32),
    ]
}
