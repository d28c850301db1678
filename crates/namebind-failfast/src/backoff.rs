//! A lazily-consumed, jittered backoff schedule.
//!
//! Unlike a pure per-attempt function, a [`Backoffs`] is a stream with
//! position: each call to [`Backoffs::next`] advances it. Two shapes are
//! supported, matching spec §4.1's "lazy stream of durations":
//!
//! - [`Backoffs::new`]: the default shape, `1s,2s,4s,8s,16s` then `32s`
//!   forever. The tail repeats indefinitely, so this stream never
//!   exhausts -- `next` always returns `Some`.
//! - [`Backoffs::finite`]: a genuinely finite list. Once every entry has
//!   been consumed, `next` returns `None`, and the caller (the state
//!   machine in `state.rs`) treats that as backoff exhaustion and performs
//!   the optimistic recovery to `Ok` described in spec §4.1.

use std::time::Duration;

use rand::Rng;

/// A consumable sequence of backoff durations, each jittered independently
/// by a uniform `[0, 10%]` addition, truncated to whole milliseconds.
#[derive(Debug, Clone)]
pub struct Backoffs {
    schedule: Vec<Duration>,
    position: usize,
    /// If true, `next` keeps returning the final entry forever once the
    /// list is consumed. If false, `next` returns `None` past the end.
    repeat_last: bool,
}

impl Backoffs {
    /// Builds an infinite schedule from an explicit, non-empty list of base
    /// durations. The last entry repeats forever once exhausted, so this
    /// stream never signals exhaustion.
    pub fn new(schedule: Vec<Duration>) -> Self {
        assert!(!schedule.is_empty(), "backoff schedule must not be empty");
        Backoffs {
            schedule,
            position: 0,
            repeat_last: true,
        }
    }

    /// Builds a genuinely finite schedule: once every entry has been
    /// consumed, `next` returns `None` instead of repeating.
    pub fn finite(schedule: Vec<Duration>) -> Self {
        assert!(!schedule.is_empty(), "backoff schedule must not be empty");
        Backoffs {
            schedule,
            position: 0,
            repeat_last: false,
        }
    }

    /// Returns the next jittered duration and advances the stream, or
    /// `None` if a finite schedule has been exhausted.
    pub fn next(&mut self) -> Option<Duration> {
        if self.position >= self.schedule.len() {
            return if self.repeat_last {
                Some(jitter(*self.schedule.last().expect("non-empty schedule")))
            } else {
                None
            };
        }
        let base = self.schedule[self.position];
        self.position += 1;
        Some(jitter(base))
    }

    /// Resets the stream to its first entry, used when an endpoint
    /// recovers and later fails again.
    pub fn reset(&mut self) {
        self.position = 0;
    }
}

fn jitter(base: Duration) -> Duration {
    let max_jitter_ms = (base.as_millis() as f64 * 0.10) as u64;
    let jitter_ms = if max_jitter_ms == 0 {
        0
    } else {
        rand::rng().random_range(0..=max_jitter_ms)
    };
    base + Duration::from_millis(jitter_ms)
}
