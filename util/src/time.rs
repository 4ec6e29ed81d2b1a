//! General time utility functions
//!
//! Control loops in the exec are written against the [`Clock`] trait rather than `std::time`
//! directly, so that they can run either in real time ([`WallClock`]) or in virtual time
//! ([`SimClock`]).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of monotonic time which can also suspend the caller.
pub trait Clock {
    /// Seconds elapsed since the clock's epoch.
    fn now_s(&self) -> f64;

    /// Suspend for the given number of seconds. Non-positive durations return immediately.
    fn sleep_s(&mut self, duration_s: f64);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Real time clock backed by `std::time::Instant`.
#[derive(Debug, Copy, Clone)]
pub struct WallClock {
    epoch: Instant,
}

/// Virtual clock for simulation and tests.
///
/// Clones share the same time, so a simulated vehicle holding a clone sees time advance when the
/// controller sleeps. Sleeping advances time instantly.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now_s: Rc<Cell<f64>>,
}

/// Paces a loop at a fixed period.
///
/// The first call to [`Ticker::wait`] sleeps for one full period after the ticker was started,
/// later calls sleep until the next period boundary. If the loop body overran the boundary the
/// schedule is re-based on the current time rather than trying to catch up.
#[derive(Debug, Clone)]
pub struct Ticker {
    period_s: f64,
    next_tick_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl WallClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now_s(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn sleep_s(&mut self, duration_s: f64) {
        if duration_s > 0.0 {
            thread::sleep(Duration::from_secs_f64(duration_s));
        }
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance virtual time without going through `sleep_s`.
    pub fn advance(&self, duration_s: f64) {
        if duration_s > 0.0 {
            self.now_s.set(self.now_s.get() + duration_s);
        }
    }
}

impl Clock for SimClock {
    fn now_s(&self) -> f64 {
        self.now_s.get()
    }

    fn sleep_s(&mut self, duration_s: f64) {
        self.advance(duration_s)
    }
}

impl Ticker {
    /// Start a new ticker with the given period, the first tick being one period from now.
    pub fn start<C: Clock>(period_s: f64, clock: &C) -> Self {
        Self {
            period_s,
            next_tick_s: clock.now_s() + period_s,
        }
    }

    /// Sleep until the next tick.
    pub fn wait<C: Clock>(&mut self, clock: &mut C) {
        let now_s = clock.now_s();
        let remaining_s = self.next_tick_s - now_s;

        if remaining_s >= 0.0 {
            clock.sleep_s(remaining_s);
            self.next_tick_s += self.period_s;
        }
        else {
            warn!("Tick overran by {:.06} s", -remaining_s);
            self.next_tick_s = now_s + self.period_s;
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}
