//! Keyed timers and the clock they run on.
//!
//! Arming a key that is already armed replaces it, so a session can never
//! end up with two overlapping poll timers. Tests drive a [`ManualClock`]
//! forward and pop due timers deterministically.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset: Rc<Cell<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            base: Instant::now(),
            offset: Rc::new(Cell::new(Duration::ZERO)),
        }
    }
}

impl ManualClock {
    pub fn advance(&self, by: Duration) {
        self.offset.set(self.offset.get() + by);
    }

    pub fn elapsed(&self) -> Duration {
        self.offset.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset.get()
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Timer<K> {
    key: K,
    deadline: Instant,
    /// `None` for one-shot timers.
    period: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct Scheduler<K> {
    timers: Vec<Timer<K>>,
}

impl<K> Default for Scheduler<K> {
    fn default() -> Self {
        Self { timers: Vec::new() }
    }
}

/// Shortest period a repeating timer runs at. A zero period would re-arm
/// at `now` and never let `pop_due` drain.
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

impl<K: Copy + PartialEq> Scheduler<K> {
    /// Arm a repeating timer whose first tick is one `period` from `now`.
    /// Periods below [`MIN_PERIOD`] are raised to it.
    pub fn every(&mut self, key: K, period: Duration, now: Instant) {
        let period = period.max(MIN_PERIOD);
        self.arm(key, now + period, Some(period));
    }

    /// Arm a one-shot timer. Re-arming restarts the wait (debounce).
    pub fn once(&mut self, key: K, delay: Duration, now: Instant) {
        self.arm(key, now + delay, None);
    }

    fn arm(&mut self, key: K, deadline: Instant, period: Option<Duration>) {
        self.cancel(key);
        self.timers.push(Timer {
            key,
            deadline,
            period,
        });
    }

    /// Returns whether the key was armed.
    pub fn cancel(&mut self, key: K) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.key != key);
        self.timers.len() != before
    }

    pub fn is_scheduled(&self, key: K) -> bool {
        self.timers.iter().any(|t| t.key == key)
    }

    pub fn period(&self, key: K) -> Option<Duration> {
        self.timers
            .iter()
            .find(|t| t.key == key)
            .and_then(|t| t.period)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Earliest deadline across all timers.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|t| t.deadline).min()
    }

    /// How long the loop may sleep before the next timer is due.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_deadline()
            .map(|d| d.saturating_duration_since(now))
    }

    /// Pop the earliest timer that is due at `now`. Repeating timers are
    /// re-armed one period after their previous deadline; if the loop fell
    /// behind by more than a period, missed ticks are skipped rather than
    /// replayed.
    pub fn pop_due(&mut self, now: Instant) -> Option<K> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.deadline <= now)
            .min_by_key(|(_, t)| t.deadline)
            .map(|(i, _)| i)?;

        let timer = &mut self.timers[idx];
        let key = timer.key;
        match timer.period {
            Some(period) => {
                let mut next = timer.deadline + period;
                if next <= now {
                    next = now + period;
                }
                timer.deadline = next;
            }
            None => {
                self.timers.swap_remove(idx);
            }
        }
        Some(key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
