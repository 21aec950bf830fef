//! The live update corridor.
//!
//! A two-phase state machine (running / paused) fed by reading updates from
//! either transport. It owns the chart series, the animated readout and the
//! trend arrow, and decides when the fallback poll must start or stop. It
//! never touches timers itself: every transition returns a [`PollEffect`]
//! the session applies to its scheduler.
//!
//! Update handling order:
//!
//! 1. drop the update if its timestamp equals the last one seen
//! 2. `analysis_running == false` pauses (and stops polling)
//! 3. `analysis_running == true` while paused resumes (and restarts polling
//!    if push is unavailable)
//! 4. while paused, or without a ppm value, nothing else happens
//! 5. otherwise update trend, animate the value, append to the chart and
//!    check the blink rule

use std::time::{Duration, Instant};

use super::animation::{AnimatedValue, TrendArrow};
use super::series::ChartSeries;
use crate::api::types::LatestReading;
use crate::config::schema::TransportMode;
use crate::state::quality::Thresholds;

/// How long the readout blinks after crossing into the bad band.
pub const BLINK_DURATION: Duration = Duration::from_millis(900);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    Paused,
}

/// Instruction for the session's poll timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEffect {
    Start,
    Stop,
}

/// What an update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Same timestamp as the previous update; nothing changed.
    Duplicate,
    Paused,
    Resumed,
    /// Accepted but carried nothing to display (paused, or no ppm yet).
    Ignored,
    Applied {
        ppm: u32,
        previous: Option<u32>,
        blink: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub outcome: Outcome,
    pub poll: Option<PollEffect>,
}

impl Step {
    fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            poll: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiveCorridor {
    phase: Phase,
    mode: TransportMode,
    push_available: bool,
    polling: bool,
    last_timestamp: Option<String>,
    last_ppm: Option<u32>,
    value: AnimatedValue,
    arrow: TrendArrow,
    series: ChartSeries,
    blink_until: Option<Instant>,
}

impl LiveCorridor {
    pub fn new(mode: TransportMode, max_points: usize, animation: Duration) -> Self {
        Self {
            phase: Phase::Running,
            mode,
            push_available: false,
            polling: false,
            last_timestamp: None,
            last_ppm: None,
            value: AnimatedValue::new(animation),
            arrow: TrendArrow::default(),
            series: ChartSeries::with_capacity(max_points),
            blink_until: None,
        }
    }

    // -- Transport policy --

    /// Called once when the session starts. Poll-only mode starts polling
    /// right away; the other modes wait for the push stream to report.
    pub fn start(&mut self) -> Option<PollEffect> {
        match self.mode {
            TransportMode::Poll => self.want_polling(true),
            TransportMode::Auto | TransportMode::Push => None,
        }
    }

    pub fn push_connected(&mut self) -> Option<PollEffect> {
        self.push_available = true;
        self.want_polling(false)
    }

    pub fn push_lost(&mut self) -> Option<PollEffect> {
        self.push_available = false;
        self.want_polling(self.phase == Phase::Running)
    }

    fn should_poll(&self) -> bool {
        self.phase == Phase::Running
            && match self.mode {
                TransportMode::Poll => true,
                TransportMode::Push => false,
                TransportMode::Auto => !self.push_available,
            }
    }

    /// Emit an effect only on an actual transition, never twice in a row.
    fn want_polling(&mut self, wanted: bool) -> Option<PollEffect> {
        let wanted = wanted && self.should_poll();
        if wanted == self.polling {
            return None;
        }
        self.polling = wanted;
        Some(if wanted {
            PollEffect::Start
        } else {
            PollEffect::Stop
        })
    }

    // -- Updates --

    pub fn apply(&mut self, update: &LatestReading, now: Instant, thresholds: Thresholds) -> Step {
        if let Some(ts) = &update.timestamp {
            if self.last_timestamp.as_ref() == Some(ts) {
                return Step::new(Outcome::Duplicate);
            }
            self.last_timestamp = Some(ts.clone());
        }

        match update.analysis_running {
            Some(false) => return self.set_running(false),
            Some(true) if self.phase == Phase::Paused => {
                let step = self.set_running(true);
                return match update.ppm {
                    Some(_) => Step {
                        outcome: self.apply_reading(update, now, thresholds),
                        ..step
                    },
                    None => step,
                };
            }
            _ => {}
        }

        if self.phase == Phase::Paused {
            return Step::new(Outcome::Ignored);
        }
        Step::new(self.apply_reading(update, now, thresholds))
    }

    /// Pause or resume without a reading, e.g. from an
    /// `analysis-state-change` event or the state watcher.
    pub fn set_running(&mut self, running: bool) -> Step {
        match (running, self.phase) {
            (false, Phase::Running) => {
                self.phase = Phase::Paused;
                Step {
                    outcome: Outcome::Paused,
                    poll: self.want_polling(false),
                }
            }
            (true, Phase::Paused) => {
                self.phase = Phase::Running;
                Step {
                    outcome: Outcome::Resumed,
                    poll: self.want_polling(true),
                }
            }
            _ => Step::new(Outcome::Ignored),
        }
    }

    fn apply_reading(&mut self, update: &LatestReading, now: Instant, thresholds: Thresholds) -> Outcome {
        let Some(ppm) = update.ppm else {
            return Outcome::Ignored;
        };
        let previous = self.last_ppm;

        self.arrow.update(ppm);
        self.value.set_target(f64::from(ppm), now);
        self.series.push(update.time_label(), ppm);

        let bad = thresholds.bad();
        let blink = previous.is_some_and(|p| p < bad) && ppm >= bad;
        if blink {
            self.blink_until = Some(now + BLINK_DURATION);
        }
        self.last_ppm = Some(ppm);

        Outcome::Applied {
            ppm,
            previous,
            blink,
        }
    }

    /// Clear the chart. The readout and arrow keep their state.
    pub fn reset_chart(&mut self) {
        self.series.clear();
    }

    // -- Accessors --

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn mode(&self) -> TransportMode {
        self.mode
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    pub fn push_available(&self) -> bool {
        self.push_available
    }

    pub fn series(&self) -> &ChartSeries {
        &self.series
    }

    pub fn value(&self) -> &AnimatedValue {
        &self.value
    }

    pub fn arrow(&self) -> &TrendArrow {
        &self.arrow
    }

    pub fn last_ppm(&self) -> Option<u32> {
        self.last_ppm
    }

    pub fn is_blinking(&self, now: Instant) -> bool {
        self.blink_until.is_some_and(|until| now < until)
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.value.is_animating(now) || self.is_blinking(now)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
