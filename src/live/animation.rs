//! Readout animation and the trend arrow.
//!
//! Animations are sampled, not ticked: an [`AnimatedValue`] remembers where
//! it started and when, and `sample(now)` returns the eased value. The
//! session only needs to redraw on its frame timer while
//! [`AnimatedValue::is_animating`] is true.

use std::time::{Duration, Instant};

/// `1 - (1 - t)^3`, with `t` clamped to `[0, 1]`.
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

#[derive(Debug, Clone, Copy)]
struct Tween {
    from: f64,
    to: f64,
    started: Instant,
}

/// A number that eases towards each new target over a fixed duration.
#[derive(Debug, Clone)]
pub struct AnimatedValue {
    duration: Duration,
    tween: Option<Tween>,
    current: Option<f64>,
}

impl AnimatedValue {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            tween: None,
            current: None,
        }
    }

    /// Start animating towards `target` from wherever the value is now.
    /// The first target is shown immediately.
    pub fn set_target(&mut self, target: f64, now: Instant) {
        match self.current {
            None => {
                self.current = Some(target);
                self.tween = None;
            }
            Some(_) => {
                let from = self.sample(now).unwrap_or(target);
                self.tween = Some(Tween {
                    from,
                    to: target,
                    started: now,
                });
                self.current = Some(target);
            }
        }
    }

    /// Current eased value, `None` before the first target.
    pub fn sample(&self, now: Instant) -> Option<f64> {
        let Some(tween) = self.tween else {
            return self.current;
        };
        if self.duration.is_zero() {
            return Some(tween.to);
        }
        let elapsed = now.saturating_duration_since(tween.started);
        let t = elapsed.as_secs_f64() / self.duration.as_secs_f64();
        Some(lerp(tween.from, tween.to, ease_out_cubic(t)))
    }

    /// Rounded sample for display.
    pub fn display(&self, now: Instant) -> Option<u32> {
        self.sample(now).map(|v| v.round().max(0.0) as u32)
    }

    pub fn target(&self) -> Option<f64> {
        self.current
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        self.tween
            .is_some_and(|t| now.saturating_duration_since(t.started) < self.duration)
    }
}

// ---------------------------------------------------------------------------
// Trend arrow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn between(previous: u32, current: u32) -> Self {
        match current.cmp(&previous) {
            std::cmp::Ordering::Greater => Self::Up,
            std::cmp::Ordering::Less => Self::Down,
            std::cmp::Ordering::Equal => Self::Flat,
        }
    }

    /// Arrow angle in degrees, 0 pointing right, positive clockwise.
    fn base_angle(self) -> i64 {
        match self {
            Self::Up => -45,
            Self::Down => 45,
            Self::Flat => 0,
        }
    }
}

/// Accumulated arrow rotation. Each new direction turns the arrow forward
/// to the next angle congruent with it, so it always spins the same way.
#[derive(Debug, Clone, Default)]
pub struct TrendArrow {
    rotation: i64,
    trend: Option<Trend>,
    previous: Option<u32>,
}

impl TrendArrow {
    /// Record a new reading; the first one sets no direction.
    pub fn update(&mut self, ppm: u32) {
        if let Some(prev) = self.previous {
            let trend = Trend::between(prev, ppm);
            let base = trend.base_angle();
            let mut target = self.rotation - (self.rotation - base).rem_euclid(360);
            if target <= self.rotation {
                target += 360;
            }
            self.rotation = target;
            self.trend = Some(trend);
        }
        self.previous = Some(ppm);
    }

    pub fn rotation(&self) -> i64 {
        self.rotation
    }

    pub fn trend(&self) -> Option<Trend> {
        self.trend
    }

    pub fn glyph(&self) -> &'static str {
        match self.rotation.rem_euclid(360) {
            315 => "↗",
            45 => "↘",
            0 => "→",
            _ => "·",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn easing_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert_eq!(ease_out_cubic(2.0), 1.0);
        assert!(ease_out_cubic(0.5) > 0.5);
    }

    #[test]
    fn value_eases_to_target() {
        let start = Instant::now();
        let mut v = AnimatedValue::new(Duration::from_millis(450));
        assert_eq!(v.sample(start), None);

        v.set_target(800.0, start);
        assert_eq!(v.display(start), Some(800));
        assert!(!v.is_animating(start));

        v.set_target(900.0, start);
        assert!(v.is_animating(start));
        assert_eq!(v.display(start), Some(800));
        let mid = v.display(start + Duration::from_millis(225)).unwrap();
        assert!(mid > 850 && mid < 900, "mid = {mid}");
        assert_eq!(v.display(start + Duration::from_millis(450)), Some(900));
        assert!(!v.is_animating(start + Duration::from_millis(450)));
    }

    #[test]
    fn retarget_mid_flight_starts_from_current_sample() {
        let start = Instant::now();
        let mut v = AnimatedValue::new(Duration::from_millis(100));
        v.set_target(0.0, start);
        v.set_target(100.0, start);
        let half = start + Duration::from_millis(50);
        let at_half = v.sample(half).unwrap();
        v.set_target(0.0, half);
        assert!((v.sample(half).unwrap() - at_half).abs() < f64::EPSILON);
    }

    #[test]
    fn arrow_rotation_is_monotonic() {
        let mut arrow = TrendArrow::default();
        arrow.update(800);
        assert_eq!(arrow.trend(), None);

        let mut last = arrow.rotation();
        for ppm in [850, 820, 820, 900, 700, 700, 710] {
            arrow.update(ppm);
            assert!(arrow.rotation() > last, "rotation went back at {ppm}");
            last = arrow.rotation();
        }
        assert_eq!(arrow.trend(), Some(Trend::Up));
        assert_eq!(arrow.glyph(), "↗");
    }

    #[test]
    fn repeated_direction_still_turns_forward() {
        let mut arrow = TrendArrow::default();
        arrow.update(800);
        arrow.update(900);
        assert_eq!(arrow.rotation(), 315);
        assert_eq!(arrow.glyph(), "↗");
        arrow.update(1000);
        assert_eq!(arrow.rotation(), 675);
        assert_eq!(arrow.glyph(), "↗");
    }
}
