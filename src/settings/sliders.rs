//! Threshold sliders and their ordering rules.
//!
//! Three sliders (good < warning < critical) live on `[MIN, MAX]` in steps
//! of `STEP`. After every edit `good + STEP <= warning` and
//! `warning + STEP <= critical` hold, and all three stay in range.
//!
//! Moving one slider only pushes the neighbours it collides with, in the
//! direction it moved them. The moved slider itself is first clamped to
//! the part of the range where the push can still succeed, so the result
//! never depends on a second pass pulling it back.

use serde::Serialize;

use crate::api::types::SettingsSnapshot;
use crate::state::quality::{THRESHOLD_MAX, THRESHOLD_MIN, Thresholds};

pub const MIN: u32 = THRESHOLD_MIN;
pub const MAX: u32 = THRESHOLD_MAX;
pub const STEP: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slider {
    Good,
    Warning,
    Critical,
}

impl Slider {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "good" => Some(Self::Good),
            "warning" | "warn" => Some(Self::Warning),
            "critical" | "crit" | "bad" => Some(Self::Critical),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }

    /// Sub-range where this slider may sit while leaving room for the others.
    fn feasible(&self) -> (u32, u32) {
        match self {
            Self::Good => (MIN, MAX - 2 * STEP),
            Self::Warning => (MIN + STEP, MAX - STEP),
            Self::Critical => (MIN + 2 * STEP, MAX),
        }
    }
}

/// Round to the nearest multiple of `STEP`.
pub fn snap(value: u32) -> u32 {
    value.saturating_add(STEP / 2) / STEP * STEP
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sliders {
    pub good: u32,
    pub warning: u32,
    pub critical: u32,
}

impl Default for Sliders {
    fn default() -> Self {
        Self::from_snapshot(&SettingsSnapshot::default())
    }
}

impl Sliders {
    /// Load from a snapshot and run the ordering pass.
    pub fn from_snapshot(settings: &SettingsSnapshot) -> Self {
        let mut s = Self {
            good: settings.thresholds.good(),
            warning: settings.warning_threshold,
            critical: settings.critical_threshold,
        };
        s.reconcile(None);
        s
    }

    /// Write the sliders back into a snapshot. The critical slider is the
    /// bad threshold every page classifies against.
    pub fn apply_to(&self, settings: &mut SettingsSnapshot) {
        if let Ok(t) = Thresholds::new(self.good, self.critical) {
            settings.thresholds = t;
        }
        settings.warning_threshold = self.warning;
        settings.critical_threshold = self.critical;
    }

    pub fn get(&self, slider: Slider) -> u32 {
        match slider {
            Slider::Good => self.good,
            Slider::Warning => self.warning,
            Slider::Critical => self.critical,
        }
    }

    /// Move one slider (as while dragging) and reconcile the others.
    pub fn set(&mut self, slider: Slider, value: u32) {
        match slider {
            Slider::Good => self.good = value,
            Slider::Warning => self.warning = value,
            Slider::Critical => self.critical = value,
        }
        self.reconcile(Some(slider));
    }

    /// Move one slider by a signed delta.
    pub fn nudge(&mut self, slider: Slider, delta: i64) {
        let value = i64::from(self.get(slider))
            .saturating_add(delta)
            .clamp(0, i64::from(MAX) * 2) as u32;
        self.set(slider, value);
    }

    /// Snap one slider to the step grid, then run the ordering pass (as on
    /// release).
    pub fn snap_slider(&mut self, slider: Slider) {
        let snapped = snap(self.get(slider));
        match slider {
            Slider::Good => self.good = snapped,
            Slider::Warning => self.warning = snapped,
            Slider::Critical => self.critical = snapped,
        }
        self.reconcile(None);
    }

    /// Restore ordering. With `moved`, only the neighbours the moved slider
    /// collides with are pushed; without it, a plain ordering pass runs.
    pub fn reconcile(&mut self, moved: Option<Slider>) {
        match moved {
            Some(Slider::Good) => {
                self.good = clamp_to(self.good, Slider::Good.feasible());
                if self.warning < self.good + STEP {
                    self.warning = self.good + STEP;
                }
                if self.critical < self.warning + STEP {
                    self.critical = self.warning + STEP;
                }
            }
            Some(Slider::Warning) => {
                self.warning = clamp_to(self.warning, Slider::Warning.feasible());
                if self.good + STEP > self.warning {
                    self.good = self.warning - STEP;
                }
                if self.critical < self.warning + STEP {
                    self.critical = self.warning + STEP;
                }
            }
            Some(Slider::Critical) => {
                self.critical = clamp_to(self.critical, Slider::Critical.feasible());
                if self.warning + STEP > self.critical {
                    self.warning = self.critical - STEP;
                }
                if self.good + STEP > self.warning {
                    self.good = self.warning - STEP;
                }
            }
            None => {}
        }
        self.order();
    }

    /// Push upward from `good`, then pull back from `MAX` if the top
    /// overflowed. Leaves an already ordered state untouched.
    fn order(&mut self) {
        self.good = self.good.clamp(MIN, MAX);
        self.warning = self.warning.clamp(MIN, MAX).max(self.good + STEP);
        self.critical = self.critical.clamp(MIN, MAX).max(self.warning + STEP);
        if self.critical > MAX {
            self.critical = MAX;
        }
        if self.warning + STEP > self.critical {
            self.warning = self.critical - STEP;
        }
        if self.good + STEP > self.warning {
            self.good = self.warning - STEP;
        }
    }

    pub fn is_ordered(&self) -> bool {
        self.good >= MIN
            && self.critical <= MAX
            && self.good + STEP <= self.warning
            && self.warning + STEP <= self.critical
    }

    /// Proportional widths (percent) of the good, medium and bad zones.
    pub fn zone_widths(&self) -> (f64, f64, f64) {
        let range = f64::from(MAX - MIN);
        let good = f64::from(self.good - MIN) / range * 100.0;
        let medium = f64::from(self.warning - self.good) / range * 100.0;
        let bad = f64::from(MAX - self.warning) / range * 100.0;
        (good, medium, bad)
    }
}

fn clamp_to(value: u32, (lo, hi): (u32, u32)) -> u32 {
    value.clamp(lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sliders(good: u32, warning: u32, critical: u32) -> Sliders {
        Sliders {
            good,
            warning,
            critical,
        }
    }

    #[test]
    fn dragging_good_past_warning_pushes_both_up() {
        let mut s = sliders(800, 1000, 1200);
        s.set(Slider::Good, 1300);
        assert_eq!(s, sliders(1300, 1350, 1400));
    }

    #[test]
    fn dragging_warning_pushes_each_side() {
        let mut s = sliders(800, 1000, 1200);
        s.set(Slider::Warning, 750);
        assert_eq!(s, sliders(700, 750, 1200));
        s.set(Slider::Warning, 1500);
        assert_eq!(s, sliders(700, 1500, 1550));
    }

    #[test]
    fn dragging_critical_down_pushes_transitively() {
        let mut s = sliders(800, 1000, 1200);
        s.set(Slider::Critical, 700);
        assert_eq!(s, sliders(600, 650, 700));
    }

    #[test]
    fn moved_slider_is_held_inside_its_feasible_range() {
        let mut s = sliders(800, 1000, 1200);
        s.set(Slider::Good, 2000);
        assert_eq!(s, sliders(1900, 1950, 2000));
        s.set(Slider::Critical, 0);
        assert_eq!(s, sliders(400, 450, 500));
    }

    #[test]
    fn unmoved_neighbours_are_left_alone() {
        let mut s = sliders(800, 1000, 1200);
        s.set(Slider::Good, 600);
        assert_eq!(s, sliders(600, 1000, 1200));
    }

    #[test]
    fn ordering_pass_fixes_loaded_values() {
        let mut s = sliders(1200, 1000, 800);
        s.reconcile(None);
        assert_eq!(s, sliders(1200, 1250, 1300));

        let mut s = sliders(2000, 2000, 2000);
        s.reconcile(None);
        assert_eq!(s, sliders(1900, 1950, 2000));
        assert!(s.is_ordered());
    }

    #[test]
    fn every_edit_sequence_stays_ordered() {
        let moves = [Slider::Good, Slider::Warning, Slider::Critical];
        let mut s = Sliders::default();
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        for _ in 0..2000 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            let slider = moves[(seed % 3) as usize];
            let value = (seed >> 8) as u32 % 2400;
            s.set(slider, value);
            assert!(s.is_ordered(), "{s:?} after {slider:?} = {value}");
        }
    }

    #[test]
    fn snap_rounds_to_step() {
        assert_eq!(snap(824), 800);
        assert_eq!(snap(825), 850);
        assert_eq!(snap(1999), 2000);
        let mut s = sliders(812, 1000, 1200);
        s.snap_slider(Slider::Good);
        assert_eq!(s.good, 800);
    }

    #[test]
    fn extreme_inputs_saturate_instead_of_overflowing() {
        assert_eq!(snap(u32::MAX), u32::MAX / STEP * STEP);

        let mut s = sliders(800, 1000, 1200);
        s.set(Slider::Good, u32::MAX);
        s.snap_slider(Slider::Good);
        assert_eq!(s, sliders(1900, 1950, 2000));

        s.nudge(Slider::Warning, i64::MAX);
        assert_eq!(s, sliders(1900, 1950, 2000));
        s.nudge(Slider::Critical, i64::MIN);
        assert_eq!(s, sliders(400, 450, 500));
        assert!(s.is_ordered());
    }

    #[test]
    fn zone_widths_cover_the_range() {
        let (g, m, b) = sliders(800, 1200, 1600).zone_widths();
        assert_eq!(g, 25.0);
        assert_eq!(m, 25.0);
        assert_eq!(b, 50.0);
    }

    #[test]
    fn critical_maps_to_bad_threshold() {
        let mut snapshot = SettingsSnapshot::default();
        sliders(700, 900, 1500).apply_to(&mut snapshot);
        assert_eq!(snapshot.thresholds.good(), 700);
        assert_eq!(snapshot.thresholds.bad(), 1500);
        assert_eq!(snapshot.warning_threshold, 900);
        assert_eq!(snapshot.to_json()["bad_threshold"], 1500);
    }
}
