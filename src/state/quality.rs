//! Air-quality classification and its presentation (labels, colors).
//!
//! Everything here is pure: given a reading and a pair of thresholds it
//! returns the same answer every time, so it is used unchanged by the live
//! page, the overview card, the chart and the HTML dashboard.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Lowest threshold the settings panel can produce.
pub const THRESHOLD_MIN: u32 = 400;
/// Highest threshold the settings panel can produce.
pub const THRESHOLD_MAX: u32 = 2000;

pub const DEFAULT_GOOD_THRESHOLD: u32 = 800;
pub const DEFAULT_BAD_THRESHOLD: u32 = 1200;

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// The two ppm boundaries shared by every page: `good <= bad`, both within
/// [`THRESHOLD_MIN`, `THRESHOLD_MAX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    good: u32,
    bad: u32,
}

impl Thresholds {
    pub fn new(good: u32, bad: u32) -> Result<Self> {
        for (name, value) in [("good", good), ("bad", bad)] {
            if !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&value) {
                anyhow::bail!(
                    "{name} threshold {value} outside {THRESHOLD_MIN}..={THRESHOLD_MAX}"
                );
            }
        }
        if good > bad {
            anyhow::bail!("good threshold {good} above bad threshold {bad}");
        }
        Ok(Self { good, bad })
    }

    pub fn good(&self) -> u32 {
        self.good
    }

    pub fn bad(&self) -> u32 {
        self.bad
    }

    /// Classify a reading against these thresholds.
    pub fn classify(&self, ppm: u32) -> Quality {
        if self.good == self.bad {
            return if ppm < self.good {
                Quality::Good
            } else {
                Quality::Bad
            };
        }
        if ppm < self.good {
            Quality::Good
        } else if ppm < self.bad {
            Quality::Medium
        } else {
            Quality::Bad
        }
    }

    /// Continuous color: green up to `good`, green→yellow up to `bad`, then
    /// yellow→red saturating at twice `bad`.
    pub fn smooth_color(&self, ppm: u32) -> Rgb {
        let ppm = f64::from(ppm);
        let good = f64::from(self.good);
        let bad = f64::from(self.bad);

        if ppm <= good {
            return GREEN;
        }
        if ppm <= bad {
            let t = (ppm - good) / (bad - good);
            return GREEN.lerp(YELLOW, t);
        }
        let t = ((ppm - bad) / bad).min(1.0);
        YELLOW.lerp(RED, t)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            good: DEFAULT_GOOD_THRESHOLD,
            bad: DEFAULT_BAD_THRESHOLD,
        }
    }
}

// ---------------------------------------------------------------------------
// Quality
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Good,
    Medium,
    Bad,
}

impl Quality {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Good => "Good",
            Self::Medium => "Medium",
            Self::Bad => "Bad",
        }
    }

    /// Short advice shown next to the live badge.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Good => "Healthy air",
            Self::Medium => "Air is acceptable",
            Self::Bad => "Ventilate now",
        }
    }

    pub fn color(&self) -> Rgb {
        match self {
            Self::Good => GREEN,
            Self::Medium => YELLOW,
            Self::Bad => RED,
        }
    }
}

impl std::fmt::Display for Quality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Good => write!(f, "good"),
            Self::Medium => write!(f, "medium"),
            Self::Bad => write!(f, "bad"),
        }
    }
}

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const GREEN: Rgb = Rgb(74, 222, 128);
pub const YELLOW: Rgb = Rgb(250, 204, 21);
pub const RED: Rgb = Rgb(248, 113, 113);
/// Paused / unknown.
pub const GREY: Rgb = Rgb(156, 163, 175);

impl Rgb {
    /// Channel-wise linear interpolation, `t` clamped to `[0, 1]`.
    pub fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }

    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn t(good: u32, bad: u32) -> Thresholds {
        Thresholds::new(good, bad).unwrap()
    }

    #[test]
    fn classify_three_bands() {
        let th = t(800, 1200);
        assert_eq!(th.classify(750), Quality::Good);
        assert_eq!(th.classify(799), Quality::Good);
        assert_eq!(th.classify(800), Quality::Medium);
        assert_eq!(th.classify(1000), Quality::Medium);
        assert_eq!(th.classify(1199), Quality::Medium);
        assert_eq!(th.classify(1200), Quality::Bad);
        assert_eq!(th.classify(1500), Quality::Bad);
    }

    #[test]
    fn classify_collapses_when_thresholds_meet() {
        let th = t(1000, 1000);
        assert_eq!(th.classify(999), Quality::Good);
        assert_eq!(th.classify(1000), Quality::Bad);
        assert_eq!(th.classify(400), Quality::Good);
    }

    #[test]
    fn classify_matches_band_definition_everywhere() {
        for (good, bad) in [(400, 450), (800, 1200), (1500, 2000), (600, 1950)] {
            let th = t(good, bad);
            for ppm in (0..2600).step_by(7) {
                let expected = if ppm < good {
                    Quality::Good
                } else if ppm < bad {
                    Quality::Medium
                } else {
                    Quality::Bad
                };
                assert_eq!(th.classify(ppm), expected, "ppm={ppm} good={good} bad={bad}");
            }
        }
    }

    #[test]
    fn scenario_colors() {
        let th = t(800, 1200);
        assert_eq!(th.classify(750).color().hex(), "#4ade80");
        assert_eq!(th.classify(1000).color().hex(), "#facc15");
        assert_eq!(th.classify(1500).color().hex(), "#f87171");
    }

    #[test]
    fn new_rejects_out_of_range_and_inverted() {
        assert!(Thresholds::new(350, 1200).is_err());
        assert!(Thresholds::new(800, 2050).is_err());
        assert!(Thresholds::new(1300, 1200).is_err());
        assert!(Thresholds::new(1200, 1200).is_ok());
    }

    #[test]
    fn smooth_color_endpoints() {
        let th = t(800, 1200);
        assert_eq!(th.smooth_color(500), GREEN);
        assert_eq!(th.smooth_color(800), GREEN);
        assert_eq!(th.smooth_color(1200), YELLOW);
        assert_eq!(th.smooth_color(2400), RED);
        assert_eq!(th.smooth_color(5000), RED);
        assert_eq!(th.smooth_color(1000), GREEN.lerp(YELLOW, 0.5));
    }

    #[test]
    fn lerp_clamps() {
        assert_eq!(GREEN.lerp(RED, -1.0), GREEN);
        assert_eq!(GREEN.lerp(RED, 2.0), RED);
    }
}
