//! Terminal drawing helpers shared by the live, overview and settings views.
//!
//! Everything returns `String`s so views can be assembled and tested
//! without a terminal. Colors go through `colored`, which honours
//! `NO_COLOR` and the `--plain` override.

use colored::{ColoredString, Colorize};

use crate::state::quality::{Rgb, Thresholds, THRESHOLD_MAX, THRESHOLD_MIN};

/// Placeholder for values that cannot be computed.
pub const PLACEHOLDER: &str = "—";

const SPARK: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub fn paint(text: &str, color: Rgb) -> ColoredString {
    text.truecolor(color.0, color.1, color.2)
}

/// ANSI "clear screen, cursor home".
pub fn clear_screen() -> &'static str {
    "\x1b[2J\x1b[H"
}

/// One-line sparkline, each glyph colored by its band.
pub fn sparkline(values: &[u32], thresholds: Thresholds) -> String {
    let (Some(&lo), Some(&hi)) = (values.iter().min(), values.iter().max()) else {
        return String::new();
    };
    let span = f64::from(hi - lo).max(1.0);
    values
        .iter()
        .map(|&v| {
            let idx = ((f64::from(v - lo) / span) * 7.0).round() as usize;
            let glyph = SPARK[idx.min(7)].to_string();
            paint(&glyph, thresholds.classify(v).color()).to_string()
        })
        .collect()
}

/// Vertical bar chart, `height` rows tall, with the value range labelled on
/// the left. The vertical range always includes both thresholds so bands
/// stay visually comparable between frames.
pub fn bar_chart(values: &[u32], thresholds: Thresholds, height: usize) -> Vec<String> {
    if values.is_empty() || height == 0 {
        return vec![format!("  {}", "waiting for data…".dimmed())];
    }
    let lo = values
        .iter()
        .copied()
        .min()
        .unwrap_or(THRESHOLD_MIN)
        .min(thresholds.good())
        .saturating_sub(100);
    let hi = values
        .iter()
        .copied()
        .max()
        .unwrap_or(THRESHOLD_MAX)
        .max(thresholds.bad())
        + 100;
    let span = f64::from(hi - lo);

    let mut rows = Vec::with_capacity(height + 1);
    for row in 0..height {
        // Level this row represents, top row first.
        let level = hi as f64 - span * (row as f64 + 0.5) / height as f64;
        let label = match row {
            0 => format!("{hi:>5}"),
            r if r + 1 == height => format!("{lo:>5}"),
            _ => " ".repeat(5),
        };
        let mut line = format!("{label} │");
        for &v in values {
            if f64::from(v) >= level {
                line.push_str(&paint("█", thresholds.classify(v).color()).to_string());
            } else {
                line.push(' ');
            }
        }
        rows.push(line);
    }
    rows.push(format!("{} └{}", " ".repeat(5), "─".repeat(values.len())));
    rows
}

/// Horizontal bar split into good / medium / bad zones, proportional to
/// the widths given in percent.
pub fn zone_bar(widths: (f64, f64, f64), width: usize) -> String {
    let cells = |pct: f64| ((pct / 100.0) * width as f64).round() as usize;
    let good = cells(widths.0);
    let medium = cells(widths.1);
    let bad = width.saturating_sub(good + medium);
    format!(
        "{}{}{}",
        paint(&"█".repeat(good), crate::state::quality::GREEN),
        paint(&"█".repeat(medium), crate::state::quality::YELLOW),
        paint(&"█".repeat(bad), crate::state::quality::RED),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain<T>(f: impl FnOnce() -> T) -> T {
        colored::control::set_override(false);
        f()
    }

    #[test]
    fn sparkline_spans_the_range() {
        let line = plain(|| sparkline(&[400, 800, 1200], Thresholds::default()));
        assert_eq!(line, "▁▅█");
        assert_eq!(plain(|| sparkline(&[], Thresholds::default())), "");
    }

    #[test]
    fn flat_series_does_not_divide_by_zero() {
        let line = plain(|| sparkline(&[900, 900], Thresholds::default()));
        assert_eq!(line, "▁▁");
    }

    #[test]
    fn bar_chart_has_axis_and_one_column_per_value() {
        let rows = plain(|| bar_chart(&[700, 1300], Thresholds::default(), 4));
        assert_eq!(rows.len(), 5);
        assert!(rows[0].starts_with(" 1400 │"));
        assert!(rows[3].starts_with("  600 │"));
        assert!(rows[4].ends_with("──"));
        // The tall column reaches the top row, the short one does not.
        assert!(rows[0].ends_with(" █"));
    }

    #[test]
    fn zone_bar_fills_width() {
        let bar = plain(|| zone_bar((25.0, 25.0, 50.0), 20));
        assert_eq!(bar.chars().count(), 20);
    }
}
