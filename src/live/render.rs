//! Terminal frame for the live page.

use std::time::Instant;

use colored::Colorize;

use super::corridor::{LiveCorridor, Phase};
use super::series::ChartSeries;
use crate::alerts::AlertLog;
use crate::display::{self, PLACEHOLDER};
use crate::state::quality::{GREY, Thresholds};

const CHART_HEIGHT: usize = 8;
const ALERTS_SHOWN: usize = 3;

pub struct FrameInput<'a> {
    pub corridor: &'a LiveCorridor,
    pub thresholds: Thresholds,
    pub alerts: &'a AlertLog,
    pub nav: &'a ChartSeries,
    pub status: Option<&'a str>,
    pub now: Instant,
}

pub fn transport_label(corridor: &LiveCorridor) -> String {
    if corridor.push_available() {
        "push".green().to_string()
    } else if corridor.is_polling() {
        "polling".yellow().to_string()
    } else {
        "idle".dimmed().to_string()
    }
}

pub fn frame(input: &FrameInput<'_>) -> Vec<String> {
    let c = input.corridor;
    let t = input.thresholds;
    let mut lines = Vec::new();

    lines.push(format!(
        "{}  [{}]  {}",
        "CO₂ Live".bold().cyan(),
        transport_label(c),
        display::sparkline(&input.nav.values(), t),
    ));
    lines.push(String::new());

    match c.phase() {
        Phase::Paused => {
            lines.push(format!(
                "  {}",
                display::paint("⏸  Analysis paused", GREY).bold()
            ));
            let frozen = c
                .last_ppm()
                .map(|p| format!("{p} ppm"))
                .unwrap_or_else(|| PLACEHOLDER.to_string());
            lines.push(format!("  {}", display::paint(&frozen, GREY)));
        }
        Phase::Running => match c.value().display(input.now) {
            Some(shown) => {
                let quality = t.classify(shown);
                let mut value = display::paint(&format!("{shown} ppm"), t.smooth_color(shown)).bold();
                if c.is_blinking(input.now) {
                    value = value.blink();
                }
                lines.push(format!(
                    "  {} {}   {} · {}",
                    value,
                    c.arrow().glyph(),
                    display::paint(quality.label(), quality.color()),
                    quality.advice().dimmed(),
                ));
            }
            None => lines.push(format!("  {}", PLACEHOLDER.dimmed())),
        },
    }
    lines.push(String::new());

    lines.extend(display::bar_chart(&c.series().values(), t, CHART_HEIGHT));
    let series = c.series();
    let range = match (series.values().iter().min(), series.values().iter().max()) {
        (Some(lo), Some(hi)) => format!("min {lo}  max {hi}"),
        _ => format!("min {PLACEHOLDER}  max {PLACEHOLDER}"),
    };
    lines.push(format!(
        "  {}  points {}/{}  {}",
        range,
        series.len(),
        series.capacity(),
        format!("good < {} ≤ medium < {} ≤ bad", t.good(), t.bad()).dimmed(),
    ));
    lines.push(String::new());

    if input.alerts.is_empty() {
        lines.push(format!("  {}", "No alerts".dimmed()));
    } else {
        lines.push(format!("  {} ({})", "Alerts".bold(), input.alerts.len()));
        for (i, alert) in input.alerts.iter().take(ALERTS_SHOWN).enumerate() {
            lines.push(format!(
                "  {:>2}. {} {}",
                i,
                alert.at.format("%H:%M:%S").to_string().dimmed(),
                alert.message
            ));
        }
    }

    if let Some(status) = input.status {
        lines.push(String::new());
        lines.push(format!("  {}", status.yellow()));
    }
    lines.push(String::new());
    lines.push(
        "  export [file] · reset · dismiss <n> · clear · quit"
            .dimmed()
            .to_string(),
    );
    lines
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::api::types::LatestReading;
    use crate::config::schema::TransportMode;

    fn render(corridor: &LiveCorridor, now: Instant) -> String {
        colored::control::set_override(false);
        let alerts = AlertLog::default();
        let nav = ChartSeries::with_capacity(40);
        frame(&FrameInput {
            corridor,
            thresholds: Thresholds::default(),
            alerts: &alerts,
            nav: &nav,
            status: Some("push stream lost"),
            now,
        })
        .join("\n")
    }

    #[test]
    fn running_frame_shows_value_and_label() {
        let now = Instant::now();
        let mut c = LiveCorridor::new(TransportMode::Auto, 25, Duration::ZERO);
        c.apply(
            &LatestReading {
                ppm: Some(1000),
                timestamp: Some("t".into()),
                ..LatestReading::default()
            },
            now,
            Thresholds::default(),
        );
        let text = render(&c, now);
        assert!(text.contains("1000 ppm"));
        assert!(text.contains("Medium"));
        assert!(text.contains("points 1/25"));
        assert!(text.contains("push stream lost"));
    }

    #[test]
    fn paused_frame_shows_overlay() {
        let now = Instant::now();
        let mut c = LiveCorridor::new(TransportMode::Auto, 25, Duration::ZERO);
        c.set_running(false);
        let text = render(&c, now);
        assert!(text.contains("Analysis paused"));
        assert!(text.contains(PLACEHOLDER));
    }
}
