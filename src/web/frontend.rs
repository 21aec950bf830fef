//! Server-rendered HTML for the web dashboard.
//!
//! No JavaScript and no external assets: the page is rebuilt from a fresh
//! [`Snapshot`] on every request and reloads itself with a meta refresh.

use std::fmt::Write;

use super::api::Snapshot;
use crate::display::PLACEHOLDER;
use crate::state::quality::{Thresholds, GREY};

const CHART_W: f64 = 640.0;
const CHART_H: f64 = 220.0;
const PAD: f64 = 32.0;

const STYLE: &str = r#"
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --good: #4ade80;
  --medium: #facc15;
  --bad: #f87171;
  --paused: #9ca3af;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
}
* { margin: 0; padding: 0; box-sizing: border-box; }
body { background: var(--bg); color: var(--text); font-family: var(--font); font-size: 14px; line-height: 1.5; padding: 24px; }
h1 { font-size: 20px; margin-bottom: 16px; }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(260px, 1fr)); gap: 16px; margin-bottom: 16px; }
.card { background: var(--surface); border: 1px solid var(--border); border-radius: var(--radius); padding: 16px; }
.card h2 { font-size: 13px; color: var(--text-muted); text-transform: uppercase; margin-bottom: 8px; }
.status { font-size: 28px; font-weight: 600; }
.muted { color: var(--text-muted); }
.stat { display: flex; justify-content: space-between; padding: 4px 0; border-bottom: 1px solid var(--border); }
.stat:last-child { border-bottom: none; }
.thermo { height: 14px; background: var(--border); border-radius: 7px; overflow: hidden; margin: 8px 0; }
.thermo > div { height: 100%; }
.zones { display: flex; height: 14px; border-radius: 7px; overflow: hidden; margin: 8px 0; }
.errors { color: var(--bad); margin-top: 8px; }
svg text { fill: var(--text-muted); font-size: 11px; }
"#;

/// Minimal HTML escaping for text nodes and attribute values.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_page(snap: &Snapshot, refresh_secs: u64) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<meta http-equiv="refresh" content="{refresh_secs}">
<title>CO₂ Dashboard</title>
<style>{STYLE}</style>
</head>
<body>
<h1>CO₂ Dashboard</h1>
<div class="grid">
"#
    );

    html.push_str(&air_health_card(snap));
    html.push_str(&stats_card(snap));
    html.push_str(&thresholds_card(snap));
    html.push_str("</div>\n");

    let _ = write!(
        html,
        r#"<div class="card"><h2>Latest readings</h2>{}</div>
"#,
        chart_svg(snap)
    );

    if !snap.errors.is_empty() {
        html.push_str(r#"<div class="errors">"#);
        for e in &snap.errors {
            let _ = write!(html, "<div>could not load {}</div>", escape(e));
        }
        html.push_str("</div>\n");
    }

    let _ = write!(
        html,
        r#"<p class="muted">Updated {}</p>
</body>
</html>
"#,
        escape(&snap.generated_at)
    );
    html
}

fn air_health_card(snap: &Snapshot) -> String {
    let (title, advice, color) = match &snap.card {
        Some(card) => (card.title.as_str(), card.advice.as_str(), card.color.clone()),
        None => (PLACEHOLDER, "", GREY.hex()),
    };
    let current = match &snap.latest {
        Some(l) => format!(
            r#"<div style="color:{}">Current CO₂ · {} ppm</div>
<div class="thermo"><div style="width:{:.1}%;background:{}"></div></div>"#,
            l.color, l.ppm, l.thermometer_pct, l.color
        ),
        None => r#"<div class="thermo"><div style="width:0%"></div></div>"#.to_string(),
    };
    format!(
        r#"<div class="card"><h2>Air health</h2>
<div class="status" style="color:{color}">{}</div>
<div class="muted">{}</div>
{current}
</div>
"#,
        escape(title),
        escape(advice)
    )
}

fn stats_card(snap: &Snapshot) -> String {
    let (avg, max, bad) = match snap.stats {
        Some(s) => (
            format!("{} ppm", s.avg),
            format!("{} ppm", s.max),
            format!("{} min", s.bad_minutes),
        ),
        None => (PLACEHOLDER.into(), PLACEHOLDER.into(), PLACEHOLDER.into()),
    };
    format!(
        r#"<div class="card"><h2>Today</h2>
<div class="stat"><span>Average</span><span>{avg}</span></div>
<div class="stat"><span>Maximum</span><span>{max}</span></div>
<div class="stat"><span>Time in bad air</span><span>{bad}</span></div>
</div>
"#
    )
}

fn thresholds_card(snap: &Snapshot) -> String {
    let t = &snap.thresholds;
    let z = &snap.zones;
    format!(
        r#"<div class="card"><h2>Thresholds</h2>
<div class="stat"><span>Good below</span><span>{} ppm</span></div>
<div class="stat"><span>Warning</span><span>{} ppm</span></div>
<div class="stat"><span>Bad from</span><span>{} ppm</span></div>
<div class="zones"><div style="width:{:.1}%;background:var(--good)"></div><div style="width:{:.1}%;background:var(--medium)"></div><div style="width:{:.1}%;background:var(--bad)"></div></div>
<div class="muted">Analysis {}</div>
</div>
"#,
        t.good,
        t.warning,
        t.bad,
        z.good_pct,
        z.medium_pct,
        z.bad_pct,
        if snap.analysis_running { "running" } else { "paused" }
    )
}

/// Line chart of the latest readings with the two thresholds as dashed
/// guides.
pub fn chart_svg(snap: &Snapshot) -> String {
    if snap.chart.is_empty() {
        return format!(r#"<p class="muted">{PLACEHOLDER}</p>"#);
    }
    let thresholds = Thresholds::new(snap.thresholds.good, snap.thresholds.bad).unwrap_or_default();
    let values: Vec<u32> = snap.chart.iter().map(|p| p.ppm).collect();
    let lo = values.iter().copied().min().unwrap_or(0).min(thresholds.good()).saturating_sub(100);
    let hi = values.iter().copied().max().unwrap_or(0).max(thresholds.bad()) + 100;
    let span = f64::from(hi - lo).max(1.0);

    let x = |i: usize| {
        if values.len() == 1 {
            CHART_W / 2.0
        } else {
            PAD + (CHART_W - 2.0 * PAD) * i as f64 / (values.len() - 1) as f64
        }
    };
    let y = |v: u32| CHART_H - PAD - (CHART_H - 2.0 * PAD) * f64::from(v - lo) / span;

    let mut svg = format!(
        r#"<svg viewBox="0 0 {CHART_W} {CHART_H}" width="100%" role="img" aria-label="CO2 chart">"#
    );
    for (level, var) in [(thresholds.good(), "--good"), (thresholds.bad(), "--bad")] {
        let _ = write!(
            svg,
            r#"<line x1="{PAD}" x2="{}" y1="{y:.1}" y2="{y:.1}" stroke="var({var})" stroke-dasharray="4 4" opacity="0.6"/><text x="2" y="{:.1}">{level}</text>"#,
            CHART_W - PAD,
            y(level) + 4.0,
            y = y(level),
        );
    }

    let points: Vec<String> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| format!("{:.1},{:.1}", x(i), y(v)))
        .collect();
    let _ = write!(
        svg,
        r##"<polyline fill="none" stroke="#58a6ff" stroke-width="2" points="{}"/>"##,
        points.join(" ")
    );
    for (i, p) in snap.chart.iter().enumerate() {
        let _ = write!(
            svg,
            r#"<circle cx="{:.1}" cy="{:.1}" r="3" fill="{}"><title>{} · {} ppm</title></circle>"#,
            x(i),
            y(p.ppm),
            thresholds.classify(p.ppm).color().hex(),
            escape(&p.label),
            p.ppm
        );
    }
    if let (Some(first), Some(last)) = (snap.chart.first(), snap.chart.last()) {
        let _ = write!(
            svg,
            r#"<text x="{PAD}" y="{}">{}</text><text x="{}" y="{}" text-anchor="end">{}</text>"#,
            CHART_H - 8.0,
            escape(&first.label),
            CHART_W - PAD,
            CHART_H - 8.0,
            escape(&last.label)
        );
    }
    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::series::ChartPoint;
    use crate::web::api::{ThresholdsView, ZonesView};

    fn snapshot(chart: Vec<ChartPoint>) -> Snapshot {
        Snapshot {
            generated_at: "2024-03-01T10:00:00+00:00".to_string(),
            analysis_running: true,
            thresholds: ThresholdsView {
                good: 800,
                warning: 1000,
                bad: 1200,
            },
            zones: ZonesView {
                good_pct: 25.0,
                medium_pct: 12.5,
                bad_pct: 62.5,
            },
            card: None,
            latest: None,
            stats: None,
            chart,
            errors: vec!["history: <timeout>".to_string()],
        }
    }

    #[test]
    fn empty_snapshot_renders_placeholders() {
        let html = render_page(&snapshot(Vec::new()), 5);
        assert!(html.contains(r#"content="5""#));
        assert!(html.contains(PLACEHOLDER));
        assert!(html.contains("could not load history: &lt;timeout&gt;"));
        assert!(!html.contains("<svg"));
    }

    #[test]
    fn chart_has_one_marker_per_point() {
        let chart = vec![
            ChartPoint { label: "10:00:00".into(), ppm: 750 },
            ChartPoint { label: "10:00:01".into(), ppm: 1000 },
            ChartPoint { label: "10:00:02".into(), ppm: 1500 },
        ];
        let svg = chart_svg(&snapshot(chart));
        assert_eq!(svg.matches("<circle").count(), 3);
        assert!(svg.contains("#4ade80"));
        assert!(svg.contains("#facc15"));
        assert!(svg.contains("#f87171"));
    }

    #[test]
    fn escape_covers_markup() {
        assert_eq!(escape(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }
}
