//! Overview page: air health card, day statistics, thermometer.
//!
//! Refreshes on its own timer, whose period follows the backend's
//! `overview_update_speed`. Reading pushes are ignored here; only settings
//! and analysis-state pushes are applied, and they restart the refresh
//! timer so a new period takes effect immediately.

pub mod stats;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;

use crate::api::push::{self, PushEvent};
use crate::api::{ApiClient, Backend};
use crate::config::schema::{DashConfig, TransportMode};
use crate::display::{self, PLACEHOLDER};
use crate::events;
use crate::live::Inbound;
use crate::live::animation::AnimatedValue;
use crate::runtime::{input, Clock, Scheduler, SystemClock};
use crate::state::sync;
use crate::state::{StateChange, StateStore, WriteSource};
use stats::{DayStats, StatusCard};

/// Sub-value blink after crossing into the bad band.
const SUB_BLINK: Duration = Duration::from_millis(900);
const THERMO_WIDTH: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverviewTimer {
    StateSync,
    Refresh,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct OverviewSession<B: Backend, C: Clock> {
    backend: B,
    clock: C,
    store: StateStore,
    scheduler: Scheduler<OverviewTimer>,
    sync_interval: Duration,
    fallback_refresh: Duration,
    card: Option<StatusCard>,
    stats: Option<DayStats>,
    thermo: Option<u32>,
    sub_value: AnimatedValue,
    last_sub: Option<u32>,
    blink_until: Option<Instant>,
    status: Option<String>,
    refreshes: u64,
}

impl<B: Backend, C: Clock> OverviewSession<B, C> {
    pub fn new(backend: B, clock: C, config: &DashConfig) -> Self {
        Self {
            backend,
            clock,
            store: StateStore::default(),
            scheduler: Scheduler::default(),
            sync_interval: Duration::from_millis(config.sync.state_sync_interval_ms),
            fallback_refresh: Duration::from_millis(config.overview.refresh_interval_ms),
            card: None,
            stats: None,
            thermo: None,
            sub_value: AnimatedValue::new(Duration::from_millis(config.overview.value_animation_ms)),
            last_sub: None,
            blink_until: None,
            status: None,
            refreshes: 0,
        }
    }

    pub fn start(&mut self) {
        if sync::load_settings(&self.backend, &mut self.store, WriteSource::Startup).is_none() {
            self.status = Some("could not load settings; using default interval".to_string());
        }
        let now = self.clock.now();
        self.scheduler.every(OverviewTimer::StateSync, self.sync_interval, now);
        self.restart_refresh();
    }

    pub fn refresh_interval(&self) -> Duration {
        if self.store.is_loaded() {
            Duration::from_secs(u64::from(self.store.settings().overview_update_speed_secs))
        } else {
            self.fallback_refresh
        }
    }

    /// Refresh now and re-arm the timer with the current period.
    fn restart_refresh(&mut self) {
        self.refresh();
        let now = self.clock.now();
        self.scheduler
            .every(OverviewTimer::Refresh, self.refresh_interval(), now);
    }

    pub fn process_due(&mut self) {
        let now = self.clock.now();
        while let Some(key) = self.scheduler.pop_due(now) {
            self.handle_timer(key);
        }
    }

    pub fn handle_timer(&mut self, key: OverviewTimer) {
        match key {
            OverviewTimer::StateSync => {
                if let Some(change) = sync::tick(&self.backend, &mut self.store) {
                    self.apply_state_change(change);
                }
            }
            OverviewTimer::Refresh => self.refresh(),
        }
    }

    fn apply_state_change(&mut self, change: StateChange) {
        if change.overview_update_speed || change.analysis_running {
            self.restart_refresh();
        }
    }

    pub fn handle_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::Settings(settings) => {
                let change = self.store.replace(settings, WriteSource::Push);
                if change.any() {
                    self.restart_refresh();
                }
            }
            PushEvent::AnalysisState(running) => {
                let change = self.store.set_analysis_running(running, WriteSource::Push);
                self.apply_state_change(change);
            }
            // The refresh timer drives readings on this page.
            PushEvent::Reading(_) => {}
            PushEvent::Connected => events::info("push", "stream connected"),
            PushEvent::Disconnected(reason) => {
                events::warn("push", format!("stream unavailable: {reason}"))
            }
        }
    }

    /// One recompute pass. Paused analysis blanks every derived value;
    /// network failures keep what was shown before.
    pub fn refresh(&mut self) {
        self.refreshes += 1;
        let thresholds = self.store.thresholds();

        if !self.store.analysis_running() {
            self.card = Some(StatusCard::Paused);
            self.stats = None;
            self.thermo = Some(0);
            return;
        }

        let mut problem = None;
        match self.backend.latest() {
            Ok(latest) => {
                if let Some(ppm) = latest.ppm {
                    let now = self.clock.now();
                    self.card = Some(StatusCard::for_reading(ppm, thresholds));
                    self.thermo = Some(ppm);
                    self.sub_value.set_target(f64::from(ppm), now);
                    if self.last_sub.is_some_and(|p| p < thresholds.bad()) && ppm >= thresholds.bad() {
                        self.blink_until = Some(now + SUB_BLINK);
                    }
                    self.last_sub = Some(ppm);
                } else if self.card == Some(StatusCard::Paused) {
                    self.card = None;
                }
            }
            Err(e) => {
                events::warn("overview", format!("could not load latest reading: {e:#}"));
                problem = Some("could not load latest reading");
            }
        }

        match self.backend.history_today() {
            Ok(readings) => self.stats = stats::compute(&readings, thresholds),
            Err(e) => {
                events::warn("overview", format!("could not load today's history: {e:#}"));
                problem = Some("could not load today's history");
            }
        }
        self.status = problem.map(str::to_string);
    }

    /// Returns `false` when the session should end.
    pub fn handle_line(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let cmd = parts.next().unwrap_or_default();
        let arg = parts.next().map(PathBuf::from);
        let result = match cmd {
            "export" | "e" => {
                let path = arg.unwrap_or_else(|| PathBuf::from("daily-report.csv"));
                export_day_csv(&self.backend, &path)
                    .map(|n| format!("exported {n} readings to {}", path.display()))
            }
            "quit" | "q" | "exit" => return false,
            other => Err(anyhow::anyhow!("unknown command '{other}'")),
        };
        self.status = Some(match result {
            Ok(msg) => msg,
            Err(e) => format!("{e:#}"),
        });
        true
    }

    pub fn wait_timeout(&self) -> Duration {
        let now = self.clock.now();
        let next = self
            .scheduler
            .time_until_next(now)
            .unwrap_or(self.sync_interval);
        if self.sub_value.is_animating(now) || self.is_blinking(now) {
            next.min(Duration::from_millis(50))
        } else {
            next
        }
    }

    fn is_blinking(&self, now: Instant) -> bool {
        self.blink_until.is_some_and(|until| now < until)
    }

    // -- Rendering --

    pub fn frame(&self) -> Vec<String> {
        let now = self.clock.now();
        let t = self.store.thresholds();
        let mut lines = vec!["CO₂ Overview".bold().cyan().to_string(), String::new()];

        match self.card {
            Some(card) => {
                lines.push(format!("  {}", display::paint(card.title(), card.color()).bold()));
                lines.push(format!("  {}", card.advice().dimmed()));
            }
            None => lines.push(format!("  {}", PLACEHOLDER.dimmed())),
        }

        if self.card == Some(StatusCard::Paused) {
            lines.push(format!("  {}", "No data being collected".dimmed()));
        } else if let Some(shown) = self.sub_value.display(now) {
            let mut sub = display::paint(&format!("Current CO₂ · {shown} ppm"), t.smooth_color(shown));
            if self.is_blinking(now) {
                sub = sub.blink();
            }
            lines.push(format!("  {sub}"));
        }
        lines.push(String::new());

        let thermo = self.thermo.unwrap_or(0);
        let pct = stats::thermometer_percent(thermo);
        let filled = ((pct / 100.0) * THERMO_WIDTH as f64).round() as usize;
        let color = match self.card {
            Some(StatusCard::Paused) | None => crate::state::quality::GREY,
            Some(_) => t.classify(thermo).color(),
        };
        lines.push(format!(
            "  [{}{}] {} ppm",
            display::paint(&"█".repeat(filled), color),
            " ".repeat(THERMO_WIDTH - filled.min(THERMO_WIDTH)),
            thermo
        ));
        lines.push(format!(
            "  {} {} / {} ppm",
            "Thresholds:".bold(),
            t.good(),
            t.bad()
        ));
        lines.push(String::new());

        let (avg, max, bad) = match self.stats {
            Some(s) => (
                format!("{} ppm", s.avg),
                format!("{} ppm", s.max),
                format!("{} min", s.bad_minutes),
            ),
            None => (PLACEHOLDER.into(), PLACEHOLDER.into(), PLACEHOLDER.into()),
        };
        let avg = match self.stats.map(|s| t.classify(s.avg).color()) {
            Some(c) => display::paint(&avg, c).to_string(),
            None => avg,
        };
        lines.push(format!("  {} {avg}", "Today average:".bold()));
        lines.push(format!("  {} {max}", "Today maximum:".bold()));
        lines.push(format!("  {} {bad}", "Time in bad air:".bold()));

        if let Some(status) = &self.status {
            lines.push(String::new());
            lines.push(format!("  {}", status.yellow()));
        }
        lines.push(String::new());
        lines.push("  export [file] · quit".dimmed().to_string());
        lines
    }

    // -- Accessors --

    pub fn card(&self) -> Option<StatusCard> {
        self.card
    }

    pub fn stats(&self) -> Option<DayStats> {
        self.stats
    }

    pub fn thermo(&self) -> Option<u32> {
        self.thermo
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn scheduler(&self) -> &Scheduler<OverviewTimer> {
        &self.scheduler
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

/// Fetch today's history and write it as `time,ppm` CSV. Returns the
/// number of readings written.
pub fn export_day_csv<B: Backend + ?Sized>(backend: &B, path: &Path) -> Result<usize> {
    let readings = backend.history_today()?;
    fs::write(path, stats::day_csv(&readings))
        .with_context(|| format!("failed to write {}", path.display()))?;
    events::info(
        "export",
        format!("{} readings exported to {}", readings.len(), path.display()),
    );
    Ok(readings.len())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// `co2dash overview`. With `once`, prints a single frame and exits.
pub fn run(config: &DashConfig, once: bool, duration: Option<Duration>) -> Result<()> {
    let client = ApiClient::from_config(&config.backend);
    let clock = SystemClock;
    let started = clock.now();

    if once {
        let mut session = OverviewSession::new(client, clock, config);
        session.start();
        println!("{}", session.frame().join("\n"));
        return Ok(());
    }

    events::set_stderr_echo(false);
    let (tx, rx) = mpsc::channel::<Inbound>();
    if config.live.transport != TransportMode::Poll {
        push::spawn_listener(client.push_url(), client.timeout(), tx.clone());
    }
    input::spawn_stdin_lines(tx.clone());

    let mut session = OverviewSession::new(client, clock, config);
    session.start();
    let deadline = duration.map(|d| started + d);
    let mut stdout = std::io::stdout();

    loop {
        session.process_due();
        let _ = writeln!(
            stdout,
            "{}{}",
            display::clear_screen(),
            session.frame().join("\n")
        );
        let _ = stdout.flush();

        let now = SystemClock.now();
        let mut wait = session.wait_timeout();
        if let Some(deadline) = deadline {
            if now >= deadline {
                break;
            }
            wait = wait.min(deadline - now);
        }
        match rx.recv_timeout(wait) {
            Ok(Inbound::Push(event)) => session.handle_push(event),
            Ok(Inbound::Line(line)) => {
                if !session.handle_line(&line) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => std::thread::sleep(wait),
        }
    }
    events::set_stderr_echo(true);
    println!("Left overview at {}", Local::now().format("%H:%M:%S"));
    drop(tx);
    Ok(())
}
