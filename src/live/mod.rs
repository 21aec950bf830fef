//! Live page: rolling chart and animated readout.
//!
//! [`LiveSession`] owns everything the page needs (shared state, the update
//! corridor, timers, alerts) and is driven from one loop. Updates arrive
//! from three places:
//!
//! - the push stream listener thread ([`PushEvent`]s over a channel)
//! - the fallback poll timer, only while the push stream is unavailable
//! - the state watcher timer, which re-syncs settings every couple of seconds
//!
//! The session is generic over [`Backend`] and [`Clock`] so tests can drive
//! it with a scripted backend and a manual clock.

pub mod animation;
pub mod corridor;
pub mod render;
pub mod series;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;

use crate::alerts::prefs::Preferences;
use crate::alerts::{self, Alert, AlertLog};
use crate::api::push::{self, PushEvent};
use crate::api::types::LatestReading;
use crate::api::{ApiClient, Backend};
use crate::config::schema::{DashConfig, TransportMode};
use crate::display;
use crate::events;
use crate::runtime::{input, Clock, Scheduler, SystemClock};
use crate::state::sync;
use crate::state::{StateChange, StateStore, WriteSource};
use corridor::{LiveCorridor, Outcome, Phase, PollEffect};
use series::ChartSeries;

/// Readings shown in the header sparkline.
pub const NAV_POINTS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveTimer {
    StateSync,
    Poll,
}

/// Everything the loop can receive from helper threads.
#[derive(Debug)]
pub enum Inbound {
    Push(PushEvent),
    Line(String),
}

impl From<PushEvent> for Inbound {
    fn from(ev: PushEvent) -> Self {
        Self::Push(ev)
    }
}

impl From<String> for Inbound {
    fn from(line: String) -> Self {
        Self::Line(line)
    }
}

// ---------------------------------------------------------------------------
// Commands typed while the page is open
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveCommand {
    Export(Option<PathBuf>),
    Reset,
    Dismiss(usize),
    ClearAlerts,
    Quit,
}

pub fn parse_command(line: &str) -> Result<LiveCommand> {
    let mut parts = line.split_whitespace();
    let cmd = parts.next().unwrap_or_default();
    let arg = parts.next();
    match cmd {
        "export" | "e" => Ok(LiveCommand::Export(arg.map(PathBuf::from))),
        "reset" | "r" => Ok(LiveCommand::Reset),
        "dismiss" | "d" => {
            let index = arg
                .context("usage: dismiss <n>")?
                .parse()
                .context("alert index must be a number")?;
            Ok(LiveCommand::Dismiss(index))
        }
        "clear" => Ok(LiveCommand::ClearAlerts),
        "quit" | "q" | "exit" => Ok(LiveCommand::Quit),
        other => anyhow::bail!("unknown command '{other}'"),
    }
}

/// Default file name for chart exports.
pub fn default_export_path() -> PathBuf {
    PathBuf::from(format!(
        "co2-live-{}.csv",
        Local::now().format("%Y%m%d-%H%M%S")
    ))
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

pub struct LiveSession<B: Backend, C: Clock> {
    backend: B,
    clock: C,
    store: StateStore,
    corridor: LiveCorridor,
    scheduler: Scheduler<LiveTimer>,
    alerts: AlertLog,
    nav: ChartSeries,
    audio: bool,
    sync_interval: Duration,
    fallback_poll: Duration,
    frame_interval: Duration,
    status: Option<String>,
    bell_pending: bool,
    changed: bool,
}

impl<B: Backend, C: Clock> LiveSession<B, C> {
    pub fn new(backend: B, clock: C, config: &DashConfig, prefs: &Preferences) -> Self {
        Self {
            backend,
            clock,
            store: StateStore::default(),
            corridor: LiveCorridor::new(
                config.live.transport,
                config.live.max_points,
                Duration::from_millis(config.live.value_animation_ms),
            ),
            scheduler: Scheduler::default(),
            alerts: AlertLog::with_capacity(config.alerts.max_entries),
            nav: ChartSeries::with_capacity(NAV_POINTS),
            audio: prefs.audio_alerts,
            sync_interval: Duration::from_millis(config.sync.state_sync_interval_ms),
            fallback_poll: Duration::from_millis(config.live.poll_interval_ms),
            frame_interval: Duration::from_millis(config.live.frame_interval_ms.max(1)),
            status: None,
            bell_pending: false,
            changed: true,
        }
    }

    /// Initial load: settings, the header sparkline, one reading, then the
    /// state watcher and (in poll mode) the fallback poll.
    pub fn start(&mut self) {
        if sync::load_settings(&self.backend, &mut self.store, WriteSource::Startup).is_none() {
            self.status = Some("could not load settings; using defaults".to_string());
        }
        if !self.store.analysis_running() {
            self.corridor.set_running(false);
        }

        match self.backend.history_latest(NAV_POINTS) {
            Ok(readings) => {
                for r in readings {
                    self.nav.push(r.time_label(), r.ppm);
                }
            }
            Err(e) => events::warn("live", format!("could not load recent history: {e:#}")),
        }

        let now = self.clock.now();
        self.scheduler.every(LiveTimer::StateSync, self.sync_interval, now);
        let effect = self.corridor.start();
        if effect.is_none() {
            self.poll_now();
        }
        self.apply_poll_effect(effect);
        events::info(
            "live",
            format!("session started (transport {})", self.corridor.mode()),
        );
    }

    /// Poll period: the backend's `update_speed` once known, else config.
    pub fn poll_interval(&self) -> Duration {
        if self.store.is_loaded() {
            Duration::from_secs(u64::from(self.store.settings().update_speed_secs))
        } else {
            self.fallback_poll
        }
    }

    fn apply_poll_effect(&mut self, effect: Option<PollEffect>) {
        match effect {
            Some(PollEffect::Start) => {
                let now = self.clock.now();
                self.scheduler.every(LiveTimer::Poll, self.poll_interval(), now);
                events::info("live", "fallback polling started");
                self.poll_now();
            }
            Some(PollEffect::Stop) => {
                self.scheduler.cancel(LiveTimer::Poll);
                events::info("live", "fallback polling stopped");
            }
            None => {}
        }
    }

    fn poll_now(&mut self) {
        match self.backend.latest() {
            Ok(update) => self.apply_update(&update),
            Err(e) => {
                events::warn("live", format!("poll failed: {e:#}"));
                self.status = Some("could not load latest reading".to_string());
                self.changed = true;
            }
        }
    }

    /// Run every timer that is due now.
    pub fn process_due(&mut self) {
        let now = self.clock.now();
        while let Some(key) = self.scheduler.pop_due(now) {
            self.handle_timer(key);
        }
    }

    pub fn handle_timer(&mut self, key: LiveTimer) {
        match key {
            LiveTimer::StateSync => {
                if let Some(change) = sync::tick(&self.backend, &mut self.store) {
                    self.apply_state_change(change);
                }
            }
            LiveTimer::Poll => self.poll_now(),
        }
    }

    fn apply_state_change(&mut self, change: StateChange) {
        if change.any() {
            self.changed = true;
        }
        if change.analysis_running {
            let step = self.corridor.set_running(self.store.analysis_running());
            self.apply_poll_effect(step.poll);
        }
        if change.update_speed && self.scheduler.is_scheduled(LiveTimer::Poll) {
            let now = self.clock.now();
            self.scheduler.every(LiveTimer::Poll, self.poll_interval(), now);
            events::info(
                "live",
                format!("poll interval now {}s", self.store.settings().update_speed_secs),
            );
        }
    }

    pub fn handle_push(&mut self, event: PushEvent) {
        match event {
            PushEvent::Connected => {
                events::info("push", "stream connected");
                self.status = None;
                let effect = self.corridor.push_connected();
                self.apply_poll_effect(effect);
            }
            PushEvent::Disconnected(reason) => {
                events::warn("push", format!("stream unavailable: {reason}"));
                if self.corridor.mode() != TransportMode::Poll {
                    self.status = Some("push stream unavailable".to_string());
                }
                let effect = self.corridor.push_lost();
                self.apply_poll_effect(effect);
            }
            PushEvent::Reading(update) => self.apply_update(&update),
            PushEvent::Settings(settings) => {
                let change = self.store.replace(settings, WriteSource::Push);
                self.apply_state_change(change);
            }
            PushEvent::AnalysisState(running) => {
                let change = self.store.set_analysis_running(running, WriteSource::Push);
                self.apply_state_change(change);
            }
        }
        self.changed = true;
    }

    fn apply_update(&mut self, update: &LatestReading) {
        let now = self.clock.now();
        let thresholds = self.store.thresholds();
        let step = self.corridor.apply(update, now, thresholds);

        match step.outcome {
            Outcome::Duplicate | Outcome::Ignored => {}
            Outcome::Paused => events::info("live", "analysis paused"),
            Outcome::Resumed => events::info("live", "analysis resumed"),
            Outcome::Applied { ppm, previous, .. } => {
                self.nav.push(update.time_label(), ppm);
                if let Some(kind) = alerts::detect(previous, ppm, thresholds) {
                    let alert = Alert::new(kind, ppm, thresholds.bad(), Local::now());
                    events::info("alerts", alert.message.clone());
                    self.alerts.push(alert);
                    self.bell_pending = self.audio;
                }
            }
        }
        if step.outcome != Outcome::Duplicate {
            self.changed = true;
        }
        self.apply_poll_effect(step.poll);
    }

    /// Returns `false` when the session should end.
    pub fn handle_line(&mut self, line: &str) -> bool {
        self.changed = true;
        let command = match parse_command(line) {
            Ok(c) => c,
            Err(e) => {
                self.status = Some(format!("{e:#}"));
                return true;
            }
        };
        match command {
            LiveCommand::Export(path) => {
                let path = path.unwrap_or_else(default_export_path);
                self.status = Some(match self.export_chart(&path) {
                    Ok(()) => format!(
                        "exported {} points to {}",
                        self.corridor.series().len(),
                        path.display()
                    ),
                    Err(e) => format!("{e:#}"),
                });
            }
            LiveCommand::Reset => {
                self.corridor.reset_chart();
                self.status = Some("chart cleared".to_string());
            }
            LiveCommand::Dismiss(index) => {
                if self.alerts.remove(index).is_none() {
                    self.status = Some(format!("no alert #{index}"));
                }
            }
            LiveCommand::ClearAlerts => self.alerts.clear(),
            LiveCommand::Quit => return false,
        }
        true
    }

    pub fn export_chart(&self, path: &Path) -> Result<()> {
        fs::write(path, self.corridor.series().to_csv())
            .with_context(|| format!("failed to write {}", path.display()))?;
        events::info("export", format!("chart exported to {}", path.display()));
        Ok(())
    }

    /// How long the loop may block: until the next timer, or one frame while
    /// the readout is animating.
    pub fn wait_timeout(&self) -> Duration {
        let now = self.clock.now();
        let next = self
            .scheduler
            .time_until_next(now)
            .unwrap_or(self.sync_interval);
        if self.corridor.is_animating(now) {
            next.min(self.frame_interval)
        } else {
            next
        }
    }

    pub fn frame(&self) -> Vec<String> {
        render::frame(&render::FrameInput {
            corridor: &self.corridor,
            thresholds: self.store.thresholds(),
            alerts: &self.alerts,
            nav: &self.nav,
            status: self.status.as_deref(),
            now: self.clock.now(),
        })
    }

    /// One line describing the current reading, for `--plain` output.
    pub fn summary_line(&self) -> String {
        let time = Local::now().format("%H:%M:%S");
        match (self.corridor.phase(), self.corridor.last_ppm()) {
            (Phase::Paused, _) => format!("{time}  paused"),
            (Phase::Running, None) => format!("{time}  {}", display::PLACEHOLDER),
            (Phase::Running, Some(ppm)) => {
                let quality = self.store.thresholds().classify(ppm);
                format!("{time}  {ppm} ppm  {quality}  {}", self.corridor.arrow().glyph())
            }
        }
    }

    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.bell_pending)
    }

    pub fn corridor(&self) -> &LiveCorridor {
        &self.corridor
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn scheduler(&self) -> &Scheduler<LiveTimer> {
        &self.scheduler
    }

    pub fn alerts(&self) -> &AlertLog {
        &self.alerts
    }

    pub fn nav(&self) -> &ChartSeries {
        &self.nav
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub struct LiveOptions {
    /// Stop after this long; run until `quit` when `None`.
    pub duration: Option<Duration>,
    /// One line per change instead of a redrawn full-screen frame.
    pub plain: bool,
    pub export_on_exit: Option<PathBuf>,
}

/// `co2dash live`.
pub fn run(config: &DashConfig, opts: LiveOptions) -> Result<()> {
    let client = ApiClient::from_config(&config.backend);
    let prefs = Preferences::load();
    let clock = SystemClock;
    let started = clock.now();

    if !opts.plain {
        events::set_stderr_echo(false);
    }

    let (tx, rx) = mpsc::channel::<Inbound>();
    if config.live.transport != TransportMode::Poll {
        push::spawn_listener(client.push_url(), client.timeout(), tx.clone());
    }
    input::spawn_stdin_lines(tx.clone());

    let mut session = LiveSession::new(client, clock, config, &prefs);
    session.start();

    let deadline = opts.duration.map(|d| started + d);
    let mut stdout = std::io::stdout();
    loop {
        session.process_due();

        if session.take_bell() {
            let _ = write!(stdout, "\x07");
        }
        if opts.plain {
            if session.take_changed() {
                let _ = writeln!(stdout, "{}", session.summary_line());
            }
        } else {
            session.take_changed();
            let _ = writeln!(
                stdout,
                "{}{}",
                display::clear_screen(),
                session.frame().join("\n")
            );
        }
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
    if let Some(path) = opts.export_on_exit {
        session.export_chart(&path)?;
        println!("Chart exported to {}", path.display());
    }
    drop(tx);
    Ok(())
}
