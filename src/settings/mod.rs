//! Settings panel: threshold sliders, speeds, toggles, debounced autosave.
//!
//! The panel keeps a local copy of the backend snapshot that is mutated
//! optimistically on every edit. A one-shot autosave timer is re-armed on
//! each edit, so a burst of edits produces a single `POST /api/settings`
//! once the quiet period has passed. Explicit `save` writes immediately.

pub mod sliders;

use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::api::types::{MAX_SPEED_SECS, SettingsSnapshot};
use crate::api::{ApiClient, Backend};
use crate::config::schema::DashConfig;
use crate::config::is_truthy;
use crate::display;
use crate::events;
use crate::runtime::{input, Clock, Scheduler, SystemClock};
use sliders::{Slider, Sliders, snap};

/// How long an error toast stays up.
const ERROR_TOAST: Duration = Duration::from_millis(3000);

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    To(u32),
    By(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCommand {
    Slider(Slider, Adjust),
    Speed(u32),
    OverviewSpeed(u32),
    Analysis(bool),
    Realistic(bool),
    Save,
    Show,
    Help,
    Quit,
}

impl EditorCommand {
    /// Whether the command edits the snapshot (and so re-arms autosave).
    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            Self::Slider(..)
                | Self::Speed(_)
                | Self::OverviewSpeed(_)
                | Self::Analysis(_)
                | Self::Realistic(_)
        )
    }
}

fn parse_toggle(value: &str) -> Result<bool> {
    match value {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => anyhow::bail!("expected on|off, got '{other}'"),
    }
}

fn parse_speed(key: &str, value: &str) -> Result<u32> {
    let secs: u32 = value
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds"))?;
    if !(1..=MAX_SPEED_SECS).contains(&secs) {
        anyhow::bail!("{key} must be between 1 and {MAX_SPEED_SECS} seconds");
    }
    Ok(secs)
}

/// Parse one editor line, e.g. `good 1300`, `warning +50`, `analysis off`.
pub fn parse_command(line: &str) -> Result<EditorCommand> {
    let mut parts = line.split_whitespace();
    let key = parts.next().unwrap_or_default();
    let value = parts.next();

    if let Some(slider) = Slider::parse(key) {
        let value = value.with_context(|| format!("usage: {} <ppm>|+<n>|-<n>", slider.name()))?;
        let adjust = if value.starts_with('+') || value.starts_with('-') {
            Adjust::By(value.parse().context("slider step must be a number")?)
        } else {
            Adjust::To(value.parse().context("slider value must be a number")?)
        };
        return Ok(EditorCommand::Slider(slider, adjust));
    }

    let need = |what: &str| value.with_context(|| format!("usage: {key} <{what}>"));
    match key {
        "speed" | "update-speed" | "update_speed" => {
            Ok(EditorCommand::Speed(parse_speed("speed", need("seconds")?)?))
        }
        "overview-speed" | "overview_update_speed" => Ok(EditorCommand::OverviewSpeed(
            parse_speed("overview-speed", need("seconds")?)?,
        )),
        "analysis" | "analysis_running" => {
            Ok(EditorCommand::Analysis(parse_toggle(need("on|off")?)?))
        }
        "realistic" | "realistic_mode" => {
            Ok(EditorCommand::Realistic(parse_toggle(need("on|off")?)?))
        }
        "save" | "s" => Ok(EditorCommand::Save),
        "show" | "ls" => Ok(EditorCommand::Show),
        "help" | "?" => Ok(EditorCommand::Help),
        "quit" | "q" | "exit" => Ok(EditorCommand::Quit),
        other => anyhow::bail!("unknown setting '{other}' (try 'help')"),
    }
}

// ---------------------------------------------------------------------------
// Panel state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub ok: bool,
}

/// Local, optimistically edited copy of the settings.
#[derive(Debug, Clone)]
pub struct SettingsPanel {
    snapshot: SettingsSnapshot,
    sliders: Sliders,
    /// Edited since the last successful save.
    dirty: bool,
}

impl SettingsPanel {
    pub fn new(snapshot: SettingsSnapshot) -> Self {
        let sliders = Sliders::from_snapshot(&snapshot);
        let mut panel = Self {
            snapshot,
            sliders,
            dirty: false,
        };
        panel.sliders.apply_to(&mut panel.snapshot);
        panel
    }

    /// Fetch the snapshot; on failure fall back to defaults and say so.
    pub fn load<B: Backend + ?Sized>(backend: &B) -> (Self, Option<String>) {
        match backend.fetch_settings() {
            Ok(snapshot) => (Self::new(snapshot), None),
            Err(e) => {
                events::warn("settings", format!("load settings failed: {e:#}"));
                (
                    Self::new(SettingsSnapshot::default()),
                    Some("could not load settings; showing defaults".to_string()),
                )
            }
        }
    }

    /// Apply an edit command. Non-edit commands are ignored.
    pub fn apply(&mut self, command: EditorCommand) {
        match command {
            EditorCommand::Slider(slider, Adjust::To(value)) => {
                self.sliders.set(slider, snap(value));
            }
            EditorCommand::Slider(slider, Adjust::By(delta)) => {
                self.sliders.nudge(slider, delta);
                self.sliders.snap_slider(slider);
            }
            EditorCommand::Speed(secs) => self.snapshot.update_speed_secs = secs,
            EditorCommand::OverviewSpeed(secs) => self.snapshot.overview_update_speed_secs = secs,
            EditorCommand::Analysis(on) => self.snapshot.analysis_running = on,
            EditorCommand::Realistic(on) => self.snapshot.realistic_mode = on,
            EditorCommand::Save | EditorCommand::Show | EditorCommand::Help | EditorCommand::Quit => {
                return;
            }
        }
        self.sliders.apply_to(&mut self.snapshot);
        self.dirty = true;
    }

    pub fn save<B: Backend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        backend.save_settings(&self.snapshot)?;
        self.dirty = false;
        events::info(
            "settings",
            format!(
                "saved thresholds {}/{}/{}",
                self.sliders.good, self.sliders.warning, self.sliders.critical
            ),
        );
        Ok(())
    }

    pub fn snapshot(&self) -> &SettingsSnapshot {
        &self.snapshot
    }

    pub fn sliders(&self) -> Sliders {
        self.sliders
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

fn seconds(n: u32) -> String {
    if n == 1 {
        "1 second".to_string()
    } else {
        format!("{n} seconds")
    }
}

fn on_off(on: bool) -> colored::ColoredString {
    if on { "on".green() } else { "off".red() }
}

pub fn render_panel(panel: &SettingsPanel) -> Vec<String> {
    let s = panel.sliders();
    let settings = panel.snapshot();
    let mut lines = vec!["CO₂ Settings".bold().cyan().to_string()];
    lines.push(format!("  {} {:>5} ppm", "Good:    ".bold(), s.good));
    lines.push(format!("  {} {:>5} ppm", "Warning: ".bold(), s.warning));
    lines.push(format!("  {} {:>5} ppm", "Critical:".bold(), s.critical));
    lines.push(format!("  {}", display::zone_bar(s.zone_widths(), 40)));
    lines.push(format!(
        "  {} {}   {} {}",
        "Live update:".bold(),
        seconds(settings.update_speed_secs),
        "Overview update:".bold(),
        seconds(settings.overview_update_speed_secs)
    ));
    lines.push(format!(
        "  {} {}   {} {}",
        "Analysis:".bold(),
        on_off(settings.analysis_running),
        "Realistic mode:".bold(),
        on_off(settings.realistic_mode)
    ));
    if panel.is_dirty() {
        lines.push(format!("  {}", "unsaved changes".dimmed()));
    }
    lines
}

pub const HELP: &str = "\
  good|warning|critical <ppm>   set a threshold (snapped to 50)
  good|warning|critical +N|-N   nudge a threshold
  speed <s>                     live update period
  overview-speed <s>            overview refresh period
  analysis on|off               pause or resume analysis
  realistic on|off              realistic simulation mode
  save                          save now
  show                          redraw the panel
  quit                          save pending changes and leave";

// ---------------------------------------------------------------------------
// Interactive editor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorTimer {
    Autosave,
    ToastExpiry,
}

pub struct SettingsEditor<B: Backend, C: Clock> {
    backend: B,
    clock: C,
    panel: SettingsPanel,
    scheduler: Scheduler<EditorTimer>,
    debounce: Duration,
    toast_duration: Duration,
    toast: Option<Toast>,
    saves: u32,
}

impl<B: Backend, C: Clock> SettingsEditor<B, C> {
    pub fn new(backend: B, clock: C, config: &DashConfig) -> Self {
        let (panel, problem) = SettingsPanel::load(&backend);
        let mut editor = Self {
            backend,
            clock,
            panel,
            scheduler: Scheduler::default(),
            debounce: Duration::from_millis(config.settings.autosave_debounce_ms),
            toast_duration: Duration::from_millis(config.settings.toast_ms),
            toast: None,
            saves: 0,
        };
        if let Some(problem) = problem {
            editor.show_toast(problem, false);
        }
        editor
    }

    fn show_toast(&mut self, message: impl Into<String>, ok: bool) {
        let duration = if ok { self.toast_duration } else { ERROR_TOAST };
        self.toast = Some(Toast {
            message: message.into(),
            ok,
        });
        let now = self.clock.now();
        self.scheduler.once(EditorTimer::ToastExpiry, duration, now);
    }

    /// Apply one typed line. Returns `false` when the editor should close.
    pub fn handle_line(&mut self, line: &str) -> bool {
        let command = match parse_command(line) {
            Ok(c) => c,
            Err(e) => {
                self.show_toast(format!("{e:#}"), false);
                return true;
            }
        };

        if command.is_edit() {
            self.panel.apply(command);
            let now = self.clock.now();
            self.scheduler.once(EditorTimer::Autosave, self.debounce, now);
            return true;
        }
        match command {
            EditorCommand::Save => {
                self.scheduler.cancel(EditorTimer::Autosave);
                match self.save() {
                    Ok(()) => self.show_toast("✓ Settings saved", true),
                    Err(e) => self.show_toast(format!("✗ Save failed: {e:#}"), false),
                }
            }
            EditorCommand::Quit => {
                self.flush();
                return false;
            }
            _ => {}
        }
        true
    }

    fn save(&mut self) -> Result<()> {
        self.panel.save(&self.backend)?;
        self.saves += 1;
        Ok(())
    }

    pub fn process_due(&mut self) {
        let now = self.clock.now();
        while let Some(key) = self.scheduler.pop_due(now) {
            match key {
                EditorTimer::Autosave => {
                    if let Err(e) = self.save() {
                        events::warn("settings", format!("autosave failed: {e:#}"));
                    }
                }
                EditorTimer::ToastExpiry => self.toast = None,
            }
        }
    }

    /// Save now if an autosave is pending.
    pub fn flush(&mut self) {
        if self.scheduler.cancel(EditorTimer::Autosave)
            && let Err(e) = self.save()
        {
            events::warn("settings", format!("final save failed: {e:#}"));
        }
    }

    pub fn wait_timeout(&self) -> Option<Duration> {
        self.scheduler.time_until_next(self.clock.now())
    }

    pub fn panel(&self) -> &SettingsPanel {
        &self.panel
    }

    pub fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    pub fn save_count(&self) -> u32 {
        self.saves
    }

    pub fn autosave_pending(&self) -> bool {
        self.scheduler.is_scheduled(EditorTimer::Autosave)
    }

    pub fn frame(&self) -> Vec<String> {
        let mut lines = render_panel(&self.panel);
        if let Some(toast) = &self.toast {
            let text = if toast.ok {
                toast.message.green()
            } else {
                toast.message.red()
            };
            lines.push(format!("  {text}"));
        }
        lines
    }
}

/// `co2dash settings edit`.
pub fn run_editor(config: &DashConfig) -> Result<()> {
    let client = ApiClient::from_config(&config.backend);
    let mut editor = SettingsEditor::new(client, SystemClock, config);
    let (tx, rx) = mpsc::channel::<String>();
    input::spawn_stdin_lines(tx);

    println!("{}", editor.frame().join("\n"));
    println!("{}", "Type 'help' for commands.".dimmed());
    let mut stdout = std::io::stdout();

    loop {
        let _ = write!(stdout, "> ");
        let _ = stdout.flush();

        let received = match editor.wait_timeout() {
            Some(wait) => rx.recv_timeout(wait),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(line) => {
                let show = matches!(parse_command(&line), Ok(EditorCommand::Help));
                if !editor.handle_line(&line) {
                    break;
                }
                if show {
                    println!("{HELP}");
                } else {
                    println!("{}", editor.frame().join("\n"));
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                let had_toast = editor.toast().is_some();
                let pending = editor.autosave_pending();
                editor.process_due();
                if pending && !editor.autosave_pending() {
                    println!();
                    println!("  {}", "autosaved".dimmed());
                } else if had_toast && editor.toast().is_none() {
                    println!();
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                editor.flush();
                break;
            }
        }
    }
    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// One-shot commands
// ---------------------------------------------------------------------------

/// `co2dash settings show`.
pub fn show<B: Backend + ?Sized>(backend: &B) -> Result<()> {
    let snapshot = backend.fetch_settings().context("could not load settings")?;
    let panel = SettingsPanel::new(snapshot);
    println!("{}", render_panel(&panel).join("\n"));
    Ok(())
}

/// `co2dash settings set <key> <value>`: one edit, saved immediately.
pub fn set<B: Backend + ?Sized>(backend: &B, key: &str, value: &str) -> Result<SettingsPanel> {
    let command = parse_command(&format!("{key} {value}"))?;
    if !command.is_edit() {
        anyhow::bail!("'{key}' is not a setting");
    }
    let snapshot = backend.fetch_settings().context("could not load settings")?;
    let mut panel = SettingsPanel::new(snapshot);
    panel.apply(command);
    panel.save(backend).context("could not save settings")?;
    Ok(panel)
}

/// Ask for confirmation on stdin unless `assume_yes`.
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(is_truthy(answer.trim()) || answer.trim().eq_ignore_ascii_case("y"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_editor_lines() {
        assert_eq!(
            parse_command("good 1300").unwrap(),
            EditorCommand::Slider(Slider::Good, Adjust::To(1300))
        );
        assert_eq!(
            parse_command("warning +50").unwrap(),
            EditorCommand::Slider(Slider::Warning, Adjust::By(50))
        );
        assert_eq!(
            parse_command("critical -100").unwrap(),
            EditorCommand::Slider(Slider::Critical, Adjust::By(-100))
        );
        assert_eq!(parse_command("speed 2").unwrap(), EditorCommand::Speed(2));
        assert_eq!(
            parse_command("analysis off").unwrap(),
            EditorCommand::Analysis(false)
        );
        assert_eq!(parse_command("q").unwrap(), EditorCommand::Quit);
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(parse_command("critical").is_err());
        assert!(parse_command("speed 0").is_err());
        assert!(parse_command("speed fast").is_err());
        assert!(parse_command("realistic maybe").is_err());
        assert!(parse_command("volume 3").is_err());
    }

    #[test]
    fn panel_snaps_and_reconciles() {
        let mut panel = SettingsPanel::new(SettingsSnapshot::default());
        panel.apply(EditorCommand::Slider(Slider::Good, Adjust::To(1312)));
        let s = panel.sliders();
        assert_eq!((s.good, s.warning, s.critical), (1300, 1350, 1400));
        assert_eq!(panel.snapshot().thresholds.bad(), 1400);
        assert!(panel.is_dirty());
    }

    #[test]
    fn non_edit_commands_leave_panel_clean() {
        let mut panel = SettingsPanel::new(SettingsSnapshot::default());
        panel.apply(EditorCommand::Show);
        assert!(!panel.is_dirty());
    }
}
