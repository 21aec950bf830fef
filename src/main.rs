use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use co2dash::cli::{self, AnalyticsView, AudioAction, HistoryRange, OutputFormat};
use co2dash::{config, events, live, overview, settings, web};

#[derive(Debug, Parser)]
#[command(name = "co2dash")]
#[command(about = "Terminal dashboard for a CO₂ air-quality monitor")]
struct App {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Live chart of incoming readings with trend, blink warning and alerts
    Live {
        /// Stop after N seconds (runs until `quit` otherwise)
        #[arg(long)]
        duration: Option<u64>,
        /// Print one line per update instead of redrawing the screen
        #[arg(long)]
        plain: bool,
        /// Write the chart as CSV when the session ends
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Air-health card, today's statistics and thermometer
    Overview {
        /// Render a single frame and exit
        #[arg(long)]
        once: bool,
        /// Stop after N seconds
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Show or edit the backend's thresholds and update speeds
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Print stored readings
    History {
        #[command(subcommand)]
        range: HistoryCommand,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table", global = true)]
        format: String,
    },
    /// Predictions, anomalies, insights and recommendations from the backend
    Analytics {
        #[command(subcommand)]
        view: AnalyticsCommand,
        /// Output format: table (default), json
        #[arg(long, default_value = "table", global = true)]
        format: String,
    },
    /// Delete readings older than N days on the backend
    Cleanup {
        #[arg(long)]
        days: u32,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Trigger, schedule or download exports
    Export {
        #[command(subcommand)]
        action: ExportAction,
    },
    /// Alert preferences
    Alerts {
        #[command(subcommand)]
        action: AlertsAction,
    },
    /// Check config, backend, push channel and preferences
    Health,
    /// Manage configuration (show, init, set, reset)
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show recent entries of the event log
    Log {
        /// Number of entries to show
        #[arg(long, default_value = "20")]
        tail: usize,
        /// Output format: table (default), json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
    /// Serve the read-only HTML dashboard
    Web {
        /// Listen address (overrides `web.addr`)
        #[arg(long)]
        addr: Option<String>,
        /// Do not open a browser
        #[arg(long)]
        no_open: bool,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    /// Print the current settings
    Show,
    /// Change one setting and save it (e.g. `set good 900`, `set analysis off`)
    Set { key: String, value: String },
    /// Restore the backend defaults
    Reset {
        #[arg(long, short)]
        yes: bool,
    },
    /// Interactive editor with debounced autosave
    Edit,
}

#[derive(Debug, Subcommand)]
enum HistoryCommand {
    /// All readings recorded today
    Today,
    /// The most recent N readings
    Latest {
        #[arg(default_value = "25")]
        n: usize,
    },
}

#[derive(Debug, Subcommand)]
enum AnalyticsCommand {
    Predictions {
        #[arg(long, default_value = "24")]
        hours: u32,
    },
    Anomalies,
    Insights,
    Recommendations,
}

#[derive(Debug, Subcommand)]
enum ExportAction {
    /// Run a one-off export on the backend (csv or json)
    Simulate {
        #[arg(long, default_value = "csv")]
        format: String,
        #[arg(long, default_value = "7")]
        days: u32,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Schedule a recurring export
    Schedule {
        #[arg(long, default_value = "csv")]
        format: String,
        #[arg(long, default_value = "daily")]
        frequency: String,
    },
    /// List scheduled exports
    Scheduled,
    /// Remove a scheduled export
    Unschedule { id: i64 },
    /// Save today's readings as CSV
    Today {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Download the daily PDF report
    Pdf {
        #[arg(long)]
        out: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum AlertsAction {
    /// Turn the terminal bell on threshold alerts on or off
    Audio {
        #[arg(value_parser = ["on", "off", "status"], default_value = "status")]
        state: String,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigAction {
    /// Show the effective (merged) configuration
    Show,
    /// Create a default config file at ~/.co2dash/config.toml
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Set a configuration value (e.g. `backend.base_url http://pi:5000`)
    Set {
        /// Dotted key path (e.g. live.transport)
        key: String,
        /// Value to set
        value: String,
    },
    /// Reset configuration to defaults
    Reset,
}

fn main() -> Result<()> {
    let app = App::parse();
    let mut cfg = config::load();
    events::set_enabled(cfg.logging.enabled);

    match app.command {
        Commands::Live {
            duration,
            plain,
            export,
        } => live::run(
            &cfg,
            live::LiveOptions {
                duration: duration.map(Duration::from_secs),
                plain,
                export_on_exit: export,
            },
        ),
        Commands::Overview { once, duration } => {
            overview::run(&cfg, once, duration.map(Duration::from_secs))
        }
        Commands::Settings { action } => match action {
            SettingsAction::Show => cli::run_settings_show(&cfg),
            SettingsAction::Set { key, value } => cli::run_settings_set(&cfg, &key, &value),
            SettingsAction::Reset { yes } => cli::run_settings_reset(&cfg, yes),
            SettingsAction::Edit => settings::run_editor(&cfg),
        },
        Commands::History { range, format } => {
            let range = match range {
                HistoryCommand::Today => HistoryRange::Today,
                HistoryCommand::Latest { n } => HistoryRange::Latest(n),
            };
            cli::run_history(&cfg, range, OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Analytics { view, format } => {
            let view = match view {
                AnalyticsCommand::Predictions { hours } => AnalyticsView::Predictions { hours },
                AnalyticsCommand::Anomalies => AnalyticsView::Anomalies,
                AnalyticsCommand::Insights => AnalyticsView::Insights,
                AnalyticsCommand::Recommendations => AnalyticsView::Recommendations,
            };
            cli::run_analytics(&cfg, view, OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Cleanup { days, yes } => cli::run_cleanup(&cfg, days, yes),
        Commands::Export { action } => match action {
            ExportAction::Simulate { format, days, out } => {
                cli::run_export_simulate(&cfg, &format, days, out.as_deref())
            }
            ExportAction::Schedule { format, frequency } => {
                cli::run_export_schedule(&cfg, &format, &frequency)
            }
            ExportAction::Scheduled => cli::run_export_scheduled(&cfg),
            ExportAction::Unschedule { id } => cli::run_export_unschedule(&cfg, id),
            ExportAction::Today { out } => cli::run_export_today(&cfg, out),
            ExportAction::Pdf { out } => cli::run_export_pdf(&cfg, &out),
        },
        Commands::Alerts { action } => match action {
            AlertsAction::Audio { state } => {
                let action = match state.as_str() {
                    "on" => AudioAction::On,
                    "off" => AudioAction::Off,
                    _ => AudioAction::Status,
                };
                cli::run_alerts_audio(action)
            }
        },
        Commands::Health => cli::run_health(),
        Commands::Config { action } => match action {
            ConfigAction::Show => cli::run_config_show(),
            ConfigAction::Init { force } => cli::run_config_init(force),
            ConfigAction::Set { key, value } => cli::run_config_set(&key, &value),
            ConfigAction::Reset => cli::run_config_reset(),
        },
        Commands::Log { tail, format } => {
            cli::run_log(tail, OutputFormat::from_str_opt(Some(&format)))
        }
        Commands::Web { addr, no_open } => {
            if let Some(addr) = addr {
                cfg.web.addr = addr;
            }
            web::serve(&cfg, !no_open)
        }
    }
}
