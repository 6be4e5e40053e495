// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2026 Veriscope contributors

//! Veriscope CLI: upload media files to a forensic analysis server
//! and keep a local history of the reports.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use veriscope::client::{normalize_endpoint, AnalysisClient};
use veriscope::config::{FontSize, SettingsPatch, SettingsStore};
use veriscope::picker::PathPicker;
use veriscope::pipeline::{AnalysisPipeline, SubmitOutcome};
use veriscope::reports::{MediaKind, ReportStore};
use veriscope::store::KvStore;
use veriscope::{Result, VeriscopeError};

/// Veriscope CLI - forensic media analysis client
#[derive(Parser, Debug)]
#[command(name = "veriscope")]
#[command(version = "0.4.0")]
#[command(about = "Upload media files to a forensic analysis server", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the local store database
    #[arg(long, default_value = "veriscope.db", global = true)]
    store: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Upload a file for analysis and record the report
    Analyze {
        /// File to analyze
        path: PathBuf,

        /// Media kind (inferred from the extension when omitted)
        #[arg(short, long, value_parser = ["image", "audio"])]
        kind: Option<String>,

        /// Upload deadline in seconds
        #[arg(long, default_value = "120")]
        timeout: u64,
    },

    /// Report history operations
    Reports {
        #[command(subcommand)]
        action: ReportCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Show analysis server status
    Status,
}

#[derive(Subcommand, Debug)]
enum ReportCommands {
    /// List recorded reports, newest first
    List {
        /// Maximum number to show
        #[arg(short, long, default_value = "20")]
        count: usize,
    },

    /// Delete every report with the given timestamp
    Delete {
        /// Report timestamp (milliseconds since epoch)
        timestamp: i64,
    },

    /// Remove all reports
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current settings
    Show,

    /// Set the analysis server endpoint
    SetServer {
        /// Host, IP, or full URL
        url: String,
    },

    /// Set the display font size
    SetFontSize {
        #[arg(value_parser = ["small", "medium", "large"])]
        size: String,
    },

    /// Turn dark mode on or off
    SetDarkMode {
        #[arg(value_parser = ["on", "off"])]
        value: String,
    },

    /// Restore default settings
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    if !cli.quiet {
        info!("Veriscope v0.4.0");
    }

    let store = KvStore::open(&cli.store);
    let settings = Arc::new(SettingsStore::load(store.clone()));
    let reports = ReportStore::new(store);

    match cli.command {
        Commands::Analyze {
            path,
            kind,
            timeout,
        } => run_analyze(settings, reports, path, kind, timeout).await,
        Commands::Reports { action } => run_report_command(reports, action),
        Commands::Config { action } => run_config_command(settings, action),
        Commands::Status => run_status(settings).await,
    }
}

/// Upload one file through the pipeline and print the outcome
async fn run_analyze(
    settings: Arc<SettingsStore>,
    reports: ReportStore,
    path: PathBuf,
    kind: Option<String>,
    timeout: u64,
) -> Result<()> {
    let kind = match kind.as_deref() {
        Some("image") => MediaKind::Image,
        Some("audio") => MediaKind::Audio,
        _ => MediaKind::from_path(&path).ok_or_else(|| {
            VeriscopeError::UnsupportedFileType(format!(
                "{} (pass --kind image|audio)",
                path.display()
            ))
        })?,
    };

    let client = AnalysisClient::with_timeout(Duration::from_secs(timeout));
    let mut pipeline = AnalysisPipeline::new(kind, client, settings, reports);

    let picker = PathPicker::new(path);
    if !pipeline.select(&picker).await? {
        return Err(VeriscopeError::Unknown("no file selected".to_string()));
    }

    match pipeline.submit().await {
        SubmitOutcome::Completed {
            output,
            report_saved,
        } => {
            println!("{}", output);
            if !report_saved {
                eprintln!("Warning: analysis succeeded but the report was not saved");
            }
            Ok(())
        }
        SubmitOutcome::NotConfigured => {
            eprintln!("Server not configured.");
            eprintln!("Try: veriscope config set-server <host-or-url>");
            Err(VeriscopeError::NotConfigured)
        }
        SubmitOutcome::Failed(e) => Err(e),
        SubmitOutcome::Busy | SubmitOutcome::NoFile => Ok(()),
    }
}

/// Run report history commands
fn run_report_command(reports: ReportStore, action: ReportCommands) -> Result<()> {
    match action {
        ReportCommands::List { count } => {
            let entries = reports.list()?;
            if entries.is_empty() {
                println!("No reports recorded");
                return Ok(());
            }
            println!("Reports ({} shown):", entries.len().min(count));
            for report in entries.iter().take(count) {
                let when = DateTime::<Utc>::from_timestamp_millis(report.timestamp)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| report.timestamp.to_string());
                let preview = report.result.output.lines().next().unwrap_or("");
                println!(
                    "  {} [{}] {} (id {})",
                    when, report.kind, preview, report.timestamp
                );
            }
        }
        ReportCommands::Delete { timestamp } => {
            let removed = reports.delete(timestamp)?;
            if removed == 0 {
                println!("No report with timestamp {}", timestamp);
            } else {
                println!("Deleted {} report(s)", removed);
            }
        }
        ReportCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing all reports");
                return Ok(());
            }
            reports.clear()?;
            println!("Reports cleared");
        }
    }

    Ok(())
}

/// Run config commands
fn run_config_command(settings: Arc<SettingsStore>, action: ConfigCommands) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let json = serde_json::to_string_pretty(&settings.get())?;
            println!("{}", json);
        }
        ConfigCommands::SetServer { url } => {
            let updated = settings.update(SettingsPatch {
                server_url: Some(url),
                ..Default::default()
            });
            if updated.server_url.trim().is_empty() {
                println!("Server endpoint cleared");
            } else {
                println!("Server endpoint: {}", normalize_endpoint(&updated.server_url)?);
            }
        }
        ConfigCommands::SetFontSize { size } => {
            let font_size = match size.as_str() {
                "small" => FontSize::Small,
                "large" => FontSize::Large,
                _ => FontSize::Medium,
            };
            settings.update(SettingsPatch {
                font_size: Some(font_size),
                ..Default::default()
            });
            println!("Font size: {} (scale {:.2})", size, font_size.scale());
        }
        ConfigCommands::SetDarkMode { value } => {
            settings.update(SettingsPatch {
                system_dark_mode: Some(value == "on"),
                ..Default::default()
            });
            println!("Dark mode: {}", value);
        }
        ConfigCommands::Reset => {
            settings.reset_to_defaults();
            println!("Settings restored to defaults");
        }
    }

    Ok(())
}

/// Run status check
async fn run_status(settings: Arc<SettingsStore>) -> Result<()> {
    let current = settings.get();

    println!("Veriscope v0.4.0 Status");
    println!("=======================");

    if current.server_url.trim().is_empty() {
        println!("Server: not configured");
        println!("\nTry: veriscope config set-server <host-or-url>");
        return Ok(());
    }

    let endpoint = normalize_endpoint(&current.server_url)?;
    println!("Server: {}", endpoint);

    let client = AnalysisClient::new();
    match client.health_check(&current.server_url).await {
        Ok(status) => println!("Health: {}", status),
        Err(e) => println!("Health: error - {}", e),
    }

    match client.server_info(&current.server_url).await {
        Ok(details) => println!("Info: {}", details),
        Err(_) => println!("Info: unavailable"),
    }

    println!("\nSettings:");
    println!(
        "  Font size: {:?} (scale {:.2})",
        current.font_size,
        current.font_size.scale()
    );
    println!(
        "  Dark mode: {}",
        if current.system_dark_mode { "on" } else { "off" }
    );

    Ok(())
}
