//! CareVault - Local-first Encrypted Health Session Store
//!
//! Command-line access to the vault: key setup, session management, medicine
//! history, health insights and reports.

use anyhow::{Context, Result};
use carevault::{
    config::CareVaultConfig,
    crypto::EncryptionKey,
    insights::HealthSnapshot,
    storage::CapacityStatus,
    CareVault,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "carevault")]
#[command(version)]
#[command(about = "Local-first encrypted health session store")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CAREVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new encryption key file
    Init,

    /// Manage saved sessions
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },

    /// Manage medicine lookup history
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Health insights
    Insights {
        #[command(subcommand)]
        action: InsightAction,
    },

    /// Show durable storage usage
    Capacity,

    /// Write a Markdown health report
    Export {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// List sessions, pinned first
    List,
    /// Print one session
    Show { id: String },
    /// Rename a session
    Rename { id: String, topic: String },
    /// Toggle the pinned flag
    Pin { id: String },
    /// Rate a session from 1 to 5
    Rate { id: String, rating: u8 },
    /// Delete a session
    Delete { id: String },
    /// Delete every session
    Clear,
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List lookups, most recent first
    List,
    /// Forget one medicine
    Remove { medicine: String },
    /// Forget every lookup
    Clear,
}

#[derive(Subcommand)]
enum InsightAction {
    /// Recompute the health snapshot from all sessions
    Refresh,
    /// Show the cached health snapshot
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("carevault={}", log_level).into());
    let (json_layer, text_layer) = if cli.log_json {
        (
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();

    // Load configuration
    let config = match &cli.config {
        Some(path) => CareVaultConfig::from_file(path)?,
        None => CareVaultConfig::default(),
    };

    match cli.command {
        Commands::Init => run_init(&config)?,
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
        command => {
            let vault = CareVault::open(config).context("Failed to open vault")?;
            run_command(&vault, command).await?;
            vault.flush().await;
        }
    }

    Ok(())
}

fn run_init(config: &CareVaultConfig) -> Result<()> {
    let key_file = &config.storage.key_file;
    EncryptionKey::generate()
        .write_new(key_file)
        .with_context(|| format!("Failed to create key file {}", key_file.display()))?;
    std::fs::create_dir_all(&config.storage.data_dir)?;

    println!("Encryption key written to {}", key_file.display());
    println!("Keep this file safe: without it the vault cannot be read.");
    Ok(())
}

async fn run_command(vault: &CareVault, command: Commands) -> Result<()> {
    match command {
        Commands::Sessions { action } => run_sessions(vault, action).await,
        Commands::History { action } => run_history(vault, action).await,
        Commands::Insights { action } => run_insights(vault, action).await,
        Commands::Capacity => show_capacity(vault),
        Commands::Export { out } => {
            let report = vault.export_report().await?;
            match out {
                Some(path) => {
                    std::fs::write(&path, report)?;
                    println!("Report written to {}", path.display());
                }
                None => print!("{}", report),
            }
            Ok(())
        }
        Commands::Init | Commands::Config { .. } => Ok(()),
    }
}

async fn run_sessions(vault: &CareVault, action: SessionAction) -> Result<()> {
    let sessions = vault.sessions();
    match action {
        SessionAction::List => {
            let chats = sessions.sorted_for_display().await?;
            if chats.is_empty() {
                println!("No saved sessions.");
            }
            for chat in chats {
                let pin = if chat.pinned { "*" } else { " " };
                let rating = chat
                    .rating
                    .map(|r| format!(" [{}/5]", r))
                    .unwrap_or_default();
                println!(
                    "{} {}  {}  {} ({} messages){}",
                    pin,
                    chat.id,
                    chat.last_activity().format("%Y-%m-%d %H:%M"),
                    chat.topic,
                    chat.messages.len(),
                    rating
                );
            }
        }
        SessionAction::Show { id } => {
            let chat = sessions
                .get_chat(&id)
                .await?
                .with_context(|| format!("No session with id {}", id))?;
            println!("{}", chat.topic);
            println!();
            for message in &chat.messages {
                let speaker = if message.is_user { "You" } else { "Assistant" };
                println!(
                    "[{}] {}: {}",
                    message.timestamp.format("%Y-%m-%d %H:%M"),
                    speaker,
                    message.content
                );
            }
        }
        SessionAction::Rename { id, topic } => {
            report(sessions.rename_chat(&id, &topic).await?, "Renamed", &id);
        }
        SessionAction::Pin { id } => match sessions.toggle_pin(&id).await? {
            Some(true) => println!("Pinned {}", id),
            Some(false) => println!("Unpinned {}", id),
            None => println!("No session with id {}", id),
        },
        SessionAction::Rate { id, rating } => {
            report(sessions.rate_chat(&id, rating).await?, "Rated", &id);
        }
        SessionAction::Delete { id } => {
            report(sessions.delete_chat(&id).await?, "Deleted", &id);
        }
        SessionAction::Clear => {
            sessions.clear_all().await?;
            println!("All sessions deleted");
        }
    }
    Ok(())
}

fn report(found: bool, verb: &str, id: &str) {
    if found {
        println!("{} {}", verb, id);
    } else {
        println!("No session with id {}", id);
    }
}

async fn run_history(vault: &CareVault, action: HistoryAction) -> Result<()> {
    let history = vault.history();
    match action {
        HistoryAction::List => {
            let items = history.list().await?;
            if items.is_empty() {
                println!("No medicine lookups.");
            }
            for item in items {
                println!("{}  {}", item.timestamp.format("%Y-%m-%d %H:%M"), item.medicine);
            }
        }
        HistoryAction::Remove { medicine } => {
            if history.remove(&medicine).await? {
                println!("Removed {}", medicine);
            } else {
                println!("{} is not in the history", medicine);
            }
        }
        HistoryAction::Clear => {
            history.clear().await?;
            println!("Medicine history cleared");
        }
    }
    Ok(())
}

async fn run_insights(vault: &CareVault, action: InsightAction) -> Result<()> {
    let snapshot = match action {
        InsightAction::Refresh => vault.refresh_insights().await?,
        InsightAction::Show => vault.insights().cached_snapshot()?,
    };
    match snapshot {
        Some(snapshot) => print_snapshot(&snapshot),
        None => println!("No health snapshot available. Run `carevault insights refresh`."),
    }
    Ok(())
}

fn print_snapshot(snapshot: &HealthSnapshot) {
    println!(
        "Health score: {}/100 ({}, {})",
        snapshot.health_score,
        snapshot.source,
        snapshot.generated_at.format("%Y-%m-%d %H:%M")
    );
    for symptom in &snapshot.symptoms {
        println!(
            "  symptom     {} x{} (avg severity {:.1})",
            symptom.name,
            symptom.occurrences(),
            symptom.average_severity()
        );
    }
    for medication in &snapshot.medications {
        println!(
            "  medication  {} ({}, since {})",
            medication.name,
            medication.frequency,
            medication.start_date.format("%Y-%m-%d")
        );
    }
    for insight in &snapshot.insights {
        println!(
            "  insight     {} -> {} ({:.0}%)",
            insight.pattern,
            insight.recommendation,
            insight.confidence * 100.0
        );
    }
}

fn show_capacity(vault: &CareVault) -> Result<()> {
    let report = vault.capacity_report()?;
    println!(
        "{} / {} bytes ({:.1}%) in {} entries: {}",
        report.used_bytes, report.ceiling_bytes, report.percentage, report.entries, report.status
    );
    if report.status == CapacityStatus::Critical {
        println!("Consider exporting and clearing old sessions.");
    }
    Ok(())
}

fn show_config(config: Option<&CareVaultConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
