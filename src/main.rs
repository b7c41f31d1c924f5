// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//
//! trvoyage CLI - transformer voyage schedule views

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use trvoyage::commands::{self, evidence::AttachArgs, Output};
use trvoyage::config::{default_config_file, AppConfig};
use trvoyage::modes::ViewMode;
use trvoyage::types::{ActivityStatus, EvidenceType, Severity};

#[derive(Parser)]
#[command(name = "trvoyage")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file path
    #[arg(short, long, env = "TRVOYAGE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Data directory override
    #[arg(long, env = "TRVOYAGE_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Schedule document to use instead of the candidate list
    #[arg(long, global = true)]
    ssot: Option<PathBuf>,

    /// View mode (live, history, approval, compare)
    #[arg(long, global = true)]
    mode: Option<ViewMode>,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR", global = true)]
    no_color: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule view
    Schedule {
        /// Action: list, show, deps, order, summary, dot
        #[arg(default_value = "list")]
        action: String,

        /// Activity ID (show, deps)
        id: Option<String>,
    },

    /// List schedule conflicts
    Conflicts {
        /// Minimum severity (info, warning, error)
        #[arg(long)]
        severity: Option<Severity>,
    },

    /// Check the evidence gate for a transition
    Gate {
        /// Activity ID
        id: String,

        /// Target status
        #[arg(long)]
        to: ActivityStatus,
    },

    /// Change an activity's status
    Transition {
        /// Activity ID
        id: String,

        /// Target status
        #[arg(long)]
        to: ActivityStatus,

        /// Note recorded with the event
        #[arg(long)]
        note: Option<String>,
    },

    /// Attach or list evidence
    Evidence {
        /// Action: attach, list
        action: String,

        /// Activity ID
        id: Option<String>,

        /// Evidence type (photo, video, document, signature, sensor_log, ptw, certificate)
        #[arg(long = "type")]
        evidence_type: Option<EvidenceType>,

        /// Artifact location
        #[arg(long)]
        uri: Option<String>,

        /// Trip the evidence belongs to
        #[arg(long)]
        trip: Option<String>,

        /// Free-text note
        #[arg(long)]
        note: Option<String>,
    },

    /// Show or annotate the audit trail
    History {
        /// Action: list, note
        #[arg(default_value = "list")]
        action: String,

        /// Note text (note)
        text: Option<String>,

        /// Filter by entity ID
        #[arg(long)]
        entity: Option<String>,
    },

    /// Preview or apply a reflow
    Reflow {
        /// Action: preview, apply
        #[arg(default_value = "preview")]
        action: String,

        /// Why the reflow is applied
        #[arg(long)]
        reason: Option<String>,

        /// Apply despite error conflicts
        #[arg(long)]
        force: bool,
    },

    /// Generate a trip report
    Report {
        /// Trip ID
        trip: String,

        /// Output format (markdown, json)
        #[arg(short, long, default_value = "markdown")]
        format: String,

        /// Closeout record (JSON)
        #[arg(long)]
        closeout: Option<PathBuf>,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the schedule document as the read endpoint serves it
    Ssot,

    /// Go/No-Go, weather and tide summary
    Brief {
        /// Only this voyage's tide windows
        #[arg(long)]
        voyage: Option<String>,
    },

    /// Get or set configuration
    Config {
        /// Configuration key
        key: String,

        /// Value to set (omit to get)
        value: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: clap_complete::Shell,
    },
}

fn init_logging(cli: &Cli, configured: &str) {
    let filter = if std::env::var_os("RUST_LOG").is_some() {
        EnvFilter::from_default_env()
    } else {
        let level = match cli.verbose {
            0 if cli.quiet => "error",
            0 => configured,
            1 => "debug",
            _ => "trace",
        };
        EnvFilter::new(level)
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_file = cli.config.clone().or_else(default_config_file);
    let config = AppConfig::load(config_file.as_deref())?.with_overrides(
        cli.data_dir.clone(),
        cli.ssot.clone(),
        cli.mode,
    );

    init_logging(&cli, &config.log_level);
    tracing::debug!("Mode {}, data dir {}", config.default_mode, config.data_dir.display());

    let out = Output {
        json: cli.json,
        color: !cli.no_color && std::io::stdout().is_terminal(),
    };

    match cli.command {
        Commands::Schedule { action, id } => commands::schedule::run(config, out, &action, id),
        Commands::Conflicts { severity } => commands::conflicts::run(config, out, severity),
        Commands::Gate { id, to } => commands::gate::run(config, out, &id, to),
        Commands::Transition { id, to, note } => commands::transition::run(config, out, &id, to, note),
        Commands::Evidence {
            action,
            id,
            evidence_type,
            uri,
            trip,
            note,
        } => commands::evidence::run(
            config,
            out,
            &action,
            id,
            AttachArgs {
                evidence_type,
                uri,
                trip,
                note,
            },
        ),
        Commands::History { action, text, entity } => commands::history::run(config, out, &action, entity, text),
        Commands::Reflow { action, reason, force } => commands::reflow::run(config, out, &action, reason, force),
        Commands::Report {
            trip,
            format,
            closeout,
            output,
        } => commands::report::run(config, out, &trip, &format, closeout, output),
        Commands::Ssot => {
            let code = commands::ssot::run(&config)?;
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Brief { voyage } => commands::brief::run(&config, out, voyage),
        Commands::Config { key, value } => commands::config::run(&config, config_file, &key, value),
        Commands::Completions { shell } => commands::completions::run(shell, &mut Cli::command()),
    }
}
