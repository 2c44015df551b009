// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]

use clap::{Parser, Subcommand};
use hc_cli::{EXIT_RUNTIME_ERROR, commands};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "health", version, about = "Integration-aware code-health cascade engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root.
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Enable debug logging.
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan the project for weak artifacts.
    Scan {
        /// Extra ignore glob(s). Can be repeated.
        #[arg(long = "ignore")]
        ignore: Vec<String>,

        /// Print JSON instead of pretty output.
        #[arg(long)]
        json: bool,
    },

    /// Preview the cascade for one artifact.
    Preview {
        /// The weak artifact to preview.
        artifact_id: String,

        /// Also list the frozen contract hashes.
        #[arg(long)]
        include_contracts: bool,

        /// Print JSON instead of pretty output.
        #[arg(long)]
        json: bool,
    },

    /// Execute a cascade fix for one artifact.
    Fix {
        /// The weak artifact to fix.
        artifact_id: String,

        /// Approve waves without prompting.
        #[arg(long, short = 'y')]
        yes: bool,

        /// Compute and print the plan without touching files.
        #[arg(long)]
        dry_run: bool,

        /// Pause after every wave even with --yes.
        #[arg(long)]
        wave_by_wave: bool,

        /// Override the confidence threshold.
        #[arg(long)]
        confidence_threshold: Option<f64>,

        /// Which registered regenerator to use.
        #[arg(long, default_value = "mock")]
        regenerator: String,

        /// Print JSON instead of pretty output.
        #[arg(long)]
        json: bool,
    },

    /// Extract the public-interface contract of one artifact.
    ExtractContract {
        /// The artifact to extract.
        artifact_id: String,

        /// Print JSON instead of pretty output.
        #[arg(long)]
        json: bool,
    },

    /// Audit log operations.
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },

    /// Integration wiring operations.
    Integrations {
        #[command(subcommand)]
        command: IntegrationCommands,
    },
}

#[derive(Subcommand, Debug)]
enum AuditCommands {
    /// Re-walk the audit chain, checking hashes and signatures.
    Verify {
        /// Print JSON instead of pretty output.
        #[arg(long)]
        json: bool,
    },
    /// Export audit entries as JSONL.
    Export {
        /// Zero-based start offset (inclusive).
        #[arg(long)]
        from: Option<usize>,
        /// Zero-based end offset (exclusive).
        #[arg(long)]
        to: Option<usize>,
    },
}

#[derive(Subcommand, Debug)]
enum IntegrationCommands {
    /// Verify declared integrations against source.
    Verify {
        /// Restrict to one artifact (whole graph when omitted).
        artifact_id: Option<String>,

        /// Print JSON instead of pretty output.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Scan { ignore, json } => commands::scan(cli.root, ignore, json).await,
        Commands::Preview {
            artifact_id,
            include_contracts,
            json,
        } => commands::preview(cli.root, artifact_id, include_contracts, json).await,
        Commands::Fix {
            artifact_id,
            yes,
            dry_run,
            wave_by_wave,
            confidence_threshold,
            regenerator,
            json,
        } => {
            commands::fix(
                cli.root,
                artifact_id,
                yes,
                dry_run,
                wave_by_wave,
                confidence_threshold,
                regenerator,
                json,
            )
            .await
        }
        Commands::ExtractContract { artifact_id, json } => {
            commands::extract_contract(cli.root, artifact_id, json)
        }
        Commands::Audit { command } => match command {
            AuditCommands::Verify { json } => commands::audit_verify(cli.root, json),
            AuditCommands::Export { from, to } => commands::audit_export(cli.root, from, to),
        },
        Commands::Integrations { command } => match command {
            IntegrationCommands::Verify { artifact_id, json } => {
                commands::integrations_verify(cli.root, artifact_id, json)
            }
        },
    };

    let code = match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            EXIT_RUNTIME_ERROR
        }
    };
    std::process::exit(code);
}
