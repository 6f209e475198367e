use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Issue triage with persistent memory", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (built-in defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Triage a single issue through the full pipeline
    Triage {
        /// Issue number to triage
        #[arg(long)]
        issue: u64,

        /// JSON file holding the issue backlog
        #[arg(long, default_value = "issues.json")]
        source: PathBuf,

        /// Write labels and a summary comment back to the source
        #[arg(long)]
        apply: bool,

        /// Output the decision as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Retriage every open issue in the backlog
    Retriage {
        /// JSON file holding the issue backlog
        #[arg(long, default_value = "issues.json")]
        source: PathBuf,

        /// Output the batch report as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Classify issue text without touching memory
    Classify {
        /// Issue title
        title: String,

        /// Issue body
        #[arg(default_value = "")]
        body: String,
    },

    /// Inspect or exercise the issue memory store
    Memory {
        #[command(subcommand)]
        command: MemoryCommands,
    },
}

#[derive(Subcommand)]
enum MemoryCommands {
    /// Classify, embed, and store an issue directly
    Store {
        /// Issue number
        number: u64,

        /// Issue title
        title: String,

        /// Issue body
        #[arg(default_value = "")]
        body: String,
    },

    /// Search memory for issues similar to the given text
    Search {
        /// Text to search for
        text: String,

        /// Minimum similarity score (defaults to the duplicate threshold)
        #[arg(long)]
        threshold: Option<f32>,

        /// Maximum number of results
        #[arg(long, default_value = "5")]
        limit: usize,
    },

    /// Show store statistics
    Stats,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Triage {
            issue,
            source,
            apply,
            json,
        } => {
            commands::triage::execute(cli.config.as_deref(), issue, &source, apply, json)?;
        }
        Commands::Retriage { source, json } => {
            commands::retriage::execute(cli.config.as_deref(), &source, json)?;
        }
        Commands::Classify { title, body } => {
            commands::classify::execute(cli.config.as_deref(), &title, &body)?;
        }
        Commands::Memory { command } => match command {
            MemoryCommands::Store {
                number,
                title,
                body,
            } => {
                commands::memory::store(cli.config.as_deref(), number, &title, &body)?;
            }
            MemoryCommands::Search {
                text,
                threshold,
                limit,
            } => {
                commands::memory::search(cli.config.as_deref(), &text, threshold, limit)?;
            }
            MemoryCommands::Stats => {
                commands::memory::stats(cli.config.as_deref())?;
            }
        },
    }

    Ok(())
}
