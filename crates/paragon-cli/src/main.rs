//! CLI application for Polish receipt ingestion.

mod commands;
mod llm;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, pantry, process, resolve};

/// Polish receipt ingestion - turn receipt text into products and pantry entries
#[derive(Parser)]
#[command(name = "paragon")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest a single receipt file
    Process(process::ProcessArgs),

    /// Ingest multiple receipt files
    Batch(batch::BatchArgs),

    /// Resolve a raw product name against the product database
    Resolve(resolve::ResolveArgs),

    /// Inspect and update pantry entries
    Pantry(pantry::PantryArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Process(args) => process::run(args, cli.config.as_deref()).await,
        Commands::Batch(args) => batch::run(args, cli.config.as_deref()).await,
        Commands::Resolve(args) => resolve::run(args, cli.config.as_deref()).await,
        Commands::Pantry(args) => pantry::run(args, cli.config.as_deref()).await,
        Commands::Config(args) => config::run(args).await,
    }
}
