mod commands;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use ortho_core::error::OrthoError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ortho", about = "UAV frames + flight log to georeferenced orthomosaic")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project directory tree and default config
    Init(commands::init::InitArgs),
    /// Print or save a default project config
    Config(commands::config::ConfigArgs),
    /// Run frame selection, stitching and georeferencing
    Run(commands::pipeline::RunArgs),
    /// Score images by Laplacian-variance sharpness
    Quality(commands::quality::QualityArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match &cli.command {
        Commands::Init(args) => commands::init::run(args),
        Commands::Config(args) => commands::config::run(args),
        Commands::Run(args) => commands::pipeline::run(args),
        Commands::Quality(args) => commands::quality::run(args),
    };

    if let Err(e) = &result {
        if let Some(stop) = e
            .downcast_ref::<OrthoError>()
            .filter(|err| err.is_stop_condition())
        {
            tracing::warn!(reason = %stop, "Run ended early");
            summary::print_stop(stop);
            return Ok(());
        }
    }
    result
}
