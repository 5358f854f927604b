mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "framesift", about = "Real-time lucky-imaging frame filter")]
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
    /// Show source metadata
    Info(commands::info::InfoArgs),
    /// Stream a source through the pipeline
    Run(commands::run::RunArgs),
    /// Two-pass whole-file filtering: rank everything, save the best
    Filter(commands::filter::FilterArgs),
    /// Print or save default settings as TOML
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Info(args) => commands::info::run(args),
        Commands::Run(args) => commands::run::run(args),
        Commands::Filter(args) => commands::filter::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
