//! CLI frontend for the Tinsel behavior scheduler.

mod commands;
mod demos;

use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "tinsel",
    about = "Tinsel: cooperative behavior scheduling for 2D game entities",
    version,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the built-in demo scenes
    Demos,

    /// Run a demo headless and print the final state
    Run(commands::run::RunArgs),
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();

    let verbose = matches!(&cli.command, Commands::Run(args) if args.verbose);
    init_tracing(verbose);

    let result = match &cli.command {
        Commands::Demos => commands::demos::run(),
        Commands::Run(args) => commands::run::run(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}
