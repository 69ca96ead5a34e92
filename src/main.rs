//! knot-integration - integration tests for the knot package linker
//!
//! Scaffolds throwaway workspaces, runs `knot link` against them and checks
//! the filesystem side effects and diagnostics.

use clap::Parser;
use knot_harness::cli;
use knot_harness::common::logging;
use knot_harness::commands::Commands;

#[derive(Parser)]
#[command(name = "knot-integration", about = "Integration tests for the knot linker")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    logging::init_cli(verbose);

    match cli::dispatch(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(cli::EXIT_FAILURE);
        }
    }
}
