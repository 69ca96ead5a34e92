//! CLI command definitions
//!
//! Defines the clap commands for the integration harness.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the integration scenarios against the linker
    Run {
        /// Harness configuration file (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Linker program to invoke (default: knot)
        #[arg(long)]
        tool: Option<String>,

        /// Argument placed before every linker invocation, e.g. a script path
        /// when --tool is an interpreter. Can be given multiple times
        #[arg(long = "tool-arg", allow_hyphen_values = true)]
        tool_args: Vec<String>,

        /// Per-command timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Only run the named scenario(s), e.g. --only "Symlink Mode"
        #[arg(long)]
        only: Vec<String>,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// List the registered scenarios in execution order
    List,

    /// Write a fixture described in YAML into a directory, for manual debugging
    Scaffold {
        /// Fixture description (YAML)
        config: PathBuf,

        /// Output directory; must be empty or not exist
        out: PathBuf,
    },
}
