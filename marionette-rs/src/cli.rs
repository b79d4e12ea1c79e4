//! Root CLI structure for marionette-rs

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "marionette-rs")]
#[command(about = "Command-line tools for skeletal animation clip sets", long_about = None)]
#[command(version)]
#[command(author)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (can be repeated for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Engine configuration file (JSON or YAML)
    #[arg(short, long, global = true, env = "MARIONETTE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clip manifest operations
    Clips {
        #[command(subcommand)]
        command: crate::commands::clips::ClipsCommands,
    },

    /// Resolve an action request to a clip
    Solve(crate::commands::solve::SolveArgs),

    /// Play a timed script of requests and print the resulting layers
    Simulate(crate::commands::simulate::SimulateArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
