//! Main entry point for the marionette-rs CLI

mod cli;
mod commands;
mod utils;

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap::Parser;
use clap_complete::{Generator, generate};
use marionette_anim::EngineConfig;
use std::io;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // Parse command line arguments
    let cli = Cli::parse();

    // Set verbosity
    if cli.verbose > 0 {
        log::set_max_level(match cli.verbose {
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        });
    } else if cli.quiet {
        log::set_max_level(log::LevelFilter::Error);
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::from_path(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => EngineConfig::default(),
    };

    // Execute command
    match cli.command {
        Commands::Clips { command } => commands::clips::execute(command),
        Commands::Solve(args) => commands::solve::execute(args, &config),
        Commands::Simulate(args) => commands::simulate::execute(args, &config),
        Commands::Completions { shell } => {
            print_completions(shell, &mut Cli::command());
            Ok(())
        }
    }
}

fn print_completions<G: Generator>(generator: G, cmd: &mut clap::Command) {
    generate(
        generator,
        cmd,
        cmd.get_name().to_string(),
        &mut io::stdout(),
    );
}
