mod cli;
mod commands;
mod config;
mod engine;
mod migrate;
mod paths;
mod progress;
mod recipe;
mod resource;
mod runner;
mod secrets;
mod state;
mod template;
mod ui;
mod users;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match cli.command {
        Command::Status(args) => commands::converge::status(&ctx, args.target.as_deref()),
        Command::Apply(args) => {
            commands::converge::apply(&ctx, args.target.as_deref(), args.dry_run, args.yes)
        }
        Command::Diff(args) => commands::converge::diff(&ctx, args.target.as_deref()),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "wikistead", &mut io::stdout());
            Ok(())
        }
    }
}
