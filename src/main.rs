mod cli;
mod commands;
mod config;
mod manifest;
mod paths;
mod progress;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command, ConnectionArgs};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub connection: ConnectionArgs,
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
        connection: cli.connection,
    };

    match cli.command {
        Command::Plan(args) => commands::declarative::plan(&ctx, args),
        Command::Apply(args) => commands::declarative::apply(&ctx, args),
        Command::Destroy(args) => commands::declarative::destroy(&ctx, args),
        Command::Refresh(args) => commands::import::refresh(&ctx, args),
        Command::Import(args) => commands::import::import(&ctx, args),
        Command::Region(cmd) => commands::region::run(&ctx, cmd),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "mzform", &mut io::stdout());
            Ok(())
        }
    }
}
