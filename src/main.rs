mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub json: bool,
    pub manifest: Option<PathBuf>,
    pub token: Option<String>,
}

impl Context {
    /// Progress output would corrupt JSON and is unwanted when quiet
    pub fn hide_progress(&self) -> bool {
        self.quiet || self.json
    }
}

fn main() {
    if let Err(err) = run() {
        ui::error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
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
        json: cli.json,
        manifest: cli.manifest,
        token: cli.token,
    };

    match cli.command {
        Command::Plan(args) => commands::reconcile::plan(&ctx, args),
        Command::Apply(args) => commands::reconcile::apply(&ctx, args),
        Command::Show { driver, identifier } => commands::inspect::show(&ctx, &driver, &identifier),
        Command::Action {
            driver,
            name,
            action,
            yes,
        } => commands::inspect::action(&ctx, &driver, &name, &action, yes),
        Command::Validate => commands::validate::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "converge", &mut io::stdout());
            Ok(())
        }
    }
}
