// quarry/src/main.rs
use std::process;

use clap::Parser;
use colored::Colorize;
use quarry_common::config::Config;
use quarry_common::error::Result as QuarryResult;
use tracing::debug;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::{CliArgs, Command};

fn main() {
    let cli_args = CliArgs::parse();

    let level_filter = match cli_args.verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .from_env_lossy();
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .without_time()
        .try_init();

    if let Err(e) = run(cli_args) {
        eprintln!("{}: {e:#}", "Error".red().bold());
        process::exit(1);
    }
}

fn run(cli_args: CliArgs) -> QuarryResult<()> {
    let config = Config::load()?;
    let recipes_dir = cli_args
        .recipes
        .clone()
        .unwrap_or_else(|| config.recipes_dir().to_path_buf());
    debug!("Using recipes from {}", recipes_dir.display());

    match &cli_args.command {
        Command::List(cmd) => cmd.run(&config, &recipes_dir),
        Command::Info(cmd) => cmd.run(&config, &recipes_dir),
        Command::Resolve(cmd) => cmd.run(&config, &recipes_dir),
        Command::Install(cmd) => cmd.run(&config, &recipes_dir),
    }
}
