mod cli;

use clap::Parser; // trait import enables TokenbondCli::parse()
use colored::Colorize;

use crate::cli::{Command, TokenbondCli};
use tokenbond::commands;
use tokenbond::config::load_or_default;

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let args = TokenbondCli::parse();
    let cfg = load_or_default(&args.config)?;

    match args.cmd {
        Command::Simulate { ticks, seed, spawn_every, pairs_per_tick, quiet, export } => {
            commands::simulate::main(
                &cfg,
                commands::simulate::SimulateOpts { ticks, seed, spawn_every, pairs_per_tick, quiet, export },
            )
        }
        Command::Pair { a, b, energy } => commands::pair::main(&cfg, &a, &b, energy),
        Command::Rules => commands::rules::main(&cfg),
        Command::Inspect { file, top } => commands::inspect::main(&cfg, &file, top),
    }
}
