use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "tokenbond",
    about = "Token bonding engine: grammar-driven bonds, chains and stability",
    version,
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct TokenbondCli {
    /// Global: path to engine config (TOML); default: ~/.tokenbond/engine.toml
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a headless simulation: a vent spawns tokens, random pairs try to bond
    ///
    /// Examples:
    ///   tokenbond simulate --ticks 2000 --seed 7
    ///   tokenbond simulate --ticks 500 --export world.json
    Simulate {
        /// Number of ticks to run
        #[arg(long = "ticks", value_name = "N", default_value_t = 1000)]
        ticks: u64,

        /// RNG seed for reproducible runs
        #[arg(long = "seed", value_name = "S", default_value_t = 42)]
        seed: u64,

        /// The vent spawns one token every K ticks
        #[arg(long = "spawn-every", value_name = "K", default_value_t = 2)]
        spawn_every: u64,

        /// Candidate pairs offered to the bonding manager per tick
        #[arg(long = "pairs-per-tick", value_name = "P", default_value_t = 8)]
        pairs_per_tick: usize,

        /// Only print the final summary
        #[arg(long = "quiet", action = ArgAction::SetTrue)]
        quiet: bool,

        /// Write the final world snapshot as JSON
        #[arg(long = "export", value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Explain how two token values would bond
    Pair {
        #[arg(value_name = "A")]
        a: String,
        #[arg(value_name = "B")]
        b: String,
        /// Energy given to each token
        #[arg(long = "energy", value_name = "E", default_value_t = 50)]
        energy: i64,
    },

    /// List the active grammar rules
    Rules,

    /// Restore an exported snapshot and report on it
    Inspect {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Number of chains to list
        #[arg(long = "top", value_name = "N", default_value_t = 10)]
        top: usize,
    },
}
