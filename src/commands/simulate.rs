use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::{ensure_parent_dir, EngineConfig};
use crate::core::reactor::{Reactor, ReactorStatistics};
use crate::core::snapshot::WorldSnapshot;

/// Values the vent draws from.
pub const C_TOKEN_POOL: &[&str] = &[
    // keywords
    "if", "else", "for", "while", "return", "int", "float", "char", "void", "struct", "typedef",
    "sizeof", "const", "static", "break", "continue",
    // operators
    "+", "-", "*", "/", "=", "==", "!=", "<", ">", "<=", ">=", "&&", "||", "++", "--", "+=", "-=",
    "*=", "/=", "&", "|", "^", "~", "<<", ">>",
    // punctuation
    "(", ")", "{", "}", "[", "]", ";", ",", ".", "->", "%",
    // identifiers
    "main", "printf", "scanf", "malloc", "free", "NULL", "argc", "argv", "i", "j", "k", "x", "y",
    "z", "n", "count", "sum", "temp", "result",
    // literals
    "0", "1", "2", "10", "100", "0x00", "0xFF",
];

pub const VENT_ENERGY: i64 = 50;
const REPORT_EVERY: u64 = 100;
const DEFAULT_VALUE_EVERY: u64 = 50;

#[derive(Debug, Clone)]
pub struct SimulateOpts {
    pub ticks: u64,
    pub seed: u64,
    pub spawn_every: u64,
    pub pairs_per_tick: usize,
    pub quiet: bool,
    pub export: Option<PathBuf>,
}

/// On-disk export: the snapshot plus when and how it was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportFile {
    pub exported_at: String,
    pub seed: u64,
    pub ticks: u64,
    pub snapshot: WorldSnapshot,
}

pub fn main(cfg: &EngineConfig, opts: SimulateOpts) -> anyhow::Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("install Ctrl-C handler")?;
    }

    let mut reactor = Reactor::new(cfg).context("build reactor from config")?;
    let last = run_loop(&mut reactor, &opts, &stop);

    if stop.load(Ordering::SeqCst) {
        println!("{} stopped at tick {}", "warn:".yellow().bold(), last);
    }
    print_summary(&reactor);

    if let Some(path) = &opts.export {
        let export = ExportFile {
            exported_at: chrono::Utc::now().to_rfc3339(),
            seed: opts.seed,
            ticks: last,
            snapshot: reactor.snapshot(),
        };
        ensure_parent_dir(path)?;
        let json = serde_json::to_string_pretty(&export).context("serialize snapshot")?;
        std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        println!("{} snapshot written to {}", "ok:".green().bold(), path.display());
    }
    Ok(())
}

/// Drives the reactor the way the physics layer would. Returns the last tick run.
pub fn run_loop(reactor: &mut Reactor, opts: &SimulateOpts, stop: &AtomicBool) -> u64 {
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let spawn_every = opts.spawn_every.max(1);
    let mut last = 0;

    for tick in 1..=opts.ticks {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        last = tick;

        if tick % spawn_every == 0 {
            if let Some(value) = C_TOKEN_POOL.choose(&mut rng) {
                reactor.spawn_token(value, VENT_ENERGY);
            }
        }

        reactor.update_tokens(|t| t.energy = (t.energy - 1).max(0));
        // Free tokens with nothing left dissipate.
        let spent: Vec<u64> = reactor
            .tokens()
            .iter()
            .filter(|t| t.energy == 0 && t.chain().is_none())
            .map(|t| t.id)
            .collect();
        for id in spent {
            reactor.remove_token(id, tick);
        }

        let ids = reactor.tokens().ids();
        if ids.len() >= 2 {
            for _ in 0..opts.pairs_per_tick {
                let a = ids[rng.gen_range(0..ids.len())];
                let b = ids[rng.gen_range(0..ids.len())];
                if a != b {
                    reactor.attempt_bond(a, b, tick);
                }
            }
        }

        reactor.tick(tick);
        if tick % DEFAULT_VALUE_EVERY == 0 {
            reactor.insert_default_values(&mut rng);
        }

        if !opts.quiet && tick % REPORT_EVERY == 0 {
            print_progress(&reactor.statistics());
        }
    }
    last
}

fn print_progress(s: &ReactorStatistics) {
    println!(
        "{} tokens={} free={} chains={} stable={} longest={} avg_stability={:.3}",
        format!("[tick {:>6}]", s.tick).cyan(),
        s.tokens,
        s.free_tokens,
        s.chains.total_chains,
        s.chains.stable_chains,
        s.chains.longest_chain,
        s.chains.average_stability
    );
}

fn print_summary(reactor: &Reactor) {
    let s = reactor.statistics();
    println!("{}", "== simulation summary ==".bold());
    println!("tick               {}", s.tick);
    println!("tokens             {} ({} free)", s.tokens, s.free_tokens);
    println!("bonds formed       {} of {} attempts", s.bonding.formed, s.bonding.attempts);
    println!("bonds broken       {}", s.bonding.broken);
    println!("merges / splits    {} / {}", s.bonding.merges, s.bonding.splits);
    println!("chains             {} ({} stable, {} valid)", s.chains.total_chains, s.chains.stable_chains, s.chains.valid_chains);
    println!("longest chain      {}", s.chains.longest_chain);
    println!("avg stability      {:.3}", s.chains.average_stability);

    for c in reactor.chains().chains_by_stability().into_iter().take(5) {
        println!(
            "  #{:<5} {:>5.3}  {}",
            c.id,
            c.stability,
            c.code_string(reactor.tokens()).green()
        );
    }
}
