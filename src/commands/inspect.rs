use std::path::Path;

use anyhow::Context;
use colored::Colorize;

use super::simulate::ExportFile;
use crate::config::EngineConfig;
use crate::core::reactor::Reactor;
use crate::core::snapshot::WorldSnapshot;

/// Accepts either a full export or a bare snapshot.
pub fn load_snapshot(path: &Path) -> anyhow::Result<WorldSnapshot> {
    let text = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    if let Ok(export) = serde_json::from_str::<ExportFile>(&text) {
        return Ok(export.snapshot);
    }
    serde_json::from_str::<WorldSnapshot>(&text).with_context(|| format!("parse snapshot {}", path.display()))
}

pub fn main(cfg: &EngineConfig, file: &Path, top: usize) -> anyhow::Result<()> {
    let snapshot = load_snapshot(file)?;
    let reactor = Reactor::restore(&snapshot, cfg).with_context(|| format!("restore {}", file.display()))?;
    let s = reactor.statistics();

    println!("{} {}", "snapshot:".bold(), file.display());
    println!("tick        {}", s.tick);
    println!("tokens      {} ({} free)", s.tokens, s.free_tokens);
    println!("chains      {} ({} stable, {} valid)", s.chains.total_chains, s.chains.stable_chains, s.chains.valid_chains);
    println!("bonds       {}", s.chains.total_bonds);
    println!("avg length  {:.2}", s.chains.average_length);

    for c in reactor.chains().chains_by_stability().into_iter().take(top) {
        let mark = if reactor.chains().is_stable(c.id) { "*".green() } else { " ".normal() };
        println!(
            "{} #{:<5} len={:<3} stability={:.3} predicted(+50)={:.3}  {}",
            mark,
            c.id,
            c.length(),
            c.stability,
            reactor.predict_stability(c.id, 50),
            c.code_string(reactor.tokens())
        );
    }
    Ok(())
}
