use colored::Colorize;

use crate::config::EngineConfig;
use crate::core::grammar::ValidationLevel;
use crate::core::reactor::Reactor;

pub fn main(cfg: &EngineConfig) -> anyhow::Result<()> {
    let reactor = Reactor::new(cfg)?;
    let rules = reactor.bonding().compatibility().rules();
    println!("{} {} rules", "grammar:".bold(), rules.len());
    for (i, rule) in rules.rules().iter().enumerate() {
        let level = match rule.level {
            ValidationLevel::Strict => "strict".red(),
            ValidationLevel::Normal => "normal".normal(),
            ValidationLevel::Lenient => "lenient".dimmed(),
        };
        println!("{:>3}. {} ({})", i + 1, rule, level);
    }
    Ok(())
}
