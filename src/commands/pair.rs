use colored::Colorize;

use crate::config::EngineConfig;
use crate::core::compatibility::repels;
use crate::core::reactor::Reactor;

pub fn main(cfg: &EngineConfig, a: &str, b: &str, energy: i64) -> anyhow::Result<()> {
    let mut reactor = Reactor::new(cfg)?;
    let ia = reactor.spawn_token(a, energy);
    let ib = reactor.spawn_token(b, energy);
    let (Some(ta), Some(tb)) = (reactor.tokens().get(ia), reactor.tokens().get(ib)) else {
        anyhow::bail!("tokens vanished after spawn");
    };

    let model = reactor.bonding().strength_model();
    let compat = model.compatibility();
    println!("{}", ta);
    println!("{}", tb);

    if repels(ta, tb) {
        println!("{} '{}' and '{}' are mutually exclusive and repel", "repel:".yellow().bold(), a, b);
    }
    match compat.matching_rule(ta, tb) {
        Some(rule) => println!("rule         {}", rule),
        None => println!("rule         {}", "none".dimmed()),
    }

    let bd = model.breakdown(ta, tb);
    println!("grammar      {:.3}", bd.grammar);
    println!("electroneg.  {:.3}", bd.electronegativity);
    println!("energy       {:.3}", bd.energy);
    println!("availability {:.3}", bd.availability);
    println!("damage       {:.3}", bd.damage);
    println!("strength     {:.3}", bd.total);
    println!("bond type    {}", model.determine_bond_type(ta, tb));
    println!("energy cost  {:.2}", model.calculate_bond_energy_cost(ta, tb));

    let verdict = if model.can_form_bond(ta, tb) && compat.can_bond(ta, tb) {
        "can bond".green().bold()
    } else {
        "cannot bond".red().bold()
    };
    println!("{}", verdict);
    Ok(())
}
