use tokenbond::config::EngineConfig;
use tokenbond::core::shared::SharedReactor;
use tokenbond::core::Reactor;

fn arithmetic(r: &mut Reactor) -> u64 {
    let a = r.spawn_token("5", 100);
    let p = r.spawn_token("+", 100);
    let b = r.spawn_token("3", 100);
    assert!(r.attempt_bond(a, p, 0));
    assert!(r.attempt_bond(p, b, 0));
    r.tokens().get(a).and_then(|t| t.chain()).expect("chained")
}

#[test]
fn literal_plus_strength_and_energy() {
    let mut r = Reactor::default();
    let a = r.spawn_token("5", 100);
    let p = r.spawn_token("+", 100);
    assert!((r.bond_strength(a, p) - 0.853).abs() < 1e-9);
    assert!(r.attempt_bond(a, p, 1));
    let total: i64 = [a, p].iter().map(|id| r.tokens().get(*id).unwrap().energy).sum();
    assert_eq!(total, 200 - 18 + 10);
}

#[test]
fn well_formed_expression_becomes_stable() {
    let mut r = Reactor::default();
    let chain = arithmetic(&mut r);
    for t in 1..=50 {
        r.tick(t);
    }
    assert!(r.stability_of(chain) > 0.5);
    assert!(r.chains().is_stable(chain));
    assert_eq!(r.chains().most_stable_chain().map(|c| c.id), Some(chain));
    assert_eq!(r.chains().longest_chain().map(|c| c.length()), Some(3));

    let stats = r.statistics();
    assert_eq!(stats.chains.total_chains, 1);
    assert_eq!(stats.chains.stable_chains, 1);
    assert_eq!(stats.chains.valid_chains, 1);
    assert_eq!(stats.chains.total_bonds, 2);
    assert_eq!(stats.free_tokens, 0);
}

#[test]
fn starved_chain_goes_extinct() {
    let mut r = Reactor::default();
    let chain = arithmetic(&mut r);
    let members = r.chains().get_chain(chain).unwrap().members().to_vec();
    for id in &members {
        assert!(r.update_token(*id, |t| t.energy = 0));
    }
    let report = r.tick(1);
    assert_eq!(report.extinct, vec![chain]);
    assert!(r.chains().is_empty());
    for id in &members {
        let t = r.tokens().get(*id).unwrap();
        assert_eq!(t.bond_count(), 0);
        assert_eq!(t.chain(), None);
    }
}

#[test]
fn stale_unstable_chains_are_pruned() {
    let mut cfg = EngineConfig::default();
    cfg.reactor.stale_max_age = 5;
    cfg.registry.extinction_threshold = 0.0;
    let mut r = Reactor::new(&cfg).unwrap();
    let a = r.spawn_token("x", 100);
    let b = r.spawn_token(";", 100);
    assert!(r.attempt_bond(a, b, 0));
    // Lenient pair: invalid chain, low stability, nothing touches it.
    for id in [a, b] {
        r.update_token(id, |t| t.energy = 1);
    }
    let mut pruned = Vec::new();
    for t in 1..=10 {
        pruned.extend(r.tick(t).pruned);
    }
    assert_eq!(pruned.len(), 1);
    assert!(r.chains().is_empty());
}

#[test]
fn prediction_runs_ahead_of_current_value() {
    let mut r = Reactor::default();
    let chain = arithmetic(&mut r);
    r.tick(1);
    let now = r.stability_of(chain);
    let later = r.predict_stability(chain, 80);
    assert!(later < now, "predicted {later} vs now {now}");
}

#[test]
fn shared_reader_sees_sorted_chains() {
    let shared = SharedReactor::new(Reactor::default());
    shared.write(|r| {
        arithmetic(r);
        let x = r.spawn_token("x", 100);
        let s = r.spawn_token(";", 100);
        r.attempt_bond(x, s, 0);
        r.tick(1);
    });
    let chains = shared.chains_by_stability();
    assert_eq!(chains.len(), 2);
    assert!(chains[0].stability >= chains[1].stability);
    assert_eq!(chains[0].code, "5 + 3");
}
