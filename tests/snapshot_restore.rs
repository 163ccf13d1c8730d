use tokenbond::config::EngineConfig;
use tokenbond::core::snapshot::WorldSnapshot;
use tokenbond::core::{CoreError, Reactor};

fn populated() -> Reactor {
    let mut r = Reactor::default();
    let a = r.spawn_token("int", 100);
    let b = r.spawn_token("count", 100);
    let c = r.spawn_token("=", 100);
    let d = r.spawn_token("10", 100);
    assert!(r.attempt_bond(a, b, 1));
    assert!(r.attempt_bond(b, c, 2));
    assert!(r.attempt_bond(c, d, 3));
    r.spawn_token("while", 40);
    for t in 4..=60 {
        r.tick(t);
    }
    r
}

#[test]
fn json_round_trip_restores_same_world() {
    let r = populated();
    let snap = r.snapshot();
    let json = serde_json::to_string(&snap).unwrap();
    let back: WorldSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back.tokens.len(), snap.tokens.len());
    assert_eq!(back.chains[0].members, snap.chains[0].members);
    assert!(Reactor::restore(&back, &EngineConfig::default()).is_ok());

    let restored = Reactor::restore(&snap, &EngineConfig::default()).unwrap();
    assert_eq!(restored.current_tick(), r.current_tick());
    assert_eq!(restored.statistics().chains, r.statistics().chains);
    assert_eq!(restored.snapshot(), snap);

    let chain = restored.chains().iter().next().unwrap().id;
    assert_eq!(restored.code_string(chain).as_deref(), Some("int count = 10"));
    assert!(restored.chains().is_stable(chain));
}

#[test]
fn restored_world_keeps_allocating_fresh_ids() {
    let r = populated();
    let mut restored = Reactor::restore(&r.snapshot(), &EngineConfig::default()).unwrap();
    let max = restored.tokens().ids().into_iter().max().unwrap();
    let fresh = restored.spawn_token(";", 10);
    assert!(fresh > max);
}

#[test]
fn asymmetric_bond_is_rejected() {
    let mut snap = populated().snapshot();
    let rec = snap.tokens.iter_mut().find(|t| !t.bonds.is_empty()).unwrap();
    rec.bonds[0].bond.strength += 0.25;
    let err = Reactor::restore(&snap, &EngineConfig::default()).unwrap_err();
    assert!(matches!(err, CoreError::InvalidSnapshot(_)), "{err}");
}

#[test]
fn dangling_partner_is_rejected() {
    let mut snap = populated().snapshot();
    let removed = snap.tokens.iter().position(|t| t.value == "=").unwrap();
    let gone = snap.tokens.remove(removed).id;
    let err = Reactor::restore(&snap, &EngineConfig::default()).unwrap_err();
    assert_eq!(err, CoreError::UnknownToken(gone));
}

#[test]
fn self_bond_is_rejected() {
    let mut snap = populated().snapshot();
    let rec = snap.tokens.iter_mut().find(|t| !t.bonds.is_empty()).unwrap();
    rec.bonds[0].partner = rec.id;
    let err = Reactor::restore(&snap, &EngineConfig::default()).unwrap_err();
    assert!(err.to_string().starts_with("Invalid Snapshot"), "{err}");
}

#[test]
fn membership_mismatch_is_rejected() {
    let mut snap = populated().snapshot();
    let free = snap.tokens.iter_mut().find(|t| t.value == "while").unwrap();
    free.chain = snap.chains.first().map(|c| c.id);
    assert!(Reactor::restore(&snap, &EngineConfig::default()).is_err());
}
