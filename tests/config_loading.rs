use std::fs;

use tokenbond::config::{load_config, load_or_default, EngineConfig};
use tokenbond::core::grammar::ValidationLevel;
use tokenbond::core::token::BondType;
use tokenbond::core::Reactor;

#[test]
fn extra_rules_extend_the_grammar() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.toml");
    fs::write(
        &path,
        r#"
        [bonding]
        min_strength = 0.35

        [reactor]
        validation_interval = 4

        [[rules]]
        name = "keyword pair"
        pattern = [{ kind = "ControlKeyword" }, { kind = "ControlKeyword" }]
        bond = "weak"
        strength = 0.4
        level = "lenient"
        "#,
    )
    .unwrap();

    let cfg = load_config(&path).unwrap();
    assert_eq!(cfg.bonding.min_strength, 0.35);
    assert_eq!(cfg.reactor.validation_interval, 4);
    assert_eq!(cfg.rules.len(), 1);
    assert_eq!(cfg.rules[0].bond, BondType::Weak);
    assert_eq!(cfg.rules[0].level, ValidationLevel::Lenient);

    let r = Reactor::new(&cfg).unwrap();
    let rules = r.bonding().compatibility().rules();
    assert_eq!(rules.rules().last().map(|x| x.name.as_str()), Some("keyword pair"));
}

#[test]
fn invalid_rule_fails_reactor_construction() {
    let mut cfg = EngineConfig::default();
    cfg.rules = toml::from_str::<EngineConfig>(
        r#"
        [[rules]]
        name = "too short"
        pattern = ["any"]
        bond = "weak"
        strength = 0.4
        "#,
    )
    .unwrap()
    .rules;
    let err = Reactor::new(&cfg).unwrap_err();
    assert!(err.to_string().contains("too short"));
}

#[test]
fn explicit_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = Some(dir.path().join("nope.toml"));
    assert!(load_or_default(&missing).is_err());
}

#[test]
fn malformed_file_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[bonding\nmin_strength = ").unwrap();
    let err = load_config(&path).unwrap_err();
    assert!(format!("{err:#}").contains("bad.toml"));
}
