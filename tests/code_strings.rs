use tokenbond::core::grammar::RuleSet;
use tokenbond::core::Reactor;

fn build(values: &[&str]) -> (Reactor, Option<u64>) {
    let mut r = Reactor::default();
    let ids: Vec<u64> = values.iter().map(|v| r.spawn_token(v, 100)).collect();
    for pair in ids.windows(2) {
        assert!(r.attempt_bond(pair[0], pair[1], 1), "{:?} should bond", pair);
    }
    let chain = r.tokens().get(ids[0]).and_then(|t| t.chain());
    (r, chain)
}

#[test]
fn arithmetic_code_string() {
    let (r, chain) = build(&["5", "+", "3"]);
    insta::assert_snapshot!(r.code_string(chain.unwrap()).unwrap(), @"5 + 3");
}

#[test]
fn declaration_code_string() {
    let (r, chain) = build(&["int", "count", "=", "10", ";"]);
    insta::assert_snapshot!(r.code_string(chain.unwrap()).unwrap(), @"int count = 10 ;");
    assert!(r.chains().get_chain(chain.unwrap()).unwrap().is_valid);
}

#[test]
fn builtin_rule_listing() {
    let rules = RuleSet::default();
    let first: Vec<String> = rules.rules().iter().take(3).map(|r| r.to_string()).collect();
    insta::assert_snapshot!(first.join("\n"), @r"
    paren pair: [( )] covalent 1.00
    brace pair: [{ }] covalent 1.00
    bracket pair: [[ ]] covalent 1.00
    ");
}
