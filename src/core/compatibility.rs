//! Pure compatibility queries over an immutable rule set.

use std::sync::Arc;

use crate::core::grammar::{GrammarRule, RuleSet, ValidationLevel};
use crate::core::token::{BondType, Token};

/// Strength reported when no rule admits a pair.
pub const DEFAULT_MIN_STRENGTH: f64 = 0.05;

/// Values that serve the same role and push each other apart instead of bonding.
const EXCLUSIVE_SETS: &[&[&str]] = &[
    &["if", "while", "for"],
    &["int", "float", "var"],
    &["++", "--"],
    &["&&", "||"],
];

#[derive(Debug, Clone)]
pub struct CompatibilityEngine {
    rules: Arc<RuleSet>,
}

impl CompatibilityEngine {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Both active, distinct, not yet bonded, not repelling, and some rule admits the pair.
    pub fn can_bond(&self, a: &Token, b: &Token) -> bool {
        if a.id == b.id || a.is_bonded_to(b.id) || b.is_bonded_to(a.id) {
            return false;
        }
        self.pair_compatible(a, b)
    }

    /// `can_bond` without the "already bonded" check; used to revalidate existing bonds.
    pub fn pair_compatible(&self, a: &Token, b: &Token) -> bool {
        if !a.active || !b.active || a.id == b.id {
            return false;
        }
        if repels(a, b) {
            return false;
        }
        self.matching_rule(a, b).is_some()
    }

    pub fn matching_rule(&self, a: &Token, b: &Token) -> Option<&GrammarRule> {
        self.rules.best_for_pair(a.kind, b.kind)
    }

    pub fn base_bond_strength(&self, a: &Token, b: &Token) -> f64 {
        self.matching_rule(a, b).map(|r| r.strength).unwrap_or(DEFAULT_MIN_STRENGTH)
    }

    pub fn bond_type(&self, a: &Token, b: &Token) -> BondType {
        self.matching_rule(a, b).map(|r| r.bond).unwrap_or(BondType::Weak)
    }

    /// Ordered sequence matches some rule's whole pattern.
    pub fn matches_grammar(&self, tokens: &[&Token]) -> bool {
        self.rules.full_match(&RuleSet::kinds_of(tokens)).is_some()
    }

    /// Chain-level validity: a full non-lenient pattern match, or every bonded
    /// consecutive pair compatible with at least one pair vouched for by a
    /// non-lenient rule.
    pub fn validate_sequence(&self, tokens: &[&Token]) -> bool {
        if tokens.is_empty() {
            return false;
        }
        if let Some(rule) = self.rules.full_match(&RuleSet::kinds_of(tokens)) {
            if rule.level != ValidationLevel::Lenient {
                return true;
            }
        }
        let mut vouched = false;
        for pair in tokens.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if !a.is_bonded_to(b.id) {
                continue;
            }
            if !self.pair_compatible(a, b) {
                return false;
            }
            if self
                .matching_rule(a, b)
                .map(|r| r.level != ValidationLevel::Lenient)
                .unwrap_or(false)
            {
                vouched = true;
            }
        }
        vouched
    }
}

/// Mutually exclusive tokens repel; the physics layer reads this for displacement.
pub fn repels(a: &Token, b: &Token) -> bool {
    if a.value == b.value {
        return false;
    }
    EXCLUSIVE_SETS
        .iter()
        .any(|set| set.contains(&a.value.as_str()) && set.contains(&b.value.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CompatibilityEngine {
        CompatibilityEngine::new(Arc::new(RuleSet::default()))
    }

    #[test]
    fn literal_and_plus_bond() {
        let e = engine();
        let a = Token::new(1, "5", 100);
        let b = Token::new(2, "+", 100);
        assert!(e.can_bond(&a, &b));
        assert!(e.can_bond(&b, &a));
        assert!((e.base_bond_strength(&a, &b) - 0.7).abs() < 1e-9);
        assert_eq!(e.bond_type(&a, &b), BondType::Covalent);
    }

    #[test]
    fn guards_reject_self_and_inactive() {
        let e = engine();
        let a = Token::new(1, "5", 100);
        assert!(!e.can_bond(&a, &a));
        let mut b = Token::new(2, "+", 100);
        b.active = false;
        assert!(!e.can_bond(&a, &b));
    }

    #[test]
    fn unmatched_pair_uses_permissive_default() {
        let e = engine();
        let a = Token::new(1, "{", 100);
        let b = Token::new(2, "+", 100);
        assert!(!e.can_bond(&a, &b));
        assert_eq!(e.base_bond_strength(&a, &b), DEFAULT_MIN_STRENGTH);
        assert_eq!(e.bond_type(&a, &b), BondType::Weak);
    }

    #[test]
    fn exclusive_keywords_repel() {
        let a = Token::new(1, "if", 10);
        let b = Token::new(2, "while", 10);
        let c = Token::new(3, "if", 10);
        assert!(repels(&a, &b));
        assert!(!repels(&a, &c));
    }

    #[test]
    fn matches_grammar_on_ordered_sequence() {
        let e = engine();
        let t1 = Token::new(1, "5", 10);
        let t2 = Token::new(2, "+", 10);
        let t3 = Token::new(3, "3", 10);
        assert!(e.matches_grammar(&[&t1, &t2, &t3]));
        assert!(!e.matches_grammar(&[&t2, &t1, &t3]));
        assert!(e.validate_sequence(&[&t1, &t2, &t3]));
    }
}
