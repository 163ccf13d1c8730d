//! Declarative grammar rules: which kind sequences mean something and what bond they imply.

use serde::{Deserialize, Serialize};

use crate::core::error::CoreError;
use crate::core::token::{BondType, Token, TokenClass, TokenKind};

/// One position in a rule pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Constraint {
    Kind(TokenKind),
    OneOf(Vec<TokenKind>),
    Class(TokenClass),
    /// Identifier or literal.
    Operand,
    Any,
}

impl Constraint {
    pub fn admits(&self, kind: TokenKind) -> bool {
        match self {
            Constraint::Kind(k) => *k == kind,
            Constraint::OneOf(kinds) => kinds.contains(&kind),
            Constraint::Class(c) => kind.class() == *c,
            Constraint::Operand => kind.is_operand(),
            Constraint::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationLevel {
    /// Allows a bond but does not vouch for a chain's grammatical validity on its own.
    Lenient,
    Normal,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarRule {
    pub name: String,
    pub pattern: Vec<Constraint>,
    pub bond: BondType,
    pub strength: f64,
    #[serde(default = "default_level")]
    pub level: ValidationLevel,
}

fn default_level() -> ValidationLevel {
    ValidationLevel::Normal
}

impl GrammarRule {
    pub fn new(
        name: &str,
        pattern: Vec<Constraint>,
        bond: BondType,
        strength: f64,
        level: ValidationLevel,
    ) -> Self {
        Self { name: name.to_string(), pattern, bond, strength, level }
    }

    /// Rejects empty or single-element patterns and strengths outside [0, 1].
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.pattern.len() < 2 {
            return Err(CoreError::invalid_rule(&format!(
                "rule '{}' needs at least two constraints",
                self.name
            )));
        }
        if !(0.0..=1.0).contains(&self.strength) {
            return Err(CoreError::invalid_rule(&format!(
                "rule '{}' strength {} outside 0..=1",
                self.name, self.strength
            )));
        }
        Ok(())
    }

    /// True if some adjacent window of the pattern admits the pair, in either order.
    pub fn admits_pair(&self, a: TokenKind, b: TokenKind) -> bool {
        self.pattern.windows(2).any(|w| {
            (w[0].admits(a) && w[1].admits(b)) || (w[0].admits(b) && w[1].admits(a))
        })
    }

    /// True if the ordered sequence matches the whole pattern.
    pub fn matches_sequence(&self, kinds: &[TokenKind]) -> bool {
        kinds.len() == self.pattern.len()
            && self.pattern.iter().zip(kinds).all(|(c, k)| c.admits(*k))
    }
}

impl std::fmt::Display for GrammarRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .pattern
            .iter()
            .map(|c| match c {
                Constraint::Kind(k) => k.to_string(),
                Constraint::OneOf(ks) => {
                    ks.iter().map(|k| k.to_string()).collect::<Vec<_>>().join("|")
                }
                Constraint::Class(c) => format!("<{:?}>", c).to_lowercase(),
                Constraint::Operand => "<operand>".to_string(),
                Constraint::Any => "*".to_string(),
            })
            .collect();
        write!(f, "{}: [{}] {} {:.2}", self.name, parts.join(" "), self.bond, self.strength)
    }
}

/// The active rule set. Read-only once the simulation starts.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<GrammarRule>,
}

impl RuleSet {
    pub fn new(rules: Vec<GrammarRule>) -> Result<Self, CoreError> {
        for r in &rules {
            r.validate()?;
        }
        Ok(Self { rules })
    }

    /// Built-in rules followed by `extra`.
    pub fn with_extra(extra: Vec<GrammarRule>) -> Result<Self, CoreError> {
        let mut rules = Self::default().rules;
        rules.extend(extra);
        Self::new(rules)
    }

    pub fn rules(&self) -> &[GrammarRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Longest pattern admitting the pair wins; ties go to the earlier rule.
    pub fn best_for_pair(&self, a: TokenKind, b: TokenKind) -> Option<&GrammarRule> {
        let mut best: Option<&GrammarRule> = None;
        for rule in &self.rules {
            if !rule.admits_pair(a, b) {
                continue;
            }
            match best {
                Some(current) if current.pattern.len() >= rule.pattern.len() => {}
                _ => best = Some(rule),
            }
        }
        best
    }

    pub fn full_match(&self, kinds: &[TokenKind]) -> Option<&GrammarRule> {
        self.rules.iter().find(|r| r.matches_sequence(kinds))
    }

    pub fn kinds_of(tokens: &[&Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        use Constraint::*;
        use TokenKind as K;
        use ValidationLevel::*;
        let arithmetic = OneOf(vec![K::Plus, K::Minus, K::Star, K::Slash, K::Percent]);
        let rules = vec![
            GrammarRule::new("paren pair", vec![Kind(K::OpenParen), Kind(K::CloseParen)], BondType::Covalent, 1.0, Strict),
            GrammarRule::new("brace pair", vec![Kind(K::OpenBrace), Kind(K::CloseBrace)], BondType::Covalent, 1.0, Strict),
            GrammarRule::new("bracket pair", vec![Kind(K::OpenBracket), Kind(K::CloseBracket)], BondType::Covalent, 1.0, Strict),
            GrammarRule::new("control head", vec![Kind(K::ControlKeyword), Kind(K::OpenParen)], BondType::Covalent, 0.9, Strict),
            GrammarRule::new("declaration", vec![Kind(K::TypeKeyword), Kind(K::Identifier)], BondType::Covalent, 0.85, Strict),
            GrammarRule::new(
                "declaration statement",
                vec![Kind(K::TypeKeyword), Kind(K::Identifier), Kind(K::Assign), Operand, Kind(K::Semicolon)],
                BondType::Covalent,
                0.85,
                Strict,
            ),
            GrammarRule::new("assignment", vec![Kind(K::Identifier), Kind(K::Assign), Operand], BondType::Covalent, 0.8, Normal),
            GrammarRule::new("arithmetic", vec![Operand, arithmetic, Operand], BondType::Covalent, 0.7, Normal),
            GrammarRule::new("comparison", vec![Operand, Kind(K::Comparison), Operand], BondType::Ionic, 0.75, Normal),
            GrammarRule::new("logical", vec![Operand, Kind(K::Logical), Operand], BondType::Ionic, 0.6, Normal),
            GrammarRule::new("group open", vec![Kind(K::OpenParen), Operand], BondType::Ionic, 0.7, Normal),
            GrammarRule::new("argument list", vec![Operand, Kind(K::Comma), Operand], BondType::Ionic, 0.6, Normal),
            GrammarRule::new("member access", vec![Kind(K::Identifier), Kind(K::Dot), Kind(K::Identifier)], BondType::Covalent, 0.55, Normal),
            GrammarRule::new("pointer access", vec![Kind(K::Identifier), Kind(K::Arrow), Kind(K::Identifier)], BondType::Covalent, 0.55, Normal),
            GrammarRule::new("increment", vec![Kind(K::Identifier), Kind(K::Increment)], BondType::Covalent, 0.6, Normal),
            GrammarRule::new("statement end", vec![Operand, Kind(K::Semicolon)], BondType::Weak, 0.5, Lenient),
            GrammarRule::new("group close", vec![Operand, Kind(K::CloseParen)], BondType::Weak, 0.5, Lenient),
            GrammarRule::new("keyword operand", vec![Kind(K::ControlKeyword), Operand], BondType::Ionic, 0.45, Lenient),
        ];
        Self { rules }
    }
}
