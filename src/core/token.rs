// src/core/token.rs
//! Tokens as simulated particles: lexical kind, mass, energy, damage, bond sites
//! and the symmetric bond records kept on both partners.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub type TokenId = u64;
pub type ChainId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TokenKind {
    // Keywords
    ControlKeyword, // if else for while return break continue
    TypeKeyword,    // int float char void var let const struct

    // Identifiers and literals
    Identifier,
    IntegerLiteral,
    FloatLiteral,
    StringLiteral,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Assign,     // = += -= *= /=
    Comparison, // == != < > <= >=
    Logical,    // && ||
    Increment,  // ++ --
    Bitwise,    // & | ^ ~ << >>

    // Delimiters
    OpenParen,    // (
    CloseParen,   // )
    OpenBrace,    // {
    CloseBrace,   // }
    OpenBracket,  // [
    CloseBracket, // ]
    Semicolon,    // ;
    Comma,        // ,
    Dot,          // .
    Arrow,        // ->

    Unknown,
}

/// Coarse grouping used by grammar constraints and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Keyword,
    Operator,
    Punctuation,
    Identifier,
    Literal,
    Unknown,
}

const CONTROL_KEYWORDS: &[&str] = &[
    "if", "else", "for", "while", "return", "break", "continue", "function", "class", "sizeof",
];
const TYPE_KEYWORDS: &[&str] = &[
    "int", "float", "char", "void", "var", "let", "const", "struct", "typedef", "static",
];

impl TokenKind {
    /// Derives the lexical kind from a token's textual value.
    pub fn classify(value: &str) -> TokenKind {
        if CONTROL_KEYWORDS.contains(&value) {
            return TokenKind::ControlKeyword;
        }
        if TYPE_KEYWORDS.contains(&value) {
            return TokenKind::TypeKeyword;
        }
        match value {
            "+" => return TokenKind::Plus,
            "-" => return TokenKind::Minus,
            "*" => return TokenKind::Star,
            "/" => return TokenKind::Slash,
            "%" => return TokenKind::Percent,
            "=" | "+=" | "-=" | "*=" | "/=" => return TokenKind::Assign,
            "==" | "!=" | "<" | ">" | "<=" | ">=" => return TokenKind::Comparison,
            "&&" | "||" => return TokenKind::Logical,
            "++" | "--" => return TokenKind::Increment,
            "&" | "|" | "^" | "~" | "<<" | ">>" => return TokenKind::Bitwise,
            "(" => return TokenKind::OpenParen,
            ")" => return TokenKind::CloseParen,
            "{" => return TokenKind::OpenBrace,
            "}" => return TokenKind::CloseBrace,
            "[" => return TokenKind::OpenBracket,
            "]" => return TokenKind::CloseBracket,
            ";" => return TokenKind::Semicolon,
            "," => return TokenKind::Comma,
            "." => return TokenKind::Dot,
            "->" => return TokenKind::Arrow,
            _ => {}
        }
        if is_identifier(value) {
            return TokenKind::Identifier;
        }
        if is_integer(value) {
            return TokenKind::IntegerLiteral;
        }
        if value.parse::<f64>().is_ok() {
            return TokenKind::FloatLiteral;
        }
        if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            return TokenKind::StringLiteral;
        }
        TokenKind::Unknown
    }

    pub fn class(self) -> TokenClass {
        use TokenKind::*;
        match self {
            ControlKeyword | TypeKeyword => TokenClass::Keyword,
            Identifier => TokenClass::Identifier,
            IntegerLiteral | FloatLiteral | StringLiteral => TokenClass::Literal,
            Plus | Minus | Star | Slash | Percent | Assign | Comparison | Logical | Increment
            | Bitwise => TokenClass::Operator,
            OpenParen | CloseParen | OpenBrace | CloseBrace | OpenBracket | CloseBracket
            | Semicolon | Comma | Dot | Arrow => TokenClass::Punctuation,
            Unknown => TokenClass::Unknown,
        }
    }

    /// Identifiers and literals: the things operators combine.
    pub fn is_operand(self) -> bool {
        matches!(self.class(), TokenClass::Identifier | TokenClass::Literal)
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash | TokenKind::Percent
        )
    }

    /// The closing delimiter paired with an opening one.
    pub fn closing_pair(self) -> Option<TokenKind> {
        match self {
            TokenKind::OpenParen => Some(TokenKind::CloseParen),
            TokenKind::OpenBrace => Some(TokenKind::CloseBrace),
            TokenKind::OpenBracket => Some(TokenKind::CloseBracket),
            _ => None,
        }
    }

    /// Default bond-site layout for tokens of this kind.
    pub fn default_sites(self) -> Vec<BondSite> {
        use SiteLocation::*;
        match self.class() {
            TokenClass::Keyword => vec![BondSite::new(Start), BondSite::new(Right)],
            TokenClass::Identifier | TokenClass::Literal => {
                vec![BondSite::new(Left), BondSite::new(Right)]
            }
            TokenClass::Operator => vec![
                BondSite::accepting(Left, NOT_OPERATOR),
                BondSite::accepting(Right, NOT_OPERATOR),
            ],
            TokenClass::Punctuation => match self {
                TokenKind::OpenParen | TokenKind::OpenBrace | TokenKind::OpenBracket => {
                    vec![BondSite::new(Left), BondSite::new(Internal), BondSite::new(Right)]
                }
                TokenKind::Semicolon => vec![BondSite::new(Left), BondSite::new(End)],
                _ => vec![BondSite::new(Left), BondSite::new(Right)],
            },
            TokenClass::Unknown => vec![BondSite::new(Internal)],
        }
    }
}

const NOT_OPERATOR: &[TokenClass] = &[
    TokenClass::Keyword,
    TokenClass::Punctuation,
    TokenClass::Identifier,
    TokenClass::Literal,
    TokenClass::Unknown,
];

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => chars.all(|c| c == '_' || c.is_alphanumeric()),
        _ => false,
    }
}

fn is_integer(value: &str) -> bool {
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenKind::ControlKeyword => "control keyword",
            TokenKind::TypeKeyword => "type keyword",
            TokenKind::Identifier => "identifier",
            TokenKind::IntegerLiteral => "integer literal",
            TokenKind::FloatLiteral => "float literal",
            TokenKind::StringLiteral => "string literal",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Assign => "assignment",
            TokenKind::Comparison => "comparison",
            TokenKind::Logical => "logical",
            TokenKind::Increment => "increment",
            TokenKind::Bitwise => "bitwise",
            TokenKind::OpenParen => "(",
            TokenKind::CloseParen => ")",
            TokenKind::OpenBrace => "{",
            TokenKind::CloseBrace => "}",
            TokenKind::OpenBracket => "[",
            TokenKind::CloseBracket => "]",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Arrow => "->",
            TokenKind::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteLocation {
    Start,
    End,
    Left,
    Right,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BondType {
    Covalent,
    Ionic,
    Weak,
}

impl std::fmt::Display for BondType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BondType::Covalent => write!(f, "covalent"),
            BondType::Ionic => write!(f, "ionic"),
            BondType::Weak => write!(f, "weak"),
        }
    }
}

/// A place on a token where one partner can attach.
///
/// `occupant` is the single source of truth for occupancy, so the flag and the
/// occupant id cannot disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondSite {
    pub location: SiteLocation,
    /// Classes allowed to occupy this site; empty accepts anything.
    pub accepts: Vec<TokenClass>,
    occupant: Option<TokenId>,
}

impl BondSite {
    pub fn new(location: SiteLocation) -> Self {
        Self { location, accepts: Vec::new(), occupant: None }
    }

    pub fn accepting(location: SiteLocation, classes: &[TokenClass]) -> Self {
        Self { location, accepts: classes.to_vec(), occupant: None }
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    pub fn occupant(&self) -> Option<TokenId> {
        self.occupant
    }

    pub fn accepts_class(&self, class: TokenClass) -> bool {
        self.accepts.is_empty() || self.accepts.contains(&class)
    }

    pub(crate) fn occupy(&mut self, id: TokenId) {
        self.occupant = Some(id);
    }

    pub(crate) fn vacate(&mut self) {
        self.occupant = None;
    }
}

/// One side of a bond as recorded on a token.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bond {
    pub strength: f64,
    pub kind: BondType,
    pub formed_tick: u64,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub id: TokenId,
    pub kind: TokenKind,
    pub value: String,
    pub mass: u32,
    pub energy: i64,
    damage: f64,
    pub active: bool,
    bonds: BTreeMap<TokenId, Bond>,
    sites: Vec<BondSite>,
    chain: Option<ChainId>,
}

impl Token {
    pub fn new(id: TokenId, value: &str, energy: i64) -> Self {
        let kind = TokenKind::classify(value);
        Self {
            id,
            kind,
            value: value.to_string(),
            mass: value.chars().count() as u32,
            energy,
            damage: 0.0,
            active: true,
            bonds: BTreeMap::new(),
            sites: kind.default_sites(),
            chain: None,
        }
    }

    /// Replaces the bond sites with `capacity` unrestricted internal sites.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.sites = (0..capacity).map(|_| BondSite::new(SiteLocation::Internal)).collect();
        self
    }

    pub fn with_damage(mut self, damage: f64) -> Self {
        self.set_damage(damage);
        self
    }

    pub fn class(&self) -> TokenClass {
        self.kind.class()
    }

    pub fn damage(&self) -> f64 {
        self.damage
    }

    pub fn set_damage(&mut self, damage: f64) {
        self.damage = if damage.is_finite() { damage.clamp(0.0, 1.0) } else { 1.0 };
    }

    /// Energy usable for bonding; negative balances count as none.
    pub fn available_energy(&self) -> i64 {
        self.energy.max(0)
    }

    /// Damage can scramble type recognition; the token then reads as unknown.
    pub fn corrupt_kind(&mut self) {
        self.kind = TokenKind::Unknown;
    }

    pub fn restore_kind(&mut self) {
        self.kind = TokenKind::classify(&self.value);
    }

    pub fn chain(&self) -> Option<ChainId> {
        self.chain
    }

    pub(crate) fn set_chain(&mut self, chain: Option<ChainId>) {
        self.chain = chain;
    }

    pub fn sites(&self) -> &[BondSite] {
        &self.sites
    }

    pub fn bonding_capacity(&self) -> usize {
        self.sites.len()
    }

    pub fn free_sites(&self) -> usize {
        self.sites.iter().filter(|s| !s.is_occupied()).count()
    }

    pub fn has_free_capacity(&self) -> bool {
        self.free_sites() > 0
    }

    /// Fraction of bond sites in use. A token without sites reads as fully used.
    pub fn site_utilization(&self) -> f64 {
        if self.sites.is_empty() {
            return 1.0;
        }
        (self.sites.len() - self.free_sites()) as f64 / self.sites.len() as f64
    }

    /// First free site willing to take a partner of `class`.
    pub fn free_site_for(&self, class: TokenClass) -> Option<usize> {
        self.sites
            .iter()
            .position(|s| !s.is_occupied() && s.accepts_class(class))
    }

    pub fn bonded_tokens(&self) -> impl Iterator<Item = TokenId> + '_ {
        self.bonds.keys().copied()
    }

    pub fn bonds(&self) -> &BTreeMap<TokenId, Bond> {
        &self.bonds
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_bonded_to(&self, other: TokenId) -> bool {
        self.bonds.contains_key(&other)
    }

    pub fn bond_with(&self, other: TokenId) -> Option<&Bond> {
        self.bonds.get(&other)
    }

    /// Records one side of a bond and claims a site. Callers keep the partner in step.
    pub(crate) fn attach(&mut self, partner: TokenId, partner_class: TokenClass, bond: Bond) -> bool {
        if partner == self.id || self.bonds.contains_key(&partner) {
            return false;
        }
        let Some(slot) = self.free_site_for(partner_class) else {
            return false;
        };
        self.sites[slot].occupy(partner);
        self.bonds.insert(partner, bond);
        true
    }

    /// Removes one side of a bond and frees the site it held.
    pub(crate) fn detach(&mut self, partner: TokenId) -> Option<Bond> {
        let bond = self.bonds.remove(&partner)?;
        if let Some(site) = self.sites.iter_mut().find(|s| s.occupant() == Some(partner)) {
            site.vacate();
        }
        Some(bond)
    }

    /// Reassembles a token from stored parts. Site occupants must match the bond
    /// partners one to one; returns None otherwise.
    pub(crate) fn from_parts(
        mut base: Token,
        sites: Vec<BondSite>,
        bonds: BTreeMap<TokenId, Bond>,
        chain: Option<ChainId>,
    ) -> Option<Token> {
        let occupants: Vec<TokenId> = sites.iter().filter_map(|s| s.occupant()).collect();
        let distinct: std::collections::BTreeSet<TokenId> = occupants.iter().copied().collect();
        if distinct.len() != occupants.len()
            || occupants.len() != bonds.len()
            || !occupants.iter().all(|o| bonds.contains_key(o))
        {
            return None;
        }
        base.sites = sites;
        base.bonds = bonds;
        base.chain = chain;
        Some(base)
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Token#{}('{}' {}, energy={}, mass={}, damage={:.2})",
            self.id, self.value, self.kind, self.energy, self.mass, self.damage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_covers_each_family() {
        assert_eq!(TokenKind::classify("while"), TokenKind::ControlKeyword);
        assert_eq!(TokenKind::classify("int"), TokenKind::TypeKeyword);
        assert_eq!(TokenKind::classify("count"), TokenKind::Identifier);
        assert_eq!(TokenKind::classify("_tmp1"), TokenKind::Identifier);
        assert_eq!(TokenKind::classify("100"), TokenKind::IntegerLiteral);
        assert_eq!(TokenKind::classify("0xFF"), TokenKind::IntegerLiteral);
        assert_eq!(TokenKind::classify("2.5"), TokenKind::FloatLiteral);
        assert_eq!(TokenKind::classify("\"hi\""), TokenKind::StringLiteral);
        assert_eq!(TokenKind::classify("+"), TokenKind::Plus);
        assert_eq!(TokenKind::classify("+="), TokenKind::Assign);
        assert_eq!(TokenKind::classify("<="), TokenKind::Comparison);
        assert_eq!(TokenKind::classify("->"), TokenKind::Arrow);
        assert_eq!(TokenKind::classify("@"), TokenKind::Unknown);
    }

    #[test]
    fn mass_is_value_length() {
        assert_eq!(Token::new(1, "while", 0).mass, 5);
        assert_eq!(Token::new(2, "+", 0).mass, 1);
    }

    #[test]
    fn attach_and_detach_keep_sites_in_step() {
        let mut t = Token::new(1, "x", 50);
        let bond = Bond { strength: 0.8, kind: BondType::Covalent, formed_tick: 0 };
        assert!(t.attach(2, TokenClass::Operator, bond));
        assert!(!t.attach(2, TokenClass::Operator, bond), "duplicate bond");
        assert!(!t.attach(1, TokenClass::Identifier, bond), "self bond");
        assert_eq!(t.free_sites(), 1);
        assert!(t.sites().iter().any(|s| s.occupant() == Some(2) && s.is_occupied()));
        assert!(t.detach(2).is_some());
        assert_eq!(t.free_sites(), 2);
        assert!(t.sites().iter().all(|s| !s.is_occupied() && s.occupant().is_none()));
    }

    #[test]
    fn operator_sites_reject_operators() {
        let t = Token::new(1, "+", 50);
        assert!(t.free_site_for(TokenClass::Operator).is_none());
        assert!(t.free_site_for(TokenClass::Literal).is_some());
    }

    #[test]
    fn zero_capacity_reads_as_saturated() {
        let t = Token::new(1, "x", 50).with_capacity(0);
        assert_eq!(t.bonding_capacity(), 0);
        assert!(!t.has_free_capacity());
        assert_eq!(t.site_utilization(), 1.0);
    }

    #[test]
    fn corrupt_and_restore_kind() {
        let mut t = Token::new(1, "for", 10);
        t.corrupt_kind();
        assert_eq!(t.kind, TokenKind::Unknown);
        t.restore_kind();
        assert_eq!(t.kind, TokenKind::ControlKeyword);
    }
}
