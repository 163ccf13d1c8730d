//! Per-kind attraction values (0.0–1.0) and the bond character they imply.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::core::token::{BondType, TokenKind};

/// Differences below this bond covalently.
pub const COVALENT_LIMIT: f64 = 0.2;
/// Differences below this (and at or above `COVALENT_LIMIT`) bond ionically.
pub const IONIC_LIMIT: f64 = 0.5;

static TABLE: Lazy<HashMap<TokenKind, f64>> = Lazy::new(|| {
    use TokenKind::*;
    HashMap::from([
        (ControlKeyword, 0.85),
        (TypeKeyword, 0.80),
        (Identifier, 0.50),
        (IntegerLiteral, 0.45),
        (FloatLiteral, 0.45),
        (StringLiteral, 0.40),
        (Plus, 0.60),
        (Minus, 0.60),
        (Star, 0.62),
        (Slash, 0.62),
        (Percent, 0.62),
        (Assign, 0.70),
        (Comparison, 0.65),
        (Logical, 0.68),
        (Increment, 0.55),
        (Bitwise, 0.60),
        (OpenParen, 0.90),
        (CloseParen, 0.90),
        (OpenBrace, 0.92),
        (CloseBrace, 0.92),
        (OpenBracket, 0.88),
        (CloseBracket, 0.88),
        (Semicolon, 0.95),
        (Comma, 0.75),
        (Dot, 0.70),
        (Arrow, 0.72),
        (Unknown, 0.10),
    ])
});

pub fn electronegativity(kind: TokenKind) -> f64 {
    TABLE.get(&kind).copied().unwrap_or(0.0)
}

pub fn difference(a: TokenKind, b: TokenKind) -> f64 {
    (electronegativity(a) - electronegativity(b)).abs()
}

/// Small difference → covalent, medium → ionic, large → weak.
pub fn classify_difference(diff: f64) -> BondType {
    if diff < COVALENT_LIMIT {
        BondType::Covalent
    } else if diff < IONIC_LIMIT {
        BondType::Ionic
    } else {
        BondType::Weak
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_value_is_in_unit_range() {
        for v in TABLE.values() {
            assert!((0.0..=1.0).contains(v));
        }
    }

    #[test]
    fn classification_bands() {
        assert_eq!(classify_difference(0.0), BondType::Covalent);
        assert_eq!(classify_difference(0.3), BondType::Ionic);
        assert_eq!(classify_difference(0.85), BondType::Weak);
    }

    #[test]
    fn difference_is_symmetric() {
        let d1 = difference(TokenKind::Semicolon, TokenKind::Identifier);
        let d2 = difference(TokenKind::Identifier, TokenKind::Semicolon);
        assert_eq!(d1, d2);
        assert!((d1 - 0.45).abs() < 1e-9);
    }
}
