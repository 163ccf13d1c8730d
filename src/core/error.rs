use std::fmt;

use crate::core::token::TokenId;

/// Failures that can only arise at the edges of the engine: rule loading and
/// snapshot restoration. Bonding and stability queries never produce these.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    InvalidRule(String),
    InvalidSnapshot(String),
    UnknownToken(TokenId),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidRule(msg) => write!(f, "Invalid Rule: {}", msg),
            CoreError::InvalidSnapshot(msg) => write!(f, "Invalid Snapshot: {}", msg),
            CoreError::UnknownToken(id) => write!(f, "Unknown Token: #{}", id),
        }
    }
}

impl std::error::Error for CoreError {}

impl CoreError {
    pub fn invalid_rule(message: &str) -> Self { CoreError::InvalidRule(message.to_string()) }
    pub fn invalid_snapshot(message: &str) -> Self { CoreError::InvalidSnapshot(message.to_string()) }
}
