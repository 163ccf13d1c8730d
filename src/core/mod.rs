//! Core module tree for the bonding engine.

#[macro_use]
pub mod debug; // gated debug logging (TOKENBOND_DEBUG=1) provides debug_log! macro

pub mod arena;
pub mod bonding;
pub mod chain;
pub mod compatibility;
pub mod electronegativity;
pub mod error;
pub mod grammar;
pub mod reactor;
pub mod registry;
pub mod shared;
pub mod snapshot;
pub mod stability;
pub mod strength;
pub mod token;

pub use error::CoreError;
pub use reactor::Reactor;
pub use shared::SharedReactor;
pub use token::{Token, TokenId, TokenKind};
