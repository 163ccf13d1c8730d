//! Id-indexed token storage and breadth-first traversal over bonds.
//!
//! Tokens live in one table keyed by id; bonds refer to partners by id only, so
//! cycles in the bond graph never create ownership cycles. Every traversal uses an
//! explicit queue and a visited set, which keeps cyclic molecules finite.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::core::token::{Token, TokenId};

/// Monotonic id source handed to whoever creates tokens or chains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Ensures future ids are above `id` (used when restoring existing ids).
    pub fn reserve(&mut self, id: u64) {
        if id >= self.next {
            self.next = id + 1;
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::starting_at(1)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TokenArena {
    tokens: BTreeMap<TokenId, Token>,
    ids: IdAllocator,
}

impl TokenArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_allocator(ids: IdAllocator) -> Self {
        Self { tokens: BTreeMap::new(), ids }
    }

    /// Creates a token from its value with a freshly allocated id.
    pub fn spawn(&mut self, value: &str, energy: i64) -> TokenId {
        self.spawn_with(|id| Token::new(id, value, energy))
    }

    /// Creates a token through `build`, which receives the allocated id.
    pub fn spawn_with(&mut self, build: impl FnOnce(TokenId) -> Token) -> TokenId {
        let id = self.ids.next_id();
        let mut token = build(id);
        token.id = id;
        self.tokens.insert(id, token);
        id
    }

    /// Inserts a token that already carries an id. Returns false on collision.
    pub fn insert(&mut self, token: Token) -> bool {
        if self.tokens.contains_key(&token.id) {
            return false;
        }
        self.ids.reserve(token.id);
        self.tokens.insert(token.id, token);
        true
    }

    /// Removes a token outright. Callers break its bonds first so partners stay consistent.
    pub(crate) fn remove(&mut self, id: TokenId) -> Option<Token> {
        self.tokens.remove(&id)
    }

    pub fn get(&self, id: TokenId) -> Option<&Token> {
        self.tokens.get(&id)
    }

    pub fn get_mut(&mut self, id: TokenId) -> Option<&mut Token> {
        self.tokens.get_mut(&id)
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.tokens.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Token> {
        self.tokens.values_mut()
    }

    pub fn ids(&self) -> Vec<TokenId> {
        self.tokens.keys().copied().collect()
    }

    pub fn allocator(&self) -> &IdAllocator {
        &self.ids
    }

    /// Tokens reachable from `start` over bonds, in breadth-first order.
    pub fn component(&self, start: TokenId) -> Vec<TokenId> {
        let mut order = Vec::new();
        if !self.contains(start) {
            return order;
        }
        let mut visited: BTreeSet<TokenId> = BTreeSet::new();
        let mut queue: VecDeque<TokenId> = VecDeque::from([start]);
        visited.insert(start);
        while let Some(id) = queue.pop_front() {
            order.push(id);
            let Some(token) = self.tokens.get(&id) else {
                continue;
            };
            for next in token.bonded_tokens() {
                if self.contains(next) && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        order
    }

    /// Breadth-first reachability; stops as soon as `to` is seen.
    pub fn connected(&self, from: TokenId, to: TokenId) -> bool {
        if !self.contains(from) || !self.contains(to) {
            return false;
        }
        if from == to {
            return true;
        }
        let mut visited: BTreeSet<TokenId> = BTreeSet::from([from]);
        let mut queue: VecDeque<TokenId> = VecDeque::from([from]);
        while let Some(id) = queue.pop_front() {
            let Some(token) = self.tokens.get(&id) else {
                continue;
            };
            for next in token.bonded_tokens() {
                if next == to {
                    return true;
                }
                if self.contains(next) && visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        false
    }

    /// Checks the symmetry invariant for every bond; returns the offending pairs.
    pub fn asymmetric_bonds(&self) -> Vec<(TokenId, TokenId)> {
        let mut bad = Vec::new();
        for token in self.tokens.values() {
            for other in token.bonded_tokens() {
                let mirrored = self
                    .tokens
                    .get(&other)
                    .map(|o| o.is_bonded_to(token.id))
                    .unwrap_or(false);
                if other == token.id || !mirrored {
                    bad.push((token.id, other));
                }
            }
        }
        bad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::token::{Bond, BondType};

    fn link(arena: &mut TokenArena, a: TokenId, b: TokenId) {
        let bond = Bond { strength: 0.5, kind: BondType::Weak, formed_tick: 0 };
        let (ca, cb) = (arena.get(a).unwrap().class(), arena.get(b).unwrap().class());
        assert!(arena.get_mut(a).unwrap().attach(b, cb, bond));
        assert!(arena.get_mut(b).unwrap().attach(a, ca, bond));
    }

    #[test]
    fn allocator_is_explicit_and_monotonic() {
        let mut ids = IdAllocator::starting_at(10);
        assert_eq!(ids.next_id(), 10);
        assert_eq!(ids.next_id(), 11);
        ids.reserve(40);
        assert_eq!(ids.next_id(), 41);
    }

    #[test]
    fn component_terminates_on_cycles() {
        let mut arena = TokenArena::new();
        let a = arena.spawn_with(|id| Token::new(id, "a", 10).with_capacity(2));
        let b = arena.spawn_with(|id| Token::new(id, "b", 10).with_capacity(2));
        let c = arena.spawn_with(|id| Token::new(id, "c", 10).with_capacity(2));
        link(&mut arena, a, b);
        link(&mut arena, b, c);
        link(&mut arena, c, a);
        assert_eq!(arena.component(a), vec![a, b, c]);
        assert!(arena.connected(a, c));
        assert!(arena.asymmetric_bonds().is_empty());
    }

    #[test]
    fn disconnected_tokens_are_not_reachable() {
        let mut arena = TokenArena::new();
        let a = arena.spawn("x", 10);
        let b = arena.spawn("y", 10);
        assert!(!arena.connected(a, b));
        assert_eq!(arena.component(b), vec![b]);
        assert!(!arena.connected(a, 999));
    }
}
