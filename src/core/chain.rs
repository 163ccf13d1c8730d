//! A chain is one connected molecule of bonded tokens.
//!
//! Membership and the aggregates derived from it (mass, energy, average bond
//! strength) only change together: every mutating method ends in `refresh`.

use std::collections::BTreeSet;

use crate::core::arena::TokenArena;
use crate::core::token::{ChainId, Token, TokenClass, TokenId};

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub id: ChainId,
    members: Vec<TokenId>,
    total_mass: u64,
    total_energy: i64,
    pub avg_bond_strength: f64,
    pub is_valid: bool,
    pub stability: f64,
    pub created_tick: u64,
    pub last_modified_tick: u64,
    pub last_validated_tick: u64,
}

impl Chain {
    /// Builds a chain over `members` (duplicates and unknown ids dropped) and
    /// computes its aggregates.
    pub fn new(id: ChainId, members: Vec<TokenId>, tokens: &TokenArena, tick: u64) -> Self {
        let mut chain = Chain {
            id,
            members: Vec::new(),
            total_mass: 0,
            total_energy: 0,
            avg_bond_strength: 0.0,
            is_valid: false,
            stability: 0.0,
            created_tick: tick,
            last_modified_tick: tick,
            last_validated_tick: tick,
        };
        chain.replace_members(members, tokens, tick);
        chain
    }

    pub fn members(&self) -> &[TokenId] {
        &self.members
    }

    pub fn head(&self) -> Option<TokenId> {
        self.members.first().copied()
    }

    pub fn tail(&self) -> Option<TokenId> {
        self.members.last().copied()
    }

    pub fn length(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: TokenId) -> bool {
        self.members.contains(&id)
    }

    pub fn total_mass(&self) -> u64 {
        self.total_mass
    }

    pub fn total_energy(&self) -> i64 {
        self.total_energy
    }

    pub fn age(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.created_tick)
    }

    pub fn idle_for(&self, tick: u64) -> u64 {
        tick.saturating_sub(self.last_modified_tick)
    }

    pub(crate) fn push(&mut self, id: TokenId, tokens: &TokenArena, tick: u64) {
        if !self.members.contains(&id) {
            self.members.push(id);
        }
        self.touch(tick);
        self.refresh(tokens);
    }

    /// Appends the other chain's members after ours.
    pub(crate) fn absorb(&mut self, other: &Chain, tokens: &TokenArena, tick: u64) {
        for id in &other.members {
            if !self.members.contains(id) {
                self.members.push(*id);
            }
        }
        self.created_tick = self.created_tick.min(other.created_tick);
        self.touch(tick);
        self.refresh(tokens);
    }

    pub(crate) fn replace_members(&mut self, members: Vec<TokenId>, tokens: &TokenArena, tick: u64) {
        let mut seen = BTreeSet::new();
        self.members = members
            .into_iter()
            .filter(|id| tokens.contains(*id) && seen.insert(*id))
            .collect();
        self.touch(tick);
        self.refresh(tokens);
    }

    pub(crate) fn remove_member(&mut self, id: TokenId, tokens: &TokenArena, tick: u64) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != id);
        let removed = self.members.len() != before;
        if removed {
            self.touch(tick);
            self.refresh(tokens);
        }
        removed
    }

    pub(crate) fn touch(&mut self, tick: u64) {
        self.last_modified_tick = self.last_modified_tick.max(tick);
    }

    /// Recomputes aggregates from the member list, dropping ids that no longer exist.
    pub fn refresh(&mut self, tokens: &TokenArena) {
        self.members.retain(|id| tokens.contains(*id));
        let mut mass = 0u64;
        let mut energy = 0i64;
        for t in self.members.iter().filter_map(|id| tokens.get(*id)) {
            mass += u64::from(t.mass);
            energy += t.energy;
        }
        self.total_mass = mass;
        self.total_energy = energy;
        self.avg_bond_strength = self.measure_bond_strength(tokens);
    }

    /// Mean strength over bonds whose both ends are members, each bond counted once.
    pub fn measure_bond_strength(&self, tokens: &TokenArena) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for t in self.tokens(tokens) {
            for (partner, bond) in t.bonds() {
                if *partner > t.id && self.contains(*partner) {
                    sum += bond.strength;
                    count += 1;
                }
            }
        }
        if count == 0 { 0.0 } else { sum / count as f64 }
    }

    pub fn internal_bond_count(&self, tokens: &TokenArena) -> usize {
        self.tokens(tokens)
            .iter()
            .map(|t| t.bonded_tokens().filter(|p| *p > t.id && self.contains(*p)).count())
            .sum()
    }

    pub fn average_damage(&self, tokens: &TokenArena) -> f64 {
        let members = self.tokens(tokens);
        if members.is_empty() {
            return 0.0;
        }
        members.iter().map(|t| t.damage()).sum::<f64>() / members.len() as f64
    }

    pub fn tokens<'a>(&self, arena: &'a TokenArena) -> Vec<&'a Token> {
        self.members.iter().filter_map(|id| arena.get(*id)).collect()
    }

    /// `=` members whose next member is punctuation: assignments with no value yet.
    pub fn value_gaps(&self, tokens: &TokenArena) -> Vec<TokenId> {
        self.tokens(tokens)
            .windows(2)
            .filter(|w| w[0].value == "=" && w[1].class() == TokenClass::Punctuation)
            .map(|w| w[0].id)
            .collect()
    }

    pub fn code_string(&self, tokens: &TokenArena) -> String {
        self.tokens(tokens)
            .iter()
            .map(|t| t.value.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
