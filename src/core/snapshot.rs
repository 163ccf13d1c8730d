//! Serializable world state and its validated restoration.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::arena::{IdAllocator, TokenArena};
use crate::core::chain::Chain;
use crate::core::error::CoreError;
use crate::core::registry::{ChainRegistry, RegistryParams};
use crate::core::token::{Bond, BondSite, ChainId, Token, TokenId, TokenKind};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BondRecord {
    pub partner: TokenId,
    #[serde(flatten)]
    pub bond: Bond,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: TokenId,
    pub value: String,
    pub kind: TokenKind,
    pub mass: u32,
    pub energy: i64,
    pub damage: f64,
    pub active: bool,
    pub chain: Option<ChainId>,
    pub sites: Vec<BondSite>,
    pub bonds: Vec<BondRecord>,
}

impl TokenRecord {
    pub fn from_token(t: &Token) -> Self {
        Self {
            id: t.id,
            value: t.value.clone(),
            kind: t.kind,
            mass: t.mass,
            energy: t.energy,
            damage: t.damage(),
            active: t.active,
            chain: t.chain(),
            sites: t.sites().to_vec(),
            bonds: t
                .bonds()
                .iter()
                .map(|(partner, bond)| BondRecord { partner: *partner, bond: *bond })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainRecord {
    pub id: ChainId,
    pub members: Vec<TokenId>,
    pub length: usize,
    pub code: String,
    pub total_mass: u64,
    pub total_energy: i64,
    pub avg_bond_strength: f64,
    pub is_valid: bool,
    pub stability: f64,
    pub created_tick: u64,
    pub last_modified_tick: u64,
    pub last_validated_tick: u64,
}

impl ChainRecord {
    pub fn from_chain(c: &Chain, tokens: &TokenArena) -> Self {
        Self {
            id: c.id,
            members: c.members().to_vec(),
            length: c.length(),
            code: c.code_string(tokens),
            total_mass: c.total_mass(),
            total_energy: c.total_energy(),
            avg_bond_strength: c.avg_bond_strength,
            is_valid: c.is_valid,
            stability: c.stability,
            created_tick: c.created_tick,
            last_modified_tick: c.last_modified_tick,
            last_validated_tick: c.last_validated_tick,
        }
    }
}

/// Everything needed to rebuild the engine state at a given tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub version: u32,
    pub tick: u64,
    pub next_token_id: u64,
    pub next_chain_id: u64,
    pub tokens: Vec<TokenRecord>,
    pub chains: Vec<ChainRecord>,
    #[serde(default)]
    pub stable: Vec<ChainId>,
}

impl WorldSnapshot {
    pub fn capture(tokens: &TokenArena, chains: &ChainRegistry, tick: u64) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            tick,
            next_token_id: tokens.allocator().peek(),
            next_chain_id: chains.allocator().peek(),
            tokens: tokens.iter().map(TokenRecord::from_token).collect(),
            chains: chains.iter().map(|c| ChainRecord::from_chain(c, tokens)).collect(),
            stable: chains.stable_ids().iter().copied().collect(),
        }
    }

    /// Rebuilds the arena and registry, rejecting any state that breaks bond
    /// symmetry or chain membership.
    pub fn rebuild(&self, params: RegistryParams) -> Result<(TokenArena, ChainRegistry), CoreError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(CoreError::InvalidSnapshot(format!("unsupported version {}", self.version)));
        }

        let mut arena = TokenArena::with_allocator(IdAllocator::starting_at(self.next_token_id.max(1)));
        for rec in &self.tokens {
            let mut bonds = BTreeMap::new();
            for b in &rec.bonds {
                if b.partner == rec.id {
                    return Err(CoreError::InvalidSnapshot(format!("token {} bonded to itself", rec.id)));
                }
                if bonds.insert(b.partner, b.bond).is_some() {
                    return Err(CoreError::InvalidSnapshot(format!(
                        "token {} lists partner {} twice",
                        rec.id, b.partner
                    )));
                }
            }
            let mut base = Token::new(rec.id, &rec.value, rec.energy).with_damage(rec.damage);
            base.kind = rec.kind;
            base.mass = rec.mass;
            base.active = rec.active;
            let token = Token::from_parts(base, rec.sites.clone(), bonds, rec.chain).ok_or_else(|| {
                CoreError::InvalidSnapshot(format!("token {} sites disagree with its bonds", rec.id))
            })?;
            if !arena.insert(token) {
                return Err(CoreError::InvalidSnapshot(format!("duplicate token id {}", rec.id)));
            }
        }

        for t in arena.iter() {
            for (partner, bond) in t.bonds() {
                let Some(other) = arena.get(*partner) else {
                    return Err(CoreError::UnknownToken(*partner));
                };
                if other.bond_with(t.id) != Some(bond) {
                    return Err(CoreError::InvalidSnapshot(format!(
                        "asymmetric bond {}-{}",
                        t.id, partner
                    )));
                }
            }
        }

        let mut registry =
            ChainRegistry::with_allocator(IdAllocator::starting_at(self.next_chain_id.max(1)), params);
        let mut claimed: BTreeSet<TokenId> = BTreeSet::new();
        for rec in &self.chains {
            if rec.members.is_empty() {
                return Err(CoreError::InvalidSnapshot(format!("chain {} has no members", rec.id)));
            }
            if registry.contains(rec.id) {
                return Err(CoreError::InvalidSnapshot(format!("duplicate chain id {}", rec.id)));
            }
            for m in &rec.members {
                let Some(t) = arena.get(*m) else {
                    return Err(CoreError::UnknownToken(*m));
                };
                if t.chain() != Some(rec.id) || !claimed.insert(*m) {
                    return Err(CoreError::InvalidSnapshot(format!(
                        "token {} membership disagrees with chain {}",
                        m, rec.id
                    )));
                }
            }
            let mut chain = Chain::new(rec.id, rec.members.clone(), &arena, rec.created_tick);
            chain.is_valid = rec.is_valid;
            chain.stability = rec.stability;
            chain.last_modified_tick = rec.last_modified_tick;
            chain.last_validated_tick = rec.last_validated_tick;
            registry.register_chain(chain);
        }

        for t in arena.iter() {
            match t.chain() {
                Some(c) if !claimed.contains(&t.id) => {
                    return Err(CoreError::InvalidSnapshot(format!(
                        "token {} points at chain {} which does not list it",
                        t.id, c
                    )));
                }
                None if t.bond_count() > 0 => {
                    return Err(CoreError::InvalidSnapshot(format!("bonded token {} has no chain", t.id)));
                }
                _ => {}
            }
        }
        for id in &self.stable {
            registry.mark_stable(*id);
        }
        Ok((arena, registry))
    }
}
