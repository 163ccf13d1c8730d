//! The set of live chains, the stable subset, extinction and stale pruning.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::core::arena::{IdAllocator, TokenArena};
use crate::core::chain::Chain;
use crate::core::stability::StabilityModel;
use crate::core::token::{ChainId, TokenId};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryParams {
    /// Minimum age (ticks since creation) for the stable subset.
    pub stable_age: u64,
    /// Minimum stability for the stable subset; also shields chains from stale pruning.
    pub stable_threshold: f64,
    /// Chains below this after a stability update go extinct.
    pub extinction_threshold: f64,
}

impl Default for RegistryParams {
    fn default() -> Self {
        Self { stable_age: 50, stable_threshold: 0.5, extinction_threshold: 0.2 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainStatistics {
    pub total_chains: usize,
    pub stable_chains: usize,
    pub valid_chains: usize,
    pub chained_tokens: usize,
    pub total_bonds: usize,
    pub longest_chain: usize,
    pub average_length: f64,
    pub average_stability: f64,
    pub average_bond_strength: f64,
    pub total_mass: u64,
    pub total_energy: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<ChainId, Chain>,
    stable: BTreeSet<ChainId>,
    ids: IdAllocator,
    params: RegistryParams,
}

impl ChainRegistry {
    pub fn new(params: RegistryParams) -> Self {
        Self::with_allocator(IdAllocator::default(), params)
    }

    pub fn with_allocator(ids: IdAllocator, params: RegistryParams) -> Self {
        Self { chains: BTreeMap::new(), stable: BTreeSet::new(), ids, params }
    }

    pub fn params(&self) -> &RegistryParams {
        &self.params
    }

    pub fn allocator(&self) -> &IdAllocator {
        &self.ids
    }

    /// Inserts a fully built chain under its own id, replacing any previous holder.
    pub fn register_chain(&mut self, chain: Chain) -> ChainId {
        let id = chain.id;
        self.ids.reserve(id);
        self.stable.remove(&id);
        self.chains.insert(id, chain);
        id
    }

    /// Allocates an id, builds the chain and points every member at it.
    pub fn create_chain(&mut self, members: Vec<TokenId>, tokens: &mut TokenArena, tick: u64) -> ChainId {
        let id = self.ids.next_id();
        let chain = Chain::new(id, members, tokens, tick);
        for m in chain.members() {
            if let Some(t) = tokens.get_mut(*m) {
                t.set_chain(Some(id));
            }
        }
        self.chains.insert(id, chain);
        id
    }

    pub fn get_chain(&self, id: ChainId) -> Option<&Chain> {
        self.chains.get(&id)
    }

    pub(crate) fn get_chain_mut(&mut self, id: ChainId) -> Option<&mut Chain> {
        self.chains.get_mut(&id)
    }

    /// Recomputes one chain's aggregates after its members changed outside bonding.
    pub(crate) fn refresh_chain(&mut self, id: ChainId, tokens: &TokenArena) {
        if let Some(chain) = self.chains.get_mut(&id) {
            chain.refresh(tokens);
        }
    }

    pub(crate) fn refresh_all(&mut self, tokens: &TokenArena) {
        for chain in self.chains.values_mut() {
            chain.refresh(tokens);
        }
    }

    pub fn contains(&self, id: ChainId) -> bool {
        self.chains.contains_key(&id)
    }

    /// Drops the chain from both the full set and the stable subset. Tokens are untouched.
    pub fn remove_chain(&mut self, id: ChainId) -> Option<Chain> {
        self.stable.remove(&id);
        self.chains.remove(&id)
    }

    /// Removes the chain and lets the molecule fall apart: internal bonds break and
    /// members become free tokens again.
    pub fn dissolve_chain(&mut self, id: ChainId, tokens: &mut TokenArena) -> Option<Chain> {
        let chain = self.remove_chain(id)?;
        for m in chain.members() {
            let partners: Vec<TokenId> = tokens
                .get(*m)
                .map(|t| t.bonded_tokens().filter(|p| chain.contains(*p)).collect())
                .unwrap_or_default();
            for p in partners {
                if let Some(t) = tokens.get_mut(*m) {
                    t.detach(p);
                }
                if let Some(t) = tokens.get_mut(p) {
                    t.detach(*m);
                }
            }
            if let Some(t) = tokens.get_mut(*m) {
                if t.chain() == Some(id) {
                    t.set_chain(None);
                }
            }
        }
        Some(chain)
    }

    /// Recomputes every chain's stability, refreshes the stable subset, and
    /// dissolves empty chains and chains under the extinction threshold.
    pub fn update_all_stabilities(
        &mut self,
        model: &StabilityModel,
        tokens: &mut TokenArena,
        tick: u64,
    ) -> Vec<ChainId> {
        let mut extinct = Vec::new();
        for (id, chain) in self.chains.iter_mut() {
            chain.refresh(tokens);
            chain.stability = model.calculate_stability(chain, tokens, tick);
            if chain.is_empty() || chain.stability < self.params.extinction_threshold {
                extinct.push(*id);
                continue;
            }
            if chain.age(tick) >= self.params.stable_age
                && chain.stability >= self.params.stable_threshold
            {
                self.stable.insert(*id);
            } else {
                self.stable.remove(id);
            }
        }
        for id in &extinct {
            if let Some(chain) = self.dissolve_chain(*id, tokens) {
                debug_log!("chain {} extinct (stability {:.3}, length {})", id, chain.stability, chain.length());
            }
        }
        extinct
    }

    /// Dissolves chains untouched for more than `max_age` ticks whose stability is
    /// below the stable threshold.
    pub fn prune_stale_chains(&mut self, tokens: &mut TokenArena, tick: u64, max_age: u64) -> Vec<ChainId> {
        let stale: Vec<ChainId> = self
            .chains
            .values()
            .filter(|c| c.idle_for(tick) > max_age && c.stability < self.params.stable_threshold)
            .map(|c| c.id)
            .collect();
        for id in &stale {
            debug_log!("chain {} pruned as stale", id);
            self.dissolve_chain(*id, tokens);
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn ids(&self) -> Vec<ChainId> {
        self.chains.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chain> {
        self.chains.values()
    }

    pub fn all_chains(&self) -> Vec<&Chain> {
        self.chains.values().collect()
    }

    /// Highest stability first; ties by id.
    pub fn chains_by_stability(&self) -> Vec<&Chain> {
        let mut out: Vec<&Chain> = self.chains.values().collect();
        out.sort_by(|a, b| {
            b.stability
                .partial_cmp(&a.stability)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        out
    }

    pub fn stable_chains(&self) -> Vec<&Chain> {
        self.stable.iter().filter_map(|id| self.chains.get(id)).collect()
    }

    pub fn stable_ids(&self) -> &BTreeSet<ChainId> {
        &self.stable
    }

    pub fn is_stable(&self, id: ChainId) -> bool {
        self.stable.contains(&id)
    }

    pub(crate) fn mark_stable(&mut self, id: ChainId) {
        if self.chains.contains_key(&id) {
            self.stable.insert(id);
        }
    }

    pub fn longest_chain(&self) -> Option<&Chain> {
        self.chains
            .values()
            .fold(None, |best: Option<&Chain>, c| match best {
                Some(b) if b.length() >= c.length() => Some(b),
                _ => Some(c),
            })
    }

    pub fn most_stable_chain(&self) -> Option<&Chain> {
        self.chains_by_stability().into_iter().next()
    }

    pub fn statistics(&self, tokens: &TokenArena) -> ChainStatistics {
        let total = self.chains.len();
        let mut stats = ChainStatistics {
            total_chains: total,
            stable_chains: self.stable.len(),
            ..ChainStatistics::default()
        };
        if total == 0 {
            return stats;
        }
        let mut stability_sum = 0.0;
        let mut strength_sum = 0.0;
        for c in self.chains.values() {
            if c.is_valid {
                stats.valid_chains += 1;
            }
            stats.chained_tokens += c.length();
            stats.total_bonds += c.internal_bond_count(tokens);
            stats.longest_chain = stats.longest_chain.max(c.length());
            stats.total_mass += c.total_mass();
            stats.total_energy += c.total_energy();
            stability_sum += c.stability;
            strength_sum += c.avg_bond_strength;
        }
        stats.average_length = stats.chained_tokens as f64 / total as f64;
        stats.average_stability = stability_sum / total as f64;
        stats.average_bond_strength = strength_sum / total as f64;
        stats
    }
}
