//! Bond formation and breaking, and the chain bookkeeping that follows them.
//!
//! Every mutation here keeps three things in step: the bond records on both
//! partners, each token's chain reference, and the member lists in the registry.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::core::arena::TokenArena;
use crate::core::compatibility::CompatibilityEngine;
use crate::core::registry::ChainRegistry;
use crate::core::strength::BondStrengthModel;
use crate::core::token::{Bond, ChainId, TokenId};

/// Running counters for the bonding layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BondingStats {
    pub attempts: u64,
    pub formed: u64,
    pub broken: u64,
    pub merges: u64,
    pub splits: u64,
}

/// What a bond break did to the chain holding it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BreakOutcome {
    NotBonded,
    /// Bond removed; partners still connected (or never chained).
    Kept(Option<ChainId>),
    /// Partners now in separate molecules: the original chain keeps the first
    /// partner's side, the rest went to freshly created chains.
    Split { kept: ChainId, created: Vec<ChainId> },
}

#[derive(Debug, Clone)]
pub struct BondingManager {
    strength: BondStrengthModel,
    stats: BondingStats,
}

impl BondingManager {
    pub fn new(strength: BondStrengthModel) -> Self {
        Self { strength, stats: BondingStats::default() }
    }

    pub fn strength_model(&self) -> &BondStrengthModel {
        &self.strength
    }

    pub fn compatibility(&self) -> &CompatibilityEngine {
        self.strength.compatibility()
    }

    pub fn stats(&self) -> BondingStats {
        self.stats
    }

    /// Tries to bond `a` and `b` at `tick`. Returns false without touching
    /// anything when a guard rejects the pair.
    pub fn attempt_bond(
        &mut self,
        tokens: &mut TokenArena,
        chains: &mut ChainRegistry,
        a: TokenId,
        b: TokenId,
        tick: u64,
    ) -> bool {
        self.stats.attempts += 1;
        let (Some(ta), Some(tb)) = (tokens.get(a), tokens.get(b)) else {
            return false;
        };
        if !ta.active || !tb.active || a == b {
            return false;
        }
        if ta.is_bonded_to(b) || tb.is_bonded_to(a) {
            return false;
        }
        if !self.compatibility().can_bond(ta, tb) {
            return false;
        }
        let strength = self.strength.calculate_bond_strength(ta, tb);
        if strength < self.strength.params().min_strength {
            return false;
        }
        if !self.strength.can_form_bond(ta, tb) {
            return false;
        }
        let cost = self.strength.energy_cost_for(strength).round() as i64;
        let (energy_a, energy_b) = (ta.available_energy(), tb.available_energy());
        if energy_a + energy_b < cost {
            debug_log!("bond {}-{} rejected: needs {} energy, has {}", a, b, cost, energy_a + energy_b);
            return false;
        }
        let (class_a, class_b) = (ta.class(), tb.class());
        if ta.free_site_for(class_b).is_none() || tb.free_site_for(class_a).is_none() {
            return false;
        }
        let kind = self.strength.determine_bond_type(ta, tb);
        let bond = Bond { strength, kind, formed_tick: tick };

        if !tokens.get_mut(a).map(|t| t.attach(b, class_b, bond)).unwrap_or(false) {
            return false;
        }
        if !tokens.get_mut(b).map(|t| t.attach(a, class_a, bond)).unwrap_or(false) {
            if let Some(t) = tokens.get_mut(a) {
                t.detach(b);
            }
            return false;
        }

        let (pay_a, pay_b) = split_cost(cost, energy_a, energy_b);
        if let Some(t) = tokens.get_mut(a) {
            t.energy -= pay_a;
        }
        if let Some(t) = tokens.get_mut(b) {
            t.energy -= pay_b;
        }

        let chain_id = self.link_chains(tokens, chains, a, b, tick);
        let release = self.strength.calculate_bond_energy_release(kind);
        if let Some(chain) = chains.get_chain(chain_id) {
            let members = chain.members().to_vec();
            distribute_energy(tokens, &members, release);
        }
        self.refresh_chain(tokens, chains, chain_id, tick);

        self.stats.formed += 1;
        debug_log!(
            "bond {}-{} formed: {} strength {:.3}, cost {}, release {}, chain {}",
            a, b, kind, strength, cost, release, chain_id
        );
        true
    }

    /// Removes the bond between `a` and `b`, splitting their chain when they are
    /// no longer connected. Returns false if they were not bonded.
    pub fn break_bond(
        &mut self,
        tokens: &mut TokenArena,
        chains: &mut ChainRegistry,
        a: TokenId,
        b: TokenId,
        tick: u64,
    ) -> bool {
        !matches!(self.break_bond_with_outcome(tokens, chains, a, b, tick), BreakOutcome::NotBonded)
    }

    pub fn break_bond_with_outcome(
        &mut self,
        tokens: &mut TokenArena,
        chains: &mut ChainRegistry,
        a: TokenId,
        b: TokenId,
        tick: u64,
    ) -> BreakOutcome {
        if a == b {
            return BreakOutcome::NotBonded;
        }
        let bonded = tokens.get(a).map(|t| t.is_bonded_to(b)).unwrap_or(false)
            || tokens.get(b).map(|t| t.is_bonded_to(a)).unwrap_or(false);
        if !bonded {
            return BreakOutcome::NotBonded;
        }
        if let Some(t) = tokens.get_mut(a) {
            t.detach(b);
        }
        if let Some(t) = tokens.get_mut(b) {
            t.detach(a);
        }
        self.stats.broken += 1;

        let chain_id = [a, b]
            .iter()
            .filter_map(|id| tokens.get(*id).and_then(|t| t.chain()))
            .find(|c| chains.contains(*c));
        let Some(chain_id) = chain_id else {
            debug_log!("bond {}-{} broken outside any chain", a, b);
            return BreakOutcome::Kept(None);
        };

        if tokens.connected(a, b) {
            self.refresh_chain(tokens, chains, chain_id, tick);
            debug_log!("bond {}-{} broken, chain {} still connected", a, b, chain_id);
            return BreakOutcome::Kept(Some(chain_id));
        }

        let created = self.split_chain(tokens, chains, chain_id, a, tick);
        self.stats.splits += 1;
        debug_log!("bond {}-{} broken, chain {} split into {:?}", a, b, chain_id, created);
        BreakOutcome::Split { kept: chain_id, created }
    }

    /// Breaks every bond of `id`, drops it from its chain and removes it from the arena.
    pub fn remove_token(
        &mut self,
        tokens: &mut TokenArena,
        chains: &mut ChainRegistry,
        id: TokenId,
        tick: u64,
    ) -> bool {
        let Some(token) = tokens.get(id) else {
            return false;
        };
        let partners: Vec<TokenId> = token.bonded_tokens().collect();
        for p in partners {
            self.break_bond_with_outcome(tokens, chains, id, p, tick);
        }
        if let Some(chain_id) = tokens.get(id).and_then(|t| t.chain()) {
            tokens.remove(id);
            let empty = match chains.get_chain_mut(chain_id) {
                Some(chain) => {
                    chain.remove_member(id, tokens, tick);
                    chain.is_empty()
                }
                None => false,
            };
            if empty {
                chains.remove_chain(chain_id);
            } else {
                self.refresh_chain(tokens, chains, chain_id, tick);
            }
        } else {
            tokens.remove(id);
        }
        debug_log!("token {} removed", id);
        true
    }

    /// Re-checks chains not validated for `interval` ticks: bonds whose pair is no
    /// longer grammar-compatible break, then validity is recomputed. Returns the
    /// number of bonds broken.
    pub fn revalidate_chains(
        &mut self,
        tokens: &mut TokenArena,
        chains: &mut ChainRegistry,
        tick: u64,
        interval: u64,
    ) -> usize {
        let due: Vec<ChainId> = chains
            .iter()
            .filter(|c| tick.saturating_sub(c.last_validated_tick) >= interval)
            .map(|c| c.id)
            .collect();

        let mut broken = 0;
        for chain_id in due {
            let Some(chain) = chains.get_chain(chain_id) else {
                continue;
            };
            let mut stale = Vec::new();
            for t in chain.tokens(tokens) {
                for p in t.bonded_tokens().filter(|p| *p > t.id) {
                    let compatible = tokens
                        .get(p)
                        .map(|other| self.compatibility().pair_compatible(t, other))
                        .unwrap_or(false);
                    if !compatible {
                        stale.push((t.id, p));
                    }
                }
            }

            let mut touched: BTreeSet<ChainId> = BTreeSet::from([chain_id]);
            for (x, y) in stale {
                match self.break_bond_with_outcome(tokens, chains, x, y, tick) {
                    BreakOutcome::NotBonded => continue,
                    BreakOutcome::Kept(_) => {}
                    BreakOutcome::Split { created, .. } => touched.extend(created),
                }
                broken += 1;
            }

            for id in touched {
                let valid = match chains.get_chain(id) {
                    Some(c) => self.compatibility().validate_sequence(&c.tokens(tokens)),
                    None => continue,
                };
                if let Some(c) = chains.get_chain_mut(id) {
                    c.is_valid = valid;
                    c.last_validated_tick = tick;
                }
            }
        }
        if broken > 0 {
            debug_log!("revalidation at tick {} broke {} bonds", tick, broken);
        }
        broken
    }

    /// Updates chain membership after a new a-b bond; returns the chain now holding both.
    fn link_chains(
        &mut self,
        tokens: &mut TokenArena,
        chains: &mut ChainRegistry,
        a: TokenId,
        b: TokenId,
        tick: u64,
    ) -> ChainId {
        let chain_of = |tokens: &TokenArena, id: TokenId| {
            tokens.get(id).and_then(|t| t.chain()).filter(|c| chains.contains(*c))
        };
        match (chain_of(tokens, a), chain_of(tokens, b)) {
            (None, None) => chains.create_chain(vec![a, b], tokens, tick),
            (Some(c), None) => {
                self.adopt(tokens, chains, c, b, tick);
                c
            }
            (None, Some(c)) => {
                self.adopt(tokens, chains, c, a, tick);
                c
            }
            (Some(x), Some(y)) if x == y => {
                if let Some(chain) = chains.get_chain_mut(x) {
                    chain.touch(tick);
                }
                x
            }
            (Some(x), Some(y)) => {
                self.merge(tokens, chains, x, y, a, tick);
                x
            }
        }
    }

    fn adopt(&self, tokens: &mut TokenArena, chains: &mut ChainRegistry, chain_id: ChainId, id: TokenId, tick: u64) {
        if let Some(chain) = chains.get_chain_mut(chain_id) {
            chain.push(id, tokens, tick);
        }
        if let Some(t) = tokens.get_mut(id) {
            t.set_chain(Some(chain_id));
        }
    }

    /// `keep` absorbs `gone`; chain references are repointed by walking the
    /// merged molecule from `start`.
    fn merge(
        &mut self,
        tokens: &mut TokenArena,
        chains: &mut ChainRegistry,
        keep: ChainId,
        gone: ChainId,
        start: TokenId,
        tick: u64,
    ) {
        let Some(other) = chains.remove_chain(gone) else {
            return;
        };
        let reachable = tokens.component(start);
        if let Some(chain) = chains.get_chain_mut(keep) {
            chain.absorb(&other, tokens, tick);
            let mut members = chain.members().to_vec();
            members.extend(reachable.iter().filter(|id| !chain.contains(**id)));
            chain.replace_members(members, tokens, tick);
        }
        for id in reachable.iter().chain(other.members()) {
            if let Some(t) = tokens.get_mut(*id) {
                t.set_chain(Some(keep));
            }
        }
        self.stats.merges += 1;
        debug_log!("chain {} merged into {}", gone, keep);
    }

    /// Rebuilds `chain_id` as the molecule around `anchor`; every other component
    /// among its former members becomes a new chain.
    fn split_chain(
        &mut self,
        tokens: &mut TokenArena,
        chains: &mut ChainRegistry,
        chain_id: ChainId,
        anchor: TokenId,
        tick: u64,
    ) -> Vec<ChainId> {
        let Some(chain) = chains.get_chain(chain_id) else {
            return Vec::new();
        };
        let former = chain.members().to_vec();
        let mut assigned: BTreeSet<TokenId> = BTreeSet::new();
        let mut groups: Vec<Vec<TokenId>> = Vec::new();

        for start in std::iter::once(anchor).chain(former.iter().copied()) {
            if assigned.contains(&start) || !tokens.contains(start) {
                continue;
            }
            let reach: BTreeSet<TokenId> = tokens.component(start).into_iter().collect();
            // Keep the former member order inside each piece.
            let mut group: Vec<TokenId> = former.iter().copied().filter(|id| reach.contains(id)).collect();
            let extra: Vec<TokenId> = reach.iter().copied().filter(|id| !group.contains(id)).collect();
            group.extend(extra);
            assigned.extend(group.iter().copied());
            if !group.is_empty() {
                groups.push(group);
            }
        }

        let mut pieces = groups.into_iter();
        if let Some(first) = pieces.next() {
            if let Some(chain) = chains.get_chain_mut(chain_id) {
                chain.replace_members(first, tokens, tick);
            }
        }
        let mut created = Vec::new();
        for piece in pieces {
            let id = chains.create_chain(piece, tokens, tick);
            created.push(id);
        }

        for id in std::iter::once(chain_id).chain(created.iter().copied()) {
            self.refresh_chain(tokens, chains, id, tick);
        }
        created
    }

    /// Recomputes aggregates and grammar validity after a structural change.
    fn refresh_chain(&self, tokens: &TokenArena, chains: &mut ChainRegistry, chain_id: ChainId, tick: u64) {
        let valid = match chains.get_chain(chain_id) {
            Some(c) => self.compatibility().validate_sequence(&c.tokens(tokens)),
            None => return,
        };
        if let Some(chain) = chains.get_chain_mut(chain_id) {
            chain.touch(tick);
            chain.refresh(tokens);
            chain.is_valid = valid;
        }
    }
}

/// Splits `cost` as evenly as possible; whatever one side cannot pay shifts to the other.
fn split_cost(cost: i64, energy_a: i64, energy_b: i64) -> (i64, i64) {
    let mut pay_a = (cost - cost / 2).min(energy_a);
    let mut pay_b = cost - pay_a;
    if pay_b > energy_b {
        pay_b = energy_b;
        pay_a = cost - pay_b;
    }
    (pay_a, pay_b)
}

/// Hands out `amount` one unit at a time, lowest-energy members first.
fn distribute_energy(tokens: &mut TokenArena, members: &[TokenId], amount: i64) {
    if members.is_empty() || amount <= 0 {
        return;
    }
    let mut order: Vec<(i64, TokenId)> = members
        .iter()
        .filter_map(|id| tokens.get(*id).map(|t| (t.energy, *id)))
        .collect();
    if order.is_empty() {
        return;
    }
    order.sort();
    for i in 0..amount as usize {
        let (_, id) = order[i % order.len()];
        if let Some(t) = tokens.get_mut(id) {
            t.energy += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grammar::RuleSet;
    use crate::core::registry::RegistryParams;
    use crate::core::strength::BondParams;
    use crate::core::token::Token;
    use std::sync::Arc;

    fn setup() -> (BondingManager, TokenArena, ChainRegistry) {
        let compat = CompatibilityEngine::new(Arc::new(RuleSet::default()));
        let manager = BondingManager::new(BondStrengthModel::new(compat, BondParams::default()));
        (manager, TokenArena::new(), ChainRegistry::new(RegistryParams::default()))
    }

    #[test]
    fn split_cost_shifts_shortfall() {
        assert_eq!(split_cost(18, 100, 100), (9, 9));
        assert_eq!(split_cost(17, 100, 100), (9, 8));
        assert_eq!(split_cost(18, 3, 100), (3, 15));
        assert_eq!(split_cost(18, 100, 2), (16, 2));
    }

    #[test]
    fn literal_plus_bond_costs_and_releases_energy() {
        let (mut m, mut tokens, mut chains) = setup();
        let a = tokens.spawn("5", 100);
        let b = tokens.spawn("+", 100);
        assert!(m.attempt_bond(&mut tokens, &mut chains, a, b, 1));

        let (ta, tb) = (tokens.get(a).unwrap(), tokens.get(b).unwrap());
        assert!(ta.is_bonded_to(b) && tb.is_bonded_to(a));
        assert_eq!(ta.bond_with(b), tb.bond_with(a));
        // cost round(5 + 15 × 0.853) = 18, covalent release 10
        assert_eq!(ta.energy + tb.energy, 192);
        assert_eq!(ta.chain(), tb.chain());
        let chain = chains.get_chain(ta.chain().unwrap()).unwrap();
        assert_eq!(chain.length(), 2);
        assert_eq!(chain.total_energy(), 192);
    }

    #[test]
    fn second_attempt_is_rejected() {
        let (mut m, mut tokens, mut chains) = setup();
        let a = tokens.spawn("5", 100);
        let b = tokens.spawn("+", 100);
        assert!(m.attempt_bond(&mut tokens, &mut chains, a, b, 1));
        assert!(!m.attempt_bond(&mut tokens, &mut chains, b, a, 2));
        assert_eq!(tokens.get(a).unwrap().bond_count(), 1);
        assert_eq!(m.stats().formed, 1);
        assert_eq!(m.stats().attempts, 2);
    }

    #[test]
    fn insufficient_energy_leaves_state_untouched() {
        let (mut m, mut tokens, mut chains) = setup();
        let a = tokens.spawn("5", 4);
        let b = tokens.spawn("+", 4);
        assert!(!m.attempt_bond(&mut tokens, &mut chains, a, b, 1));
        assert_eq!(tokens.get(a).unwrap().energy, 4);
        assert_eq!(tokens.get(a).unwrap().bond_count(), 0);
        assert!(chains.is_empty());
    }

    #[test]
    fn unknown_ids_and_self_pairs_fail() {
        let (mut m, mut tokens, mut chains) = setup();
        let a = tokens.spawn("5", 100);
        assert!(!m.attempt_bond(&mut tokens, &mut chains, a, a, 1));
        assert!(!m.attempt_bond(&mut tokens, &mut chains, a, 99, 1));
        assert!(!m.break_bond(&mut tokens, &mut chains, a, 99, 1));
    }

    #[test]
    fn zero_capacity_tokens_never_bond() {
        let (mut m, mut tokens, mut chains) = setup();
        let a = tokens.spawn_with(|id| Token::new(id, "5", 100).with_capacity(0));
        let b = tokens.spawn("+", 100);
        assert!(!m.attempt_bond(&mut tokens, &mut chains, a, b, 1));
    }

    #[test]
    fn break_middle_bond_splits_chain() {
        let (mut m, mut tokens, mut chains) = setup();
        let a = tokens.spawn("5", 100);
        let b = tokens.spawn("+", 100);
        let c = tokens.spawn("3", 100);
        assert!(m.attempt_bond(&mut tokens, &mut chains, a, b, 1));
        assert!(m.attempt_bond(&mut tokens, &mut chains, b, c, 2));
        assert_eq!(chains.len(), 1);

        let outcome = m.break_bond_with_outcome(&mut tokens, &mut chains, a, b, 3);
        let BreakOutcome::Split { kept, created } = outcome else {
            panic!("expected a split, got {outcome:?}");
        };
        assert_eq!(chains.get_chain(kept).unwrap().members(), &[a]);
        assert_eq!(created.len(), 1);
        assert_eq!(chains.get_chain(created[0]).unwrap().members(), &[b, c]);
        assert_eq!(tokens.get(c).unwrap().chain(), Some(created[0]));
        assert_eq!(m.stats().splits, 1);
    }

    #[test]
    fn rebond_after_split_merges() {
        let (mut m, mut tokens, mut chains) = setup();
        let a = tokens.spawn("5", 100);
        let b = tokens.spawn("+", 100);
        let c = tokens.spawn("3", 100);
        m.attempt_bond(&mut tokens, &mut chains, a, b, 1);
        m.attempt_bond(&mut tokens, &mut chains, b, c, 2);
        m.break_bond(&mut tokens, &mut chains, a, b, 3);
        assert_eq!(chains.len(), 2);

        assert!(m.attempt_bond(&mut tokens, &mut chains, a, b, 4));
        assert_eq!(chains.len(), 1);
        let id = tokens.get(a).unwrap().chain().unwrap();
        let chain = chains.get_chain(id).unwrap();
        assert_eq!(chain.members(), &[a, b, c]);
        assert!([a, b, c].iter().all(|t| tokens.get(*t).unwrap().chain() == Some(id)));
        assert_eq!(m.stats().merges, 1);
    }

    #[test]
    fn removing_a_token_frees_its_partners() {
        let (mut m, mut tokens, mut chains) = setup();
        let a = tokens.spawn("5", 100);
        let b = tokens.spawn("+", 100);
        m.attempt_bond(&mut tokens, &mut chains, a, b, 1);
        assert!(m.remove_token(&mut tokens, &mut chains, b, 2));
        assert!(!tokens.contains(b));
        assert_eq!(tokens.get(a).unwrap().bond_count(), 0);
        assert!(tokens.asymmetric_bonds().is_empty());
        for c in chains.iter() {
            assert!(!c.contains(b));
        }
    }

    #[test]
    fn revalidation_breaks_corrupted_bonds() {
        let (mut m, mut tokens, mut chains) = setup();
        let a = tokens.spawn("5", 100);
        let b = tokens.spawn("+", 100);
        m.attempt_bond(&mut tokens, &mut chains, a, b, 0);
        tokens.get_mut(b).unwrap().corrupt_kind();

        assert_eq!(m.revalidate_chains(&mut tokens, &mut chains, 5, 10), 0, "not due yet");
        assert_eq!(m.revalidate_chains(&mut tokens, &mut chains, 10, 10), 1);
        assert!(!tokens.get(a).unwrap().is_bonded_to(b));
    }
}
