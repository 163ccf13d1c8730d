//! The single-writer engine facade: token arena, chain registry, bonding and
//! stability wired together behind one tick-driven API.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::core::arena::TokenArena;
use crate::core::bonding::{BondingManager, BondingStats};
use crate::core::compatibility::CompatibilityEngine;
use crate::core::error::CoreError;
use crate::core::grammar::RuleSet;
use crate::core::registry::{ChainRegistry, ChainStatistics};
use crate::core::snapshot::WorldSnapshot;
use crate::core::stability::StabilityModel;
use crate::core::strength::BondStrengthModel;
use crate::core::token::{ChainId, Token, TokenId};

/// Literals offered to assignments left open before punctuation.
pub const DEFAULT_VALUES: &[&str] = &["0", "1", "2", "5", "10"];
pub const DEFAULT_VALUE_ENERGY: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReactorSettings {
    /// Chains are re-checked against the grammar this many ticks after their last check.
    pub validation_interval: u64,
    /// Idle ticks after which an unstable chain is pruned. Zero disables pruning.
    pub stale_max_age: u64,
}

impl Default for ReactorSettings {
    fn default() -> Self {
        Self { validation_interval: 10, stale_max_age: 200 }
    }
}

/// What one `tick` changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tick: u64,
    pub bonds_revalidated_away: usize,
    pub extinct: Vec<ChainId>,
    pub pruned: Vec<ChainId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReactorStatistics {
    pub tick: u64,
    pub tokens: usize,
    pub free_tokens: usize,
    pub chains: ChainStatistics,
    pub bonding: BondingStats,
}

#[derive(Debug, Clone)]
pub struct Reactor {
    tokens: TokenArena,
    chains: ChainRegistry,
    bonding: BondingManager,
    stability: StabilityModel,
    settings: ReactorSettings,
    now: u64,
}

impl Reactor {
    pub fn new(config: &EngineConfig) -> Result<Self, CoreError> {
        let rules = RuleSet::with_extra(config.rules.clone())?;
        Ok(Self::assemble(rules, config))
    }

    fn assemble(rules: RuleSet, config: &EngineConfig) -> Self {
        let compat = CompatibilityEngine::new(Arc::new(rules));
        Self {
            tokens: TokenArena::new(),
            chains: ChainRegistry::new(config.registry),
            bonding: BondingManager::new(BondStrengthModel::new(compat.clone(), config.bonding)),
            stability: StabilityModel::new(compat, config.stability),
            settings: config.reactor,
            now: 0,
        }
    }

    /// Rebuilds a reactor from a snapshot under `config`.
    pub fn restore(snapshot: &WorldSnapshot, config: &EngineConfig) -> Result<Self, CoreError> {
        let mut reactor = Self::new(config)?;
        let (tokens, chains) = snapshot.rebuild(config.registry)?;
        reactor.tokens = tokens;
        reactor.chains = chains;
        reactor.now = snapshot.tick;
        debug_log!(
            "restored {} tokens and {} chains at tick {}",
            reactor.tokens.len(),
            reactor.chains.len(),
            reactor.now
        );
        Ok(reactor)
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.tokens, &self.chains, self.now)
    }

    pub fn current_tick(&self) -> u64 {
        self.now
    }

    pub fn settings(&self) -> &ReactorSettings {
        &self.settings
    }

    pub fn tokens(&self) -> &TokenArena {
        &self.tokens
    }

    /// Energy, damage, kind and activity are the physics layer's to change. The
    /// owning chain's aggregates are recomputed afterwards. False for unknown ids.
    pub fn update_token(&mut self, id: TokenId, f: impl FnOnce(&mut Token)) -> bool {
        let Some(token) = self.tokens.get_mut(id) else {
            return false;
        };
        f(token);
        if let Some(chain) = token.chain() {
            self.chains.refresh_chain(chain, &self.tokens);
        }
        true
    }

    /// `update_token` over every token, refreshing all chains once at the end.
    pub fn update_tokens(&mut self, mut f: impl FnMut(&mut Token)) {
        for token in self.tokens.iter_mut() {
            f(token);
        }
        self.chains.refresh_all(&self.tokens);
    }

    pub fn chains(&self) -> &ChainRegistry {
        &self.chains
    }

    pub fn bonding(&self) -> &BondingManager {
        &self.bonding
    }

    pub fn stability_model(&self) -> &StabilityModel {
        &self.stability
    }

    pub fn spawn_token(&mut self, value: &str, energy: i64) -> TokenId {
        self.tokens.spawn(value, energy)
    }

    pub fn spawn_with(&mut self, build: impl FnOnce(TokenId) -> Token) -> TokenId {
        self.tokens.spawn_with(build)
    }

    pub fn attempt_bond(&mut self, a: TokenId, b: TokenId, tick: u64) -> bool {
        self.now = self.now.max(tick);
        self.bonding.attempt_bond(&mut self.tokens, &mut self.chains, a, b, tick)
    }

    pub fn break_bond(&mut self, a: TokenId, b: TokenId, tick: u64) -> bool {
        self.now = self.now.max(tick);
        self.bonding.break_bond(&mut self.tokens, &mut self.chains, a, b, tick)
    }

    pub fn remove_token(&mut self, id: TokenId, tick: u64) -> bool {
        self.now = self.now.max(tick);
        self.bonding.remove_token(&mut self.tokens, &mut self.chains, id, tick)
    }

    /// Per-tick maintenance: due revalidation, stability update with extinction,
    /// then stale pruning.
    pub fn tick(&mut self, tick: u64) -> TickReport {
        self.now = self.now.max(tick);
        let broken = self.bonding.revalidate_chains(
            &mut self.tokens,
            &mut self.chains,
            tick,
            self.settings.validation_interval,
        );
        let extinct = self.chains.update_all_stabilities(&self.stability, &mut self.tokens, tick);
        let pruned = if self.settings.stale_max_age > 0 {
            self.chains.prune_stale_chains(&mut self.tokens, tick, self.settings.stale_max_age)
        } else {
            Vec::new()
        };
        TickReport { tick, bonds_revalidated_away: broken, extinct, pruned }
    }

    /// Spawns one small literal per value gap across all chains, drawn from
    /// `DEFAULT_VALUES` with the caller's rng. The new tokens are free.
    pub fn insert_default_values<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Vec<TokenId> {
        let gaps: usize = self.chains.iter().map(|c| c.value_gaps(&self.tokens).len()).sum();
        let mut spawned = Vec::with_capacity(gaps);
        for _ in 0..gaps {
            if let Some(value) = DEFAULT_VALUES.choose(rng) {
                spawned.push(self.tokens.spawn(value, DEFAULT_VALUE_ENERGY));
            }
        }
        if !spawned.is_empty() {
            debug_log!("inserted {} default values at tick {}", spawned.len(), self.now);
        }
        spawned
    }

    /// Current stability of a chain; unknown ids read as 0.
    pub fn stability_of(&self, chain: ChainId) -> f64 {
        self.chains
            .get_chain(chain)
            .map(|c| self.stability.calculate_stability(c, &self.tokens, self.now))
            .unwrap_or(0.0)
    }

    pub fn predict_stability(&self, chain: ChainId, future_ticks: u64) -> f64 {
        self.chains
            .get_chain(chain)
            .map(|c| self.stability.predict_stability(c, &self.tokens, self.now, future_ticks))
            .unwrap_or(0.0)
    }

    pub fn bond_strength(&self, a: TokenId, b: TokenId) -> f64 {
        match (self.tokens.get(a), self.tokens.get(b)) {
            (Some(x), Some(y)) => self.bonding.strength_model().calculate_bond_strength(x, y),
            _ => 0.0,
        }
    }

    pub fn code_string(&self, chain: ChainId) -> Option<String> {
        self.chains.get_chain(chain).map(|c| c.code_string(&self.tokens))
    }

    pub fn statistics(&self) -> ReactorStatistics {
        ReactorStatistics {
            tick: self.now,
            tokens: self.tokens.len(),
            free_tokens: self.tokens.iter().filter(|t| t.chain().is_none()).count(),
            chains: self.chains.statistics(&self.tokens),
            bonding: self.bonding.stats(),
        }
    }
}

impl Default for Reactor {
    fn default() -> Self {
        Self::assemble(RuleSet::default(), &EngineConfig::default())
    }
}
