//! Time-varying chain stability.
//!
//! stability = (bond × grammar + age bonus) × damage × energy, clamped to [0, max].
//! The grammar multiplier applies before the additive age bonus; moving it changes
//! which chains fall under the extinction threshold.

use serde::{Deserialize, Serialize};

use crate::core::arena::TokenArena;
use crate::core::chain::Chain;
use crate::core::compatibility::CompatibilityEngine;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityParams {
    pub valid_multiplier: f64,
    pub invalid_multiplier: f64,
    /// Ticks of quiet needed for the full age bonus.
    pub age_horizon: f64,
    pub age_bonus: f64,
    /// Energy per member at which the energy factor saturates.
    pub energy_per_token: f64,
    pub max_stability: f64,
    /// Gate used by `is_chain_stable`.
    pub min_stability: f64,
    /// Per-tick damage growth assumed by `predict_stability`.
    pub predicted_damage_rate: f64,
}

impl Default for StabilityParams {
    fn default() -> Self {
        Self {
            valid_multiplier: 1.2,
            invalid_multiplier: 0.5,
            age_horizon: 100.0,
            age_bonus: 0.5,
            energy_per_token: 10.0,
            max_stability: 2.0,
            min_stability: 0.3,
            predicted_damage_rate: 0.01,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StabilityModel {
    grammar: CompatibilityEngine,
    params: StabilityParams,
}

impl StabilityModel {
    pub fn new(grammar: CompatibilityEngine, params: StabilityParams) -> Self {
        Self { grammar, params }
    }

    pub fn params(&self) -> &StabilityParams {
        &self.params
    }

    pub fn calculate_stability(&self, chain: &Chain, tokens: &TokenArena, tick: u64) -> f64 {
        let members = chain.tokens(tokens);
        if chain.is_empty() || members.is_empty() {
            return 0.0;
        }
        let damage = members.iter().map(|t| t.damage()).sum::<f64>() / members.len() as f64;
        let energy: i64 = members.iter().map(|t| t.energy).sum();
        self.combine(chain, tokens, tick, damage, energy, members.len())
    }

    /// Extrapolates `future_ticks` ahead: energy drains by `length` per tick and
    /// damage grows by the configured rate per tick.
    pub fn predict_stability(
        &self,
        chain: &Chain,
        tokens: &TokenArena,
        tick: u64,
        future_ticks: u64,
    ) -> f64 {
        let members = chain.tokens(tokens);
        if chain.is_empty() || members.is_empty() {
            return 0.0;
        }
        let len = members.len();
        let damage_now = members.iter().map(|t| t.damage()).sum::<f64>() / len as f64;
        let energy_now: i64 = members.iter().map(|t| t.energy).sum();

        let drain = (len as i64).saturating_mul(future_ticks.min(i64::MAX as u64) as i64);
        let energy = energy_now.saturating_sub(drain).max(0);
        let damage =
            (damage_now + self.params.predicted_damage_rate * future_ticks as f64).min(1.0);
        self.combine(chain, tokens, tick.saturating_add(future_ticks), damage, energy, len)
    }

    pub fn is_chain_stable(&self, chain: &Chain, tokens: &TokenArena, tick: u64) -> bool {
        self.calculate_stability(chain, tokens, tick) >= self.params.min_stability
    }

    fn combine(
        &self,
        chain: &Chain,
        tokens: &TokenArena,
        tick: u64,
        avg_damage: f64,
        total_energy: i64,
        length: usize,
    ) -> f64 {
        let p = &self.params;
        let bond_factor = if chain.avg_bond_strength > 0.0 {
            chain.avg_bond_strength
        } else {
            chain.measure_bond_strength(tokens)
        };

        let valid = chain.is_valid || self.grammar.validate_sequence(&chain.tokens(tokens));
        let grammar_factor = if valid { p.valid_multiplier } else { p.invalid_multiplier };

        let quiet = chain.idle_for(tick) as f64;
        let age_bonus = if p.age_horizon > 0.0 {
            (quiet / p.age_horizon).min(1.0) * p.age_bonus
        } else {
            p.age_bonus
        };

        let damage_factor = (1.0 - avg_damage).clamp(0.0, 1.0);
        let capacity = length as f64 * p.energy_per_token;
        let energy_factor = if capacity > 0.0 {
            (total_energy.max(0) as f64 / capacity).min(1.0)
        } else {
            0.0
        };

        let stability = (bond_factor * grammar_factor + age_bonus) * damage_factor * energy_factor;
        if stability.is_finite() { stability.clamp(0.0, p.max_stability) } else { 0.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grammar::RuleSet;
    use std::sync::Arc;

    fn model() -> StabilityModel {
        StabilityModel::new(
            CompatibilityEngine::new(Arc::new(RuleSet::default())),
            StabilityParams::default(),
        )
    }

    fn arithmetic_chain(arena: &mut TokenArena) -> Chain {
        let ids = vec![arena.spawn("5", 100), arena.spawn("+", 100), arena.spawn("3", 100)];
        let mut chain = Chain::new(1, ids, arena, 0);
        chain.avg_bond_strength = 0.7;
        chain.is_valid = true;
        chain
    }

    #[test]
    fn empty_chain_is_zero() {
        let arena = TokenArena::new();
        let chain = Chain::new(1, Vec::new(), &arena, 0);
        assert_eq!(model().calculate_stability(&chain, &arena, 10), 0.0);
        assert_eq!(model().predict_stability(&chain, &arena, 10, 5), 0.0);
    }

    #[test]
    fn multiply_then_add_order() {
        let mut arena = TokenArena::new();
        let chain = arithmetic_chain(&mut arena);
        // (0.7 × 1.2 + 0.25) × 1 × 1
        let s = model().calculate_stability(&chain, &arena, 50);
        assert!((s - 1.09).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn energy_and_damage_scale_down() {
        let mut arena = TokenArena::new();
        let chain = arithmetic_chain(&mut arena);
        for id in chain.members().to_vec() {
            let t = arena.get_mut(id).unwrap();
            t.energy = 5;
            t.set_damage(0.5);
        }
        // (0.84 + 0) × 0.5 × 0.5
        let s = model().calculate_stability(&chain, &arena, 0);
        assert!((s - 0.21).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn invalid_grammar_halves_bond_term() {
        let mut arena = TokenArena::new();
        let ids = vec![arena.spawn("{", 100), arena.spawn("*", 100)];
        let mut chain = Chain::new(1, ids, &arena, 0);
        chain.avg_bond_strength = 0.6;
        let s = model().calculate_stability(&chain, &arena, 0);
        assert!((s - 0.3).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn prediction_decays() {
        let mut arena = TokenArena::new();
        let chain = arithmetic_chain(&mut arena);
        let m = model();
        let now = m.calculate_stability(&chain, &arena, 0);
        // 300 energy - 3 × 90 = 30 → energy factor 1.0; damage 0.9 → factor 0.1
        let later = m.predict_stability(&chain, &arena, 0, 90);
        assert!(later < now);
        assert!((later - (0.84 + 0.45) * 0.1).abs() < 1e-9, "got {later}");
        assert!(m.is_chain_stable(&chain, &arena, 0));
    }

    #[test]
    fn result_stays_in_range() {
        let mut arena = TokenArena::new();
        let mut chain = arithmetic_chain(&mut arena);
        chain.avg_bond_strength = 5.0;
        let s = model().calculate_stability(&chain, &arena, 1_000);
        assert_eq!(s, 2.0);
    }
}
