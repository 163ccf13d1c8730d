//! Multi-factor bond strength: grammar, electronegativity, energy, open sites, damage.

use serde::{Deserialize, Serialize};

use crate::core::compatibility::CompatibilityEngine;
use crate::core::electronegativity::{classify_difference, difference};
use crate::core::token::{BondType, Token};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrengthWeights {
    pub grammar: f64,
    pub electronegativity: f64,
    pub energy: f64,
    pub availability: f64,
    pub damage: f64,
}

impl Default for StrengthWeights {
    fn default() -> Self {
        Self { grammar: 0.40, electronegativity: 0.30, energy: 0.15, availability: 0.10, damage: 0.05 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BondParams {
    /// Minimum total strength for a bond to form.
    pub min_strength: f64,
    /// Strength at which a bond counts as stable.
    pub stable_strength: f64,
    /// Below this grammar factor the whole strength is zero.
    pub grammar_cutoff: f64,
    /// Combined energy at which the energy factor saturates.
    pub energy_threshold: f64,
    pub cost_min: f64,
    pub cost_max: f64,
    pub release_covalent: i64,
    pub release_ionic: i64,
    pub release_weak: i64,
    pub weights: StrengthWeights,
}

impl Default for BondParams {
    fn default() -> Self {
        Self {
            min_strength: 0.3,
            stable_strength: 0.5,
            grammar_cutoff: 0.1,
            energy_threshold: 20.0,
            cost_min: 5.0,
            cost_max: 20.0,
            release_covalent: 10,
            release_ionic: 5,
            release_weak: 1,
            weights: StrengthWeights::default(),
        }
    }
}

/// Each factor already clamped to [0, 1], plus the weighted total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StrengthBreakdown {
    pub grammar: f64,
    pub electronegativity: f64,
    pub energy: f64,
    pub availability: f64,
    pub damage: f64,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct BondStrengthModel {
    compat: CompatibilityEngine,
    params: BondParams,
}

impl BondStrengthModel {
    pub fn new(compat: CompatibilityEngine, params: BondParams) -> Self {
        Self { compat, params }
    }

    pub fn params(&self) -> &BondParams {
        &self.params
    }

    pub fn compatibility(&self) -> &CompatibilityEngine {
        &self.compat
    }

    pub fn breakdown(&self, a: &Token, b: &Token) -> StrengthBreakdown {
        let mut out = StrengthBreakdown::default();
        if !a.active || !b.active || a.id == b.id || is_spent(a) || is_spent(b) {
            return out;
        }

        out.grammar = if self.compat.pair_compatible(a, b) {
            self.compat.base_bond_strength(a, b).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.electronegativity = (1.0 - 0.6 * difference(a.kind, b.kind)).clamp(0.0, 1.0);

        let combined = (a.available_energy() + b.available_energy()) as f64;
        out.energy = if self.params.energy_threshold > 0.0 {
            (combined / self.params.energy_threshold).clamp(0.0, 1.0)
        } else if combined > 0.0 {
            1.0
        } else {
            0.0
        };

        out.availability = if a.has_free_capacity() && b.has_free_capacity() {
            (1.0 - (a.site_utilization() + b.site_utilization()) / 2.0).clamp(0.0, 1.0)
        } else {
            0.0
        };
        out.damage = (1.0 - (a.damage() + b.damage()) / 2.0).clamp(0.0, 1.0);

        // Zero capacity zeroes the strength; saturation only zeroes the availability term.
        if out.grammar < self.params.grammar_cutoff
            || a.bonding_capacity() == 0
            || b.bonding_capacity() == 0
        {
            return out;
        }

        let w = &self.params.weights;
        out.total = (w.grammar * out.grammar
            + w.electronegativity * out.electronegativity
            + w.energy * out.energy
            + w.availability * out.availability
            + w.damage * out.damage)
            .clamp(0.0, 1.0);
        out
    }

    pub fn calculate_bond_strength(&self, a: &Token, b: &Token) -> f64 {
        self.breakdown(a, b).total
    }

    pub fn can_form_bond(&self, a: &Token, b: &Token) -> bool {
        self.calculate_bond_strength(a, b) >= self.params.min_strength
    }

    pub fn is_bond_stable(&self, a: &Token, b: &Token) -> bool {
        self.calculate_bond_strength(a, b) >= self.params.stable_strength
    }

    /// Rule's bond type when one matches, otherwise the electronegativity band.
    pub fn determine_bond_type(&self, a: &Token, b: &Token) -> BondType {
        match self.compat.matching_rule(a, b) {
            Some(rule) => rule.bond,
            None => classify_difference(difference(a.kind, b.kind)),
        }
    }

    /// Linear map of strength into [cost_min, cost_max].
    pub fn energy_cost_for(&self, strength: f64) -> f64 {
        let s = if strength.is_finite() { strength.clamp(0.0, 1.0) } else { 0.0 };
        self.params.cost_min + (self.params.cost_max - self.params.cost_min) * s
    }

    pub fn calculate_bond_energy_cost(&self, a: &Token, b: &Token) -> f64 {
        if !a.active || !b.active {
            return 0.0;
        }
        self.energy_cost_for(self.calculate_bond_strength(a, b))
    }

    pub fn calculate_bond_energy_release(&self, kind: BondType) -> i64 {
        match kind {
            BondType::Covalent => self.params.release_covalent,
            BondType::Ionic => self.params.release_ionic,
            BondType::Weak => self.params.release_weak,
        }
    }
}

/// Fully damaged with nothing left to spend.
fn is_spent(t: &Token) -> bool {
    t.damage() >= 1.0 && t.available_energy() == 0
}
