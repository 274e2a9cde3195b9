//! Crisis templates, active instances and the modifiers they contribute.

use crate::ids::CrisisId;
use crate::rng::RandomSource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Static crisis definition from the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrisisTemplate {
    pub id: CrisisId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Base trigger probability per month, in `[0, 1]`.
    pub probability: f64,
    /// Months that must pass after a trigger before the template may fire again.
    #[serde(default)]
    pub cooldown_months: u32,
    pub kind: CrisisKind,
}

/// Duration-bearing modifiers and one-shot mutations are distinct categories.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum CrisisKind {
    Lasting { months: u32, effect: LastingEffect },
    Immediate { effect: ImmediateEffect },
}

/// Modifier applied every month while an instance is active.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LastingEffect {
    /// Added to the price multiplier (negative for a crash).
    PriceChange { delta: f64 },
    MaintenanceIncrease { delta: f64 },
    /// Forces production to zero.
    ProductionHalt,
    ProductionReduction { fraction: f64 },
    /// Added to the purchase/upgrade cost multiplier.
    CostIncrease { delta: f64 },
    /// Symmetric noise on the price multiplier, redrawn every month.
    PriceVolatility { amplitude: f64 },
    /// Uniform draw in `[low, high)` added to the price multiplier every month.
    RandomPrice { low: f64, high: f64 },
    /// Efficiency loss applied once to every field when triggered.
    FieldDamage { fraction: f64 },
    /// Multiplies shipping times of new shipments.
    ShippingDelay { factor: f64 },
}

impl LastingEffect {
    /// Shrink the magnitude by `(1 - mitigation)`. Only price, maintenance,
    /// production-reduction and cost deltas carry a magnitude that shrinks.
    pub fn mitigate(&mut self, mitigation: f64) {
        let keep = 1.0 - mitigation;
        match self {
            LastingEffect::PriceChange { delta }
            | LastingEffect::MaintenanceIncrease { delta }
            | LastingEffect::CostIncrease { delta } => *delta *= keep,
            LastingEffect::ProductionReduction { fraction } => *fraction *= keep,
            _ => {}
        }
    }
}

/// One-shot state mutation applied at trigger time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImmediateEffect {
    /// Destroys `floor(fields × field_fraction)` fields and charges cleanup per field lost.
    OilSpill {
        field_fraction: f64,
        cleanup_per_field: i64,
    },
    /// Takes a fraction of positive money and of central stock.
    CyberAttack {
        money_fraction: f64,
        stock_fraction: f64,
    },
    /// Destroys up to `max_fields` fields and charges repairs per field lost.
    NaturalDisaster {
        field_fraction: f64,
        max_fields: u32,
        repair_per_field: i64,
    },
    /// Grants barrels, scaled by the discovery bonus, plus between
    /// `min_bonus_fields` and `max_bonus_fields` free starter fields.
    Discovery {
        min_barrels: u64,
        max_barrels: u64,
        #[serde(default)]
        min_bonus_fields: u32,
        #[serde(default)]
        max_bonus_fields: u32,
    },
    /// Pays money per owned field.
    Subsidy { per_field: i64 },
    /// Cuts efficiency of a random subset of fields.
    EquipmentFailure {
        min_fraction: f64,
        max_fraction: f64,
        efficiency_loss: f64,
    },
    /// Removes between one and `max_fields` random fields without refund.
    EnvironmentalAccident { max_fields: u32 },
}

/// A triggered lasting crisis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActiveCrisis {
    pub template_id: CrisisId,
    pub name: String,
    pub effect: LastingEffect,
    pub months_remaining: u32,
    pub started_month: i32,
}

/// Append-only occurrence log entry. Immediate crises are logged when they
/// fire, lasting ones when they run out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrisisRecord {
    pub template_id: CrisisId,
    pub name: String,
    pub started_month: i32,
    pub ended_month: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrisisState {
    pub active: Vec<ActiveCrisis>,
    pub history: Vec<CrisisRecord>,
    /// Absolute month index of each template's most recent trigger.
    pub last_triggered: BTreeMap<CrisisId, i32>,
    /// Month index of the most recent trigger of any template.
    pub last_any: Option<i32>,
}

impl CrisisState {
    /// Whether `template` may trigger at `month_index`. Templates that never
    /// fired are never on cooldown.
    pub fn off_cooldown(&self, template: &CrisisTemplate, month_index: i32) -> bool {
        match self.last_triggered.get(&template.id) {
            Some(last) => month_index - last >= template.cooldown_months as i32,
            None => true,
        }
    }

    pub fn is_active(&self, id: &CrisisId) -> bool {
        self.active.iter().any(|c| &c.template_id == id)
    }

    pub fn has_lasting(&self) -> bool {
        !self.active.is_empty()
    }

    /// Price multiplier. Volatility and random-price instances consume draws.
    pub fn price_multiplier(&self, rng: &mut impl RandomSource) -> f64 {
        let mut m = 1.0;
        for c in &self.active {
            match c.effect {
                LastingEffect::PriceChange { delta } => m += delta,
                LastingEffect::PriceVolatility { amplitude } => {
                    m *= 1.0 + (rng.next_unit() - 0.5) * amplitude
                }
                LastingEffect::RandomPrice { low, high } => m += rng.range(low, high),
                _ => {}
            }
        }
        m.max(0.0)
    }

    pub fn maintenance_multiplier(&self) -> f64 {
        let extra: f64 = self
            .active
            .iter()
            .filter_map(|c| match c.effect {
                LastingEffect::MaintenanceIncrease { delta } => Some(delta),
                _ => None,
            })
            .sum();
        (1.0 + extra).max(0.0)
    }

    pub fn production_multiplier(&self) -> f64 {
        let mut m = 1.0;
        for c in &self.active {
            match c.effect {
                LastingEffect::ProductionHalt => m = 0.0,
                LastingEffect::ProductionReduction { fraction } => {
                    m *= (1.0 - fraction).max(0.0)
                }
                _ => {}
            }
        }
        m
    }

    pub fn cost_multiplier(&self) -> f64 {
        let extra: f64 = self
            .active
            .iter()
            .filter_map(|c| match c.effect {
                LastingEffect::CostIncrease { delta } => Some(delta),
                _ => None,
            })
            .sum();
        (1.0 + extra).max(0.0)
    }

    pub fn shipping_delay(&self) -> f64 {
        self.active
            .iter()
            .filter_map(|c| match c.effect {
                LastingEffect::ShippingDelay { factor } => Some(factor.max(1.0)),
                _ => None,
            })
            .product()
    }
}
