//! Technology effect descriptors and their accumulated bundle.

use crate::ids::{FieldTypeId, IdSet};
use serde::{Deserialize, Serialize};

/// Effect granted by a completed technology.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TechEffect {
    /// Fractional bonus to field output.
    YieldBonus(f64),
    /// Fractional bonus to barrels found by discovery events.
    DiscoveryBonus(f64),
    /// Fractional reduction of every crisis trigger probability.
    CrisisReduction(f64),
    /// Months added to the life of limited-life fields.
    FieldLifeExtension(u32),
    /// Fractional reduction of maintenance cost.
    MaintenanceReduction(f64),
    /// Fraction by which active crisis magnitudes shrink each month.
    CrisisMitigation(f64),
    /// Months removed from every shipping time.
    ShippingSpeed(u32),
    /// Fractional bonus to field output, stacking multiplicatively with yield.
    GlobalEfficiency(f64),
    /// Money paid each month while a lasting crisis is active.
    CrisisInsurance(i64),
    /// Market outlook strength; any positive value enables the outlook.
    MarketPrediction(f64),
    /// Makes a locked field type purchasable.
    PremiumUnlock(FieldTypeId),
    /// Composite: adds to yield, global efficiency and maintenance reduction.
    UltimateOptimization(f64),
    /// Fractional bonus to the market base price.
    PriceBonus(f64),
    /// Fractional bonus to every continent's selling price.
    TradingProfitBonus(f64),
    /// Flat barrels produced per month regardless of fields.
    SyntheticProduction(u64),
}

/// Sum of every completed technology's effect, one slot per effect kind.
///
/// Composition is additive inside a slot. Slots that represent multipliers
/// are turned into factors by the accessors below, at the point of use.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectBundle {
    pub yield_bonus: f64,
    pub discovery_bonus: f64,
    pub crisis_reduction: f64,
    pub field_life_extension: u32,
    pub maintenance_reduction: f64,
    pub crisis_mitigation: f64,
    pub shipping_speed_bonus: u32,
    pub global_efficiency: f64,
    pub crisis_insurance: i64,
    pub market_prediction: f64,
    pub premium_unlocks: IdSet<FieldTypeId>,
    pub price_bonus: f64,
    pub trading_profit_bonus: f64,
    pub synthetic_production: u64,
}

impl EffectBundle {
    /// Fold one technology effect into the bundle.
    pub fn absorb(&mut self, effect: &TechEffect) {
        match effect {
            TechEffect::YieldBonus(v) => self.yield_bonus += v,
            TechEffect::DiscoveryBonus(v) => self.discovery_bonus += v,
            TechEffect::CrisisReduction(v) => self.crisis_reduction += v,
            TechEffect::FieldLifeExtension(m) => {
                self.field_life_extension = self.field_life_extension.saturating_add(*m)
            }
            TechEffect::MaintenanceReduction(v) => self.maintenance_reduction += v,
            TechEffect::CrisisMitigation(v) => self.crisis_mitigation += v,
            TechEffect::ShippingSpeed(m) => {
                self.shipping_speed_bonus = self.shipping_speed_bonus.saturating_add(*m)
            }
            TechEffect::GlobalEfficiency(v) => self.global_efficiency += v,
            TechEffect::CrisisInsurance(v) => {
                self.crisis_insurance = self.crisis_insurance.saturating_add(*v)
            }
            TechEffect::MarketPrediction(v) => self.market_prediction += v,
            TechEffect::PremiumUnlock(field_type) => {
                self.premium_unlocks.insert(field_type.clone());
            }
            TechEffect::UltimateOptimization(v) => {
                self.yield_bonus += v;
                self.global_efficiency += v;
                self.maintenance_reduction += v;
            }
            TechEffect::PriceBonus(v) => self.price_bonus += v,
            TechEffect::TradingProfitBonus(v) => self.trading_profit_bonus += v,
            TechEffect::SyntheticProduction(b) => {
                self.synthetic_production = self.synthetic_production.saturating_add(*b)
            }
        }
    }

    /// Output factor from yield and global efficiency.
    pub fn production_factor(&self) -> f64 {
        (1.0 + self.yield_bonus) * (1.0 + self.global_efficiency)
    }

    /// Maintenance cost factor, with the reduction capped at `cap`.
    pub fn maintenance_factor(&self, cap: f64) -> f64 {
        1.0 - self.maintenance_reduction.clamp(0.0, cap)
    }

    /// Crisis probability reduction, capped at `cap`.
    pub fn crisis_reduction_capped(&self, cap: f64) -> f64 {
        self.crisis_reduction.clamp(0.0, cap)
    }

    /// Mitigation applied per month, kept inside `[0, 1]`.
    pub fn mitigation(&self) -> f64 {
        self.crisis_mitigation.clamp(0.0, 1.0)
    }

    pub fn has_market_prediction(&self) -> bool {
        self.market_prediction > 0.0
    }
}
