#![deny(warnings)]

//! Market and money arithmetic for Oil Empire.
//!
//! This crate provides:
//! - The bounded random walk over market trend levels
//! - Base price and per-continent price derivation
//! - Purchase, upgrade, maintenance and revenue amounts
//! - A next-month trend outlook for players with market prediction
//!
//! Amounts are computed with `Decimal` and floored to whole dollars, so the
//! same inputs always produce the same integer on every platform.

use oil_core::{
    Continent, CrisisState, EffectBundle, FieldCostRule, FieldTypeDefinition, MarketTrend,
    PlayerState, RandomSource, RuleConfig,
};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// An input or intermediate value was NaN or infinite.
    #[error("non-finite numeric conversion")]
    NonFinite,
    /// The result does not fit a 64-bit amount.
    #[error("amount overflow")]
    Overflow,
}

/// Multipliers are rounded to this many places so binary noise in `f64`
/// (e.g. `1.0 + 0.2`) cannot push a floored amount down by a dollar.
const FACTOR_DP: u32 = 12;

fn dec(x: f64) -> Result<Decimal, EconError> {
    if !x.is_finite() {
        return Err(EconError::NonFinite);
    }
    Decimal::from_f64(x)
        .map(|d| d.round_dp(FACTOR_DP))
        .ok_or(EconError::NonFinite)
}

fn floor_i64(d: Decimal) -> Result<i64, EconError> {
    d.floor().to_i64().ok_or(EconError::Overflow)
}

fn scale(amount: i64, factor: f64) -> Result<i64, EconError> {
    let v = Decimal::from(amount)
        .checked_mul(dec(factor)?)
        .ok_or(EconError::Overflow)?;
    floor_i64(v)
}

/// One step of the trend walk: with probability `change_probability` move one
/// level up or down on a fair coin, saturating at the ends.
pub fn advance_trend(
    trend: MarketTrend,
    change_probability: f64,
    rng: &mut impl RandomSource,
) -> MarketTrend {
    if rng.chance(change_probability) {
        trend.step(rng.chance(0.5))
    } else {
        trend
    }
}

/// Base price for the month.
///
/// Order: `floor(reference × trend × uniform(1 ± variation))`, raised to the
/// minimum price, then the crisis multiplier, then the technology price bonus.
/// Each stage is floored.
pub fn roll_base_price(
    trend: MarketTrend,
    crises: &CrisisState,
    effects: &EffectBundle,
    rules: &RuleConfig,
    rng: &mut impl RandomSource,
) -> Result<i64, EconError> {
    let variation = rng.jitter(rules.price_variation);
    let raw = dec(rules.reference_price)?
        .checked_mul(dec(trend.multiplier())?)
        .and_then(|d| d.checked_mul(dec(variation).ok()?))
        .ok_or(EconError::Overflow)?;
    let floored = floor_i64(raw)?.max(rules.minimum_price);
    let with_crisis = scale(floored, crises.price_multiplier(rng))?;
    scale(with_crisis, 1.0 + effects.price_bonus)
}

/// Advance the trend and recompute the base price in place.
pub fn update_market(
    state: &mut PlayerState,
    rules: &RuleConfig,
    rng: &mut impl RandomSource,
) -> Result<i64, EconError> {
    let trend = advance_trend(state.market.trend, rules.trend_change_probability, rng);
    let price = roll_base_price(trend, &state.crises, &state.research.effects, rules, rng)?;
    if trend != state.market.trend {
        debug!(from = ?state.market.trend, to = ?trend, "market trend changed");
    }
    state.market.trend = trend;
    state.market.base_price = price;
    Ok(price)
}

/// Selling price on a continent: `floor(base × multiplier)`, then the
/// trading profit bonus.
pub fn continent_price(
    base_price: i64,
    continent: &Continent,
    effects: &EffectBundle,
) -> Result<i64, EconError> {
    let local = scale(base_price, continent.multiplier)?;
    scale(local, 1.0 + effects.trading_profit_bonus)
}

/// `amount × unit_price`, checked.
pub fn revenue(amount: u64, unit_price: i64) -> Result<i64, EconError> {
    let v = Decimal::from(amount)
        .checked_mul(Decimal::from(unit_price))
        .ok_or(EconError::Overflow)?;
    v.to_i64().ok_or(EconError::Overflow)
}

/// Price of the next field of a type when `owned` of that type are held.
pub fn field_purchase_cost(
    def: &FieldTypeDefinition,
    owned: usize,
    rule: &FieldCostRule,
    cost_multiplier: f64,
) -> Result<i64, EconError> {
    let growth = match rule {
        FieldCostRule::Exponential => def.cost_growth.powi(owned.min(i32::MAX as usize) as i32),
        FieldCostRule::Linear { step } => 1.0 + owned as f64 * step,
    };
    let v = Decimal::from(def.base_cost)
        .checked_mul(dec(growth)?)
        .and_then(|d| d.checked_mul(dec(cost_multiplier).ok()?))
        .ok_or(EconError::Overflow)?;
    floor_i64(v)
}

/// Price of raising equipment from `level` to `level + 1`.
pub fn upgrade_cost(level: u32, step: i64, cost_multiplier: f64) -> Result<i64, EconError> {
    let base = i64::from(level)
        .checked_mul(step)
        .ok_or(EconError::Overflow)?;
    scale(base, cost_multiplier)
}

/// Maintenance bill from the summed per-field costs.
pub fn maintenance_cost(
    base_total: i64,
    effects: &EffectBundle,
    reduction_cap: f64,
    crisis_multiplier: f64,
) -> Result<i64, EconError> {
    scale(
        base_total,
        effects.maintenance_factor(reduction_cap) * crisis_multiplier,
    )
}

/// Likely direction of the market next month.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TrendOutlook {
    pub current: MarketTrend,
    pub down: f64,
    pub stay: f64,
    pub up: f64,
    /// Probability-weighted trend multiplier.
    pub expected_multiplier: f64,
}

/// Next-month trend distribution, available once market prediction is owned.
pub fn outlook(
    trend: MarketTrend,
    effects: &EffectBundle,
    rules: &RuleConfig,
) -> Option<TrendOutlook> {
    if !effects.has_market_prediction() {
        return None;
    }
    let p = rules.trend_change_probability.clamp(0.0, 1.0);
    let half = p / 2.0;
    let lower = trend.step(false);
    let upper = trend.step(true);
    let down = if lower == trend { 0.0 } else { half };
    let up = if upper == trend { 0.0 } else { half };
    let stay = 1.0 - down - up;
    let expected_multiplier =
        down * lower.multiplier() + stay * trend.multiplier() + up * upper.multiplier();
    Some(TrendOutlook {
        current: trend,
        down,
        stay,
        up,
        expected_multiplier,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use oil_core::{ActiveCrisis, CrisisId, Demand, LastingEffect, ScriptedSource, TechEffect};
    use proptest::prelude::*;

    fn crash() -> ActiveCrisis {
        ActiveCrisis {
            template_id: CrisisId::from("market_crash"),
            name: "Global Market Crash".into(),
            effect: LastingEffect::PriceChange { delta: -0.6 },
            months_remaining: 6,
            started_month: 0,
        }
    }

    fn continent(multiplier: f64) -> Continent {
        Continent {
            id: "europe".into(),
            name: "Europe".into(),
            multiplier,
            demand: Demand::High,
            shipping_months: 3,
        }
    }

    #[test]
    fn neutral_roll_gives_reference_price() {
        let mut rng = ScriptedSource::constant(0.5);
        let p = roll_base_price(
            MarketTrend::Stable,
            &CrisisState::default(),
            &EffectBundle::default(),
            &RuleConfig::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(p, 50);
    }

    #[test]
    fn crash_applies_after_minimum() {
        let mut crises = CrisisState::default();
        crises.active.push(crash());
        let mut rng = ScriptedSource::constant(0.5);
        let p = roll_base_price(
            MarketTrend::Stable,
            &crises,
            &EffectBundle::default(),
            &RuleConfig::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(p, 20);
    }

    #[test]
    fn price_bonus_applies_last() {
        let mut effects = EffectBundle::default();
        effects.absorb(&TechEffect::PriceBonus(0.2));
        let mut rng = ScriptedSource::constant(0.5);
        let p = roll_base_price(
            MarketTrend::Stable,
            &CrisisState::default(),
            &effects,
            &RuleConfig::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(p, 60);
    }

    #[test]
    fn trend_moves_only_below_probability() {
        let mut stay = ScriptedSource::constant(0.3);
        assert_eq!(advance_trend(MarketTrend::Stable, 0.3, &mut stay), MarketTrend::Stable);
        let mut up = ScriptedSource::new(vec![0.1, 0.2]);
        assert_eq!(advance_trend(MarketTrend::Stable, 0.3, &mut up), MarketTrend::Rising);
        let mut down = ScriptedSource::new(vec![0.1, 0.7]);
        assert_eq!(advance_trend(MarketTrend::Stable, 0.3, &mut down), MarketTrend::Declining);
    }

    #[test]
    fn continent_and_trading_bonus() {
        let mut effects = EffectBundle::default();
        assert_eq!(continent_price(50, &continent(1.1), &effects).unwrap(), 55);
        effects.absorb(&TechEffect::TradingProfitBonus(0.25));
        assert_eq!(continent_price(50, &continent(1.1), &effects).unwrap(), 68);
    }

    #[test]
    fn revenue_overflow_is_an_error() {
        assert_eq!(revenue(1000, 50).unwrap(), 50_000);
        assert_eq!(revenue(u64::MAX, i64::MAX), Err(EconError::Overflow));
    }

    #[test]
    fn linear_and_exponential_costs() {
        let def = FieldTypeDefinition {
            id: "conventional".into(),
            name: "Conventional".into(),
            base_cost: 25_000,
            cost_growth: 1.2,
            base_production: 100.0,
            production_variability: 0.1,
            maintenance_cost: 2000,
            depletion_rate: 0.002,
            risk_factor: 0.1,
            requires_tech: None,
            lifespan_months: None,
        };
        assert_eq!(field_purchase_cost(&def, 0, &FieldCostRule::Exponential, 1.0).unwrap(), 25_000);
        assert_eq!(field_purchase_cost(&def, 1, &FieldCostRule::Exponential, 1.0).unwrap(), 30_000);
        let linear = FieldCostRule::Linear { step: 0.4 };
        assert_eq!(field_purchase_cost(&def, 1, &linear, 1.0).unwrap(), 35_000);
        assert_eq!(field_purchase_cost(&def, 0, &FieldCostRule::Exponential, 2.0).unwrap(), 50_000);
    }

    #[test]
    fn outlook_requires_prediction() {
        let rules = RuleConfig::default();
        assert!(outlook(MarketTrend::Stable, &EffectBundle::default(), &rules).is_none());
        let mut effects = EffectBundle::default();
        effects.absorb(&TechEffect::MarketPrediction(0.5));
        let o = outlook(MarketTrend::Booming, &effects, &rules).unwrap();
        assert_eq!(o.up, 0.0);
        assert!((o.down + o.stay - 1.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn base_price_respects_minimum_without_crisis(draw in 0.0f64..1.0, level in 0i64..5) {
            let mut rng = ScriptedSource::constant(draw);
            let rules = RuleConfig::default();
            let p = roll_base_price(
                MarketTrend::from_index(level),
                &CrisisState::default(),
                &EffectBundle::default(),
                &rules,
                &mut rng,
            ).unwrap();
            prop_assert!(p >= rules.minimum_price);
        }

        #[test]
        fn trend_walk_stays_in_range(draws in proptest::collection::vec(0.0f64..1.0, 1..64)) {
            let mut rng = ScriptedSource::new(draws.clone());
            let mut t = MarketTrend::Stable;
            for _ in 0..draws.len() {
                let next = advance_trend(t, 0.3, &mut rng);
                prop_assert!((next.index() as i64 - t.index() as i64).abs() <= 1);
                t = next;
            }
        }
    }
}
