//! Rule constants and the per-mechanic rule choices.
//!
//! Every field has a default, so a YAML override only needs the keys it
//! changes.

use crate::error::CatalogError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// How a field's purchase price grows with the number already owned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FieldCostRule {
    /// `base × growth^owned`, using the field type's own growth.
    Exponential,
    /// `base × (1 + owned × step)`.
    Linear { step: f64 },
}

/// Whether several crises may start in the same month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrisisTriggerPolicy {
    /// Every eligible template draws once, independently.
    EvaluateAll,
    /// Templates draw in catalog order; the first success ends the roll.
    FirstMatch,
}

/// A small monthly incident outside the crisis catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MinorEvent {
    /// Loses a share of central stock.
    PipelineLeak { stock_fraction: f64 },
    /// Pays a share of positive cash.
    Windfall { money_fraction: f64 },
    /// Charges a flat amount per owned field.
    MaintenanceBill { per_field: i64 },
    /// Adds a share of this month's production to stock.
    OilPocket { production_fraction: f64 },
}

/// One draw against `chance` each month; on success one event is picked
/// uniformly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinorEventTable {
    pub chance: f64,
    pub events: Vec<MinorEvent>,
}

impl Default for MinorEventTable {
    fn default() -> Self {
        Self {
            chance: 0.15,
            events: vec![
                MinorEvent::PipelineLeak {
                    stock_fraction: 0.1,
                },
                MinorEvent::Windfall {
                    money_fraction: 0.05,
                },
                MinorEvent::MaintenanceBill { per_field: 2_000 },
                MinorEvent::OilPocket {
                    production_fraction: 0.5,
                },
            ],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub starting_money: i64,
    pub start_date: NaiveDate,
    pub reference_price: f64,
    pub minimum_price: i64,
    pub trend_change_probability: f64,
    /// Half-width of the uniform price roll around 1.0.
    pub price_variation: f64,
    pub efficiency_min: f64,
    pub efficiency_max: f64,
    /// Fraction of the purchase-time production a field never drops below.
    pub depletion_floor: f64,
    pub maintenance_grace_months: u32,
    pub overdue_penalty: f64,
    pub field_cost_rule: FieldCostRule,
    pub crisis_policy: CrisisTriggerPolicy,
    /// Minimum months between any two triggers; 0 disables the check.
    pub min_months_between_crises: u32,
    pub risk_per_risk_factor: f64,
    pub crisis_reduction_cap: f64,
    pub maintenance_reduction_cap: f64,
    pub equipment_upgrade_step: i64,
    pub max_equipment_level: u32,
    pub win_money: i64,
    pub end_year: i32,
    pub minor_events: MinorEventTable,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            starting_money: 100_000,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            reference_price: 50.0,
            minimum_price: 20,
            trend_change_probability: 0.3,
            price_variation: 0.1,
            efficiency_min: 0.8,
            efficiency_max: 1.2,
            depletion_floor: 0.3,
            maintenance_grace_months: 12,
            overdue_penalty: 0.2,
            field_cost_rule: FieldCostRule::Exponential,
            crisis_policy: CrisisTriggerPolicy::EvaluateAll,
            min_months_between_crises: 0,
            risk_per_risk_factor: 0.2,
            crisis_reduction_cap: 0.8,
            maintenance_reduction_cap: 0.8,
            equipment_upgrade_step: 50_000,
            max_equipment_level: 20,
            win_money: 10_000_000,
            end_year: 2050,
            minor_events: MinorEventTable::default(),
        }
    }
}

impl RuleConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, CatalogError> {
        let rules: RuleConfig = serde_yaml::from_str(s)?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !(self.reference_price.is_finite() && self.reference_price > 0.0) {
            return Err(out_of_range("reference_price"));
        }
        if self.minimum_price < 0 {
            return Err(out_of_range("minimum_price"));
        }
        if !unit(self.trend_change_probability) {
            return Err(out_of_range("trend_change_probability"));
        }
        if !(unit(self.price_variation) && self.price_variation < 1.0) {
            return Err(out_of_range("price_variation"));
        }
        if !(self.efficiency_min > 0.0 && self.efficiency_min <= self.efficiency_max) {
            return Err(out_of_range("efficiency_min"));
        }
        if !unit(self.depletion_floor) {
            return Err(out_of_range("depletion_floor"));
        }
        if !unit(self.overdue_penalty) {
            return Err(out_of_range("overdue_penalty"));
        }
        if let FieldCostRule::Linear { step } = self.field_cost_rule {
            if !(step.is_finite() && step >= 0.0) {
                return Err(out_of_range("field_cost_rule"));
            }
        }
        if !unit(self.crisis_reduction_cap) || !unit(self.maintenance_reduction_cap) {
            return Err(out_of_range("reduction_cap"));
        }
        if self.max_equipment_level == 0 || self.equipment_upgrade_step < 0 {
            return Err(out_of_range("equipment"));
        }
        let events_ok = self.minor_events.events.iter().all(|e| match *e {
            MinorEvent::PipelineLeak { stock_fraction } => unit(stock_fraction),
            MinorEvent::Windfall { money_fraction } => unit(money_fraction),
            MinorEvent::MaintenanceBill { per_field } => per_field >= 0,
            MinorEvent::OilPocket { production_fraction } => {
                production_fraction.is_finite() && production_fraction >= 0.0
            }
        });
        if !unit(self.minor_events.chance) || !events_ok {
            return Err(out_of_range("minor_events"));
        }
        Ok(())
    }
}

fn out_of_range(field: &'static str) -> CatalogError {
    CatalogError::OutOfRange {
        owner: "rules".into(),
        field,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        RuleConfig::default().validate().unwrap();
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let r = RuleConfig::from_yaml_str(
            "starting_money: 5000\ncrisis_policy: first_match\nfield_cost_rule:\n  rule: linear\n  step: 0.5\n",
        )
        .unwrap();
        assert_eq!(r.starting_money, 5000);
        assert_eq!(r.crisis_policy, CrisisTriggerPolicy::FirstMatch);
        assert_eq!(r.field_cost_rule, FieldCostRule::Linear { step: 0.5 });
        assert_eq!(r.minimum_price, 20);
        assert_eq!(r.end_year, 2050);
    }

    #[test]
    fn rejects_bad_probability() {
        let err = RuleConfig::from_yaml_str("trend_change_probability: 1.5").unwrap_err();
        assert!(matches!(
            err,
            CatalogError::OutOfRange {
                field: "trend_change_probability",
                ..
            }
        ));
    }

    #[test]
    fn minor_events_load_from_yaml() {
        let r = RuleConfig::from_yaml_str(
            "minor_events:\n  chance: 0.05\n  events:\n    - kind: pipeline_leak\n      stock_fraction: 0.2\n",
        )
        .unwrap();
        assert_eq!(r.minor_events.chance, 0.05);
        assert_eq!(
            r.minor_events.events,
            vec![MinorEvent::PipelineLeak {
                stock_fraction: 0.2
            }]
        );
        assert_eq!(RuleConfig::default().minor_events.events.len(), 4);
    }

    #[test]
    fn rejects_negative_maintenance_bill() {
        let mut r = RuleConfig::default();
        r.minor_events.events = vec![MinorEvent::MaintenanceBill { per_field: -1 }];
        assert!(matches!(
            r.validate(),
            Err(CatalogError::OutOfRange {
                field: "minor_events",
                ..
            })
        ));
    }
}
