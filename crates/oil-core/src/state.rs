//! The single mutable aggregate of a game.

use crate::catalog::Catalog;
use crate::crisis::CrisisState;
use crate::effects::EffectBundle;
use crate::ids::{ContinentId, FieldId, FieldTypeId, IdSet, TechId};
use crate::market::MarketState;
use crate::rules::RuleConfig;
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// A purchased field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OwnedField {
    pub id: FieldId,
    pub field_type: FieldTypeId,
    /// Rolled at purchase; only crisis damage changes it afterwards.
    pub efficiency: f64,
    /// Production baseline at purchase time.
    pub base_production: f64,
    /// Baseline after depletion.
    pub current_production: f64,
    pub age_months: u32,
    /// Age at the last maintenance (0 when never maintained).
    #[serde(default)]
    pub last_maintenance_age: u32,
    /// Remaining life of limited-life fields.
    #[serde(default)]
    pub months_remaining: Option<u32>,
}

impl OwnedField {
    pub fn months_since_maintenance(&self) -> u32 {
        self.age_months.saturating_sub(self.last_maintenance_age)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResearchProgress {
    pub tech: TechId,
    pub months_left: u32,
    pub total_months: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchState {
    pub completed: IdSet<TechId>,
    pub in_progress: Option<ResearchProgress>,
    pub effects: EffectBundle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub amount: u64,
    pub months_remaining: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinentLedger {
    pub available: u64,
    pub in_transit: Vec<Shipment>,
}

impl ContinentLedger {
    pub fn in_transit_total(&self) -> u64 {
        self.in_transit.iter().map(|s| s.amount).sum()
    }
}

/// Running totals read by achievement predicates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub total_drilled: u64,
    pub total_sold: u64,
    pub months_played: u32,
    pub max_money: i64,
    pub fields_purchased: u32,
    pub shipments_delivered: u32,
    /// Output of the most recent month.
    pub last_production: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerState {
    pub money: i64,
    pub oil_stock: u64,
    pub equipment_level: u32,
    /// Always the first day of the current month.
    pub date: NaiveDate,
    pub fields: Vec<OwnedField>,
    pub next_field_id: u64,
    pub research: ResearchState,
    pub market: MarketState,
    pub crises: CrisisState,
    pub ledgers: BTreeMap<ContinentId, ContinentLedger>,
    pub stats: Statistics,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::with_rules(&RuleConfig::default())
    }
}

/// Read-only projection of the raw statistics achievements are judged on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Progress {
    pub money: i64,
    pub max_money: i64,
    pub oil_stock: u64,
    pub year: i32,
    pub total_drilled: u64,
    pub total_sold: u64,
    pub months_played: u32,
    pub equipment_level: u32,
    pub fields_owned: usize,
    pub fields_purchased: u32,
    pub monthly_production: u64,
    pub total_in_transit: u64,
    pub continents_with_stock: usize,
    pub continent_count: usize,
    pub technologies_completed: usize,
}

impl PlayerState {
    /// Fresh game without continent ledgers; see [`PlayerState::new`].
    pub fn with_rules(rules: &RuleConfig) -> Self {
        Self {
            money: rules.starting_money,
            oil_stock: 0,
            equipment_level: 1,
            date: rules.start_date.with_day(1).unwrap_or(rules.start_date),
            fields: Vec::new(),
            next_field_id: 1,
            research: ResearchState::default(),
            market: MarketState {
                base_price: rules.reference_price.floor() as i64,
                ..MarketState::default()
            },
            crises: CrisisState::default(),
            ledgers: BTreeMap::new(),
            stats: Statistics {
                max_money: rules.starting_money,
                ..Statistics::default()
            },
        }
    }

    /// Fresh game with one empty ledger per continent.
    pub fn new(catalog: &Catalog, rules: &RuleConfig) -> Self {
        let mut s = Self::with_rules(rules);
        s.reconcile(catalog);
        s
    }

    /// Bring a loaded state in line with the catalog: ledgers for continents
    /// added since the save, and a sane equipment level.
    pub fn reconcile(&mut self, catalog: &Catalog) {
        for c in &catalog.continents {
            if !self.ledgers.contains_key(&c.id) {
                debug!(continent = %c.id, "adding ledger for new continent");
                self.ledgers.insert(c.id.clone(), ContinentLedger::default());
            }
        }
        self.equipment_level = self.equipment_level.max(1);
        let max_id = self.fields.iter().map(|f| f.id.0).max().unwrap_or(0);
        self.next_field_id = self.next_field_id.max(max_id + 1);
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// 1-based month of the year.
    pub fn month(&self) -> u32 {
        self.date.month()
    }

    /// Months since year 0, used for cooldown arithmetic.
    pub fn month_index(&self) -> i32 {
        self.date.year() * 12 + self.date.month0() as i32
    }

    /// Move the calendar one month forward, wrapping December into January.
    pub fn advance_calendar(&mut self) {
        if let Some(next) = self.date.checked_add_months(Months::new(1)) {
            self.date = next;
        }
    }

    pub fn owned_of_type(&self, field_type: &FieldTypeId) -> usize {
        self.fields
            .iter()
            .filter(|f| &f.field_type == field_type)
            .count()
    }

    pub fn allocate_field_id(&mut self) -> FieldId {
        let id = FieldId(self.next_field_id);
        self.next_field_id += 1;
        id
    }

    pub fn effects(&self) -> &EffectBundle {
        &self.research.effects
    }

    pub fn credit(&mut self, amount: i64) {
        self.money = self.money.saturating_add(amount);
        self.stats.max_money = self.stats.max_money.max(self.money);
    }

    pub fn debit(&mut self, amount: i64) {
        self.money = self.money.saturating_sub(amount);
    }

    pub fn total_in_transit(&self) -> u64 {
        self.ledgers.values().map(ContinentLedger::in_transit_total).sum()
    }

    pub fn total_available(&self) -> u64 {
        self.ledgers.values().map(|l| l.available).sum()
    }

    pub fn progress(&self) -> Progress {
        Progress {
            money: self.money,
            max_money: self.stats.max_money.max(self.money),
            oil_stock: self.oil_stock,
            year: self.year(),
            total_drilled: self.stats.total_drilled,
            total_sold: self.stats.total_sold,
            months_played: self.stats.months_played,
            equipment_level: self.equipment_level,
            fields_owned: self.fields.len(),
            fields_purchased: self.stats.fields_purchased,
            monthly_production: self.stats.last_production,
            total_in_transit: self.total_in_transit(),
            continents_with_stock: self.ledgers.values().filter(|l| l.available > 0).count(),
            continent_count: self.ledgers.len(),
            technologies_completed: self.research.completed.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calendar_wraps_year() {
        let mut s = PlayerState::default();
        s.date = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        s.advance_calendar();
        assert_eq!((s.year(), s.month()), (2025, 1));
    }

    #[test]
    fn month_index_is_contiguous() {
        let mut s = PlayerState::default();
        s.date = NaiveDate::from_ymd_opt(2024, 12, 1).unwrap();
        let before = s.month_index();
        s.advance_calendar();
        assert_eq!(s.month_index(), before + 1);
    }

    #[test]
    fn new_state_has_a_ledger_per_continent() {
        let catalog = Catalog::builtin().unwrap();
        let s = PlayerState::new(&catalog, &RuleConfig::default());
        assert_eq!(s.ledgers.len(), catalog.continents.len());
        assert_eq!(s.money, 100_000);
        assert_eq!(s.equipment_level, 1);
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let s: PlayerState = serde_json::from_str(r#"{"money": 42}"#).unwrap();
        assert_eq!(s.money, 42);
        assert_eq!(s.equipment_level, 1);
        assert!(s.research.completed.is_empty());
        assert!(s.crises.active.is_empty());
    }

    #[test]
    fn reconcile_adds_new_continents_and_fixes_ids() {
        let catalog = Catalog::builtin().unwrap();
        let mut s = PlayerState::default();
        s.fields.push(OwnedField {
            id: FieldId(9),
            field_type: FieldTypeId::from("conventional"),
            efficiency: 1.0,
            base_production: 100.0,
            current_production: 100.0,
            age_months: 0,
            last_maintenance_age: 0,
            months_remaining: None,
        });
        s.reconcile(&catalog);
        assert_eq!(s.ledgers.len(), catalog.continents.len());
        assert_eq!(s.allocate_field_id(), FieldId(10));
    }
}
