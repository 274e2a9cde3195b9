//! Minor monthly incidents: leaks, windfalls and surprise bills that sit
//! outside the crisis catalog and leave no history.

use oil_core::{MinorEvent, MinorEventTable, PlayerState, RandomSource};
use serde::Serialize;
use tracing::info;

/// What a minor incident did this month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Incident {
    PipelineLeak { barrels: u64 },
    Windfall { amount: i64 },
    MaintenanceBill { amount: i64 },
    OilPocket { barrels: u64 },
}

pub struct IncidentEngine<'a> {
    table: &'a MinorEventTable,
}

impl<'a> IncidentEngine<'a> {
    pub fn new(table: &'a MinorEventTable) -> Self {
        Self { table }
    }

    /// One chance draw, then one uniform pick on success. An empty table
    /// draws nothing.
    pub fn roll(
        &self,
        state: &mut PlayerState,
        production: u64,
        rng: &mut impl RandomSource,
    ) -> Option<Incident> {
        if self.table.events.is_empty() || !rng.chance(self.table.chance) {
            return None;
        }
        let event = &self.table.events[rng.index(self.table.events.len())];
        let incident = apply(state, event, production);
        info!(?incident, "incident");
        Some(incident)
    }
}

fn apply(state: &mut PlayerState, event: &MinorEvent, production: u64) -> Incident {
    match *event {
        MinorEvent::PipelineLeak { stock_fraction } => {
            let barrels = ((state.oil_stock as f64 * stock_fraction).floor() as u64)
                .min(state.oil_stock);
            state.oil_stock -= barrels;
            Incident::PipelineLeak { barrels }
        }
        MinorEvent::Windfall { money_fraction } => {
            let amount = (state.money.max(0) as f64 * money_fraction).floor() as i64;
            state.credit(amount);
            Incident::Windfall { amount }
        }
        MinorEvent::MaintenanceBill { per_field } => {
            let amount = per_field.saturating_mul(state.fields.len() as i64);
            state.debit(amount);
            Incident::MaintenanceBill { amount }
        }
        MinorEvent::OilPocket {
            production_fraction,
        } => {
            let barrels = (production as f64 * production_fraction).floor() as u64;
            state.oil_stock = state.oil_stock.saturating_add(barrels);
            Incident::OilPocket { barrels }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oil_core::{Catalog, FieldTypeId, RuleConfig, ScriptedSource};

    fn fresh() -> (Catalog, RuleConfig, PlayerState) {
        let catalog = Catalog::builtin().unwrap();
        let rules = RuleConfig::default();
        let state = PlayerState::new(&catalog, &rules);
        (catalog, rules, state)
    }

    #[test]
    fn quiet_month_draws_once() {
        let (_, rules, mut state) = fresh();
        let mut rng = ScriptedSource::constant(0.15);
        assert_eq!(
            IncidentEngine::new(&rules.minor_events).roll(&mut state, 500, &mut rng),
            None
        );
        assert_eq!(rng.consumed(), 1);
        assert_eq!(state.money, 100_000);
    }

    #[test]
    fn each_slot_hits_its_event() {
        let (catalog, rules, mut state) = fresh();
        let engine = IncidentEngine::new(&rules.minor_events);
        let fields = crate::FieldEngine::new(&catalog, &rules);
        let mut buy = ScriptedSource::constant(0.5);
        for _ in 0..2 {
            fields
                .purchase(&mut state, &FieldTypeId::from("conventional"), &mut buy)
                .unwrap();
        }
        let money = state.money;
        state.oil_stock = 1_005;

        let mut rng = ScriptedSource::new(vec![0.0, 0.1]);
        let leak = engine.roll(&mut state, 300, &mut rng);
        assert_eq!(leak, Some(Incident::PipelineLeak { barrels: 100 }));
        assert_eq!(state.oil_stock, 905);

        let mut rng = ScriptedSource::new(vec![0.0, 0.3]);
        let windfall = engine.roll(&mut state, 300, &mut rng);
        let bonus = (money as f64 * 0.05).floor() as i64;
        assert_eq!(windfall, Some(Incident::Windfall { amount: bonus }));
        assert_eq!(state.money, money + bonus);

        let mut rng = ScriptedSource::new(vec![0.0, 0.6]);
        let bill = engine.roll(&mut state, 300, &mut rng);
        assert_eq!(bill, Some(Incident::MaintenanceBill { amount: 4_000 }));
        assert_eq!(state.money, money + bonus - 4_000);

        let mut rng = ScriptedSource::new(vec![0.0, 0.9]);
        let pocket = engine.roll(&mut state, 301, &mut rng);
        assert_eq!(pocket, Some(Incident::OilPocket { barrels: 150 }));
        assert_eq!(state.oil_stock, 1_055);
    }

    #[test]
    fn windfall_ignores_debt() {
        let (_, _, mut state) = fresh();
        state.money = -10_000;
        let table = MinorEventTable {
            chance: 1.0,
            events: vec![MinorEvent::Windfall {
                money_fraction: 0.05,
            }],
        };
        let mut rng = ScriptedSource::constant(0.5);
        let hit = IncidentEngine::new(&table).roll(&mut state, 0, &mut rng);
        assert_eq!(hit, Some(Incident::Windfall { amount: 0 }));
        assert_eq!(state.money, -10_000);
    }

    #[test]
    fn empty_table_never_draws() {
        let (_, _, mut state) = fresh();
        let table = MinorEventTable {
            chance: 1.0,
            events: vec![],
        };
        let mut rng = ScriptedSource::constant(0.0);
        assert_eq!(IncidentEngine::new(&table).roll(&mut state, 10, &mut rng), None);
        assert_eq!(rng.consumed(), 0);
    }
}
