//! The monthly tick.

use crate::crisis::TriggeredCrisis;
use crate::incidents::Incident;
use crate::shipping::Arrival;
use crate::Simulation;
use chrono::NaiveDate;
use oil_core::{CrisisId, FieldId, MarketTrend, PlayerState, RandomSource, TechId};
use serde::Serialize;
use tracing::{debug, warn};

/// Everything that happened in one month, for the host to render or log.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TickReport {
    /// The month that was processed.
    pub date: NaiveDate,
    pub production: u64,
    pub completed_research: Vec<TechId>,
    pub resolved_crises: Vec<CrisisId>,
    pub triggered: Vec<TriggeredCrisis>,
    pub incident: Option<Incident>,
    pub arrivals: Vec<Arrival>,
    pub expired_fields: Vec<FieldId>,
    pub insurance_paid: i64,
    pub base_price: i64,
    pub trend: MarketTrend,
}

impl Simulation {
    /// Process one month. Steps run in a fixed order: fields age, research
    /// advances, active crises count down, production is credited, shipments
    /// move, new crises roll, a minor incident may strike, the market moves,
    /// then the calendar.
    ///
    /// Research completes before production so a new yield bonus counts this
    /// month; crises roll after production so they first bite next month.
    pub fn advance_one_month(
        &self,
        state: &mut PlayerState,
        rng: &mut impl RandomSource,
    ) -> TickReport {
        let date = state.date;
        let fields = self.fields();
        let crises = self.crises();
        let shipping = self.shipping();

        let expired_fields = fields.age_and_deplete(state);

        let completed_research: Vec<TechId> = self
            .technology()
            .advance(state)
            .into_iter()
            .map(|t| t.id.clone())
            .collect();

        let resolved_crises = crises.advance_active(state);
        let mut insurance_paid = 0;
        if state.crises.has_lasting() && state.research.effects.crisis_insurance > 0 {
            insurance_paid = state.research.effects.crisis_insurance;
            state.credit(insurance_paid);
        }

        let production = fields.production(state, rng);
        state.oil_stock = state.oil_stock.saturating_add(production);
        state.stats.total_drilled = state.stats.total_drilled.saturating_add(production);
        state.stats.last_production = production;

        let arrivals = shipping.advance(state);

        let triggered = crises.roll_for_new_events(state, rng);
        let incident = self.incidents().roll(state, production, rng);

        if let Err(e) = oil_econ::update_market(state, self.rules(), rng) {
            warn!(
                error = %e,
                price = state.market.base_price,
                "price roll failed; keeping last price"
            );
        }

        state.advance_calendar();
        state.stats.months_played += 1;
        state.stats.max_money = state.stats.max_money.max(state.money);

        debug!(
            %date,
            production,
            price = state.market.base_price,
            money = state.money,
            "month processed"
        );

        TickReport {
            date,
            production,
            completed_research,
            resolved_crises,
            triggered,
            incident,
            arrivals,
            expired_fields,
            insurance_paid,
            base_price: state.market.base_price,
            trend: state.market.trend,
        }
    }
}
