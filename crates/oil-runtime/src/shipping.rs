//! Moving oil from central storage to continents and selling it there.

use crate::amount_error;
use oil_core::{Catalog, Continent, ContinentId, GameError, PlayerState, Shipment};
use oil_econ as econ;
use serde::Serialize;
use tracing::{debug, info};

/// Oil that reached a continent this month.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Arrival {
    pub continent: ContinentId,
    pub amount: u64,
    pub shipments: u32,
}

pub struct ShipmentLedger<'a> {
    catalog: &'a Catalog,
}

impl<'a> ShipmentLedger<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    fn continent(&self, id: &ContinentId) -> Result<&'a Continent, GameError> {
        self.catalog
            .continent(id)
            .ok_or_else(|| GameError::UnknownContinent(id.clone()))
    }

    /// Months a shipment sent now would travel: the base time less the
    /// shipping speed bonus (at least one month), scaled up by any active
    /// shipping delay.
    pub fn shipping_time(&self, state: &PlayerState, id: &ContinentId) -> Result<u32, GameError> {
        let base = self.continent(id)?.shipping_months;
        let reduced = base
            .saturating_sub(state.research.effects.shipping_speed_bonus)
            .max(1);
        let delayed = (f64::from(reduced) * state.crises.shipping_delay()).ceil();
        Ok(if delayed.is_finite() {
            (delayed as u32).max(1)
        } else {
            reduced
        })
    }

    /// Send `amount` barrels from central stock. Returns the travel time.
    pub fn ship(
        &self,
        state: &mut PlayerState,
        id: &ContinentId,
        amount: u64,
    ) -> Result<u32, GameError> {
        let months = self.shipping_time(state, id)?;
        if amount == 0 || amount > state.oil_stock {
            return Err(GameError::InsufficientOil {
                requested: amount,
                available: state.oil_stock,
            });
        }
        state.oil_stock -= amount;
        state
            .ledgers
            .entry(id.clone())
            .or_default()
            .in_transit
            .push(Shipment {
                amount,
                months_remaining: months,
            });
        debug!(continent = %id, amount, months, "shipment sent");
        Ok(months)
    }

    /// One month of travel for every shipment. Arrivals are grouped per
    /// continent; order within a month does not matter.
    pub fn advance(&self, state: &mut PlayerState) -> Vec<Arrival> {
        let mut arrivals = Vec::new();
        for (id, ledger) in state.ledgers.iter_mut() {
            if ledger.in_transit.is_empty() {
                continue;
            }
            let mut amount = 0u64;
            let mut shipments = 0u32;
            ledger.in_transit.retain_mut(|s| {
                s.months_remaining = s.months_remaining.saturating_sub(1);
                if s.months_remaining == 0 {
                    amount = amount.saturating_add(s.amount);
                    shipments += 1;
                    false
                } else {
                    true
                }
            });
            if shipments > 0 {
                ledger.available = ledger.available.saturating_add(amount);
                arrivals.push(Arrival {
                    continent: id.clone(),
                    amount,
                    shipments,
                });
            }
        }
        for arrival in &arrivals {
            state.stats.shipments_delivered += arrival.shipments;
            info!(continent = %arrival.continent, amount = arrival.amount, "shipment arrived");
        }
        arrivals
    }

    /// Selling price on a continent this month.
    pub fn continent_price(&self, state: &PlayerState, id: &ContinentId) -> Result<i64, GameError> {
        let continent = self.continent(id)?;
        econ::continent_price(state.market.base_price, continent, &state.research.effects)
            .map_err(amount_error)
    }

    /// Sell `amount` barrels at an explicit unit price. Returns the revenue.
    pub fn sell_at(
        &self,
        state: &mut PlayerState,
        id: &ContinentId,
        amount: u64,
        unit_price: i64,
    ) -> Result<i64, GameError> {
        self.continent(id)?;
        let available = state.ledgers.get(id).map_or(0, |l| l.available);
        if amount == 0 || amount > available {
            return Err(GameError::InsufficientAvailable {
                continent: id.clone(),
                requested: amount,
                available,
            });
        }
        if unit_price < 0 {
            return Err(GameError::AmountOutOfRange);
        }
        let revenue = econ::revenue(amount, unit_price).map_err(amount_error)?;
        if let Some(ledger) = state.ledgers.get_mut(id) {
            ledger.available -= amount;
        }
        state.credit(revenue);
        state.stats.total_sold = state.stats.total_sold.saturating_add(amount);
        debug!(continent = %id, amount, unit_price, revenue, "oil sold");
        Ok(revenue)
    }

    /// Sell at the continent's current price.
    pub fn sell(
        &self,
        state: &mut PlayerState,
        id: &ContinentId,
        amount: u64,
    ) -> Result<i64, GameError> {
        let price = self.continent_price(state, id)?;
        self.sell_at(state, id, amount, price)
    }
}
