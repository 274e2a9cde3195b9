#![deny(warnings)]

//! Monthly simulation engine for Oil Empire.
//!
//! [`Simulation`] holds the static catalog and rules. The engines it hands
//! out borrow those and operate on a caller-owned [`PlayerState`]; none of
//! them keeps game state of its own. [`Simulation::advance_one_month`] runs
//! one month in a fixed order, and [`Session`] wraps it for interactive hosts.

pub mod crisis;
pub mod fields;
pub mod incidents;
pub mod session;
pub mod shipping;
pub mod technology;
pub mod tick;

pub use crisis::{CrisisEngine, CrisisImpact, TriggeredCrisis};
pub use fields::FieldEngine;
pub use incidents::{Incident, IncidentEngine};
pub use session::{Session, SessionTick, SharedSession, TickError};
pub use shipping::{Arrival, ShipmentLedger};
pub use technology::TechnologyEngine;
pub use tick::TickReport;

use oil_core::{Catalog, CatalogError, GameError, PlayerState, RuleConfig};
use oil_econ::EconError;

/// Static content plus rules; the factory for every engine.
#[derive(Clone, Debug)]
pub struct Simulation {
    catalog: Catalog,
    rules: RuleConfig,
}

impl Simulation {
    pub fn new(catalog: Catalog, rules: RuleConfig) -> Self {
        Self { catalog, rules }
    }

    /// Built-in catalog with default rules.
    pub fn builtin() -> Result<Self, CatalogError> {
        Ok(Self::new(Catalog::builtin()?, RuleConfig::default()))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn rules(&self) -> &RuleConfig {
        &self.rules
    }

    /// A fresh game under these rules.
    pub fn new_game(&self) -> PlayerState {
        PlayerState::new(&self.catalog, &self.rules)
    }

    pub fn fields(&self) -> FieldEngine<'_> {
        FieldEngine::new(&self.catalog, &self.rules)
    }

    pub fn technology(&self) -> TechnologyEngine<'_> {
        TechnologyEngine::new(&self.catalog)
    }

    pub fn crises(&self) -> CrisisEngine<'_> {
        CrisisEngine::new(&self.catalog, &self.rules)
    }

    pub fn shipping(&self) -> ShipmentLedger<'_> {
        ShipmentLedger::new(&self.catalog)
    }

    pub fn incidents(&self) -> IncidentEngine<'_> {
        IncidentEngine::new(&self.rules.minor_events)
    }
}

/// Arithmetic failures surface to players as an out-of-range amount.
pub(crate) fn amount_error(e: EconError) -> GameError {
    tracing::debug!(error = %e, "amount arithmetic failed");
    GameError::AmountOutOfRange
}
