#![deny(warnings)]

//! Core domain model for Oil Empire.
//!
//! This crate holds the serializable game state, the static catalog with its
//! validation, rule constants, the injectable random source and the error
//! taxonomy shared by every engine.

pub mod catalog;
pub mod crisis;
pub mod effects;
pub mod error;
pub mod ids;
pub mod market;
pub mod rng;
pub mod rules;
pub mod state;

pub use catalog::{
    validate_catalog, Catalog, Continent, Demand, FieldTypeDefinition, TechnologyDefinition,
};
pub use crisis::{
    ActiveCrisis, CrisisKind, CrisisRecord, CrisisState, CrisisTemplate, ImmediateEffect,
    LastingEffect,
};
pub use effects::{EffectBundle, TechEffect};
pub use error::{CatalogError, GameError};
pub use ids::{AchievementId, ContinentId, CrisisId, FieldId, FieldTypeId, IdSet, TechId};
pub use market::{MarketState, MarketTrend};
pub use rng::{ChaChaSource, RandomSource, ScriptedSource};
pub use rules::{CrisisTriggerPolicy, FieldCostRule, MinorEvent, MinorEventTable, RuleConfig};
pub use state::{
    ContinentLedger, OwnedField, PlayerState, Progress, ResearchProgress, ResearchState,
    Shipment, Statistics,
};
