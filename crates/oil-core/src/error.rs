use crate::ids::{ContinentId, FieldTypeId, TechId};
use thiserror::Error;

/// Recoverable failures of player actions. A failed action leaves the
/// game state untouched; the `Display` text is the player-facing reason.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GameError {
    #[error("not enough money: need ${needed}, have ${available}")]
    InsufficientFunds { needed: i64, available: i64 },
    #[error("not enough oil in storage: requested {requested} bbl, have {available} bbl")]
    InsufficientOil { requested: u64, available: u64 },
    #[error("not enough oil in {continent}: requested {requested} bbl, have {available} bbl")]
    InsufficientAvailable {
        continent: ContinentId,
        requested: u64,
        available: u64,
    },
    #[error("already researching {0}")]
    AlreadyResearching(TechId),
    #[error("no research in progress")]
    NoActiveResearch,
    #[error("{0} has already been researched")]
    AlreadyResearched(TechId),
    #[error("{tech} requires {missing:?}")]
    PrerequisitesUnmet { tech: TechId, missing: Vec<TechId> },
    #[error("{field_type} fields require {requires}")]
    FieldTypeLocked {
        field_type: FieldTypeId,
        requires: TechId,
    },
    #[error("equipment is already at the maximum level {0}")]
    MaxEquipmentLevel(u32),
    #[error("amount out of range")]
    AmountOutOfRange,
    #[error("unknown field type: {0}")]
    UnknownFieldType(FieldTypeId),
    #[error("unknown technology: {0}")]
    UnknownTechnology(TechId),
    #[error("unknown continent: {0}")]
    UnknownContinent(ContinentId),
}

/// Catalog and rule-set validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum CatalogError {
    #[error("catalog parse error: {0}")]
    Parse(String),
    #[error("duplicate id: {0}")]
    DuplicateId(String),
    #[error("unknown reference {reference} in {owner}")]
    UnknownReference { owner: String, reference: String },
    #[error("{field} of {owner} is out of range")]
    OutOfRange { owner: String, field: &'static str },
    #[error("technology prerequisites form a cycle through {0}")]
    PrerequisiteCycle(String),
}

impl From<serde_yaml::Error> for CatalogError {
    fn from(e: serde_yaml::Error) -> Self {
        CatalogError::Parse(e.to_string())
    }
}
