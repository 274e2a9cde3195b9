//! Research: one technology at a time, paid up front, effects folded into
//! the player's [`EffectBundle`] on completion.

use oil_core::{
    Catalog, EffectBundle, GameError, PlayerState, ResearchProgress, TechEffect, TechId,
    TechnologyDefinition,
};
use tracing::{debug, info};

pub struct TechnologyEngine<'a> {
    catalog: &'a Catalog,
}

impl<'a> TechnologyEngine<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Technologies that could be started now: not completed, not running,
    /// every prerequisite completed. Catalog order.
    pub fn available(&self, state: &PlayerState) -> Vec<&'a TechnologyDefinition> {
        let running = state.research.in_progress.as_ref().map(|p| &p.tech);
        self.catalog
            .technologies
            .iter()
            .filter(|t| !state.research.completed.contains(&t.id))
            .filter(|t| running != Some(&t.id))
            .filter(|t| {
                t.prerequisites
                    .iter()
                    .all(|p| state.research.completed.contains(p))
            })
            .collect()
    }

    pub fn start_research(&self, state: &mut PlayerState, tech: &TechId) -> Result<(), GameError> {
        let def = self
            .catalog
            .technology(tech)
            .ok_or_else(|| GameError::UnknownTechnology(tech.clone()))?;
        if state.research.completed.contains(tech) {
            return Err(GameError::AlreadyResearched(tech.clone()));
        }
        if let Some(running) = &state.research.in_progress {
            return Err(GameError::AlreadyResearching(running.tech.clone()));
        }
        let missing: Vec<TechId> = def
            .prerequisites
            .iter()
            .filter(|p| !state.research.completed.contains(p))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(GameError::PrerequisitesUnmet {
                tech: tech.clone(),
                missing,
            });
        }
        if state.money < def.cost {
            return Err(GameError::InsufficientFunds {
                needed: def.cost,
                available: state.money,
            });
        }
        state.debit(def.cost);
        state.research.in_progress = Some(ResearchProgress {
            tech: tech.clone(),
            months_left: def.research_months,
            total_months: def.research_months,
        });
        debug!(%tech, cost = def.cost, months = def.research_months, "research started");
        Ok(())
    }

    /// Abandon the running research. The cost is not refunded and progress
    /// is lost; a later restart pays and waits in full again.
    pub fn cancel_research(&self, state: &mut PlayerState) -> Result<TechId, GameError> {
        let progress = state
            .research
            .in_progress
            .take()
            .ok_or(GameError::NoActiveResearch)?;
        info!(tech = %progress.tech, months_left = progress.months_left, "research cancelled");
        Ok(progress.tech)
    }

    /// One month of research. Returns the technology completed this month,
    /// if any (at most one).
    pub fn advance(&self, state: &mut PlayerState) -> Vec<&'a TechnologyDefinition> {
        let Some(progress) = state.research.in_progress.as_mut() else {
            return Vec::new();
        };
        progress.months_left = progress.months_left.saturating_sub(1);
        if progress.months_left > 0 {
            return Vec::new();
        }
        let Some(finished) = state.research.in_progress.take() else {
            return Vec::new();
        };
        let Some(def) = self.catalog.technology(&finished.tech) else {
            debug!(tech = %finished.tech, "dropping research missing from catalog");
            return Vec::new();
        };
        state.research.completed.insert(def.id.clone());
        state.research.effects.absorb(&def.effect);
        if let TechEffect::FieldLifeExtension(months) = def.effect {
            for field in &mut state.fields {
                if let Some(left) = field.months_remaining.as_mut() {
                    *left = left.saturating_add(months);
                }
            }
        }
        debug_assert!(state.research.in_progress.is_none());
        info!(tech = %def.id, name = %def.name, "research completed");
        vec![def]
    }

    /// Accumulated bonuses of every completed technology.
    pub fn effect_bundle<'s>(&self, state: &'s PlayerState) -> &'s EffectBundle {
        &state.research.effects
    }
}
