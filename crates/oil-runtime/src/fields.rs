//! Purchase, ageing, production, maintenance and crisis damage of fields.

use crate::amount_error;
use oil_core::{
    Catalog, FieldId, FieldTypeDefinition, FieldTypeId, GameError, OwnedField, PlayerState,
    RandomSource, RuleConfig,
};
use oil_econ as econ;
use tracing::debug;

pub struct FieldEngine<'a> {
    catalog: &'a Catalog,
    rules: &'a RuleConfig,
}

impl<'a> FieldEngine<'a> {
    pub fn new(catalog: &'a Catalog, rules: &'a RuleConfig) -> Self {
        Self { catalog, rules }
    }

    fn definition(&self, id: &FieldTypeId) -> Result<&'a FieldTypeDefinition, GameError> {
        self.catalog
            .field_type(id)
            .ok_or_else(|| GameError::UnknownFieldType(id.clone()))
    }

    /// A field type is purchasable once its technology is researched or a
    /// premium unlock names it.
    pub fn is_unlocked(&self, state: &PlayerState, def: &FieldTypeDefinition) -> bool {
        match &def.requires_tech {
            None => true,
            Some(tech) => {
                state.research.completed.contains(tech)
                    || state.research.effects.premium_unlocks.contains(&def.id)
            }
        }
    }

    pub fn purchase_cost(
        &self,
        state: &PlayerState,
        field_type: &FieldTypeId,
    ) -> Result<i64, GameError> {
        let def = self.definition(field_type)?;
        econ::field_purchase_cost(
            def,
            state.owned_of_type(field_type),
            &self.rules.field_cost_rule,
            state.crises.cost_multiplier(),
        )
        .map_err(amount_error)
    }

    /// Buy one field. The efficiency roll happens only after every check passes.
    pub fn purchase(
        &self,
        state: &mut PlayerState,
        field_type: &FieldTypeId,
        rng: &mut impl RandomSource,
    ) -> Result<FieldId, GameError> {
        let def = self.definition(field_type)?;
        if !self.is_unlocked(state, def) {
            if let Some(requires) = &def.requires_tech {
                return Err(GameError::FieldTypeLocked {
                    field_type: def.id.clone(),
                    requires: requires.clone(),
                });
            }
        }
        let cost = self.purchase_cost(state, field_type)?;
        if state.money < cost {
            return Err(GameError::InsufficientFunds {
                needed: cost,
                available: state.money,
            });
        }
        state.debit(cost);
        let id = self.commission(state, def, rng);
        state.stats.fields_purchased += 1;
        debug!(%id, field_type = %def.id, cost, "field purchased");
        Ok(id)
    }

    /// Add a fresh field of `def` with a rolled efficiency. No charge.
    fn commission(
        &self,
        state: &mut PlayerState,
        def: &FieldTypeDefinition,
        rng: &mut impl RandomSource,
    ) -> FieldId {
        let efficiency = rng.range(self.rules.efficiency_min, self.rules.efficiency_max);
        let months_remaining = def
            .lifespan_months
            .map(|m| m.saturating_add(state.research.effects.field_life_extension));
        let id = state.allocate_field_id();
        state.fields.push(OwnedField {
            id,
            field_type: def.id.clone(),
            efficiency,
            base_production: def.base_production,
            current_production: def.base_production,
            age_months: 0,
            last_maintenance_age: 0,
            months_remaining,
        });
        id
    }

    /// Hand out `count` free fields of the first type that needs no
    /// research. Returns how many were added.
    pub fn grant_starter_fields(
        &self,
        state: &mut PlayerState,
        rng: &mut impl RandomSource,
        count: usize,
    ) -> usize {
        let Some(def) = self
            .catalog
            .field_types
            .iter()
            .find(|d| d.requires_tech.is_none())
        else {
            return 0;
        };
        for _ in 0..count {
            let id = self.commission(state, def, rng);
            debug!(%id, field_type = %def.id, "field granted");
        }
        count
    }

    /// Age every field one month and apply depletion, never below the
    /// configured floor of its purchase-time baseline. Limited-life fields
    /// that run out are removed and returned.
    pub fn age_and_deplete(&self, state: &mut PlayerState) -> Vec<FieldId> {
        let floor = self.rules.depletion_floor;
        for field in &mut state.fields {
            field.age_months += 1;
            if let Some(def) = self.catalog.field_type(&field.field_type) {
                let depleted = field.current_production * (1.0 - def.depletion_rate);
                field.current_production = depleted.max(field.base_production * floor);
            }
            if let Some(left) = field.months_remaining.as_mut() {
                *left = left.saturating_sub(1);
            }
        }
        let mut expired = Vec::new();
        state.fields.retain(|f| {
            let done = f.months_remaining == Some(0);
            if done {
                expired.push(f.id);
            }
            !done
        });
        if !expired.is_empty() {
            debug!(count = expired.len(), "fields exhausted");
        }
        expired
    }

    /// Barrels produced this month. Each field draws its own variability roll
    /// in field order; overdue maintenance costs that field a share of its
    /// output for the month.
    pub fn production(&self, state: &PlayerState, rng: &mut impl RandomSource) -> u64 {
        let level = f64::from(state.equipment_level.max(1));
        let mut raw = 0.0;
        for field in &state.fields {
            let Some(def) = self.catalog.field_type(&field.field_type) else {
                continue;
            };
            let mut out = field.efficiency
                * field.current_production
                * level
                * rng.jitter(def.production_variability);
            if field.months_since_maintenance() > self.rules.maintenance_grace_months {
                out *= 1.0 - self.rules.overdue_penalty;
            }
            raw += out.max(0.0);
        }
        let boosted = raw.floor()
            * state.research.effects.production_factor()
            * state.crises.production_multiplier();
        let barrels = if boosted.is_finite() && boosted > 0.0 {
            boosted.floor().min(u64::MAX as f64) as u64
        } else {
            0
        };
        barrels.saturating_add(state.research.effects.synthetic_production)
    }

    pub fn maintenance_cost(&self, state: &PlayerState) -> Result<i64, GameError> {
        let base: i64 = state
            .fields
            .iter()
            .filter_map(|f| self.catalog.field_type(&f.field_type))
            .map(|d| d.maintenance_cost)
            .sum();
        econ::maintenance_cost(
            base,
            &state.research.effects,
            self.rules.maintenance_reduction_cap,
            state.crises.maintenance_multiplier(),
        )
        .map_err(amount_error)
    }

    /// Pay for maintenance of every field and reset their overdue clocks.
    pub fn perform_maintenance(&self, state: &mut PlayerState) -> Result<i64, GameError> {
        let cost = self.maintenance_cost(state)?;
        if state.money < cost {
            return Err(GameError::InsufficientFunds {
                needed: cost,
                available: state.money,
            });
        }
        state.debit(cost);
        for field in &mut state.fields {
            field.last_maintenance_age = field.age_months;
        }
        debug!(cost, fields = state.fields.len(), "maintenance performed");
        Ok(cost)
    }

    pub fn upgrade_cost(&self, state: &PlayerState) -> Result<i64, GameError> {
        econ::upgrade_cost(
            state.equipment_level,
            self.rules.equipment_upgrade_step,
            state.crises.cost_multiplier(),
        )
        .map_err(amount_error)
    }

    /// Raise the equipment level by one. Returns the new level.
    pub fn upgrade_equipment(&self, state: &mut PlayerState) -> Result<u32, GameError> {
        if state.equipment_level >= self.rules.max_equipment_level {
            return Err(GameError::MaxEquipmentLevel(self.rules.max_equipment_level));
        }
        let cost = self.upgrade_cost(state)?;
        if state.money < cost {
            return Err(GameError::InsufficientFunds {
                needed: cost,
                available: state.money,
            });
        }
        state.debit(cost);
        state.equipment_level += 1;
        debug!(level = state.equipment_level, cost, "equipment upgraded");
        Ok(state.equipment_level)
    }

    /// Scale every field's efficiency by `1 - fraction`.
    pub fn damage_all(&self, state: &mut PlayerState, fraction: f64) -> usize {
        for field in &mut state.fields {
            field.efficiency *= 1.0 - fraction;
        }
        state.fields.len()
    }

    /// Cut efficiency of a random subset holding between `min_fraction` and
    /// `max_fraction` of the fields (at least one when any exist).
    pub fn apply_equipment_failure(
        &self,
        state: &mut PlayerState,
        rng: &mut impl RandomSource,
        min_fraction: f64,
        max_fraction: f64,
        efficiency_loss: f64,
    ) -> usize {
        let n = state.fields.len();
        if n == 0 {
            return 0;
        }
        let share = rng.range(min_fraction, max_fraction);
        let count = ((n as f64 * share).round() as usize).clamp(1, n);
        for i in pick_indices(n, count, rng) {
            state.fields[i].efficiency *= 1.0 - efficiency_loss;
        }
        count
    }

    /// Permanently close between one and `max_fields` random fields.
    pub fn apply_environmental_accident(
        &self,
        state: &mut PlayerState,
        rng: &mut impl RandomSource,
        max_fields: u32,
    ) -> Vec<FieldId> {
        if state.fields.is_empty() || max_fields == 0 {
            return Vec::new();
        }
        let count = 1 + rng.index(max_fields as usize);
        self.remove_random(state, rng, count)
    }

    /// Remove `count` random fields (or all of them if fewer are owned).
    pub fn remove_random(
        &self,
        state: &mut PlayerState,
        rng: &mut impl RandomSource,
        count: usize,
    ) -> Vec<FieldId> {
        let count = count.min(state.fields.len());
        let mut doomed = pick_indices(state.fields.len(), count, rng);
        doomed.sort_unstable_by(|a, b| b.cmp(a));
        doomed
            .into_iter()
            .map(|i| state.fields.remove(i).id)
            .collect()
    }
}

/// `count` distinct indices out of `0..n`, by partial Fisher-Yates.
fn pick_indices(n: usize, count: usize, rng: &mut impl RandomSource) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..n).collect();
    let count = count.min(n);
    for i in 0..count {
        let j = i + rng.index(n - i);
        pool.swap(i, j);
    }
    pool.truncate(count);
    pool
}

#[cfg(test)]
mod tests {
    use super::*;
    use oil_core::{ScriptedSource, TechEffect, TechId};
    use proptest::prelude::*;

    fn setup() -> (Catalog, RuleConfig) {
        (Catalog::builtin().unwrap(), RuleConfig::default())
    }

    fn conventional() -> FieldTypeId {
        FieldTypeId::from("conventional")
    }

    #[test]
    fn purchase_debits_and_rolls_efficiency() {
        let (catalog, rules) = setup();
        let engine = FieldEngine::new(&catalog, &rules);
        let mut state = PlayerState::new(&catalog, &rules);
        let mut rng = ScriptedSource::constant(0.25);
        let id = engine.purchase(&mut state, &conventional(), &mut rng).unwrap();
        assert_eq!(state.money, 75_000);
        assert_eq!(state.fields.len(), 1);
        assert_eq!(state.fields[0].id, id);
        assert!((state.fields[0].efficiency - 0.9).abs() < 1e-12);
    }

    #[test]
    fn failed_purchase_leaves_state_untouched() {
        let (catalog, rules) = setup();
        let engine = FieldEngine::new(&catalog, &rules);
        let mut state = PlayerState::new(&catalog, &rules);
        state.money = 10;
        let before = state.clone();
        let mut rng = ScriptedSource::constant(0.5);
        let err = engine.purchase(&mut state, &conventional(), &mut rng).unwrap_err();
        assert!(matches!(
            err,
            GameError::InsufficientFunds {
                needed: 25_000,
                available: 10
            }
        ));
        assert_eq!(state, before);
        assert_eq!(rng.consumed(), 0);
    }

    #[test]
    fn locked_types_need_their_technology() {
        let (catalog, rules) = setup();
        let engine = FieldEngine::new(&catalog, &rules);
        let mut state = PlayerState::new(&catalog, &rules);
        state.money = 1_000_000;
        let mut rng = ScriptedSource::constant(0.5);
        let offshore = FieldTypeId::from("offshore");
        assert!(matches!(
            engine.purchase(&mut state, &offshore, &mut rng),
            Err(GameError::FieldTypeLocked { .. })
        ));
        state
            .research
            .effects
            .absorb(&TechEffect::PremiumUnlock(offshore.clone()));
        assert!(engine.purchase(&mut state, &offshore, &mut rng).is_ok());
        let heavy = FieldTypeId::from("heavy_oil");
        state.research.completed.insert(TechId::from("advanced_refining"));
        assert!(engine.purchase(&mut state, &heavy, &mut rng).is_ok());
    }

    #[test]
    fn cost_grows_with_owned_count() {
        let (catalog, rules) = setup();
        let engine = FieldEngine::new(&catalog, &rules);
        let mut state = PlayerState::new(&catalog, &rules);
        let mut rng = ScriptedSource::constant(0.5);
        let first = engine.purchase_cost(&state, &conventional()).unwrap();
        engine.purchase(&mut state, &conventional(), &mut rng).unwrap();
        let second = engine.purchase_cost(&state, &conventional()).unwrap();
        assert!(second > first);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let (catalog, rules) = setup();
        let engine = FieldEngine::new(&catalog, &rules);
        let mut state = PlayerState::new(&catalog, &rules);
        let mut rng = ScriptedSource::constant(0.5);
        assert!(matches!(
            engine.purchase(&mut state, &FieldTypeId::from("lunar"), &mut rng),
            Err(GameError::UnknownFieldType(_))
        ));
    }

    #[test]
    fn depletion_stops_at_floor() {
        let (catalog, rules) = setup();
        let engine = FieldEngine::new(&catalog, &rules);
        let mut state = PlayerState::new(&catalog, &rules);
        let mut rng = ScriptedSource::constant(0.5);
        engine.purchase(&mut state, &conventional(), &mut rng).unwrap();
        state.fields[0].current_production = 30.5;
        for _ in 0..50 {
            engine.age_and_deplete(&mut state);
        }
        assert!((state.fields[0].current_production - 30.0).abs() < 1e-9);
        assert_eq!(state.fields[0].age_months, 50);
    }

    #[test]
    fn production_is_deterministic_at_mid_draw() {
        let (catalog, rules) = setup();
        let engine = FieldEngine::new(&catalog, &rules);
        let mut state = PlayerState::new(&catalog, &rules);
        let mut rng = ScriptedSource::constant(0.5);
        engine.purchase(&mut state, &conventional(), &mut rng).unwrap();
        // efficiency 1.0, production 100, level 1
        assert_eq!(engine.production(&state, &mut rng), 100);
        state.equipment_level = 3;
        assert_eq!(engine.production(&state, &mut rng), 300);
        state.fields[0].age_months = 13;
        assert_eq!(engine.production(&state, &mut rng), 240);
        state
            .research
            .effects
            .absorb(&TechEffect::SyntheticProduction(5000));
        assert_eq!(engine.production(&state, &mut rng), 5240);
    }

    #[test]
    fn maintenance_resets_overdue_clock() {
        let (catalog, rules) = setup();
        let engine = FieldEngine::new(&catalog, &rules);
        let mut state = PlayerState::new(&catalog, &rules);
        let mut rng = ScriptedSource::constant(0.5);
        engine.purchase(&mut state, &conventional(), &mut rng).unwrap();
        state.fields[0].age_months = 20;
        let cost = engine.perform_maintenance(&mut state).unwrap();
        assert_eq!(cost, 2000);
        assert_eq!(state.money, 73_000);
        assert_eq!(state.fields[0].months_since_maintenance(), 0);
        state.money = 0;
        assert!(engine.perform_maintenance(&mut state).is_err());
    }

    #[test]
    fn equipment_caps_at_max() {
        let (catalog, rules) = setup();
        let engine = FieldEngine::new(&catalog, &rules);
        let mut state = PlayerState::new(&catalog, &rules);
        assert_eq!(engine.upgrade_equipment(&mut state).unwrap(), 2);
        assert_eq!(state.money, 50_000);
        state.equipment_level = rules.max_equipment_level;
        state.money = i64::MAX / 2;
        assert_eq!(
            engine.upgrade_equipment(&mut state),
            Err(GameError::MaxEquipmentLevel(20))
        );
    }

    #[test]
    fn limited_life_fields_expire() {
        let (catalog, rules) = setup();
        let engine = FieldEngine::new(&catalog, &rules);
        let mut state = PlayerState::new(&catalog, &rules);
        let mut rng = ScriptedSource::constant(0.5);
        engine.purchase(&mut state, &FieldTypeId::from("shale"), &mut rng).unwrap();
        state.fields[0].months_remaining = Some(2);
        assert!(engine.age_and_deplete(&mut state).is_empty());
        assert_eq!(engine.age_and_deplete(&mut state).len(), 1);
        assert!(state.fields.is_empty());
    }

    #[test]
    fn accident_removes_between_one_and_max() {
        let (catalog, rules) = setup();
        let engine = FieldEngine::new(&catalog, &rules);
        let mut state = PlayerState::new(&catalog, &rules);
        state.money = 10_000_000;
        let mut rng = ScriptedSource::constant(0.5);
        for _ in 0..5 {
            engine.purchase(&mut state, &conventional(), &mut rng).unwrap();
        }
        let removed = engine.apply_environmental_accident(&mut state, &mut rng, 3);
        assert_eq!(removed.len(), 2);
        assert_eq!(state.fields.len(), 3);
        assert!(removed.iter().all(|id| state.fields.iter().all(|f| f.id != *id)));
    }

    proptest! {
        #[test]
        fn picked_indices_are_distinct(n in 1usize..40, k in 0usize..40, seed in any::<u64>()) {
            let mut rng = oil_core::ChaChaSource::seed_from_u64(seed);
            let picked = pick_indices(n, k, &mut rng);
            prop_assert_eq!(picked.len(), k.min(n));
            let mut sorted = picked.clone();
            sorted.sort_unstable();
            sorted.dedup();
            prop_assert_eq!(sorted.len(), picked.len());
            prop_assert!(picked.iter().all(|&i| i < n));
        }

        #[test]
        fn production_never_negative(seed in any::<u64>(), fields in 0usize..10) {
            let (catalog, rules) = setup();
            let engine = FieldEngine::new(&catalog, &rules);
            let mut state = PlayerState::new(&catalog, &rules);
            state.money = i64::MAX / 4;
            let mut rng = oil_core::ChaChaSource::seed_from_u64(seed);
            for _ in 0..fields {
                engine.purchase(&mut state, &conventional(), &mut rng).unwrap();
            }
            let out = engine.production(&state, &mut rng);
            prop_assert!(fields > 0 || out == 0);
        }
    }
}
