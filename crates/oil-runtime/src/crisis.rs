//! Crisis lifecycle: rolling new events, applying one-shot effects and
//! counting down lasting ones.

use crate::fields::FieldEngine;
use oil_core::{
    ActiveCrisis, Catalog, CrisisId, CrisisKind, CrisisRecord, CrisisTemplate,
    CrisisTriggerPolicy, ImmediateEffect, LastingEffect, PlayerState, RandomSource, RuleConfig,
};
use serde::Serialize;
use tracing::{debug, info};

/// What a trigger did to the player.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrisisImpact {
    /// A lasting crisis began and will run for `months`.
    Started { months: u32 },
    FieldsLost { count: usize, cost: i64 },
    AssetsLost { money: i64, oil: u64 },
    OilFound { barrels: u64, fields: usize },
    Subsidy { amount: i64 },
    FieldsDamaged { count: usize },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TriggeredCrisis {
    pub id: CrisisId,
    pub name: String,
    pub impact: CrisisImpact,
}

pub struct CrisisEngine<'a> {
    catalog: &'a Catalog,
    rules: &'a RuleConfig,
}

impl<'a> CrisisEngine<'a> {
    pub fn new(catalog: &'a Catalog, rules: &'a RuleConfig) -> Self {
        Self { catalog, rules }
    }

    fn fields(&self) -> FieldEngine<'a> {
        FieldEngine::new(self.catalog, self.rules)
    }

    /// Owned fields raise every crisis probability by their risk factor.
    pub fn risk_multiplier(&self, state: &PlayerState) -> f64 {
        let risk: f64 = state
            .fields
            .iter()
            .filter_map(|f| self.catalog.field_type(&f.field_type))
            .map(|d| d.risk_factor)
            .sum();
        1.0 + risk * self.rules.risk_per_risk_factor
    }

    /// `probability × risk × (1 - reduction)`, clamped to `[0, 1]`.
    pub fn trigger_probability(&self, state: &PlayerState, template: &CrisisTemplate) -> f64 {
        let reduction = state
            .research
            .effects
            .crisis_reduction_capped(self.rules.crisis_reduction_cap);
        (template.probability * self.risk_multiplier(state) * (1.0 - reduction)).clamp(0.0, 1.0)
    }

    /// Count down lasting crises and shrink their magnitudes by the current
    /// mitigation. Mitigation is re-applied every month, so it compounds.
    /// Returns the templates that ran out this month.
    pub fn advance_active(&self, state: &mut PlayerState) -> Vec<CrisisId> {
        let mitigation = state.research.effects.mitigation();
        let now = state.month_index();
        for crisis in &mut state.crises.active {
            crisis.months_remaining = crisis.months_remaining.saturating_sub(1);
            if mitigation > 0.0 {
                crisis.effect.mitigate(mitigation);
            }
        }
        let (ended, active): (Vec<ActiveCrisis>, Vec<ActiveCrisis>) = state
            .crises
            .active
            .drain(..)
            .partition(|c| c.months_remaining == 0);
        state.crises.active = active;
        let mut resolved = Vec::with_capacity(ended.len());
        for crisis in ended {
            info!(crisis = %crisis.template_id, "crisis resolved");
            state.crises.history.push(CrisisRecord {
                template_id: crisis.template_id.clone(),
                name: crisis.name,
                started_month: crisis.started_month,
                ended_month: now,
            });
            resolved.push(crisis.template_id);
        }
        resolved
    }

    /// Draw for every template off cooldown, in catalog order.
    pub fn roll_for_new_events(
        &self,
        state: &mut PlayerState,
        rng: &mut impl RandomSource,
    ) -> Vec<TriggeredCrisis> {
        let now = state.month_index();
        let spacing = self.rules.min_months_between_crises;
        if spacing > 0 {
            if let Some(last) = state.crises.last_any {
                if now - last < spacing as i32 {
                    return Vec::new();
                }
            }
        }
        let mut triggered = Vec::new();
        for template in &self.catalog.crises {
            if !state.crises.off_cooldown(template, now) {
                continue;
            }
            let p = self.trigger_probability(state, template);
            if !rng.chance(p) {
                continue;
            }
            triggered.push(self.trigger(state, template, rng));
            if self.rules.crisis_policy == CrisisTriggerPolicy::FirstMatch {
                break;
            }
        }
        triggered
    }

    /// Fire `template` now, regardless of probability.
    pub fn trigger(
        &self,
        state: &mut PlayerState,
        template: &CrisisTemplate,
        rng: &mut impl RandomSource,
    ) -> TriggeredCrisis {
        let now = state.month_index();
        state.crises.last_triggered.insert(template.id.clone(), now);
        state.crises.last_any = Some(now);
        let impact = match &template.kind {
            CrisisKind::Lasting { months, effect } => {
                if let LastingEffect::FieldDamage { fraction } = effect {
                    self.fields().damage_all(state, *fraction);
                }
                state.crises.active.push(ActiveCrisis {
                    template_id: template.id.clone(),
                    name: template.name.clone(),
                    effect: effect.clone(),
                    months_remaining: *months,
                    started_month: now,
                });
                CrisisImpact::Started { months: *months }
            }
            CrisisKind::Immediate { effect } => {
                let impact = self.apply_immediate(state, effect, rng);
                state.crises.history.push(CrisisRecord {
                    template_id: template.id.clone(),
                    name: template.name.clone(),
                    started_month: now,
                    ended_month: now,
                });
                impact
            }
        };
        info!(crisis = %template.id, ?impact, "crisis triggered");
        TriggeredCrisis {
            id: template.id.clone(),
            name: template.name.clone(),
            impact,
        }
    }

    fn apply_immediate(
        &self,
        state: &mut PlayerState,
        effect: &ImmediateEffect,
        rng: &mut impl RandomSource,
    ) -> CrisisImpact {
        let fields = self.fields();
        let owned = state.fields.len();
        match *effect {
            ImmediateEffect::OilSpill {
                field_fraction,
                cleanup_per_field,
            } => {
                let count = share_of(owned, field_fraction);
                let lost = fields.remove_random(state, rng, count).len();
                let cost = cleanup_per_field.saturating_mul(lost as i64);
                state.debit(cost);
                CrisisImpact::FieldsLost { count: lost, cost }
            }
            ImmediateEffect::CyberAttack {
                money_fraction,
                stock_fraction,
            } => {
                let money = floor_share(state.money.max(0) as f64, money_fraction) as i64;
                let oil = (floor_share(state.oil_stock as f64, stock_fraction) as u64)
                    .min(state.oil_stock);
                state.debit(money);
                state.oil_stock -= oil;
                CrisisImpact::AssetsLost { money, oil }
            }
            ImmediateEffect::NaturalDisaster {
                field_fraction,
                max_fields,
                repair_per_field,
            } => {
                let count = share_of(owned, field_fraction).min(max_fields as usize);
                let lost = fields.remove_random(state, rng, count).len();
                let cost = repair_per_field.saturating_mul(lost as i64);
                state.debit(cost);
                CrisisImpact::FieldsLost { count: lost, cost }
            }
            ImmediateEffect::Discovery {
                min_barrels,
                max_barrels,
                min_bonus_fields,
                max_bonus_fields,
            } => {
                let extra = max_bonus_fields.saturating_sub(min_bonus_fields) as usize + 1;
                let wanted = min_bonus_fields as usize + rng.index(extra);
                let span = max_barrels.saturating_sub(min_barrels).saturating_add(1);
                let found = min_barrels + rng.index(span.min(usize::MAX as u64) as usize) as u64;
                let bonus = 1.0 + state.research.effects.discovery_bonus.max(0.0);
                let barrels = floor_share(found as f64, bonus) as u64;
                state.oil_stock = state.oil_stock.saturating_add(barrels);
                let fields = fields.grant_starter_fields(state, rng, wanted);
                CrisisImpact::OilFound { barrels, fields }
            }
            ImmediateEffect::Subsidy { per_field } => {
                let amount = per_field.saturating_mul(owned as i64);
                state.credit(amount);
                CrisisImpact::Subsidy { amount }
            }
            ImmediateEffect::EquipmentFailure {
                min_fraction,
                max_fraction,
                efficiency_loss,
            } => {
                let count = fields.apply_equipment_failure(
                    state,
                    rng,
                    min_fraction,
                    max_fraction,
                    efficiency_loss,
                );
                CrisisImpact::FieldsDamaged { count }
            }
            ImmediateEffect::EnvironmentalAccident { max_fields } => {
                let lost = fields
                    .apply_environmental_accident(state, rng, max_fields)
                    .len();
                debug!(lost, "fields closed without refund");
                CrisisImpact::FieldsLost {
                    count: lost,
                    cost: 0,
                }
            }
        }
    }
}

fn floor_share(total: f64, fraction: f64) -> f64 {
    (total * fraction).floor().max(0.0)
}

fn share_of(count: usize, fraction: f64) -> usize {
    (floor_share(count as f64, fraction) as usize).min(count)
}
