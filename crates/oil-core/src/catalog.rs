//! Static game content: field types, technologies, crisis templates and
//! continents, plus cross-reference validation.

use crate::crisis::{CrisisKind, CrisisTemplate, ImmediateEffect, LastingEffect};
use crate::effects::TechEffect;
use crate::error::CatalogError;
use crate::ids::{ContinentId, FieldTypeId, TechId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

const BUILTIN_CATALOG: &str = include_str!("../../../assets/catalog.yaml");

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldTypeDefinition {
    pub id: FieldTypeId,
    pub name: String,
    pub base_cost: i64,
    /// Price growth per field of this type already owned (exponential rule).
    pub cost_growth: f64,
    /// Barrels per month at efficiency 1.0 and equipment level 1.
    pub base_production: f64,
    /// Half-width of the uniform output roll, as a fraction.
    pub production_variability: f64,
    pub maintenance_cost: i64,
    /// Fraction of current production lost each month.
    pub depletion_rate: f64,
    pub risk_factor: f64,
    #[serde(default)]
    pub requires_tech: Option<TechId>,
    /// Limited-life fields are removed when this many months have passed.
    #[serde(default)]
    pub lifespan_months: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TechnologyDefinition {
    pub id: TechId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cost: i64,
    pub research_months: u32,
    #[serde(default)]
    pub prerequisites: Vec<TechId>,
    pub effect: TechEffect,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Demand {
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Continent {
    pub id: ContinentId,
    pub name: String,
    /// Applied to the base price when selling here.
    pub multiplier: f64,
    pub demand: Demand,
    pub shipping_months: u32,
}

/// Immutable game content. Lookup is by id; order is catalog order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub field_types: Vec<FieldTypeDefinition>,
    pub technologies: Vec<TechnologyDefinition>,
    pub crises: Vec<CrisisTemplate>,
    pub continents: Vec<Continent>,
}

impl Catalog {
    /// Content shipped with the game.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_yaml_str(BUILTIN_CATALOG)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self, CatalogError> {
        let catalog: Catalog = serde_yaml::from_str(s)?;
        validate_catalog(&catalog)?;
        Ok(catalog)
    }

    pub fn field_type(&self, id: &FieldTypeId) -> Option<&FieldTypeDefinition> {
        self.field_types.iter().find(|f| &f.id == id)
    }

    pub fn technology(&self, id: &TechId) -> Option<&TechnologyDefinition> {
        self.technologies.iter().find(|t| &t.id == id)
    }

    pub fn continent(&self, id: &ContinentId) -> Option<&Continent> {
        self.continents.iter().find(|c| &c.id == id)
    }
}

fn check_unique<'a>(ids: impl Iterator<Item = &'a str>) -> Result<(), CatalogError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId(id.to_string()));
        }
    }
    Ok(())
}

fn fraction(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

fn out_of_range(owner: &str, field: &'static str) -> CatalogError {
    CatalogError::OutOfRange {
        owner: owner.to_string(),
        field,
    }
}

fn validate_field_type(f: &FieldTypeDefinition) -> Result<(), CatalogError> {
    let owner = f.id.as_str();
    if f.base_cost < 0 {
        return Err(out_of_range(owner, "base_cost"));
    }
    if !(f.cost_growth.is_finite() && f.cost_growth >= 1.0) {
        return Err(out_of_range(owner, "cost_growth"));
    }
    if !(f.base_production.is_finite() && f.base_production >= 0.0) {
        return Err(out_of_range(owner, "base_production"));
    }
    if !(fraction(f.production_variability) && f.production_variability < 1.0) {
        return Err(out_of_range(owner, "production_variability"));
    }
    if f.maintenance_cost < 0 {
        return Err(out_of_range(owner, "maintenance_cost"));
    }
    if !fraction(f.depletion_rate) {
        return Err(out_of_range(owner, "depletion_rate"));
    }
    if !(f.risk_factor.is_finite() && f.risk_factor >= 0.0) {
        return Err(out_of_range(owner, "risk_factor"));
    }
    if f.lifespan_months == Some(0) {
        return Err(out_of_range(owner, "lifespan_months"));
    }
    Ok(())
}

fn validate_crisis(c: &CrisisTemplate) -> Result<(), CatalogError> {
    let owner = c.id.as_str();
    if !fraction(c.probability) {
        return Err(out_of_range(owner, "probability"));
    }
    match &c.kind {
        CrisisKind::Lasting { months, effect } => {
            if *months == 0 {
                return Err(out_of_range(owner, "months"));
            }
            let ok = match *effect {
                LastingEffect::PriceChange { delta }
                | LastingEffect::MaintenanceIncrease { delta }
                | LastingEffect::CostIncrease { delta } => delta.is_finite(),
                LastingEffect::ProductionHalt => true,
                LastingEffect::ProductionReduction { fraction: f }
                | LastingEffect::FieldDamage { fraction: f } => fraction(f),
                LastingEffect::PriceVolatility { amplitude } => fraction(amplitude),
                LastingEffect::RandomPrice { low, high } => {
                    low.is_finite() && high.is_finite() && low <= high
                }
                LastingEffect::ShippingDelay { factor } => factor.is_finite() && factor >= 1.0,
            };
            if !ok {
                return Err(out_of_range(owner, "effect"));
            }
        }
        CrisisKind::Immediate { effect } => {
            let ok = match *effect {
                ImmediateEffect::OilSpill {
                    field_fraction,
                    cleanup_per_field,
                } => fraction(field_fraction) && cleanup_per_field >= 0,
                ImmediateEffect::CyberAttack {
                    money_fraction,
                    stock_fraction,
                } => fraction(money_fraction) && fraction(stock_fraction),
                ImmediateEffect::NaturalDisaster {
                    field_fraction,
                    repair_per_field,
                    ..
                } => fraction(field_fraction) && repair_per_field >= 0,
                ImmediateEffect::Discovery {
                    min_barrels,
                    max_barrels,
                    min_bonus_fields,
                    max_bonus_fields,
                } => min_barrels <= max_barrels && min_bonus_fields <= max_bonus_fields,
                ImmediateEffect::Subsidy { per_field } => per_field >= 0,
                ImmediateEffect::EquipmentFailure {
                    min_fraction,
                    max_fraction,
                    efficiency_loss,
                } => {
                    fraction(min_fraction)
                        && fraction(max_fraction)
                        && min_fraction <= max_fraction
                        && fraction(efficiency_loss)
                }
                ImmediateEffect::EnvironmentalAccident { max_fields } => max_fields >= 1,
            };
            if !ok {
                return Err(out_of_range(owner, "effect"));
            }
        }
    }
    Ok(())
}

/// Reject a prerequisite graph with a cycle. Depth-first with three colours.
fn check_acyclic(techs: &[TechnologyDefinition]) -> Result<(), CatalogError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done,
    }
    let edges: BTreeMap<&TechId, &[TechId]> = techs
        .iter()
        .map(|t| (&t.id, t.prerequisites.as_slice()))
        .collect();
    let mut marks: BTreeMap<&TechId, Mark> = BTreeMap::new();

    fn visit<'a>(
        id: &'a TechId,
        edges: &BTreeMap<&'a TechId, &'a [TechId]>,
        marks: &mut BTreeMap<&'a TechId, Mark>,
    ) -> Result<(), CatalogError> {
        match marks.get(id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => return Err(CatalogError::PrerequisiteCycle(id.0.clone())),
            None => {}
        }
        marks.insert(id, Mark::Visiting);
        let prereqs: &'a [TechId] = edges.get(id).copied().unwrap_or(&[]);
        for p in prereqs {
            visit(p, edges, marks)?;
        }
        marks.insert(id, Mark::Done);
        Ok(())
    }

    for t in techs {
        visit(&t.id, &edges, &mut marks)?;
    }
    Ok(())
}

/// Validate ids, numeric ranges and every cross-reference of the catalog.
pub fn validate_catalog(c: &Catalog) -> Result<(), CatalogError> {
    check_unique(c.field_types.iter().map(|f| f.id.as_str()))?;
    check_unique(c.technologies.iter().map(|t| t.id.as_str()))?;
    check_unique(c.crises.iter().map(|x| x.id.as_str()))?;
    check_unique(c.continents.iter().map(|x| x.id.as_str()))?;

    let tech_ids: BTreeSet<&TechId> = c.technologies.iter().map(|t| &t.id).collect();
    let field_ids: BTreeSet<&FieldTypeId> = c.field_types.iter().map(|f| &f.id).collect();

    for f in &c.field_types {
        validate_field_type(f)?;
        if let Some(req) = &f.requires_tech {
            if !tech_ids.contains(req) {
                return Err(CatalogError::UnknownReference {
                    owner: f.id.0.clone(),
                    reference: req.0.clone(),
                });
            }
        }
    }
    for t in &c.technologies {
        if t.cost < 0 {
            return Err(out_of_range(t.id.as_str(), "cost"));
        }
        if t.research_months == 0 {
            return Err(out_of_range(t.id.as_str(), "research_months"));
        }
        for p in &t.prerequisites {
            if !tech_ids.contains(p) {
                return Err(CatalogError::UnknownReference {
                    owner: t.id.0.clone(),
                    reference: p.0.clone(),
                });
            }
        }
        if let TechEffect::PremiumUnlock(ft) = &t.effect {
            if !field_ids.contains(ft) {
                return Err(CatalogError::UnknownReference {
                    owner: t.id.0.clone(),
                    reference: ft.0.clone(),
                });
            }
        }
    }
    check_acyclic(&c.technologies)?;
    for x in &c.crises {
        validate_crisis(x)?;
    }
    for k in &c.continents {
        if !(k.multiplier.is_finite() && k.multiplier >= 0.0) {
            return Err(out_of_range(k.id.as_str(), "multiplier"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tech(id: &str, prereqs: &[&str]) -> TechnologyDefinition {
        TechnologyDefinition {
            id: TechId::from(id),
            name: id.to_string(),
            description: String::new(),
            cost: 1000,
            research_months: 1,
            prerequisites: prereqs.iter().map(|p| TechId::from(*p)).collect(),
            effect: TechEffect::YieldBonus(0.1),
        }
    }

    fn empty() -> Catalog {
        Catalog {
            field_types: vec![],
            technologies: vec![],
            crises: vec![],
            continents: vec![],
        }
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let c = Catalog::builtin().unwrap();
        assert_eq!(c.continents.len(), 5);
        let conventional = c.field_type(&FieldTypeId::from("conventional")).unwrap();
        assert_eq!(conventional.base_cost, 25_000);
        assert!(conventional.requires_tech.is_none());
        let drilling = c.technology(&TechId::from("advanced_drilling")).unwrap();
        assert_eq!(drilling.cost, 5_000);
        assert_eq!(drilling.research_months, 3);
        assert!(c
            .crises
            .iter()
            .any(|x| matches!(x.kind, CrisisKind::Immediate { .. })));
    }

    #[test]
    fn unknown_prerequisite_rejected() {
        let mut c = empty();
        c.technologies.push(tech("a", &["missing"]));
        assert!(matches!(
            validate_catalog(&c),
            Err(CatalogError::UnknownReference { .. })
        ));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut c = empty();
        c.technologies.push(tech("a", &[]));
        c.technologies.push(tech("a", &[]));
        assert_eq!(
            validate_catalog(&c),
            Err(CatalogError::DuplicateId("a".into()))
        );
    }

    #[test]
    fn cycle_rejected() {
        let mut c = empty();
        c.technologies.push(tech("a", &["c"]));
        c.technologies.push(tech("b", &["a"]));
        c.technologies.push(tech("c", &["b"]));
        assert!(matches!(
            validate_catalog(&c),
            Err(CatalogError::PrerequisiteCycle(_))
        ));
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        assert!(matches!(
            Catalog::from_yaml_str("field_types: 3"),
            Err(CatalogError::Parse(_))
        ));
    }

    proptest! {
        #[test]
        fn chains_are_acyclic(n in 1usize..30) {
            let mut c = empty();
            for i in 0..n {
                let id = format!("t{i}");
                let prev = format!("t{}", i.saturating_sub(1));
                let prereqs: Vec<&str> = if i == 0 { vec![] } else { vec![prev.as_str()] };
                c.technologies.push(tech(&id, &prereqs));
            }
            prop_assert!(validate_catalog(&c).is_ok());
        }
    }
}
