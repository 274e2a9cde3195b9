#![deny(warnings)]

//! Achievements and end-of-game evaluation.
//!
//! Both read the raw [`Progress`] statistics exposed by `oil-core`; nothing
//! here mutates game state.

use oil_core::{AchievementId, IdSet, Progress, RuleConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

/// How a game stands after a month is processed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameOutcome {
    #[default]
    InProgress,
    Won,
    Bankrupt,
    TimeUp,
}

impl GameOutcome {
    pub fn is_over(self) -> bool {
        !matches!(self, GameOutcome::InProgress)
    }
}

/// Bankrupt when money, stock and fields are all gone; otherwise at the end
/// year the game is won with enough money and lost on time without it.
pub fn evaluate_outcome(progress: &Progress, rules: &RuleConfig) -> GameOutcome {
    if progress.money <= 0 && progress.oil_stock == 0 && progress.fields_owned == 0 {
        GameOutcome::Bankrupt
    } else if progress.year >= rules.end_year {
        if progress.money >= rules.win_money {
            GameOutcome::Won
        } else {
            GameOutcome::TimeUp
        }
    } else {
        GameOutcome::InProgress
    }
}

/// A named test over the game's statistics.
pub trait AchievementPredicate {
    fn id(&self) -> &AchievementId;
    fn name(&self) -> &str;
    fn is_met(&self, progress: &Progress, outcome: GameOutcome) -> bool;
}

/// Threshold conditions the built-in achievements are made of.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    TotalDrilled { at_least: u64 },
    MaxMoney { at_least: i64 },
    EquipmentLevel { at_least: u32 },
    FieldsOwned { at_least: usize },
    MoneyBeforeYear { at_least: i64, year: i32 },
    WonBeforeYear { year: i32 },
    TotalSold { at_least: u64 },
    AllContinentsStocked,
    InTransit { at_least: u64 },
    MonthsPlayed { at_least: u32 },
    MonthlyProduction { at_least: u64 },
}

impl Condition {
    pub fn holds(&self, p: &Progress, outcome: GameOutcome) -> bool {
        match *self {
            Condition::TotalDrilled { at_least } => p.total_drilled >= at_least,
            Condition::MaxMoney { at_least } => p.max_money >= at_least,
            Condition::EquipmentLevel { at_least } => p.equipment_level >= at_least,
            Condition::FieldsOwned { at_least } => p.fields_owned >= at_least,
            Condition::MoneyBeforeYear { at_least, year } => p.money >= at_least && p.year < year,
            Condition::WonBeforeYear { year } => outcome == GameOutcome::Won && p.year < year,
            Condition::TotalSold { at_least } => p.total_sold >= at_least,
            Condition::AllContinentsStocked => {
                p.continent_count > 0 && p.continents_with_stock == p.continent_count
            }
            Condition::InTransit { at_least } => p.total_in_transit >= at_least,
            Condition::MonthsPlayed { at_least } => p.months_played >= at_least,
            Condition::MonthlyProduction { at_least } => p.monthly_production >= at_least,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AchievementRule {
    pub id: AchievementId,
    pub name: String,
    pub description: String,
    pub condition: Condition,
}

impl AchievementPredicate for AchievementRule {
    fn id(&self) -> &AchievementId {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_met(&self, progress: &Progress, outcome: GameOutcome) -> bool {
        self.condition.holds(progress, outcome)
    }
}

fn rule(id: &str, name: &str, description: &str, condition: Condition) -> AchievementRule {
    AchievementRule {
        id: AchievementId::from(id),
        name: name.to_string(),
        description: description.to_string(),
        condition,
    }
}

/// The twelve achievements of the base game.
pub fn builtin_achievements() -> Vec<AchievementRule> {
    vec![
        rule(
            "oil_baron",
            "Oil Baron",
            "Drill over 100,000 barrels total",
            Condition::TotalDrilled { at_least: 100_000 },
        ),
        rule(
            "millionaire",
            "Millionaire",
            "Have $5,000,000 in your bank account",
            Condition::MaxMoney {
                at_least: 5_000_000,
            },
        ),
        rule(
            "tech_master",
            "Tech Master",
            "Upgrade drilling equipment 10+ times",
            Condition::EquipmentLevel { at_least: 11 },
        ),
        rule(
            "land_owner",
            "Land Owner",
            "Own 25 oil fields",
            Condition::FieldsOwned { at_least: 25 },
        ),
        rule(
            "early_bird",
            "Early Bird",
            "Reach $1M before 2030",
            Condition::MoneyBeforeYear {
                at_least: 1_000_000,
                year: 2030,
            },
        ),
        rule(
            "speed_runner",
            "Speed Runner",
            "Win the game before 2040",
            Condition::WonBeforeYear { year: 2040 },
        ),
        rule(
            "oil_trader",
            "Oil Trader",
            "Sell over 500,000 barrels total",
            Condition::TotalSold { at_least: 500_000 },
        ),
        rule(
            "global_empire",
            "Global Empire",
            "Have oil available on every continent at once",
            Condition::AllContinentsStocked,
        ),
        rule(
            "pipeline_master",
            "Pipeline Master",
            "Have 50,000+ barrels in transit",
            Condition::InTransit { at_least: 50_000 },
        ),
        rule(
            "survivor",
            "Survivor",
            "Play for 20+ years (240+ months)",
            Condition::MonthsPlayed { at_least: 240 },
        ),
        rule(
            "mogul",
            "Oil Mogul",
            "Reach the maximum equipment level (20)",
            Condition::EquipmentLevel { at_least: 20 },
        ),
        rule(
            "steady_growth",
            "Steady Growth",
            "Produce 100,000+ barrels in a month",
            Condition::MonthlyProduction { at_least: 100_000 },
        ),
    ]
}

/// Unlocked achievements. Each unlocks at most once.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AchievementBook {
    pub unlocked: IdSet<AchievementId>,
}

impl AchievementBook {
    pub fn is_unlocked(&self, id: &AchievementId) -> bool {
        self.unlocked.contains(id)
    }

    /// Check every locked predicate and return the ids unlocked by this call.
    pub fn evaluate<P: AchievementPredicate>(
        &mut self,
        predicates: &[P],
        progress: &Progress,
        outcome: GameOutcome,
    ) -> Vec<AchievementId> {
        let mut fresh = Vec::new();
        for p in predicates {
            if self.unlocked.contains(p.id()) || !p.is_met(progress, outcome) {
                continue;
            }
            self.unlocked.insert(p.id().clone());
            info!(achievement = %p.id(), name = p.name(), "achievement unlocked");
            fresh.push(p.id().clone());
        }
        fresh
    }
}
