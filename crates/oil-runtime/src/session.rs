//! Host-facing wrapper: one game, its random stream, achievements and save
//! slot, plus a thread-safe handle that refuses overlapping ticks.

use crate::tick::TickReport;
use crate::Simulation;
use oil_core::{
    AchievementId, ContinentId, FieldId, FieldTypeId, GameError, PlayerState, RandomSource,
    TechId,
};
use oil_econ::TrendOutlook;
use oil_goals::{
    builtin_achievements, evaluate_outcome, AchievementBook, AchievementRule, GameOutcome,
};
use persistence::{
    clear_snapshot, load_snapshot, save_snapshot, KeyValueStore, PersistedSnapshot,
    DEFAULT_SAVE_KEY,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TickError {
    #[error("busy")]
    Busy,
    #[error("game is over: {0:?}")]
    GameOver(GameOutcome),
    #[error("session lock poisoned")]
    Poisoned,
}

/// Result of a session tick: the month's report plus the end-of-month
/// evaluation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionTick {
    pub report: TickReport,
    pub unlocked: Vec<AchievementId>,
    pub outcome: GameOutcome,
}

pub struct Session<R> {
    sim: Simulation,
    state: PlayerState,
    rng: R,
    achievements: AchievementBook,
    predicates: Vec<AchievementRule>,
    outcome: GameOutcome,
    store: Option<Box<dyn KeyValueStore + Send>>,
    save_key: String,
}

impl<R: RandomSource> Session<R> {
    /// A fresh game without a save slot.
    pub fn new(sim: Simulation, rng: R) -> Self {
        let state = sim.new_game();
        Self {
            sim,
            state,
            rng,
            achievements: AchievementBook::default(),
            predicates: builtin_achievements(),
            outcome: GameOutcome::InProgress,
            store: None,
            save_key: DEFAULT_SAVE_KEY.to_string(),
        }
    }

    /// Continue the game saved under `key`, or start fresh when there is no
    /// usable save.
    pub fn resume(
        sim: Simulation,
        rng: R,
        store: Box<dyn KeyValueStore + Send>,
        key: &str,
    ) -> Self {
        let mut session = Self::new(sim, rng);
        match load_snapshot(&*store, key) {
            Some(snapshot) => {
                let mut state = snapshot.state;
                state.reconcile(session.sim.catalog());
                info!(key, date = %state.date, "save loaded");
                session.state = state;
                session.achievements = snapshot.achievements;
                session.outcome = snapshot.outcome;
            }
            None => info!(key, "no save found; starting a new game"),
        }
        session.with_store(store, key)
    }

    /// Save to `store` under `key` at every tick boundary.
    pub fn with_store(mut self, store: Box<dyn KeyValueStore + Send>, key: &str) -> Self {
        self.store = Some(store);
        self.save_key = key.to_string();
        self
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PlayerState {
        &mut self.state
    }

    pub fn achievements(&self) -> &AchievementBook {
        &self.achievements
    }

    pub fn outcome(&self) -> GameOutcome {
        self.outcome
    }

    /// Run one month, then evaluate the outcome and achievements and save.
    pub fn tick(&mut self) -> Result<SessionTick, TickError> {
        if self.outcome.is_over() {
            return Err(TickError::GameOver(self.outcome));
        }
        let report = self.sim.advance_one_month(&mut self.state, &mut self.rng);
        let progress = self.state.progress();
        self.outcome = evaluate_outcome(&progress, self.sim.rules());
        let unlocked = self
            .achievements
            .evaluate(&self.predicates, &progress, self.outcome);
        if self.outcome.is_over() {
            info!(outcome = ?self.outcome, money = self.state.money, "game over");
        }
        self.save();
        Ok(SessionTick {
            report,
            unlocked,
            outcome: self.outcome,
        })
    }

    /// Write the current game to the save slot. False when there is no slot
    /// or the write failed.
    pub fn save(&mut self) -> bool {
        let Some(store) = self.store.as_mut() else {
            return false;
        };
        let snapshot = PersistedSnapshot::new(
            self.state.clone(),
            self.achievements.clone(),
            self.outcome,
        );
        save_snapshot(&mut **store, &self.save_key, &snapshot)
    }

    /// What the save slot currently holds.
    pub fn saved_snapshot(&self) -> Option<PersistedSnapshot> {
        let store = self.store.as_ref()?;
        load_snapshot(&**store, &self.save_key)
    }

    /// Delete the save and start over with a fresh game.
    pub fn restart(&mut self) {
        if let Some(store) = self.store.as_mut() {
            if !clear_snapshot(&mut **store, &self.save_key) {
                warn!(key = %self.save_key, "old save could not be removed");
            }
        }
        self.state = self.sim.new_game();
        self.achievements = AchievementBook::default();
        self.outcome = GameOutcome::InProgress;
    }

    pub fn purchase_field(&mut self, field_type: &FieldTypeId) -> Result<FieldId, GameError> {
        self.sim
            .fields()
            .purchase(&mut self.state, field_type, &mut self.rng)
    }

    pub fn perform_maintenance(&mut self) -> Result<i64, GameError> {
        self.sim.fields().perform_maintenance(&mut self.state)
    }

    pub fn upgrade_equipment(&mut self) -> Result<u32, GameError> {
        self.sim.fields().upgrade_equipment(&mut self.state)
    }

    pub fn start_research(&mut self, tech: &TechId) -> Result<(), GameError> {
        self.sim.technology().start_research(&mut self.state, tech)
    }

    pub fn cancel_research(&mut self) -> Result<TechId, GameError> {
        self.sim.technology().cancel_research(&mut self.state)
    }

    pub fn ship(&mut self, continent: &ContinentId, amount: u64) -> Result<u32, GameError> {
        self.sim.shipping().ship(&mut self.state, continent, amount)
    }

    pub fn sell(&mut self, continent: &ContinentId, amount: u64) -> Result<i64, GameError> {
        self.sim.shipping().sell(&mut self.state, continent, amount)
    }

    /// Next month's trend distribution, once market prediction is researched.
    pub fn outlook(&self) -> Option<TrendOutlook> {
        oil_econ::outlook(
            self.state.market.trend,
            &self.state.research.effects,
            self.sim.rules(),
        )
    }
}

/// Clears the busy flag when a tick ends, including by panic.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Cloneable handle for hosts that tick from a timer and from user input.
/// At most one tick runs at a time; a tick requested while another is in
/// flight is refused with [`TickError::Busy`] rather than queued.
pub struct SharedSession<R> {
    inner: Arc<Mutex<Session<R>>>,
    busy: Arc<AtomicBool>,
}

impl<R> Clone for SharedSession<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            busy: Arc::clone(&self.busy),
        }
    }
}

impl<R: RandomSource> SharedSession<R> {
    pub fn new(session: Session<R>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn try_tick(&self) -> Result<SessionTick, TickError> {
        if self.busy.swap(true, Ordering::AcqRel) {
            return Err(TickError::Busy);
        }
        let _guard = BusyGuard(&self.busy);
        let mut session = self.inner.lock().map_err(|_| TickError::Poisoned)?;
        session.tick()
    }

    /// Run `f` against the session between ticks.
    pub fn with<T>(&self, f: impl FnOnce(&mut Session<R>) -> T) -> Result<T, TickError> {
        let mut session = self.inner.lock().map_err(|_| TickError::Poisoned)?;
        Ok(f(&mut session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oil_core::{RuleConfig, ScriptedSource};
    use persistence::MemoryStore;

    fn quiet_session() -> Session<ScriptedSource> {
        Session::new(Simulation::builtin().unwrap(), ScriptedSource::constant(0.99))
    }

    #[test]
    fn tick_saves_at_boundary() {
        let session = quiet_session();
        let mut session = session.with_store(Box::new(MemoryStore::new()), "slot");
        assert!(session.saved_snapshot().is_none());
        session.tick().unwrap();
        let saved = session.saved_snapshot().unwrap();
        assert_eq!(saved.state.stats.months_played, 1);
        assert_eq!(&saved.state, session.state());
    }

    #[test]
    fn resume_restores_saved_game() {
        let mut store = MemoryStore::new();
        let mut state = Simulation::builtin().unwrap().new_game();
        state.money = 4_242;
        state.ledgers.clear();
        let snap =
            PersistedSnapshot::new(state, AchievementBook::default(), GameOutcome::InProgress);
        assert!(save_snapshot(&mut store, "slot", &snap));
        let session = Session::resume(
            Simulation::builtin().unwrap(),
            ScriptedSource::constant(0.99),
            Box::new(store),
            "slot",
        );
        assert_eq!(session.state().money, 4_242);
        assert_eq!(
            session.state().ledgers.len(),
            session.simulation().catalog().continents.len()
        );
    }

    #[test]
    fn bankrupt_game_refuses_ticks() {
        let mut session = quiet_session();
        session.state_mut().money = 0;
        let tick = session.tick().unwrap();
        assert_eq!(tick.outcome, GameOutcome::Bankrupt);
        assert_eq!(session.tick(), Err(TickError::GameOver(GameOutcome::Bankrupt)));
        session.restart();
        assert!(session.tick().is_ok());
    }

    #[test]
    fn time_runs_out_at_end_year() {
        let rules = RuleConfig {
            end_year: 2024,
            ..RuleConfig::default()
        };
        let sim = Simulation::new(oil_core::Catalog::builtin().unwrap(), rules);
        let mut session = Session::new(sim, ScriptedSource::constant(0.99));
        assert_eq!(session.tick().unwrap().outcome, GameOutcome::TimeUp);
    }

    #[test]
    fn actions_go_through_engines() {
        let mut session = quiet_session();
        session.purchase_field(&FieldTypeId::from("conventional")).unwrap();
        assert_eq!(session.state().money, 75_000);
        assert!(session.outlook().is_none());
        assert_eq!(session.cancel_research(), Err(GameError::NoActiveResearch));
        let tech = TechId::from("advanced_drilling");
        session.start_research(&tech).unwrap();
        assert_eq!(session.cancel_research(), Ok(tech));
        assert!(session.state().research.in_progress.is_none());
        assert_eq!(session.state().money, 70_000);
        assert!(matches!(
            session.sell(&ContinentId::from("europe"), 1),
            Err(GameError::InsufficientAvailable { .. })
        ));
    }

    #[test]
    fn second_tick_while_busy_is_refused() {
        let shared = SharedSession::new(quiet_session());
        shared.busy.store(true, Ordering::Release);
        assert_eq!(shared.try_tick().unwrap_err(), TickError::Busy);
        shared.busy.store(false, Ordering::Release);
        assert!(shared.try_tick().is_ok());
        assert!(!shared.is_busy());
        let months = shared.with(|s| s.state().stats.months_played).unwrap();
        assert_eq!(months, 1);
    }
}
