//! GameSession: the explicit session object the frontend drives.
//!
//! Owns the engine, the persisted profile and the in-memory settings.
//! Commands go in through `handle()`; each returns an `Update` carrying
//! the engine outcome, the events for audio/celebration observers, and,
//! on the winning move, the recorded `Completion`.
//!
//! Persistence failures are logged and swallowed here so they never
//! disturb puzzle state.

use crate::domain::entity::Command;
use super::engine::{MoveResult, Phase, PuzzleEngine, UndoResult};
use super::event::GameEvent;
use super::level::Catalog;
use super::save::{BestScoreRecord, NewBest, Profile, Settings, Storage};

/// `mm:ss`, minutes zero-padded to two digits and uncapped.
pub fn format_time(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Stats recorded when a level is solved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Completion {
    pub level_id: u32,
    pub moves: u32,
    pub seconds: u32,
    pub new_best: NewBest,
    /// First time this level id entered the completed set.
    pub first_clear: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Move(MoveResult),
    Undo(UndoResult),
    /// Level (re)load; `false` when the id was unknown.
    Load(bool),
    /// Pause/resume; `false` when the phase did not allow it.
    Pause(bool),
    Resume(bool),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Update {
    pub outcome: Outcome,
    pub events: Vec<GameEvent>,
    pub completion: Option<Completion>,
}

impl Update {
    fn quiet(outcome: Outcome) -> Self {
        Update { outcome, events: vec![], completion: None }
    }
}

pub struct GameSession<S: Storage> {
    engine: PuzzleEngine,
    profile: Profile<S>,
    settings: Settings,
    /// Bests for the loaded level, read once per load and after each
    /// completion so per-frame queries stay off storage.
    current_best: BestScoreRecord,
}

impl<S: Storage> GameSession<S> {
    pub fn new(catalog: Catalog, storage: S) -> Self {
        let profile = Profile::new(storage);
        let settings = profile.load_settings();
        GameSession {
            engine: PuzzleEngine::new(catalog),
            profile,
            settings,
            current_best: BestScoreRecord::default(),
        }
    }

    // ── Queries ──

    pub fn engine(&self) -> &PuzzleEngine {
        &self.engine
    }

    pub fn catalog(&self) -> &Catalog {
        self.engine.catalog()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn best_score(&self, level_id: u32) -> BestScoreRecord {
        if self.engine.level_id() == Some(level_id) {
            self.current_best
        } else {
            self.profile.best_score(level_id)
        }
    }

    /// Bests of the loaded level. Never touches storage.
    pub fn current_best(&self) -> BestScoreRecord {
        self.current_best
    }

    pub fn is_completed(&self, level_id: u32) -> bool {
        self.settings.completed_levels.contains(&level_id)
    }

    pub fn tutorial_completed(&self) -> bool {
        self.profile.tutorial_completed()
    }

    pub fn profile(&self) -> &Profile<S> {
        &self.profile
    }

    // ── Level flow ──

    /// Resume at the last played level, or the first one if that id is
    /// no longer in the catalog.
    pub fn start(&mut self) -> bool {
        let last = self.settings.last_level;
        let id = if self.catalog().contains(last) { last } else { 1 };
        self.start_level(id)
    }

    /// Load a level and remember it as the last played.
    pub fn start_level(&mut self, id: u32) -> bool {
        if !self.engine.load_level(id) {
            return false;
        }
        self.current_best = self.profile.best_score(id);
        if self.settings.last_level != id {
            self.settings.last_level = id;
            self.persist_settings();
        }
        true
    }

    /// Advance past the current level. `None` when it was the last one.
    pub fn next_level(&mut self) -> Option<u32> {
        let next = self.engine.level_id()? + 1;
        if self.start_level(next) {
            Some(next)
        } else {
            tracing::info!("all levels done");
            None
        }
    }

    pub fn handle(&mut self, cmd: Command) -> Update {
        match cmd {
            Command::Move(dir) => {
                let result = self.engine.move_player(dir);
                let completion = if result.won() { self.record_completion() } else { None };
                Update {
                    outcome: Outcome::Move(result),
                    events: result.events(),
                    completion,
                }
            }
            Command::Undo => {
                let result = self.engine.undo();
                let events = match result {
                    UndoResult::Undone { .. } => vec![GameEvent::Undo],
                    _ => vec![],
                };
                Update { outcome: Outcome::Undo(result), events, completion: None }
            }
            Command::Reset(id) | Command::LoadLevel(id) => {
                Update::quiet(Outcome::Load(self.start_level(id)))
            }
            Command::Pause => Update::quiet(Outcome::Pause(self.engine.pause())),
            Command::Resume => Update::quiet(Outcome::Resume(self.engine.resume())),
        }
    }

    /// External one-second clock. Only counts while `Active`.
    pub fn tick(&mut self) {
        if self.engine.phase() == Phase::Active {
            self.engine.tick();
        }
    }

    // ── Settings ──

    pub fn set_theme(&mut self, theme: &str) {
        self.settings.theme = theme.to_string();
        self.persist_settings();
    }

    pub fn set_sound(&mut self, on: bool) {
        self.settings.sound = on;
        self.persist_settings();
    }

    pub fn complete_tutorial(&mut self) {
        if let Err(e) = self.profile.complete_tutorial() {
            tracing::warn!("could not save tutorial flag: {e}");
        }
    }

    // ── Internal ──

    fn record_completion(&mut self) -> Option<Completion> {
        let level_id = self.engine.level_id()?;
        let state = self.engine.state()?;
        let (moves, seconds) = (state.move_count, state.elapsed_seconds);

        let first_clear = self.settings.completed_levels.insert(level_id);
        if first_clear {
            self.persist_settings();
        }

        let new_best = match self.profile.save_best_score(level_id, moves, seconds) {
            Ok(nb) => nb,
            Err(e) => {
                tracing::warn!(level = level_id, "could not save best score: {e}");
                NewBest::default()
            }
        };
        self.current_best = self.profile.best_score(level_id);
        tracing::info!(level = level_id, moves, seconds, ?new_best, "completion recorded");

        Some(Completion { level_id, moves, seconds, new_best, first_clear })
    }

    fn persist_settings(&mut self) {
        if let Err(e) = self.profile.save_settings(&self.settings) {
            tracing::warn!("could not save settings: {e}");
        }
    }
}
