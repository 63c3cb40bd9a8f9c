//! The puzzle engine: owns the live `PuzzleState` and is the only thing
//! that mutates it.
//!
//! ## Phases
//!
//!   Idle ──load──▶ Active ◀──resume── Paused
//!                    │  └───pause────▶  │
//!                    └──winning move──▶ Complete
//!
//! `load_level` / `reset` return any phase to a fresh `Active`.
//!
//! ## Move processing order
//!   1. Gate: only `Active` with a player accepts moves
//!   2. Rule resolution (wall, then box, then beyond-box)
//!   3. Undo snapshot
//!   4. Box relocation (push only) + `on_target` recompute
//!   5. Player relocation, move counter
//!   6. Win check → `Complete`
//!
//! A rejected move never reaches step 3, so every call either fully
//! applies or leaves no trace.

use crate::domain::entity::Crate;
use crate::domain::rules::{self, Resolution};
use crate::domain::tile::{Direction, Position};
use super::event::GameEvent;
use super::level::{self, Catalog};
use super::world::PuzzleState;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Idle,
    Active,
    Paused,
    Complete,
}

/// Pre-move snapshot for undo.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MoveHistoryEntry {
    pub player: Position,
    pub boxes: Vec<Crate>,
    pub move_count: u32,
}

/// Which cells a successful move touched.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct MoveReport {
    pub player_from: Position,
    pub player_to: Position,
    /// New cell of the pushed box, if any.
    pub box_to: Option<Position>,
    /// This move solved the level.
    pub won: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveResult {
    /// Not accepted in the current phase, or no player on the board.
    Ignored,
    Blocked,
    Moved(MoveReport),
    Pushed(MoveReport),
}

impl MoveResult {
    pub fn report(&self) -> Option<&MoveReport> {
        match self {
            MoveResult::Moved(r) | MoveResult::Pushed(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.report().is_some()
    }

    pub fn won(&self) -> bool {
        self.report().is_some_and(|r| r.won)
    }

    /// Cells that need repainting: old player cell, new player cell and
    /// the pushed box's new cell.
    pub fn changed_cells(&self) -> Vec<Position> {
        match self.report() {
            Some(r) => {
                let mut cells = vec![r.player_from, r.player_to];
                cells.extend(r.box_to);
                cells
            }
            None => vec![],
        }
    }

    pub fn events(&self) -> Vec<GameEvent> {
        let mut events = Vec::with_capacity(2);
        match self {
            MoveResult::Moved(_) => events.push(GameEvent::Move),
            MoveResult::Pushed(_) => events.push(GameEvent::Push),
            _ => {}
        }
        if self.won() {
            events.push(GameEvent::Win);
        }
        events
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum UndoResult {
    Undone { move_count: u32 },
    NothingToUndo,
    /// Idle or Complete: undo is not offered.
    Ignored,
}

pub struct PuzzleEngine {
    catalog: Catalog,
    level_id: Option<u32>,
    state: Option<PuzzleState>,
    phase: Phase,
    history: Vec<MoveHistoryEntry>,
}

// ── Queries ──

impl PuzzleEngine {
    pub fn new(catalog: Catalog) -> Self {
        PuzzleEngine {
            catalog,
            level_id: None,
            state: None,
            phase: Phase::Idle,
            history: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn level_id(&self) -> Option<u32> {
        self.level_id
    }

    /// Read-only view of the live state.
    pub fn state(&self) -> Option<&PuzzleState> {
        self.state.as_ref()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Whether `undo()` would do anything right now.
    pub fn can_undo(&self) -> bool {
        matches!(self.phase, Phase::Active | Phase::Paused) && !self.history.is_empty()
    }
}

// ── Transitions ──

impl PuzzleEngine {
    /// Load a level fresh. Unknown ids are a no-op and return `false`.
    pub fn load_level(&mut self, id: u32) -> bool {
        let Some(def) = self.catalog.get(id) else {
            tracing::warn!(level = id, "load_level: unknown level id");
            return false;
        };
        let state = level::parse_level(def);
        tracing::info!(level = id, name = %def.name, boxes = state.boxes().len(), "level loaded");
        self.state = Some(state);
        self.level_id = Some(id);
        self.history.clear();
        self.phase = Phase::Active;
        true
    }

    /// Reload the current level.
    pub fn reset(&mut self) -> bool {
        match self.level_id {
            Some(id) => self.load_level(id),
            None => false,
        }
    }

    pub fn move_player(&mut self, dir: Direction) -> MoveResult {
        if self.phase != Phase::Active {
            return MoveResult::Ignored;
        }
        let Some(state) = self.state.as_mut() else {
            return MoveResult::Ignored;
        };
        let Some(from) = state.player() else {
            return MoveResult::Ignored;
        };

        let resolution = rules::resolve_move(&state.view(), from, dir);
        let (to, pushed) = match resolution {
            Resolution::Blocked => return MoveResult::Blocked,
            Resolution::Step { to } => (to, None),
            Resolution::Push { to, box_idx, box_to } => (to, Some((box_idx, box_to))),
        };

        self.history.push(MoveHistoryEntry {
            player: from,
            boxes: state.boxes().to_vec(),
            move_count: state.move_count,
        });

        if let Some((box_idx, box_to)) = pushed {
            state.move_box(box_idx, box_to);
        }
        state.set_player(to);
        state.move_count += 1;

        let won = state.is_solved();
        let report = MoveReport {
            player_from: from,
            player_to: to,
            box_to: pushed.map(|(_, p)| p),
            won,
        };

        if won {
            self.phase = Phase::Complete;
            tracing::info!(
                level = ?self.level_id,
                moves = state.move_count,
                seconds = state.elapsed_seconds,
                "level complete"
            );
        }

        if pushed.is_some() {
            MoveResult::Pushed(report)
        } else {
            MoveResult::Moved(report)
        }
    }

    /// Roll back the most recent move.
    pub fn undo(&mut self) -> UndoResult {
        if !matches!(self.phase, Phase::Active | Phase::Paused) {
            return UndoResult::Ignored;
        }
        let Some(state) = self.state.as_mut() else {
            return UndoResult::Ignored;
        };
        let Some(entry) = self.history.pop() else {
            return UndoResult::NothingToUndo;
        };
        state.set_player(entry.player);
        state.set_boxes(entry.boxes);
        state.move_count = entry.move_count;
        UndoResult::Undone { move_count: state.move_count }
    }

    pub fn pause(&mut self) -> bool {
        if self.phase == Phase::Active {
            self.phase = Phase::Paused;
            true
        } else {
            false
        }
    }

    pub fn resume(&mut self) -> bool {
        if self.phase == Phase::Paused {
            self.phase = Phase::Active;
            true
        } else {
            false
        }
    }

    /// One second of play. The caller only ticks while `Active`.
    pub fn tick(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.elapsed_seconds += 1;
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::LevelDefinition;
    use crate::domain::tile::Direction::*;

    fn p(x: i32, y: i32) -> Position {
        Position::new(x, y)
    }

    fn engine_at(id: u32) -> PuzzleEngine {
        let mut e = PuzzleEngine::new(Catalog::embedded());
        assert!(e.load_level(id));
        e
    }

    fn engine_with(map: &[&str]) -> PuzzleEngine {
        let pack: String = map.join("\n");
        let mut e = PuzzleEngine::new(Catalog::from_pack(&pack).unwrap());
        assert!(e.load_level(1));
        e
    }

    fn player(e: &PuzzleEngine) -> Position {
        e.state().unwrap().player().unwrap()
    }

    fn moves(e: &PuzzleEngine) -> u32 {
        e.state().unwrap().move_count
    }

    /// Invariants 1-5 from the data model.
    fn assert_invariants(e: &PuzzleEngine) {
        let s = e.state().unwrap();
        let mut seen = std::collections::HashSet::new();
        for b in s.boxes() {
            assert!(seen.insert(b.position), "two boxes share {}", b.position);
            assert!(!s.is_wall(b.position), "box in wall at {}", b.position);
            assert_eq!(b.on_target, s.is_target(b.position));
        }
        if let Some(pl) = s.player() {
            assert!(!s.is_wall(pl));
            assert!(!s.has_box(pl));
        }
    }

    #[test]
    fn starts_idle_and_ignores_input() {
        let mut e = PuzzleEngine::new(Catalog::embedded());
        assert_eq!(e.phase(), Phase::Idle);
        assert_eq!(e.move_player(Right), MoveResult::Ignored);
        assert_eq!(e.undo(), UndoResult::Ignored);
        assert!(!e.pause());
        e.tick();
        assert!(e.state().is_none());
    }

    #[test]
    fn unknown_level_is_noop() {
        let mut e = engine_at(1);
        e.move_player(Right);
        assert!(!e.load_level(99));
        assert_eq!(e.level_id(), Some(1));
        assert_eq!(moves(&e), 1);
    }

    // ── Level 1 scenarios ──

    #[test]
    fn plain_step() {
        let mut e = engine_at(1);
        let r = e.move_player(Right);
        assert_eq!(
            r,
            MoveResult::Moved(MoveReport {
                player_from: p(1, 1),
                player_to: p(2, 1),
                box_to: None,
                won: false,
            })
        );
        assert_eq!(player(&e), p(2, 1));
        assert_eq!(moves(&e), 1);
        assert_eq!(r.events(), vec![GameEvent::Move]);
        assert_eq!(r.changed_cells(), vec![p(1, 1), p(2, 1)]);
    }

    #[test]
    fn push_off_target() {
        let mut e = engine_at(1);
        e.move_player(Right);
        let r = e.move_player(Down);
        assert!(matches!(r, MoveResult::Pushed(MoveReport { box_to: Some(b), won: false, .. }) if b == p(2, 3)));
        let s = e.state().unwrap();
        assert_eq!(s.boxes(), &[Crate::new(p(2, 3), false)]);
        assert_eq!(player(&e), p(2, 2));
        assert_eq!(moves(&e), 2);
        assert_eq!(r.events(), vec![GameEvent::Push]);
        assert_eq!(r.changed_cells(), vec![p(2, 1), p(2, 2), p(2, 3)]);
    }

    #[test]
    fn solve_level_one() {
        let mut e = engine_at(1);
        for d in [Right, Down, Left, Down] {
            let r = e.move_player(d);
            assert!(r.is_success() && !r.won());
        }
        let r = e.move_player(Right);
        assert!(matches!(r, MoveResult::Pushed(_)));
        assert!(r.won());
        assert_eq!(r.events(), vec![GameEvent::Push, GameEvent::Win]);
        assert_eq!(e.phase(), Phase::Complete);
        assert_eq!(e.state().unwrap().boxes(), &[Crate::new(p(3, 3), true)]);
        assert_eq!(moves(&e), 5);
    }

    #[test]
    fn two_box_level_wins_only_on_last_box() {
        let mut e = engine_at(2);
        e.move_player(Right);
        e.move_player(Right);
        let r = e.move_player(Down);
        assert!(matches!(r, MoveResult::Pushed(MoveReport { box_to: Some(b), .. }) if b == p(3, 3)));
        assert!(!r.won());
        let on_target = e.state().unwrap().boxes().iter().filter(|b| b.on_target).count();
        assert_eq!(on_target, 1);
        assert_eq!(e.phase(), Phase::Active);

        for d in [Up, Left, Left, Down, Right, Right, Up, Right] {
            let r = e.move_player(d);
            assert!(r.is_success() && !r.won(), "{d} should move without winning");
        }
        let r = e.move_player(Down);
        assert!(matches!(r, MoveResult::Pushed(_)));
        assert!(r.won());
        assert_eq!(e.phase(), Phase::Complete);
        assert!(e.state().unwrap().boxes().iter().all(|b| b.on_target));
        assert_eq!(moves(&e), 12);
    }

    #[test]
    fn undo_after_step() {
        let mut e = engine_at(1);
        e.move_player(Right);
        assert_eq!(e.undo(), UndoResult::Undone { move_count: 0 });
        assert_eq!(player(&e), p(1, 1));
        assert_eq!(moves(&e), 0);
        assert_eq!(e.undo(), UndoResult::NothingToUndo);
    }

    #[test]
    fn wall_blocks_without_change() {
        let mut e = engine_at(1);
        let before = e.state().unwrap().clone();
        assert_eq!(e.move_player(Up), MoveResult::Blocked);
        assert_eq!(e.state().unwrap(), &before);
        assert_eq!(e.history_len(), 0);
        assert_eq!(e.undo(), UndoResult::NothingToUndo);
    }

    // ── Properties ──

    #[test]
    fn undo_is_left_inverse_of_push() {
        let mut e = engine_at(1);
        e.move_player(Right);
        let before = e.state().unwrap().clone();
        assert!(matches!(e.move_player(Down), MoveResult::Pushed(_)));
        e.undo();
        let after = e.state().unwrap();
        assert_eq!(after.player(), before.player());
        assert_eq!(after.boxes(), before.boxes());
        assert_eq!(after.move_count, before.move_count);
        assert!(!after.has_box(p(2, 3)));
        assert!(after.has_box(p(2, 2)));
    }

    #[test]
    fn invariants_and_counts_over_a_walk() {
        // Wander around level 4 (three boxes) hitting walls and boxes
        let mut e = engine_at(4);
        let box_count = e.state().unwrap().boxes().len();
        let script = [
            Up, Up, Left, Left, Left, Down, Right, Right, Up, Right, Right, Right, Down, Left,
            Up, Up, Left, Down, Down, Right,
        ];
        for (i, d) in script.iter().enumerate() {
            let before = moves(&e);
            let r = e.move_player(*d);
            match r {
                MoveResult::Moved(_) | MoveResult::Pushed(_) => assert_eq!(moves(&e), before + 1),
                MoveResult::Blocked => assert_eq!(moves(&e), before),
                MoveResult::Ignored => {}
            }
            if i % 3 == 2 {
                let before = moves(&e);
                if let UndoResult::Undone { move_count } = e.undo() {
                    assert_eq!(move_count, before - 1);
                }
            }
            assert_invariants(&e);
            assert_eq!(e.state().unwrap().boxes().len(), box_count);
        }
        // Unwind everything: back to the parsed state
        while let UndoResult::Undone { .. } = e.undo() {}
        let fresh = level::parse_level(e.catalog().get(4).unwrap());
        assert_eq!(e.state().unwrap(), &fresh);
    }

    #[test]
    fn pause_gates_moves_but_not_undo() {
        let mut e = engine_at(1);
        e.move_player(Right);
        assert!(e.pause());
        assert!(!e.pause());
        assert_eq!(e.phase(), Phase::Paused);
        assert_eq!(e.move_player(Down), MoveResult::Ignored);
        assert_eq!(player(&e), p(2, 1));
        assert_eq!(e.undo(), UndoResult::Undone { move_count: 0 });
        assert!(e.resume());
        assert!(!e.resume());
        assert!(e.move_player(Right).is_success());
    }

    #[test]
    fn complete_is_terminal_until_reset() {
        let mut e = engine_with(&["#####", "#@$.#", "#####"]);
        assert!(e.move_player(Right).won());
        assert_eq!(e.phase(), Phase::Complete);
        assert_eq!(e.move_player(Left), MoveResult::Ignored);
        assert_eq!(e.undo(), UndoResult::Ignored);
        assert!(!e.can_undo());
        assert!(!e.pause());

        assert!(e.reset());
        assert_eq!(e.phase(), Phase::Active);
        assert_eq!(player(&e), p(1, 1));
        assert_eq!(e.history_len(), 0);
    }

    #[test]
    fn load_resets_counters_and_pause() {
        let mut e = engine_at(1);
        e.move_player(Right);
        e.tick();
        e.tick();
        e.pause();
        assert!(e.load_level(2));
        let s = e.state().unwrap();
        assert_eq!(s.move_count, 0);
        assert_eq!(s.elapsed_seconds, 0);
        assert_eq!(e.phase(), Phase::Active);
        assert_eq!(e.history_len(), 0);
    }

    #[test]
    fn tick_counts_seconds() {
        let mut e = engine_at(1);
        for _ in 0..3 {
            e.tick();
        }
        assert_eq!(e.state().unwrap().elapsed_seconds, 3);
        // Undo restores moves, not time
        e.move_player(Right);
        e.undo();
        assert_eq!(e.state().unwrap().elapsed_seconds, 3);
    }

    #[test]
    fn malformed_level_moves_are_noops() {
        let mut e = engine_with(&["#####", "# $.#", "#####"]);
        assert_eq!(e.phase(), Phase::Active);
        for d in Direction::ALL {
            assert_eq!(e.move_player(d), MoveResult::Ignored);
        }
        assert_eq!(e.history_len(), 0);
        assert_eq!(e.undo(), UndoResult::NothingToUndo);
    }

    #[test]
    fn boxless_level_wins_on_first_move() {
        let mut e = engine_with(&["#####", "#@  #", "#####"]);
        assert_eq!(e.phase(), Phase::Active);
        let r = e.move_player(Right);
        assert!(matches!(r, MoveResult::Moved(_)));
        assert!(r.won());
        assert_eq!(e.phase(), Phase::Complete);
    }

    #[test]
    fn pushing_box_off_target_is_not_a_win() {
        let mut e = engine_with(&["######", "#@* .#", "######"]);
        let r = e.move_player(Right);
        assert!(matches!(r, MoveResult::Pushed(_)));
        assert!(!r.won());
        assert_eq!(e.state().unwrap().boxes()[0], Crate::new(p(3, 1), false));
        assert!(e.move_player(Right).won());
    }

    #[test]
    fn definitions_are_not_mutated() {
        let mut e = engine_at(1);
        e.move_player(Right);
        e.move_player(Down);
        let def: &LevelDefinition = e.catalog().get(1).unwrap();
        assert_eq!(def.map[2], "# $ #");
    }
}
