//! Move rules: pure functions over a read-only board view.
//!
//! These decide "what is legal" without performing the action; the
//! engine applies the returned `Resolution`.
//!
//! ## Move Truth Table
//!
//! Evaluated top to bottom, first match wins.
//! ┌──────────────────────────────────────┬───────────┬────────────────┐
//! │ Condition                             │ Result    │ Notes          │
//! ├──────────────────────────────────────┼───────────┼────────────────┤
//! │ dest outside width x height           │ Blocked   │ map edge       │
//! │ dest is wall                          │ Blocked   │ checked first  │
//! │ dest has box, beyond outside map      │ Blocked   │                │
//! │ dest has box, beyond is wall          │ Blocked   │                │
//! │ dest has box, beyond has box          │ Blocked   │ no chain push  │
//! │ dest has box                          │ Push      │ box → beyond   │
//! │ otherwise (floor / target)            │ Step      │                │
//! └──────────────────────────────────────┴───────────┴────────────────┘
//!
//! ## Win
//!
//! Solved ⇔ every box is on a target. A board with no boxes counts as
//! solved.

use std::collections::{HashMap, HashSet};

use super::entity::Crate;
use super::tile::{Direction, Position};

/// Immutable view of the board for rule queries.
pub struct MapView<'a> {
    pub walls: &'a HashSet<Position>,
    /// Box position → index into the ordered box list.
    pub box_index: &'a HashMap<Position, usize>,
    pub width: usize,
    pub height: usize,
}

impl<'a> MapView<'a> {
    #[inline]
    pub fn in_bounds(&self, p: Position) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width && (p.y as usize) < self.height
    }

    /// Out-of-bounds cells behave as walls.
    #[inline]
    pub fn is_wall(&self, p: Position) -> bool {
        !self.in_bounds(p) || self.walls.contains(&p)
    }

    #[inline]
    pub fn box_at(&self, p: Position) -> Option<usize> {
        self.box_index.get(&p).copied()
    }
}

/// Outcome of checking one move against the board.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Resolution {
    Blocked,
    Step { to: Position },
    Push { to: Position, box_idx: usize, box_to: Position },
}

/// Decide what a move from `player` in `dir` would do.
pub fn resolve_move(map: &MapView, player: Position, dir: Direction) -> Resolution {
    let to = player.step(dir);

    // Wall before box: never rely on box/wall exclusion as a precondition.
    if map.is_wall(to) {
        return Resolution::Blocked;
    }

    match map.box_at(to) {
        Some(box_idx) => {
            let box_to = to.step(dir);
            if map.is_wall(box_to) || map.box_at(box_to).is_some() {
                Resolution::Blocked
            } else {
                Resolution::Push { to, box_idx, box_to }
            }
        }
        None => Resolution::Step { to },
    }
}

/// Win predicate.
pub fn is_solved(boxes: &[Crate]) -> bool {
    boxes.iter().all(|b| b.on_target)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
