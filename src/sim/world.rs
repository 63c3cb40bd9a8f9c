//! PuzzleState: the complete mutable state of one level session.
//!
//! ## Layers
//!
//!   - `walls`, `targets` : set at parse time. **Never mutated** after.
//!   - `boxes`            : ordered; moved only by `move_box()`.
//!   - `box_index`        : derived position → box lookup, kept in sync by
//!     `move_box()` and `set_boxes()`.
//!
//! Legality queries are O(1) hash lookups; rule logic lives in
//! `domain::rules` and reads the board through `view()`.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::domain::entity::Crate;
use crate::domain::rules::{self, MapView};
use crate::domain::tile::{Cell, Position};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PuzzleState {
    pub width: usize,
    pub height: usize,
    walls: HashSet<Position>,
    targets: HashSet<Position>,
    boxes: Vec<Crate>,
    box_index: HashMap<Position, usize>,
    /// `None` when the level had no player marker.
    player: Option<Position>,
    pub move_count: u32,
    pub elapsed_seconds: u32,
}

// ── Construction ──

impl PuzzleState {
    /// Assemble a fresh state. Counters start at zero.
    pub fn new(
        width: usize,
        height: usize,
        walls: HashSet<Position>,
        targets: HashSet<Position>,
        boxes: Vec<Crate>,
        player: Option<Position>,
    ) -> Self {
        let mut state = PuzzleState {
            width,
            height,
            walls,
            targets,
            boxes: Vec::new(),
            box_index: HashMap::new(),
            player,
            move_count: 0,
            elapsed_seconds: 0,
        };
        state.set_boxes(boxes);
        state
    }
}

// ── Queries ──

impl PuzzleState {
    #[inline]
    pub fn player(&self) -> Option<Position> {
        self.player
    }

    pub fn boxes(&self) -> &[Crate] {
        &self.boxes
    }

    pub fn walls(&self) -> &HashSet<Position> {
        &self.walls
    }

    pub fn targets(&self) -> &HashSet<Position> {
        &self.targets
    }

    #[inline]
    pub fn is_wall(&self, p: Position) -> bool {
        self.walls.contains(&p)
    }

    #[inline]
    pub fn is_target(&self, p: Position) -> bool {
        self.targets.contains(&p)
    }

    #[inline]
    pub fn has_box(&self, p: Position) -> bool {
        self.box_index.contains_key(&p)
    }

    pub fn is_solved(&self) -> bool {
        rules::is_solved(&self.boxes)
    }

    /// Read-only view for the rule functions.
    pub fn view(&self) -> MapView<'_> {
        MapView {
            walls: &self.walls,
            box_index: &self.box_index,
            width: self.width,
            height: self.height,
        }
    }

    /// What occupies `p`, as a legend cell.
    pub fn cell_at(&self, p: Position) -> Cell {
        let target = self.is_target(p);
        if self.is_wall(p) {
            Cell::Wall
        } else if self.player == Some(p) {
            if target { Cell::PlayerOnTarget } else { Cell::Player }
        } else if self.has_box(p) {
            if target { Cell::BoxOnTarget } else { Cell::Box }
        } else if target {
            Cell::Target
        } else {
            Cell::Floor
        }
    }
}

// ── Mutation (engine only) ──

impl PuzzleState {
    pub(crate) fn set_player(&mut self, p: Position) {
        self.player = Some(p);
    }

    /// Relocate box `idx` and recompute its `on_target`.
    pub(crate) fn move_box(&mut self, idx: usize, to: Position) {
        let on_target = self.targets.contains(&to);
        let b = &mut self.boxes[idx];
        self.box_index.remove(&b.position);
        b.position = to;
        b.on_target = on_target;
        self.box_index.insert(to, idx);
    }

    /// Replace the whole box list (undo restore) and rebuild the index.
    pub(crate) fn set_boxes(&mut self, boxes: Vec<Crate>) {
        self.box_index = boxes
            .iter()
            .enumerate()
            .map(|(i, b)| (b.position, i))
            .collect();
        self.boxes = boxes;
    }
}

impl fmt::Display for PuzzleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            let line: String = (0..self.width)
                .map(|x| self.cell_at(Position::new(x as i32, y as i32)).to_char())
                .collect();
            // Trim trailing floor to match the authored rows
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> PuzzleState {
        let walls: HashSet<Position> = [(0, 0), (1, 0), (2, 0), (3, 0)]
            .into_iter()
            .map(|(x, y)| Position::new(x, y))
            .collect();
        let targets: HashSet<Position> = [Position::new(2, 1)].into_iter().collect();
        PuzzleState::new(
            4,
            2,
            walls,
            targets,
            vec![Crate::new(Position::new(1, 1), false)],
            Some(Position::new(0, 1)),
        )
    }

    #[test]
    fn index_tracks_moves() {
        let mut s = small();
        assert!(s.has_box(Position::new(1, 1)));
        s.move_box(0, Position::new(2, 1));
        assert!(!s.has_box(Position::new(1, 1)));
        assert!(s.has_box(Position::new(2, 1)));
        assert!(s.boxes()[0].on_target);
        assert!(s.is_solved());
    }

    #[test]
    fn set_boxes_rebuilds_index() {
        let mut s = small();
        s.set_boxes(vec![Crate::new(Position::new(3, 1), false)]);
        assert!(!s.has_box(Position::new(1, 1)));
        assert!(s.has_box(Position::new(3, 1)));
        assert_eq!(s.view().box_at(Position::new(3, 1)), Some(0));
    }

    #[test]
    fn display_uses_legend() {
        let s = small();
        assert_eq!(s.to_string(), "####\n@$.\n");
    }
}
