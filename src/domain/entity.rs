//! Entities: the pushable crate, and the command vocabulary the input
//! layer speaks to the session.

use super::tile::{Direction, Position};

/// A movable box. `on_target` mirrors whether `position` is a target and
/// is recomputed every time the box moves.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Crate {
    pub position: Position,
    pub on_target: bool,
}

impl Crate {
    pub fn new(position: Position, on_target: bool) -> Self {
        Crate { position, on_target }
    }
}

/// Intent from the input layer. The engine never sees raw key events.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Move(Direction),
    Undo,
    /// Reload the given level from scratch.
    Reset(u32),
    LoadLevel(u32),
    Pause,
    Resume,
}
