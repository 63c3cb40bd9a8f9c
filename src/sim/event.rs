//! Events emitted by the engine.
//! Audio and celebration observers consume these; they never feed back
//! into engine state.

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameEvent {
    Move,
    Push,
    Win,
    Undo,
}
