/// Input state tracker.
///
/// Drains crossterm key events once per frame and keeps the fresh presses.
/// Every puzzle action is edge-triggered: one key press is one command,
/// auto-repeat from a held key arrives as further presses.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::tile::Direction;

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_UNDO: &[KeyCode] = &[KeyCode::Char('z'), KeyCode::Char('Z'), KeyCode::Backspace];
const KEYS_RESET: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char(' '), KeyCode::Char('p'), KeyCode::Char('P'), KeyCode::Esc];
const KEYS_NEXT: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char('n'), KeyCode::Char('N')];
const KEYS_PREV_LEVEL: &[KeyCode] = &[KeyCode::Char('[')];
const KEYS_NEXT_LEVEL: &[KeyCode] = &[KeyCode::Char(']')];
const KEYS_THEME: &[KeyCode] = &[KeyCode::Char('t'), KeyCode::Char('T')];
const KEYS_SOUND: &[KeyCode] = &[KeyCode::Char('m'), KeyCode::Char('M')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

/// A frontend-level action decoded from one key press.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Move(Direction),
    Undo,
    Reset,
    TogglePause,
    /// Continue after a completed level.
    Next,
    PrevLevel,
    NextLevel,
    CycleTheme,
    ToggleSound,
    Quit,
}

pub struct InputState {
    /// Keys pressed during the most recent drain_events() call, in order.
    fresh_presses: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState { fresh_presses: Vec::with_capacity(8) }
    }

    /// Drain all pending terminal events without blocking.
    /// Call this once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                if key.kind != KeyEventKind::Release {
                    self.fresh_presses.push(key);
                }
            }
        }
    }

    /// Actions for this frame, in press order.
    pub fn actions(&self) -> Vec<Action> {
        self.fresh_presses.iter().filter_map(|k| decode(*k)).collect()
    }
}

/// Map a key event to an action. Ctrl+C always quits.
pub fn decode(key: KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C')).then_some(Action::Quit);
    }
    let code = key.code;
    let is = |set: &[KeyCode]| set.contains(&code);

    let action = if is(KEYS_UP) {
        Action::Move(Direction::Up)
    } else if is(KEYS_DOWN) {
        Action::Move(Direction::Down)
    } else if is(KEYS_LEFT) {
        Action::Move(Direction::Left)
    } else if is(KEYS_RIGHT) {
        Action::Move(Direction::Right)
    } else if is(KEYS_UNDO) {
        Action::Undo
    } else if is(KEYS_RESET) {
        Action::Reset
    } else if is(KEYS_PAUSE) {
        Action::TogglePause
    } else if is(KEYS_NEXT) {
        Action::Next
    } else if is(KEYS_PREV_LEVEL) {
        Action::PrevLevel
    } else if is(KEYS_NEXT_LEVEL) {
        Action::NextLevel
    } else if is(KEYS_THEME) {
        Action::CycleTheme
    } else if is(KEYS_SOUND) {
        Action::ToggleSound
    } else if is(KEYS_QUIT) {
        Action::Quit
    } else {
        return None;
    };
    Some(action)
}
