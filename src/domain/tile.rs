//! Grid primitives: positions, directions and the map legend.
//! Legend semantics are centralized here so the parser, the renderer and
//! the board's `Display` all agree on what each character means.

use std::fmt;

/// Grid coordinate. Origin top-left, x grows right, y grows down.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// The neighbouring cell one step in `dir`.
    #[inline]
    pub fn step(self, dir: Direction) -> Position {
        let (dx, dy) = dir.delta();
        Position { x: self.x + dx, y: self.y + dy }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Directional intent produced by the input layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        };
        f.write_str(name)
    }
}

/// One character of a level map, decoded.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cell {
    Floor,
    Wall,
    Target,
    Player,
    PlayerOnTarget,
    Box,
    BoxOnTarget,
}

impl Cell {
    /// Decode a legend character. Unknown characters are floor.
    pub fn from_char(c: char) -> Cell {
        match c {
            '#' => Cell::Wall,
            '.' => Cell::Target,
            '@' => Cell::Player,
            '+' => Cell::PlayerOnTarget,
            '$' => Cell::Box,
            '*' => Cell::BoxOnTarget,
            _ => Cell::Floor,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Cell::Floor => ' ',
            Cell::Wall => '#',
            Cell::Target => '.',
            Cell::Player => '@',
            Cell::PlayerOnTarget => '+',
            Cell::Box => '$',
            Cell::BoxOnTarget => '*',
        }
    }

    pub fn is_target(self) -> bool {
        matches!(self, Cell::Target | Cell::PlayerOnTarget | Cell::BoxOnTarget)
    }

    pub fn is_player(self) -> bool {
        matches!(self, Cell::Player | Cell::PlayerOnTarget)
    }

    pub fn is_box(self) -> bool {
        matches!(self, Cell::Box | Cell::BoxOnTarget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_follows_screen_axes() {
        let p = Position::new(2, 2);
        assert_eq!(p.step(Direction::Up), Position::new(2, 1));
        assert_eq!(p.step(Direction::Down), Position::new(2, 3));
        assert_eq!(p.step(Direction::Left), Position::new(1, 2));
        assert_eq!(p.step(Direction::Right), Position::new(3, 2));
    }

    #[test]
    fn legend_round_trips_known_chars() {
        for c in ['#', '.', '@', '+', '$', '*', ' '] {
            assert_eq!(Cell::from_char(c).to_char(), c);
        }
    }

    #[test]
    fn unknown_chars_are_floor() {
        // '^' and friends were player helpers in old maps, never walls
        assert_eq!(Cell::from_char('^'), Cell::Floor);
        assert_eq!(Cell::from_char('x'), Cell::Floor);
    }

    #[test]
    fn cell_flags() {
        assert!(Cell::PlayerOnTarget.is_target());
        assert!(Cell::PlayerOnTarget.is_player());
        assert!(Cell::BoxOnTarget.is_box());
        assert!(!Cell::Wall.is_target());
    }
}
