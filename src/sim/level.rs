//! Level catalog and parser.
//!
//! ## Sources
//!   1. External pack file (`levels_file` in config), if it parses to at
//!      least one level
//!   2. Built-in embedded levels
//!
//! ## Pack format:
//!   ```text
//!   ; First Steps
//!   #####
//!   #@  #
//!   # $ #
//!   #  .#
//!   #####
//!   ---
//!   ; Double Push
//!   ...
//!   ```
//!
//! Levels are separated by a line containing only `---`. A line starting
//! with `;` names the level. Ids are assigned 1..=n in file order.
//!
//! ## Tile legend:
//!   '#' = Wall                   ' ' = Floor
//!   '@' = Player                 '+' = Player on target
//!   '$' = Box                    '*' = Box on target
//!   '.' = Target
//! Any other character is floor.

use std::collections::HashSet;
use std::path::Path;

use crate::domain::entity::Crate;
use crate::domain::tile::{Cell, Position};
use crate::error::LevelError;
use crate::sim::world::PuzzleState;

/// Immutable puzzle definition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelDefinition {
    /// 1-based, dense.
    pub id: u32,
    pub name: String,
    /// Row strings; rows may be ragged.
    pub map: Vec<String>,
}

impl LevelDefinition {
    pub fn new(id: u32, name: &str, map: &[&str]) -> Self {
        LevelDefinition {
            id,
            name: name.to_string(),
            map: map.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Parsing
// ══════════════════════════════════════════════════════════════

/// Build a fresh runtime state from a definition.
///
/// Width is the longest row; cells past the end of a short row are
/// floor. A missing player marker leaves the player unset, and the engine
/// treats every move on such a state as a no-op.
pub fn parse_level(def: &LevelDefinition) -> PuzzleState {
    let mut walls = HashSet::new();
    let mut targets = HashSet::new();
    let mut boxes = Vec::new();
    let mut player = None;

    let height = def.map.len();
    let width = def.map.iter().map(|r| r.chars().count()).max().unwrap_or(0);

    for (y, row) in def.map.iter().enumerate() {
        for (x, ch) in row.chars().enumerate() {
            let p = Position::new(x as i32, y as i32);
            let cell = Cell::from_char(ch);
            if cell == Cell::Wall {
                walls.insert(p);
                continue;
            }
            if cell.is_target() {
                targets.insert(p);
            }
            if cell.is_player() {
                if player.is_some() {
                    tracing::warn!(level = def.id, "multiple player markers, keeping {}", p);
                }
                player = Some(p);
            }
            if cell.is_box() {
                boxes.push(Crate::new(p, cell == Cell::BoxOnTarget));
            }
        }
    }

    if player.is_none() {
        tracing::warn!(level = def.id, "level has no player marker");
    }

    PuzzleState::new(width, height, walls, targets, boxes, player)
}

// ══════════════════════════════════════════════════════════════
// Catalog
// ══════════════════════════════════════════════════════════════

/// Ordered set of levels, indexed by id.
#[derive(Clone, Debug)]
pub struct Catalog {
    levels: Vec<LevelDefinition>,
}

impl Catalog {
    /// The built-in levels.
    pub fn embedded() -> Self {
        Catalog { levels: embedded_levels() }
    }

    /// Parse a level pack. Ids are reassigned densely from 1.
    pub fn from_pack(content: &str) -> Result<Self, LevelError> {
        let levels = parse_pack_levels(content);
        if levels.is_empty() {
            return Err(LevelError::Empty);
        }
        Ok(Catalog { levels })
    }

    pub fn from_file(path: &Path) -> Result<Self, LevelError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_pack(&content)
    }

    /// Pack file when configured and usable, otherwise the embedded set.
    pub fn load(levels_file: Option<&Path>) -> Self {
        let Some(path) = levels_file else {
            return Self::embedded();
        };
        match Self::from_file(path) {
            Ok(catalog) => {
                tracing::info!("loaded {} levels from {}", catalog.len(), path.display());
                catalog
            }
            Err(e) => {
                tracing::warn!("level pack {} unusable ({e}), using built-in levels", path.display());
                Self::embedded()
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<&LevelDefinition> {
        let idx = (id as usize).checked_sub(1)?;
        self.levels.get(idx)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LevelDefinition> {
        self.levels.iter()
    }
}

fn parse_pack_levels(content: &str) -> Vec<LevelDefinition> {
    let mut levels = vec![];
    let mut name = String::new();
    let mut rows: Vec<String> = vec![];

    let mut flush = |name: &mut String, rows: &mut Vec<String>| {
        while rows.last().is_some_and(|r| r.trim().is_empty()) {
            rows.pop();
        }
        while rows.first().is_some_and(|r| r.trim().is_empty()) {
            rows.remove(0);
        }
        if !rows.is_empty() {
            let id = levels.len() as u32 + 1;
            let level_name = if name.is_empty() { format!("Level {id}") } else { name.clone() };
            levels.push(LevelDefinition { id, name: level_name, map: std::mem::take(rows) });
        }
        name.clear();
        rows.clear();
    };

    for line in content.lines() {
        if line.trim() == "---" {
            flush(&mut name, &mut rows);
        } else if let Some(rest) = line.trim_start().strip_prefix(';') {
            if name.is_empty() {
                name = rest.trim().to_string();
            }
        } else {
            rows.push(line.trim_end_matches('\r').to_string());
        }
    }
    flush(&mut name, &mut rows);

    levels
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

fn embedded_levels() -> Vec<LevelDefinition> {
    vec![
        LevelDefinition::new(1, "First Steps", &[
            "#####",
            "#@  #",
            "# $ #",
            "#  .#",
            "#####",
        ]),
        LevelDefinition::new(2, "Double Push", &[
            "######",
            "#@   #",
            "# $$ #",
            "#  ..#",
            "######",
        ]),
        LevelDefinition::new(3, "Corner Turn", &[
            "#######",
            "#     #",
            "# .$ .#",
            "#  $  #",
            "#  @  #",
            "#######",
        ]),
        LevelDefinition::new(4, "Triple Threat", &[
            "########",
            "#  ... #",
            "# $$$  #",
            "#  @   #",
            "########",
        ]),
        LevelDefinition::new(5, "Around the Corner", &[
            "  ####  ",
            "###  ###",
            "# @  $ #",
            "#   # .#",
            "# $  . #",
            "########",
        ]),
        LevelDefinition::new(6, "Plan Ahead", &[
            "#########",
            "#  ...  #",
            "# $$$   #",
            "#   @   #",
            "#########",
        ]),
        LevelDefinition::new(7, "Reposition", &[
            " ###### ",
            " #    # ",
            "## $  # ",
            "#  $ # #",
            "# .. # #",
            "#  @### ",
            "####    ",
        ]),
        LevelDefinition::new(8, "Compact", &[
            "#######",
            "#  .  #",
            "# $.$ #",
            "#  $  #",
            "# .@  #",
            "#######",
        ]),
        LevelDefinition::new(9, "Little Maze", &[
            "  #####",
            "###   #",
            "#@$ $ #",
            "# ### #",
            "#  .. #",
            "####   #",
            "   #####",
        ]),
        LevelDefinition::new(10, "Squeeze", &[
            " ######",
            " #.. . #",
            "## #  #",
            "# $ $ #",
            "#  $. #",
            "##$ @ #",
            " ####",
        ]),
        LevelDefinition::new(11, "Four Play", &[
            "#########",
            "#  .... #",
            "# $ $ $ #",
            "#   $   #",
            "#   @   #",
            "#########",
        ]),
        LevelDefinition::new(12, "Obstacles", &[
            " ########",
            " #  .  . #",
            "## # ## #",
            "# $ $ $ #",
            "#  .@   #",
            "#########",
        ]),
        LevelDefinition::new(13, "Warehouse", &[
            "  ######",
            " #.... #",
            "### #  #",
            "# $ $ ##",
            "# $ $ # ",
            "#  @ # ",
            "###### ",
        ]),
        LevelDefinition::new(14, "Strategy", &[
            "#########",
            "# .... ..#",
            "# ### # #",
            "# $ $ $ #",
            "# $ $ $ #",
            "#  @    #",
            "#########",
        ]),
        LevelDefinition::new(15, "Mastery", &[
            " ########",
            " # ... # ",
            " ##$.$## ",
            " #  $  # ",
            " #$ $.$ # ",
            " #  @ .# ",
            " ########",
        ]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(map: &[&str]) -> LevelDefinition {
        LevelDefinition::new(1, "test", map)
    }

    #[test]
    fn parse_first_level() {
        let catalog = Catalog::embedded();
        let state = parse_level(catalog.get(1).unwrap());
        assert_eq!(state.width, 5);
        assert_eq!(state.height, 5);
        assert_eq!(state.player(), Some(Position::new(1, 1)));
        assert_eq!(state.boxes(), &[Crate::new(Position::new(2, 2), false)]);
        assert!(state.is_target(Position::new(3, 3)));
        assert_eq!(state.walls().len(), 16);
        assert_eq!(state.move_count, 0);
        assert_eq!(state.elapsed_seconds, 0);
    }

    #[test]
    fn markers_on_target() {
        let state = parse_level(&level(&["#+*$.#"]));
        assert_eq!(state.player(), Some(Position::new(1, 0)));
        assert!(state.is_target(Position::new(1, 0)));
        assert_eq!(
            state.boxes(),
            &[
                Crate::new(Position::new(2, 0), true),
                Crate::new(Position::new(3, 0), false),
            ]
        );
        assert_eq!(state.targets().len(), 3);
    }

    #[test]
    fn ragged_width_is_longest_row() {
        let state = parse_level(&level(&["###", "#@ $ .#", "#"]));
        assert_eq!(state.width, 7);
        assert_eq!(state.height, 3);
        // Past the end of row 0: floor, not wall
        assert!(!state.is_wall(Position::new(5, 0)));
    }

    #[test]
    fn unknown_chars_are_floor() {
        let state = parse_level(&level(&["#@x^$.#"]));
        assert!(!state.is_wall(Position::new(2, 0)));
        assert!(!state.is_wall(Position::new(3, 0)));
        assert_eq!(state.boxes().len(), 1);
    }

    #[test]
    fn missing_player_leaves_unset() {
        let state = parse_level(&level(&["#####", "# $.#", "#####"]));
        assert_eq!(state.player(), None);
    }

    #[test]
    fn last_player_marker_wins() {
        let state = parse_level(&level(&["#@ @#"]));
        assert_eq!(state.player(), Some(Position::new(3, 0)));

        let state = parse_level(&level(&["#+ #", "# @#"]));
        assert_eq!(state.player(), Some(Position::new(2, 1)));
        // The earlier marker's target survives
        assert!(state.is_target(Position::new(1, 0)));
    }

    #[test]
    fn display_round_trips_authored_rows() {
        let catalog = Catalog::embedded();
        let def = catalog.get(5).unwrap();
        let state = parse_level(def);
        let expected: Vec<&str> = def.map.iter().map(|r| r.trim_end()).collect();
        let rendered = state.to_string();
        let got: Vec<&str> = rendered.lines().collect();
        assert_eq!(got, expected);
    }

    #[test]
    fn embedded_catalog_is_dense() {
        let catalog = Catalog::embedded();
        assert_eq!(catalog.len(), 15);
        for (i, def) in catalog.iter().enumerate() {
            assert_eq!(def.id as usize, i + 1);
            let players = def
                .map
                .iter()
                .flat_map(|r| r.chars())
                .filter(|&c| c == '@' || c == '+')
                .count();
            assert_eq!(players, 1, "level {} player markers", def.id);
        }
        assert!(catalog.get(0).is_none());
        assert!(catalog.get(16).is_none());
    }

    #[test]
    fn pack_parsing() {
        let pack = "; Tiny\n####\n#@$.#\n####\n---\n\n#####\n#@*#\n####\n---\n";
        let catalog = Catalog::from_pack(pack).unwrap();
        assert_eq!(catalog.len(), 2);
        let first = catalog.get(1).unwrap();
        assert_eq!(first.name, "Tiny");
        assert_eq!(first.map, vec!["####", "#@$.#", "####"]);
        let second = catalog.get(2).unwrap();
        assert_eq!(second.name, "Level 2");
        assert_eq!(second.map.len(), 3);
    }

    #[test]
    fn empty_pack_rejected() {
        assert!(matches!(Catalog::from_pack("---\n; nothing\n---\n"), Err(LevelError::Empty)));
    }

    #[test]
    fn missing_pack_falls_back_to_embedded() {
        let catalog = Catalog::load(Some(Path::new("no/such/pack.txt")));
        assert_eq!(catalog.len(), 15);
    }
}
