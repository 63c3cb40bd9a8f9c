//! Persistence: settings, best scores and the tutorial flag.
//!
//! ## Records (JSON, one key each):
//!
//!   **`sokoban-settings`**
//!     `{ "theme": "classic", "sound": true, "lastLevel": 1,
//!        "completedLevels": [1, 2] }`
//!
//!   **`sokoban-best-scores`**
//!     `{ "1": { "bestMoves": 12, "bestTime": 40 }, "2": { ... } }`
//!
//!   **`sokoban-tutorial-completed`**
//!     `true`
//!
//! Storage is injected through the `Storage` trait. Reads fail safe:
//! a missing, unreadable or corrupt record yields the documented default
//! and a warning, never an error into the engine. Writes happen
//! immediately after every mutation; last writer wins.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::StorageError;

pub const SETTINGS_KEY: &str = "sokoban-settings";
pub const BEST_SCORES_KEY: &str = "sokoban-best-scores";
pub const TUTORIAL_KEY: &str = "sokoban-tutorial-completed";

pub type Result<T> = std::result::Result<T, StorageError>;

// ══════════════════════════════════════════════════════════════
// Storage backends
// ══════════════════════════════════════════════════════════════

/// Durable string key-value store.
pub trait Storage {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// One `<key>.json` file per record under a base directory.
pub struct FileStorage {
    base_dir: PathBuf,
}

impl FileStorage {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_dir)?;
        Ok(FileStorage { base_dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        tracing::debug!("wrote {}", path.display());
        Ok(())
    }
}

/// In-memory store for tests and headless runs.
#[derive(Default, Debug, Clone)]
pub struct MemoryStorage {
    records: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.records.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.records.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ══════════════════════════════════════════════════════════════
// Records
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub theme: String,
    pub sound: bool,
    pub last_level: u32,
    /// A malformed list (e.g. `null`) reads as empty without
    /// discarding the other fields.
    #[serde(deserialize_with = "set_or_empty")]
    pub completed_levels: BTreeSet<u32>,
}

fn set_or_empty<'de, D>(deserializer: D) -> std::result::Result<BTreeSet<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(BTreeSet::<u32>::deserialize(value).unwrap_or_default())
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            theme: "classic".to_string(),
            sound: true,
            last_level: 1,
            completed_levels: BTreeSet::new(),
        }
    }
}

/// Per-level bests. `None` until the level is first completed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestScoreRecord {
    pub best_moves: Option<u32>,
    pub best_time: Option<u32>,
}

/// Which bests a completion strictly improved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NewBest {
    pub new_best_moves: bool,
    pub new_best_time: bool,
}

impl NewBest {
    pub fn any(&self) -> bool {
        self.new_best_moves || self.new_best_time
    }
}

type BestScores = BTreeMap<u32, BestScoreRecord>;

// ══════════════════════════════════════════════════════════════
// Profile: typed access over a Storage
// ══════════════════════════════════════════════════════════════

pub struct Profile<S: Storage> {
    storage: S,
}

impl<S: Storage> Profile<S> {
    pub fn new(storage: S) -> Self {
        Profile { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Read and decode a record; any failure falls back to `None`.
    fn read<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let text = match self.storage.get(key) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("reading {key} failed ({e}), using defaults");
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("corrupt {key} record ({e}), using defaults");
                None
            }
        }
    }

    fn write<T: Serialize>(&mut self, key: &str, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.storage.set(key, &text)
    }

    // ── Settings ──

    pub fn load_settings(&self) -> Settings {
        self.read(SETTINGS_KEY).unwrap_or_default()
    }

    pub fn save_settings(&mut self, settings: &Settings) -> Result<()> {
        self.write(SETTINGS_KEY, settings)
    }

    // ── Best scores ──

    fn load_best_scores(&self) -> BestScores {
        self.read(BEST_SCORES_KEY).unwrap_or_default()
    }

    pub fn best_score(&self, level_id: u32) -> BestScoreRecord {
        self.load_best_scores()
            .get(&level_id)
            .copied()
            .unwrap_or_default()
    }

    /// Record a completion. Moves and time improve independently; each
    /// flag is set only on a strict improvement (or first record).
    pub fn save_best_score(&mut self, level_id: u32, moves: u32, time: u32) -> Result<NewBest> {
        let mut scores = self.load_best_scores();
        let record = scores.entry(level_id).or_default();
        let mut new_best = NewBest::default();

        if record.best_moves.map_or(true, |best| moves < best) {
            record.best_moves = Some(moves);
            new_best.new_best_moves = true;
        }
        if record.best_time.map_or(true, |best| time < best) {
            record.best_time = Some(time);
            new_best.new_best_time = true;
        }

        self.write(BEST_SCORES_KEY, &scores)?;
        Ok(new_best)
    }

    // ── Tutorial flag ──

    pub fn tutorial_completed(&self) -> bool {
        self.read::<bool>(TUTORIAL_KEY).unwrap_or(false)
    }

    pub fn complete_tutorial(&mut self) -> Result<()> {
        self.write(TUTORIAL_KEY, &true)
    }
}
