/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ── Public Config Struct ──

#[derive(Clone, Debug, PartialEq)]
pub struct GameConfig {
    pub clock: ClockConfig,
    /// Where save data and the log file live.
    pub data_dir: PathBuf,
    /// Optional external level pack; embedded levels otherwise.
    pub levels_file: Option<PathBuf>,
    /// Default tracing filter. `RUST_LOG` overrides it.
    pub log_filter: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClockConfig {
    /// Elapsed-time tick period. One tick is one second of play time.
    pub tick_ms: u64,
    /// Frame period of the input/render loop.
    pub frame_ms: u64,
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    clock: TomlClock,
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    log: TomlLog,
}

#[derive(Deserialize, Debug)]
struct TomlClock {
    #[serde(default = "default_tick_ms")]
    tick_ms: u64,
    #[serde(default = "default_frame_ms")]
    frame_ms: u64,
}

#[derive(Deserialize, Debug, Default)]
struct TomlGeneral {
    #[serde(default)]
    data_dir: Option<String>,
    #[serde(default)]
    levels_file: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TomlLog {
    #[serde(default = "default_log_filter")]
    filter: String,
}

// ── Defaults ──

fn default_tick_ms() -> u64 { 1000 }
fn default_frame_ms() -> u64 { 16 }
fn default_log_filter() -> String { "info".into() }

impl Default for TomlClock {
    fn default() -> Self {
        TomlClock {
            tick_ms: default_tick_ms(),
            frame_ms: default_frame_ms(),
        }
    }
}

impl Default for TomlLog {
    fn default() -> Self {
        TomlLog { filter: default_log_filter() }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    /// Parse config text directly. Relative paths resolve against CWD.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::resolve(toml_cfg, &[]))
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let data_dir = toml_cfg
            .general
            .data_dir
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        // Relative pack paths: first candidate dir that has the file
        let levels_file = toml_cfg.general.levels_file.map(|name| {
            let path = PathBuf::from(&name);
            if path.is_absolute() {
                return path;
            }
            search_dirs
                .iter()
                .map(|d| d.join(&name))
                .find(|p| p.is_file())
                .unwrap_or(path)
        });

        GameConfig {
            clock: ClockConfig {
                tick_ms: toml_cfg.clock.tick_ms.max(1),
                frame_ms: toml_cfg.clock.frame_ms.max(1),
            },
            data_dir,
            levels_file,
            log_filter: toml_cfg.log.filter,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::resolve(TomlConfig::default(), &[])
    }
}

/// `~/.local/share/sokoban`, or the working directory without `$HOME`.
fn default_data_dir() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => Path::new(&home).join(".local/share/sokoban"),
        _ => PathBuf::from("."),
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home
    let xdg = default_data_dir();
    if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
        dirs.push(xdg);
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/sokoban");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
/// Runs before logging is up, so problems go to stderr.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
