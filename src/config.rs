//! External configuration loader.
//!
//! Reads `config.toml` from the executable's directory, the CWD, or
//! `~/.local/share/mergecube`. Falls back to defaults if the file is
//! missing, unreadable, or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use log::warn;

use crate::domain::merge::MergeRules;
use crate::domain::spawn::SpawnConfig;
use crate::sim::controller::BoardSettings;
use crate::sim::level::{GameMode, ScoringConfig};
use crate::sim::stats::default_stats_dir;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub board: BoardSettings,
    pub spawn: SpawnConfig,
    pub scoring: ScoringConfig,
    pub mode: GameMode,
    /// Overlap share a dragged tile needs before a drop can snap.
    pub snap_overlap: f32,
    /// Fixed RNG seed; `None` seeds from the clock.
    pub seed: Option<u64>,
    pub stats_file: PathBuf,
    pub log_file: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    board: TomlBoard,
    #[serde(default)]
    spawn: TomlSpawn,
    #[serde(default)]
    scoring: TomlScoring,
    #[serde(default)]
    flow: TomlFlow,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlBoard {
    #[serde(default = "default_rows")]
    rows: usize,
    #[serde(default = "default_cols")]
    cols: usize,
    #[serde(default = "default_open_ratio")]
    open_ratio: f64,
    #[serde(default = "default_snap_overlap")]
    snap_overlap: f32,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TomlSpawn {
    #[serde(default = "default_early_moves")]
    early_moves: u32,
    #[serde(default = "default_mid_moves")]
    mid_moves: u32,
    #[serde(default = "default_flood_ratio")]
    flood_ratio: f64,
    #[serde(default = "default_merge_seek")]
    merge_seek_chance: f64,
    #[serde(default = "default_history_len")]
    history_len: usize,
    #[serde(default = "default_window_len")]
    window_len: usize,
}

#[derive(Deserialize, Debug)]
struct TomlScoring {
    #[serde(default = "default_clean_bonus")]
    clean_bonus: u32,
    #[serde(default = "default_star_thresholds")]
    star_thresholds: [u32; 3],
    #[serde(default = "default_threshold_growth")]
    threshold_growth: f64,
    #[serde(default = "default_wild_target")]
    wild_target: u8,
    #[serde(default = "default_crack_points")]
    crack_points: u32,
}

#[derive(Deserialize, Debug)]
struct TomlFlow {
    #[serde(default = "default_mode")]
    mode: String,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_stats_file")]
    stats_file: String,
    #[serde(default = "default_log_file")]
    log_file: String,
}

// ── Defaults ──

fn default_rows() -> usize { 6 }
fn default_cols() -> usize { 5 }
fn default_open_ratio() -> f64 { 0.40 }
fn default_snap_overlap() -> f32 { 0.35 }

fn default_early_moves() -> u32 { 16 }
fn default_mid_moves() -> u32 { 36 }
fn default_flood_ratio() -> f64 { 0.28 }
fn default_merge_seek() -> f64 { 0.60 }
fn default_history_len() -> usize { 20 }
fn default_window_len() -> usize { 12 }

fn default_clean_bonus() -> u32 { 100 }
fn default_star_thresholds() -> [u32; 3] { [40, 80, 140] }
fn default_threshold_growth() -> f64 { 0.15 }
fn default_wild_target() -> u8 { 3 }
fn default_crack_points() -> u32 { 10 }

fn default_mode() -> String { "normal".into() }
fn default_stats_file() -> String { "stats.dat".into() }
fn default_log_file() -> String { "mergecube.log".into() }

impl Default for TomlBoard {
    fn default() -> Self {
        TomlBoard {
            rows: default_rows(),
            cols: default_cols(),
            open_ratio: default_open_ratio(),
            snap_overlap: default_snap_overlap(),
            seed: None,
        }
    }
}

impl Default for TomlSpawn {
    fn default() -> Self {
        TomlSpawn {
            early_moves: default_early_moves(),
            mid_moves: default_mid_moves(),
            flood_ratio: default_flood_ratio(),
            merge_seek_chance: default_merge_seek(),
            history_len: default_history_len(),
            window_len: default_window_len(),
        }
    }
}

impl Default for TomlScoring {
    fn default() -> Self {
        TomlScoring {
            clean_bonus: default_clean_bonus(),
            star_thresholds: default_star_thresholds(),
            threshold_growth: default_threshold_growth(),
            wild_target: default_wild_target(),
            crack_points: default_crack_points(),
        }
    }
}

impl Default for TomlFlow {
    fn default() -> Self {
        TomlFlow { mode: default_mode() }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            stats_file: default_stats_file(),
            log_file: default_log_file(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory,
    /// (3) `~/.local/share/mergecube`.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse a config document. Data files resolve against the stats dir.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(cfg, &[]))
    }

    fn from_toml(cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let mode = GameMode::parse(&cfg.flow.mode).unwrap_or_else(|| {
            warn!("unknown flow.mode {:?}; using normal", cfg.flow.mode);
            GameMode::Normal
        });

        // Out-of-range numbers are clamped rather than rejected.
        let scoring = cfg.scoring;
        GameConfig {
            board: BoardSettings {
                rows: cfg.board.rows.max(1),
                cols: cfg.board.cols.max(1),
                open_ratio: cfg.board.open_ratio.clamp(0.0, 1.0),
                rules: MergeRules {
                    wild_target: scoring.wild_target.clamp(1, 5),
                    crack_points: scoring.crack_points,
                },
                clean_bonus: scoring.clean_bonus,
            },
            spawn: SpawnConfig {
                early_moves: cfg.spawn.early_moves,
                mid_moves: cfg.spawn.mid_moves.max(cfg.spawn.early_moves),
                flood_ratio: cfg.spawn.flood_ratio.clamp(0.0, 1.0),
                merge_seek_chance: cfg.spawn.merge_seek_chance.clamp(0.0, 1.0),
                history_len: cfg.spawn.history_len.max(2),
                window_len: cfg.spawn.window_len.max(1),
            },
            scoring: ScoringConfig {
                clean_bonus: scoring.clean_bonus,
                star_thresholds: scoring.star_thresholds,
                threshold_growth: scoring.threshold_growth.max(0.0),
            },
            mode,
            snap_overlap: cfg.board.snap_overlap.clamp(0.0, 1.0),
            seed: cfg.board.seed,
            stats_file: resolve_data_file(&cfg.general.stats_file, search_dirs),
            log_file: resolve_data_file(&cfg.general.log_file, search_dirs),
        }
    }
}

/// Absolute paths are kept. A relative name is looked up in the search
/// dirs first, then placed in the default stats directory.
fn resolve_data_file(name: &str, search_dirs: &[PathBuf]) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    search_dirs.iter()
        .map(|d| d.join(path))
        .find(|p| p.is_file())
        .unwrap_or_else(|| default_stats_dir().join(path))
}

/// Candidate directories to search: exe dir + CWD + XDG data dir (deduplicated).
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

    // 3. XDG data home (~/.local/share/mergecube)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/mergecube");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warn!("config.toml parse error: {e}; using default settings");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = GameConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.board, BoardSettings::default());
        assert_eq!(cfg.spawn, SpawnConfig::default());
        assert_eq!(cfg.scoring, ScoringConfig::default());
        assert_eq!(cfg.mode, GameMode::Normal);
        assert_eq!(cfg.snap_overlap, 0.35);
        assert_eq!(cfg.seed, None);
        assert!(cfg.stats_file.ends_with("stats.dat"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[board]\nrows = 4\ncols = 4\nseed = 99\n\n[flow]\nmode = \"endless\"\n\n[scoring]\nwild_target = 2\n",
        ).unwrap();
        assert_eq!((cfg.board.rows, cfg.board.cols), (4, 4));
        assert_eq!(cfg.board.open_ratio, 0.40);
        assert_eq!(cfg.board.rules.wild_target, 2);
        assert_eq!(cfg.seed, Some(99));
        assert_eq!(cfg.mode, GameMode::Endless);
        assert_eq!(cfg.scoring.clean_bonus, 100);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let cfg = GameConfig::from_toml_str(
            "[board]\nrows = 0\nopen_ratio = 3.5\nsnap_overlap = -1.0\n\n[spawn]\nearly_moves = 40\nmid_moves = 10\n\n[flow]\nmode = \"arcade\"\n",
        ).unwrap();
        assert_eq!(cfg.board.rows, 1);
        assert_eq!(cfg.board.open_ratio, 1.0);
        assert_eq!(cfg.snap_overlap, 0.0);
        assert_eq!(cfg.spawn.mid_moves, 40);
        assert_eq!(cfg.mode, GameMode::Normal);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(GameConfig::from_toml_str("[board\nrows = ").is_err());
        assert!(GameConfig::from_toml_str("[board]\nrows = \"six\"").is_err());
    }

    #[test]
    fn absolute_data_paths_are_kept() {
        let abs = std::env::temp_dir().join("mc-stats.dat");
        assert_eq!(resolve_data_file(abs.to_str().unwrap(), &[]), abs);
    }
}
