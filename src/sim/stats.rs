//! Persistent player statistics.
//!
//! The board controller and level flow only talk to `StatsSink`;
//! durability is the sink's business.
//!
//! ## File format (`FileStats`):
//!   Key-value lines, every key namespaced with `mergecube.`:
//!   ```text
//!   mergecube.high_score=420
//!   mergecube.cubes_cracked=37
//!   ```
//!   Unknown keys and malformed lines are ignored on load.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::warn;

const NAMESPACE: &str = "mergecube.";

#[derive(thiserror::Error, Debug)]
pub enum StatsError {
    #[error("stats io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Stat {
    HighScore,
    HighestBoard,
    CubesCracked,
    LongestCombo,
    HelpersUsed,
    /// Seconds.
    TimePlayed,
    CollectiblesUnlocked,
}

impl Stat {
    pub const ALL: [Stat; 7] = [
        Stat::HighScore,
        Stat::HighestBoard,
        Stat::CubesCracked,
        Stat::LongestCombo,
        Stat::HelpersUsed,
        Stat::TimePlayed,
        Stat::CollectiblesUnlocked,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Stat::HighScore => "high_score",
            Stat::HighestBoard => "highest_board",
            Stat::CubesCracked => "cubes_cracked",
            Stat::LongestCombo => "longest_combo",
            Stat::HelpersUsed => "helpers_used",
            Stat::TimePlayed => "time_played",
            Stat::CollectiblesUnlocked => "collectibles_unlocked",
        }
    }

    pub fn from_key(key: &str) -> Option<Stat> {
        Stat::ALL.iter().copied().find(|s| s.key() == key)
    }
}

/// Increment/update side of the stats collaborator.
pub trait StatsSink {
    fn increment(&mut self, stat: Stat, by: u64);
    /// Raise `stat` to `value` if it is higher than what is stored.
    fn update_max(&mut self, stat: Stat, value: u64);
    fn get(&self, stat: Stat) -> u64;
}

// ══════════════════════════════════════════════════════════════
// In-memory
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryStats {
    values: BTreeMap<Stat, u64>,
}

impl StatsSink for MemoryStats {
    fn increment(&mut self, stat: Stat, by: u64) {
        let v = self.values.entry(stat).or_insert(0);
        *v = v.saturating_add(by);
    }

    fn update_max(&mut self, stat: Stat, value: u64) {
        let v = self.values.entry(stat).or_insert(0);
        *v = (*v).max(value);
    }

    fn get(&self, stat: Stat) -> u64 {
        self.values.get(&stat).copied().unwrap_or(0)
    }
}

// ══════════════════════════════════════════════════════════════
// File-backed
// ══════════════════════════════════════════════════════════════

/// Stats persisted to a key-value file, written through on every change.
#[derive(Debug)]
pub struct FileStats {
    path: PathBuf,
    values: MemoryStats,
}

impl FileStats {
    /// Open (or start) the stats file at `path`. A missing file is an
    /// empty record; a read failure is logged and treated the same.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryStats::default(),
            Err(e) => {
                warn!("could not read stats {}: {e}", path.display());
                MemoryStats::default()
            }
        };
        FileStats { path, values }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<(), StatsError> {
        std::fs::write(&self.path, serialize(&self.values))
            .map_err(|source| StatsError::Io { path: self.path.clone(), source })
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!("{e}");
        }
    }
}

impl StatsSink for FileStats {
    fn increment(&mut self, stat: Stat, by: u64) {
        self.values.increment(stat, by);
        self.persist();
    }

    fn update_max(&mut self, stat: Stat, value: u64) {
        let before = self.values.get(stat);
        self.values.update_max(stat, value);
        if self.values.get(stat) != before {
            self.persist();
        }
    }

    fn get(&self, stat: Stat) -> u64 {
        self.values.get(stat)
    }
}

/// Where the stats file lives when the config gives a relative name:
/// next to the executable if writable, else `~/.local/share/mergecube`,
/// else the current directory.
pub fn default_stats_dir() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            let probe = parent.join(".write_test_mergecube");
            if std::fs::write(&probe, "").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return parent.to_path_buf();
            }
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/mergecube");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

// ── Serialization ──

fn serialize(stats: &MemoryStats) -> String {
    let mut out = String::with_capacity(256);
    for stat in Stat::ALL {
        out.push_str(&format!("{NAMESPACE}{}={}\n", stat.key(), stats.get(stat)));
    }
    out
}

fn parse(content: &str) -> MemoryStats {
    let mut stats = MemoryStats::default();
    for line in content.lines() {
        let Some(rest) = line.trim().strip_prefix(NAMESPACE) else { continue };
        let Some((key, val)) = rest.split_once('=') else { continue };
        let (Some(stat), Ok(v)) = (Stat::from_key(key.trim()), val.trim().parse::<u64>()) else {
            continue;
        };
        stats.values.insert(stat, v);
    }
    stats
}
