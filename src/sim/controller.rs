//! Board controller: every mutation of a board goes through here.
//!
//! Operations:
//!   - `rebuild`            fresh board: all ghosts, ~40% opened
//!   - `merge`              drop one tile onto another
//!   - `open_locked_tiles`  helper: open k random ghosts
//!   - `grant_wild`         helper: open one ghost as a wild tile
//!
//! Each operation finishes all logical state changes before returning,
//! then re-evaluates the level-end detector. Any deal-in animation is
//! the front-end's concern and never gates a query.
//!
//! The controller takes `&mut self` for every mutation, so a board has a
//! single writer by construction. A multi-threaded host wraps the whole
//! controller in one `Mutex`.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::domain::merge::{self, MergeError, MergeKind, MergeResult, MergeRules};
use crate::domain::spawn::{SpawnConfig, SpawnSelector};
use crate::domain::tile::{Coord, Special, Tile, TileId};
use super::board::Board;
use super::detector::{BoardStatus, LevelEndDetector};
use super::event::GameEvent;
use super::hooks::Hooks;
use super::level::LevelState;
use super::stats::{Stat, StatsSink};

/// Board shape and the rules that act on it.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardSettings {
    pub rows: usize,
    pub cols: usize,
    /// Share of cells opened on rebuild.
    pub open_ratio: f64,
    pub rules: MergeRules,
    pub clean_bonus: u32,
}

impl Default for BoardSettings {
    fn default() -> Self {
        BoardSettings {
            rows: 6,
            cols: 5,
            open_ratio: 0.40,
            rules: MergeRules::default(),
            clean_bonus: 100,
        }
    }
}

impl BoardSettings {
    /// `max(1, round(rows * cols * open_ratio))`, capped at the cell count.
    pub fn open_count(&self) -> usize {
        let cells = self.rows * self.cols;
        let n = ((cells as f64) * self.open_ratio).round() as usize;
        n.max(1).min(cells)
    }
}

/// Result of a successful merge.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeOutcome {
    pub result: MergeResult,
    /// Tile now occupying the destination cell (a ghost after a crack).
    pub tile: TileId,
    pub events: Vec<GameEvent>,
}

pub struct BoardController {
    board: Board,
    settings: BoardSettings,
    spawner: SpawnSelector,
    detector: LevelEndDetector,
    hooks: Hooks,
    rng: StdRng,
}

// ── Construction / access ──

impl BoardController {
    /// A controller with an empty grid. Call `rebuild` before play.
    pub fn new(settings: BoardSettings, spawn: SpawnConfig, seed: u64, hooks: Hooks) -> Self {
        BoardController {
            board: Board::new(settings.rows, settings.cols),
            spawner: SpawnSelector::new(spawn, seed),
            detector: LevelEndDetector::new(settings.clean_bonus),
            settings,
            hooks,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn board(&self) -> &Board { &self.board }
    pub fn settings(&self) -> &BoardSettings { &self.settings }
    pub fn spawner(&self) -> &SpawnSelector { &self.spawner }
    pub fn status(&self) -> BoardStatus { self.detector.status() }
    pub fn stats(&self) -> &dyn StatsSink { self.hooks.stats.as_ref() }
    pub fn stats_mut(&mut self) -> &mut dyn StatsSink { self.hooks.stats.as_mut() }

    pub fn is_board_clean(&self) -> bool {
        self.board.is_clean()
    }

    /// Swap in a hand-built board with a fresh detector.
    #[cfg(test)]
    pub(crate) fn replace_board(&mut self, board: Board) {
        self.board = board;
        self.detector.reset();
    }
}

// ══════════════════════════════════════════════════════════════
// Rebuild
// ══════════════════════════════════════════════════════════════

impl BoardController {
    pub fn rebuild(&mut self, level: &mut LevelState) -> Vec<GameEvent> {
        for tile in self.board.clear() {
            self.hooks.tiles.destroy(tile.handle);
        }
        self.board = Board::new(self.settings.rows, self.settings.cols);
        self.spawner.reset(self.rng.gen());
        self.detector.reset();

        let coords: Vec<Coord> = self.board.grid().coords().collect();
        let mut ids = Vec::with_capacity(coords.len());
        for &at in &coords {
            ids.push(self.place_ghost(at));
        }

        let open = self.settings.open_count().min(ids.len());
        ids.shuffle(&mut self.rng);
        for &id in &ids[..open] {
            let value = self.spawner.next_value(&self.board.active_values(), level.moves, level.score);
            self.open_tile(id, value, None);
        }
        info!(
            "board {} rebuilt: {}x{}, {} open",
            level.board, self.settings.rows, self.settings.cols, open,
        );

        let mut events = vec![GameEvent::BoardRebuilt {
            rows: self.settings.rows,
            cols: self.settings.cols,
            opened: open,
        }];
        self.check_level_end(level, &mut events);
        events
    }
}

// ══════════════════════════════════════════════════════════════
// Merge
// ══════════════════════════════════════════════════════════════

impl BoardController {
    /// Is dropping `src` on `dst` legal right now?
    pub fn can_merge(&self, src: TileId, dst: TileId) -> bool {
        match self.board.tile(src) {
            Some(s) => merge::can_merge(s, self.board.tile(dst)),
            None => false,
        }
    }

    /// Merge `src` into `dst`. On refusal nothing changes.
    ///
    /// Both tiles are destroyed. The source cell becomes a ghost; the
    /// destination cell receives the result (a ghost too if the cube
    /// cracked). One move and the merge points are recorded on `level`.
    /// A wild merge opens one ghost, never with the value just made.
    pub fn merge(
        &mut self,
        src: TileId,
        dst: TileId,
        level: &mut LevelState,
    ) -> Result<MergeOutcome, MergeError> {
        let s = self.board.tile(src).ok_or(MergeError::MissingTile)?.clone();
        let d = self.board.tile(dst).ok_or(MergeError::MissingTile)?.clone();
        let result = merge::resolve_merge(&s, &d, &self.settings.rules)?;

        self.destroy_tile(src);
        self.destroy_tile(dst);
        self.place_ghost(s.pos);

        let mut events = Vec::new();
        let result_id = if result.cracks() {
            self.hooks.stats.increment(Stat::CubesCracked, 1);
            events.push(GameEvent::CubeCracked { at: d.pos });
            self.place_ghost(d.pos)
        } else {
            self.place_result(d.pos, &result)
        };

        if result.kind == MergeKind::Stack {
            self.hooks.stats.update_max(Stat::LongestCombo, result.stack as u64);
        }
        level.record_move(result.points);
        debug!("merge {:?} at {:?} -> {:?}", result.kind, d.pos, result);

        if let Some(tile) = self.board.tile(result_id) {
            events.push(GameEvent::MergeComplete {
                tile: tile.clone(),
                kind: result.kind,
                points: result.points,
            });
        }

        if result.kind == MergeKind::Wild {
            let opened = self.open_ghosts(1, Some(result.value), level);
            if !opened.is_empty() {
                events.push(GameEvent::TilesOpened { ids: opened });
            }
        }

        self.check_level_end(level, &mut events);
        Ok(MergeOutcome { result, tile: result_id, events })
    }
}

// ══════════════════════════════════════════════════════════════
// Helpers (player-facing)
// ══════════════════════════════════════════════════════════════

impl BoardController {
    /// Open up to `k` random ghosts with fresh spawn values.
    /// `exclude` keeps a just-consumed value from reappearing.
    pub fn open_locked_tiles(
        &mut self,
        k: usize,
        exclude: Option<u8>,
        level: &mut LevelState,
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let opened = self.open_ghosts(k, exclude, level);
        if !opened.is_empty() {
            self.hooks.stats.increment(Stat::HelpersUsed, 1);
            events.push(GameEvent::TilesOpened { ids: opened });
        }
        self.check_level_end(level, &mut events);
        events
    }

    /// Open one random ghost as a wild tile.
    pub fn grant_wild(&mut self, level: &mut LevelState) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let mut ghosts = self.board.ghost_ids();
        ghosts.shuffle(&mut self.rng);
        if let Some(&id) = ghosts.first() {
            self.open_tile(id, self.settings.rules.wild_target, Some(Special::Wild));
            self.hooks.stats.increment(Stat::HelpersUsed, 1);
            events.push(GameEvent::WildGranted { id });
        }
        self.check_level_end(level, &mut events);
        events
    }
}

// ── Internals ──

impl BoardController {
    fn check_level_end(&mut self, level: &mut LevelState, events: &mut Vec<GameEvent>) {
        if let Some(end) = self.detector.evaluate(&self.board, level) {
            events.push(GameEvent::LevelEnd(end));
        }
    }

    fn open_ghosts(&mut self, k: usize, exclude: Option<u8>, level: &LevelState) -> Vec<TileId> {
        let mut ghosts = self.board.ghost_ids();
        ghosts.shuffle(&mut self.rng);
        ghosts.truncate(k);
        for &id in &ghosts {
            let value = self.spawner.next_value_excluding(
                &self.board.active_values(), level.moves, level.score, exclude,
            );
            self.open_tile(id, value, None);
        }
        ghosts
    }

    fn place_ghost(&mut self, at: Coord) -> TileId {
        let mut tile = Tile::ghost(TileId(0), at);
        tile.handle = self.hooks.tiles.create(at, 0, true);
        self.board.insert(tile).0
    }

    fn place_result(&mut self, at: Coord, result: &MergeResult) -> TileId {
        let mut tile = Tile::ghost(TileId(0), at);
        tile.unlock(result.value);
        tile.stack = result.stack;
        tile.handle = self.hooks.tiles.create(at, result.value, false);
        let handle = tile.handle;
        let id = self.board.insert(tile).0;
        self.hooks.drag.bind_draggable(handle);
        id
    }

    fn destroy_tile(&mut self, id: TileId) {
        if let Some(tile) = self.board.remove(id) {
            self.hooks.tiles.destroy(tile.handle);
        }
    }

    /// Ghost → active. The tile keeps its id and cell; its visual is
    /// destroyed and a fresh active one created.
    fn open_tile(&mut self, id: TileId, value: u8, special: Option<Special>) {
        let Some((at, ghost_handle)) = self.board.tile(id).map(|t| (t.pos, t.handle)) else {
            return;
        };
        self.hooks.tiles.destroy(ghost_handle);
        let handle = self.hooks.tiles.create(at, value, false);
        self.board.update(id, |t| {
            t.unlock(value);
            t.special = special;
            t.handle = handle;
        });
        self.hooks.drag.bind_draggable(handle);
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
