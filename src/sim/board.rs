//! Board: the grid plus every live tile, kept in lockstep.
//!
//! ## Consistency
//!
//! Two views of the same state:
//!   - `grid`:  cell → tile id
//!   - `tiles`: tile id → tile (which records its own cell)
//!
//! All mutations go through `insert()` / `remove()` / `clear()`, which
//! update both sides. `is_consistent()` checks the bidirectional link
//! and is asserted throughout the tests.

use std::collections::BTreeMap;

use crate::domain::grid::Grid;
use crate::domain::merge;
use crate::domain::tile::{Coord, Tile, TileId};

#[derive(Clone, Debug)]
pub struct Board {
    grid: Grid,
    tiles: BTreeMap<TileId, Tile>,
    next_id: u32,
}

// ── Queries ──

impl Board {
    pub fn new(rows: usize, cols: usize) -> Self {
        Board { grid: Grid::new(rows, cols), tiles: BTreeMap::new(), next_id: 1 }
    }

    pub fn rows(&self) -> usize { self.grid.rows() }
    pub fn cols(&self) -> usize { self.grid.cols() }
    pub fn grid(&self) -> &Grid { &self.grid }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(&id)
    }

    pub fn tile_at(&self, at: Coord) -> Option<&Tile> {
        self.grid.get(at).and_then(|id| self.tiles.get(&id))
    }

    /// Every live tile, by id.
    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values()
    }

    pub fn active_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.values().filter(|t| t.is_active())
    }

    pub fn active_values(&self) -> Vec<u8> {
        self.active_tiles().map(|t| t.value).collect()
    }

    /// Locked placeholders that can be opened.
    pub fn ghost_ids(&self) -> Vec<TileId> {
        self.tiles.values().filter(|t| t.is_ghost()).map(|t| t.id).collect()
    }

    pub fn has_wild(&self) -> bool {
        self.active_tiles().any(|t| t.is_wild())
    }

    /// No unlocked tile holds a positive value.
    pub fn is_clean(&self) -> bool {
        self.tiles.values().all(|t| t.locked || t.value == 0)
    }

    /// Does some pair of active tiles merge?
    pub fn any_merge_possible(&self) -> bool {
        any_merge_possible(self.active_tiles())
    }

    /// Every occupied cell points at a tile that records that cell,
    /// and every tile sits in the cell it records.
    pub fn is_consistent(&self) -> bool {
        let grid_ok = self.grid.occupied()
            .all(|(at, id)| self.tiles.get(&id).map_or(false, |t| t.pos == at));
        let tiles_ok = self.tiles.values()
            .all(|t| self.grid.get(t.pos) == Some(t.id));
        grid_ok && tiles_ok
    }
}

// ── Mutation ──

impl Board {
    /// Place `tile` at `tile.pos` under a fresh id. Whatever occupied the
    /// cell is evicted and returned.
    pub(crate) fn insert(&mut self, mut tile: Tile) -> (TileId, Option<Tile>) {
        let id = TileId(self.next_id);
        self.next_id += 1;
        tile.id = id;
        let evicted = self.grid.set(tile.pos, id).and_then(|old| self.tiles.remove(&old));
        self.tiles.insert(id, tile);
        (id, evicted)
    }

    pub(crate) fn remove(&mut self, id: TileId) -> Option<Tile> {
        let tile = self.tiles.remove(&id)?;
        if self.grid.get(tile.pos) == Some(id) {
            self.grid.clear(tile.pos);
        }
        Some(tile)
    }

    /// Mutate a tile in place. Position changes are not allowed here.
    pub(crate) fn update<F: FnOnce(&mut Tile)>(&mut self, id: TileId, f: F) -> Option<&Tile> {
        let tile = self.tiles.get_mut(&id)?;
        let pos = tile.pos;
        f(tile);
        tile.pos = pos;
        Some(&*tile)
    }

    /// Drop every tile, returning them.
    pub(crate) fn clear(&mut self) -> Vec<Tile> {
        self.grid.clear_all();
        std::mem::take(&mut self.tiles).into_values().collect()
    }
}

/// True iff two active tiles can merge, or a wild tile sits alongside
/// any other active tile.
pub fn any_merge_possible<'a, I>(tiles: I) -> bool
where
    I: IntoIterator<Item = &'a Tile>,
{
    let active: Vec<&Tile> = tiles.into_iter().filter(|t| t.is_active()).collect();
    if active.len() < 2 {
        return false;
    }
    if active.iter().any(|t| t.is_wild()) {
        return true;
    }
    active.iter().enumerate().any(|(i, a)| {
        active[i + 1..].iter().any(|b| merge::can_merge(a, Some(b)))
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::tile::Special;

    /// Build a board from a diagram. Legend:
    ///   '.' = ghost   '1'..'6' = active tile   'W' = wild (value 3)
    ///   ' ' = empty cell
    pub(crate) fn board_from(rows: &[&str]) -> Board {
        let height = rows.len();
        let width = rows[0].len();
        let mut b = Board::new(height, width);
        for (row, line) in rows.iter().enumerate() {
            for (col, ch) in line.chars().enumerate() {
                let mut t = Tile::ghost(TileId(0), Coord::new(col, row));
                match ch {
                    '.' => {}
                    '1'..='6' => t.unlock(ch as u8 - b'0'),
                    'W' => {
                        t.unlock(3);
                        t.special = Some(Special::Wild);
                    }
                    _ => continue,
                }
                b.insert(t);
            }
        }
        b
    }

    #[test]
    fn insert_and_remove_stay_consistent() {
        let mut b = Board::new(2, 3);
        let (id, evicted) = b.insert(Tile::ghost(TileId(0), Coord::new(1, 1)));
        assert!(evicted.is_none());
        assert!(b.is_consistent());
        assert_eq!(b.tile_at(Coord::new(1, 1)).map(|t| t.id), Some(id));

        let (id2, evicted) = b.insert(Tile::ghost(TileId(0), Coord::new(1, 1)));
        assert_eq!(evicted.map(|t| t.id), Some(id));
        assert!(b.is_consistent());

        assert!(b.remove(id2).is_some());
        assert!(b.tile_at(Coord::new(1, 1)).is_none());
        assert!(b.is_consistent());
    }

    #[test]
    fn update_cannot_move_tiles() {
        let mut b = board_from(&["2."]);
        let id = b.tile_at(Coord::new(0, 0)).unwrap().id;
        b.update(id, |t| {
            t.value = 4;
            t.pos = Coord::new(1, 0);
        });
        assert_eq!(b.tile_at(Coord::new(0, 0)).unwrap().value, 4);
        assert!(b.is_consistent());
    }

    #[test]
    fn clean_means_no_active_values() {
        assert!(board_from(&["..", ".."]).is_clean());
        assert!(!board_from(&["..", ".4"]).is_clean());
    }

    #[test]
    fn clear_empties_both_views() {
        let mut b = board_from(&["12", ".3"]);
        assert_eq!(b.clear().len(), 4);
        assert_eq!(b.tiles().count(), 0);
        assert_eq!(b.grid().occupied().count(), 0);
    }

    #[test]
    fn merge_possible_for_sum_pair() {
        assert!(board_from(&["2.", ".3"]).any_merge_possible());
    }

    #[test]
    fn no_merge_for_high_unequal_pair() {
        assert!(!board_from(&["4.", ".5"]).any_merge_possible());
    }

    #[test]
    fn wild_keeps_board_alive() {
        assert!(board_from(&["4W", ".5"]).any_merge_possible());
        // A lone wild has nothing to merge with.
        assert!(!board_from(&["W.", ".."]).any_merge_possible());
    }

    #[test]
    fn ghosts_never_count() {
        assert!(!board_from(&["4.", "..", ".."]).any_merge_possible());
    }
}
