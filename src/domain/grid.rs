//! Cell matrix: which tile (if any) occupies each (col, row).
//!
//! The grid only stores identities. Tile data lives in the board's
//! tile collection, and `Board` keeps the two in sync.

use super::tile::{Coord, TileId};

#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    rows: usize,
    cols: usize,
    /// Row-major: `cells[row * cols + col]`.
    cells: Vec<Option<TileId>>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Grid { rows, cols, cells: vec![None; rows * cols] }
    }

    pub fn rows(&self) -> usize { self.rows }
    pub fn cols(&self) -> usize { self.cols }
    pub fn len(&self) -> usize { self.cells.len() }
    pub fn is_empty(&self) -> bool { self.cells.is_empty() }

    #[inline]
    pub fn in_bounds(&self, at: Coord) -> bool {
        at.col < self.cols && at.row < self.rows
    }

    #[inline]
    pub fn index_of(&self, at: Coord) -> Option<usize> {
        if self.in_bounds(at) { Some(at.row * self.cols + at.col) } else { None }
    }

    #[inline]
    pub fn coord_of(&self, index: usize) -> Coord {
        Coord::new(index % self.cols, index / self.cols)
    }

    /// Occupant at `at`. Out of bounds reads as empty.
    pub fn get(&self, at: Coord) -> Option<TileId> {
        self.index_of(at).and_then(|i| self.cells[i])
    }

    /// Put `id` into the cell, returning the previous occupant.
    pub fn set(&mut self, at: Coord, id: TileId) -> Option<TileId> {
        let i = self.index_of(at)?;
        self.cells[i].replace(id)
    }

    pub fn clear(&mut self, at: Coord) -> Option<TileId> {
        let i = self.index_of(at)?;
        self.cells[i].take()
    }

    pub fn clear_all(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    /// All coordinates in row-major order.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.cells.len()).map(move |i| self.coord_of(i))
    }

    /// Occupied cells as (coord, id), row-major.
    pub fn occupied(&self) -> impl Iterator<Item = (Coord, TileId)> + '_ {
        self.cells.iter().enumerate()
            .filter_map(move |(i, c)| c.map(|id| (self.coord_of(i), id)))
    }
}
