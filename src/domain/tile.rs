//! Tile model and its properties.
//! Properties are queried via methods, not stored as flags,
//! so tile semantics are centralized here.

/// Highest value a sum-cap merge may produce.
pub const MAX_VALUE: u8 = 6;
/// Highest value the spawn selector hands out.
pub const MAX_SPAWN: u8 = 5;
/// Stack (combo) depth is capped here.
pub const MAX_STACK: u8 = 4;

/// Stable identity of a tile within one board.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TileId(pub u32);

/// Opaque handle returned by the tile factory for the visual side.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub struct TileHandle(pub u64);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Coord {
    pub col: usize,
    pub row: usize,
}

impl Coord {
    pub fn new(col: usize, row: usize) -> Self {
        Coord { col, row }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Special {
    /// Merges with anything unlocked.
    Wild,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    pub id: TileId,
    pub handle: TileHandle,
    pub pos: Coord,
    /// 0 = empty/consumed, 1..=6 while in play.
    pub value: u8,
    pub locked: bool,
    /// Combo counter, 1..=MAX_STACK.
    pub stack: u8,
    pub special: Option<Special>,
}

impl Tile {
    /// A locked placeholder for an unopened or cleared cell.
    pub fn ghost(id: TileId, pos: Coord) -> Self {
        Tile {
            id,
            handle: TileHandle::default(),
            pos,
            value: 0,
            locked: true,
            stack: 1,
            special: None,
        }
    }

    /// Locked with no value: purely a placeholder.
    pub fn is_ghost(&self) -> bool {
        self.locked && self.value == 0
    }

    /// Takes part in play: unlocked and holding a value.
    /// Wild tiles always carry a value, so this covers them too.
    pub fn is_active(&self) -> bool {
        !self.locked && self.value > 0
    }

    /// Locked or valueless; ignored by every rule.
    pub fn is_inert(&self) -> bool {
        !self.is_active()
    }

    pub fn is_wild(&self) -> bool {
        matches!(self.special, Some(Special::Wild))
    }

    /// Turn a ghost into a playable tile.
    pub fn unlock(&mut self, value: u8) {
        self.locked = false;
        self.value = value;
        self.stack = 1;
        self.special = None;
    }

    /// Return the tile to the ghost state (cleared cell).
    pub fn consume(&mut self) {
        self.locked = true;
        self.value = 0;
        self.stack = 1;
        self.special = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ghost_is_inert() {
        let t = Tile::ghost(TileId(1), Coord::new(0, 0));
        assert!(t.is_ghost());
        assert!(t.is_inert());
        assert!(!t.is_active());
    }

    #[test]
    fn unlock_then_consume() {
        let mut t = Tile::ghost(TileId(1), Coord::new(2, 1));
        t.unlock(4);
        assert!(t.is_active());
        assert_eq!(t.value, 4);
        t.consume();
        assert!(t.is_ghost());
    }

    #[test]
    fn unlocked_zero_value_is_inert() {
        let mut t = Tile::ghost(TileId(1), Coord::new(0, 0));
        t.locked = false;
        assert!(t.is_inert());
    }

    #[test]
    fn wild_without_value_stays_inert() {
        let mut t = Tile::ghost(TileId(1), Coord::new(0, 0));
        t.locked = false;
        t.special = Some(Special::Wild);
        assert!(t.is_inert());
    }
}
