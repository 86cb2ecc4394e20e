//! Collaborators the board controller calls out to.
//!
//! The core owns tile *state*. Everything visual (sprites, DOM nodes,
//! terminal cells) hangs off a `TileHandle` minted by the factory.

use crate::domain::tile::{Coord, TileHandle};
use super::stats::{MemoryStats, StatsSink};

/// Creates and destroys the visual side of tiles.
///
/// Every state change swaps visuals: a ghost that opens has its handle
/// destroyed and a new unlocked one created in the same cell.
pub trait TileFactory {
    fn create(&mut self, at: Coord, value: u8, locked: bool) -> TileHandle;
    fn destroy(&mut self, handle: TileHandle);
}

/// Registers tiles as interactive.
pub trait DragBinding {
    fn bind_draggable(&mut self, handle: TileHandle);
}

/// Factory that only mints sequential handles.
#[derive(Debug, Default)]
pub struct HandleFactory {
    next: u64,
    live: usize,
}

impl HandleFactory {
    pub fn live(&self) -> usize { self.live }
}

impl TileFactory for HandleFactory {
    fn create(&mut self, _at: Coord, _value: u8, _locked: bool) -> TileHandle {
        self.next += 1;
        self.live += 1;
        TileHandle(self.next)
    }

    fn destroy(&mut self, _handle: TileHandle) {
        self.live = self.live.saturating_sub(1);
    }
}

/// Binding for front-ends that read draggability straight off the board.
#[derive(Debug, Default)]
pub struct NoBinding;

impl DragBinding for NoBinding {
    fn bind_draggable(&mut self, _handle: TileHandle) {}
}

/// Everything the controller talks to, boxed so front-ends can mix and match.
pub struct Hooks {
    pub tiles: Box<dyn TileFactory>,
    pub drag: Box<dyn DragBinding>,
    pub stats: Box<dyn StatsSink>,
}

impl Default for Hooks {
    fn default() -> Self {
        Hooks {
            tiles: Box::new(HandleFactory::default()),
            drag: Box::new(NoBinding),
            stats: Box::new(MemoryStats::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_factory_counts_live_handles() {
        let mut f = HandleFactory::default();
        let a = f.create(Coord::new(0, 0), 0, true);
        let b = f.create(Coord::new(1, 0), 3, false);
        assert_ne!(a, b);
        assert_eq!(f.live(), 2);
        f.destroy(a);
        assert_eq!(f.live(), 1);
        f.destroy(b);
        f.destroy(b);
        assert_eq!(f.live(), 0);
    }
}
