//! Events emitted by board operations.
//! The presentation layer consumes these for animation and sound.

use crate::domain::merge::MergeKind;
use crate::domain::tile::{Coord, Tile, TileId};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EndReason {
    BoardClean,
    NoMoves,
}

impl EndReason {
    pub fn as_str(self) -> &'static str {
        match self {
            EndReason::BoardClean => "board_clean",
            EndReason::NoMoves => "no_moves",
        }
    }
}

/// Payload of the level-end notification.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LevelEnd {
    pub reason: EndReason,
    pub score: u32,
    pub level: u32,
    pub moves: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    BoardRebuilt { rows: usize, cols: usize, opened: usize },
    TilesOpened { ids: Vec<TileId> },
    WildGranted { id: TileId },
    MergeComplete { tile: Tile, kind: MergeKind, points: u32 },
    CubeCracked { at: Coord },
    LevelEnd(LevelEnd),
    /// Half of the deal-in reveal has played. Cosmetic only.
    HalfRevealed,
    /// Half of the deal-in time has elapsed. Cosmetic only.
    RevealHalfTime,
}

/// Consumer of the events the presentation side cares about.
pub trait Presenter {
    fn on_half_revealed(&mut self) {}
    fn on_merge_complete(&mut self, _tile: &Tile) {}
    fn on_level_end(&mut self, _end: &LevelEnd) {}
}

/// Route events to a presenter. Events it has no hook for are skipped.
pub fn dispatch<P: Presenter + ?Sized>(events: &[GameEvent], presenter: &mut P) {
    for event in events {
        match event {
            GameEvent::HalfRevealed => presenter.on_half_revealed(),
            GameEvent::MergeComplete { tile, .. } => presenter.on_merge_complete(tile),
            GameEvent::LevelEnd(end) => presenter.on_level_end(end),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tile::TileId;

    #[derive(Default)]
    struct Log(Vec<&'static str>);

    impl Presenter for Log {
        fn on_half_revealed(&mut self) { self.0.push("half"); }
        fn on_merge_complete(&mut self, _tile: &Tile) { self.0.push("merge"); }
        fn on_level_end(&mut self, end: &LevelEnd) { self.0.push(end.reason.as_str()); }
    }

    #[test]
    fn dispatch_routes_presenter_events_only() {
        let tile = Tile::ghost(TileId(1), Coord::new(0, 0));
        let events = vec![
            GameEvent::BoardRebuilt { rows: 2, cols: 2, opened: 2 },
            GameEvent::HalfRevealed,
            GameEvent::RevealHalfTime,
            GameEvent::MergeComplete { tile, kind: MergeKind::Sum, points: 3 },
            GameEvent::LevelEnd(LevelEnd { reason: EndReason::NoMoves, score: 0, level: 1, moves: 2 }),
        ];
        let mut log = Log::default();
        dispatch(&events, &mut log);
        assert_eq!(log.0, vec!["half", "merge", "no_moves"]);
    }
}
