//! Level-end detection.
//!
//! ### State resolution (evaluated after every board mutation)
//! ┌──────────────────────────────────────────┬──────────────┐
//! │ Condition (priority order)                │ New status   │
//! ├──────────────────────────────────────────┼──────────────┤
//! │ current = Clean / Stuck                   │ unchanged    │
//! │ board is clean                            │ Clean        │
//! │ no merge possible and no wild on board    │ Stuck        │
//! │ otherwise                                 │ Playing      │
//! └──────────────────────────────────────────┴──────────────┘
//!
//! Terminal statuses are sticky until `reset()` (board rebuild), and the
//! level-end notification fires at most once in between.

use log::info;

use super::board::Board;
use super::event::{EndReason, LevelEnd};
use super::level::LevelState;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BoardStatus {
    Playing,
    Clean,
    Stuck,
}

impl BoardStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, BoardStatus::Playing)
    }
}

/// Status of a board, with no memory. See the table above.
pub fn classify(board: &Board) -> BoardStatus {
    if board.is_clean() {
        BoardStatus::Clean
    } else if !board.any_merge_possible() && !board.has_wild() {
        BoardStatus::Stuck
    } else {
        BoardStatus::Playing
    }
}

#[derive(Clone, Debug)]
pub struct LevelEndDetector {
    status: BoardStatus,
    fired: bool,
    clean_bonus: u32,
}

impl LevelEndDetector {
    pub fn new(clean_bonus: u32) -> Self {
        LevelEndDetector { status: BoardStatus::Playing, fired: false, clean_bonus }
    }

    pub fn status(&self) -> BoardStatus { self.status }
    pub fn has_fired(&self) -> bool { self.fired }

    /// Back to `Playing`. Only a board rebuild should call this.
    pub fn reset(&mut self) {
        self.status = BoardStatus::Playing;
        self.fired = false;
    }

    /// Re-check the board. Returns the level-end payload the first time a
    /// terminal status is reached; `None` on every other call.
    /// A clean board earns the clean bonus on `level.score` first.
    pub fn evaluate(&mut self, board: &Board, level: &mut LevelState) -> Option<LevelEnd> {
        if !self.status.is_terminal() {
            self.status = classify(board);
        }
        if !self.status.is_terminal() || self.fired {
            return None;
        }
        self.fired = true;

        let reason = match self.status {
            BoardStatus::Clean => {
                level.score = level.score.saturating_add(self.clean_bonus);
                EndReason::BoardClean
            }
            _ => EndReason::NoMoves,
        };
        info!(
            "level {} ended: {} (score={} moves={})",
            level.level, reason.as_str(), level.score, level.moves,
        );
        Some(LevelEnd { reason, score: level.score, level: level.level, moves: level.moves })
    }
}
