//! Drag interaction: turns a continuous pointer gesture into a single
//! merge request.
//!
//! Sessions are exclusive. `begin` while a session is live is rejected,
//! never queued. The overlap between the dragged tile and a hovered cell
//! is folded into one `can_drop` flag here, so the merge rules never see
//! geometry.
//!
//! ```text
//!   begin(tile) ──► hover(target, overlap)* ──► release ──► Merged | Declined
//!                                          └──► cancel
//! ```

use log::debug;

use crate::domain::merge;
use crate::domain::tile::{Coord, TileId};
use super::board::Board;
use super::controller::{BoardController, MergeOutcome};
use super::level::LevelState;

/// Minimum overlap fraction (0..1) for a hover to count as a drop target.
pub const SNAP_OVERLAP: f32 = 0.35;

#[derive(thiserror::Error, Clone, Copy, PartialEq, Eq, Debug)]
pub enum DragError {
    #[error("a drag session is already active")]
    SessionActive,
    #[error("tile cannot be dragged")]
    NotDraggable,
    #[error("no drag session is active")]
    NoSession,
    #[error("input is locked")]
    InputLocked,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DragSession {
    pub tile: TileId,
    pub origin: Coord,
    pub target: Option<TileId>,
    pub can_drop: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum DropOutcome {
    Merged(MergeOutcome),
    /// Dragged tile snaps back to `origin`.
    Declined { tile: TileId, origin: Coord },
}

#[derive(Clone, Debug)]
pub struct DragController {
    session: Option<DragSession>,
    enabled: bool,
    snap_overlap: f32,
}

impl Default for DragController {
    fn default() -> Self {
        DragController { session: None, enabled: true, snap_overlap: SNAP_OVERLAP }
    }
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_snap_overlap(snap_overlap: f32) -> Self {
        DragController { snap_overlap: snap_overlap.clamp(0.0, 1.0), ..Self::default() }
    }

    pub fn session(&self) -> Option<&DragSession> { self.session.as_ref() }
    pub fn is_dragging(&self) -> bool { self.session.is_some() }
    pub fn is_enabled(&self) -> bool { self.enabled }

    /// Lock or unlock input. Locking drops any live session.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.session = None;
        }
    }

    pub fn begin(&mut self, board: &Board, tile: TileId) -> Result<&DragSession, DragError> {
        if !self.enabled { return Err(DragError::InputLocked); }
        if self.session.is_some() { return Err(DragError::SessionActive); }
        let t = board.tile(tile).filter(|t| t.is_active()).ok_or(DragError::NotDraggable)?;

        debug!("drag begin {:?} at {:?}", tile, t.pos);
        let session = self.session.insert(DragSession { tile, origin: t.pos, target: None, can_drop: false });
        Ok(&*session)
    }

    /// Update the hovered cell. Returns whether releasing now would merge.
    pub fn hover(
        &mut self,
        board: &Board,
        target: Option<TileId>,
        overlap: f32,
    ) -> Result<bool, DragError> {
        let session = self.session.as_mut().ok_or(DragError::NoSession)?;
        let target = target.filter(|&id| id != session.tile);
        let can_drop = overlap >= self.snap_overlap
            && match (board.tile(session.tile), target) {
                (Some(src), Some(dst)) => merge::can_merge(src, board.tile(dst)),
                _ => false,
            };
        session.target = target;
        session.can_drop = can_drop;
        Ok(can_drop)
    }

    /// End the gesture. Merges if the last hover allowed it.
    pub fn release(
        &mut self,
        ctl: &mut BoardController,
        level: &mut LevelState,
    ) -> Result<DropOutcome, DragError> {
        let session = self.session.take().ok_or(DragError::NoSession)?;
        let declined = DropOutcome::Declined { tile: session.tile, origin: session.origin };
        let Some(target) = session.target.filter(|_| session.can_drop) else {
            return Ok(declined);
        };

        match ctl.merge(session.tile, target, level) {
            Ok(outcome) => Ok(DropOutcome::Merged(outcome)),
            Err(e) => {
                debug!("drop declined: {e}");
                Ok(declined)
            }
        }
    }

    pub fn cancel(&mut self) -> Option<DragSession> {
        self.session.take()
    }
}
