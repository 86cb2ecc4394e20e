//! Level flow: what happens between a level end and the next board.
//!
//! ```text
//!   lock input, hide grid
//!     1. celebrate       (clean boards only)
//!     2. present reward
//!     3. rate            → Continue | Restart | Quit
//!   unlock input, show grid        ← always, via InputLock::drop
//!     4. decide transition
//! ```
//!
//! ## Transition table
//! ┌──────────┬────────┬─────────┬───────────────────────────────┐
//! │ Action   │ Mode   │ Rating  │ Transition                    │
//! ├──────────┼────────┼─────────┼───────────────────────────────┤
//! │ Quit     │ any    │ any     │ Quit                          │
//! │ Restart  │ Normal │ any     │ Retry (score reset)           │
//! │ Restart  │ Endless│ any     │ Retry (score kept)            │
//! │ Continue │ any    │ pass    │ Advance to level + 1          │
//! │ Continue │ Normal │ fail    │ Retry (score reset)           │
//! │ Continue │ Endless│ fail    │ Retry (score kept)            │
//! │ step err │ any    │ any     │ Advance to level + 1          │
//! └──────────┴────────┴─────────┴───────────────────────────────┘

use std::ops::{Deref, DerefMut};

use log::{info, warn};

use super::event::{EndReason, LevelEnd};
use super::level::{rate, GameMode, Rating, ScoringConfig, Transition};
use super::stats::{Stat, StatsSink};

#[derive(thiserror::Error, Clone, Debug, PartialEq, Eq)]
pub enum FlowError {
    #[error("flow step failed: {0}")]
    Step(String),
    #[error("flow aborted by host")]
    Aborted,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RatingAction {
    Continue,
    Restart,
    Quit,
}

/// A mystery prize handed out after a level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reward {
    pub name: String,
}

/// The front-end side of the level flow. Each step returns once its
/// presentation has finished.
pub trait FlowHost {
    fn set_input_locked(&mut self, locked: bool);
    fn set_grid_visible(&mut self, visible: bool);
    fn celebrate(&mut self, end: &LevelEnd) -> Result<(), FlowError>;
    fn present_reward(&mut self, end: &LevelEnd) -> Result<Option<Reward>, FlowError>;
    fn rate(&mut self, end: &LevelEnd, rating: &Rating) -> Result<RatingAction, FlowError>;
}

// ── Input lock ──

/// Holds the host's input locked and its grid hidden until dropped.
/// Dropping also happens during unwinding, so a panicking step still
/// hands control back to the player.
pub struct InputLock<'a, H: FlowHost + ?Sized> {
    host: &'a mut H,
}

impl<'a, H: FlowHost + ?Sized> InputLock<'a, H> {
    pub fn acquire(host: &'a mut H) -> Self {
        host.set_input_locked(true);
        host.set_grid_visible(false);
        InputLock { host }
    }
}

impl<H: FlowHost + ?Sized> Drop for InputLock<'_, H> {
    fn drop(&mut self) {
        self.host.set_grid_visible(true);
        self.host.set_input_locked(false);
    }
}

impl<H: FlowHost + ?Sized> Deref for InputLock<'_, H> {
    type Target = H;
    fn deref(&self) -> &H { self.host }
}

impl<H: FlowHost + ?Sized> DerefMut for InputLock<'_, H> {
    fn deref_mut(&mut self) -> &mut H { self.host }
}

// ══════════════════════════════════════════════════════════════
// Orchestrator
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct FlowOutcome {
    pub transition: Transition,
    pub rating: Rating,
    pub reward: Option<Reward>,
    /// A step failed and the default advance was used.
    pub recovered: bool,
}

#[derive(Clone, Debug)]
pub struct LevelFlow {
    pub mode: GameMode,
    pub scoring: ScoringConfig,
}

impl LevelFlow {
    pub fn new(mode: GameMode, scoring: ScoringConfig) -> Self {
        LevelFlow { mode, scoring }
    }

    /// Run the post-level sequence once. Never fails: a failing step is
    /// logged and the game advances to the next level.
    pub fn run<H: FlowHost + ?Sized>(
        &self,
        host: &mut H,
        end: &LevelEnd,
        stats: &mut dyn StatsSink,
    ) -> FlowOutcome {
        let rating = rate(end.score, end.level, &self.scoring);
        stats.update_max(Stat::HighScore, end.score as u64);
        stats.update_max(Stat::HighestBoard, end.level as u64);

        let steps = {
            let mut lock = InputLock::acquire(host);
            self.steps(&mut *lock, end, &rating)
        };

        let outcome = match steps {
            Ok((reward, action)) => {
                if reward.is_some() {
                    stats.increment(Stat::CollectiblesUnlocked, 1);
                }
                FlowOutcome {
                    transition: self.decide(action, rating.passed, end.level),
                    rating,
                    reward,
                    recovered: false,
                }
            }
            Err(e) => {
                warn!("level flow failed at level {}: {e}; advancing", end.level);
                FlowOutcome {
                    transition: Transition::Advance { level: end.level + 1 },
                    rating,
                    reward: None,
                    recovered: true,
                }
            }
        };
        info!(
            "level {} rated {} stars -> {:?}",
            end.level, outcome.rating.stars, outcome.transition,
        );
        outcome
    }

    fn steps<H: FlowHost + ?Sized>(
        &self,
        host: &mut H,
        end: &LevelEnd,
        rating: &Rating,
    ) -> Result<(Option<Reward>, RatingAction), FlowError> {
        if end.reason == EndReason::BoardClean {
            host.celebrate(end)?;
        }
        let reward = host.present_reward(end)?;
        let action = host.rate(end, rating)?;
        Ok((reward, action))
    }

    /// Step 4, see the transition table.
    pub fn decide(&self, action: RatingAction, passed: bool, level: u32) -> Transition {
        let reset_score = self.mode == GameMode::Normal;
        match action {
            RatingAction::Quit => Transition::Quit,
            RatingAction::Restart => Transition::Retry { level, reset_score },
            RatingAction::Continue if passed => Transition::Advance { level: level + 1 },
            RatingAction::Continue => Transition::Retry { level, reset_score },
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
