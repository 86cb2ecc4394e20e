//! Deal-in reveal progress after a rebuild.
//!
//! Two cosmetic signals, each fired at most once per reveal:
//!   - `HalfRevealed`    half of the opened tiles have been shown
//!   - `RevealHalfTime`  half of the reveal duration has elapsed
//!
//! The board is already final when a reveal starts; nothing here gates
//! a logical query.

use std::time::Duration;

use super::event::GameEvent;

#[derive(Clone, Debug)]
pub struct RevealTracker {
    total_tiles: usize,
    shown: usize,
    duration: Duration,
    elapsed: Duration,
    half_revealed: bool,
    half_time: bool,
}

impl RevealTracker {
    pub fn new(total_tiles: usize, duration: Duration) -> Self {
        RevealTracker {
            total_tiles,
            shown: 0,
            duration,
            elapsed: Duration::ZERO,
            half_revealed: false,
            half_time: false,
        }
    }

    pub fn shown(&self) -> usize { self.shown }
    pub fn total(&self) -> usize { self.total_tiles }

    pub fn is_done(&self) -> bool {
        self.shown >= self.total_tiles && self.elapsed >= self.duration
    }

    /// One more tile finished its reveal.
    pub fn tile_shown(&mut self) -> Option<GameEvent> {
        self.shown = (self.shown + 1).min(self.total_tiles);
        if self.half_revealed || self.shown * 2 < self.total_tiles {
            return None;
        }
        self.half_revealed = true;
        Some(GameEvent::HalfRevealed)
    }

    pub fn advance(&mut self, dt: Duration) -> Option<GameEvent> {
        self.elapsed = self.elapsed.saturating_add(dt).min(self.duration);
        if self.half_time || self.elapsed * 2 < self.duration {
            return None;
        }
        self.half_time = true;
        Some(GameEvent::RevealHalfTime)
    }

    /// Skip to the end, emitting whichever signals have not fired yet.
    pub fn finish(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.shown = self.total_tiles;
        self.elapsed = self.duration;
        if !self.half_revealed {
            self.half_revealed = true;
            events.push(GameEvent::HalfRevealed);
        }
        if !self.half_time {
            self.half_time = true;
            events.push(GameEvent::RevealHalfTime);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_revealed_fires_once() {
        let mut r = RevealTracker::new(5, Duration::from_millis(500));
        let fired: Vec<_> = (0..5).filter_map(|_| r.tile_shown()).collect();
        assert_eq!(fired, vec![GameEvent::HalfRevealed]);
        assert_eq!(r.tile_shown(), None);
        assert_eq!(r.shown(), 5);
    }

    #[test]
    fn half_revealed_at_the_midpoint() {
        let mut r = RevealTracker::new(4, Duration::from_millis(100));
        assert_eq!(r.tile_shown(), None);
        assert_eq!(r.tile_shown(), Some(GameEvent::HalfRevealed));
    }

    #[test]
    fn half_time_is_independent_of_tiles() {
        let mut r = RevealTracker::new(10, Duration::from_millis(400));
        assert_eq!(r.advance(Duration::from_millis(150)), None);
        assert_eq!(r.advance(Duration::from_millis(60)), Some(GameEvent::RevealHalfTime));
        assert_eq!(r.advance(Duration::from_millis(500)), None);
        assert_eq!(r.shown(), 0);
        assert!(!r.is_done());
    }

    #[test]
    fn finish_emits_only_missing_signals() {
        let mut r = RevealTracker::new(2, Duration::from_millis(100));
        r.tile_shown();
        assert_eq!(r.finish(), vec![GameEvent::RevealHalfTime]);
        assert!(r.finish().is_empty());
        assert!(r.is_done());
    }
}
