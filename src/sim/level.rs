//! Level progress owned by the caller, plus star rating.
//!
//! ## Rating
//!   Thresholds grow with the level:
//!     `threshold[i] = base[i] * (1 + growth * (level - 1))`, rounded.
//!   Stars = number of thresholds the score reaches.
//!   Pass ⇔ at least one star.

/// Counters for the level being played.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LevelState {
    pub level: u32,
    pub score: u32,
    pub moves: u32,
    /// Boards played this session (1-based).
    pub board: u32,
}

impl LevelState {
    pub fn new() -> Self {
        LevelState { level: 1, score: 0, moves: 0, board: 1 }
    }

    pub fn record_move(&mut self, points: u32) {
        self.moves += 1;
        self.score = self.score.saturating_add(points);
    }

    /// Apply the orchestrator's verdict.
    pub fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Advance { level } => {
                self.level = level;
                self.board += 1;
                self.moves = 0;
            }
            Transition::Retry { level, reset_score } => {
                self.level = level;
                self.board += 1;
                self.moves = 0;
                if reset_score { self.score = 0; }
            }
            Transition::Quit => {}
        }
    }
}

impl Default for LevelState {
    fn default() -> Self { Self::new() }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameMode {
    /// Levels advance on pass, reset score on a failed retry.
    Normal,
    /// Score carries across every board.
    Endless,
}

impl GameMode {
    pub fn parse(s: &str) -> Option<GameMode> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Some(GameMode::Normal),
            "endless" => Some(GameMode::Endless),
            _ => None,
        }
    }
}

/// Where the game goes after a level ends.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Transition {
    Advance { level: u32 },
    Retry { level: u32, reset_score: bool },
    Quit,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScoringConfig {
    /// Bonus added when a board is cleaned.
    pub clean_bonus: u32,
    pub star_thresholds: [u32; 3],
    /// Fractional threshold growth per level above 1.
    pub threshold_growth: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        ScoringConfig {
            clean_bonus: 100,
            star_thresholds: [40, 80, 140],
            threshold_growth: 0.15,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rating {
    pub stars: u8,
    pub passed: bool,
    pub thresholds: [u32; 3],
}

pub fn thresholds_for(level: u32, cfg: &ScoringConfig) -> [u32; 3] {
    let scale = 1.0 + cfg.threshold_growth.max(0.0) * level.saturating_sub(1) as f64;
    cfg.star_thresholds.map(|t| (t as f64 * scale).round() as u32)
}

pub fn rate(score: u32, level: u32, cfg: &ScoringConfig) -> Rating {
    let thresholds = thresholds_for(level, cfg);
    let stars = thresholds.iter().filter(|&&t| score >= t).count() as u8;
    Rating { stars, passed: stars >= 1, thresholds }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_move_counts_and_scores() {
        let mut l = LevelState::new();
        l.record_move(5);
        l.record_move(0);
        assert_eq!((l.moves, l.score), (2, 5));
    }

    #[test]
    fn thresholds_scale_with_level() {
        let cfg = ScoringConfig::default();
        assert_eq!(thresholds_for(1, &cfg), [40, 80, 140]);
        assert_eq!(thresholds_for(3, &cfg), [52, 104, 182]);
    }

    #[test]
    fn stars_and_pass() {
        let cfg = ScoringConfig::default();
        assert_eq!(rate(10, 1, &cfg).stars, 0);
        assert!(!rate(10, 1, &cfg).passed);
        assert_eq!(rate(40, 1, &cfg).stars, 1);
        assert!(rate(40, 1, &cfg).passed);
        assert_eq!(rate(500, 1, &cfg).stars, 3);
    }

    #[test]
    fn apply_transitions() {
        let mut l = LevelState { level: 2, score: 90, moves: 14, board: 3 };
        l.apply(Transition::Retry { level: 2, reset_score: false });
        assert_eq!(l, LevelState { level: 2, score: 90, moves: 0, board: 4 });
        l.apply(Transition::Retry { level: 2, reset_score: true });
        assert_eq!(l.score, 0);
        l.apply(Transition::Advance { level: 3 });
        assert_eq!((l.level, l.board), (3, 6));
        l.apply(Transition::Quit);
        assert_eq!((l.level, l.board), (3, 6));
    }

    #[test]
    fn mode_parse() {
        assert_eq!(GameMode::parse("Endless"), Some(GameMode::Endless));
        assert_eq!(GameMode::parse(" normal "), Some(GameMode::Normal));
        assert_eq!(GameMode::parse("arcade"), None);
    }
}
