//! Score and combo engine

use serde::{Deserialize, Serialize};

/// Combo count needed for the x2 multiplier
pub const COMBO_TIER_2: u32 = 5;
/// Combo count needed for the x3 multiplier
pub const COMBO_TIER_3: u32 = 10;

/// Multiplier for a combo count: x1 below 5, x2 below 10, x3 from 10
pub fn combo_multiplier(combo: u32) -> u32 {
    if combo >= COMBO_TIER_3 {
        3
    } else if combo >= COMBO_TIER_2 {
        2
    } else {
        1
    }
}

/// Session score, combo and high score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreState {
    score: u64,
    high_score: u64,
    /// High score as loaded when the session began
    starting_high_score: u64,
    combo: u32,
    combo_timer_ms: f32,
    combo_window_ms: f32,
    /// Set when the high score moved and has not been persisted yet
    high_score_dirty: bool,
}

impl ScoreState {
    pub fn new(high_score: u64, combo_window_ms: f32) -> Self {
        Self {
            score: 0,
            high_score,
            starting_high_score: high_score,
            combo: 0,
            combo_timer_ms: 0.0,
            combo_window_ms,
            high_score_dirty: false,
        }
    }

    /// Add `base × multiplier` points and return the amount actually added
    pub fn add_score(&mut self, base: u64) -> u64 {
        let awarded = base * self.multiplier() as u64;
        self.credit(awarded);
        awarded
    }

    /// Add points that ignore the combo multiplier (pickups)
    pub fn add_flat_score(&mut self, points: u64) -> u64 {
        self.credit(points);
        points
    }

    fn credit(&mut self, points: u64) {
        self.score += points;
        if self.score > self.high_score {
            self.high_score = self.score;
            self.high_score_dirty = true;
        }
    }

    /// Register a qualifying kill and refresh the decay window
    pub fn increase_combo(&mut self) {
        self.combo += 1;
        self.combo_timer_ms = self.combo_window_ms;
    }

    pub fn reset_combo(&mut self) {
        self.combo = 0;
        self.combo_timer_ms = 0.0;
    }

    /// Decay the combo window. Returns true if the combo just expired.
    pub fn update(&mut self, dt_ms: f32) -> bool {
        if self.combo == 0 {
            return false;
        }
        self.combo_timer_ms -= dt_ms;
        if self.combo_timer_ms <= 0.0 {
            self.reset_combo();
            return true;
        }
        false
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    pub fn high_score(&self) -> u64 {
        self.high_score
    }

    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn multiplier(&self) -> u32 {
        combo_multiplier(self.combo)
    }

    /// Remaining combo window as a fraction (0 when no combo)
    pub fn combo_timer_fraction(&self) -> f32 {
        if self.combo == 0 {
            return 0.0;
        }
        (self.combo_timer_ms / self.combo_window_ms).max(0.0)
    }

    /// True once this session beat the high score it started with
    pub fn is_new_high_score(&self) -> bool {
        self.score > self.starting_high_score
    }

    /// Take the pending high score for persistence, if it changed
    pub fn take_high_score_update(&mut self) -> Option<u64> {
        if self.high_score_dirty {
            self.high_score_dirty = false;
            Some(self.high_score)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiplier_steps() {
        assert_eq!(combo_multiplier(0), 1);
        assert_eq!(combo_multiplier(4), 1);
        assert_eq!(combo_multiplier(5), 2);
        assert_eq!(combo_multiplier(9), 2);
        assert_eq!(combo_multiplier(10), 3);
        assert_eq!(combo_multiplier(250), 3);
    }

    #[test]
    fn test_add_score_applies_multiplier() {
        let mut s = ScoreState::new(0, 3000.0);
        for _ in 0..5 {
            s.increase_combo();
        }
        assert_eq!(s.multiplier(), 2);
        assert_eq!(s.add_score(100), 200);
        assert_eq!(s.score(), 200);
        assert_eq!(s.add_flat_score(25), 25);
        assert_eq!(s.score(), 225);
    }

    #[test]
    fn test_high_score_only_moves_when_beaten() {
        let mut s = ScoreState::new(150, 3000.0);
        s.add_score(100);
        assert_eq!(s.high_score(), 150);
        assert_eq!(s.take_high_score_update(), None);
        assert!(!s.is_new_high_score());

        s.add_score(100);
        assert_eq!(s.high_score(), 200);
        assert_eq!(s.take_high_score_update(), Some(200));
        assert_eq!(s.take_high_score_update(), None);
        assert!(s.is_new_high_score());
    }

    #[test]
    fn test_combo_decays_after_window() {
        let mut s = ScoreState::new(0, 3000.0);
        for _ in 0..6 {
            s.increase_combo();
        }
        assert!(!s.update(2999.0));
        assert_eq!(s.combo(), 6);

        // A kill refreshes the window
        s.increase_combo();
        assert!(!s.update(2000.0));
        assert_eq!(s.combo(), 7);

        assert!(s.update(1000.0));
        assert_eq!(s.combo(), 0);
        assert_eq!(s.multiplier(), 1);
    }

    #[test]
    fn test_update_without_combo_is_noop() {
        let mut s = ScoreState::new(0, 3000.0);
        assert!(!s.update(10_000.0));
        assert_eq!(s.combo_timer_fraction(), 0.0);
    }
}
