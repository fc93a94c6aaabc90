use crate::difficulty::Difficulty;
use serde::{Deserialize, Serialize};

/// Points deducted per hint used
pub const HINT_PENALTY: i64 = 50;

/// Base score: seconds remaining scaled by the difficulty multiplier, floored
pub fn calculate_score(time_left_secs: u64, difficulty: Difficulty) -> i64 {
    (time_left_secs as f64 * difficulty.multiplier()).floor() as i64
}

/// Final session score: base minus the hint penalty, never negative
pub fn final_score(time_left_secs: u64, difficulty: Difficulty, hints_used: u32) -> i64 {
    let base = calculate_score(time_left_secs, difficulty);
    (base - hints_used as i64 * HINT_PENALTY).max(0)
}

/// A single scored session.
/// Multiple records accumulate as append-only history; the leaderboard
/// keeps only the best per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub username: String,
    pub difficulty: Difficulty,
    /// Seconds remaining at completion
    pub time_left_secs: u64,
    pub date: String,
    pub value: i64,
}

impl Score {
    /// Empty shell created at game start; filled in by [`Score::finalize`]
    pub fn new(username: &str, difficulty: Difficulty) -> Self {
        Self {
            username: username.to_string(),
            difficulty,
            time_left_secs: 0,
            date: String::new(),
            value: 0,
        }
    }

    /// Set difficulty from a raw name; unknown names fall back to Easy
    pub fn set_difficulty_name(&mut self, name: &str) {
        self.difficulty = Difficulty::parse(name);
    }

    /// Compute and record the final value for a completed session
    pub fn finalize(&mut self, time_left_secs: u64, hints_used: u32, date: &str) {
        self.time_left_secs = time_left_secs;
        self.date = date.to_string();
        self.value = final_score(time_left_secs, self.difficulty, hints_used);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hard_is_twice_easy() {
        for t in [0u64, 1, 59, 600, 1800] {
            assert_eq!(
                calculate_score(t, Difficulty::Hard),
                2 * calculate_score(t, Difficulty::Easy)
            );
        }
    }

    #[test]
    fn test_medium_floors() {
        assert_eq!(calculate_score(101, Difficulty::Medium), 151);
        assert_eq!(calculate_score(1, Difficulty::Medium), 1);
    }

    #[test]
    fn test_monotone_in_time() {
        for d in Difficulty::all_levels() {
            let mut prev = -1;
            for t in 0..100 {
                let s = calculate_score(t, *d);
                assert!(s >= prev);
                prev = s;
            }
        }
    }

    #[test]
    fn test_final_score_never_negative() {
        // Penalty far exceeds the base
        assert_eq!(final_score(10, Difficulty::Easy, 40), 0);
        assert_eq!(final_score(0, Difficulty::Hard, 0), 0);
        assert_eq!(final_score(1000, Difficulty::Easy, 2), 900);
    }

    #[test]
    fn test_bogus_difficulty_name_resolves_to_easy() {
        let mut score = Score::new("alice", Difficulty::Hard);
        score.set_difficulty_name("bogus");
        assert_eq!(score.difficulty, Difficulty::Easy);
    }

    #[test]
    fn test_finalize_applies_penalty() {
        let mut score = Score::new("alice", Difficulty::Medium);
        score.finalize(1000, 3, "2024-05-01");
        assert_eq!(score.value, 1500 - 150);
        assert_eq!(score.time_left_secs, 1000);
        assert_eq!(score.date, "2024-05-01");
    }
}
