use crate::difficulty::Difficulty;
use serde::{Deserialize, Serialize};

/// Capability for records that may carry a persistent user id.
/// Ranking matches entries by id when one is present, falling back to
/// the username.
pub trait HasUserId {
    fn user_id(&self) -> Option<&str>;
}

/// One ranked row: a user's best score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: Option<String>,
    pub username: String,
    pub difficulty: Difficulty,
    pub value: i64,
    /// Seconds remaining at completion
    pub time_left_secs: u64,
    pub date: String,
}

impl LeaderboardEntry {
    pub fn new(username: &str, difficulty: Difficulty, value: i64) -> Self {
        Self {
            user_id: None,
            username: username.to_string(),
            difficulty,
            value,
            time_left_secs: 0,
            date: String::new(),
        }
    }

    pub fn with_user_id(mut self, id: &str) -> Self {
        self.user_id = Some(id.to_string());
        self
    }
}

impl HasUserId for LeaderboardEntry {
    fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

/// Best-score-per-user ranking.
///
/// Invariant: after any mutation the entries are sorted descending by
/// value, with ties keeping their insertion order (stable sort), and no
/// user appears twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Leaderboard {
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted entries, restoring the ranking invariant
    pub fn from_entries(entries: Vec<LeaderboardEntry>) -> Self {
        let mut board = Self { entries };
        board.rank();
        board
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace the entry for this user, then re-rank.
    /// An existing entry matches by user id when both carry one,
    /// otherwise by username.
    pub fn add_or_replace(&mut self, entry: LeaderboardEntry) {
        match self.entries.iter().position(|e| same_user(e, &entry)) {
            Some(i) => self.entries[i] = entry,
            None => self.entries.push(entry),
        }
        self.rank();
    }

    /// Remove a user's entry by username. Returns true iff one was removed.
    pub fn remove_by_username(&mut self, username: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.username != username);
        let removed = self.entries.len() != before;
        if removed {
            self.rank();
        }
        removed
    }

    /// Remove a user's entry by user id. Returns true iff one was removed.
    pub fn remove_by_user_id(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.user_id() != Some(id));
        let removed = self.entries.len() != before;
        if removed {
            self.rank();
        }
        removed
    }

    /// First `n` entries, defensively copied. Asking for more than exist
    /// returns everything.
    pub fn top_n(&self, n: usize) -> Vec<LeaderboardEntry> {
        self.entries.iter().take(n).cloned().collect()
    }

    /// Copy of the full ranking; mutating it never affects the board
    pub fn entries(&self) -> Vec<LeaderboardEntry> {
        self.entries.clone()
    }

    fn rank(&mut self) {
        // Vec::sort_by is stable, so equal scores keep insertion order
        self.entries.sort_by(|a, b| b.value.cmp(&a.value));
    }
}

fn same_user(existing: &LeaderboardEntry, candidate: &LeaderboardEntry) -> bool {
    if let (Some(a), Some(b)) = (existing.user_id(), candidate.user_id()) {
        if a == b {
            return true;
        }
    }
    existing.username == candidate.username
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, value: i64) -> LeaderboardEntry {
        LeaderboardEntry::new(name, Difficulty::Easy, value)
    }

    #[test]
    fn test_replace_then_rerank() {
        let mut board = Leaderboard::new();
        board.add_or_replace(entry("Alice", 100));
        board.add_or_replace(entry("Bob", 250));
        board.add_or_replace(entry("Alice", 300));

        let top = board.top_n(2);
        assert_eq!(top.len(), 2);
        assert_eq!((top[0].username.as_str(), top[0].value), ("Alice", 300));
        assert_eq!((top[1].username.as_str(), top[1].value), ("Bob", 250));
        assert_eq!(board.len(), 2);
    }

    #[test]
    fn test_sorted_descending_with_stable_ties() {
        let mut board = Leaderboard::new();
        board.add_or_replace(entry("Carol", 200));
        board.add_or_replace(entry("Dave", 200));
        board.add_or_replace(entry("Erin", 500));

        let all = board.entries();
        assert_eq!(all[0].username, "Erin");
        // Tied scores keep insertion order
        assert_eq!(all[1].username, "Carol");
        assert_eq!(all[2].username, "Dave");
    }

    #[test]
    fn test_match_by_user_id_beats_username() {
        let mut board = Leaderboard::new();
        board.add_or_replace(entry("Alice", 100).with_user_id("u1"));
        // Same user id, renamed account: still one entry
        board.add_or_replace(entry("Alicia", 150).with_user_id("u1"));
        assert_eq!(board.len(), 1);
        assert_eq!(board.entries()[0].username, "Alicia");

        // Id-less candidate falls back to username matching
        board.add_or_replace(entry("Alicia", 175));
        assert_eq!(board.len(), 1);
        assert_eq!(board.entries()[0].value, 175);
    }

    #[test]
    fn test_remove_reports_whether_found() {
        let mut board = Leaderboard::new();
        board.add_or_replace(entry("Alice", 100).with_user_id("u1"));
        assert!(!board.remove_by_username("Nobody"));
        assert!(!board.remove_by_user_id("u9"));
        assert_eq!(board.len(), 1);
        assert!(board.remove_by_user_id("u1"));
        assert!(board.is_empty());
    }

    #[test]
    fn test_top_n_bounds() {
        let mut board = Leaderboard::new();
        board.add_or_replace(entry("Alice", 100));
        assert!(board.top_n(0).is_empty());
        assert_eq!(board.top_n(10).len(), 1);
    }

    #[test]
    fn test_serde_round_trip_preserves_ranking() {
        let mut board = Leaderboard::new();
        board.add_or_replace(entry("Alice", 100).with_user_id("u1"));
        board.add_or_replace(entry("Bob", 250));
        let json = serde_json::to_string(&board).unwrap();
        let back: Leaderboard = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entries(), board.entries());
    }

    #[test]
    fn test_entries_returns_a_copy() {
        let mut board = Leaderboard::new();
        board.add_or_replace(entry("Alice", 100));
        let mut copy = board.entries();
        copy.clear();
        assert_eq!(board.len(), 1);
    }
}
