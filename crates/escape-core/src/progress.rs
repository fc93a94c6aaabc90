use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Total number of story beats in one session
pub const TOTAL_BEATS: u32 = 6;

/// Per-user story position and hint/question counters.
/// One live instance per active session; persisted by upsert on user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub id: String,
    pub user_id: String,
    story_pos: u32,
    questions_answered: u32,
    hints_used: u32,
    hinted_puzzles: BTreeSet<String>,
}

impl Progress {
    pub fn new(id: &str, user_id: &str) -> Self {
        Self {
            id: id.to_string(),
            user_id: user_id.to_string(),
            story_pos: 0,
            questions_answered: 0,
            hints_used: 0,
            hinted_puzzles: BTreeSet::new(),
        }
    }

    /// Rebuild from persisted counters
    pub fn from_parts(
        id: &str,
        user_id: &str,
        story_pos: u32,
        questions_answered: u32,
        hints_used: u32,
        hinted_puzzles: BTreeSet<String>,
    ) -> Self {
        Self {
            id: id.to_string(),
            user_id: user_id.to_string(),
            story_pos: story_pos.min(TOTAL_BEATS),
            questions_answered,
            hints_used,
            hinted_puzzles,
        }
    }

    pub fn story_pos(&self) -> u32 {
        self.story_pos
    }

    pub fn questions_answered(&self) -> u32 {
        self.questions_answered
    }

    pub fn hints_used(&self) -> u32 {
        self.hints_used
    }

    pub fn hinted_puzzles(&self) -> &BTreeSet<String> {
        &self.hinted_puzzles
    }

    /// Count an answered question and move the story forward.
    /// The question counter keeps growing after the story saturates.
    pub fn advance_story(&mut self) {
        self.questions_answered += 1;
        if self.story_pos < TOTAL_BEATS {
            self.story_pos += 1;
        }
    }

    pub fn use_hint(&mut self) {
        self.hints_used += 1;
    }

    /// Count a hint and remember which puzzle it was for.
    ///
    /// The counter always increments; the set only grows for a present,
    /// non-blank title that is not already recorded. Callers that pass a
    /// blank or missing title still pay for the hint.
    pub fn add_hint_for(&mut self, title: Option<&str>) {
        self.hints_used += 1;
        if let Some(title) = title {
            let trimmed = title.trim();
            if !trimmed.is_empty() {
                self.hinted_puzzles.insert(trimmed.to_string());
            }
        }
    }

    /// Clamped to [0, TOTAL_BEATS]
    pub fn set_story_pos(&mut self, pos: u32) {
        self.story_pos = pos.min(TOTAL_BEATS);
    }

    pub fn set_questions_answered(&mut self, n: u32) {
        self.questions_answered = n;
    }

    pub fn set_hints_used(&mut self, n: u32) {
        self.hints_used = n;
    }

    pub fn completion_percent(&self) -> f64 {
        self.story_pos as f64 / TOTAL_BEATS as f64 * 100.0
    }

    pub fn is_complete(&self) -> bool {
        self.story_pos == TOTAL_BEATS
    }
}
