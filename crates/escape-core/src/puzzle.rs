use serde::{Deserialize, Serialize};

/// Kind of puzzle, which controls how answers are normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PuzzleKind {
    Word,
    Number,
    Audio,
    Riddle,
}

impl PuzzleKind {
    /// Parse a category tag from the game-definition document.
    /// Unknown tags read as Word.
    pub fn parse(tag: &str) -> PuzzleKind {
        match tag.trim().to_uppercase().as_str() {
            "NUMBER" => PuzzleKind::Number,
            "AUDIO" => PuzzleKind::Audio,
            "RIDDLE" => PuzzleKind::Riddle,
            _ => PuzzleKind::Word,
        }
    }

    /// Category tag written to the game-definition document
    pub fn tag(&self) -> &'static str {
        match self {
            PuzzleKind::Word => "WORD",
            PuzzleKind::Number => "NUMBER",
            PuzzleKind::Audio => "AUDIO",
            PuzzleKind::Riddle => "RIDDLE",
        }
    }
}

/// A single hint attached to a puzzle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hint {
    /// Position in the reveal order
    pub order: usize,
    pub text: String,
    pub revealed: bool,
}

impl Hint {
    pub fn new(order: usize, text: &str) -> Self {
        Self {
            order,
            text: text.to_string(),
            revealed: false,
        }
    }
}

/// One puzzle inside a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Puzzle {
    pub id: String,
    pub kind: PuzzleKind,
    pub title: String,
    /// What the player is asked to do
    pub objective: String,
    /// The text shown when the puzzle is presented
    pub prompt: String,
    pub solution: String,
    pub solved: bool,
    /// Reward token granted on first solve, if any
    pub reward_letter: Option<String>,
    reward_claimed: bool,
    hints: Vec<Hint>,
}

impl Puzzle {
    pub fn new(id: &str, kind: PuzzleKind, title: &str, solution: &str) -> Self {
        Self {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            objective: String::new(),
            prompt: String::new(),
            solution: solution.to_string(),
            solved: false,
            reward_letter: None,
            reward_claimed: false,
            hints: Vec::new(),
        }
    }

    /// Attach a reward letter granted on first solve
    pub fn with_reward_letter(mut self, letter: &str) -> Self {
        self.reward_letter = Some(letter.to_string());
        self
    }

    /// Append a hint at the end of the reveal order
    pub fn add_hint(&mut self, text: &str) {
        let order = self.hints.len();
        self.hints.push(Hint::new(order, text));
    }

    pub fn hints(&self) -> &[Hint] {
        &self.hints
    }

    /// Check an answer against the solution.
    ///
    /// Empty input is rejected outright. Input and solution are trimmed and
    /// lowercased; Word and Number puzzles also ignore interior whitespace.
    /// Once solved, further checks short-circuit to true without mutating
    /// anything, so a repeated correct answer cannot double-count.
    pub fn check_answer(&mut self, answer: &str) -> bool {
        if self.solved {
            return true;
        }
        if answer.trim().is_empty() {
            return false;
        }
        if normalize(self.kind, answer) == normalize(self.kind, &self.solution) {
            self.solved = true;
            true
        } else {
            false
        }
    }

    /// Claim the reward letter. Only the first call after solving yields it.
    pub fn claim_reward(&mut self) -> Option<String> {
        if self.reward_claimed {
            return None;
        }
        match &self.reward_letter {
            Some(letter) => {
                self.reward_claimed = true;
                Some(letter.clone())
            }
            None => None,
        }
    }

    /// Reveal the next unrevealed hint in order, returning its text
    pub fn reveal_next_hint(&mut self) -> Option<&str> {
        let hint = self.hints.iter_mut().find(|h| !h.revealed)?;
        hint.revealed = true;
        Some(hint.text.as_str())
    }

    pub fn hints_remaining(&self) -> usize {
        self.hints.iter().filter(|h| !h.revealed).count()
    }
}

fn normalize(kind: PuzzleKind, input: &str) -> String {
    let folded = input.trim().to_lowercase();
    match kind {
        // Word and Number answers ignore all whitespace, not just the ends
        PuzzleKind::Word | PuzzleKind::Number => folded.split_whitespace().collect(),
        PuzzleKind::Audio | PuzzleKind::Riddle => folded,
    }
}
