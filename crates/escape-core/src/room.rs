use crate::puzzle::Puzzle;
use serde::{Deserialize, Serialize};

/// A room containing an ordered list of puzzles.
/// Rooms are loaded fresh at session start and not mutated structurally
/// afterwards; only puzzle solve/hint state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub title: String,
    pub puzzles: Vec<Puzzle>,
}

impl Room {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            puzzles: Vec::new(),
        }
    }

    /// First puzzle not yet solved, in room order
    pub fn first_unsolved(&self) -> Option<&Puzzle> {
        self.puzzles.iter().find(|p| !p.solved)
    }

    pub fn first_unsolved_mut(&mut self) -> Option<&mut Puzzle> {
        self.puzzles.iter_mut().find(|p| !p.solved)
    }

    pub fn solved_count(&self) -> usize {
        self.puzzles.iter().filter(|p| p.solved).count()
    }

    /// True when every puzzle in the room is solved
    pub fn is_cleared(&self) -> bool {
        self.puzzles.iter().all(|p| p.solved)
    }
}
