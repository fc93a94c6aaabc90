//! The session facade: the state machine the presentation layer drives.
//!
//! One logical session per process. The facade owns the live timer,
//! progress, and score for the current game and delegates durable reads
//! and writes to the [`Store`]. Precondition failures come back as values
//! the caller can show to the player; only persistence I/O propagates as
//! an error.

#![allow(dead_code)]

use crate::accounts::AccountStore;
use crate::ids::new_id;
use crate::store::{SavedData, Store, StoreError};
use escape_core::{
    final_score, Difficulty, LeaderboardEntry, Progress, Room, Score, Timer, User,
};
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::time::{SystemTime, UNIX_EPOCH};

/// Canonical starting room id; the first room stands in when absent
const START_ROOM: &str = "room1";

/// Facade errors. Everything except `Store` is a precondition or
/// validation failure that leaves session state unchanged.
#[derive(Debug)]
pub enum SessionError {
    NotLoggedIn,
    UsernameTaken,
    EmptyCredentials,
    InvalidCredentials,
    NoRooms,
    NoGame,
    Store(StoreError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotLoggedIn => write!(f, "no user is logged in"),
            Self::UsernameTaken => write!(f, "that username is already taken"),
            Self::EmptyCredentials => write!(f, "username and password must not be blank"),
            Self::InvalidCredentials => write!(f, "unknown username or wrong password"),
            Self::NoRooms => write!(f, "no rooms are defined; load a game definition first"),
            Self::NoGame => write!(f, "no game in progress"),
            Self::Store(e) => write!(f, "{}", e),
        }
    }
}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

/// Outcome of a solve attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Correct answer; carries the reward letter when one was claimed
    Solved { reward: Option<String> },
    /// Wrong answer; nothing changed
    Incorrect,
    /// Every puzzle in the current room is already solved
    NothingToSolve,
    /// No game in progress
    NoGame,
}

/// Outcome of a hint request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintOutcome {
    Hint(String),
    /// No unsolved puzzle, or the puzzle is out of hints
    NothingToHint,
    NoGame,
}

/// The session facade
pub struct Session {
    store: Store,
    accounts: AccountStore,
    current_user: Option<User>,
    rooms: Vec<Room>,
    current_room: Option<usize>,
    story: BTreeMap<String, String>,
    difficulty: Difficulty,
    timer: Option<Timer>,
    progress: Option<Progress>,
    score: Option<Score>,
    collected_letters: BTreeSet<String>,
}

impl Session {
    pub fn new(store: Store, accounts: AccountStore) -> Self {
        Self {
            store,
            accounts,
            current_user: None,
            rooms: Vec::new(),
            current_room: None,
            story: BTreeMap::new(),
            difficulty: Difficulty::default(),
            timer: None,
            progress: None,
            score: None,
            collected_letters: BTreeSet::new(),
        }
    }

    // ==================== Accounts ====================

    /// Create a new in-session account. The account becomes durable the
    /// first time the session persists it (on save or game end).
    pub fn create_account(&mut self, username: &str, password: &str) -> Result<(), SessionError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(SessionError::EmptyCredentials);
        }
        let persisted_conflict = self
            .store
            .get_users()
            .iter()
            .any(|u| u.matches_username(username));
        if persisted_conflict || self.accounts.find_by_username(username).is_some() {
            return Err(SessionError::UsernameTaken);
        }
        let _ = self.accounts.create(username, password);
        Ok(())
    }

    /// Log in with exact credentials. Persisted users are checked first,
    /// then accounts created during this run. Bad credentials leave the
    /// session state untouched.
    pub fn login(&mut self, username: &str, password: &str) -> Result<(), SessionError> {
        let found = self
            .store
            .get_users()
            .into_iter()
            .find(|u| u.matches_credentials(username, password))
            .or_else(|| self.accounts.find(username, password).cloned());
        match found {
            Some(user) => {
                self.current_user = Some(user);
                Ok(())
            }
            None => Err(SessionError::InvalidCredentials),
        }
    }

    /// Clear the current user only. An in-progress room and timer stay
    /// put so a later login can pick the session back up.
    pub fn logout(&mut self) {
        self.current_user = None;
    }

    /// Delete an account everywhere: the persisted record, any in-session
    /// account, and the user's leaderboard entry. Logs out when the
    /// deleted account is the current one.
    pub fn delete_account(&mut self, username: &str) -> Result<bool, SessionError> {
        let removed_store = self.store.delete_user(username)?;
        let removed_memory = self.accounts.remove(username);

        let mut board = self.store.get_leaderboard();
        if board.remove_by_username(username) {
            self.store.save_leaderboard(&board)?;
        }

        if let Some(user) = &self.current_user {
            if user.matches_username(username) {
                self.current_user = None;
            }
        }
        Ok(removed_store || removed_memory)
    }

    // ==================== Game lifecycle ====================

    /// Start a fresh game: load rooms, pick the starting room, size and
    /// start the countdown, and reset progress, score, and letters.
    pub fn start_game(&mut self, difficulty: Difficulty) -> Result<(), SessionError> {
        let user = self.current_user.as_ref().ok_or(SessionError::NotLoggedIn)?;
        let rooms = self.store.get_rooms();
        if rooms.is_empty() {
            return Err(SessionError::NoRooms);
        }
        let start = rooms
            .iter()
            .position(|r| r.id == START_ROOM)
            .unwrap_or(0);

        let seconds = self
            .store
            .timer_seconds(difficulty)
            .unwrap_or_else(|| difficulty.session_seconds());
        let mut timer = Timer::new(seconds);
        timer.start();

        self.progress = Some(Progress::new(&new_id(), &user.id));
        self.score = Some(Score::new(&user.username, difficulty));
        self.story = self.store.get_story();
        self.rooms = rooms;
        self.current_room = Some(start);
        self.difficulty = difficulty;
        self.timer = Some(timer);
        self.collected_letters.clear();
        Ok(())
    }

    /// Try an answer against the first unsolved puzzle in the current room
    pub fn solve_puzzle(&mut self, answer: &str) -> SolveOutcome {
        let Some(index) = self.current_room else {
            return SolveOutcome::NoGame;
        };
        let Some(progress) = self.progress.as_mut() else {
            return SolveOutcome::NoGame;
        };
        let Some(puzzle) = self.rooms[index].first_unsolved_mut() else {
            return SolveOutcome::NothingToSolve;
        };
        if !puzzle.check_answer(answer) {
            return SolveOutcome::Incorrect;
        }

        progress.advance_story();
        let reward = puzzle.claim_reward();
        if let Some(letter) = &reward {
            self.collected_letters.insert(letter.clone());
            if let Some(user) = self.current_user.as_mut() {
                user.inventory.add(letter);
            }
        }
        SolveOutcome::Solved { reward }
    }

    /// Reveal the next hint of the first unsolved puzzle, charging it to
    /// the progress counters
    pub fn use_hint(&mut self) -> HintOutcome {
        let Some(index) = self.current_room else {
            return HintOutcome::NoGame;
        };
        let Some(progress) = self.progress.as_mut() else {
            return HintOutcome::NoGame;
        };
        let Some(puzzle) = self.rooms[index].first_unsolved_mut() else {
            return HintOutcome::NothingToHint;
        };
        let title = puzzle.title.clone();
        match puzzle.reveal_next_hint() {
            Some(text) => {
                let text = text.to_string();
                progress.add_hint_for(Some(&title));
                HintOutcome::Hint(text)
            }
            None => HintOutcome::NothingToHint,
        }
    }

    /// Switch rooms by id. Returns false (and changes nothing) when the
    /// id is not among the loaded rooms.
    pub fn move_to_room(&mut self, id: &str) -> bool {
        match self.rooms.iter().position(|r| r.id == id) {
            Some(index) => {
                self.current_room = Some(index);
                true
            }
            None => false,
        }
    }

    /// Safe without a timer
    pub fn pause_game(&mut self) {
        if let Some(timer) = &self.timer {
            timer.pause();
        }
    }

    /// Safe without a timer
    pub fn resume_game(&mut self) {
        if let Some(timer) = self.timer.as_mut() {
            timer.resume();
        }
    }

    /// Snapshot the current game and persist it, along with the account
    /// and progress backing it
    pub fn save_game(&mut self) -> Result<(), SessionError> {
        let index = self.current_room.ok_or(SessionError::NoGame)?;
        let progress = self.progress.as_ref().ok_or(SessionError::NoGame)?;
        let room = &self.rooms[index];

        let mut extra = BTreeMap::new();
        extra.insert(
            "letters".to_string(),
            serde_json::json!(self.collected_letters.iter().collect::<Vec<_>>()),
        );
        extra.insert(
            "difficulty".to_string(),
            serde_json::json!(self.difficulty.to_string()),
        );
        let data = SavedData {
            room: room.id.clone(),
            score: self.calculate_final_score(),
            hints: progress.hints_used(),
            puzzle: room
                .first_unsolved()
                .map(|p| p.id.clone())
                .unwrap_or_default(),
            extra,
        };
        self.store.save_game(&data)?;
        self.store.save_progress(progress)?;
        if let Some(user) = &self.current_user {
            self.store.save_user(user)?;
        }
        Ok(())
    }

    /// Restore the most recent saved game for the logged-in user.
    /// Returns Ok(false) when there is nothing to restore. The restored
    /// timer starts paused; call [`Session::resume_game`] to continue.
    pub fn load_game(&mut self) -> Result<bool, SessionError> {
        let user = self.current_user.as_ref().ok_or(SessionError::NotLoggedIn)?;
        let Some(saved) = self.store.load_saved_game() else {
            return Ok(false);
        };
        let mut rooms = self.store.get_rooms();
        if rooms.is_empty() {
            return Err(SessionError::NoRooms);
        }
        let index = rooms
            .iter()
            .position(|r| r.id == saved.room)
            .unwrap_or(0);

        // Re-mark everything before the saved puzzle as solved; an empty
        // puzzle id means the room was already cleared
        let cut = if saved.puzzle.is_empty() {
            rooms[index].puzzles.len()
        } else {
            rooms[index]
                .puzzles
                .iter()
                .position(|p| p.id == saved.puzzle)
                .unwrap_or(0)
        };
        for puzzle in rooms[index].puzzles.iter_mut().take(cut) {
            puzzle.solved = true;
        }

        let difficulty = saved
            .extra
            .get("difficulty")
            .and_then(|v| v.as_str())
            .map(Difficulty::parse)
            .unwrap_or_default();

        self.collected_letters = saved
            .extra
            .get("letters")
            .and_then(|v| v.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|v| v.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        self.progress = Some(
            self.store
                .load_progress_for_user(&user.id)
                .unwrap_or_else(|| Progress::new(&new_id(), &user.id)),
        );
        self.score = Some(Score::new(&user.username, difficulty));
        let seconds = self
            .store
            .timer_seconds(difficulty)
            .unwrap_or_else(|| difficulty.session_seconds());
        self.timer = Some(Timer::new(seconds));
        self.story = self.store.get_story();
        self.rooms = rooms;
        self.current_room = Some(index);
        self.difficulty = difficulty;
        Ok(true)
    }

    /// Finish the game: freeze the clock, settle the final score into the
    /// user record, score history, and leaderboard, persist everything,
    /// and tear the session down. Ending a game logs the player out.
    pub fn end_game(&mut self) -> Result<i64, SessionError> {
        if self.current_user.is_none() {
            return Err(SessionError::NotLoggedIn);
        }
        if self.current_room.is_none() {
            return Err(SessionError::NoGame);
        }

        self.pause_game();
        let time_left = self.get_time_remaining();
        let elapsed = self
            .timer
            .as_ref()
            .map(|t| t.initial_seconds().saturating_sub(time_left))
            .unwrap_or(0);
        let hints = self.progress.as_ref().map(|p| p.hints_used()).unwrap_or(0);
        let solved = self
            .rooms
            .iter()
            .map(|r| r.solved_count())
            .sum::<usize>() as u32;
        let date = today_string();

        let username = self.current_user.as_ref().map(|u| u.username.clone()).unwrap_or_default();
        let mut score = self
            .score
            .take()
            .unwrap_or_else(|| Score::new(&username, self.difficulty));
        score.finalize(time_left, hints, &date);

        let user_id = {
            let user = self.current_user.as_mut().ok_or(SessionError::NotLoggedIn)?;
            user.score = score.value;
            user.id.clone()
        };

        self.store.save_score(&score, elapsed, hints, solved)?;

        let mut board = self.store.get_leaderboard();
        board.add_or_replace(LeaderboardEntry {
            user_id: Some(user_id),
            username: score.username.clone(),
            difficulty: self.difficulty,
            value: score.value,
            time_left_secs: time_left,
            date,
        });
        self.store.save_leaderboard(&board)?;

        if let Some(user) = &self.current_user {
            self.store.save_user(user)?;
        }
        if let Some(progress) = &self.progress {
            self.store.save_progress(progress)?;
        }

        // Tear down; dropping the timer joins its ticker thread
        self.timer = None;
        self.current_room = None;
        self.rooms.clear();
        self.progress = None;
        self.collected_letters.clear();
        self.current_user = None;
        Ok(score.value)
    }

    // ==================== Accessors ====================

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    pub fn current_room(&self) -> Option<&Room> {
        self.current_room.map(|i| &self.rooms[i])
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn score(&self) -> Option<&Score> {
        self.score.as_ref()
    }

    pub fn progress(&self) -> Option<&Progress> {
        self.progress.as_ref()
    }

    /// Copy of the session's collected reward letters
    pub fn collected_letters(&self) -> BTreeSet<String> {
        self.collected_letters.clone()
    }

    pub fn get_time_remaining(&self) -> u64 {
        self.timer.as_ref().map(|t| t.remaining_seconds()).unwrap_or(0)
    }

    /// True once the countdown has run out
    pub fn is_game_over(&self) -> bool {
        self.timer.as_ref().map(|t| t.is_expired()).unwrap_or(false)
    }

    /// Narrative line for the current story beat, if the game definition
    /// provides one
    pub fn current_story_text(&self) -> Option<&str> {
        let beat = self.progress.as_ref().map(|p| p.story_pos()).unwrap_or(0);
        self.story.get(&format!("beat{}", beat)).map(String::as_str)
    }

    /// What the final score would be if the game ended now
    pub fn calculate_final_score(&self) -> i64 {
        let hints = self.progress.as_ref().map(|p| p.hints_used()).unwrap_or(0);
        final_score(self.get_time_remaining(), self.difficulty, hints)
    }

    pub fn best_score_for(&self, username: &str) -> Option<Score> {
        self.store.best_score_for(username)
    }

    pub fn leaderboard(&self) -> escape_core::Leaderboard {
        self.store.get_leaderboard()
    }
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Current date as YYYY-MM-DD, walked out from the Unix epoch
fn today_string() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let mut days = (secs / 86400) as i64;
    let mut year = 1970i64;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if days < days_in_year {
            break;
        }
        days -= days_in_year;
        year += 1;
    }

    let months = if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };
    let mut month = 12;
    for (i, &days_in_month) in months.iter().enumerate() {
        if days < days_in_month {
            month = i + 1;
            break;
        }
        days -= days_in_month;
    }
    format!("{:04}-{:02}-{:02}", year, month, days + 1)
}
