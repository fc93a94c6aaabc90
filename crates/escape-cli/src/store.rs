//! File-backed persistence gateway.
//!
//! Two JSON documents live in the data directory: a game-definition
//! document (rooms, puzzles, story text, difficulty and timer tables) and
//! a player-data document (users, leaderboard, score history, progress,
//! saved games). Both are treated as hand-editable: every load tolerates
//! a missing file or absent section and degrades to an empty collection,
//! while saves report I/O failures to the caller.

#![allow(dead_code)]

use escape_core::{
    Difficulty, Inventory, Leaderboard, LeaderboardEntry, Progress, Puzzle, PuzzleKind, Room,
    Score, User, EXPANDED_CAPACITY,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

const GAME_FILE: &str = "game_data.json";
const PLAYER_FILE: &str = "player_data.json";

/// Errors from reading or writing the persisted documents
#[derive(Debug)]
pub enum StoreError {
    Io(std::io::Error),
    Format(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "storage I/O error: {}", e),
            Self::Format(e) => write!(f, "storage format error: {}", e),
        }
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Format(e)
    }
}

// ==================== Document records ====================

/// The game-definition document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameDoc {
    pub rooms: Vec<RoomRecord>,
    /// Narrative text keyed by story beat ("beat0".."beat6", "intro", ...)
    pub story: BTreeMap<String, String>,
    /// Difficulty name to score multiplier
    pub difficulties: BTreeMap<String, f64>,
    /// Difficulty name to countdown seconds
    pub timer: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomRecord {
    #[serde(rename = "roomID")]
    pub room_id: String,
    pub title: String,
    pub puzzles: Vec<PuzzleRecord>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PuzzleRecord {
    pub id: String,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub objective: String,
    pub solution: String,
    pub prompt: String,
    /// Single hint text; `hints` takes precedence when present
    pub hint: String,
    pub hints: Vec<String>,
    #[serde(rename = "rewardLetter", skip_serializing_if = "Option::is_none")]
    pub reward_letter: Option<String>,
}

/// The player-data document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerDoc {
    pub users: Vec<UserRecord>,
    pub leaderboard: Vec<LeaderboardRecord>,
    pub scores: Vec<ScoreRecord>,
    pub progress: Vec<ProgressRecord>,
    #[serde(rename = "savedData")]
    pub saved_data: Vec<SavedData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRecord {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub username: String,
    pub password: String,
    pub inventory: InventoryRecord,
    pub score: i64,
}

/// Signed capacity on purpose: hand-edited documents have been seen with
/// zero or negative capacities, which the loader repairs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryRecord {
    pub items: Vec<String>,
    pub capacity: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardRecord {
    #[serde(rename = "userID", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub username: String,
    pub difficulty: String,
    pub score: i64,
    #[serde(rename = "timeLeftSec")]
    pub time_left_sec: u64,
    pub date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreRecord {
    pub username: String,
    pub difficulty: String,
    pub score: i64,
    #[serde(rename = "timeLeftSec")]
    pub time_left_sec: u64,
    pub date: String,
    /// Elapsed seconds for the whole session
    #[serde(rename = "timeSeconds")]
    pub time_seconds: u64,
    #[serde(rename = "hintsUsed")]
    pub hints_used: u32,
    #[serde(rename = "puzzlesSolved")]
    pub puzzles_solved: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressRecord {
    #[serde(rename = "userUUID")]
    pub user_uuid: String,
    #[serde(rename = "progressUUID")]
    pub progress_uuid: String,
    /// Story position
    pub c: u32,
    pub answered: u32,
    pub hints: u32,
    #[serde(rename = "hintedPuzzles")]
    pub hinted_puzzles: Vec<String>,
}

/// Snapshot written on save-and-quit and read back to restore a session.
/// Unrecognized keys survive round-trips through the flattened map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedData {
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub hints: u32,
    #[serde(default)]
    pub puzzle: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

// ==================== Conversions ====================

fn puzzle_from_record(record: PuzzleRecord) -> Puzzle {
    // `category` is authoritative; fall back to `type` when it is blank
    let tag = if record.category.trim().is_empty() {
        &record.kind
    } else {
        &record.category
    };
    let mut puzzle = Puzzle::new(&record.id, PuzzleKind::parse(tag), &record.title, &record.solution);
    puzzle.objective = record.objective;
    puzzle.prompt = record.prompt;
    puzzle.reward_letter = record.reward_letter;
    if record.hints.is_empty() {
        if !record.hint.trim().is_empty() {
            puzzle.add_hint(&record.hint);
        }
    } else {
        for text in &record.hints {
            puzzle.add_hint(text);
        }
    }
    puzzle
}

fn puzzle_to_record(puzzle: &Puzzle) -> PuzzleRecord {
    let hints: Vec<String> = puzzle.hints().iter().map(|h| h.text.clone()).collect();
    PuzzleRecord {
        id: puzzle.id.clone(),
        category: puzzle.kind.tag().to_string(),
        kind: puzzle.kind.tag().to_lowercase(),
        title: puzzle.title.clone(),
        objective: puzzle.objective.clone(),
        solution: puzzle.solution.clone(),
        prompt: puzzle.prompt.clone(),
        hint: hints.first().cloned().unwrap_or_default(),
        hints,
        reward_letter: puzzle.reward_letter.clone(),
    }
}

fn room_from_record(record: RoomRecord) -> Room {
    let mut room = Room::new(&record.room_id, &record.title);
    room.puzzles = record.puzzles.into_iter().map(puzzle_from_record).collect();
    room
}

fn room_to_record(room: &Room) -> RoomRecord {
    RoomRecord {
        room_id: room.id.clone(),
        title: room.title.clone(),
        puzzles: room.puzzles.iter().map(puzzle_to_record).collect(),
    }
}

fn user_from_record(record: UserRecord) -> User {
    // Capacity repair: a non-positive persisted capacity is invalid and
    // loads as the expanded default instead
    let capacity = if record.inventory.capacity <= 0 {
        EXPANDED_CAPACITY
    } else {
        record.inventory.capacity as usize
    };
    let mut user = User::new(&record.user_id, &record.username, &record.password);
    user.inventory = Inventory::from_parts(record.inventory.items, capacity);
    user.score = record.score;
    user
}

fn user_to_record(user: &User) -> UserRecord {
    UserRecord {
        user_id: user.id.clone(),
        username: user.username.clone(),
        password: user.password.clone(),
        inventory: InventoryRecord {
            items: user.inventory.items().to_vec(),
            capacity: user.inventory.capacity() as i64,
        },
        score: user.score,
    }
}

fn entry_from_record(record: LeaderboardRecord) -> LeaderboardEntry {
    LeaderboardEntry {
        user_id: record.user_id,
        username: record.username,
        difficulty: Difficulty::parse(&record.difficulty),
        value: record.score,
        time_left_secs: record.time_left_sec,
        date: record.date,
    }
}

fn entry_to_record(entry: &LeaderboardEntry) -> LeaderboardRecord {
    LeaderboardRecord {
        user_id: entry.user_id.clone(),
        username: entry.username.clone(),
        difficulty: entry.difficulty.to_string(),
        score: entry.value,
        time_left_sec: entry.time_left_secs,
        date: entry.date.clone(),
    }
}

fn score_from_record(record: &ScoreRecord) -> Score {
    Score {
        username: record.username.clone(),
        difficulty: Difficulty::parse(&record.difficulty),
        time_left_secs: record.time_left_sec,
        date: record.date.clone(),
        value: record.score,
    }
}

fn progress_from_record(record: ProgressRecord) -> Progress {
    Progress::from_parts(
        &record.progress_uuid,
        &record.user_uuid,
        record.c,
        record.answered,
        record.hints,
        record.hinted_puzzles.into_iter().collect(),
    )
}

fn progress_to_record(progress: &Progress) -> ProgressRecord {
    ProgressRecord {
        user_uuid: progress.user_id.clone(),
        progress_uuid: progress.id.clone(),
        c: progress.story_pos(),
        answered: progress.questions_answered(),
        hints: progress.hints_used(),
        hinted_puzzles: progress.hinted_puzzles().iter().cloned().collect(),
    }
}

// ==================== Store ====================

/// File-backed persistence gateway for users, rooms, scores, progress,
/// the leaderboard, and saved-game snapshots
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default data directory: `$ESCAPE_DATA_DIR`, else the platform's
    /// local data dir
    pub fn default_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("ESCAPE_DATA_DIR") {
            return PathBuf::from(dir);
        }
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("escape")
    }

    pub fn open_default() -> Self {
        Self::new(Self::default_dir())
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn game_path(&self) -> PathBuf {
        self.dir.join(GAME_FILE)
    }

    fn player_path(&self) -> PathBuf {
        self.dir.join(PLAYER_FILE)
    }

    fn read_game(&self) -> GameDoc {
        match fs::read_to_string(self.game_path()) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_default(),
            Err(_) => GameDoc::default(),
        }
    }

    fn read_player(&self) -> PlayerDoc {
        match fs::read_to_string(self.player_path()) {
            Ok(json) => serde_json::from_str(&json).unwrap_or_default(),
            Err(_) => PlayerDoc::default(),
        }
    }

    fn write_game(&self, doc: &GameDoc) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(doc)?;
        fs::write(self.game_path(), json)?;
        Ok(())
    }

    fn write_player(&self, doc: &PlayerDoc) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(doc)?;
        fs::write(self.player_path(), json)?;
        Ok(())
    }

    // ==================== Loads ====================

    pub fn get_users(&self) -> Vec<User> {
        self.read_player()
            .users
            .into_iter()
            .map(user_from_record)
            .collect()
    }

    pub fn get_rooms(&self) -> Vec<Room> {
        self.read_game()
            .rooms
            .into_iter()
            .map(room_from_record)
            .collect()
    }

    pub fn get_story(&self) -> BTreeMap<String, String> {
        self.read_game().story
    }

    /// Countdown override from the game-definition document, if any
    pub fn timer_seconds(&self, difficulty: Difficulty) -> Option<u64> {
        self.read_game().timer.get(difficulty.key()).copied()
    }

    pub fn get_leaderboard(&self) -> Leaderboard {
        let entries = self
            .read_player()
            .leaderboard
            .into_iter()
            .map(entry_from_record)
            .collect();
        Leaderboard::from_entries(entries)
    }

    /// Full score history, in recorded order
    pub fn get_scores(&self) -> Vec<Score> {
        self.read_player()
            .scores
            .iter()
            .map(score_from_record)
            .collect()
    }

    /// Highest historical score for a username, if any
    pub fn best_score_for(&self, username: &str) -> Option<Score> {
        self.get_scores()
            .into_iter()
            .filter(|s| s.username == username)
            .max_by_key(|s| s.value)
    }

    /// None when no progress record matches the user id
    pub fn load_progress_for_user(&self, user_id: &str) -> Option<Progress> {
        self.read_player()
            .progress
            .into_iter()
            .find(|p| p.user_uuid == user_id)
            .map(progress_from_record)
    }

    /// Most recent saved-game snapshot, if any
    pub fn load_saved_game(&self) -> Option<SavedData> {
        self.read_player().saved_data.into_iter().last()
    }

    // ==================== Saves ====================

    /// Upsert a user: match by id first, else by username, replacing the
    /// record in place. The document never ends up with two records for
    /// one username.
    pub fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let mut doc = self.read_player();
        upsert_user(&mut doc, user);
        self.write_player(&doc)
    }

    pub fn save_users(&self, users: &[User]) -> Result<(), StoreError> {
        let mut doc = self.read_player();
        for user in users {
            upsert_user(&mut doc, user);
        }
        self.write_player(&doc)
    }

    /// Remove a user record by username (case-insensitive).
    /// Returns true iff a record was removed.
    pub fn delete_user(&self, username: &str) -> Result<bool, StoreError> {
        let mut doc = self.read_player();
        let before = doc.users.len();
        doc.users.retain(|u| !u.username.eq_ignore_ascii_case(username));
        let removed = doc.users.len() != before;
        if removed {
            self.write_player(&doc)?;
        }
        Ok(removed)
    }

    /// Append a score history record. Every call adds a new record; history
    /// is never merged or replaced.
    pub fn save_score(
        &self,
        score: &Score,
        time_seconds: u64,
        hints_used: u32,
        puzzles_solved: u32,
    ) -> Result<(), StoreError> {
        let mut doc = self.read_player();
        doc.scores.push(ScoreRecord {
            username: score.username.clone(),
            difficulty: score.difficulty.to_string(),
            score: score.value,
            time_left_sec: score.time_left_secs,
            date: score.date.clone(),
            time_seconds,
            hints_used,
            puzzles_solved,
        });
        self.write_player(&doc)
    }

    /// Upsert the progress record for a user: exactly one record per user
    /// no matter how many times it is saved
    pub fn save_progress(&self, progress: &Progress) -> Result<(), StoreError> {
        let mut doc = self.read_player();
        let record = progress_to_record(progress);
        match doc
            .progress
            .iter()
            .position(|p| p.user_uuid == progress.user_id)
        {
            Some(i) => doc.progress[i] = record,
            None => doc.progress.push(record),
        }
        self.write_player(&doc)
    }

    /// Overwrite the leaderboard section with the board's current entries.
    /// The board itself already enforces one entry per user.
    pub fn save_leaderboard(&self, board: &Leaderboard) -> Result<(), StoreError> {
        let mut doc = self.read_player();
        doc.leaderboard = board.entries().iter().map(entry_to_record).collect();
        self.write_player(&doc)
    }

    /// Write the game-definition document with the given rooms, filling in
    /// difficulty, timer, and story defaults when those sections are empty
    /// so the emitted document is coherent on its own.
    pub fn save_rooms(&self, rooms: &[Room]) -> Result<(), StoreError> {
        let mut doc = self.read_game();
        doc.rooms = rooms.iter().map(room_to_record).collect();
        if doc.difficulties.is_empty() {
            for d in Difficulty::all_levels() {
                doc.difficulties.insert(d.key().to_string(), d.multiplier());
            }
        }
        if doc.timer.is_empty() {
            for d in Difficulty::all_levels() {
                doc.timer.insert(d.key().to_string(), d.session_seconds());
            }
        }
        doc.story
            .entry("intro".to_string())
            .or_insert_with(|| "You wake in a locked room.".to_string());
        self.write_game(&doc)
    }

    /// Append a saved-game snapshot
    pub fn save_game(&self, data: &SavedData) -> Result<(), StoreError> {
        let mut doc = self.read_player();
        doc.saved_data.push(data.clone());
        self.write_player(&doc)
    }

    /// Write the starter game-definition document (used by `escape --init`)
    pub fn write_sample_game(&self) -> Result<(), StoreError> {
        self.write_game(&sample_game_doc())
    }
}

fn upsert_user(doc: &mut PlayerDoc, user: &User) {
    let record = user_to_record(user);
    let position = doc
        .users
        .iter()
        .position(|u| u.user_id == user.id)
        .or_else(|| doc.users.iter().position(|u| u.username == user.username));
    match position {
        Some(i) => doc.users[i] = record,
        None => doc.users.push(record),
    }
}

/// Built-in starter content so a fresh install has something to play
pub fn sample_game_doc() -> GameDoc {
    let mut doc = GameDoc::default();

    let mut study = Room::new("room1", "The Study");
    let mut p1 = Puzzle::new("p1", PuzzleKind::Word, "Bookshelf Anagram", "candle")
        .with_reward_letter("C");
    p1.objective = "Unscramble the letters on the red book spines".to_string();
    p1.prompt = "D A C E L N".to_string();
    p1.add_hint("Only the red spines matter");
    p1.add_hint("It gives light");
    study.puzzles.push(p1);

    let mut p2 = Puzzle::new("p2", PuzzleKind::Number, "Grandfather Clock", "715")
        .with_reward_letter("L");
    p2.objective = "Enter the time the clock stopped".to_string();
    p2.prompt = "The hands have not moved since the storm".to_string();
    p2.add_hint("Quarter past something");
    study.puzzles.push(p2);

    let mut p3 = Puzzle::new("p3", PuzzleKind::Riddle, "Desk Riddle", "a shadow");
    p3.objective = "Answer the riddle carved into the desk".to_string();
    p3.prompt = "I follow you all day but vanish at night. What am I?".to_string();
    study.puzzles.push(p3);

    let mut cellar = Room::new("room2", "The Cellar");
    let mut p4 =
        Puzzle::new("p4", PuzzleKind::Audio, "Music Box", "waltz").with_reward_letter("U");
    p4.objective = "Name the dance the music box plays".to_string();
    p4.prompt = "Listen closely to the rhythm".to_string();
    p4.add_hint("Count the beats: one-two-three");
    cellar.puzzles.push(p4);

    let mut p5 =
        Puzzle::new("p5", PuzzleKind::Number, "Wine Rack Dial", "1887").with_reward_letter("E");
    p5.objective = "Set the dial to the vintage year".to_string();
    p5.prompt = "The oldest bottle knows".to_string();
    cellar.puzzles.push(p5);

    let mut p6 = Puzzle::new("p6", PuzzleKind::Word, "Cellar Door", "echo");
    p6.objective = "Speak the word that opens the door".to_string();
    p6.prompt = "It answers when you call, in your own voice".to_string();
    cellar.puzzles.push(p6);

    doc.rooms = vec![room_to_record(&study), room_to_record(&cellar)];

    for d in Difficulty::all_levels() {
        doc.difficulties.insert(d.key().to_string(), d.multiplier());
        doc.timer.insert(d.key().to_string(), d.session_seconds());
    }

    let beats = [
        "You wake in a locked study. The door will not budge.",
        "A drawer clicks open somewhere behind you.",
        "The clock face swings aside, revealing a keyhole.",
        "Cold air drifts up from a stairway you had not noticed.",
        "The cellar hums with a tune you almost remember.",
        "One last mechanism stands between you and the way out.",
        "The door swings open. You are free.",
    ];
    for (i, text) in beats.iter().enumerate() {
        doc.story.insert(format!("beat{}", i), text.to_string());
    }
    doc.story.insert(
        "intro".to_string(),
        "Escape the house before the clock runs out.".to_string(),
    );

    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use escape_core::DEFAULT_CAPACITY;
    use tempfile::tempdir;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_missing_files_load_as_empty() {
        let (_dir, store) = temp_store();
        assert!(store.get_users().is_empty());
        assert!(store.get_rooms().is_empty());
        assert!(store.get_scores().is_empty());
        assert!(store.get_leaderboard().is_empty());
        assert!(store.load_progress_for_user("nobody").is_none());
        assert!(store.load_saved_game().is_none());
        assert!(store.timer_seconds(Difficulty::Easy).is_none());
    }

    #[test]
    fn test_corrupt_file_loads_as_empty() {
        let (dir, store) = temp_store();
        fs::write(dir.path().join(PLAYER_FILE), "{not json").unwrap();
        assert!(store.get_users().is_empty());
    }

    #[test]
    fn test_user_round_trip() {
        let (_dir, store) = temp_store();
        let mut user = User::new("u1", "Alice", "hunter2");
        user.inventory.add("K");
        user.inventory.add("E");
        store.save_user(&user).unwrap();

        let loaded = store.get_users();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].username, "Alice");
        assert_eq!(loaded[0].password, "hunter2");
        let mut items = loaded[0].inventory.items().to_vec();
        items.sort();
        assert_eq!(items, vec!["E".to_string(), "K".to_string()]);
    }

    #[test]
    fn test_save_user_upserts_without_duplicates() {
        let (_dir, store) = temp_store();
        let mut user = User::new("u1", "Alice", "hunter2");
        store.save_user(&user).unwrap();
        user.password = "changed".to_string();
        user.score = 900;
        store.save_user(&user).unwrap();

        let loaded = store.get_users();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].password, "changed");
        assert_eq!(loaded[0].score, 900);
    }

    #[test]
    fn test_save_users_bulk_upsert() {
        let (_dir, store) = temp_store();
        let alice = User::new("u1", "Alice", "pw");
        let bob = User::new("u2", "Bob", "pw");
        store.save_users(&[alice.clone(), bob]).unwrap();

        let mut renamed = alice;
        renamed.password = "new".to_string();
        let cara = User::new("u3", "Cara", "pw");
        store.save_users(&[renamed, cara]).unwrap();

        let users = store.get_users();
        assert_eq!(users.len(), 3);
        let alice = users.iter().find(|u| u.username == "Alice").unwrap();
        assert_eq!(alice.password, "new");
    }

    #[test]
    fn test_capacity_repair_on_load() {
        let (dir, store) = temp_store();
        let json = r#"{"users":[{"userID":"u1","username":"Bob","password":"pw",
            "inventory":{"items":["A"],"capacity":0}}]}"#;
        fs::write(dir.path().join(PLAYER_FILE), json).unwrap();

        let users = store.get_users();
        assert_eq!(users[0].inventory.capacity(), EXPANDED_CAPACITY);
        assert_eq!(users[0].inventory.items(), ["A".to_string()]);
    }

    #[test]
    fn test_fresh_user_keeps_default_capacity() {
        let (_dir, store) = temp_store();
        store.save_user(&User::new("u1", "Alice", "pw")).unwrap();
        assert_eq!(store.get_users()[0].inventory.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_scores_append_only() {
        let (_dir, store) = temp_store();
        let mut score = Score::new("Alice", Difficulty::Easy);
        score.finalize(1000, 0, "2024-05-01");
        store.save_score(&score, 800, 0, 6).unwrap();
        store.save_score(&score, 800, 0, 6).unwrap();
        assert_eq!(store.get_scores().len(), 2);

        let mut better = Score::new("Alice", Difficulty::Hard);
        better.finalize(1000, 0, "2024-05-02");
        store.save_score(&better, 200, 0, 6).unwrap();
        assert_eq!(store.best_score_for("Alice").unwrap().value, 2000);
        assert!(store.best_score_for("Nobody").is_none());
    }

    #[test]
    fn test_progress_upsert_by_user() {
        let (_dir, store) = temp_store();
        let mut progress = Progress::new("pr1", "u1");
        progress.advance_story();
        store.save_progress(&progress).unwrap();
        progress.advance_story();
        progress.add_hint_for(Some("Anagram"));
        store.save_progress(&progress).unwrap();

        let doc_progress = store.load_progress_for_user("u1").unwrap();
        assert_eq!(doc_progress, progress);
        assert!(store.load_progress_for_user("u2").is_none());
    }

    #[test]
    fn test_leaderboard_round_trip_overwrites() {
        let (_dir, store) = temp_store();
        let mut board = Leaderboard::new();
        board.add_or_replace(LeaderboardEntry::new("Alice", Difficulty::Easy, 100));
        board.add_or_replace(LeaderboardEntry::new("Bob", Difficulty::Hard, 250));
        store.save_leaderboard(&board).unwrap();

        board.add_or_replace(LeaderboardEntry::new("Alice", Difficulty::Easy, 300));
        store.save_leaderboard(&board).unwrap();

        let loaded = store.get_leaderboard();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.entries()[0].username, "Alice");
        assert_eq!(loaded.entries()[0].value, 300);
    }

    #[test]
    fn test_rooms_round_trip() {
        let (_dir, store) = temp_store();
        let doc = sample_game_doc();
        store.write_game(&doc).unwrap();

        let rooms = store.get_rooms();
        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].id, "room1");
        assert_eq!(rooms[0].puzzles.len(), 3);
        assert_eq!(rooms[0].puzzles[0].kind, PuzzleKind::Word);
        assert_eq!(rooms[0].puzzles[0].reward_letter.as_deref(), Some("C"));
        assert_eq!(rooms[0].puzzles[0].hints().len(), 2);
        assert_eq!(rooms[1].puzzles[0].kind, PuzzleKind::Audio);
        assert_eq!(store.timer_seconds(Difficulty::Medium), Some(1500));
        assert!(!store.get_story().is_empty());
    }

    #[test]
    fn test_save_rooms_fills_defaults() {
        let (_dir, store) = temp_store();
        store.save_rooms(&[Room::new("room1", "Study")]).unwrap();
        let doc = store.read_game();
        assert_eq!(doc.rooms.len(), 1);
        assert_eq!(doc.difficulties.len(), 3);
        assert_eq!(doc.timer.get("hard"), Some(&1200));
        assert!(doc.story.contains_key("intro"));
    }

    #[test]
    fn test_unknown_category_reads_as_word() {
        let (dir, store) = temp_store();
        let json = r#"{"rooms":[{"roomID":"room1","title":"T","puzzles":[
            {"id":"p1","category":"???","title":"X","solution":"s"}]}]}"#;
        fs::write(dir.path().join(GAME_FILE), json).unwrap();
        assert_eq!(store.get_rooms()[0].puzzles[0].kind, PuzzleKind::Word);
    }

    #[test]
    fn test_saved_game_returns_most_recent() {
        let (_dir, store) = temp_store();
        let first = SavedData {
            room: "room1".to_string(),
            score: 10,
            hints: 0,
            puzzle: "p1".to_string(),
            extra: BTreeMap::new(),
        };
        let mut second = first.clone();
        second.room = "room2".to_string();
        second
            .extra
            .insert("letters".to_string(), serde_json::json!(["K"]));
        store.save_game(&first).unwrap();
        store.save_game(&second).unwrap();

        let loaded = store.load_saved_game().unwrap();
        assert_eq!(loaded.room, "room2");
        assert_eq!(loaded.extra["letters"], serde_json::json!(["K"]));
    }

    #[test]
    fn test_delete_user() {
        let (_dir, store) = temp_store();
        store.save_user(&User::new("u1", "Alice", "pw")).unwrap();
        assert!(store.delete_user("alice").unwrap());
        assert!(!store.delete_user("alice").unwrap());
        assert!(store.get_users().is_empty());
    }
}
