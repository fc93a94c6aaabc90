mod accounts;
mod ids;
mod session;
mod store;

use accounts::AccountStore;
use clap::Parser;
use escape_core::Difficulty;
use session::{HintOutcome, Session, SolveOutcome};
use std::io::{self, BufRead, Write};
use store::Store;

/// Single-player escape-room session driver
#[derive(Parser)]
#[command(name = "escape", version, about = "Escape-room puzzle game session manager")]
struct Args {
    /// Data directory holding game_data.json and player_data.json
    #[arg(long)]
    data_dir: Option<std::path::PathBuf>,

    /// Write the starter game definition and exit
    #[arg(long)]
    init: bool,
}

fn main() -> io::Result<()> {
    let args = Args::parse();
    let store = match args.data_dir {
        Some(dir) => Store::new(dir),
        None => Store::open_default(),
    };

    if args.init {
        match store.write_sample_game() {
            Ok(()) => {
                println!("Wrote starter game definition to {}", store.dir().display());
                return Ok(());
            }
            Err(e) => {
                eprintln!("Failed to write game definition: {}", e);
                std::process::exit(1);
            }
        }
    }

    let mut session = Session::new(store, AccountStore::new());
    println!("escape - type 'help' for commands");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, rest) = match line.split_once(' ') {
            Some((c, r)) => (c, r.trim()),
            None => (line, ""),
        };
        match command {
            "help" => print_help(),
            "register" => match rest.split_once(' ') {
                Some((username, password)) => {
                    report(session.create_account(username, password.trim()), "account created")
                }
                None => println!("usage: register <username> <password>"),
            },
            "login" => match rest.split_once(' ') {
                Some((username, password)) => {
                    report(session.login(username, password.trim()), "logged in")
                }
                None => println!("usage: login <username> <password>"),
            },
            "logout" => {
                session.logout();
                println!("logged out");
            }
            "delete" => match session.delete_account(rest) {
                Ok(true) => println!("account deleted"),
                Ok(false) => println!("no such account"),
                Err(e) => println!("{}", e),
            },
            "start" => {
                let difficulty = Difficulty::parse(rest);
                match session.start_game(difficulty) {
                    Ok(()) => {
                        println!("game started on {}", difficulty);
                        show_room(&session);
                    }
                    Err(e) => println!("{}", e),
                }
            }
            "room" => show_room(&session),
            "solve" => match session.solve_puzzle(rest) {
                SolveOutcome::Solved { reward } => {
                    match reward {
                        Some(letter) => println!("correct! you found the letter '{}'", letter),
                        None => println!("correct!"),
                    }
                    if let Some(text) = session.current_story_text() {
                        println!("{}", text);
                    }
                }
                SolveOutcome::Incorrect => println!("that is not it"),
                SolveOutcome::NothingToSolve => println!("this room is already cleared"),
                SolveOutcome::NoGame => println!("no game in progress"),
            },
            "hint" => match session.use_hint() {
                HintOutcome::Hint(text) => println!("hint: {}", text),
                HintOutcome::NothingToHint => println!("nothing to hint here"),
                HintOutcome::NoGame => println!("no game in progress"),
            },
            "move" => {
                if session.move_to_room(rest) {
                    show_room(&session);
                } else {
                    println!("no room named '{}'", rest);
                }
            }
            "pause" => {
                session.pause_game();
                println!("paused");
            }
            "resume" => {
                session.resume_game();
                println!("resumed");
            }
            "time" => println!("{} seconds remaining", session.get_time_remaining()),
            "letters" => {
                let letters: Vec<String> = session.collected_letters().into_iter().collect();
                println!("collected: [{}]", letters.join(", "));
            }
            "progress" => match session.progress() {
                Some(p) => println!(
                    "story {}/{} ({:.0}%), {} answered, {} hints",
                    p.story_pos(),
                    escape_core::TOTAL_BEATS,
                    p.completion_percent(),
                    p.questions_answered(),
                    p.hints_used()
                ),
                None => println!("no game in progress"),
            },
            "save" => report(session.save_game(), "game saved"),
            "load" => match session.load_game() {
                Ok(true) => {
                    println!("game restored (paused; 'resume' to continue)");
                    show_room(&session);
                }
                Ok(false) => println!("no saved game found"),
                Err(e) => println!("{}", e),
            },
            "end" => match session.end_game() {
                Ok(value) => println!("final score: {}", value),
                Err(e) => println!("{}", e),
            },
            "top" => {
                let n = rest.parse().unwrap_or(10);
                let board = session.leaderboard();
                if board.is_empty() {
                    println!("leaderboard is empty");
                }
                for (i, entry) in board.top_n(n).iter().enumerate() {
                    println!(
                        "{:>2}. {:<16} {:>6}  ({}, {})",
                        i + 1,
                        entry.username,
                        entry.value,
                        entry.difficulty,
                        entry.date
                    );
                }
            }
            "best" => match session.best_score_for(rest) {
                Some(score) => println!(
                    "{}: {} on {} ({})",
                    score.username, score.value, score.difficulty, score.date
                ),
                None => println!("no scores recorded for '{}'", rest),
            },
            "quit" | "exit" => break,
            _ => println!("unknown command '{}'; try 'help'", command),
        }
    }

    Ok(())
}

fn report(result: Result<(), session::SessionError>, ok: &str) {
    match result {
        Ok(()) => println!("{}", ok),
        Err(e) => println!("{}", e),
    }
}

fn show_room(session: &Session) {
    match session.current_room() {
        Some(room) => {
            println!(
                "{} - {} ({}/{} solved)",
                room.id,
                room.title,
                room.solved_count(),
                room.puzzles.len()
            );
            match room.first_unsolved() {
                Some(puzzle) => {
                    println!("current puzzle: {}", puzzle.title);
                    if !puzzle.objective.is_empty() {
                        println!("  {}", puzzle.objective);
                    }
                    if !puzzle.prompt.is_empty() {
                        println!("  {}", puzzle.prompt);
                    }
                }
                None => println!("room cleared: 'move' on, or 'end' the game"),
            }
        }
        None => println!("no game in progress"),
    }
}

fn print_help() {
    println!("accounts:  register <u> <p> | login <u> <p> | logout | delete <u>");
    println!("game:      start [easy|medium|hard] | room | solve <answer> | hint");
    println!("           move <roomID> | pause | resume | time | letters | progress");
    println!("data:      save | load | end | top [n] | best <username>");
    println!("other:     help | quit");
}
