//! "How many parks?" trivia: guess in how many of the 30 ballparks a home
//! run would have left the yard.
//!
//! A [`GameSession`] is a small state machine driven by [`Action`]s:
//!
//! ```text
//! AwaitingGuess --Guess--> Scored --NextRound--> AwaitingGuess
//!                                 \--NextRound (last round)--> GameOver
//! GameOver --Restart--> AwaitingGuess
//! ```

use std::io::{BufRead, Write};

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

use crate::record::HomeRunRecord;

pub const MAX_PARKS: i64 = 30;

// points by absolute miss: exact, off by one, ...
const POINTS: [u32; 5] = [10, 8, 6, 4, 2];

pub fn score_guess(guess: u8, actual: u8) -> u32 {
    let diff = guess.abs_diff(actual) as usize;
    POINTS.get(diff).copied().unwrap_or(0)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TurnError {
    #[error("Guess must be between 0 and 30, got {0}")]
    InvalidGuess(i64),

    #[error("Can't {action} now: {state}")]
    OutOfTurn { action: &'static str, state: &'static str },

    #[error("No home runs with a park count to ask about")]
    NoQuestions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub player: String,
    pub date: NaiveDate,
    pub team: String,
    pub opponent: String,
    pub exit_velocity: Option<f64>,
    pub distance: Option<f64>,
    pub video: Option<String>,
    actual: u8,
}

impl Question {
    fn from_record(record: &HomeRunRecord) -> Option<Self> {
        Some(Self {
            player: record.name.clone(),
            date: record.date,
            team: record.team.clone(),
            opponent: record.opponent.clone(),
            exit_velocity: record.exit_velocity,
            distance: record.distance,
            video: record.video.clone(),
            actual: record.park_count?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub player: String,
    pub date: NaiveDate,
    pub exit_velocity: Option<f64>,
    pub distance: Option<f64>,
    pub guess: u8,
    pub actual: u8,
    pub points: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameState {
    AwaitingGuess(Question),
    Scored(RoundResult),
    GameOver,
}

impl GameState {
    fn name(&self) -> &'static str {
        match self {
            GameState::AwaitingGuess(_) => "waiting for a guess",
            GameState::Scored(_) => "round already scored",
            GameState::GameOver => "game over",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Guess(i64),
    NextRound,
    Restart,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Guess(_) => "guess",
            Action::NextRound => "start the next round",
            Action::Restart => "restart",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameSession {
    pool: Vec<Question>,
    rounds: u32,
    round: u32,
    score: u32,
    history: Vec<RoundResult>,
    state: GameState,
}

impl GameSession {
    /// Start a game over the records that have a park count.
    pub fn new<R: Rng>(records: &[HomeRunRecord], rounds: u32, rng: &mut R) -> Result<Self, TurnError> {
        let pool: Vec<Question> = records.iter().filter_map(Question::from_record).collect();
        let first = pool.choose(rng).cloned().ok_or(TurnError::NoQuestions)?;

        Ok(Self {
            pool,
            rounds: rounds.max(1),
            round: 0,
            score: 0,
            history: Vec::new(),
            state: GameState::AwaitingGuess(first),
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Rounds scored so far.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn history(&self) -> &[RoundResult] {
        &self.history
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> Result<Question, TurnError> {
        self.pool.choose(rng).cloned().ok_or(TurnError::NoQuestions)
    }

    /// Apply one action. A rejected action leaves the session unchanged.
    pub fn handle<R: Rng>(&mut self, action: Action, rng: &mut R) -> Result<&GameState, TurnError> {
        let next = match (&self.state, action) {
            (GameState::AwaitingGuess(question), Action::Guess(guess)) => {
                if !(0..=MAX_PARKS).contains(&guess) {
                    return Err(TurnError::InvalidGuess(guess));
                }
                let guess = guess as u8;
                let points = score_guess(guess, question.actual);
                let result = RoundResult {
                    player: question.player.clone(),
                    date: question.date,
                    exit_velocity: question.exit_velocity,
                    distance: question.distance,
                    guess,
                    actual: question.actual,
                    points,
                };

                self.round += 1;
                self.score += points;
                self.history.push(result.clone());
                GameState::Scored(result)
            }
            (GameState::Scored(_), Action::NextRound) => {
                if self.round >= self.rounds {
                    GameState::GameOver
                } else {
                    GameState::AwaitingGuess(self.draw(rng)?)
                }
            }
            (_, Action::Restart) => {
                let question = self.draw(rng)?;
                self.round = 0;
                self.score = 0;
                self.history.clear();
                GameState::AwaitingGuess(question)
            }
            (state, action) => {
                return Err(TurnError::OutOfTurn {
                    action: action.name(),
                    state: state.name(),
                })
            }
        };

        self.state = next;
        Ok(&self.state)
    }
}

fn format_metric(value: Option<f64>, unit: &str) -> String {
    value.map(|v| format!("{v} {unit}")).unwrap_or_else(|| "?".to_string())
}

fn print_history<W: Write>(out: &mut W, history: &[RoundResult]) -> std::io::Result<()> {
    writeln!(out, "\nGame History")?;
    writeln!(out, "{:<24} {:<10} {:>10} {:>10} {:>5} {:>6} {:>6}", "Player", "Date", "Exit Velo", "Distance", "Guess", "Actual", "Points")?;
    for r in history {
        writeln!(
            out,
            "{:<24} {:<10} {:>10} {:>10} {:>5} {:>6} {:>6}",
            r.player,
            r.date,
            format_metric(r.exit_velocity, "mph"),
            format_metric(r.distance, "ft"),
            r.guess,
            r.actual,
            r.points
        )?;
    }
    Ok(())
}

/// Play in a terminal: questions and results go to `out`, guesses come from
/// `input` one per line. Ends at game over unless the player asks for another
/// game, or when `input` runs out.
pub fn play<R: Rng, I: BufRead, W: Write>(
    session: &mut GameSession,
    rng: &mut R,
    input: I,
    mut out: W,
) -> std::io::Result<()> {
    let mut lines = input.lines();

    loop {
        match session.state().clone() {
            GameState::AwaitingGuess(question) => {
                writeln!(out, "\nRound {}/{}", session.round() + 1, session.rounds())?;
                writeln!(
                    out,
                    "{} homers ({} vs {}, {})",
                    question.player, question.team, question.opponent, question.date
                )?;
                if let Some(video) = &question.video {
                    writeln!(out, "Watch: {video}")?;
                }
                write!(out, "Guess how many parks this was a HR in (0-{MAX_PARKS}): ")?;
                out.flush()?;

                let Some(line) = lines.next() else {
                    return Ok(());
                };
                let line = line?;
                let action = match line.trim().parse::<i64>() {
                    Ok(guess) => Action::Guess(guess),
                    Err(_) => {
                        writeln!(out, "Please enter a whole number.")?;
                        continue;
                    }
                };
                if let Err(e) = session.handle(action, rng) {
                    writeln!(out, "{e}")?;
                }
            }
            GameState::Scored(result) => {
                writeln!(
                    out,
                    "Actual: {}/30 parks. You guessed {} for {} points (total {}).",
                    result.actual,
                    result.guess,
                    result.points,
                    session.score()
                )?;
                if let Err(e) = session.handle(Action::NextRound, rng) {
                    writeln!(out, "{e}")?;
                    return Ok(());
                }
            }
            GameState::GameOver => {
                print_history(&mut out, session.history())?;
                writeln!(out, "\nGame Over! Total Score: {}", session.score())?;
                write!(out, "Play again? [y/N] ")?;
                out.flush()?;

                let again = match lines.next() {
                    Some(line) => line?.trim().eq_ignore_ascii_case("y"),
                    None => false,
                };
                if !again {
                    return Ok(());
                }
                if let Err(e) = session.handle(Action::Restart, rng) {
                    writeln!(out, "{e}")?;
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn record(name: &str, park_count: Option<u8>) -> HomeRunRecord {
        let mut record = HomeRunRecord::new(name, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(), "NYY", "ARI");
        record.park_count = park_count;
        record.exit_velocity = Some(112.3);
        record.distance = Some(441.0);
        record
    }

    fn session(rounds: u32) -> (GameSession, StdRng) {
        let mut rng = StdRng::seed_from_u64(7);
        let records = vec![record("Aaron Judge", Some(27)), record("No Count", None)];
        let session = GameSession::new(&records, rounds, &mut rng).unwrap();
        (session, rng)
    }

    #[test]
    fn scoring_table() {
        assert_eq!(score_guess(27, 27), 10);
        assert_eq!(score_guess(26, 27), 8);
        assert_eq!(score_guess(29, 27), 6);
        assert_eq!(score_guess(24, 27), 4);
        assert_eq!(score_guess(23, 27), 2);
        assert_eq!(score_guess(22, 27), 0);
        assert_eq!(score_guess(0, 30), 0);
    }

    #[test]
    fn only_records_with_counts_are_asked() {
        let (session, _) = session(3);
        match session.state() {
            GameState::AwaitingGuess(q) => assert_eq!(q.player, "Aaron Judge"),
            other => panic!("unexpected state {other:?}"),
        }

        let mut rng = StdRng::seed_from_u64(1);
        let err = GameSession::new(&[record("No Count", None)], 10, &mut rng).unwrap_err();
        assert_eq!(err, TurnError::NoQuestions);
    }

    #[test]
    fn invalid_guess_does_not_advance() {
        let (mut session, mut rng) = session(3);
        assert_eq!(session.handle(Action::Guess(31), &mut rng), Err(TurnError::InvalidGuess(31)));
        assert_eq!(session.handle(Action::Guess(-1), &mut rng), Err(TurnError::InvalidGuess(-1)));
        assert_eq!(session.round(), 0);
        assert!(matches!(session.state(), GameState::AwaitingGuess(_)));
    }

    #[test]
    fn out_of_turn_actions_are_rejected() {
        let (mut session, mut rng) = session(3);
        assert!(matches!(
            session.handle(Action::NextRound, &mut rng),
            Err(TurnError::OutOfTurn { .. })
        ));

        session.handle(Action::Guess(27), &mut rng).unwrap();
        assert!(matches!(
            session.handle(Action::Guess(27), &mut rng),
            Err(TurnError::OutOfTurn { .. })
        ));
        assert_eq!(session.round(), 1);
    }

    #[test]
    fn full_game_then_restart() {
        let (mut session, mut rng) = session(2);

        let state = session.handle(Action::Guess(27), &mut rng).unwrap();
        assert!(matches!(state, GameState::Scored(RoundResult { points: 10, .. })));
        session.handle(Action::NextRound, &mut rng).unwrap();

        session.handle(Action::Guess(25), &mut rng).unwrap();
        let state = session.handle(Action::NextRound, &mut rng).unwrap();
        assert_eq!(state, &GameState::GameOver);
        assert_eq!(session.score(), 16);
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[1].guess, 25);

        session.handle(Action::Restart, &mut rng).unwrap();
        assert_eq!(session.score(), 0);
        assert_eq!(session.round(), 0);
        assert!(session.history().is_empty());
        assert!(matches!(session.state(), GameState::AwaitingGuess(_)));
    }

    #[test]
    fn terminal_game_runs_to_game_over() {
        let (mut session, mut rng) = session(2);
        let input = "abc\n40\n27\n26\nn\n";
        let mut out = Vec::new();
        play(&mut session, &mut rng, input.as_bytes(), &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Please enter a whole number."));
        assert!(text.contains("Guess must be between 0 and 30, got 40"));
        assert!(text.contains("Round 2/2"));
        assert!(text.contains("Game Over! Total Score: 18"));
        assert_eq!(session.state(), &GameState::GameOver);
    }
}
