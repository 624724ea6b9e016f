use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use colored::Colorize;

use crate::engine::error::EngineError;
use crate::engine::protocol::{EngineCommand, EngineResponse};
use crate::engine::session::SessionHandle;
use crate::model::game_state::GameState;
use crate::model::turn_record::TurnRecord;

/// A line typed by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Anything not recognized as a command; the engine validates it.
    Choice(String),
    Retry,
    Reset,
    Save(PathBuf),
    Load(PathBuf),
    Help,
    Quit,
    Empty,
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_lowercase().as_str() {
        "" => Input::Empty,
        "retry" => Input::Retry,
        "reset" => Input::Reset,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        "save" if !rest.is_empty() => Input::Save(PathBuf::from(rest)),
        "load" if !rest.is_empty() => Input::Load(PathBuf::from(rest)),
        _ => Input::Choice(line.to_string()),
    }
}

pub fn render_status(state: &GameState) -> String {
    let dimension = state
        .latest()
        .map(|e| e.record.dimension.to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "Turn {} | Capital: {} | Market share: {}% | PESTEL: {}",
        state.turn_number(),
        state.capital(),
        state.market_share(),
        dimension
    )
}

fn signed(value: i64) -> String {
    if value > 0 {
        format!("+{}", value).green().to_string()
    } else if value < 0 {
        value.to_string().red().to_string()
    } else {
        "0".to_string()
    }
}

pub fn render_turn(record: &TurnRecord, state: &GameState) -> String {
    let mut out = String::new();

    if state.turn_number() > 1 {
        out.push_str(&format!(
            "Capital {}   Market share {}\n",
            signed(record.money_delta),
            signed(record.market_share_delta)
        ));
    }
    if !record.analysis.trim().is_empty() {
        out.push_str(&format!("{}\n\n", record.analysis.trim().italic()));
    }

    out.push_str(&format!("{}\n", record.dimension.label().bold()));
    out.push_str(&format!("{}\n\n", record.story.trim()));

    if state.is_game_over() {
        out.push_str(&format!(
            "{}\n",
            "GAME OVER: the company ran out of capital. Type 'reset' to start again."
                .red()
                .bold()
        ));
    } else {
        for option in record.options() {
            out.push_str(&format!("  {}) {}\n", option.id.as_str().bold(), option.text));
        }
    }

    out.push_str(&format!("\n{}\n", render_status(state).dimmed()));
    out
}

pub fn render_failure(error: &EngineError) -> String {
    let mut out = format!("{}\n", error.to_string().yellow());

    if let Some(raw) = error.raw_response() {
        out.push_str("Narrator said:\n");
        out.push_str(raw);
        out.push('\n');
    }
    if error.is_retryable() {
        out.push_str("Type 'retry' to ask again.\n");
    }
    out
}

const HELP: &str = "\
Commands:
  A / B / C      pick an option
  retry          repeat the last request after a failure
  reset          start a new game
  save <path>    save the game to a file
  load <path>    load a saved game
  quit           leave";

/// What a displayed response means for the input loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Applied,
    Failed { retryable: bool },
    Replaced { needs_opening: bool },
    Other,
}

/// A freshly reset or loaded game still waits for its opening turn.
fn needs_opening(state: &GameState) -> bool {
    state.history().is_empty() && !state.is_game_over()
}

/// The advance that `retry` repeats. Only a retryable failure arms it, so a
/// mistyped choice in between leaves the pending retry alone.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct RetrySlot {
    choice: Option<String>,
    armed: bool,
}

impl RetrySlot {
    fn note(&mut self, choice: Option<String>, outcome: Outcome) {
        match outcome {
            Outcome::Applied | Outcome::Replaced { .. } => self.armed = false,
            Outcome::Failed { retryable: true } => {
                self.choice = choice;
                self.armed = true;
            }
            Outcome::Failed { retryable: false } | Outcome::Other => {}
        }
    }

    fn pending(&self) -> Option<Option<String>> {
        self.armed.then(|| self.choice.clone())
    }
}

fn show(response: Option<EngineResponse>) -> Outcome {
    match response {
        Some(EngineResponse::TurnApplied { record, state }) => {
            println!("\n{}", render_turn(&record, &state));
            Outcome::Applied
        }
        Some(EngineResponse::TurnFailed { error, .. }) => {
            print!("\n{}", render_failure(&error));
            Outcome::Failed {
                retryable: error.is_retryable(),
            }
        }
        Some(EngineResponse::StateReplaced { state, notice }) => {
            println!("{}", notice.cyan());
            if let Some(latest) = state.latest() {
                println!("\n{}", render_turn(&latest.record, &state));
            }
            Outcome::Replaced {
                needs_opening: needs_opening(&state),
            }
        }
        Some(EngineResponse::Notice(notice)) => {
            println!("{}", notice.cyan());
            Outcome::Other
        }
        None => {
            println!("{}", "The game engine stopped.".red());
            Outcome::Other
        }
    }
}

/// Line-oriented game loop. Each request blocks until answered, so the
/// player can never have two turns in flight.
pub fn run(session: &SessionHandle) -> anyhow::Result<()> {
    println!("{}", "PESTEL market-entry simulator".bold());
    println!("You are the CEO of an electric-scooter company entering Meridia.");
    println!("{}\n", "Type 'help' for commands.".dimmed());

    let mut retry = RetrySlot::default();
    advance(session, &mut retry, None);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        print!("{} ", ">".bold());
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };

        match parse_input(&line?) {
            Input::Empty => {}
            Input::Help => println!("{}", HELP),
            Input::Quit => break,
            Input::Choice(choice) => advance(session, &mut retry, Some(choice)),
            Input::Retry => match retry.pending() {
                Some(choice) => advance(session, &mut retry, choice),
                None => println!("Nothing to retry."),
            },
            Input::Reset => replace(session, &mut retry, EngineCommand::Reset),
            Input::Save(path) => {
                show(session.request(EngineCommand::Save(path)));
            }
            Input::Load(path) => replace(session, &mut retry, EngineCommand::Load(path)),
        }
    }

    Ok(())
}

fn advance(session: &SessionHandle, retry: &mut RetrySlot, choice: Option<String>) {
    println!("{}", "The narrator is thinking...".dimmed());
    let outcome = show(session.request(EngineCommand::Advance(choice.clone())));
    retry.note(choice, outcome);
}

/// Sends a reset or load and starts the opening turn if the new game has none.
fn replace(session: &SessionHandle, retry: &mut RetrySlot, command: EngineCommand) {
    let outcome = show(session.request(command));
    retry.note(None, outcome);
    if outcome == (Outcome::Replaced { needs_opening: true }) {
        advance(session, retry, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::error::NarratorError;
    use crate::model::turn_record::PestelDimension;
    use pretty_assertions::assert_eq;

    fn record(money: i64) -> TurnRecord {
        TurnRecord::new(
            "Battery recycling rules tighten.",
            money,
            0,
            "Bold move.",
            PestelDimension::Environmental,
            ["recycle".into(), "outsource".into(), "appeal".into()],
        )
    }

    #[test]
    fn commands_are_recognized() {
        assert_eq!(parse_input("  RESET "), Input::Reset);
        assert_eq!(parse_input("retry"), Input::Retry);
        assert_eq!(parse_input("save my game.json"), Input::Save("my game.json".into()));
        assert_eq!(parse_input("load a.json"), Input::Load("a.json".into()));
        assert_eq!(parse_input(""), Input::Empty);
        assert_eq!(parse_input("quit"), Input::Quit);
    }

    #[test]
    fn everything_else_is_a_choice() {
        assert_eq!(parse_input(" b "), Input::Choice("b".into()));
        assert_eq!(parse_input("Z"), Input::Choice("Z".into()));
        assert_eq!(parse_input("save"), Input::Choice("save".into()));
    }

    #[test]
    fn status_line_shows_totals() {
        let mut state = GameState::new();
        assert!(render_status(&state).contains("Capital: 1000"));

        state.apply(record(0)).unwrap();
        let status = render_status(&state);
        assert!(status.contains("Turn 1"));
        assert!(status.contains("Environmental"));
    }

    #[test]
    fn turn_lists_options_until_game_over() {
        let mut state = GameState::new();
        state.apply(record(0)).unwrap();
        let rendered = render_turn(&record(0), &state);
        assert!(rendered.contains("outsource"));

        state.record_choice(crate::model::turn_record::OptionId::A).unwrap();
        state.apply(record(-2000)).unwrap();
        let rendered = render_turn(&record(-2000), &state);
        assert!(rendered.contains("GAME OVER"));
        assert!(!rendered.contains("outsource"));
    }

    #[test]
    fn malformed_failure_shows_raw_text() {
        let error = EngineError::MalformedResponse {
            reason: "no balanced JSON object found".into(),
            raw: "I cannot comply".into(),
        };
        let rendered = render_failure(&error);
        assert!(rendered.contains("I cannot comply"));
        assert!(rendered.contains("retry"));

        let rendered = render_failure(&EngineError::from(NarratorError::Auth("401".into())));
        assert!(!rendered.contains("Narrator said"));
    }

    #[test]
    fn invalid_choice_keeps_the_pending_retry() {
        let mut retry = RetrySlot::default();
        assert_eq!(retry.pending(), None);

        retry.note(Some("B".into()), Outcome::Failed { retryable: true });
        retry.note(Some("Z".into()), Outcome::Failed { retryable: false });
        retry.note(None, Outcome::Other);

        assert_eq!(retry.pending(), Some(Some("B".into())));
    }

    #[test]
    fn applied_turn_or_new_game_clears_the_retry() {
        let mut retry = RetrySlot::default();
        retry.note(None, Outcome::Failed { retryable: true });
        assert_eq!(retry.pending(), Some(None));

        retry.note(Some("A".into()), Outcome::Applied);
        assert_eq!(retry.pending(), None);

        retry.note(Some("C".into()), Outcome::Failed { retryable: true });
        retry.note(None, Outcome::Replaced { needs_opening: false });
        assert_eq!(retry.pending(), None);
    }

    #[test]
    fn only_unstarted_games_need_an_opening() {
        let mut state = GameState::new();
        assert!(needs_opening(&state));

        state.apply(record(0)).unwrap();
        assert!(!needs_opening(&state));

        state.reset();
        assert!(needs_opening(&state));
    }
}
