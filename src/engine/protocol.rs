use std::path::PathBuf;

use crate::engine::error::EngineError;
use crate::model::game_state::GameState;
use crate::model::turn_record::TurnRecord;

pub enum EngineCommand {
    /// `None` requests the opening turn.
    Advance(Option<String>),
    Reset,
    Save(PathBuf),
    Load(PathBuf),
    Shutdown,
}

pub enum EngineResponse {
    TurnApplied {
        record: TurnRecord,
        state: GameState,
    },

    TurnFailed {
        error: EngineError,
        state: GameState,
    },

    /// The state was replaced wholesale (reset or load).
    StateReplaced {
        state: GameState,
        notice: String,
    },

    Notice(String),
}
