use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::game_state::GameState;

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("save file is not valid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported save version {0}")]
    UnsupportedVersion(u32),
}

/// On-disk snapshot of a whole game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSave {
    pub version: u32,
    pub state: GameState,
}

impl GameSave {
    pub fn new(state: &GameState) -> Self {
        Self {
            version: SAVE_VERSION,
            state: state.clone(),
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<(), SaveError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, SaveError> {
        let text = fs::read_to_string(path)?;
        let save: GameSave = serde_json::from_str(&text)?;
        if save.version != SAVE_VERSION {
            return Err(SaveError::UnsupportedVersion(save.version));
        }
        Ok(save)
    }
}
