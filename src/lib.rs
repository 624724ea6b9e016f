pub mod config;
pub mod engine;
pub mod model;
pub mod ui;

pub use engine::engine::TurnEngine;
pub use engine::error::{EngineError, NarratorError};
pub use engine::llm_client::{Narrator, OpenAiNarrator};
pub use engine::prompt_builder::{PlayerInput, TurnContext};
pub use model::game_state::GameState;
pub use model::turn_record::{OptionId, PestelDimension, TurnOption, TurnRecord};
