use serde::{Deserialize, Serialize};

use crate::engine::error::EngineError;
use crate::model::turn_record::{OptionId, TurnOption, TurnRecord};

/// Capital every company starts with, in ten-thousands.
pub const STARTING_CAPITAL: i64 = 1000;
pub const STARTING_MARKET_SHARE: i64 = 0;

pub(crate) const OVERFLOW_REASON: &str = "deltas overflow the running totals";

/// A narrated turn and, once the player has acted, the option they picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub record: TurnRecord,
    pub chosen_option: Option<OptionId>,
}

/// Authoritative state of one game session.
///
/// Only [`GameState::apply`], [`GameState::record_choice`] and
/// [`GameState::reset`] mutate it; every other access is read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    history: Vec<HistoryEntry>,
    capital: i64,
    market_share: i64,
    game_over: bool,
    current_options: Vec<TurnOption>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            history: Vec::new(),
            capital: STARTING_CAPITAL,
            market_share: STARTING_MARKET_SHARE,
            game_over: false,
            current_options: Vec::new(),
        }
    }
}

impl GameState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialize(&mut self) {
        *self = Self::default();
    }

    pub fn reset(&mut self) {
        self.initialize();
    }

    pub fn capital(&self) -> i64 {
        self.capital
    }

    pub fn market_share(&self) -> i64 {
        self.market_share
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn current_options(&self) -> &[TurnOption] {
        &self.current_options
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }

    /// 1-based number of the turn currently on screen, 0 before the opening.
    pub fn turn_number(&self) -> usize {
        self.history.len()
    }

    /// Checks that `id` is one of the options on offer without mutating.
    pub fn ensure_offered(&self, id: OptionId) -> Result<(), EngineError> {
        if self.current_options.iter().any(|o| o.id == id) {
            Ok(())
        } else if self.current_options.is_empty() {
            Err(EngineError::InvalidChoice(format!(
                "option {} cannot be chosen: no options are on offer",
                id
            )))
        } else {
            Err(EngineError::InvalidChoice(format!(
                "option {} is not on offer",
                id
            )))
        }
    }

    /// Attaches the player's choice to the most recent turn.
    pub fn record_choice(&mut self, id: OptionId) -> Result<(), EngineError> {
        self.ensure_offered(id)?;

        // Options are only on offer after at least one turn was applied
        if let Some(latest) = self.history.last_mut() {
            latest.chosen_option = Some(id);
        }
        Ok(())
    }

    /// Capital and market share after applying `record`, or `None` when
    /// either sum leaves the `i64` range.
    pub fn totals_after(&self, record: &TurnRecord) -> Option<(i64, i64)> {
        Some((
            self.capital.checked_add(record.money_delta)?,
            self.market_share.checked_add(record.market_share_delta)?,
        ))
    }

    /// Appends a narrated turn and applies its deltas.
    pub fn apply(&mut self, record: TurnRecord) -> Result<(), EngineError> {
        if self.game_over {
            return Err(EngineError::GameOver);
        }
        let Some((capital, market_share)) = self.totals_after(&record) else {
            return Err(EngineError::MalformedResponse {
                reason: OVERFLOW_REASON.to_string(),
                raw: String::new(),
            });
        };

        self.capital = capital;
        self.market_share = market_share;
        self.current_options = record.options().to_vec();
        self.history.push(HistoryEntry {
            record,
            chosen_option: None,
        });

        if self.capital <= 0 {
            self.game_over = true;
            self.current_options.clear();
        }

        Ok(())
    }
}
