use crate::engine::error::EngineError;
use crate::engine::llm_client::Narrator;
use crate::engine::prompt_builder::{PlayerInput, TurnContext};
use crate::engine::turn_parser::parse_turn;
use crate::model::game_state::{GameState, OVERFLOW_REASON};
use crate::model::turn_record::{OptionId, TurnRecord};

/// Extra narrator calls allowed after an unusable reply.
pub const MALFORMED_RETRIES: usize = 1;

/// Runs one game step at a time against a [`Narrator`].
///
/// The engine holds no game state of its own: callers own the
/// [`GameState`] and must not issue two `advance` calls on it concurrently.
pub struct TurnEngine<N> {
    narrator: N,
}

impl<N: Narrator> TurnEngine<N> {
    pub fn new(narrator: N) -> Self {
        Self { narrator }
    }

    pub fn narrator(&self) -> &N {
        &self.narrator
    }

    /// Plays one turn.
    ///
    /// `choice` is `None` only for the opening turn. On any error `state` is
    /// left exactly as it was.
    pub fn advance(
        &self,
        state: &mut GameState,
        choice: Option<&str>,
    ) -> Result<TurnRecord, EngineError> {
        if state.is_game_over() {
            return Err(EngineError::GameOver);
        }

        let input = resolve_input(state, choice)?;
        let context = TurnContext::from_state(state, input);
        tracing::debug!(?input, recent = context.recent.len(), "requesting turn");

        let record = self.request_record(state, &context)?;

        if !record.dimension.is_canonical() {
            tracing::debug!(label = %record.dimension, "non-PESTEL dimension label kept as-is");
        }

        if let PlayerInput::Choice(id) = input {
            state.record_choice(id)?;
        }
        state.apply(record.clone())?;

        tracing::info!(
            turn = state.turn_number(),
            capital = state.capital(),
            market_share = state.market_share(),
            dimension = %record.dimension,
            game_over = state.is_game_over(),
            "turn applied"
        );

        Ok(record)
    }

    /// Calls the narrator until a reply parses into a record that `state` can
    /// absorb, or the retry budget is spent. Transport failures are returned
    /// immediately.
    fn request_record(
        &self,
        state: &GameState,
        context: &TurnContext,
    ) -> Result<TurnRecord, EngineError> {
        let mut context = context.clone();
        let mut attempt = 0;

        loop {
            let raw = self.narrator.generate(&context)?;

            let reason = match parse_turn(&raw) {
                Ok(record) => {
                    let record = normalize_opening(record, context.input);
                    if state.totals_after(&record).is_some() {
                        return Ok(record);
                    }
                    OVERFLOW_REASON.to_string()
                }
                Err(e) => e.to_string(),
            };

            if attempt < MALFORMED_RETRIES {
                tracing::warn!(%reason, attempt, "unusable narrator reply, retrying");
                attempt += 1;
                context = context.reinforced();
            } else {
                tracing::warn!(%reason, "unusable narrator reply, giving up");
                return Err(EngineError::MalformedResponse { reason, raw });
            }
        }
    }
}

/// Capital only moves after the opening turn.
fn normalize_opening(record: TurnRecord, input: PlayerInput) -> TurnRecord {
    if input == PlayerInput::Opening
        && (record.money_delta != 0 || record.market_share_delta != 0)
    {
        tracing::warn!(
            money = record.money_delta,
            share = record.market_share_delta,
            "ignoring deltas on the opening turn"
        );
        record.without_deltas()
    } else {
        record
    }
}

/// Validates the player's input against the options on offer.
fn resolve_input(state: &GameState, choice: Option<&str>) -> Result<PlayerInput, EngineError> {
    match choice {
        None if state.current_options().is_empty() => Ok(PlayerInput::Opening),
        None => Err(EngineError::InvalidChoice(
            "a choice between the offered options is required".to_string(),
        )),
        Some(raw) => {
            let id: OptionId = raw.parse().map_err(EngineError::InvalidChoice)?;
            state.ensure_offered(id)?;
            Ok(PlayerInput::Choice(id))
        }
    }
}
