use crate::model::game_state::GameState;
use crate::model::turn_record::OptionId;

/// Number of past turns the narrator gets to see.
pub const HISTORY_WINDOW: usize = 3;

pub const OPENING_SENTINEL: &str =
    "The game begins. Present the first Political (政治) scenario.";

/// What the player did this turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    Opening,
    Choice(OptionId),
}

/// Compacted view of one past turn: story and chosen option only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub story: String,
    pub chosen_option: Option<OptionId>,
}

/// Everything the narrator receives for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnContext {
    pub recent: Vec<ContextEntry>,
    pub input: PlayerInput,
    /// Set on the retry after an unusable reply.
    pub reinforce: bool,
}

impl TurnContext {
    /// Builds the bounded context for `input` from the tail of the history.
    pub fn from_state(state: &GameState, input: PlayerInput) -> Self {
        let history = state.history();
        let skip = history.len().saturating_sub(HISTORY_WINDOW);

        let recent = history[skip..]
            .iter()
            .map(|entry| ContextEntry {
                story: entry.record.story.clone(),
                chosen_option: entry.chosen_option,
            })
            .collect();

        Self {
            recent,
            input,
            reinforce: false,
        }
    }

    pub fn reinforced(&self) -> Self {
        Self {
            reinforce: true,
            ..self.clone()
        }
    }
}

/// The two chat messages sent for a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Formats a [`TurnContext`] into prompt text.
/// Only formats: no parsing, no networking.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(context: &TurnContext) -> Prompt {
        let mut system = String::new();
        push_system_prompt(&mut system);
        push_output_contract(&mut system);

        let mut user = String::new();
        push_recent_history(&mut user, context);
        push_player_input(&mut user, context.input);
        if context.reinforce {
            push_reinforcement(&mut user);
        }

        Prompt { system, user }
    }
}

fn push_system_prompt(prompt: &mut String) {
    prompt.push_str(
        "You are the host of an international business simulation game.\n\
         The player is the CEO of an electric-scooter company trying to enter \
         the fictional country of Meridia.\n\n",
    );
    prompt.push_str("RULES:\n");
    prompt.push_str(
        "1. Each turn presents one concrete business dilemma drawn from the PESTEL \
         model: Political, Economic, Social, Technological, Environmental, Legal.\n",
    );
    prompt.push_str("2. Always offer exactly 3 options labelled A, B and C, each with real risk and reward.\n");
    prompt.push_str(
        "3. After the player chooses, judge the consequences of that choice as a change \
         in capital (in ten-thousands) and in market share (percentage points), \
         with a short analysis.\n",
    );
    prompt.push_str("4. Then move straight on to the dilemma of the next PESTEL dimension.\n");
    prompt.push_str(
        "5. Starting capital is 1000. The first scenario is Political: an upcoming \
         election threatens new import tariffs.\n",
    );
    prompt.push_str("Keep the tone professional and compact.\n\n");
}

fn push_output_contract(prompt: &mut String) {
    prompt.push_str("OUTPUT FORMAT:\n");
    prompt.push_str("Reply with a single JSON object and nothing else:\n");
    prompt.push_str(
        r#"{
  "story": string,
  "money_change": integer,
  "market_share_change": integer,
  "analysis": string,
  "next_pestel": string,
  "options": [ {"id":"A","text":string}, {"id":"B","text":string}, {"id":"C","text":string} ]
}"#,
    );
    prompt.push_str("\nOn the opening turn money_change and market_share_change are 0.\n");
}

fn push_recent_history(prompt: &mut String, context: &TurnContext) {
    if context.recent.is_empty() {
        return;
    }

    prompt.push_str("RECENT TURNS:\n");
    for (i, entry) in context.recent.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n", i + 1, entry.story.trim()));
        if let Some(choice) = entry.chosen_option {
            prompt.push_str(&format!("    Player chose: {}\n", choice));
        }
    }
    prompt.push('\n');
}

fn push_player_input(prompt: &mut String, input: PlayerInput) {
    match input {
        PlayerInput::Opening => prompt.push_str(OPENING_SENTINEL),
        PlayerInput::Choice(id) => {
            prompt.push_str(&format!("PLAYER DECISION: {}", id));
        }
    }
    prompt.push('\n');
}

fn push_reinforcement(prompt: &mut String) {
    prompt.push_str(
        "\nREMINDER: your previous reply could not be read. Return ONLY the JSON object, \
         with no prose and no code fences.\n",
    );
}
