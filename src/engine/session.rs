use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::engine::engine::TurnEngine;
use crate::engine::llm_client::Narrator;
use crate::engine::protocol::{EngineCommand, EngineResponse};
use crate::model::game_save::GameSave;
use crate::model::game_state::GameState;

/// One player session: a game state and the engine that advances it.
///
/// Commands are handled strictly in arrival order, so at most one turn is
/// ever in flight for the state this session owns.
pub struct Session<N> {
    rx: Receiver<EngineCommand>,
    tx: Sender<EngineResponse>,
    engine: TurnEngine<N>,
    state: GameState,
}

impl<N: Narrator> Session<N> {
    pub fn new(
        rx: Receiver<EngineCommand>,
        tx: Sender<EngineResponse>,
        narrator: N,
    ) -> Self {
        Self {
            rx,
            tx,
            engine: TurnEngine::new(narrator),
            state: GameState::new(),
        }
    }

    pub fn run(&mut self) {
        while let Ok(cmd) = self.rx.recv() {
            let response = match cmd {
                EngineCommand::Advance(choice) => {
                    match self.engine.advance(&mut self.state, choice.as_deref()) {
                        Ok(record) => EngineResponse::TurnApplied {
                            record,
                            state: self.state.clone(),
                        },
                        Err(error) => {
                            tracing::info!(%error, "turn failed");
                            EngineResponse::TurnFailed {
                                error,
                                state: self.state.clone(),
                            }
                        }
                    }
                }

                EngineCommand::Reset => {
                    self.state.reset();
                    tracing::info!("game reset");
                    EngineResponse::StateReplaced {
                        state: self.state.clone(),
                        notice: "New game started.".to_string(),
                    }
                }

                EngineCommand::Save(path) => match GameSave::new(&self.state).write_to(&path) {
                    Ok(()) => EngineResponse::Notice(format!("Saved to {}", path.display())),
                    Err(e) => EngineResponse::Notice(format!("Could not save: {}", e)),
                },

                EngineCommand::Load(path) => match GameSave::read_from(&path) {
                    Ok(save) => {
                        self.state = save.state;
                        tracing::info!(path = %path.display(), "game loaded");
                        EngineResponse::StateReplaced {
                            state: self.state.clone(),
                            notice: format!("Loaded {}", path.display()),
                        }
                    }
                    Err(e) => EngineResponse::Notice(format!("Could not load: {}", e)),
                },

                EngineCommand::Shutdown => break,
            };

            if self.tx.send(response).is_err() {
                // Front end hung up
                break;
            }
        }
    }
}

/// Handle to a session running on its own worker thread.
pub struct SessionHandle {
    pub commands: Sender<EngineCommand>,
    pub responses: Receiver<EngineResponse>,
    worker: JoinHandle<()>,
}

impl SessionHandle {
    pub fn spawn<N>(narrator: N) -> Self
    where
        N: Narrator + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (resp_tx, resp_rx) = mpsc::channel();

        let worker = thread::spawn(move || {
            let mut session = Session::new(cmd_rx, resp_tx, narrator);
            session.run();
        });

        Self {
            commands: cmd_tx,
            responses: resp_rx,
            worker,
        }
    }

    /// Sends a command and blocks until its response arrives.
    pub fn request(&self, cmd: EngineCommand) -> Option<EngineResponse> {
        self.commands.send(cmd).ok()?;
        self.responses.recv().ok()
    }

    pub fn shutdown(self) {
        let _ = self.commands.send(EngineCommand::Shutdown);
        let _ = self.worker.join();
    }
}
