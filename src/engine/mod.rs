pub mod engine;
pub mod error;
pub mod protocol;
pub mod session;

pub mod prompt_builder;
pub mod llm_client;
pub mod turn_parser;
