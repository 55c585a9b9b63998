//! Model layer
//!
//! Conversation types, the `ChatModel` abstraction, and the Ollama client

pub mod client;
pub mod model;
pub mod parsers;
pub mod types;

pub use model::{
    AssistantTurn, ChatModel, ModelError, ModelInfo, ModelName, ModelProvider, ModelRole,
    StreamPart,
};
