//! Wire-format parsers for model servers

pub mod ollama;

pub use ollama::NdjsonBuffer;
