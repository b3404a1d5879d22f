//! Text-generation integration.
//!
//! The pipeline talks to language models only through [`TextGenerator`];
//! [`OpenAiTextGenerator`] is the production implementation for any
//! OpenAI-compatible chat-completions endpoint.

pub mod generation;
pub mod openai;

pub use generation::{GenerationConstraints, GenerationError, GenerationRequest, TextGenerator};
pub use openai::{OpenAiConfig, OpenAiTextGenerator};

#[cfg(test)]
pub use generation::MockTextGenerator;
