//! Actor-backed collaborators.
//!
//! - `traits`: the [`TextGenerationService`] seam
//! - `messages`: actor mailbox messages
//! - `llm`: HTTP generation actor for OpenAI-compatible endpoints

pub mod llm;
pub mod messages;
pub mod traits;

pub use llm::LlmActorHandle;
pub use traits::TextGenerationService;
