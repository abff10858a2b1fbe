use crate::error::GenerationError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Defines the public interface for an external text-generation model.
///
/// Implementations must honour `timeout` as an upper bound for the whole call
/// and report an overrun as [`GenerationError::Timeout`]. A single attempt is
/// made per call; retries are the caller's decision.
#[async_trait]
pub trait TextGenerationService: Send + Sync + 'static {
    /// Generates a complete text response for a system and user prompt pair.
    async fn generate(
        &self,
        system_prompt: String,
        user_prompt: String,
        timeout: Duration,
    ) -> Result<String, GenerationError>;

    /// Model identifier recorded in response provenance.
    fn model_name(&self) -> String {
        "unknown".to_string()
    }
}

#[async_trait]
impl<T: TextGenerationService + ?Sized> TextGenerationService for Arc<T> {
    async fn generate(
        &self,
        system_prompt: String,
        user_prompt: String,
        timeout: Duration,
    ) -> Result<String, GenerationError> {
        (**self).generate(system_prompt, user_prompt, timeout).await
    }

    fn model_name(&self) -> String {
        (**self).model_name()
    }
}
