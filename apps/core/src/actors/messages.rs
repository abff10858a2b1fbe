use crate::error::GenerationError;
use std::time::Duration;
use tokio::sync::oneshot;

/// Messages that can be sent to the generation actor.
#[derive(Debug)]
pub enum GenerationMessage {
    /// A request to generate a complete text response.
    Generate {
        system_prompt: String,
        user_prompt: String,
        /// Budget for the HTTP round trip.
        timeout: Duration,
        /// A channel to send the final `String` result back.
        responder: oneshot::Sender<Result<String, GenerationError>>,
    },
    /// Stops the actor after in-flight requests finish.
    Shutdown,
}
