use crate::actors::messages::GenerationMessage;
use crate::actors::traits::TextGenerationService;
use crate::config::EngineConfig;
use crate::error::GenerationError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{error, info, warn};

/// A handle to the generation actor.
///
/// This struct provides a public, cloneable interface for sending requests to
/// the running actor, which talks to an OpenAI-compatible
/// `/chat/completions` endpoint.
#[derive(Clone)]
pub struct LlmActorHandle {
    sender: mpsc::Sender<GenerationMessage>,
    model: String,
}

impl LlmActorHandle {
    /// Creates a new actor from configuration and returns a handle to it.
    ///
    /// Returns `None` when no credential is configured; enhancement is then
    /// disabled rather than attempted without authentication.
    pub fn from_config(config: &EngineConfig) -> Option<Self> {
        let api_key = config.generation_api_key.clone().filter(|k| !k.trim().is_empty())?;
        Some(Self::new(
            config.generation_url.clone(),
            api_key,
            config.generation_model.clone(),
        ))
    }

    /// Spawns the actor runner in a new Tokio task.
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let client = Arc::new(ChatCompletionClient {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.clone(),
        });
        let actor = LlmActorRunner { receiver, client };
        tokio::spawn(async move { actor.run().await });
        Self { sender, model }
    }

    /// Asks the actor to stop accepting requests.
    pub async fn shutdown(&self) {
        let _ = self.sender.send(GenerationMessage::Shutdown).await;
    }
}

#[async_trait]
impl TextGenerationService for LlmActorHandle {
    async fn generate(
        &self,
        system_prompt: String,
        user_prompt: String,
        budget: Duration,
    ) -> Result<String, GenerationError> {
        let (send, recv) = oneshot::channel();
        let msg = GenerationMessage::Generate {
            system_prompt,
            user_prompt,
            timeout: budget,
            responder: send,
        };

        self.sender
            .send(msg)
            .await
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;
        timeout(budget, recv)
            .await
            .map_err(|_| GenerationError::Timeout(budget.as_millis() as u64))?
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }
}

// --- Constants ---
const TEMPERATURE: f64 = 0.3;
const MAX_TOKENS: u32 = 900;

/// HTTP side of the actor, shared by the per-request tasks.
struct ChatCompletionClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatCompletionClient {
    fn build_request(&self, payload: &serde_json::Value) -> Result<reqwest::RequestBuilder, GenerationError> {
        let mut headers = HeaderMap::new();
        let auth_value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| GenerationError::Unavailable(format!("Invalid credential: {}", e)))?;
        headers.insert(AUTHORIZATION, auth_value);

        Ok(self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .headers(headers)
            .json(payload))
    }

    async fn complete(
        &self,
        system_prompt: String,
        user_prompt: String,
        budget: Duration,
    ) -> Result<String, GenerationError> {
        info!(
            "Generation request: model={}, prompt_chars={}",
            self.model,
            user_prompt.len()
        );

        let payload = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "temperature": TEMPERATURE,
            "max_tokens": MAX_TOKENS,
            "stream": false
        });

        let budget_ms = budget.as_millis() as u64;
        let request_future = self.build_request(&payload)?.send();
        let res = timeout(budget, request_future)
            .await
            .map_err(|_| GenerationError::Timeout(budget_ms))?
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Timeout(budget_ms)
                } else {
                    GenerationError::Service(format!("HTTP error: {}", e))
                }
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GenerationError::Service(format!(
                "Completion request failed with status {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = res
            .json()
            .await
            .map_err(|e| GenerationError::Service(e.to_string()))?;

        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .unwrap_or_default();
        if content.is_empty() {
            return Err(GenerationError::Service("Completion returned no content".to_string()));
        }
        Ok(content.to_string())
    }
}

// --- Actor Runner (Internal Logic) ---
struct LlmActorRunner {
    receiver: mpsc::Receiver<GenerationMessage>,
    client: Arc<ChatCompletionClient>,
}

impl LlmActorRunner {
    async fn run(mut self) {
        info!("Generation actor started (model: {})", self.client.model);

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                GenerationMessage::Generate {
                    system_prompt,
                    user_prompt,
                    timeout,
                    responder,
                } => {
                    // Requests are independent; one slow completion must not queue the rest.
                    let client = Arc::clone(&self.client);
                    tokio::spawn(async move {
                        let result = client.complete(system_prompt, user_prompt, timeout).await;
                        if let Err(e) = &result {
                            warn!("Generation failed: {}", e);
                        }
                        if responder.send(result).is_err() {
                            error!("Generation caller went away before the response arrived");
                        }
                    });
                }
                GenerationMessage::Shutdown => break,
            }
        }

        info!("Generation actor stopped");
    }
}
