//! Shared fixtures.

use crate::actors::traits::TextGenerationService;
use crate::config::EngineConfig;
use crate::error::{AppError, GenerationError};
use crate::models::{
    DeliveryStatus, IssueCategory, ParticipationIntent, Record, SatisfactionLevel, SurveyResponse,
};
use crate::store::DataStore;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Records
// ============================================================================

pub const NEIGHBORHOODS: [&str; 3] = ["Centro", "Vila Nova", "Jardim América"];

/// Stable phone number derived from the id.
pub fn phone_for(id: &str) -> String {
    format!("+55 11 9{:04}-{:04}", id.len(), id.bytes().map(u32::from).sum::<u32>() % 10_000)
}

pub fn answered(id: &str, hood: &str, issue: IssueCategory, level: SatisfactionLevel) -> Record {
    Record::new(id, format!("Pessoa {}", id), hood, phone_for(id))
        .with_delivery("whatsapp", DeliveryStatus::Delivered)
        .with_survey(SurveyResponse::new(issue, level))
}

/// 40 respondents, 25 dissatisfied (10 very, 15 plain), interleaved in store order.
///
/// Pattern per block of 8: two very dissatisfied, three dissatisfied, then
/// neutral, satisfied, very satisfied.
pub fn campaign() -> Vec<Record> {
    (0..40)
        .map(|i| {
            let level = match i % 8 {
                0 | 1 => SatisfactionLevel::VeryDissatisfied,
                2..=4 => SatisfactionLevel::Dissatisfied,
                5 => SatisfactionLevel::Neutral,
                6 => SatisfactionLevel::Satisfied,
                _ => SatisfactionLevel::VerySatisfied,
            };
            let issue = IssueCategory::ALL[i % 5];
            let participation = match i % 3 {
                0 => ParticipationIntent::Yes,
                1 => ParticipationIntent::No,
                _ => ParticipationIntent::Unknown,
            };
            let id = format!("r{:02}", i);
            Record::new(id.clone(), format!("Pessoa {}", id), NEIGHBORHOODS[i % 3], phone_for(&id))
                .with_age(18 + (i as u32 * 3) % 60)
                .with_delivery("whatsapp", DeliveryStatus::Delivered)
                .with_survey(SurveyResponse::new(issue, level).with_participation(participation))
        })
        .collect()
}

/// Records with `n` responses alternating weights 2 and 4 (σ = 1 for even n).
pub fn alternating_responses(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| {
            let level = if i % 2 == 0 {
                SatisfactionLevel::Dissatisfied
            } else {
                SatisfactionLevel::Satisfied
            };
            answered(&format!("a{}", i), "Centro", IssueCategory::Health, level)
        })
        .collect()
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        generation_timeout_ms: 200,
        ..EngineConfig::default()
    }
}

// ============================================================================
// Stores
// ============================================================================

/// Store that always fails, for the critical-failure path.
pub struct UnreachableStore;

#[async_trait]
impl DataStore for UnreachableStore {
    async fn load_records(&self) -> Result<Vec<Record>, AppError> {
        Err(AppError::Store("connection refused".to_string()))
    }
}

/// Store that counts loads.
pub struct CountingStore {
    pub records: Vec<Record>,
    pub loads: Arc<AtomicUsize>,
}

#[async_trait]
impl DataStore for CountingStore {
    async fn load_records(&self) -> Result<Vec<Record>, AppError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }
}

// ============================================================================
// Generation services
// ============================================================================

/// Returns a fixed text and counts calls.
pub struct ScriptedGenerator {
    pub text: String,
    pub calls: Arc<AtomicUsize>,
}

impl ScriptedGenerator {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl TextGenerationService for ScriptedGenerator {
    async fn generate(
        &self,
        _system_prompt: String,
        _user_prompt: String,
        _timeout: Duration,
    ) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }

    fn model_name(&self) -> String {
        "scripted".to_string()
    }
}

/// Never answers within any reasonable budget.
pub struct StalledGenerator;

#[async_trait]
impl TextGenerationService for StalledGenerator {
    async fn generate(
        &self,
        _system_prompt: String,
        _user_prompt: String,
        _timeout: Duration,
    ) -> Result<String, GenerationError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("unreachable".to_string())
    }
}

/// Fails immediately with a service error.
pub struct FailingGenerator;

#[async_trait]
impl TextGenerationService for FailingGenerator {
    async fn generate(
        &self,
        _system_prompt: String,
        _user_prompt: String,
        _timeout: Duration,
    ) -> Result<String, GenerationError> {
        Err(GenerationError::Service("quota exceeded".to_string()))
    }
}

/// Strong outreach answer for [`campaign`]: cites 40 and 25, names a resident.
pub const STRONG_OUTREACH: &str = "Of the 40 residents surveyed, 25 are dissatisfied, and the \
average satisfaction sits well below neutral with a 95% confidence margin reported for n=40. \
We recommend that the outreach team contact Pessoa r00 and the other very dissatisfied residents \
within 48 hours, then follow up with each neighborhood group in the next 2 weeks to confirm \
whether participation in the council meetings improves.";
