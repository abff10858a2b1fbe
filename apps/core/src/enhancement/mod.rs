//! Enhancement Gate - optional model rewrite of a handler draft.
//!
//! The gate makes a single generation call, scores the output against the
//! rubric in [`quality`] and only hands back text that passes the adoption
//! rule. A rejected answer that is missing figures, actions or statistical
//! context gets a deterministic splice built from the profile and is scored
//! again.

pub mod prompts;
pub mod quality;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, instrument, warn};

use crate::actors::traits::TextGenerationService;
use crate::brain::{Intent, QueryAnalysis, StatisticalProfile};
use crate::error::{EnhancementError, GenerationError};
use crate::handlers::{HandlerResult, ResidentRow};

use quality::{passes_adoption, QualityAssessment, QualityScorer};

/// Hard cap on residents embedded in a prompt.
pub const MAX_SAMPLE: usize = 10;

/// Where adopted text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementSource {
    Model,
    /// Model text completed by the deterministic splice.
    Fallback,
}

/// An adopted enhancement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enhancement {
    pub text: String,
    pub source: EnhancementSource,
    pub model: String,
    pub assessment: QualityAssessment,
}

pub struct EnhancementGate<G> {
    service: Option<G>,
    timeout: Duration,
    sample_limit: usize,
    scorer: QualityScorer,
}

impl<G: TextGenerationService> EnhancementGate<G> {
    /// `service = None` disables enhancement.
    pub fn new(service: Option<G>, timeout: Duration, sample_limit: usize) -> Self {
        Self {
            service,
            timeout,
            sample_limit: sample_limit.clamp(1, MAX_SAMPLE),
            scorer: QualityScorer::new(),
        }
    }

    pub fn model_name(&self) -> Option<String> {
        self.service.as_ref().map(|s| s.model_name())
    }

    #[instrument(skip_all, fields(intent = %analysis.intent))]
    pub async fn enhance(
        &self,
        query: &str,
        analysis: &QueryAnalysis,
        profile: &StatisticalProfile,
        draft: &HandlerResult,
    ) -> Result<Enhancement, EnhancementError> {
        let service = self.service.as_ref().ok_or(EnhancementError::NotConfigured)?;
        if analysis.intent == Intent::Operations {
            return Err(EnhancementError::SkippedForIntent(Intent::Operations.label()));
        }

        let sample = sample_residents(draft, self.sample_limit);
        let prompt = prompts::build(query, analysis, profile, draft, &sample);

        let generated = timeout(
            self.timeout,
            service.generate(prompt.system, prompt.user, self.timeout),
        )
        .await
        .map_err(|_| GenerationError::Timeout(self.timeout.as_millis() as u64))??;
        let text = generated.trim().to_string();

        let numbers = profile.headline_numbers();
        let model = service.model_name();

        let assessment = self.scorer.assess(&text, &numbers);
        info!(
            "Enhancement scored {} ({}), failed checks: {:?}",
            assessment.score,
            assessment.level.label(),
            assessment.failed_checks
        );
        let rejection = match passes_adoption(&assessment, &text, draft) {
            Ok(()) => {
                return Ok(Enhancement {
                    text,
                    source: EnhancementSource::Model,
                    model,
                    assessment,
                })
            }
            Err(reason) => reason,
        };

        if assessment.has_spliceable_failure() {
            let spliced = splice(&text, profile, draft);
            let spliced_assessment = self.scorer.assess(&spliced, &numbers);
            if passes_adoption(&spliced_assessment, &spliced, draft).is_ok() {
                info!(
                    "Spliced enhancement adopted at {} ({})",
                    spliced_assessment.score,
                    spliced_assessment.level.label()
                );
                return Ok(Enhancement {
                    text: spliced,
                    source: EnhancementSource::Fallback,
                    model,
                    assessment: spliced_assessment,
                });
            }
        }

        warn!("Enhancement rejected: {}", rejection);
        Err(EnhancementError::Rejected {
            reason: rejection,
            assessment,
        })
    }
}

/// Residents shown to the model, taken from the head of the draft's rows.
pub fn sample_residents(draft: &HandlerResult, limit: usize) -> Vec<ResidentRow> {
    draft.residents.iter().take(limit.min(MAX_SAMPLE)).cloned().collect()
}

/// Appends data, recommendation and statistical blocks taken from the profile and draft.
pub fn splice(text: &str, profile: &StatisticalProfile, draft: &HandlerResult) -> String {
    let data = format!(
        "Data context: {} registered residents, {} survey responses ({:.1}% response rate).",
        profile.total_records, profile.responded, profile.response_rate
    );
    let recommendation = draft
        .recommendations
        .first()
        .map(|r| format!("Recommendation: {}", r))
        .unwrap_or_else(|| {
            "Recommendation: review these figures with the outreach team within 7 days.".to_string()
        });
    let statistical = match profile.satisfaction.stats() {
        Some(stats) => format!(
            "Statistical context: average satisfaction {:.2}/5, ±{:.2} at 95% confidence (n={}, {} reliability).",
            stats.mean,
            stats.margin_of_error,
            stats.responses,
            stats.reliability.label()
        ),
        None => "Statistical context: no survey responses yet, so no confidence interval can be computed."
            .to_string(),
    };
    format!("{}\n\n{}\n{}\n{}", text.trim_end(), data, recommendation, statistical)
}
