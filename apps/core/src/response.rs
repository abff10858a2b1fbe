//! Response assembly: merges the draft, the enhancement outcome and provenance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::brain::Intent;
use crate::enhancement::quality::{QualityAssessment, QualityLevel};
use crate::enhancement::{Enhancement, EnhancementSource};
use crate::error::EnhancementError;
use crate::handlers::{HandlerResult, ResidentRow};

pub const BASE_CONFIDENCE: f64 = 0.7;
pub const RESIDENTS_BONUS: f64 = 0.15;
pub const EXCELLENT_BONUS: f64 = 0.10;
pub const GOOD_BONUS: f64 = 0.05;
pub const MAX_CONFIDENCE: f64 = 0.95;
pub const ERROR_CONFIDENCE: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvenanceSource {
    #[serde(rename = "handler-only")]
    HandlerOnly,
    #[serde(rename = "handler+model")]
    HandlerModel,
    #[serde(rename = "handler+fallback")]
    HandlerFallback,
}

impl ProvenanceSource {
    pub fn label(&self) -> &'static str {
        match self {
            ProvenanceSource::HandlerOnly => "handler-only",
            ProvenanceSource::HandlerModel => "handler+model",
            ProvenanceSource::HandlerFallback => "handler+fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: ProvenanceSource,
    pub handler: String,
    pub model: Option<String>,
    pub quality: Option<QualityAssessment>,
    /// Why enhancement did not apply (label and message), if it was attempted or skipped.
    pub enhancement_error: Option<String>,
}

/// What the caller receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResponse {
    pub text: String,
    pub intent: Intent,
    pub confidence: f64,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub residents: Vec<ResidentRow>,
    pub provenance: Provenance,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

/// Handler draft that was not enhanced, with the reason when one exists.
#[derive(Debug, Clone)]
pub struct DraftResponse {
    pub intent: Intent,
    pub draft: HandlerResult,
    pub enhancement_error: Option<EnhancementError>,
}

#[derive(Debug, Clone)]
pub struct EnhancedResponse {
    pub intent: Intent,
    pub draft: HandlerResult,
    pub enhancement: Enhancement,
}

/// Pipeline failure that leaves no usable draft.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    pub intent: Intent,
    pub handler: String,
    pub message: String,
}

/// Outcome of a query before assembly.
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    Draft(DraftResponse),
    Enhanced(EnhancedResponse),
    Error(ErrorResponse),
}

/// Confidence for a successful draft, before enhancement.
pub fn baseline_confidence(draft: &HandlerResult) -> f64 {
    let mut confidence = BASE_CONFIDENCE;
    if !draft.residents.is_empty() {
        confidence += RESIDENTS_BONUS;
    }
    confidence.min(MAX_CONFIDENCE)
}

fn enhancement_bonus(level: QualityLevel) -> f64 {
    match level {
        QualityLevel::Excellent => EXCELLENT_BONUS,
        QualityLevel::Good => GOOD_BONUS,
        QualityLevel::Fair | QualityLevel::Poor => 0.0,
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseAssembler;

impl ResponseAssembler {
    pub fn new() -> Self {
        Self
    }

    pub fn assemble(&self, outcome: PipelineOutcome) -> FinalResponse {
        match outcome {
            PipelineOutcome::Draft(DraftResponse {
                intent,
                draft,
                enhancement_error,
            }) => {
                if !draft.success {
                    return self.assemble(PipelineOutcome::Error(ErrorResponse {
                        intent,
                        handler: draft.handler,
                        message: draft.summary,
                    }));
                }
                let quality = match &enhancement_error {
                    Some(EnhancementError::Rejected { assessment, .. }) => Some(assessment.clone()),
                    _ => None,
                };
                FinalResponse {
                    confidence: baseline_confidence(&draft),
                    text: draft.summary,
                    intent,
                    insights: draft.insights,
                    recommendations: draft.recommendations,
                    residents: draft.residents,
                    provenance: Provenance {
                        source: ProvenanceSource::HandlerOnly,
                        handler: draft.handler,
                        model: None,
                        quality,
                        enhancement_error: enhancement_error
                            .map(|e| format!("{}: {}", e.label(), e)),
                    },
                    timestamp: Utc::now(),
                    success: true,
                }
            }
            PipelineOutcome::Enhanced(EnhancedResponse {
                intent,
                draft,
                enhancement,
            }) => {
                let confidence = (baseline_confidence(&draft)
                    + enhancement_bonus(enhancement.assessment.level))
                .min(MAX_CONFIDENCE);
                let source = match enhancement.source {
                    EnhancementSource::Model => ProvenanceSource::HandlerModel,
                    EnhancementSource::Fallback => ProvenanceSource::HandlerFallback,
                };
                FinalResponse {
                    text: enhancement.text,
                    intent,
                    confidence,
                    insights: draft.insights,
                    recommendations: draft.recommendations,
                    residents: draft.residents,
                    provenance: Provenance {
                        source,
                        handler: draft.handler,
                        model: Some(enhancement.model),
                        quality: Some(enhancement.assessment),
                        enhancement_error: None,
                    },
                    timestamp: Utc::now(),
                    success: true,
                }
            }
            PipelineOutcome::Error(ErrorResponse {
                intent,
                handler,
                message,
            }) => FinalResponse {
                text: message,
                intent,
                confidence: ERROR_CONFIDENCE,
                insights: Vec::new(),
                recommendations: Vec::new(),
                residents: Vec::new(),
                provenance: Provenance {
                    source: ProvenanceSource::HandlerOnly,
                    handler,
                    model: None,
                    quality: None,
                    enhancement_error: None,
                },
                timestamp: Utc::now(),
                success: false,
            },
        }
    }
}
