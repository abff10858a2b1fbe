use std::io;
use thiserror::Error;

/// Application-wide error type, consolidating all possible errors into a single enum.
#[derive(Debug, Error)]
pub enum AppError {
    /// The record store could not be reached or returned unusable data.
    #[error("Store error: {0}")]
    Store(String),

    /// Represents errors originating from the database, typically from `sqlx`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Represents data validation errors (e.g., invalid input format).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Represents configuration-related errors (e.g., missing environment variables).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Represents unexpected internal errors that indicate a bug.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Represents errors from operations that did not complete in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            AppError::Store(s) => AppError::Store(s.clone()),
            AppError::Database(e) => AppError::Database(sqlx::Error::Protocol(e.to_string())),
            AppError::Io(e) => AppError::Io(io::Error::new(e.kind(), e.to_string())),
            AppError::Validation(s) => AppError::Validation(s.clone()),
            AppError::Config(s) => AppError::Config(s.clone()),
            AppError::Internal(s) => AppError::Internal(s.clone()),
            AppError::Timeout(s) => AppError::Timeout(s.clone()),
        }
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(format!("Operation timed out: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Config(format!("Validation errors: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Io(io::Error::other(format!("HTTP error: {}", err)))
    }
}

/// Failure modes of the external text-generation service.
///
/// Every variant is non-fatal for the query pipeline: the caller keeps the
/// data-grounded draft and records the failure in provenance.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// The call did not complete within its time budget.
    #[error("Generation timed out after {0} ms")]
    Timeout(u64),

    /// The service answered with an error or an unusable payload.
    #[error("Generation service failed: {0}")]
    Service(String),

    /// The service is not reachable (actor stopped, no credential).
    #[error("Generation service unavailable: {0}")]
    Unavailable(String),
}

/// Why an enhancement attempt did not produce adopted text.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EnhancementError {
    /// No generation credential is configured.
    #[error("enhancement not configured")]
    NotConfigured,

    /// The intent must stay fully data-driven.
    #[error("enhancement skipped for {0} intent")]
    SkippedForIntent(&'static str),

    /// The generation call failed or timed out.
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The generated text did not pass the quality gate.
    #[error("enhancement rejected: {reason}")]
    Rejected {
        reason: String,
        assessment: crate::enhancement::quality::QualityAssessment,
    },
}

impl EnhancementError {
    /// Short machine-readable label for provenance.
    pub fn label(&self) -> &'static str {
        match self {
            EnhancementError::NotConfigured => "not_configured",
            EnhancementError::SkippedForIntent(_) => "skipped_for_intent",
            EnhancementError::Generation(GenerationError::Timeout(_)) => "timeout",
            EnhancementError::Generation(_) => "service_error",
            EnhancementError::Rejected { .. } => "rejected",
        }
    }
}
