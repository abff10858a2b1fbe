//! Domain handlers and the router that dispatches to them.
//!
//! Each handler turns the classified query plus the statistical profile into
//! a data-grounded draft. The router is the failure boundary: whatever a
//! handler does wrong, the pipeline receives a well-formed [`HandlerResult`].

pub mod knowledge;
pub mod notification;
pub mod operations;

use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{error, info};

use crate::brain::{Intent, QueryAnalysis, StatisticalProfile};
use crate::error::AppError;
use crate::models::Record;

pub use knowledge::{KnowledgeHandler, KnowledgeReport, NO_SATISFACTION_DATA};
pub use notification::{NotificationHandler, Priority, ResidentRow, SegmentReport};
pub use operations::{OperationsHandler, OperationsReport};

/// Everything a handler may read. Borrowed for the duration of one query.
pub struct HandlerContext<'a> {
    pub query: &'a str,
    pub analysis: &'a QueryAnalysis,
    pub profile: &'a StatisticalProfile,
    pub records: &'a [Record],
}

/// Structured payload attached by a handler, one variant per handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructuredReport {
    Knowledge(KnowledgeReport),
    Segment(SegmentReport),
    Operations(OperationsReport),
}

/// Draft answer produced by one handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerResult {
    pub handler: String,
    pub success: bool,
    pub summary: String,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    /// Contact-level rows; only filled by the notification handler.
    pub residents: Vec<ResidentRow>,
    pub report: Option<StructuredReport>,
}

impl HandlerResult {
    pub fn new(handler: &str, summary: impl Into<String>) -> Self {
        Self {
            handler: handler.to_string(),
            success: true,
            summary: summary.into(),
            insights: Vec::new(),
            recommendations: Vec::new(),
            residents: Vec::new(),
            report: None,
        }
    }

    /// Error-shaped result: no insights, explanatory summary, `success = false`.
    pub fn failure(handler: &str, message: impl Into<String>) -> Self {
        Self {
            success: false,
            ..Self::new(handler, message)
        }
    }
}

/// A domain handler. Errors are converted by [`HandlerRouter`], never propagated.
pub trait Handler: Send + Sync {
    fn name(&self) -> &'static str;

    fn handle(&self, ctx: &HandlerContext<'_>) -> Result<HandlerResult, AppError>;
}

/// Dispatches on the primary intent.
pub struct HandlerRouter {
    knowledge: Box<dyn Handler>,
    notification: Box<dyn Handler>,
    operations: Box<dyn Handler>,
}

impl Default for HandlerRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRouter {
    pub fn new() -> Self {
        Self {
            knowledge: Box::new(KnowledgeHandler::new()),
            notification: Box::new(NotificationHandler::new()),
            operations: Box::new(OperationsHandler::new()),
        }
    }

    /// Replaces the handler for one intent.
    pub fn with_handler(mut self, intent: Intent, handler: Box<dyn Handler>) -> Self {
        match intent {
            Intent::Knowledge => self.knowledge = handler,
            Intent::Notification => self.notification = handler,
            Intent::Operations => self.operations = handler,
        }
        self
    }

    fn handler_for(&self, intent: Intent) -> &dyn Handler {
        match intent {
            Intent::Knowledge => self.knowledge.as_ref(),
            Intent::Notification => self.notification.as_ref(),
            Intent::Operations => self.operations.as_ref(),
        }
    }

    /// Runs the handler for `ctx.analysis.intent`. Never fails.
    pub fn route(&self, ctx: &HandlerContext<'_>) -> HandlerResult {
        let handler = self.handler_for(ctx.analysis.intent);
        let name = handler.name();
        info!("Routing {} query to {} handler", ctx.analysis.intent, name);

        match catch_unwind(AssertUnwindSafe(|| handler.handle(ctx))) {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!("{} handler failed: {}", name, e);
                HandlerResult::failure(
                    name,
                    format!("The {} analysis could not be completed: {}", name, e),
                )
            }
            Err(panic) => {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unexpected failure".to_string());
                error!("{} handler panicked: {}", name, detail);
                HandlerResult::failure(
                    name,
                    format!("The {} analysis could not be completed due to an internal error.", name),
                )
            }
        }
    }
}
