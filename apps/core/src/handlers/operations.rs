//! Operations handler: delivery pipeline status computed straight from the records.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Handler, HandlerContext, HandlerResult, StructuredReport};
use crate::brain::profiler::LOW_RESPONSE_THRESHOLD;
use crate::brain::stats::percent;
use crate::error::AppError;
use crate::models::{DeliveryStatus, Record};

const UNASSIGNED_PROVIDER: &str = "unassigned";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStats {
    pub provider: String,
    pub sent: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Delivered over sent, percent.
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationsReport {
    pub registered: usize,
    pub sent: usize,
    pub delivered: usize,
    pub failed: usize,
    pub pending: usize,
    pub clicked: usize,
    pub responded: usize,
    pub delivery_rate: f64,
    pub failure_rate: f64,
    /// Responded over sent, percent.
    pub response_rate: f64,
    /// Providers in first-seen order.
    pub providers: Vec<ProviderStats>,
}

impl OperationsReport {
    pub fn from_records(records: &[Record]) -> Self {
        let sent = records.iter().filter(|r| r.was_contacted()).count();
        let delivered = records.iter().filter(|r| r.was_delivered()).count();
        let failed = records.iter().filter(|r| r.delivery_failed()).count();
        let pending = records
            .iter()
            .filter(|r| r.delivery_status == DeliveryStatus::Pending && !r.was_contacted())
            .count();
        let clicked = records.iter().filter(|r| r.clicked()).count();
        let responded = records.iter().filter(|r| r.responded()).count();

        Self {
            registered: records.len(),
            sent,
            delivered,
            failed,
            pending,
            clicked,
            responded,
            delivery_rate: percent(delivered, sent),
            failure_rate: percent(failed, sent),
            response_rate: percent(responded, sent),
            providers: provider_stats(records),
        }
    }

    /// Provider with the highest success rate, first seen on ties.
    pub fn best_provider(&self) -> Option<&ProviderStats> {
        self.providers
            .iter()
            .filter(|p| p.sent > 0)
            .fold(None, |best: Option<&ProviderStats>, p| match best {
                Some(b) if b.success_rate >= p.success_rate => Some(b),
                _ => Some(p),
            })
    }
}

fn provider_stats(records: &[Record]) -> Vec<ProviderStats> {
    let mut order: Vec<String> = Vec::new();
    let mut by_provider: HashMap<String, Vec<&Record>> = HashMap::new();
    for record in records.iter().filter(|r| r.was_contacted()) {
        let name = record
            .provider
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(UNASSIGNED_PROVIDER)
            .to_string();
        if !by_provider.contains_key(&name) {
            order.push(name.clone());
        }
        by_provider.entry(name).or_default().push(record);
    }

    order
        .into_iter()
        .map(|provider| {
            let group = by_provider.remove(&provider).unwrap_or_default();
            let sent = group.len();
            let delivered = group.iter().filter(|r| r.was_delivered()).count();
            ProviderStats {
                failed: group.iter().filter(|r| r.delivery_failed()).count(),
                success_rate: percent(delivered, sent),
                provider,
                sent,
                delivered,
            }
        })
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OperationsHandler;

impl OperationsHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Handler for OperationsHandler {
    fn name(&self) -> &'static str {
        "operations"
    }

    fn handle(&self, ctx: &HandlerContext<'_>) -> Result<HandlerResult, AppError> {
        let report = OperationsReport::from_records(ctx.records);

        if report.registered == 0 {
            let mut result =
                HandlerResult::new(self.name(), "No records are available for operational status.");
            result.report = Some(StructuredReport::Operations(report));
            return Ok(result);
        }

        let summary = format!(
            "Operational status: {} registered, {} invitations sent, {} delivered ({:.1}%), {} failed, {} surveys completed.",
            report.registered,
            report.sent,
            report.delivered,
            report.delivery_rate,
            report.failed,
            report.responded
        );
        let mut result = HandlerResult::new(self.name(), summary);

        result.insights.push(format!(
            "Funnel: {} registered → {} sent → {} delivered → {} clicked → {} responded.",
            report.registered, report.sent, report.delivered, report.clicked, report.responded
        ));
        for provider in &report.providers {
            result.insights.push(format!(
                "Provider {}: {} of {} delivered ({:.1}% success), {} failed.",
                provider.provider,
                provider.delivered,
                provider.sent,
                provider.success_rate,
                provider.failed
            ));
        }

        if report.failed > 0 {
            result.insights.push(format!(
                "{} deliveries failed ({:.1}% of sent messages).",
                report.failed, report.failure_rate
            ));
            let retry_via = report
                .best_provider()
                .map(|p| format!(" via {} ({:.1}% success)", p.provider, p.success_rate))
                .unwrap_or_default();
            result.recommendations.push(format!(
                "Retry the {} failed deliveries{} within 24 hours and verify the phone numbers.",
                report.failed, retry_via
            ));
        }
        if report.sent > 0 && report.response_rate < LOW_RESPONSE_THRESHOLD {
            result.insights.push(format!(
                "Response rate is {:.1}% of contacted residents, below the 30% target.",
                report.response_rate
            ));
            result.recommendations.push(
                "Schedule a second invitation wave this week at a different time of day."
                    .to_string(),
            );
        }
        let gap = report.clicked.saturating_sub(report.responded);
        if gap > 0 {
            result.insights.push(format!(
                "{} residents opened the survey without completing it.",
                gap
            ));
            result.recommendations.push(format!(
                "Send a completion reminder to those {} residents within 48 hours.",
                gap
            ));
        }
        if report.pending > 0 {
            result.recommendations.push(format!(
                "{} registered residents have not been contacted yet; include them in the next dispatch.",
                report.pending
            ));
        }

        result.report = Some(StructuredReport::Operations(report));
        Ok(result)
    }
}
