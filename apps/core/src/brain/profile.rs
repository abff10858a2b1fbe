//! Statistical Profile - derived view of the record set.
//!
//! Recomputed for every query; a pure function of the records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How far a satisfaction estimate can be trusted, by sample size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityTier {
    /// n >= 30
    High,
    /// n >= 15
    Moderate,
    Low,
}

impl ReliabilityTier {
    pub fn for_sample(n: usize) -> Self {
        if n >= 30 {
            ReliabilityTier::High
        } else if n >= 15 {
            ReliabilityTier::Moderate
        } else {
            ReliabilityTier::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReliabilityTier::High => "high",
            ReliabilityTier::Moderate => "moderate",
            ReliabilityTier::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCount {
    pub level: String,
    pub count: usize,
    pub percent: f64,
}

/// Satisfaction estimate with its 95% confidence interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatisfactionStats {
    pub responses: usize,
    /// Mean on the 1-5 scale.
    pub mean: f64,
    pub std_dev: f64,
    pub margin_of_error: f64,
    pub ci_low: f64,
    pub ci_high: f64,
    pub reliability: ReliabilityTier,
    /// Counts per level, very dissatisfied first.
    pub distribution: Vec<LevelCount>,
    pub dissatisfied: usize,
    pub satisfied: usize,
}

/// Satisfaction section of the profile. Zero responses is an explicit state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SatisfactionProfile {
    InsufficientData,
    Measured(SatisfactionStats),
}

impl SatisfactionProfile {
    pub fn stats(&self) -> Option<&SatisfactionStats> {
        match self {
            SatisfactionProfile::Measured(stats) => Some(stats),
            SatisfactionProfile::InsufficientData => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodPerformance {
    pub name: String,
    pub total: usize,
    pub responded: usize,
    pub clicked: usize,
    pub dissatisfied: usize,
    /// Percent of records with a survey.
    pub response_rate: f64,
    /// Percent of records that opened the survey link.
    pub engagement_rate: f64,
    pub avg_satisfaction: Option<f64>,
    /// Weighted 0-100 score.
    pub performance_score: f64,
    /// Response rate below 30%.
    pub low_response: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeographicEquity {
    /// Sorted by performance score, best first.
    pub neighborhoods: Vec<NeighborhoodPerformance>,
    /// Best minus worst performance score.
    pub equity_gap: f64,
}

impl GeographicEquity {
    pub fn best(&self) -> Option<&NeighborhoodPerformance> {
        self.neighborhoods.first()
    }

    pub fn worst(&self) -> Option<&NeighborhoodPerformance> {
        self.neighborhoods.last()
    }

    pub fn low_response(&self) -> impl Iterator<Item = &NeighborhoodPerformance> {
        self.neighborhoods.iter().filter(|n| n.low_response)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueSeverity {
    pub issue: String,
    pub count: usize,
    pub avg_severity: f64,
    /// `avg_severity * count`
    pub priority_score: f64,
    pub dissatisfied: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStage {
    pub stage: String,
    pub count: usize,
    /// Percent of the previous stage, one decimal; `"0"` when that stage is empty.
    pub conversion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funnel {
    pub registered: usize,
    pub contacted: usize,
    pub clicked: usize,
    pub responded: usize,
    pub stages: Vec<FunnelStage>,
    /// Responded over registered.
    pub overall_conversion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipationBreakdown {
    pub yes: usize,
    pub no: usize,
    pub unknown: usize,
    /// Percent of respondents who said yes.
    pub interest_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeBand {
    pub band: String,
    pub total: usize,
    pub responded: usize,
    pub response_rate: f64,
    pub avg_satisfaction: Option<f64>,
}

/// Complete statistical profile of the record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalProfile {
    pub total_records: usize,
    pub responded: usize,
    pub response_rate: f64,
    pub engagement_rate: f64,
    pub satisfaction: SatisfactionProfile,
    pub equity: GeographicEquity,
    /// Highest priority first.
    pub issues: Vec<IssueSeverity>,
    pub funnel: Funnel,
    pub participation: ParticipationBreakdown,
    pub age_bands: Vec<AgeBand>,
    pub generated_at: DateTime<Utc>,
}

impl StatisticalProfile {
    pub fn is_insufficient(&self) -> bool {
        matches!(self.satisfaction, SatisfactionProfile::InsufficientData)
    }

    pub fn top_issue(&self) -> Option<&IssueSeverity> {
        self.issues.first()
    }

    /// The concrete figures an answer can cite, formatted the way the drafts print them.
    pub fn headline_numbers(&self) -> Vec<String> {
        let mut numbers = vec![
            self.total_records.to_string(),
            self.responded.to_string(),
            format!("{:.1}", self.response_rate),
        ];
        if let Some(stats) = self.satisfaction.stats() {
            numbers.push(format!("{:.2}", stats.mean));
            numbers.push(format!("{:.2}", stats.margin_of_error));
            numbers.push(stats.dissatisfied.to_string());
        }
        if self.equity.neighborhoods.len() > 1 {
            numbers.push(format!("{:.1}", self.equity.equity_gap));
        }
        if let Some(issue) = self.top_issue() {
            numbers.push(issue.count.to_string());
        }
        numbers.retain(|n| n != "0" && n != "0.0" && n != "0.00");
        numbers.dedup();
        numbers
    }

    /// One-line summary for logging.
    pub fn summary(&self) -> String {
        match self.satisfaction.stats() {
            Some(stats) => format!(
                "records={}, responded={}, satisfaction={:.2}±{:.2} ({}), equity_gap={:.1}",
                self.total_records,
                self.responded,
                stats.mean,
                stats.margin_of_error,
                stats.reliability.label(),
                self.equity.equity_gap
            ),
            None => format!(
                "records={}, responded=0, satisfaction=insufficient_data",
                self.total_records
            ),
        }
    }
}
