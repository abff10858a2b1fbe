//! Statistical Profiler - turns raw records into a [`StatisticalProfile`].
//!
//! Pure and synchronous: identical record sets always yield identical profiles
//! (apart from `generated_at`).

use chrono::Utc;
use std::collections::HashMap;
use tracing::debug;

use super::profile::{
    AgeBand, Funnel, FunnelStage, GeographicEquity, IssueSeverity, LevelCount,
    NeighborhoodPerformance, ParticipationBreakdown, ReliabilityTier, SatisfactionProfile,
    SatisfactionStats, StatisticalProfile,
};
use super::stats::{conversion_label, margin_of_error, mean, percent, std_dev};
use crate::models::{ParticipationIntent, Record, SatisfactionLevel};

/// Response rate (percent) under which a neighborhood is flagged.
pub const LOW_RESPONSE_THRESHOLD: f64 = 30.0;

const RESPONSE_WEIGHT: f64 = 0.4;
const ENGAGEMENT_WEIGHT: f64 = 0.3;
const SATISFACTION_WEIGHT: f64 = 0.3;

const UNKNOWN_LABEL: &str = "Não informado";

/// (label, inclusive lower bound, inclusive upper bound)
const AGE_BANDS: &[(&str, u32, u32)] = &[
    ("16-24", 0, 24),
    ("25-34", 25, 34),
    ("35-44", 35, 44),
    ("45-59", 45, 59),
    ("60+", 60, u32::MAX),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct StatisticalProfiler;

impl StatisticalProfiler {
    pub fn new() -> Self {
        Self
    }

    pub fn profile(&self, records: &[Record]) -> StatisticalProfile {
        let total = records.len();
        let responded = records.iter().filter(|r| r.responded()).count();
        let clicked = records.iter().filter(|r| r.clicked()).count();

        let profile = StatisticalProfile {
            total_records: total,
            responded,
            response_rate: percent(responded, total),
            engagement_rate: percent(clicked, total),
            satisfaction: satisfaction_profile(records),
            equity: geographic_equity(records),
            issues: issue_ranking(records),
            funnel: funnel(records),
            participation: participation(records),
            age_bands: age_bands(records),
            generated_at: Utc::now(),
        };
        debug!("Profile built: {}", profile.summary());
        profile
    }
}

fn satisfaction_profile(records: &[Record]) -> SatisfactionProfile {
    let levels: Vec<SatisfactionLevel> = records.iter().filter_map(Record::satisfaction).collect();
    let weights: Vec<f64> = levels.iter().map(SatisfactionLevel::weight).collect();

    let (Some(mean), Some(std_dev)) = (mean(&weights), std_dev(&weights)) else {
        return SatisfactionProfile::InsufficientData;
    };

    let n = weights.len();
    let margin = margin_of_error(std_dev, n);
    let distribution = SatisfactionLevel::ALL
        .iter()
        .map(|level| {
            let count = levels.iter().filter(|l| *l == level).count();
            LevelCount {
                level: level.label().to_string(),
                count,
                percent: percent(count, n),
            }
        })
        .collect();

    SatisfactionProfile::Measured(SatisfactionStats {
        responses: n,
        mean,
        std_dev,
        margin_of_error: margin,
        ci_low: (mean - margin).max(1.0),
        ci_high: (mean + margin).min(5.0),
        reliability: ReliabilityTier::for_sample(n),
        distribution,
        dissatisfied: levels.iter().filter(|l| l.is_dissatisfied()).count(),
        satisfied: levels.iter().filter(|l| l.is_satisfied()).count(),
    })
}

/// Groups items by key, preserving the order in which keys first appear.
fn group_in_order<'a, K, F>(records: &'a [Record], key: F) -> Vec<(String, Vec<&'a Record>)>
where
    K: Into<String>,
    F: Fn(&'a Record) -> Option<K>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&Record>)> = Vec::new();
    for record in records {
        let Some(k) = key(record) else { continue };
        let k = k.into();
        match index.get(&k) {
            Some(&i) => groups[i].1.push(record),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![record]));
            }
        }
    }
    groups
}

/// Weighted neighborhood score on 0-100.
pub fn performance_score(response_rate: f64, engagement_rate: f64, avg_satisfaction: Option<f64>) -> f64 {
    let satisfaction_term = avg_satisfaction.map(|s| s / 5.0 * 100.0).unwrap_or(0.0);
    RESPONSE_WEIGHT * response_rate
        + ENGAGEMENT_WEIGHT * engagement_rate
        + SATISFACTION_WEIGHT * satisfaction_term
}

fn geographic_equity(records: &[Record]) -> GeographicEquity {
    let mut neighborhoods: Vec<NeighborhoodPerformance> = group_in_order(records, |r| {
        let name = r.neighborhood.trim();
        Some(if name.is_empty() { UNKNOWN_LABEL } else { name })
    })
    .into_iter()
    .map(|(name, group)| {
        let total = group.len();
        let responded = group.iter().filter(|r| r.responded()).count();
        let clicked = group.iter().filter(|r| r.clicked()).count();
        let weights: Vec<f64> = group
            .iter()
            .filter_map(|r| r.satisfaction())
            .map(|l| l.weight())
            .collect();
        let dissatisfied = group
            .iter()
            .filter_map(|r| r.satisfaction())
            .filter(|l| l.is_dissatisfied())
            .count();
        let response_rate = percent(responded, total);
        let engagement_rate = percent(clicked, total);
        let avg_satisfaction = mean(&weights);

        NeighborhoodPerformance {
            name,
            total,
            responded,
            clicked,
            dissatisfied,
            response_rate,
            engagement_rate,
            avg_satisfaction,
            performance_score: performance_score(response_rate, engagement_rate, avg_satisfaction),
            low_response: response_rate < LOW_RESPONSE_THRESHOLD,
        }
    })
    .collect();

    neighborhoods.sort_by(|a, b| {
        b.performance_score
            .partial_cmp(&a.performance_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let equity_gap = match (neighborhoods.first(), neighborhoods.last()) {
        (Some(best), Some(worst)) => best.performance_score - worst.performance_score,
        _ => 0.0,
    };

    GeographicEquity {
        neighborhoods,
        equity_gap,
    }
}

fn issue_ranking(records: &[Record]) -> Vec<IssueSeverity> {
    let mut issues: Vec<IssueSeverity> =
        group_in_order(records, |r| r.survey.as_ref().map(|s| s.issue.label()))
            .into_iter()
            .map(|(issue, group)| {
                let levels: Vec<SatisfactionLevel> =
                    group.iter().filter_map(|r| r.satisfaction()).collect();
                let count = levels.len();
                let severities: Vec<f64> = levels.iter().map(SatisfactionLevel::severity).collect();
                let avg_severity = mean(&severities).unwrap_or(0.0);
                IssueSeverity {
                    issue,
                    count,
                    avg_severity,
                    priority_score: avg_severity * count as f64,
                    dissatisfied: levels.iter().filter(|l| l.is_dissatisfied()).count(),
                }
            })
            .collect();

    // Stable: equal scores keep first-occurrence order.
    issues.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    issues
}

fn funnel(records: &[Record]) -> Funnel {
    let registered = records.len();
    let contacted = records.iter().filter(|r| r.was_contacted()).count();
    let clicked = records.iter().filter(|r| r.clicked()).count();
    let responded = records.iter().filter(|r| r.responded()).count();

    let stages = vec![
        FunnelStage {
            stage: "registered".to_string(),
            count: registered,
            conversion: if registered == 0 { "0".to_string() } else { "100.0".to_string() },
        },
        FunnelStage {
            stage: "contacted".to_string(),
            count: contacted,
            conversion: conversion_label(contacted, registered),
        },
        FunnelStage {
            stage: "clicked".to_string(),
            count: clicked,
            conversion: conversion_label(clicked, contacted),
        },
        FunnelStage {
            stage: "responded".to_string(),
            count: responded,
            conversion: conversion_label(responded, clicked),
        },
    ];

    Funnel {
        registered,
        contacted,
        clicked,
        responded,
        stages,
        overall_conversion: conversion_label(responded, registered),
    }
}

fn participation(records: &[Record]) -> ParticipationBreakdown {
    let intents: Vec<ParticipationIntent> = records.iter().filter_map(Record::participation).collect();
    let yes = intents.iter().filter(|p| **p == ParticipationIntent::Yes).count();
    let no = intents.iter().filter(|p| **p == ParticipationIntent::No).count();
    ParticipationBreakdown {
        yes,
        no,
        unknown: intents.len() - yes - no,
        interest_rate: percent(yes, intents.len()),
    }
}

fn age_bands(records: &[Record]) -> Vec<AgeBand> {
    let band_of = |record: &Record| -> &'static str {
        record
            .age
            .and_then(|age| {
                AGE_BANDS
                    .iter()
                    .find(|(_, low, high)| age >= *low && age <= *high)
                    .map(|(label, _, _)| *label)
            })
            .unwrap_or(UNKNOWN_LABEL)
    };

    AGE_BANDS
        .iter()
        .map(|(label, _, _)| *label)
        .chain(std::iter::once(UNKNOWN_LABEL))
        .filter_map(|label| {
            let group: Vec<&Record> = records.iter().filter(|r| band_of(r) == label).collect();
            if group.is_empty() {
                return None;
            }
            let responded = group.iter().filter(|r| r.responded()).count();
            let weights: Vec<f64> = group
                .iter()
                .filter_map(|r| r.satisfaction())
                .map(|l| l.weight())
                .collect();
            Some(AgeBand {
                band: label.to_string(),
                total: group.len(),
                responded,
                response_rate: percent(responded, group.len()),
                avg_satisfaction: mean(&weights),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeliveryStatus, IssueCategory, SurveyResponse};

    fn answered(id: &str, hood: &str, issue: IssueCategory, level: SatisfactionLevel) -> Record {
        Record::new(id, format!("Pessoa {}", id), hood, "+55 11 90000-0000")
            .with_delivery("sms", DeliveryStatus::Delivered)
            .with_survey(SurveyResponse::new(issue, level))
    }

    #[test]
    fn test_zero_records_is_insufficient_data() {
        let profile = StatisticalProfiler::new().profile(&[]);

        assert!(profile.is_insufficient());
        assert_eq!(profile.equity.equity_gap, 0.0);
        assert!(profile.issues.is_empty());
        assert_eq!(profile.funnel.overall_conversion, "0");
        assert!(profile.funnel.stages.iter().all(|s| s.conversion == "0"));
    }

    #[test]
    fn test_satisfaction_interval() {
        let records: Vec<Record> = (0..4)
            .map(|i| {
                let level = if i % 2 == 0 {
                    SatisfactionLevel::Dissatisfied
                } else {
                    SatisfactionLevel::Satisfied
                };
                answered(&i.to_string(), "Centro", IssueCategory::Health, level)
            })
            .collect();

        let profile = StatisticalProfiler::new().profile(&records);
        let stats = profile.satisfaction.stats().expect("measured");

        assert_eq!(stats.responses, 4);
        assert!((stats.mean - 3.0).abs() < 1e-9);
        assert!((stats.std_dev - 1.0).abs() < 1e-9);
        assert!((stats.margin_of_error - 0.98).abs() < 1e-9);
        assert_eq!(stats.reliability, ReliabilityTier::Low);
        assert_eq!(stats.dissatisfied, 2);
    }

    #[test]
    fn test_reliability_tiers() {
        assert_eq!(ReliabilityTier::for_sample(30), ReliabilityTier::High);
        assert_eq!(ReliabilityTier::for_sample(29), ReliabilityTier::Moderate);
        assert_eq!(ReliabilityTier::for_sample(15), ReliabilityTier::Moderate);
        assert_eq!(ReliabilityTier::for_sample(14), ReliabilityTier::Low);
    }

    #[test]
    fn test_issue_ranking_ties_keep_first_occurrence() {
        let records = vec![
            answered("1", "A", IssueCategory::Transport, SatisfactionLevel::Dissatisfied),
            answered("2", "A", IssueCategory::Health, SatisfactionLevel::Dissatisfied),
            answered("3", "A", IssueCategory::Security, SatisfactionLevel::VeryDissatisfied),
            answered("4", "A", IssueCategory::Security, SatisfactionLevel::VeryDissatisfied),
        ];

        let issues = StatisticalProfiler::new().profile(&records).issues;
        let order: Vec<&str> = issues.iter().map(|i| i.issue.as_str()).collect();

        assert_eq!(order, vec!["Segurança", "Transporte", "Saúde"]);
        assert_eq!(issues[0].priority_score, 10.0);
        assert_eq!(issues[1].priority_score, 4.0);
    }

    #[test]
    fn test_funnel_conversion_labels() {
        let records = vec![
            answered("1", "A", IssueCategory::Health, SatisfactionLevel::Neutral),
            Record::new("2", "B", "A", "+55 11 90000-0000").with_delivery("sms", DeliveryStatus::Delivered).with_click(),
            Record::new("3", "C", "A", "+55 11 90000-0000").with_delivery("sms", DeliveryStatus::Failed),
            Record::new("4", "D", "A", "+55 11 90000-0000"),
        ];

        let funnel = StatisticalProfiler::new().profile(&records).funnel;

        assert_eq!(funnel.registered, 4);
        assert_eq!(funnel.contacted, 3);
        assert_eq!(funnel.clicked, 2);
        assert_eq!(funnel.responded, 1);
        assert_eq!(funnel.stages[1].conversion, "75.0");
        assert_eq!(funnel.stages[2].conversion, "66.7");
        assert_eq!(funnel.stages[3].conversion, "50.0");
        assert_eq!(funnel.overall_conversion, "25.0");
    }

    #[test]
    fn test_performance_score_weights() {
        assert!((performance_score(100.0, 100.0, Some(5.0)) - 100.0).abs() < 1e-9);
        assert!((performance_score(50.0, 0.0, None) - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_age_bands_skip_empty() {
        let records = vec![
            Record::new("1", "A", "X", "+55 11 90000-0000").with_age(19),
            Record::new("2", "B", "X", "+55 11 90000-0000").with_age(70),
            Record::new("3", "C", "X", "+55 11 90000-0000"),
        ];
        let bands = StatisticalProfiler::new().profile(&records).age_bands;
        let labels: Vec<&str> = bands.iter().map(|b| b.band.as_str()).collect();
        assert_eq!(labels, vec!["16-24", "60+", "Não informado"]);
    }
}
