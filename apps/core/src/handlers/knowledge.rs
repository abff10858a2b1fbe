//! Knowledge handler: analytical answers over the statistical profile.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Handler, HandlerContext, HandlerResult, StructuredReport};
use crate::brain::profile::{SatisfactionStats, StatisticalProfile};
use crate::brain::stats;
use crate::brain::{AnalysisFocus, QueryType, ReliabilityTier};
use crate::error::AppError;
use crate::models::{ParticipationIntent, Record};

/// Summary for a satisfaction question asked before anyone has answered.
pub const NO_SATISFACTION_DATA: &str = "No satisfaction data available for analysis.";

/// Average satisfaction below which the cross-analysis flags a problem.
const LOW_SATISFACTION: f64 = 3.0;
const TOP_ISSUES_SHOWN: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeReport {
    pub analyses: Vec<AnalysisFocus>,
    pub query_type: QueryType,
    pub insufficient_data: bool,
    /// Best and worst neighborhood by performance score, when compared.
    pub comparison: Option<NeighborhoodComparison>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborhoodComparison {
    pub best: String,
    pub best_score: f64,
    pub worst: String,
    pub worst_score: f64,
    pub gap: f64,
}

/// Per sub-analysis output before it is folded into the result.
#[derive(Default)]
struct Section {
    headline: Option<String>,
    insights: Vec<String>,
    recommendations: Vec<String>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct KnowledgeHandler;

impl KnowledgeHandler {
    pub fn new() -> Self {
        Self
    }

    fn satisfaction(&self, profile: &StatisticalProfile) -> Section {
        let Some(stats) = profile.satisfaction.stats() else {
            return Section {
                headline: Some(NO_SATISFACTION_DATA.to_string()),
                ..Section::default()
            };
        };

        let mut section = Section {
            headline: Some(format!(
                "Average satisfaction is {:.2}/5 (±{:.2}, 95% confidence, n={}).",
                stats.mean, stats.margin_of_error, stats.responses
            )),
            ..Section::default()
        };
        section.insights.push(format!(
            "Average satisfaction is {:.2}/5 with a 95% confidence interval of {:.2} to {:.2} (margin ±{:.2}, n={}, {} reliability).",
            stats.mean,
            stats.ci_low,
            stats.ci_high,
            stats.margin_of_error,
            stats.responses,
            stats.reliability.label()
        ));
        section.insights.push(format!(
            "{} of {} respondents ({:.1}%) are dissatisfied; {} ({:.1}%) are satisfied.",
            stats.dissatisfied,
            stats.responses,
            stats::percent(stats.dissatisfied, stats.responses),
            stats.satisfied,
            stats::percent(stats.satisfied, stats.responses)
        ));
        if stats.reliability == ReliabilityTier::Low {
            section.insights.push(format!(
                "The sample of {} responses is small; treat these figures as indicative only.",
                stats.responses
            ));
            section.recommendations.push(
                "Collect more responses over the next 2 weeks before making budget decisions."
                    .to_string(),
            );
        }
        if stats.mean < LOW_SATISFACTION {
            section.recommendations.push(format!(
                "Contact the {} dissatisfied residents within 7 days to understand their concerns.",
                stats.dissatisfied
            ));
        }
        section
    }

    fn issues(&self, profile: &StatisticalProfile) -> Section {
        let Some(top) = profile.top_issue() else {
            return Section {
                headline: Some("No issue reports have been recorded yet.".to_string()),
                ..Section::default()
            };
        };

        let mut section = Section {
            headline: Some(format!(
                "The highest-priority issue is {} ({} reports, priority score {:.1}).",
                top.issue, top.count, top.priority_score
            )),
            ..Section::default()
        };
        let ranking = profile
            .issues
            .iter()
            .take(TOP_ISSUES_SHOWN)
            .enumerate()
            .map(|(i, issue)| {
                format!(
                    "{}. {} ({} reports, severity {:.1})",
                    i + 1,
                    issue.issue,
                    issue.count,
                    issue.avg_severity
                )
            })
            .collect::<Vec<_>>()
            .join("; ");
        section.insights.push(format!("Issue priority ranking: {}.", ranking));
        if top.dissatisfied > 0 {
            section.insights.push(format!(
                "{} of the {} residents reporting {} are dissatisfied.",
                top.dissatisfied, top.count, top.issue
            ));
        }
        section.recommendations.push(format!(
            "Prioritise {} in the next 30 days' action plan; it carries the highest severity-weighted count.",
            top.issue
        ));
        section
    }

    fn neighborhoods(&self, profile: &StatisticalProfile) -> Section {
        let equity = &profile.equity;
        let (Some(best), Some(worst)) = (equity.best(), equity.worst()) else {
            return Section {
                headline: Some("No neighborhood data is available yet.".to_string()),
                ..Section::default()
            };
        };

        let mut section = Section::default();
        if equity.neighborhoods.len() == 1 {
            section.headline = Some(format!(
                "All records come from {} (performance score {:.1}).",
                best.name, best.performance_score
            ));
        } else {
            section.headline = Some(format!(
                "The geographic equity gap is {:.1} points between {} and {}.",
                equity.equity_gap, best.name, worst.name
            ));
            section.insights.push(format!(
                "{} performs best (score {:.1}, {:.1}% response rate); {} performs worst (score {:.1}, {:.1}% response rate).",
                best.name,
                best.performance_score,
                best.response_rate,
                worst.name,
                worst.performance_score,
                worst.response_rate
            ));
        }

        let low: Vec<&str> = equity.low_response().map(|n| n.name.as_str()).collect();
        if !low.is_empty() {
            section.insights.push(format!(
                "{} neighborhood(s) have a response rate below 30%: {}.",
                low.len(),
                low.join(", ")
            ));
            section.recommendations.push(format!(
                "Run a targeted outreach campaign in {} within the next 2 weeks.",
                low.join(", ")
            ));
        }
        if equity.equity_gap > 20.0 {
            section.recommendations.push(format!(
                "Reduce the {:.1}-point equity gap by replicating what works in {} in {}.",
                equity.equity_gap, best.name, worst.name
            ));
        }
        section
    }

    fn participation(&self, profile: &StatisticalProfile) -> Section {
        let p = &profile.participation;
        let answered = p.yes + p.no + p.unknown;
        if answered == 0 {
            return Section {
                headline: Some("No participation answers have been recorded yet.".to_string()),
                ..Section::default()
            };
        }

        let mut section = Section {
            headline: Some(format!(
                "{} residents ({:.1}%) want to take part in follow-up activities.",
                p.yes, p.interest_rate
            )),
            ..Section::default()
        };
        section.insights.push(format!(
            "Participation intent: {} yes, {} no, {} undecided ({:.1}% interest rate).",
            p.yes, p.no, p.unknown, p.interest_rate
        ));
        if p.yes > 0 {
            section.recommendations.push(format!(
                "Invite the {} interested residents to the next community meeting within 30 days.",
                p.yes
            ));
        }
        if p.unknown > p.yes {
            section.recommendations.push(
                "Follow up with undecided residents with concrete dates and formats for participation."
                    .to_string(),
            );
        }
        section
    }

    fn engagement(&self, profile: &StatisticalProfile) -> Section {
        let funnel = &profile.funnel;
        let mut section = Section {
            headline: Some(format!(
                "{} of {} registered residents responded ({:.1}% response rate).",
                profile.responded, profile.total_records, profile.response_rate
            )),
            ..Section::default()
        };
        let stages = funnel
            .stages
            .iter()
            .map(|s| format!("{} {} ({}%)", s.stage, s.count, s.conversion))
            .collect::<Vec<_>>()
            .join(" → ");
        section.insights.push(format!(
            "Engagement funnel: {}; overall conversion {}%.",
            stages, funnel.overall_conversion
        ));

        let lowest_band = profile
            .age_bands
            .iter()
            .filter(|b| b.total > 0)
            .min_by(|a, b| a.response_rate.total_cmp(&b.response_rate));
        if let Some(band) = lowest_band {
            section.insights.push(format!(
                "The {} age band has the lowest response rate ({:.1}% of {}).",
                band.band, band.response_rate, band.total
            ));
        }

        let abandoned = funnel.clicked.saturating_sub(funnel.responded);
        if abandoned > 0 {
            section.recommendations.push(format!(
                "Send a completion reminder within 48 hours to the {} residents who opened the survey without finishing.",
                abandoned
            ));
        }
        if profile.total_records > 0 && profile.response_rate < 30.0 {
            section.recommendations.push(format!(
                "The response rate of {:.1}% is below 30%; schedule a second invitation wave this week.",
                profile.response_rate
            ));
        }
        section
    }

    fn cross_insights(&self, profile: &StatisticalProfile, records: &[Record]) -> Vec<String> {
        let mut insights = Vec::new();
        let Some(stats) = profile.satisfaction.stats() else {
            return insights;
        };

        let low: Vec<&str> = profile
            .equity
            .low_response()
            .map(|n| n.name.as_str())
            .collect();
        if stats.mean < LOW_SATISFACTION && !low.is_empty() {
            insights.push(format!(
                "Low satisfaction ({:.2}/5) coincides with low response rates in {}; silent residents may be the least satisfied.",
                stats.mean,
                low.join(", ")
            ));
        }

        if let Some(line) = concentration_insight(profile, records) {
            insights.push(line);
        }
        if let Some(line) = participation_vs_satisfaction(stats, records) {
            insights.push(line);
        }
        insights
    }

    fn comparison(&self, profile: &StatisticalProfile) -> Option<NeighborhoodComparison> {
        let equity = &profile.equity;
        if equity.neighborhoods.len() < 2 {
            return None;
        }
        let best = equity.best()?;
        let worst = equity.worst()?;
        Some(NeighborhoodComparison {
            best: best.name.clone(),
            best_score: best.performance_score,
            worst: worst.name.clone(),
            worst_score: worst.performance_score,
            gap: equity.equity_gap,
        })
    }
}

/// Share of the top issue among the worst neighborhood's responses, when above the overall share.
fn concentration_insight(profile: &StatisticalProfile, records: &[Record]) -> Option<String> {
    let top = profile.top_issue()?;
    let worst = profile.equity.worst()?;
    if profile.equity.neighborhoods.len() < 2 || worst.responded == 0 || profile.responded == 0 {
        return None;
    }

    let in_worst = records
        .iter()
        .filter(|r| r.neighborhood.trim() == worst.name)
        .filter_map(|r| r.survey.as_ref())
        .filter(|s| s.issue.label() == top.issue)
        .count();
    let local_share = stats::percent(in_worst, worst.responded);
    let overall_share = stats::percent(top.count, profile.responded);
    if in_worst == 0 || local_share <= overall_share {
        return None;
    }
    Some(format!(
        "{} is concentrated in {}, the lowest-performing neighborhood: {:.1}% of its responses versus {:.1}% overall.",
        top.issue, worst.name, local_share, overall_share
    ))
}

fn participation_vs_satisfaction(stats: &SatisfactionStats, records: &[Record]) -> Option<String> {
    let avg_for = |intent: ParticipationIntent| {
        let weights: Vec<f64> = records
            .iter()
            .filter_map(|r| r.survey.as_ref())
            .filter(|s| s.participation == intent)
            .map(|s| s.satisfaction.weight())
            .collect();
        stats::mean(&weights)
    };
    let yes = avg_for(ParticipationIntent::Yes)?;
    let no = avg_for(ParticipationIntent::No)?;
    let relation = if yes >= no { "more" } else { "less" };
    Some(format!(
        "Residents willing to participate rate satisfaction {:.2}/5 versus {:.2}/5 for those who are not (overall mean {:.2}); engaged residents are {} satisfied.",
        yes, no, stats.mean, relation
    ))
}

impl Handler for KnowledgeHandler {
    fn name(&self) -> &'static str {
        "knowledge"
    }

    fn handle(&self, ctx: &HandlerContext<'_>) -> Result<HandlerResult, AppError> {
        let analysis = ctx.analysis;
        let profile = ctx.profile;
        let analyses = analysis.sub_analyses();
        debug!("Knowledge sub-analyses: {:?}", analyses);

        if profile.is_insufficient() && analysis.focus == AnalysisFocus::Satisfaction {
            let mut result = HandlerResult::new(self.name(), NO_SATISFACTION_DATA);
            result.recommendations.push(
                "Send the survey invitation to registered residents to start collecting responses."
                    .to_string(),
            );
            result.report = Some(StructuredReport::Knowledge(KnowledgeReport {
                analyses,
                query_type: analysis.query_type,
                insufficient_data: true,
                comparison: None,
            }));
            return Ok(result);
        }

        let mut headlines = Vec::new();
        let mut insights = Vec::new();
        let mut recommendations = Vec::new();

        let comparison = if analysis.query_type == QueryType::Comparison {
            self.comparison(profile)
        } else {
            None
        };
        if let Some(cmp) = &comparison {
            insights.push(format!(
                "Comparison: {} leads with a performance score of {:.1} versus {:.1} in {} ({:.1}-point gap).",
                cmp.best, cmp.best_score, cmp.worst_score, cmp.worst, cmp.gap
            ));
        }

        for focus in &analyses {
            let section = match focus {
                AnalysisFocus::Satisfaction => self.satisfaction(profile),
                AnalysisFocus::Issues => self.issues(profile),
                AnalysisFocus::Neighborhoods => self.neighborhoods(profile),
                AnalysisFocus::Participation => self.participation(profile),
                AnalysisFocus::Engagement => self.engagement(profile),
                AnalysisFocus::Comprehensive => Section::default(),
            };
            headlines.extend(section.headline);
            insights.extend(section.insights);
            for rec in section.recommendations {
                if !recommendations.contains(&rec) {
                    recommendations.push(rec);
                }
            }
        }

        if analyses.len() > 1 {
            insights.extend(self.cross_insights(profile, ctx.records));
        }

        let intro = if profile.is_insufficient() {
            format!(
                "Insufficient data: {} residents are registered but no survey responses have been recorded yet.",
                profile.total_records
            )
        } else {
            format!(
                "Survey analysis of {} registered residents ({} responses, {:.1}% response rate).",
                profile.total_records, profile.responded, profile.response_rate
            )
        };
        let summary = std::iter::once(intro)
            .chain(headlines)
            .collect::<Vec<_>>()
            .join(" ");

        let mut result = HandlerResult::new(self.name(), summary);
        result.insights = insights;
        result.recommendations = recommendations;
        result.report = Some(StructuredReport::Knowledge(KnowledgeReport {
            analyses,
            query_type: analysis.query_type,
            insufficient_data: profile.is_insufficient(),
            comparison,
        }));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::{IntentClassifier, StatisticalProfiler};
    use crate::models::{IssueCategory, SatisfactionLevel, SurveyResponse};

    fn run(query: &str, records: &[Record]) -> HandlerResult {
        let analysis = IntentClassifier::new().classify(query);
        let profile = StatisticalProfiler::new().profile(records);
        let ctx = HandlerContext {
            query,
            analysis: &analysis,
            profile: &profile,
            records,
        };
        KnowledgeHandler::new().handle(&ctx).unwrap()
    }

    fn answered(id: &str, hood: &str, issue: IssueCategory, level: SatisfactionLevel) -> Record {
        Record::new(id, format!("Resident {}", id), hood, "+55 11 90000-0000").with_survey(SurveyResponse::new(issue, level))
    }

    #[test]
    fn test_satisfaction_query_without_responses() {
        let records = vec![Record::new("1", "Ana", "Centro", "+55 11 90000-0000"), Record::new("2", "Bia", "Norte", "+55 11 90000-0000")];
        let result = run("Como está a satisfação dos moradores?", &records);

        assert!(result.success);
        assert_eq!(result.summary, NO_SATISFACTION_DATA);
        assert!(result.insights.is_empty());
    }

    #[test]
    fn test_satisfaction_insights_cite_interval() {
        let records: Vec<Record> = (0..20)
            .map(|i| {
                let level = if i % 2 == 0 {
                    SatisfactionLevel::Satisfied
                } else {
                    SatisfactionLevel::Dissatisfied
                };
                answered(&i.to_string(), "Centro", IssueCategory::Health, level)
            })
            .collect();
        let result = run("qual a satisfação média?", &records);

        assert!(result.summary.contains("3.00/5"));
        assert!(result.insights.iter().any(|i| i.contains("95% confidence interval")));
        assert!(result.insights.iter().any(|i| i.contains("moderate reliability")));
    }

    #[test]
    fn test_comprehensive_runs_cross_analysis() {
        let mut records = Vec::new();
        for i in 0..6 {
            records.push(answered(
                &format!("c{}", i),
                "Centro",
                IssueCategory::Education,
                SatisfactionLevel::Satisfied,
            ));
        }
        for i in 0..4 {
            records.push(answered(
                &format!("n{}", i),
                "Norte",
                IssueCategory::Health,
                SatisfactionLevel::VeryDissatisfied,
            ));
        }
        for i in 0..12 {
            records.push(Record::new(format!("p{}", i), "Silent", "Norte", "+55 11 90000-0000"));
        }
        let result = run("me dê um panorama geral", &records);

        let report = match result.report {
            Some(StructuredReport::Knowledge(report)) => report,
            other => panic!("unexpected report {:?}", other),
        };
        assert_eq!(report.analyses, AnalysisFocus::PARTIAL.to_vec());
        assert!(result
            .insights
            .iter()
            .any(|i| i.contains("Saúde is concentrated in Norte")));
    }

    #[test]
    fn test_comparison_names_best_and_worst() {
        let mut records = vec![
            answered("1", "Centro", IssueCategory::Security, SatisfactionLevel::VerySatisfied),
            answered("2", "Centro", IssueCategory::Security, SatisfactionLevel::Satisfied),
        ];
        records.push(Record::new("3", "Caio", "Vila Nova", "+55 11 90000-0000"));
        records.push(answered("4", "Vila Nova", IssueCategory::Security, SatisfactionLevel::Dissatisfied));
        let result = run("compare os bairros Centro vs Vila Nova", &records);

        assert!(result.insights[0].starts_with("Comparison: Centro leads"));
        assert!(result.insights[0].contains("Vila Nova"));
    }
}
