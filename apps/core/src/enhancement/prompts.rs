//! Role-specialised prompts for the enhancement call.

use crate::brain::{Intent, QueryAnalysis, StatisticalProfile};
use crate::handlers::{HandlerResult, ResidentRow};

const ANALYST_ROLE: &str = "You are a public-policy data analyst for a city hall. \
You rewrite survey findings for decision makers. Use only the numbers provided; \
never invent figures, names or neighborhoods. Quote the satisfaction mean with its \
95% confidence margin and sample size, and end with concrete recommendations that \
include a time frame (days or weeks).";

const OUTREACH_ROLE: &str = "You are a community outreach strategist for a city hall. \
You turn a list of residents into a contact plan. Use only the residents and numbers \
provided; never invent people or figures. Name the residents to contact first, give \
a time frame for each step, and mention how reliable the underlying survey numbers are.";

pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub fn system_prompt(intent: Intent) -> &'static str {
    match intent {
        Intent::Notification => OUTREACH_ROLE,
        Intent::Knowledge | Intent::Operations => ANALYST_ROLE,
    }
}

fn profile_block(profile: &StatisticalProfile) -> String {
    let mut lines = vec![format!(
        "- Registered residents: {}; responses: {} ({:.1}% response rate); engagement rate {:.1}%",
        profile.total_records, profile.responded, profile.response_rate, profile.engagement_rate
    )];
    match profile.satisfaction.stats() {
        Some(stats) => lines.push(format!(
            "- Satisfaction: mean {:.2}/5, ±{:.2} at 95% confidence, n={}, {} reliability; {} dissatisfied, {} satisfied",
            stats.mean,
            stats.margin_of_error,
            stats.responses,
            stats.reliability.label(),
            stats.dissatisfied,
            stats.satisfied
        )),
        None => lines.push("- Satisfaction: insufficient data (no responses yet)".to_string()),
    }
    if let (Some(best), Some(worst)) = (profile.equity.best(), profile.equity.worst()) {
        lines.push(format!(
            "- Neighborhoods: best {} ({:.1}), worst {} ({:.1}), equity gap {:.1}",
            best.name, best.performance_score, worst.name, worst.performance_score, profile.equity.equity_gap
        ));
    }
    if let Some(issue) = profile.top_issue() {
        lines.push(format!(
            "- Top issue: {} ({} reports, priority score {:.1})",
            issue.issue, issue.count, issue.priority_score
        ));
    }
    lines.push(format!(
        "- Funnel: registered {} → contacted {} → clicked {} → responded {} (overall {}%)",
        profile.funnel.registered,
        profile.funnel.contacted,
        profile.funnel.clicked,
        profile.funnel.responded,
        profile.funnel.overall_conversion
    ));
    lines.join("\n")
}

fn resident_block(sample: &[ResidentRow]) -> String {
    sample
        .iter()
        .map(|r| {
            format!(
                "- {} ({}): satisfaction {}, issue {}, participation {}, priority {}",
                r.name,
                r.neighborhood,
                r.satisfaction.as_deref().unwrap_or("n/a"),
                r.issue.as_deref().unwrap_or("n/a"),
                r.participation.as_deref().unwrap_or("n/a"),
                r.priority.label()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Builds the prompt pair. `sample` is already truncated by the caller.
pub fn build(
    query: &str,
    analysis: &QueryAnalysis,
    profile: &StatisticalProfile,
    draft: &HandlerResult,
    sample: &[ResidentRow],
) -> Prompt {
    let mut sections = vec![
        format!("Question: {}", query.trim()),
        format!("Statistical profile:\n{}", profile_block(profile)),
        format!("Draft answer:\n{}", draft.summary),
    ];
    if !draft.insights.is_empty() {
        sections.push(format!("Findings:\n- {}", draft.insights.join("\n- ")));
    }
    if !draft.recommendations.is_empty() {
        sections.push(format!(
            "Draft recommendations:\n- {}",
            draft.recommendations.join("\n- ")
        ));
    }
    if !sample.is_empty() {
        let heading = if draft.residents.len() > sample.len() {
            format!("Residents (first {} of {}):", sample.len(), draft.residents.len())
        } else {
            "Residents:".to_string()
        };
        sections.push(format!("{}\n{}", heading, resident_block(sample)));
    }
    sections.push(
        "Write an improved answer in the language of the question, between 200 and 2000 characters."
            .to_string(),
    );

    Prompt {
        system: system_prompt(analysis.intent).to_string(),
        user: sections.join("\n\n"),
    }
}
