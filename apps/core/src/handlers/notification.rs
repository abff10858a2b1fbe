//! Notification handler: selects the residents an outreach campaign should reach.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

use super::{Handler, HandlerContext, HandlerResult, StructuredReport};
use crate::brain::Segment;
use crate::error::AppError;
use crate::models::{ParticipationIntent, Record, SatisfactionLevel};

const TOP_GROUPS: usize = 3;

/// Contact urgency, derived from the exact satisfaction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn for_satisfaction(level: Option<SatisfactionLevel>) -> Self {
        match level {
            Some(SatisfactionLevel::VeryDissatisfied) => Priority::High,
            Some(SatisfactionLevel::Dissatisfied) => Priority::Medium,
            _ => Priority::Low,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "HIGH",
            Priority::Medium => "MEDIUM",
            Priority::Low => "LOW",
        }
    }
}

/// One contactable resident in a segment listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidentRow {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub neighborhood: String,
    pub satisfaction: Option<String>,
    pub issue: Option<String>,
    pub participation: Option<String>,
    pub priority: Priority,
}

impl From<&Record> for ResidentRow {
    fn from(record: &Record) -> Self {
        let survey = record.survey.as_ref();
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            phone: record.phone.clone(),
            neighborhood: record.neighborhood.clone(),
            satisfaction: survey.map(|s| s.satisfaction.label().to_string()),
            issue: survey.map(|s| s.issue_label()),
            participation: survey.map(|s| s.participation.label().to_string()),
            priority: Priority::for_satisfaction(record.satisfaction()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityBreakdown {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub name: String,
    /// Body with `{nome}` and `{bairro}` placeholders.
    pub body: String,
}

/// Aggregate view of one segment, attached to the notification result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub segment: Segment,
    pub matching: usize,
    pub total_records: usize,
    pub priorities: PriorityBreakdown,
    pub top_neighborhoods: Vec<GroupCount>,
    pub top_issues: Vec<GroupCount>,
    pub templates: Vec<MessageTemplate>,
}

/// Membership test for a segment.
pub fn in_segment(segment: Segment, record: &Record) -> bool {
    match segment {
        Segment::Abandoned => record.clicked() && !record.responded(),
        Segment::Dissatisfied => record.satisfaction().is_some_and(|l| l.is_dissatisfied()),
        Segment::Satisfied => record.satisfaction().is_some_and(|l| l.is_satisfied()),
        Segment::ParticipationInterested => {
            record.participation() == Some(ParticipationIntent::Yes)
        }
        Segment::ParticipationNotInterested => {
            record.participation() == Some(ParticipationIntent::No)
        }
        Segment::AllResponded => record.responded(),
    }
}

/// Most frequent labels, ties broken by first occurrence.
fn top_counts(labels: impl Iterator<Item = String>) -> Vec<GroupCount> {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();
    for label in labels {
        let entry = counts.entry(label.clone()).or_insert(0);
        if *entry == 0 {
            order.push(label);
        }
        *entry += 1;
    }
    let mut groups: Vec<GroupCount> = order
        .into_iter()
        .map(|label| GroupCount {
            count: counts[&label],
            label,
        })
        .collect();
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups.truncate(TOP_GROUPS);
    groups
}

fn templates_for(segment: Segment) -> Vec<MessageTemplate> {
    let entries: &[(&str, &str)] = match segment {
        Segment::Dissatisfied => &[
            (
                "escuta_ativa",
                "Olá {nome}, vimos que você não está satisfeito(a) com os serviços em {bairro}. Queremos ouvir você: podemos conversar esta semana?",
            ),
            (
                "plano_de_acao",
                "{nome}, sua avaliação sobre {bairro} foi registrada. Estamos preparando um plano de ação e voltaremos com novidades em até 30 dias.",
            ),
        ],
        Segment::Satisfied => &[(
            "agradecimento",
            "Obrigado, {nome}! Ficamos felizes com sua avaliação positiva de {bairro}. Conte para seus vizinhos sobre a pesquisa.",
        )],
        Segment::ParticipationInterested => &[(
            "convite_reuniao",
            "{nome}, você demonstrou interesse em participar. Convidamos você para a próxima reunião comunitária de {bairro}.",
        )],
        Segment::ParticipationNotInterested => &[(
            "porta_aberta",
            "{nome}, respeitamos sua decisão. Se mudar de ideia, as reuniões de {bairro} continuam abertas a você.",
        )],
        Segment::Abandoned => &[(
            "lembrete_pesquisa",
            "Olá {nome}, faltam poucos passos para concluir a pesquisa sobre {bairro}. Sua opinião leva menos de 2 minutos.",
        )],
        Segment::AllResponded => &[(
            "retorno_resultados",
            "{nome}, obrigado por responder à pesquisa. Em breve compartilharemos os resultados de {bairro}.",
        )],
    };
    entries
        .iter()
        .map(|(name, body)| MessageTemplate {
            name: name.to_string(),
            body: body.to_string(),
        })
        .collect()
}

fn recommendations_for(segment: Segment, priorities: &PriorityBreakdown, matching: usize) -> Vec<String> {
    let mut recs = Vec::new();
    match segment {
        Segment::Dissatisfied => {
            if priorities.high > 0 {
                recs.push(format!(
                    "Contact the {} HIGH-priority residents first, within 48 hours.",
                    priorities.high
                ));
            }
            if priorities.medium > 0 {
                recs.push(format!(
                    "Follow up with the {} MEDIUM-priority residents within 7 days.",
                    priorities.medium
                ));
            }
        }
        Segment::Abandoned => recs.push(format!(
            "Send a reminder to the {} residents who opened the survey without finishing it, within 24 hours.",
            matching
        )),
        Segment::ParticipationInterested => recs.push(format!(
            "Invite the {} interested residents to the next community meeting within 30 days.",
            matching
        )),
        Segment::ParticipationNotInterested => recs.push(
            "Keep these residents informed with a low-frequency update; avoid repeated invitations."
                .to_string(),
        ),
        Segment::Satisfied => recs.push(format!(
            "Ask the {} satisfied residents to act as neighborhood ambassadors this month.",
            matching
        )),
        Segment::AllResponded => recs.push(
            "Share the survey results with every respondent within 2 weeks.".to_string(),
        ),
    }
    recs
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NotificationHandler;

impl NotificationHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Handler for NotificationHandler {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn handle(&self, ctx: &HandlerContext<'_>) -> Result<HandlerResult, AppError> {
        let segment = ctx.analysis.segment.unwrap_or(Segment::AllResponded);

        // Full list in store order.
        let matching: Vec<&Record> = ctx
            .records
            .iter()
            .filter(|r| in_segment(segment, r))
            .collect();
        let residents: Vec<ResidentRow> = matching.iter().map(|r| ResidentRow::from(*r)).collect();
        info!(
            "Segment {} selected {} of {} records",
            segment.label(),
            residents.len(),
            ctx.records.len()
        );

        let priorities = PriorityBreakdown {
            high: residents.iter().filter(|r| r.priority == Priority::High).count(),
            medium: residents.iter().filter(|r| r.priority == Priority::Medium).count(),
            low: residents.iter().filter(|r| r.priority == Priority::Low).count(),
        };
        let top_neighborhoods = top_counts(matching.iter().map(|r| r.neighborhood.trim().to_string()));
        let top_issues = top_counts(
            matching
                .iter()
                .filter_map(|r| r.survey.as_ref())
                .map(|s| s.issue_label()),
        );

        let summary = if ctx.records.is_empty() {
            "No resident records are available yet.".to_string()
        } else if residents.is_empty() {
            format!(
                "No residents match the '{}' segment among {} records.",
                segment.label(),
                ctx.records.len()
            )
        } else {
            format!(
                "Found {} residents in the '{}' segment out of {} records ({} HIGH, {} MEDIUM, {} LOW priority).",
                residents.len(),
                segment.label(),
                ctx.records.len(),
                priorities.high,
                priorities.medium,
                priorities.low
            )
        };

        let mut result = HandlerResult::new(self.name(), summary);
        if !residents.is_empty() {
            let join = |groups: &[GroupCount]| {
                groups
                    .iter()
                    .map(|g| format!("{} ({})", g.label, g.count))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            result.insights.push(format!(
                "Most represented neighborhoods: {}.",
                join(&top_neighborhoods)
            ));
            if !top_issues.is_empty() {
                result
                    .insights
                    .push(format!("Most reported issues: {}.", join(&top_issues)));
            }
            result.recommendations = recommendations_for(segment, &priorities, residents.len());
        }

        result.report = Some(StructuredReport::Segment(SegmentReport {
            segment,
            matching: residents.len(),
            total_records: ctx.records.len(),
            priorities,
            top_neighborhoods,
            top_issues,
            templates: templates_for(segment),
        }));
        result.residents = residents;
        Ok(result)
    }
}
