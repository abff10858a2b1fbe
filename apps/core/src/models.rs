use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Five-point satisfaction scale used by the survey.
///
/// Wire values are the Portuguese labels shown to respondents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SatisfactionLevel {
    #[serde(rename = "Muito insatisfeito", alias = "very_dissatisfied")]
    VeryDissatisfied,
    #[serde(rename = "Insatisfeito", alias = "dissatisfied")]
    Dissatisfied,
    #[serde(rename = "Neutro", alias = "neutral")]
    Neutral,
    #[serde(rename = "Satisfeito", alias = "satisfied")]
    Satisfied,
    #[serde(rename = "Muito satisfeito", alias = "very_satisfied")]
    VerySatisfied,
}

impl SatisfactionLevel {
    pub const ALL: [SatisfactionLevel; 5] = [
        SatisfactionLevel::VeryDissatisfied,
        SatisfactionLevel::Dissatisfied,
        SatisfactionLevel::Neutral,
        SatisfactionLevel::Satisfied,
        SatisfactionLevel::VerySatisfied,
    ];

    /// Ordinal weight, 1 (very dissatisfied) to 5 (very satisfied).
    pub fn weight(&self) -> f64 {
        match self {
            SatisfactionLevel::VeryDissatisfied => 1.0,
            SatisfactionLevel::Dissatisfied => 2.0,
            SatisfactionLevel::Neutral => 3.0,
            SatisfactionLevel::Satisfied => 4.0,
            SatisfactionLevel::VerySatisfied => 5.0,
        }
    }

    /// Severity weight used to rank issues. Satisfied answers carry no severity.
    pub fn severity(&self) -> f64 {
        match self {
            SatisfactionLevel::VeryDissatisfied => 5.0,
            SatisfactionLevel::Dissatisfied => 4.0,
            SatisfactionLevel::Neutral => 2.0,
            SatisfactionLevel::Satisfied | SatisfactionLevel::VerySatisfied => 0.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SatisfactionLevel::VeryDissatisfied => "Muito insatisfeito",
            SatisfactionLevel::Dissatisfied => "Insatisfeito",
            SatisfactionLevel::Neutral => "Neutro",
            SatisfactionLevel::Satisfied => "Satisfeito",
            SatisfactionLevel::VerySatisfied => "Muito satisfeito",
        }
    }

    pub fn is_dissatisfied(&self) -> bool {
        matches!(
            self,
            SatisfactionLevel::VeryDissatisfied | SatisfactionLevel::Dissatisfied
        )
    }

    pub fn is_satisfied(&self) -> bool {
        matches!(
            self,
            SatisfactionLevel::Satisfied | SatisfactionLevel::VerySatisfied
        )
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for SatisfactionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Main issue a respondent wants the city to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCategory {
    #[serde(rename = "Saúde", alias = "health")]
    Health,
    #[serde(rename = "Educação", alias = "education")]
    Education,
    #[serde(rename = "Segurança", alias = "security")]
    Security,
    #[serde(rename = "Transporte", alias = "transport")]
    Transport,
    #[serde(rename = "Infraestrutura", alias = "infrastructure")]
    Infrastructure,
    #[serde(rename = "Meio ambiente", alias = "environment")]
    Environment,
    /// Free-text answer; the detail lives in `SurveyResponse::issue_detail`.
    #[serde(rename = "Outro", alias = "other")]
    Other,
}

impl IssueCategory {
    pub const ALL: [IssueCategory; 7] = [
        IssueCategory::Health,
        IssueCategory::Education,
        IssueCategory::Security,
        IssueCategory::Transport,
        IssueCategory::Infrastructure,
        IssueCategory::Environment,
        IssueCategory::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            IssueCategory::Health => "Saúde",
            IssueCategory::Education => "Educação",
            IssueCategory::Security => "Segurança",
            IssueCategory::Transport => "Transporte",
            IssueCategory::Infrastructure => "Infraestrutura",
            IssueCategory::Environment => "Meio ambiente",
            IssueCategory::Other => "Outro",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|issue| issue.label().eq_ignore_ascii_case(label.trim()))
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether the respondent wants to take part in follow-up civic activities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ParticipationIntent {
    #[serde(rename = "Sim", alias = "yes")]
    Yes,
    #[serde(rename = "Não", alias = "no")]
    No,
    #[default]
    #[serde(rename = "Não sei", alias = "unknown")]
    Unknown,
}

impl ParticipationIntent {
    pub fn label(&self) -> &'static str {
        match self {
            ParticipationIntent::Yes => "Sim",
            ParticipationIntent::No => "Não",
            ParticipationIntent::Unknown => "Não sei",
        }
    }

    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "sim" | "yes" => ParticipationIntent::Yes,
            "não" | "nao" | "no" => ParticipationIntent::No,
            _ => ParticipationIntent::Unknown,
        }
    }
}

/// Outbound message delivery state, updated by the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    #[default]
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl DeliveryStatus {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "sent" => DeliveryStatus::Sent,
            "delivered" => DeliveryStatus::Delivered,
            "read" => DeliveryStatus::Read,
            "failed" | "undelivered" => DeliveryStatus::Failed,
            _ => DeliveryStatus::Pending,
        }
    }
}

/// A completed survey. Created once per record and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyResponse {
    pub issue: IssueCategory,
    /// Free text supplied with `IssueCategory::Other`.
    #[serde(default)]
    pub issue_detail: Option<String>,
    pub satisfaction: SatisfactionLevel,
    #[serde(default)]
    pub participation: ParticipationIntent,
    pub answered_at: DateTime<Utc>,
}

impl SurveyResponse {
    pub fn new(issue: IssueCategory, satisfaction: SatisfactionLevel) -> Self {
        Self {
            issue,
            issue_detail: None,
            satisfaction,
            participation: ParticipationIntent::Unknown,
            answered_at: Utc::now(),
        }
    }

    pub fn with_participation(mut self, participation: ParticipationIntent) -> Self {
        self.participation = participation;
        self
    }

    /// Issue label including the free-text detail when present.
    pub fn issue_label(&self) -> String {
        match (&self.issue, &self.issue_detail) {
            (IssueCategory::Other, Some(detail)) if !detail.trim().is_empty() => {
                format!("Outro: {}", detail.trim())
            }
            (issue, _) => issue.label().to_string(),
        }
    }
}

/// One citizen registered for the survey campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    pub neighborhood: String,
    /// Contact handle used by the messaging provider.
    pub phone: String,
    /// Messaging provider that handled the invitation (e.g. "whatsapp", "sms").
    #[serde(default)]
    pub provider: Option<String>,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub delivery_status: DeliveryStatus,
    #[serde(default)]
    pub clicked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub survey: Option<SurveyResponse>,
}

impl Record {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        neighborhood: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone: phone.into(),
            age: None,
            neighborhood: neighborhood.into(),
            provider: None,
            registered_at: Utc::now(),
            sent_at: None,
            delivered_at: None,
            delivery_status: DeliveryStatus::Pending,
            clicked_at: None,
            survey: None,
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    /// Marks the invitation as handed to `provider` with the given final status.
    pub fn with_delivery(mut self, provider: impl Into<String>, status: DeliveryStatus) -> Self {
        let now = Utc::now();
        self.provider = Some(provider.into());
        self.sent_at = Some(now);
        if matches!(status, DeliveryStatus::Delivered | DeliveryStatus::Read) {
            self.delivered_at = Some(now);
        }
        self.delivery_status = status;
        self
    }

    pub fn with_click(mut self) -> Self {
        self.clicked_at = Some(Utc::now());
        self
    }

    /// Attaches a completed survey. Responding implies the link was opened.
    pub fn with_survey(mut self, survey: SurveyResponse) -> Self {
        if self.clicked_at.is_none() {
            self.clicked_at = Some(survey.answered_at);
        }
        self.survey = Some(survey);
        self
    }

    pub fn was_contacted(&self) -> bool {
        self.sent_at.is_some() || self.delivery_status != DeliveryStatus::Pending
    }

    pub fn was_delivered(&self) -> bool {
        self.delivered_at.is_some()
            || matches!(
                self.delivery_status,
                DeliveryStatus::Delivered | DeliveryStatus::Read
            )
    }

    pub fn delivery_failed(&self) -> bool {
        self.delivery_status == DeliveryStatus::Failed
    }

    pub fn clicked(&self) -> bool {
        self.clicked_at.is_some()
    }

    pub fn responded(&self) -> bool {
        self.survey.is_some()
    }

    pub fn satisfaction(&self) -> Option<SatisfactionLevel> {
        self.survey.as_ref().map(|s| s.satisfaction)
    }

    pub fn participation(&self) -> Option<ParticipationIntent> {
        self.survey.as_ref().map(|s| s.participation)
    }
}
