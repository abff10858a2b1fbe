//! Quality rubric for generated answers.
//!
//! | check                     | points |
//! |---------------------------|--------|
//! | profile numbers reused    | 30     |
//! | actionable + time horizon | 25     |
//! | statistical confidence    | 20     |
//! | domain terminology        | 15     |
//! | length in [200, 2000]     | 10     |

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::brain::normalize::{fold_name, normalize};
use crate::handlers::HandlerResult;

pub const MIN_LENGTH: usize = 200;
pub const MAX_LENGTH: usize = 2000;
/// Required growth over the draft when no resident is named.
pub const LENGTH_RATIO: f64 = 1.5;
/// Distinct domain terms needed for the terminology check.
const MIN_DOMAIN_TERMS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityLevel {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl QualityLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => QualityLevel::Excellent,
            60..=79 => QualityLevel::Good,
            40..=59 => QualityLevel::Fair,
            _ => QualityLevel::Poor,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            QualityLevel::Poor => "poor",
            QualityLevel::Fair => "fair",
            QualityLevel::Good => "good",
            QualityLevel::Excellent => "excellent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCheck {
    ProfileNumbers,
    Actionable,
    StatisticalConfidence,
    DomainTerminology,
    Length,
}

impl QualityCheck {
    pub const ALL: [QualityCheck; 5] = [
        QualityCheck::ProfileNumbers,
        QualityCheck::Actionable,
        QualityCheck::StatisticalConfidence,
        QualityCheck::DomainTerminology,
        QualityCheck::Length,
    ];

    pub fn points(&self) -> u32 {
        match self {
            QualityCheck::ProfileNumbers => 30,
            QualityCheck::Actionable => 25,
            QualityCheck::StatisticalConfidence => 20,
            QualityCheck::DomainTerminology => 15,
            QualityCheck::Length => 10,
        }
    }

    /// Checks a deterministic splice can repair.
    pub fn is_spliceable(&self) -> bool {
        matches!(
            self,
            QualityCheck::ProfileNumbers
                | QualityCheck::Actionable
                | QualityCheck::StatisticalConfidence
        )
    }
}

/// Rubric outcome for one candidate text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub score: u32,
    pub level: QualityLevel,
    pub satisfied_checks: Vec<QualityCheck>,
    pub failed_checks: Vec<QualityCheck>,
}

impl QualityAssessment {
    pub fn is_good_or_better(&self) -> bool {
        self.level >= QualityLevel::Good
    }

    /// True when at least one failed check is one a splice can repair.
    pub fn has_spliceable_failure(&self) -> bool {
        self.failed_checks.iter().any(QualityCheck::is_spliceable)
    }
}

// NOTE: expect() is acceptable here: the patterns are literals covered by the tests below.
static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:[.,]\d+)?").expect("Invalid regex: number"));

static ACTIONABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(recommend\w*|recomend\w*|prioriti[sz]e\w*|prioriz\w*|contact\w*|contat\w*|implement\w*|schedule\w*|agend\w*|should|deve\w*|launch\w*|lanc\w*|invite\w*|convid\w*|follow up|acompanh\w*|send|envi\w*|organi[sz]e\w*|organiz\w*|focus\w*|focar)\b")
        .expect("Invalid regex: actionable")
});

static TIME_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d+\s*(hours?|days?|weeks?|months?|horas?|dias?|semanas?|mes(es)?)|today|tomorrow|this week|next week|this month|next month|immediately|hoje|amanha|esta semana|proxima semana|este mes|proximo mes|imediatamente|quarter|trimestre|prazo|deadline)\b")
        .expect("Invalid regex: time reference")
});

static STATISTICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\bconfidence\b|\bconfianca\b|\bmargin\w*|\bmargem\b|±|\binterval\w*|\bn\s*=\s*\d+|\bsample\w*|\bamostra\w*|\bstatistic\w*|\bestatistic\w*|\breliab\w*|\bconfiabilidade\b|\bstandard deviation\b|\bdesvio padrao\b)")
        .expect("Invalid regex: statistical language")
});

static DOMAIN_TERMS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(satisf\w*|insatisf\w*|dissatisf\w*)",
        r"\b(neighbou?rhoods?|bairros?)\b",
        r"\b(residents?|moradores?|cidadaos?|citizens?)\b",
        r"\b(survey|pesquisa|questionario|respondents?)\b",
        r"\b(particip\w*)",
        r"\b(engag\w*|engaj\w*|response rate|taxa de resposta)",
        r"\b(equity|equidade|gap|disparidade)\b",
    ]
    .into_iter()
    .map(|p| Regex::new(p).expect("Invalid regex: domain term"))
    .collect()
});

/// Stateless scorer; `reference_numbers` come from [`crate::brain::StatisticalProfile::headline_numbers`].
#[derive(Debug, Default, Clone, Copy)]
pub struct QualityScorer;

impl QualityScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn assess(&self, text: &str, reference_numbers: &[String]) -> QualityAssessment {
        let normalized = normalize(text);
        let mut satisfied_checks = Vec::new();
        let mut failed_checks = Vec::new();

        for check in QualityCheck::ALL {
            let passed = match check {
                QualityCheck::ProfileNumbers => cites_numbers(text, reference_numbers),
                QualityCheck::Actionable => {
                    ACTIONABLE.is_match(&normalized) && TIME_REFERENCE.is_match(&normalized)
                }
                QualityCheck::StatisticalConfidence => {
                    STATISTICAL.is_match(&normalized) || text.contains('±')
                }
                QualityCheck::DomainTerminology => {
                    DOMAIN_TERMS.iter().filter(|re| re.is_match(&normalized)).count()
                        >= MIN_DOMAIN_TERMS
                }
                QualityCheck::Length => {
                    let len = text.chars().count();
                    (MIN_LENGTH..=MAX_LENGTH).contains(&len)
                }
            };
            if passed {
                satisfied_checks.push(check);
            } else {
                failed_checks.push(check);
            }
        }

        let score = satisfied_checks.iter().map(QualityCheck::points).sum();
        QualityAssessment {
            score,
            level: QualityLevel::from_score(score),
            satisfied_checks,
            failed_checks,
        }
    }
}

/// At least one reference number appears as a standalone number (`.` or `,` decimal).
fn cites_numbers(text: &str, reference_numbers: &[String]) -> bool {
    NUMBER
        .find_iter(text)
        .map(|m| m.as_str().replace(',', "."))
        .any(|found| reference_numbers.iter().any(|n| *n == found))
}

/// Adoption rule: good or better, and either names one of the draft's residents
/// or is at least [`LENGTH_RATIO`] times the draft summary.
pub fn passes_adoption(
    assessment: &QualityAssessment,
    text: &str,
    draft: &HandlerResult,
) -> Result<(), String> {
    if !assessment.is_good_or_better() {
        return Err(format!(
            "quality {} ({}/100) is below good",
            assessment.level.label(),
            assessment.score
        ));
    }
    let haystack = format!(" {} ", fold_name(text));
    let names_resident = draft
        .residents
        .iter()
        .map(|r| fold_name(&r.name))
        .filter(|n| !n.is_empty())
        .any(|n| haystack.contains(&format!(" {} ", n)));
    let grew =
        text.chars().count() as f64 >= LENGTH_RATIO * draft.summary.chars().count() as f64;
    if names_resident || grew {
        Ok(())
    } else {
        Err("adds no resident detail and is not substantially longer than the draft".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::ResidentRow;
    use crate::models::Record;

    fn numbers() -> Vec<String> {
        vec!["40".to_string(), "25".to_string(), "2.35".to_string()]
    }

    const STRONG: &str = "Of the 40 residents surveyed, 25 are dissatisfied. Average satisfaction is 2.35/5 \
        with a 95% confidence margin of ±0.31 (n=40). We recommend that the team contact every \
        dissatisfied resident within 7 days and prioritise the neighborhoods with the lowest \
        participation in the next survey wave.";

    #[test]
    fn test_strong_answer_is_excellent() {
        let assessment = QualityScorer::new().assess(STRONG, &numbers());

        assert_eq!(assessment.score, 100, "failed: {:?}", assessment.failed_checks);
        assert_eq!(assessment.level, QualityLevel::Excellent);
    }

    #[test]
    fn test_levels() {
        assert_eq!(QualityLevel::from_score(80), QualityLevel::Excellent);
        assert_eq!(QualityLevel::from_score(79), QualityLevel::Good);
        assert_eq!(QualityLevel::from_score(60), QualityLevel::Good);
        assert_eq!(QualityLevel::from_score(45), QualityLevel::Fair);
        assert_eq!(QualityLevel::from_score(10), QualityLevel::Poor);
    }

    #[test]
    fn test_numbers_match_whole_tokens_and_comma_decimals() {
        assert!(cites_numbers("média de 2,35 pontos", &numbers()));
        assert!(!cites_numbers("about 400 people", &numbers()));
        assert!(!cites_numbers("no figures here", &numbers()));
    }

    #[test]
    fn test_vague_answer_is_poor() {
        let assessment = QualityScorer::new().assess("Things look fine overall.", &numbers());

        assert_eq!(assessment.level, QualityLevel::Poor);
        assert!(assessment.failed_checks.contains(&QualityCheck::ProfileNumbers));
    }

    fn draft_with(summary: &str, names: &[&str]) -> HandlerResult {
        let mut draft = HandlerResult::new("notification", summary);
        draft.residents = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let record = Record::new(i.to_string(), *name, "Centro", "+55 11 90000-0000");
                ResidentRow::from(&record)
            })
            .collect();
        draft
    }

    fn assessment_at(score: u32) -> QualityAssessment {
        QualityAssessment {
            score,
            level: QualityLevel::from_score(score),
            satisfied_checks: Vec::new(),
            failed_checks: Vec::new(),
        }
    }

    #[test]
    fn test_adoption_requires_good_level() {
        let poor = QualityScorer::new().assess("ok", &numbers());
        assert!(passes_adoption(&poor, "ok", &draft_with("draft", &[])).is_err());
    }

    /// Outcome depends only on level, name overlap with the draft rows and length ratio.
    #[test]
    fn test_adoption_table() {
        let mut roster: Vec<String> = (0..25).map(|i| format!("Morador {:02}", i)).collect();
        roster[3] = "José Araújo".to_string();
        let roster: Vec<&str> = roster.iter().map(String::as_str).collect();
        let body = "a".repeat(300);

        // (score, appended to text, draft summary length, draft carries roster, adopted)
        let cases = [
            (100, "", 100, false, true),
            (100, "", 400, false, false),
            (60, "", 100, false, true),
            (55, "", 100, false, false),
            (55, " Morador 03", 400, true, false),
            (100, " Morador 20", 400, true, true),
            (100, " jose araujo", 400, true, true),
            (100, " Morador 99", 400, true, false),
            (100, " Morador 20", 400, false, false),
            (100, " Morador 201", 400, true, false),
        ];

        for (score, suffix, draft_len, with_roster, adopted) in cases {
            let text = format!("{}{}", body, suffix);
            let names: &[&str] = if with_roster { &roster } else { &[] };
            let draft = draft_with(&"d".repeat(draft_len), names);

            let result = passes_adoption(&assessment_at(score), &text, &draft);
            assert_eq!(
                result.is_ok(),
                adopted,
                "score={} suffix={:?} draft_len={} roster={}: {:?}",
                score,
                suffix,
                draft_len,
                with_roster,
                result
            );
            assert_eq!(result, passes_adoption(&assessment_at(score), &text, &draft));
        }
    }

    #[test]
    fn test_spliceable_failure_detection() {
        let mut assessment = assessment_at(75);
        assessment.failed_checks = vec![QualityCheck::Length, QualityCheck::DomainTerminology];
        assert!(!assessment.has_spliceable_failure());

        assessment.failed_checks.push(QualityCheck::ProfileNumbers);
        assert!(assessment.has_spliceable_failure());
    }
}
