//! Intent Classification using ordered token rules.
//!
//! Queries are normalized, scanned once for token groups (regex, PT and EN),
//! then matched against declarative rule tables. Table order is precedence:
//! the first rule that matches wins, so tie-breaks such as
//! dissatisfaction-over-satisfaction are visible in the data, not in nested
//! conditionals.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::LazyLock;

use super::normalize::normalize;

/// Top-level purpose of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Analysis of the survey results.
    Knowledge,
    /// Targeting or listing residents for outreach.
    Notification,
    /// Delivery pipeline and system status.
    Operations,
}

impl Intent {
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Knowledge => "knowledge",
            Intent::Notification => "notification",
            Intent::Operations => "operations",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shape of the answer the query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Listing,
    Insights,
    Analysis,
    Comparison,
    Action,
}

/// Named subset of residents selected for outreach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    /// Opened the survey link but never answered.
    Abandoned,
    Dissatisfied,
    ParticipationNotInterested,
    ParticipationInterested,
    Satisfied,
    /// Everyone with a completed survey.
    AllResponded,
}

impl Segment {
    pub fn label(&self) -> &'static str {
        match self {
            Segment::Abandoned => "abandoned",
            Segment::Dissatisfied => "dissatisfied",
            Segment::ParticipationNotInterested => "participation_not_interested",
            Segment::ParticipationInterested => "participation_interested",
            Segment::Satisfied => "satisfied",
            Segment::AllResponded => "all_responded",
        }
    }
}

/// Knowledge sub-analysis requested by the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisFocus {
    Satisfaction,
    Issues,
    Neighborhoods,
    Participation,
    Engagement,
    Comprehensive,
}

impl AnalysisFocus {
    pub const PARTIAL: [AnalysisFocus; 5] = [
        AnalysisFocus::Satisfaction,
        AnalysisFocus::Issues,
        AnalysisFocus::Neighborhoods,
        AnalysisFocus::Participation,
        AnalysisFocus::Engagement,
    ];
}

/// Data the answer will draw on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataNeed {
    Satisfaction,
    Issues,
    Neighborhoods,
    Participation,
    Engagement,
    Delivery,
    Demographics,
}

/// Classification output. Created fresh per query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnalysis {
    pub intent: Intent,
    pub query_type: QueryType,
    pub data_needs: BTreeSet<DataNeed>,
    /// Resolved outreach segment; only set for notification intent.
    pub segment: Option<Segment>,
    /// Primary knowledge sub-analysis.
    pub focus: AnalysisFocus,
    /// Normalized query text the rules ran against.
    pub normalized: String,
    /// Names of the rules that fired, in evaluation order.
    pub matched_rules: Vec<&'static str>,
}

impl QueryAnalysis {
    /// Sub-analyses to run for a knowledge answer.
    ///
    /// Comprehensive expands to every partial analysis; otherwise the primary
    /// focus comes first, followed by any other analysis the data needs imply.
    pub fn sub_analyses(&self) -> Vec<AnalysisFocus> {
        if self.focus == AnalysisFocus::Comprehensive {
            return AnalysisFocus::PARTIAL.to_vec();
        }
        let mut analyses = vec![self.focus];
        for need in &self.data_needs {
            let extra = match need {
                DataNeed::Satisfaction => Some(AnalysisFocus::Satisfaction),
                DataNeed::Issues => Some(AnalysisFocus::Issues),
                DataNeed::Neighborhoods => Some(AnalysisFocus::Neighborhoods),
                DataNeed::Participation => Some(AnalysisFocus::Participation),
                DataNeed::Engagement | DataNeed::Demographics => Some(AnalysisFocus::Engagement),
                DataNeed::Delivery => None,
            };
            if let Some(extra) = extra {
                if !analyses.contains(&extra) {
                    analyses.push(extra);
                }
            }
        }
        analyses
    }
}

/// Token groups recognised in normalized queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Token {
    ListingVerb,
    ResidentNoun,
    Satisfied,
    Dissatisfied,
    Participation,
    Negation,
    Uninterested,
    ClickedOrAbandoned,
    NotCompleted,
    Send,
    Operations,
    Comparison,
    Insights,
    TopicSatisfaction,
    TopicIssues,
    TopicNeighborhoods,
    TopicEngagement,
    TopicDemographics,
}

// NOTE: expect() is acceptable here: the patterns are literals checked by the tests below.
static TOKEN_PATTERNS: LazyLock<Vec<(Token, Regex)>> = LazyLock::new(|| {
    let table: [(Token, &str); 18] = [
        (Token::ListingVerb, r"\b(list\w*|lista\w*|liste|show|mostr\w*|exib\w*|display|quem|who|which|quais|identif\w*|find|encontr\w*|filtr\w*|give me|me de|relacao)\b"),
        (Token::ResidentNoun, r"\b(residents?|moradore?s?|cidadaos?|cidadas?|citizens?|people|pessoas?|respondents?|participantes|participants|eleitores|voters)\b"),
        (Token::Dissatisfied, r"\b(dissatisfied|unsatisfied|unhappy|insatisf\w*|descontent\w*|infeliz\w*|nao satisfeit\w*|not satisfied)\b"),
        (Token::Satisfied, r"\b(satisfied|happy|satisfeit\w*|contente?s?)\b"),
        (Token::Participation, r"\b(particip\w*|voluntari\w*|volunteer\w*|interess\w*|engajar|get involved)\b"),
        (Token::Negation, r"\b(nao|not|no|sem|without|nunca|never|don't|dont|doesn't|nenhum\w*)\b"),
        (Token::Uninterested, r"\b(desinteress\w*|uninterested|disinterested)\b"),
        (Token::ClickedOrAbandoned, r"\b(clic\w*|click\w*|abri\w*|opened|abandon\w*|desist\w*)\b"),
        (Token::NotCompleted, r"\b(nao (completaram|completou|concluiram|concluiu|responderam|respondeu|terminaram|terminou|finalizaram)|not (completed|finished|responded)|did not (complete|finish|respond)|didn't (complete|finish|respond)|incomplet\w*|sem (responder|completar|concluir)|without (completing|responding)|abandon\w*)\b"),
        (Token::Send, r"\b(envi\w*|send\w*|notif\w*|contat\w*|contact\w*|mensage\w*|messag\w*|whatsapp|sms|dispar\w*|alert\w*|lembrete\w*|remind\w*)\b"),
        (Token::Operations, r"\b(sistema|system|health check|status|export\w*|entrega\w*|deliver(y|ies)|operac\w*|operation\w*|operational|funil|funnel|falhas?|failures?|failed|provedor\w*|providers?|uptime|metricas?|metrics?)\b"),
        (Token::Comparison, r"\b(compar\w*|versus|vs|diferenca\w*|differences?|melhor\w*|pior\w*|best|worst|ranking)\b"),
        (Token::Insights, r"\b(insights?|tendencia\w*|trends?|padr(ao|oes)|patterns?|recomend\w*|recommend\w*|sugest\w*|suggest\w*)\b"),
        (Token::TopicSatisfaction, r"\b(satisf\w*|insatisf\w*|dissatisf\w*|avaliac\w*|nota|rating|happiness)\b"),
        (Token::TopicIssues, r"\b(problemas?|issues?|quest(ao|oes)|demandas?|prioridades?|priorit\w*|saude|educacao|seguranca|transporte|infraestrutura|meio ambiente|health|education|security|transport|infrastructure|environment)\b"),
        (Token::TopicNeighborhoods, r"\b(bairros?|neighbou?rhoods?|regi(ao|oes)|regions?|geograf\w*|geograph\w*|equidade|equity|territori\w*|areas?|zonas?)\b"),
        (Token::TopicEngagement, r"\b(engaj\w*|engagement|engaged|adesao|taxa de resposta|response rates?|clic\w*|click\w*|convers(ao|oes)|conversion)\b"),
        (Token::TopicDemographics, r"\b(idades?|ages?|jovens|idosos|faixa etaria|demograf\w*|demograph\w*|youth|elderly)\b"),
    ];
    table
        .into_iter()
        .map(|(token, pattern)| {
            (
                token,
                Regex::new(pattern).expect("Invalid regex: token pattern"),
            )
        })
        .collect()
});

/// Token groups present in one query.
struct TokenHits(HashSet<Token>);

impl TokenHits {
    fn scan(normalized: &str) -> Self {
        Self(
            TOKEN_PATTERNS
                .iter()
                .filter(|(_, regex)| regex.is_match(normalized))
                .map(|(token, _)| *token)
                .collect(),
        )
    }

    fn has(&self, token: Token) -> bool {
        self.0.contains(&token)
    }

    /// All of `requires` present and, when `any_of` is non-empty, at least one of it.
    fn satisfies(&self, requires: &[Token], any_of: &[Token]) -> bool {
        requires.iter().all(|t| self.has(*t))
            && (any_of.is_empty() || any_of.iter().any(|t| self.has(*t)))
    }
}

/// Intent rule: first match in [`INTENT_RULES`] order wins.
struct IntentRule {
    name: &'static str,
    intent: Intent,
    query_type: QueryType,
    requires: &'static [Token],
    any_of: &'static [Token],
}

const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        name: "resident_listing",
        intent: Intent::Notification,
        query_type: QueryType::Listing,
        requires: &[Token::ListingVerb],
        any_of: &[
            Token::ResidentNoun,
            Token::Satisfied,
            Token::Dissatisfied,
            Token::Participation,
        ],
    },
    IntentRule {
        name: "survey_abandonment",
        intent: Intent::Notification,
        query_type: QueryType::Action,
        requires: &[Token::ClickedOrAbandoned, Token::NotCompleted],
        any_of: &[],
    },
    IntentRule {
        name: "outreach",
        intent: Intent::Notification,
        query_type: QueryType::Action,
        requires: &[Token::Send],
        any_of: &[],
    },
    IntentRule {
        name: "operations",
        intent: Intent::Operations,
        query_type: QueryType::Analysis,
        requires: &[Token::Operations],
        any_of: &[],
    },
];

/// Segment rule: first match in [`SEGMENT_RULES`] order wins.
///
/// Dissatisfied is listed before Satisfied, so a query carrying both polarities
/// targets the dissatisfied segment.
struct SegmentRule {
    segment: Segment,
    requires: &'static [Token],
    any_of: &'static [Token],
}

const SEGMENT_RULES: &[SegmentRule] = &[
    SegmentRule {
        segment: Segment::Abandoned,
        requires: &[Token::ClickedOrAbandoned, Token::NotCompleted],
        any_of: &[],
    },
    SegmentRule {
        segment: Segment::Dissatisfied,
        requires: &[Token::Dissatisfied],
        any_of: &[],
    },
    SegmentRule {
        segment: Segment::ParticipationNotInterested,
        requires: &[Token::Participation],
        any_of: &[Token::Negation, Token::Uninterested],
    },
    SegmentRule {
        segment: Segment::ParticipationNotInterested,
        requires: &[Token::Uninterested],
        any_of: &[],
    },
    SegmentRule {
        segment: Segment::ParticipationInterested,
        requires: &[Token::Participation],
        any_of: &[],
    },
    SegmentRule {
        segment: Segment::Satisfied,
        requires: &[Token::Satisfied],
        any_of: &[],
    },
];

/// Knowledge focus table, in precedence order.
const FOCUS_RULES: &[(AnalysisFocus, Token)] = &[
    (AnalysisFocus::Satisfaction, Token::TopicSatisfaction),
    (AnalysisFocus::Issues, Token::TopicIssues),
    (AnalysisFocus::Neighborhoods, Token::TopicNeighborhoods),
    (AnalysisFocus::Participation, Token::Participation),
    (AnalysisFocus::Engagement, Token::TopicEngagement),
    (AnalysisFocus::Engagement, Token::TopicDemographics),
];

const DATA_NEED_RULES: &[(DataNeed, Token)] = &[
    (DataNeed::Satisfaction, Token::TopicSatisfaction),
    (DataNeed::Satisfaction, Token::Satisfied),
    (DataNeed::Satisfaction, Token::Dissatisfied),
    (DataNeed::Issues, Token::TopicIssues),
    (DataNeed::Neighborhoods, Token::TopicNeighborhoods),
    (DataNeed::Participation, Token::Participation),
    (DataNeed::Engagement, Token::TopicEngagement),
    (DataNeed::Engagement, Token::ClickedOrAbandoned),
    (DataNeed::Delivery, Token::Operations),
    (DataNeed::Demographics, Token::TopicDemographics),
];

/// Stateless classifier over the rule tables. Classification never fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentClassifier;

impl IntentClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a raw query.
    pub fn classify(&self, query: &str) -> QueryAnalysis {
        let normalized = normalize(query);
        let hits = TokenHits::scan(&normalized);
        let mut matched_rules = Vec::new();

        let data_needs: BTreeSet<DataNeed> = DATA_NEED_RULES
            .iter()
            .filter(|(_, token)| hits.has(*token))
            .map(|(need, _)| *need)
            .collect();

        let focus = FOCUS_RULES
            .iter()
            .find(|(_, token)| hits.has(*token))
            .map(|(focus, _)| *focus)
            .unwrap_or(AnalysisFocus::Comprehensive);

        let rule = INTENT_RULES
            .iter()
            .find(|rule| hits.satisfies(rule.requires, rule.any_of));

        let (intent, query_type) = match rule {
            Some(rule) => {
                matched_rules.push(rule.name);
                (rule.intent, rule.query_type)
            }
            None => {
                matched_rules.push("knowledge_default");
                (Intent::Knowledge, knowledge_query_type(&hits))
            }
        };

        let segment = if intent == Intent::Notification {
            let segment = SEGMENT_RULES
                .iter()
                .find(|rule| hits.satisfies(rule.requires, rule.any_of))
                .map(|rule| rule.segment)
                .unwrap_or(Segment::AllResponded);
            matched_rules.push(segment.label());
            Some(segment)
        } else {
            None
        };

        QueryAnalysis {
            intent,
            query_type,
            data_needs,
            segment,
            focus,
            normalized,
            matched_rules,
        }
    }
}

fn knowledge_query_type(hits: &TokenHits) -> QueryType {
    if hits.has(Token::Comparison) {
        QueryType::Comparison
    } else if hits.has(Token::Insights) {
        QueryType::Insights
    } else {
        QueryType::Analysis
    }
}
