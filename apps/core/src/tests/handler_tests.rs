//! Handler Tests
//!
//! Router dispatch and the notification, knowledge and operations scenarios.

use crate::brain::{Intent, IntentClassifier, StatisticalProfiler};
use crate::handlers::{
    HandlerContext, HandlerResult, HandlerRouter, Priority, StructuredReport, NO_SATISFACTION_DATA,
};
use crate::models::Record;
use crate::tests::fixtures::{campaign, phone_for};

fn route(query: &str, records: &[Record]) -> HandlerResult {
    let analysis = IntentClassifier::new().classify(query);
    let profile = StatisticalProfiler::new().profile(records);
    let ctx = HandlerContext {
        query,
        analysis: &analysis,
        profile: &profile,
        records,
    };
    HandlerRouter::new().route(&ctx)
}

#[cfg(test)]
mod notification_tests {
    use super::*;

    #[test]
    fn test_forty_records_twenty_five_dissatisfied() {
        let records = campaign();
        let result = route("list dissatisfied residents", &records);

        assert_eq!(result.handler, "notification");
        assert_eq!(result.residents.len(), 25, "no truncation");

        let expected_ids: Vec<&str> = records
            .iter()
            .filter(|r| r.satisfaction().is_some_and(|l| l.is_dissatisfied()))
            .map(|r| r.id.as_str())
            .collect();
        let ids: Vec<&str> = result.residents.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, expected_ids, "store order preserved");

        for row in &result.residents {
            let expected = match row.satisfaction.as_deref() {
                Some("Muito insatisfeito") => Priority::High,
                Some("Insatisfeito") => Priority::Medium,
                other => panic!("unexpected level {:?} in dissatisfied segment", other),
            };
            assert_eq!(row.priority, expected);
        }
        let high = result.residents.iter().filter(|r| r.priority == Priority::High).count();
        assert_eq!(high, 10);
        assert_eq!(result.residents.len() - high, 15);
    }

    #[test]
    fn test_rows_carry_contact_fields() {
        let records = campaign();
        let result = route("list dissatisfied residents", &records);
        let first = &result.residents[0];

        assert_eq!(first.id, "r00");
        assert_eq!(first.name, "Pessoa r00");
        assert_eq!(first.phone, phone_for("r00"));
        assert_eq!(first.neighborhood, "Centro");
        assert_eq!(first.issue.as_deref(), Some("Saúde"));
        assert_eq!(first.participation.as_deref(), Some("Sim"));
    }

    #[test]
    fn test_listing_is_idempotent() {
        let records = campaign();
        let queries = [
            "list dissatisfied residents",
            "liste os moradores interessados em participar",
            "quem clicou mas não respondeu?",
            "mostre todos os moradores",
        ];

        for query in queries {
            let first = route(query, &records);
            let second = route(query, &records);
            assert_eq!(first.residents, second.residents, "query: {}", query);
        }
    }

    #[test]
    fn test_segment_report_top_groups() {
        let records = campaign();
        let result = route("liste os moradores insatisfeitos", &records);

        match result.report {
            Some(StructuredReport::Segment(report)) => {
                assert_eq!(report.matching, 25);
                assert_eq!(report.total_records, 40);
                assert!(report.top_neighborhoods.len() <= 3);
                assert!(report.top_issues.len() <= 3);
                let counted: usize = report.top_neighborhoods.iter().map(|g| g.count).sum();
                assert_eq!(counted, 25, "three neighborhoods cover the whole segment");
                assert!(report.templates.iter().all(|t| t.body.contains("{nome}")));
            }
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn test_satisfied_only_segment() {
        let records = campaign();
        let result = route("show satisfied residents", &records);

        assert_eq!(result.residents.len(), 10);
        assert!(result.residents.iter().all(|r| matches!(
            r.satisfaction.as_deref(),
            Some("Satisfeito") | Some("Muito satisfeito")
        )));
        assert!(result.residents.iter().all(|r| r.priority == Priority::Low));
    }
}

#[cfg(test)]
mod knowledge_tests {
    use super::*;

    #[test]
    fn test_zero_records_satisfaction_query() {
        let result = route("How satisfied are residents overall?", &[]);

        assert_eq!(result.handler, "knowledge");
        assert!(result.success);
        assert_eq!(result.summary, NO_SATISFACTION_DATA);
    }

    #[test]
    fn test_zero_records_comprehensive_query_is_labelled() {
        let result = route("resumo geral", &[]);

        assert!(result.success);
        assert!(result.summary.starts_with("Insufficient data"));
        match result.report {
            Some(StructuredReport::Knowledge(report)) => assert!(report.insufficient_data),
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn test_low_satisfaction_with_low_response_neighborhood() {
        let mut records = campaign();
        for i in 0..40 {
            records.push(Record::new(format!("s{}", i), "Sem resposta", "Jardim América", "+55 11 90000-0000"));
        }
        let result = route("panorama completo", &records);

        assert!(result
            .insights
            .iter()
            .any(|i| i.contains("coincides with low response rates in Jardim América")));
    }
}

#[cfg(test)]
mod operations_tests {
    use super::*;

    #[test]
    fn test_operations_route() {
        let result = route("qual o status das entregas?", &campaign());

        assert_eq!(result.handler, "operations");
        assert!(result.residents.is_empty());
        match result.report {
            Some(StructuredReport::Operations(report)) => {
                assert_eq!(report.sent, 40);
                assert_eq!(report.delivered, 40);
                assert_eq!(report.failed, 0);
            }
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn test_router_dispatches_by_intent() {
        let records = campaign();
        let cases = [
            ("list dissatisfied residents", Intent::Notification, "notification"),
            ("status do sistema", Intent::Operations, "operations"),
            ("qual a satisfação média por bairro?", Intent::Knowledge, "knowledge"),
        ];
        for (query, intent, handler) in cases {
            assert_eq!(IntentClassifier::new().classify(query).intent, intent, "query: {}", query);
            assert_eq!(route(query, &records).handler, handler, "query: {}", query);
        }
    }
}
