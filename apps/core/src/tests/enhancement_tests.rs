//! Enhancement Tests
//!
//! Adoption rules of the quality gate and the HTTP generation actor behind it.

use crate::actors::LlmActorHandle;
use crate::brain::{IntentClassifier, StatisticalProfiler};
use crate::enhancement::{Enhancement, EnhancementGate, EnhancementSource};
use crate::error::EnhancementError;
use crate::handlers::{HandlerContext, HandlerResult, HandlerRouter};
use crate::models::Record;
use crate::response::ProvenanceSource;
use crate::store::InMemoryStore;
use crate::tests::fixtures::{campaign, test_config, ScriptedGenerator, STRONG_OUTREACH};
use crate::QueryEngine;
use std::time::Duration;

const QUERY: &str = "list dissatisfied residents";

fn draft_for(query: &str, records: &[Record]) -> HandlerResult {
    let analysis = IntentClassifier::new().classify(query);
    let profile = StatisticalProfiler::new().profile(records);
    HandlerRouter::new().route(&HandlerContext {
        query,
        analysis: &analysis,
        profile: &profile,
        records,
    })
}

#[cfg(test)]
mod gate_tests {
    use super::*;

    async fn run_gate(text: &str) -> Result<Enhancement, EnhancementError> {
        let records = campaign();
        let analysis = IntentClassifier::new().classify(QUERY);
        let profile = StatisticalProfiler::new().profile(&records);
        let draft = draft_for(QUERY, &records);
        let gate = EnhancementGate::new(Some(ScriptedGenerator::new(text)), Duration::from_secs(1), 10);
        gate.enhance(QUERY, &analysis, &profile, &draft).await
    }

    #[tokio::test]
    async fn test_strong_outreach_is_adopted_verbatim() {
        let enhancement = run_gate(STRONG_OUTREACH).await.unwrap();

        assert_eq!(enhancement.source, EnhancementSource::Model);
        assert_eq!(enhancement.text, STRONG_OUTREACH);
        assert_eq!(enhancement.model, "scripted");
        assert!(enhancement.assessment.is_good_or_better());
    }

    #[tokio::test]
    async fn test_never_adopts_below_good() {
        let candidates = [
            "ok",
            "Contact them within 2 days.",
            "Residents are unhappy in some neighborhoods.",
            "The survey shows that residents of the neighborhood have mixed feelings about public \
             services, and satisfaction varies between groups while participation is uneven. \
             Overall the picture is neither clearly positive nor clearly negative for anyone.",
            STRONG_OUTREACH,
        ];

        for text in candidates {
            match run_gate(text).await {
                Ok(enhancement) => assert!(
                    enhancement.assessment.is_good_or_better(),
                    "adopted {:?} at {:?}",
                    text,
                    enhancement.assessment
                ),
                Err(EnhancementError::Rejected { reason, .. }) => {
                    assert!(!reason.is_empty(), "text: {}", text)
                }
                Err(other) => panic!("unexpected error {:?} for {:?}", other, text),
            }
        }
    }

    #[tokio::test]
    async fn test_gate_is_deterministic_for_same_text() {
        let candidates = [STRONG_OUTREACH, "Residents are unhappy in some neighborhoods."];

        for text in candidates {
            let first = run_gate(text).await;
            let second = run_gate(text).await;
            assert_eq!(format!("{:?}", first), format!("{:?}", second), "text: {}", text);
        }
    }
}

#[cfg(test)]
mod resident_name_tests {
    use super::*;

    /// Long enough that the strong answer never grows past 1.5x of it.
    fn padded_summary() -> String {
        "Survey overview for the campaign. ".repeat(14)
    }

    async fn enhance_with(
        query: &str,
        draft: &HandlerResult,
        text: &str,
    ) -> Result<Enhancement, EnhancementError> {
        let records = campaign();
        let analysis = IntentClassifier::new().classify(query);
        let profile = StatisticalProfiler::new().profile(&records);
        let gate = EnhancementGate::new(Some(ScriptedGenerator::new(text)), Duration::from_secs(1), 10);
        gate.enhance(query, &analysis, &profile, draft).await
    }

    #[tokio::test]
    async fn test_name_outside_draft_rows_does_not_count() {
        let query = "como está a satisfação geral?";
        let mut draft = draft_for(query, &campaign());
        assert_eq!(draft.handler, "knowledge");
        assert!(draft.residents.is_empty());
        draft.summary = padded_summary();

        // "Pessoa r00" is a stored record, but not one of the draft's rows.
        match enhance_with(query, &draft, STRONG_OUTREACH).await {
            Err(EnhancementError::Rejected { assessment, .. }) => {
                assert!(assessment.is_good_or_better());
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_name_beyond_prompt_sample_counts() {
        let mut draft = draft_for(QUERY, &campaign());
        assert_eq!(draft.residents.len(), 25);
        draft.summary = padded_summary();
        let late = draft.residents[20].name.clone();
        let text = STRONG_OUTREACH.replace("Pessoa r00", &late);

        let enhancement = enhance_with(QUERY, &draft, &text).await.unwrap();

        assert_eq!(enhancement.source, EnhancementSource::Model);
        assert!(enhancement.text.contains(&late));
    }
}

#[cfg(test)]
mod actor_pipeline_tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_answer_through_http_actor() {
        // 1. Arrange
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "model": "test-model", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": STRONG_OUTREACH } }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let handle = LlmActorHandle::new(
            format!("{}/v1", mock_server.uri()),
            "test-key".to_string(),
            "test-model".to_string(),
        );
        let engine = QueryEngine::new(InMemoryStore::new(campaign()), Some(handle), &test_config());

        // 2. Act
        let response = engine.answer(QUERY).await;

        // 3. Assert
        assert!(response.success);
        assert_eq!(response.provenance.source, ProvenanceSource::HandlerModel);
        assert_eq!(response.provenance.model.as_deref(), Some("test-model"));
        assert_eq!(response.text, STRONG_OUTREACH);
        assert_eq!(response.residents.len(), 25);
    }

    #[tokio::test]
    async fn test_http_failure_keeps_handler_draft() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&mock_server)
            .await;

        let handle = LlmActorHandle::new(
            format!("{}/v1", mock_server.uri()),
            "test-key".to_string(),
            "test-model".to_string(),
        );
        let records = campaign();
        let engine = QueryEngine::new(InMemoryStore::new(records.clone()), Some(handle), &test_config());

        let response = engine.answer(QUERY).await;

        assert!(response.success);
        assert_eq!(response.provenance.source, ProvenanceSource::HandlerOnly);
        assert_eq!(response.text, draft_for(QUERY, &records).summary);
        let reason = response.provenance.enhancement_error.unwrap();
        assert!(reason.starts_with("service_error"), "reason: {}", reason);
    }
}
