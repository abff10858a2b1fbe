//! Query Engine - the orchestration pipeline.
//!
//! query → classify → load records → profile → route → enhance → assemble.
//! Every stage degrades instead of failing: the caller always receives a
//! well-formed [`FinalResponse`].

use std::time::Instant;
use tracing::{error, info, instrument, warn};

use crate::actors::traits::TextGenerationService;
use crate::brain::{IntentClassifier, QueryAnalysis, StatisticalProfiler};
use crate::config::EngineConfig;
use crate::enhancement::EnhancementGate;
use crate::error::EnhancementError;
use crate::handlers::{HandlerContext, HandlerRouter};
use crate::response::{
    DraftResponse, EnhancedResponse, ErrorResponse, FinalResponse, PipelineOutcome,
    ResponseAssembler,
};
use crate::store::DataStore;

const STORE_FAILURE_MESSAGE: &str =
    "The survey data could not be loaded right now, so no statistics are available. Please try again shortly.";

/// Entry point for answering survey questions.
///
/// Holds no per-query state; concurrent `answer` calls are independent apart
/// from whatever caching the store does.
pub struct QueryEngine<S, G> {
    store: S,
    classifier: IntentClassifier,
    profiler: StatisticalProfiler,
    router: HandlerRouter,
    gate: EnhancementGate<G>,
    assembler: ResponseAssembler,
}

impl<S, G> QueryEngine<S, G>
where
    S: DataStore,
    G: TextGenerationService,
{
    /// `generator = None` answers from handler drafts only.
    pub fn new(store: S, generator: Option<G>, config: &EngineConfig) -> Self {
        Self {
            store,
            classifier: IntentClassifier::new(),
            profiler: StatisticalProfiler::new(),
            router: HandlerRouter::new(),
            gate: EnhancementGate::new(generator, config.generation_timeout(), config.sample_limit),
            assembler: ResponseAssembler::new(),
        }
    }

    pub fn with_router(mut self, router: HandlerRouter) -> Self {
        self.router = router;
        self
    }

    /// Model behind the enhancement gate, `None` when answers are handler-only.
    pub fn enhancement_model(&self) -> Option<String> {
        self.gate.model_name()
    }

    /// Forces the next query to reload records.
    pub fn invalidate_cache(&self) {
        self.store.invalidate();
    }

    /// Classification only; no data is loaded.
    pub fn classify(&self, query: &str) -> QueryAnalysis {
        self.classifier.classify(query)
    }

    #[instrument(skip(self), fields(query_len = query.len()))]
    pub async fn answer(&self, query: &str) -> FinalResponse {
        let started = Instant::now();
        let analysis = self.classifier.classify(query);
        info!(
            "Classified as {} / {:?} (rules: {:?})",
            analysis.intent, analysis.query_type, analysis.matched_rules
        );

        let records = match self.store.load_records().await {
            Ok(records) => records,
            Err(e) => {
                error!("Record store unavailable: {}", e);
                return self.assembler.assemble(PipelineOutcome::Error(ErrorResponse {
                    intent: analysis.intent,
                    handler: "store".to_string(),
                    message: STORE_FAILURE_MESSAGE.to_string(),
                }));
            }
        };

        let profile = self.profiler.profile(&records);
        info!("Profile: {}", profile.summary());

        let ctx = HandlerContext {
            query,
            analysis: &analysis,
            profile: &profile,
            records: &records,
        };
        let draft = self.router.route(&ctx);

        let outcome = if !draft.success {
            PipelineOutcome::Draft(DraftResponse {
                intent: analysis.intent,
                draft,
                enhancement_error: None,
            })
        } else {
            match self
                .gate
                .enhance(query, &analysis, &profile, &draft)
                .await
            {
                Ok(enhancement) => PipelineOutcome::Enhanced(EnhancedResponse {
                    intent: analysis.intent,
                    draft,
                    enhancement,
                }),
                Err(e) => {
                    match &e {
                        EnhancementError::NotConfigured | EnhancementError::SkippedForIntent(_) => {
                            info!("Enhancement not applied: {}", e)
                        }
                        _ => warn!("Enhancement not applied: {}", e),
                    }
                    PipelineOutcome::Draft(DraftResponse {
                        intent: analysis.intent,
                        draft,
                        enhancement_error: Some(e),
                    })
                }
            }
        };

        let response = self.assembler.assemble(outcome);
        info!(
            "Answered in {:?}: source={}, confidence={:.2}, success={}",
            started.elapsed(),
            response.provenance.source.label(),
            response.confidence,
            response.success
        );
        response
    }
}
