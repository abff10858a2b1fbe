//! # Brain Module
//!
//! Fast, data-only analysis that runs before any handler or model call.
//!
//! ## Components
//! - `normalize`: Query text folding (case, diacritics, punctuation)
//! - `intent`: Ordered token-rule intent and segment classification
//! - `stats`: Descriptive statistics helpers
//! - `profile`: Statistical profile output types
//! - `profiler`: Builds the profile from the record set

pub mod intent;
pub mod normalize;
pub mod profile;
pub mod profiler;
pub mod stats;

pub use intent::{AnalysisFocus, DataNeed, Intent, IntentClassifier, QueryAnalysis, QueryType, Segment};
pub use profile::{ReliabilityTier, SatisfactionProfile, StatisticalProfile};
pub use profiler::StatisticalProfiler;
