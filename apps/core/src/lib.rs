//! Civic survey query engine.
//!
//! Answers free-text questions about a civic-engagement survey: classifies the
//! question, profiles the records with confidence measures, routes to a domain
//! handler and optionally lets a text-generation model improve the draft
//! behind a quality gate.

pub mod actors;
pub mod brain;
pub mod config;
pub mod engine;
pub mod enhancement;
pub mod error;
pub mod handlers;
pub mod models;
pub mod response;
pub mod store;
pub mod telemetry;

pub use config::EngineConfig;
pub use engine::QueryEngine;
pub use error::{AppError, EnhancementError, GenerationError};
pub use response::FinalResponse;

#[cfg(test)]
mod tests;
