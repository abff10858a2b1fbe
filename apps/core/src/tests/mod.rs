//! Test Module
//!
//! Cross-module tests for the query engine. Unit tests live next to the code.
//!
//! ## Test Categories
//! - `fixtures`: Record builders and scripted generation services
//! - `brain_tests`: Classifier purity and precedence, profiler properties
//! - `handler_tests`: Router dispatch and handler scenarios
//! - `enhancement_tests`: Quality gate adoption and the HTTP generation actor
//! - `integration_tests`: Full `answer` pipeline, degradation and concurrency

pub mod fixtures;
pub mod handler_tests;
pub mod enhancement_tests;
