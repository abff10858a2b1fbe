//! Engine configuration loaded from the environment.
//!
//! All keys are prefixed with `CIVIC_`. A `.env` file is honoured by the
//! binary before [`EngineConfig::from_env`] runs.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use validator::Validate;

use crate::error::AppError;

pub const ENV_API_KEY: &str = "CIVIC_GENERATION_API_KEY";
pub const ENV_GENERATION_URL: &str = "CIVIC_GENERATION_URL";
pub const ENV_GENERATION_MODEL: &str = "CIVIC_GENERATION_MODEL";
pub const ENV_GENERATION_TIMEOUT_MS: &str = "CIVIC_GENERATION_TIMEOUT_MS";
pub const ENV_CACHE_TTL_SECS: &str = "CIVIC_CACHE_TTL_SECS";
pub const ENV_RECORDS_PATH: &str = "CIVIC_RECORDS_PATH";
pub const ENV_DATABASE_URL: &str = "CIVIC_DATABASE_URL";
pub const ENV_SAMPLE_LIMIT: &str = "CIVIC_SAMPLE_LIMIT";

const DEFAULT_GENERATION_URL: &str = "https://api.openai.com/v1";
const DEFAULT_GENERATION_MODEL: &str = "gpt-4o-mini";
const DEFAULT_GENERATION_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_CACHE_TTL_SECS: u64 = 30;
const DEFAULT_SAMPLE_LIMIT: usize = 10;

/// Runtime settings for the query engine and its collaborators.
#[derive(Debug, Clone, Validate)]
pub struct EngineConfig {
    /// Credential for the text-generation service. `None` disables enhancement.
    pub generation_api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API.
    #[validate(url)]
    pub generation_url: String,
    #[validate(length(min = 1))]
    pub generation_model: String,
    /// Upper bound for a single generation call.
    #[validate(range(min = 100, max = 120000))]
    pub generation_timeout_ms: u64,
    /// Lifetime of the cached record set.
    #[validate(range(max = 3600))]
    pub cache_ttl_secs: u64,
    pub records_path: Option<PathBuf>,
    pub database_url: Option<String>,
    /// Sample residents embedded in enhancement prompts.
    #[validate(range(min = 1, max = 50))]
    pub sample_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            generation_api_key: None,
            generation_url: DEFAULT_GENERATION_URL.to_string(),
            generation_model: DEFAULT_GENERATION_MODEL.to_string(),
            generation_timeout_ms: DEFAULT_GENERATION_TIMEOUT_MS,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            records_path: None,
            database_url: None,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Reads every `CIVIC_*` variable, falling back to defaults, and validates the result.
    pub fn from_env() -> Result<Self, AppError> {
        let defaults = Self::default();
        let config = Self {
            generation_api_key: non_empty_var(ENV_API_KEY),
            generation_url: non_empty_var(ENV_GENERATION_URL).unwrap_or(defaults.generation_url),
            generation_model: non_empty_var(ENV_GENERATION_MODEL)
                .unwrap_or(defaults.generation_model),
            generation_timeout_ms: parse_var(ENV_GENERATION_TIMEOUT_MS)?
                .unwrap_or(defaults.generation_timeout_ms),
            cache_ttl_secs: parse_var(ENV_CACHE_TTL_SECS)?.unwrap_or(defaults.cache_ttl_secs),
            records_path: non_empty_var(ENV_RECORDS_PATH).map(PathBuf::from),
            database_url: non_empty_var(ENV_DATABASE_URL),
            sample_limit: parse_var(ENV_SAMPLE_LIMIT)?.unwrap_or(defaults.sample_limit),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn has_credential(&self) -> bool {
        self.generation_api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.generation_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &str) -> Result<Option<T>, AppError> {
    match non_empty_var(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KEYS: [&str; 8] = [
        ENV_API_KEY,
        ENV_GENERATION_URL,
        ENV_GENERATION_MODEL,
        ENV_GENERATION_TIMEOUT_MS,
        ENV_CACHE_TTL_SECS,
        ENV_RECORDS_PATH,
        ENV_DATABASE_URL,
        ENV_SAMPLE_LIMIT,
    ];

    #[test]
    fn test_defaults_without_environment() {
        let unset: Vec<(&str, Option<&str>)> = ALL_KEYS.iter().map(|k| (*k, None)).collect();
        temp_env::with_vars(unset, || {
            let config = EngineConfig::from_env().expect("defaults are valid");
            assert!(!config.has_credential());
            assert_eq!(config.cache_ttl(), Duration::from_secs(30));
            assert_eq!(config.sample_limit, 10);
        });
    }

    #[test]
    fn test_reads_overrides() {
        temp_env::with_vars(
            [
                (ENV_API_KEY, Some("sk-test")),
                (ENV_GENERATION_URL, Some("http://localhost:9000/v1")),
                (ENV_GENERATION_TIMEOUT_MS, Some("2500")),
                (ENV_CACHE_TTL_SECS, Some("5")),
            ],
            || {
                let config = EngineConfig::from_env().expect("valid overrides");
                assert!(config.has_credential());
                assert_eq!(config.generation_url, "http://localhost:9000/v1");
                assert_eq!(config.generation_timeout(), Duration::from_millis(2500));
                assert_eq!(config.cache_ttl_secs, 5);
            },
        );
    }

    #[test]
    fn test_rejects_unparseable_number() {
        temp_env::with_var(ENV_GENERATION_TIMEOUT_MS, Some("soon"), || {
            let err = EngineConfig::from_env().unwrap_err();
            assert!(matches!(err, AppError::Config(_)));
        });
    }

    #[test]
    fn test_rejects_out_of_range_timeout() {
        temp_env::with_var(ENV_GENERATION_TIMEOUT_MS, Some("5"), || {
            assert!(matches!(EngineConfig::from_env(), Err(AppError::Config(_))));
        });
    }

    #[test]
    fn test_blank_key_is_not_a_credential() {
        temp_env::with_var(ENV_API_KEY, Some("   "), || {
            let config = EngineConfig::from_env().unwrap();
            assert!(!config.has_credential());
        });
    }
}
