use tracing::subscriber::set_global_default;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

use crate::error::AppError;

/// Installs the global subscriber: `RUST_LOG` filter (default `default_level`)
/// and bunyan JSON lines on stderr, so stdout stays free for command output.
pub fn init_tracing(app_name: &str, default_level: &str) -> Result<(), AppError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let formatting_layer = BunyanFormattingLayer::new(app_name.to_string(), std::io::stderr);
    let subscriber = Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer);

    set_global_default(subscriber)
        .map_err(|e| AppError::Internal(format!("Failed to install tracing subscriber: {}", e)))
}
