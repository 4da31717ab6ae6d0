//! Utility functions and helpers

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Resource id utilities
pub struct IdUtils;

impl IdUtils {
    /// Generate a fresh resource id
    pub fn generate() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Whether `id` only uses lowercase letters, digits and dashes
    pub fn is_valid(id: &str) -> bool {
        !id.is_empty()
            && id
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter. Calling this more than once is
/// harmless; later calls leave the first subscriber in place.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .ok();
}
