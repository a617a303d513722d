use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ChatProvider;

/// Shared application state injected into all route handlers via Axum extractors.
/// Requests share nothing mutable; the provider is the only collaborator.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// OpenAI-compatible client, or the unconfigured provider when no key is set.
    /// Tests substitute a scripted fake.
    pub provider: Arc<dyn ChatProvider>,
}

#[cfg(test)]
impl AppState {
    /// Default tuning with the given provider in place of a real client.
    pub fn for_tests(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            config: Config {
                port: 0,
                rust_log: "debug".to_string(),
                provider: None,
                timeouts: crate::config::Timeouts::default(),
                tuning: crate::config::TuningConfig::default(),
            },
            provider,
        }
    }
}
