mod config;
mod errors;
mod extraction;
mod facts;
mod keywords;
mod llm_client;
mod models;
mod routes;
mod scoring;
mod state;
mod tailoring;
mod text;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::provider_from_config;
use crate::routes::build_router;
use crate::state::AppState;

/// Tracing targets are module paths, so the directive names the crate, not the package.
fn default_filter_directive(level: &str) -> String {
    format!("{}={}", env!("CARGO_CRATE_NAME"), level)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(default_filter_directive(&config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Resume API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the AI provider
    let provider = provider_from_config(config.provider.as_ref())?;
    match &config.provider {
        Some(p) => info!("AI provider initialized ({}: {})", p.name, p.model),
        None => warn!("No AI provider configured; extraction falls back to heuristics and tailoring is disabled"),
    }
    info!(
        "Tuning: ats_target={} max_tailor_attempts={} role_match={} bullet_dup={}",
        config.tuning.ats_target,
        config.tuning.max_tailor_attempts,
        config.tuning.role_match_threshold,
        config.tuning.bullet_duplicate_threshold
    );

    // Build app state
    let state = AppState {
        config: config.clone(),
        provider,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_targets_the_crate_path() {
        assert_eq!(default_filter_directive("info"), "resume_api=info");
        assert!(EnvFilter::try_new(default_filter_directive("debug")).is_ok());
    }
}
