//! Axum route handlers for resume tailoring.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::keywords::handlers::MAX_JD_CHARS;
use crate::models::CandidateFacts;
use crate::state::AppState;
use crate::tailoring::{TailorInput, TailorOutcome, TailoringEngine};
use crate::text::{sanitize, truncate_chars};

pub const MAX_BASE_TEXT_CHARS: usize = 80_000;
pub const MAX_NOTES_CHARS: usize = 2_000;
pub const MAX_TITLE_CHARS: usize = 120;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TailorRequest {
    pub facts: CandidateFacts,
    pub jd_text: String,
    #[serde(default)]
    pub base_resume_text: Option<String>,
    #[serde(default)]
    pub target_title: Option<String>,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TailorResponse {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: TailorOutcome,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resumes/tailor
///
/// Rewrites the base facts for the job description. Requires a configured provider.
pub async fn handle_tailor(
    State(state): State<AppState>,
    Json(request): Json<TailorRequest>,
) -> Result<Json<TailorResponse>, AppError> {
    if request.jd_text.trim().is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }

    let request_id = Uuid::new_v4();
    let input = TailorInput {
        facts: request.facts,
        jd_text: truncate_chars(request.jd_text.trim(), MAX_JD_CHARS),
        base_resume_text: sanitize(request.base_resume_text.as_deref(), MAX_BASE_TEXT_CHARS),
        target_title: sanitize(request.target_title.as_deref(), MAX_TITLE_CHARS),
        additional_notes: sanitize(request.additional_notes.as_deref(), MAX_NOTES_CHARS),
    };
    info!(
        "Tailor request {}: {} roles, target title {:?}",
        request_id,
        input.facts.experience.len(),
        input.target_title
    );

    let engine = TailoringEngine::new(
        state.provider.clone(),
        state.config.tuning,
        state.config.timeouts,
    );
    let outcome = engine.tailor(&input).await?;

    info!(
        "Tailor request {} finished: ats={} met={} attempts={}",
        request_id, outcome.ats_estimate, outcome.ats_target_met, outcome.attempts
    );

    Ok(Json(TailorResponse {
        request_id,
        generated_at: Utc::now(),
        outcome,
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm_client::fake::{FakeProvider, FakeReply};
    use crate::llm_client::UnconfiguredProvider;
    use crate::models::ExperienceEntry;
    use serde_json::json;

    fn request(jd: &str) -> TailorRequest {
        TailorRequest {
            facts: CandidateFacts {
                experience: vec![ExperienceEntry {
                    company: Some("Acme Corp".into()),
                    title: Some("Backend Engineer".into()),
                    bullets: vec!["Reduced latency by 30%".into()],
                    ..Default::default()
                }],
                ..Default::default()
            },
            jd_text: jd.into(),
            base_resume_text: None,
            target_title: Some("  ".into()),
            additional_notes: None,
        }
    }

    #[tokio::test]
    async fn test_tailor_flattens_outcome_into_response() {
        let provider = Arc::new(FakeProvider::with_handler(|_, _| {
            FakeReply::tool(json!({
                "jd_skill_extraction": {},
                "resume_doc": {"summary": "Backend engineer."},
                "missing_facts_questions": []
            }))
        }));
        let state = AppState::for_tests(provider);
        let Json(resp) = handle_tailor(State(state), Json(request("Requirements: Python")))
            .await
            .unwrap();

        let body = serde_json::to_value(&resp).unwrap();
        assert!(body["request_id"].is_string());
        assert!(body["generated_at"].is_string());
        assert!(body["ats_estimate"].is_number(), "outcome is flattened: {body}");
        assert_eq!(body["resume_doc"]["experience"][0]["company"], "Acme Corp");
        assert!(resp.outcome.attempts >= 1);
    }

    #[tokio::test]
    async fn test_tailor_rejects_blank_jd() {
        let state = AppState::for_tests(Arc::new(UnconfiguredProvider));
        let err = handle_tailor(State(state), Json(request("   ")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_tailor_without_provider_is_an_error() {
        let state = AppState::for_tests(Arc::new(UnconfiguredProvider));
        let err = handle_tailor(State(state), Json(request("Requirements: Python")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NoProviderConfigured), "got {err:?}");
    }
}
