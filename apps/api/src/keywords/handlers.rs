//! Axum route handlers for the keyword coverage API.

use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::keywords::{coverage, extract_keywords, Coverage};
use crate::text::truncate_chars;

pub const MAX_JD_CHARS: usize = 20_000;
pub const MAX_RESUME_TEXT_CHARS: usize = 300_000;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct KeywordCoverageRequest {
    pub jd_text: String,
    #[serde(default)]
    pub resume_text: String,
}

#[derive(Debug, Serialize)]
pub struct KeywordCoverageResponse {
    pub request_id: Uuid,
    pub keywords: Vec<String>,
    pub coverage: Coverage,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/keywords/coverage
///
/// Extracts the JD's keywords and reports which appear in the given resume text.
/// Fully deterministic; never calls the model.
pub async fn handle_keyword_coverage(
    Json(request): Json<KeywordCoverageRequest>,
) -> Result<Json<KeywordCoverageResponse>, AppError> {
    if request.jd_text.trim().is_empty() {
        return Err(AppError::Validation("jd_text cannot be empty".to_string()));
    }

    let jd = truncate_chars(&request.jd_text, MAX_JD_CHARS);
    let resume = truncate_chars(&request.resume_text, MAX_RESUME_TEXT_CHARS);

    let keywords = extract_keywords(&jd);
    let coverage = coverage(&resume, &keywords);
    let request_id = Uuid::new_v4();

    info!(
        "Keyword coverage {}: {}/{} matched ({}%)",
        request_id, coverage.matched_count, coverage.total, coverage.score
    );

    Ok(Json(KeywordCoverageResponse {
        request_id,
        keywords,
        coverage,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_coverage_handler_reports_matches() {
        let request = KeywordCoverageRequest {
            jd_text: "Requirements: Python, Kubernetes and Terraform".into(),
            resume_text: "Wrote Python tooling for Terraform modules".into(),
        };
        let Json(resp) = handle_keyword_coverage(Json(request)).await.unwrap();
        assert_eq!(resp.keywords, vec!["Python", "Kubernetes", "Terraform"]);
        assert_eq!(resp.coverage.missing, vec!["Kubernetes"]);
        assert_eq!(resp.coverage.score, 67);
    }

    #[tokio::test]
    async fn test_coverage_handler_rejects_blank_jd() {
        let request = KeywordCoverageRequest {
            jd_text: "   ".into(),
            resume_text: "anything".into(),
        };
        let err = handle_keyword_coverage(Json(request)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
    }
}
