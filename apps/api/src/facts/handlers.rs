//! Axum route handlers for resume fact extraction.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::extraction::{
    extract_document, extract_plain_text, ExtractedText, ExtractionStrategy, ExtractionWarning,
    PdfSelection, RawDocument,
};
use crate::facts::{FactDiagnostics, FactExtractor, Hints, ParseMode};
use crate::keywords::handlers::MAX_RESUME_TEXT_CHARS;
use crate::models::CandidateFacts;
use crate::state::AppState;
use crate::text::{char_len, Diagnostics};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExtractTextRequest {
    pub resume_text: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ExtractionDiagnostics {
    #[serde(flatten)]
    pub text: Diagnostics,
    pub strategy: ExtractionStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_selection: Option<PdfSelection>,
    pub link_urls: Vec<String>,
    pub warnings: Vec<ExtractionWarning>,
    pub facts: FactDiagnostics,
}

#[derive(Debug, Serialize)]
pub struct ExtractResponse {
    pub request_id: Uuid,
    pub facts: CandidateFacts,
    pub mode: ParseMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub extracted_text: String,
    pub diagnostics: ExtractionDiagnostics,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/resumes/extract
///
/// Multipart upload with a single `file` field (PDF, DOCX or TXT).
pub async fn handle_extract_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ExtractResponse>, AppError> {
    let mut document = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let mime_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Could not read uploaded file: {e}")))?;
        document = Some(RawDocument {
            bytes,
            mime_type,
            file_name,
        });
        break;
    }

    let document =
        document.ok_or_else(|| AppError::Validation("file field is required".to_string()))?;
    let file_name = document.file_name.clone();
    info!(
        "Extracting upload {:?} ({} bytes, {:?})",
        file_name,
        document.bytes.len(),
        document.mime_type
    );

    let extracted = extract_document(document).await?;
    run_extraction(&state, extracted, file_name.as_deref()).await.map(Json)
}

/// POST /api/v1/resumes/extract/text
///
/// Same pipeline for pasted text.
pub async fn handle_extract_text(
    State(state): State<AppState>,
    Json(request): Json<ExtractTextRequest>,
) -> Result<Json<ExtractResponse>, AppError> {
    if request.resume_text.trim().is_empty() {
        return Err(AppError::Validation("resume_text cannot be empty".to_string()));
    }
    if char_len(&request.resume_text) > MAX_RESUME_TEXT_CHARS {
        return Err(AppError::Validation(format!(
            "resume_text cannot exceed {} characters",
            MAX_RESUME_TEXT_CHARS
        )));
    }

    let extracted = extract_plain_text(&request.resume_text, request.file_name.as_deref());
    run_extraction(&state, extracted, request.file_name.as_deref())
        .await
        .map(Json)
}

async fn run_extraction(
    state: &AppState,
    extracted: ExtractedText,
    file_name: Option<&str>,
) -> Result<ExtractResponse, AppError> {
    let request_id = Uuid::new_v4();
    let hints = Hints::scan(&extracted.text, &extracted.link_urls);
    let extractor = FactExtractor::new(
        state.provider.clone(),
        state.config.tuning,
        state.config.timeouts,
    );
    let out = extractor.extract(&extracted.text, &hints, file_name).await?;

    info!(
        "Extraction {} finished: mode={:?} strategy={:?} score={}",
        request_id, out.mode, extracted.strategy, out.facts.quality_score
    );

    Ok(ExtractResponse {
        request_id,
        facts: out.facts,
        mode: out.mode,
        warning: out.warning,
        diagnostics: ExtractionDiagnostics {
            text: extracted.diagnostics,
            strategy: extracted.strategy,
            pdf_selection: extracted.pdf_selection,
            link_urls: extracted.link_urls,
            warnings: extracted.warnings,
            facts: out.diagnostics,
        },
        extracted_text: extracted.text,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm_client::fake::{FakeProvider, FakeReply};
    use crate::llm_client::UnconfiguredProvider;
    use serde_json::json;

    const RESUME: &str = "Jane Doe\njane@x.dev | (512) 555-0100\nSKILLS\nRust, Go, Kubernetes";

    #[tokio::test]
    async fn test_extract_text_returns_facts_and_diagnostics() {
        let provider = Arc::new(FakeProvider::scripted(vec![FakeReply::tool(json!({
            "full_name": "Jane Doe",
            "technical_skills": ["Rust", "Go", "Kubernetes"],
            "summary": "Backend engineer focused on distributed systems and developer tooling.",
            "ats_score": 70
        }))]));
        let state = AppState::for_tests(provider);
        let request = ExtractTextRequest {
            resume_text: RESUME.into(),
            file_name: None,
        };
        let Json(resp) = handle_extract_text(State(state), Json(request)).await.unwrap();

        assert_eq!(resp.mode, ParseMode::Ai);
        assert_eq!(resp.facts.contact.email.as_deref(), Some("jane@x.dev"));
        assert_eq!(resp.diagnostics.strategy, ExtractionStrategy::PlainDecode);
        assert!(resp.extracted_text.starts_with("Jane Doe"));

        let body = serde_json::to_value(&resp).unwrap();
        assert!(body["diagnostics"]["extracted_text_length"].is_number(), "text diagnostics are flattened");
        assert_eq!(body["diagnostics"]["facts"]["provider"], "fake");
    }

    #[tokio::test]
    async fn test_extract_text_without_provider_is_heuristic() {
        let state = AppState::for_tests(Arc::new(UnconfiguredProvider));
        let request = ExtractTextRequest {
            resume_text: RESUME.into(),
            file_name: Some("Jane_Doe_Resume.txt".into()),
        };
        let Json(resp) = handle_extract_text(State(state), Json(request)).await.unwrap();
        assert_eq!(resp.mode, ParseMode::Heuristic);
        assert!(resp.warning.is_some());
        assert_eq!(resp.facts.contact.full_name.as_deref(), Some("Jane Doe"));
    }

    #[tokio::test]
    async fn test_extract_text_rejects_blank_input() {
        let state = AppState::for_tests(Arc::new(UnconfiguredProvider));
        let request = ExtractTextRequest {
            resume_text: " \n ".into(),
            file_name: None,
        };
        let err = handle_extract_text(State(state), Json(request)).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
    }
}
