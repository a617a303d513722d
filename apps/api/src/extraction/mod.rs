//! Document Text Extractor — PDF/DOCX/TXT bytes to normalized, line-oriented text
//! plus embedded hyperlink URLs.
//!
//! Parsing failures never fail the request: a broken PDF or DOCX degrades to empty
//! text, and anything shorter than a usable resume is replaced by a placeholder the
//! fact extractor can still reason about.

pub mod docx;
pub mod pdf;
pub mod validation;

use std::collections::HashSet;

use bytes::Bytes;
use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::text::{compute_diagnostics, normalize, truncate_chars, Diagnostics};

pub use pdf::PdfSelection;
pub use validation::{classify_document, DocumentKind, MAX_FILE_SIZE_BYTES};

/// Below this many characters the text is treated as an extraction failure.
const MIN_USABLE_TEXT_CHARS: usize = 30;
const MAX_LINK_URLS: usize = 50;
const MAX_LINK_URL_CHARS: usize = 500;

/// An uploaded resume. Lives only for the request.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub bytes: Bytes,
    pub mime_type: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStrategy {
    LayoutBucketed,
    EndOfLineJoined,
    PlainDecode,
    DocxXml,
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionWarning {
    ExtractionEmpty,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedText {
    pub text: String,
    pub link_urls: Vec<String>,
    pub strategy: ExtractionStrategy,
    pub diagnostics: Diagnostics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_selection: Option<PdfSelection>,
    pub warnings: Vec<ExtractionWarning>,
}

/// Validates the upload and extracts its text. PDF and DOCX parsing run on the
/// blocking pool.
pub async fn extract_document(doc: RawDocument) -> Result<ExtractedText, AppError> {
    let upload = classify_document(
        doc.mime_type.as_deref(),
        doc.file_name.as_deref(),
        doc.bytes.len(),
    )?;

    let kind = upload.kind;
    let bytes = doc.bytes;
    let (text, link_urls, strategy, pdf_selection) =
        match tokio::task::spawn_blocking(move || extract_blocking(kind, &bytes)).await {
            Ok(out) => out,
            Err(e) if e.is_panic() => {
                warn!("{:?} parser panicked; continuing with empty text", kind);
                (String::new(), Vec::new(), fallback_strategy(kind), None)
            }
            Err(e) => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "Extraction task failed: {e}"
                )))
            }
        };

    let extracted = finish(
        text,
        link_urls,
        strategy,
        pdf_selection,
        &upload.file_name,
        &upload.mime_type,
    );
    info!(
        "Extracted {} chars, {} lines, {} bullets via {:?} from {:?}",
        extracted.diagnostics.extracted_text_length,
        extracted.diagnostics.extracted_lines,
        extracted.diagnostics.bullet_markers,
        extracted.strategy,
        kind
    );
    Ok(extracted)
}

/// Pasted resume text goes through the same normalization and placeholder rule.
pub fn extract_plain_text(text: &str, file_name: Option<&str>) -> ExtractedText {
    finish(
        normalize(text),
        Vec::new(),
        ExtractionStrategy::PlainDecode,
        None,
        file_name.unwrap_or("pasted text"),
        validation::TEXT_MIME,
    )
}

type Extraction = (
    String,
    Vec<String>,
    ExtractionStrategy,
    Option<PdfSelection>,
);

fn fallback_strategy(kind: DocumentKind) -> ExtractionStrategy {
    match kind {
        DocumentKind::Pdf => ExtractionStrategy::LayoutBucketed,
        DocumentKind::Docx => ExtractionStrategy::DocxXml,
        DocumentKind::PlainText => ExtractionStrategy::PlainDecode,
    }
}

fn extract_blocking(kind: DocumentKind, bytes: &[u8]) -> Extraction {
    match kind {
        DocumentKind::Pdf => match pdf::extract_pdf(bytes) {
            Ok(out) => {
                let selection = pdf::select_reconstruction(&out.layout, &out.end_of_line);
                let text = match selection.chosen {
                    ExtractionStrategy::EndOfLineJoined => out.end_of_line,
                    _ => out.layout,
                };
                (text, out.link_urls, selection.chosen, Some(selection))
            }
            Err(e) => {
                warn!("PDF parsing error: {e:#}");
                (String::new(), Vec::new(), ExtractionStrategy::LayoutBucketed, None)
            }
        },
        DocumentKind::Docx => match docx::extract_docx(bytes) {
            Ok(out) => (
                normalize(&out.text),
                out.link_urls,
                ExtractionStrategy::DocxXml,
                None,
            ),
            Err(e) => {
                warn!("DOCX parsing error, decoding bytes as text: {e:#}");
                (
                    normalize(&String::from_utf8_lossy(bytes)),
                    Vec::new(),
                    ExtractionStrategy::PlainDecode,
                    None,
                )
            }
        },
        DocumentKind::PlainText => (
            normalize(&String::from_utf8_lossy(bytes)),
            Vec::new(),
            ExtractionStrategy::PlainDecode,
            None,
        ),
    }
}

fn finish(
    text: String,
    link_urls: Vec<String>,
    strategy: ExtractionStrategy,
    pdf_selection: Option<PdfSelection>,
    file_name: &str,
    mime_type: &str,
) -> ExtractedText {
    let link_urls = dedupe_link_urls(link_urls);
    let mut warnings = Vec::new();

    let (text, strategy) = if text.trim().chars().count() < MIN_USABLE_TEXT_CHARS {
        warnings.push(ExtractionWarning::ExtractionEmpty);
        let file_name = if file_name.is_empty() { "unknown" } else { file_name };
        let mime_type = if mime_type.is_empty() { "unknown" } else { mime_type };
        (
            format!(
                "[Document uploaded: {file_name}. File type: {mime_type}. Please analyze and extract candidate information from this resume document.]"
            ),
            ExtractionStrategy::Placeholder,
        )
    } else {
        (text, strategy)
    };

    ExtractedText {
        diagnostics: compute_diagnostics(&text),
        text,
        link_urls,
        strategy,
        pdf_selection,
        warnings,
    }
}

/// Trimmed, cut to 500 chars, case-insensitively unique, first 50 kept.
pub fn dedupe_link_urls(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .map(|u| truncate_chars(u.trim(), MAX_LINK_URL_CHARS))
        .filter(|u| !u.is_empty())
        .filter(|u| seen.insert(u.to_lowercase()))
        .take(MAX_LINK_URLS)
        .collect()
}
