use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("File too large: {size} bytes (max {max})")]
    FileTooLarge { size: usize, max: usize },

    #[error("Legacy .doc files are not supported")]
    LegacyFormatUnsupported,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("No AI provider configured")]
    NoProviderConfigured,

    #[error("AI provider request failed (status {status:?}): {message}")]
    ProviderRequestFailed {
        status: Option<u16>,
        message: String,
    },

    #[error("Could not extract a candidate name from the resume or filename")]
    NameExtractionFailed,

    #[error("Resume preservation check failed: missing base experience roles: {0}")]
    PreservationCheckFailed(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True for provider failures worth another attempt (timeouts, 429, 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::ProviderRequestFailed { status, .. } => match status {
                None => true,
                Some(s) => *s == 429 || *s >= 500,
            },
            _ => false,
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::NoProvider => AppError::NoProviderConfigured,
            LlmError::Api { status, message } => AppError::ProviderRequestFailed {
                status: Some(status),
                message,
            },
            LlmError::RateLimited { retries } => AppError::ProviderRequestFailed {
                status: Some(429),
                message: format!("rate limited after {retries} retries"),
            },
            other => AppError::ProviderRequestFailed {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::UnsupportedFileType(msg) => (
                StatusCode::BAD_REQUEST,
                "UNSUPPORTED_FILE_TYPE".to_string(),
                format!("Invalid file type ({msg}). Supported formats: PDF, DOCX, TXT"),
            ),
            AppError::FileTooLarge { max, .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "FILE_TOO_LARGE".to_string(),
                format!("File too large. Maximum size is {} MB", max / (1024 * 1024)),
            ),
            AppError::LegacyFormatUnsupported => (
                StatusCode::BAD_REQUEST,
                "LEGACY_FORMAT_UNSUPPORTED".to_string(),
                "Legacy .doc files are not supported. Convert the resume to .docx or PDF and upload again."
                    .to_string(),
            ),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".to_string(),
                msg.clone(),
            ),
            AppError::NoProviderConfigured => {
                tracing::error!("No AI provider configured");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "NO_PROVIDER_CONFIGURED".to_string(),
                    "No AI provider configured. Set OPENAI_API_KEY or AI_GATEWAY_API_KEY."
                        .to_string(),
                )
            }
            AppError::ProviderRequestFailed { status, message } => {
                tracing::error!("Provider request failed ({status:?}): {message}");
                match status {
                    Some(429) => (
                        StatusCode::TOO_MANY_REQUESTS,
                        "PROVIDER_RATE_LIMITED".to_string(),
                        "The AI provider is rate limiting requests. Try again shortly.".to_string(),
                    ),
                    Some(402) => (
                        StatusCode::PAYMENT_REQUIRED,
                        "PROVIDER_PAYMENT_REQUIRED".to_string(),
                        "The AI provider requires payment or credits.".to_string(),
                    ),
                    Some(s) => (
                        StatusCode::BAD_GATEWAY,
                        format!("PROVIDER_ERROR_{s}"),
                        "The AI provider returned an error".to_string(),
                    ),
                    None => (
                        StatusCode::BAD_GATEWAY,
                        "PROVIDER_UNAVAILABLE".to_string(),
                        "The AI provider could not be reached".to_string(),
                    ),
                }
            }
            AppError::NameExtractionFailed => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "NAME_EXTRACTION_FAILED".to_string(),
                "Could not extract name from resume. Please ensure the resume contains a clear name at the top, or try a different format."
                    .to_string(),
            ),
            AppError::PreservationCheckFailed(roles) => {
                tracing::error!("Preservation check failed: {roles}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PRESERVATION_CHECK_FAILED".to_string(),
                    format!("Tailored resume would drop base experience roles: {roles}"),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR".to_string(),
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_no_provider_maps_to_no_provider_configured() {
        let err: AppError = LlmError::NoProvider.into();
        assert!(matches!(err, AppError::NoProviderConfigured));
    }

    #[test]
    fn test_llm_api_error_keeps_status() {
        let err: AppError = LlmError::Api {
            status: 402,
            message: "credits exhausted".to_string(),
        }
        .into();
        match err {
            AppError::ProviderRequestFailed { status, .. } => assert_eq!(status, Some(402)),
            other => panic!("expected ProviderRequestFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_transient_classification() {
        let rate_limited = AppError::ProviderRequestFailed {
            status: Some(429),
            message: String::new(),
        };
        let server = AppError::ProviderRequestFailed {
            status: Some(503),
            message: String::new(),
        };
        let payment = AppError::ProviderRequestFailed {
            status: Some(402),
            message: String::new(),
        };
        let timeout = AppError::ProviderRequestFailed {
            status: None,
            message: "timed out".to_string(),
        };
        assert!(rate_limited.is_transient());
        assert!(server.is_transient());
        assert!(timeout.is_transient(), "timeouts are retryable");
        assert!(!payment.is_transient(), "402 needs operator action");
        assert!(!AppError::NameExtractionFailed.is_transient());
    }

    #[test]
    fn test_status_codes_per_variant() {
        let cases = vec![
            (AppError::UnsupportedFileType("image/png".into()), StatusCode::BAD_REQUEST),
            (
                AppError::FileTooLarge {
                    size: 11,
                    max: 10,
                },
                StatusCode::PAYLOAD_TOO_LARGE,
            ),
            (AppError::LegacyFormatUnsupported, StatusCode::BAD_REQUEST),
            (AppError::NoProviderConfigured, StatusCode::SERVICE_UNAVAILABLE),
            (AppError::NameExtractionFailed, StatusCode::UNPROCESSABLE_ENTITY),
            (
                AppError::PreservationCheckFailed("Engineer — Acme".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AppError::ProviderRequestFailed {
                    status: Some(429),
                    message: String::new(),
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
        ];
        for (err, expected) in cases {
            let label = err.to_string();
            assert_eq!(err.into_response().status(), expected, "wrong status for {label}");
        }
    }
}
