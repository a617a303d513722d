//! Upload gatekeeping: file kind, legacy formats, size cap.

use crate::errors::AppError;
use crate::text::truncate_chars;

pub const MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const TEXT_MIME: &str = "text/plain";
const LEGACY_DOC_MIME: &str = "application/msword";
const OCTET_STREAM: &str = "application/octet-stream";

const ALLOWED_MIME_TYPES: &[&str] = &[PDF_MIME, DOCX_MIME, TEXT_MIME];
const ALLOWED_EXTENSIONS: &[&str] = &[".pdf", ".docx", ".txt"];

const MAX_FILE_NAME_CHARS: usize = 255;
const MAX_MIME_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Docx,
    PlainText,
}

/// Upload metadata after sanitizing.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedUpload {
    pub kind: DocumentKind,
    pub file_name: String,
    pub mime_type: String,
}

fn has_allowed_extension(name: &str) -> bool {
    ALLOWED_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

fn is_supported(mime: &str, name: &str) -> bool {
    ALLOWED_MIME_TYPES.contains(&mime)
        || (mime == OCTET_STREAM && has_allowed_extension(name))
        || has_allowed_extension(name)
}

/// Checks type and size, in that order, after rejecting legacy `.doc` outright.
///
/// The browser-declared mime type is not trusted on its own: an octet-stream upload
/// with a known extension is accepted, as is a known extension with any mime type.
pub fn classify_document(
    mime_type: Option<&str>,
    file_name: Option<&str>,
    size: usize,
) -> Result<ClassifiedUpload, AppError> {
    let mime = truncate_chars(mime_type.unwrap_or("").trim(), MAX_MIME_CHARS).to_lowercase();
    let file_name = truncate_chars(file_name.unwrap_or("").trim(), MAX_FILE_NAME_CHARS);
    let lower_name = file_name.to_lowercase();

    if mime == LEGACY_DOC_MIME || lower_name.ends_with(".doc") {
        return Err(AppError::LegacyFormatUnsupported);
    }

    if !is_supported(&mime, &lower_name) {
        let declared = if mime.is_empty() { "unknown" } else { mime.as_str() };
        return Err(AppError::UnsupportedFileType(declared.to_string()));
    }

    if size > MAX_FILE_SIZE_BYTES {
        return Err(AppError::FileTooLarge {
            size,
            max: MAX_FILE_SIZE_BYTES,
        });
    }

    let kind = if mime == PDF_MIME || lower_name.ends_with(".pdf") {
        DocumentKind::Pdf
    } else if mime == DOCX_MIME || lower_name.ends_with(".docx") {
        DocumentKind::Docx
    } else {
        DocumentKind::PlainText
    };

    Ok(ClassifiedUpload {
        kind,
        file_name,
        mime_type: mime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_doc_rejected_before_type_check() {
        let err = classify_document(Some(LEGACY_DOC_MIME), Some("resume.docx"), 10).unwrap_err();
        assert!(matches!(err, AppError::LegacyFormatUnsupported));
        let err = classify_document(Some("text/plain"), Some("Resume.DOC"), 10).unwrap_err();
        assert!(
            matches!(err, AppError::LegacyFormatUnsupported),
            "extension check is case-insensitive"
        );
    }

    #[test]
    fn test_octet_stream_accepted_with_known_extension() {
        let c = classify_document(Some(OCTET_STREAM), Some("cv.pdf"), 100).unwrap();
        assert_eq!(c.kind, DocumentKind::Pdf);
        let err = classify_document(Some(OCTET_STREAM), Some("cv.png"), 100).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedFileType(_)));
    }

    #[test]
    fn test_unsupported_type_rejected() {
        let err = classify_document(Some("image/png"), Some("photo.png"), 100).unwrap_err();
        match err {
            AppError::UnsupportedFileType(mime) => assert_eq!(mime, "image/png"),
            other => panic!("expected UnsupportedFileType, got {other:?}"),
        }
    }

    #[test]
    fn test_size_limit_checked_after_type() {
        let err = classify_document(Some(PDF_MIME), Some("a.pdf"), MAX_FILE_SIZE_BYTES + 1)
            .unwrap_err();
        assert!(matches!(err, AppError::FileTooLarge { .. }));
        assert!(classify_document(Some(PDF_MIME), Some("a.pdf"), MAX_FILE_SIZE_BYTES).is_ok());
    }

    #[test]
    fn test_kind_resolution_by_mime_or_extension() {
        let docx = classify_document(Some(DOCX_MIME), Some("x"), 1).unwrap();
        assert_eq!(docx.kind, DocumentKind::Docx);
        let by_ext = classify_document(None, Some("Jane_Resume.DOCX"), 1).unwrap();
        assert_eq!(by_ext.kind, DocumentKind::Docx);
        let txt = classify_document(Some("text/plain"), None, 1).unwrap();
        assert_eq!(txt.kind, DocumentKind::PlainText);
    }

    #[test]
    fn test_metadata_is_truncated() {
        let long_name = format!("{}.pdf", "a".repeat(400));
        let c = classify_document(Some(PDF_MIME), Some(&long_name), 1).unwrap();
        assert_eq!(c.file_name.chars().count(), MAX_FILE_NAME_CHARS);
    }
}
