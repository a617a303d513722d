//! Text Normalizer & Diagnostics — pure functions over extracted resume text.
//!
//! Nothing in here touches the network or the model. Extraction, scoring, the fact
//! extractor and the tailoring engine all build on these helpers.

pub mod diagnostics;
pub mod normalize;
pub mod patterns;
pub mod similarity;

pub use diagnostics::{
    compute_diagnostics, estimate_structure, score_extracted_text, Diagnostics, StructureEstimate,
};
pub use normalize::{collapse_whitespace, normalize, normalize_key, MAX_TEXT_CHARS};

/// Length in characters. Byte length overcounts anything outside ASCII.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Keeps at most `max_chars` characters.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Trims, truncates and drops empty values.
pub fn sanitize(value: Option<&str>, max_chars: usize) -> Option<String> {
    let v = value?.trim();
    if v.is_empty() {
        return None;
    }
    let t = truncate_chars(v, max_chars);
    let t = t.trim();
    (!t.is_empty()).then(|| t.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_sanitize_trims_and_caps() {
        assert_eq!(sanitize(Some("  Jane Doe  "), 200).as_deref(), Some("Jane Doe"));
        assert_eq!(sanitize(Some("abcdef"), 3).as_deref(), Some("abc"));
        assert_eq!(sanitize(Some("   "), 10), None);
        assert_eq!(sanitize(None, 10), None);
    }
}
