//! Deterministic JD-keyword extraction and coverage scoring. No model calls.

pub mod coverage;
pub mod extract;
pub mod handlers;

pub use coverage::{coverage, keyword_variants, Coverage};
pub use extract::{extract_keywords, normalize_jd, MAX_KEYWORDS};

/// Extracts the JD's keywords and scores `text` against them.
pub fn coverage_for_jd(text: &str, jd: &str) -> (Vec<String>, Coverage) {
    let keywords = extract_keywords(jd);
    let cov = coverage(text, &keywords);
    (keywords, cov)
}
