//! Deterministic JD keyword extraction.
//!
//! Candidates come from three places: "Full Name (ACR)" pairs, slash acronyms like
//! CI/CD, and short fragments of bulleted or heading-scoped requirement lines.
//! Boilerplate and sentence fragments are filtered out afterwards.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::text::{collapse_whitespace, normalize_key};

pub const MAX_KEYWORDS: usize = 60;
const MAX_FRAGMENT_WORDS: usize = 6;
const MAX_FRAGMENT_CHARS: usize = 70;

const BAD_STARTS: &[&str] = &[
    "ability to",
    "excellent",
    "strong",
    "be flexible",
    "adapt to",
    "you",
    "open to",
    "preferred",
    "required",
    "qualifications",
    "responsibilities",
    "requirements",
    "key responsibilities",
];

/// Short tokens that are real skills rather than the tail of a broken word.
pub const ALLOW_SHORT: &[&str] = &[
    "r", "c", "go", "ai", "ml", "qa", "ui", "ux", "pm", "vp", "okrs", "kpi", "kpis", "sre",
];

const BARE_WORDS: &[&str] = &[
    "experience",
    "skills",
    "requirements",
    "qualifications",
    "responsibilities",
];

lazy_static! {
    static ref BULLET_GLYPH: Regex = Regex::new(r"[•\u{2022}]").unwrap();
    static ref JD_HEADING: Regex = Regex::new(
        r"(?i)\b(Key Responsibilities|Responsibilities|Required Qualifications|Preferred Qualifications|Qualifications|Requirements|Soft Skills)\s*:\s*"
    ).unwrap();
    static ref SENTENCE_END: Regex = Regex::new(r"\. +").unwrap();
    static ref BLANK_RUNS: Regex = Regex::new(r"\n{3,}").unwrap();

    static ref PAREN_ACRONYM: Regex = Regex::new(
        r"([A-Za-z][A-Za-z0-9 &/.\-]{2,80})\s*\(\s*([A-Z0-9]{2,10})\s*\)"
    ).unwrap();
    static ref SLASH_CHAIN: Regex = Regex::new(r"\b[A-Z]{2,}(?:/[A-Z]{2,})+\b").unwrap();
    static ref SLASH_PAIR: Regex = Regex::new(r"\b[A-Z]{2,}/[A-Z]{2,}\b").unwrap();

    static ref HOT_HEADING: Regex = Regex::new(
        r"(?i)(REQUIREMENTS|QUALIFICATIONS|RESPONSIBILITIES|CERTIFICATIONS|SOFT SKILLS|KEY RESPONSIBILITIES|REQUIRED QUALIFICATIONS|PREFERRED QUALIFICATIONS)"
    ).unwrap();
    static ref BULLET_LINE: Regex = Regex::new(r"^[•\-*]").unwrap();
    static ref BULLET_PREFIX: Regex = Regex::new(r"^[•\-*]+\s*").unwrap();
    static ref FRAGMENT_SPLIT: Regex = Regex::new(r"(?i)[,;]|•|\band\b|\bor\b").unwrap();
    static ref TRAILING_DOTS: Regex = Regex::new(r"\.+$").unwrap();
    static ref SHORT_LOWER_WORD: Regex = Regex::new(r"^[a-z]{1,3}$").unwrap();
}

/// Puts bullets, requirement headings and sentences on their own lines.
pub fn normalize_jd(jd: &str) -> String {
    let t = jd.replace("\r\n", "\n").replace('\r', "\n");
    let t = BULLET_GLYPH.replace_all(&t, "\n• ");
    let t = JD_HEADING.replace_all(&t, "\n${1}:\n");
    let t = SENTENCE_END.replace_all(&t, ".\n");
    BLANK_RUNS.replace_all(&t, "\n\n").into_owned()
}

/// When a long phrase precedes an acronym, keep only the trailing words whose
/// initials spell it ("Experience with Lightning Web Components" → "Lightning Web Components").
fn trim_to_acronym(phrase: &str, acronym: &str) -> String {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let letters = acronym.chars().filter(|c| c.is_ascii_alphabetic()).count();
    if letters >= 2 && letters < words.len() {
        let tail = &words[words.len() - letters..];
        let initials: String = tail
            .iter()
            .filter_map(|w| w.chars().next())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        if initials == acronym.to_ascii_uppercase() {
            return tail.join(" ");
        }
    }
    phrase.to_string()
}

fn candidates(text: &str) -> Vec<String> {
    let mut out = Vec::new();

    for caps in PAREN_ACRONYM.captures_iter(text) {
        let acronym = caps[2].trim();
        let full = trim_to_acronym(caps[1].trim(), acronym);
        if !full.is_empty() {
            out.push(full);
        }
        if !acronym.is_empty() {
            out.push(acronym.to_string());
        }
    }

    out.extend(SLASH_CHAIN.find_iter(text).map(|m| m.as_str().to_string()));
    out.extend(SLASH_PAIR.find_iter(text).map(|m| m.as_str().to_string()));

    let mut in_hot = false;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if HOT_HEADING.is_match(line) {
            in_hot = true;
            continue;
        }
        if !in_hot && !BULLET_LINE.is_match(line) {
            continue;
        }
        let body = BULLET_PREFIX.replace(line, "");
        let body = body.trim();
        if body.is_empty() {
            continue;
        }
        for part in FRAGMENT_SPLIT.split(body) {
            let s = collapse_whitespace(part);
            let chars = s.chars().count();
            if s.is_empty()
                || s.split(' ').count() > MAX_FRAGMENT_WORDS
                || !(2..=MAX_FRAGMENT_CHARS).contains(&chars)
            {
                continue;
            }
            out.push(s);
        }
    }
    out
}

/// A first word of one to three lowercase letters is usually the tail of a word
/// the line split cut in half.
fn starts_with_fragment(cleaned: &str) -> bool {
    let first = cleaned.split_whitespace().next().unwrap_or("");
    SHORT_LOWER_WORD.is_match(first) && !ALLOW_SHORT.contains(&first)
}

/// Up to 60 deduplicated keywords, in discovery order.
pub fn extract_keywords(jd: &str) -> Vec<String> {
    let text = normalize_jd(jd);
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for raw in candidates(&text) {
        let stripped = BULLET_PREFIX.replace(&raw, "");
        let cleaned = collapse_whitespace(&TRAILING_DOTS.replace(stripped.trim(), ""));
        if cleaned.is_empty() {
            continue;
        }
        let lower = cleaned.to_lowercase();
        if BAD_STARTS.iter().any(|p| lower.starts_with(p)) {
            continue;
        }
        if starts_with_fragment(&cleaned) {
            continue;
        }
        if lower.chars().count() < 3 && !ALLOW_SHORT.contains(&lower.as_str()) {
            continue;
        }
        if BARE_WORDS.contains(&lower.as_str()) {
            continue;
        }
        let key = normalize_key(&cleaned);
        if key.is_empty() || !seen.insert(key) {
            continue;
        }
        out.push(cleaned);
        if out.len() == MAX_KEYWORDS {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parenthetical_acronym_yields_both_forms() {
        let kws = extract_keywords("• Lightning Web Components (LWC) development");
        assert!(kws.contains(&"Lightning Web Components".to_string()), "{kws:?}");
        assert!(kws.contains(&"LWC".to_string()), "{kws:?}");
    }

    #[test]
    fn test_acronym_phrase_trimmed_to_matching_words() {
        let kws = extract_keywords("We want experience with Lightning Web Components (LWC).");
        assert!(kws.contains(&"Lightning Web Components".to_string()), "{kws:?}");
    }

    #[test]
    fn test_slash_acronyms() {
        let kws = extract_keywords("You will own CI/CD and SOQL/SOSL/REST integrations.");
        assert!(kws.contains(&"CI/CD".to_string()));
        assert!(kws.contains(&"SOQL/SOSL/REST".to_string()));
        assert!(kws.contains(&"SOQL/SOSL".to_string()));
    }

    #[test]
    fn test_heading_scoped_fragments() {
        let jd = "About us: we build things.\nRequirements: Python, Kubernetes and Terraform; strong communication skills";
        let kws = extract_keywords(jd);
        assert_eq!(kws, vec!["Python", "Kubernetes", "Terraform"]);
    }

    #[test]
    fn test_lines_outside_bullets_and_headings_are_ignored() {
        assert!(extract_keywords("We are a fast-growing startup, hiring engineers").is_empty());
    }

    #[test]
    fn test_filters_boilerplate_and_fragments() {
        let jd = "• Ability to travel\n• Excellent writing\n• ing pipelines\n• R, Go, SQL\n• Experience\n• ab";
        let kws = extract_keywords(jd);
        // Single letters only survive via the acronym sources; fragments need two chars.
        assert_eq!(kws, vec!["Go", "SQL"], "{kws:?}");
    }

    #[test]
    fn test_dedupes_by_normalized_key_and_caps() {
        let jd = format!(
            "• CI-CD, ci/cd, Ci Cd\n{}",
            (0..100).map(|i| format!("• Tool{i}\n")).collect::<String>()
        );
        let kws = extract_keywords(&jd);
        assert_eq!(kws.len(), MAX_KEYWORDS);
        assert_eq!(kws[0], "CI-CD");
        assert_ne!(kws[1].to_lowercase(), "ci/cd");
    }

    #[test]
    fn test_normalize_jd_splits_headings_and_sentences() {
        let t = normalize_jd("Great team. Key Responsibilities: Build APIs• Ship");
        assert!(t.contains("Great team.\n"));
        assert!(t.contains("\nKey Responsibilities:\n"));
        assert!(t.contains("APIs\n•"), "bullet glyph starts a new line: {t:?}");
    }
}
