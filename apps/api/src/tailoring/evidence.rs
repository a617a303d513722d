//! Keyword placement: which JD keywords may be added to the Skills section.
//!
//! A keyword is added only when the base facts already mention it or when an
//! adjacent technology in the same family is evidenced (Python → Pandas). Anything
//! else is recorded as intentionally missing and stripped from whatever skills or
//! bullets the model put it in. Keywords are never added to bullets.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::warn;

use super::sanitize::{normalize_skill_array, MAX_SOFT_SKILLS, MAX_TECHNICAL_SKILLS};
use crate::models::{MissingKeyword, ResumeDoc};
use crate::text::similarity::token_set;

pub const INTENTIONALLY_MISSING_REASON: &str =
    "Not evidenced in the base resume; omitted from Skills to avoid an indefensible claim.";

/// Terms too generic to place in Skills, lowercased.
pub const GENERIC_TERMS: &[&str] = &[
    "communication",
    "collaboration",
    "leadership",
    "mentoring",
    "problem solving",
    "problem-solving",
    "integrity",
    "accountability",
    "delivery",
    "execution",
    "architecture",
    "design",
    "scalable",
    "resilient",
];

/// Very short keywords that name a skill on their own.
const SHORT_ALLOW: &[&str] = &["R", "C", "Go", "AI", "ML"];

lazy_static! {
    static ref ACRONYM: Regex = Regex::new(r"\b[A-Z]{2,}\b").unwrap();
}

/// Looks like a product, tool or technical phrase rather than a soft trait.
pub fn looks_like_concrete(keyword: &str) -> bool {
    let s = keyword.trim();
    if SHORT_ALLOW.contains(&s) {
        return true;
    }
    if s.chars().count() < 2 {
        return false;
    }
    if GENERIC_TERMS.contains(&s.to_lowercase().as_str()) {
        return false;
    }
    let has_letters = s.chars().any(|c| c.is_alphabetic());
    let has_digit_or_acronym = ACRONYM.is_match(s) || s.chars().any(|c| c.is_ascii_digit());
    let has_parens = s.contains('(') && s.contains(')');
    has_letters && (has_digit_or_acronym || has_parens || s.chars().count() >= 4)
}

/// Technology families the base facts evidence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evidence {
    pub python: bool,
    pub sql: bool,
    pub ml: bool,
    pub cloud: bool,
    pub big_data: bool,
}

impl Evidence {
    pub fn scan(base_text: &str) -> Self {
        let lower = base_text.to_lowercase();
        let tokens = token_set(base_text);
        let any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));
        Self {
            python: lower.contains("python"),
            sql: lower.contains("sql"),
            ml: tokens.contains("ml") || any(&["machine learning", "model"]),
            cloud: any(&["aws", "azure", "gcp", "cloud"]),
            big_data: any(&["spark", "hadoop", "big data", "etl"]),
        }
    }
}

/// One adjacency rule: a keyword containing any fragment (or equal to it, when
/// `exact`) is supported when `supported` holds for the base evidence.
pub struct AdjacentRule {
    pub fragments: &'static [&'static str],
    pub exact: bool,
    pub supported: fn(&Evidence) -> bool,
}

pub const ADJACENT_EVIDENCE: &[AdjacentRule] = &[
    AdjacentRule {
        fragments: &["pandas", "numpy"],
        exact: false,
        supported: |e| e.python,
    },
    AdjacentRule {
        fragments: &["scikit", "sklearn"],
        exact: false,
        supported: |e| e.python || e.ml,
    },
    AdjacentRule {
        fragments: &["tensorflow", "pytorch"],
        exact: false,
        supported: |e| e.python && e.ml,
    },
    AdjacentRule {
        fragments: &["spark", "hadoop"],
        exact: false,
        supported: |e| e.big_data || e.cloud,
    },
    AdjacentRule {
        fragments: &["mlops", "deploy"],
        exact: false,
        supported: |e| e.ml || e.cloud,
    },
    AdjacentRule {
        fragments: &["r"],
        exact: true,
        supported: |e| e.python || e.sql || e.ml,
    },
];

pub fn supported_by_adjacent_evidence(keyword: &str, evidence: &Evidence) -> bool {
    let k = keyword.trim().to_lowercase();
    ADJACENT_EVIDENCE.iter().any(|rule| {
        let hit = if rule.exact {
            rule.fragments.contains(&k.as_str())
        } else {
            rule.fragments.iter().any(|f| k.contains(f))
        };
        hit && (rule.supported)(evidence)
    })
}

/// Substring match, except that keywords of three characters or fewer must match a
/// whole token ("R" is not evidenced by "React").
fn mentions(text_lower: &str, tokens: &HashSet<String>, keyword_lower: &str) -> bool {
    if keyword_lower.chars().count() <= 3 && keyword_lower.chars().all(char::is_alphanumeric) {
        tokens.contains(keyword_lower)
    } else {
        text_lower.contains(keyword_lower)
    }
}

fn mentioned_in(text: &str, keyword_lower: &str) -> bool {
    mentions(&text.to_lowercase(), &token_set(text), keyword_lower)
}

/// Places JD keywords against the base facts, never against the model's output.
///
/// An evidenced keyword is added to technical skills unless the experience text
/// already carries it. An unevidenced keyword is stripped from the model's skills
/// and bullets (base bullets are merged back later) and returned as intentionally
/// missing.
pub fn place_keywords(doc: &mut ResumeDoc, base_text: &str, keywords: &[String]) -> Vec<MissingKeyword> {
    let base = base_text.to_lowercase();
    let base_tokens = token_set(base_text);
    let evidence = Evidence::scan(base_text);
    let mut missing = Vec::new();

    for keyword in keywords {
        let k = keyword.trim();
        if !looks_like_concrete(k) {
            continue;
        }
        let lower = k.to_lowercase();

        if mentions(&base, &base_tokens, &lower) || supported_by_adjacent_evidence(k, &evidence) {
            let in_experience = mentioned_in(&doc.experience_text(), &lower);
            let in_skills = doc.skills.technical.iter().any(|s| s.to_lowercase() == lower);
            if !in_experience && !in_skills {
                doc.skills.technical.push(k.to_string());
            }
            continue;
        }

        let skills_before = doc.skills.technical.len();
        doc.skills.technical.retain(|s| !mentioned_in(s, &lower));
        let mut bullets_dropped = 0;
        for role in doc.experience.iter_mut() {
            let before = role.bullets.len();
            role.bullets.retain(|b| !mentioned_in(b, &lower));
            bullets_dropped += before - role.bullets.len();
        }
        if skills_before != doc.skills.technical.len() || bullets_dropped > 0 {
            warn!(
                "Removed unevidenced keyword {:?} from {} skills and {} bullets",
                k,
                skills_before - doc.skills.technical.len(),
                bullets_dropped
            );
        }
        missing.push(MissingKeyword::new(k, INTENTIONALLY_MISSING_REASON));
    }

    doc.skills.technical = normalize_skill_array(&doc.skills.technical, MAX_TECHNICAL_SKILLS);
    doc.skills.soft = normalize_skill_array(&doc.skills.soft, MAX_SOFT_SKILLS);
    missing
}
