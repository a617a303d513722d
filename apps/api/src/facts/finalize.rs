//! Finalize: the deterministic cleanup every fact record passes through before it
//! leaves the extractor.
//!
//! Finalize never touches `quality_score` and is idempotent: running it on its own
//! output returns the same record.

use lazy_static::lazy_static;
use regex::Regex;

use super::hints::DetectedContact;
use super::skills::finalize_skills;
use crate::models::{CandidateFacts, EducationEntry, ExperienceEntry};
use crate::text::patterns::{
    has_contact_artifact, EMAIL, EMAIL_BOUNDED, HTTP_URL_TOKEN, US_PHONE, US_PHONE_BOUNDED, WEB_URL,
    WWW_TOKEN,
};
use crate::text::sanitize;

/// Exact values (lowercased) models use instead of leaving a field empty.
pub const PLACEHOLDERS: &[&str] = &["n/a", "na", "-", "none", "null", "unknown"];

const MIN_SUMMARY_CHARS: usize = 40;
const MAX_TITLE_CHARS: usize = 80;
const MAX_TITLE_WORDS: usize = 10;
const MAX_COMPANY_CHARS: usize = 70;
const MAX_COMPANY_WORDS: usize = 6;

lazy_static! {
    static ref SPACED_CONTACT: Regex = Regex::new(r"(?i)\bC\s*O\s*N\s*T\s*A\s*C\s*T\b").unwrap();
    static ref SPACE_BEFORE_NEWLINE: Regex = Regex::new(r"\s+\n").unwrap();
    static ref BLANK_RUNS: Regex = Regex::new(r"\n{3,}").unwrap();
    static ref SPACE_RUNS: Regex = Regex::new(r"[ \t]{2,}").unwrap();
    static ref SENTENCE_PUNCT: Regex = Regex::new(r"[.!?]").unwrap();
    static ref TO_VERB: Regex = Regex::new(r"(?i)\bto\s+\w+").unwrap();
    static ref NEWLINE_IN_BULLET: Regex = Regex::new(r"\s*\n\s*").unwrap();
}

pub fn is_placeholder(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v.is_empty() || PLACEHOLDERS.contains(&v.as_str()) || v.contains("not found")
}

fn drop_placeholder(value: Option<String>) -> Option<String> {
    value.filter(|v| !is_placeholder(v))
}

/// Removes URLs, emails, phone numbers and header lines that are mostly contact
/// details. Returns `None` when nothing is left.
pub fn strip_contact_noise(value: Option<&str>) -> Option<String> {
    let s = value?;
    let s = HTTP_URL_TOKEN.replace_all(s, " ");
    let s = WWW_TOKEN.replace_all(&s, " ");
    let s = EMAIL_BOUNDED.replace_all(&s, " ");
    let s = US_PHONE_BOUNDED.replace_all(&s, " ");
    let s = SPACED_CONTACT.replace_all(&s, " ");

    let kept: Vec<&str> = s
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter(|l| {
            let lower = l.to_lowercase();
            !["linkedin.com", "github.com", "portfolio", "contact"]
                .iter()
                .any(|needle| lower.contains(needle))
                && !has_contact_artifact(l)
        })
        .collect();

    let s = kept.join("\n");
    let s = SPACE_BEFORE_NEWLINE.replace_all(&s, "\n");
    let s = BLANK_RUNS.replace_all(&s, "\n\n");
    let s = SPACE_RUNS.replace_all(&s, " ");
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn looks_like_header_fragment(s: &str, max_chars: usize, max_words: usize) -> bool {
    let s = s.trim();
    !s.is_empty()
        && s.chars().count() <= max_chars
        && !EMAIL.is_match(s)
        && !WEB_URL.is_match(s)
        && !US_PHONE.is_match(s)
        && !SENTENCE_PUNCT.is_match(s)
        && s.split_whitespace().count() <= max_words
}

pub fn is_likely_title(value: &str) -> bool {
    looks_like_header_fragment(value, MAX_TITLE_CHARS, MAX_TITLE_WORDS)
}

pub fn is_likely_company(value: &str) -> bool {
    looks_like_header_fragment(value, MAX_COMPANY_CHARS, MAX_COMPANY_WORDS) && !TO_VERB.is_match(value)
}

/// A plain summary assembled from title, company, years and top skills.
/// `None` when there is nothing to say.
pub fn fallback_summary(facts: &CandidateFacts) -> Option<String> {
    let title = facts.current_title.as_deref().unwrap_or("").trim();
    let company = facts.current_company.as_deref().unwrap_or("").trim();
    let years = facts
        .years_of_experience
        .filter(|y| y.is_finite())
        .map(|y| y.round().max(0.0) as u32);
    let top_skills: Vec<&str> = facts
        .technical_skills
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(6)
        .collect();

    if title.is_empty() && company.is_empty() && years.unwrap_or(0) == 0 && top_skills.is_empty() {
        return None;
    }

    let role = match (title.is_empty(), company.is_empty()) {
        (false, false) => format!("{title} with experience at {company}"),
        (false, true) => title.to_string(),
        (true, false) => format!("professional with experience at {company}"),
        (true, true) => "professional".to_string(),
    };

    let mut parts = vec![match years {
        Some(y) => format!("Experienced {role} with {y}+ years of industry experience."),
        None => format!("Experienced {role}."),
    }];
    if !top_skills.is_empty() {
        parts.push(format!("Strong in {}.", top_skills.join(", ")));
    }
    parts.push("Open to roles that leverage these strengths to deliver measurable impact.".to_string());
    Some(parts.join(" "))
}

/// Trims field lengths and flattens bullets to single lines. Entries are never dropped.
pub fn normalize_experience_entry(e: ExperienceEntry) -> ExperienceEntry {
    ExperienceEntry {
        company: sanitize(e.company.as_deref(), 200),
        title: sanitize(e.title.as_deref(), 200),
        start: sanitize(e.start.as_deref(), 40),
        end: sanitize(e.end.as_deref(), 40),
        location: sanitize(e.location.as_deref(), 120),
        bullets: e
            .bullets
            .iter()
            .map(|b| NEWLINE_IN_BULLET.replace_all(b, " ").trim().to_string())
            .filter(|b| !b.is_empty())
            .collect(),
    }
}

pub fn normalize_education_entry(e: EducationEntry) -> EducationEntry {
    let e = e.normalized();
    EducationEntry {
        school: sanitize(e.school.as_deref(), 200),
        degree: sanitize(e.degree.as_deref(), 200),
        field: sanitize(e.field.as_deref(), 200),
        year: sanitize(e.year.as_deref(), 40),
        start: None,
        end: None,
    }
}

pub fn finalize(mut facts: CandidateFacts, detected: &DetectedContact) -> CandidateFacts {
    // Placeholders are dropped before the regex detections fill the gaps.
    let c = &mut facts.contact;
    let fill = |v: Option<String>, found: &Option<String>, max: usize| {
        let v = drop_placeholder(v).or_else(|| found.clone());
        sanitize(drop_placeholder(v).as_deref(), max)
    };
    c.full_name = fill(c.full_name.take(), &None, 200);
    c.email = fill(c.email.take(), &detected.email, 255);
    c.phone = fill(c.phone.take(), &detected.phone, 30);
    c.location = fill(c.location.take(), &None, 200);
    c.linkedin_url = fill(c.linkedin_url.take(), &detected.linkedin_url, 500);
    c.github_url = fill(c.github_url.take(), &detected.github_url, 500);

    let clean_header = |v: Option<String>| {
        let v = drop_placeholder(v);
        sanitize(strip_contact_noise(v.as_deref()).as_deref(), 200)
    };
    facts.current_title = clean_header(facts.current_title.take()).filter(|t| is_likely_title(t));
    facts.current_company =
        clean_header(facts.current_company.take()).filter(|c| is_likely_company(c));

    let summary = drop_placeholder(facts.summary.take());
    facts.summary = sanitize(strip_contact_noise(summary.as_deref()).as_deref(), 2000);
    facts.quality_feedback = sanitize(facts.quality_feedback.as_deref(), 1000);

    facts.years_of_experience = facts
        .years_of_experience
        .filter(|y| y.is_finite() && *y >= 0.0);

    let (technical, soft) = finalize_skills(&facts.technical_skills, &facts.soft_skills);
    facts.technical_skills = technical;
    facts.soft_skills = soft;

    facts.experience = std::mem::take(&mut facts.experience)
        .into_iter()
        .map(normalize_experience_entry)
        .collect();
    facts.education = std::mem::take(&mut facts.education)
        .into_iter()
        .map(normalize_education_entry)
        .collect();
    facts.certifications = std::mem::take(&mut facts.certifications)
        .into_iter()
        .filter_map(|c| sanitize(Some(&c), 200))
        .filter(|c| !is_placeholder(c))
        .collect();

    let short = facts
        .summary
        .as_deref()
        .map(|s| s.trim().chars().count() < MIN_SUMMARY_CHARS)
        .unwrap_or(true);
    if short {
        facts.summary = fallback_summary(&facts);
    }

    facts
}
