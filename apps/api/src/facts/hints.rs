//! Deterministic hints scanned from the extracted text before any model call:
//! heading-scoped sections, role and education candidates, and regex contact detection.
//!
//! Hints are partial by nature. They seed the draft prompt and backfill entries the
//! model drops; they are never treated as complete facts on their own.

use std::collections::{BTreeMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::models::{CandidateFacts, EducationEntry, ExperienceEntry};
use crate::text::patterns::{
    first_match, stitch_wrapped_urls, DATE_RANGE_LINE, EDU_LINE, EMAIL_PATTERNS,
    GITHUB_PROFILE_LINK, GITHUB_WITH_SCHEME, LINKEDIN_ANY_LINK, LINKEDIN_BARE,
    LINKEDIN_PROFILE_LINK, LINKEDIN_WITH_SCHEME, PHONE_PATTERNS,
};
use crate::text::truncate_chars;

lazy_static! {
    static ref SECTION_HEADINGS: Vec<(&'static str, Regex)> = vec![
        ("experience", Regex::new(r"^(?:WORK\s+)?EXPERIENCE\b").unwrap()),
        ("education", Regex::new(r"^EDUCATION\b").unwrap()),
        ("skills", Regex::new(r"^(?:TECHNICAL\s+)?SKILLS\b").unwrap()),
        ("certifications", Regex::new(r"^CERTIFICATIONS?\b").unwrap()),
        ("projects", Regex::new(r"^PROJECTS?\b").unwrap()),
    ];
    static ref HEADER_SEPARATOR: Regex = Regex::new(r"—|–|-|@|\|").unwrap();
}

// ────────────────────────────────────────────────────────────────────────────
// Sections
// ────────────────────────────────────────────────────────────────────────────

/// Text under the first EXPERIENCE and EDUCATION headings, each cut at the next
/// known heading. `index` maps heading keys to their line numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sections {
    pub experience_text: String,
    pub education_text: String,
    pub index: BTreeMap<&'static str, usize>,
}

pub fn extract_sections(text: &str) -> Sections {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut index: BTreeMap<&'static str, usize> = BTreeMap::new();

    for (i, line) in lines.iter().enumerate() {
        let upper = line.trim().to_uppercase();
        if upper.is_empty() {
            continue;
        }
        for (key, re) in SECTION_HEADINGS.iter() {
            if !index.contains_key(key) && re.is_match(&upper) {
                index.insert(key, i);
            }
        }
    }

    let cut = |key: &str| -> String {
        let Some(&start) = index.get(key) else {
            return String::new();
        };
        let end = index
            .values()
            .copied()
            .filter(|&n| n > start)
            .min()
            .unwrap_or(lines.len());
        lines[start + 1..end.max(start + 1)].join("\n").trim().to_string()
    };

    Sections {
        experience_text: cut("experience"),
        education_text: cut("education"),
        index,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Entry hints
// ────────────────────────────────────────────────────────────────────────────

fn split_header(header: &str) -> Vec<String> {
    HEADER_SEPARATOR
        .split(header)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn title_and_company(parts: &[String]) -> (Option<String>, Option<String>) {
    (Some(parts[0].clone()), Some(parts[1..].join(" ")))
}

/// One candidate role per date-range line. The header is the previous line (or the
/// one before it), read as "Title — Company".
pub fn experience_hints(text: &str) -> Vec<ExperienceEntry> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if !DATE_RANGE_LINE.is_match(line) {
            continue;
        }
        let prev1 = i.checked_sub(1).map(|j| lines[j]).unwrap_or("");
        let prev2 = i.checked_sub(2).map(|j| lines[j]).unwrap_or("");
        let header = if prev1.is_empty() { prev2 } else { prev1 };
        let header2 = if !prev1.is_empty() && !prev2.is_empty() { prev2 } else { "" };

        let parts = split_header(header);
        let (title, company) = if parts.len() >= 2 {
            title_and_company(&parts)
        } else {
            let parts2 = split_header(header2);
            if parts2.len() >= 2 {
                title_and_company(&parts2)
            } else {
                ((!header.is_empty()).then(|| header.to_string()), None)
            }
        };

        let key = format!(
            "{}|{}|{}",
            title.as_deref().unwrap_or("").to_lowercase(),
            company.as_deref().unwrap_or("").to_lowercase(),
            line.to_lowercase()
        );
        if !seen.insert(key) {
            continue;
        }
        out.push(ExperienceEntry {
            title: title.filter(|t| !t.is_empty()),
            company: company.filter(|c| !c.is_empty()),
            ..Default::default()
        });
    }
    out
}

/// Lines mentioning a school or degree word, deduplicated by school.
pub fn education_hints(text: &str) -> Vec<EducationEntry> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && EDU_LINE.is_match(l))
        .filter(|l| seen.insert(l.to_lowercase()))
        .map(|l| EducationEntry {
            school: Some(l.to_string()),
            ..Default::default()
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// Contact detection
// ────────────────────────────────────────────────────────────────────────────

/// Contact values found by regex. These are trusted over model output when the
/// model leaves a field empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetectedContact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
}

fn with_scheme(url: &str) -> String {
    if url.to_lowercase().starts_with("http") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Scans the text, then falls back to embedded hyperlinks for LinkedIn and GitHub.
pub fn detect_contact(text: &str, link_urls: &[String]) -> DetectedContact {
    let email = first_match(&EMAIL_PATTERNS, text).map(|e| truncate_chars(&e, 255));
    let phone = first_match(&PHONE_PATTERNS, text).map(|p| truncate_chars(&p, 30));

    let stitched = stitch_wrapped_urls(text);
    let mut linkedin_url = LINKEDIN_WITH_SCHEME
        .find(&stitched)
        .or_else(|| LINKEDIN_BARE.find(&stitched))
        .map(|m| truncate_chars(with_scheme(m.as_str()).trim(), 500));
    let mut github_url = GITHUB_WITH_SCHEME
        .find(&stitched)
        .map(|m| truncate_chars(m.as_str().trim(), 500));

    let pick = |re: &Regex| link_urls.iter().find(|u| re.is_match(u)).cloned();
    if linkedin_url.is_none() {
        linkedin_url = pick(&LINKEDIN_PROFILE_LINK).or_else(|| pick(&LINKEDIN_ANY_LINK));
    }
    if github_url.is_none() {
        github_url = pick(&GITHUB_PROFILE_LINK);
    }

    DetectedContact {
        email,
        phone,
        linkedin_url,
        github_url,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Hint bundle
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Hints {
    pub sections: Sections,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub contact: DetectedContact,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HintCounts {
    pub experience_detected: usize,
    pub education_detected: usize,
}

impl Hints {
    /// Entry hints come from the matching section when one was found, otherwise
    /// from the whole text.
    pub fn scan(text: &str, link_urls: &[String]) -> Self {
        let sections = extract_sections(text);
        let scope = |section: &str| -> String {
            if section.is_empty() {
                text.to_string()
            } else {
                section.to_string()
            }
        };
        let experience = experience_hints(&scope(&sections.experience_text));
        let education = education_hints(&scope(&sections.education_text));
        Self {
            contact: detect_contact(text, link_urls),
            sections,
            experience,
            education,
        }
    }

    pub fn counts(&self) -> HintCounts {
        HintCounts {
            experience_detected: self.experience.len(),
            education_detected: self.education.len(),
        }
    }
}

/// When at least two entries were hinted and the model returned fewer, appends the
/// hint entries past the model's count.
pub fn merge_if_ai_drops(facts: &mut CandidateFacts, hints: &Hints) {
    if hints.experience.len() >= 2 && facts.experience.len() < hints.experience.len() {
        let from = facts.experience.len();
        facts.experience.extend(hints.experience[from..].iter().cloned());
    }
    if hints.education.len() >= 2 && facts.education.len() < hints.education.len() {
        let from = facts.education.len();
        facts.education.extend(hints.education[from..].iter().cloned());
    }
}
