//! Cleans the model's resume document before any preservation rule runs.
//!
//! Placeholders become `None`, skill arrays are split and capped, duplicated header
//! text is collapsed, low-signal bullets are dropped and school rows that leaked
//! into experience are moved back to education.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::facts::finalize::is_placeholder;
use crate::models::{ContactBlock, EducationEntry, ExperienceEntry, ResumeDoc, SkillLists};
use crate::text::normalize_key;

pub const MAX_TECHNICAL_SKILLS: usize = 60;
pub const MAX_SOFT_SKILLS: usize = 40;
/// Model bullets kept per role. Base bullets are merged back uncapped later.
pub const MAX_MODEL_BULLETS_PER_ROLE: usize = 60;

const MAX_SKILL_CHARS: usize = 90;
const MAX_SKILL_WORDS: usize = 8;
const MEGA_SKILL_CHARS: usize = 60;
const MIN_BULLET_WORDS: usize = 6;

/// Topic fragments that read like bullets but carry no achievement.
pub const LOW_SIGNAL_PHRASES: &[&str] = &[
    "group discussions",
    "team performance",
    "system performance",
    "coursework",
];

lazy_static! {
    static ref LEADING_BULLET: Regex = Regex::new(r"^[•\-\*\u{2022}]+\s*").unwrap();
    static ref LIST_SEPARATOR: Regex = Regex::new(r"[,•|]").unwrap();
    static ref WIDE_GAP_OR_COMMA: Regex = Regex::new(r"\s{2,}|\s*,\s*").unwrap();
    /// Sentence punctuation at the end or followed by another word. Dots inside a
    /// token ("Node.js", ".NET") are not sentences.
    static ref SENTENCE_PUNCT: Regex = Regex::new(r"[.!?]$|[.!?]\s+\S").unwrap();
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !is_placeholder(v))
}

/// Splits mega-strings on `, • |` (or wide gaps when very long), then keeps short
/// skill phrases: at most 90 chars, 8 words and no sentence punctuation.
/// Deduplicated case-insensitively, capped at `limit`.
pub fn normalize_skill_array(items: &[String], limit: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut seen = HashSet::new();

    'items: for item in items {
        let s = item.trim();
        if s.is_empty() {
            continue;
        }
        let parts: Vec<&str> = if LIST_SEPARATOR.is_match(s) {
            LIST_SEPARATOR.split(s).collect()
        } else if s.chars().count() > MEGA_SKILL_CHARS {
            WIDE_GAP_OR_COMMA.split(s).collect()
        } else {
            vec![s]
        };

        for part in parts {
            let cleaned = LEADING_BULLET.replace(part.trim(), "");
            let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
            if cleaned.is_empty()
                || cleaned.chars().count() > MAX_SKILL_CHARS
                || SENTENCE_PUNCT.is_match(&cleaned)
                || cleaned.split(' ').count() > MAX_SKILL_WORDS
            {
                continue;
            }
            if seen.insert(cleaned.to_lowercase()) {
                out.push(cleaned);
            }
            if out.len() >= limit {
                break 'items;
            }
        }
    }
    out
}

/// "Fannie MaeFannie Mae" → "Fannie Mae"; "Tech Tech Corp" → "Tech Corp".
pub fn dedupe_exact_repeat(value: Option<&str>) -> Option<String> {
    let v = value?.trim();
    if v.is_empty() {
        return None;
    }
    let chars: Vec<char> = v.chars().collect();
    if chars.len() % 2 == 0 {
        let (a, b) = chars.split_at(chars.len() / 2);
        if a == b {
            let half: String = a.iter().collect();
            return Some(half.trim().to_string());
        }
    }

    let mut out: Vec<&str> = Vec::new();
    for word in v.split_whitespace() {
        if out.last().map_or(true, |last| !last.eq_ignore_ascii_case(word)) {
            out.push(word);
        }
    }
    let joined = out.join(" ");
    (!joined.is_empty()).then_some(joined)
}

pub fn is_low_signal_bullet(bullet: &str) -> bool {
    let n = normalize_key(bullet);
    n.split(' ').filter(|w| !w.is_empty()).count() < MIN_BULLET_WORDS
        || LOW_SIGNAL_PHRASES.iter().any(|p| n.contains(p))
}

fn sanitize_contact(c: ContactBlock) -> ContactBlock {
    ContactBlock {
        full_name: clean(c.full_name),
        email: clean(c.email),
        phone: clean(c.phone),
        location: clean(c.location),
        linkedin_url: clean(c.linkedin_url),
        github_url: clean(c.github_url),
    }
}

fn sanitize_role(e: ExperienceEntry) -> ExperienceEntry {
    ExperienceEntry {
        company: dedupe_exact_repeat(clean(e.company).as_deref()),
        title: dedupe_exact_repeat(clean(e.title).as_deref()),
        start: clean(e.start),
        end: clean(e.end),
        location: clean(e.location),
        bullets: e
            .bullets
            .into_iter()
            .map(|b| b.trim().to_string())
            .filter(|b| !is_placeholder(b) && !is_low_signal_bullet(b))
            .take(MAX_MODEL_BULLETS_PER_ROLE)
            .collect(),
    }
}

/// A row with only a school-like company and nothing else is an education entry.
fn is_leaked_education(e: &ExperienceEntry) -> bool {
    let company = e.company.as_deref().unwrap_or("").to_lowercase();
    e.title.is_none()
        && e.start.is_none()
        && e.end.is_none()
        && e.location.is_none()
        && e.bullets.is_empty()
        && (company.contains("university") || company.contains("college"))
}

pub fn sanitize_resume_doc(doc: ResumeDoc) -> ResumeDoc {
    let (leaked, experience): (Vec<ExperienceEntry>, Vec<ExperienceEntry>) = doc
        .experience
        .into_iter()
        .map(sanitize_role)
        .partition(is_leaked_education);

    let mut education: Vec<EducationEntry> = doc
        .education
        .into_iter()
        .map(|e| {
            let e = e.normalized();
            EducationEntry {
                school: dedupe_exact_repeat(clean(e.school).as_deref()),
                degree: dedupe_exact_repeat(clean(e.degree).as_deref()),
                field: dedupe_exact_repeat(clean(e.field).as_deref()),
                year: clean(e.year),
                ..Default::default()
            }
        })
        .collect();

    let mut schools: HashSet<String> = education
        .iter()
        .filter_map(|e| e.school.as_deref().map(str::to_lowercase))
        .collect();
    for e in leaked {
        if let Some(school) = e.company {
            if schools.insert(school.to_lowercase()) {
                education.push(EducationEntry {
                    school: Some(school),
                    ..Default::default()
                });
            }
        }
    }

    ResumeDoc {
        contact: sanitize_contact(doc.contact),
        summary: clean(doc.summary),
        skills: SkillLists {
            technical: normalize_skill_array(&doc.skills.technical, MAX_TECHNICAL_SKILLS),
            soft: normalize_skill_array(&doc.skills.soft, MAX_SOFT_SKILLS),
        },
        experience,
        education,
        certifications: doc
            .certifications
            .into_iter()
            .filter(|c| !is_placeholder(c))
            .collect(),
    }
}
