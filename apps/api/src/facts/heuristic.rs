//! Regex-only parse used when the draft cannot reach a model.
//!
//! Produces contact links, a headline title/company guess, years of experience and a
//! skill list. Experience and education stay empty; the deterministic hints are
//! merged in by the extractor.

use lazy_static::lazy_static;
use regex::Regex;

use super::finalize::strip_contact_noise;
use super::skills::normalize_skill_list;
use super::DraftFacts;
use crate::models::{CandidateFacts, ContactBlock};
use crate::text::patterns::{
    stitch_wrapped_urls, GITHUB_WITH_SCHEME, LINKEDIN_BARE, LINKEDIN_WITH_SCHEME,
};
use crate::text::{collapse_whitespace, truncate_chars};

pub const HEURISTIC_SCORE: f64 = 50.0;
pub const HEURISTIC_FEEDBACK: &str =
    "Heuristic parse (AI not configured). Add an AI key for better extraction.";

const MAX_HEURISTIC_SKILLS: usize = 60;

/// Common technologies matched anywhere in the text.
pub const KEYWORD_SKILLS: &[&str] = &[
    "JavaScript", "TypeScript", "React", "Next.js", "Node.js", "Express", "Python", "Java", "C#",
    ".NET", "Go", "Ruby", "PostgreSQL", "MySQL", "MongoDB", "Redis", "AWS", "Azure", "GCP",
    "Docker", "Kubernetes", "Terraform", "REST", "GraphQL", "CI/CD", "Git", "Jenkins",
    "GitHub Actions", "Agile", "Scrum",
];

lazy_static! {
    static ref YEARS: Regex = Regex::new(r"(?i)(\d{1,2})\s*\+?\s*years?").unwrap();
    static ref TITLE: Regex = Regex::new(
        r"(?i)\b(Senior|Lead|Principal|Staff|Junior|Mid[- ]Level)?\s*(Software Engineer|Engineer|Developer|Full Stack Developer|Frontend Developer|Backend Developer|Data Scientist|Data Engineer|ML Engineer|DevOps Engineer|SRE|Product Manager|Project Manager|Business Analyst|QA Engineer|Test Engineer)\b"
    ).unwrap();
    static ref COMPANY_AT: Regex = Regex::new(r"\b(?:at|@)\s+([A-Z][A-Za-z0-9&.,\- ]{2,60})\b").unwrap();
    static ref COMPANY_LABEL: Regex = Regex::new(r"(?i)\bCompany[:\s]+([A-Z][A-Za-z0-9&.,\- ]{2,60})\b").unwrap();
    static ref SKILLS_SECTION: Regex = Regex::new(r"(?i)\b(?:skills|technical skills)\b[:\s]+(.{0,800})").unwrap();
    static ref SKILL_SPLIT: Regex = Regex::new(r"[,;|•·\u{2022}]").unwrap();
    static ref KEYWORD_SKILL_PATTERNS: Vec<(&'static str, Regex)> = KEYWORD_SKILLS
        .iter()
        .map(|k| (*k, Regex::new(&format!(r"(?i)\b{}\b", regex::escape(k))).unwrap()))
        .collect();

    static ref FILE_EXTENSION: Regex = Regex::new(r"(?i)\.(?:pdf|docx?|txt)$").unwrap();
    static ref FILE_NOISE: Vec<Regex> = [
        r"(?i)curriculum\s+vitae",
        r"(?i)resume",
        r"(?i)cv",
        r"_+",
        r"\d{4,}",
        r"\(.*?\)",
        r"\[.*?\]",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
    static ref NAME_WORD: Regex = Regex::new(r"^[A-Za-z][A-Za-z'-]*$").unwrap();
}

pub fn heuristic_parse(text: &str, detected_email: Option<&str>) -> DraftFacts {
    let t = collapse_whitespace(&stitch_wrapped_urls(text));

    let linkedin_url = LINKEDIN_WITH_SCHEME
        .find(&t)
        .or_else(|| LINKEDIN_BARE.find(&t))
        .map(|m| {
            let url = m.as_str();
            let url = if url.to_lowercase().starts_with("http") {
                url.to_string()
            } else {
                format!("https://{url}")
            };
            truncate_chars(&url, 500)
        });
    let github_url = GITHUB_WITH_SCHEME
        .find(&t)
        .map(|m| truncate_chars(m.as_str(), 500));

    let years_of_experience = YEARS
        .captures_iter(&t)
        .filter_map(|c| c[1].parse::<u32>().ok())
        .max()
        .map(f64::from);

    let current_title = TITLE.captures(&t).map(|c| {
        match c.get(1) {
            Some(level) => format!("{} {}", level.as_str(), &c[2]),
            None => c[2].to_string(),
        }
        .trim()
        .to_string()
    });

    let current_company = COMPANY_AT
        .captures(&t)
        .or_else(|| COMPANY_LABEL.captures(&t))
        .map(|c| c[1].trim().to_string());

    let mut raw_skills: Vec<String> = SKILLS_SECTION
        .captures(&t)
        .map(|c| {
            SKILL_SPLIT
                .split(&c[1])
                .map(str::trim)
                .filter(|s| (2..=40).contains(&s.chars().count()))
                .take(30)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    raw_skills.extend(
        KEYWORD_SKILL_PATTERNS
            .iter()
            .filter(|(_, re)| re.is_match(&t))
            .map(|(k, _)| k.to_string()),
    );

    let head: String = t.chars().take(800).collect();

    DraftFacts {
        facts: CandidateFacts {
            contact: ContactBlock {
                email: detected_email.map(str::to_string),
                linkedin_url,
                github_url,
                ..Default::default()
            },
            current_title,
            current_company,
            years_of_experience,
            technical_skills: normalize_skill_list(&raw_skills, MAX_HEURISTIC_SKILLS),
            summary: strip_contact_noise(Some(&head)),
            ..Default::default()
        },
        ai_score: Some(HEURISTIC_SCORE),
        feedback: Some(HEURISTIC_FEEDBACK.to_string()),
    }
}

/// "Jane_Doe_Resume_2024.pdf" → "Jane Doe". Two to four name-like words are kept
/// as-is, longer runs are cut to three, and a single word needs three letters.
pub fn name_from_filename(file_name: Option<&str>) -> Option<String> {
    let name = FILE_EXTENSION.replace(file_name?.trim(), "");
    let mut name = name.trim().to_string();
    for re in FILE_NOISE.iter() {
        name = re.replace_all(&name, " ").into_owned();
    }
    let words: Vec<&str> = name
        .split_whitespace()
        .filter(|w| NAME_WORD.is_match(w))
        .collect();

    match words.len() {
        2..=4 => Some(words.join(" ")),
        n if n > 4 => Some(words[..3].join(" ")),
        1 if words[0].chars().count() >= 3 => Some(words[0].to_string()),
        _ => None,
    }
}
