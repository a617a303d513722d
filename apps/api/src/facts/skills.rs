//! Skill-list cleanup: filler rejection, canonical spellings and soft/technical split.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::text::patterns::has_contact_artifact;

pub const MAX_TECHNICAL_SKILLS: usize = 100;
pub const MAX_SOFT_SKILLS: usize = 60;
/// Per-list cap applied before classification.
const NORMALIZE_LIMIT: usize = 80;
const MAX_SKILL_WORDS: usize = 4;
const MAX_SKILL_CHARS: usize = 50;

/// Lowercased spelling → canonical name.
pub const CANONICAL_SKILLS: &[(&str, &str)] = &[
    ("node js", "Node.js"),
    ("nodejs", "Node.js"),
    ("react js", "React"),
    ("micro services", "Microservices"),
    ("microservices", "Microservices"),
    ("spring boot", "Spring Boot"),
    ("aws", "AWS"),
    ("sql", "SQL"),
    ("graphql", "GraphQL"),
    ("typescript", "TypeScript"),
    ("javascript", "JavaScript"),
    ("devops", "DevOps"),
    ("devops tooling", "DevOps Tooling"),
    ("junit", "JUnit"),
    ("jmeter", "JMeter"),
    ("cucumber", "Cucumber"),
    ("selenium", "Selenium"),
    ("swiftui", "SwiftUI"),
    ("ios", "iOS"),
    ("api design", "API Design"),
];

/// Interpersonal skills that belong in the soft list even when a model files them as technical.
pub const SOFT_SKILLS: &[&str] = &[
    "leadership",
    "communication",
    "teamwork",
    "collaboration",
    "stakeholder management",
    "stakeholder",
    "management",
    "people management",
    "mentoring",
    "coaching",
    "problem solving",
    "problem-solving",
    "critical thinking",
    "strategic thinking",
    "technical strategy",
    "business innovation",
    "innovation",
    "presentation",
    "negotiation",
    "time management",
    "project management",
    "organizational skills",
    "adaptability",
];

const FILLER_STARTS: &[&str] = &["and "];
const FILLER_PHRASES: &[&str] = &["such as", "experience in", "experience with", "to achieve"];

lazy_static! {
    static ref LEADING_BULLET: Regex = Regex::new(r"^[•\-*\u{2022}]+\s*").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref TITLE_CASEABLE: Regex = Regex::new(r"(?i)^[a-z0-9 .+#-]{2,40}$").unwrap();
}

/// Known spellings map to their canonical name; other short skills are title-cased
/// word by word, with words of two characters or fewer upper-cased.
pub fn canonicalize_skill(raw: &str) -> String {
    let s = WHITESPACE.replace_all(raw.trim(), " ").into_owned();
    let lower = s.to_lowercase();
    if let Some((_, canonical)) = CANONICAL_SKILLS.iter().find(|(k, _)| *k == lower) {
        return canonical.to_string();
    }
    if TITLE_CASEABLE.is_match(&s) {
        return s
            .split(' ')
            .filter(|w| !w.is_empty())
            .map(|w| {
                if w.chars().count() <= 2 {
                    w.to_uppercase()
                } else {
                    let mut chars = w.chars();
                    match chars.next() {
                        Some(first) => first.to_uppercase().chain(chars).collect(),
                        None => String::new(),
                    }
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
    }
    s
}

pub fn is_soft_skill(s: &str) -> bool {
    let v = s.trim().to_lowercase();
    !v.is_empty() && SOFT_SKILLS.contains(&v.as_str())
}

/// Cleans, canonicalizes and deduplicates (case-insensitively) up to `limit` skills.
pub fn normalize_skill_list(items: &[String], limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for item in items {
        let s = LEADING_BULLET.replace(item.trim(), "");
        let s = WHITESPACE.replace_all(s.trim(), " ").trim().to_string();
        if s.is_empty() {
            continue;
        }
        let lower = s.to_lowercase();
        if FILLER_STARTS.iter().any(|p| lower.starts_with(p))
            || FILLER_PHRASES.iter().any(|p| lower.contains(p))
            || has_contact_artifact(&s)
        {
            continue;
        }
        if s.split(' ').count() > MAX_SKILL_WORDS || s.chars().count() > MAX_SKILL_CHARS {
            continue;
        }

        let canonical = canonicalize_skill(&s);
        if !seen.insert(canonical.to_lowercase()) {
            continue;
        }
        out.push(canonical);
        if out.len() >= limit {
            break;
        }
    }
    out
}

/// Moves soft skills out of the technical list. The given soft list keeps its order
/// and moved entries are appended after it.
pub fn post_classify(technical: Vec<String>, soft: Vec<String>) -> (Vec<String>, Vec<String>) {
    let mut seen_soft = HashSet::new();
    let mut soft_out: Vec<String> = soft
        .into_iter()
        .filter(|s| seen_soft.insert(s.to_lowercase()))
        .collect();

    let mut seen_tech = HashSet::new();
    let mut tech_out = Vec::new();
    for s in technical {
        let key = s.to_lowercase();
        if is_soft_skill(&s) {
            if seen_soft.insert(key) {
                soft_out.push(s);
            }
        } else if seen_tech.insert(key) {
            tech_out.push(s);
        }
    }
    (tech_out, soft_out)
}

/// Full skill pass used by Finalize.
pub fn finalize_skills(technical: &[String], soft: &[String]) -> (Vec<String>, Vec<String>) {
    let (mut tech, mut soft) = post_classify(
        normalize_skill_list(technical, NORMALIZE_LIMIT),
        normalize_skill_list(soft, NORMALIZE_LIMIT),
    );
    tech.truncate(MAX_TECHNICAL_SKILLS);
    soft.truncate(MAX_SOFT_SKILLS);
    (tech, soft)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_canonical_table_entries_are_fixed_points() {
        for (_, canonical) in CANONICAL_SKILLS {
            assert_eq!(
                canonicalize_skill(canonical),
                *canonical,
                "canonicalizing {canonical} again must not change it"
            );
        }
    }

    #[test]
    fn test_canonicalize_title_cases_unknown_skills() {
        assert_eq!(canonicalize_skill("node js"), "Node.js");
        assert_eq!(canonicalize_skill("kafka streams"), "Kafka Streams");
        assert_eq!(canonicalize_skill("ci cd"), "CI CD");
        assert_eq!(canonicalize_skill("C++ (modern)"), "C++ (modern)");
    }

    #[test]
    fn test_soft_vocabulary_is_lowercase() {
        for s in SOFT_SKILLS {
            assert_eq!(*s, s.to_lowercase(), "{s} must be stored lowercased");
        }
    }

    #[test]
    fn test_normalize_rejects_filler_and_contact_noise() {
        let out = normalize_skill_list(
            &list(&[
                "• React",
                "react",
                "and experience in Java",
                "tools such as Jira",
                "jane@x.dev",
                "https://github.com/jane",
                "a very long sentence about many things",
                "Postgres",
            ]),
            10,
        );
        assert_eq!(out, vec!["React", "Postgres"]);
    }

    #[test]
    fn test_normalize_respects_limit() {
        let items: Vec<String> = (0..20).map(|i| format!("Tool{i}")).collect();
        assert_eq!(normalize_skill_list(&items, 5).len(), 5);
    }

    #[test]
    fn test_post_classify_moves_soft_skills() {
        let (tech, soft) = post_classify(
            list(&["Rust", "Leadership", "Mentoring", "Rust"]),
            list(&["Communication", "leadership"]),
        );
        assert_eq!(tech, vec!["Rust"]);
        assert_eq!(soft, vec!["Communication", "leadership", "Mentoring"]);
    }

    #[test]
    fn test_agile_stays_technical() {
        let (tech, soft) = post_classify(list(&["Agile", "Scrum"]), vec![]);
        assert_eq!(tech.len(), 2);
        assert!(soft.is_empty());
    }

    #[test]
    fn test_finalize_skills_is_stable() {
        let (tech, soft) = finalize_skills(&list(&["node js", "AWS", "Leadership"]), &[]);
        let again = finalize_skills(&tech, &soft);
        assert_eq!((tech, soft), again);
    }
}
