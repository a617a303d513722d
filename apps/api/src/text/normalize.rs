use lazy_static::lazy_static;
use regex::{Captures, Regex};

use super::truncate_chars;

/// Hard cap on normalized text, in characters.
pub const MAX_TEXT_CHARS: usize = 300_000;

/// Acronyms that PDF glyph streams often emit letter-by-letter ("H T M L").
/// Order matters: HTML5 must be repaired before HTML.
pub const SPACED_ACRONYMS: &[&str] = &[
    "HTML5", "HTML", "XML", "JSON", "ITSM", "ITOM", "ITBM", "HRSD", "SDLC", "REST", "SOAP",
];

lazy_static! {
    static ref INTRA_LINE_SPACES: Regex = Regex::new(r"[ \u{00A0}]{2,}").unwrap();
    static ref BLANK_RUNS: Regex = Regex::new(r"\n{3,}").unwrap();
    static ref NON_ALNUM: Regex = Regex::new(r"[^\p{L}\p{N}]+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref ACRONYM_REPAIRS: Vec<(Regex, &'static str)> = SPACED_ACRONYMS
        .iter()
        .map(|acronym| {
            let spaced = acronym
                .chars()
                .map(|c| regex::escape(&c.to_string()))
                .collect::<Vec<_>>()
                .join(r"[ \u{00A0}]*");
            (Regex::new(&format!(r"(?i)\b{spaced}\b")).unwrap(), *acronym)
        })
        .collect();
}

/// Cleans extracted text while keeping line structure intact.
///
/// Line breaks carry bullets and section boundaries, so only intra-line whitespace
/// is collapsed. At most one blank line survives between paragraphs.
pub fn normalize(raw: &str) -> String {
    let t = raw.replace("\r\n", "\n").replace('\r', "\n").replace('\t', " ");

    let lines: Vec<String> = t
        .split('\n')
        .map(|l| INTRA_LINE_SPACES.replace_all(l, " ").trim().to_string())
        .collect();

    let mut kept: Vec<&str> = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        let prev_non_blank = i > 0 && !lines[i - 1].is_empty();
        if !line.is_empty() || prev_non_blank {
            kept.push(line);
        }
    }

    let joined = kept.join("\n");
    let mut t = BLANK_RUNS.replace_all(&joined, "\n\n").trim().to_string();
    for (re, acronym) in ACRONYM_REPAIRS.iter() {
        // Only spaced-out spellings are repaired; "rest" and "json" in prose stay as written.
        t = re
            .replace_all(&t, |caps: &Captures| {
                if caps[0].contains(|c: char| c == ' ' || c == '\u{00A0}') {
                    acronym.to_string()
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned();
    }
    truncate_chars(&t, MAX_TEXT_CHARS)
}

/// Lowercase, non-alphanumerics to single spaces, trimmed. The comparison key used
/// for keywords, role headers and bullets.
pub fn normalize_key(s: &str) -> String {
    let lower = s.to_lowercase();
    NON_ALNUM
        .replace_all(&lower, " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Collapses every whitespace run (newlines included) to one space.
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_blank_runs_and_spaces() {
        let raw = "Jane  Doe\r\n\r\n\r\n\r\nSenior\tEngineer   at  Acme\n\n\n";
        assert_eq!(normalize(raw), "Jane Doe\n\nSenior Engineer at Acme");
    }

    #[test]
    fn test_normalize_repairs_spaced_acronyms() {
        let out = normalize("Built H T M L 5 pages and J S O N APIs over R E S T");
        assert_eq!(out, "Built HTML5 pages and JSON APIs over REST");
    }

    #[test]
    fn test_normalize_leaves_ordinary_words_alone() {
        let prose = "Mentored the rest of the team; wrote json and soap adapters";
        assert_eq!(normalize(prose), prose);
        assert_eq!(normalize("Rest API"), "Rest API");
    }

    #[test]
    fn test_acronym_table_order_puts_html5_first() {
        let html5 = SPACED_ACRONYMS.iter().position(|a| *a == "HTML5");
        let html = SPACED_ACRONYMS.iter().position(|a| *a == "HTML");
        assert!(html5 < html, "HTML5 must be repaired before HTML");
    }

    #[test]
    fn test_normalize_truncates_long_text() {
        let raw = "a".repeat(MAX_TEXT_CHARS + 10);
        assert_eq!(normalize(&raw).chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("A  b\n\n\n\nC\u{00A0}\u{00A0}d");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key("  CI/CD — Pipelines!! "), "ci cd pipelines");
        assert_eq!(normalize_key("Node.js"), "node js");
    }
}
