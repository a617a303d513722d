use std::collections::HashSet;

use serde::Serialize;

use crate::text::normalize_key;

/// Bidirectional spellings that should count as the same keyword.
pub const KEYWORD_ALIASES: &[(&str, &str)] = &[
    ("ci cd", "cicd"),
    ("salesforce dx", "sfdx"),
    ("lightning web components", "lwc"),
];

const SHORT_VARIANT_CHARS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Coverage {
    pub score: u32,
    pub total: usize,
    pub matched_count: usize,
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

/// Normalized spellings under which a keyword may appear in a resume.
pub fn keyword_variants(keyword: &str) -> Vec<String> {
    let base = normalize_key(keyword);
    if base.is_empty() {
        return Vec::new();
    }

    let mut variants = vec![base.clone()];
    let mut add = |v: String| {
        if !v.is_empty() && !variants.contains(&v) {
            variants.push(v);
        }
    };
    if keyword.contains('/') {
        for part in keyword.split('/') {
            add(normalize_key(part));
        }
    }
    add(base.replace(' ', ""));
    for (a, b) in KEYWORD_ALIASES {
        if base == *a {
            add(b.to_string());
        } else if base == *b {
            add(a.to_string());
        }
    }
    variants
}

/// Variants of three characters or fewer must be a whole token ("go" is not in "google").
fn variant_present(haystack: &str, tokens: &HashSet<&str>, variant: &str) -> bool {
    if variant.chars().count() <= SHORT_VARIANT_CHARS && !variant.contains(' ') {
        tokens.contains(variant)
    } else {
        haystack.contains(variant)
    }
}

/// Tags each keyword matched or missing against `text`, keeping keyword order.
pub fn coverage(text: &str, keywords: &[String]) -> Coverage {
    let haystack = normalize_key(text);
    let tokens: HashSet<&str> = haystack.split(' ').filter(|t| !t.is_empty()).collect();
    let (matched, missing): (Vec<String>, Vec<String>) = keywords
        .iter()
        .cloned()
        .partition(|k| {
            keyword_variants(k)
                .iter()
                .any(|v| variant_present(&haystack, &tokens, v))
        });

    let total = keywords.len();
    let score = (100.0 * matched.len() as f64 / total.max(1) as f64).round() as u32;
    Coverage {
        score: score.min(100),
        total,
        matched_count: matched.len(),
        matched,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kws(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_coverage_scores_and_keeps_order() {
        let c = coverage(
            "Built Kafka pipelines on AWS with Terraform",
            &kws(&["Terraform", "Kubernetes", "AWS", "Kafka"]),
        );
        assert_eq!(c.matched, vec!["Terraform", "AWS", "Kafka"]);
        assert_eq!(c.missing, vec!["Kubernetes"]);
        assert_eq!(c.score, 75);
        assert_eq!(c.matched_count, 3);
    }

    #[test]
    fn test_slash_parts_and_spacing_variants() {
        let c = coverage("Owned the CICD setup and REST services", &kws(&["CI/CD", "REST/SOAP"]));
        assert_eq!(c.matched, vec!["CI/CD", "REST/SOAP"], "cicd and the REST part both count");
    }

    #[test]
    fn test_aliases_work_in_both_directions() {
        let c = coverage("Shipped LWC widgets", &kws(&["Lightning Web Components"]));
        assert_eq!(c.score, 100);
        let c = coverage("Built lightning web components", &kws(&["LWC"]));
        assert_eq!(c.score, 100);
    }

    #[test]
    fn test_short_keywords_need_a_whole_token() {
        let c = coverage("Worked at Google on good search tooling", &kws(&["Go", "R", "SQL"]));
        assert_eq!(c.score, 0, "{c:?}");
        let c = coverage("Wrote Go services and R notebooks; SQL tuning", &kws(&["Go", "R", "SQL"]));
        assert_eq!(c.score, 100, "{c:?}");
    }

    #[test]
    fn test_empty_keyword_list_scores_zero() {
        let c = coverage("anything", &[]);
        assert_eq!(c.score, 0);
        assert_eq!(c.total, 0);
    }

    #[test]
    fn test_coverage_is_deterministic() {
        let list = kws(&["Go", "Rust", "gRPC", "Postgres"]);
        let text = "Rust and Go services over gRPC";
        assert_eq!(coverage(text, &list), coverage(text, &list));
    }
}
