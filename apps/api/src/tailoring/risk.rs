//! Risk report: a study item for every gap the tailored resume leaves open.

use std::collections::HashSet;

use crate::models::{MissingKeyword, RiskReport, StudyItem};

pub const MAX_STUDY_ITEMS: usize = 25;

pub const DEFAULT_SUGGESTION: &str = "Read official docs; complete a focused course/module; build a small end-to-end demo project to validate competency.";

/// First row whose fragment the lowercased keyword contains wins.
pub const STUDY_SUGGESTIONS: &[(&[&str], &str)] = &[
    (
        &["pandas", "numpy"],
        "Build a data cleaning notebook (Pandas/NumPy) with joins, missing values, feature engineering, and unit-tested transforms.",
    ),
    (
        &["scikit", "sklearn"],
        "Implement 2-3 supervised ML models in scikit-learn; practice cross-validation, metrics, and model interpretation.",
    ),
    (
        &["tensorflow", "pytorch"],
        "Train a small model end-to-end; understand data loaders, training loops, evaluation, and saving/loading artifacts.",
    ),
    (
        &["spark", "hadoop"],
        "Process a large dataset with Spark (PySpark): ETL, aggregations, partitioning; understand performance and shuffle costs.",
    ),
    (
        &["mlops", "deploy", "production"],
        "Learn model packaging + deployment basics: reproducible training, model registry, batch vs realtime, monitoring and drift.",
    ),
    (
        &["risk modeling", "financial"],
        "Study baseline risk models (logistic regression, scorecards), backtesting, bias/fairness, and regulatory constraints.",
    ),
    (
        &["apex"],
        "Trailhead: Apex Basics & Database; build a small Apex service with unit tests; study bulkification + governor limits.",
    ),
    (
        &["lightning web components", "lwc"],
        "Trailhead: LWC Basics; build 2-3 components (wire/adapters); practice composition + testing.",
    ),
    (
        &["soql", "sosl"],
        "Practice SOQL/SOSL query patterns (filters, relationships); study selectivity; solve 20+ query exercises.",
    ),
    (
        &["salesforce"],
        "Study Salesforce platform architecture + security model; complete integration modules (REST/SOAP/OAuth); build a demo integration.",
    ),
    (
        &["oauth"],
        "Study OAuth 2.0 flows; implement auth code flow; document token refresh + scopes.",
    ),
    (
        &["rest", "soap", "bulk api"],
        "Build an API integration demo (REST + JSON; SOAP/Bulk API if relevant) with retries, pagination, auth, and error handling.",
    ),
];

pub fn learning_suggestion(keyword: &str) -> &'static str {
    let k = keyword.trim().to_lowercase();
    STUDY_SUGGESTIONS
        .iter()
        .find(|(fragments, _)| fragments.iter().any(|f| k.contains(f)))
        .map(|(_, suggestion)| *suggestion)
        .unwrap_or(DEFAULT_SUGGESTION)
}

/// Adds one study item per intentionally-missing keyword and per high-risk claim,
/// skipping gaps the report already covers. Capped at `MAX_STUDY_ITEMS`.
pub fn ensure_study_plan(report: &mut RiskReport, missing: &[MissingKeyword]) {
    let mut seen: HashSet<String> = report
        .defend_with_learning
        .iter()
        .filter_map(|d| d.claim_or_gap.as_deref())
        .map(|c| c.trim().to_lowercase())
        .collect();

    let gaps: Vec<String> = missing
        .iter()
        .filter_map(|m| m.keyword.clone())
        .chain(report.high_risk_claims.iter().cloned())
        .collect();

    for gap in gaps {
        let gap = gap.trim();
        if gap.is_empty() || !seen.insert(gap.to_lowercase()) {
            continue;
        }
        report
            .defend_with_learning
            .push(StudyItem::new(gap, learning_suggestion(gap)));
    }
    report.defend_with_learning.truncate(MAX_STUDY_ITEMS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learning_suggestion_table() {
        assert!(learning_suggestion("PySpark").contains("Spark"));
        assert!(learning_suggestion("Lightning Web Components (LWC)").starts_with("Trailhead: LWC"));
        assert!(learning_suggestion("RESTful APIs").contains("API integration demo"));
        assert_eq!(learning_suggestion("Snowflake"), DEFAULT_SUGGESTION);
    }

    #[test]
    fn test_study_plan_covers_gaps_once() {
        let mut report = RiskReport {
            high_risk_claims: vec!["Led Kubernetes migration".into(), "snowflake".into()],
            defend_with_learning: vec![StudyItem::new("Pandas", "custom plan")],
        };
        let missing = vec![
            MissingKeyword::new("Snowflake", "not evidenced"),
            MissingKeyword::new("pandas", "not evidenced"),
        ];
        ensure_study_plan(&mut report, &missing);

        let gaps: Vec<_> = report
            .defend_with_learning
            .iter()
            .filter_map(|d| d.claim_or_gap.clone())
            .collect();
        assert_eq!(gaps, vec!["Pandas", "Snowflake", "Led Kubernetes migration"]);
        assert_eq!(report.defend_with_learning[0].what_to_study.as_deref(), Some("custom plan"));
    }

    #[test]
    fn test_study_plan_is_capped() {
        let mut report = RiskReport::default();
        let missing: Vec<_> = (0..40)
            .map(|i| MissingKeyword::new(format!("Tool{i}"), "not evidenced"))
            .collect();
        ensure_study_plan(&mut report, &missing);
        assert_eq!(report.defend_with_learning.len(), MAX_STUDY_ITEMS);
    }
}
