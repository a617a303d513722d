//! Structural diagnostics over extracted text.
//!
//! These counts drive three decisions: which PDF reconstruction to keep, whether a
//! model draft looks incomplete, and the deterministic quality score.

use serde::Serialize;

use super::char_len;
use super::patterns::{
    BULLET_GLYPH, DASH_BULLET, EDUCATION_WORD, EDU_SIGNAL, EXPERIENCE_WORD, MONTH_YEAR,
    MONTH_YEAR_RANGE, SKILLS_WORD, STAR_BULLET, YEAR, YEAR_RANGE,
};

/// Upper-case section labels counted (by substring) as section hits.
const SECTION_LABELS: &[&str] = &[
    "EXPERIENCE",
    "WORK EXPERIENCE",
    "EDUCATION",
    "SKILLS",
    "CERTIFICATIONS",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    pub extracted_text_length: usize,
    pub extracted_lines: usize,
    pub extracted_newlines: usize,
    pub bullet_markers: usize,
    pub has_experience: bool,
    pub has_education: bool,
    pub has_skills: bool,
    pub section_hits: usize,
    pub date_ranges: usize,
    pub month_year_mentions: usize,
    pub year_mentions: usize,
    pub edu_signals: usize,
}

impl Diagnostics {
    /// Weighted extraction score. Longer text, more bullets, clear sections and
    /// date ranges all push it up; each term is capped.
    pub fn extraction_score(&self) -> f64 {
        (self.extracted_text_length as f64 / 2200.0).min(45.0)
            + (self.bullet_markers as f64 / 6.0).min(35.0)
            + (self.section_hits as f64 * 3.0).min(20.0)
            + (self.date_ranges as f64 * 5.0).min(30.0)
            + (self.year_mentions as f64 / 8.0).min(10.0)
            + (self.edu_signals as f64 / 4.0).min(10.0)
    }
}

/// The subset of diagnostics used to judge whether a parse is complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StructureEstimate {
    pub date_ranges: usize,
    pub edu_signals: usize,
    pub has_experience: bool,
    pub has_education: bool,
    pub bullet_markers: usize,
    pub month_year_mentions: usize,
}

impl From<&Diagnostics> for StructureEstimate {
    fn from(d: &Diagnostics) -> Self {
        Self {
            date_ranges: d.date_ranges,
            edu_signals: d.edu_signals,
            has_experience: d.has_experience,
            has_education: d.has_education,
            bullet_markers: d.bullet_markers,
            month_year_mentions: d.month_year_mentions,
        }
    }
}

pub fn count_bullet_markers(text: &str) -> usize {
    BULLET_GLYPH.find_iter(text).count()
        + DASH_BULLET.find_iter(text).count()
        + STAR_BULLET.find_iter(text).count()
}

pub fn compute_diagnostics(text: &str) -> Diagnostics {
    let upper = text.to_uppercase();
    let section_hits = SECTION_LABELS
        .iter()
        .filter(|label| upper.contains(*label))
        .count();

    let year_range = YEAR_RANGE.find_iter(text).count();
    let month_year = MONTH_YEAR.find_iter(text).count();
    let month_year_range = MONTH_YEAR_RANGE.find_iter(text).count();

    Diagnostics {
        extracted_text_length: char_len(text),
        extracted_lines: text.split('\n').count(),
        extracted_newlines: text.matches('\n').count(),
        bullet_markers: count_bullet_markers(text),
        has_experience: EXPERIENCE_WORD.is_match(text),
        has_education: EDUCATION_WORD.is_match(text),
        has_skills: SKILLS_WORD.is_match(text),
        section_hits,
        date_ranges: year_range.max(month_year_range).max(month_year / 2),
        month_year_mentions: month_year,
        year_mentions: YEAR.find_iter(text).count(),
        edu_signals: EDU_SIGNAL.find_iter(text).count(),
    }
}

pub fn score_extracted_text(text: &str) -> f64 {
    compute_diagnostics(text).extraction_score()
}

pub fn estimate_structure(text: &str) -> StructureEstimate {
    StructureEstimate::from(&compute_diagnostics(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Jane Doe\nWORK EXPERIENCE\nSenior Engineer — Acme Corp\nJan 2020 - Present\n• Reduced latency by 30%\n• Led migration to Kubernetes\nEngineer — Beta Inc\nMar 2017 - Dec 2019\n- Built billing service\nEDUCATION\nState University, B.Sc. 2016\nSKILLS\nRust, Go";

    #[test]
    fn test_compute_diagnostics_counts_structure() {
        let d = compute_diagnostics(SAMPLE);
        assert_eq!(d.bullet_markers, 3, "two glyph bullets and one dash bullet");
        assert_eq!(d.section_hits, 4, "EXPERIENCE, WORK EXPERIENCE, EDUCATION, SKILLS");
        assert_eq!(d.date_ranges, 2);
        assert_eq!(d.month_year_mentions, 3);
        assert!(d.has_experience && d.has_education && d.has_skills);
        assert_eq!(d.edu_signals, 1);
        assert_eq!(d.extracted_lines, SAMPLE.lines().count());
    }

    #[test]
    fn test_extraction_score_caps_each_term() {
        let d = Diagnostics {
            extracted_text_length: 10_000_000,
            bullet_markers: 10_000,
            section_hits: 100,
            date_ranges: 100,
            year_mentions: 1000,
            edu_signals: 1000,
            ..Default::default()
        };
        assert_eq!(d.extraction_score(), 45.0 + 35.0 + 20.0 + 30.0 + 10.0 + 10.0);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        assert_eq!(score_extracted_text(""), 0.0);
        let est = estimate_structure("");
        assert_eq!(est.date_ranges, 0);
        assert!(!est.has_experience);
    }

    #[test]
    fn test_month_mentions_without_ranges_count_as_half() {
        let d = compute_diagnostics("Jan 2020 something Feb 2021 other Mar 2022 and Apr 2023");
        assert_eq!(d.date_ranges, 2, "four month-year mentions imply two ranges");
    }
}
