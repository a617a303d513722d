//! JD-independent resume quality score (0–100).
//!
//! Model-reported scores cluster high and drift between calls; this one is computed
//! from the extracted text and the parsed facts only, and every point is itemized.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::models::CandidateFacts;
use crate::text::compute_diagnostics;

lazy_static! {
    static ref PERCENT: Regex = Regex::new(r"\b\d+(?:\.\d+)?\s*%").unwrap();
    static ref DOLLARS: Regex = Regex::new(r"\$\s*\d+").unwrap();
    static ref MAGNITUDE: Regex = Regex::new(r"(?i)\b\d+(?:\.\d+)?\s*(?:k|m|b)\b").unwrap();
    static ref IMPACT_VERB: Regex =
        Regex::new(r"(?i)\b(?:saved|reduced|increased|improved|grew|accelerated)\b").unwrap();
}

/// (minimum text length, ceiling) pairs, loosest first.
const LENGTH_CEILINGS: &[(usize, u32)] = &[(1200, 90), (800, 80), (200, 65)];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QualityComponents {
    pub contact: f64,
    pub structure: f64,
    pub bullets: f64,
    pub dates: f64,
    pub skills: f64,
    pub quantification: f64,
}

impl QualityComponents {
    pub fn total(&self) -> f64 {
        self.contact + self.structure + self.bullets + self.dates + self.skills + self.quantification
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityPenalty {
    pub reason: &'static str,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityBreakdown {
    pub components: QualityComponents,
    pub quantification_signals: usize,
    pub penalties: Vec<QualityPenalty>,
    /// Lowest length ceiling that applied, if any.
    pub length_cap: Option<u32>,
    pub score: u32,
}

fn ratio(n: usize, full_at: f64) -> f64 {
    (n as f64 / full_at).clamp(0.0, 1.0)
}

pub fn count_quantification_signals(text: &str) -> usize {
    PERCENT.find_iter(text).count()
        + DOLLARS.find_iter(text).count()
        + MAGNITUDE.find_iter(text).count()
        + IMPACT_VERB.find_iter(text).count()
}

pub fn quality_score(text: &str, facts: &CandidateFacts) -> QualityBreakdown {
    let diag = compute_diagnostics(text);
    let exp_count = facts.experience.len();
    let edu_count = facts.education.len();
    let tech_count = facts.technical_skills.len();
    let soft_count = facts.soft_skills.len();
    let summary_len = facts
        .summary
        .as_deref()
        .map(|s| s.trim().chars().count())
        .unwrap_or(0);

    let c = &facts.contact;
    let has_email = c.email.is_some();
    let quant = count_quantification_signals(text);

    let components = QualityComponents {
        contact: [
            (has_email, 4.0),
            (c.phone.is_some(), 3.0),
            (c.linkedin_url.is_some(), 1.0),
            (c.github_url.is_some(), 1.0),
            (c.location.is_some(), 1.0),
        ]
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, pts)| pts)
        .sum(),
        structure: (diag.section_hits as f64 * 3.0).min(12.0)
            + match exp_count {
                0 => 0.0,
                1 => 3.0,
                _ => 6.0,
            }
            + if edu_count >= 1 { 2.0 } else { 0.0 }
            + if summary_len >= 80 {
                2.0
            } else if summary_len >= 40 {
                1.0
            } else {
                0.0
            },
        bullets: 18.0 * ratio(diag.bullet_markers, 16.0),
        dates: 10.0 * ratio(diag.date_ranges, 5.0),
        skills: 14.0 * ratio(tech_count, 28.0) + 4.0 * ratio(soft_count, 10.0),
        quantification: 22.0 * ratio(quant, 14.0),
    };

    let len = diag.extracted_text_length;
    let mut penalties = Vec::new();
    let mut penalize = |applies: bool, reason: &'static str, points: f64| {
        if applies {
            penalties.push(QualityPenalty { reason, points });
        }
    };
    penalize(len < 1200, "text shorter than 1200 characters", 10.0);
    penalize(len < 800, "text shorter than 800 characters", 10.0);
    penalize(exp_count < 1, "no experience entries", 20.0);
    penalize(diag.bullet_markers < 6, "fewer than 6 bullets", 10.0);
    penalize(tech_count < 8, "fewer than 8 technical skills", 6.0);
    penalize(!has_email, "no email address", 8.0);

    let mut total = components.total() - penalties.iter().map(|p| p.points).sum::<f64>();

    let length_cap = LENGTH_CEILINGS
        .iter()
        .filter(|(min_len, _)| len < *min_len)
        .map(|(_, cap)| *cap)
        .min();
    if let Some(cap) = length_cap {
        total = total.min(cap as f64);
    }

    QualityBreakdown {
        components,
        quantification_signals: quant,
        penalties,
        length_cap,
        score: clamp_score(total),
    }
}

/// Rounds and clamps to 0–100; non-finite input scores zero.
pub fn clamp_score(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.round().clamp(0.0, 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactBlock, EducationEntry, ExperienceEntry};

    fn strong_facts() -> CandidateFacts {
        CandidateFacts {
            contact: ContactBlock {
                full_name: Some("Jane Doe".into()),
                email: Some("jane@x.dev".into()),
                phone: Some("555-123-4567".into()),
                location: Some("Austin, TX".into()),
                linkedin_url: Some("https://linkedin.com/in/jane".into()),
                github_url: Some("https://github.com/jane".into()),
            },
            technical_skills: (0..30).map(|i| format!("Skill{i}")).collect(),
            soft_skills: (0..10).map(|i| format!("Soft{i}")).collect(),
            experience: vec![ExperienceEntry::default(), ExperienceEntry::default()],
            education: vec![EducationEntry::default()],
            summary: Some("x".repeat(120)),
            ..Default::default()
        }
    }

    fn strong_text() -> String {
        let mut t = String::from("WORK EXPERIENCE\nEDUCATION\nSKILLS\nCERTIFICATIONS\n");
        for year in 2010..2016 {
            t.push_str(&format!("Engineer\nJan {year} - Dec {}\n", year + 1));
        }
        for i in 0..16 {
            t.push_str(&format!("• Reduced cost by {i}% and saved $2{i}0 across teams\n"));
        }
        while t.len() < 1500 {
            t.push_str("Additional context about responsibilities and scope.\n");
        }
        t
    }

    #[test]
    fn test_complete_resume_scores_full_marks() {
        let b = quality_score(&strong_text(), &strong_facts());
        assert_eq!(b.components.contact, 10.0);
        assert_eq!(b.components.structure, 22.0);
        assert_eq!(b.components.bullets, 18.0);
        assert_eq!(b.components.dates, 10.0);
        assert_eq!(b.components.skills, 18.0);
        assert_eq!(b.components.quantification, 22.0);
        assert!(b.penalties.is_empty(), "unexpected penalties: {:?}", b.penalties);
        assert_eq!(b.length_cap, None);
        assert_eq!(b.score, 100);
    }

    #[test]
    fn test_penalties_are_itemized() {
        let b = quality_score("Jane Doe", &CandidateFacts::default());
        let reasons: Vec<&str> = b.penalties.iter().map(|p| p.reason).collect();
        assert_eq!(reasons.len(), 6, "every penalty applies: {reasons:?}");
        assert_eq!(b.length_cap, Some(65));
        assert_eq!(b.score, 0);
    }

    #[test]
    fn test_score_does_not_increase_as_text_shrinks() {
        let facts = strong_facts();
        let full = strong_text();
        let mut previous = quality_score(&full, &facts).score;
        for len in [1199, 799, 199, 50] {
            let cut: String = full.chars().take(len).collect();
            let score = quality_score(&cut, &facts).score;
            assert!(
                score <= previous,
                "score rose from {previous} to {score} when text shrank to {len} chars"
            );
            previous = score;
        }
    }

    #[test]
    fn test_quantification_signals() {
        let text = "Grew revenue 40% to $3M; cut p99 by 2.5k ms and improved uptime";
        // 40% | $3 | 3M, 2.5k | grew, improved
        assert_eq!(count_quantification_signals(text), 6);
    }

    #[test]
    fn test_clamp_score() {
        assert_eq!(clamp_score(-12.0), 0);
        assert_eq!(clamp_score(100.6), 100);
        assert_eq!(clamp_score(71.5), 72);
        assert_eq!(clamp_score(f64::NAN), 0);
    }
}
