//! Structural ATS score for a tailored document.
//!
//! Keyword lists alone cannot make a partial resume score well: roles, bullets,
//! skills and length each contribute a capped share, and short documents are capped hard.

use serde::Serialize;

use super::quality::clamp_score;
use crate::models::ResumeDoc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ResumeStats {
    pub exp_count: usize,
    pub edu_count: usize,
    pub cert_count: usize,
    pub bullets_count: usize,
    pub tech_skills_count: usize,
    pub soft_skills_count: usize,
    pub char_count: usize,
    pub contact_fields_present: usize,
}

impl ResumeStats {
    pub fn of(doc: &ResumeDoc) -> Self {
        Self {
            exp_count: doc.experience.len(),
            edu_count: doc.education.len(),
            cert_count: doc.certifications.len(),
            bullets_count: doc.bullet_count(),
            tech_skills_count: doc.skills.technical.len(),
            soft_skills_count: doc.skills.soft.len(),
            char_count: doc.presence_text().trim().chars().count(),
            contact_fields_present: doc.contact.fields_present(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StructuralScore {
    pub score: u32,
    pub stats: ResumeStats,
}

const LENGTH_CAPS: &[(usize, f64)] = &[(600, 55.0), (350, 45.0), (200, 35.0)];

pub fn structural_score(doc: &ResumeDoc) -> StructuralScore {
    let s = ResumeStats::of(doc);

    let mut score = (s.contact_fields_present as f64 * 2.0).min(10.0);
    score += if s.char_count >= 200 {
        10.0
    } else if s.char_count >= 80 {
        6.0
    } else if s.char_count >= 30 {
        3.0
    } else {
        0.0
    };
    score += (s.tech_skills_count as f64 * 1.2).min(12.0);
    score += s.soft_skills_count.min(3) as f64;
    score += (s.exp_count as f64 * 6.0).min(20.0);
    score += (s.bullets_count as f64 * 1.5).min(25.0);
    if s.edu_count >= 1 {
        score += 6.0;
    }
    if s.cert_count >= 1 {
        score += 4.0;
    }

    for (min_len, cap) in LENGTH_CAPS {
        if s.char_count < *min_len {
            score = score.min(*cap);
        }
    }

    StructuralScore {
        score: clamp_score(score),
        stats: s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ContactBlock, EducationEntry, ExperienceEntry, SkillLists};

    fn full_doc() -> ResumeDoc {
        let role = |c: &str| ExperienceEntry {
            company: Some(c.into()),
            title: Some("Engineer".into()),
            bullets: (0..6)
                .map(|i| format!("Delivered measurable platform improvement number {i} for {c}"))
                .collect(),
            ..Default::default()
        };
        ResumeDoc {
            contact: ContactBlock {
                full_name: Some("Jane".into()),
                email: Some("j@x.dev".into()),
                phone: Some("555".into()),
                location: Some("Austin".into()),
                linkedin_url: Some("https://linkedin.com/in/j".into()),
                github_url: None,
            },
            summary: Some("Backend engineer focused on reliability.".into()),
            skills: SkillLists {
                technical: (0..10).map(|i| format!("Tool{i}")).collect(),
                soft: vec!["Leadership".into(), "Mentoring".into(), "Communication".into()],
            },
            experience: vec![role("Acme"), role("Beta"), role("Gamma"), role("Delta")],
            education: vec![EducationEntry {
                school: Some("State University".into()),
                ..Default::default()
            }],
            certifications: vec!["CKA".into()],
        }
    }

    #[test]
    fn test_full_document_reaches_the_ceiling() {
        let s = structural_score(&full_doc());
        assert_eq!(s.stats.contact_fields_present, 5);
        assert_eq!(s.stats.bullets_count, 24);
        // 10 contact + 10 length + 15 skills + 45 experience + 10 education/certs
        assert_eq!(s.score, 90);
    }

    #[test]
    fn test_short_document_is_capped() {
        let doc = ResumeDoc {
            contact: full_doc().contact,
            skills: SkillLists {
                technical: vec!["Rust".into(), "Go".into()],
                soft: vec![],
            },
            ..Default::default()
        };
        let s = structural_score(&doc);
        assert!(s.stats.char_count < 200);
        assert!(s.score <= 35, "tiny documents cap at 35, got {}", s.score);
    }

    #[test]
    fn test_contact_is_excluded_from_length() {
        let doc = ResumeDoc {
            contact: full_doc().contact,
            ..Default::default()
        };
        assert_eq!(ResumeStats::of(&doc).char_count, 0);
    }
}
