use serde::{Deserialize, Serialize};

use super::facts::{ContactBlock, EducationEntry, ExperienceEntry};
use super::lenient;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillLists {
    #[serde(default, deserialize_with = "lenient::string_vec")]
    pub technical: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    pub soft: Vec<String>,
}

/// The rewritten resume. Contact, education and certifications are always
/// overwritten from the base facts before this leaves the tailoring engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumeDoc {
    #[serde(default)]
    pub contact: ContactBlock,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub summary: Option<String>,
    #[serde(default)]
    pub skills: SkillLists,
    #[serde(default, deserialize_with = "lenient::vec_skip_invalid")]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default, deserialize_with = "lenient::vec_skip_invalid")]
    pub education: Vec<EducationEntry>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    pub certifications: Vec<String>,
}

impl ResumeDoc {
    /// Every section except contact, flattened to lines. Keyword coverage and the
    /// length checks run over this text.
    pub fn presence_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(s) = &self.summary {
            parts.push(s.clone());
        }
        parts.extend(self.skills.technical.iter().cloned());
        parts.extend(self.skills.soft.iter().cloned());
        for e in &self.experience {
            parts.push(e.header_line());
            parts.extend(e.bullets.iter().cloned());
        }
        for e in &self.education {
            parts.push(e.line());
        }
        parts.extend(self.certifications.iter().cloned());
        parts.join("\n")
    }

    /// Experience-only text: role headers and bullets.
    pub fn experience_text(&self) -> String {
        self.experience
            .iter()
            .flat_map(|e| std::iter::once(e.header_line()).chain(e.bullets.iter().cloned()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn bullet_count(&self) -> usize {
        self.experience.iter().map(|e| e.bullets.len()).sum()
    }
}

/// A JD keyword deliberately left out of the resume, with the reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingKeyword {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub keyword: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub reason: Option<String>,
}

impl MissingKeyword {
    pub fn new(keyword: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            reason: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyItem {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub claim_or_gap: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub what_to_study: Option<String>,
}

impl StudyItem {
    pub fn new(claim_or_gap: impl Into<String>, what_to_study: impl Into<String>) -> Self {
        Self {
            claim_or_gap: Some(claim_or_gap.into()),
            what_to_study: Some(what_to_study.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    #[serde(default, deserialize_with = "lenient::string_vec")]
    pub high_risk_claims: Vec<String>,
    #[serde(default, deserialize_with = "lenient::vec_skip_invalid")]
    pub defend_with_learning: Vec<StudyItem>,
}
