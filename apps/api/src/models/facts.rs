use serde::{Deserialize, Serialize};

use super::lenient;

/// Contact block. Every field is nullable; absence is never papered over with placeholders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactBlock {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub linkedin_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub github_url: Option<String>,
}

impl ContactBlock {
    pub fn fields_present(&self) -> usize {
        [
            &self.full_name,
            &self.email,
            &self.phone,
            &self.linkedin_url,
            &self.location,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub start: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub end: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    pub bullets: Vec<String>,
}

impl ExperienceEntry {
    /// "Title — Company" for logs and error messages.
    pub fn label(&self) -> String {
        [self.title.as_deref(), self.company.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" — ")
    }

    pub fn header_line(&self) -> String {
        [
            self.title.as_deref(),
            self.company.as_deref(),
            self.start.as_deref(),
            self.end.as_deref(),
            self.location.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Education row. Model drafts may send `start`/`end` instead of `year`; the alias
/// fields are folded into `year` by `EducationEntry::normalized`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub school: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub degree: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub year: Option<String>,
    #[serde(default, skip_serializing, deserialize_with = "lenient::opt_string")]
    pub start: Option<String>,
    #[serde(default, skip_serializing, deserialize_with = "lenient::opt_string")]
    pub end: Option<String>,
}

impl EducationEntry {
    pub fn normalized(mut self) -> Self {
        if self.year.is_none() {
            self.year = self.end.take().or_else(|| self.start.take());
        }
        self.start = None;
        self.end = None;
        self
    }

    pub fn line(&self) -> String {
        [
            self.school.as_deref(),
            self.degree.as_deref(),
            self.field.as_deref(),
            self.year.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Verified structured facts: the long-lived source of truth for tailoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateFacts {
    #[serde(default)]
    pub contact: ContactBlock,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub current_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub current_company: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    pub years_of_experience: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    pub technical_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    pub soft_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient::vec_skip_invalid")]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default, deserialize_with = "lenient::vec_skip_invalid")]
    pub education: Vec<EducationEntry>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    pub certifications: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub summary: Option<String>,
    #[serde(default)]
    pub quality_score: u32,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub quality_feedback: Option<String>,
}

impl CandidateFacts {
    /// Everything the facts claim, flattened to one searchable text. Used as the
    /// evidence base when deciding whether a JD keyword can be defended.
    pub fn text_for_presence(&self, raw_resume_text: Option<&str>) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(s) = &self.summary {
            parts.push(s.clone());
        }
        parts.extend(self.technical_skills.iter().cloned());
        parts.extend(self.soft_skills.iter().cloned());
        for e in &self.experience {
            parts.push(e.header_line());
            parts.extend(e.bullets.iter().cloned());
        }
        for e in &self.education {
            parts.push(e.line());
        }
        parts.extend(self.certifications.iter().cloned());
        if let Some(raw) = raw_resume_text {
            parts.push(raw.to_string());
        }
        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_education_normalized_folds_end_into_year() {
        let e: EducationEntry =
            serde_json::from_str(r#"{"school":"MIT","start":"2010","end":"2014"}"#).unwrap();
        let e = e.normalized();
        assert_eq!(e.year.as_deref(), Some("2014"));
        assert!(e.start.is_none() && e.end.is_none());
    }

    #[test]
    fn test_education_serialization_omits_alias_fields() {
        let e = EducationEntry {
            school: Some("MIT".into()),
            start: Some("2010".into()),
            ..Default::default()
        };
        let v = serde_json::to_value(&e).unwrap();
        assert!(v.get("start").is_none(), "alias fields are input-only");
        assert_eq!(v["school"], "MIT");
    }

    #[test]
    fn test_facts_skip_malformed_experience_rows() {
        let facts: CandidateFacts = serde_json::from_str(
            r#"{"experience": [{"company": "Acme", "bullets": ["Did X"]}, "garbage", 12]}"#,
        )
        .unwrap();
        assert_eq!(facts.experience.len(), 1);
        assert_eq!(facts.experience[0].company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_text_for_presence_includes_bullets_and_raw_text() {
        let facts = CandidateFacts {
            experience: vec![ExperienceEntry {
                company: Some("Acme".into()),
                title: Some("Engineer".into()),
                bullets: vec!["Built Kafka pipelines".into()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let text = facts.text_for_presence(Some("Python scripting"));
        assert!(text.contains("Kafka"));
        assert!(text.contains("Engineer Acme"));
        assert!(text.contains("Python"));
    }

    #[test]
    fn test_label_joins_title_and_company() {
        let e = ExperienceEntry {
            company: Some("Acme Corp".into()),
            title: Some("Backend Engineer".into()),
            ..Default::default()
        };
        assert_eq!(e.label(), "Backend Engineer — Acme Corp");
    }
}
