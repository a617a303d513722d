//! AI-assisted fact extraction as an explicit state machine:
//!
//!   Draft → VerifyCompleteness → (Recover) → Finalize → score
//!
//! Each stage hands a typed result to the next. A draft that cannot reach the model
//! degrades to the heuristic parse; every later stage only ever adds entries.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::finalize::finalize;
use super::heuristic::{heuristic_parse, name_from_filename};
use super::hints::{merge_if_ai_drops, HintCounts, Hints};
use super::prompts::{
    parse_resume_tool, parse_system_prompt, MAX_PROMPT_HINTS, MAX_PROMPT_RESUME_CHARS,
    PARSE_USER_TEMPLATE, RETRY_USER_SUFFIX,
};
use super::recover::{merge_append_missing, recover_experience};
use crate::config::{Timeouts, TuningConfig};
use crate::errors::AppError;
use crate::llm_client::{call_tool, ChatProvider, ChatRequest};
use crate::models::lenient;
use crate::models::{CandidateFacts, ContactBlock, EducationEntry, ExperienceEntry};
use crate::scoring::{calibrate, quality_score, QualityBreakdown, ScoreCalibration};
use crate::text::{estimate_structure, truncate_chars, StructureEstimate};

/// Recovery reads the experience section only when it has at least this much text.
const MIN_EXPERIENCE_SECTION_CHARS: usize = 1200;

// ────────────────────────────────────────────────────────────────────────────
// Stage results
// ────────────────────────────────────────────────────────────────────────────

/// Output of the draft call (or the heuristic parse).
#[derive(Debug, Clone, Default)]
pub struct DraftFacts {
    pub facts: CandidateFacts,
    /// Score the model reported for the resume, before blending.
    pub ai_score: Option<f64>,
    pub feedback: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VerifiedFacts {
    pub draft: DraftFacts,
    pub retried: bool,
    pub retry_reason: Option<String>,
}

impl VerifiedFacts {
    fn unverified(draft: DraftFacts) -> Self {
        Self {
            draft,
            retried: false,
            retry_reason: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecoveredFacts {
    pub verified: VerifiedFacts,
    pub chunks_sent: usize,
    pub chunks_failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseMode {
    Ai,
    Heuristic,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ParsedCounts {
    pub experience_count: usize,
    pub education_count: usize,
}

impl ParsedCounts {
    fn of(facts: &CandidateFacts) -> Self {
        Self {
            experience_count: facts.experience.len(),
            education_count: facts.education.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FactDiagnostics {
    pub provider: String,
    pub parse_retried: bool,
    pub parse_retry_reason: Option<String>,
    pub estimated_structure: StructureEstimate,
    pub parsed_counts: ParsedCounts,
    pub deterministic_hints: HintCounts,
    pub score_calibration: ScoreCalibration,
    pub quality_breakdown: QualityBreakdown,
    pub recovery_chunks: usize,
    pub recovery_failed_chunks: usize,
    pub name_from_filename: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FactExtraction {
    pub facts: CandidateFacts,
    pub mode: ParseMode,
    pub warning: Option<String>,
    pub diagnostics: FactDiagnostics,
}

// ────────────────────────────────────────────────────────────────────────────
// Tool arguments
// ────────────────────────────────────────────────────────────────────────────

/// `parse_resume` arguments. Every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
struct ParseResumeArgs {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    full_name: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    email: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    phone: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    location: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    linkedin_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    github_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    current_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    current_company: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    years_of_experience: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    technical_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    soft_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient::vec_skip_invalid")]
    experience: Vec<ExperienceEntry>,
    #[serde(default, deserialize_with = "lenient::vec_skip_invalid")]
    education: Vec<EducationEntry>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    certifications: Vec<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    summary: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    ats_score: Option<f64>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    ats_feedback: Option<String>,
}

impl From<ParseResumeArgs> for DraftFacts {
    fn from(a: ParseResumeArgs) -> Self {
        DraftFacts {
            facts: CandidateFacts {
                contact: ContactBlock {
                    full_name: a.full_name,
                    email: a.email,
                    phone: a.phone,
                    location: a.location,
                    linkedin_url: a.linkedin_url,
                    github_url: a.github_url,
                },
                current_title: a.current_title,
                current_company: a.current_company,
                years_of_experience: a.years_of_experience,
                technical_skills: a.technical_skills,
                soft_skills: a.soft_skills,
                experience: a.experience,
                education: a.education.into_iter().map(EducationEntry::normalized).collect(),
                certifications: a.certifications,
                summary: a.summary,
                quality_score: 0,
                quality_feedback: None,
            },
            ai_score: a.ats_score,
            feedback: a.ats_feedback,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Completeness checks
// ────────────────────────────────────────────────────────────────────────────

/// Returns the retry reason when the draft's counts fall short of what the text shows.
pub fn should_retry(facts: &CandidateFacts, est: &StructureEstimate) -> Option<String> {
    let exp = facts.experience.len();
    let edu = facts.education.len();

    if est.date_ranges >= 3 && exp < 2 {
        return Some(format!(
            "Detected {} date-ranges but extracted {} experience entries",
            est.date_ranges, exp
        ));
    }
    if (est.has_experience || est.bullet_markers >= 8 || est.month_year_mentions >= 4) && exp < 2 {
        return Some(format!(
            "Resume indicates multiple roles (experience:{}, bullets:{}, month-years:{}) but extracted {} experience entries",
            est.has_experience, est.bullet_markers, est.month_year_mentions, exp
        ));
    }
    if (est.has_education || est.edu_signals >= 2) && edu < 2 {
        return Some(format!(
            "Detected education signals but extracted {} education entries",
            edu
        ));
    }
    None
}

/// True when the experience list is still shorter than the text suggests after verification.
pub fn looks_short(experience_count: usize, hinted: usize, est: &StructureEstimate) -> bool {
    (hinted >= 3 && experience_count < 2.max(hinted * 3 / 4))
        || (est.date_ranges >= 4 && experience_count < 3)
        || (est.month_year_mentions >= 6 && experience_count < 3)
        || (est.bullet_markers >= 12 && experience_count < 3)
}

// ────────────────────────────────────────────────────────────────────────────
// Extractor
// ────────────────────────────────────────────────────────────────────────────

pub struct FactExtractor {
    provider: Arc<dyn ChatProvider>,
    tuning: TuningConfig,
    timeouts: Timeouts,
}

impl FactExtractor {
    pub fn new(provider: Arc<dyn ChatProvider>, tuning: TuningConfig, timeouts: Timeouts) -> Self {
        Self {
            provider,
            tuning,
            timeouts,
        }
    }

    /// Runs the full pipeline over already-extracted text. `file_name` is only used
    /// to recover a candidate name when the text yields none.
    pub async fn extract(
        &self,
        text: &str,
        hints: &Hints,
        file_name: Option<&str>,
    ) -> Result<FactExtraction, AppError> {
        let est = estimate_structure(text);
        info!(
            "Regex contact detection: email={} phone={} linkedin={} github={}",
            hints.contact.email.is_some(),
            hints.contact.phone.is_some(),
            hints.contact.linkedin_url.is_some(),
            hints.contact.github_url.is_some()
        );

        // Stage 1: Draft (heuristic on provider failure)
        let (verified, mode, warning) = match self.draft(text, hints, None).await {
            Ok(draft) => (self.verify(draft, text, hints, &est).await, ParseMode::Ai, None),
            Err(e) => {
                warn!("Draft extraction failed, using heuristic parse: {}", e);
                let mut draft = heuristic_parse(text, hints.contact.email.as_deref());
                merge_if_ai_drops(&mut draft.facts, hints);
                (
                    VerifiedFacts::unverified(draft),
                    ParseMode::Heuristic,
                    Some(e.to_string()),
                )
            }
        };

        // Stage 3: Recover (AI mode only)
        let recovered = match mode {
            ParseMode::Ai => self.recover(verified, text, hints, &est).await,
            ParseMode::Heuristic => RecoveredFacts {
                verified,
                chunks_sent: 0,
                chunks_failed: 0,
            },
        };

        // Stage 4: Finalize and score
        let RecoveredFacts {
            verified,
            chunks_sent,
            chunks_failed,
        } = recovered;
        let VerifiedFacts {
            draft,
            retried,
            retry_reason,
        } = verified;

        let mut facts = draft.facts;
        facts.quality_feedback = draft.feedback;
        let mut facts = finalize(facts, &hints.contact);

        let breakdown = quality_score(text, &facts);
        let calibration = calibrate(draft.ai_score, breakdown.score, &self.tuning);
        facts.quality_score = calibration.final_score;

        let mut used_filename = false;
        if facts.contact.full_name.is_none() {
            warn!("No candidate name extracted, trying the file name");
            match name_from_filename(file_name) {
                Some(name) => {
                    info!("Using name from file name: {}", name);
                    facts.contact.full_name = Some(name);
                    used_filename = true;
                }
                None => return Err(AppError::NameExtractionFailed),
            }
        }

        let parsed_counts = ParsedCounts::of(&facts);
        info!(
            "Parsed resume: mode={:?} exp={} edu={} score={}{}",
            mode,
            parsed_counts.experience_count,
            parsed_counts.education_count,
            facts.quality_score,
            retry_reason
                .as_deref()
                .map(|r| format!(" (retried: {r})"))
                .unwrap_or_default()
        );

        Ok(FactExtraction {
            facts,
            mode,
            warning,
            diagnostics: FactDiagnostics {
                provider: self.provider.name().to_string(),
                parse_retried: retried,
                parse_retry_reason: retry_reason,
                estimated_structure: est,
                parsed_counts,
                deterministic_hints: hints.counts(),
                score_calibration: calibration,
                quality_breakdown: breakdown,
                recovery_chunks: chunks_sent,
                recovery_failed_chunks: chunks_failed,
                name_from_filename: used_filename,
            },
        })
    }

    fn draft_user_prompt(text: &str, hints: &Hints, retry_reason: Option<&str>) -> String {
        let hint_json = |v: serde_json::Result<String>| v.unwrap_or_else(|_| "[]".to_string());
        let exp_hints = &hints.experience[..hints.experience.len().min(MAX_PROMPT_HINTS)];
        let edu_hints = &hints.education[..hints.education.len().min(MAX_PROMPT_HINTS)];
        let c = &hints.contact;

        let prompt = PARSE_USER_TEMPLATE
            .replace("{email}", c.email.as_deref().unwrap_or(""))
            .replace("{phone}", c.phone.as_deref().unwrap_or(""))
            .replace("{linkedin}", c.linkedin_url.as_deref().unwrap_or(""))
            .replace("{exp_count}", &hints.experience.len().to_string())
            .replace("{edu_count}", &hints.education.len().to_string())
            .replace("{exp_hints}", &hint_json(serde_json::to_string(exp_hints)))
            .replace("{edu_hints}", &hint_json(serde_json::to_string(edu_hints)))
            .replace("{resume_text}", &truncate_chars(text, MAX_PROMPT_RESUME_CHARS));

        match retry_reason {
            Some(reason) => format!("{}\n\n{}", prompt, RETRY_USER_SUFFIX.replace("{reason}", reason)),
            None => prompt,
        }
    }

    /// Stage 1. The model's entries are backfilled from hints when it drops some.
    async fn draft(
        &self,
        text: &str,
        hints: &Hints,
        retry_reason: Option<&str>,
    ) -> Result<DraftFacts, AppError> {
        let request = ChatRequest::with_tool(
            parse_system_prompt(retry_reason.is_some()),
            Self::draft_user_prompt(text, hints, retry_reason),
            parse_resume_tool(),
            self.timeouts.extract,
        );
        let args: ParseResumeArgs = call_tool(self.provider.as_ref(), &request).await?;
        let mut draft = DraftFacts::from(args);
        merge_if_ai_drops(&mut draft.facts, hints);
        Ok(draft)
    }

    /// Stage 2. One retry when counts fall short; a failed retry keeps the first draft.
    async fn verify(
        &self,
        draft: DraftFacts,
        text: &str,
        hints: &Hints,
        est: &StructureEstimate,
    ) -> VerifiedFacts {
        let Some(reason) = should_retry(&draft.facts, est) else {
            return VerifiedFacts::unverified(draft);
        };

        info!("Draft looked incomplete, retrying: {}", reason);
        let draft = match self.draft(text, hints, Some(&reason)).await {
            Ok(retried) => retried,
            Err(e) => {
                warn!("Retry draft failed, keeping the first draft: {}", e);
                draft
            }
        };
        VerifiedFacts {
            draft,
            retried: true,
            retry_reason: Some(reason),
        }
    }

    /// Stage 3. Chunked re-extraction when the experience list still looks short.
    async fn recover(
        &self,
        mut verified: VerifiedFacts,
        text: &str,
        hints: &Hints,
        est: &StructureEstimate,
    ) -> RecoveredFacts {
        let count = verified.draft.facts.experience.len();
        if !looks_short(count, hints.experience.len(), est) {
            return RecoveredFacts {
                verified,
                chunks_sent: 0,
                chunks_failed: 0,
            };
        }

        let section = hints.sections.experience_text.trim();
        let source = if section.chars().count() >= MIN_EXPERIENCE_SECTION_CHARS {
            section
        } else {
            text
        };
        let recovery = recover_experience(
            self.provider.as_ref(),
            source,
            &self.tuning,
            self.timeouts.recovery,
        )
        .await;
        info!(
            "Experience recovery: {} chunks sent, {} failed, {} roles returned",
            recovery.chunks_sent,
            recovery.chunks_failed,
            recovery.entries.len()
        );

        let facts = &mut verified.draft.facts;
        if !recovery.entries.is_empty() {
            facts.experience = merge_append_missing(
                std::mem::take(&mut facts.experience),
                recovery.entries,
                self.tuning.bullet_duplicate_threshold,
            );
        }
        RecoveredFacts {
            verified,
            chunks_sent: recovery.chunks_sent,
            chunks_failed: recovery.chunks_failed,
        }
    }
}
