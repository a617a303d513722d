//! Tailoring Engine — rewrites a resume for a job description without losing content.
//!
//! Each attempt runs: Request → Sanitize → Keyword placement → Preservation →
//! Immutability → Risk plan → Score. Attempts repeat, with the missing keywords fed
//! back, until the ATS target is met or the attempt budget runs out. The
//! best-scoring attempt is returned either way.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::evidence::place_keywords;
use super::preservation::{enforce_immutable, enforce_preservation};
use super::prompts::{generate_tailored_resume_tool, retry_note, tailor_system_prompt, TAILOR_USER_TEMPLATE};
use super::risk::ensure_study_plan;
use super::sanitize::{normalize_skill_array, sanitize_resume_doc, MAX_SOFT_SKILLS, MAX_TECHNICAL_SKILLS};
use crate::config::{Timeouts, TuningConfig};
use crate::errors::AppError;
use crate::facts::finalize::{normalize_education_entry, normalize_experience_entry};
use crate::keywords::{coverage, extract_keywords, Coverage};
use crate::llm_client::{call_tool, ChatProvider, ChatRequest};
use crate::models::lenient;
use crate::models::{CandidateFacts, MissingKeyword, ResumeDoc, RiskReport, StudyItem};
use crate::scoring::{structural_score, StructuralScore};

/// Ceiling for the ATS estimate of a structurally incomplete resume.
pub const INCOMPLETE_ATS_CAP: u32 = 55;
const MIN_TOTAL_BULLETS: usize = 6;
const MAX_IMPROVEMENTS: usize = 10;
const MAX_QUESTIONS: usize = 12;

pub const INCOMPLETE_IMPROVEMENT: &str = "Resume output is structurally incomplete (missing roles/education/bullets). Re-run parsing with a text-based resume (DOCX preferred) or paste resume text to improve extraction fidelity.";
pub const INCOMPLETE_QUESTION: &str = "Your resume extraction appears incomplete. If you have a DOCX version of your resume, upload that as the base resume (or paste plain text) so all roles and education are captured.";

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct TailorInput {
    pub facts: CandidateFacts,
    pub jd_text: String,
    pub base_resume_text: Option<String>,
    pub target_title: Option<String>,
    pub additional_notes: Option<String>,
}

/// The model's reading of the job description, by bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JdSkillBuckets {
    #[serde(default, deserialize_with = "lenient::string_vec")]
    pub core_technical_skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    pub platform_cloud_tooling: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    pub architecture_systems: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    pub leadership_org_design: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    pub business_strategy: Vec<String>,
}

/// `generate_tailored_resume` arguments.
#[derive(Debug, Default, Deserialize)]
struct TailorArgs {
    #[serde(default, deserialize_with = "lenient::opt_string")]
    suggested_title: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_f64")]
    ats_estimate: Option<f64>,
    #[serde(default)]
    jd_skill_extraction: JdSkillBuckets,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    keywords_fully_matched: Vec<String>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    keywords_partially_matched: Vec<String>,
    #[serde(default, deserialize_with = "lenient::vec_skip_invalid")]
    keywords_intentionally_missing: Vec<MissingKeyword>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    high_risk_claims: Vec<String>,
    #[serde(default, deserialize_with = "lenient::vec_skip_invalid")]
    defend_with_learning: Vec<StudyItem>,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    ats_improvements: Vec<String>,
    #[serde(default)]
    resume_doc: ResumeDoc,
    #[serde(default, deserialize_with = "lenient::string_vec")]
    missing_facts_questions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TailorOutcome {
    pub resume_doc: ResumeDoc,
    pub suggested_title: Option<String>,
    pub jd_skill_extraction: JdSkillBuckets,
    pub ats_estimate: u32,
    pub ats_target: u32,
    pub ats_target_met: bool,
    pub attempts: u32,
    pub keyword_coverage: Coverage,
    pub ats_structural: StructuralScore,
    pub keywords_fully_matched: Vec<String>,
    pub keywords_partially_matched: Vec<String>,
    pub keywords_intentionally_missing: Vec<MissingKeyword>,
    pub risk_report: RiskReport,
    pub ats_improvements: Vec<String>,
    pub missing_facts_questions: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Deterministic steps
// ────────────────────────────────────────────────────────────────────────────

/// Base facts as the engine compares against them: trimmed entries, capped skills.
pub fn prepare_base(facts: &CandidateFacts) -> CandidateFacts {
    CandidateFacts {
        technical_skills: normalize_skill_array(&facts.technical_skills, MAX_TECHNICAL_SKILLS),
        soft_skills: normalize_skill_array(&facts.soft_skills, MAX_SOFT_SKILLS),
        experience: facts
            .experience
            .iter()
            .cloned()
            .map(normalize_experience_entry)
            .collect(),
        education: facts
            .education
            .iter()
            .cloned()
            .map(normalize_education_entry)
            .collect(),
        ..facts.clone()
    }
}

/// Caps the estimate when the output has fewer roles, education rows or bullets than
/// a complete resume needs, and tells the user how to fix the input.
pub fn clamp_if_incomplete(outcome: &mut TailorOutcome, base: &CandidateFacts) {
    let doc = &outcome.resume_doc;
    let (exp, edu) = (doc.experience.len(), doc.education.len());
    let (base_exp, base_edu) = (base.experience.len(), base.education.len());

    let incomplete = (base_exp >= 2 && exp < 2)
        || (base_exp >= 3 && exp < 3)
        || (base_edu >= 2 && edu < 2)
        || doc.bullet_count() < MIN_TOTAL_BULLETS;
    if !incomplete {
        return;
    }

    outcome.ats_estimate = outcome.ats_estimate.min(INCOMPLETE_ATS_CAP);
    outcome.ats_improvements.insert(0, INCOMPLETE_IMPROVEMENT.to_string());
    outcome.ats_improvements.truncate(MAX_IMPROVEMENTS);
    outcome.missing_facts_questions.insert(0, INCOMPLETE_QUESTION.to_string());
    outcome.missing_facts_questions.truncate(MAX_QUESTIONS);
}

fn merge_missing(mut from_model: Vec<MissingKeyword>, placed: Vec<MissingKeyword>) -> Vec<MissingKeyword> {
    from_model.retain(|m| m.keyword.is_some());
    for m in placed {
        let key = m.keyword.as_deref().unwrap_or("").to_lowercase();
        let known = from_model
            .iter()
            .any(|x| x.keyword.as_deref().unwrap_or("").to_lowercase() == key);
        if !known {
            from_model.push(m);
        }
    }
    from_model
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

pub struct TailoringEngine {
    provider: Arc<dyn ChatProvider>,
    tuning: TuningConfig,
    timeouts: Timeouts,
}

impl TailoringEngine {
    pub fn new(provider: Arc<dyn ChatProvider>, tuning: TuningConfig, timeouts: Timeouts) -> Self {
        Self {
            provider,
            tuning,
            timeouts,
        }
    }

    pub async fn tailor(&self, input: &TailorInput) -> Result<TailorOutcome, AppError> {
        let base = prepare_base(&input.facts);
        let base_text = base.text_for_presence(input.base_resume_text.as_deref());
        let keywords = extract_keywords(&input.jd_text);
        let user_prompt = Self::user_prompt(&base, input)?;
        let system = tailor_system_prompt();
        let target = self.tuning.ats_target;
        let max_attempts = self.tuning.max_tailor_attempts.max(1);

        info!(
            "Tailoring {} base roles against {} JD keywords (target {})",
            base.experience.len(),
            keywords.len(),
            target
        );

        let mut best: Option<TailorOutcome> = None;
        let mut missing: Vec<String> = Vec::new();
        let mut attempts = 0;

        while attempts < max_attempts {
            attempts += 1;
            let user = if attempts == 1 {
                user_prompt.clone()
            } else {
                format!("{}\n\n{}", user_prompt, retry_note(target, &missing))
            };
            let request = ChatRequest::with_tool(
                system.clone(),
                user,
                generate_tailored_resume_tool(),
                self.timeouts.tailor,
            );

            let args: TailorArgs = match call_tool(self.provider.as_ref(), &request).await {
                Ok(args) => args,
                Err(e) if best.is_some() => {
                    warn!("Tailor attempt {}/{} failed, keeping best so far: {}", attempts, max_attempts, e);
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            if let Some(model_score) = args.ats_estimate {
                info!("Model self-reported ATS estimate: {}", model_score);
            }

            let outcome = self.post_process(args, &base, &base_text, &keywords)?;
            info!(
                "Tailor attempt {}/{}: ats={} coverage={} structural={} (target {})",
                attempts,
                max_attempts,
                outcome.ats_estimate,
                outcome.keyword_coverage.score,
                outcome.ats_structural.score,
                target
            );

            missing = outcome.keyword_coverage.missing.clone();
            let met = outcome.ats_target_met;
            if best
                .as_ref()
                .map_or(true, |b| outcome.ats_estimate > b.ats_estimate)
            {
                best = Some(outcome);
            }
            if met {
                break;
            }
        }

        let mut best = best.ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("Tailoring finished without an attempt"))
        })?;
        best.attempts = attempts;
        if !best.ats_target_met {
            warn!(
                "ATS target {} not met after {} attempts; best estimate {}",
                target, attempts, best.ats_estimate
            );
        }
        Ok(best)
    }

    fn user_prompt(base: &CandidateFacts, input: &TailorInput) -> Result<String, AppError> {
        let mut envelope = serde_json::to_value(base)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to serialize base facts: {e}")))?;
        if let Some(obj) = envelope.as_object_mut() {
            obj.remove("quality_score");
            obj.remove("quality_feedback");
            obj.insert(
                "raw_resume_text".to_string(),
                serde_json::json!(input.base_resume_text),
            );
        }

        Ok(TAILOR_USER_TEMPLATE
            .replace("{base_facts}", &envelope.to_string())
            .replace("{jd_text}", &input.jd_text)
            .replace("{target_title}", input.target_title.as_deref().unwrap_or(""))
            .replace("{additional_notes}", input.additional_notes.as_deref().unwrap_or("")))
    }

    fn post_process(
        &self,
        args: TailorArgs,
        base: &CandidateFacts,
        base_text: &str,
        keywords: &[String],
    ) -> Result<TailorOutcome, AppError> {
        let role_threshold = self.tuning.role_match_threshold;
        let bullet_threshold = self.tuning.bullet_duplicate_threshold;

        let mut doc = sanitize_resume_doc(args.resume_doc);
        let placed_missing = place_keywords(&mut doc, base_text, keywords);
        enforce_preservation(&mut doc, base, role_threshold, bullet_threshold)?;
        enforce_immutable(&mut doc, base, role_threshold, bullet_threshold);

        let intentionally_missing = merge_missing(args.keywords_intentionally_missing, placed_missing);
        let omitted: Vec<String> = intentionally_missing
            .iter()
            .filter_map(|m| m.keyword.as_deref())
            .map(str::to_lowercase)
            .collect();
        let mut keywords_fully_matched = args.keywords_fully_matched;
        keywords_fully_matched.retain(|k| !omitted.contains(&k.to_lowercase()));
        let mut keywords_partially_matched = args.keywords_partially_matched;
        keywords_partially_matched.retain(|k| !omitted.contains(&k.to_lowercase()));
        let mut risk_report = RiskReport {
            high_risk_claims: args.high_risk_claims,
            defend_with_learning: args.defend_with_learning,
        };
        ensure_study_plan(&mut risk_report, &intentionally_missing);

        let keyword_coverage = coverage(&doc.presence_text(), keywords);
        let ats_structural = structural_score(&doc);
        let ats_estimate = keyword_coverage.score.min(ats_structural.score);

        let mut ats_improvements = args.ats_improvements;
        ats_improvements.truncate(MAX_IMPROVEMENTS);
        let mut missing_facts_questions = args.missing_facts_questions;
        missing_facts_questions.truncate(MAX_QUESTIONS);

        let mut outcome = TailorOutcome {
            resume_doc: doc,
            suggested_title: args.suggested_title,
            jd_skill_extraction: args.jd_skill_extraction,
            ats_estimate,
            ats_target: self.tuning.ats_target,
            ats_target_met: false,
            attempts: 0,
            keyword_coverage,
            ats_structural,
            keywords_fully_matched,
            keywords_partially_matched,
            keywords_intentionally_missing: intentionally_missing,
            risk_report,
            ats_improvements,
            missing_facts_questions,
        };
        clamp_if_incomplete(&mut outcome, base);
        outcome.ats_target_met = outcome.ats_estimate >= outcome.ats_target;
        Ok(outcome)
    }
}
