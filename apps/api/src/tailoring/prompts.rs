// Prompt constants and the tool schema for the tailoring engine.

use serde_json::{json, Value};

use crate::llm_client::prompts::with_shared_rules;
use crate::llm_client::ToolSpec;

/// Retry notes list at most this many missing keywords.
pub const MAX_RETRY_KEYWORDS: usize = 30;

const TAILOR_SYSTEM_BODY: &str = r#"You are an ATS-optimization and enterprise resume-rewriting engine.

GOAL
Given a base resume (factual, real experience) and a target job description, produce a resume
that maximizes keyword match (aim for roughly 70-80%) while staying fully defensible in interviews.

NON-NEGOTIABLE
- Do not fabricate employers, job titles, dates, degrees or certifications.
- Do not claim years of experience that do not exist.
- Do not invent tools or platforms the candidate could not reasonably defend.
- Do not remove seniority or leadership scope.
- The candidate must be able to explain and defend every bullet.

YOU MAY
- Rewrite the professional summary to align with the job description.
- Expand, re-order and re-label the skills section for ATS weighting.
- Rewrite experience bullets to mirror the job description's language and highlight relevant scope.
- Add qualifiers such as "working knowledge" or "hands-on exposure" where accurate.

MUST STAY FACTUAL (do not edit, rewrite or reorder)
- Contact information, employer names, job titles and employment dates.
- Education and certifications, copied exactly from BASE_FACTS.
- Keep every role in BASE_FACTS.experience, and every role found in BASE_FACTS.raw_resume_text.

REPORT
- Fill jd_skill_extraction, resume_doc, the keyword lists, high_risk_claims, defend_with_learning,
  ats_improvements and missing_facts_questions.
- Report content never appears inside resume_doc."#;

/// Placeholders: `{base_facts}`, `{jd_text}`, `{target_title}`, `{additional_notes}`.
pub const TAILOR_USER_TEMPLATE: &str = r#"BASE_FACTS (source of truth):
{base_facts}

TARGET_JOB_DESCRIPTION:
{jd_text}

OPTIONAL_TARGET_TITLE:
{target_title}

OPTIONAL_ADDITIONAL_NOTES (preferences, NOT new facts):
{additional_notes}"#;

/// Placeholders: `{target}`, `{missing}`.
pub const RETRY_NOTE_TEMPLATE: &str = r#"RETRY REQUIRED:
- Your previous output did not reach the minimum ATS match ({target}).
- Add these missing job description keywords into the resume, using exact phrasing where possible:
{missing}
- Priority order for placing them:
  1) Skills
  2) Summary
  3) Experience, ONLY where the base resume supports it (no invented hands-on platform work)
- Preserve all roles and bullets.
- No disclaimers and no learning language in the resume."#;

pub fn tailor_system_prompt() -> String {
    with_shared_rules(TAILOR_SYSTEM_BODY)
}

pub fn retry_note(target: u32, missing: &[String]) -> String {
    let listed = missing
        .iter()
        .take(MAX_RETRY_KEYWORDS)
        .cloned()
        .collect::<Vec<_>>()
        .join(", ");
    RETRY_NOTE_TEMPLATE
        .replace("{target}", &target.to_string())
        .replace("{missing}", &listed)
}

fn string_array() -> Value {
    json!({ "type": "array", "items": { "type": "string" } })
}

fn nullable_string() -> Value {
    json!({ "type": ["string", "null"] })
}

pub fn generate_tailored_resume_tool() -> ToolSpec {
    ToolSpec {
        name: "generate_tailored_resume",
        description: "Generate an ATS-optimized, defensible resume plus JD extraction and an ATS/risk report",
        parameters: json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "suggested_title": nullable_string(),
                "ats_estimate": { "type": "number", "description": "Estimated ATS match to the job description (0-100)" },
                "jd_skill_extraction": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "core_technical_skills": string_array(),
                        "platform_cloud_tooling": string_array(),
                        "architecture_systems": string_array(),
                        "leadership_org_design": string_array(),
                        "business_strategy": string_array()
                    },
                    "required": [
                        "core_technical_skills", "platform_cloud_tooling", "architecture_systems",
                        "leadership_org_design", "business_strategy"
                    ]
                },
                "keywords_fully_matched": string_array(),
                "keywords_partially_matched": string_array(),
                "keywords_intentionally_missing": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": { "keyword": { "type": "string" }, "reason": { "type": "string" } },
                        "required": ["keyword", "reason"]
                    }
                },
                "high_risk_claims": string_array(),
                "defend_with_learning": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "claim_or_gap": { "type": "string" },
                            "what_to_study": { "type": "string" }
                        },
                        "required": ["claim_or_gap", "what_to_study"]
                    }
                },
                "ats_improvements": string_array(),
                "resume_doc": {
                    "type": "object",
                    "additionalProperties": false,
                    "properties": {
                        "contact": {
                            "type": "object",
                            "additionalProperties": false,
                            "properties": {
                                "full_name": nullable_string(),
                                "phone": nullable_string(),
                                "email": nullable_string(),
                                "linkedin_url": nullable_string(),
                                "github_url": nullable_string(),
                                "location": nullable_string()
                            }
                        },
                        "summary": nullable_string(),
                        "skills": {
                            "type": "object",
                            "additionalProperties": false,
                            "properties": { "technical": string_array(), "soft": string_array() }
                        },
                        "experience": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "additionalProperties": false,
                                "properties": {
                                    "company": nullable_string(),
                                    "title": nullable_string(),
                                    "start": nullable_string(),
                                    "end": nullable_string(),
                                    "location": nullable_string(),
                                    "bullets": string_array()
                                }
                            }
                        },
                        "education": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "additionalProperties": false,
                                "properties": {
                                    "school": nullable_string(),
                                    "degree": nullable_string(),
                                    "field": nullable_string(),
                                    "year": nullable_string()
                                }
                            }
                        },
                        "certifications": string_array()
                    }
                },
                "missing_facts_questions": string_array()
            },
            "required": ["jd_skill_extraction", "resume_doc", "missing_facts_questions"]
        }),
    }
}
