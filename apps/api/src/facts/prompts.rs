// Prompt constants and tool schemas for the fact extractor.
// Reuses cross-cutting fragments from llm_client::prompts.

use serde_json::{json, Value};

use crate::llm_client::prompts::with_shared_rules;
use crate::llm_client::ToolSpec;

/// Longest resume text placed in a single draft prompt.
pub const MAX_PROMPT_RESUME_CHARS: usize = 200_000;
/// Hint entries listed in the prompt, per kind.
pub const MAX_PROMPT_HINTS: usize = 12;

const PARSE_SYSTEM_BODY: &str = r#"You are an expert resume parser and ATS analyst.

Primary goal: extract structured, ATS-friendly facts from the resume text.
Secondary goal: rate the resume as written from 0 to 100 for a generic ATS (not for a specific job).

CONTACT:
- The email and phone usually sit near the name at the top.
- Regex-detected values are supplied with the request. They are reliable; use them.
- Never put header or contact text (email, phone, URLs, LinkedIn) into "summary".

EXPERIENCE:
- Put the whole work history into experience[], one entry per role.
- Each role has company, title, start and end (year-month when available, else year, else null).
- bullets: every bullet written for the role, meaning intact, with metrics such as "$25M", "50%", scale and team size kept.
- Never cap bullets per role. Never write generic bullets the resume does not support; leave bullets empty instead.

SUMMARY / COMPANY / SKILLS:
- "summary" is 3-6 sentences in your own words about background, strengths and target roles.
- "current_company" is the company name only.
- technical_skills: concrete technologies, tools, methods and domains only (React, AWS, CI/CD, API Design).
- soft_skills: interpersonal, leadership and communication skills only.
- Skills are atomic items. No mega-strings, no filler phrases ("such as ..."), no near-duplicates (React vs React JS).

SCORING (0-100): keyword optimization 25, structure and formatting 20, quantified achievements 20,
skills completeness 15, contact completeness 10, summary quality 10."#;

/// Placeholders: `{email}`, `{phone}`, `{linkedin}`, `{exp_count}`, `{edu_count}`,
/// `{exp_hints}`, `{edu_hints}`, `{resume_text}`.
pub const PARSE_USER_TEMPLATE: &str = r#"Parse this resume and extract the candidate's information. Also score how well it is structured and optimized for ATS screening in general.

DETECTED CONTACT DETAILS (regex; use them when they look valid):
- Email: {email}
- Phone: {phone}
- LinkedIn: {linkedin}

STRUCTURE HINTS (deterministic scan of the text; may be partial, do not invent from them):
- Experience entries detected: {exp_count}
- Education entries detected: {edu_count}
- Experience hints: {exp_hints}
- Education hints: {edu_hints}

RESUME CONTENT:
{resume_text}

Keep "summary" free of email, phone and URLs. Fill "current_title" and "current_company" whenever the resume states them."#;

const RETRY_SYSTEM_SUFFIX: &str = r#"RETRY MODE:
Your previous extraction was incomplete.
- Extract EVERY experience role and EVERY education entry in the resume.
- Extract every bullet for each role; do not cap bullets.
- A role without explicit bullets is still returned, with an empty bullets array.
- Do not invent anything."#;

/// Placeholder: `{reason}`.
pub const RETRY_USER_SUFFIX: &str = r#"RETRY FEEDBACK:
The previous extraction was incomplete: {reason}
Return a complete extraction now."#;

const RECOVER_SYSTEM_BODY: &str = r#"You extract WORK EXPERIENCE entries from a chunk of resume text.
- Return ALL roles present in this chunk.
- Preserve bullet meaning; keep metrics and tool names exactly as written."#;

/// Placeholder: `{chunk}`.
pub const RECOVER_USER_TEMPLATE: &str = "Extract experience from this resume chunk:\n\n{chunk}";

pub fn parse_system_prompt(retry: bool) -> String {
    let base = with_shared_rules(PARSE_SYSTEM_BODY);
    if retry {
        format!("{base}\n\n{RETRY_SYSTEM_SUFFIX}")
    } else {
        base
    }
}

pub fn recover_system_prompt() -> String {
    with_shared_rules(RECOVER_SYSTEM_BODY)
}

fn nullable_string() -> Value {
    json!({ "type": ["string", "null"] })
}

fn experience_item_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "company": nullable_string(),
            "title": nullable_string(),
            "start": { "type": ["string", "null"], "description": "Start year or year-month if available" },
            "end": { "type": ["string", "null"], "description": "End year or year-month; null if current" },
            "location": nullable_string(),
            "bullets": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Every bullet for the role, uncapped"
            }
        }
    })
}

pub fn parse_resume_tool() -> ToolSpec {
    ToolSpec {
        name: "parse_resume",
        description: "Extract structured information from a resume and score it for a generic ATS",
        parameters: json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "full_name": { "type": "string" },
                "email": { "type": "string" },
                "phone": { "type": "string" },
                "location": { "type": "string", "description": "City / region" },
                "current_title": { "type": "string", "description": "Current or most recent job title" },
                "current_company": { "type": "string", "description": "Current or most recent company" },
                "years_of_experience": { "type": "number" },
                "technical_skills": { "type": "array", "items": { "type": "string" } },
                "soft_skills": { "type": "array", "items": { "type": "string" } },
                "education": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "additionalProperties": false,
                        "properties": {
                            "school": nullable_string(),
                            "degree": nullable_string(),
                            "field": nullable_string(),
                            "start": nullable_string(),
                            "end": { "type": ["string", "null"], "description": "Graduation year or year-month" }
                        }
                    }
                },
                "experience": { "type": "array", "items": experience_item_schema() },
                "certifications": { "type": "array", "items": { "type": "string" } },
                "summary": { "type": "string" },
                "linkedin_url": { "type": "string" },
                "github_url": { "type": "string" },
                "ats_score": { "type": "number", "description": "0-100" },
                "ats_feedback": { "type": "string" }
            },
            "required": [
                "full_name", "technical_skills", "soft_skills", "experience",
                "education", "certifications", "summary", "ats_score"
            ]
        }),
    }
}

pub fn extract_experience_tool() -> ToolSpec {
    ToolSpec {
        name: "extract_experience",
        description: "Extract experience entries from a resume chunk",
        parameters: json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "experience": { "type": "array", "items": experience_item_schema() }
            },
            "required": ["experience"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_prompt_extends_base() {
        let base = parse_system_prompt(false);
        let retry = parse_system_prompt(true);
        assert!(retry.starts_with(&base));
        assert!(retry.contains("RETRY MODE"));
    }

    #[test]
    fn test_user_template_placeholders_are_all_known() {
        for key in ["{email}", "{phone}", "{linkedin}", "{exp_count}", "{edu_count}", "{exp_hints}", "{edu_hints}", "{resume_text}"] {
            assert!(PARSE_USER_TEMPLATE.contains(key), "missing placeholder {key}");
        }
    }

    #[test]
    fn test_tool_schemas_require_experience() {
        let parse = parse_resume_tool();
        assert!(parse.parameters["required"]
            .as_array()
            .unwrap()
            .iter()
            .any(|v| v == "experience"));
        let recover = extract_experience_tool();
        assert_eq!(recover.parameters["required"][0], "experience");
    }
}
