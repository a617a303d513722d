// Shared prompt fragments. Each service that calls the model keeps its own prompts.rs;
// this file holds the cross-cutting pieces.

/// Appended to every extraction and rewrite system prompt.
pub const NO_FABRICATION_RULES: &str = "\
Hard rules:
- Do NOT fabricate facts. Only use what is present in the provided text.
- If something is missing (dates, locations, degrees), use null or empty arrays rather than guessing.
- Keep metrics, tool names and scale figures exactly as written.";

/// Closes every tool-driven prompt.
pub const TOOL_OUTPUT_ONLY: &str =
    "Output must follow the function schema exactly, via the tool call. No extra text.";

/// Joins a system prompt body with the shared rule fragments.
pub fn with_shared_rules(body: &str) -> String {
    format!("{}\n\n{}\n\n{}", body.trim(), NO_FABRICATION_RULES, TOOL_OUTPUT_ONLY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_shared_rules_appends_both_fragments() {
        let prompt = with_shared_rules("  You parse resumes.  ");
        assert!(prompt.starts_with("You parse resumes."));
        assert!(prompt.contains("Do NOT fabricate"));
        assert!(prompt.ends_with(TOOL_OUTPUT_ONLY));
    }
}
