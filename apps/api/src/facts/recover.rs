//! Recover: chunked re-extraction of experience when the draft looks truncated.
//!
//! Chunks are sent with bounded concurrency and merged back in chunk order, so the
//! result does not depend on which call finishes first. Recovery only ever adds:
//! a failed chunk is logged and skipped, and merging never removes an entry.

use std::collections::HashSet;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use super::finalize::normalize_experience_entry;
use super::prompts::{extract_experience_tool, recover_system_prompt, RECOVER_USER_TEMPLATE};
use crate::config::TuningConfig;
use crate::llm_client::{call_tool, ChatProvider, ChatRequest};
use crate::models::ExperienceEntry;
use crate::text::normalize_key;
use crate::text::similarity::bullets_near_duplicate;

#[derive(Debug, Deserialize)]
struct ExtractExperienceArgs {
    #[serde(default, deserialize_with = "crate::models::lenient::vec_skip_invalid")]
    experience: Vec<ExperienceEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct Recovery {
    /// Entries from every successful chunk, in chunk order.
    pub entries: Vec<ExperienceEntry>,
    pub chunks_sent: usize,
    pub chunks_failed: usize,
}

/// Splits on line boundaries into chunks of at most `max_chars` characters.
/// A single longer line becomes its own chunk. Blank chunks are dropped.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf: Vec<&str> = Vec::new();
    let mut size = 0usize;

    for line in text.split('\n') {
        let add = usize::from(!buf.is_empty()) + line.chars().count();
        if size + add > max_chars && !buf.is_empty() {
            chunks.push(buf.join("\n").trim().to_string());
            buf.clear();
            size = 0;
        }
        size += usize::from(!buf.is_empty()) + line.chars().count();
        buf.push(line);
    }
    if !buf.is_empty() {
        chunks.push(buf.join("\n").trim().to_string());
    }
    chunks.retain(|c| !c.is_empty());
    chunks
}

pub async fn recover_experience(
    provider: &dyn ChatProvider,
    source: &str,
    tuning: &TuningConfig,
    timeout: Duration,
) -> Recovery {
    let chunks: Vec<String> = split_into_chunks(source, tuning.recovery_chunk_chars)
        .into_iter()
        .take(tuning.recovery_max_chunks)
        .collect();
    let chunks_sent = chunks.len();
    let system = recover_system_prompt();

    let requests: Vec<_> = chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| {
            let request = ChatRequest::with_tool(
                system.clone(),
                RECOVER_USER_TEMPLATE.replace("{chunk}", chunk),
                extract_experience_tool(),
                timeout,
            );
            async move {
                match call_tool::<ExtractExperienceArgs>(provider, &request).await {
                    Ok(args) => {
                        debug!("Recovery chunk {} returned {} roles", i + 1, args.experience.len());
                        Some(args.experience)
                    }
                    Err(e) => {
                        warn!("Recovery chunk {}/{} failed, skipping: {}", i + 1, chunks_sent, e);
                        None
                    }
                }
            }
        })
        .collect();
    let results: Vec<Option<Vec<ExperienceEntry>>> = stream::iter(requests)
        .buffered(tuning.recovery_concurrency.max(1))
        .collect()
        .await;

    let chunks_failed = results.iter().filter(|r| r.is_none()).count();
    Recovery {
        entries: results.into_iter().flatten().flatten().collect(),
        chunks_sent,
        chunks_failed,
    }
}

/// normalized company | normalized title
pub fn loose_key(e: &ExperienceEntry) -> String {
    format!(
        "{}|{}",
        normalize_key(e.company.as_deref().unwrap_or("")),
        normalize_key(e.title.as_deref().unwrap_or(""))
    )
}

/// Appends roles with a new loose key. For a key already present, unions the bullets
/// (skipping near-duplicates) and fills a missing start, end or location.
pub fn merge_append_missing(
    base: Vec<ExperienceEntry>,
    more: Vec<ExperienceEntry>,
    bullet_threshold: f64,
) -> Vec<ExperienceEntry> {
    let mut out: Vec<ExperienceEntry> = base.into_iter().map(normalize_experience_entry).collect();

    for e in more.into_iter().map(normalize_experience_entry) {
        let key = loose_key(&e);
        if key == "|" {
            continue;
        }
        let Some(existing) = out.iter_mut().find(|o| loose_key(o) == key) else {
            out.push(e);
            continue;
        };

        let mut seen: HashSet<String> = existing.bullets.iter().map(|b| normalize_key(b)).collect();
        for b in e.bullets {
            let nb = normalize_key(&b);
            if nb.is_empty() || seen.contains(&nb) {
                continue;
            }
            if existing
                .bullets
                .iter()
                .any(|x| bullets_near_duplicate(x, &b, bullet_threshold))
            {
                continue;
            }
            seen.insert(nb);
            existing.bullets.push(b);
        }
        existing.start = existing.start.take().or(e.start);
        existing.end = existing.end.take().or(e.end);
        existing.location = existing.location.take().or(e.location);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::fake::{FakeProvider, FakeReply};
    use serde_json::json;

    fn role(company: &str, title: &str, bullets: &[&str]) -> ExperienceEntry {
        ExperienceEntry {
            company: Some(company.into()),
            title: Some(title.into()),
            bullets: bullets.iter().map(|b| b.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_split_into_chunks_respects_limit() {
        let text = (0..10).map(|i| format!("line number {i}")).collect::<Vec<_>>().join("\n");
        let chunks = split_into_chunks(&text, 40);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 40), "{chunks:?}");
        assert_eq!(chunks.join("\n"), text, "no line is lost");
    }

    #[test]
    fn test_split_drops_blank_chunks() {
        assert!(split_into_chunks("\n\n  \n", 10).is_empty());
    }

    #[test]
    fn test_merge_appends_new_roles_and_unions_bullets() {
        let base = vec![role("Acme Corp", "Backend Engineer", &["Reduced latency by 30% across the checkout API"])];
        let more = vec![
            role("ACME corp.", "backend engineer", &[
                "Reduced latency by 30% across the checkout API tier",
                "Introduced contract testing for every public endpoint",
            ]),
            role("Beta Inc", "Engineer", &["Built billing"]),
            ExperienceEntry::default(),
        ];
        let merged = merge_append_missing(base, more, 0.82);
        assert_eq!(merged.len(), 2, "empty-key entries are ignored");
        assert_eq!(
            merged[0].bullets.len(),
            2,
            "near-duplicate bullet kept once: {:?}",
            merged[0].bullets
        );
        assert_eq!(merged[1].company.as_deref(), Some("Beta Inc"));
    }

    #[test]
    fn test_merge_fills_missing_dates() {
        let mut base = role("Acme", "Engineer", &[]);
        base.end = Some("2022".into());
        let mut more = role("Acme", "Engineer", &[]);
        more.start = Some("2019".into());
        more.end = Some("2021".into());
        let merged = merge_append_missing(vec![base], vec![more], 0.82);
        assert_eq!(merged[0].start.as_deref(), Some("2019"));
        assert_eq!(merged[0].end.as_deref(), Some("2022"), "existing values are kept");
    }

    #[tokio::test]
    async fn test_recovery_merges_in_chunk_order_and_skips_failures() {
        let provider = FakeProvider::with_handler(|req, _| {
            let chunk = req.user_content();
            if chunk.contains("FAIL") {
                FakeReply::Status(500)
            } else if chunk.contains("alpha") {
                FakeReply::tool(json!({"experience": [{"company": "Alpha", "title": "Dev"}]}))
            } else {
                FakeReply::tool(json!({"experience": [{"company": "Gamma", "title": "Dev"}]}))
            }
        });
        let tuning = TuningConfig {
            recovery_chunk_chars: 12,
            ..TuningConfig::default()
        };
        let source = "alpha role\nFAIL chunk\ngamma role";
        let rec = recover_experience(&provider, source, &tuning, Duration::from_secs(1)).await;
        assert_eq!(rec.chunks_sent, 3);
        assert_eq!(rec.chunks_failed, 1);
        let companies: Vec<_> = rec.entries.iter().filter_map(|e| e.company.clone()).collect();
        assert_eq!(companies, vec!["Alpha", "Gamma"]);
        assert_eq!(provider.calls_for_tool("extract_experience"), 3);
    }

    #[tokio::test]
    async fn test_recovery_caps_chunk_count() {
        let provider = FakeProvider::with_handler(|_, _| FakeReply::tool(json!({"experience": []})));
        let tuning = TuningConfig {
            recovery_chunk_chars: 5,
            recovery_max_chunks: 2,
            ..TuningConfig::default()
        };
        let rec = recover_experience(&provider, "aaaa\nbbbb\ncccc\ndddd", &tuning, Duration::from_secs(1)).await;
        assert_eq!(rec.chunks_sent, 2);
        assert_eq!(provider.call_count(), 2);
    }
}
