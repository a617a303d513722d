use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
const DEFAULT_GATEWAY_MODEL: &str = "google/gemini-2.5-flash";

/// Application configuration loaded from environment variables.
/// A missing provider key is not a startup error: requests surface `NoProviderConfigured`.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub provider: Option<ProviderConfig>,
    pub timeouts: Timeouts,
    pub tuning: TuningConfig,
}

/// Connection details for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub url: String,
    pub api_key: String,
    pub model: String,
}

/// Per-call deadlines for generative requests.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub extract: Duration,
    pub recovery: Duration,
    pub tailor: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            extract: Duration::from_secs(60),
            recovery: Duration::from_secs(45),
            tailor: Duration::from_secs(90),
        }
    }
}

/// Product-tuned thresholds and weights. None of these have a derivation;
/// they are kept configurable so they can be re-tuned without a code change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningConfig {
    /// Token-Jaccard similarity required on both company and title to treat two roles as one.
    pub role_match_threshold: f64,
    /// Token-Jaccard similarity above which two bullets are near-duplicates.
    pub bullet_duplicate_threshold: f64,
    /// Weight of the model's self-reported quality score in the final blend.
    pub ai_score_weight: f64,
    /// Weight of the deterministic quality score in the final blend.
    pub deterministic_score_weight: f64,
    /// Constant subtracted after blending.
    pub blend_offset: f64,
    pub ats_target: u32,
    pub max_tailor_attempts: u32,
    pub recovery_chunk_chars: usize,
    pub recovery_max_chunks: usize,
    pub recovery_concurrency: usize,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            role_match_threshold: 0.67,
            bullet_duplicate_threshold: 0.82,
            ai_score_weight: 0.4,
            deterministic_score_weight: 0.6,
            blend_offset: 3.0,
            ats_target: 75,
            max_tailor_attempts: 2,
            recovery_chunk_chars: 6500,
            recovery_max_chunks: 20,
            recovery_concurrency: 4,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = TuningConfig::default();
        let ai_score_weight = env_or("AI_SCORE_WEIGHT", defaults.ai_score_weight)?;
        let tuning = TuningConfig {
            role_match_threshold: env_or("ROLE_MATCH_THRESHOLD", defaults.role_match_threshold)?,
            bullet_duplicate_threshold: env_or(
                "BULLET_DUPLICATE_THRESHOLD",
                defaults.bullet_duplicate_threshold,
            )?,
            ai_score_weight,
            deterministic_score_weight: 1.0 - ai_score_weight,
            blend_offset: env_or("SCORE_BLEND_OFFSET", defaults.blend_offset)?,
            ats_target: env_or("ATS_TARGET", defaults.ats_target)?,
            max_tailor_attempts: env_or("MAX_TAILOR_ATTEMPTS", defaults.max_tailor_attempts)?,
            recovery_chunk_chars: env_or("RECOVERY_CHUNK_CHARS", defaults.recovery_chunk_chars)?,
            recovery_max_chunks: env_or("RECOVERY_MAX_CHUNKS", defaults.recovery_max_chunks)?,
            recovery_concurrency: env_or("RECOVERY_CONCURRENCY", defaults.recovery_concurrency)?,
        };
        tuning.validate()?;

        let default_timeouts = Timeouts::default();
        let timeouts = Timeouts {
            extract: Duration::from_secs(env_or(
                "EXTRACT_TIMEOUT_SECS",
                default_timeouts.extract.as_secs(),
            )?),
            recovery: Duration::from_secs(env_or(
                "RECOVERY_TIMEOUT_SECS",
                default_timeouts.recovery.as_secs(),
            )?),
            tailor: Duration::from_secs(env_or(
                "TAILOR_TIMEOUT_SECS",
                default_timeouts.tailor.as_secs(),
            )?),
        };

        Ok(Config {
            port: env_or("PORT", 8080u16).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            provider: provider_from_env()?,
            timeouts,
            tuning,
        })
    }
}

impl TuningConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("ROLE_MATCH_THRESHOLD", self.role_match_threshold),
            ("BULLET_DUPLICATE_THRESHOLD", self.bullet_duplicate_threshold),
            ("AI_SCORE_WEIGHT", self.ai_score_weight),
        ] {
            if !(0.0..=1.0).contains(&value) {
                anyhow::bail!("{name} must be between 0 and 1, got {value}");
            }
        }
        if self.max_tailor_attempts == 0 {
            anyhow::bail!("MAX_TAILOR_ATTEMPTS must be at least 1");
        }
        if self.recovery_concurrency == 0 || self.recovery_chunk_chars == 0 {
            anyhow::bail!("RECOVERY_CONCURRENCY and RECOVERY_CHUNK_CHARS must be positive");
        }
        Ok(())
    }
}

/// OPENAI_API_KEY wins; otherwise an OpenAI-compatible gateway; otherwise none.
fn provider_from_env() -> Result<Option<ProviderConfig>> {
    if let Some(api_key) = non_empty_env("OPENAI_API_KEY") {
        return Ok(Some(ProviderConfig {
            name: "openai".to_string(),
            url: OPENAI_CHAT_URL.to_string(),
            api_key,
            model: non_empty_env("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
        }));
    }

    if let Some(api_key) = non_empty_env("AI_GATEWAY_API_KEY") {
        let url = require_env("AI_GATEWAY_URL")?;
        return Ok(Some(ProviderConfig {
            name: "gateway".to_string(),
            url,
            api_key,
            model: non_empty_env("AI_GATEWAY_MODEL")
                .unwrap_or_else(|| DEFAULT_GATEWAY_MODEL.to_string()),
        }));
    }

    Ok(None)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuning_defaults() {
        let t = TuningConfig::default();
        assert_eq!(t.role_match_threshold, 0.67);
        assert_eq!(t.bullet_duplicate_threshold, 0.82);
        assert_eq!(t.ats_target, 75);
        assert_eq!(t.max_tailor_attempts, 2);
        assert!(
            (t.ai_score_weight + t.deterministic_score_weight - 1.0).abs() < 1e-9,
            "blend weights must sum to 1"
        );
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_tuning_rejects_out_of_range_threshold() {
        let t = TuningConfig {
            role_match_threshold: 1.5,
            ..TuningConfig::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_tuning_rejects_zero_attempts() {
        let t = TuningConfig {
            max_tailor_attempts: 0,
            ..TuningConfig::default()
        };
        assert!(t.validate().is_err());
    }

    #[test]
    fn test_env_or_uses_default_when_unset() {
        let v: u32 = env_or("RESUME_API_TEST_SURELY_UNSET_VAR", 42).unwrap();
        assert_eq!(v, 42);
    }
}
