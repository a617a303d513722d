//! Tailoring Engine: job-description-aligned resumes that keep every base role,
//! bullet and immutable fact.
//!
//! Everything except `engine` is deterministic post-processing of model output.

pub mod engine;
pub mod evidence;
pub mod handlers;
pub mod preservation;
pub mod prompts;
pub mod risk;
pub mod sanitize;

pub use engine::{JdSkillBuckets, TailorInput, TailorOutcome, TailoringEngine};
