//! AI-Assisted Fact Extractor: structured candidate facts from extracted resume text.
//!
//! `hints` and `heuristic` are deterministic; `extractor` drives the model through
//! Draft → VerifyCompleteness → Recover → Finalize.

pub mod extractor;
pub mod finalize;
pub mod handlers;
pub mod heuristic;
pub mod hints;
pub mod prompts;
pub mod recover;
pub mod skills;

pub use extractor::{DraftFacts, FactDiagnostics, FactExtraction, FactExtractor, ParseMode};
pub use hints::{DetectedContact, Hints};
