//! Deterministic scoring: resume quality (JD-independent) and the structural ATS
//! score of a tailored document.

pub mod quality;
pub mod structural;

use serde::Serialize;

use crate::config::TuningConfig;

pub use quality::{clamp_score, quality_score, QualityBreakdown};
pub use structural::{structural_score, ResumeStats, StructuralScore};

/// How the reported quality score was produced from its two inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreCalibration {
    pub deterministic_score: u32,
    pub ai_raw_score: Option<u32>,
    pub final_score: u32,
}

/// Blends the model's self-reported score into the deterministic one. Without a
/// model score the deterministic score stands alone.
pub fn calibrate(ai_raw: Option<f64>, deterministic: u32, tuning: &TuningConfig) -> ScoreCalibration {
    let ai_raw = ai_raw.filter(|s| s.is_finite()).map(clamp_score);
    let final_score = match ai_raw {
        Some(ai) => clamp_score(
            tuning.ai_score_weight * ai as f64
                + tuning.deterministic_score_weight * deterministic as f64
                - tuning.blend_offset,
        ),
        None => deterministic,
    };
    ScoreCalibration {
        deterministic_score: deterministic,
        ai_raw_score: ai_raw,
        final_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calibrate_blends_with_offset() {
        let c = calibrate(Some(90.0), 60, &TuningConfig::default());
        // 0.4·90 + 0.6·60 − 3 = 69
        assert_eq!(c.final_score, 69);
        assert_eq!(c.ai_raw_score, Some(90));
    }

    #[test]
    fn test_calibrate_without_ai_score_uses_deterministic() {
        let c = calibrate(None, 57, &TuningConfig::default());
        assert_eq!(c.final_score, 57);
        assert_eq!(c.ai_raw_score, None);
    }

    #[test]
    fn test_calibrate_clamps_model_outliers() {
        let c = calibrate(Some(400.0), 100, &TuningConfig::default());
        assert_eq!(c.ai_raw_score, Some(100));
        assert_eq!(c.final_score, 97);
    }
}
