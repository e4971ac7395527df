// Aggregation Logic
// Whole-text composite and the sentencewise overall record.

use crate::models::{round4, AnalysisResult, EthosResult, OverallScores, SentenceAnalysis, TextAnalysis};

use super::AnalysisError;

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Whole-text result with every scalar rounded for output.
pub fn text_analysis(ethos: EthosResult, logos: f64, pathos: f64) -> TextAnalysis {
    TextAnalysis {
        ethos: ethos.rounded(),
        logos: round4(logos),
        pathos: round4(pathos),
    }
}

fn field_mean(
    units: &[SentenceAnalysis],
    field: impl Fn(&SentenceAnalysis) -> f64,
) -> Result<f64, AnalysisError> {
    let values: Vec<f64> = units.iter().map(field).collect();
    mean(&values).ok_or_else(|| AnalysisError::EmptyInput {
        context: "candidate_text".to_string(),
    })
}

/// Average full-precision per-sentence results into the overall record.
///
/// Zero sentences is an error, never a zero score.
pub fn average_sentencewise(units: Vec<SentenceAnalysis>) -> Result<AnalysisResult, AnalysisError> {
    let ethos = EthosResult {
        score: field_mean(&units, |u| u.ethos.score)?,
        factual_consistency: field_mean(&units, |u| u.ethos.factual_consistency)?,
        formality: field_mean(&units, |u| u.ethos.formality)?,
    };
    let overall = OverallScores {
        ethos: ethos.rounded(),
        logos: round4(field_mean(&units, |u| u.logos)?),
        pathos: round4(field_mean(&units, |u| u.pathos)?),
    };

    Ok(AnalysisResult {
        overall,
        sentencewise: units.iter().map(SentenceAnalysis::rounded).collect(),
    })
}
