// Ethos: factual consistency against the source plus formality of tone.

use crate::models::{EthosResult, LabelScore};
use crate::services::classifier::{nli_input, TextClassifier};
use crate::services::distribution::{label_probs, pair_score};
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::aggregation::mean;
use super::batch::classify_all;
use super::AnalysisError;

const INFORMAL_LABEL: &str = "informal";

/// Mean support over every candidate × source sentence pair.
/// `0.0` when either side has no sentences.
pub async fn factual_consistency(
    nli: &Arc<dyn TextClassifier>,
    candidate: &[String],
    source: &[String],
    semaphore: &Arc<Semaphore>,
) -> Result<f64, AnalysisError> {
    if candidate.is_empty() || source.is_empty() {
        return Ok(0.0);
    }

    let inputs: Vec<String> = candidate
        .iter()
        .flat_map(|c| source.iter().map(move |s| nli_input(c, s)))
        .collect();

    let outputs = classify_all(nli, inputs, semaphore).await?;
    let supports: Vec<f64> = outputs
        .iter()
        .map(|out| pair_score(&label_probs(out)).support)
        .collect();

    Ok(mean(&supports).unwrap_or(0.0))
}

/// Formality of one classifier output: the top label's confidence, inverted
/// when that label is the informal one.
fn formality_of(output: &[LabelScore]) -> f64 {
    let top = output.iter().fold(None::<&LabelScore>, |best, rec| match best {
        Some(b) if rec.score <= b.score => Some(b),
        _ => Some(rec),
    });

    match top {
        Some(rec) if rec.label.to_lowercase() == INFORMAL_LABEL => (1.0 - rec.score).clamp(0.0, 1.0),
        Some(rec) => rec.score.clamp(0.0, 1.0),
        None => 0.0,
    }
}

/// Mean formality over the candidate sentences, `0.0` with none.
pub async fn formality(
    classifier: &Arc<dyn TextClassifier>,
    sentences: &[String],
    semaphore: &Arc<Semaphore>,
) -> Result<f64, AnalysisError> {
    let outputs = classify_all(classifier, sentences.to_vec(), semaphore).await?;
    let values: Vec<f64> = outputs.iter().map(|o| formality_of(o)).collect();
    Ok(mean(&values).unwrap_or(0.0))
}

/// Full-precision Ethos for a candidate against a source.
pub async fn ethos(
    nli: &Arc<dyn TextClassifier>,
    formality_classifier: &Arc<dyn TextClassifier>,
    candidate: &[String],
    source: &[String],
    semaphore: &Arc<Semaphore>,
) -> Result<EthosResult, AnalysisError> {
    let (factual, form) = tokio::try_join!(
        factual_consistency(nli, candidate, source, semaphore),
        formality(formality_classifier, candidate, semaphore),
    )?;
    Ok(EthosResult::new(factual, form))
}
