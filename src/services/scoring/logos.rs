// Logos: internal coherence between premise pairs of the candidate.

use crate::models::{LogosResult, PairingMode, SentencePair};
use crate::services::classifier::{nli_input, TextClassifier};
use crate::services::distribution::{label_probs, prob, CONTRADICTION, ENTAILMENT};
use crate::services::enrichment::{enrich_text, KnowledgeLookup};
use crate::services::premise_pairs::premise_pairs_for_text;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::debug;

use super::aggregation::mean;
use super::batch::classify_all;
use super::AnalysisError;

/// Score used when the text yields no premise pairs.
pub const NEUTRAL_LOGOS: f64 = 0.5;

/// Where enrichment facts come from and how many to take per entity.
#[derive(Clone, Copy)]
pub struct Enrichment<'a> {
    pub lookup: &'a dyn KnowledgeLookup,
    pub limit_per_noun: usize,
}

/// `(avg entailment − avg contradiction + 1) / 2` over the given pairs.
pub async fn logos_for_pairs(
    classifier: &Arc<dyn TextClassifier>,
    pairs: &[SentencePair],
    semaphore: &Arc<Semaphore>,
) -> Result<f64, AnalysisError> {
    if pairs.is_empty() {
        return Ok(NEUTRAL_LOGOS);
    }

    let inputs: Vec<String> = pairs
        .iter()
        .map(|p| nli_input(&p.premise, &p.hypothesis))
        .collect();
    let outputs = classify_all(classifier, inputs, semaphore).await?;

    let dists: Vec<_> = outputs.iter().map(|o| label_probs(o)).collect();
    let entail: Vec<f64> = dists.iter().map(|d| prob(d, ENTAILMENT)).collect();
    let contra: Vec<f64> = dists.iter().map(|d| prob(d, CONTRADICTION)).collect();

    let raw = mean(&entail).unwrap_or(0.0) - mean(&contra).unwrap_or(0.0);
    Ok((raw + 1.0) / 2.0)
}

/// Enrich (optionally), merge, pair and score a candidate text.
pub async fn logos(
    classifier: &Arc<dyn TextClassifier>,
    text: &str,
    mode: PairingMode,
    enrichment: Option<Enrichment<'_>>,
    semaphore: &Arc<Semaphore>,
) -> Result<LogosResult, AnalysisError> {
    // The lookup chain holds one permit and releases it before classification.
    let text = match enrichment {
        Some(e) => {
            let _permit = semaphore
                .acquire()
                .await
                .map_err(|err| AnalysisError::Task(err.to_string()))?;
            enrich_text(text, e.lookup, e.limit_per_noun).await
        }
        None => text.to_string(),
    };

    let pairs = premise_pairs_for_text(&text, mode);
    debug!(pairs = pairs.len(), mode = %mode, "logos.pairs");
    let score = logos_for_pairs(classifier, &pairs, semaphore).await?;
    Ok(LogosResult { score })
}
