// Pathos: emotional valence from per-sentence emotion classification.

use crate::models::PathosResult;
use crate::services::classifier::TextClassifier;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

use super::batch::classify_all;
use super::AnalysisError;

const POSITIVE: &[&str] = &["joy", "surprise"];
const NEGATIVE: &[&str] = &["anger", "fear", "disgust"];
const NEUTRAL: &str = "neutral";
const NEUTRAL_WEIGHT: f64 = 0.5;

/// Score used when no sentence was classified.
pub const NEUTRAL_PATHOS: f64 = 0.5;

/// Per-label confidence summed over sentences and divided by the sentence count.
pub async fn emotion_distribution(
    classifier: &Arc<dyn TextClassifier>,
    sentences: &[String],
    semaphore: &Arc<Semaphore>,
) -> Result<BTreeMap<String, f64>, AnalysisError> {
    let outputs = classify_all(classifier, sentences.to_vec(), semaphore).await?;

    let mut dist: BTreeMap<String, f64> = BTreeMap::new();
    for rec in outputs.iter().flatten() {
        *dist.entry(rec.label.to_lowercase()).or_insert(0.0) += rec.score;
    }

    let n = sentences.len() as f64;
    for value in dist.values_mut() {
        *value /= n;
    }
    Ok(dist)
}

pub fn pathos_score(dist: &BTreeMap<String, f64>) -> f64 {
    if dist.is_empty() {
        return NEUTRAL_PATHOS;
    }

    let get = |label: &str| dist.get(label).copied().unwrap_or(0.0);
    let pos: f64 = POSITIVE.iter().map(|&l| get(l)).sum();
    let neg: f64 = NEGATIVE.iter().map(|&l| get(l)).sum();
    let raw = pos - (neg + NEUTRAL_WEIGHT * get(NEUTRAL));

    ((raw + 1.0) / 2.0).clamp(0.0, 1.0)
}

pub async fn pathos(
    classifier: &Arc<dyn TextClassifier>,
    sentences: &[String],
    semaphore: &Arc<Semaphore>,
) -> Result<PathosResult, AnalysisError> {
    let emotion_distribution = emotion_distribution(classifier, sentences, semaphore).await?;
    Ok(PathosResult {
        score: pathos_score(&emotion_distribution),
        emotion_distribution,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabelScore;
    use crate::services::classifier::StaticClassifier;

    fn dist(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(l, v)| (l.to_string(), *v)).collect()
    }

    #[test]
    fn test_all_neutral_scores_a_quarter() {
        assert_eq!(pathos_score(&dist(&[("neutral", 1.0)])), 0.25);
    }

    #[test]
    fn test_valence_extremes_are_clamped() {
        assert_eq!(pathos_score(&dist(&[("joy", 1.0), ("surprise", 1.0)])), 1.0);
        assert_eq!(pathos_score(&dist(&[("anger", 1.0), ("fear", 1.0)])), 0.0);
        assert_eq!(pathos_score(&dist(&[("sadness", 1.0)])), 0.5);
        assert_eq!(pathos_score(&BTreeMap::new()), NEUTRAL_PATHOS);
    }

    #[tokio::test]
    async fn test_distribution_is_mean_over_sentences() {
        let classifier: Arc<dyn TextClassifier> = Arc::new(StaticClassifier::new("emotion", |text| {
            if text.contains('!') {
                vec![LabelScore::new("JOY", 1.0)]
            } else {
                vec![LabelScore::new("neutral", 1.0)]
            }
        }));
        let sentences = vec!["Great news!".to_string(), "It rained.".to_string()];
        let result = pathos(&classifier, &sentences, &Arc::new(Semaphore::new(2)))
            .await
            .unwrap();

        assert_eq!(result.emotion_distribution, dist(&[("joy", 0.5), ("neutral", 0.5)]));
        // raw = 0.5 - 0.25
        assert!((result.score - 0.625).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_no_sentences_is_neutral() {
        let classifier: Arc<dyn TextClassifier> = Arc::new(StaticClassifier::constant("e", &[("joy", 1.0)]));
        let result = pathos(&classifier, &[], &Arc::new(Semaphore::new(1))).await.unwrap();
        assert!(result.emotion_distribution.is_empty());
        assert_eq!(result.score, NEUTRAL_PATHOS);
    }
}
