// Bounded fan-out of classifier calls.

use crate::models::LabelScore;
use crate::services::classifier::{ClassifierError, TextClassifier};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use super::AnalysisError;

/// Classify every input concurrently, at most `semaphore` permits in flight.
///
/// Outputs are returned in input order. The first failing call aborts the
/// remaining tasks and is returned as the error.
pub async fn classify_all(
    classifier: &Arc<dyn TextClassifier>,
    inputs: Vec<String>,
    semaphore: &Arc<Semaphore>,
) -> Result<Vec<Vec<LabelScore>>, AnalysisError> {
    if inputs.is_empty() {
        return Ok(vec![]);
    }

    let started = Instant::now();
    let total = inputs.len();
    let mut join_set: JoinSet<(usize, Result<Vec<LabelScore>, ClassifierError>)> = JoinSet::new();

    for (idx, text) in inputs.into_iter().enumerate() {
        let classifier = Arc::clone(classifier);
        let semaphore = Arc::clone(semaphore);
        join_set.spawn(async move {
            // Permit covers the request only.
            let result = match semaphore.acquire_owned().await {
                Ok(_permit) => classifier.classify(&text).await,
                Err(_) => Err(ClassifierError::Other("semaphore closed".to_string())),
            };
            (idx, result)
        });
    }

    let mut outputs: Vec<(usize, Vec<LabelScore>)> = Vec::with_capacity(total);
    while let Some(joined) = join_set.join_next().await {
        let (idx, result) = joined.map_err(|e| AnalysisError::Task(e.to_string()))?;
        outputs.push((idx, result?));
    }

    outputs.sort_by_key(|(idx, _)| *idx);
    debug!(
        classifier = classifier.name(),
        calls = total,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "scoring.batch_done"
    );
    Ok(outputs.into_iter().map(|(_, labels)| labels).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::StaticClassifier;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_outputs_follow_input_order() {
        let classifier: Arc<dyn TextClassifier> = Arc::new(StaticClassifier::new("echo", |text| {
            // Earlier inputs finish later.
            let n: u64 = text.parse().unwrap_or(0);
            std::thread::sleep(std::time::Duration::from_millis(40 - n * 10));
            vec![LabelScore::new(text, 1.0)]
        }));
        let semaphore = Arc::new(Semaphore::new(4));
        let inputs: Vec<String> = (0..4).map(|i| i.to_string()).collect();

        let out = classify_all(&classifier, inputs, &semaphore).await.unwrap();
        let labels: Vec<&str> = out.iter().map(|o| o[0].label.as_str()).collect();
        assert_eq!(labels, vec!["0", "1", "2", "3"]);
    }

    #[tokio::test]
    async fn test_failure_is_propagated() {
        let classifier: Arc<dyn TextClassifier> = Arc::new(StaticClassifier::failing("down"));
        let semaphore = Arc::new(Semaphore::new(2));
        let err = classify_all(&classifier, vec!["a".to_string()], &semaphore)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Classifier(_)));
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_calls() {
        let mock = Arc::new(StaticClassifier::constant("mock", &[("joy", 1.0)]));
        let classifier: Arc<dyn TextClassifier> = mock.clone();
        let semaphore = Arc::new(Semaphore::new(1));
        assert!(classify_all(&classifier, vec![], &semaphore).await.unwrap().is_empty());
        assert_eq!(mock.call_count(), 0);
    }
}
