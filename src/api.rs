// Request / response boundary for an HTTP or IPC shell.

use crate::models::{AnalyzeRequest, AnalyzeResponse, TextAnalysis};
use crate::services::scoring::{AnalysisError, Analyzer};
use tracing::{info, warn};

/// Lenient request parsing: malformed JSON becomes an empty request.
pub fn parse_request(body: &str) -> AnalyzeRequest {
    match serde_json::from_str::<AnalyzeRequest>(body) {
        Ok(req) => req,
        Err(e) => {
            warn!(error = %e, "api.malformed_request");
            AnalyzeRequest::default()
        }
    }
}

/// Sentencewise analysis of a raw request body.
pub async fn handle_analyze(analyzer: &Analyzer, body: &str) -> Result<AnalyzeResponse, AnalysisError> {
    let req = parse_request(body);
    info!(
        source_len = req.source_text.len(),
        candidate_len = req.candidate_text.len(),
        "api.analyze"
    );

    let analysis = analyzer
        .analyze_text_sentencewise(&req.source_text, &req.candidate_text)
        .await?;
    Ok(AnalyzeResponse { analysis })
}

/// Whole-text analysis of a raw request body.
pub async fn handle_analyze_text(analyzer: &Analyzer, body: &str) -> Result<TextAnalysis, AnalysisError> {
    let req = parse_request(body);
    analyzer.analyze_text(&req.source_text, &req.candidate_text).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::classifier::{Classifiers, StaticClassifier};
    use crate::services::sentence_segmenter::SentenceSegmenter;
    use std::sync::Arc;

    fn analyzer() -> Analyzer {
        let classifiers = Classifiers::new(
            Arc::new(StaticClassifier::constant("nli", &[("ENTAILMENT", 1.0)])),
            Arc::new(StaticClassifier::constant("formality", &[("formal", 1.0)])),
            Arc::new(StaticClassifier::constant("emotion", &[("joy", 1.0)])),
        );
        Analyzer::new(classifiers, SentenceSegmenter::rule_based())
    }

    #[test]
    fn test_malformed_body_defaults_to_empty_strings() {
        let req = parse_request("{not json");
        assert_eq!(req.source_text, "");
        assert_eq!(req.candidate_text, "");
    }

    #[tokio::test]
    async fn test_malformed_body_surfaces_empty_input() {
        let err = handle_analyze(&analyzer(), "{not json").await.unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyInput { .. }));
    }

    #[tokio::test]
    async fn test_response_shape() {
        let body = r#"{"source_text": "The sun is a star.", "candidate_text": "The sun is a star. It shines."}"#;
        let response = handle_analyze(&analyzer(), body).await.unwrap();
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["analysis"]["sentencewise"].as_array().map(|a| a.len()), Some(2));
        assert_eq!(json["analysis"]["overall"]["ethos"]["factual_consistency"], 1.0);
        assert_eq!(json["analysis"]["sentencewise"][1]["sentence"], "It shines.");
    }

    #[tokio::test]
    async fn test_whole_text_handler() {
        let body = r#"{"source_text": "A fact.", "candidate_text": "A fact."}"#;
        let out = handle_analyze_text(&analyzer(), body).await.unwrap();
        assert_eq!(out.ethos.score, 1.0);
        assert_eq!(out.pathos, 1.0);
    }
}
