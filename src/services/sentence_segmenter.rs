// Sentence Segmenter
// Linguistic boundary service first, rule-based splitter as fallback.

use crate::services::config_store::SegmenterConfig;
use crate::services::scoring::AnalysisError;
use crate::services::text_processor::split_sentences;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Local boundary service address used by `segment_text --segmenter`.
pub const DEFAULT_SEGMENTER_URL: &str = "http://127.0.0.1:8788";

/// One sentence returned by the boundary service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentenceResult {
    pub text: String,
    #[serde(default)]
    pub start: i32,
    #[serde(default)]
    pub end: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SegmentRequest<'a> {
    text: &'a str,
    language: &'a str,
}

#[derive(Debug, Deserialize)]
struct SegmentResponse {
    sentences: Vec<SentenceResult>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Client for the linguistic sentence boundary service.
#[derive(Debug, Clone)]
pub struct TextSegmenterClient {
    base_url: String,
    client: Client,
}

impl TextSegmenterClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check whether the service answers its health probe.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(resp) => resp
                .json::<HealthResponse>()
                .await
                .map(|h| h.status == "ok")
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    pub async fn segment_sentences(
        &self,
        text: &str,
        language: &str,
    ) -> Result<Vec<SentenceResult>, String> {
        let url = format!("{}/segment", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&SegmentRequest { text, language })
            .send()
            .await
            .map_err(|e| format!("Failed to call segmenter service: {}", e))?;

        if !response.status().is_success() {
            return Err(format!(
                "Segmenter service returned error: {}",
                response.status()
            ));
        }

        let result: SegmentResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse response: {}", e))?;

        Ok(result.sentences)
    }
}

/// Splits raw text into ordered, trimmed, non-empty sentences.
///
/// The first available strategy wins; no attempt is made to reconcile the
/// service's boundaries with the rule-based ones.
#[derive(Debug, Clone)]
pub struct SentenceSegmenter {
    primary: Option<TextSegmenterClient>,
    language: String,
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self::rule_based()
    }
}

impl SentenceSegmenter {
    /// Segmenter with no boundary service; always uses the rule-based splitter.
    pub fn rule_based() -> Self {
        Self {
            primary: None,
            language: "en".to_string(),
        }
    }

    pub fn with_service(client: TextSegmenterClient) -> Self {
        Self {
            primary: Some(client),
            language: "en".to_string(),
        }
    }

    pub fn from_config(config: &SegmenterConfig) -> Self {
        let primary = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(|u| TextSegmenterClient::new(u, Duration::from_secs(config.timeout_secs)));
        Self {
            primary,
            language: config.language.clone(),
        }
    }

    pub fn has_service(&self) -> bool {
        self.primary.is_some()
    }

    pub async fn segment(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return vec![];
        }

        match self.segment_with_service(text).await {
            Ok(sentences) => {
                debug!(count = sentences.len(), "segmenter.service");
                sentences
            }
            Err(e) => {
                if self.primary.is_some() {
                    warn!("[segmenter] {}, falling back to rule-based splitter", e);
                }
                split_sentences(text)
            }
        }
    }

    async fn segment_with_service(&self, text: &str) -> Result<Vec<String>, AnalysisError> {
        let client = self
            .primary
            .as_ref()
            .ok_or_else(|| AnalysisError::ClassifierUnavailable {
                reason: "no sentence boundary service configured".to_string(),
            })?;

        let sentences = client
            .segment_sentences(text, &self.language)
            .await
            .map_err(|reason| AnalysisError::ClassifierUnavailable { reason })?;

        Ok(sentences
            .into_iter()
            .map(|s| s.text.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }
}
