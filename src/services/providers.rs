// Inference Provider Service
// Calls hosted text-classification models over HTTP

use crate::models::LabelScore;
use crate::services::config_store::AppConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const HF_INFERENCE_DEFAULT_URL: &str = "https://api-inference.huggingface.co";
pub const DEFAULT_PROVIDER: &str = "hf";

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Missing label scores in response")]
    MissingContent,
    #[error("JSON parse error: {0}")]
    JsonError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpec {
    pub name: String,
    pub model: String,
}

/// Parse `"provider:model"`; a bare model name uses the default provider.
pub fn parse_provider(spec: &str) -> ProviderSpec {
    match spec.split_once(':') {
        Some((name, model)) => ProviderSpec {
            name: name.trim().to_string(),
            model: model.trim().to_string(),
        },
        None => ProviderSpec {
            name: DEFAULT_PROVIDER.to_string(),
            model: spec.trim().to_string(),
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    pub labels: Vec<LabelScore>,
    pub latency_ms: i64,
    /// Warnings reported by the inference server alongside the scores.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct InferenceClient {
    client: Client,
    base_url: String,
}

impl InferenceClient {
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();
        Self {
            client,
            base_url: resolve_base_url(base_url),
        }
    }

    pub fn with_proxy(
        base_url: Option<&str>,
        timeout: Duration,
        proxy_url: &str,
    ) -> Result<Self, ProviderError> {
        let proxy = reqwest::Proxy::all(proxy_url)?;
        let client = Client::builder().timeout(timeout).proxy(proxy).build()?;
        Ok(Self {
            client,
            base_url: resolve_base_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a text-classification model and return every label it scores.
    pub async fn classify(
        &self,
        model: &str,
        api_key: Option<&str>,
        text: &str,
    ) -> Result<InferenceResult, ProviderError> {
        let url = format!("{}/models/{}", self.base_url, model);
        let request = serde_json::json!({
            "inputs": text,
            "parameters": { "top_k": null },
        });

        let start = Instant::now();

        let mut builder = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }
        let response = builder.send().await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: body,
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::JsonError(e.to_string()))?;

        let (labels, warnings) = parse_label_scores(&data)?;
        Ok(InferenceResult {
            labels,
            latency_ms,
            warnings,
        })
    }
}

fn resolve_base_url(base_url: Option<&str>) -> String {
    base_url
        .map(str::to_string)
        .or_else(|| env::var("RHETORICA_HF_API_URL").ok())
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| HF_INFERENCE_DEFAULT_URL.to_string())
        .trim_end_matches('/')
        .to_string()
}

/// Accepts `[[{label, score}]]`, `[{label, score}]`, and
/// `{"labels": [...], "scores": [...]}` response shapes.
pub fn parse_label_scores(
    data: &serde_json::Value,
) -> Result<(Vec<LabelScore>, Vec<String>), ProviderError> {
    let mut warnings = Vec::new();

    let records = match data {
        serde_json::Value::Array(items) => match items.first() {
            Some(serde_json::Value::Array(inner)) => inner.clone(),
            Some(_) => items.clone(),
            None => return Err(ProviderError::MissingContent),
        },
        serde_json::Value::Object(obj) => {
            if let Some(w) = obj.get("warnings").and_then(|w| w.as_array()) {
                warnings.extend(w.iter().filter_map(|s| s.as_str().map(str::to_string)));
            }
            if let (Some(labels), Some(scores)) = (
                obj.get("labels").and_then(|l| l.as_array()),
                obj.get("scores").and_then(|s| s.as_array()),
            ) {
                let zipped = labels
                    .iter()
                    .zip(scores.iter())
                    .filter_map(|(l, s)| Some(LabelScore::new(l.as_str()?, s.as_f64()?)))
                    .collect::<Vec<_>>();
                if zipped.is_empty() {
                    return Err(ProviderError::MissingContent);
                }
                return Ok((zipped, warnings));
            }
            if let Some(err) = obj.get("error").and_then(|e| e.as_str()) {
                return Err(ProviderError::ApiError {
                    status: 200,
                    message: err.to_string(),
                });
            }
            return Err(ProviderError::MissingContent);
        }
        _ => return Err(ProviderError::MissingContent),
    };

    let labels = records
        .into_iter()
        .map(|r| serde_json::from_value::<LabelScore>(r).map_err(|e| ProviderError::JsonError(e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((labels, warnings))
}

/// Get an API key from the environment, then from the config file contents.
pub fn get_api_key(provider: &str, config: &AppConfig) -> Option<String> {
    let env_keys: &[&str] = match provider {
        "hf" | "huggingface" => &["HF_API_TOKEN", "RHETORICA_HF_API_TOKEN"],
        _ => &[],
    };

    for key in env_keys {
        if let Ok(val) = env::var(key) {
            let v = val.trim();
            if !v.is_empty() {
                return Some(v.to_string());
            }
        }
    }

    config
        .api_keys
        .get(provider)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
