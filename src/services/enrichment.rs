// Knowledge Enrichment
// Appends "X is a Y." facts for capitalised entities before Logos pairing.

use crate::services::config_store::EnrichmentConfig;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EnrichmentLookupError {
    #[error("lookup request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("lookup service returned status {0}")]
    Status(u16),
    #[error("lookup timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub relation: String,
    pub target_label: String,
}

/// External knowledge source queried per entity.
#[async_trait]
pub trait KnowledgeLookup: Send + Sync {
    async fn lookup(&self, entity: &str, limit: usize) -> Result<Vec<Relation>, EnrichmentLookupError>;
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    edges: Vec<Edge>,
}

#[derive(Debug, Deserialize)]
struct Edge {
    end: EdgeNode,
    #[serde(default)]
    rel: Option<EdgeNode>,
}

#[derive(Debug, Deserialize)]
struct EdgeNode {
    label: String,
}

/// ConceptNet `IsA` lookups.
#[derive(Debug, Clone)]
pub struct ConceptNetClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl ConceptNetClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &EnrichmentConfig) -> Self {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    fn query_url(&self, entity: &str, limit: usize) -> String {
        format!(
            "{}/query?node=/c/en/{}&rel=/r/IsA&limit={}",
            self.base_url,
            entity.to_lowercase(),
            limit
        )
    }
}

#[async_trait]
impl KnowledgeLookup for ConceptNetClient {
    async fn lookup(&self, entity: &str, limit: usize) -> Result<Vec<Relation>, EnrichmentLookupError> {
        let url = self.query_url(entity, limit);
        let request = self.client.get(&url).send();
        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| EnrichmentLookupError::Timeout(self.timeout))??;

        if !response.status().is_success() {
            return Err(EnrichmentLookupError::Status(response.status().as_u16()));
        }

        let data: QueryResponse = response.json().await?;
        Ok(data
            .edges
            .into_iter()
            .map(|e| Relation {
                relation: e.rel.map(|r| r.label).unwrap_or_else(|| "IsA".to_string()),
                target_label: e.end.label,
            })
            .collect())
    }
}

fn entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b[A-Z][a-z]+\b").expect("valid regex"))
}

/// Capitalised words in order of appearance, repeats included.
pub fn candidate_entities(text: &str) -> Vec<&str> {
    entity_re().find_iter(text).map(|m| m.as_str()).collect()
}

/// Append one "Entity is a target." sentence per relation found.
///
/// A failed lookup only drops that entity's facts.
pub async fn enrich_text(text: &str, lookup: &dyn KnowledgeLookup, limit_per_noun: usize) -> String {
    let mut added: Vec<String> = Vec::new();

    for entity in candidate_entities(text) {
        match lookup.lookup(entity, limit_per_noun).await {
            Ok(relations) => {
                added.extend(
                    relations
                        .into_iter()
                        .map(|r| format!("{} is a {}.", entity, r.target_label)),
                );
            }
            Err(e) => {
                debug!(entity = entity, error = %e, "enrichment.lookup_skipped");
            }
        }
    }

    if added.is_empty() {
        return text.to_string();
    }

    debug!(facts = added.len(), "enrichment.applied");
    format!("{} {}", text, added.join(" "))
}
