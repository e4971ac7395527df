// Text Classifier Capability
// Injected per dimension; the core never constructs models itself.

use crate::models::LabelScore;
use crate::services::config_store::{AppConfig, ClassifierConfig};
use crate::services::providers::{get_api_key, parse_provider, InferenceClient, InferenceResult, ProviderError};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn, Level};

/// Separator placed between premise and hypothesis for NLI models.
pub const NLI_PAIR_SEPARATOR: &str = " </s></s> ";

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    #[error("unsupported classifier provider '{0}'")]
    UnsupportedProvider(String),
    #[error("classifier '{0}' returned no labels")]
    EmptyOutput(String),
    #[error("{0}")]
    Other(String),
}

/// A model that scores a text against a set of labels.
///
/// Implementations may return any label set; callers read the labels they
/// recognise and treat everything else as absent.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    fn name(&self) -> &str;

    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>, ClassifierError>;
}

/// Concatenated premise/hypothesis input for NLI classifiers.
pub fn nli_input(premise: &str, hypothesis: &str) -> String {
    format!("{}{}{}", premise, NLI_PAIR_SEPARATOR, hypothesis)
}

/// Options fixed when a classifier is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierOptions {
    pub timeout: Duration,
    /// Report inference-server warnings at debug level instead of warn.
    pub quiet: bool,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            quiet: true,
        }
    }
}

impl From<&ClassifierConfig> for ClassifierOptions {
    fn from(config: &ClassifierConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.timeout_secs),
            quiet: config.quiet,
        }
    }
}

/// Classifier backed by a hosted inference endpoint.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: InferenceClient,
    model: String,
    api_key: Option<String>,
    options: ClassifierOptions,
}

impl HttpClassifier {
    pub fn new(
        client: InferenceClient,
        model: impl Into<String>,
        api_key: Option<String>,
        options: ClassifierOptions,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            api_key,
            options,
        }
    }

    pub fn from_config(config: &ClassifierConfig, app: &AppConfig) -> Result<Self, ClassifierError> {
        let spec = parse_provider(&config.provider);
        if !matches!(spec.name.as_str(), "hf" | "huggingface") {
            return Err(ClassifierError::UnsupportedProvider(spec.name));
        }

        let options = ClassifierOptions::from(config);
        let proxy_url = app
            .proxy
            .as_ref()
            .filter(|p| p.enabled)
            .and_then(|p| p.https.as_deref().or(p.http.as_deref()))
            .map(str::trim)
            .filter(|p| !p.is_empty());

        let client = match proxy_url {
            Some(p) => InferenceClient::with_proxy(config.base_url.as_deref(), options.timeout, p)?,
            None => InferenceClient::new(config.base_url.as_deref(), options.timeout),
        };

        let api_key = get_api_key(&spec.name, app);
        Ok(Self::new(client, spec.model, api_key, options))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn options(&self) -> &ClassifierOptions {
        &self.options
    }
}

#[async_trait]
impl TextClassifier for HttpClassifier {
    fn name(&self) -> &str {
        &self.model
    }

    async fn classify(&self, text: &str) -> Result<Vec<LabelScore>, ClassifierError> {
        let result = self
            .client
            .classify(&self.model, self.api_key.as_deref(), text)
            .await?;

        let level = diagnostic_level(self.options.quiet);
        for message in diagnostics(&result) {
            if level == Level::WARN {
                warn!(model = %self.model, warning = %message, "classifier.warning");
            } else {
                debug!(model = %self.model, warning = %message, "classifier.warning");
            }
        }

        debug!(model = %self.model, latency_ms = result.latency_ms, labels = result.labels.len(), "classifier.call");

        if result.labels.is_empty() {
            return Err(ClassifierError::EmptyOutput(self.model.clone()));
        }
        Ok(result.labels)
    }
}

/// Server warnings plus any score outside [0, 1].
fn diagnostics(result: &InferenceResult) -> Vec<String> {
    let out_of_range = result
        .labels
        .iter()
        .filter(|r| !(0.0..=1.0).contains(&r.score))
        .map(|r| format!("score out of range: {}={}", r.label, r.score));
    result.warnings.iter().cloned().chain(out_of_range).collect()
}

fn diagnostic_level(quiet: bool) -> Level {
    if quiet {
        Level::DEBUG
    } else {
        Level::WARN
    }
}

/// The classifier instances one analysis needs, owned by the caller.
#[derive(Clone)]
pub struct Classifiers {
    /// NLI model for candidate-vs-source factual consistency.
    pub nli: Arc<dyn TextClassifier>,
    /// NLI model for internal coherence between candidate sentences.
    pub logic_nli: Arc<dyn TextClassifier>,
    pub formality: Arc<dyn TextClassifier>,
    pub emotion: Arc<dyn TextClassifier>,
}

impl std::fmt::Debug for Classifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifiers")
            .field("nli", &self.nli.name())
            .field("logic_nli", &self.logic_nli.name())
            .field("formality", &self.formality.name())
            .field("emotion", &self.emotion.name())
            .finish()
    }
}

impl Classifiers {
    /// Use the same NLI model for both Ethos and Logos.
    pub fn new(
        nli: Arc<dyn TextClassifier>,
        formality: Arc<dyn TextClassifier>,
        emotion: Arc<dyn TextClassifier>,
    ) -> Self {
        Self {
            logic_nli: Arc::clone(&nli),
            nli,
            formality,
            emotion,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ClassifierError> {
        let c = &config.classifiers;
        Ok(Self {
            nli: Arc::new(HttpClassifier::from_config(&c.nli, config)?),
            logic_nli: Arc::new(HttpClassifier::from_config(&c.logic_nli, config)?),
            formality: Arc::new(HttpClassifier::from_config(&c.formality, config)?),
            emotion: Arc::new(HttpClassifier::from_config(&c.emotion, config)?),
        })
    }
}

#[cfg(any(test, feature = "mock"))]
pub use mock::StaticClassifier;

#[cfg(any(test, feature = "mock"))]
mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Responder = Box<dyn Fn(&str) -> Result<Vec<LabelScore>, ClassifierError> + Send + Sync>;

    /// Deterministic classifier for tests: answers from a closure.
    pub struct StaticClassifier {
        name: String,
        respond: Responder,
        calls: AtomicUsize,
    }

    impl StaticClassifier {
        pub fn new(
            name: &str,
            respond: impl Fn(&str) -> Vec<LabelScore> + Send + Sync + 'static,
        ) -> Self {
            Self {
                name: name.to_string(),
                respond: Box::new(move |text| Ok(respond(text))),
                calls: AtomicUsize::new(0),
            }
        }

        /// Always returns the same labels.
        pub fn constant(name: &str, labels: &[(&str, f64)]) -> Self {
            let labels: Vec<LabelScore> = labels
                .iter()
                .map(|(l, s)| LabelScore::new(*l, *s))
                .collect();
            Self::new(name, move |_| labels.clone())
        }

        pub fn failing(name: &str) -> Self {
            let owned = name.to_string();
            Self {
                name: name.to_string(),
                respond: Box::new(move |_| Err(ClassifierError::Other(format!("{} offline", owned)))),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TextClassifier for StaticClassifier {
        fn name(&self) -> &str {
            &self.name
        }

        async fn classify(&self, text: &str) -> Result<Vec<LabelScore>, ClassifierError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.respond)(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nli_input_format() {
        assert_eq!(
            nli_input("The sky is blue.", "It is daytime."),
            "The sky is blue. </s></s> It is daytime."
        );
    }

    #[test]
    fn test_diagnostics_collect_warnings_and_out_of_range_scores() {
        let result = InferenceResult {
            labels: vec![LabelScore::new("formal", 1.4), LabelScore::new("informal", 0.2)],
            latency_ms: 0,
            warnings: vec!["input truncated".to_string()],
        };
        let messages = diagnostics(&result);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], "input truncated");
        assert!(messages[1].contains("formal=1.4"));
    }

    #[test]
    fn test_quiet_reports_diagnostics_at_debug() {
        assert_eq!(diagnostic_level(true), Level::DEBUG);
        assert_eq!(diagnostic_level(false), Level::WARN);
        assert!(ClassifierOptions::default().quiet);
    }

    #[test]
    fn test_from_config_rejects_unknown_provider() {
        let app = AppConfig::default();
        let config = ClassifierConfig {
            provider: "openai:gpt".to_string(),
            ..ClassifierConfig::default()
        };
        assert!(matches!(
            HttpClassifier::from_config(&config, &app),
            Err(ClassifierError::UnsupportedProvider(_))
        ));
    }

    #[test]
    fn test_from_config_carries_options() {
        let app = AppConfig::default();
        let config = ClassifierConfig {
            provider: "hf:s-nlp/roberta-base-formality-ranker".to_string(),
            timeout_secs: 7,
            quiet: false,
            ..ClassifierConfig::default()
        };
        let classifier = HttpClassifier::from_config(&config, &app).unwrap();
        assert_eq!(classifier.model(), "s-nlp/roberta-base-formality-ranker");
        assert_eq!(classifier.options().timeout, Duration::from_secs(7));
        assert!(!classifier.options().quiet);
    }

    #[test]
    fn test_classifiers_from_default_config() {
        let classifiers = Classifiers::from_config(&AppConfig::default()).unwrap();
        assert_eq!(classifiers.nli.name(), "roberta-large-mnli");
        assert_eq!(classifiers.logic_nli.name(), "microsoft/deberta-large-mnli");
    }

    #[tokio::test]
    async fn test_static_classifier_counts_calls() {
        let classifier = StaticClassifier::constant("mock", &[("joy", 1.0)]);
        let out = classifier.classify("hello").await.unwrap();
        assert_eq!(out, vec![LabelScore::new("joy", 1.0)]);
        assert_eq!(classifier.call_count(), 1);
        assert!(StaticClassifier::failing("down").classify("x").await.is_err());
    }
}
