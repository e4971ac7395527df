// Analysis Pipeline
// Segments the texts, runs the three dimension scorers and aggregates.

use crate::models::{AnalysisResult, PairingMode, SentenceAnalysis, TextAnalysis};
use crate::services::classifier::{ClassifierError, Classifiers};
use crate::services::config_store::AppConfig;
use crate::services::enrichment::{ConceptNetClient, KnowledgeLookup};
use crate::services::sentence_segmenter::SentenceSegmenter;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::info;

use super::aggregation::{average_sentencewise, text_analysis};
use super::ethos::ethos;
use super::logos::{logos, Enrichment};
use super::pathos::pathos;
use super::AnalysisError;

const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Scores candidate texts for Ethos, Logos and Pathos.
///
/// Cloning is cheap; clones share classifiers and the concurrency limit.
#[derive(Clone)]
pub struct Analyzer {
    classifiers: Classifiers,
    segmenter: Arc<SentenceSegmenter>,
    knowledge: Option<Arc<dyn KnowledgeLookup>>,
    limit_per_noun: usize,
    pairing_mode: PairingMode,
    semaphore: Arc<Semaphore>,
}

impl Analyzer {
    /// No enrichment, full pairing, default concurrency.
    pub fn new(classifiers: Classifiers, segmenter: SentenceSegmenter) -> Self {
        Self {
            classifiers,
            segmenter: Arc::new(segmenter),
            knowledge: None,
            limit_per_noun: 1,
            pairing_mode: PairingMode::Full,
            semaphore: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENCY)),
        }
    }

    pub fn with_knowledge(mut self, lookup: Arc<dyn KnowledgeLookup>, limit_per_noun: usize) -> Self {
        self.knowledge = Some(lookup);
        self.limit_per_noun = limit_per_noun;
        self
    }

    pub fn with_pairing_mode(mut self, mode: PairingMode) -> Self {
        self.pairing_mode = mode;
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.semaphore = Arc::new(Semaphore::new(max.max(1)));
        self
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ClassifierError> {
        let classifiers = Classifiers::from_config(config)?;
        let segmenter = SentenceSegmenter::from_config(&config.segmenter);

        let mut analyzer = Self::new(classifiers, segmenter)
            .with_pairing_mode(config.analysis.pairing_mode)
            .with_max_concurrency(config.analysis.max_concurrency);

        if config.enrichment.enabled {
            analyzer = analyzer.with_knowledge(
                Arc::new(ConceptNetClient::from_config(&config.enrichment)),
                config.enrichment.limit_per_noun,
            );
        }

        info!(
            classifiers = ?analyzer.classifiers,
            segmenter_service = analyzer.segmenter.has_service(),
            enrichment = config.enrichment.enabled,
            pairing_mode = %analyzer.pairing_mode,
            max_concurrency = config.analysis.max_concurrency,
            "analyzer.configured"
        );
        Ok(analyzer)
    }

    pub fn pairing_mode(&self) -> PairingMode {
        self.pairing_mode
    }

    fn enrichment(&self) -> Option<Enrichment<'_>> {
        self.knowledge.as_deref().map(|lookup| Enrichment {
            lookup,
            limit_per_noun: self.limit_per_noun,
        })
    }

    /// Score one candidate (already segmented) against the source sentences.
    /// Values stay at full precision.
    async fn score(
        &self,
        candidate_text: &str,
        candidate: &[String],
        source: &[String],
    ) -> Result<TextAnalysis, AnalysisError> {
        let c = &self.classifiers;
        let (ethos, logos, pathos) = tokio::try_join!(
            ethos(&c.nli, &c.formality, candidate, source, &self.semaphore),
            logos(
                &c.logic_nli,
                candidate_text,
                self.pairing_mode,
                self.enrichment(),
                &self.semaphore
            ),
            pathos(&c.emotion, candidate, &self.semaphore),
        )?;

        Ok(TextAnalysis {
            ethos,
            logos: logos.score,
            pathos: pathos.score,
        })
    }

    /// Whole-text analysis with no per-sentence breakdown.
    pub async fn analyze_text(&self, source_text: &str, candidate_text: &str) -> Result<TextAnalysis, AnalysisError> {
        let started = Instant::now();
        let (candidate, source) = tokio::join!(
            self.segmenter.segment(candidate_text),
            self.segmenter.segment(source_text),
        );

        let scores = self.score(candidate_text, &candidate, &source).await?;
        info!(
            candidate_sentences = candidate.len(),
            source_sentences = source.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis.text_done"
        );
        Ok(text_analysis(scores.ethos, scores.logos, scores.pathos))
    }

    /// Per-sentence analysis of the candidate plus the averaged overall record.
    ///
    /// Each candidate sentence is scored as a one-sentence text: Ethos against
    /// the whole source, Logos and Pathos on the sentence alone.
    pub async fn analyze_text_sentencewise(
        &self,
        source_text: &str,
        candidate_text: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let (candidate, source) = tokio::join!(
            self.segmenter.segment(candidate_text),
            self.segmenter.segment(source_text),
        );

        if candidate.is_empty() {
            return Err(AnalysisError::EmptyInput {
                context: "candidate_text".to_string(),
            });
        }

        let source = Arc::new(source);
        let total = candidate.len();
        let mut join_set: JoinSet<(usize, Result<SentenceAnalysis, AnalysisError>)> = JoinSet::new();

        // Unit tasks hold no permit; the classifier calls and lookups inside them do.
        for (idx, sentence) in candidate.into_iter().enumerate() {
            let analyzer = self.clone();
            let source = Arc::clone(&source);
            join_set.spawn(async move {
                let unit = std::slice::from_ref(&sentence);
                let result = analyzer
                    .score(&sentence, unit, &source)
                    .await
                    .map(|s| SentenceAnalysis {
                        sentence: sentence.clone(),
                        ethos: s.ethos,
                        logos: s.logos,
                        pathos: s.pathos,
                    });
                (idx, result)
            });
        }

        let mut units: Vec<(usize, SentenceAnalysis)> = Vec::with_capacity(total);
        while let Some(joined) = join_set.join_next().await {
            let (idx, result) = joined.map_err(|e| AnalysisError::Task(e.to_string()))?;
            units.push((idx, result?));
        }
        units.sort_by_key(|(idx, _)| *idx);

        let result = average_sentencewise(units.into_iter().map(|(_, u)| u).collect())?;
        info!(
            sentences = total,
            source_sentences = source.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "analysis.sentencewise_done"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LabelScore;
    use crate::services::classifier::{StaticClassifier, TextClassifier};
    use crate::services::enrichment::tests::FakeLookup;
    use crate::services::enrichment::{EnrichmentLookupError, Relation};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Mocks {
        nli: Arc<StaticClassifier>,
        formality: Arc<StaticClassifier>,
        emotion: Arc<StaticClassifier>,
    }

    impl Mocks {
        fn classifiers(&self) -> Classifiers {
            let nli: Arc<dyn TextClassifier> = self.nli.clone();
            Classifiers::new(nli, self.formality.clone(), self.emotion.clone())
        }
    }

    fn default_mocks() -> Mocks {
        Mocks {
            nli: Arc::new(StaticClassifier::constant(
                "nli",
                &[("ENTAILMENT", 0.9), ("NEUTRAL", 0.0), ("CONTRADICTION", 0.1)],
            )),
            formality: Arc::new(StaticClassifier::constant(
                "formality",
                &[("formal", 0.8), ("informal", 0.2)],
            )),
            emotion: Arc::new(StaticClassifier::constant("emotion", &[("neutral", 1.0)])),
        }
    }

    fn analyzer(mocks: &Mocks) -> Analyzer {
        Analyzer::new(mocks.classifiers(), SentenceSegmenter::rule_based())
    }

    #[tokio::test]
    async fn test_analyze_text_whole() {
        let mocks = default_mocks();
        let text = "The report was published. The data supports it.";
        let result = analyzer(&mocks).analyze_text(text, text).await.unwrap();

        assert_eq!(result.ethos.factual_consistency, 0.9);
        assert_eq!(result.ethos.formality, 0.8);
        assert_eq!(result.ethos.score, 0.86);
        // (0.9 - 0.1 + 1) / 2
        assert_eq!(result.logos, 0.9);
        assert_eq!(result.pathos, 0.25);
        // 2 x 2 Ethos pairs + 1 Logos pair
        assert_eq!(mocks.nli.call_count(), 5);
    }

    #[tokio::test]
    async fn test_syllogism_candidate_has_neutral_logos() {
        let mocks = default_mocks();
        let text = "All men are mortal. Socrates is a man.";
        let result = analyzer(&mocks).analyze_text(text, text).await.unwrap();
        assert_eq!(result.logos, 0.5);
        // Only the Ethos pairs reach the NLI model.
        assert_eq!(mocks.nli.call_count(), 4);
    }

    #[tokio::test]
    async fn test_empty_candidate_is_an_error() {
        let mocks = default_mocks();
        let err = analyzer(&mocks)
            .analyze_text_sentencewise("Some source.", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyInput { .. }));
        assert_eq!(mocks.nli.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_source_gives_zero_factual_consistency() {
        let mocks = default_mocks();
        let result = analyzer(&mocks)
            .analyze_text_sentencewise("", "One claim.")
            .await
            .unwrap();
        assert_eq!(result.overall.ethos.factual_consistency, 0.0);
        assert_eq!(result.overall.ethos.formality, 0.8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sentencewise_order_and_mean() {
        let mocks = Mocks {
            emotion: Arc::new(StaticClassifier::new("emotion", |text| {
                // First sentence finishes last.
                let (joy, delay) = match text {
                    "First point." => (0.2, 60),
                    "Second point." => (0.5, 30),
                    _ => (0.8, 0),
                };
                std::thread::sleep(std::time::Duration::from_millis(delay));
                vec![LabelScore::new("joy", joy), LabelScore::new("sadness", 1.0 - joy)]
            })),
            ..default_mocks()
        };

        let result = analyzer(&mocks)
            .with_max_concurrency(3)
            .analyze_text_sentencewise(
                "First point. Second point. Third point.",
                "First point. Second point. Third point.",
            )
            .await
            .unwrap();

        let order: Vec<&str> = result.sentencewise.iter().map(|s| s.sentence.as_str()).collect();
        assert_eq!(order, vec!["First point.", "Second point.", "Third point."]);
        // Pathos per unit = (joy + 1) / 2
        let pathos: Vec<f64> = result.sentencewise.iter().map(|s| s.pathos).collect();
        assert_eq!(pathos, vec![0.6, 0.75, 0.9]);
        assert_eq!(result.overall.pathos, 0.75);
        // Single-sentence units have no premise pairs.
        assert!(result.sentencewise.iter().all(|s| s.logos == 0.5));
    }

    #[tokio::test]
    async fn test_enrichment_feeds_unit_logos() {
        let mocks = default_mocks();
        let lookup = Arc::new(FakeLookup::new(&[("Socrates", &["philosopher"])]));
        let result = analyzer(&mocks)
            .with_knowledge(lookup, 1)
            .analyze_text_sentencewise("Socrates taught.", "Socrates taught.")
            .await
            .unwrap();
        // The unit gains one synthetic sentence and therefore one pair.
        assert_eq!(result.sentencewise[0].logos, 0.9);
        assert_eq!(mocks.nli.call_count(), 2);
    }

    /// Records how many lookups run at the same time.
    #[derive(Default)]
    struct SlowLookup {
        in_flight: AtomicUsize,
        max_seen: AtomicUsize,
    }

    #[async_trait]
    impl KnowledgeLookup for SlowLookup {
        async fn lookup(&self, _entity: &str, _limit: usize) -> Result<Vec<Relation>, EnrichmentLookupError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_seen.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(vec![])
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sentencewise_lookups_respect_concurrency_limit() {
        let mocks = default_mocks();
        let lookup = Arc::new(SlowLookup::default());
        let text = "Alice runs. Bob swims. Carol reads. Dave cooks. Erin sings.";

        let result = analyzer(&mocks)
            .with_knowledge(lookup.clone(), 1)
            .with_max_concurrency(2)
            .analyze_text_sentencewise(text, text)
            .await
            .unwrap();

        assert_eq!(result.sentencewise.len(), 5);
        let max_seen = lookup.max_seen.load(Ordering::SeqCst);
        assert!((1..=2).contains(&max_seen), "max in flight {}", max_seen);
    }
}
