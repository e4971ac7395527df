// Rhetorica Core Services

pub mod text_processor;
pub mod config_store;
pub mod providers;
pub mod classifier;
pub mod distribution;
pub mod premise_pairs;
pub mod enrichment;
pub mod scoring;
pub mod sentence_segmenter;

pub use text_processor::*;
pub use config_store::*;
pub use sentence_segmenter::*;

pub use classifier::{nli_input, Classifiers, ClassifierError, HttpClassifier, TextClassifier};
pub use distribution::{dominant_label, label_probs, pair_score};
pub use enrichment::{enrich_text, ConceptNetClient, KnowledgeLookup};
pub use premise_pairs::{adaptive_merge, generate_sentence_pairs, premise_pairs_for_text};
pub use scoring::{AnalysisError, Analyzer};
