// Rhetorical Scoring
// Ethos / Logos / Pathos scorers and the pipeline that combines them.

mod error;
pub mod aggregation;
pub mod batch;
pub mod ethos;
pub mod logos;
pub mod pathos;
pub mod pipeline;

pub use error::AnalysisError;
pub use aggregation::{average_sentencewise, mean, text_analysis};
pub use batch::classify_all;
pub use ethos::{ethos, factual_consistency, formality};
pub use logos::{logos, logos_for_pairs, Enrichment, NEUTRAL_LOGOS};
pub use pathos::{emotion_distribution, pathos, pathos_score, NEUTRAL_PATHOS};
pub use pipeline::Analyzer;
