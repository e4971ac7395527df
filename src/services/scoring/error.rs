use thiserror::Error;

use crate::services::classifier::ClassifierError;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// A mean was requested over zero sentences.
    #[error("empty input: {context} produced no sentences")]
    EmptyInput { context: String },

    /// The primary sentence boundary model could not be used.
    #[error("sentence boundary model unavailable: {reason}")]
    ClassifierUnavailable { reason: String },

    #[error("invalid pairing mode '{mode}': expected 'adjacent' or 'full'")]
    InvalidMode { mode: String },

    #[error("classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("scoring task failed: {0}")]
    Task(String),
}
