// Rhetorica Data Models
// Everything is built fresh per analysis call and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::services::scoring::AnalysisError;

/// Label (upper-cased for NLI output) → probability.
///
/// Any label the classifier emits is kept; consumers read only the labels
/// they know and default the rest to `0.0`.
pub type ProbabilityDistribution = BTreeMap<String, f64>;

/// Round to 4 decimal places. Only applied when a value leaves the pipeline.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

// ============ Classifier Output ============

/// One record of raw classifier output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    #[serde(alias = "confidence")]
    pub score: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

// ============ Pairing ============

#[derive(Debug, Clone, PartialEq)]
pub struct PairScore {
    /// `P(ENTAILMENT) + 0.5 * P(NEUTRAL)`, kept inside [0, 1].
    pub support: f64,
    /// Label with the highest probability; `None` for an empty distribution.
    pub dominant_label: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentencePair {
    pub premise: String,
    pub hypothesis: String,
}

impl SentencePair {
    pub fn new(premise: impl Into<String>, hypothesis: impl Into<String>) -> Self {
        Self {
            premise: premise.into(),
            hypothesis: hypothesis.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingMode {
    /// (s[i], s[i+1]) only.
    Adjacent,
    /// Every (s[i], s[j]) with i < j.
    #[default]
    Full,
}

impl FromStr for PairingMode {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adjacent" => Ok(PairingMode::Adjacent),
            "full" => Ok(PairingMode::Full),
            other => Err(AnalysisError::InvalidMode {
                mode: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for PairingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairingMode::Adjacent => write!(f, "adjacent"),
            PairingMode::Full => write!(f, "full"),
        }
    }
}

// ============ Dimension Results ============

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EthosResult {
    pub score: f64,
    pub factual_consistency: f64,
    pub formality: f64,
}

impl EthosResult {
    pub const FACTUAL_WEIGHT: f64 = 0.6;
    pub const FORMALITY_WEIGHT: f64 = 0.4;

    pub fn new(factual_consistency: f64, formality: f64) -> Self {
        Self {
            score: Self::FACTUAL_WEIGHT * factual_consistency + Self::FORMALITY_WEIGHT * formality,
            factual_consistency,
            formality,
        }
    }

    pub fn rounded(&self) -> Self {
        Self {
            score: round4(self.score),
            factual_consistency: round4(self.factual_consistency),
            formality: round4(self.formality),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogosResult {
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PathosResult {
    pub score: f64,
    /// Lower-cased emotion label → mean confidence across sentences.
    pub emotion_distribution: BTreeMap<String, f64>,
}

// ============ Analysis Results ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceAnalysis {
    pub sentence: String,
    pub ethos: EthosResult,
    pub logos: f64,
    pub pathos: f64,
}

impl SentenceAnalysis {
    pub fn rounded(&self) -> Self {
        Self {
            sentence: self.sentence.clone(),
            ethos: self.ethos.rounded(),
            logos: round4(self.logos),
            pathos: round4(self.pathos),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverallScores {
    pub ethos: EthosResult,
    pub logos: f64,
    pub pathos: f64,
}

/// Sentencewise analysis of a candidate text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub overall: OverallScores,
    pub sentencewise: Vec<SentenceAnalysis>,
}

/// Whole-text analysis without a per-sentence breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TextAnalysis {
    pub ethos: EthosResult,
    pub logos: f64,
    pub pathos: f64,
}

// ============ Request / Response ============

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub source_text: String,
    #[serde(default)]
    pub candidate_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub analysis: AnalysisResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ethos_composite_weights() {
        let ethos = EthosResult::new(0.9, 0.8).rounded();
        assert_eq!(ethos.score, 0.86);
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.123_456), 0.1235);
        assert_eq!(round4(0.5), 0.5);
    }

    #[test]
    fn test_pairing_mode_parse() {
        assert_eq!("full".parse::<PairingMode>().unwrap(), PairingMode::Full);
        assert_eq!("adjacent".parse::<PairingMode>().unwrap(), PairingMode::Adjacent);
        assert!(matches!(
            "triangle".parse::<PairingMode>(),
            Err(AnalysisError::InvalidMode { .. })
        ));
    }

    #[test]
    fn test_analyze_request_defaults_missing_fields() {
        let req: AnalyzeRequest = serde_json::from_str(r#"{"source_text": "A."}"#).unwrap();
        assert_eq!(req.source_text, "A.");
        assert_eq!(req.candidate_text, "");
    }

    #[test]
    fn test_label_score_accepts_confidence_alias() {
        let rec: LabelScore = serde_json::from_str(r#"{"label":"joy","confidence":0.7}"#).unwrap();
        assert_eq!(rec, LabelScore::new("joy", 0.7));
    }
}
