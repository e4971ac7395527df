// Probability distributions over classifier labels and the NLI pair score.

use crate::models::{LabelScore, PairScore, ProbabilityDistribution};

pub const ENTAILMENT: &str = "ENTAILMENT";
pub const NEUTRAL: &str = "NEUTRAL";
pub const CONTRADICTION: &str = "CONTRADICTION";

/// Weight of the neutral probability in the support score.
const NEUTRAL_SUPPORT_WEIGHT: f64 = 0.5;

/// Turn raw classifier output into a label → probability map with upper-cased labels.
///
/// Values are taken as-is; no renormalisation. A repeated label keeps its last value.
pub fn label_probs(output: &[LabelScore]) -> ProbabilityDistribution {
    output
        .iter()
        .map(|r| (r.label.to_uppercase(), r.score))
        .collect()
}

/// Probability of `label`, `0.0` when the classifier did not emit it.
pub fn prob(dist: &ProbabilityDistribution, label: &str) -> f64 {
    dist.get(label).copied().unwrap_or(0.0)
}

/// Label with the highest probability. Ties go to the first label in map order.
pub fn dominant_label(dist: &ProbabilityDistribution) -> Option<String> {
    let mut best: Option<(&String, f64)> = None;
    for (label, &p) in dist {
        match best {
            Some((_, bp)) if p <= bp => {}
            _ => best = Some((label, p)),
        }
    }
    best.map(|(label, _)| label.clone())
}

/// Directional support of a premise/hypothesis distribution.
pub fn pair_score(dist: &ProbabilityDistribution) -> PairScore {
    let support = prob(dist, ENTAILMENT) + NEUTRAL_SUPPORT_WEIGHT * prob(dist, NEUTRAL);
    PairScore {
        support: support.clamp(0.0, 1.0),
        dominant_label: dominant_label(dist),
    }
}
