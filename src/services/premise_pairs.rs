// Premise-Pair Generator
// Syllogism-aware merging of logic units followed by ordered pairing.

use crate::models::{PairingMode, SentencePair};
use crate::services::text_processor::split_logic_units;
use regex::Regex;
use std::sync::OnceLock;

fn quantifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b(?:all|every|if)\b").expect("valid regex"))
}

fn conclusion_start_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(?:[A-Z][a-z]+|He|She|They|It)").expect("valid regex"))
}

fn conditional_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bif\b.*\bthen\b").expect("valid regex"))
}

/// How a unit left the merge scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeKind {
    /// Quantified premise fused with the following conclusion.
    Syllogism,
    /// Self-contained "if ... then ..." statement.
    Conditional,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicUnit {
    pub text: String,
    pub kind: MergeKind,
}

/// Left-to-right greedy scan that fuses a quantified premise with the
/// sentence right after it when that sentence opens with a capitalised word
/// or a pronoun. A merge consumes both sentences; a failed attempt moves on
/// to the next sentence without backtracking.
pub fn adaptive_merge_units<S: AsRef<str>>(sentences: &[S]) -> Vec<LogicUnit> {
    let mut merged = Vec::with_capacity(sentences.len());
    let mut i = 0usize;

    while i < sentences.len() {
        let s = sentences[i].as_ref();

        if i + 1 < sentences.len() {
            let next = sentences[i + 1].as_ref();
            if quantifier_re().is_match(s) && conclusion_start_re().is_match(next) {
                merged.push(LogicUnit {
                    text: format!("{} {}", s, next),
                    kind: MergeKind::Syllogism,
                });
                i += 2;
                continue;
            }
        }

        let kind = if conditional_re().is_match(s) {
            MergeKind::Conditional
        } else {
            MergeKind::Plain
        };
        merged.push(LogicUnit {
            text: s.to_string(),
            kind,
        });
        i += 1;
    }

    merged
}

pub fn adaptive_merge<S: AsRef<str>>(sentences: &[S]) -> Vec<String> {
    adaptive_merge_units(sentences)
        .into_iter()
        .map(|u| u.text)
        .collect()
}

/// Ordered (premise, hypothesis) pairs. Fewer than two sentences yields none.
pub fn generate_sentence_pairs<S: AsRef<str>>(sentences: &[S], mode: PairingMode) -> Vec<SentencePair> {
    let n = sentences.len();
    if n < 2 {
        return vec![];
    }

    match mode {
        PairingMode::Adjacent => sentences
            .windows(2)
            .map(|w| SentencePair::new(w[0].as_ref(), w[1].as_ref()))
            .collect(),
        PairingMode::Full => {
            let mut pairs = Vec::with_capacity(n * (n - 1) / 2);
            for i in 0..n {
                for j in (i + 1)..n {
                    pairs.push(SentencePair::new(sentences[i].as_ref(), sentences[j].as_ref()));
                }
            }
            pairs
        }
    }
}

/// Split, merge and pair a (possibly enriched) text.
pub fn premise_pairs_for_text(text: &str, mode: PairingMode) -> Vec<SentencePair> {
    let units = adaptive_merge(&split_logic_units(text));
    generate_sentence_pairs(&units, mode)
}
