// Text Processing Service
// Normalization and rule-based splitting used by the segmenter fallback and the Logos path.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const SENTENCE_TERMINATORS: [char; 6] = ['。', '！', '？', '.', '!', '?'];
const QUOTE_CHARS: [char; 3] = ['"', '\u{201c}', '\u{201d}'];
const ABBREVIATIONS: [&str; 17] = [
    "e.g.", "i.e.", "etc.", "vs.", "mr.", "mrs.", "ms.", "dr.", "prof.", "fig.", "eq.", "no.",
    "inc.", "ltd.", "st.", "jr.", "sr.",
];
const SENTENCE_OPENERS: [&str; 22] = [
    "a", "an", "and", "but", "he", "her", "his", "i", "in", "it", "its", "on", "she", "so",
    "that", "the", "then", "there", "they", "this", "we", "you",
];

/// Minimum length (in chars) for a logic unit to be kept.
const LOGIC_UNIT_MIN_CHARS: usize = 3;

fn horizontal_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\x0C\x0B\u{3000}\u{00A0}]+").expect("valid regex"))
}

fn logic_boundary_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([.!?])\s+").expect("valid regex"))
}

/// Normalize punctuation and whitespace (smart quotes, line endings, runs of spaces).
pub fn normalize_punctuation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let s = text
        .replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace("\r\n", "\n")
        .replace('\r', "\n");

    let s = horizontal_ws_re().replace_all(&s, " ");

    s.lines()
        .map(|ln| ln.trim())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceOffset {
    pub text: String,
    /// UTF-8 byte offset into the input.
    pub start: usize,
    /// UTF-8 byte offset (end-exclusive).
    pub end: usize,
}

fn strip_open(token: &str) -> &str {
    token.trim_start_matches(['(', '"', '\u{201c}'])
}

fn ends_with_abbreviation(buffer: &str) -> bool {
    let last = strip_open(buffer.rsplit(char::is_whitespace).next().unwrap_or(""));
    let lower = last.to_lowercase();
    ABBREVIATIONS.iter().any(|abbr| lower == *abbr)
}

/// Single capital letter followed by a period, e.g. `J.`.
fn is_initial(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(c), Some('.'), None) if c.is_uppercase()
    )
}

fn starts_uppercase(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}

/// Whether the period ending `buffer` belongs to a name initial such as the
/// ones in "J. R. Smith" or "John F. Kennedy".
///
/// The initial must open the sentence or follow a capitalised word, and the
/// next word must be another initial or a capitalised word that is not a
/// common sentence opener. "vitamin C. It" and "Plan B. We" still split.
fn continues_after_initial(buffer: &str, rest: &str) -> bool {
    let mut tokens = buffer.split_whitespace().rev().map(strip_open);
    if !tokens.next().is_some_and(is_initial) {
        return false;
    }
    if !tokens.next().map(starts_uppercase).unwrap_or(true) {
        return false;
    }

    let next = match rest.split_whitespace().next().map(strip_open) {
        Some(next) => next,
        None => return false,
    };
    if is_initial(next) {
        return true;
    }
    let word = next
        .trim_end_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase();
    starts_uppercase(next) && !SENTENCE_OPENERS.contains(&word.as_str())
}

/// A quote only opens if another quote closes it before the end of the line.
fn has_closing_quote(rest: &[(usize, char)]) -> bool {
    rest.iter()
        .map(|(_, c)| *c)
        .take_while(|c| *c != '\n')
        .any(|c| QUOTE_CHARS.contains(&c))
}

/// Rule-based sentence splitting with byte offsets.
///
/// Splits after `. ! ? 。！？` but not inside double quotes, not inside tokens
/// such as `3.14` or `e.g.`, and not after known abbreviations or initials.
/// An unmatched quote on a line is treated as a plain character.
pub fn split_sentences_advanced(text: &str) -> Vec<SentenceOffset> {
    if text.trim().is_empty() {
        return vec![];
    }

    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut sentences = Vec::new();
    let mut current_start = 0usize;
    let mut in_quote = false;
    let mut i = 0usize;

    while i < chars.len() {
        let (byte_idx, ch) = chars[i];

        if QUOTE_CHARS.contains(&ch) {
            in_quote = !in_quote && has_closing_quote(&chars[i + 1..]);
        }

        if !SENTENCE_TERMINATORS.contains(&ch) || in_quote {
            i += 1;
            continue;
        }

        if ch == '.' {
            let next = chars.get(i + 1).map(|(_, c)| *c);
            if next.map(|c| c.is_alphanumeric()).unwrap_or(false) {
                i += 1;
                continue;
            }
            let buffer = &text[current_start..byte_idx + ch.len_utf8()];
            let rest = &text[byte_idx + ch.len_utf8()..];
            if ends_with_abbreviation(buffer) || continues_after_initial(buffer, rest) {
                i += 1;
                continue;
            }
        }

        // Swallow runs like "?!" or "...", a stray closing quote and the trailing whitespace.
        while i + 1 < chars.len() && SENTENCE_TERMINATORS.contains(&chars[i + 1].1) {
            i += 1;
        }
        while i + 1 < chars.len() && QUOTE_CHARS.contains(&chars[i + 1].1) {
            i += 1;
        }
        while i + 1 < chars.len() && chars[i + 1].1.is_whitespace() {
            i += 1;
        }

        let end = chars
            .get(i + 1)
            .map(|(b, _)| *b)
            .unwrap_or(text.len());
        push_trimmed(&mut sentences, text, current_start, end);
        current_start = end;
        i += 1;
    }

    if current_start < text.len() {
        push_trimmed(&mut sentences, text, current_start, text.len());
    }

    sentences
}

fn push_trimmed(out: &mut Vec<SentenceOffset>, text: &str, start: usize, end: usize) {
    let trimmed = text[start..end].trim();
    if trimmed.is_empty() {
        return;
    }
    out.push(SentenceOffset {
        text: trimmed.to_string(),
        start,
        end,
    });
}

/// Sentence texts only, in order.
pub fn split_sentences(text: &str) -> Vec<String> {
    split_sentences_advanced(text)
        .into_iter()
        .map(|s| s.text)
        .collect()
}

/// Split text into logic units for premise-pair generation.
///
/// Breaks after `.`, `!` or `?` followed by whitespace and drops fragments
/// shorter than three characters.
pub fn split_logic_units(text: &str) -> Vec<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return vec![];
    }

    let marked = logic_boundary_re().replace_all(trimmed, "$1\x00");
    marked
        .split('\x00')
        .map(|s| s.trim())
        .filter(|s| s.chars().count() >= LOGIC_UNIT_MIN_CHARS)
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_punctuation() {
        let input = "Hello\u{201c}World\u{201d}   again\r\n  next ";
        assert_eq!(normalize_punctuation(input), "Hello\"World\" again\nnext");
    }

    #[test]
    fn test_split_sentences_basic_order() {
        let sentences = split_sentences("The sky is blue. Grass is green! Is it? Yes.");
        assert_eq!(
            sentences,
            vec!["The sky is blue.", "Grass is green!", "Is it?", "Yes."]
        );
    }

    #[test]
    fn test_split_sentences_keeps_decimals_and_abbreviations() {
        let sentences = split_sentences("Dr. Smith paid 3.50 dollars, e.g. for tea. Then he left.");
        assert_eq!(
            sentences,
            vec!["Dr. Smith paid 3.50 dollars, e.g. for tea.", "Then he left."]
        );
    }

    #[test]
    fn test_split_sentences_apostrophes_do_not_open_quotes() {
        let sentences = split_sentences("I can't go. You don't care.");
        assert_eq!(sentences, vec!["I can't go.", "You don't care."]);
    }

    #[test]
    fn test_split_sentences_no_split_inside_quotes() {
        let sentences = split_sentences("He said \"Stop. Now.\" and walked away. Fine.");
        assert_eq!(sentences.len(), 2);
        assert_eq!(sentences[1], "Fine.");
    }

    #[test]
    fn test_split_sentences_unmatched_quote_does_not_block_splits() {
        let sentences = split_sentences("The screen is 6\" wide. It is bright. Buyers like it.");
        assert_eq!(
            sentences,
            vec!["The screen is 6\" wide.", "It is bright.", "Buyers like it."]
        );
    }

    #[test]
    fn test_split_sentences_quote_spanning_lines() {
        let sentences = split_sentences("He wrote \"one.\nTwo. Three.\"");
        assert_eq!(sentences, vec!["He wrote \"one.", "Two.", "Three.\""]);
    }

    #[test]
    fn test_split_sentences_single_letter_at_sentence_end() {
        let sentences = split_sentences("Take vitamin C. It helps. Plan B. We go.");
        assert_eq!(sentences, vec!["Take vitamin C.", "It helps.", "Plan B.", "We go."]);
    }

    #[test]
    fn test_split_sentences_keeps_name_initials() {
        let sentences = split_sentences("J. R. Smith arrived. He met John F. Kennedy. They left.");
        assert_eq!(
            sentences,
            vec!["J. R. Smith arrived.", "He met John F. Kennedy.", "They left."]
        );
    }

    #[test]
    fn test_split_sentences_offsets_cover_text() {
        let text = "First one. Second one.";
        let spans = split_sentences_advanced(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].start, 0);
        assert_eq!(spans[1].end, text.len());
        assert_eq!(&text[spans[1].start..spans[1].end], "Second one.");
    }

    #[test]
    fn test_split_sentences_trailing_fragment_and_empty() {
        assert!(split_sentences("   \n\t ").is_empty());
        assert_eq!(split_sentences("No terminator here"), vec!["No terminator here"]);
    }

    #[test]
    fn test_split_sentences_cjk() {
        let sentences = split_sentences("这是第一句。这是第二句！这是第三句？");
        assert_eq!(sentences.len(), 3);
    }

    #[test]
    fn test_split_logic_units_drops_short_fragments() {
        let units = split_logic_units("All men are mortal. Ok. A. Socrates is a man.");
        assert_eq!(units, vec!["All men are mortal.", "Ok.", "Socrates is a man."]);
    }

    #[test]
    fn test_split_logic_units_requires_whitespace_after_terminator() {
        let units = split_logic_units("Version 2.0 shipped.Then nothing.");
        assert_eq!(units, vec!["Version 2.0 shipped.Then nothing."]);
    }
}
