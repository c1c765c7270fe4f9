//! Word Transformer
//!
//! Turns a single word into a [BionicSpan]: a bold prefix and a plain remainder.
//! Lengths are counted in Unicode code points, but the split point is always moved
//! onto an extended grapheme cluster boundary so that a base letter is never
//! separated from its combining marks.
//!
//! The rules are applied in order:
//! 1. a word of at most one code point is left unchanged;
//! 2. a word found in the skip list (ignoring case) is left unchanged;
//! 3. a word no longer than `min_word_length` gets its first character bolded;
//! 4. any other word gets `ceil(len * bold_ratio)` characters bolded, at least one
//!    and never the whole word.

use unicode_segmentation::UnicodeSegmentation;

use crate::{config::BionicConfig, types::BionicSpan};

/// Transform one word into its bionic span
///
/// ## Parameters
/// - `word`: A word run, usually produced by [segment](crate::walker::segment)
/// - `config`: The conversion settings
///
/// ## Return
/// A span whose `bold` and `remainder` concatenate to `word` exactly.
pub fn transform(word: &str, config: &BionicConfig) -> BionicSpan {
    let length = word.chars().count();
    if length <= 1 || config.is_skip_word(word) {
        return BionicSpan::plain(word);
    }

    let bold_chars = if length <= config.min_word_length() {
        1
    } else {
        let wanted = (length as f64 * config.bold_ratio()).ceil() as usize;
        wanted.clamp(1, length - 1)
    };

    match grapheme_split_offset(word, bold_chars) {
        Some(offset) => BionicSpan::split(word, offset),
        None => BionicSpan::plain(word),
    }
}

/// Find the byte offset at which to split `word` after roughly `chars` code points
///
/// Prefers the first grapheme boundary at or after the requested point. If that
/// boundary is the end of the word, the last boundary before it is used instead.
/// Returns `None` when the word is a single grapheme cluster.
fn grapheme_split_offset(word: &str, chars: usize) -> Option<usize> {
    let target = word
        .char_indices()
        .nth(chars)
        .map(|(offset, _)| offset)
        .unwrap_or(word.len());

    let boundaries: Vec<usize> = word
        .grapheme_indices(true)
        .map(|(offset, _)| offset)
        .filter(|offset| *offset > 0)
        .collect();

    boundaries
        .iter()
        .find(|offset| **offset >= target)
        .or_else(|| boundaries.last())
        .copied()
}

#[cfg(test)]
mod tests {
    use crate::{
        config::{BionicConfig, ConfigBuilder},
        word::transform,
    };

    fn assert_span(word: &str, config: &BionicConfig, bold: &str, remainder: &str) {
        let span = transform(word, config);
        assert_eq!(span.bold, bold, "bold part of {:?}", word);
        assert_eq!(span.remainder, remainder, "remainder of {:?}", word);
    }

    #[test]
    fn test_single_character() {
        let config = BionicConfig::default();
        assert_span("a", &config, "", "a");
        assert_span("I", &config, "", "I");
        assert_span("", &config, "", "");
    }

    #[test]
    fn test_short_word_bolds_first_character() {
        let config = BionicConfig::default();
        assert_span("ab", &config, "a", "b");
        assert_span("cat", &config, "c", "at");
    }

    #[test]
    fn test_ratio_split() {
        let config = BionicConfig::default();
        // ceil(4 * 0.4) = 2
        assert_span("abcd", &config, "ab", "cd");
        // ceil(7 * 0.4) = 3
        assert_span("reading", &config, "rea", "ding");
        // ceil(10 * 0.4) = 4
        assert_span("everything", &config, "ever", "ything");
    }

    #[test]
    fn test_skip_words_case_insensitive() {
        let config = BionicConfig::default();
        assert_span("the", &config, "", "the");
        assert_span("The", &config, "", "The");
        assert_span("WITH", &config, "", "WITH");
    }

    #[test]
    fn test_never_fully_bold() {
        let config = ConfigBuilder::new()
            .min_word_length(1)
            .bold_ratio(1.0)
            .set_skip_words(Vec::<String>::new())
            .build()
            .unwrap();

        for word in ["ab", "abc", "abcdefgh", "σοφία"] {
            let span = transform(word, &config);
            assert!(!span.remainder.is_empty(), "{:?} fully bolded", word);
            assert!(!span.bold.is_empty());
        }
    }

    #[test]
    fn test_length_invariant() {
        let config = BionicConfig::default();
        let words = [
            "a", "on", "Bionic", "reading", "Überraschung", "naïve", "日本語", "e\u{301}te\u{301}",
            "Ωμέγα",
        ];

        for word in words {
            let span = transform(word, &config);
            assert_eq!(span.word(), word);
        }
    }

    #[test]
    fn test_monotonic_bold_length() {
        let config = BionicConfig::default();
        let mut previous = 0;
        for length in (config.min_word_length() + 1)..40 {
            let word = "x".repeat(length);
            let bold = transform(&word, &config).bold.chars().count();
            assert!(bold >= previous, "bold length shrank at {}", length);
            previous = bold;
        }
    }

    #[test]
    fn test_counts_code_points_not_bytes() {
        let config = BionicConfig::default();
        // 5 code points, 10 bytes: ceil(5 * 0.4) = 2
        assert_span(
            "\u{3a9}\u{3bc}\u{3ad}\u{3b3}\u{3b1}",
            &config,
            "\u{3a9}\u{3bc}",
            "\u{3ad}\u{3b3}\u{3b1}",
        );
    }

    #[test]
    fn test_combining_marks_stay_with_base_letter() {
        let config = BionicConfig::default();

        // "e" + U+0301 counts as two code points but forms one cluster
        let word = "e\u{301}cole";
        let span = transform(word, &config);
        assert_eq!(span.bold, "e\u{301}c");
        assert_eq!(span.remainder, "ole");

        // the only boundary inside "ab\u{301}" keeps the mark with "b"
        let word = "ab\u{301}";
        let span = transform(word, &config);
        assert_eq!(span.bold, "a");
        assert_eq!(span.remainder, "b\u{301}");
    }

    #[test]
    fn test_single_cluster_word_is_unchanged() {
        let config = BionicConfig::default();
        assert_span("e\u{301}", &config, "", "e\u{301}");
    }
}
