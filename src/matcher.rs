//! Answer normalization and comparison.
//!
//! Answers are compared in hiragana: katakana is folded onto hiragana by the
//! fixed code point offset between the two blocks, the long-vowel mark is kept,
//! and everything else (kanji, latin letters, digits, punctuation, whitespace)
//! is dropped.

const KATAKANA_START: char = '\u{30A1}';
const KATAKANA_END: char = '\u{30F6}';
const HIRAGANA_START: char = '\u{3041}';
const HIRAGANA_END: char = '\u{3096}';
const KATAKANA_TO_HIRAGANA_OFFSET: u32 = 0x60;
const LONG_VOWEL_MARK: char = 'ー';

/// Reduce free-form text to the comparable hiragana alphabet.
pub fn normalize(input: &str) -> String {
    input.chars().filter_map(fold_char).collect()
}

/// Whether `given` matches the canonical `expected` answer.
///
/// An answer that normalizes to nothing never matches, not even itself.
pub fn matches(expected: &str, given: &str) -> bool {
    let expected = normalize(expected);
    !expected.is_empty() && expected == normalize(given)
}

/// Number of comparable characters in `answer` once normalized.
pub fn answer_length(answer: &str) -> usize {
    normalize(answer).chars().count()
}

fn fold_char(ch: char) -> Option<char> {
    match ch {
        KATAKANA_START..=KATAKANA_END => char::from_u32(ch as u32 - KATAKANA_TO_HIRAGANA_OFFSET),
        HIRAGANA_START..=HIRAGANA_END | LONG_VOWEL_MARK => Some(ch),
        _ => None,
    }
}
