//! Trigram extraction from text.

use super::{compact_trigram, CharHost, MbChar, Trigram, LPADDING, MAX_MULTIBYTE_CHAR_LEN, RPADDING};

/// Extract the sorted, deduplicated trigrams of `text`.
///
/// The text is case-folded by the host and split into words (maximal runs
/// of word characters). Each word is padded with two blanks in front and one
/// behind, and every window of three characters becomes a trigram:
/// `"foo"` → `["  f", " fo", "foo", "oo "]`.
pub fn extract_trigrams<H: CharHost>(host: &H, text: &str) -> Vec<Trigram> {
    let folded = host.fold_case(text);

    let mut trigrams = Vec::new();
    let mut word: Vec<MbChar> = Vec::new();
    for c in folded.chars() {
        let mb = MbChar::from_char(c);
        if host.is_word_char(&mb) {
            word.push(mb);
        } else if !word.is_empty() {
            push_word_trigrams(&word, &mut trigrams);
            word.clear();
        }
    }
    if !word.is_empty() {
        push_word_trigrams(&word, &mut trigrams);
    }

    trigrams.sort_unstable();
    trigrams.dedup();
    trigrams
}

fn push_word_trigrams(word: &[MbChar], out: &mut Vec<Trigram>) {
    let blank = MbChar::from_char(' ');
    let mut padded = Vec::with_capacity(word.len() + LPADDING + RPADDING);
    padded.extend(std::iter::repeat(blank).take(LPADDING));
    padded.extend_from_slice(word);
    padded.extend(std::iter::repeat(blank).take(RPADDING));

    let mut buf = Vec::with_capacity(3 * MAX_MULTIBYTE_CHAR_LEN);
    for window in padded.windows(3) {
        buf.clear();
        for c in window {
            buf.extend_from_slice(c.as_bytes());
        }
        out.push(compact_trigram(&buf));
    }
}
