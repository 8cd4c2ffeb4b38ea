//! Read-only view of a compiled regex NFA, and the per-color facts the
//! graph builder derives from it.
//!
//! - **RegexNfa**: the reader contract any regex engine can implement
//! - **automaton**: a concrete NFA plus a builder for it
//! - **compiler**: compiles a pattern into that NFA with `regex_syntax`
//! - **ColorTable**: which colors can be expanded into characters

pub mod automaton;
pub mod compiler;

pub use automaton::{CompiledNfa, NfaBuilder};
pub use compiler::compile;

use crate::color::Color;
use crate::trigram::{CharHost, MbChar};

/// Index of an NFA state.
pub type NfaState = usize;

/// One out-arc of an NFA state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NfaArc {
    pub co: u32,
    pub to: NfaState,
}

/// What the graph builder needs to read from a compiled regex.
///
/// Colors are `0..num_colors()`. Begin/end-of-string pseudo-colors are
/// ordinary color numbers for which `is_bos` / `is_eos` answer true.
pub trait RegexNfa {
    fn num_colors(&self) -> usize;

    /// Number of member characters, or `None` if there are too many to list.
    fn num_chars(&self, co: u32) -> Option<usize>;

    /// Member characters of a color. Only called when `num_chars` is small.
    fn color_chars(&self, co: u32) -> Vec<char>;

    fn initial_state(&self) -> NfaState;

    fn final_state(&self) -> NfaState;

    fn out_arcs(&self, state: NfaState) -> &[NfaArc];

    fn is_bos(&self, co: u32) -> bool;

    fn is_eos(&self, co: u32) -> bool;
}

/// Attributes of one NFA color.
///
/// When `expandable` is false the color stands for unknown characters and
/// the other fields are meaningless.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorInfo {
    pub expandable: bool,
    /// The color contains non-word characters (never put into trigrams).
    pub contains_non_word: bool,
    /// Word characters of the color, deduplicated, in multibyte form.
    pub word_chars: Vec<MbChar>,
}

impl ColorInfo {
    fn unexpandable() -> Self {
        ColorInfo::default()
    }

    /// Number of distinct word characters.
    pub fn word_chars_count(&self) -> usize {
        self.word_chars.len()
    }

    /// True if at least one member can appear in a trigram.
    pub fn has_word_chars(&self) -> bool {
        !self.word_chars.is_empty()
    }
}

/// `ColorInfo` for every color of an NFA.
#[derive(Debug, Clone)]
pub struct ColorTable {
    infos: Vec<ColorInfo>,
}

impl ColorTable {
    /// Classify every color of `nfa`.
    ///
    /// Pseudo-colors and colors with more than `color_count_limit` members
    /// are not expandable. Neither is a color with a member that case
    /// folding maps outside the color: indexed text would hold a character
    /// the color does not list.
    pub fn build<N: RegexNfa, H: CharHost>(nfa: &N, host: &H, color_count_limit: usize) -> Self {
        let infos = (0..nfa.num_colors() as u32)
            .map(|co| {
                if nfa.is_bos(co) || nfa.is_eos(co) {
                    return ColorInfo::unexpandable();
                }
                match nfa.num_chars(co) {
                    Some(n) if n <= color_count_limit => {}
                    _ => return ColorInfo::unexpandable(),
                }

                let mut info = ColorInfo {
                    expandable: true,
                    ..ColorInfo::default()
                };
                let chars = nfa.color_chars(co);
                for &c in &chars {
                    match host.fold_char(c) {
                        Some(folded) if folded == c => {}
                        // Indexed under its folded form, a member as well.
                        Some(folded) if chars.contains(&folded) => continue,
                        _ => return ColorInfo::unexpandable(),
                    }
                    let Some(mb) = host.to_multibyte(c) else {
                        continue;
                    };
                    if host.is_word_char(&mb) {
                        if !info.word_chars.contains(&mb) {
                            info.word_chars.push(mb);
                        }
                    } else {
                        info.contains_non_word = true;
                    }
                }
                info
            })
            .collect();
        ColorTable { infos }
    }

    /// Number of colors, pseudo-colors included.
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// True if the NFA has no colors.
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Info for an NFA color. Sentinels have none.
    pub fn get(&self, co: Color) -> Option<&ColorInfo> {
        match co {
            Color::Nfa(n) => self.infos.get(n as usize),
            Color::Blank | Color::Unknown => None,
        }
    }

    /// Info for NFA color `co`. Panics if `co` is out of range.
    pub fn info(&self, co: u32) -> &ColorInfo {
        &self.infos[co as usize]
    }

    /// Number of simple trigram characters a color position stands for.
    /// A blank position always contributes exactly one.
    pub fn position_count(&self, co: Color) -> usize {
        match co {
            Color::Blank => 1,
            other => self.get(other).map_or(0, ColorInfo::word_chars_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigram::DefaultCharHost;

    fn sample_nfa() -> CompiledNfa {
        let mut b = NfaBuilder::new();
        let letters = b.add_color(&['a', 'b', 'a']);
        let mixed = b.add_color(&['x', '-', ' ', '\0']);
        let punct = b.add_color(&['.', ',']);
        let big = b.add_color_ranges(&[('\u{100}', '\u{1ff}')]);
        let upper = b.add_color(&['Q', 'q']);
        let bos = b.add_bos();
        let s0 = b.add_state();
        let s1 = b.add_state();
        for co in [letters, mixed, punct, big, upper, bos] {
            b.add_arc(s0, co, s1);
        }
        b.build(s0, s1)
    }

    #[test]
    fn test_color_table_classification() {
        let nfa = sample_nfa();
        let table = ColorTable::build(&nfa, &DefaultCharHost::default(), 256);
        assert_eq!(table.len(), 6);

        let letters = table.info(0);
        assert!(letters.expandable);
        assert!(!letters.contains_non_word);
        assert_eq!(letters.word_chars_count(), 2);

        let mixed = table.info(1);
        assert!(mixed.expandable);
        assert!(mixed.contains_non_word);
        assert_eq!(mixed.word_chars, vec![MbChar::from_char('x')]);

        let punct = table.info(2);
        assert!(punct.expandable);
        assert!(punct.contains_non_word);
        assert!(!punct.has_word_chars());

        // 256 members is the limit, this color has exactly 256.
        assert!(table.info(3).expandable);
        assert!(!table.info(5).expandable);
    }

    #[test]
    fn test_color_over_limit_is_unexpandable() {
        let nfa = sample_nfa();
        let table = ColorTable::build(&nfa, &DefaultCharHost::default(), 255);
        assert!(!table.info(3).expandable);
    }

    #[test]
    fn test_case_insensitive_drops_upper_case_members() {
        let nfa = sample_nfa();
        let table = ColorTable::build(&nfa, &DefaultCharHost::new(true), 256);
        assert_eq!(table.info(4).word_chars, vec![MbChar::from_char('q')]);
    }

    #[test]
    fn test_case_insensitive_fold_outside_color_is_unexpandable() {
        let mut b = NfaBuilder::new();
        // U+0130 folds to two characters.
        let dotted = b.add_color(&['\u{130}']);
        // Kelvin sign folds to 'k', which is a member.
        let kelvin = b.add_color(&['K', 'k', '\u{212A}']);
        // 'E' folds to 'e', which is not a member.
        let split = b.add_color(&['E', 'x']);
        let s0 = b.add_state();
        let s1 = b.add_state();
        for co in [dotted, kelvin, split] {
            b.add_arc(s0, co, s1);
        }
        let nfa = b.build(s0, s1);

        let table = ColorTable::build(&nfa, &DefaultCharHost::new(true), 256);
        assert!(!table.info(dotted).expandable);
        assert!(table.info(kelvin).expandable);
        assert_eq!(table.info(kelvin).word_chars, vec![MbChar::from_char('k')]);
        assert!(!table.info(split).expandable);

        let sensitive = ColorTable::build(&nfa, &DefaultCharHost::new(false), 256);
        assert!(sensitive.info(dotted).expandable);
        assert_eq!(sensitive.info(kelvin).word_chars_count(), 3);
        assert!(sensitive.info(split).expandable);
    }

    #[test]
    fn test_position_count() {
        let nfa = sample_nfa();
        let table = ColorTable::build(&nfa, &DefaultCharHost::default(), 256);
        assert_eq!(table.position_count(Color::Blank), 1);
        assert_eq!(table.position_count(Color::Nfa(0)), 2);
        assert_eq!(table.position_count(Color::Nfa(5)), 0);
    }
}
