//! Colors, color prefixes and color trigrams.
//!
//! An NFA color is a set of characters the regex treats identically. Two
//! sentinels extend the NFA's colors:
//!
//! - `Blank`: some non-word character (a word boundary).
//! - `Unknown`: we don't know what character was read.
//!
//! The derived ordering puts `Blank < Unknown < Nfa(_)`, i.e. the numeric
//! order of the classic encoding `BLANK = -2`, `UNKNOWN = -1`, colors `>= 0`.
//! Sorting color trigrams therefore gives the same lexicographic order as
//! sorting the integer triples.

use std::fmt;

/// A color of the expanded graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Blank,
    Unknown,
    Nfa(u32),
}

impl Color {
    /// A non-word character or string padding.
    pub fn is_blank(self) -> bool {
        self == Color::Blank
    }

    /// A color whose characters cannot be listed.
    pub fn is_unknown(self) -> bool {
        self == Color::Unknown
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Blank => write!(f, "BLANK"),
            Color::Unknown => write!(f, "UNKNOWN"),
            Color::Nfa(co) => write!(f, "{}", co),
        }
    }
}

/// The colors of the last two characters read before entering a state.
///
/// `(known, Unknown)` is never constructed. A prefix is fully ambiguous if
/// both colors are unknown, partially ambiguous if only the first is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Prefix {
    pub c0: Color,
    pub c1: Color,
}

impl Prefix {
    /// Nothing known about the preceding characters.
    pub const UNKNOWN: Prefix = Prefix {
        c0: Color::Unknown,
        c1: Color::Unknown,
    };

    /// Start of a word.
    pub const BLANK: Prefix = Prefix {
        c0: Color::Blank,
        c1: Color::Blank,
    };

    /// Prefix of `c0` followed by `c1`.
    pub fn new(c0: Color, c1: Color) -> Self {
        debug_assert!(
            !(c1.is_unknown() && !c0.is_unknown()),
            "prefix ({}, {}) is invalid",
            c0,
            c1
        );
        Prefix { c0, c1 }
    }

    /// The prefix reached after reading a character of color `co`.
    pub fn shift(self, co: Color) -> Prefix {
        Prefix::new(self.c1, co)
    }

    /// True if every exact prefix satisfying `other` also satisfies `self`.
    pub fn contains(&self, other: &Prefix) -> bool {
        if self.c1.is_unknown() {
            // Fully ambiguous prefix contains everything.
            true
        } else if self.c0.is_unknown() {
            self.c1 == other.c1
        } else {
            self == other
        }
    }
}

/// Can `prefix` followed by `co` label an arc of the expanded graph?
///
/// Bakes in the trigram extractor's padding: two blanks on the left, one
/// on the right.
pub fn valid_arc_label(prefix: &Prefix, co: Color) -> bool {
    // A full trigram must be known.
    if prefix.c0.is_unknown() {
        return false;
    }
    debug_assert!(!prefix.c1.is_unknown());
    debug_assert!(!co.is_unknown());

    // Three non-word characters are useless.
    if prefix.c0.is_blank() && prefix.c1.is_blank() && co.is_blank() {
        return false;
    }

    // nonblank-blank-anything never comes out of the extractor with a
    // single blank of right padding.
    if !prefix.c0.is_blank() && prefix.c1.is_blank() {
        return false;
    }

    true
}

/// Penalty multipliers indexed by [`ColorTrigram::blank_mask`].
///
/// Zero entries are patterns that [`valid_arc_label`] never produces.
pub const PENALTIES: [f32; 8] = [
    1.0,  // "aaa"
    3.5,  // "aa "
    0.0,  // "a a"
    0.0,  // "a  "
    4.2,  // " aa"
    2.1,  // " a "
    25.0, // "  a"
    0.0,  // "   "
];

/// Three consecutive colors that must appear in a matching string.
///
/// May contain `Blank`, never `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColorTrigram(pub [Color; 3]);

impl ColorTrigram {
    /// The trigram read when `co` follows `prefix`.
    pub fn new(prefix: &Prefix, co: Color) -> Self {
        debug_assert!(!prefix.c0.is_unknown() && !prefix.c1.is_unknown() && !co.is_unknown());
        ColorTrigram([prefix.c0, prefix.c1, co])
    }

    /// The three colors in reading order.
    pub fn colors(&self) -> &[Color; 3] {
        &self.0
    }

    /// Blank pattern: the first position is the high bit.
    pub fn blank_mask(&self) -> usize {
        self.0
            .iter()
            .fold(0, |mask, co| mask * 2 + usize::from(co.is_blank()))
    }

    /// Weight of this trigram's blank pattern in [`PENALTIES`].
    pub fn penalty_multiplier(&self) -> f32 {
        PENALTIES[self.blank_mask()]
    }
}

impl fmt::Display for ColorTrigram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0[0], self.0[1], self.0[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Color = Color::Nfa(0);
    const B: Color = Color::Nfa(1);

    #[test]
    fn test_color_order_matches_sentinel_numbering() {
        assert!(Color::Blank < Color::Unknown);
        assert!(Color::Unknown < Color::Nfa(0));
        assert!(Color::Nfa(0) < Color::Nfa(7));
    }

    #[test]
    fn test_prefix_contains_fully_ambiguous() {
        assert!(Prefix::UNKNOWN.contains(&Prefix::new(A, B)));
        assert!(Prefix::UNKNOWN.contains(&Prefix::BLANK));
        assert!(Prefix::UNKNOWN.contains(&Prefix::UNKNOWN));
    }

    #[test]
    fn test_prefix_contains_partially_ambiguous() {
        let p = Prefix::new(Color::Unknown, B);
        assert!(p.contains(&Prefix::new(A, B)));
        assert!(p.contains(&Prefix::new(Color::Blank, B)));
        assert!(!p.contains(&Prefix::new(B, A)));
        assert!(!p.contains(&Prefix::UNKNOWN));
    }

    #[test]
    fn test_prefix_contains_exact() {
        let p = Prefix::new(A, B);
        assert!(p.contains(&Prefix::new(A, B)));
        assert!(!p.contains(&Prefix::new(B, B)));
        assert!(!p.contains(&Prefix::new(Color::Unknown, B)));
    }

    #[test]
    fn test_valid_arc_label() {
        assert!(!valid_arc_label(&Prefix::UNKNOWN, A));
        assert!(!valid_arc_label(&Prefix::new(Color::Unknown, A), B));
        assert!(!valid_arc_label(&Prefix::BLANK, Color::Blank));
        assert!(!valid_arc_label(&Prefix::new(A, Color::Blank), B));
        assert!(!valid_arc_label(&Prefix::new(A, Color::Blank), Color::Blank));
        assert!(valid_arc_label(&Prefix::new(A, B), A));
        assert!(valid_arc_label(&Prefix::new(A, B), Color::Blank));
        assert!(valid_arc_label(&Prefix::BLANK, A));
        assert!(valid_arc_label(&Prefix::new(Color::Blank, A), B));
        assert!(valid_arc_label(&Prefix::new(Color::Blank, A), Color::Blank));
    }

    #[test]
    fn test_blank_mask_and_penalty() {
        assert_eq!(ColorTrigram([A, B, A]).blank_mask(), 0);
        assert_eq!(ColorTrigram([A, B, Color::Blank]).blank_mask(), 1);
        assert_eq!(ColorTrigram([Color::Blank, A, B]).blank_mask(), 4);
        assert_eq!(ColorTrigram([Color::Blank, A, Color::Blank]).blank_mask(), 5);
        assert_eq!(ColorTrigram([Color::Blank, Color::Blank, A]).blank_mask(), 6);
        assert_eq!(ColorTrigram([A, B, Color::Blank]).penalty_multiplier(), 3.5);
        assert_eq!(
            ColorTrigram([Color::Blank, Color::Blank, A]).penalty_multiplier(),
            25.0
        );
    }

    #[test]
    fn test_color_trigram_order_is_lexicographic() {
        let mut trgms = vec![
            ColorTrigram([A, B, B]),
            ColorTrigram([Color::Blank, Color::Blank, B]),
            ColorTrigram([A, A, Color::Blank]),
        ];
        trgms.sort();
        assert_eq!(trgms[0], ColorTrigram([Color::Blank, Color::Blank, B]));
        assert_eq!(trgms[1], ColorTrigram([A, A, Color::Blank]));
        assert_eq!(trgms[2], ColorTrigram([A, B, B]));
    }
}
