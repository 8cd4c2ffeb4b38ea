//! A concrete color NFA implementing [`RegexNfa`].
//!
//! Colors are stored as sorted, non-overlapping inclusive code point ranges.
//! States are plain indices; there are no epsilon arcs.

use super::{NfaArc, NfaState, RegexNfa};

const SURROGATES: (u32, u32) = (0xD800, 0xDFFF);

#[derive(Debug, Clone, PartialEq, Eq)]
enum ColorKind {
    Chars(Vec<(u32, u32)>),
    Bos,
    Eos,
}

/// An epsilon-free NFA over colors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledNfa {
    colors: Vec<ColorKind>,
    states: Vec<Vec<NfaArc>>,
    initial: NfaState,
    final_state: NfaState,
}

impl CompiledNfa {
    /// Number of NFA states.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Total number of arcs over all states.
    pub fn num_arcs(&self) -> usize {
        self.states.iter().map(Vec::len).sum()
    }
}

impl RegexNfa for CompiledNfa {
    fn num_colors(&self) -> usize {
        self.colors.len()
    }

    fn num_chars(&self, co: u32) -> Option<usize> {
        match self.colors.get(co as usize)? {
            ColorKind::Chars(ranges) => Some(ranges.iter().map(|&r| range_len(r)).sum()),
            ColorKind::Bos | ColorKind::Eos => None,
        }
    }

    fn color_chars(&self, co: u32) -> Vec<char> {
        match self.colors.get(co as usize) {
            Some(ColorKind::Chars(ranges)) => ranges
                .iter()
                .flat_map(|&(lo, hi)| (lo..=hi).filter_map(char::from_u32))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn initial_state(&self) -> NfaState {
        self.initial
    }

    fn final_state(&self) -> NfaState {
        self.final_state
    }

    fn out_arcs(&self, state: NfaState) -> &[NfaArc] {
        self.states.get(state).map_or(&[][..], Vec::as_slice)
    }

    fn is_bos(&self, co: u32) -> bool {
        matches!(self.colors.get(co as usize), Some(ColorKind::Bos))
    }

    fn is_eos(&self, co: u32) -> bool {
        matches!(self.colors.get(co as usize), Some(ColorKind::Eos))
    }
}

/// Number of valid `char`s in an inclusive code point range.
fn range_len((lo, hi): (u32, u32)) -> usize {
    let total = (hi - lo) as usize + 1;
    let overlap_lo = lo.max(SURROGATES.0);
    let overlap_hi = hi.min(SURROGATES.1);
    if overlap_lo <= overlap_hi {
        total - ((overlap_hi - overlap_lo) as usize + 1)
    } else {
        total
    }
}

/// Sort and merge overlapping or adjacent ranges.
fn normalize(mut ranges: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    ranges.sort_unstable();
    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(ranges.len());
    for (lo, hi) in ranges {
        match merged.last_mut() {
            Some(last) if lo <= last.1.saturating_add(1) => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }
    merged
}

/// Incremental construction of a [`CompiledNfa`].
#[derive(Debug, Default)]
pub struct NfaBuilder {
    colors: Vec<ColorKind>,
    states: Vec<Vec<NfaArc>>,
}

impl NfaBuilder {
    /// An empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a color holding exactly `chars`.
    pub fn add_color(&mut self, chars: &[char]) -> u32 {
        let ranges: Vec<(char, char)> = chars.iter().map(|&c| (c, c)).collect();
        self.add_color_ranges(&ranges)
    }

    /// Add a color holding the union of inclusive `ranges`.
    pub fn add_color_ranges(&mut self, ranges: &[(char, char)]) -> u32 {
        let ranges = ranges.iter().map(|&(lo, hi)| (lo as u32, hi as u32)).collect();
        self.push_color(ColorKind::Chars(normalize(ranges)))
    }

    pub(crate) fn add_color_code_points(&mut self, ranges: Vec<(u32, u32)>) -> u32 {
        self.push_color(ColorKind::Chars(normalize(ranges)))
    }

    /// Add the begin-of-string pseudo-color.
    pub fn add_bos(&mut self) -> u32 {
        self.push_color(ColorKind::Bos)
    }

    /// Add the end-of-string pseudo-color.
    pub fn add_eos(&mut self) -> u32 {
        self.push_color(ColorKind::Eos)
    }

    fn push_color(&mut self, kind: ColorKind) -> u32 {
        self.colors.push(kind);
        (self.colors.len() - 1) as u32
    }

    /// Number of colors added so far.
    pub fn num_colors(&self) -> usize {
        self.colors.len()
    }

    /// Add a state without arcs and return its number.
    pub fn add_state(&mut self) -> NfaState {
        self.states.push(Vec::new());
        self.states.len() - 1
    }

    /// Number of states added so far.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Add an arc reading color `co` from `from` to `to`.
    pub fn add_arc(&mut self, from: NfaState, co: u32, to: NfaState) {
        debug_assert!((co as usize) < self.colors.len());
        debug_assert!(to < self.states.len());
        self.states[from].push(NfaArc { co, to });
    }

    /// Finish the NFA. Arcs of each state are sorted and deduplicated.
    pub fn build(mut self, initial: NfaState, final_state: NfaState) -> CompiledNfa {
        for arcs in &mut self.states {
            arcs.sort_unstable();
            arcs.dedup();
        }
        CompiledNfa {
            colors: self.colors,
            states: self.states,
            initial,
            final_state,
        }
    }
}
