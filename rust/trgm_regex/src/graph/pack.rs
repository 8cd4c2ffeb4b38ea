//! Stage 4: simple trigram expansion and graph packing.

use super::expand::{ExpandedGraph, STATE_FIN, STATE_INIT};
use super::simplify::ColorTrigramSelection;
use crate::color::Color;
use crate::error::{Result, TrgmError};
use crate::nfa::ColorTable;
use crate::trigram::{compact_trigram, MbChar, Trigram, MAX_MULTIBYTE_CHAR_LEN};

/// Packed state number of the initial state.
pub const INITIAL_STATE: usize = 0;
/// Packed state number shared by all final states.
pub const FINAL_STATE: usize = 1;

/// Arc of the packed graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PackedArc {
    pub target: usize,
    /// Index into the color trigram groups.
    pub color_trgm: usize,
}

/// A contiguous run of [`PackedArc`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedState {
    pub first_arc: usize,
    pub arcs_count: usize,
}

/// Runtime form of the trigram graph.
///
/// Also owns the matcher's scratch buffers, so one graph must not be
/// matched from several threads at once. Clone it instead.
#[derive(Debug, Clone)]
pub struct PackedGraph {
    pub(super) color_trigram_groups: Vec<usize>,
    pub(super) states: Vec<PackedState>,
    pub(super) arcs: Vec<PackedArc>,
    pub(super) color_trigrams_active: Vec<bool>,
    pub(super) states_active: Vec<bool>,
    pub(super) states_queue: Vec<usize>,
}

impl PartialEq for PackedGraph {
    fn eq(&self, other: &Self) -> bool {
        self.color_trigram_groups == other.color_trigram_groups
            && self.states == other.states
            && self.arcs == other.arcs
    }
}

impl Eq for PackedGraph {}

impl PackedGraph {
    pub(super) fn new(
        color_trigram_groups: Vec<usize>,
        states: Vec<PackedState>,
        arcs: Vec<PackedArc>,
    ) -> Self {
        let color_trigrams = color_trigram_groups.len();
        let num_states = states.len();
        PackedGraph {
            color_trigram_groups,
            states,
            arcs,
            color_trigrams_active: vec![false; color_trigrams],
            states_active: vec![false; num_states],
            states_queue: vec![0; num_states],
        }
    }

    /// Number of packed states, initial and final included.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Number of packed arcs.
    pub fn num_arcs(&self) -> usize {
        self.arcs.len()
    }

    /// Number of color trigrams the arcs are labelled with.
    pub fn num_color_trigrams(&self) -> usize {
        self.color_trigram_groups.len()
    }

    /// Number of simple trigrams per color trigram, in trigram array order.
    pub fn color_trigram_groups(&self) -> &[usize] {
        &self.color_trigram_groups
    }

    /// Total number of simple trigrams the graph refers to.
    pub fn num_trigrams(&self) -> usize {
        self.color_trigram_groups.iter().sum()
    }

    /// Outgoing arcs of `state`; empty for an unknown state.
    pub fn state_arcs(&self, state: usize) -> &[PackedArc] {
        match self.states.get(state) {
            Some(s) => &self.arcs[s.first_arc..s.first_arc + s.arcs_count],
            None => &[],
        }
    }
}

/// Expand every kept color trigram into its simple trigrams.
///
/// Groups are emitted in `cnumber` order. Within a group the order is the
/// nested product of the three positions' word characters; a blank position
/// contributes a single space.
pub fn expand_color_trigrams(
    selection: &ColorTrigramSelection,
    colors: &ColorTable,
) -> Vec<Trigram> {
    let blank = [MbChar::from_char(' ')];
    let mut trigrams = Vec::with_capacity(selection.total_count);
    let mut buf = Vec::with_capacity(3 * MAX_MULTIBYTE_CHAR_LEN);

    for info in selection.expanded() {
        let [c0, c1, c2] = *info.ctrgm.colors();
        let chars0 = position_chars(colors, &blank, c0);
        let chars1 = position_chars(colors, &blank, c1);
        let chars2 = position_chars(colors, &blank, c2);
        for a in chars0 {
            for b in chars1 {
                for c in chars2 {
                    buf.clear();
                    buf.extend_from_slice(a.as_bytes());
                    buf.extend_from_slice(b.as_bytes());
                    buf.extend_from_slice(c.as_bytes());
                    trigrams.push(compact_trigram(&buf));
                }
            }
        }
    }
    trigrams
}

fn position_chars<'a>(colors: &'a ColorTable, blank: &'a [MbChar], co: Color) -> &'a [MbChar] {
    match co {
        Color::Blank => blank,
        other => colors.get(other).map_or(&[][..], |info| info.word_chars.as_slice()),
    }
}

/// Renumber the merged states and lay out their arcs.
///
/// The initial root becomes state 0, every final root state 1. Self-loops,
/// arcs out of the final state and arcs into the initial state are dropped;
/// the matcher never needs them.
pub fn pack_graph(graph: &ExpandedGraph, selection: &ColorTrigramSelection) -> Result<PackedGraph> {
    let n = graph.num_states();

    let mut snumber = vec![usize::MAX; n];
    let mut next = 2;
    for id in 0..n {
        let root = graph.find(id);
        if snumber[root] != usize::MAX {
            continue;
        }
        let flags = graph.states[root].flags;
        snumber[root] = if flags & STATE_INIT != 0 {
            INITIAL_STATE
        } else if flags & STATE_FIN != 0 {
            FINAL_STATE
        } else {
            let number = next;
            next += 1;
            number
        };
    }

    let mut arcs: Vec<(usize, usize, usize)> = Vec::with_capacity(graph.num_arcs());
    for (id, state) in graph.states.iter().enumerate() {
        let source = snumber[graph.find(id)];
        for arc in &state.arcs {
            let target = snumber[graph.find(arc.target)];
            if source == target || source == FINAL_STATE || target == INITIAL_STATE {
                continue;
            }
            let cnumber = selection
                .lookup(&arc.ctrgm)
                .and_then(|info| info.cnumber)
                .ok_or_else(|| {
                    TrgmError::Internal(format!(
                        "arc labeled {} joins unmerged states but was dropped",
                        arc.ctrgm
                    ))
                })?;
            arcs.push((source, cnumber, target));
        }
    }
    arcs.sort_unstable();
    arcs.dedup();

    let mut states = Vec::with_capacity(next);
    let mut packed = Vec::with_capacity(arcs.len());
    let mut j = 0;
    for s in 0..next {
        let first_arc = j;
        while j < arcs.len() && arcs[j].0 == s {
            packed.push(PackedArc {
                target: arcs[j].2,
                color_trgm: arcs[j].1,
            });
            j += 1;
        }
        states.push(PackedState {
            first_arc,
            arcs_count: j - first_arc,
        });
    }

    let groups = selection.expanded().map(|info| info.count).collect();
    Ok(PackedGraph::new(groups, states, packed))
}
