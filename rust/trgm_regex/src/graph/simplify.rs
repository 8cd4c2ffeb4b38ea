//! Stage 3: choose which color trigrams to keep.
//!
//! Each distinct color trigram expands to `count` simple trigrams and is
//! weighted by a penalty. While the summed penalty is above the wish limit,
//! the most expensive trigrams are dropped by merging the states their arcs
//! connect. A drop is refused if it would merge the initial state with a
//! final one, since the graph would then accept everything.

use tracing::trace;

use super::expand::{ExpandedGraph, StateId, STATE_FIN, STATE_INIT};
use crate::color::ColorTrigram;
use crate::nfa::ColorTable;

/// Everything known about one distinct color trigram.
#[derive(Debug, Clone)]
pub struct ColorTrgmInfo {
    pub ctrgm: ColorTrigram,
    /// Dense index among the expanded color trigrams, in label order.
    pub cnumber: Option<usize>,
    /// Number of simple trigrams it expands to.
    pub count: usize,
    pub penalty: f32,
    /// False once the trigram has been dropped.
    pub expanded: bool,
    /// `(source, target)` of every arc carrying this label.
    pub arcs: Vec<(StateId, StateId)>,
}

/// Result of stage 3, sorted by label.
#[derive(Debug, Clone)]
pub struct ColorTrigramSelection {
    pub infos: Vec<ColorTrgmInfo>,
    pub total_count: usize,
    pub total_penalty: f32,
}

impl ColorTrigramSelection {
    /// The kept color trigrams, in `cnumber` order.
    pub fn expanded(&self) -> impl Iterator<Item = &ColorTrgmInfo> {
        self.infos.iter().filter(|info| info.expanded)
    }

    /// Number of kept color trigrams.
    pub fn num_expanded(&self) -> usize {
        self.expanded().count()
    }

    /// The entry for `ctrgm`, if it labels any arc.
    pub fn lookup(&self, ctrgm: &ColorTrigram) -> Option<&ColorTrgmInfo> {
        self.infos
            .binary_search_by(|info| info.ctrgm.cmp(ctrgm))
            .ok()
            .map(|i| &self.infos[i])
    }
}

/// Collect, weigh and reduce the color trigrams of `graph`.
///
/// Dropping a trigram merges states in `graph`. The caller still has to
/// compare `total_count` against its own cap.
pub fn select_color_trigrams(
    graph: &mut ExpandedGraph,
    colors: &ColorTable,
    wish_penalty: f32,
) -> ColorTrigramSelection {
    let mut infos = collect(graph);

    let mut total_count = 0usize;
    let mut total_penalty = 0.0f32;
    for info in &mut infos {
        info.count = info
            .ctrgm
            .colors()
            .iter()
            .map(|&co| colors.position_count(co))
            .product();
        info.penalty = info.ctrgm.penalty_multiplier() * info.count as f32;
        total_count += info.count;
        total_penalty += info.penalty;
    }

    // Most expensive first. The sort is stable, equal penalties stay in
    // label order.
    infos.sort_by(|a, b| b.penalty.total_cmp(&a.penalty));

    for info in &mut infos {
        if total_penalty <= wish_penalty {
            break;
        }
        if !can_merge(graph, &info.arcs) {
            continue;
        }
        for &(source, target) in &info.arcs {
            let source = graph.find(source);
            let target = graph.find(target);
            if source != target {
                trace!(into = source, from = target, ctrgm = %info.ctrgm, "merging states");
                graph.merge_states(source, target);
                debug_assert!(
                    graph.states[source].flags & (STATE_INIT | STATE_FIN)
                        != (STATE_INIT | STATE_FIN)
                );
            }
        }
        info.expanded = false;
        total_count -= info.count;
        total_penalty -= info.penalty;
    }

    infos.sort_by(|a, b| a.ctrgm.cmp(&b.ctrgm));
    let mut cnumber = 0;
    for info in infos.iter_mut().filter(|info| info.expanded) {
        info.cnumber = Some(cnumber);
        cnumber += 1;
    }

    ColorTrigramSelection {
        infos,
        total_count,
        total_penalty,
    }
}

/// One entry per distinct label, holding every arc that carries it.
fn collect(graph: &ExpandedGraph) -> Vec<ColorTrgmInfo> {
    let mut all: Vec<ColorTrgmInfo> = graph
        .states
        .iter()
        .enumerate()
        .flat_map(|(source, state)| {
            state.arcs.iter().map(move |arc| ColorTrgmInfo {
                ctrgm: arc.ctrgm,
                cnumber: None,
                count: 0,
                penalty: 0.0,
                expanded: true,
                arcs: vec![(source, arc.target)],
            })
        })
        .collect();
    all.sort_by(|a, b| a.ctrgm.cmp(&b.ctrgm));

    let mut infos: Vec<ColorTrgmInfo> = Vec::with_capacity(all.len());
    for info in all {
        match infos.last_mut() {
            Some(last) if last.ctrgm == info.ctrgm => last.arcs.extend(info.arcs),
            _ => infos.push(info),
        }
    }
    infos
}

/// Would merging the endpoints of all `arcs` keep initial and final apart?
///
/// The merges are planned on the tentative fields and undone before
/// returning.
fn can_merge(graph: &mut ExpandedGraph, arcs: &[(StateId, StateId)]) -> bool {
    let mut touched: Vec<StateId> = Vec::new();
    let mut ok = true;

    for &(source, target) in arcs {
        let source = graph.find(source);
        let target = graph.find(target);
        let (source, source_flags) = tentative_root(graph, source);
        let (target, target_flags) = tentative_root(graph, target);

        if (source_flags | target_flags) & (STATE_INIT | STATE_FIN) == (STATE_INIT | STATE_FIN) {
            ok = false;
            break;
        }
        if source != target {
            graph.states[target].tent_parent = Some(source);
            graph.states[source].tent_flags |= target_flags;
            touched.push(source);
            touched.push(target);
        }
    }

    for id in touched {
        graph.states[id].tent_parent = None;
        graph.states[id].tent_flags = 0;
    }
    ok
}

/// Follow planned merges from a committed root, accumulating flags.
fn tentative_root(graph: &ExpandedGraph, mut id: StateId) -> (StateId, u8) {
    let mut flags = graph.states[id].flags | graph.states[id].tent_flags;
    while let Some(parent) = graph.states[id].tent_parent {
        id = parent;
        flags |= graph.states[id].flags | graph.states[id].tent_flags;
    }
    (id, flags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::config::FilterConfig;
    use crate::graph::expand::expand;
    use crate::nfa::{CompiledNfa, NfaBuilder};
    use crate::trigram::DefaultCharHost;

    fn chain(word: &str) -> CompiledNfa {
        let mut b = NfaBuilder::new();
        let colors: Vec<u32> = word.chars().map(|c| b.add_color(&[c])).collect();
        let start = b.add_state();
        let mut state = start;
        for co in colors {
            let next = b.add_state();
            b.add_arc(state, co, next);
            state = next;
        }
        b.build(start, state)
    }

    fn select(nfa: &CompiledNfa, wish: f32) -> (ExpandedGraph, ColorTrigramSelection) {
        let colors = ColorTable::build(nfa, &DefaultCharHost::default(), 256);
        let mut graph = expand(nfa, &colors, &FilterConfig::default());
        let selection = select_color_trigrams(&mut graph, &colors, wish);
        (graph, selection)
    }

    #[test]
    fn test_select_keeps_cheap_trigrams() {
        let (graph, selection) = select(&chain("abcdef"), 16.0);
        assert_eq!(selection.infos.len(), 4);
        assert_eq!(selection.num_expanded(), 4);
        assert_eq!(selection.total_count, 4);
        assert_eq!(selection.total_penalty, 4.0);
        assert!(graph.states.iter().all(|s| s.parent.is_none()));

        let cnumbers: Vec<Option<usize>> = selection.infos.iter().map(|i| i.cnumber).collect();
        assert_eq!(cnumbers, vec![Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn test_select_never_merges_initial_with_final() {
        let (graph, selection) = select(&chain("abcdefghij"), 0.0);
        // Only the last trigram survives: dropping it would join INIT and FIN.
        assert_eq!(selection.num_expanded(), 1);
        let kept = selection.expanded().next().unwrap();
        assert_eq!(
            kept.ctrgm,
            ColorTrigram([Color::Nfa(7), Color::Nfa(8), Color::Nfa(9)])
        );
        assert_eq!(kept.cnumber, Some(0));
        assert_eq!(selection.total_count, 1);

        for id in 0..graph.num_states() {
            let root = graph.find(id);
            let flags = graph.states[root].flags;
            assert_ne!(flags & (STATE_INIT | STATE_FIN), STATE_INIT | STATE_FIN);
        }
        assert!(graph.states.iter().all(|s| s.tent_parent.is_none() && s.tent_flags == 0));
    }

    #[test]
    fn test_count_is_product_of_word_chars() {
        let mut b = NfaBuilder::new();
        let a = b.add_color(&['a']);
        let digits = b.add_color_ranges(&[('0', '9')]);
        let s: Vec<_> = (0..4).map(|_| b.add_state()).collect();
        b.add_arc(s[0], a, s[1]);
        b.add_arc(s[1], digits, s[2]);
        b.add_arc(s[2], digits, s[3]);
        let nfa = b.build(s[0], s[3]);

        let (_, selection) = select(&nfa, 1000.0);
        assert_eq!(selection.infos.len(), 1);
        assert_eq!(selection.infos[0].count, 100);
        assert_eq!(selection.infos[0].penalty, 100.0);
    }

    #[test]
    fn test_lookup_finds_labels() {
        let (_, selection) = select(&chain("abcd"), 16.0);
        let abc = ColorTrigram([Color::Nfa(0), Color::Nfa(1), Color::Nfa(2)]);
        let missing = ColorTrigram([Color::Nfa(2), Color::Nfa(1), Color::Nfa(0)]);
        assert!(selection.lookup(&abc).is_some());
        assert!(selection.lookup(&missing).is_none());
    }
}
