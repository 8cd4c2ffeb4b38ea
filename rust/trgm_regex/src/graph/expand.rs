//! Stage 2: expansion of the NFA into a graph whose arcs are labeled with
//! color trigrams.
//!
//! A state of the expanded graph is identified by a [`StateKey`]: an NFA
//! state plus the colors of the last two characters read. Besides its own
//! key, every state collects the *enter keys* reachable from it without
//! reading a predictable trigram. Arcs are generated from all of them.
//!
//! States are processed breadth first. Once the graph grows past the state
//! or arc limit, the states still queued are marked final without being
//! processed. The result is a weaker filter, never a wrong one.

use std::collections::VecDeque;

use ahash::AHashMap;
use tracing::trace;

use crate::color::{valid_arc_label, Color, ColorTrigram, Prefix};
use crate::config::FilterConfig;
use crate::nfa::{ColorTable, NfaState, RegexNfa};

/// The state is the initial one.
pub const STATE_INIT: u8 = 0x01;
/// The NFA's final state is reachable without reading a predictable trigram.
pub const STATE_FIN: u8 = 0x02;

/// Index of a state in [`ExpandedGraph::states`].
pub type StateId = usize;

/// Identity of an expanded-graph state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub prefix: Prefix,
    pub nstate: NfaState,
}

/// Arc of the expanded graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrgmArc {
    pub ctrgm: ColorTrigram,
    pub target: StateId,
}

/// State of the expanded graph.
#[derive(Debug, Clone)]
pub struct ExpState {
    pub key: StateKey,
    pub arcs: Vec<TrgmArc>,
    pub enter_keys: Vec<StateKey>,
    pub flags: u8,
    /// Union-find parent once the state has been merged into another.
    pub parent: Option<StateId>,
    /// Speculative merge bookkeeping, only set while a merge is evaluated.
    pub tent_parent: Option<StateId>,
    pub tent_flags: u8,
}

impl ExpState {
    fn new(key: StateKey) -> Self {
        ExpState {
            key,
            arcs: Vec::new(),
            enter_keys: Vec::new(),
            flags: 0,
            parent: None,
            tent_parent: None,
            tent_flags: 0,
        }
    }

    /// This is the initial state.
    pub fn is_init(&self) -> bool {
        self.flags & STATE_INIT != 0
    }

    /// The NFA's final state is reachable from here.
    pub fn is_final(&self) -> bool {
        self.flags & STATE_FIN != 0
    }
}

/// Output of stage 2. States are kept in creation order; state 0 is initial.
#[derive(Debug, Clone)]
pub struct ExpandedGraph {
    pub states: Vec<ExpState>,
    index: AHashMap<StateKey, StateId>,
    arcs_count: usize,
    overflowed: bool,
}

impl ExpandedGraph {
    fn new() -> Self {
        ExpandedGraph {
            states: Vec::new(),
            index: AHashMap::new(),
            arcs_count: 0,
            overflowed: false,
        }
    }

    /// Id of the initial state.
    pub const INITIAL: StateId = 0;

    /// Number of states, merged ones included.
    pub fn num_states(&self) -> usize {
        self.states.len()
    }

    /// Number of arcs added during expansion.
    pub fn num_arcs(&self) -> usize {
        self.arcs_count
    }

    /// True if a state or arc limit was hit during expansion.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// The regex can match without any predictable trigram.
    pub fn initial_is_final(&self) -> bool {
        self.states
            .get(Self::INITIAL)
            .map_or(false, ExpState::is_final)
    }

    /// The state created for `key`, if any.
    pub fn state_id(&self, key: &StateKey) -> Option<StateId> {
        self.index.get(key).copied()
    }

    /// Root of `id` under committed merges.
    pub fn find(&self, mut id: StateId) -> StateId {
        while let Some(parent) = self.states[id].parent {
            id = parent;
        }
        id
    }

    /// Make `from` (and its subtree) part of `into`. Both must be roots.
    pub fn merge_states(&mut self, into: StateId, from: StateId) {
        debug_assert_ne!(into, from);
        debug_assert!(self.states[into].parent.is_none());
        debug_assert!(self.states[from].parent.is_none());
        self.states[into].flags |= self.states[from].flags;
        self.states[from].parent = Some(into);
    }
}

/// Build the expanded graph for `nfa`.
pub fn expand<N: RegexNfa>(nfa: &N, colors: &ColorTable, config: &FilterConfig) -> ExpandedGraph {
    let mut expander = Expander {
        nfa,
        colors,
        graph: ExpandedGraph::new(),
        queue: VecDeque::new(),
        keys_queue: VecDeque::new(),
    };

    let init = expander.get_state(StateKey {
        prefix: Prefix::UNKNOWN,
        nstate: nfa.initial_state(),
    });
    expander.graph.states[init].flags |= STATE_INIT;

    while let Some(id) = expander.queue.pop_front() {
        if expander.graph.overflowed {
            expander.graph.states[id].flags |= STATE_FIN;
        } else {
            expander.process_state(id);
        }

        if expander.graph.arcs_count > config.max_expanded_arcs
            || expander.graph.states.len() > config.max_expanded_states
        {
            expander.graph.overflowed = true;
        }
    }

    expander.graph
}

struct Expander<'a, N> {
    nfa: &'a N,
    colors: &'a ColorTable,
    graph: ExpandedGraph,
    /// States waiting to be processed.
    queue: VecDeque<StateId>,
    /// Enter keys waiting to be added to the state being processed.
    keys_queue: VecDeque<StateKey>,
}

impl<'a, N: RegexNfa> Expander<'a, N> {
    fn process_state(&mut self, id: StateId) {
        self.keys_queue.clear();

        let key = self.graph.states[id].key;
        self.add_key(id, key);
        while !self.graph.states[id].is_final() {
            let Some(key) = self.keys_queue.pop_front() else {
                break;
            };
            self.add_key(id, key);
        }

        // A final state already matches, its out-arcs are of no interest.
        if !self.graph.states[id].is_final() {
            self.add_arcs(id);
        }
    }

    /// Add `key` to the enter keys of `id` and queue the keys it leads to
    /// without a predictable trigram.
    fn add_key(&mut self, id: StateId, key: StateKey) {
        let nfa = self.nfa;
        let state = &mut self.graph.states[id];

        let covered = state
            .enter_keys
            .iter()
            .any(|k| k.nstate == key.nstate && k.prefix.contains(&key.prefix));
        if covered {
            return;
        }
        state
            .enter_keys
            .retain(|k| !(k.nstate == key.nstate && key.prefix.contains(&k.prefix)));
        state.enter_keys.push(key);

        if key.nstate == nfa.final_state() {
            state.flags |= STATE_FIN;
            return;
        }

        for arc in nfa.out_arcs(key.nstate) {
            let derived = |prefix| StateKey {
                prefix,
                nstate: arc.to,
            };

            if nfa.is_bos(arc.co) {
                // Text start is padded like a word start.
                self.keys_queue.push_back(derived(Prefix::BLANK));
            } else if nfa.is_eos(arc.co) {
                // Reads nothing, but may lead to the final state.
                self.keys_queue.push_back(derived(Prefix::UNKNOWN));
            } else {
                let info = self.colors.info(arc.co);
                let co = Color::Nfa(arc.co);
                if !info.expandable {
                    self.keys_queue.push_back(derived(Prefix::UNKNOWN));
                    continue;
                }
                if info.contains_non_word && !valid_arc_label(&key.prefix, Color::Blank) {
                    self.keys_queue.push_back(derived(Prefix::BLANK));
                }
                if info.has_word_chars() && !valid_arc_label(&key.prefix, co) {
                    self.keys_queue
                        .push_back(derived(Prefix::new(key.prefix.c1, co)));
                }
            }
        }
    }

    /// Generate trigram arcs from every enter key of `id`.
    fn add_arcs(&mut self, id: StateId) {
        let nfa = self.nfa;
        for i in 0..self.graph.states[id].enter_keys.len() {
            let key = self.graph.states[id].enter_keys[i];
            for arc in nfa.out_arcs(key.nstate) {
                // Pseudo-colors are never expandable; add_key covered them.
                let info = self.colors.info(arc.co);
                if !info.expandable {
                    continue;
                }
                if info.contains_non_word {
                    let dest = StateKey {
                        prefix: Prefix::new(key.prefix.c1, Color::Blank),
                        nstate: arc.to,
                    };
                    self.add_arc(id, &key, Color::Blank, dest);
                }
                if info.has_word_chars() {
                    let co = Color::Nfa(arc.co);
                    let dest = StateKey {
                        prefix: Prefix::new(key.prefix.c1, co),
                        nstate: arc.to,
                    };
                    self.add_arc(id, &key, co, dest);
                }
            }
        }
    }

    fn add_arc(&mut self, id: StateId, key: &StateKey, co: Color, dest: StateKey) {
        if !valid_arc_label(&key.prefix, co) {
            return;
        }
        // Reachable without a trigram anyway.
        let bypassed = self.graph.states[id]
            .enter_keys
            .iter()
            .any(|k| k.nstate == dest.nstate && k.prefix.contains(&dest.prefix));
        if bypassed {
            return;
        }

        let target = self.get_state(dest);
        self.graph.states[id].arcs.push(TrgmArc {
            ctrgm: ColorTrigram::new(&key.prefix, co),
            target,
        });
        self.graph.arcs_count += 1;
    }

    /// Look up the state for `key`, creating and queueing it if new.
    fn get_state(&mut self, key: StateKey) -> StateId {
        if let Some(id) = self.graph.state_id(&key) {
            return id;
        }
        let id = self.graph.states.len();
        self.graph.states.push(ExpState::new(key));
        self.graph.index.insert(key, id);
        self.queue.push_back(id);
        trace!(
            state = id,
            c0 = %key.prefix.c0,
            c1 = %key.prefix.c1,
            nstate = key.nstate,
            "new expanded state"
        );
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nfa::{CompiledNfa, NfaBuilder};
    use crate::trigram::DefaultCharHost;

    fn chain(word: &str) -> CompiledNfa {
        let mut b = NfaBuilder::new();
        let colors: Vec<u32> = word.chars().map(|c| b.add_color(&[c])).collect();
        let mut state = b.add_state();
        let start = state;
        for co in colors {
            let next = b.add_state();
            b.add_arc(state, co, next);
            state = next;
        }
        b.build(start, state)
    }

    fn expand_default(nfa: &CompiledNfa) -> ExpandedGraph {
        let colors = ColorTable::build(nfa, &DefaultCharHost::default(), 256);
        expand(nfa, &colors, &FilterConfig::default())
    }

    #[test]
    fn test_expand_linear_chain() {
        let graph = expand_default(&chain("abcde"));
        // abc, bcd, cde
        assert_eq!(graph.num_arcs(), 3);
        assert_eq!(graph.num_states(), 4);
        assert!(!graph.overflowed());
        assert!(!graph.initial_is_final());
        assert!(graph.states[0].is_init());
        assert_eq!(graph.states[0].enter_keys.len(), 3);
        assert!(graph.states[3].is_final());

        let labels: Vec<ColorTrigram> = graph
            .states
            .iter()
            .flat_map(|s| s.arcs.iter().map(|a| a.ctrgm))
            .collect();
        assert_eq!(
            labels[0],
            ColorTrigram([Color::Nfa(0), Color::Nfa(1), Color::Nfa(2)])
        );
    }

    #[test]
    fn test_expand_short_word_is_final_at_start() {
        let graph = expand_default(&chain("ab"));
        assert!(graph.initial_is_final());
        assert_eq!(graph.num_arcs(), 0);
    }

    #[test]
    fn test_expand_unexpandable_color_gives_unknown_prefix() {
        let mut b = NfaBuilder::new();
        let any = b.add_color_ranges(&[('\u{0}', '\u{10ffff}')]);
        let x = b.add_color(&['x']);
        let s0 = b.add_state();
        let s1 = b.add_state();
        let s2 = b.add_state();
        b.add_arc(s0, any, s1);
        b.add_arc(s1, x, s2);
        let nfa = b.build(s0, s2);

        let graph = expand_default(&nfa);
        assert!(graph.initial_is_final());
        assert!(graph.states[0].enter_keys.contains(&StateKey {
            prefix: Prefix::UNKNOWN,
            nstate: s1,
        }));
    }

    #[test]
    fn test_expand_bos_gives_blank_prefix() {
        let mut b = NfaBuilder::new();
        let bos = b.add_bos();
        let colors: Vec<u32> = "ab".chars().map(|c| b.add_color(&[c])).collect();
        let s0 = b.add_state();
        let s1 = b.add_state();
        let s2 = b.add_state();
        let s3 = b.add_state();
        b.add_arc(s0, bos, s1);
        b.add_arc(s1, colors[0], s2);
        b.add_arc(s2, colors[1], s3);
        let nfa = b.build(s0, s3);

        let graph = expand_default(&nfa);
        let labels: Vec<ColorTrigram> = graph
            .states
            .iter()
            .flat_map(|s| s.arcs.iter().map(|a| a.ctrgm))
            .collect();
        // "  a" then " ab"
        assert_eq!(
            labels,
            vec![
                ColorTrigram([Color::Blank, Color::Blank, Color::Nfa(1)]),
                ColorTrigram([Color::Blank, Color::Nfa(1), Color::Nfa(2)]),
            ]
        );
    }

    #[test]
    fn test_expand_overflow_marks_queue_final() {
        let nfa = chain("abcdefghij");
        let colors = ColorTable::build(&nfa, &DefaultCharHost::default(), 256);
        let config = FilterConfig {
            max_expanded_states: 2,
            ..FilterConfig::default()
        };
        let graph = expand(&nfa, &colors, &config);
        assert!(graph.overflowed());
        assert_eq!(graph.num_states(), 3);
        assert_eq!(graph.num_arcs(), 2);
        assert!(graph.states[2].is_final());
        assert!(graph.states[2].arcs.is_empty());
    }

    #[test]
    fn test_enter_keys_never_cover_arc_targets() {
        let mut b = NfaBuilder::new();
        let a = b.add_color(&['a']);
        let sp = b.add_color(&[' ', 'b']);
        let s0 = b.add_state();
        let s1 = b.add_state();
        b.add_arc(s0, a, s0);
        b.add_arc(s0, sp, s0);
        b.add_arc(s0, a, s1);
        let nfa = b.build(s0, s1);

        let graph = expand_default(&nfa);
        for state in &graph.states {
            for arc in &state.arcs {
                let dest = graph.states[arc.target].key;
                assert_eq!(graph.state_id(&dest), Some(arc.target));
                assert!(!state
                    .enter_keys
                    .iter()
                    .any(|k| k.nstate == dest.nstate && k.prefix.contains(&dest.prefix)));
            }
        }
    }
}
