//! Runtime evaluation of a packed graph against one candidate.

use super::pack::{PackedGraph, FINAL_STATE, INITIAL_STATE};

impl PackedGraph {
    /// Can a string containing exactly the `present` simple trigrams match?
    ///
    /// `present` is indexed like the filter's trigram array; missing entries
    /// count as absent. Scratch buffers are reset on entry, so calls don't
    /// influence each other. No allocation happens here.
    pub fn matches(&mut self, present: &[bool]) -> bool {
        self.color_trigrams_active.fill(false);
        self.states_active.fill(false);

        // A color trigram is active if any of its simple trigrams is.
        let mut first = 0;
        for (active, &count) in self
            .color_trigrams_active
            .iter_mut()
            .zip(&self.color_trigram_groups)
        {
            *active = (first..first + count).any(|k| present.get(k).copied().unwrap_or(false));
            first += count;
        }

        self.states_active[INITIAL_STATE] = true;
        self.states_queue[0] = INITIAL_STATE;
        let mut queue_in = 0;
        let mut queue_out = 1;

        while queue_in < queue_out {
            let state = self.states[self.states_queue[queue_in]];
            queue_in += 1;

            for arc in &self.arcs[state.first_arc..state.first_arc + state.arcs_count] {
                if !self.color_trigrams_active[arc.color_trgm] {
                    continue;
                }
                if arc.target == FINAL_STATE {
                    return true;
                }
                if !self.states_active[arc.target] {
                    self.states_active[arc.target] = true;
                    self.states_queue[queue_out] = arc.target;
                    queue_out += 1;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::pack::{PackedArc, PackedState};

    /// 0 -t0-> 2 -t1-> 1, and 0 -t2-> 1. Groups [1, 2, 1].
    fn diamond() -> PackedGraph {
        PackedGraph::new(
            vec![1, 2, 1],
            vec![
                PackedState {
                    first_arc: 0,
                    arcs_count: 2,
                },
                PackedState {
                    first_arc: 2,
                    arcs_count: 0,
                },
                PackedState {
                    first_arc: 2,
                    arcs_count: 1,
                },
            ],
            vec![
                PackedArc {
                    target: 2,
                    color_trgm: 0,
                },
                PackedArc {
                    target: 1,
                    color_trgm: 2,
                },
                PackedArc {
                    target: 1,
                    color_trgm: 1,
                },
            ],
        )
    }

    #[test]
    fn test_matches_needs_a_path() {
        let mut g = diamond();
        assert!(!g.matches(&[false, false, false, false]));
        // t0 alone is not enough.
        assert!(!g.matches(&[true, false, false, false]));
        // t0 plus either member of t1's group.
        assert!(g.matches(&[true, false, true, false]));
        assert!(g.matches(&[true, true, false, false]));
        // t2 goes straight to the final state.
        assert!(g.matches(&[false, false, false, true]));
    }

    #[test]
    fn test_matches_short_present_reads_false() {
        let mut g = diamond();
        assert!(!g.matches(&[]));
        assert!(!g.matches(&[false, true, true]));
    }

    #[test]
    fn test_matches_is_repeatable() {
        let mut g = diamond();
        let yes = [false, false, false, true];
        let no = [true, false, false, false];
        assert!(g.matches(&yes));
        assert!(!g.matches(&no));
        assert!(g.matches(&yes));
        assert!(!g.matches(&no));
    }
}
