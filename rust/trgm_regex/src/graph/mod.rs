//! Regex NFA → trigram filter.
//!
//! The filter is built in three stages, leaves first:
//!
//! - **expand**: color-prefix expansion of the NFA (stage 2)
//! - **simplify**: penalty-driven removal of color trigrams (stage 3)
//! - **pack**: simple trigram expansion and graph packing (stage 4)
//!
//! and evaluated per candidate by [`PackedGraph::matches`].
//!
//! A filter is necessary, not sufficient: every string the regex matches
//! passes it, but candidates that pass still need a real regex check.

pub mod expand;
mod matcher;
pub mod pack;
pub mod simplify;


pub use pack::{PackedArc, PackedGraph, PackedState, FINAL_STATE, INITIAL_STATE};

use tracing::debug;

use crate::config::FilterConfig;
use crate::error::Result;
use crate::nfa::{ColorTable, RegexNfa};
use crate::trigram::{CharHost, Trigram};

/// Trigrams a matching string must contain, and how they combine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrigramFilter {
    trigrams: Vec<Trigram>,
    graph: PackedGraph,
}

impl TrigramFilter {
    /// The simple trigrams, grouped as in [`PackedGraph::color_trigram_groups`].
    pub fn trigrams(&self) -> &[Trigram] {
        &self.trigrams
    }

    /// The packed graph.
    pub fn graph(&self) -> &PackedGraph {
        &self.graph
    }

    /// Which of the filter's trigrams occur in `doc_trigrams`.
    ///
    /// `doc_trigrams` must be sorted, as returned by
    /// [`extract_trigrams`](crate::trigram::extract_trigrams).
    pub fn presence(&self, doc_trigrams: &[Trigram]) -> Vec<bool> {
        self.trigrams
            .iter()
            .map(|t| doc_trigrams.binary_search(t).is_ok())
            .collect()
    }

    /// Run the graph with `present` from [`presence`](Self::presence).
    pub fn matches(&mut self, present: &[bool]) -> bool {
        self.graph.matches(present)
    }

    /// Could a document with these (sorted) trigrams match the regex?
    pub fn matches_trigrams(&mut self, doc_trigrams: &[Trigram]) -> bool {
        let present = self.presence(doc_trigrams);
        self.graph.matches(&present)
    }
}

/// Build the trigram filter for `nfa`.
///
/// Returns `Ok(None)` when the regex is too loose for trigrams to help: it
/// can match without any predictable trigram, or the kept trigrams would
/// still exceed `max_trgm_count`.
pub fn build_filter<N: RegexNfa, H: CharHost>(
    nfa: &N,
    host: &H,
    config: &FilterConfig,
) -> Result<Option<TrigramFilter>> {
    config.validate()?;
    let colors = ColorTable::build(nfa, host, config.color_count_limit);

    let mut graph = expand::expand(nfa, &colors, config);
    debug!(
        states = graph.num_states(),
        arcs = graph.num_arcs(),
        overflowed = graph.overflowed(),
        "expanded regex graph"
    );
    if graph.initial_is_final() {
        debug!("initial state is final, no useful trigrams");
        return Ok(None);
    }

    let selection = simplify::select_color_trigrams(&mut graph, &colors, config.wish_trgm_penalty);
    debug!(
        color_trigrams = selection.infos.len(),
        kept = selection.num_expanded(),
        total_count = selection.total_count,
        total_penalty = selection.total_penalty,
        "selected color trigrams"
    );
    if selection.total_count > config.max_trgm_count {
        debug!(
            total_count = selection.total_count,
            limit = config.max_trgm_count,
            "too many trigrams, no useful filter"
        );
        return Ok(None);
    }

    let trigrams = pack::expand_color_trigrams(&selection, &colors);
    let graph = pack::pack_graph(&graph, &selection)?;
    debug!(
        states = graph.num_states(),
        arcs = graph.num_arcs(),
        trigrams = trigrams.len(),
        "packed trigram graph"
    );

    Ok(Some(TrigramFilter { trigrams, graph }))
}
