//! Trigram query construction from regex patterns.
//!
//! Compiles the pattern into a color NFA and turns it into a trigram filter.
//! Patterns that are too loose to be filtered become [`TrigramQuery::All`].

use crate::config::FilterConfig;
use crate::error::Result;
use crate::graph::{build_filter, TrigramFilter};
use crate::nfa::compile;
use crate::trigram::{DefaultCharHost, Trigram};

/// The trigram side of a regex search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrigramQuery {
    /// Candidates must satisfy the trigram graph.
    Graph(TrigramFilter),
    /// Pattern is too short or too loose, all documents are candidates.
    All,
}

impl TrigramQuery {
    /// Returns true if this query matches all documents (no filtering).
    pub fn is_all(&self) -> bool {
        matches!(self, TrigramQuery::All)
    }

    /// Trigrams whose posting lists the query needs. Empty for `All`.
    pub fn trigrams(&self) -> &[Trigram] {
        match self {
            TrigramQuery::Graph(filter) => filter.trigrams(),
            TrigramQuery::All => &[],
        }
    }

    /// Could a document with these (sorted) trigrams match?
    pub fn matches_trigrams(&mut self, doc_trigrams: &[Trigram]) -> bool {
        match self {
            TrigramQuery::Graph(filter) => filter.matches_trigrams(doc_trigrams),
            TrigramQuery::All => true,
        }
    }
}

/// Build a `TrigramQuery` from a regex pattern.
///
/// Invalid or oversized patterns are errors; a valid pattern without useful
/// trigrams is `TrigramQuery::All`.
pub fn build_trigram_query(pattern: &str, config: &FilterConfig) -> Result<TrigramQuery> {
    config.validate()?;
    let nfa = compile(pattern, config)?;
    let host = DefaultCharHost::new(config.case_insensitive);
    Ok(match build_filter(&nfa, &host, config)? {
        Some(filter) => TrigramQuery::Graph(filter),
        None => TrigramQuery::All,
    })
}
