//! `trgm_regex`: trigram index acceleration for regular expressions.
//!
//! Turns a regex NFA into a list of trigrams plus a small packed graph over
//! them. A document can only match the regex if the trigrams it contains
//! drive the graph from its initial to its final state, so the graph
//! prunes index candidates before the real regex runs.
//!
//! Modules:
//! - `color`: colors, prefixes and color trigrams
//! - `nfa`: the NFA contract, color table and a regex-syntax compiler
//! - `graph`: expansion, simplification, packing and the matcher
//! - `trigram`: simple trigrams, character conventions, text extraction
//! - `query`: pattern → trigram query
//! - `index`: in-memory roaring index with regex search
//! - `config`: construction limits
//! - `error`: error types

pub mod color;
pub mod config;
pub mod error;
pub mod graph;
pub mod index;
pub mod nfa;
pub mod query;
pub mod trigram;

pub use config::{parse_filter_config, FilterConfig};
pub use error::{Result, TrgmError};
pub use graph::{build_filter, PackedGraph, TrigramFilter};
pub use index::TrigramIndex;
pub use nfa::{compile, CompiledNfa, NfaBuilder, RegexNfa};
pub use query::{build_trigram_query, TrigramQuery};
pub use trigram::{extract_trigrams, CharHost, DefaultCharHost, Trigram};
