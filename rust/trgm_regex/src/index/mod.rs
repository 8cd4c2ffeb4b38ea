//! In-memory trigram index with regex search.
//!
//! Search runs in three steps: the posting lists of the filter's trigrams
//! narrow the documents down, the packed graph rejects those whose trigram
//! set cannot satisfy the regex, and the real regex checks what is left.

pub mod posting;

use ahash::AHashMap;
use regex::RegexBuilder;
use roaring::RoaringBitmap;
use tracing::debug;

use crate::config::FilterConfig;
use crate::error::{Result, TrgmError};
use crate::query::{build_trigram_query, TrigramQuery};
use crate::trigram::{extract_trigrams, DefaultCharHost, Trigram};

/// A stored document and its trigram set.
#[derive(Debug, Clone)]
struct DocEntry {
    text: String,
    /// Sorted; original and lower-cased trigrams together.
    trigrams: Vec<Trigram>,
}

/// Documents in insertion order, plus trigram → document postings.
#[derive(Debug, Default)]
pub struct TrigramIndex {
    docs: Vec<DocEntry>,
    posting_lists: AHashMap<Trigram, RoaringBitmap>,
}

impl TrigramIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document and return its id.
    ///
    /// Trigrams are extracted from the original text (for case-sensitive
    /// search) and from the lower-cased text (for case-insensitive search).
    pub fn add_document(&mut self, text: &str) -> Result<u32> {
        let count = self.document_count();
        if count == u32::MAX {
            return Err(TrgmError::IndexFull(count));
        }
        let doc_id = count;

        let mut trigrams = extract_trigrams(&DefaultCharHost::new(false), text);
        trigrams.extend(extract_trigrams(&DefaultCharHost::new(true), text));
        trigrams.sort_unstable();
        trigrams.dedup();

        for trigram in &trigrams {
            self.posting_lists
                .entry(*trigram)
                .or_insert_with(RoaringBitmap::new)
                .insert(doc_id);
        }
        self.docs.push(DocEntry {
            text: text.to_string(),
            trigrams,
        });
        Ok(doc_id)
    }

    /// Number of documents in the index.
    pub fn document_count(&self) -> u32 {
        // add_document refuses ids past u32::MAX
        self.docs.len() as u32
    }

    /// Number of unique trigrams in the index.
    pub fn trigram_count(&self) -> usize {
        self.posting_lists.len()
    }

    /// Text of a stored document.
    pub fn document(&self, doc_id: u32) -> Option<&str> {
        self.docs.get(doc_id as usize).map(|d| d.text.as_str())
    }

    /// Documents containing `trigram`, if any do.
    pub fn posting_list(&self, trigram: &Trigram) -> Option<&RoaringBitmap> {
        self.posting_lists.get(trigram)
    }

    /// Documents that may match `query`.
    ///
    /// Never drops a document the regex matches; may keep some it doesn't.
    pub fn candidates(&self, query: &mut TrigramQuery) -> RoaringBitmap {
        if query.is_all() {
            return posting::all_documents(self.document_count());
        }

        let touched = posting::union(
            query
                .trigrams()
                .iter()
                .filter_map(|t| self.posting_lists.get(t)),
        );
        let mut result = RoaringBitmap::new();
        for doc_id in &touched {
            if query.matches_trigrams(&self.docs[doc_id as usize].trigrams) {
                result.insert(doc_id);
            }
        }
        debug!(
            touched = touched.len(),
            candidates = result.len(),
            "trigram graph filtered postings"
        );
        result
    }

    /// Ids of the documents matching `pattern`, ascending.
    pub fn search(&self, pattern: &str, config: &FilterConfig) -> Result<Vec<u32>> {
        let mut query = build_trigram_query(pattern, config)?;
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(config.case_insensitive)
            .build()?;

        let candidates = self.candidates(&mut query);
        let hits: Vec<u32> = candidates
            .iter()
            .filter(|&doc_id| regex.is_match(&self.docs[doc_id as usize].text))
            .collect();
        debug!(
            pattern,
            all = query.is_all(),
            candidates = candidates.len(),
            hits = hits.len(),
            "regex search"
        );
        Ok(hits)
    }
}
