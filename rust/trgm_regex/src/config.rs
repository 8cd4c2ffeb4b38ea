//! Filter construction limits.
//!
//! Defaults reproduce the tuning constants of the algorithm exactly; a JSON
//! document can override any subset of them.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrgmError};

/// How many states the expanded graph may have.
pub const MAX_EXPANDED_STATES: usize = 128;
/// How many arcs the expanded graph may have.
pub const MAX_EXPANDED_ARCS: usize = 1024;
/// How many simple trigrams may be extracted.
pub const MAX_TRGM_COUNT: usize = 256;
/// Desired upper bound on the summed color trigram penalty.
pub const WISH_TRGM_PENALTY: f32 = 16.0;
/// Colors with more members than this are not expanded.
pub const COLOR_COUNT_LIMIT: usize = 256;

/// NFA compiler defaults.
pub const MAX_NFA_STATES: usize = 10_000;
/// Counted repetitions are unrolled up to this many copies.
pub const MAX_REPEAT: u32 = 16;

/// Limits applied while turning a regex into a trigram filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterConfig {
    pub max_expanded_states: usize,
    pub max_expanded_arcs: usize,
    pub max_trgm_count: usize,
    pub wish_trgm_penalty: f32,
    pub color_count_limit: usize,
    /// Compile the regex case-insensitively and index lower-cased text.
    pub case_insensitive: bool,
    pub max_nfa_states: usize,
    /// Counted repetitions are unrolled up to this many copies.
    pub max_repeat: u32,
}

impl Default for FilterConfig {
    fn default() -> Self {
        FilterConfig {
            max_expanded_states: MAX_EXPANDED_STATES,
            max_expanded_arcs: MAX_EXPANDED_ARCS,
            max_trgm_count: MAX_TRGM_COUNT,
            wish_trgm_penalty: WISH_TRGM_PENALTY,
            color_count_limit: COLOR_COUNT_LIMIT,
            case_insensitive: false,
            max_nfa_states: MAX_NFA_STATES,
            max_repeat: MAX_REPEAT,
        }
    }
}

impl FilterConfig {
    /// Set [`FilterConfig::case_insensitive`].
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    /// Reject limits that would make every build fail or loop on nothing.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("maxExpandedStates", self.max_expanded_states),
            ("maxExpandedArcs", self.max_expanded_arcs),
            ("maxTrgmCount", self.max_trgm_count),
            ("maxNfaStates", self.max_nfa_states),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(TrgmError::InvalidConfig(format!(
                    "{} must be positive",
                    name
                )));
            }
        }
        if !self.wish_trgm_penalty.is_finite() || self.wish_trgm_penalty < 0.0 {
            return Err(TrgmError::InvalidConfig(format!(
                "wishTrgmPenalty must be a non-negative number, got {}",
                self.wish_trgm_penalty
            )));
        }
        Ok(())
    }
}

/// Parse a filter config from a JSON string.
pub fn parse_filter_config(json: &str) -> Result<FilterConfig> {
    let config: FilterConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}
