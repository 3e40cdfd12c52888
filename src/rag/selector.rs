//! Candidate filtering against the search key

use tracing::debug;

use crate::models::RetrievedMatch;

/// Picks the reviews worth showing the model
#[derive(Debug, Clone, Copy)]
pub struct MatchSelector {
    fallback_limit: usize,
}

impl MatchSelector {
    pub const fn new(fallback_limit: usize) -> Self {
        Self { fallback_limit }
    }

    /// Keep matches whose professor name contains `search_key` (case-insensitive).
    ///
    /// When none do, fall back to the first `fallback_limit` matches in index
    /// order. Empty input stays empty.
    pub fn select(&self, matches: Vec<RetrievedMatch>, search_key: &str) -> Vec<RetrievedMatch> {
        if matches.is_empty() {
            debug!("No candidates to select from");
            return matches;
        }

        let needle = search_key.to_lowercase();
        let (exact, rest): (Vec<_>, Vec<_>) = matches
            .into_iter()
            .partition(|m| m.metadata.professor.to_lowercase().contains(&needle));

        if exact.is_empty() {
            debug!(
                fallback = self.fallback_limit.min(rest.len()),
                "No professor matched the search key, using top results"
            );
            return rest.into_iter().take(self.fallback_limit).collect();
        }

        debug!(matched = exact.len(), "Selected matching professors");
        exact
    }
}

impl Default for MatchSelector {
    fn default() -> Self {
        Self::new(3)
    }
}
