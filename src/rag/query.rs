//! Search-key extraction from raw user text

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use tracing::warn;

use crate::errors::ProfragError;
use crate::errors::Result;

lazy_static! {
    /// A title marker followed by a run of name-like words
    static ref TITLED_NAME: Regex =
        Regex::new(r"\b(?:Dr|Prof)\.\s[a-zA-Z'\-\s]+").expect("valid titled-name pattern");
}

/// Derives the search key used for both embedding and professor filtering
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryNormalizer;

impl QueryNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Extract a titled name ("Dr. Jane Smith") when present, else the trimmed text.
    ///
    /// Fails with [`ProfragError::EmptyQuery`] when nothing usable remains.
    pub fn normalize(&self, raw: &str) -> Result<String> {
        let key = match TITLED_NAME.find(raw) {
            Some(found) => trim_to_name(found.as_str()),
            None => raw.trim().to_string(),
        };

        if key.is_empty() {
            warn!("Rejecting query: processed query is empty");
            return Err(ProfragError::EmptyQuery);
        }

        debug!(search_key = %key, "Normalized query");
        Ok(key)
    }
}

/// Keep the title marker and the capitalized name words directly after it.
///
/// The name ends at the first word that does not start with an uppercase
/// letter. A match with no capitalized word after the marker is kept whole.
fn trim_to_name(matched: &str) -> String {
    let words: Vec<&str> = matched.split_whitespace().collect();
    let name_len = words
        .iter()
        .skip(1)
        .take_while(|word| word.starts_with(|c: char| c.is_ascii_uppercase()))
        .count();

    if name_len == 0 {
        return matched.trim().to_string();
    }
    words[..=name_len].join(" ")
}
