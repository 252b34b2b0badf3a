//! Text normalization for synthesis input
//!
//! Deterministic longest-match substitution over a user-supplied dictionary
//! (abbreviations, emoji shorthand, domain jargon). Runs strictly before a
//! synthesis request is issued; a pure function of its input.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Substitution dictionary with longest-match-first semantics
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    /// Sorted by pattern length descending, then lexicographically, so the
    /// scan below is deterministic regardless of insertion order.
    entries: Vec<(String, String)>,
}

impl Lexicon {
    /// Build a lexicon from pattern/replacement pairs
    ///
    /// Empty patterns are dropped.
    pub fn new(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut entries: Vec<(String, String)> = pairs
            .into_iter()
            .filter(|(pattern, _)| !pattern.is_empty())
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { entries }
    }

    /// Load a lexicon from a JSON object file: `{"pattern": "replacement"}`
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let map: BTreeMap<String, String> = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid lexicon file {:?}: {}", path, e)))?;
        Ok(Self::new(map))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Apply the dictionary to a text
    ///
    /// Scans left to right; at each position the longest matching pattern
    /// wins and the scan resumes after it. Replacements are never rescanned.
    pub fn normalize(&self, text: &str) -> String {
        if self.entries.is_empty() {
            return text.to_string();
        }

        let mut result = String::with_capacity(text.len());
        let mut rest = text;

        'outer: while !rest.is_empty() {
            for (pattern, replacement) in &self.entries {
                if rest.starts_with(pattern.as_str()) {
                    result.push_str(replacement);
                    rest = &rest[pattern.len()..];
                    continue 'outer;
                }
            }

            let ch = rest.chars().next().expect("rest is non-empty");
            result.push(ch);
            rest = &rest[ch.len_utf8()..];
        }

        result
    }
}
