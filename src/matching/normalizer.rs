use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use super::TARGET_MATCH;

lazy_static! {
    // A dash- or comma-separated final token, e.g. the ", Hyderabad" in
    // "Zen Spa, Hyderabad".
    static ref TRAILING_QUALIFIER: Regex = Regex::new(r"\s*[-–,]\s*\w+$").unwrap();
}

/// Canonicalizes free-text business names into comparable keys.
///
/// Sources name the same business differently: abbreviations, punctuation,
/// casing, and trailing locality tokens. Normalization folds those away so
/// the similarity scorer compares what is left. The normalized form is
/// recomputed on demand and never stored on the record.
#[derive(Debug, Clone, Default)]
pub struct NameNormalizer {
    // Known trailing qualifier phrases, lower-cased at construction.
    // Checked before the generic trailing-token pattern.
    suffix_phrases: Vec<String>,
}

impl NameNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the domain's known trailing locality/qualifier phrases. The
    /// generic trailing-token pattern is tuned to city-name suffixes and can
    /// misfire on other domains; callers reusing the engine elsewhere supply
    /// their own phrases here.
    pub fn with_suffix_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.suffix_phrases = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        self
    }

    /// Normalizes a raw name for comparison: NFKD unicode normalization,
    /// lower-case, whitespace runs collapsed to one space, and at most one
    /// trailing locality qualifier removed. Total and deterministic; empty
    /// input normalizes to the empty string.
    pub fn normalize(&self, raw: &str) -> String {
        let folded = raw.nfkd().collect::<String>().to_lowercase();
        let collapsed = folded.split_whitespace().collect::<Vec<_>>().join(" ");

        let normalized = match self.strip_suffix_phrase(&collapsed) {
            Some(stripped) => stripped,
            None => TRAILING_QUALIFIER.replace(&collapsed, "").trim().to_string(),
        };

        if normalized != collapsed {
            debug!(
                target: TARGET_MATCH,
                "Normalized '{}' to '{}'", raw, normalized
            );
        }

        normalized
    }

    // Strips one configured suffix phrase, requiring a separator or
    // whitespace boundary before it and a non-empty remainder.
    fn strip_suffix_phrase(&self, name: &str) -> Option<String> {
        let is_separator = |c: char| c.is_whitespace() || matches!(c, '-' | '–' | ',');

        for phrase in &self.suffix_phrases {
            let Some(rest) = name.strip_suffix(phrase.as_str()) else {
                continue;
            };
            if !rest.chars().next_back().is_some_and(is_separator) {
                continue;
            }
            let rest = rest.trim_end_matches(is_separator);
            if !rest.is_empty() {
                return Some(rest.to_string());
            }
        }

        None
    }
}
