use anyhow::{ensure, Result};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::record::{display_name, Record, RecordList};

use super::normalizer::NameNormalizer;
use super::similarity::token_sort_ratio;
use super::{DEFAULT_DEDUP_THRESHOLD, TARGET_MATCH};

/// Collapses near-identical records within one collection, keeping the
/// first occurrence verbatim. Unlike reconciliation this discards losers
/// outright and never merges fields, so its threshold is conventionally
/// stricter: deduplication decides irrecoverable loss, reconciliation only
/// decides enrichment.
#[derive(Debug, Clone)]
pub struct Deduplicator {
    normalizer: NameNormalizer,
    threshold: u8,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self {
            normalizer: NameNormalizer::new(),
            threshold: DEFAULT_DEDUP_THRESHOLD,
        }
    }
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_normalizer(mut self, normalizer: NameNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Removes fuzzy duplicates in a single pass, preserving input order.
    ///
    /// A record is discarded when its normalized name scores at or above the
    /// threshold against any previously accepted name. Records with no
    /// extractable name are always kept and never recorded as candidates.
    /// Idempotent: re-running on deduplicated output is a no-op. The input
    /// is never mutated.
    pub fn deduplicate(&self, records: &[Record]) -> Result<RecordList> {
        ensure!(
            self.threshold <= 100,
            "dedup threshold must be within 0-100, got {}",
            self.threshold
        );

        let mut kept = RecordList::new();
        let mut seen_names: Vec<String> = Vec::new();

        for record in records {
            let name = self.normalizer.normalize(&display_name(record));
            if name.is_empty() {
                kept.push(record.clone());
                continue;
            }

            let is_duplicate = match seen_names
                .iter()
                .find(|seen| token_sort_ratio(&name, seen) >= self.threshold)
            {
                Some(seen) => {
                    debug!(
                        target: TARGET_MATCH,
                        "Dropping '{}' as duplicate of '{}'", name, seen
                    );
                    true
                }
                None => false,
            };

            if !is_duplicate {
                kept.push(record.clone());
                seen_names.push(name);
            }
        }

        info!(
            target: TARGET_MATCH,
            "Deduplicated {} records down to {}",
            records.len(),
            kept.len()
        );

        Ok(kept)
    }
}

/// Removes exact duplicates by trimmed, lower-cased display name, keeping
/// the first occurrence. Collapses overlapping search batches before any
/// fuzzy work; records without a name are always kept.
pub fn deduplicate_exact(records: &[Record]) -> RecordList {
    let mut kept = RecordList::new();
    let mut seen = HashSet::new();

    for record in records {
        let key = display_name(record).to_lowercase();
        if key.is_empty() || seen.insert(key) {
            kept.push(record.clone());
        }
    }

    kept
}
