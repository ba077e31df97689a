use anyhow::{ensure, Result};
use tracing::{debug, info};

use crate::record::{display_name, fill_missing_fields, Record, RecordList};

use super::normalizer::NameNormalizer;
use super::similarity::token_sort_ratio;
use super::{DEFAULT_MATCH_THRESHOLD, TARGET_MATCH};

/// Merges secondary record collections into a primary collection by fuzzy
/// name match: secondary records either enrich their best-matching entry or
/// become new entities. Lossless: every input record survives, whole or
/// merged.
#[derive(Debug, Clone)]
pub struct Reconciler {
    normalizer: NameNormalizer,
    match_threshold: u8,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self {
            normalizer: NameNormalizer::new(),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_match_threshold(mut self, threshold: u8) -> Self {
        self.match_threshold = threshold;
        self
    }

    pub fn with_normalizer(mut self, normalizer: NameNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Reconciles secondary collections into the primary collection.
    ///
    /// The output starts as copies of `primary`, with each record's
    /// normalized name computed once and cached. Secondary collections are
    /// processed in order, records within each in order. A secondary record
    /// with no extractable name is appended as-is (nameless records never
    /// match anything). Otherwise it merges its missing fields into the
    /// best-scoring output entry at or above the match threshold, or is
    /// appended as a new entity whose name joins the cache, so records from
    /// later collections can match entities appended earlier. The inputs are
    /// never mutated; all work happens on copies.
    ///
    /// # Arguments
    /// * `primary` - The base collection, copied into the output unchanged
    /// * `secondaries` - Collections merged in, in the given order
    ///
    /// # Returns
    /// * `Ok(RecordList)` - The merged collection, never shorter than `primary`
    /// * `Err` - If the configured match threshold is not a valid score
    pub fn reconcile(&self, primary: &[Record], secondaries: &[RecordList]) -> Result<RecordList> {
        ensure!(
            self.match_threshold <= 100,
            "match threshold must be within 0-100, got {}",
            self.match_threshold
        );

        let mut merged: RecordList = primary.to_vec();
        let mut merged_names: Vec<String> = merged
            .iter()
            .map(|record| self.normalizer.normalize(&display_name(record)))
            .collect();

        for secondary in secondaries {
            for record in secondary {
                let name = self.normalizer.normalize(&display_name(record));
                if name.is_empty() {
                    // Nameless records always become new entities.
                    merged.push(record.clone());
                    merged_names.push(String::new());
                    continue;
                }

                match self.best_match(&name, &merged_names) {
                    Some((index, score)) => {
                        debug!(
                            target: TARGET_MATCH,
                            "Merging '{}' into '{}' (score {})", name, merged_names[index], score
                        );
                        fill_missing_fields(&mut merged[index], record);
                    }
                    None => {
                        debug!(
                            target: TARGET_MATCH,
                            "No match for '{}', keeping as new entity", name
                        );
                        merged.push(record.clone());
                        merged_names.push(name);
                    }
                }
            }
        }

        info!(
            target: TARGET_MATCH,
            "Reconciled {} primary + {} secondary records into {}",
            primary.len(),
            secondaries.iter().map(Vec::len).sum::<usize>(),
            merged.len()
        );

        Ok(merged)
    }

    // Scans the cached output names for the best-scoring candidate. Only a
    // strictly greater score replaces the current best, so ties resolve to
    // the earliest entry; a candidate scoring zero is never a match.
    fn best_match(&self, name: &str, candidates: &[String]) -> Option<(usize, u8)> {
        let mut best_score = 0u8;
        let mut best_index = None;

        for (index, candidate) in candidates.iter().enumerate() {
            if candidate.is_empty() {
                continue;
            }
            let score = token_sort_ratio(name, candidate);
            if score > best_score {
                best_score = score;
                best_index = Some(index);
            }
        }

        best_index
            .filter(|_| best_score >= self.match_threshold)
            .map(|index| (index, best_score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn record(value: Value) -> Record {
        value.as_object().expect("test record").clone()
    }

    #[test]
    fn test_matching_secondary_fills_missing_fields() {
        let primary = vec![record(json!({"Name": "Zen Spa", "Address": "1 Main St"}))];
        let secondaries = vec![vec![record(json!({"Name": "zen spa", "Rating": "4.6"}))]];

        let merged = Reconciler::new().reconcile(&primary, &secondaries).unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0]["Name"], json!("Zen Spa"));
        assert_eq!(merged[0]["Address"], json!("1 Main St"));
        assert_eq!(merged[0]["Rating"], json!("4.6"));
    }

    #[test]
    fn test_first_writer_wins() {
        let primary = vec![record(json!({"Name": "Zen Spa", "Rating": "4.2"}))];
        let secondaries = vec![vec![record(json!({"Name": "Zen Spa", "Rating": "4.5"}))]];

        let merged = Reconciler::new().reconcile(&primary, &secondaries).unwrap();
        assert_eq!(merged[0]["Rating"], json!("4.2"));

        let primary = vec![record(json!({"Name": "Zen Spa", "Rating": null}))];
        let secondaries = vec![vec![record(json!({"Name": "Zen Spa", "Rating": "4.5"}))]];

        let merged = Reconciler::new().reconcile(&primary, &secondaries).unwrap();
        assert_eq!(merged[0]["Rating"], json!("4.5"));
    }

    #[test]
    fn test_unmatched_secondary_becomes_new_entity() {
        let primary = vec![record(json!({"Name": "Zen Spa"}))];
        let secondaries = vec![vec![record(json!({"Name": "Oak Gym", "Rating": "4.1"}))]];

        let merged = Reconciler::new().reconcile(&primary, &secondaries).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0]["Name"], json!("Zen Spa"));
        assert_eq!(merged[1]["Name"], json!("Oak Gym"));
    }

    #[test]
    fn test_nameless_records_never_merge() {
        // Full field overlap but no name field: must survive as its own entity.
        let primary = vec![record(json!({"Name": "Zen Spa", "Address": "1 Main St"}))];
        let secondaries = vec![vec![record(json!({"Address": "1 Main St", "Rating": "4.6"}))]];

        let merged = Reconciler::new().reconcile(&primary, &secondaries).unwrap();

        assert_eq!(merged.len(), 2);
        assert!(!merged[0].contains_key("Rating"));
    }

    #[test]
    fn test_later_collections_match_appended_entities() {
        // The second secondary record matches an entity appended by the
        // first secondary collection, not anything from the primary.
        let primary = vec![];
        let secondaries = vec![
            vec![record(json!({"Name": "Oak Gym", "Address": "9 Elm St"}))],
            vec![record(json!({"Name": "oak gym", "Rating": "4.1"}))],
        ];

        let merged = Reconciler::new().reconcile(&primary, &secondaries).unwrap();

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0]["Address"], json!("9 Elm St"));
        assert_eq!(merged[0]["Rating"], json!("4.1"));
    }

    #[test]
    fn test_ties_resolve_to_earliest_entry() {
        let primary = vec![
            record(json!({"Name": "Zen Spa", "Branch": "first"})),
            record(json!({"Name": "Zen Spa", "Branch": "second"})),
        ];
        let secondaries = vec![vec![record(json!({"Name": "Zen Spa", "Rating": "4.6"}))]];

        let merged = Reconciler::new().reconcile(&primary, &secondaries).unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0]["Rating"], json!("4.6"));
        assert!(!merged[1].contains_key("Rating"));
    }

    #[test]
    fn test_lossless_union() {
        let primary = vec![record(json!({"Name": "Zen Spa"}))];
        let secondaries = vec![
            vec![
                record(json!({"Name": "Green Leaf"})),
                record(json!({"Address": "no name here"})),
            ],
            vec![record(json!({"Name": "Oak Gym"}))],
        ];

        let merged = Reconciler::new().reconcile(&primary, &secondaries).unwrap();

        // Nothing dropped: every unmatched input is its own output entity.
        assert_eq!(merged.len(), 4);
        assert!(merged.len() >= primary.len());
    }

    #[test]
    fn test_inputs_are_not_mutated() {
        let primary = vec![record(json!({"Name": "Zen Spa"}))];
        let secondaries = vec![vec![record(json!({"Name": "zen spa", "Rating": "4.6"}))]];
        let primary_before = primary.clone();
        let secondaries_before = secondaries.clone();

        let _ = Reconciler::new().reconcile(&primary, &secondaries).unwrap();

        assert_eq!(primary, primary_before);
        assert_eq!(secondaries, secondaries_before);
    }

    #[test]
    fn test_invalid_threshold_fails_fast() {
        let result = Reconciler::new()
            .with_match_threshold(101)
            .reconcile(&[], &[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_inputs() {
        let merged = Reconciler::new().reconcile(&[], &[]).unwrap();
        assert!(merged.is_empty());

        let merged = Reconciler::new()
            .reconcile(&[], &[vec![record(json!({"Name": "Zen Spa"}))]])
            .unwrap();
        assert_eq!(merged.len(), 1);
    }
}
