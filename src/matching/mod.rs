pub mod dedup;
pub mod normalizer;
pub mod reconcile;
pub mod similarity;

pub use dedup::{deduplicate_exact, Deduplicator};
pub use normalizer::NameNormalizer;
pub use reconcile::Reconciler;
pub use similarity::token_sort_ratio;

// Module-level constants
pub const TARGET_MATCH: &str = "matching";

/// Minimum similarity score for a secondary record to merge into an existing
/// entry rather than become a new one
pub const DEFAULT_MATCH_THRESHOLD: u8 = 70;

/// Minimum similarity score for a record to count as a duplicate of an
/// earlier one. Stricter than the merge threshold: deduplication discards,
/// merging only enriches.
pub const DEFAULT_DEDUP_THRESHOLD: u8 = 85;
