use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One source's description of one business, as a schema-less field map.
///
/// Different sources populate different field sets for the same place, so
/// records are open maps rather than fixed structs. Field order is insertion
/// order and survives serialization.
pub type Record = Map<String, Value>;

/// An ordered collection of records. Order matters for tie-breaking and
/// first-seen semantics, not uniqueness.
pub type RecordList = Vec<Record>;

/// Field names that can carry a record's display name, in priority order.
pub const NAME_FIELDS: &[&str] = &[
    "Name",
    "name",
    "Business Name",
    "business_name",
    "Title",
    "title",
];

/// Collector-internal tracking fields, stripped before export.
pub const TRACKING_FIELDS: &[&str] = &["Data ID", "Place ID", "Thumbnail"];

/// Field labelling which collector produced a record.
pub const DATA_SOURCE_FIELD: &str = "Data Source";

/// Returns the record's display name: the first populated field from
/// [`NAME_FIELDS`]. Records with no populated name field yield an empty
/// string and are treated as unmatchable by the matching engines.
pub fn display_name(record: &Record) -> String {
    for field in NAME_FIELDS {
        match record.get(*field) {
            Some(Value::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
            Some(Value::Number(n)) => return n.to_string(),
            _ => {}
        }
    }
    String::new()
}

/// A value is blank if it is null or a whitespace-only string. Numbers and
/// booleans always count as populated.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Copies every non-blank field of `source` into `target`, but only where
/// `target` holds nothing yet (absent, null, or blank). Existing values are
/// never overwritten: the earliest source to supply a field wins.
pub fn fill_missing_fields(target: &mut Record, source: &Record) {
    for (field, value) in source {
        if is_blank(value) {
            continue;
        }
        if target.get(field).map_or(true, is_blank) {
            target.insert(field.clone(), value.clone());
        }
    }
}

/// Removes collector-internal tracking fields from every record.
pub fn strip_tracking_fields(records: &mut [Record]) {
    for record in records.iter_mut() {
        for field in TRACKING_FIELDS {
            record.remove(*field);
        }
    }
}

/// Counts records per [`DATA_SOURCE_FIELD`] label; records without one fall
/// under "Unknown".
pub fn source_counts(records: &[Record]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        let source = match record.get(DATA_SOURCE_FIELD) {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            _ => "Unknown".to_string(),
        };
        *counts.entry(source).or_insert(0) += 1;
    }
    counts
}

/// Counts how many records populate each field, in first-seen field order.
/// Fields that only ever appear blank are listed with a count of zero.
pub fn field_coverage(records: &[Record]) -> Vec<(String, usize)> {
    let mut coverage: Vec<(String, usize)> = Vec::new();
    for record in records {
        for (field, value) in record {
            let index = match coverage.iter().position(|(seen, _)| seen == field) {
                Some(index) => index,
                None => {
                    coverage.push((field.clone(), 0));
                    coverage.len() - 1
                }
            };
            if !is_blank(value) {
                coverage[index].1 += 1;
            }
        }
    }
    coverage
}
