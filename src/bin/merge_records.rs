use anyhow::{Context, Result};
use clap::Parser;
use dossier::matching::{
    Deduplicator, NameNormalizer, Reconciler, DEFAULT_DEDUP_THRESHOLD, DEFAULT_MATCH_THRESHOLD,
};
use dossier::record::{self, RecordList};
use prettytable::{Cell, Row, Table};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[clap(
    name = "merge-records",
    about = "Merge multi-source business records into one deduplicated collection"
)]
struct Cli {
    /// JSON file with the primary record collection (array of objects)
    #[clap(short, long)]
    primary: Option<PathBuf>,

    /// JSON files with secondary collections, merged in the given order
    #[clap(short, long, num_args = 1..)]
    secondary: Vec<PathBuf>,

    /// Minimum similarity score for a secondary record to merge into an
    /// existing entry
    #[clap(long, default_value_t = DEFAULT_MATCH_THRESHOLD)]
    match_threshold: u8,

    /// Minimum similarity score for a record to count as a duplicate
    #[clap(long, default_value_t = DEFAULT_DEDUP_THRESHOLD)]
    dedup_threshold: u8,

    /// Known trailing locality/qualifier phrases to strip from names
    #[clap(long = "suffix")]
    suffixes: Vec<String>,

    /// Write the merged collection to this file instead of stdout
    #[clap(short, long)]
    output: Option<PathBuf>,

    /// Write a JSON merge report to this file
    #[clap(long)]
    report: Option<PathBuf>,

    /// Keep collector-internal tracking fields in the output
    #[clap(long)]
    keep_tracking: bool,
}

#[derive(Serialize)]
struct MergeReport {
    input_records: usize,
    merged_records: usize,
    unique_records: usize,
    match_threshold: u8,
    dedup_threshold: u8,
    sources: BTreeMap<String, usize>,
}

fn main() -> Result<()> {
    dossier::logging::configure_logging();

    let args = Cli::parse();

    // A bad primary file is fatal.
    let mut primary = match &args.primary {
        Some(path) => load_collection(path)
            .with_context(|| format!("failed to load primary collection {}", path.display()))?,
        None => RecordList::new(),
    };

    // A bad secondary source only warns; the merge continues with whatever
    // loaded.
    let mut secondaries: Vec<RecordList> = Vec::new();
    for path in &args.secondary {
        match load_collection(path) {
            Ok(records) => secondaries.push(records),
            Err(err) => warn!("Skipping secondary collection {}: {:#}", path.display(), err),
        }
    }

    let input_records = primary.len() + secondaries.iter().map(Vec::len).sum::<usize>();

    // The engine expects a primary collection even if empty; when it is,
    // promote the first non-empty secondary into the primary role.
    if primary.is_empty() {
        if let Some(index) = secondaries.iter().position(|records| !records.is_empty()) {
            primary = secondaries.remove(index);
        }
    }

    let normalizer = NameNormalizer::new().with_suffix_phrases(&args.suffixes);

    let merged = Reconciler::new()
        .with_match_threshold(args.match_threshold)
        .with_normalizer(normalizer.clone())
        .reconcile(&primary, &secondaries)?;
    let merged_records = merged.len();

    let mut unique = Deduplicator::new()
        .with_threshold(args.dedup_threshold)
        .with_normalizer(normalizer)
        .deduplicate(&merged)?;

    if !args.keep_tracking {
        record::strip_tracking_fields(&mut unique);
    }

    let sources = record::source_counts(&unique);

    info!(
        "Merged {} input records into {} entities ({} after dedup)",
        input_records,
        merged_records,
        unique.len()
    );

    print_summary(&unique, &sources, merged_records);

    let json = serde_json::to_string_pretty(&unique)?;
    match &args.output {
        Some(path) => {
            fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("Wrote {} records to {}", unique.len(), path.display());
        }
        None => println!("{}", json),
    }

    if let Some(path) = &args.report {
        let report = MergeReport {
            input_records,
            merged_records,
            unique_records: unique.len(),
            match_threshold: args.match_threshold,
            dedup_threshold: args.dedup_threshold,
            sources,
        };
        fs::write(path, serde_json::to_string_pretty(&report)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(())
}

fn load_collection(path: &Path) -> Result<RecordList> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let records: RecordList = serde_json::from_str(&data)
        .with_context(|| format!("{} is not a JSON array of records", path.display()))?;
    Ok(records)
}

fn print_summary(records: &RecordList, sources: &BTreeMap<String, usize>, merged_records: usize) {
    println!(
        "\n{} records after merge, {} after dedup\n",
        merged_records,
        records.len()
    );

    let mut source_table = Table::new();
    source_table.add_row(Row::new(vec![Cell::new("Data Source"), Cell::new("Records")]));
    for (source, count) in sources {
        source_table.add_row(Row::new(vec![
            Cell::new(source),
            Cell::new(&count.to_string()),
        ]));
    }
    source_table.printstd();

    let mut coverage_table = Table::new();
    coverage_table.add_row(Row::new(vec![Cell::new("Field"), Cell::new("Populated")]));
    for (field, count) in record::field_coverage(records) {
        coverage_table.add_row(Row::new(vec![
            Cell::new(&field),
            Cell::new(&format!("{}/{}", count, records.len())),
        ]));
    }
    coverage_table.printstd();
}
