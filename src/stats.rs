//! Statistics pass over the matching-pipeline outputs: per-file record counts and sizes,
//! match rate, most common matched ROR IDs, failure reasons, and agreement between new
//! matches and ROR IDs already present in the source records.

use crate::counting::TopCounter;
use crate::datasets::{self, DatasetFile};
use crate::humanize::{format_count, format_percent, format_size};
use crate::json_utils::{error_label, str_field, str_field_or, u64_field_or};
use crate::pipeline::Publisher;
use crate::progress::record_progress;
use crate::records::RecordStream;
use crate::util::write_file_atomic;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub const TOP_ROR_IDS: usize = 20;
pub const TOP_ERRORS: usize = 10;
pub const TOP_PATTERNS: usize = 10;
pub const ERROR_LABEL_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct FileStats {
    #[serde(skip)]
    pub config_name: &'static str,
    pub filename: &'static str,
    pub records: u64,
    pub size_bytes: u64,
    pub size_human: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExistingAssignmentStats {
    pub total_records: u64,
    pub unique_affiliations: u64,
    pub overlap_with_new_matches: u64,
    pub agreement_count: u64,
    pub agreement_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisagreementPattern {
    pub existing_ror_id: String,
    pub existing_ror_name: String,
    pub matched_ror_id: String,
    pub matched_ror_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DisagreementStats {
    pub total_count: u64,
    #[serde(serialize_with = "pairs_as_map")]
    pub by_type: Vec<(String, u64)>,
    pub disagreement_rate: f64,
    pub top_patterns: Vec<DisagreementPattern>,
}

impl DisagreementStats {
    pub fn count_of(&self, kind: &str) -> u64 {
        self.by_type.iter().find(|(k, _)| k == kind).map(|(_, c)| *c).unwrap_or(0)
    }
}

/// Everything the card and the verifier need to know about the inputs.
/// Serializes to the `stats.json` layout.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetStats {
    #[serde(serialize_with = "files_as_map")]
    pub files: Vec<FileStats>,
    pub total_records: u64,
    pub total_size_bytes: u64,
    pub top_ror_ids: Vec<(String, u64)>,
    #[serde(serialize_with = "pairs_as_map")]
    pub error_distribution: Vec<(String, u64)>,
    pub match_rate: f64,
    pub existing_assignments: ExistingAssignmentStats,
    pub disagreements: DisagreementStats,
    pub total_size_human: String,
}

fn pairs_as_map<S: Serializer>(pairs: &[(String, u64)], s: S) -> Result<S::Ok, S::Error> {
    s.collect_map(pairs.iter().map(|(k, v)| (k, v)))
}

fn files_as_map<S: Serializer>(files: &[FileStats], s: S) -> Result<S::Ok, S::Error> {
    s.collect_map(files.iter().map(|f| (f.config_name, f)))
}

impl DatasetStats {
    pub fn file(&self, config_name: &str) -> Option<&FileStats> {
        self.files.iter().find(|f| f.config_name == config_name)
    }

    /// Expected record count for a dataset (0 when its file was missing).
    pub fn records_for(&self, config_name: &str) -> u64 {
        self.file(config_name).map(|f| f.records).unwrap_or(0)
    }

    /// Write `stats.json` (pretty-printed) into `dir`.
    pub fn write_json(&self, dir: &Path) -> Result<std::path::PathBuf> {
        let path = dir.join("stats.json");
        let body = serde_json::to_vec_pretty(self)?;
        write_file_atomic(&path, &body)?;
        Ok(path)
    }
}

/// Accumulates state from the records of one file.
pub trait Aggregator: Default {
    fn ingest(&mut self, record: &Value);
}

#[derive(Default)]
struct RorIdTally(TopCounter<String>);

impl Aggregator for RorIdTally {
    fn ingest(&mut self, record: &Value) {
        if let Some(id) = record.get("ror_id") {
            let key = id.as_str().map(str::to_string).unwrap_or_else(|| id.to_string());
            self.0.add(key);
        }
    }
}

#[derive(Default)]
struct ErrorTally(TopCounter<String>);

impl Aggregator for ErrorTally {
    fn ingest(&mut self, record: &Value) {
        self.0.add(error_label(record, ERROR_LABEL_MAX_CHARS));
    }
}

/// Distinct affiliation hashes with an existing assignment. A record without a hash
/// contributes the `None` key, so it counts as one distinct value.
#[derive(Default)]
struct ExistingTally {
    hashes: HashSet<Option<String>>,
    total_records: u64,
}

impl Aggregator for ExistingTally {
    fn ingest(&mut self, record: &Value) {
        self.hashes.insert(str_field(record, "affiliation_hash").map(str::to_string));
        self.total_records += u64_field_or(record, "count", 1);
    }
}

type PatternKey = (String, String, String, String);

#[derive(Default)]
struct DisagreementTally {
    by_type: TopCounter<String>,
    patterns: TopCounter<PatternKey>,
}

impl Aggregator for DisagreementTally {
    fn ingest(&mut self, record: &Value) {
        let kind = str_field_or(record, "type", "unknown");
        self.by_type.add(kind.to_string());
        if kind == "match" {
            self.patterns.add((
                str_field_or(record, "existing_ror_id", "unknown").to_string(),
                str_field_or(record, "existing_ror_name", "").to_string(),
                str_field_or(record, "matched_ror_id", "unknown").to_string(),
                str_field_or(record, "matched_ror_name", "").to_string(),
            ));
        }
    }
}

impl Publisher {
    /// Collect statistics over every known input file (regardless of dataset selection).
    pub fn collect_stats(&self) -> Result<DatasetStats> {
        let input_dir = &self.opts.input_dir;
        tracing::info!("Collecting statistics from {}", input_dir.display());

        let mut stats = DatasetStats::default();
        let buf = self.opts.read_buffer_bytes;

        let counted: Vec<Result<Option<FileStats>>> = datasets::all()
            .par_iter()
            .map(|d| file_stats(input_dir, d, buf))
            .collect();
        for (d, res) in datasets::all().iter().zip(counted) {
            match res? {
                Some(fs) => {
                    tracing::info!("  {}: {} records ({})", d.filename, format_count(fs.records), fs.size_human);
                    stats.total_records += fs.records;
                    stats.total_size_bytes += fs.size_bytes;
                    stats.files.push(fs);
                }
                None => tracing::warn!("  {} not found, skipping", d.filename),
            }
        }

        let matched = stats.file(datasets::ROR_MATCHES).map(|f| f.records);
        let unique = stats.file(datasets::UNIQUE_AFFILIATIONS).map(|f| f.records);
        if let (Some(matched), Some(unique)) = (matched, unique) {
            if unique > 0 {
                stats.match_rate = matched as f64 / unique as f64;
                tracing::info!(
                    "Match rate: {} / {} = {}",
                    format_count(matched),
                    format_count(unique),
                    format_percent(stats.match_rate)
                );
            }
        }

        let existing_hashes = self.collect_existing_assignment_stats(&mut stats)?;
        self.collect_match_stats(&mut stats, existing_hashes.as_ref())?;
        self.collect_error_stats(&mut stats)?;
        stats.total_size_human = format_size(stats.total_size_bytes);
        self.collect_disagreement_stats(&mut stats)?;

        let overlap = stats.existing_assignments.overlap_with_new_matches;
        if overlap > 0 {
            let agreement = overlap.saturating_sub(stats.disagreements.total_count);
            stats.existing_assignments.agreement_count = agreement;
            stats.existing_assignments.agreement_rate = agreement as f64 / overlap as f64;
            tracing::info!(
                "Agreement rate: {} / {} = {}",
                format_count(agreement),
                format_count(overlap),
                format_percent(stats.existing_assignments.agreement_rate)
            );
        }

        Ok(stats)
    }

    fn aggregate_dataset<A: Aggregator>(
        &self,
        stats: &DatasetStats,
        config_name: &str,
        label: &str,
        mut also: impl FnMut(&Value),
    ) -> Result<Option<A>> {
        let Some(dataset) = datasets::by_config_name(config_name) else { return Ok(None) };
        let path = self.opts.input_dir.join(dataset.filename);
        if !path.exists() {
            return Ok(None);
        }

        let pb = record_progress(self.opts.progress, stats.records_for(config_name), label);
        let mut agg = A::default();
        for rec in RecordStream::open(&path, dataset, self.opts.read_buffer_bytes)? {
            let rec = rec?;
            agg.ingest(&rec);
            also(&rec);
            if let Some(pb) = &pb { pb.inc(1); }
        }
        if let Some(pb) = pb { pb.finish_and_clear(); }
        Ok(Some(agg))
    }

    fn collect_existing_assignment_stats(&self, stats: &mut DatasetStats) -> Result<Option<HashSet<Option<String>>>> {
        let tally = self.aggregate_dataset::<ExistingTally>(
            stats,
            datasets::EXISTING_AGGREGATED,
            "Scanning aggregated assignments",
            |_| {},
        )?;
        let Some(tally) = tally else {
            tracing::info!("existing_assignments_aggregated.jsonl not found, skipping existing assignment stats");
            return Ok(None);
        };

        stats.existing_assignments.unique_affiliations = tally.hashes.len() as u64;
        stats.existing_assignments.total_records = tally.total_records;
        tracing::info!(
            "Unique affiliations with existing assignments: {}",
            format_count(tally.hashes.len() as u64)
        );
        tracing::info!("Total existing assignment records: {}", format_count(tally.total_records));
        Ok(Some(tally.hashes))
    }

    /// One pass over `ror_matches.jsonl`: top ROR IDs and overlap with existing assignments.
    fn collect_match_stats(
        &self,
        stats: &mut DatasetStats,
        existing_hashes: Option<&HashSet<Option<String>>>,
    ) -> Result<()> {
        let mut overlap = 0u64;
        let tally = self.aggregate_dataset::<RorIdTally>(stats, datasets::ROR_MATCHES, "Scanning matches", |rec| {
            if let Some(hashes) = existing_hashes {
                let key = str_field(rec, "affiliation_hash").map(str::to_string);
                if hashes.contains(&key) {
                    overlap += 1;
                }
            }
        })?;
        let Some(tally) = tally else { return Ok(()) };

        stats.top_ror_ids = tally.0.most_common(TOP_ROR_IDS);
        tracing::info!("Found {} unique ROR IDs", format_count(tally.0.len() as u64));
        if existing_hashes.is_some() {
            stats.existing_assignments.overlap_with_new_matches = overlap;
            tracing::info!("Overlap with new matches: {}", format_count(overlap));
        }
        Ok(())
    }

    fn collect_error_stats(&self, stats: &mut DatasetStats) -> Result<()> {
        let tally = self.aggregate_dataset::<ErrorTally>(
            stats,
            datasets::ROR_MATCHES_FAILED,
            "Scanning errors",
            |_| {},
        )?;
        if let Some(tally) = tally {
            stats.error_distribution = tally.0.most_common(TOP_ERRORS);
        }
        Ok(())
    }

    fn collect_disagreement_stats(&self, stats: &mut DatasetStats) -> Result<()> {
        let tally = self.aggregate_dataset::<DisagreementTally>(
            stats,
            datasets::DISAGREEMENTS,
            "Scanning disagreements",
            |_| {},
        )?;
        let Some(tally) = tally else {
            tracing::info!("disagreements.jsonl not found, skipping disagreement stats");
            return Ok(());
        };

        let d = &mut stats.disagreements;
        d.total_count = tally.by_type.total();
        d.by_type = tally.by_type.in_insertion_order();
        d.top_patterns = tally
            .patterns
            .most_common(TOP_PATTERNS)
            .into_iter()
            .map(|((existing_ror_id, existing_ror_name, matched_ror_id, matched_ror_name), count)| {
                DisagreementPattern { existing_ror_id, existing_ror_name, matched_ror_id, matched_ror_name, count }
            })
            .collect();

        let overlap = stats.existing_assignments.overlap_with_new_matches;
        if overlap > 0 {
            d.disagreement_rate = d.total_count as f64 / overlap as f64;
        }
        tracing::info!("Total disagreements: {}", format_count(d.total_count));
        tracing::debug!("Disagreements by type: {:?}", d.by_type);
        if overlap > 0 {
            tracing::info!(
                "Disagreement rate: {} / {} = {}",
                format_count(d.total_count),
                format_count(overlap),
                format_percent(d.disagreement_rate)
            );
        }
        Ok(())
    }
}

fn file_stats(input_dir: &Path, dataset: &DatasetFile, buf: usize) -> Result<Option<FileStats>> {
    let path = input_dir.join(dataset.filename);
    let meta = match fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("stat {}", path.display())),
    };
    let size = meta.len();
    let records = crate::records::count_records(&path, dataset, buf)
        .with_context(|| format!("counting records in {}", path.display()))?;
    Ok(Some(FileStats {
        config_name: dataset.config_name,
        filename: dataset.filename,
        records,
        size_bytes: size,
        size_human: format_size(size),
    }))
}
