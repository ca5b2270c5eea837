//! JSON → Parquet conversion per dataset, and the post-conversion row-count check.

use crate::datasets::{self, DatasetFile};
use crate::humanize::{format_count, format_size};
use crate::pipeline::Publisher;
use crate::progress::record_progress;
use crate::records::RecordStream;
use crate::schema::infer_schema;
use crate::shard::{list_parquet_files, parquet_row_count, ShardPlan, ShardWriter};
use crate::stats::DatasetStats;
use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Result of checking one dataset directory against its expected record count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyEntry {
    pub config_name: &'static str,
    pub expected: u64,
    pub actual: u64,
}

impl VerifyEntry {
    pub fn ok(&self) -> bool {
        self.expected == self.actual
    }
}

#[derive(Clone, Debug, Default)]
pub struct VerifyReport {
    pub entries: Vec<VerifyEntry>,
}

impl VerifyReport {
    pub fn all_ok(&self) -> bool {
        self.entries.iter().all(VerifyEntry::ok)
    }
}

/// `<output>/data/<config_name>`
pub fn dataset_dir(output_dir: &Path, dataset: &DatasetFile) -> PathBuf {
    output_dir.join("data").join(dataset.config_name)
}

/// Sum of footer row counts over every Parquet file of a directory.
pub fn rows_in_dir(dir: &Path) -> Result<u64> {
    let files = list_parquet_files(dir)?;
    let counts = files
        .par_iter()
        .map(|f| parquet_row_count(f))
        .collect::<Result<Vec<u64>>>()?;
    Ok(counts.into_iter().sum())
}

impl Publisher {
    /// Convert one dataset into `data/<config_name>/train-*.parquet`.
    /// Missing or empty inputs are skipped with a warning and produce no files.
    pub fn convert_dataset(&self, dataset: &DatasetFile, stats: &DatasetStats) -> Result<Vec<PathBuf>> {
        let input = self.opts.input_dir.join(dataset.filename);
        if !input.exists() {
            tracing::warn!("{} not found, skipping", dataset.filename);
            return Ok(Vec::new());
        }

        let file_size = fs::metadata(&input)
            .with_context(|| format!("stat {}", input.display()))?
            .len();
        let record_count = stats.records_for(dataset.config_name);
        if record_count == 0 {
            tracing::warn!("{} has no records, skipping", dataset.filename);
            return Ok(Vec::new());
        }

        let out_dir = dataset_dir(&self.opts.output_dir, dataset);
        fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir.display()))?;

        let plan = ShardPlan::for_file(file_size, record_count, dataset.shard_large, self.opts.target_shard_bytes);
        tracing::info!(
            "Converting {} ({}, {} records) to {} shard(s)...",
            dataset.filename,
            format_size(file_size),
            format_count(record_count),
            plan.num_shards
        );

        let schema = infer_schema(&input, dataset, self.opts.read_buffer_bytes, self.opts.schema_sample_size)?;
        tracing::info!("  Schema: {:?}", schema.fields().iter().map(|f| format!("{}: {}", f.name(), f.data_type())).collect::<Vec<_>>());

        let mut writer = ShardWriter::create(&out_dir, schema, plan, self.opts.batch_size)?;
        let pb = record_progress(self.opts.progress, record_count, &format!("Processing {}", dataset.config_name));
        for rec in RecordStream::open(&input, dataset, self.opts.read_buffer_bytes)? {
            writer
                .push(rec?)
                .with_context(|| format!("writing {}", dataset.config_name))?;
            if let Some(pb) = &pb { pb.inc(1); }
        }
        let files = writer.finish()?;
        if let Some(pb) = pb { pb.finish_and_clear(); }

        let mut total_rows = 0u64;
        for f in &files {
            total_rows += parquet_row_count(f)?;
        }
        tracing::info!("  Written {} rows to {} file(s)", format_count(total_rows), files.len());
        if total_rows != record_count {
            tracing::warn!(
                "  Row count mismatch for {}! Expected {}, got {}",
                dataset.config_name,
                format_count(record_count),
                format_count(total_rows)
            );
        }
        Ok(files)
    }

    /// Convert every selected dataset in table order.
    pub fn convert_all(&self, stats: &DatasetStats) -> Result<Vec<PathBuf>> {
        let mut all = Vec::new();
        for dataset in &self.opts.datasets {
            all.extend(self.convert_dataset(dataset, stats)?);
        }
        Ok(all)
    }

    /// Compare footer row counts under `data/` with the expected record counts.
    /// Datasets without an output directory are not checked.
    pub fn verify_conversion(&self, stats: &DatasetStats) -> Result<VerifyReport> {
        tracing::info!("Verifying conversion...");
        let mut report = VerifyReport::default();
        for dataset in datasets::all() {
            let dir = dataset_dir(&self.opts.output_dir, dataset);
            if !dir.is_dir() {
                continue;
            }
            let entry = VerifyEntry {
                config_name: dataset.config_name,
                expected: stats.records_for(dataset.config_name),
                actual: rows_in_dir(&dir)?,
            };
            let mark = if entry.ok() { "✓" } else { "✗" };
            tracing::info!(
                "  {} {}: {} / {}",
                mark,
                entry.config_name,
                format_count(entry.actual),
                format_count(entry.expected)
            );
            report.entries.push(entry);
        }
        Ok(report)
    }
}
