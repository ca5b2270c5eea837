use crate::card::generate_readme;
use crate::config::{CardInfo, PublishOptions, RunMode};
use crate::convert::VerifyReport;
use crate::datasets::DatasetFile;
use crate::hub::{upload_dataset, HubClient};
use crate::stats::DatasetStats;
use crate::util::init_tracing_once;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Converts matching-pipeline outputs into a Parquet dataset and publishes it.
#[derive(Clone, Default)]
pub struct Publisher {
    pub(crate) opts: PublishOptions,
}

/// What a run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub stats: DatasetStats,
    pub stats_path: Option<PathBuf>,
    pub parquet_files: Vec<PathBuf>,
    pub readme: Option<PathBuf>,
    pub verify: Option<VerifyReport>,
    pub repo_url: Option<String>,
}

impl Publisher {
    pub fn new() -> Self {
        Self { opts: PublishOptions::default() }
    }

    pub fn from_options(opts: PublishOptions) -> Self {
        Self { opts }
    }

    // -------- Builder methods --------
    pub fn input_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_input_dir(dir); self }
    pub fn output_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output_dir(dir); self }
    pub fn repo_id(mut self, repo_id: impl Into<String>) -> Self { self.opts = self.opts.with_repo_id(repo_id); self }
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self { self.opts = self.opts.with_endpoint(endpoint); self }
    pub fn token(mut self, token: Option<String>) -> Self { self.opts = self.opts.with_token(token); self }
    pub fn private(mut self, yes: bool) -> Self { self.opts = self.opts.with_private(yes); self }
    pub fn datasets(mut self, datasets: Vec<DatasetFile>) -> Self { self.opts = self.opts.with_datasets(datasets); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn target_shard_bytes(mut self, bytes: u64) -> Self { self.opts = self.opts.with_target_shard_bytes(bytes); self }
    pub fn batch_size(mut self, n: usize) -> Self { self.opts = self.opts.with_batch_size(n); self }
    pub fn schema_sample_size(mut self, n: usize) -> Self { self.opts = self.opts.with_schema_sample_size(n); self }
    pub fn io_read_buffer(mut self, bytes: usize) -> Self { self.opts = self.opts.with_io_read_buffer(bytes); self }
    pub fn card(mut self, card: CardInfo) -> Self { self.opts = self.opts.with_card(card); self }

    pub fn options(&self) -> &PublishOptions {
        &self.opts
    }

    /// Write the dataset card for `stats` into the output directory.
    pub fn write_card(&self, stats: &DatasetStats) -> Result<PathBuf> {
        generate_readme(stats, &self.opts.output_dir, &self.opts.card)
    }

    /// Upload the output directory. Returns `Ok(None)` when no token is configured.
    pub fn upload(&self) -> Result<Option<String>> {
        let Some(token) = self.opts.token.as_deref() else {
            tracing::warn!("No Hugging Face token provided. Set HF_TOKEN or use --token. Skipping upload.");
            return Ok(None);
        };
        tracing::info!("Uploading to {} ({})", self.opts.repo_id, self.opts.endpoint);
        let client = HubClient::new(&self.opts.endpoint, token)?.with_progress(self.opts.progress);
        let url = upload_dataset(&client, &self.opts.output_dir, &self.opts.repo_id, self.opts.private, self.opts.progress)
            .with_context(|| format!("uploading to {}", self.opts.repo_id))?;
        Ok(Some(url))
    }

    /// Run the whole flow. `confirm_mismatch` is asked whether to continue when
    /// verification finds row-count mismatches (convert-only included); refusing aborts
    /// with an error.
    pub fn run<F>(self, mode: RunMode, mut confirm_mismatch: F) -> Result<RunSummary>
    where
        F: FnMut(&VerifyReport) -> bool,
    {
        init_tracing_once();
        fs::create_dir_all(&self.opts.output_dir)
            .with_context(|| format!("create {}", self.opts.output_dir.display()))?;

        let mut summary = RunSummary { stats: self.collect_stats()?, ..Default::default() };

        if mode == RunMode::StatsOnly {
            let path = summary.stats.write_json(&self.opts.output_dir)?;
            tracing::info!("Stats saved to: {}", path.display());
            summary.stats_path = Some(path);
            return Ok(summary);
        }

        if mode != RunMode::UploadOnly {
            tracing::info!("Converting to Parquet format...");
            summary.parquet_files = self.convert_all(&summary.stats)?;
            summary.readme = Some(self.write_card(&summary.stats)?);

            let report = self.verify_conversion(&summary.stats)?;
            let ok = report.all_ok();
            if !ok {
                tracing::warn!("Some files have mismatched record counts!");
            }
            let proceed = ok || confirm_mismatch(&report);
            summary.verify = Some(report);
            if !proceed {
                return Err(anyhow!("aborted: row counts do not match the source files"));
            }
        }

        if mode != RunMode::ConvertOnly {
            summary.repo_url = self.upload()?;
        }

        tracing::info!("Done!");
        Ok(summary)
    }
}
