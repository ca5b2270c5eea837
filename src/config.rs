use crate::datasets::{self, DatasetFile};
use std::path::{Path, PathBuf};

pub const DEFAULT_REPO_ID: &str = "cometadata/datacite-affiliations-matched-ror";
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";
pub const ROR_VERSION: &str = "v2.1-2026-01-15-ror-data";
pub const ROR_DOI: &str = "https://doi.org/10.5281/zenodo.18260365";
pub const SOURCE_TOOL: &str = "https://github.com/cometadata/match-datacite-affiliations-to-ror-ids";

pub const TARGET_SHARD_SIZE: u64 = 1024 * 1024 * 1024; // 1 GiB
pub const BATCH_SIZE: usize = 50_000;
pub const SCHEMA_SAMPLE_SIZE: usize = 1_000;

/// What a `Publisher::run` should do after statistics are collected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Convert, write the card, verify, then upload (when a token is present).
    Full,
    /// Only collect statistics and write `stats.json`.
    StatsOnly,
    /// Convert and verify, never upload.
    ConvertOnly,
    /// Upload what is already in the output directory.
    UploadOnly,
}

/// Provenance shown in the dataset card.
#[derive(Clone, Debug)]
pub struct CardInfo {
    pub repo_id: String,
    pub ror_version: String,
    pub ror_doi: String,
    pub source_tool: String,
}

impl Default for CardInfo {
    fn default() -> Self {
        Self {
            repo_id: DEFAULT_REPO_ID.to_string(),
            ror_version: ROR_VERSION.to_string(),
            ror_doi: ROR_DOI.to_string(),
            source_tool: SOURCE_TOOL.to_string(),
        }
    }
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct PublishOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub repo_id: String,
    pub endpoint: String,
    pub token: Option<String>,
    pub private: bool,
    pub datasets: Vec<DatasetFile>, // subset of the table, table order
    pub progress: bool,

    // conversion tuning
    pub target_shard_bytes: u64,
    pub batch_size: usize,
    pub schema_sample_size: usize,
    pub read_buffer_bytes: usize,

    pub card: CardInfo,
}

impl Default for PublishOptions {
    fn default() -> Self {
        let input = PathBuf::from("./datacite-ror-output");
        Self {
            output_dir: input.join("hf_upload"),
            input_dir: input,
            repo_id: DEFAULT_REPO_ID.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: None,
            private: false,
            datasets: datasets::all().to_vec(),
            progress: true,

            target_shard_bytes: TARGET_SHARD_SIZE,
            batch_size: BATCH_SIZE,
            schema_sample_size: SCHEMA_SAMPLE_SIZE,
            read_buffer_bytes: 256 * 1024,

            card: CardInfo::default(),
        }
    }
}

impl PublishOptions {
    pub fn with_input_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.input_dir = dir.as_ref().to_path_buf();
        self
    }
    pub fn with_output_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_dir = dir.as_ref().to_path_buf();
        self
    }
    /// Sets the upload target; the dataset card links to the same repository.
    pub fn with_repo_id(mut self, repo_id: impl Into<String>) -> Self {
        let id = repo_id.into();
        self.card.repo_id = id.clone();
        self.repo_id = id;
        self
    }
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }
    pub fn with_private(mut self, yes: bool) -> Self {
        self.private = yes;
        self
    }
    pub fn with_datasets(mut self, datasets: Vec<DatasetFile>) -> Self {
        self.datasets = datasets;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_target_shard_bytes(mut self, bytes: u64) -> Self {
        self.target_shard_bytes = bytes.max(1);
        self
    }
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }
    pub fn with_schema_sample_size(mut self, n: usize) -> Self {
        self.schema_sample_size = n.max(1);
        self
    }
    pub fn with_io_read_buffer(mut self, bytes: usize) -> Self {
        self.read_buffer_bytes = bytes.max(8 * 1024);
        self
    }
    pub fn with_card(mut self, card: CardInfo) -> Self {
        self.card = card;
        self
    }
}
