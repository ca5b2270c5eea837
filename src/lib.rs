mod config;
mod datasets;
mod records;
mod schema;
mod shard;

mod progress;
mod counting;
mod humanize;
mod util;
mod json_utils;

mod stats;
mod convert;
mod card;
mod hub;
mod pipeline;

pub use crate::config::{CardInfo, PublishOptions, RunMode};
pub use crate::config::{DEFAULT_ENDPOINT, DEFAULT_REPO_ID, TARGET_SHARD_SIZE, BATCH_SIZE, SCHEMA_SAMPLE_SIZE};
pub use crate::pipeline::{Publisher, RunSummary};

// Dataset table.
pub use crate::datasets::{DatasetFile, DATASETS};
pub mod dataset_table {
    pub use crate::datasets::{all, by_config_name, config_names, select};
}

// Statistics and their serialized layout.
pub use crate::stats::{Aggregator, DatasetStats, DisagreementPattern, DisagreementStats, ExistingAssignmentStats, FileStats};

// Record readers.
pub use crate::records::{count_records, for_each_line, for_each_record, sample_records, NdjsonReader, RecordStream};

// Conversion building blocks.
pub use crate::schema::infer_schema;
pub use crate::shard::{list_parquet_files, parquet_row_count, shard_file_name, ShardPlan, ShardWriter};
pub use crate::convert::{dataset_dir, rows_in_dir, VerifyEntry, VerifyReport};

// Dataset card.
pub use crate::card::{generate_readme, render_readme};

// Hub client.
pub use crate::hub::{dataset_url, sha256_file, upload_dataset, validate_repo_id, CommitOp, HubClient, HubError, UploadMode};

// Helpers used by the binary.
pub use crate::counting::TopCounter;
pub use crate::humanize::{format_count, format_percent, format_size, size_category};
pub use crate::json_utils::error_label;
pub use crate::util::{init_tracing_once, init_tracing_with_default};
