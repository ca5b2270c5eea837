//! The fixed table of matching-pipeline outputs that become dataset configurations.

use anyhow::{bail, Result};

/// One input file and the dataset configuration it is published as.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DatasetFile {
    pub filename: &'static str,
    pub config_name: &'static str,
    /// The whole file is a single JSON array instead of JSONL.
    pub is_json_array: bool,
    /// Array items are bare strings, wrapped as `{"affiliation": item}`.
    pub is_string_array: bool,
    /// Eligible for splitting into several shards when larger than the target shard size.
    pub shard_large: bool,
}

impl DatasetFile {
    const fn jsonl(filename: &'static str, config_name: &'static str, shard_large: bool) -> Self {
        Self { filename, config_name, is_json_array: false, is_string_array: false, shard_large }
    }
}

pub const DATASETS: [DatasetFile; 8] = [
    DatasetFile::jsonl("doi_author_affiliations.jsonl", "doi_author_affiliations", true),
    DatasetFile::jsonl("enriched_records.jsonl", "enriched_records", true),
    DatasetFile::jsonl("ror_matches.jsonl", "ror_matches", false),
    DatasetFile::jsonl("ror_matches.failed.jsonl", "ror_matches_failed", false),
    DatasetFile {
        filename: "unique_affiliations.json",
        config_name: "unique_affiliations",
        is_json_array: true,
        is_string_array: true,
        shard_large: false,
    },
    DatasetFile::jsonl("existing_assignments.jsonl", "existing_assignments", true),
    DatasetFile::jsonl("existing_assignments_aggregated.jsonl", "existing_assignments_aggregated", false),
    DatasetFile::jsonl("disagreements.jsonl", "disagreements", false),
];

// Well-known configuration names used by the statistics pass.
pub const ROR_MATCHES: &str = "ror_matches";
pub const ROR_MATCHES_FAILED: &str = "ror_matches_failed";
pub const UNIQUE_AFFILIATIONS: &str = "unique_affiliations";
pub const EXISTING_AGGREGATED: &str = "existing_assignments_aggregated";
pub const DISAGREEMENTS: &str = "disagreements";

pub fn all() -> &'static [DatasetFile] {
    &DATASETS
}

pub fn by_config_name(name: &str) -> Option<&'static DatasetFile> {
    DATASETS.iter().find(|d| d.config_name == name)
}

pub fn config_names() -> impl Iterator<Item = &'static str> {
    DATASETS.iter().map(|d| d.config_name)
}

/// Restrict the table to `names`, keeping table order. Unknown names are an error.
pub fn select<S: AsRef<str>>(names: &[S]) -> Result<Vec<DatasetFile>> {
    for n in names {
        if by_config_name(n.as_ref()).is_none() {
            bail!(
                "unknown dataset '{}' (expected one of: {})",
                n.as_ref(),
                config_names().collect::<Vec<_>>().join(", ")
            );
        }
    }
    Ok(DATASETS
        .iter()
        .filter(|d| names.iter().any(|n| n.as_ref() == d.config_name))
        .copied()
        .collect())
}
