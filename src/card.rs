//! Dataset card (`README.md`) rendering: YAML front matter for the Hub plus a markdown
//! description with the statistics tables.

use crate::config::CardInfo;
use crate::datasets;
use crate::humanize::{format_count, format_percent, size_category};
use crate::stats::DatasetStats;
use crate::util::write_file_atomic;
use anyhow::Result;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const SCHEMA_DOCS: &str = r#"## Configuration Details

### `doi_author_affiliations`

Flattened author-affiliation pairs extracted from DataCite records. Each row represents one author-affiliation relationship.

**Schema:**
- `doi` (string): The DOI of the work
- `author_idx` (int): Index of the author within the work
- `author_name` (string): Name of the author
- `affiliation_idx` (int): Index of the affiliation for this author
- `affiliation` (string): Raw affiliation string
- `affiliation_hash` (string): MD5 hash of the normalized affiliation string

### `enriched_records`

Original DataCite records enriched with ROR IDs where matches were found.

**Schema:**
- `doi` (string): The DOI of the work
- `creators` (list): List of creator objects with nested affiliation data including matched ROR IDs

### `ror_matches`

Successful affiliation-to-ROR matches.

**Schema:**
- `affiliation` (string): Raw affiliation string
- `affiliation_hash` (string): MD5 hash of the normalized affiliation string
- `ror_id` (string): Matched ROR ID

### `ror_matches_failed`

Affiliations that could not be matched to a ROR ID.

**Schema:**
- `affiliation` (string): Raw affiliation string
- `affiliation_hash` (string): MD5 hash of the normalized affiliation string
- `error` (string): Reason for match failure

### `unique_affiliations`

List of all unique affiliation strings found in the dataset.

**Schema:**
- `affiliation` (string): Raw affiliation string

### `existing_assignments`

Pre-existing ROR assignments found in DataCite records. Each row represents one author-affiliation-ROR relationship that was already present in the source data.

**Schema:**
- `doi` (string): The DOI of the work
- `author_idx` (int): Index of the author within the work
- `author_name` (string): Name of the author
- `affiliation` (string): Raw affiliation string
- `ror_id` (string): Pre-existing ROR ID in the DataCite record
- `ror_name` (string): Name of the ROR organization

### `existing_assignments_aggregated`

Aggregated view of pre-existing ROR assignments, grouped by affiliation string and ROR ID.

**Schema:**
- `affiliation` (string): Raw affiliation string
- `affiliation_hash` (string): MD5 hash of the normalized affiliation string
- `ror_id` (string): Pre-existing ROR ID
- `ror_name` (string): Name of the ROR organization
- `count` (int): Number of occurrences of this affiliation-ROR pair

### `disagreements`

Cases where the newly matched ROR ID differs from a pre-existing ROR assignment, or where multiple conflicting ROR IDs exist.

**Schema (type="match"):**
- `type` (string): "match" - disagreement between new match and existing assignment
- `affiliation` (string): Raw affiliation string
- `affiliation_hash` (string): MD5 hash of the normalized affiliation string
- `existing_ror_id` (string): Pre-existing ROR ID in DataCite
- `existing_ror_name` (string): Name of existing ROR organization
- `existing_count` (int): Occurrences of this existing assignment
- `matched_ror_id` (string): Newly matched ROR ID
- `matched_ror_name` (string): Name of newly matched organization

**Schema (type="user"):**
- `type` (string): "user" - multiple conflicting user-submitted ROR IDs
- `affiliation` (string): Raw affiliation string
- `affiliation_hash` (string): MD5 hash of the normalized affiliation string
- `ror_ids` (list): List of conflicting ROR assignments with counts
"#;

/// Join table rows, or fall back to `empty` when there are none.
fn table_or(rows: Vec<String>, empty: &str) -> String {
    if rows.is_empty() { empty.to_string() } else { rows.join("\n") }
}

fn front_matter(stats: &DatasetStats) -> String {
    let mut s = String::from(
        "---\nlicense: cc0-1.0\ntask_categories:\n  - text-classification\nlanguage:\n  - en\ntags:\n  - research\n  - affiliations\n  - ror\n  - datacite\n  - metadata\n  - scholarly-infrastructure\npretty_name: DataCite Affiliations Matched to ROR\n",
    );
    let _ = writeln!(s, "size_categories:\n  - {}", size_category(stats.total_records));
    s.push_str("configs:\n");
    for name in datasets::config_names() {
        let _ = writeln!(
            s,
            "  - config_name: {name}\n    data_files:\n      - split: train\n        path: data/{name}/*.parquet"
        );
    }
    s.push_str("---\n");
    s
}

/// Render the full dataset card.
pub fn render_readme(stats: &DatasetStats, card: &CardInfo, year: i32) -> String {
    let file_table = datasets::all()
        .iter()
        .filter_map(|d| stats.file(d.config_name))
        .map(|f| format!("| `{}` | {} | {} |", f.config_name, format_count(f.records), f.size_human))
        .collect::<Vec<_>>()
        .join("\n");

    let ror_table = table_or(
        stats
            .top_ror_ids
            .iter()
            .take(20)
            .map(|(id, count)| format!("| {} | {} |", id, format_count(*count)))
            .collect(),
        "No data available",
    );

    let error_table = table_or(
        stats
            .error_distribution
            .iter()
            .map(|(err, count)| format!("| {} | {} |", err.replace('|', "\\|"), format_count(*count)))
            .collect(),
        "No data available",
    );

    let existing = &stats.existing_assignments;
    let disagreements = &stats.disagreements;
    let pattern_table = table_or(
        disagreements
            .top_patterns
            .iter()
            .take(10)
            .map(|p| {
                let existing_cell = if p.existing_ror_name.is_empty() {
                    p.existing_ror_id.clone()
                } else {
                    format!("{} ({})", p.existing_ror_name, p.existing_ror_id)
                };
                let matched_cell = if p.matched_ror_name.is_empty() {
                    p.matched_ror_id.clone()
                } else {
                    format!("{} ({})", p.matched_ror_name, p.matched_ror_id)
                };
                format!("| {} | {} | {} |", existing_cell, matched_cell, format_count(p.count))
            })
            .collect(),
        "No disagreements found",
    );

    let tool_name = card
        .source_tool
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(card.source_tool.as_str());
    let repo_id = &card.repo_id;
    let ror_version = &card.ror_version;
    let ror_doi = &card.ror_doi;
    let source_tool = &card.source_tool;
    let total_records = format_count(stats.total_records);
    let total_size = &stats.total_size_human;
    let match_rate = format_percent(stats.match_rate);
    let existing_total = format_count(existing.total_records);
    let existing_unique = format_count(existing.unique_affiliations);
    let existing_overlap = format_count(existing.overlap_with_new_matches);
    let agreement_rate = format_percent(existing.agreement_rate);
    let disagreement_total = format_count(disagreements.total_count);
    let disagreement_rate = format_percent(disagreements.disagreement_rate);
    let match_disagreements = format_count(disagreements.count_of("match"));
    let user_disagreements = format_count(disagreements.count_of("user"));
    let front = front_matter(stats);
    let schema_docs = SCHEMA_DOCS;

    format!(
        r#"{front}
# DataCite Affiliations Matched to ROR

This dataset contains author affiliation data extracted from DataCite metadata records, matched against the Research Organization Registry (ROR).

## Dataset Description

- **Source:** [DataCite Public Data File](https://datacite.org/)
- **ROR Version:** [{ror_version}]({ror_doi})
- **Processing Tool:** [{tool_name}]({source_tool})
- **Total Records:** {total_records}
- **Total Size:** {total_size}
- **Match Rate:** {match_rate}

## Dataset Configurations

| Configuration | Records | Size |
|---------------|---------|------|
{file_table}

{schema_docs}
## Statistics

### Top 20 Most Common Matched ROR IDs

| ROR ID | Count |
|--------|-------|
{ror_table}

### Error Distribution (Failed Matches)

| Error Type | Count |
|------------|-------|
{error_table}

### Existing Assignment Coverage

| Metric | Value |
|--------|-------|
| Total records with existing ROR assignments | {existing_total} |
| Unique affiliations with existing assignments | {existing_unique} |
| Overlap with new matches | {existing_overlap} |
| Agreement rate | {agreement_rate} |

### Disagreement Analysis

| Metric | Value |
|--------|-------|
| Total disagreements | {disagreement_total} |
| Disagreement rate | {disagreement_rate} |
| Match-type disagreements | {match_disagreements} |
| User-type disagreements | {user_disagreements} |

### Top Disagreement Patterns

| Existing ROR | Matched ROR | Count |
|--------------|-------------|-------|
{pattern_table}

## Usage

```python
from datasets import load_dataset

# Load successful ROR matches
matches = load_dataset("{repo_id}", "ror_matches")

# Load author-affiliation pairs (large dataset, use streaming)
affiliations = load_dataset(
    "{repo_id}",
    "doi_author_affiliations",
    streaming=True
)

# Iterate over records
for record in affiliations["train"]:
    print(record["doi"], record["affiliation"])
    break
```

## License

This dataset is released under the [CC0 1.0 Universal (Public Domain Dedication)](https://creativecommons.org/publicdomain/zero/1.0/) license.

## Citation

If you use this dataset, please cite:

```bibtex
@dataset{{datacite_affiliations_ror,
  title = {{DataCite Affiliations Matched to ROR}},
  author = {{cometadata}},
  year = {{{year}}},
  publisher = {{Hugging Face}},
  url = {{https://huggingface.co/datasets/{repo_id}}}
}}
```

## Acknowledgments

- [DataCite](https://datacite.org/) for providing the source metadata
- [ROR](https://ror.org/) for the Research Organization Registry
"#
    )
}

/// Write `README.md` into `output_dir` and return its path.
pub fn generate_readme(stats: &DatasetStats, output_dir: &Path, card: &CardInfo) -> Result<PathBuf> {
    let year = time::OffsetDateTime::now_utc().year();
    let path = output_dir.join("README.md");
    write_file_atomic(&path, render_readme(stats, card, year).as_bytes())?;
    tracing::info!("Generated dataset card: {}", path.display());
    Ok(path)
}
