#![allow(dead_code)]

use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write JSONL lines (already serialized) to `path`.
pub fn write_lines(path: &Path, lines: &[String]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut f = File::create(path).unwrap();
    for l in lines {
        writeln!(&mut f, "{}", l).unwrap();
    }
}

pub fn write_jsonl(path: &Path, values: &[Value]) {
    let lines: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    write_lines(path, &lines);
}

/// A failure reason longer than the 100-character cut-off, containing a pipe.
pub fn long_error() -> String {
    format!("upstream | {}", "x".repeat(140))
}

/// Build a tiny matching-pipeline output directory with all eight files:
/// - `doi_author_affiliations.jsonl`: 5 pairs plus one blank line (5 records)
/// - `enriched_records.jsonl`: 2 records with nested creators/affiliations
/// - `ror_matches.jsonl`: 4 matches; ROR A twice, B and C once; hashes h1..h4
/// - `ror_matches.failed.jsonl`: "timeout" twice, one null error, one long error (4)
/// - `unique_affiliations.json`: 8 bare strings → match rate 4/8
/// - `existing_assignments.jsonl`: 3 records
/// - `existing_assignments_aggregated.jsonl`: hashes h1, h2 (twice), h3 (no count), h9
///   → 4 unique hashes, 11 total records, overlap with matches = 3 (h1, h2, h3)
/// - `disagreements.jsonl`: one "match" (h2) and one "user" (h2) → 2 disagreements
pub fn make_input_basic() -> PathBuf {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.into_path();

    let mut pairs: Vec<String> = (0..5)
        .map(|i| {
            json!({
                "doi": format!("10.1234/paper{}", i / 2),
                "author_idx": i % 2,
                "author_name": format!("Author {}", i),
                "affiliation_idx": 0,
                "affiliation": format!("Institute {}", i),
                "affiliation_hash": format!("h{}", i + 1),
            })
            .to_string()
        })
        .collect();
    pairs.insert(2, String::new());
    write_lines(&base.join("doi_author_affiliations.jsonl"), &pairs);

    write_jsonl(
        &base.join("enriched_records.jsonl"),
        &[
            json!({"doi": "10.1234/paper0", "creators": [
                {"name": "Author 0", "affiliation": [
                    {"name": "Institute 0", "affiliationIdentifier": "https://ror.org/A",
                     "affiliationIdentifierScheme": "ROR", "schemeUri": "https://ror.org"}
                ]}
            ]}),
            json!({"doi": "10.1234/paper1", "creators": [
                {"name": "Author 2", "affiliation": [
                    {"name": "Institute 2", "affiliationIdentifier": "https://ror.org/B",
                     "affiliationIdentifierScheme": "ROR", "schemeUri": "https://ror.org"}
                ]},
                {"name": "Author 3", "affiliation": []}
            ]}),
        ],
    );

    write_jsonl(
        &base.join("ror_matches.jsonl"),
        &[
            json!({"affiliation": "Institute 1", "affiliation_hash": "h1", "ror_id": "https://ror.org/A"}),
            json!({"affiliation": "Institute 2", "affiliation_hash": "h2", "ror_id": "https://ror.org/B"}),
            json!({"affiliation": "Institute 3", "affiliation_hash": "h3", "ror_id": "https://ror.org/A"}),
            json!({"affiliation": "Institute 4", "affiliation_hash": "h4", "ror_id": "https://ror.org/C"}),
        ],
    );

    write_jsonl(
        &base.join("ror_matches.failed.jsonl"),
        &[
            json!({"affiliation": "Nowhere", "affiliation_hash": "f1", "error": "timeout"}),
            json!({"affiliation": "Somewhere", "affiliation_hash": "f2", "error": long_error()}),
            json!({"affiliation": "Elsewhere", "affiliation_hash": "f3", "error": "timeout"}),
            json!({"affiliation": "Anywhere", "affiliation_hash": "f4", "error": null}),
        ],
    );

    let unique: Vec<String> = (0..8).map(|i| format!("Institute {}", i)).collect();
    fs::write(base.join("unique_affiliations.json"), serde_json::to_vec(&unique).unwrap()).unwrap();

    write_jsonl(
        &base.join("existing_assignments.jsonl"),
        &[
            json!({"doi": "10.1234/paper0", "author_idx": 0, "author_name": "Author 0",
                   "affiliation": "Institute 1", "ror_id": "https://ror.org/A", "ror_name": "Org A"}),
            json!({"doi": "10.1234/paper1", "author_idx": 0, "author_name": "Author 2",
                   "affiliation": "Institute 2", "ror_id": "https://ror.org/X", "ror_name": "Org X"}),
            json!({"doi": "10.1234/paper2", "author_idx": 1, "author_name": "Author 4",
                   "affiliation": "Institute 3", "ror_id": "https://ror.org/A", "ror_name": "Org A"}),
        ],
    );

    write_jsonl(
        &base.join("existing_assignments_aggregated.jsonl"),
        &[
            json!({"affiliation": "Institute 1", "affiliation_hash": "h1", "ror_id": "https://ror.org/A", "ror_name": "Org A", "count": 3}),
            json!({"affiliation": "Institute 2", "affiliation_hash": "h2", "ror_id": "https://ror.org/X", "ror_name": "Org X", "count": 2}),
            json!({"affiliation": "Institute 2", "affiliation_hash": "h2", "ror_id": "https://ror.org/Y", "ror_name": "Org Y", "count": 1}),
            json!({"affiliation": "Institute 3", "affiliation_hash": "h3", "ror_id": "https://ror.org/A", "ror_name": "Org A"}),
            json!({"affiliation": "Institute 9", "affiliation_hash": "h9", "ror_id": "https://ror.org/Z", "ror_name": "Org Z", "count": 4}),
        ],
    );

    write_jsonl(
        &base.join("disagreements.jsonl"),
        &[
            json!({"type": "user", "affiliation": "Institute 2", "affiliation_hash": "h2",
                   "ror_ids": [
                       {"ror_id": "https://ror.org/X", "ror_name": "Org X", "count": 2},
                       {"ror_id": "https://ror.org/Y", "ror_name": "Org Y", "count": 1}
                   ]}),
            json!({"type": "match", "affiliation": "Institute 2", "affiliation_hash": "h2",
                   "existing_ror_id": "https://ror.org/X", "existing_ror_name": "Org X", "existing_count": 2,
                   "matched_ror_id": "https://ror.org/B", "matched_ror_name": "Org B"}),
        ],
    );

    base
}

/// Write `n` author-affiliation records to `doi_author_affiliations.jsonl` under `base`.
pub fn write_many_pairs(base: &Path, n: usize) {
    let values: Vec<Value> = (0..n)
        .map(|i| {
            json!({
                "doi": format!("10.5555/w{}", i / 3),
                "author_idx": i % 3,
                "author_name": format!("Author Number {}", i),
                "affiliation_idx": 0,
                "affiliation": format!("Department of Examples, University {}", i % 97),
                "affiliation_hash": format!("{:016x}", i),
            })
        })
        .collect();
    write_jsonl(&base.join("doi_author_affiliations.jsonl"), &values);
}

/// Column names of a Parquet file.
pub fn parquet_columns(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    let builder = parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder::try_new(f).unwrap();
    builder.schema().fields().iter().map(|f| f.name().to_string()).collect()
}

/// File names (not paths) of the Parquet files in a directory, sorted.
pub fn parquet_names(dir: &Path) -> Vec<String> {
    let mut v: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".parquet"))
        .collect();
    v.sort();
    v
}
