#[path = "common/mod.rs"]
mod common;

use common::*;
use matchpub::Publisher;
use std::fs;

fn publisher_for(base: &std::path::Path) -> Publisher {
    Publisher::new()
        .input_dir(base)
        .output_dir(base.join("out"))
        .progress(false)
}

/// Per-file counts over the basic fixture: blank JSONL lines are not records,
/// the JSON array counts its items, and totals add up across all eight files.
#[test]
fn counts_records_per_file() {
    let base = make_input_basic();
    let stats = publisher_for(&base).collect_stats().unwrap();

    assert_eq!(stats.files.len(), 8);
    assert_eq!(stats.records_for("doi_author_affiliations"), 5, "blank line must not count");
    assert_eq!(stats.records_for("enriched_records"), 2);
    assert_eq!(stats.records_for("ror_matches"), 4);
    assert_eq!(stats.records_for("ror_matches_failed"), 4);
    assert_eq!(stats.records_for("unique_affiliations"), 8);
    assert_eq!(stats.records_for("existing_assignments"), 3);
    assert_eq!(stats.records_for("existing_assignments_aggregated"), 5);
    assert_eq!(stats.records_for("disagreements"), 2);
    assert_eq!(stats.total_records, 33);

    let on_disk: u64 = stats.files.iter().map(|f| fs::metadata(base.join(f.filename)).unwrap().len()).sum();
    assert_eq!(stats.total_size_bytes, on_disk);
    assert!(stats.total_size_human.ends_with(" KB") || stats.total_size_human.ends_with(" B"));
}

/// Match rate is matches / unique affiliations; top ROR IDs rank by count and keep
/// first-seen order among ties.
#[test]
fn match_rate_and_top_ids() {
    let base = make_input_basic();
    let stats = publisher_for(&base).collect_stats().unwrap();

    assert!((stats.match_rate - 0.5).abs() < 1e-9);
    assert_eq!(
        stats.top_ror_ids,
        vec![
            ("https://ror.org/A".to_string(), 2),
            ("https://ror.org/B".to_string(), 1),
            ("https://ror.org/C".to_string(), 1),
        ]
    );
}

/// Failure reasons: repeated reasons are tallied, long reasons are cut to 100 chars
/// plus "...", and a null reason is reported as "unknown".
#[test]
fn error_distribution_is_normalized() {
    let base = make_input_basic();
    let stats = publisher_for(&base).collect_stats().unwrap();

    let errs = &stats.error_distribution;
    assert_eq!(errs.len(), 3);
    assert_eq!(errs[0], ("timeout".to_string(), 2));

    let expected_long: String = long_error().chars().take(100).collect::<String>() + "...";
    assert_eq!(errs[1], (expected_long, 1));
    assert_eq!(errs[2], ("unknown".to_string(), 1));
}

/// Existing assignments and disagreements:
/// - 4 distinct hashes, 11 records (a missing count counts as 1)
/// - overlap with new matches: h1, h2, h3 → 3
/// - 2 disagreements (1 user, 1 match) → agreement 1/3, disagreement 2/3
#[test]
fn agreement_and_disagreement_rates() {
    let base = make_input_basic();
    let stats = publisher_for(&base).collect_stats().unwrap();

    let ex = &stats.existing_assignments;
    assert_eq!(ex.unique_affiliations, 4);
    assert_eq!(ex.total_records, 11);
    assert_eq!(ex.overlap_with_new_matches, 3);
    assert_eq!(ex.agreement_count, 1);
    assert!((ex.agreement_rate - 1.0 / 3.0).abs() < 1e-9);

    let d = &stats.disagreements;
    assert_eq!(d.total_count, 2);
    assert_eq!(d.by_type, vec![("user".to_string(), 1), ("match".to_string(), 1)]);
    assert_eq!(d.count_of("match"), 1);
    assert!((d.disagreement_rate - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(d.top_patterns.len(), 1);
    let p = &d.top_patterns[0];
    assert_eq!(p.existing_ror_id, "https://ror.org/X");
    assert_eq!(p.existing_ror_name, "Org X");
    assert_eq!(p.matched_ror_id, "https://ror.org/B");
    assert_eq!(p.matched_ror_name, "Org B");
    assert_eq!(p.count, 1);
}

/// Missing inputs are skipped: without the disagreement and aggregated files the
/// related sections stay at zero and nothing fails.
#[test]
fn missing_files_are_skipped() {
    let base = make_input_basic();
    fs::remove_file(base.join("disagreements.jsonl")).unwrap();
    fs::remove_file(base.join("existing_assignments_aggregated.jsonl")).unwrap();

    let stats = publisher_for(&base).collect_stats().unwrap();
    assert_eq!(stats.files.len(), 6);
    assert!(stats.file("disagreements").is_none());
    assert_eq!(stats.disagreements.total_count, 0);
    assert_eq!(stats.existing_assignments.overlap_with_new_matches, 0);
    assert_eq!(stats.existing_assignments.agreement_rate, 0.0);
}

/// `stats.json` keeps the report layout: `files` keyed by configuration name in table
/// order, ordered maps for errors and disagreement types, `[id, count]` pairs for ROR IDs.
#[test]
fn stats_json_layout() {
    let base = make_input_basic();
    let out = base.join("out");
    fs::create_dir_all(&out).unwrap();
    let stats = publisher_for(&base).collect_stats().unwrap();
    let path = stats.write_json(&out).unwrap();

    let raw = fs::read_to_string(&path).unwrap();
    assert!(raw.contains("\n  \"files\": {"), "pretty-printed with two-space indent");
    let first = raw.find("\"doi_author_affiliations\"").unwrap();
    let last = raw.find("\"disagreements\": {").unwrap();
    assert!(first < last);

    let v: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(v["files"]["ror_matches"]["records"], 4);
    assert_eq!(v["files"]["ror_matches"]["filename"], "ror_matches.jsonl");
    assert!(v["files"]["ror_matches"].get("config_name").is_none());
    assert_eq!(v["top_ror_ids"][0][0], "https://ror.org/A");
    assert_eq!(v["top_ror_ids"][0][1], 2);
    assert_eq!(v["error_distribution"]["timeout"], 2);
    assert_eq!(v["disagreements"]["by_type"]["user"], 1);
    assert_eq!(v["existing_assignments"]["overlap_with_new_matches"], 3);
}

/// A JSONL line that is valid JSON but not an object stops the statistics pass.
#[test]
fn non_object_line_is_an_error() {
    let base = make_input_basic();
    write_lines(
        &base.join("ror_matches.jsonl"),
        &[r#"{"affiliation_hash":"h1","ror_id":"A"}"#.to_string(), "[1,2,3]".to_string()],
    );
    let err = publisher_for(&base).collect_stats().unwrap_err();
    let msg = format!("{:#}", err);
    assert!(msg.contains("ror_matches.jsonl:2: Expected object, got array"), "{msg}");
}

/// More disagreements than overlapping matches floors agreement at zero.
#[test]
fn agreement_is_floored_at_zero() {
    let base = make_input_basic();
    let extra: Vec<serde_json::Value> = (0..3)
        .map(|i| {
            serde_json::json!({"type": "match", "affiliation": format!("Extra {i}"), "affiliation_hash": format!("e{i}"),
                   "existing_ror_id": "https://ror.org/X", "existing_ror_name": "Org X", "existing_count": 1,
                   "matched_ror_id": "https://ror.org/C", "matched_ror_name": "Org C"})
        })
        .collect();
    let path = base.join("disagreements.jsonl");
    let mut lines: Vec<String> = fs::read_to_string(&path).unwrap().lines().map(str::to_string).collect();
    lines.extend(extra.iter().map(|v| v.to_string()));
    write_lines(&path, &lines);

    let stats = publisher_for(&base).collect_stats().unwrap();
    let ex = &stats.existing_assignments;
    assert_eq!(ex.overlap_with_new_matches, 3);
    assert_eq!(stats.disagreements.total_count, 5);
    assert_eq!(ex.agreement_count, 0);
    assert_eq!(ex.agreement_rate, 0.0);
    assert!((stats.disagreements.disagreement_rate - 5.0 / 3.0).abs() < 1e-9);
    assert_eq!(stats.disagreements.count_of("match"), 4);
    assert_eq!(stats.disagreements.top_patterns[0].matched_ror_id, "https://ror.org/C");
    assert_eq!(stats.disagreements.top_patterns[0].count, 3);
}
