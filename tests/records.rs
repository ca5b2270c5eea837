#[path = "common/mod.rs"]
mod common;

use common::*;
use matchpub::{count_records, dataset_table, for_each_line, for_each_record, RecordStream};
use serde_json::json;
use std::fs;

const BUF: usize = 64 * 1024;

#[test]
fn jsonl_skips_blank_lines_and_crlf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ror_matches.jsonl");
    fs::write(&path, "{\"a\":1}\r\n\r\n   \n{\"a\":2}\n{\"a\":3}").unwrap();
    let dataset = *dataset_table::by_config_name("ror_matches").unwrap();

    assert_eq!(count_records(&path, &dataset, BUF).unwrap(), 3);
    let mut seen = Vec::new();
    let n = for_each_record(&path, &dataset, BUF, |v| {
        seen.push(v["a"].as_u64().unwrap());
        Ok(())
    })
    .unwrap();
    assert_eq!(n, 3);
    assert_eq!(seen, vec![1, 2, 3]);

    let mut lines = Vec::new();
    for_each_line(&path, BUF, |l| {
        lines.push(l.to_string());
        Ok(())
    })
    .unwrap();
    assert_eq!(lines[0], "{\"a\":1}");
}

#[test]
fn invalid_json_line_reports_position() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ror_matches.jsonl");
    write_lines(&path, &["{\"a\":1}".into(), "".into(), "{oops".into()]);
    let dataset = *dataset_table::by_config_name("ror_matches").unwrap();
    let err = RecordStream::open(&path, &dataset, BUF).unwrap().collect::<Result<Vec<_>, _>>().unwrap_err();
    assert!(format!("{:#}", err).contains("ror_matches.jsonl:3: invalid JSON"), "{err:#}");
}

#[test]
fn string_array_items_are_wrapped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unique_affiliations.json");
    fs::write(&path, json!(["Univ A", {"affiliation": "Univ B"}]).to_string()).unwrap();
    let dataset = *dataset_table::by_config_name("unique_affiliations").unwrap();

    let records: Vec<_> = RecordStream::open(&path, &dataset, BUF).unwrap().map(Result::unwrap).collect();
    assert_eq!(records, vec![json!({"affiliation": "Univ A"}), json!({"affiliation": "Univ B"})]);
    assert_eq!(count_records(&path, &dataset, BUF).unwrap(), 2);
}

#[test]
fn array_items_must_be_objects_or_strings() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unique_affiliations.json");
    fs::write(&path, "[\"ok\", 42]").unwrap();
    let dataset = *dataset_table::by_config_name("unique_affiliations").unwrap();
    let err = RecordStream::open(&path, &dataset, BUF).unwrap().collect::<Result<Vec<_>, _>>().unwrap_err();
    assert!(err.to_string().contains("unique_affiliations.json[1]: Expected object, got number"), "{err}");
}

#[test]
fn array_file_must_hold_an_array() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("unique_affiliations.json");
    fs::write(&path, "{\"not\": \"an array\"}").unwrap();
    let dataset = *dataset_table::by_config_name("unique_affiliations").unwrap();
    assert!(RecordStream::open(&path, &dataset, BUF).is_err());
}

#[test]
fn dataset_selection_keeps_table_order() {
    let picked = dataset_table::select(&["disagreements", "ror_matches"]).unwrap();
    let names: Vec<_> = picked.iter().map(|d| d.config_name).collect();
    assert_eq!(names, vec!["ror_matches", "disagreements"]);
    assert!(dataset_table::select(&["nope"]).is_err());
    assert_eq!(dataset_table::all().len(), 8);
}
