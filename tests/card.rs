#[path = "common/mod.rs"]
mod common;

use common::*;
use matchpub::{render_readme, CardInfo, DatasetStats, Publisher};

fn basic_stats() -> DatasetStats {
    let base = make_input_basic();
    Publisher::new().input_dir(&base).output_dir(base.join("out")).progress(false).collect_stats().unwrap()
}

#[test]
fn front_matter_lists_every_configuration() {
    let readme = render_readme(&basic_stats(), &CardInfo::default(), 2025);
    assert!(readme.starts_with("---\nlicense: cc0-1.0\n"));
    for name in matchpub::dataset_table::config_names() {
        assert!(readme.contains(&format!("  - config_name: {name}\n")), "{name}");
        assert!(readme.contains(&format!("path: data/{name}/*.parquet")), "{name}");
    }
    assert!(readme.contains("size_categories:\n  - n<1K"));
}

#[test]
fn statistics_tables_are_filled() {
    let stats = basic_stats();
    let readme = render_readme(&stats, &CardInfo::default(), 2025);

    assert!(readme.contains("- **Total Records:** 33"));
    assert!(readme.contains("- **Match Rate:** 50.00%"));
    assert!(readme.contains("| `ror_matches` | 4 |"));
    assert!(readme.contains("| https://ror.org/A | 2 |"));
    assert!(readme.contains("| timeout | 2 |"));
    // Pipes inside an error label would break the table.
    assert!(readme.contains("| upstream \\| xxx"));
    assert!(readme.contains("| Overlap with new matches | 3 |"));
    assert!(readme.contains("| Agreement rate | 33.33% |"));
    assert!(readme.contains("| Disagreement rate | 66.67% |"));
    assert!(readme.contains("| Match-type disagreements | 1 |"));
    assert!(readme.contains("| User-type disagreements | 1 |"));
    assert!(readme.contains("| Org X (https://ror.org/X) | Org B (https://ror.org/B) | 1 |"));
    assert!(readme.contains("### `existing_assignments_aggregated`"));
    assert!(readme.contains("- `affiliation_hash` (string): MD5 hash of the normalized affiliation string"));
}

#[test]
fn empty_stats_render_placeholders() {
    let readme = render_readme(&DatasetStats::default(), &CardInfo::default(), 2025);
    assert!(readme.contains("| ROR ID | Count |\n|--------|-------|\nNo data available"));
    assert!(readme.contains("| Error Type | Count |\n|------------|-------|\nNo data available"));
    assert!(readme.contains("No disagreements found"));
    assert!(readme.contains("- **Match Rate:** 0.00%"));
}

#[test]
fn usage_and_citation_follow_repo_id() {
    let card = CardInfo { repo_id: "someone/affils".to_string(), ..CardInfo::default() };
    let readme = render_readme(&DatasetStats::default(), &card, 2031);
    assert!(readme.contains(r#"load_dataset("someone/affils", "ror_matches")"#));
    assert!(readme.contains("url = {https://huggingface.co/datasets/someone/affils}"));
    assert!(readme.contains("year = {2031}"));
    assert!(readme.contains("@dataset{datacite_affiliations_ror,"));
    assert!(readme.contains(&format!("- **ROR Version:** [{}]({})", card.ror_version, card.ror_doi)));
}

#[test]
fn write_card_creates_readme() {
    let base = make_input_basic();
    let out = base.join("out");
    std::fs::create_dir_all(&out).unwrap();
    let publisher = Publisher::new().input_dir(&base).output_dir(&out).progress(false);
    let stats = publisher.collect_stats().unwrap();
    let path = publisher.write_card(&stats).unwrap();
    assert_eq!(path, out.join("README.md"));
    let text = std::fs::read_to_string(path).unwrap();
    assert!(text.contains("# DataCite Affiliations Matched to ROR"));
}
