use matchpub::{error_label, format_count, format_percent, format_size, size_category, TopCounter};
use serde_json::json;

#[test]
fn sizes_counts_and_rates() {
    assert_eq!(format_size(0), "0.00 B");
    assert_eq!(format_size(512), "512.00 B");
    assert_eq!(format_size(1536), "1.50 KB");
    assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.00 GB");
    assert_eq!(format_size(1u64 << 50), "1.00 PB");

    assert_eq!(format_count(0), "0");
    assert_eq!(format_count(999), "999");
    assert_eq!(format_count(1000), "1,000");
    assert_eq!(format_count(1_234_567), "1,234,567");

    assert_eq!(format_percent(0.5), "50.00%");
    assert_eq!(format_percent(0.123456), "12.35%");
}

#[test]
fn size_buckets() {
    assert_eq!(size_category(0), "n<1K");
    assert_eq!(size_category(999), "n<1K");
    assert_eq!(size_category(1_000), "1K<n<10K");
    assert_eq!(size_category(250_000_000), "100M<n<1B");
    assert_eq!(size_category(5_000_000_000_000), "n>1T");
}

#[test]
fn error_labels() {
    assert_eq!(error_label(&json!({}), 100), "unknown");
    assert_eq!(error_label(&json!({"error": null}), 100), "unknown");
    assert_eq!(error_label(&json!({"error": ""}), 100), "unknown");
    assert_eq!(error_label(&json!({"error": 0}), 100), "unknown");
    assert_eq!(error_label(&json!({"error": false}), 100), "unknown");
    assert_eq!(error_label(&json!({"error": []}), 100), "unknown");
    assert_eq!(error_label(&json!({"error": {}}), 100), "unknown");
    assert_eq!(error_label(&json!({"error": ["x"]}), 100), r#"["x"]"#);
    assert_eq!(error_label(&json!({"error": 503}), 100), "503");
    assert_eq!(error_label(&json!({"error": "timeout"}), 100), "timeout");
    assert_eq!(error_label(&json!({"error": "abcdef"}), 3), "abc...");
    assert_eq!(error_label(&json!({"error": "ééééé"}), 4), "éééé...");
}

#[test]
fn top_counter_breaks_ties_by_first_seen() {
    let mut c = TopCounter::new();
    for k in ["b", "a", "c", "a", "c", "d"] {
        c.add(k.to_string());
    }
    assert_eq!(c.len(), 4);
    assert_eq!(c.total(), 6);
    assert_eq!(
        c.most_common(3),
        vec![("a".to_string(), 2), ("c".to_string(), 2), ("b".to_string(), 1)]
    );
    assert_eq!(c.in_insertion_order()[0], ("b".to_string(), 1));
}
