use anaflow::client::{AnalyticsSnapshot, StatValue};
use anaflow::partition::{available_types, format_stat, validate_selection, TypePartition};

fn snapshot(json: &str) -> AnalyticsSnapshot {
    serde_json::from_str(json).unwrap()
}

fn people() -> AnalyticsSnapshot {
    snapshot(
        r#"{"filename": "people.csv", "columns": [
            {"name": "age", "type": "Integer",
             "stats": {"missing_values": 0, "total_count": 100, "mean": 31.4, "max": 90}},
            {"name": "name", "type": "String",
             "stats": {"missing_values": 2, "unique_count": 98, "most_frequent": "Anna"}},
            {"name": "height", "type": "Float",
             "stats": {"missing_values": 1, "mean": 1.72, "std": 0.11}},
            {"name": "salary", "type": "Integer",
             "stats": {"missing_values": 5, "median": 52000}},
            {"name": "city", "type": "String",
             "stats": {"unique_count": 12}}
        ]}"#,
    )
}

#[test]
fn test_available_types_count_and_order() {
    let snap = people();
    let types = available_types(&snap);
    assert_eq!(types, ["Integer", "String", "Float"]);
}

#[test]
fn test_partition_is_exhaustive_over_columns() {
    let snap = people();
    let total: usize = available_types(&snap)
        .iter()
        .map(|t| TypePartition::derive(&snap, Some(t)).visible_columns.len())
        .sum();
    assert_eq!(total, snap.columns.len());
}

#[test]
fn test_visible_columns_preserve_original_order() {
    let snap = people();
    let partition = TypePartition::derive(&snap, Some("Integer"));
    let names: Vec<&str> = partition
        .visible_columns
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, ["age", "salary"]);
}

#[test]
fn test_header_keys_union_in_first_seen_order() {
    let snap = people();
    let partition = TypePartition::derive(&snap, Some("Integer"));
    assert_eq!(
        partition.header_keys,
        ["missing_values", "total_count", "mean", "max", "median"]
    );

    // salary has no "mean": the cell renders the placeholder, the column stays
    let salary = partition.visible_columns[1];
    assert_eq!(format_stat(&salary.stat("mean"), "-"), "-");
    assert_eq!(format_stat(&salary.stat("median"), "-"), "52000");
}

#[test]
fn test_derivation_is_idempotent() {
    let snap = people();
    let first = TypePartition::derive(&snap, Some("String"));
    let second = TypePartition::derive(&snap, Some("String"));

    let names =
        |p: &TypePartition| -> Vec<String> { p.visible_columns.iter().map(|c| c.name.clone()).collect() };
    assert_eq!(names(&first), names(&second));
    assert_eq!(first.header_keys, second.header_keys);
    assert_eq!(first.available_types, second.available_types);
}

#[test]
fn test_unknown_selection_falls_back_to_first_type() {
    let snap = people();
    let partition = TypePartition::derive(&snap, Some("Boolean"));
    assert_eq!(partition.selected_type.as_deref(), Some("Integer"));

    assert_eq!(
        validate_selection(&snap, Some("Boolean")),
        Some("Integer".to_string())
    );
    assert_eq!(
        validate_selection(&snap, Some("Float")),
        Some("Float".to_string())
    );
}

#[test]
fn test_empty_snapshot_is_harmless() {
    let snap = snapshot(r#"{"filename": "empty.csv", "columns": []}"#);
    let partition = TypePartition::derive(&snap, Some("Integer"));
    assert!(partition.available_types.is_empty());
    assert!(partition.selected_type.is_none());
    assert!(partition.visible_columns.is_empty());
    assert!(partition.header_keys.is_empty());
}

#[test]
fn test_end_to_end_numeric_projection() {
    // Scenario from the analytics view: two columns, two types
    let snap = snapshot(
        r#"{"filename": "demo.csv", "columns": [
            {"name": "age", "type": "numeric", "stats": {"mean": 30, "missing": 0}},
            {"name": "city", "type": "categorical", "stats": {"unique": 5}}
        ]}"#,
    );

    assert_eq!(available_types(&snap), ["numeric", "categorical"]);

    let partition = TypePartition::derive(&snap, Some("numeric"));
    assert_eq!(partition.visible_columns.len(), 1);
    assert_eq!(partition.visible_columns[0].name, "age");
    assert_eq!(partition.header_keys, ["mean", "missing"]);
    assert_eq!(partition.visible_columns[0].stat("mean"), StatValue::Number(30.0));
    assert_eq!(partition.visible_columns[0].stat("missing"), StatValue::Number(0.0));
}
