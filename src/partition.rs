//! Type partition over a column-statistics snapshot.
//!
//! The analytics service sends a flat list of per-column records with an
//! open-ended type label and a free-form stats map. Everything the view
//! needs (which types exist, which columns belong to the selected type,
//! which table headers to draw) is re-derived from the snapshot on demand.
//! The derivation is a pure O(columns × keys) scan, cheap enough to run on
//! every selection change without memoization.

use crate::client::{AnalyticsSnapshot, ColumnStat, StatValue};

/// Projection of a snapshot for one selected column type
pub struct TypePartition<'a> {
    /// Distinct type labels in first-occurrence order
    pub available_types: Vec<String>,
    /// Always a member of `available_types` when any types exist
    pub selected_type: Option<String>,
    /// Columns of the selected type, in original column order
    pub visible_columns: Vec<&'a ColumnStat>,
    /// Union of the visible columns' stats keys, in first-seen order
    pub header_keys: Vec<String>,
}

impl<'a> TypePartition<'a> {
    /// Derive the partition for `selected`. A selection that is absent from
    /// the snapshot (or `None`) falls back to the first available type. An
    /// empty snapshot yields empty sets.
    pub fn derive(snapshot: &'a AnalyticsSnapshot, selected: Option<&str>) -> TypePartition<'a> {
        let available_types = available_types(snapshot);

        let selected_type = selected
            .filter(|s| available_types.iter().any(|t| t == s))
            .map(|s| s.to_string())
            .or_else(|| available_types.first().cloned());

        let (visible_columns, header_keys) = match &selected_type {
            Some(selected_type) => project(snapshot, selected_type),
            None => (Vec::new(), Vec::new()),
        };

        TypePartition {
            available_types,
            selected_type,
            visible_columns,
            header_keys,
        }
    }

    /// Index of the selected type within `available_types` (drives the tabs)
    pub fn selected_index(&self) -> usize {
        match &self.selected_type {
            Some(selected) => self
                .available_types
                .iter()
                .position(|t| t == selected)
                .unwrap_or(0),
            None => 0,
        }
    }
}

/// Distinct type labels in first-occurrence order, deduplicated
pub fn available_types(snapshot: &AnalyticsSnapshot) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for column in &snapshot.columns {
        if !types.iter().any(|t| t == &column.column_type) {
            types.push(column.column_type.clone());
        }
    }
    types
}

/// Re-validate a previous type selection against a (possibly new) snapshot.
/// A vanished selection resets to the snapshot's first available type.
pub fn validate_selection(snapshot: &AnalyticsSnapshot, previous: Option<&str>) -> Option<String> {
    TypePartition::derive(snapshot, previous).selected_type
}

/// Filtered columns plus the first-seen union of their stats keys.
/// The union (not intersection) guarantees a row missing a key still gets a
/// cell, rendered as a placeholder rather than dropping the column.
fn project<'a>(
    snapshot: &'a AnalyticsSnapshot,
    selected_type: &str,
) -> (Vec<&'a ColumnStat>, Vec<String>) {
    let mut visible: Vec<&ColumnStat> = Vec::new();
    let mut header_keys: Vec<String> = Vec::new();

    for column in &snapshot.columns {
        if column.column_type != selected_type {
            continue;
        }
        for key in column.stat_keys() {
            if !header_keys.iter().any(|k| k == key) {
                header_keys.push(key.clone());
            }
        }
        visible.push(column);
    }

    (visible, header_keys)
}

/// Cosmetic label for a raw stats key: word separators become spaces.
/// The raw key stays untouched for lookups.
pub fn header_label(key: &str) -> String {
    key.replace('_', " ")
}

/// Render a statistic value for a table cell, using `placeholder` for Absent.
/// Never empty: the placeholder stands in wherever a value is missing.
pub fn format_stat(value: &StatValue, placeholder: &str) -> String {
    match value {
        StatValue::Number(n) => format!("{}", n),
        StatValue::Text(s) if s.is_empty() => placeholder.to_string(),
        StatValue::Text(s) => s.clone(),
        StatValue::Absent => placeholder.to_string(),
    }
}
