//! Change-diff engine: field-level differences between two callback
//! snapshots, rendered as human-readable audit text.
//!
//! Pure functions; the database layer decides whether a diff warrants an
//! activity entry (an empty diff never does).

use serde_json::Value;

use crate::model::Snapshot;

/// One field that differs between two snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub field: String,
    pub old: Value,
    pub new: Value,
}

impl std::fmt::Display for FieldChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} → {}",
            self.field,
            render(&self.old),
            render(&self.new)
        )
    }
}

/// Compute the changes between two snapshots.
///
/// Only keys present in both snapshots are considered; a key missing on
/// either side is ignored, not treated as a change. Comparison is strict
/// value inequality. Output is ordered by field name (snapshot key order).
pub fn diff(before: &Snapshot, after: &Snapshot) -> Vec<FieldChange> {
    after
        .iter()
        .filter_map(|(field, new)| {
            let old = before.get(field)?;
            (old != new).then(|| FieldChange {
                field: field.clone(),
                old: old.clone(),
                new: new.clone(),
            })
        })
        .collect()
}

/// Summarize a non-empty change list for an edit activity description.
///
/// Spells out at most three changes, then appends a count of the rest.
pub fn describe(changes: &[FieldChange]) -> String {
    let shown: Vec<String> = changes.iter().take(3).map(|c| c.to_string()).collect();
    let mut text = format!("Updated {} fields: {}", changes.len(), shown.join(", "));
    if changes.len() > 3 {
        text.push_str(&format!("... and {} more", changes.len() - 3));
    }
    text
}

/// Render a snapshot value for display without JSON quoting noise.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
