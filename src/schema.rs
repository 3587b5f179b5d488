//! Normalization of the stored `"todos"` blob.
//!
//! The blob has drifted over time: completion lives under `is_completed`, the
//! in-memory mirror `isDone`, or `completed`; `due` may be a number, a numeric
//! string, missing, or junk. Each record is classified into a
//! [`SchemaVersion`] and lifted into a canonical [`TaskRecord`] here, so the
//! rest of the crate only ever sees the canonical shape.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::task::{first_free_id, Due, TaskId, TaskRecord};

const FIELD_ID: &str = "id";
const FIELD_TITLE: &str = "task_title";
const FIELD_TITLE_ALT: &str = "title";
const FIELD_DUE: &str = "due";
const FIELD_COMPLETED: &str = "is_completed";
const FIELD_DONE_MIRROR: &str = "isDone";
const FIELD_COMPLETED_ALT: &str = "completed";
const CANONICAL_FIELDS: [&str; 4] = [FIELD_ID, FIELD_TITLE, FIELD_DUE, FIELD_COMPLETED];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// Exactly the shape this crate writes
    Canonical,
    /// Anything else that can still be lifted into a record
    Legacy,
}

/// Result of decoding one blob
#[derive(Debug, Clone, Default)]
pub struct Decoded {
    pub tasks: Vec<TaskRecord>,
    /// Records that needed normalization
    pub legacy: usize,
    /// Entries that were not objects and were skipped
    pub dropped: usize,
    /// Records that received a fresh id (missing or duplicate)
    pub reassigned: usize,
}

/// Decode a stored blob into canonical records.
///
/// Errors only when the blob is not a JSON array; individual bad entries are
/// skipped or repaired. `now_ms` stands in for missing due dates.
///
/// The first record carrying an id keeps it. Records with a missing or
/// repeated id get one above every explicit id in the blob, numbered in list
/// order, so decoding the same blob twice yields the same ids.
pub fn decode_blob(blob: &str, now_ms: i64) -> Result<Decoded> {
    let value: Value = serde_json::from_str(blob)?;
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Null => Vec::new(),
        other => {
            return Err(Error::OperationFailed(format!(
                "stored task list is a JSON {}, expected an array",
                json_kind(&other)
            )))
        }
    };

    let mut decoded = Decoded::default();
    let mut pending: Vec<(Option<TaskId>, String, Due, bool)> = Vec::with_capacity(entries.len());

    for (idx, entry) in entries.into_iter().enumerate() {
        let Value::Object(obj) = entry else {
            warn!(index = idx, "dropping stored task that is not an object");
            decoded.dropped += 1;
            continue;
        };
        if classify(&obj) == SchemaVersion::Legacy {
            decoded.legacy += 1;
        }
        pending.push((
            read_id(&obj),
            read_title(&obj),
            read_due(obj.get(FIELD_DUE), now_ms),
            read_completed(&obj),
        ));
    }

    let explicit: HashSet<TaskId> = pending.iter().filter_map(|(id, ..)| *id).collect();
    let base = explicit
        .iter()
        .map(|id| id.get())
        .max()
        .and_then(|max| max.checked_add(1))
        .unwrap_or(1);
    let mut taken = explicit;
    let mut claimed: HashSet<TaskId> = HashSet::new();
    for (id, title, due, completed) in pending {
        let id = match id {
            Some(id) if claimed.insert(id) => id,
            _ => {
                let fresh = first_free_id(base, &taken);
                taken.insert(fresh);
                decoded.reassigned += 1;
                warn!(id = %fresh, "assigned fresh id to stored task with missing or duplicate id");
                fresh
            }
        };
        decoded.tasks.push(TaskRecord {
            id,
            title,
            due,
            completed,
        });
    }

    if decoded.legacy > 0 {
        debug!(
            legacy = decoded.legacy,
            total = decoded.tasks.len(),
            "normalized legacy task records"
        );
    }
    Ok(decoded)
}

/// Encode records into the canonical blob
pub fn encode_blob(tasks: &[TaskRecord]) -> Result<String> {
    Ok(serde_json::to_string(tasks)?)
}

/// Classify one stored record
pub fn classify(obj: &Map<String, Value>) -> SchemaVersion {
    let canonical = obj.len() == CANONICAL_FIELDS.len()
        && obj.get(FIELD_ID).is_some_and(|v| v.as_i64().is_some())
        && obj.get(FIELD_TITLE).is_some_and(Value::is_string)
        && obj.get(FIELD_DUE).is_some_and(|v| v.as_i64().is_some())
        && obj.get(FIELD_COMPLETED).is_some_and(Value::is_boolean);
    if canonical {
        SchemaVersion::Canonical
    } else {
        SchemaVersion::Legacy
    }
}

fn read_id(obj: &Map<String, Value>) -> Option<TaskId> {
    match obj.get(FIELD_ID)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .map(TaskId),
        Value::String(s) => s.trim().parse::<i64>().ok().map(TaskId),
        _ => None,
    }
}

fn read_title(obj: &Map<String, Value>) -> String {
    match obj.get(FIELD_TITLE).or_else(|| obj.get(FIELD_TITLE_ALT)) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Missing and falsy values default to `now_ms`; non-numeric text is kept.
pub fn read_due(value: Option<&Value>, now_ms: i64) -> Due {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Due::At(now_ms),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => Due::At(now_ms),
            Some(ms) => Due::At(ms),
            None => match n.as_f64() {
                Some(f) if f == 0.0 => Due::At(now_ms),
                Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Due::At(f.trunc() as i64),
                _ => Due::Unparsed(n.to_string()),
            },
        },
        Some(Value::String(s)) => parse_due_text(s, now_ms),
        Some(other) => Due::Unparsed(other.to_string()),
    }
}

fn parse_due_text(raw: &str, now_ms: i64) -> Due {
    let trimmed = raw.trim();
    if raw.is_empty() {
        return Due::At(now_ms);
    }
    if let Ok(ms) = trimmed.parse::<i64>() {
        return Due::At(ms);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Due::At(f.trunc() as i64),
        _ => Due::Unparsed(raw.to_string()),
    }
}

fn read_completed(obj: &Map<String, Value>) -> bool {
    [FIELD_COMPLETED, FIELD_DONE_MIRROR, FIELD_COMPLETED_ALT]
        .iter()
        .find_map(|key| obj.get(*key))
        .map(truthy)
        .unwrap_or(false)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NOW: i64 = 1_800_000_000_000;

    #[test]
    fn canonical_blob_decodes_without_drift() {
        let blob = r#"[{"id":1700000000000,"task_title":"Buy milk","due":1700000000000,"is_completed":true}]"#;
        let decoded = decode_blob(blob, NOW).unwrap();
        assert_eq!(decoded.legacy, 0);
        assert_eq!(decoded.tasks.len(), 1);
        let task = &decoded.tasks[0];
        assert_eq!(task.id, TaskId(1_700_000_000_000));
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.due, Due::At(1_700_000_000_000));
        assert!(task.completed);

        assert_eq!(encode_blob(&decoded.tasks).unwrap(), blob);
    }

    #[test]
    fn legacy_fields_are_normalized() {
        let blob = json!([
            {"id": 1, "task_title": "mirror only", "due": "1700000000000", "isDone": true},
            {"id": 2, "title": "alt title", "completed": 1},
            {"id": "3", "task_title": "string id", "due": 1.7e12, "is_completed": false, "isDone": true},
        ])
        .to_string();

        let decoded = decode_blob(&blob, NOW).unwrap();
        assert_eq!(decoded.legacy, 3);
        let tasks = decoded.tasks;
        assert_eq!(tasks[0].due, Due::At(1_700_000_000_000));
        assert!(tasks[0].completed);
        assert_eq!(tasks[1].title, "alt title");
        assert_eq!(tasks[1].due, Due::At(NOW));
        assert!(tasks[1].completed);
        assert_eq!(tasks[2].id, TaskId(3));
        assert_eq!(tasks[2].due, Due::At(1_700_000_000_000));
        // is_completed wins over the mirror
        assert!(!tasks[2].completed);
    }

    #[test]
    fn falsy_due_defaults_to_now_and_junk_is_kept() {
        assert_eq!(read_due(None, NOW), Due::At(NOW));
        assert_eq!(read_due(Some(&json!(null)), NOW), Due::At(NOW));
        assert_eq!(read_due(Some(&json!(0)), NOW), Due::At(NOW));
        assert_eq!(read_due(Some(&json!("")), NOW), Due::At(NOW));
        assert_eq!(read_due(Some(&json!("0")), NOW), Due::At(0));
        assert_eq!(
            read_due(Some(&json!("not-a-number")), NOW),
            Due::Unparsed("not-a-number".to_string())
        );
        assert_eq!(read_due(Some(&json!(true)), NOW), Due::Unparsed("true".to_string()));
    }

    #[test]
    fn missing_and_duplicate_ids_get_fresh_unique_ids() {
        let blob = json!([
            {"id": 10, "task_title": "a", "due": 1, "is_completed": false},
            {"task_title": "no id", "due": 1, "is_completed": false},
            {"id": 10, "task_title": "dupe", "due": 1, "is_completed": false},
        ])
        .to_string();

        let decoded = decode_blob(&blob, 5).unwrap();
        assert_eq!(decoded.reassigned, 2);
        let ids: HashSet<TaskId> = decoded.tasks.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(decoded.tasks[0].id, TaskId(10));
        assert!(decoded.tasks[1].id > TaskId(10));
        assert!(decoded.tasks[2].id > decoded.tasks[1].id);
    }

    #[test]
    fn missing_id_never_takes_an_id_claimed_later() {
        let blob = json!([
            {"task_title": "no id", "due": 1, "is_completed": false},
            {"id": NOW, "task_title": "real", "due": 1, "is_completed": false},
        ])
        .to_string();

        let decoded = decode_blob(&blob, NOW).unwrap();
        assert_eq!(decoded.reassigned, 1);
        assert_eq!(decoded.tasks[1].id, TaskId(NOW));
        assert_ne!(decoded.tasks[0].id, TaskId(NOW));
    }

    #[test]
    fn repaired_ids_are_stable_across_decodes() {
        let blob = r#"[{"title":"a"},{"title":"b"},{"id":7,"title":"c"}]"#;
        let first = decode_blob(blob, NOW).unwrap();
        let second = decode_blob(blob, NOW + 60_000).unwrap();
        let ids = |d: &Decoded| d.tasks.iter().map(|t| t.id).collect::<Vec<_>>();
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(ids(&first), vec![TaskId(8), TaskId(9), TaskId(7)]);
    }

    #[test]
    fn repair_at_the_top_of_the_id_range_terminates() {
        let blob = json!([
            {"id": i64::MAX, "task_title": "top"},
            {"id": i64::MAX, "task_title": "dupe"},
        ])
        .to_string();

        let decoded = decode_blob(&blob, NOW).unwrap();
        assert_eq!(decoded.tasks[0].id, TaskId(i64::MAX));
        assert_eq!(decoded.tasks[1].id, TaskId(1));
    }

    #[test]
    fn non_objects_are_dropped() {
        let decoded = decode_blob(r#"[1, "x", {"id": 4, "task_title": "kept"}]"#, NOW).unwrap();
        assert_eq!(decoded.dropped, 2);
        assert_eq!(decoded.tasks.len(), 1);
        assert_eq!(decoded.tasks[0].title, "kept");
    }

    #[test]
    fn non_array_blob_is_an_error() {
        assert!(decode_blob(r#"{"id": 1}"#, NOW).is_err());
        assert!(decode_blob("not json", NOW).is_err());
        assert!(decode_blob("null", NOW).unwrap().tasks.is_empty());
    }

    #[test]
    fn classify_flags_extra_fields() {
        let canonical = json!({"id": 1, "task_title": "a", "due": 2, "is_completed": false});
        let mirrored = json!({"id": 1, "task_title": "a", "due": 2, "is_completed": false, "isDone": false});
        assert_eq!(
            classify(canonical.as_object().unwrap()),
            SchemaVersion::Canonical
        );
        assert_eq!(classify(mirrored.as_object().unwrap()), SchemaVersion::Legacy);
    }
}
