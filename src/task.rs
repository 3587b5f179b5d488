//! Task records.
//!
//! A task is identified by a millisecond timestamp taken at creation. The
//! canonical serialized form is the one written to the `"todos"` slot:
//! `{"id":…,"task_title":…,"due":…,"is_completed":…}`.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};

/// Stable identity of a task: its creation time in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TaskId(pub i64);

impl TaskId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(TaskId)
            .map_err(|_| Error::InvalidArgument(format!("invalid task id '{s}'")))
    }
}

/// When a task is due.
///
/// Stored values that are not numbers are kept verbatim so re-saving never
/// loses them; they render as the "no date" placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Due {
    At(i64),
    Unparsed(String),
}

impl Due {
    pub fn now() -> Self {
        Due::At(now_millis())
    }

    pub fn millis(&self) -> Option<i64> {
        match self {
            Due::At(ms) => Some(*ms),
            Due::Unparsed(_) => None,
        }
    }

    /// `None` for unparsed values and for millis outside chrono's range
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        self.millis().and_then(DateTime::from_timestamp_millis)
    }
}

impl From<DateTime<Utc>> for Due {
    fn from(value: DateTime<Utc>) -> Self {
        Due::At(value.timestamp_millis())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub id: TaskId,
    #[serde(rename = "task_title")]
    pub title: String,
    pub due: Due,
    #[serde(rename = "is_completed")]
    pub completed: bool,
}

impl TaskRecord {
    pub fn new(id: TaskId, title: impl Into<String>, due: Due) -> Self {
        Self {
            id,
            title: title.into(),
            due,
            completed: false,
        }
    }
}

/// Current wall-clock time in epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Next id for a new task: the clock, bumped past every existing id.
///
/// Two creates inside the same millisecond (or a clock stepping backwards)
/// would otherwise collide.
pub fn next_task_id(tasks: &[TaskRecord], now_ms: i64) -> TaskId {
    let Some(max) = tasks.iter().map(|task| task.id.get()).max() else {
        return TaskId(now_ms);
    };
    match max.checked_add(1) {
        Some(floor) => TaskId(now_ms.max(floor)),
        // i64::MAX is taken, nothing lies above it
        None => {
            let taken: HashSet<TaskId> = tasks.iter().map(|task| task.id).collect();
            first_free_id(now_ms, &taken)
        }
    }
}

/// First id at or after `start` not in `taken`, wrapping to `i64::MIN`
/// once the top of the range is exhausted.
pub fn first_free_id(start: i64, taken: &HashSet<TaskId>) -> TaskId {
    (start..=i64::MAX)
        .chain(i64::MIN..start)
        .map(TaskId)
        .find(|id| !taken.contains(id))
        .unwrap_or(TaskId(start))
}
