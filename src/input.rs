//! Parsing of user-typed due dates and task references.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::config::TimeZoneChoice;
use crate::error::{Error, Result};
use crate::task::{Due, TaskId, TaskRecord};

const NAIVE_FORMATS: [&str; 5] = [
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];
const DATE_ONLY_FORMATS: [&str; 2] = ["%d/%m/%Y", "%Y-%m-%d"];

/// Parse a due date typed by the user.
///
/// Accepts `DD/MM/YYYY HH:mm`, ISO-like local date-times, bare dates
/// (midnight), RFC 3339, and integer epoch milliseconds. Wall-clock forms are
/// read in `zone`.
pub fn parse_due(raw: &str, zone: TimeZoneChoice) -> Result<Due> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidDue(raw.to_string()));
    }

    if let Ok(ms) = trimmed.parse::<i64>() {
        if DateTime::from_timestamp_millis(ms).is_some() {
            return Ok(Due::At(ms));
        }
        return Err(Error::InvalidDue(raw.to_string()));
    }

    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(Due::At(at.timestamp_millis()));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_ONLY_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| Error::InvalidDue(raw.to_string()))?;

    let at = match zone {
        TimeZoneChoice::Utc => Some(Utc.from_utc_datetime(&naive)),
        // DST gaps have no local time; folds take the earlier instant
        TimeZoneChoice::Local => Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|at| at.with_timezone(&Utc)),
    };
    at.map(Due::from)
        .ok_or_else(|| Error::InvalidDue(raw.to_string()))
}

/// How a command names a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// 1-based display position
    Position(usize),
    Id(TaskId),
}

impl Target {
    pub fn parse(raw: &str, by_id: bool) -> Result<Self> {
        if by_id {
            return raw.parse::<TaskId>().map(Target::Id);
        }
        let position = raw.trim().trim_start_matches('#').parse::<usize>().map_err(|_| {
            Error::InvalidArgument(format!(
                "'{raw}' is not a list position (use --id to pass a task id)"
            ))
        })?;
        Ok(Target::Position(position))
    }

    /// Resolve to a stable id against the current list.
    ///
    /// Ids are returned as-is; whether they exist is up to the operation.
    pub fn resolve(self, tasks: &[TaskRecord]) -> Result<TaskId> {
        match self {
            Target::Id(id) => Ok(id),
            Target::Position(position) => position
                .checked_sub(1)
                .and_then(|idx| tasks.get(idx))
                .map(|task| task.id)
                .ok_or(Error::PositionOutOfRange {
                    position,
                    len: tasks.len(),
                }),
        }
    }
}
