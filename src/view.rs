//! Display projection of repository state.
//!
//! Everything here is a pure function of the task list and display config;
//! nothing mutates tasks.

use chrono::{Local, Utc};
use serde::Serialize;

use crate::config::{DisplayConfig, TimeZoneChoice};
use crate::controller::Mode;
use crate::task::{Due, TaskId, TaskRecord};

pub const COLOR_COMPLETED: &str = "#4CAF50";
pub const COLOR_OPEN: &str = "#FFFFFF";

/// Share of completed tasks in `[0, 100]`, unrounded
pub fn completion_percentage(tasks: &[TaskRecord]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let completed = tasks.iter().filter(|task| task.completed).count();
    100.0 * completed as f64 / tasks.len() as f64
}

/// Rounded percentage for labels
pub fn rounded_percentage(percentage: f64) -> u8 {
    percentage.clamp(0.0, 100.0).round() as u8
}

/// Render a due date, or the placeholder when it is not a valid timestamp
pub fn format_due(due: &Due, config: &DisplayConfig) -> String {
    format_due_with(due, &config.date_format, config.timezone)
        .unwrap_or_else(|| config.placeholder.clone())
}

/// Render with an explicit pattern; `None` when the due date is not a valid timestamp
pub fn format_due_with(due: &Due, pattern: &str, zone: TimeZoneChoice) -> Option<String> {
    let at = due.to_datetime()?;
    Some(match zone {
        TimeZoneChoice::Local => at.with_timezone(&Local).format(pattern).to_string(),
        TimeZoneChoice::Utc => at.with_timezone(&Utc).format(pattern).to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DisplayStyle {
    pub strikethrough: bool,
    pub color: &'static str,
}

pub fn display_style(completed: bool) -> DisplayStyle {
    if completed {
        DisplayStyle {
            strikethrough: true,
            color: COLOR_COMPLETED,
        }
    } else {
        DisplayStyle {
            strikethrough: false,
            color: COLOR_OPEN,
        }
    }
}

/// Label of the complete/uncomplete action for a row
pub fn action_label(completed: bool) -> &'static str {
    if completed {
        "Completed"
    } else {
        "Complete"
    }
}

/// Label of the form's submit action
pub fn submit_label(mode: &Mode) -> &'static str {
    match mode {
        Mode::Creating => "Add Task",
        Mode::Editing(_) => "Edit Task",
    }
}

/// One table row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRow {
    /// 1-based display position
    pub index: usize,
    pub id: TaskId,
    pub title: String,
    pub due: String,
    pub completed: bool,
    pub style: DisplayStyle,
    pub action: &'static str,
}

pub fn rows(tasks: &[TaskRecord], config: &DisplayConfig) -> Vec<TaskRow> {
    tasks
        .iter()
        .enumerate()
        .map(|(pos, task)| TaskRow {
            index: pos + 1,
            id: task.id,
            title: task.title.clone(),
            due: format_due(&task.due, config),
            completed: task.completed,
            style: display_style(task.completed),
            action: action_label(task.completed),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    pub completed: usize,
    pub total: usize,
    pub percentage: f64,
    pub rounded: u8,
}

impl ProgressView {
    pub fn of(tasks: &[TaskRecord]) -> Self {
        let percentage = completion_percentage(tasks);
        Self {
            completed: tasks.iter().filter(|task| task.completed).count(),
            total: tasks.len(),
            percentage,
            rounded: rounded_percentage(percentage),
        }
    }

    /// Fill ratio in `[0, 1]` for gauges
    pub fn ratio(&self) -> f64 {
        self.percentage / 100.0
    }

    pub fn label(&self) -> String {
        format!("Progress: {}%", self.rounded)
    }
}
