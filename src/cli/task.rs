//! tm task command implementations.

use serde::Serialize;

use crate::cli::Context;
use crate::controller::SubmitOutcome;
use crate::error::{Error, Result};
use crate::input::{parse_due, Target};
use crate::notify::ConsoleNotifier;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::repository::TaskRepository;
use crate::task::{TaskId, TaskRecord};
use crate::view::{self, ProgressView, TaskRow};

const TITLE_COLUMN_MAX: usize = 40;

pub struct AddOptions {
    pub title: String,
    pub due: Option<String>,
}

pub struct EditOptions {
    pub target: String,
    pub by_id: bool,
    pub title: Option<String>,
    pub due: Option<String>,
}

pub struct RmOptions {
    pub target: String,
    pub by_id: bool,
    pub yes: bool,
}

#[derive(Serialize)]
struct TaskOutput {
    #[serde(flatten)]
    row: TaskRow,
    progress: ProgressView,
}

#[derive(Serialize)]
struct ToggleOutput {
    id: TaskId,
    completed: bool,
    progress: ProgressView,
}

#[derive(Serialize)]
struct RemoveOutput {
    id: TaskId,
    removed: bool,
    progress: ProgressView,
}

#[derive(Serialize)]
struct ListOutput {
    total: usize,
    tasks: Vec<TaskRow>,
    progress: ProgressView,
}

fn console(ctx: &Context, output: OutputOptions, yes: bool) -> ConsoleNotifier {
    ConsoleNotifier::new(
        output.quiet || output.json,
        yes || !ctx.config.prompts.confirm_delete,
    )
}

fn row_for(ctx: &Context, tasks: &[TaskRecord], id: TaskId) -> Result<TaskRow> {
    view::rows(tasks, &ctx.config.display)
        .into_iter()
        .find(|row| row.id == id)
        .ok_or(Error::TaskNotFound(id.get()))
}

fn push_task_summary(human: &mut HumanOutput, row: &TaskRow) {
    human.push_summary("#", row.index.to_string());
    human.push_summary("ID", row.id.to_string());
    human.push_summary("Title", row.title.clone());
    human.push_summary("Due", row.due.clone());
}

pub fn run_add(ctx: &Context, options: AddOptions, output: OutputOptions) -> Result<()> {
    let due = options
        .due
        .as_deref()
        .map(|raw| parse_due(raw, ctx.config.display.timezone))
        .transpose()?;

    let mut controller = ctx.controller(console(ctx, output, false));
    let id = controller.submit(&options.title, due)?.id();

    let row = row_for(ctx, controller.tasks(), id)?;
    let progress = ProgressView::of(controller.tasks());

    let mut human = HumanOutput::new("Task added");
    push_task_summary(&mut human, &row);
    human.push_summary("Progress", format!("{}%", progress.rounded));

    emit_success(output, "add", &TaskOutput { row, progress }, Some(&human))
}

pub fn run_edit(ctx: &Context, options: EditOptions, output: OutputOptions) -> Result<()> {
    if options.title.is_none() && options.due.is_none() {
        return Err(Error::InvalidArgument(
            "nothing to change; pass --title and/or --due".to_string(),
        ));
    }
    let due = options
        .due
        .as_deref()
        .map(|raw| parse_due(raw, ctx.config.display.timezone))
        .transpose()?;

    let mut controller = ctx.controller(console(ctx, output, false));
    let id = Target::parse(&options.target, options.by_id)?.resolve(controller.tasks())?;

    controller.begin_edit(id)?;
    let draft = controller.draft_mut();
    if let Some(title) = options.title {
        draft.title = title;
    }
    if due.is_some() {
        draft.due = due;
    }

    let outcome = controller.submit_draft()?;
    if let SubmitOutcome::Vanished(id) = outcome {
        return Err(Error::TaskNotFound(id.get()));
    }

    let row = row_for(ctx, controller.tasks(), id)?;
    let progress = ProgressView::of(controller.tasks());

    let mut human = HumanOutput::new("Task updated");
    push_task_summary(&mut human, &row);

    emit_success(output, "edit", &TaskOutput { row, progress }, Some(&human))
}

pub fn run_done(ctx: &Context, target: &str, by_id: bool, output: OutputOptions) -> Result<()> {
    let mut controller = ctx.controller(console(ctx, output, false));
    let target = Target::parse(target, by_id)?;
    let id = target.resolve(controller.tasks())?;
    let completed = match target {
        Target::Position(position) => controller.toggle_done(position - 1)?,
        Target::Id(id) => controller.toggle_done_by_id(id)?,
    };
    let progress = ProgressView::of(controller.tasks());

    let mut human = HumanOutput::new(if completed {
        "Task completed"
    } else {
        "Task reopened"
    });
    human.push_summary("ID", id.to_string());
    human.push_summary("Progress", format!("{}%", progress.rounded));

    emit_success(
        output,
        "done",
        &ToggleOutput {
            id,
            completed,
            progress,
        },
        Some(&human),
    )
}

pub fn run_rm(ctx: &Context, options: RmOptions, output: OutputOptions) -> Result<()> {
    let mut controller = ctx.controller(console(ctx, output, options.yes));
    let id = Target::parse(&options.target, options.by_id)?.resolve(controller.tasks())?;
    let existed = controller.repo().get(id).is_some();

    let removed = controller.request_delete(id)?;
    let progress = ProgressView::of(controller.tasks());

    let mut human = HumanOutput::new(if removed {
        "Task deleted"
    } else {
        "Nothing deleted"
    });
    human.push_summary("ID", id.to_string());
    if !existed {
        human.push_warning(format!("no task with id {id}"));
    }

    emit_success(
        output,
        "rm",
        &RemoveOutput {
            id,
            removed,
            progress,
        },
        Some(&human),
    )
}

pub fn run_list(ctx: &Context, output: OutputOptions) -> Result<()> {
    let repo = TaskRepository::open(ctx.open_store());
    let rows = view::rows(repo.tasks(), &ctx.config.display);
    let progress = ProgressView::of(repo.tasks());

    let mut human = HumanOutput::new("Tasks");
    human.push_summary(
        "Progress",
        format!("{}% ({}/{})", progress.rounded, progress.completed, progress.total),
    );
    if rows.is_empty() {
        human.push_next_step("tm add \"<title>\" --due \"DD/MM/YYYY HH:mm\"");
    } else {
        human.push_line(format_table(&rows));
    }

    emit_success(
        output,
        "list",
        &ListOutput {
            total: rows.len(),
            tasks: rows,
            progress,
        },
        Some(&human),
    )
}

pub fn run_progress(ctx: &Context, output: OutputOptions) -> Result<()> {
    let repo = TaskRepository::open(ctx.open_store());
    let progress = ProgressView::of(repo.tasks());

    let human = HumanOutput::new(format!(
        "{} {}",
        progress.label(),
        progress_bar(progress.ratio(), 20)
    ));
    emit_success(output, "progress", &progress, Some(&human))
}

fn format_table(rows: &[TaskRow]) -> String {
    let title_width = rows
        .iter()
        .map(|row| row.title.chars().count().min(TITLE_COLUMN_MAX))
        .max()
        .unwrap_or(0)
        .max("Title".len());
    let index_width = rows.len().to_string().len().max(1);

    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(format!(
        "{:>index_width$}  {}  {:<title_width$}  Due",
        "#", "   ", "Title"
    ));
    for row in rows {
        let mark = if row.completed { "[x]" } else { "[ ]" };
        lines.push(format!(
            "{:>index_width$}  {mark}  {:<title_width$}  {}",
            row.index,
            truncate(&row.title, TITLE_COLUMN_MAX),
            row.due
        ));
    }
    lines.join("\n")
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let mut out: String = value.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn progress_bar(ratio: f64, width: usize) -> String {
    let filled = (ratio.clamp(0.0, 1.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}
