//! Interaction controller: user intents in, repository operations out.
//!
//! The controller is a two-state machine. While `Creating`, a submit appends
//! a new task; while `Editing(id)`, it rewrites that task. Feedback goes
//! through a [`Notifier`] and never decides repository state on its own.

use tracing::debug;

use crate::error::{Error, Result};
use crate::notify::Notifier;
use crate::repository::TaskRepository;
use crate::storage::Store;
use crate::task::{Due, TaskId, TaskRecord};

pub const MSG_ADDED: &str = "Task added successfully";
pub const MSG_UPDATED: &str = "Task updated successfully";
pub const MSG_DELETED: &str = "Your task has been deleted.";
pub const MSG_COMPLETED: &str = "Task completed!";
pub const MSG_UNCOMPLETED: &str = "Task uncompleted";
pub const DELETE_PROMPT: &str = "Are you sure? You won't be able to revert this!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Creating,
    Editing(TaskId),
}

/// Pending form input
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Draft {
    pub title: String,
    /// `None` means "now" at submit time
    pub due: Option<Due>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Created(TaskId),
    Updated(TaskId),
    /// The task being edited was deleted in the meantime; nothing was written
    Vanished(TaskId),
}

impl SubmitOutcome {
    pub fn id(&self) -> TaskId {
        match self {
            SubmitOutcome::Created(id) | SubmitOutcome::Updated(id) | SubmitOutcome::Vanished(id) => *id,
        }
    }
}

/// A delete waiting for the user's answer
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a pending delete does nothing until resolved"]
pub struct PendingDelete {
    pub id: TaskId,
    pub title: String,
}

impl PendingDelete {
    pub fn prompt(&self) -> &'static str {
        DELETE_PROMPT
    }
}

/// Whether a title may be submitted
pub fn can_submit(title: &str) -> bool {
    !title.trim().is_empty()
}

pub struct Controller<S, N> {
    repo: TaskRepository<S>,
    notifier: N,
    mode: Mode,
    draft: Draft,
}

impl<S: Store, N: Notifier> Controller<S, N> {
    pub fn new(repo: TaskRepository<S>, notifier: N) -> Self {
        Self {
            repo,
            notifier,
            mode: Mode::Creating,
            draft: Draft::default(),
        }
    }

    pub fn repo(&self) -> &TaskRepository<S> {
        &self.repo
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        self.repo.tasks()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn reload(&mut self) {
        self.repo.reload();
    }

    /// Create or update depending on the mode.
    ///
    /// Empty titles are refused before the state machine is touched. On a
    /// failed save the mode and draft are kept so the user can retry.
    pub fn submit(&mut self, title: &str, due: Option<Due>) -> Result<SubmitOutcome> {
        if !can_submit(title) {
            return Err(Error::EmptyTitle);
        }
        let title = title.trim();
        let due = due.unwrap_or_else(Due::now);

        let result = match self.mode {
            Mode::Creating => self.repo.create(title, due).map(SubmitOutcome::Created),
            Mode::Editing(id) => self.repo.update(id, title, due).map(|found| {
                if found {
                    SubmitOutcome::Updated(id)
                } else {
                    SubmitOutcome::Vanished(id)
                }
            }),
        };

        match result {
            Ok(outcome) => {
                self.reset_form();
                match outcome {
                    SubmitOutcome::Created(_) => self.notifier.notify_success(MSG_ADDED),
                    SubmitOutcome::Updated(_) => self.notifier.notify_success(MSG_UPDATED),
                    SubmitOutcome::Vanished(id) => debug!(%id, "edited task no longer exists"),
                }
                Ok(outcome)
            }
            Err(err) => {
                self.notifier
                    .notify_failure(&format!("Failed to save task: {err}"));
                Err(err)
            }
        }
    }

    /// Submit whatever the draft currently holds
    pub fn submit_draft(&mut self) -> Result<SubmitOutcome> {
        let Draft { title, due } = self.draft.clone();
        self.submit(&title, due)
    }

    /// Load a task into the draft and switch to editing it
    pub fn begin_edit(&mut self, id: TaskId) -> Result<&Draft> {
        let task = self.repo.get(id).ok_or(Error::TaskNotFound(id.get()))?;
        self.draft = Draft {
            title: task.title.clone(),
            due: Some(task.due.clone()),
        };
        self.mode = Mode::Editing(id);
        Ok(&self.draft)
    }

    /// Leave editing mode without saving
    pub fn cancel_edit(&mut self) {
        self.reset_form();
    }

    /// Ask for confirmation, then delete. Returns whether a task was removed.
    pub fn request_delete(&mut self, id: TaskId) -> Result<bool> {
        let Some(pending) = self.begin_delete(id) else {
            return Ok(false);
        };
        let confirmed = self.notifier.confirm(pending.prompt());
        self.resolve_delete(pending, confirmed)
    }

    /// First half of a delete whose confirmation arrives later.
    ///
    /// `None` when the task does not exist.
    pub fn begin_delete(&self, id: TaskId) -> Option<PendingDelete> {
        self.repo.get(id).map(|task| PendingDelete {
            id,
            title: task.title.clone(),
        })
    }

    /// Second half of a delete. Declining changes nothing.
    pub fn resolve_delete(&mut self, pending: PendingDelete, confirmed: bool) -> Result<bool> {
        if !confirmed {
            debug!(id = %pending.id, "delete declined");
            return Ok(false);
        }
        match self.repo.remove(pending.id) {
            Ok(removed) => {
                if removed {
                    if self.mode == Mode::Editing(pending.id) {
                        self.reset_form();
                    }
                    self.notifier.notify_success(MSG_DELETED);
                }
                Ok(removed)
            }
            Err(err) => {
                self.notifier
                    .notify_failure(&format!("Failed to delete task: {err}"));
                Err(err)
            }
        }
    }

    /// Toggle the task at a 0-based display position.
    ///
    /// The position is resolved to the task's id before anything changes.
    pub fn toggle_done(&mut self, position: usize) -> Result<bool> {
        let id = self.repo.id_at(position).ok_or(Error::PositionOutOfRange {
            position: position + 1,
            len: self.repo.len(),
        })?;
        self.toggle_done_by_id(id)
    }

    /// Toggle by id; returns the new completion state
    pub fn toggle_done_by_id(&mut self, id: TaskId) -> Result<bool> {
        match self.repo.toggle_completed(id) {
            Ok(Some(completed)) => {
                self.notifier.notify_success(if completed {
                    MSG_COMPLETED
                } else {
                    MSG_UNCOMPLETED
                });
                Ok(completed)
            }
            Ok(None) => Err(Error::TaskNotFound(id.get())),
            Err(err) => {
                self.notifier
                    .notify_failure(&format!("Failed to update task: {err}"));
                Err(err)
            }
        }
    }

    fn reset_form(&mut self) {
        self.mode = Mode::Creating;
        self.draft = Draft::default();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::notify::{NotificationKind, SilentNotifier};
    use crate::storage::{MemoryBackend, SlotStore};

    type TestController = Controller<SlotStore<MemoryBackend>, SilentNotifier>;

    fn controller(notifier: SilentNotifier) -> TestController {
        let repo = TaskRepository::open(SlotStore::new(MemoryBackend::new()));
        Controller::new(repo, notifier)
    }

    /// Memory store whose saves start failing once `broken` is set
    struct FlakyStore {
        inner: SlotStore<MemoryBackend>,
        broken: Rc<Cell<bool>>,
    }

    impl Store for FlakyStore {
        fn load(&self) -> Vec<TaskRecord> {
            self.inner.load()
        }

        fn save(&mut self, tasks: &[TaskRecord]) -> Result<()> {
            if self.broken.get() {
                return Err(Error::OperationFailed("disk full".to_string()));
            }
            self.inner.save(tasks)
        }
    }

    fn flaky_controller() -> (Controller<FlakyStore, SilentNotifier>, Rc<Cell<bool>>) {
        let broken = Rc::new(Cell::new(false));
        let store = FlakyStore {
            inner: SlotStore::new(MemoryBackend::new()),
            broken: Rc::clone(&broken),
        };
        let ctl = Controller::new(TaskRepository::open(store), SilentNotifier::auto_affirm());
        (ctl, broken)
    }

    #[test]
    fn submit_in_creating_mode_adds_task() {
        let mut ctl = controller(SilentNotifier::auto_affirm());
        let outcome = ctl.submit("  Buy milk ", Some(Due::At(1))).unwrap();

        assert!(matches!(outcome, SubmitOutcome::Created(_)));
        assert_eq!(ctl.tasks()[0].title, "Buy milk");
        assert_eq!(ctl.mode(), Mode::Creating);
        assert_eq!(ctl.notifier().last().unwrap().text, MSG_ADDED);
    }

    #[test]
    fn empty_title_is_refused_before_state_changes() {
        let mut ctl = controller(SilentNotifier::auto_affirm());
        let id = ctl.submit("a", Some(Due::At(1))).unwrap().id();
        ctl.begin_edit(id).unwrap();

        assert!(matches!(ctl.submit("   ", None), Err(Error::EmptyTitle)));
        assert_eq!(ctl.mode(), Mode::Editing(id));
        assert_eq!(ctl.draft().title, "a");
        assert!(!can_submit(""));
    }

    #[test]
    fn edit_flow_updates_and_returns_to_creating() {
        let mut ctl = controller(SilentNotifier::auto_affirm());
        let id = ctl.submit("a", Some(Due::At(1))).unwrap().id();
        ctl.toggle_done(0).unwrap();

        let draft = ctl.begin_edit(id).unwrap();
        assert_eq!(draft.title, "a");
        assert_eq!(draft.due, Some(Due::At(1)));
        assert_eq!(ctl.mode(), Mode::Editing(id));

        ctl.draft_mut().title = "b".to_string();
        assert_eq!(ctl.submit_draft().unwrap(), SubmitOutcome::Updated(id));
        assert_eq!(ctl.mode(), Mode::Creating);
        assert_eq!(ctl.draft(), &Draft::default());

        let task = ctl.repo().get(id).unwrap();
        assert_eq!(task.title, "b");
        assert!(task.completed);
        assert_eq!(ctl.notifier().last().unwrap().text, MSG_UPDATED);
    }

    #[test]
    fn begin_edit_unknown_task_fails() {
        let mut ctl = controller(SilentNotifier::auto_affirm());
        assert!(matches!(
            ctl.begin_edit(TaskId(9)),
            Err(Error::TaskNotFound(9))
        ));
        assert_eq!(ctl.mode(), Mode::Creating);
    }

    #[test]
    fn declined_delete_changes_nothing() {
        let mut ctl = controller(SilentNotifier::declining());
        let id = ctl.submit("keep", None).unwrap().id();

        assert!(!ctl.request_delete(id).unwrap());
        assert_eq!(ctl.tasks().len(), 1);
        assert_eq!(ctl.notifier().prompts, vec![DELETE_PROMPT.to_string()]);
        assert_eq!(ctl.notifier().last().unwrap().text, MSG_ADDED);
    }

    #[test]
    fn confirmed_delete_removes_and_leaves_edit_mode() {
        let mut ctl = controller(SilentNotifier::auto_affirm());
        let id = ctl.submit("gone", None).unwrap().id();
        ctl.begin_edit(id).unwrap();

        assert!(ctl.request_delete(id).unwrap());
        assert!(ctl.tasks().is_empty());
        assert_eq!(ctl.mode(), Mode::Creating);
        assert_eq!(ctl.notifier().last().unwrap().text, MSG_DELETED);

        assert!(!ctl.request_delete(id).unwrap());
    }

    #[test]
    fn deferred_delete_resolves_later() {
        let mut ctl = controller(SilentNotifier::declining());
        let id = ctl.submit("later", None).unwrap().id();

        let pending = ctl.begin_delete(id).unwrap();
        assert_eq!(pending.title, "later");
        assert!(ctl.resolve_delete(pending, true).unwrap());
        assert!(ctl.begin_delete(id).is_none());
    }

    #[test]
    fn submit_after_vanished_edit_is_a_quiet_no_op() {
        let mut ctl = controller(SilentNotifier::auto_affirm());
        let a = ctl.submit("a", None).unwrap().id();
        ctl.begin_edit(a).unwrap();

        // removed behind the controller's back
        ctl.repo.remove(a).unwrap();
        assert_eq!(ctl.mode(), Mode::Editing(a));

        assert_eq!(ctl.submit("a2", None).unwrap(), SubmitOutcome::Vanished(a));
        assert!(ctl.tasks().is_empty());
        assert_eq!(ctl.mode(), Mode::Creating);
    }

    #[test]
    fn failed_save_keeps_edit_mode_and_draft() {
        let (mut ctl, broken) = flaky_controller();
        let id = ctl.submit("Buy milk", Some(Due::At(1))).unwrap().id();
        ctl.begin_edit(id).unwrap();
        ctl.draft_mut().title = "Buy oat milk".to_string();
        broken.set(true);

        assert!(matches!(
            ctl.submit_draft(),
            Err(Error::OperationFailed(_))
        ));
        let last = ctl.notifier().last().unwrap();
        assert_eq!(last.kind, NotificationKind::Failure);
        assert!(last.text.starts_with("Failed to save task"));
        assert_eq!(ctl.mode(), Mode::Editing(id));
        assert_eq!(ctl.draft().title, "Buy oat milk");
        assert_eq!(ctl.draft().due, Some(Due::At(1)));
        assert_eq!(ctl.tasks()[0].title, "Buy milk");

        broken.set(false);
        assert_eq!(ctl.submit_draft().unwrap(), SubmitOutcome::Updated(id));
        assert_eq!(ctl.tasks()[0].title, "Buy oat milk");
        assert_eq!(ctl.mode(), Mode::Creating);
    }

    #[test]
    fn failed_toggle_and_delete_report_failure() {
        let (mut ctl, broken) = flaky_controller();
        let id = ctl.submit("Buy milk", None).unwrap().id();
        broken.set(true);

        assert!(ctl.toggle_done(0).is_err());
        assert!(!ctl.tasks()[0].completed);
        assert!(ctl
            .notifier()
            .last()
            .unwrap()
            .text
            .starts_with("Failed to update task"));

        assert!(ctl.request_delete(id).is_err());
        assert_eq!(ctl.tasks().len(), 1);
        let last = ctl.notifier().last().unwrap();
        assert_eq!(last.kind, NotificationKind::Failure);
        assert!(last.text.starts_with("Failed to delete task"));
    }

    #[test]
    fn toggle_reports_resulting_state() {
        let mut ctl = controller(SilentNotifier::auto_affirm());
        ctl.submit("a", None).unwrap();

        assert!(ctl.toggle_done(0).unwrap());
        assert_eq!(ctl.notifier().last().unwrap().text, MSG_COMPLETED);
        assert!(!ctl.toggle_done(0).unwrap());
        assert_eq!(ctl.notifier().last().unwrap().text, MSG_UNCOMPLETED);

        assert!(matches!(
            ctl.toggle_done(5),
            Err(Error::PositionOutOfRange { position: 6, len: 1 })
        ));
        assert!(ctl
            .notifier()
            .messages
            .iter()
            .all(|n| n.kind == NotificationKind::Success));
    }
}
