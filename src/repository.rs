//! The task repository: in-memory list plus its store.
//!
//! Every mutation works on a copy of the list. The copy is saved first; only
//! when the store accepts it does the repository adopt new state (reloading
//! from the store for create/update). A failed save therefore leaves memory
//! exactly as it was, matching what the store still holds.

use tracing::info;

use crate::error::Result;
use crate::storage::Store;
use crate::task::{next_task_id, now_millis, Due, TaskId, TaskRecord};

pub struct TaskRepository<S> {
    store: S,
    tasks: Vec<TaskRecord>,
}

impl<S: Store> TaskRepository<S> {
    /// Open the repository, loading whatever the store holds
    pub fn open(store: S) -> Self {
        let tasks = store.load();
        Self { store, tasks }
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskRecord> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// 0-based position of a task
    pub fn position_of(&self, id: TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    /// Id of the task at a 0-based position
    pub fn id_at(&self, position: usize) -> Option<TaskId> {
        self.tasks.get(position).map(|task| task.id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Replace in-memory state with the store's
    pub fn reload(&mut self) {
        self.tasks = self.store.load();
    }

    /// Append a new, incomplete task. Titles are not validated here.
    pub fn create(&mut self, title: &str, due: Due) -> Result<TaskId> {
        let id = next_task_id(&self.tasks, now_millis());
        let mut next = self.tasks.clone();
        next.push(TaskRecord::new(id, title, due));

        self.store.save(&next)?;
        self.reload();
        info!(%id, "task created");
        Ok(id)
    }

    /// Replace title and due of an existing task.
    ///
    /// Returns `false` without touching the store when `id` is unknown.
    pub fn update(&mut self, id: TaskId, title: &str, due: Due) -> Result<bool> {
        let Some(position) = self.position_of(id) else {
            return Ok(false);
        };
        let mut next = self.tasks.clone();
        let task = &mut next[position];
        task.title = title.to_string();
        task.due = due;

        self.store.save(&next)?;
        self.reload();
        info!(%id, "task updated");
        Ok(true)
    }

    /// Delete a task permanently. `false` when `id` is unknown.
    pub fn remove(&mut self, id: TaskId) -> Result<bool> {
        if self.position_of(id).is_none() {
            return Ok(false);
        }
        let next: Vec<TaskRecord> = self
            .tasks
            .iter()
            .filter(|task| task.id != id)
            .cloned()
            .collect();

        self.store.save(&next)?;
        self.tasks = next;
        info!(%id, "task removed");
        Ok(true)
    }

    /// Flip completion; returns the new value, `None` when `id` is unknown
    pub fn toggle_completed(&mut self, id: TaskId) -> Result<Option<bool>> {
        let Some(position) = self.position_of(id) else {
            return Ok(None);
        };
        let mut next = self.tasks.clone();
        let task = &mut next[position];
        task.completed = !task.completed;
        let completed = task.completed;

        self.store.save(&next)?;
        self.tasks = next;
        info!(%id, completed, "task toggled");
        Ok(Some(completed))
    }

    /// Toggle the task currently at a 0-based position
    pub fn toggle_at(&mut self, position: usize) -> Result<Option<bool>> {
        match self.id_at(position) {
            Some(id) => self.toggle_completed(id),
            None => Ok(None),
        }
    }
}
