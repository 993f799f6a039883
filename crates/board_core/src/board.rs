use crate::model::{Task, TaskId, TaskPatch, TaskStatus};
use std::collections::HashSet;
use tracing::warn;

/// One status column: the working-set tasks with that status, in working-set order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column<'a> {
    pub status: TaskStatus,
    pub tasks: Vec<&'a Task>,
}

impl Column<'_> {
    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|task| task.id.clone()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub query: Option<String>,
    pub status: Option<TaskStatus>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status
            && task.status != status
        {
            return false;
        }

        match self.query.as_deref().map(str::trim) {
            Some(query) if !query.is_empty() => {
                let needle = query.to_lowercase();
                task.title.to_lowercase().contains(&needle)
                    || task.description.to_lowercase().contains(&needle)
            }
            _ => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoardStats {
    pub total: usize,
    pub todo: usize,
    pub in_progress: usize,
    pub done: usize,
}

/// In-memory working set of the board.
///
/// Column membership is derived from each task's `status`; the order inside a column
/// is the order of the working set. Apart from `set_all`, membership only changes
/// through the sync controller after the store confirmed a create or delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Board {
    tasks: Vec<Task>,
    generation: u64,
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let mut board = Self::new();
        board.set_all(tasks);
        board
    }

    /// Replaces the working set. Later duplicates of an id are dropped.
    pub fn set_all(&mut self, tasks: Vec<Task>) {
        let mut seen = HashSet::new();
        self.tasks = tasks
            .into_iter()
            .filter(|task| {
                let fresh = seen.insert(task.id.clone());
                if !fresh {
                    warn!(id = %task.id, "duplicate task id dropped from working set");
                }
                fresh
            })
            .collect();
        self.generation += 1;
    }

    /// Bumped by every `set_all`; results issued against an older generation are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == *id)
    }

    pub fn position(&self, id: &TaskId) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == *id)
    }

    pub fn group_by_status(&self) -> Vec<Column<'_>> {
        TaskStatus::ALL
            .into_iter()
            .map(|status| Column {
                status,
                tasks: self.column(status),
            })
            .collect()
    }

    pub fn column(&self, status: TaskStatus) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| task.status == status)
            .collect()
    }

    pub fn filter(&self, filter: &TaskFilter) -> Vec<&Task> {
        self.tasks.iter().filter(|task| filter.matches(task)).collect()
    }

    pub fn stats(&self) -> BoardStats {
        let mut stats = BoardStats {
            total: self.tasks.len(),
            ..BoardStats::default()
        };
        for task in &self.tasks {
            match task.status {
                TaskStatus::Todo => stats.todo += 1,
                TaskStatus::InProgress => stats.in_progress += 1,
                TaskStatus::Done => stats.done += 1,
            }
        }
        stats
    }

    /// Shallow-merges `fields` into the task. Returns `false` when the id is absent.
    pub fn patch(&mut self, id: &TaskId, fields: &TaskPatch) -> bool {
        match self.tasks.iter_mut().find(|task| task.id == *id) {
            Some(task) => {
                fields.apply_to(task);
                true
            }
            None => {
                warn!(%id, "patch ignored, task not on the board");
                false
            }
        }
    }

    /// Index the task would occupy after `reorder(id, before)`, or `None` if either id is unknown.
    pub fn reorder_target(&self, id: &TaskId, before: Option<&TaskId>) -> Option<usize> {
        let from = self.position(id)?;
        match before {
            None => Some(self.tasks.len() - 1),
            Some(before) if before == id => Some(from),
            Some(before) => {
                let at = self.position(before)?;
                Some(if at > from { at - 1 } else { at })
            }
        }
    }

    /// Moves `id` to sit immediately before `before`, or to the end when `before` is `None`.
    /// Returns whether the order changed.
    pub fn reorder(&mut self, id: &TaskId, before: Option<&TaskId>) -> bool {
        let Some(from) = self.position(id) else {
            warn!(%id, "reorder ignored, task not on the board");
            return false;
        };
        let Some(to) = self.reorder_target(id, before) else {
            warn!(%id, before = ?before, "reorder ignored, anchor task not on the board");
            return false;
        };
        if from == to {
            return false;
        }

        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);
        true
    }

    pub(crate) fn insert(&mut self, task: Task) {
        match self.tasks.iter_mut().find(|existing| existing.id == task.id) {
            Some(existing) => *existing = task,
            None => self.tasks.push(task),
        }
    }

    pub(crate) fn remove(&mut self, id: &TaskId) -> Option<Task> {
        let index = self.position(id)?;
        Some(self.tasks.remove(index))
    }
}
