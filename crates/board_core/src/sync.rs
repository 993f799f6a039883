use crate::board::Board;
use crate::drag::MutationIntent;
use crate::error::AppError;
use crate::model::{Task, TaskId, TaskPatch, TaskStatus};
use crate::remote::DeleteAck;
use crate::task_api::{TaskRepository, Written};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Proof that a status change was applied optimistically and still needs confirming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusTicket {
    pub id: TaskId,
    pub status: TaskStatus,
    pub previous: TaskStatus,
    pub seq: u64,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Nothing to do.
    Unchanged,
    /// Order changed locally; ordering is never sent to the store.
    Reordered,
    /// The store accepted the status change and its copy was merged into the board.
    Confirmed(Task),
    /// A newer change or a reload overtook this result; it was dropped.
    Superseded,
    /// The store refused the change and the board was reloaded from it.
    Resynced { notice: String },
    /// The store refused the change and the reload failed as well. The optimistic edit
    /// was rolled back.
    Unrecovered { notice: String },
}

impl SyncOutcome {
    pub fn notice(&self) -> Option<&str> {
        match self {
            Self::Resynced { notice } | Self::Unrecovered { notice } => Some(notice),
            _ => None,
        }
    }
}

/// Applies mutation intents to the board and reconciles them with the task store.
#[derive(Debug)]
pub struct SyncController<R> {
    repo: R,
    next_seq: u64,
    latest: HashMap<TaskId, u64>,
}

impl<R: TaskRepository> SyncController<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            next_seq: 0,
            latest: HashMap::new(),
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    /// Patches the new status into the board right away and returns the ticket to settle.
    /// `None` when the task is not on the board.
    pub fn begin_status_change(
        &mut self,
        board: &mut Board,
        id: &TaskId,
        status: TaskStatus,
    ) -> Option<StatusTicket> {
        self.open_ticket(board, id, status, None)
    }

    /// `origin` is the status to restore if the change can be neither confirmed nor
    /// reloaded. Defaults to the board's current status.
    fn open_ticket(
        &mut self,
        board: &mut Board,
        id: &TaskId,
        status: TaskStatus,
        origin: Option<TaskStatus>,
    ) -> Option<StatusTicket> {
        let Some(current) = board.get(id).map(|task| task.status) else {
            warn!(%id, "status change ignored, task not on the board");
            return None;
        };
        let previous = origin.unwrap_or(current);

        board.patch(id, &TaskPatch::status(status));
        self.next_seq += 1;
        self.latest.insert(id.clone(), self.next_seq);

        debug!(%id, %status, seq = self.next_seq, "status change applied optimistically");
        Some(StatusTicket {
            id: id.clone(),
            status,
            previous,
            seq: self.next_seq,
            generation: board.generation(),
        })
    }

    /// Sends the ticket's status to the store and reconciles the board with the answer.
    pub async fn settle(&mut self, board: &mut Board, ticket: StatusTicket) -> SyncOutcome {
        let result = self.repo.update_status(&ticket.id, ticket.status).await;

        if !self.is_current(board, &ticket) {
            warn!(id = %ticket.id, seq = ticket.seq, "status result superseded, ignoring");
            return SyncOutcome::Superseded;
        }
        self.latest.remove(&ticket.id);

        match result {
            Ok(written) => SyncOutcome::Confirmed(absorb(board, &ticket.id, written)),
            Err(err) => {
                error!(id = %ticket.id, error = %err, "status change failed, reloading board");
                self.resync(board, &ticket, &err).await
            }
        }
    }

    pub async fn change_status(
        &mut self,
        board: &mut Board,
        id: &TaskId,
        status: TaskStatus,
    ) -> SyncOutcome {
        match self.begin_status_change(board, id, status) {
            Some(ticket) => self.settle(board, ticket).await,
            None => SyncOutcome::Unchanged,
        }
    }

    /// Settles a dropped drag. Status changes roll back to the column the drag started in.
    pub async fn apply(&mut self, board: &mut Board, intent: MutationIntent) -> SyncOutcome {
        match intent {
            MutationIntent::NoOp => SyncOutcome::Unchanged,
            MutationIntent::StatusChange { id, status, from } => {
                self.drop_status(board, &id, status, from).await
            }
            MutationIntent::Reorder {
                id,
                before,
                status,
                from,
            } => {
                let moved = board.reorder(&id, before.as_ref());
                match status {
                    Some(status) => self.drop_status(board, &id, status, from).await,
                    None if moved => SyncOutcome::Reordered,
                    None => SyncOutcome::Unchanged,
                }
            }
        }
    }

    async fn drop_status(
        &mut self,
        board: &mut Board,
        id: &TaskId,
        status: TaskStatus,
        from: TaskStatus,
    ) -> SyncOutcome {
        match self.open_ticket(board, id, status, Some(from)) {
            Some(ticket) => self.settle(board, ticket).await,
            None => SyncOutcome::Unchanged,
        }
    }

    /// Replaces the working set with the store's list. Returns the number of tasks loaded.
    pub async fn reload(&mut self, board: &mut Board) -> Result<usize, AppError> {
        let tasks = self.repo.list().await?;
        board.set_all(tasks);
        self.latest.clear();
        info!(tasks = board.len(), generation = board.generation(), "board reloaded");
        Ok(board.len())
    }

    pub async fn create(&mut self, board: &mut Board, fields: TaskPatch) -> Result<Task, AppError> {
        let has_title = fields
            .title
            .as_deref()
            .is_some_and(|title| !title.trim().is_empty());
        if !has_title {
            return Err(AppError::invalid_input("Task title is required"));
        }

        let task = self.repo.create(&fields).await?;
        board.insert(task.clone());
        info!(id = %task.id, "task created");
        Ok(task)
    }

    pub async fn update(
        &mut self,
        board: &mut Board,
        id: &TaskId,
        fields: TaskPatch,
    ) -> Result<Task, AppError> {
        if fields.is_empty() {
            return Err(AppError::invalid_input("Nothing to update"));
        }
        if fields
            .title
            .as_deref()
            .is_some_and(|title| title.trim().is_empty())
        {
            return Err(AppError::invalid_input("Task title cannot be empty"));
        }

        let written = self.repo.update(id, &fields).await?;
        Ok(absorb(board, id, written))
    }

    pub async fn delete(&mut self, board: &mut Board, id: &TaskId) -> Result<DeleteAck, AppError> {
        let ack = self.repo.delete(id).await?;
        if board.remove(id).is_none() {
            warn!(%id, "deleted task was not on the board");
        }
        self.latest.remove(id);
        Ok(ack)
    }

    fn is_current(&self, board: &Board, ticket: &StatusTicket) -> bool {
        ticket.generation == board.generation() && self.latest.get(&ticket.id) == Some(&ticket.seq)
    }

    async fn resync(
        &mut self,
        board: &mut Board,
        ticket: &StatusTicket,
        err: &AppError,
    ) -> SyncOutcome {
        let cause = err.message();
        match self.reload(board).await {
            Ok(_) => SyncOutcome::Resynced {
                notice: format!("Could not move task: {cause}. The board was reloaded."),
            },
            Err(reload_err) => {
                error!(error = %reload_err, "reload after failed status change failed");
                board.patch(&ticket.id, &TaskPatch::status(ticket.previous));
                SyncOutcome::Unrecovered {
                    notice: format!(
                        "Could not move task: {cause}. Reloading failed too: {}",
                        reload_err.message()
                    ),
                }
            }
        }
    }
}

/// Merges a write into the board and returns the task as it now stands. A detached write
/// only knows the fields that were sent, so nothing else on the board is touched.
fn absorb(board: &mut Board, id: &TaskId, written: Written) -> Task {
    match written {
        Written::Stored(task) => {
            board.patch(id, &TaskPatch::from(&task));
            task
        }
        Written::Detached(fields) => {
            board.patch(id, &fields);
            board
                .get(id)
                .cloned()
                .unwrap_or_else(|| fields.into_task(id.clone()))
        }
    }
}
