//! Turns drag gestures over the board into mutation intents.
//!
//! Every transition here is a synchronous edit of the in-memory board. While a drag is
//! in flight the dragged task's `status` follows the pointer across columns so the
//! rendering layer can show it in place; nothing is persisted until the sync
//! controller receives the intent produced on drop.

use crate::board::{Board, Column};
use crate::model::{Task, TaskId, TaskPatch, TaskStatus};
use std::fmt;
use tracing::{debug, warn};

const COLUMN_PREFIX: &str = "droppable-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureSource {
    Pointer,
    Keyboard,
}

/// Something the pointer can be over: a column's background or a task card.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DropTarget {
    Column(TaskStatus),
    Task(TaskId),
}

impl DropTarget {
    /// Parses a rendering-layer droppable id: `droppable-<status>` or a task id.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Some(label) = trimmed.strip_prefix(COLUMN_PREFIX)
            && let Some(status) = TaskStatus::from_label(label)
        {
            return Self::Column(status);
        }
        match trimmed.parse::<TaskId>() {
            Ok(id) => Self::Task(id),
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for DropTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(status) => write!(f, "{COLUMN_PREFIX}{status}"),
            Self::Task(id) => write!(f, "{id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureEvent {
    Start { id: TaskId, source: GestureSource },
    /// Every droppable currently under the pointer.
    Move { candidates: Vec<DropTarget> },
    End,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationIntent {
    NoOp,
    /// Dropped on a column background of another column. `from` is the column the drag
    /// started in; the live status already shows the preview by the time this is emitted.
    StatusChange {
        id: TaskId,
        status: TaskStatus,
        from: TaskStatus,
    },
    /// Dropped on a task. `status` is set when that task sits in another column.
    Reorder {
        id: TaskId,
        before: Option<TaskId>,
        status: Option<TaskStatus>,
        from: TaskStatus,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDrag {
    pub id: TaskId,
    pub source: GestureSource,
    pub origin: TaskStatus,
    pub target: Option<DropTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(ActiveDrag),
}

/// Board columns as they should be drawn mid-drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview<'a> {
    pub columns: Vec<Column<'a>>,
    pub dragging: Option<&'a Task>,
}

#[derive(Debug, Clone, Default)]
pub struct DragInterpreter {
    state: DragState,
}

impl DragInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn active(&self) -> Option<&ActiveDrag> {
        match &self.state {
            DragState::Dragging(drag) => Some(drag),
            DragState::Idle => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.active().is_some()
    }

    pub fn preview<'a>(&self, board: &'a Board) -> Preview<'a> {
        Preview {
            columns: board.group_by_status(),
            dragging: self.active().and_then(|drag| board.get(&drag.id)),
        }
    }

    pub fn handle(&mut self, board: &mut Board, event: GestureEvent) -> Option<MutationIntent> {
        match event {
            GestureEvent::Start { id, source } => {
                self.start(board, id, source);
                None
            }
            GestureEvent::Move { candidates } => {
                self.hover(board, &candidates);
                None
            }
            GestureEvent::End => Some(self.end(board)),
            GestureEvent::Cancel => Some(self.cancel(board)),
        }
    }

    /// Begins dragging `id`. An unfinished drag is cancelled first. Returns `false`
    /// when the task is not on the board.
    pub fn start(&mut self, board: &mut Board, id: TaskId, source: GestureSource) -> bool {
        if self.is_dragging() {
            debug!("new drag started before the previous one ended");
            self.cancel(board);
        }

        let Some(task) = board.get(&id) else {
            warn!(%id, "drag start ignored, task not on the board");
            return false;
        };

        debug!(%id, ?source, origin = %task.status, "drag started");
        self.state = DragState::Dragging(ActiveDrag {
            origin: task.status,
            id,
            source,
            target: None,
        });
        true
    }

    /// Records what the pointer is over and previews column changes on the board.
    pub fn hover(&mut self, board: &mut Board, candidates: &[DropTarget]) -> Option<DropTarget> {
        let DragState::Dragging(drag) = &mut self.state else {
            return None;
        };
        let current = board.get(&drag.id)?.status;

        let target = resolve_target(board, &drag.id, current, candidates);
        let preview_status = match &target {
            Some(DropTarget::Column(status)) => Some(*status),
            Some(DropTarget::Task(over)) => board.get(over).map(|task| task.status),
            None => None,
        };

        if let Some(status) = preview_status
            && status != current
        {
            board.patch(&drag.id, &TaskPatch::status(status));
        }

        drag.target = target.clone();
        target
    }

    /// Finishes the drag and reports what should be persisted.
    pub fn end(&mut self, board: &mut Board) -> MutationIntent {
        let DragState::Dragging(drag) = std::mem::take(&mut self.state) else {
            return MutationIntent::NoOp;
        };

        let Some(target) = drag.target.clone() else {
            debug!(id = %drag.id, "drag ended outside any target");
            revert(board, &drag);
            return MutationIntent::NoOp;
        };

        if board.get(&drag.id).is_none() {
            warn!(id = %drag.id, "dragged task left the board before drop");
            return MutationIntent::NoOp;
        }

        let intent = match target {
            DropTarget::Column(status) if status != drag.origin => MutationIntent::StatusChange {
                id: drag.id.clone(),
                status,
                from: drag.origin,
            },
            DropTarget::Column(_) => MutationIntent::NoOp,
            DropTarget::Task(over) => drop_on_task(board, &drag, &over),
        };
        debug!(?intent, "drag ended");
        intent
    }

    /// Abandons the drag and undoes any column preview.
    pub fn cancel(&mut self, board: &mut Board) -> MutationIntent {
        if let DragState::Dragging(drag) = std::mem::take(&mut self.state) {
            debug!(id = %drag.id, "drag cancelled");
            revert(board, &drag);
        }
        MutationIntent::NoOp
    }
}

/// A task card under the pointer beats the column background. The dragged card itself
/// is never a target; hovering it means hovering its current column.
fn resolve_target(
    board: &Board,
    dragged: &TaskId,
    current: TaskStatus,
    candidates: &[DropTarget],
) -> Option<DropTarget> {
    let task = candidates.iter().find(|candidate| match candidate {
        DropTarget::Task(id) => id != dragged && board.get(id).is_some(),
        DropTarget::Column(_) => false,
    });
    if let Some(task) = task {
        return Some(task.clone());
    }

    let column = candidates
        .iter()
        .find(|candidate| matches!(candidate, DropTarget::Column(_)));
    if let Some(column) = column {
        return Some(column.clone());
    }

    candidates
        .iter()
        .any(|candidate| *candidate == DropTarget::Task(dragged.clone()))
        .then_some(DropTarget::Column(current))
}

fn revert(board: &mut Board, drag: &ActiveDrag) {
    if let Some(task) = board.get(&drag.id)
        && task.status != drag.origin
    {
        board.patch(&drag.id, &TaskPatch::status(drag.origin));
    }
}

/// Array-move placement: dragging down onto a task lands after it, dragging up lands before it.
fn insert_before(board: &Board, id: &TaskId, over: &TaskId) -> Option<TaskId> {
    let from = board.position(id)?;
    let at = board.position(over)?;
    if at > from {
        board.tasks().get(at + 1).map(|task| task.id.clone())
    } else {
        Some(over.clone())
    }
}

fn drop_on_task(board: &mut Board, drag: &ActiveDrag, over: &TaskId) -> MutationIntent {
    let Some(over_status) = board.get(over).map(|task| task.status) else {
        revert(board, drag);
        return MutationIntent::NoOp;
    };

    let before = insert_before(board, &drag.id, over);
    let moves = board.reorder_target(&drag.id, before.as_ref()) != board.position(&drag.id);

    if over_status != drag.origin {
        MutationIntent::Reorder {
            id: drag.id.clone(),
            before,
            status: Some(over_status),
            from: drag.origin,
        }
    } else if moves {
        MutationIntent::Reorder {
            id: drag.id.clone(),
            before,
            status: None,
            from: drag.origin,
        }
    } else {
        MutationIntent::NoOp
    }
}
