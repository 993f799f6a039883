mod backend;
mod task;

pub use backend::{BackendPayload, BackendStatus, BackendTask, StatusBody};
pub use task::{Priority, Task, TaskId, TaskPatch, TaskStatus};
