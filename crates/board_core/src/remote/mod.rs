//! The task API as seen from the client, with failures already sorted into
//! "fall back to the local store" and "report to the caller".

pub mod http;

pub use http::HttpTaskApi;

use crate::model::{BackendPayload, BackendTask, StatusBody, TaskId};
use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

const HTTP_NOT_FOUND: u16 = 404;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The route is missing or the server cannot be reached; the local store takes over.
    #[error("task api unavailable: {0}")]
    Unavailable(String),
    #[error("{message}")]
    Rejected { status: Option<u16>, message: String },
}

impl RemoteError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Update,
    UpdateStatus,
    Delete,
}

impl Operation {
    pub fn name(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Create => "create",
            Self::Update => "update",
            Self::UpdateStatus => "update_status",
            Self::Delete => "delete",
        }
    }

    pub fn failure_message(self) -> &'static str {
        match self {
            Self::List => "Failed to fetch tasks",
            Self::Create => "Failed to create task",
            Self::Update => "Failed to update task",
            Self::UpdateStatus => "Failed to update task status",
            Self::Delete => "Failed to delete task",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Sorts a non-success HTTP status. Only 404 counts as "backend absent".
pub fn classify_status(status: u16, body: &str, operation: Operation) -> RemoteError {
    if status == HTTP_NOT_FOUND {
        return RemoteError::Unavailable(format!("{} route returned 404", operation.name()));
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| operation.failure_message().to_string());

    RemoteError::Rejected {
        status: Some(status),
        message,
    }
}

/// Acknowledgement returned by a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeleteAck {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope {
    Wrapped { tasks: Vec<BackendTask> },
    Bare(Vec<BackendTask>),
}

impl ListEnvelope {
    pub(crate) fn into_tasks(self) -> Vec<BackendTask> {
        match self {
            Self::Wrapped { tasks } | Self::Bare(tasks) => tasks,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TaskEnvelope {
    Wrapped { task: BackendTask },
    Bare(BackendTask),
}

impl TaskEnvelope {
    pub(crate) fn into_task(self) -> BackendTask {
        match self {
            Self::Wrapped { task } | Self::Bare(task) => task,
        }
    }
}

#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn list(&self) -> Result<Vec<BackendTask>, RemoteError>;

    async fn create(&self, payload: &BackendPayload) -> Result<BackendTask, RemoteError>;

    async fn update(
        &self,
        id: &TaskId,
        payload: &BackendPayload,
    ) -> Result<BackendTask, RemoteError>;

    async fn update_status(
        &self,
        id: &TaskId,
        body: StatusBody,
    ) -> Result<BackendTask, RemoteError>;

    async fn delete(&self, id: &TaskId) -> Result<DeleteAck, RemoteError>;
}
