use crate::config::Config;
use crate::error::AppError;
use crate::mapper;
use crate::model::{StatusBody, Task, TaskId, TaskPatch, TaskStatus};
use crate::remote::{DeleteAck, HttpTaskApi, Operation, RemoteError, TaskApi};
use crate::storage::SnapshotStore;
use async_trait::async_trait;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{info, warn};

const LOCAL_DELETE_MESSAGE: &str = "Task deleted from local store";

/// What an update left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Written {
    /// The store's copy of the task after the write.
    Stored(Task),
    /// The local store had no such task. Only the supplied fields and the new
    /// `updated_at` are known, and nothing was persisted.
    Detached(TaskPatch),
}

/// The five task operations, already in board vocabulary.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Task>, AppError>;

    async fn create(&self, fields: &TaskPatch) -> Result<Task, AppError>;

    async fn update(&self, id: &TaskId, fields: &TaskPatch) -> Result<Written, AppError>;

    async fn update_status(
        &self,
        id: &TaskId,
        status: TaskStatus,
    ) -> Result<Written, AppError>;

    async fn delete(&self, id: &TaskId) -> Result<DeleteAck, AppError>;
}

/// Remote-first task persistence with a local snapshot standing in whenever the
/// API is missing or unreachable.
#[derive(Debug, Clone)]
pub struct PersistenceAdapter<A> {
    api: A,
    store: SnapshotStore,
}

impl PersistenceAdapter<HttpTaskApi> {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let api = HttpTaskApi::from_config(config)?;
        let store = SnapshotStore::for_namespace(config.namespace())?;
        Ok(Self::new(api, store))
    }
}

impl<A: TaskApi> PersistenceAdapter<A> {
    pub fn new(api: A, store: SnapshotStore) -> Self {
        Self { api, store }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// `Ok` means "serve this from the local store"; anything else is reported.
    fn fallback(&self, err: RemoteError, operation: Operation) -> Result<(), AppError> {
        match err {
            RemoteError::Unavailable(reason) => {
                info!(
                    operation = operation.name(),
                    %reason,
                    store = %self.store.path().display(),
                    "task api unavailable, using local store"
                );
                Ok(())
            }
            RemoteError::Rejected { message, .. } => Err(AppError::request_failed(message)),
        }
    }
}

#[async_trait]
impl<A: TaskApi> TaskRepository for PersistenceAdapter<A> {
    async fn list(&self) -> Result<Vec<Task>, AppError> {
        match self.api.list().await {
            Ok(tasks) => Ok(tasks.iter().map(mapper::decode).collect()),
            Err(err) => {
                self.fallback(err, Operation::List)?;
                local_list(&self.store)
            }
        }
    }

    async fn create(&self, fields: &TaskPatch) -> Result<Task, AppError> {
        match self.api.create(&mapper::encode(fields)).await {
            Ok(task) => Ok(mapper::decode(&task)),
            Err(err) => {
                self.fallback(err, Operation::Create)?;
                local_create(&self.store, fields)
            }
        }
    }

    async fn update(&self, id: &TaskId, fields: &TaskPatch) -> Result<Written, AppError> {
        match self.api.update(id, &mapper::encode(fields)).await {
            Ok(task) => Ok(Written::Stored(mapper::decode(&task))),
            Err(err) => {
                self.fallback(err, Operation::Update)?;
                local_update(&self.store, id, fields)
            }
        }
    }

    async fn update_status(
        &self,
        id: &TaskId,
        status: TaskStatus,
    ) -> Result<Written, AppError> {
        let body = StatusBody {
            status: mapper::status_to_backend(status),
        };
        match self.api.update_status(id, body).await {
            Ok(task) => Ok(Written::Stored(mapper::decode(&task))),
            Err(err) => {
                self.fallback(err, Operation::UpdateStatus)?;
                local_update(&self.store, id, &TaskPatch::status(status))
            }
        }
    }

    async fn delete(&self, id: &TaskId) -> Result<DeleteAck, AppError> {
        match self.api.delete(id).await {
            Ok(ack) => Ok(ack),
            Err(err) => {
                self.fallback(err, Operation::Delete)?;
                local_delete(&self.store, id)
            }
        }
    }
}

fn store_failure(err: AppError) -> AppError {
    AppError::request_failed(format!("local store: {}", err.message()))
}

fn now_rfc3339() -> Result<String, AppError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))
}

fn now_millis() -> i64 {
    i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

/// Millisecond timestamp, bumped past any numeric id already in the snapshot.
fn next_local_id(tasks: &[Task], now_millis: i64) -> TaskId {
    let largest = tasks.iter().filter_map(|task| task.id.as_number()).max();
    match largest {
        Some(largest) if largest >= now_millis => TaskId::Number(largest.saturating_add(1)),
        _ => TaskId::Number(now_millis),
    }
}

fn local_list(store: &SnapshotStore) -> Result<Vec<Task>, AppError> {
    store.load().map_err(store_failure)
}

fn local_create(store: &SnapshotStore, fields: &TaskPatch) -> Result<Task, AppError> {
    let now = now_rfc3339()?;
    let now_millis = now_millis();

    store
        .update(|tasks| {
            let mut task = fields.clone().into_task(next_local_id(tasks, now_millis));
            task.created_at = Some(now.clone());
            task.updated_at = Some(now);
            tasks.push(task.clone());
            task
        })
        .map_err(store_failure)
}

fn local_update(
    store: &SnapshotStore,
    id: &TaskId,
    fields: &TaskPatch,
) -> Result<Written, AppError> {
    let now = now_rfc3339()?;
    let mut tasks = store.load().map_err(store_failure)?;

    let Some(task) = tasks.iter_mut().find(|task| task.id == *id) else {
        warn!(%id, "task not found in local store, nothing persisted");
        let mut detached = fields.clone();
        detached.updated_at = Some(now);
        return Ok(Written::Detached(detached));
    };

    fields.apply_to(task);
    task.updated_at = Some(now);
    let updated = task.clone();
    store.save(&tasks).map_err(store_failure)?;
    Ok(Written::Stored(updated))
}

fn local_delete(store: &SnapshotStore, id: &TaskId) -> Result<DeleteAck, AppError> {
    let removed = store
        .update(|tasks| {
            let before = tasks.len();
            tasks.retain(|task| task.id != *id);
            before - tasks.len()
        })
        .map_err(store_failure)?;

    if removed == 0 {
        warn!(%id, "task not found in local store");
    }

    Ok(DeleteAck {
        message: Some(LOCAL_DELETE_MESSAGE.to_string()),
    })
}
