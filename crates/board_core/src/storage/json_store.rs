use crate::config;
use crate::error::AppError;
use crate::model::Task;
use crate::storage::seed::seed_tasks;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const STORE_DIR_ENV_VAR: &str = "TASKBOARD_STORE_DIR";

/// Path of the snapshot slot for `namespace`. The namespace becomes the file stem, so
/// only letters, digits, `-` and `_` are accepted.
pub fn store_path(namespace: &str) -> Result<PathBuf, AppError> {
    if !is_slot_name(namespace) {
        return Err(AppError::invalid_input(format!(
            "namespace '{namespace}' may only contain letters, digits, '-' and '_'"
        )));
    }
    let file_name = format!("{namespace}.json");
    if let Ok(dir) = std::env::var(STORE_DIR_ENV_VAR)
        && !dir.trim().is_empty()
    {
        return Ok(PathBuf::from(dir).join(file_name));
    }

    Ok(config::config_dir()?.join(file_name))
}

fn is_slot_name(namespace: &str) -> bool {
    !namespace.is_empty()
        && namespace
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

/// A single named slot holding the full task list as a JSON array.
///
/// Every mutation is a read-modify-write of the whole file, so two writers on the
/// same slot will lose updates.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn for_namespace(namespace: &str) -> Result<Self, AppError> {
        Ok(Self::new(store_path(namespace)?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the slot. A missing, empty or unreadable slot is reseeded.
    pub fn load(&self) -> Result<Vec<Task>, AppError> {
        match self.read_existing() {
            Some(tasks) => Ok(tasks),
            None => {
                info!(path = %self.path.display(), "local store empty, writing seed tasks");
                let seeded = seed_tasks();
                self.save(&seeded)?;
                Ok(seeded)
            }
        }
    }

    fn read_existing(&self) -> Option<Vec<Task>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "local store unreadable");
                return None;
            }
        };

        if content.trim().is_empty() {
            return None;
        }

        match serde_json::from_str::<Vec<Task>>(&content) {
            Ok(tasks) => Some(tasks),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "local store corrupt");
                None
            }
        }
    }

    pub fn save(&self, tasks: &[Task]) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|err| AppError::io(err.to_string()))?;
        }

        let content = serde_json::to_string_pretty(tasks)
            .map_err(|err| AppError::invalid_data(err.to_string()))?;
        std::fs::write(&self.path, content).map_err(|err| AppError::io(err.to_string()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, permissions)
                .map_err(|err| AppError::io(err.to_string()))?;
        }

        Ok(())
    }

    /// Loads the snapshot, lets `edit` change it, and writes it back.
    pub fn update<T, F>(&self, edit: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Vec<Task>) -> T,
    {
        let mut tasks = self.load()?;
        let result = edit(&mut tasks);
        self.save(&tasks)?;
        Ok(result)
    }
}
