//! Translation between the board's task vocabulary and the API's.
//!
//! Both directions are total: anything the mapper does not recognise is replaced by a
//! documented default and reported on the `board_core::mapper` tracing target.

use crate::model::{
    BackendPayload, BackendStatus, BackendTask, Priority, Task, TaskId, TaskPatch, TaskStatus,
};
use serde_json::Value;
use tracing::debug;

fn mapping_defaulted(field: &str, raw: &dyn std::fmt::Debug, fallback: &str) {
    debug!(
        target: "board_core::mapper",
        field,
        raw = ?raw,
        fallback,
        "mapping defaulted"
    );
}

pub fn status_to_backend(status: TaskStatus) -> BackendStatus {
    match status {
        TaskStatus::Todo => BackendStatus::Todo,
        TaskStatus::InProgress => BackendStatus::InProgress,
        TaskStatus::Done => BackendStatus::Done,
    }
}

/// Maps a raw UI status label; unrecognised labels become `TODO`.
pub fn status_label_to_backend(label: &str) -> BackendStatus {
    match TaskStatus::from_label(label) {
        Some(status) => status_to_backend(status),
        None => {
            mapping_defaulted("status", &label, BackendStatus::Todo.as_str());
            BackendStatus::Todo
        }
    }
}

/// Maps a raw API status; unrecognised values become `todo`.
pub fn status_from_backend(raw: &str) -> TaskStatus {
    match raw {
        "TODO" => TaskStatus::Todo,
        "IN_PROGRESS" => TaskStatus::InProgress,
        "DONE" => TaskStatus::Done,
        other => {
            mapping_defaulted("status", &other, TaskStatus::Todo.label());
            TaskStatus::Todo
        }
    }
}

fn decode_status(raw: Option<&Value>) -> TaskStatus {
    match raw {
        Some(Value::String(value)) => status_from_backend(value),
        Some(other) => {
            mapping_defaulted("status", other, TaskStatus::Todo.label());
            TaskStatus::Todo
        }
        None => TaskStatus::Todo,
    }
}

fn decode_priority(raw: Option<&Value>) -> Priority {
    match raw {
        Some(Value::String(value)) => Priority::from_label(value).unwrap_or_else(|| {
            mapping_defaulted("priority", value, Priority::Medium.label());
            Priority::Medium
        }),
        Some(Value::Null) | None => Priority::Medium,
        Some(other) => {
            mapping_defaulted("priority", other, Priority::Medium.label());
            Priority::Medium
        }
    }
}

fn decode_minutes(raw: Option<&Value>) -> u32 {
    let Some(value) = raw else {
        return 0;
    };

    if let Some(minutes) = value.as_u64() {
        return u32::try_from(minutes).unwrap_or(u32::MAX);
    }

    match value.as_f64() {
        Some(minutes) if minutes.is_finite() && minutes > 0.0 => {
            mapping_defaulted("totalMinutes", value, "truncated");
            minutes.min(f64::from(u32::MAX)) as u32
        }
        _ => {
            if !value.is_null() {
                mapping_defaulted("totalMinutes", value, "0");
            }
            0
        }
    }
}

fn decode_assignee(assignee: Option<&str>, user_id: Option<&Value>) -> String {
    if let Some(name) = assignee.filter(|name| !name.is_empty()) {
        return name.to_string();
    }

    match user_id {
        Some(Value::String(id)) if !id.is_empty() => format!("User {id}"),
        Some(Value::Number(id)) => format!("User {id}"),
        _ => String::new(),
    }
}

/// Converts an API task into the board representation.
pub fn decode(backend: &BackendTask) -> Task {
    let id = backend.id.clone().unwrap_or_else(|| {
        mapping_defaulted("id", &Option::<TaskId>::None, "\"\"");
        TaskId::Text(String::new())
    });

    Task {
        id,
        title: backend.title.clone().unwrap_or_default(),
        description: backend.description.clone().unwrap_or_default(),
        status: decode_status(backend.status.as_ref()),
        priority: decode_priority(backend.priority.as_ref()),
        assignee: decode_assignee(backend.assignee.as_deref(), backend.user_id.as_ref()),
        due_date: backend.due_date.clone().unwrap_or_default(),
        total_minutes: decode_minutes(backend.total_minutes.as_ref()),
        created_at: backend.created_at.clone(),
        updated_at: backend.updated_at.clone(),
    }
}

/// Partial encode: only fields present on `fields` reach the payload.
pub fn encode(fields: &TaskPatch) -> BackendPayload {
    let payload = BackendPayload {
        title: fields.title.clone(),
        description: fields.description.clone(),
        status: fields.status.map(status_to_backend),
        priority: fields.priority,
        assignee: fields.assignee.clone(),
        due_date: fields.due_date.clone(),
        total_minutes: fields.total_minutes,
    };
    debug!(?fields, ?payload, "encoded task fields for the api");
    payload
}

pub fn encode_task(task: &Task) -> BackendPayload {
    encode(&TaskPatch::from(task))
}
